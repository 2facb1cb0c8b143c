pub mod backup_service;
pub mod capacity_service;
pub mod guest_service;
pub mod report_service;
pub mod session_service;
pub mod summary_service;

pub use backup_service::BackupService;
pub use capacity_service::{CapacityOutcome, CapacityService};
pub use guest_service::{GuestFilter, GuestService};
pub use report_service::{Report, ReportPeriod, ReportService, ReportStats};
pub use session_service::SessionService;
pub use summary_service::{Dashboard, StatusTotals, SummaryService, UpcomingPayment};

use uuid::Uuid;

use crate::{domain::CapacityCell, errors::PgError};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] PgError),
    #[error("{0}")]
    Invalid(String),
    #[error("Guest not found: {0}")]
    NotFound(Uuid),
    #[error("{cell} is full ({occupied}/{capacity} beds occupied)")]
    RoomFull {
        cell: CapacityCell,
        occupied: usize,
        capacity: u8,
    },
}
