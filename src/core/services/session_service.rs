use uuid::Uuid;

use crate::core::manager::PropertyManager;
use crate::core::services::{ServiceError, ServiceResult};
use crate::domain::SessionEntry;

/// Rotating operator session log. Records who used the shell and when;
/// no credentials are involved.
pub struct SessionService;

impl SessionService {
    pub fn start(manager: &PropertyManager, operator: &str) -> ServiceResult<SessionEntry> {
        let operator = operator.trim();
        if operator.is_empty() {
            return Err(ServiceError::Invalid("operator name is required".into()));
        }
        let entry = SessionEntry::open(operator, manager.now());
        manager.storage().record_login(&entry)?;
        tracing::info!(session = %entry.id, operator, "session started");
        Ok(entry)
    }

    pub fn end(manager: &PropertyManager, id: Uuid) -> ServiceResult<()> {
        manager.storage().record_logout(id, manager.now())?;
        tracing::info!(session = %id, "session ended");
        Ok(())
    }

    pub fn history(manager: &PropertyManager) -> ServiceResult<Vec<SessionEntry>> {
        Ok(manager.storage().list_sessions()?)
    }
}
