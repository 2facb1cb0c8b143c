use std::{fmt, path::PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::guest::Guest;

/// One operator session in the rotating login history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    pub id: Uuid,
    pub operator: String,
    pub login_time: DateTime<Utc>,
    #[serde(default)]
    pub logout_time: Option<DateTime<Utc>>,
}

impl SessionEntry {
    pub fn open(operator: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            operator: operator.into(),
            login_time: at,
            logout_time: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.logout_time.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    Manual,
    Auto,
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupKind::Manual => f.write_str("manual"),
            BackupKind::Auto => f.write_str("auto"),
        }
    }
}

/// Snapshot of the whole guest collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupArchive {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub kind: BackupKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub guests: Vec<Guest>,
}

impl BackupArchive {
    pub fn new(guests: Vec<Guest>, kind: BackupKind, note: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            kind,
            note,
            guests,
        }
    }
}

/// Listing entry for a stored archive, without its guest payload.
#[derive(Debug, Clone)]
pub struct BackupInfo {
    pub name: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub kind: BackupKind,
    pub note: Option<String>,
    pub record_count: usize,
}
