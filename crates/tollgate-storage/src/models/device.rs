use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal record, refreshed at every startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceRecord {
    pub id: String,
    pub last_seen: Option<DateTime<Utc>>,
    /// `print`, `scan` or `both`
    pub last_mode: Option<String>,
    pub last_ip: Option<String>,
}
