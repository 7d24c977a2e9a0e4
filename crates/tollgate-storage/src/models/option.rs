use serde::{Deserialize, Serialize};

/// Runtime option stored in the `options` table.
///
/// A `None` device applies to every terminal. Lookups prefer a record for
/// the asking device over a wildcard one, and among equals the newest record.
/// A `None` value means "use the built-in default".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConfigOption {
    pub id: i64,
    pub option: String,
    pub value: Option<String>,
    pub device: Option<String>,
}
