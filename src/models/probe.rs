use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::config::PoolConfig;

/// Connection target echoed back to operators. Never includes the password.
#[derive(Debug, Serialize)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: String,
    pub database: String,
    pub user: String,
}

impl ConnectionTarget {
    pub fn from_config(cfg: &PoolConfig) -> Self {
        let or_unset = |v: &Option<String>| v.clone().unwrap_or_else(|| "not set".into());
        Self {
            host: or_unset(&cfg.host),
            port: cfg.port.clone(),
            database: or_unset(&cfg.database),
            user: or_unset(&cfg.user),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub current_time: NaiveDateTime,
    pub current_db: Option<String>,
    pub current_user: String,
}

/// One row of `SHOW STATUS`.
#[derive(Debug, Serialize)]
pub struct StatusVariable {
    #[serde(rename = "Variable_name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct DiagnosticReport {
    pub server: ServerMetadata,
    pub tables_count: usize,
    pub tables: Vec<String>,
    pub connections: Option<StatusVariable>,
}

#[derive(Debug, Serialize)]
pub struct WriteProbeRecord {
    pub id: i32,
    pub test_value: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct WriteProbe {
    pub inserted_id: u64,
    pub test_value: String,
    pub retrieved_data: WriteProbeRecord,
}
