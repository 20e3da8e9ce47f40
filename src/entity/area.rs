use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A zone within a tenant; groups issues geographically.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Area {
    pub fn new(id: i64, tenant_id: i64, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Area {
            id,
            tenant_id,
            name: name.into(),
            created_at,
        }
    }
}
