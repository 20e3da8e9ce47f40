use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantKind {
    City,
    Campus,
    Building,
    Hotel,
    Facility,
}

impl TenantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantKind::City => "city",
            TenantKind::Campus => "campus",
            TenantKind::Building => "building",
            TenantKind::Hotel => "hotel",
            TenantKind::Facility => "facility",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TenantKind::City => "City",
            TenantKind::Campus => "Campus",
            TenantKind::Building => "Building",
            TenantKind::Hotel => "Hotel",
            TenantKind::Facility => "Facility",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    pub kind: TenantKind,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(id: i64, name: impl Into<String>, kind: TenantKind, created_at: DateTime<Utc>) -> Self {
        Tenant {
            id,
            name: name.into(),
            kind,
            created_at,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.kind.label())
    }
}
