use serde::{Deserialize, Serialize};

use crate::entity::{Category, Severity};

/// Validated classifier output. Category and severity are guaranteed to be
/// inside the closed enumerations by the time this struct exists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    pub severity: Severity,
    pub summary: String,
    pub suggested_area: Option<String>,
}
