use serde::{Deserialize, Serialize};

/// An open issue offered to the matcher for comparison. Callers order the
/// candidate set before it is truncated to the configured cap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub issue_id: i64,
    pub description: String,
}

/// Matcher verdict. `matched` is never true with confidence below the
/// configured threshold; that policy lives inside the matcher, not its
/// callers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(rename = "match")]
    pub matched: bool,
    pub issue_id: Option<i64>,
    pub confidence: f64,
    pub reasoning: String,
}

impl MatchResult {
    pub fn no_match(reasoning: impl Into<String>) -> Self {
        MatchResult {
            matched: false,
            issue_id: None,
            confidence: 0.0,
            reasoning: reasoning.into(),
        }
    }
}
