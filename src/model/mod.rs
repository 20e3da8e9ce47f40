pub mod classification;
pub mod matching;
pub mod triage;

pub use classification::Classification;
pub use matching::{MatchCandidate, MatchResult};
pub use triage::{NewReportRequest, TriageOutcome};
