use serde::{Deserialize, Serialize};

use crate::timing::RunTiming;
use crate::transport::TokenUsage;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The endpoint finished the response.
    Completed,
    /// The caller aborted mid-flight; partial text is preserved.
    Cancelled,
}

/// Final outcome of one run.
///
/// `content` and `reasoning` are exactly the concatenation, in arrival
/// order, of every delta classified into each channel; the same text was
/// already delivered through the observer callbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub status: RunStatus,
    pub content: String,
    pub reasoning: String,
    /// The reasoning segment opened but never closed before the run ended.
    pub truncated_reasoning: bool,
    pub timing: RunTiming,
    pub usage: TokenUsage,
}

impl RunResult {
    pub fn is_cancelled(&self) -> bool {
        self.status == RunStatus::Cancelled
    }

    pub fn has_reasoning(&self) -> bool {
        !self.reasoning.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(RunStatus::Cancelled).unwrap(),
            serde_json::json!("cancelled")
        );
    }
}
