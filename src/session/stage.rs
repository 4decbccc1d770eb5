//! Workflow stages

use std::fmt;

/// One phase of the session workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Upload,
    Transcript,
    Result,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Upload => write!(f, "upload"),
            Stage::Transcript => write!(f, "transcript"),
            Stage::Result => write!(f, "result"),
        }
    }
}
