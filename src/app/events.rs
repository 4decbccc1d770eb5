//! Discrete events consumed by the controller
//!
//! User input and network completions arrive on the same channel and are
//! applied one at a time, in order.

use crate::client::GeneratedDrafts;
use crate::error::ServiceError;
use crate::history::HistoryEntry;
use crate::session::{SelectedFile, Ticket};
use std::fmt;

/// Top-level navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum View {
    #[default]
    NewMeeting,
    History,
}

/// Everything that can change application state
pub(crate) enum Event {
    Login {
        username: String,
        password: String,
    },
    Logout,
    Navigate(View),
    SelectFile(SelectedFile),
    ConfirmUpload,
    EditTranscript(String),
    Generate,
    SelectVariant(usize),
    EditVariant {
        index: usize,
        text: String,
    },
    /// Step back from the current stage
    Back,
    RestoreHistory {
        id: String,
    },
    /// Open the selected variant in a mail provider
    SendEmail {
        service: String,
    },
    CopySelectedVariant,
    CopySummary,
    UploadCompleted {
        ticket: Ticket,
        result: Result<String, ServiceError>,
    },
    GenerateCompleted {
        ticket: Ticket,
        result: Result<GeneratedDrafts, ServiceError>,
    },
    HistoryLoaded {
        generation: u64,
        result: Result<Vec<HistoryEntry>, ServiceError>,
    },
    Quit,
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Login { username, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            other => f.write_str(other.name()),
        }
    }
}

impl Event {
    /// Short name for logging, without payloads such as passwords
    pub fn name(&self) -> &'static str {
        match self {
            Event::Login { .. } => "login",
            Event::Logout => "logout",
            Event::Navigate(_) => "navigate",
            Event::SelectFile(_) => "select_file",
            Event::ConfirmUpload => "confirm_upload",
            Event::EditTranscript(_) => "edit_transcript",
            Event::Generate => "generate",
            Event::SelectVariant(_) => "select_variant",
            Event::EditVariant { .. } => "edit_variant",
            Event::Back => "back",
            Event::RestoreHistory { .. } => "restore_history",
            Event::SendEmail { .. } => "send_email",
            Event::CopySelectedVariant => "copy_selected_variant",
            Event::CopySummary => "copy_summary",
            Event::UploadCompleted { .. } => "upload_completed",
            Event::GenerateCompleted { .. } => "generate_completed",
            Event::HistoryLoaded { .. } => "history_loaded",
            Event::Quit => "quit",
        }
    }

    /// Completions are produced by the app itself, never by the user
    pub fn is_completion(&self) -> bool {
        matches!(
            self,
            Event::UploadCompleted { .. }
                | Event::GenerateCompleted { .. }
                | Event::HistoryLoaded { .. }
        )
    }
}
