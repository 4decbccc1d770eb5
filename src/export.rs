//! Export of email drafts to external mail clients
//!
//! A draft may start with a `Subject: ...` line. When it does, that line
//! becomes the subject and the rest of the text the body; otherwise the
//! default subject is used and the whole draft is the body.

use crate::desktop::{Desktop, DesktopError};
use std::sync::Arc;
use tracing::{info, warn};

/// Literal prefix recognised on the first line of a draft
const SUBJECT_PREFIX: &str = "Subject: ";

/// Mail providers with a compose deep link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ComposeService {
    Gmail,
    Outlook,
}

impl ComposeService {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "gmail" => Some(ComposeService::Gmail),
            "outlook" => Some(ComposeService::Outlook),
            _ => None,
        }
    }

    fn compose_url(self, encoded_subject: &str, encoded_body: &str) -> String {
        match self {
            ComposeService::Gmail => format!(
                "https://mail.google.com/mail/?view=cm&fs=1&su={}&body={}",
                encoded_subject, encoded_body
            ),
            ComposeService::Outlook => format!(
                "https://outlook.office.com/mail/deeplink/compose?subject={}&body={}",
                encoded_subject, encoded_body
            ),
        }
    }
}

/// A ready-to-open compose action
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ComposeAction {
    pub subject: String,
    pub body: String,
    /// Empty when the service is not supported
    pub url: String,
}

/// Split a draft into subject and body
pub(crate) fn split_subject(text: &str, default_subject: &str) -> (String, String) {
    let (first_line, rest) = text.split_once('\n').unwrap_or((text, ""));
    match first_line.strip_prefix(SUBJECT_PREFIX) {
        Some(subject) => (
            subject.trim_end_matches('\r').to_string(),
            rest.trim().to_string(),
        ),
        None => (default_subject.to_string(), text.to_string()),
    }
}

/// Build the compose action for a draft and a service name
pub(crate) fn build_compose_action(
    text: &str,
    service: &str,
    default_subject: &str,
) -> ComposeAction {
    let (subject, body) = split_subject(text, default_subject);
    let url = match ComposeService::parse(service) {
        Some(service) => service.compose_url(
            &urlencoding::encode(&subject),
            &urlencoding::encode(&body),
        ),
        None => {
            warn!(service = %service, "Unsupported compose service");
            String::new()
        }
    };
    ComposeAction { subject, body, url }
}

/// Hands drafts to the desktop
#[derive(Clone)]
pub(crate) struct ExportAdapter {
    default_subject: String,
    desktop: Arc<dyn Desktop>,
}

impl ExportAdapter {
    pub fn new(default_subject: impl Into<String>, desktop: Arc<dyn Desktop>) -> Self {
        Self {
            default_subject: default_subject.into(),
            desktop,
        }
    }

    pub fn compose(&self, text: &str, service: &str) -> ComposeAction {
        build_compose_action(text, service, &self.default_subject)
    }

    /// Build the compose action and open it in the browser
    ///
    /// Unsupported services produce an empty URL and nothing is opened.
    pub fn send(&self, text: &str, service: &str) -> Result<ComposeAction, DesktopError> {
        let action = self.compose(text, service);
        if action.url.is_empty() {
            return Ok(action);
        }
        info!(service = %service, subject = %action.subject, "Opening compose window");
        self.desktop.open_url(&action.url)?;
        Ok(action)
    }

    /// Copy text to the clipboard, returning whether it worked
    pub fn copy_to_clipboard(&self, text: &str) -> bool {
        self.desktop.copy_text(text).is_ok()
    }
}
