//! Application controller
//!
//! Wires the auth gate, the session state machine, the history cache and
//! the export adapter together. All state changes happen in `handle`, one
//! event at a time. Network calls run on spawned tasks and report back as
//! completion events on the same channel.

mod events;

pub(crate) use events::{Event, View};

use crate::auth::{AuthGate, Identity};
use crate::client::MeetingService;
use crate::error::SessionError;
use crate::export::ExportAdapter;
use crate::history::HistoryCache;
use crate::session::{Completion, SessionMachine, Stage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Whether the event loop should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Quit,
}

/// Application state and collaborators
pub(crate) struct App {
    auth: AuthGate,
    machine: SessionMachine,
    history: HistoryCache,
    history_loading: bool,
    view: View,
    login_error: Option<SessionError>,
    notice: Option<String>,
    service: Arc<dyn MeetingService>,
    export: ExportAdapter,
    events: mpsc::UnboundedSender<Event>,
}

impl App {
    pub fn new(
        auth: AuthGate,
        service: Arc<dyn MeetingService>,
        export: ExportAdapter,
        events: mpsc::UnboundedSender<Event>,
    ) -> Self {
        Self {
            auth,
            machine: SessionMachine::new(),
            history: HistoryCache::new(),
            history_loading: false,
            view: View::default(),
            login_error: None,
            notice: None,
            service,
            export,
            events,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.auth.identity()
    }

    pub fn machine(&self) -> &SessionMachine {
        &self.machine
    }

    pub fn history(&self) -> &HistoryCache {
        &self.history
    }

    pub fn is_history_loading(&self) -> bool {
        self.history_loading
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn login_error(&self) -> Option<&SessionError> {
        self.login_error.as_ref()
    }

    /// One-shot acknowledgement for the user, cleared once read
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    /// Consume events until the channel closes or the user quits
    pub async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<Event>,
        mut on_change: impl FnMut(&mut App),
    ) {
        on_change(&mut self);
        while let Some(event) = rx.recv().await {
            if self.handle(event) == Flow::Quit {
                break;
            }
            on_change(&mut self);
        }
        info!("Event loop finished");
    }

    /// Apply a single event
    pub fn handle(&mut self, event: Event) -> Flow {
        debug!(event = event.name(), "Handling event");

        if !self.auth.is_logged_in()
            && !event.is_completion()
            && !matches!(event, Event::Login { .. } | Event::Quit)
        {
            debug!(event = event.name(), "Ignoring event while logged out");
            return Flow::Continue;
        }

        match event {
            Event::Login { username, password } => self.login(&username, password),
            Event::Logout => self.logout(),
            Event::Navigate(view) => self.navigate(view),
            Event::SelectFile(file) => {
                let _ = self.machine.select_file(file);
            }
            Event::ConfirmUpload => self.confirm_upload(),
            Event::EditTranscript(text) => {
                let _ = self.machine.edit_transcript(text);
            }
            Event::Generate => self.generate(),
            Event::SelectVariant(index) => {
                let _ = self.machine.select_variant(index);
            }
            Event::EditVariant { index, text } => {
                let _ = self.machine.edit_variant(index, text);
            }
            Event::Back => self.back(),
            Event::RestoreHistory { id } => self.restore(&id),
            Event::SendEmail { service } => self.send_email(&service),
            Event::CopySelectedVariant => {
                let text = self
                    .machine
                    .session()
                    .drafts()
                    .map(|d| d.selected().to_string());
                self.copy(text);
            }
            Event::CopySummary => {
                let text = self
                    .machine
                    .session()
                    .drafts()
                    .map(|d| d.summary().to_string());
                self.copy(text);
            }
            Event::UploadCompleted { ticket, result } => {
                if self.machine.complete_upload(ticket, result) == Completion::Stale {
                    info!("Dropped upload response for a discarded session");
                }
            }
            Event::GenerateCompleted { ticket, result } => {
                if self.machine.complete_generate(ticket, result) == Completion::Stale {
                    info!("Dropped generate response for a discarded session");
                }
            }
            Event::HistoryLoaded { generation, result } => {
                if self.history.is_current(generation) {
                    self.history_loading = false;
                }
                // Best-effort: the cache keeps its entries and the error is only logged
                let _ = self.history.apply(generation, result);
            }
            Event::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn login(&mut self, username: &str, password: String) {
        match self.auth.attempt_login(username, password) {
            Ok(_) => self.login_error = None,
            Err(e) => self.login_error = Some(e),
        }
    }

    fn logout(&mut self) {
        if self.machine.is_busy() {
            info!("Logging out with a request in flight, its response will be dropped");
        }
        self.auth.logout();
        self.machine.reset();
        self.view = View::NewMeeting;
        self.login_error = None;
        self.notice = None;
    }

    fn navigate(&mut self, view: View) {
        self.view = view;
        if view == View::History {
            self.refresh_history();
        }
    }

    fn refresh_history(&mut self) {
        let generation = self.history.begin_refresh();
        self.history_loading = true;
        let service = self.service.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = service.history().await;
            let _ = events.send(Event::HistoryLoaded { generation, result });
        });
    }

    fn confirm_upload(&mut self) {
        let Ok(Some(request)) = self.machine.confirm_upload() else {
            return;
        };
        let service = self.service.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = service.upload(&request.file).await;
            let _ = events.send(Event::UploadCompleted {
                ticket: request.ticket,
                result,
            });
        });
    }

    fn generate(&mut self) {
        let Ok(Some(request)) = self.machine.generate() else {
            return;
        };
        let service = self.service.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = service
                .generate(&request.transcript, &request.filename)
                .await;
            let _ = events.send(Event::GenerateCompleted {
                ticket: request.ticket,
                result,
            });
        });
    }

    /// Resolve "back" against the stage at the moment it is applied
    fn back(&mut self) {
        let _ = match self.machine.stage() {
            Stage::Result => self.machine.back_to_transcript(),
            Stage::Transcript => self.machine.back_to_upload(),
            Stage::Upload => {
                debug!("Already at upload, nothing to go back to");
                Ok(())
            }
        };
    }

    fn restore(&mut self, id: &str) {
        let Some(entry) = self.history.get(id) else {
            warn!(id = %id, "History entry not found");
            self.notice = Some(format!("No history entry with id {}", id));
            return;
        };
        self.machine.restore_from_history(entry);
        self.view = View::NewMeeting;
    }

    fn send_email(&mut self, service: &str) {
        if self.machine.stage() != Stage::Result {
            self.notice = Some("Generate drafts before sending an email".to_string());
            return;
        }
        let Some(text) = self.machine.session().drafts().map(|d| d.selected().to_string())
        else {
            return;
        };
        match self.export.send(&text, service) {
            Ok(action) if action.url.is_empty() => {
                self.notice = Some(format!("Unsupported mail service: {}", service));
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to open compose window: {}", e);
                self.notice = Some("Could not open the compose window".to_string());
            }
        }
    }

    fn copy(&mut self, text: Option<String>) {
        let Some(text) = text else {
            self.notice = Some("Nothing to copy yet".to_string());
            return;
        };
        self.notice = Some(if self.export.copy_to_clipboard(&text) {
            "Copied to clipboard!".to_string()
        } else {
            "Could not copy to clipboard".to_string()
        });
    }
}
