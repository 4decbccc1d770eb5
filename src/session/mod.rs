//! Session state machine
//!
//! Owns the live session and enforces the workflow:
//! `upload` → `transcript` → `result`, with backward transitions
//! `transcript → upload` and `result → transcript`, and restoration of a
//! history entry straight into `result` from any stage.
//!
//! # Requests
//! Uploading and generating are the only asynchronous steps. Starting one
//! hands out a request stamped with the session epoch; the caller performs
//! the network call and feeds the outcome back through `complete_upload` or
//! `complete_generate`. Any reset (logout, backward transition, restore)
//! bumps the epoch, so a response that arrives afterwards is discarded
//! instead of being applied to the newer session.

mod file;
mod stage;

pub(crate) use file::{SelectedFile, ACCEPTED_EXTENSIONS};
pub use stage::Stage;

use crate::client::GeneratedDrafts;
use crate::drafts::DraftSet;
use crate::error::{ServiceError, SessionError};
use crate::history::HistoryEntry;
use tracing::{debug, error, info};

/// The single live session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Session {
    stage: Stage,
    transcript: String,
    filename: String,
    file: Option<SelectedFile>,
    drafts: Option<DraftSet>,
}

impl Session {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn drafts(&self) -> Option<&DraftSet> {
        self.drafts.as_ref()
    }
}

/// Kind of request that may be in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestKind {
    Upload,
    Generate,
}

/// Identifies one dispatched request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
    epoch: u64,
    kind: RequestKind,
}

/// Work needed to perform an upload
#[derive(Debug, Clone)]
pub(crate) struct UploadRequest {
    pub ticket: Ticket,
    pub file: SelectedFile,
}

/// Work needed to perform a generation
#[derive(Debug, Clone)]
pub(crate) struct GenerateRequest {
    pub ticket: Ticket,
    pub transcript: String,
    pub filename: String,
}

/// What happened to a completed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Completion {
    Applied,
    Stale,
}

/// Session plus in-flight tracking and the current error slot
#[derive(Debug, Default)]
pub(crate) struct SessionMachine {
    session: Session,
    epoch: u64,
    pending: Option<Ticket>,
    error: Option<SessionError>,
}

impl SessionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn stage(&self) -> Stage {
        self.session.stage
    }

    /// Most recent operation error, cleared by the next success
    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    /// Request currently awaiting a response, if any
    pub fn pending(&self) -> Option<RequestKind> {
        self.pending.map(|t| t.kind)
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Record an error in the slot and hand it back to the caller
    fn fail(&mut self, err: SessionError) -> SessionError {
        self.error = Some(err.clone());
        err
    }

    fn require_stage(&mut self, expected: Stage, operation: &'static str) -> Result<(), SessionError> {
        if self.session.stage == expected {
            Ok(())
        } else {
            Err(self.fail(SessionError::InvalidStage {
                operation,
                stage: self.session.stage,
            }))
        }
    }

    /// Replace the session and invalidate anything still in flight
    fn replace_session(&mut self, session: Session) {
        if let Some(ticket) = self.pending.take() {
            debug!(kind = ?ticket.kind, epoch = self.epoch, "Abandoning in-flight request");
        }
        self.epoch += 1;
        self.session = session;
        self.error = None;
    }

    fn issue(&mut self, kind: RequestKind) -> Ticket {
        let ticket = Ticket {
            epoch: self.epoch,
            kind,
        };
        self.pending = Some(ticket);
        self.error = None;
        ticket
    }

    /// Take the pending slot if the ticket is still current
    fn settle(&mut self, ticket: Ticket) -> bool {
        if self.pending == Some(ticket) {
            self.pending = None;
            true
        } else {
            debug!(
                kind = ?ticket.kind,
                ticket_epoch = ticket.epoch,
                epoch = self.epoch,
                "Discarding stale response"
            );
            false
        }
    }

    /// Choose the transcript file to upload
    pub fn select_file(&mut self, file: SelectedFile) -> Result<(), SessionError> {
        self.require_stage(Stage::Upload, "select a file")?;
        info!(filename = %file.name(), bytes = file.contents().len(), "File selected");
        self.session.filename = file.name().to_string();
        self.session.file = Some(file);
        self.error = None;
        Ok(())
    }

    /// Start uploading the selected file
    ///
    /// Returns `Ok(None)` when an upload is already in flight.
    pub fn confirm_upload(&mut self) -> Result<Option<UploadRequest>, SessionError> {
        self.require_stage(Stage::Upload, "upload")?;
        if self.pending.is_some() {
            debug!("Upload already in flight, ignoring");
            return Ok(None);
        }
        let Some(file) = self.session.file.clone() else {
            return Err(self.fail(SessionError::NoFileSelected));
        };
        let ticket = self.issue(RequestKind::Upload);
        Ok(Some(UploadRequest { ticket, file }))
    }

    /// Apply the outcome of an upload
    pub fn complete_upload(
        &mut self,
        ticket: Ticket,
        result: Result<String, ServiceError>,
    ) -> Completion {
        if !self.settle(ticket) {
            return Completion::Stale;
        }
        match result {
            Ok(transcript) => {
                info!(chars = transcript.len(), "Transcript received");
                self.session.transcript = transcript;
                self.session.stage = Stage::Transcript;
                self.error = None;
            }
            Err(e) => {
                error!("Upload failed: {}", e);
                self.error = Some(SessionError::UploadFailed);
            }
        }
        Completion::Applied
    }

    /// Replace the transcript text verbatim
    pub fn edit_transcript(&mut self, text: String) -> Result<(), SessionError> {
        self.require_stage(Stage::Transcript, "edit the transcript")?;
        self.session.transcript = text;
        self.error = None;
        Ok(())
    }

    /// Start generating the summary and drafts
    ///
    /// Returns `Ok(None)` when a generation is already in flight.
    pub fn generate(&mut self) -> Result<Option<GenerateRequest>, SessionError> {
        self.require_stage(Stage::Transcript, "generate")?;
        if self.pending.is_some() {
            debug!("Generation already in flight, ignoring");
            return Ok(None);
        }
        let ticket = self.issue(RequestKind::Generate);
        Ok(Some(GenerateRequest {
            ticket,
            transcript: self.session.transcript.clone(),
            filename: self.session.filename.clone(),
        }))
    }

    /// Apply the outcome of a generation
    pub fn complete_generate(
        &mut self,
        ticket: Ticket,
        result: Result<GeneratedDrafts, ServiceError>,
    ) -> Completion {
        if !self.settle(ticket) {
            return Completion::Stale;
        }
        let outcome = result
            .map_err(|e| {
                error!("Generation failed: {}", e);
                SessionError::generation_failed(e.detail().map(str::to_string))
            })
            .and_then(|generated| {
                let count = generated.emails.len();
                DraftSet::from_generated(generated.summary, generated.emails).ok_or_else(|| {
                    error!(count, "Generation returned the wrong number of email drafts");
                    SessionError::generation_failed(None)
                })
            });
        match outcome {
            Ok(drafts) => {
                info!("Summary and email drafts generated");
                self.session.drafts = Some(drafts);
                self.session.stage = Stage::Result;
                self.error = None;
            }
            Err(e) => self.error = Some(e),
        }
        Completion::Applied
    }

    /// Show another variant
    pub fn select_variant(&mut self, index: usize) -> Result<(), SessionError> {
        self.require_stage(Stage::Result, "select a variant")?;
        let result = match self.session.drafts.as_mut() {
            Some(drafts) => drafts.select(index),
            None => Err(SessionError::IndexOutOfRange { index, len: 0 }),
        };
        match result {
            Ok(()) => {
                self.error = None;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Replace one variant's text in place
    pub fn edit_variant(&mut self, index: usize, text: String) -> Result<(), SessionError> {
        self.require_stage(Stage::Result, "edit a variant")?;
        let result = match self.session.drafts.as_mut() {
            Some(drafts) => drafts.edit(index, text),
            None => Err(SessionError::IndexOutOfRange { index, len: 0 }),
        };
        match result {
            Ok(()) => {
                self.error = None;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Discard the transcript and selected file and return to `upload`
    pub fn back_to_upload(&mut self) -> Result<(), SessionError> {
        self.require_stage(Stage::Transcript, "go back to upload")?;
        info!("Returning to upload, discarding transcript");
        self.replace_session(Session::default());
        Ok(())
    }

    /// Discard the drafts and return to editing the transcript
    pub fn back_to_transcript(&mut self) -> Result<(), SessionError> {
        self.require_stage(Stage::Result, "go back to the transcript")?;
        info!("Returning to transcript, discarding drafts");
        let session = Session {
            stage: Stage::Transcript,
            drafts: None,
            ..std::mem::take(&mut self.session)
        };
        self.replace_session(session);
        Ok(())
    }

    /// Copy a history entry into a fresh session at `result`
    pub fn restore_from_history(&mut self, entry: &HistoryEntry) {
        info!(id = %entry.id, filename = %entry.filename, "Restoring session from history");
        self.replace_session(Session {
            stage: Stage::Result,
            transcript: entry.transcript.clone(),
            filename: entry.filename.clone(),
            file: None,
            drafts: Some(DraftSet::from_snapshot(&entry.summary, &entry.emails)),
        });
    }

    /// Drop everything and start over at `upload`
    pub fn reset(&mut self) {
        self.replace_session(Session::default());
    }
}
