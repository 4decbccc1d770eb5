//! Local admission gate
//!
//! A placeholder check in front of the workflow, not a security boundary:
//! any non-empty password is accepted for the fixed user name, and anyone
//! able to edit the preferences file can restore an identity.

use crate::error::SessionError;
use crate::preferences::PreferencesStore;
use std::fmt;
use tracing::{info, warn};
use zeroize::Zeroize;

/// The only user name the gate admits
pub(crate) const ADMIN_USERNAME: &str = "admin";

/// Name of the logged-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Identity(String);

impl Identity {
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Upper-cased first letter, used as an avatar
    pub fn initial(&self) -> Option<char> {
        self.0.chars().next().map(|c| c.to_ascii_uppercase())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Holds the process-wide identity and its durable copy
#[derive(Debug)]
pub(crate) struct AuthGate {
    store: PreferencesStore,
    identity: Option<Identity>,
}

impl AuthGate {
    /// Create the gate, restoring any identity saved by a previous run
    pub fn restore(store: PreferencesStore) -> Self {
        let identity = store.user_name().map(Identity);
        match &identity {
            Some(id) => info!(user = %id, "Restored identity from preferences"),
            None => info!("No stored identity, login required"),
        }
        Self { store, identity }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.identity.is_some()
    }

    /// Admit the fixed user with any non-empty password
    pub fn attempt_login(
        &mut self,
        username: &str,
        mut password: String,
    ) -> Result<Identity, SessionError> {
        let accepted = username == ADMIN_USERNAME && !password.is_empty();
        password.zeroize();

        if !accepted {
            warn!(user = %username, "Login rejected");
            return Err(SessionError::InvalidCredentials);
        }

        let identity = Identity(username.to_string());
        if let Err(e) = self.store.set_user_name(Some(identity.name())) {
            warn!("Failed to persist identity: {}", e);
        }
        info!(user = %identity, "Logged in");
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    /// Forget the identity here and on disk
    pub fn logout(&mut self) {
        if let Some(identity) = self.identity.take() {
            info!(user = %identity, "Logged out");
        }
        if let Err(e) = self.store.set_user_name(None) {
            warn!("Failed to clear stored identity: {}", e);
        }
    }
}
