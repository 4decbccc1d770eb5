//! Platform collaborators: default browser and system clipboard

use arboard::Clipboard;
use tracing::{error, info};

/// Errors from the desktop environment
#[derive(Debug, thiserror::Error)]
pub(crate) enum DesktopError {
    #[error("Failed to open URL: {0}")]
    Open(#[from] std::io::Error),

    #[error("Clipboard error: {0}")]
    Clipboard(#[from] arboard::Error),
}

/// Side effects that leave the process
pub(crate) trait Desktop: Send + Sync {
    /// Open a URL in an external browsing context
    fn open_url(&self, url: &str) -> Result<(), DesktopError>;

    /// Put text on the clipboard
    fn copy_text(&self, text: &str) -> Result<(), DesktopError>;
}

/// The real desktop
#[derive(Debug, Default)]
pub(crate) struct SystemDesktop;

impl Desktop for SystemDesktop {
    fn open_url(&self, url: &str) -> Result<(), DesktopError> {
        open::that(url).map_err(|e| {
            error!("Failed to open URL: {}", e);
            DesktopError::from(e)
        })?;
        info!("Opened compose URL ({} chars)", url.len());
        Ok(())
    }

    fn copy_text(&self, text: &str) -> Result<(), DesktopError> {
        let mut clipboard = Clipboard::new().map_err(|e| {
            error!("Failed to initialize clipboard: {}", e);
            DesktopError::from(e)
        })?;
        clipboard.set_text(text).map_err(|e| {
            error!("Failed to copy text to clipboard: {}", e);
            DesktopError::from(e)
        })?;
        info!("Text copied to clipboard ({} chars)", text.len());
        Ok(())
    }
}
