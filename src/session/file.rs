//! Transcript file chosen for upload

use std::path::Path;

/// Extensions offered by the file picker
pub(crate) const ACCEPTED_EXTENSIONS: [&str; 2] = ["txt", "docx"];

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// A file selected by the user, held in memory until uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectedFile {
    name: String,
    contents: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            contents,
        }
    }

    /// Read a file from disk, keeping only its file name
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let contents = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, contents))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }

    /// Whether the picker would offer this file
    pub fn has_accepted_extension(&self) -> bool {
        self.extension()
            .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Content type sent with the upload
    pub fn mime_type(&self) -> &'static str {
        match self.extension().as_deref() {
            Some("txt") => "text/plain",
            Some("docx") => DOCX_MIME,
            _ => "application/octet-stream",
        }
    }
}
