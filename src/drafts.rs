//! Generated summary and email draft variants
//!
//! A draft set always holds exactly three variants. Each variant can be
//! edited on its own without touching the summary or its siblings.

use crate::error::SessionError;
use std::fmt;
use tracing::warn;

/// Number of email variants produced per generation
pub(crate) const VARIANT_COUNT: usize = 3;

/// Writing style of each variant, by position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VariantStyle {
    Formal,
    ActionOriented,
    Casual,
}

impl VariantStyle {
    /// Style for a variant position
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(VariantStyle::Formal),
            1 => Some(VariantStyle::ActionOriented),
            2 => Some(VariantStyle::Casual),
            _ => None,
        }
    }
}

impl fmt::Display for VariantStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantStyle::Formal => write!(f, "Formal"),
            VariantStyle::ActionOriented => write!(f, "Action-Oriented"),
            VariantStyle::Casual => write!(f, "Casual"),
        }
    }
}

/// Summary plus the three editable email variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DraftSet {
    summary: String,
    variants: [String; VARIANT_COUNT],
    selected_index: usize,
}

impl DraftSet {
    /// Build a draft set from a generation response
    ///
    /// Returns `None` unless exactly three variants are supplied.
    pub fn from_generated(summary: String, variants: Vec<String>) -> Option<Self> {
        let variants: [String; VARIANT_COUNT] = variants.try_into().ok()?;
        Some(Self {
            summary,
            variants,
            selected_index: 0,
        })
    }

    /// Build a draft set from a stored history snapshot
    ///
    /// Stored rows are not guaranteed to hold three variants, so missing
    /// variants become empty drafts and extras are dropped.
    pub fn from_snapshot(summary: &str, variants: &[String]) -> Self {
        if variants.len() != VARIANT_COUNT {
            warn!(
                found = variants.len(),
                expected = VARIANT_COUNT,
                "History entry has an unexpected number of email variants"
            );
        }
        let variants =
            std::array::from_fn(|i| variants.get(i).cloned().unwrap_or_default());
        Self {
            summary: summary.to_string(),
            variants,
            selected_index: 0,
        }
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    pub fn variant(&self, index: usize) -> Result<&str, SessionError> {
        self.variants
            .get(index)
            .map(String::as_str)
            .ok_or(SessionError::IndexOutOfRange {
                index,
                len: VARIANT_COUNT,
            })
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    /// Text of the currently selected variant
    pub fn selected(&self) -> &str {
        &self.variants[self.selected_index]
    }

    /// Make another variant the selected one
    pub fn select(&mut self, index: usize) -> Result<(), SessionError> {
        self.variant(index)?;
        self.selected_index = index;
        Ok(())
    }

    /// Replace the text of a single variant
    pub fn edit(&mut self, index: usize, text: String) -> Result<(), SessionError> {
        let slot = self
            .variants
            .get_mut(index)
            .ok_or(SessionError::IndexOutOfRange {
                index,
                len: VARIANT_COUNT,
            })?;
        *slot = text;
        Ok(())
    }
}
