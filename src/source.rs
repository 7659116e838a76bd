//! Source units submitted for compilation.

use modlink_compiler::SourceText;

/// Raw source text plus an optional origin tag (e.g. a file path) used by
/// diagnostics and debug symbols.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceUnit {
    text: String,
    origin: Option<String>,
}

impl SourceUnit {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: None,
        }
    }

    pub fn with_origin(text: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: Some(origin.into()),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Empty or whitespace only. Blank units are skipped by the compiler.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub(crate) fn as_source_text(&self) -> SourceText<'_> {
        SourceText {
            text: &self.text,
            origin: self.origin.as_deref(),
        }
    }
}

impl From<&str> for SourceUnit {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for SourceUnit {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}
