//! Document selectors: which documents a language server is registered for.

use serde::{Deserialize, Serialize};

/// One `{scheme, language}` filter. A document matches when both agree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFilter {
    scheme: String,
    language: String,
}

impl DocumentFilter {
    #[must_use]
    pub fn new(scheme: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            language: language.into(),
        }
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// URI schemes are case-insensitive; language ids are not.
    #[must_use]
    pub fn matches(&self, scheme: &str, language: &str) -> bool {
        self.scheme.eq_ignore_ascii_case(scheme) && self.language == language
    }
}

/// Ordered list of filters; a document is selected if any filter matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentSelector(Vec<DocumentFilter>);

impl DocumentSelector {
    #[must_use]
    pub fn new(filters: Vec<DocumentFilter>) -> Self {
        Self(filters)
    }

    /// Local files of the given language only.
    #[must_use]
    pub fn local_files(language: &str) -> Self {
        Self(vec![DocumentFilter::new(crate::FILE_SCHEME, language)])
    }

    #[must_use]
    pub fn filters(&self) -> &[DocumentFilter] {
        &self.0
    }

    #[must_use]
    pub fn matches(&self, scheme: &str, language: &str) -> bool {
        self.0.iter().any(|f| f.matches(scheme, language))
    }
}
