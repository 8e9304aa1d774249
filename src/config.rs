//! Compilation settings.

use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// CompileConfig
// ---------------------------------------------------------------------------

/// Element names that never take children or a closing tag.
pub const DEFAULT_VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Configuration for [`compile_with`](crate::template::compile_with).
#[derive(Debug, Clone)]
pub struct CompileConfig {
    /// Void element names, stored lowercase.
    pub void_elements: BTreeSet<String>,
    /// Use the single top-level child as the root when there is exactly one.
    pub elect_single_root: bool,
    /// Warn when a content placeholder resolves to nothing.
    pub warn_on_empty_splice: bool,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            void_elements: DEFAULT_VOID_ELEMENTS.iter().map(|s| (*s).to_owned()).collect(),
            elect_single_root: true,
            warn_on_empty_splice: true,
        }
    }
}

impl CompileConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `name` as a void element (builder).
    pub fn with_void_element(mut self, name: impl Into<String>) -> Self {
        self.void_elements.insert(name.into().to_ascii_lowercase());
        self
    }

    /// Stop treating `name` as a void element (builder).
    pub fn without_void_element(mut self, name: &str) -> Self {
        self.void_elements.remove(&name.to_ascii_lowercase());
        self
    }

    /// Set root election (builder).
    pub fn with_elect_single_root(mut self, elect: bool) -> Self {
        self.elect_single_root = elect;
        self
    }

    /// Set the empty-splice warning (builder).
    pub fn with_warn_on_empty_splice(mut self, warn: bool) -> Self {
        self.warn_on_empty_splice = warn;
        self
    }

    /// Case-insensitive void element check.
    pub fn is_void(&self, name: &str) -> bool {
        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            self.void_elements.contains(&name.to_ascii_lowercase())
        } else {
            self.void_elements.contains(name)
        }
    }
}
