//! Native locator strategies and locate requests.
//!
//! One [`Strategy`] value replaces a family of per-strategy lookup methods:
//! the driver receives the strategy and the raw selector, and the resolver
//! derives the training label from the same pair.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix of every auto-generated element label
pub const LABEL_PREFIX: &str = "element_name_by";

/// Native strategy understood by the automation driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Accessibility identifier
    AccessibilityId,
    /// Class name
    ClassName,
    /// CSS selector
    CssSelector,
    /// Element id
    Id,
    /// Exact link text
    LinkText,
    /// Name attribute
    Name,
    /// Partial link text
    PartialLinkText,
    /// Tag name
    TagName,
    /// XPath expression
    #[serde(rename = "xpath")]
    XPath,
}

impl Strategy {
    /// All strategies, in declaration order
    pub const ALL: [Self; 9] = [
        Self::AccessibilityId,
        Self::ClassName,
        Self::CssSelector,
        Self::Id,
        Self::LinkText,
        Self::Name,
        Self::PartialLinkText,
        Self::TagName,
        Self::XPath,
    ];

    /// Short code used in generated labels. Unique per strategy.
    #[must_use]
    pub const fn shortcode(self) -> &'static str {
        match self {
            Self::AccessibilityId => "accessibility_id",
            Self::ClassName => "class_name",
            Self::CssSelector => "css_selector",
            Self::Id => "id",
            Self::LinkText => "link_text",
            Self::Name => "name",
            Self::PartialLinkText => "partial_link_text",
            Self::TagName => "tag_name",
            Self::XPath => "xpath",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.shortcode())
    }
}

/// Derive the training label for a `(strategy, selector)` pair.
///
/// `.` and `/` in the selector become `_`, then any space in the whole
/// label becomes `_`.
#[must_use]
pub fn derive_label(strategy: Strategy, selector: &str) -> String {
    let selector: String = selector
        .chars()
        .map(|c| if c == '.' || c == '/' { '_' } else { c })
        .collect();
    normalize_label(&format!("{LABEL_PREFIX}_{}_{selector}", strategy.shortcode()))
}

/// Replace spaces with underscores
#[must_use]
pub fn normalize_label(label: &str) -> String {
    label.replace(' ', "_")
}

/// Input to the resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocateRequest {
    /// Native strategy
    pub strategy: Strategy,
    /// Raw selector for the native driver
    pub selector: String,
    /// Human readable label; derived from strategy and selector when absent
    pub label: Option<String>,
}

impl LocateRequest {
    /// Create a request without an explicit label
    #[must_use]
    pub fn new(strategy: Strategy, selector: impl Into<String>) -> Self {
        Self {
            strategy,
            selector: selector.into(),
            label: None,
        }
    }

    /// Shorthand for an xpath request
    #[must_use]
    pub fn xpath(selector: impl Into<String>) -> Self {
        Self::new(Strategy::XPath, selector)
    }

    /// Shorthand for an id request
    #[must_use]
    pub fn id(selector: impl Into<String>) -> Self {
        Self::new(Strategy::Id, selector)
    }

    /// Shorthand for an accessibility id request
    #[must_use]
    pub fn accessibility_id(selector: impl Into<String>) -> Self {
        Self::new(Strategy::AccessibilityId, selector)
    }

    /// Attach a human readable label
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label used as the training key: never contains spaces.
    ///
    /// An empty explicit label falls back to the derived one.
    #[must_use]
    pub fn effective_label(&self) -> String {
        match self.label.as_deref() {
            Some(label) if !label.is_empty() => normalize_label(label),
            _ => derive_label(self.strategy, &self.selector),
        }
    }
}
