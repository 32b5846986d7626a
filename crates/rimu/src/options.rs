//! Render options and safe mode policy.

use std::fmt;

use crate::diagnostic::{Diagnostic, DiagnosticCallback};
use crate::error::RenderError;
use crate::inline::escape_html;

/// Text substituted for raw HTML when safe mode replaces it.
pub const DEFAULT_HTML_REPLACEMENT: &str = "<mark>replaced HTML</mark>";

/// What happens to raw HTML in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlPolicy {
    /// Pass HTML through unchanged.
    Raw,
    /// Drop HTML.
    Drop,
    /// Replace HTML with the configured replacement text.
    Replace,
    /// Escape HTML special characters.
    Escape,
}

/// Safe mode bit set (`0..=15`).
///
/// Bits 0-1 select the [`HtmlPolicy`]. When non-zero, bit 2 disables block
/// attributes and bit 3 re-enables macro definitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SafeMode(u8);

impl SafeMode {
    pub fn new(value: u8) -> Result<Self, RenderError> {
        if value > 15 {
            return Err(RenderError::IllegalSafeMode(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Parse a safe mode from option text.
    pub fn parse(value: &str) -> Result<Self, RenderError> {
        value
            .trim()
            .parse::<u8>()
            .map_err(|_| RenderError::IllegalSafeMode(value.to_owned()))
            .and_then(Self::new)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_enabled(self) -> bool {
        self.0 != 0
    }

    pub fn skip_macro_defs(self) -> bool {
        self.is_enabled() && self.0 & 0x8 == 0
    }

    pub fn skip_block_attributes(self) -> bool {
        self.is_enabled() && self.0 & 0x4 != 0
    }

    pub fn html_policy(self) -> HtmlPolicy {
        match self.0 & 0x3 {
            0 => HtmlPolicy::Raw,
            1 => HtmlPolicy::Drop,
            2 => HtmlPolicy::Replace,
            _ => HtmlPolicy::Escape,
        }
    }
}

impl fmt::Display for SafeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Option values that persist in a [`Renderer`](crate::Renderer) across
/// render calls.
#[derive(Debug, Clone)]
pub(crate) struct Options {
    pub(crate) safe_mode: SafeMode,
    pub(crate) html_replacement: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            safe_mode: SafeMode::default(),
            html_replacement: DEFAULT_HTML_REPLACEMENT.to_owned(),
        }
    }
}

impl Options {
    /// Apply the safe mode HTML policy to a fragment of raw HTML.
    pub(crate) fn html_filter(&self, html: &str) -> String {
        match self.safe_mode.html_policy() {
            HtmlPolicy::Raw => html.to_owned(),
            HtmlPolicy::Drop => String::new(),
            HtmlPolicy::Replace => self.html_replacement.clone(),
            HtmlPolicy::Escape => escape_html(html),
        }
    }
}

/// Options for a single render call.
///
/// Safe mode and HTML replacement persist in the renderer after the call;
/// the diagnostic callback is only used for this call.
#[derive(Default)]
pub struct RenderOptions<'a> {
    pub(crate) safe_mode: Option<u8>,
    pub(crate) html_replacement: Option<String>,
    pub(crate) reset: bool,
    pub(crate) callback: Option<DiagnosticCallback<'a>>,
}

impl fmt::Debug for RenderOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderOptions")
            .field("safe_mode", &self.safe_mode)
            .field("html_replacement", &self.html_replacement)
            .field("reset", &self.reset)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl<'a> RenderOptions<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the safe mode (`0..=15`). Out of range values fail the render.
    #[must_use]
    pub fn with_safe_mode(mut self, safe_mode: u8) -> Self {
        self.safe_mode = Some(safe_mode);
        self
    }

    /// Set the text that replaces raw HTML in safe mode 2.
    #[must_use]
    pub fn with_html_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.html_replacement = Some(replacement.into());
        self
    }

    /// Restore all definitions and options to their defaults before rendering.
    #[must_use]
    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    /// Receive diagnostics emitted during the render call.
    #[must_use]
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&Diagnostic) + 'a,
    {
        self.callback = Some(Box::new(callback));
        self
    }
}
