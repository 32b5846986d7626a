//! TOML render configuration.
//!
//! A `rimu.toml` style document describes the options and macro
//! definitions to install in a [`Renderer`] before rendering:
//!
//! ```toml
//! safe_mode = 0
//! html_replacement = "<mark>replaced HTML</mark>"
//! header_ids = true
//!
//! [macros]
//! "--title" = "My Document"
//! ```
//!
//! Reading the file is up to the caller.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::Renderer;
use crate::error::RenderError;
use crate::options::{RenderOptions, SafeMode};

/// Render configuration.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Safe mode (`0..=15`).
    pub safe_mode: Option<u8>,
    /// Text that replaces raw HTML in safe mode 2.
    pub html_replacement: Option<String>,
    /// Restore defaults before applying the configuration.
    pub reset: bool,
    /// Generate header ids (sets the `--header-ids` macro).
    pub header_ids: bool,
    /// Macro definitions, applied in name order.
    pub macros: BTreeMap<String, String>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

impl RenderConfig {
    /// Parse and validate a TOML configuration document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that TOML types alone cannot constrain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(safe_mode) = self.safe_mode {
            SafeMode::new(safe_mode)
                .map_err(|e| ConfigError::Validation(format!("safe_mode: {e}")))?;
        }
        if let Some(value) = self.macros.get("--")
            && !value.is_empty()
        {
            return Err(ConfigError::Validation(format!(
                "macros: {}",
                RenderError::ReadOnlyMacro
            )));
        }
        Ok(())
    }

    /// Install options and macros in `renderer`.
    pub fn apply(&self, renderer: &mut Renderer<'_>) -> Result<(), RenderError> {
        if self.reset {
            renderer.reset();
        }
        if let Some(safe_mode) = self.safe_mode {
            renderer.options.safe_mode = SafeMode::new(safe_mode)?;
        }
        if let Some(html_replacement) = &self.html_replacement {
            html_replacement.clone_into(&mut renderer.options.html_replacement);
        }
        if self.header_ids {
            renderer.define_macro("--header-ids", "true")?;
        }
        for (name, value) in &self.macros {
            renderer.define_macro(name, value)?;
        }
        tracing::debug!(macros = self.macros.len(), "Configuration applied");
        Ok(())
    }

    /// Render options equivalent to the option fields.
    ///
    /// Macros and `header_ids` are not options; use [`apply`](Self::apply)
    /// to install them.
    #[must_use]
    pub fn to_options<'a>(&self) -> RenderOptions<'a> {
        let mut options = RenderOptions::new().with_reset(self.reset);
        if let Some(safe_mode) = self.safe_mode {
            options = options.with_safe_mode(safe_mode);
        }
        if let Some(html_replacement) = &self.html_replacement {
            options = options.with_html_replacement(html_replacement.clone());
        }
        options
    }
}
