//! Rimu markup to HTML rendering engine.
//!
//! Rimu is a line oriented markup language with user definable macros,
//! quotes, replacements and block elements. Source text is rendered block by
//! block: single line blocks (headers, definitions, attributes), lists, then
//! delimited blocks with the paragraph as the catch-all.
//!
//! # Architecture
//!
//! All mutable state lives in a [`Renderer`]: the macro, quote, replacement
//! and delimited block tables, pending block attributes and the safe mode
//! options. Documents can redefine most of these tables, and the changes
//! persist across render calls on the same renderer.
//!
//! Content problems (undefined macros, unterminated blocks, illegal
//! definitions) never fail a render. They are reported as [`Diagnostic`]s
//! through a callback. Only invalid API input returns a [`RenderError`].
//!
//! # Example
//!
//! ```
//! use rimu::{RenderOptions, render};
//!
//! let mut errors = Vec::new();
//! let html = render(
//!     "Hello <b>{who}</b>",
//!     RenderOptions::new()
//!         .with_safe_mode(3)
//!         .with_callback(|d| errors.push(d.message.clone())),
//! )
//! .unwrap();
//!
//! assert_eq!(html, "<p>Hello &lt;b&gt;{who}&lt;/b&gt;</p>");
//! assert_eq!(errors, vec!["undefined macro: {who}: Hello <b>{who}</b>"]);
//! ```

mod attributes;
mod blocks;
mod config;
mod diagnostic;
mod document;
mod error;
mod inline;
mod macros;
mod options;
mod reader;
mod writer;

pub use config::{ConfigError, RenderConfig};
pub use diagnostic::{Diagnostic, DiagnosticCallback, Severity};
pub use document::{Renderer, render};
pub use error::RenderError;
pub use inline::escape_html;
pub use options::{DEFAULT_HTML_REPLACEMENT, HtmlPolicy, RenderOptions, SafeMode};
