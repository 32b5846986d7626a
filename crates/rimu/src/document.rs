//! Render context and the document block loop.

use std::fmt;

use crate::attributes::BlockAttributes;
use crate::blocks::{DelimitedBlock, default_blocks};
use crate::diagnostic::{Diagnostic, DiagnosticCallback};
use crate::error::RenderError;
use crate::inline::{Quotes, Replacements};
use crate::macros::Macros;
use crate::options::{Options, RenderOptions, SafeMode};
use crate::reader::Reader;
use crate::writer::Writer;

/// Render context.
///
/// Owns every definition table (macros, quotes, replacements, delimited
/// blocks), the pending block attributes and the persistent option values.
/// Definitions made by one [`render`](Self::render) call stay visible to
/// later calls on the same renderer, so an include file can be rendered
/// first to seed definitions for the documents that follow.
///
/// # Example
///
/// ```
/// use rimu::{RenderOptions, Renderer};
///
/// let mut renderer = Renderer::new();
/// renderer.render("{author} = 'Kim'", RenderOptions::new()).unwrap();
/// let html = renderer.render("By {author}", RenderOptions::new()).unwrap();
/// assert_eq!(html, "<p>By Kim</p>");
/// ```
pub struct Renderer<'a> {
    pub(crate) options: Options,
    pub(crate) macros: Macros,
    pub(crate) quotes: Quotes,
    pub(crate) replacements: Replacements,
    pub(crate) blocks: Vec<DelimitedBlock>,
    pub(crate) attributes: BlockAttributes,
    /// Markers of the open lists, outermost first.
    pub(crate) list_ids: Vec<String>,
    callback: Option<DiagnosticCallback<'a>>,
}

impl fmt::Debug for Renderer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("options", &self.options)
            .field("macros", &self.macros)
            .field("attributes", &self.attributes)
            .field("callback", &self.callback.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Renderer<'_> {
    fn default() -> Self {
        Self {
            options: Options::default(),
            macros: Macros::default(),
            quotes: Quotes::default(),
            replacements: Replacements::default(),
            blocks: default_blocks(),
            attributes: BlockAttributes::default(),
            list_ids: Vec::new(),
            callback: None,
        }
    }
}

impl<'a> Renderer<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore all definitions and options to their defaults.
    pub fn reset(&mut self) {
        tracing::debug!("Renderer reset");
        self.options = Options::default();
        self.macros = Macros::default();
        self.quotes = Quotes::default();
        self.replacements = Replacements::default();
        self.blocks = default_blocks();
        self.attributes.reset();
        self.list_ids.clear();
    }

    /// Render Rimu markup to HTML.
    ///
    /// Options are applied before rendering: `reset` first, then safe mode
    /// and HTML replacement. Malformed markup is reported through the
    /// options callback and never fails the call.
    pub fn render(&mut self, source: &str, options: RenderOptions<'a>) -> Result<String, RenderError> {
        let RenderOptions {
            safe_mode,
            html_replacement,
            reset,
            callback,
        } = options;
        let safe_mode = safe_mode.map(SafeMode::new).transpose()?;
        if reset {
            self.reset();
        }
        if let Some(safe_mode) = safe_mode {
            self.options.safe_mode = safe_mode;
        }
        if let Some(html_replacement) = html_replacement {
            self.options.html_replacement = html_replacement;
        }

        let previous = callback.map(|callback| self.callback.replace(callback));
        let result = self.render_document(source);
        if let Some(previous) = previous {
            self.callback = previous;
        }
        result
    }

    /// Set a named option: `safeMode`, `htmlReplacement` or `reset`.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), RenderError> {
        match name {
            "safeMode" => self.options.safe_mode = SafeMode::parse(value)?,
            "htmlReplacement" => value.clone_into(&mut self.options.html_replacement),
            "reset" => match value {
                "true" => self.reset(),
                "false" => {}
                _ => {
                    return Err(RenderError::IllegalOptionValue {
                        name: name.to_owned(),
                        value: value.to_owned(),
                    });
                }
            },
            _ => return Err(RenderError::IllegalOption(name.to_owned())),
        }
        tracing::debug!(name, value, "API option set");
        Ok(())
    }

    /// Define a macro, as if `{name} = 'value'` were rendered.
    ///
    /// A name ending in `?` only defines the macro if it does not exist.
    /// Safe mode does not apply.
    pub fn define_macro(&mut self, name: &str, value: &str) -> Result<(), RenderError> {
        if name == "--" && !value.is_empty() {
            return Err(RenderError::ReadOnlyMacro);
        }
        self.macros.set(name, value.to_owned());
        Ok(())
    }

    pub fn macro_value(&self, name: &str) -> Option<&str> {
        self.macros.get(name)
    }

    pub fn safe_mode(&self) -> SafeMode {
        self.options.safe_mode
    }

    pub fn html_replacement(&self) -> &str {
        &self.options.html_replacement
    }

    /// Install a diagnostic callback that outlives single render calls.
    ///
    /// A callback passed in [`RenderOptions`] takes precedence for the
    /// duration of its call.
    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&Diagnostic) + 'a,
    {
        self.callback = Some(Box::new(callback));
    }

    /// Report a content problem.
    pub(crate) fn error(&mut self, message: impl Into<String>) {
        let diagnostic = Diagnostic::error(message);
        tracing::debug!(message = %diagnostic.message, "Diagnostic");
        if let Some(callback) = self.callback.as_mut() {
            callback(&diagnostic);
        }
    }

    /// Render `text` block by block with the current state.
    pub(crate) fn render_document(&mut self, text: &str) -> Result<String, RenderError> {
        let mut reader = Reader::new(text);
        let mut writer = Writer::new();
        while !reader.at_end() {
            reader.skip_blank_lines();
            if reader.at_end() {
                break;
            }
            if self.render_line_block(&mut reader, &mut writer, &[]) {
                continue;
            }
            if self.render_list(&mut reader, &mut writer)? {
                continue;
            }
            if self.render_delimited_block(&mut reader, &mut writer, &[])? {
                continue;
            }
            let line = reader.cursor().to_owned();
            tracing::warn!(line = %line, "No block matched");
            return Err(RenderError::NoMatchingBlock { line });
        }
        Ok(writer.to_string())
    }
}

/// Render Rimu markup with a freshly seeded [`Renderer`].
///
/// ```
/// let html = rimu::render("Hello *World*!", rimu::RenderOptions::new()).unwrap();
/// assert_eq!(html, "<p>Hello <em>World</em>!</p>");
/// ```
pub fn render(source: &str, options: RenderOptions<'_>) -> Result<String, RenderError> {
    Renderer::new().render(source, options)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_render_paragraph() {
        assert_eq!(
            render("Hello *World*!", RenderOptions::new()).unwrap(),
            "<p>Hello <em>World</em>!</p>"
        );
    }

    #[test]
    fn test_render_mixed_blocks() {
        let html = render("# Title\n\nText\n\n- a\n- b\n\n``\ncode\n``", RenderOptions::new()).unwrap();

        assert_eq!(
            html,
            "<h1>Title</h1>\n<p>Text</p>\n<ul><li>a</li><li>b</li></ul><pre><code>code</code></pre>"
        );
    }

    #[test]
    fn test_definitions_persist_between_calls() {
        let mut renderer = Renderer::new();
        renderer.render("{x} = 'X'", RenderOptions::new()).unwrap();

        assert_eq!(renderer.render("{x}", RenderOptions::new()).unwrap(), "<p>X</p>");
    }

    #[test]
    fn test_reset_option() {
        let mut renderer = Renderer::new();
        renderer.render("{x} = 'X'", RenderOptions::new()).unwrap();

        let html = renderer
            .render("\\{x}", RenderOptions::new().with_reset(true))
            .unwrap();

        assert_eq!(html, "<p>{x}</p>");
        assert_eq!(renderer.macro_value("x"), None);
    }

    #[test]
    fn test_illegal_safe_mode_fails() {
        let mut renderer = Renderer::new();
        let result = renderer.render("x", RenderOptions::new().with_safe_mode(16));

        assert!(matches!(result, Err(RenderError::IllegalSafeMode(v)) if v == "16"));
        assert_eq!(renderer.safe_mode().value(), 0);
    }

    #[test]
    fn test_safe_mode_persists() {
        let mut renderer = Renderer::new();
        renderer
            .render("", RenderOptions::new().with_safe_mode(3))
            .unwrap();

        assert_eq!(renderer.render("<br>", RenderOptions::new()).unwrap(), "<p>&lt;br&gt;</p>");
    }

    #[test]
    fn test_set_option() {
        let mut renderer = Renderer::new();
        renderer.set_option("safeMode", "1").unwrap();
        renderer.set_option("htmlReplacement", "X").unwrap();

        assert_eq!(renderer.safe_mode().value(), 1);
        assert_eq!(renderer.html_replacement(), "X");

        renderer.set_option("reset", "true").unwrap();
        assert_eq!(renderer.safe_mode().value(), 0);
    }

    #[test]
    fn test_set_option_errors() {
        let mut renderer = Renderer::new();

        assert_eq!(
            renderer.set_option("bogus", "1").unwrap_err().to_string(),
            "illegal API option name: bogus"
        );
        assert_eq!(
            renderer.set_option("reset", "yes").unwrap_err().to_string(),
            "illegal reset API option value: yes"
        );
        assert_eq!(
            renderer.set_option("safeMode", "x").unwrap_err().to_string(),
            "illegal safeMode API option value: x"
        );
    }

    #[test]
    fn test_define_macro() {
        let mut renderer = Renderer::new();
        renderer.define_macro("x", "1").unwrap();
        renderer.define_macro("x?", "2").unwrap();

        assert_eq!(renderer.macro_value("x"), Some("1"));
        assert!(matches!(
            renderer.define_macro("--", "x"),
            Err(RenderError::ReadOnlyMacro)
        ));
    }

    #[test]
    fn test_callback_scoped_to_call() {
        let persistent = RefCell::new(0);
        let scoped = RefCell::new(0);
        let mut renderer = Renderer::new();
        renderer.set_callback(|_| *persistent.borrow_mut() += 1);

        renderer
            .render("{a}", RenderOptions::new().with_callback(|_| *scoped.borrow_mut() += 1))
            .unwrap();
        renderer.render("{b}", RenderOptions::new()).unwrap();

        assert_eq!(*scoped.borrow(), 1);
        assert_eq!(*persistent.borrow(), 1);
    }

    #[test]
    fn test_container_blocks_render_nested_markup() {
        let html = render(".. note\n# Inside\n- item\n..", RenderOptions::new()).unwrap();

        assert_eq!(
            html,
            "<div class=\"note\"><h1>Inside</h1>\n<ul><li>item</li></ul></div>"
        );
    }
}
