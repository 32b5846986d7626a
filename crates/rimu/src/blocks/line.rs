//! Single line block elements.
//!
//! Definitions are tried in table order against the current line. Some
//! produce output (headers, images), the rest only update render state
//! (macro, quote, replacement and delimited block definitions, block
//! attributes, API options).

use std::sync::LazyLock;

use regex::Regex;

use crate::Renderer;
use crate::attributes::ExpansionOptions;
use crate::inline::{QuoteDefinition, group_values};
use crate::macros::{
    EXPRESSION_DEF_OPEN, LINE_DEF, LITERAL_DEF_OPEN, MATCH_LINE, ValueKind,
};
use crate::reader::Reader;
use crate::writer::Writer;

static DELIMITED_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\?\|([\w\-]+)\|\s*=\s*'(.*)'$").unwrap());

static QUOTE_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S{1,2})\s*=\s*'([^|]*)(\|{1,2})(.*)'$").unwrap());

static REPLACEMENT_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\?/(.+)/([igm]*)\s*=\s*'(.*)'$").unwrap());

/// Header; the optional trailing marker run is removed separately.
static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\?([#=]{1,6})\s+(.+)$").unwrap());

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\\?/{2}(.*)$").unwrap());

static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\\?<image:([^\s|]+)\|(.+?)>$").unwrap());

static IMAGE_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\?<image:([^\s|]+?)>$").unwrap());

static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\?<<#([a-zA-Z][\w\-]*)>>$").unwrap());

/// Loose match: block attributes can contain macro invocations.
static ATTRIBUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\\?\.[a-zA-Z#"\[+-].*$"#).unwrap());

static API_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\?\.(\w+)\s*=\s*'(.*)'$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineBlockKind {
    MacroLine,
    DelimitedDefinition,
    QuoteDefinition,
    ReplacementDefinition,
    MacroDefinition,
    Header,
    Comment,
    Image,
    ImageSrc,
    Anchor,
    Attributes,
    ApiOption,
}

impl LineBlockKind {
    /// All line blocks in match priority order.
    const ALL: [Self; 12] = [
        Self::MacroLine,
        Self::DelimitedDefinition,
        Self::QuoteDefinition,
        Self::ReplacementDefinition,
        Self::MacroDefinition,
        Self::Header,
        Self::Comment,
        Self::Image,
        Self::ImageSrc,
        Self::Anchor,
        Self::Attributes,
        Self::ApiOption,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::MacroLine => "macro-line",
            Self::DelimitedDefinition => "delimited-definition",
            Self::QuoteDefinition => "quote-definition",
            Self::ReplacementDefinition => "replacement-definition",
            Self::MacroDefinition => "macro-definition",
            Self::Header => "header",
            Self::Comment => "comment",
            Self::Image | Self::ImageSrc => "image",
            Self::Anchor => "anchor",
            Self::Attributes => "attributes",
            Self::ApiOption => "api-option",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Self::MacroLine => &MATCH_LINE,
            Self::DelimitedDefinition => &DELIMITED_DEF,
            Self::QuoteDefinition => &QUOTE_DEF,
            Self::ReplacementDefinition => &REPLACEMENT_DEF,
            Self::MacroDefinition => &LINE_DEF,
            Self::Header => &HEADER,
            Self::Comment => &COMMENT,
            Self::Image => &IMAGE,
            Self::ImageSrc => &IMAGE_SRC,
            Self::Anchor => &ANCHOR,
            Self::Attributes => &ATTRIBUTES,
            Self::ApiOption => &API_OPTION,
        }
    }

    /// Output template for blocks that render HTML.
    fn template(self) -> &'static str {
        match self {
            Self::Header => "<h$1>$$2</h$1>",
            Self::Image => r#"<img src="$1" alt="$2">"#,
            Self::ImageSrc => r#"<img src="$1" alt="$1">"#,
            Self::Anchor => r#"<div id="$1"></div>"#,
            _ => "",
        }
    }
}

/// Header text with an optional trailing copy of the marker removed.
fn header_text<'t>(marker: &str, text: &'t str) -> &'t str {
    if let Some(head) = text.strip_suffix(marker)
        && head.ends_with(char::is_whitespace)
    {
        let head = head.trim_end();
        if !head.is_empty() {
            return head;
        }
    }
    text
}

impl Renderer<'_> {
    /// Render the line block at the cursor.
    ///
    /// `allowed` restricts the definitions tried by name; an empty slice
    /// allows all. Returns `false` if no definition matched.
    pub(crate) fn render_line_block(
        &mut self,
        reader: &mut Reader,
        writer: &mut Writer,
        allowed: &[&str],
    ) -> bool {
        for kind in LineBlockKind::ALL {
            if !allowed.is_empty() && !allowed.contains(&kind.name()) {
                continue;
            }
            let line = reader.cursor().to_owned();
            let Some(caps) = kind.pattern().captures(&line) else {
                continue;
            };
            let groups = group_values(&caps);
            if groups[0].starts_with('\\') {
                reader.set_cursor(&line[1..]);
                continue;
            }
            if !self.verify_line_block(kind, &groups, reader) {
                continue;
            }
            tracing::trace!(block = kind.name(), "Line block");
            let text = self.filter_line_block(kind, groups);
            reader.next();
            if !text.trim().is_empty() {
                let text = self.inject_attributes(&text);
                writer.write(text);
                if !reader.at_end() {
                    writer.write("\n");
                }
            }
            return true;
        }
        false
    }

    fn verify_line_block(
        &mut self,
        kind: LineBlockKind,
        groups: &[String],
        reader: &mut Reader,
    ) -> bool {
        match kind {
            LineBlockKind::MacroLine => {
                let invocation = &groups[0];
                if LITERAL_DEF_OPEN.is_match(invocation) || EXPRESSION_DEF_OPEN.is_match(invocation)
                {
                    return false;
                }
                let value = self.render_macros(invocation, true);
                if value == *invocation {
                    return false;
                }
                reader.insert_ahead(value.split('\n').map(str::to_owned).collect::<Vec<_>>());
                true
            }
            LineBlockKind::Attributes => {
                let line = self.render_macros(&groups[0], false);
                let safe_mode = self.options.safe_mode;
                match self.attributes.parse(&line, safe_mode) {
                    Some(messages) => {
                        for message in messages {
                            self.error(message);
                        }
                        true
                    }
                    None => false,
                }
            }
            _ => true,
        }
    }

    fn filter_line_block(&mut self, kind: LineBlockKind, mut groups: Vec<String>) -> String {
        let safe_mode = self.options.safe_mode;
        let macros = ExpansionOptions::macros_only();
        match kind {
            LineBlockKind::MacroLine | LineBlockKind::Attributes => String::new(),
            LineBlockKind::DelimitedDefinition => {
                if !safe_mode.is_enabled() {
                    let value = self.replace_inline(&groups[2], &macros);
                    self.set_block_definition(&groups[1], &value);
                }
                String::new()
            }
            LineBlockKind::QuoteDefinition => {
                if !safe_mode.is_enabled() {
                    let def = QuoteDefinition {
                        quote: groups[1].clone(),
                        open_tag: self.replace_inline(&groups[2], &macros),
                        close_tag: self.replace_inline(&groups[4], &macros),
                        spans: groups[3] == "|",
                    };
                    tracing::debug!(quote = %def.quote, "Quote defined");
                    self.quotes.set(def);
                }
                String::new()
            }
            LineBlockKind::ReplacementDefinition => {
                if !safe_mode.is_enabled() {
                    let template = self.replace_inline(&groups[3], &macros);
                    match self.replacements.set(&groups[1], &groups[2], template) {
                        Ok(()) => tracing::debug!(pattern = %groups[1], "Replacement defined"),
                        Err(e) => {
                            tracing::debug!(error = %e, "Invalid replacement pattern");
                            self.error(format!(
                                "illegal replacement regular expression: {}",
                                groups[1]
                            ));
                        }
                    }
                }
                String::new()
            }
            LineBlockKind::MacroDefinition => {
                if !safe_mode.skip_macro_defs() {
                    let (value, kind) = if groups[3].is_empty() && !groups[0].ends_with('`') {
                        (&groups[2], ValueKind::Literal)
                    } else {
                        (&groups[3], ValueKind::Expression)
                    };
                    let value = self.replace_inline(value, &macros);
                    self.set_macro(&groups[1], value, kind);
                }
                String::new()
            }
            LineBlockKind::Header => {
                let text = header_text(&groups[1], &groups[2]).to_owned();
                groups[1] = groups[1].chars().count().to_string();
                groups[2] = text;
                let header_ids = self.macros.get("--header-ids").unwrap_or_default();
                if !header_ids.trim().is_empty() && self.attributes.id.is_empty() {
                    self.attributes.id = self.attributes.slugify(&groups[2]);
                }
                self.replace_match(&groups, kind.template(), macros)
            }
            LineBlockKind::Anchor if safe_mode.skip_block_attributes() => String::new(),
            LineBlockKind::Comment
            | LineBlockKind::Image
            | LineBlockKind::ImageSrc
            | LineBlockKind::Anchor => self.replace_match(&groups, kind.template(), macros),
            LineBlockKind::ApiOption => {
                let name = &groups[1];
                if !matches!(name.as_str(), "safeMode" | "htmlReplacement" | "reset") {
                    self.error(format!("illegal API option name: {name}"));
                } else if !safe_mode.is_enabled() {
                    let value = self.replace_inline(&groups[2], &macros);
                    if let Err(e) = self.set_option(name, &value) {
                        self.error(e.to_string());
                    }
                }
                String::new()
            }
        }
    }

    /// Inject pending block attributes into `tag` and consume them.
    pub(crate) fn inject_attributes(&mut self, tag: &str) -> String {
        self.inject_attributes_with(tag, true)
    }

    pub(crate) fn inject_attributes_with(&mut self, tag: &str, consume: bool) -> String {
        let (result, message) = self.attributes.inject(tag, consume);
        if let Some(message) = message {
            self.error(message);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn render_lines(renderer: &mut Renderer<'_>, text: &str) -> String {
        let mut reader = Reader::new(text);
        let mut writer = Writer::new();
        while !reader.at_end() && renderer.render_line_block(&mut reader, &mut writer, &[]) {}
        writer.to_string()
    }

    #[test]
    fn test_header_text() {
        assert_eq!(header_text("##", "Title ##"), "Title");
        assert_eq!(header_text("##", "Title ## x ##"), "Title ## x");
        assert_eq!(header_text("#", "Title#"), "Title#");
        assert_eq!(header_text("#", "#"), "#");
    }

    #[test]
    fn test_headers() {
        let mut renderer = Renderer::new();

        assert_eq!(
            render_lines(&mut renderer, "# Title\n== *Sub* =="),
            "<h1>Title</h1>\n<h2><em>Sub</em></h2>"
        );
    }

    #[test]
    fn test_header_ids() {
        let mut renderer = Renderer::new();

        assert_eq!(
            render_lines(&mut renderer, "{--header-ids}='true'\n# Hello World\n# Hello World"),
            "<h1 id=\"hello-world\">Hello World</h1>\n<h1 id=\"hello-world-2\">Hello World</h1>"
        );
    }

    #[test]
    fn test_comment_and_images() {
        let mut renderer = Renderer::new();

        assert_eq!(
            render_lines(&mut renderer, "// comment\n<image:a.png|A & B>\n<image:b.png>"),
            "<img src=\"a.png\" alt=\"A &amp; B\">\n<img src=\"b.png\" alt=\"b.png\">"
        );
    }

    #[test]
    fn test_block_anchor() {
        let mut renderer = Renderer::new();

        assert_eq!(render_lines(&mut renderer, "<<#x1>>"), "<div id=\"x1\"></div>");
    }

    #[test]
    fn test_definitions_produce_no_output() {
        let mut renderer = Renderer::new();
        let html = render_lines(
            &mut renderer,
            "{x} = 'X'\n|code| = '<pre>|</pre>'\n= = '<mark>|</mark>'\n/\\.{3}/g = '&hellip;'",
        );

        assert_eq!(html, "");
        assert_eq!(renderer.macros.get("x"), Some("X"));
        assert_eq!(renderer.render_spans("=a= ..."), "<mark>a</mark> &hellip;");
    }

    #[test]
    fn test_macro_line_inserts_lines() {
        let mut renderer = Renderer::new();
        renderer.macros.set("h", "# One\n## Two".to_owned());

        assert_eq!(
            render_lines(&mut renderer, "{h}"),
            "<h1>One</h1>\n<h2>Two</h2>"
        );
    }

    #[test]
    fn test_escaped_header_not_rendered() {
        let mut renderer = Renderer::new();
        let mut reader = Reader::new("\\# Not a header");
        let mut writer = Writer::new();

        assert!(!renderer.render_line_block(&mut reader, &mut writer, &[]));
        assert_eq!(reader.cursor(), "# Not a header");
    }

    #[test]
    fn test_attributes_apply_to_next_line_block() {
        let mut renderer = Renderer::new();

        assert_eq!(
            render_lines(&mut renderer, ".big #top\n# Title"),
            "<h1 class=\"big\" id=\"top\">Title</h1>"
        );
    }

    #[test]
    fn test_allowed_filter() {
        let mut renderer = Renderer::new();
        let mut reader = Reader::new("# Title");
        let mut writer = Writer::new();

        assert!(!renderer.render_line_block(&mut reader, &mut writer, &["attributes"]));
    }

    #[test]
    fn test_definitions_ignored_in_safe_mode() {
        let mut renderer = Renderer::new();
        renderer.options.safe_mode = crate::SafeMode::new(1).unwrap();
        render_lines(&mut renderer, "{x} = 'X'\n/a/ = 'b'");

        assert_eq!(renderer.macros.get("x"), None);
        assert_eq!(renderer.render_spans("a"), "a");
    }

    #[test]
    fn test_api_option_line() {
        let messages = RefCell::new(Vec::new());
        let mut renderer = Renderer::new();
        renderer.set_callback(|d| messages.borrow_mut().push(d.message.clone()));

        render_lines(&mut renderer, ".htmlReplacement = 'XXX'\n.bogus = 'x'\n.safeMode = '99'");

        assert_eq!(renderer.options.html_replacement, "XXX");
        assert_eq!(
            *messages.borrow(),
            vec![
                "illegal API option name: bogus",
                "illegal safeMode API option value: 99"
            ]
        );
    }

    #[test]
    fn test_illegal_replacement_pattern() {
        let messages = RefCell::new(Vec::new());
        let mut renderer = Renderer::new();
        renderer.set_callback(|d| messages.borrow_mut().push(d.message.clone()));

        render_lines(&mut renderer, "/(/ = 'x'");

        assert_eq!(
            *messages.borrow(),
            vec!["illegal replacement regular expression: ("]
        );
    }
}
