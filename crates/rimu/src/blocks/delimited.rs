//! Multi-line block elements.
//!
//! A delimited block starts at a line matching its opening pattern and ends
//! at its closing pattern (or end of input). Division, quote and code blocks
//! close on the exact opening delimiter; the paragraph family closes on a
//! blank line.

use std::sync::LazyLock;

use regex::Regex;

use crate::Renderer;
use crate::attributes::ExpansionOptions;
use crate::error::RenderError;
use crate::inline::group_values;
use crate::macros::{
    EXPRESSION_DEF_CLOSE, EXPRESSION_DEF_OPEN, LITERAL_DEF_CLOSE, LITERAL_DEF_OPEN, ValueKind,
};
use crate::reader::{LinePattern, Reader};
use crate::writer::Writer;

static COMMENT_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\\?/\*+$").unwrap());

static COMMENT_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\*+/$").unwrap());

static DIVISION_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\?(\.{2,})([\w\s-]*)$").unwrap());

static QUOTE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\\?("{2,}|>{2,})([\w\s-]*)$"#).unwrap());

static CODE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\?(-{2,}|`{2,})([\w\s-]*)$").unwrap());

/// HTML comment, DOCTYPE, or block level start or end tag. Group 2 is the
/// tag name.
static HTML_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(<!--.*|<!DOCTYPE(?:\s.*)?|</?([a-z][a-z0-9]*)(?:[\s>].*)?)$").unwrap()
});

static INLINE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(a|abbr|acronym|address|b|bdi|bdo|big|blockquote|br|cite|code|del|dfn|em|i|img|ins|kbd|mark|q|s|samp|small|span|strike|strong|sub|sup|time|tt|u|var|wbr)$",
    )
    .unwrap()
});

static INDENTED_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\?(\s+\S.*)$").unwrap());

static QUOTE_PARAGRAPH_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\?(>.*)$").unwrap());

static PARAGRAPH_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(.*)").unwrap());

/// Blank line.
static BLANK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^$").unwrap());

static MACRO_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{([\w\-]+\??)\}").unwrap());

static LINE_CONTINUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"' *\\\n").unwrap());

static ESCAPED_LINE_CONTINUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(' *\\+)\\\n").unwrap());

/// Delimited block definition value: `<open>|<close> +options`.
static DEFINITION_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(<[a-zA-Z].*>)\|(<[a-zA-Z/].*>))?\s*([+-][ \w+-]+)?$").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockKind {
    MacroDefinition,
    MacroExpression,
    Comment,
    Division,
    Quote,
    Code,
    Html,
    Indented,
    QuoteParagraph,
    Paragraph,
}

impl BlockKind {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::MacroDefinition => "macro-definition",
            Self::MacroExpression => "deprecated-macro-expression",
            Self::Comment => "comment",
            Self::Division => "division",
            Self::Quote => "quote",
            Self::Code => "code",
            Self::Html => "html",
            Self::Indented => "indented",
            Self::QuoteParagraph => "quote-paragraph",
            Self::Paragraph => "paragraph",
        }
    }

    fn open_pattern(self) -> &'static Regex {
        match self {
            Self::MacroDefinition => &LITERAL_DEF_OPEN,
            Self::MacroExpression => &EXPRESSION_DEF_OPEN,
            Self::Comment => &COMMENT_OPEN,
            Self::Division => &DIVISION_OPEN,
            Self::Quote => &QUOTE_OPEN,
            Self::Code => &CODE_OPEN,
            Self::Html => &HTML_OPEN,
            Self::Indented => &INDENTED_OPEN,
            Self::QuoteParagraph => &QUOTE_PARAGRAPH_OPEN,
            Self::Paragraph => &PARAGRAPH_OPEN,
        }
    }

    /// Blocks that close on a repeat of their opening delimiter and take
    /// class names after it.
    fn closes_on_delimiter(self) -> bool {
        matches!(self, Self::Division | Self::Quote | Self::Code)
    }

    fn close_pattern(self) -> &'static Regex {
        match self {
            Self::MacroDefinition => &LITERAL_DEF_CLOSE,
            Self::MacroExpression => &EXPRESSION_DEF_CLOSE,
            Self::Comment => &COMMENT_CLOSE,
            _ => &BLANK,
        }
    }

    /// Blocks whose missing closing delimiter is reported.
    fn reports_unterminated(self) -> bool {
        matches!(self, Self::Code | Self::Comment | Self::Division | Self::Quote)
    }
}

/// A delimited block definition. Tags and expansion options can be
/// redefined with `|name| = '<open>|<close> +options'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DelimitedBlock {
    pub(crate) kind: BlockKind,
    pub(crate) open_tag: String,
    pub(crate) close_tag: String,
    pub(crate) expansion: ExpansionOptions,
}

impl DelimitedBlock {
    fn new(kind: BlockKind, open_tag: &str, close_tag: &str, expansion: ExpansionOptions) -> Self {
        Self {
            kind,
            open_tag: open_tag.to_owned(),
            close_tag: close_tag.to_owned(),
            expansion,
        }
    }
}

/// Default delimited blocks in match priority order.
pub(crate) fn default_blocks() -> Vec<DelimitedBlock> {
    let options = |macros, container, skip, spans, specials| ExpansionOptions {
        macros,
        container,
        skip,
        spans,
        specials,
    };
    let t = Some(true);
    let f = Some(false);
    vec![
        DelimitedBlock::new(
            BlockKind::MacroDefinition,
            "",
            "",
            options(t, None, None, None, None),
        ),
        DelimitedBlock::new(
            BlockKind::MacroExpression,
            "",
            "",
            options(t, None, None, None, None),
        ),
        DelimitedBlock::new(BlockKind::Comment, "", "", options(None, None, t, None, t)),
        DelimitedBlock::new(
            BlockKind::Division,
            "<div>",
            "</div>",
            options(None, t, None, None, t),
        ),
        DelimitedBlock::new(
            BlockKind::Quote,
            "<blockquote>",
            "</blockquote>",
            options(None, t, None, None, t),
        ),
        DelimitedBlock::new(
            BlockKind::Code,
            "<pre><code>",
            "</code></pre>",
            options(f, None, None, None, t),
        ),
        DelimitedBlock::new(BlockKind::Html, "", "", options(t, None, None, None, None)),
        DelimitedBlock::new(
            BlockKind::Indented,
            "<pre><code>",
            "</code></pre>",
            options(f, None, None, None, t),
        ),
        DelimitedBlock::new(
            BlockKind::QuoteParagraph,
            "<blockquote><p>",
            "</p></blockquote>",
            options(t, None, None, t, t),
        ),
        DelimitedBlock::new(
            BlockKind::Paragraph,
            "<p>",
            "</p>",
            options(t, None, None, t, t),
        ),
    ]
}

/// Strip the common indent: each line loses up to the first line's indent.
fn strip_indent(text: &str) -> String {
    let leading = |line: &str| {
        line.char_indices()
            .find(|(_, c)| !c.is_whitespace())
            .map_or(line.len(), |(i, _)| i)
    };
    let first_indent = text
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map_or(0, |(i, _)| text[..i].chars().count());
    text.split('\n')
        .map(|line| {
            let indent = leading(line);
            let chars = line[..indent].chars().count().min(first_indent);
            let at = line.char_indices().nth(chars).map_or(line.len(), |(i, _)| i);
            &line[at..]
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip the leading `>` from each line and unescape a leading `\>`.
fn strip_quote_prefix(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            let line = line.strip_prefix('>').unwrap_or(line);
            match line.strip_prefix("\\>") {
                Some(rest) => format!(">{rest}"),
                None => line.to_owned(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl Renderer<'_> {
    /// Render the delimited block at the cursor.
    ///
    /// `allowed` restricts the definitions tried by name; an empty slice
    /// allows all. Returns `false` if no definition matched.
    pub(crate) fn render_delimited_block(
        &mut self,
        reader: &mut Reader,
        writer: &mut Writer,
        allowed: &[&str],
    ) -> Result<bool, RenderError> {
        for index in 0..self.blocks.len() {
            let Some(def) = self.blocks.get(index).cloned() else {
                break;
            };
            let kind = def.kind;
            if !allowed.is_empty() && !allowed.contains(&kind.name()) {
                continue;
            }
            let line = reader.cursor().to_owned();
            let Some(caps) = kind.open_pattern().captures(&line) else {
                continue;
            };
            let groups = group_values(&caps);
            if groups[0].starts_with('\\') && kind != BlockKind::Paragraph {
                reader.set_cursor(&line[1..]);
                continue;
            }
            if !verify_block(kind, &groups) {
                continue;
            }
            tracing::trace!(block = kind.name(), "Delimited block");

            let mut lines = Vec::new();
            let close = if kind.closes_on_delimiter() {
                let classes = groups[2].trim();
                if !classes.is_empty() {
                    self.attributes.classes = classes.to_owned();
                }
                LinePattern::Exact(&groups[1])
            } else {
                if kind != BlockKind::Comment && !groups[1].trim().is_empty() {
                    lines.push(groups[1].clone());
                }
                LinePattern::Regex(kind.close_pattern())
            };

            reader.next();
            let content = reader.read_until(close);
            if reader.at_end() && kind.reports_unterminated() {
                self.error(format!(
                    "unterminated {} block: {}",
                    kind.name(),
                    groups[0]
                ));
            }
            lines.extend(content);
            reader.next();

            let mut expansion = ExpansionOptions::default();
            expansion.merge(&def.expansion);
            expansion.merge(&self.attributes.options);
            if expansion.skip() {
                self.attributes.clear_pending();
            } else {
                self.write_block(&def, &groups, &lines.join("\n"), &expansion, reader, writer)?;
            }
            self.attributes.options = ExpansionOptions::default();
            return Ok(true);
        }
        Ok(false)
    }

    fn write_block(
        &mut self,
        def: &DelimitedBlock,
        groups: &[String],
        text: &str,
        expansion: &ExpansionOptions,
        reader: &Reader,
        writer: &mut Writer,
    ) -> Result<(), RenderError> {
        let mut text = match def.kind {
            BlockKind::MacroDefinition => {
                self.define_macro_block(groups, text, ValueKind::Literal, expansion)
            }
            BlockKind::MacroExpression => {
                self.define_macro_block(groups, text, ValueKind::Expression, expansion)
            }
            BlockKind::Html => self.options.html_filter(text),
            BlockKind::Indented => strip_indent(text),
            BlockKind::QuoteParagraph => strip_quote_prefix(text),
            _ => text.to_owned(),
        };
        let mut open_tag = def.open_tag.clone();
        if def.kind == BlockKind::Html {
            text = self.inject_attributes(&text);
        } else {
            open_tag = self.inject_attributes(&open_tag);
        }
        if expansion.container() {
            self.attributes.options.container = None;
            text = self.render_document(&text)?;
        } else {
            text = self.replace_inline(&text, expansion);
        }
        let mut close_tag = def.close_tag.clone();
        if def.kind == BlockKind::Division && open_tag == "<div>" {
            open_tag.clear();
            close_tag.clear();
        }
        let blank = format!("{open_tag}{text}{close_tag}").trim().is_empty();
        writer.write(open_tag);
        writer.write(text);
        writer.write(close_tag);
        if !reader.at_end() && !blank {
            writer.write("\n");
        }
        Ok(())
    }

    /// Define a macro from a multi-line definition block. Produces no output.
    fn define_macro_block(
        &mut self,
        groups: &[String],
        text: &str,
        kind: ValueKind,
        expansion: &ExpansionOptions,
    ) -> String {
        let Some(name) = MACRO_NAME
            .captures(&groups[0])
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_owned())
        else {
            return String::new();
        };
        let value = LINE_CONTINUATION.replace_all(text, "'\n");
        let value = ESCAPED_LINE_CONTINUATION.replace_all(&value, "$1\n");
        let value = self.replace_inline(&value, expansion);
        self.set_macro(&name, value, kind);
        String::new()
    }

    /// Update the tags and expansion options of a named delimited block.
    pub(crate) fn set_block_definition(&mut self, name: &str, value: &str) {
        let Some(index) = self.blocks.iter().position(|b| b.kind.name() == name) else {
            self.error(format!("illegal delimited block name: {name}: |{name}|='{value}'"));
            return;
        };
        let Some(caps) = DEFINITION_VALUE.captures(value.trim()) else {
            self.error(format!(
                "illegal delimited block definition: |{name}|='{value}'"
            ));
            return;
        };
        let safe_mode = self.options.safe_mode;
        let mut messages = Vec::new();
        if let Some(block) = self.blocks.get_mut(index) {
            if let (Some(open), Some(close)) = (caps.get(1), caps.get(2)) {
                block.open_tag = open.as_str().to_owned();
                block.close_tag = close.as_str().to_owned();
            }
            if let Some(options) = caps.get(3) {
                messages = block.expansion.parse(options.as_str(), safe_mode);
            }
        }
        tracing::debug!(name, "Delimited block redefined");
        for message in messages {
            self.error(message);
        }
    }
}

/// Extra checks after the opening pattern matched.
fn verify_block(kind: BlockKind, groups: &[String]) -> bool {
    match kind {
        // The `-` code delimiter does not take class names.
        BlockKind::Code => !(groups[1].starts_with('-') && !groups[2].trim().is_empty()),
        BlockKind::Html => groups[2].is_empty() || !INLINE_TAG.is_match(&groups[2]),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;

    use super::*;

    fn render_blocks(renderer: &mut Renderer<'_>, text: &str) -> String {
        let mut reader = Reader::new(text);
        let mut writer = Writer::new();
        while !reader.at_end() {
            reader.skip_blank_lines();
            if reader.at_end() {
                break;
            }
            renderer
                .render_delimited_block(&mut reader, &mut writer, &[])
                .unwrap();
        }
        writer.to_string()
    }

    #[test]
    fn test_strip_indent() {
        assert_eq!(strip_indent("  a\n    b\n c"), "a\n  b\nc");
    }

    #[test]
    fn test_strip_quote_prefix() {
        assert_eq!(strip_quote_prefix(">a\nb\n>\\>c"), "a\nb\n>c");
    }

    #[test]
    fn test_paragraph() {
        let mut renderer = Renderer::new();

        assert_eq!(
            render_blocks(&mut renderer, "Hello *World*\nline 2\n\nNext"),
            "<p>Hello <em>World</em>\nline 2</p>\n<p>Next</p>"
        );
    }

    #[test]
    fn test_code_block() {
        let mut renderer = Renderer::new();

        assert_eq!(
            render_blocks(&mut renderer, "``\n<a> *b*\n``"),
            "<pre><code>&lt;a&gt; *b*</code></pre>"
        );
    }

    #[test]
    fn test_code_block_class_names() {
        let mut renderer = Renderer::new();

        assert_eq!(
            render_blocks(&mut renderer, "``` js\nx\n```"),
            "<pre class=\"js\"><code>x</code></pre>"
        );
    }

    #[test]
    fn test_dash_code_delimiter_rejects_classes() {
        let mut renderer = Renderer::new();

        assert_eq!(render_blocks(&mut renderer, "-- js"), "<p>-- js</p>");
    }

    #[test]
    fn test_unterminated_code_block() {
        let messages = RefCell::new(Vec::new());
        let mut renderer = Renderer::new();
        renderer.set_callback(|d| messages.borrow_mut().push(d.message.clone()));

        let html = render_blocks(&mut renderer, "--\nsome code");

        assert_eq!(html, "<pre><code>some code</code></pre>");
        assert_eq!(*messages.borrow(), vec!["unterminated code block: --"]);
    }

    #[test]
    fn test_comment_block_skipped() {
        let mut renderer = Renderer::new();

        assert_eq!(render_blocks(&mut renderer, "/*\nhidden\n*/\nShown"), "<p>Shown</p>");
    }

    #[test]
    fn test_division_without_attributes_drops_tags() {
        let mut renderer = Renderer::new();

        assert_eq!(render_blocks(&mut renderer, "..\nText\n.."), "<p>Text</p>");
    }

    #[test]
    fn test_division_with_class() {
        let mut renderer = Renderer::new();

        assert_eq!(
            render_blocks(&mut renderer, ".. note\nText\n.."),
            "<div class=\"note\"><p>Text</p></div>"
        );
    }

    #[test]
    fn test_quote_block() {
        let mut renderer = Renderer::new();

        assert_eq!(
            render_blocks(&mut renderer, "\"\"\nQuoted\n\"\""),
            "<blockquote><p>Quoted</p></blockquote>"
        );
    }

    #[test]
    fn test_html_block() {
        let mut renderer = Renderer::new();

        assert_eq!(
            render_blocks(&mut renderer, "<div>\n*x*\n</div>"),
            "<div>\n*x*\n</div>"
        );
    }

    #[test]
    fn test_inline_tag_is_not_html_block() {
        let mut renderer = Renderer::new();

        assert_eq!(render_blocks(&mut renderer, "<b>bold</b>"), "<p><b>bold</b></p>");
    }

    #[test]
    fn test_html_block_safe_mode() {
        let mut renderer = Renderer::new();
        renderer.options.safe_mode = crate::SafeMode::new(2).unwrap();
        renderer.options.html_replacement = "XXX".to_owned();

        assert_eq!(render_blocks(&mut renderer, "<div>x</div>"), "XXX");
    }

    #[test]
    fn test_indented_paragraph() {
        let mut renderer = Renderer::new();

        assert_eq!(
            render_blocks(&mut renderer, "  a < b\n    c"),
            "<pre><code>a &lt; b\n  c</code></pre>"
        );
    }

    #[test]
    fn test_quote_paragraph() {
        let mut renderer = Renderer::new();

        assert_eq!(
            render_blocks(&mut renderer, "> *a*\n> b"),
            "<blockquote><p> <em>a</em>\n b</p></blockquote>"
        );
    }

    #[test]
    fn test_escaped_delimiter_is_paragraph() {
        let mut renderer = Renderer::new();

        assert_eq!(render_blocks(&mut renderer, "\\..\nx"), "<p>..\nx</p>");
    }

    #[test]
    fn test_multi_line_macro_definition() {
        let mut renderer = Renderer::new();
        let html = render_blocks(&mut renderer, "{m} = 'one\ntwo'");

        assert_eq!(html, "");
        assert_eq!(renderer.macros.get("m"), Some("one\ntwo"));
    }

    #[test]
    fn test_multi_line_macro_continuation() {
        let mut renderer = Renderer::new();
        render_blocks(&mut renderer, "{m} = 'a' \\\nb'");

        assert_eq!(renderer.macros.get("m"), Some("a'\nb"));
    }

    #[test]
    fn test_set_block_definition() {
        let mut renderer = Renderer::new();
        renderer.set_block_definition("paragraph", "<div class=\"para\">|</div> -spans");

        assert_eq!(
            render_blocks(&mut renderer, "*x* & y"),
            "<div class=\"para\">*x* &amp; y</div>"
        );
    }

    #[test]
    fn test_set_block_definition_errors() {
        let messages = RefCell::new(Vec::new());
        let mut renderer = Renderer::new();
        renderer.set_callback(|d| messages.borrow_mut().push(d.message.clone()));

        renderer.set_block_definition("nope", "<p>|</p>");
        renderer.set_block_definition("code", "bad");

        assert_eq!(
            *messages.borrow(),
            vec![
                "illegal delimited block name: nope: |nope|='<p>|</p>'",
                "illegal delimited block definition: |code|='bad'"
            ]
        );
    }

    #[test]
    fn test_skip_option_from_attributes() {
        let mut renderer = Renderer::new();
        renderer.attributes.options.skip = Some(true);
        renderer.attributes.classes = "c".to_owned();

        assert_eq!(render_blocks(&mut renderer, "gone\n\nkept"), "<p>kept</p>");
    }

    #[test]
    fn test_restricted_block_names() {
        let mut renderer = Renderer::new();
        let mut reader = Reader::new("plain text");
        let mut writer = Writer::new();

        let matched = renderer
            .render_delimited_block(&mut reader, &mut writer, &["indented", "quote-paragraph"])
            .unwrap();

        assert!(!matched);
    }
}
