//! Bulleted, numbered and definition lists.
//!
//! The list item marker (`-`, `+`, `*`..`****`, `.`..`....`, `::`..`::::`)
//! identifies the list an item belongs to. An item whose marker is not in the
//! stack of open lists starts a child list; one that is closes lists back to
//! its owner.

use std::sync::LazyLock;

use regex::Regex;

use crate::Renderer;
use crate::attributes::ExpansionOptions;
use crate::error::RenderError;
use crate::inline::group_values;
use crate::reader::Reader;
use crate::writer::Writer;

static UNORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\?\s*(-|\+|\*{1,4})\s+(.*)$").unwrap());

static ORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\?\s*\d*(\.{1,4})\s+(.*)$").unwrap());

/// `$1` is the term, `$2` the marker, `$3` the definition.
static DEFINITION_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\?\s*(.*[^:])(:{2,4})(|\s+.*)$").unwrap());

/// Delimited blocks that attach to an item without a blank line between.
const ATTACHED_BLOCKS: &[&str] = &["comment", "code", "division", "html", "quote"];

/// Delimited blocks that attach to an item after one blank line.
const INDENTED_BLOCKS: &[&str] = &["indented", "quote-paragraph"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
    Definition,
}

impl ListKind {
    const ALL: [Self; 3] = [Self::Unordered, Self::Ordered, Self::Definition];

    fn pattern(self) -> &'static Regex {
        match self {
            Self::Unordered => &UNORDERED_ITEM,
            Self::Ordered => &ORDERED_ITEM,
            Self::Definition => &DEFINITION_ITEM,
        }
    }

    fn list_tags(self) -> (&'static str, &'static str) {
        match self {
            Self::Unordered => ("<ul>", "</ul>"),
            Self::Ordered => ("<ol>", "</ol>"),
            Self::Definition => ("<dl>", "</dl>"),
        }
    }

    fn item_tags(self) -> (&'static str, &'static str) {
        match self {
            Self::Definition => ("<dd>", "</dd>"),
            _ => ("<li>", "</li>"),
        }
    }
}

/// A matched list item line.
#[derive(Debug, Clone)]
struct Item {
    kind: ListKind,
    /// List marker; items with equal markers belong to the same list.
    id: String,
    groups: Vec<String>,
}

impl Item {
    /// Text that follows the marker.
    fn text(&self) -> &str {
        self.groups.last().map_or("", String::as_str)
    }
}

impl Renderer<'_> {
    /// Render the list starting at the cursor. Returns `false` if the cursor
    /// is not on a list item.
    pub(crate) fn render_list(
        &mut self,
        reader: &mut Reader,
        writer: &mut Writer,
    ) -> Result<bool, RenderError> {
        let Some(start) = match_item(reader) else {
            return Ok(false);
        };
        self.list_ids.clear();
        self.render_list_items(start, reader, writer)?;
        debug_assert!(self.list_ids.is_empty());
        Ok(true)
    }

    /// Render items of the list `start` belongs to. Returns the first item
    /// that belongs to an enclosing list.
    fn render_list_items(
        &mut self,
        start: Item,
        reader: &mut Reader,
        writer: &mut Writer,
    ) -> Result<Option<Item>, RenderError> {
        self.list_ids.push(start.id.clone());
        let (open_tag, close_tag) = start.kind.list_tags();
        let open_tag = self.inject_attributes(open_tag);
        writer.write(open_tag);
        let mut current = start;
        loop {
            let next = self.render_list_item(&current, reader, writer)?;
            match next {
                Some(item) if item.id == current.id => current = item,
                next => {
                    writer.write(close_tag);
                    self.list_ids.pop();
                    return Ok(next);
                }
            }
        }
    }

    /// Render one item with its continuation lines, attached block and
    /// child list. Returns the next item, if any.
    fn render_list_item(
        &mut self,
        item: &Item,
        reader: &mut Reader,
        writer: &mut Writer,
    ) -> Result<Option<Item>, RenderError> {
        let (item_open, item_close) = item.kind.item_tags();
        if item.kind == ListKind::Definition {
            // The term takes the pending id, the definition everything else.
            let classes = std::mem::take(&mut self.attributes.classes);
            let css = std::mem::take(&mut self.attributes.css);
            let attributes = std::mem::take(&mut self.attributes.attributes);
            let dt = self.inject_attributes_with("<dt>", false);
            self.attributes.id.clear();
            writer.write(dt);
            let term = self.replace_inline(&item.groups[1], &ExpansionOptions::macros_and_spans());
            writer.write(term);
            writer.write("</dt>");
            self.attributes.classes = classes;
            self.attributes.css = css;
            self.attributes.attributes = attributes;
            let dd = self.inject_attributes(item_open);
            writer.write(dd);
        } else {
            let li = self.inject_attributes(item_open);
            writer.write(li);
        }

        let mut lines = vec![item.text().to_owned()];
        reader.next();
        let mut attached = Writer::new();
        let mut attached_done = false;
        let next = loop {
            let Some(blanks) = self.consume_block_attributes(reader, &mut attached) else {
                break None;
            };
            if blanks >= 2 {
                break None;
            }
            if let Some(next) = match_item(reader) {
                if self.list_ids.contains(&next.id) {
                    break Some(next);
                }
                break self.render_list_items(next, reader, &mut attached)?;
            }
            if attached_done {
                break None;
            }
            if blanks == 0 {
                let saved = std::mem::take(&mut self.list_ids);
                let rendered = self.render_delimited_block(reader, &mut attached, ATTACHED_BLOCKS);
                self.list_ids = saved;
                if rendered? {
                    attached_done = true;
                } else {
                    lines.push(reader.cursor().to_owned());
                    reader.next();
                }
            } else if self.render_delimited_block(reader, &mut attached, INDENTED_BLOCKS)? {
                attached_done = true;
            } else {
                break None;
            }
        };

        let text = lines.join("\n");
        let text = self.replace_inline(text.trim(), &ExpansionOptions::macros_and_spans());
        writer.write(text);
        writer.append(attached);
        writer.write(item_close);
        Ok(next)
    }

    /// Consume blank lines and block attributes lines.
    ///
    /// Returns the number of blank lines read, or `None` at end of input.
    fn consume_block_attributes(&mut self, reader: &mut Reader, writer: &mut Writer) -> Option<usize> {
        let mut blanks = 0;
        loop {
            if reader.at_end() {
                return None;
            }
            if self.render_line_block(reader, writer, &["attributes"]) {
                continue;
            }
            if !reader.cursor().is_empty() {
                return Some(blanks);
            }
            blanks += 1;
            reader.next();
        }
    }
}

/// Match the cursor line against the list item patterns.
///
/// An escaped item has its backslash removed and does not match.
fn match_item(reader: &mut Reader) -> Option<Item> {
    if reader.at_end() {
        return None;
    }
    for kind in ListKind::ALL {
        let line = reader.cursor().to_owned();
        let Some(caps) = kind.pattern().captures(&line) else {
            continue;
        };
        if line.starts_with('\\') {
            reader.set_cursor(&line[1..]);
            return None;
        }
        let groups = group_values(&caps);
        let id = groups[groups.len() - 2].clone();
        return Some(Item { kind, id, groups });
    }
    None
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn list(text: &str) -> String {
        let mut renderer = Renderer::new();
        let mut reader = Reader::new(text);
        let mut writer = Writer::new();
        assert!(renderer.render_list(&mut reader, &mut writer).unwrap());
        writer.to_string()
    }

    #[test]
    fn test_match_item() {
        let mut reader = Reader::new("  12. Item");
        let item = match_item(&mut reader).unwrap();

        assert_eq!(item.kind, ListKind::Ordered);
        assert_eq!(item.id, ".");
        assert_eq!(item.text(), "Item");
    }

    #[test]
    fn test_match_escaped_item() {
        let mut reader = Reader::new("\\- Not an item");

        assert!(match_item(&mut reader).is_none());
        assert_eq!(reader.cursor(), "- Not an item");
    }

    #[test]
    fn test_unordered_list() {
        assert_eq!(
            list("- Item *1*\n- Item 2"),
            "<ul><li>Item <em>1</em></li><li>Item 2</li></ul>"
        );
    }

    #[test]
    fn test_nested_lists() {
        assert_eq!(
            list("- Item 1\n- Item 2\n . Nested 1"),
            "<ul><li>Item 1</li><li>Item 2<ol><li>Nested 1</li></ol></li></ul>"
        );
    }

    #[test]
    fn test_return_to_parent_list() {
        assert_eq!(
            list("* a\n** b\n* c"),
            "<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul>"
        );
    }

    #[test]
    fn test_definition_list() {
        assert_eq!(
            list("Term *one*:: Definition\nterm 2::\n  more"),
            "<dl><dt>Term <em>one</em></dt><dd>Definition</dd><dt>term 2</dt><dd>more</dd></dl>"
        );
    }

    #[test]
    fn test_item_continuation_lines() {
        assert_eq!(list("- one\ntwo\n- three"), "<ul><li>one\ntwo</li><li>three</li></ul>");
    }

    #[test]
    fn test_two_blank_lines_end_list() {
        let mut renderer = Renderer::new();
        let mut reader = Reader::new("- a\n\n\n- b");
        let mut writer = Writer::new();
        renderer.render_list(&mut reader, &mut writer).unwrap();

        assert_eq!(writer.to_string(), "<ul><li>a</li></ul>");
        assert_eq!(reader.cursor(), "- b");
    }

    #[test]
    fn test_attached_code_block() {
        assert_eq!(
            list("- a\n``\nx < y\n``"),
            "<ul><li>a<pre><code>x &lt; y</code></pre></li></ul>"
        );
    }

    #[test]
    fn test_attached_indented_block() {
        assert_eq!(
            list("- a\n\n  code"),
            "<ul><li>a<pre><code>code</code></pre></li></ul>"
        );
    }

    #[test]
    fn test_blank_line_then_paragraph_ends_list() {
        let mut renderer = Renderer::new();
        let mut reader = Reader::new("- a\n\nPara");
        let mut writer = Writer::new();
        renderer.render_list(&mut reader, &mut writer).unwrap();

        assert_eq!(writer.to_string(), "<ul><li>a</li></ul>");
        assert_eq!(reader.cursor(), "Para");
    }

    #[test]
    fn test_item_attributes() {
        let mut renderer = Renderer::new();
        renderer.attributes.classes = "top".to_owned();
        let mut reader = Reader::new("- a\n.second\n- b");
        let mut writer = Writer::new();
        renderer.render_list(&mut reader, &mut writer).unwrap();

        assert_eq!(
            writer.to_string(),
            "<ul class=\"top\"><li>a</li><li class=\"second\">b</li></ul>"
        );
    }

    #[test]
    fn test_definition_item_attributes() {
        let mut renderer = Renderer::new();
        let mut reader = Reader::new("a:: b\n.cls #T1\nc:: d");
        let mut writer = Writer::new();
        renderer.render_list(&mut reader, &mut writer).unwrap();

        assert_eq!(
            writer.to_string(),
            "<dl><dt>a</dt><dd>b</dd><dt id=\"t1\">c</dt><dd class=\"cls\">d</dd></dl>"
        );
    }

    #[test]
    fn test_not_a_list() {
        let mut renderer = Renderer::new();
        let mut reader = Reader::new("Paragraph");
        let mut writer = Writer::new();

        assert!(!renderer.render_list(&mut reader, &mut writer).unwrap());
    }
}
