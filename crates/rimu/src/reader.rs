//! Line cursor over source text.
//!
//! The reader owns the remaining lines as a stack whose top is the current
//! line, so advancing and inserting lines ahead of the cursor (used by macro
//! lines that expand to several lines) never shifts the whole buffer.

use regex::Regex;

/// Marks a saved replacement fragment inside span text.
pub(crate) const REPLACED_PLACEHOLDER: char = '\u{0}';
/// Marks a saved fragment that is restored from its verbatim source text.
pub(crate) const VERBATIM_PLACEHOLDER: char = '\u{1}';
/// Lines containing this character are dropped after macro expansion.
pub(crate) const DELETE_LINE_FLAG: char = '\u{2}';

/// Pattern that ends a multi-line read.
#[derive(Debug, Clone, Copy)]
pub(crate) enum LinePattern<'a> {
    /// Line matches the regular expression; capture group 1 (if it
    /// participates) is kept as the last collected line.
    Regex(&'a Regex),
    /// Line is exactly this delimiter.
    Exact(&'a str),
}

impl LinePattern<'_> {
    /// Returns `None` if the line does not match, otherwise the captured
    /// group 1 text (if any).
    fn matches(&self, line: &str) -> Option<Option<String>> {
        match self {
            Self::Regex(regex) => regex
                .captures(line)
                .map(|caps| caps.get(1).map(|m| m.as_str().to_owned())),
            Self::Exact(delimiter) => (line == *delimiter).then_some(None),
        }
    }
}

/// Forward cursor over the lines of a document.
#[derive(Debug)]
pub(crate) struct Reader {
    /// Remaining lines in reverse order; the last element is the cursor.
    pending: Vec<String>,
}

impl Reader {
    /// Create a reader over `text`.
    ///
    /// Reserved placeholder characters are replaced with spaces and the text
    /// is split on `\r\n`, `\r` or `\n`.
    pub(crate) fn new(text: &str) -> Self {
        let text = text.replace(
            [REPLACED_PLACEHOLDER, VERBATIM_PLACEHOLDER, DELETE_LINE_FLAG],
            " ",
        );
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let pending = text.split('\n').rev().map(str::to_owned).collect();
        Self { pending }
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pending.is_empty()
    }

    /// Current line. Returns an empty string past the end of input.
    pub(crate) fn cursor(&self) -> &str {
        debug_assert!(!self.at_end(), "cursor read past end of input");
        self.pending.last().map_or("", String::as_str)
    }

    /// Replace the current line.
    pub(crate) fn set_cursor(&mut self, line: impl Into<String>) {
        if let Some(current) = self.pending.last_mut() {
            *current = line.into();
        }
    }

    /// Advance to the next line. No-op at end of input.
    pub(crate) fn next(&mut self) {
        self.pending.pop();
    }

    /// Insert `lines` immediately after the current line.
    pub(crate) fn insert_ahead<I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: DoubleEndedIterator,
    {
        let current = self.pending.pop();
        self.pending.extend(lines.into_iter().rev());
        if let Some(current) = current {
            self.pending.push(current);
        }
    }

    /// Skip lines that are empty or whitespace only.
    pub(crate) fn skip_blank_lines(&mut self) {
        while !self.at_end() && self.cursor().trim().is_empty() {
            self.next();
        }
    }

    /// Collect lines up to, but not including, the first line matching
    /// `pattern`.
    ///
    /// The cursor is left on the matching line, or at end of input if no
    /// line matched.
    pub(crate) fn read_until(&mut self, pattern: LinePattern<'_>) -> Vec<String> {
        let mut lines = Vec::new();
        while !self.at_end() {
            if let Some(captured) = pattern.matches(self.cursor()) {
                if let Some(captured) = captured {
                    lines.push(captured);
                }
                break;
            }
            lines.push(self.cursor().to_owned());
            self.next();
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(reader: &mut Reader) -> Vec<String> {
        let mut lines = Vec::new();
        while !reader.at_end() {
            lines.push(reader.cursor().to_owned());
            reader.next();
        }
        lines
    }

    #[test]
    fn test_splits_all_line_endings() {
        let mut reader = Reader::new("a\r\nb\rc\nd");

        assert_eq!(collect(&mut reader), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_empty_text_has_one_line() {
        let mut reader = Reader::new("");

        assert_eq!(collect(&mut reader), vec![""]);
    }

    #[test]
    fn test_placeholders_replaced_with_spaces() {
        let reader = Reader::new("a\u{0}b\u{1}c\u{2}d");

        assert_eq!(reader.cursor(), "a b c d");
    }

    #[test]
    fn test_insert_ahead() {
        let mut reader = Reader::new("one\nfour");
        reader.insert_ahead(vec!["two".to_owned(), "three".to_owned()]);

        assert_eq!(collect(&mut reader), vec!["one", "two", "three", "four"]);
    }

    #[test]
    fn test_set_cursor() {
        let mut reader = Reader::new("\\# x\ny");
        reader.set_cursor("# x");

        assert_eq!(collect(&mut reader), vec!["# x", "y"]);
    }

    #[test]
    fn test_skip_blank_lines() {
        let mut reader = Reader::new("\n   \n\t\nText");
        reader.skip_blank_lines();

        assert_eq!(reader.cursor(), "Text");
    }

    #[test]
    fn test_read_until_regex_keeps_group() {
        let close = Regex::new(r"^(.*)'$").unwrap();
        let mut reader = Reader::new("a\nb'\nc");

        let lines = reader.read_until(LinePattern::Regex(&close));

        assert_eq!(lines, vec!["a", "b"]);
        assert_eq!(reader.cursor(), "b'");
    }

    #[test]
    fn test_read_until_exact() {
        let mut reader = Reader::new("code\n--\nafter");

        let lines = reader.read_until(LinePattern::Exact("--"));

        assert_eq!(lines, vec!["code"]);
        assert_eq!(reader.cursor(), "--");
    }

    #[test]
    fn test_read_until_unterminated_reaches_end() {
        let mut reader = Reader::new("x\ny");

        let lines = reader.read_until(LinePattern::Exact("--"));

        assert_eq!(lines, vec!["x", "y"]);
        assert!(reader.at_end());
    }
}
