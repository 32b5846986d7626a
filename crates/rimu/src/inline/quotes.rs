//! Quote definitions and quoted-span matching.

use std::ops::Range;

/// A quote pair such as `*emphasis*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QuoteDefinition {
    /// One or two character quote.
    pub(crate) quote: String,
    pub(crate) open_tag: String,
    pub(crate) close_tag: String,
    /// Render spans inside the quoted text; otherwise it is verbatim.
    pub(crate) spans: bool,
}

impl QuoteDefinition {
    fn new(quote: &str, open_tag: &str, close_tag: &str, spans: bool) -> Self {
        Self {
            quote: quote.to_owned(),
            open_tag: open_tag.to_owned(),
            close_tag: close_tag.to_owned(),
            spans,
        }
    }
}

/// A quote occurrence found in text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QuoteMatch {
    /// Start of the match (the escaping backslash, if any).
    pub(crate) start: usize,
    /// The opening quote is preceded by a backslash.
    pub(crate) escaped: bool,
    /// Index into the quote table.
    pub(crate) index: usize,
    /// The quoted text.
    pub(crate) content: Range<usize>,
    /// End of the closing quote.
    pub(crate) end: usize,
}

/// Ordered quote table.
///
/// Two character quotes precede one character quotes so that `**` is tried
/// before `*`.
#[derive(Debug, Clone)]
pub(crate) struct Quotes {
    defs: Vec<QuoteDefinition>,
}

impl Default for Quotes {
    fn default() -> Self {
        Self {
            defs: vec![
                QuoteDefinition::new("**", "<strong>", "</strong>", true),
                QuoteDefinition::new("*", "<em>", "</em>", true),
                QuoteDefinition::new("__", "<strong>", "</strong>", true),
                QuoteDefinition::new("_", "<em>", "</em>", true),
                QuoteDefinition::new("``", "<code>", "</code>", false),
                QuoteDefinition::new("`", "<code>", "</code>", false),
                QuoteDefinition::new("~~", "<del>", "</del>", true),
            ],
        }
    }
}

impl Quotes {
    pub(crate) fn get(&self, index: usize) -> Option<&QuoteDefinition> {
        self.defs.get(index)
    }

    /// Add a quote or update an existing one.
    pub(crate) fn set(&mut self, def: QuoteDefinition) {
        if let Some(existing) = self.defs.iter_mut().find(|d| d.quote == def.quote) {
            *existing = def;
        } else if def.quote.chars().count() == 2 {
            self.defs.insert(0, def);
        } else {
            self.defs.push(def);
        }
    }

    /// Find the first quoted span at or after `from`.
    ///
    /// Quoted text must not start with whitespace and must not end with
    /// whitespace or a backslash; the shortest closing quote wins.
    pub(crate) fn find(&self, text: &str, from: usize) -> Option<QuoteMatch> {
        for (offset, ch) in text[from..].char_indices() {
            let start = from + offset;
            let candidates = if ch == '\\' {
                [Some((start + 1, true)), Some((start, false))]
            } else {
                [Some((start, false)), None]
            };
            for (quote_start, escaped) in candidates.into_iter().flatten() {
                for (index, def) in self.defs.iter().enumerate() {
                    if !text[quote_start..].starts_with(&def.quote) {
                        continue;
                    }
                    let content_start = quote_start + def.quote.len();
                    if let Some(content_end) = closing_quote(text, content_start, &def.quote) {
                        return Some(QuoteMatch {
                            start,
                            escaped,
                            index,
                            content: content_start..content_end,
                            end: content_end + def.quote.len(),
                        });
                    }
                }
            }
        }
        None
    }

    /// Remove the backslash from escaped quotes.
    pub(crate) fn unescape(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(pos) = rest.find('\\') {
            result.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            match self.defs.iter().find(|d| after.starts_with(&d.quote)) {
                Some(def) => {
                    result.push_str(&def.quote);
                    rest = &after[def.quote.len()..];
                }
                None => {
                    result.push('\\');
                    rest = after;
                }
            }
        }
        result.push_str(rest);
        result
    }
}

/// Position of the closing `quote` for text starting at `content_start`.
fn closing_quote(text: &str, content_start: usize, quote: &str) -> Option<usize> {
    let first = text[content_start..].chars().next()?;
    if first.is_whitespace() {
        return None;
    }
    let step = quote.chars().next().map_or(1, char::len_utf8);
    let mut search = content_start + first.len_utf8();
    while let Some(offset) = text[search..].find(quote) {
        let end = search + offset;
        let last = text[..end].chars().next_back()?;
        if !last.is_whitespace() && last != '\\' {
            return Some(end);
        }
        search = end + step;
    }
    None
}
