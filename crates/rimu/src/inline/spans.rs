//! Span rendering.
//!
//! Text is split into fragments at each replacement and quote. Fragments
//! that already hold output markup are flagged done and skip later passes.
//! Replacements run first and are swapped for placeholders so that quotes
//! cannot straddle them; the placeholders are restored at the end.

use super::{Replacement, ReplacementFilter, escape_html, group_values};
use crate::Renderer;
use crate::attributes::ExpansionOptions;
use crate::reader::{REPLACED_PLACEHOLDER, VERBATIM_PLACEHOLDER};

#[derive(Debug, Clone)]
struct Fragment {
    text: String,
    done: bool,
    /// Source text of a replacement, rendered when the replacement sits
    /// inside verbatim quoted text.
    verbatim: String,
}

impl Fragment {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: false,
            verbatim: String::new(),
        }
    }

    fn done(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: true,
            verbatim: String::new(),
        }
    }
}

impl Renderer<'_> {
    /// Render quotes and replacements in `source` and escape special
    /// characters in the remaining text.
    pub(crate) fn render_spans(&mut self, source: &str) -> String {
        let (text, saved) = self.pre_replacements(source);

        let mut fragments = Vec::new();
        self.frag_quotes(text, &mut fragments);
        let mut html = String::with_capacity(source.len());
        for fragment in &fragments {
            if fragment.done {
                html.push_str(&fragment.text);
            } else {
                html.push_str(&escape_html(&self.quotes.unescape(&fragment.text)));
            }
        }

        post_replacements(&html, saved)
    }

    /// Swap every replacement match for a placeholder, returning the
    /// placeholder text and the saved replacement fragments in order.
    fn pre_replacements(&mut self, text: &str) -> (String, Vec<Fragment>) {
        let mut fragments = vec![Fragment::text(text)];
        for index in 0..self.replacements.len() {
            let Some(def) = self.replacements.get(index).cloned() else {
                break;
            };
            let mut next = Vec::with_capacity(fragments.len());
            for fragment in fragments {
                if fragment.done {
                    next.push(fragment);
                } else {
                    self.frag_replacement(&fragment.text, &def, &mut next);
                }
            }
            fragments = next;
        }

        let mut result = String::with_capacity(text.len());
        let mut saved = Vec::new();
        for fragment in fragments {
            if fragment.done {
                result.push(REPLACED_PLACEHOLDER);
                saved.push(fragment);
            } else {
                result.push_str(&fragment.text);
            }
        }
        (result, saved)
    }

    fn frag_replacement(&mut self, text: &str, def: &Replacement, out: &mut Vec<Fragment>) {
        let mut rest = text;
        loop {
            let Some(caps) = def.regex.captures(rest) else {
                break;
            };
            let Some(whole) = caps.get(0) else {
                break;
            };
            let end = caps.name("ahead").map_or(whole.end(), |ahead| ahead.start());
            if end == whole.start() {
                // Zero width match: nothing to replace here, move on one character.
                let step = rest[end..].chars().next().map_or(0, char::len_utf8);
                if step == 0 {
                    break;
                }
                out.push(Fragment::text(&rest[..end + step]));
                rest = &rest[end + step..];
                continue;
            }
            let matched = &rest[whole.start()..end];
            out.push(Fragment::text(&rest[..whole.start()]));
            let replacement = if let Some(unescaped) = matched.strip_prefix('\\') {
                escape_html(unescaped)
            } else {
                match def.filter {
                    ReplacementFilter::Template => self.replace_match(
                        &group_values(&caps),
                        &def.template,
                        ExpansionOptions::default(),
                    ),
                    ReplacementFilter::Anchor => {
                        if self.options.safe_mode.skip_block_attributes() {
                            String::new()
                        } else {
                            self.replace_match(
                                &group_values(&caps),
                                &def.template,
                                ExpansionOptions::default(),
                            )
                        }
                    }
                    ReplacementFilter::Html => {
                        self.options.html_filter(caps.get(1).map_or("", |m| m.as_str()))
                    }
                    ReplacementFilter::Entity => {
                        caps.get(1).map_or_else(String::new, |m| m.as_str().to_owned())
                    }
                }
            };
            out.push(Fragment {
                text: replacement,
                done: true,
                verbatim: matched.to_owned(),
            });
            rest = &rest[end..];
        }
        out.push(Fragment::text(rest));
    }

    /// Split `text` at quotes, appending the fragments to `out`.
    fn frag_quotes(&self, text: String, out: &mut Vec<Fragment>) {
        let mut rest = text;
        loop {
            let mut from = 0;
            let found = loop {
                match self.quotes.find(&rest, from) {
                    None => {
                        out.push(Fragment::text(rest));
                        return;
                    }
                    Some(m) if m.escaped => {
                        from = m.content.start;
                    }
                    Some(m) => break m,
                }
            };
            let Some(def) = self.quotes.get(found.index).cloned() else {
                out.push(Fragment::text(rest));
                return;
            };

            let mut quoted = rest[found.content.clone()].to_owned();
            let mut next = found.end;
            if let Some(first) = def.quote.chars().next() {
                // A run of closing quote characters: the last ones close.
                while rest[next..].starts_with(first) {
                    quoted.push(first);
                    next += first.len_utf8();
                }
            }

            out.push(Fragment::text(&rest[..found.start]));
            out.push(Fragment::done(def.open_tag.clone()));
            if def.spans {
                self.frag_quotes(quoted, out);
            } else {
                let verbatim: String = escape_html(&quoted)
                    .chars()
                    .map(|c| {
                        if c == REPLACED_PLACEHOLDER {
                            VERBATIM_PLACEHOLDER
                        } else {
                            c
                        }
                    })
                    .collect();
                out.push(Fragment::done(verbatim));
            }
            out.push(Fragment::done(def.close_tag.clone()));
            rest = rest[next..].to_owned();
        }
    }
}

/// Restore saved replacements in place of their placeholders.
fn post_replacements(text: &str, saved: Vec<Fragment>) -> String {
    let mut saved = saved.into_iter();
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            REPLACED_PLACEHOLDER => {
                if let Some(fragment) = saved.next() {
                    result.push_str(&fragment.text);
                }
            }
            VERBATIM_PLACEHOLDER => {
                if let Some(fragment) = saved.next() {
                    result.push_str(&escape_html(&fragment.verbatim));
                }
            }
            _ => result.push(ch),
        }
    }
    result
}
