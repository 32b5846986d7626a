//! Inline element expansion: macros, quotes, replacements and special
//! characters.

mod quotes;
mod replacements;
mod spans;

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::Renderer;
use crate::attributes::ExpansionOptions;

pub(crate) use quotes::{QuoteDefinition, Quotes};
pub(crate) use replacements::{Replacement, ReplacementFilter, Replacements};

static GROUP_REF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\${1,2})(\d)").unwrap());

/// Escape `&`, `<` and `>`.
///
/// Quotes are left alone: rendered attribute values come from the source
/// verbatim.
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

/// Capture group values of a match; groups that did not participate are
/// empty.
pub(crate) fn group_values(caps: &Captures<'_>) -> Vec<String> {
    caps.iter()
        .map(|m| m.map_or_else(String::new, |m| m.as_str().to_owned()))
        .collect()
}

impl Renderer<'_> {
    /// Expand macros, then spans or special characters, as selected by
    /// `options`.
    pub(crate) fn replace_inline(&mut self, text: &str, options: &ExpansionOptions) -> String {
        let mut result = if options.macros() {
            self.render_macros(text, false)
        } else {
            text.to_owned()
        };
        if options.spans() {
            result = self.render_spans(&result);
        } else if options.specials() {
            result = escape_html(&result);
        }
        result
    }

    /// Substitute `$N` and `$$N` references in `template` with match groups.
    ///
    /// `$N` escapes special characters in the group text, `$$N` renders
    /// spans. Once set, a selection sticks for later references in the same
    /// template.
    pub(crate) fn replace_match(
        &mut self,
        groups: &[String],
        template: &str,
        mut options: ExpansionOptions,
    ) -> String {
        GROUP_REF_RE
            .replace_all(template, |caps: &Captures| {
                if &caps[1] == "$$" {
                    options.spans = Some(true);
                } else {
                    options.specials = Some(true);
                }
                let index: usize = caps[2].parse().unwrap_or(usize::MAX);
                match groups.get(index) {
                    Some(text) => self.replace_inline(text, &options),
                    None => {
                        self.error(format!("undefined replacement group: {}", &caps[0]));
                        String::new()
                    }
                }
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(values: &[&str]) -> Vec<String> {
        values.iter().map(|&v| v.to_owned()).collect()
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&"#), r#"&lt;a href="x"&gt;&amp;"#);
    }

    #[test]
    fn test_replace_match_specials_and_spans() {
        let mut renderer = Renderer::new();
        let re = Regex::new(r"...(...)6(...)").unwrap();
        let caps = re.captures("0123456*&*").unwrap();

        let result = renderer.replace_match(
            &group_values(&caps),
            "$1 $2 $$2",
            ExpansionOptions::default(),
        );

        assert_eq!(result, "345 *&amp;* <em>&amp;</em>");
    }

    #[test]
    fn test_replace_match_undefined_group() {
        let messages = std::cell::RefCell::new(Vec::new());
        let mut renderer = Renderer::new();
        renderer.set_callback(|d| messages.borrow_mut().push(d.message.clone()));

        let result = renderer.replace_match(&groups(&["x"]), "[$3]", ExpansionOptions::default());

        assert_eq!(result, "[]");
        assert_eq!(*messages.borrow(), vec!["undefined replacement group: $3"]);
    }

    #[test]
    fn test_replace_inline_specials_only() {
        let mut renderer = Renderer::new();
        let options = ExpansionOptions {
            specials: Some(true),
            ..ExpansionOptions::default()
        };

        assert_eq!(renderer.replace_inline("*a* & b", &options), "*a* &amp; b");
    }

    #[test]
    fn test_replace_inline_nothing() {
        let mut renderer = Renderer::new();

        assert_eq!(
            renderer.replace_inline("<b>{x}</b>", &ExpansionOptions::default()),
            "<b>{x}</b>"
        );
    }
}
