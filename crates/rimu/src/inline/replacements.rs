//! Replacement definitions.
//!
//! A replacement is a regular expression plus either a `$N` template or a
//! built-in filter. Definitions are applied in table order, so the defaults
//! win over user definitions appended later.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// Built-in replacement behaviors that a template cannot express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReplacementFilter {
    /// Expand the `$N` template.
    Template,
    /// Inline anchor; dropped when block attributes are disabled.
    Anchor,
    /// Inline HTML tag or comment, passed through the safe mode filter.
    Html,
    /// Character entity, passed through verbatim.
    Entity,
}

#[derive(Debug, Clone)]
pub(crate) struct Replacement {
    /// Pattern source text, used to find the definition for updates.
    pub(crate) pattern: String,
    pub(crate) regex: Regex,
    pub(crate) template: String,
    pub(crate) filter: ReplacementFilter,
}

impl Replacement {
    /// Built-in definition; patterns are known to be valid.
    fn builtin(pattern: &str, template: &str, filter: ReplacementFilter) -> Self {
        Self {
            pattern: pattern.to_owned(),
            regex: Regex::new(pattern).unwrap(),
            template: template.to_owned(),
            filter,
        }
    }
}

/// Default replacement patterns.
///
/// A `(?P<ahead>..)` group marks trailing context that is matched but not
/// consumed.
const DEFAULTS: &[(&str, &str, ReplacementFilter)] = &[
    // Deprecated inline anchor: <<#id>>
    (
        r"\\?<<#([a-zA-Z][\w\-]*)>>",
        r#"<span id="$1"></span>"#,
        ReplacementFilter::Anchor,
    ),
    // Image: <image:src|alt>
    (
        r"(?s)\\?<image:([^\s|]+)\|(.*?)>",
        r#"<img src="$1" alt="$2">"#,
        ReplacementFilter::Template,
    ),
    // Image: <image:src>
    (
        r"\\?<image:([^\s|]+?)>",
        r#"<img src="$1" alt="$1">"#,
        ReplacementFilter::Template,
    ),
    // Image: ![alt](url)
    (
        r"\\?!\[([^\[]*?)\]\((\S+?)\)",
        r#"<img src="$2" alt="$1">"#,
        ReplacementFilter::Template,
    ),
    // Email: <address|caption>
    (
        r"(?s)\\?<(\S+@[\w.\-]+)\|(.+?)>",
        r#"<a href="mailto:$1">$$2</a>"#,
        ReplacementFilter::Template,
    ),
    // Email: <address>
    (
        r"\\?<(\S+@[\w.\-]+)>",
        r#"<a href="mailto:$1">$1</a>"#,
        ReplacementFilter::Template,
    ),
    // Link: [caption](url)
    (
        r"\\?\[([^\[]*?)\]\((\S+?)\)",
        r#"<a href="$2">$$1</a>"#,
        ReplacementFilter::Template,
    ),
    // Link: <url|caption>
    (
        r"(?s)\\?<(\S+?)\|(.*?)>",
        r#"<a href="$1">$$2</a>"#,
        ReplacementFilter::Template,
    ),
    // Inline HTML comment or tag.
    (
        r"(?i)\\?(<!--(?:[^<>&]*)?-->|</?([a-z][a-z0-9]*)(?:\s+[^<>&]+)?>)",
        "",
        ReplacementFilter::Html,
    ),
    // Link: <url>
    (
        r"\\?<([^|\s]+?)>",
        r#"<a href="$1">$1</a>"#,
        ReplacementFilter::Template,
    ),
    // Bare http(s) URL.
    (
        r#"\\?((?:http|https)://[^\s"']*[A-Za-z0-9/#])"#,
        r#"<a href="$1">$1</a>"#,
        ReplacementFilter::Template,
    ),
    // Character entity.
    (r"\\?(&[\w#][\w]+;)", "", ReplacementFilter::Entity),
    // Line break: space or backslash followed by a backslash at end of line.
    (r"[\\ ]\\(\n|$)", "<br>$1", ReplacementFilter::Template),
    // Backslash before a closing code quote is literal.
    (r"(\S\\)(?P<ahead>`)", "$1", ReplacementFilter::Template),
    // Underscores within words are literal.
    (
        r"([a-zA-Z0-9]_)(?P<ahead>[a-zA-Z0-9])",
        "$1",
        ReplacementFilter::Template,
    ),
];

static DEFAULT_DEFS: LazyLock<Vec<Replacement>> = LazyLock::new(|| {
    DEFAULTS
        .iter()
        .map(|&(pattern, template, filter)| Replacement::builtin(pattern, template, filter))
        .collect()
});

#[derive(Debug, Clone)]
pub(crate) struct Replacements {
    defs: Vec<Replacement>,
}

impl Default for Replacements {
    fn default() -> Self {
        Self {
            defs: DEFAULT_DEFS.clone(),
        }
    }
}

impl Replacements {
    pub(crate) fn len(&self) -> usize {
        self.defs.len()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&Replacement> {
        self.defs.get(index)
    }

    /// Add a user replacement or update the one with the same pattern.
    ///
    /// Flags: `i` ignores case, `m` makes `^`/`$` match at line boundaries;
    /// `g` is accepted and has no effect.
    pub(crate) fn set(
        &mut self,
        pattern: &str,
        flags: &str,
        template: String,
    ) -> Result<(), regex::Error> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .build()?;
        let def = Replacement {
            pattern: pattern.to_owned(),
            regex,
            template,
            filter: ReplacementFilter::Template,
        };
        if let Some(existing) = self.defs.iter_mut().find(|d| d.pattern == pattern) {
            *existing = def;
        } else {
            self.defs.push(def);
        }
        Ok(())
    }
}
