//! Block attributes and expansion options.
//!
//! A block attributes line (`.classes #id "css" [html-attributes] +opts`)
//! sets pending values that the next rendered element consumes.

use std::sync::LazyLock;

use regex::Regex;

use crate::options::SafeMode;

static ATTRIBUTES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\\?\.((?:\s*[a-zA-Z][\w\-]*)+)?\s*(#[a-zA-Z][\w\-]*\s*)?\s*(?:"(.+?)")?\s*(\[.+\])?\s*([+-][ \w+-]+)?$"#,
    )
    .unwrap()
});

static OPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-](macros|spans|specials|container|skip)$").unwrap());

static CLASS_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)^(<[^>]*class=")(.*?)""#).unwrap());

static STYLE_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)^(<[^>]*style=")(.*?)""#).unwrap());

static ID_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?i)\bid=".*?""#).unwrap());

static TAG_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<([a-zA-Z]+|h[1-6])[ >]").unwrap());

static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").unwrap());

static DASHES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").unwrap());

/// Per-block processing switches.
///
/// Unset values inherit from the next layer when merged; an option that is
/// never set anywhere counts as `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpansionOptions {
    pub macros: Option<bool>,
    pub container: Option<bool>,
    pub skip: Option<bool>,
    /// Span substitution also escapes special characters.
    pub spans: Option<bool>,
    pub specials: Option<bool>,
}

impl ExpansionOptions {
    /// Options with only `macros` set.
    pub(crate) fn macros_only() -> Self {
        Self {
            macros: Some(true),
            ..Self::default()
        }
    }

    /// Options with `macros` and `spans` set.
    pub(crate) fn macros_and_spans() -> Self {
        Self {
            macros: Some(true),
            spans: Some(true),
            ..Self::default()
        }
    }

    /// Overwrite each option that is set in `from`.
    pub fn merge(&mut self, from: &Self) {
        self.macros = from.macros.or(self.macros);
        self.container = from.container.or(self.container);
        self.skip = from.skip.or(self.skip);
        self.spans = from.spans.or(self.spans);
        self.specials = from.specials.or(self.specials);
    }

    pub fn macros(&self) -> bool {
        self.macros.unwrap_or(false)
    }

    pub fn container(&self) -> bool {
        self.container.unwrap_or(false)
    }

    pub fn skip(&self) -> bool {
        self.skip.unwrap_or(false)
    }

    pub fn spans(&self) -> bool {
        self.spans.unwrap_or(false)
    }

    pub fn specials(&self) -> bool {
        self.specials.unwrap_or(false)
    }

    /// Apply a whitespace separated `+name`/`-name` option list.
    ///
    /// Returns diagnostic messages for options that could not be applied.
    pub(crate) fn parse(&mut self, text: &str, safe_mode: SafeMode) -> Vec<String> {
        let mut messages = Vec::new();
        for opt in text.split_whitespace() {
            if safe_mode.is_enabled() && opt == "-specials" {
                messages.push("-specials block option not valid in safeMode".to_owned());
                continue;
            }
            let Some(caps) = OPTION_RE.captures(opt) else {
                messages.push(format!("illegal block option: {opt}"));
                continue;
            };
            let value = Some(opt.starts_with('+'));
            match &caps[1] {
                "macros" => self.macros = value,
                "container" => self.container = value,
                "skip" => self.skip = value,
                "spans" => self.spans = value,
                _ => self.specials = value,
            }
        }
        messages
    }
}

/// Pending attributes for the next rendered element, plus every id
/// allocated so far.
#[derive(Debug, Default)]
pub(crate) struct BlockAttributes {
    pub(crate) classes: String,
    pub(crate) id: String,
    pub(crate) css: String,
    pub(crate) attributes: String,
    pub(crate) options: ExpansionOptions,
    ids: Vec<String>,
}

impl BlockAttributes {
    /// Discard pending attributes and allocated ids.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// Discard pending attributes (but not allocated ids).
    pub(crate) fn clear_pending(&mut self) {
        self.classes.clear();
        self.id.clear();
        self.css.clear();
        self.attributes.clear();
        self.options = ExpansionOptions::default();
    }

    /// Parse a macro-expanded block attributes line into the pending values.
    ///
    /// Returns `None` if the line is not well-formed block attributes,
    /// otherwise diagnostic messages for options that could not be applied.
    pub(crate) fn parse(&mut self, line: &str, safe_mode: SafeMode) -> Option<Vec<String>> {
        let caps = ATTRIBUTES_RE.captures(line)?;
        if safe_mode.skip_block_attributes() {
            return Some(Vec::new());
        }
        if let Some(classes) = caps.get(1) {
            self.classes = format!("{} {}", self.classes, classes.as_str().trim())
                .trim()
                .to_owned();
        }
        if let Some(id) = caps.get(2) {
            self.id = id.as_str().trim()[1..].to_owned();
        }
        if let Some(css) = caps.get(3) {
            let mut css = css.as_str().trim().to_owned();
            if !css.ends_with(';') {
                css.push(';');
            }
            self.css = format!("{} {css}", self.css).trim().to_owned();
        }
        if let Some(attributes) = caps.get(4)
            && !safe_mode.is_enabled()
        {
            let attributes = attributes.as_str();
            let attributes = &attributes[1..attributes.len() - 1];
            self.attributes = format!("{} {}", self.attributes, attributes.trim())
                .trim()
                .to_owned();
        }
        let messages = caps
            .get(5)
            .map(|opts| self.options.parse(opts.as_str(), safe_mode))
            .unwrap_or_default();
        Some(messages)
    }

    /// Merge pending classes, id, style and HTML attributes into the first
    /// element of `tag`.
    ///
    /// Returns the new tag and a diagnostic message if the id is a
    /// duplicate. When `consume` is set the pending values are cleared.
    pub(crate) fn inject(&mut self, tag: &str, consume: bool) -> (String, Option<String>) {
        let mut message = None;
        let mut result = tag.to_owned();
        if !tag.trim().is_empty() {
            let mut attrs = String::new();
            if !self.classes.is_empty() {
                if CLASS_ATTR_RE.is_match(&result) {
                    result = CLASS_ATTR_RE
                        .replace(&result, |caps: &regex::Captures| {
                            format!("{}{} {}\"", &caps[1], self.classes, &caps[2])
                        })
                        .into_owned();
                } else {
                    attrs = format!("class=\"{}\"", self.classes);
                }
            }
            if !self.id.is_empty() {
                self.id = self.id.to_lowercase();
                let has_id = ID_ATTR_RE.is_match(&result);
                if has_id || self.ids.contains(&self.id) {
                    message = Some(format!("duplicate 'id' attribute: {}", self.id));
                } else {
                    self.ids.push(self.id.clone());
                }
                if !has_id {
                    attrs.push_str(&format!(" id=\"{}\"", self.id));
                }
            }
            if !self.css.is_empty() {
                if STYLE_ATTR_RE.is_match(&result) {
                    result = STYLE_ATTR_RE
                        .replace(&result, |caps: &regex::Captures| {
                            format!("{}{} {}\"", &caps[1], self.css, &caps[2])
                        })
                        .into_owned();
                } else {
                    attrs.push_str(&format!(" style=\"{}\"", self.css));
                }
            }
            if !self.attributes.is_empty() {
                attrs.push(' ');
                attrs.push_str(&self.attributes);
            }
            let attrs = attrs.trim();
            if !attrs.is_empty()
                && let Some(name) = TAG_NAME_RE.captures(&result).and_then(|caps| caps.get(1))
            {
                let at = name.end();
                result = format!("{} {attrs}{}", &result[..at], &result[at..]);
            }
        }
        if consume {
            self.clear_pending();
        }
        (result, message)
    }

    /// Derive a unique id from header text.
    pub(crate) fn slugify(&self, text: &str) -> String {
        let slug = NON_WORD_RE.replace_all(text, "-");
        let slug = DASHES_RE.replace_all(&slug, "-");
        let mut slug = slug.trim_matches('-').to_lowercase();
        if slug.is_empty() {
            slug = "x".to_owned();
        }
        if !self.ids.contains(&slug) {
            return slug;
        }
        let mut n = 2;
        while self.ids.contains(&format!("{slug}-{n}")) {
            n += 1;
        }
        format!("{slug}-{n}")
    }
}
