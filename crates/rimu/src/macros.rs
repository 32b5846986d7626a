//! Macro table and macro invocation expansion.
//!
//! Invocation forms:
//!
//! - `{name}` simple
//! - `{name|p1|p2}` parameterized, `$1`/`$$1` in the value are replaced
//! - `{name=pattern}` include the line if the value matches
//! - `{name!pattern}` exclude the line if the value matches
//!
//! A leading backslash escapes an invocation.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::Renderer;
use crate::reader::DELETE_LINE_FLAG;

/// Line starting with a macro invocation; group 1 is the invocation.
pub(crate) static MATCH_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\{[\w\-]+(?:[!=|?](?:|.*?[^\\]))?\}).*$").unwrap()
});

/// Single line definition; group 1 is the name, group 2 a literal value,
/// group 3 an expression value.
pub(crate) static LINE_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\\?\{([\w\-]+\??)\}\s*=\s*(?:'(.*)'|`(.*)`)$").unwrap()
});

/// Opening line of a multi-line literal definition.
pub(crate) static LITERAL_DEF_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\?\{[\w\-]+\??\}\s*=\s*'(.*)$").unwrap());

pub(crate) static LITERAL_DEF_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)'$").unwrap());

/// Opening line of a multi-line expression definition.
pub(crate) static EXPRESSION_DEF_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\?\{[\w\-]+\??\}\s*=\s*`(.*)$").unwrap());

pub(crate) static EXPRESSION_DEF_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)`$").unwrap());

static MATCH_SIMPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\?\{([\w\-]+)\}").unwrap());

static MATCH_COMPLEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\\?\{([\w\-]+)([!=|?](?:|.*?[^\\]))\}").unwrap()
});

/// Formal parameter: `$N`, `$$N`, optionally with a `:default$` value.
static PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\\?(\$\$?)(\d+)(\\?:(|.*?[^\\])\$)?").unwrap()
});

/// How a macro value was quoted in its definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValueKind {
    /// `'single quoted'`
    Literal,
    /// `` `backtick quoted` ``
    Expression,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Macro {
    name: String,
    value: String,
}

#[derive(Debug, Clone)]
pub(crate) struct Macros {
    defs: Vec<Macro>,
}

impl Default for Macros {
    fn default() -> Self {
        let predefined = ["--", "--header-ids"];
        Self {
            defs: predefined
                .iter()
                .map(|&name| Macro {
                    name: name.to_owned(),
                    value: String::new(),
                })
                .collect(),
        }
    }
}

impl Macros {
    pub(crate) fn get(&self, name: &str) -> Option<&str> {
        self.defs
            .iter()
            .find(|def| def.name == name)
            .map(|def| def.value.as_str())
    }

    /// Set a macro value, adding the macro if it does not exist.
    ///
    /// A name ending in `?` only defines the macro if it does not exist.
    pub(crate) fn set(&mut self, name: &str, value: String) {
        let (name, existential) = match name.strip_suffix('?') {
            Some(name) => (name, true),
            None => (name, false),
        };
        if let Some(def) = self.defs.iter_mut().find(|def| def.name == name) {
            if !existential {
                def.value = value;
            }
        } else {
            self.defs.push(Macro {
                name: name.to_owned(),
                value,
            });
        }
    }
}

impl Renderer<'_> {
    /// Define a macro from document markup.
    ///
    /// Ignored when the safe mode disallows macro definitions.
    pub(crate) fn set_macro(&mut self, name: &str, value: String, kind: ValueKind) {
        if self.options.safe_mode.skip_macro_defs() {
            return;
        }
        if kind == ValueKind::Expression {
            self.error(format!("unsupported: expression macro values: `{value}`"));
            return;
        }
        if name == "--" && !value.is_empty() {
            self.error("the predefined blank '--' macro cannot be redefined");
            return;
        }
        tracing::debug!(name, "Macro defined");
        self.macros.set(name, value);
    }

    /// Expand macro invocations in `text`.
    ///
    /// Simple invocations are expanded before parameterized, inclusion and
    /// exclusion invocations. Lines flagged for deletion by inclusion and
    /// exclusion invocations are dropped. `silent` suppresses diagnostics.
    pub(crate) fn render_macros(&mut self, text: &str, silent: bool) -> String {
        let result = MATCH_SIMPLE
            .replace_all(text, |caps: &Captures| {
                let invocation = &caps[0];
                if let Some(unescaped) = invocation.strip_prefix('\\') {
                    return unescaped.to_owned();
                }
                if let Some(value) = self.macros.get(&caps[1]) {
                    return value.to_owned();
                }
                if !silent {
                    self.error(format!("undefined macro: {invocation}: {text}"));
                }
                invocation.to_owned()
            })
            .into_owned();

        let result = MATCH_COMPLEX
            .replace_all(&result, |caps: &Captures| {
                self.expand_complex(caps, text, silent)
            })
            .into_owned();

        if result.contains(DELETE_LINE_FLAG) {
            return result
                .split('\n')
                .filter(|line| !line.contains(DELETE_LINE_FLAG))
                .collect::<Vec<_>>()
                .join("\n");
        }
        result
    }

    fn expand_complex(&mut self, caps: &Captures<'_>, text: &str, silent: bool) -> String {
        let invocation = &caps[0];
        if let Some(unescaped) = invocation.strip_prefix('\\') {
            return unescaped.to_owned();
        }
        let params = &caps[2];
        if params.starts_with('?') {
            if !silent {
                self.error(format!(
                    "existential macro invocations are deprecated: {invocation}"
                ));
            }
            return invocation.to_owned();
        }
        let Some(value) = self.macros.get(&caps[1]).map(str::to_owned) else {
            if !silent {
                self.error(format!("undefined macro: {invocation}: {text}"));
            }
            return invocation.to_owned();
        };
        let params = params.replace("\\}", "}");
        let mut chars = params.chars();
        match chars.next() {
            Some('|') => {
                let args: Vec<&str> = chars.as_str().split('|').collect();
                self.substitute_params(&value, &args)
            }
            Some(op @ ('=' | '!')) => {
                let pattern = chars.as_str();
                let Ok(regex) = Regex::new(&format!("^(?:{pattern})$")) else {
                    if !silent {
                        self.error(format!(
                            "illegal macro regular expression: {pattern}: {text}"
                        ));
                    }
                    return invocation.to_owned();
                };
                let mut skip = !regex.is_match(&value);
                if op == '!' {
                    skip = !skip;
                }
                if skip {
                    DELETE_LINE_FLAG.to_string()
                } else {
                    String::new()
                }
            }
            _ => {
                self.error(format!("illegal macro syntax: {invocation}"));
                String::new()
            }
        }
    }

    /// Replace formal parameters in a macro value with invocation arguments.
    fn substitute_params(&mut self, value: &str, args: &[&str]) -> String {
        PARAM_RE
            .replace_all(value, |caps: &Captures| {
                let param = &caps[0];
                if let Some(unescaped) = param.strip_prefix('\\') {
                    return unescaped.to_owned();
                }
                let index: usize = caps[2].parse().unwrap_or(0);
                if index == 0 {
                    return param.to_owned();
                }
                let mut arg = args.get(index - 1).map_or_else(String::new, |&a| a.to_owned());
                if let Some(default) = caps.get(3) {
                    if let Some(literal) = default.as_str().strip_prefix('\\') {
                        arg.push_str(literal);
                    } else if arg.is_empty() {
                        arg = caps
                            .get(4)
                            .map_or("", |m| m.as_str())
                            .replace("\\$", "$");
                    }
                }
                if &caps[1] == "$$" {
                    arg = self.render_spans(&arg);
                }
                arg
            })
            .into_owned()
    }
}
