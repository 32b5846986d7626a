//! Hard rendering errors.

/// Errors that abort a render call.
///
/// Document-level problems are reported as [`Diagnostic`](crate::Diagnostic)s
/// instead; only invalid API input and internal faults end up here.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Safe mode outside `0..=15`.
    #[error("illegal safeMode API option value: {0}")]
    IllegalSafeMode(String),

    /// Unknown option name.
    #[error("illegal API option name: {0}")]
    IllegalOption(String),

    /// Option value that cannot be interpreted.
    #[error("illegal {name} API option value: {value}")]
    IllegalOptionValue { name: String, value: String },

    /// The `--` macro can only hold an empty value.
    #[error("the {{--}} macro can only be set to a blank value")]
    ReadOnlyMacro,

    /// No block definition matched a line; the paragraph definition matches
    /// every line so this indicates a broken block table.
    #[error("no matching delimited block found: {line}")]
    NoMatchingBlock { line: String },
}
