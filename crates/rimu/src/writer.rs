//! Append-only output buffer.

use std::fmt;

/// Ordered sequence of output fragments, joined on demand.
#[derive(Debug, Default)]
pub(crate) struct Writer {
    fragments: Vec<String>,
}

impl Writer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn write(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !text.is_empty() {
            self.fragments.push(text);
        }
    }

    /// Move all fragments of `other` to the end of this buffer.
    pub(crate) fn append(&mut self, other: Writer) {
        self.fragments.extend(other.fragments);
    }
}

impl fmt::Display for Writer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fragment in &self.fragments {
            f.write_str(fragment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_append() {
        let mut writer = Writer::new();
        writer.write("<p>");
        writer.write(String::new());

        let mut other = Writer::new();
        other.write("x");
        writer.append(other);
        writer.write("</p>");

        assert_eq!(writer.to_string(), "<p>x</p>");
    }
}
