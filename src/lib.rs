//! Converts an XML document into the canonical event line used to check
//! other parsers against.

#![deny(rust_2018_idioms)]

use event::Formatter;
use snafu::Snafu;
use std::io::{self, Write};
use tracing::debug;

#[cfg(test)]
#[macro_use]
mod macros;

pub use event::{escape, unescape, Element, Event};
pub use normalizer::Prolog;

/// The events of one document, prolog first and ending with
/// [`Event::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Event>> {
    let source = validation::strip_bom(source);

    let prolog = normalizer::prolog::extract(source)?;
    let events = normalizer::normalize(source, &prolog)?;

    debug!(events = events.len(), "tokenized document");

    Ok(events)
}

/// One result line without its line terminator: `[...]` on success,
/// `Error: ...` otherwise.
pub fn render(source: &str) -> String {
    match tokenize(source) {
        Ok(events) => {
            let events: Vec<_> = events.iter().map(ToString::to_string).collect();
            format!("[{}]", events.join(", "))
        }
        Err(e) => format!("Error: {}", e),
    }
}

/// Writes the result line for `source`, terminated by a newline, and
/// reports whether the document was accepted.
pub fn write_result(mut output: impl Write, source: &str) -> io::Result<bool> {
    match tokenize(source) {
        Ok(events) => {
            let mut fmt = Formatter::new(&mut output);
            fmt.write_events(&events)?;
            fmt.finish()?;
            writeln!(output)?;
            Ok(true)
        }
        Err(e) => {
            writeln!(output, "Error: {}", e)?;
            Ok(false)
        }
    }
}

/// Decodes the `\n`, `\r`, `\t` and `\\` escapes of one streamed input line.
/// Any other backslash is kept as written.
pub fn decode_line(line: &str) -> String {
    let mut decoded = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push(c);
            continue;
        }

        let replacement = match chars.peek() {
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('\\') => '\\',
            _ => {
                decoded.push('\\');
                continue;
            }
        };
        chars.next();
        decoded.push(replacement);
    }

    decoded
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(context(false))]
    #[snafu(display("{}", source))]
    Prolog { source: normalizer::prolog::Error },

    #[snafu(context(false))]
    #[snafu(display("{}", source))]
    Validation { source: validation::Error },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod test {
    use super::*;

    type TestResult<T = (), E = Box<dyn std::error::Error>> = std::result::Result<T, E>;

    #[test]
    fn decodes_known_escapes() {
        assert_eq!(decode_line(r"<a>\n</a>"), "<a>\n</a>");
        assert_eq!(decode_line(r"\r\t"), "\r\t");
        assert_eq!(decode_line(r"a\\b"), "a\\b");
    }

    #[test]
    fn decodes_left_to_right() {
        assert_eq!(decode_line(r"\\n"), "\\n");
        assert_eq!(decode_line(r"\\\n"), "\\\n");
    }

    #[test]
    fn keeps_unknown_escapes() {
        assert_eq!(decode_line(r"\x\"), "\\x\\");
    }

    #[test]
    fn byte_order_mark_is_ignored() -> TestResult {
        assert_eq!(tokenize("\u{FEFF}<r/>")?, tokenize("<r/>")?);
        Ok(())
    }

    #[test]
    fn written_and_rendered_lines_agree() -> TestResult {
        let source = r#"<r a="1">x</r>"#;
        let mut out = Vec::new();

        assert!(write_result(&mut out, source)?);
        assert_eq!(String::from_utf8(out)?, format!("{}\n", render(source)));

        Ok(())
    }

    #[test]
    fn failure_is_reported_in_the_line() -> TestResult {
        let mut out = Vec::new();

        assert!(!write_result(&mut out, "<r>")?);
        assert!(String::from_utf8(out)?.starts_with("Error: "));

        Ok(())
    }

    #[test]
    fn fail_unclosed_root() {
        assert_error!(tokenize("<r>"), Error::Validation { .. });
    }

    #[test]
    fn fail_bad_declaration() {
        assert_error!(
            tokenize("<?xml version='1.0' encoding='-x'?><r/>"),
            Error::Prolog { .. }
        );
    }
}
