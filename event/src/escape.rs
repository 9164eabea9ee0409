use snafu::{ensure, OptionExt, ResultExt, Snafu};
use std::fmt;

/// Renders a string in the canonical debug literal form, without the
/// surrounding quotes.
pub fn escape(s: &str) -> Escaped<'_> {
    Escaped(s)
}

#[derive(Debug, Copy, Clone)]
pub struct Escaped<'a>(&'a str);

fn replacement(c: char) -> Option<Replacement> {
    use Replacement::*;

    Some(match c {
        '\\' => Fixed(r"\\"),
        '"' => Fixed(r#"\""#),
        '\n' => Fixed(r"\n"),
        '\t' => Fixed(r"\t"),
        '\r' => Fixed(r"\r"),
        '\u{0}'..='\u{1F}' | '\u{7F}' | '\u{80}'..='\u{9F}' => Unicode(c),
        _ => return None,
    })
}

enum Replacement {
    Fixed(&'static str),
    Unicode(char),
}

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0;
        let mut clean_from = 0;

        for (i, c) in s.char_indices() {
            let Some(r) = replacement(c) else { continue };

            f.write_str(&s[clean_from..i])?;
            match r {
                Replacement::Fixed(v) => f.write_str(v)?,
                Replacement::Unicode(c) => write!(f, "\\u{{{:02x}}}", u32::from(c))?,
            }
            clean_from = i + c.len_utf8();
        }

        f.write_str(&s[clean_from..])
    }
}

/// Reverses [`escape`].
pub fn unescape(s: &str) -> Result<String, UnescapeError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.char_indices();

    while let Some((location, c)) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        let (_, kind) = chars.next().context(DanglingBackslashSnafu { location })?;
        match kind {
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'u' => {
                let rest = &s[location + 2..];
                ensure!(rest.starts_with('{'), MalformedUnicodeSnafu { location });
                let close = rest.find('}').context(MalformedUnicodeSnafu { location })?;
                let digits = &rest[1..close];

                let value = u32::from_str_radix(digits, 16)
                    .context(InvalidUnicodeValueSnafu { location })?;
                let c = char::from_u32(value).context(InvalidUnicodeCharacterSnafu { value })?;
                out.push(c);

                // Skip `{`, the digits and `}`
                for _ in 0..close + 1 {
                    chars.next();
                }
            }
            other => return UnknownEscapeSnafu { location, escape: other }.fail(),
        }
    }

    Ok(out)
}

#[derive(Debug, Snafu)]
pub enum UnescapeError {
    #[snafu(display("A backslash at byte {} ends the input", location))]
    DanglingBackslash { location: usize },

    #[snafu(display("The escape `\\{}` at byte {} is not known", escape, location))]
    UnknownEscape { location: usize, escape: char },

    #[snafu(display("The unicode escape at byte {} is not of the form \\u{{XX}}", location))]
    MalformedUnicode { location: usize },

    #[snafu(display("The unicode escape at byte {} is not hexadecimal", location))]
    InvalidUnicodeValue {
        source: std::num::ParseIntError,
        location: usize,
    },

    #[snafu(display("The value {:#x} is not a unicode character", value))]
    InvalidUnicodeCharacter { value: u32 },
}
