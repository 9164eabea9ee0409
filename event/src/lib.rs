//! The canonical event vocabulary and its debug-string rendering.

#![deny(rust_2018_idioms)]

use std::{fmt, io::Write};

mod escape;

pub use escape::{escape, unescape, Escaped, UnescapeError};

/// One element start, shared by [`Event::Start`] and [`Event::Empty`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    /// In source order; keys are not required to be unique.
    pub attributes: Vec<(String, String)>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Decl {
        version: String,
        encoding: Option<String>,
        standalone: Option<String>,
    },
    DocType {
        root_name: String,
    },
    Start(Element),
    Empty(Element),
    End {
        name: String,
    },
    Text {
        content: String,
    },
    Comment {
        content: String,
    },
    Pi {
        target: String,
        data: String,
    },
    Eof,
}

impl Event {
    pub fn end(name: impl Into<String>) -> Self {
        Event::End { name: name.into() }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Event::Text {
            content: content.into(),
        }
    }

    pub fn comment(content: impl Into<String>) -> Self {
        Event::Comment {
            content: content.into(),
        }
    }

    pub fn pi(target: impl Into<String>, data: impl Into<String>) -> Self {
        Event::Pi {
            target: target.into(),
            data: data.into(),
        }
    }

    /// True for the events that may only appear before the first element.
    pub fn is_prolog(&self) -> bool {
        matches!(self, Event::Decl { .. } | Event::DocType { .. })
    }
}

struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", escape(self.0))
    }
}

struct Optional<'a>(Option<&'a str>);

impl fmt::Display for Optional<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "Some({})", Quoted(v)),
            None => f.write_str("None"),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{name: {}, attributes: [", Quoted(&self.name))?;
        for (i, (k, v)) in self.attributes.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "({}, {})", Quoted(k), Quoted(v))?;
        }
        f.write_str("]}")
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Event::*;

        match self {
            Decl {
                version,
                encoding,
                standalone,
            } => write!(
                f,
                "Decl(version={}, encoding={}, standalone={})",
                Quoted(version),
                Optional(encoding.as_deref()),
                Optional(standalone.as_deref()),
            ),
            DocType { root_name } => write!(f, "DocType({})", Quoted(root_name)),
            Start(e) => write!(f, "Start({})", e),
            Empty(e) => write!(f, "Empty({})", e),
            End { name } => write!(f, "End({})", Quoted(name)),
            Text { content } => write!(f, "Text({})", Quoted(content)),
            Comment { content } => write!(f, "Comment({})", Quoted(content)),
            Pi { target, data } => write!(f, "PI(target={}, data={})", Quoted(target), Quoted(data)),
            Eof => f.write_str("Eof"),
        }
    }
}

/// Writes the bracketed, comma-separated rendering of an event sequence.
pub struct Formatter<W> {
    output: W,
    count: usize,
}

impl<W> Formatter<W>
where
    W: Write,
{
    pub fn new(output: W) -> Self {
        Self { output, count: 0 }
    }

    pub fn write_event(&mut self, event: &Event) -> std::io::Result<()> {
        let Self { output, count } = self;

        let separator = if *count == 0 { "[" } else { ", " };
        write!(output, "{}{}", separator, event)?;
        *count += 1;

        Ok(())
    }

    pub fn write_events<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a Event>,
    ) -> std::io::Result<()> {
        for event in events {
            self.write_event(event)?;
        }
        Ok(())
    }

    /// Closes the list, returning the writer.
    pub fn finish(self) -> std::io::Result<W> {
        let Self { mut output, count } = self;

        if count == 0 {
            output.write_all(b"[")?;
        }
        output.write_all(b"]")?;

        Ok(output)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    type Result<T = (), E = Box<dyn std::error::Error>> = std::result::Result<T, E>;

    fn render(events: &[Event]) -> Result<String> {
        let mut f = Formatter::new(Vec::new());
        f.write_events(events)?;
        let out = f.finish()?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn start_with_attributes() {
        let e = Event::Start(Element::new("a").with_attribute("id", "1"));
        assert_eq!(e.to_string(), r#"Start({name: "a", attributes: [("id", "1")]})"#);
    }

    #[test]
    fn empty_without_attributes() {
        let e = Event::Empty(Element::new("root"));
        assert_eq!(e.to_string(), r#"Empty({name: "root", attributes: []})"#);
    }

    #[test]
    fn declaration_with_optional_fields() {
        let e = Event::Decl {
            version: "1.0".into(),
            encoding: Some("UTF-8".into()),
            standalone: None,
        };
        assert_eq!(
            e.to_string(),
            r#"Decl(version="1.0", encoding=Some("UTF-8"), standalone=None)"#,
        );
    }

    #[test]
    fn processing_instruction() {
        let e = Event::pi("xml-stylesheet", r#"href="a.css""#);
        assert_eq!(
            e.to_string(),
            r#"PI(target="xml-stylesheet", data="href=\"a.css\"")"#,
        );
    }

    #[test]
    fn simple_variants() {
        assert_eq!(Event::end("b").to_string(), r#"End("b")"#);
        assert_eq!(Event::text("a\nb").to_string(), r#"Text("a\nb")"#);
        assert_eq!(Event::comment("hi").to_string(), r#"Comment("hi")"#);
        assert_eq!(
            Event::DocType {
                root_name: "html".into()
            }
            .to_string(),
            r#"DocType("html")"#,
        );
        assert_eq!(Event::Eof.to_string(), "Eof");
    }

    #[test]
    fn attribute_values_are_escaped() {
        let e = Event::Empty(Element::new("a").with_attribute("t", "say \"hi\"\t"));
        assert_eq!(
            e.to_string(),
            r#"Empty({name: "a", attributes: [("t", "say \"hi\"\t")]})"#,
        );
    }

    #[test]
    fn formats_a_list() -> Result {
        let out = render(&[Event::Empty(Element::new("root")), Event::Eof])?;
        assert_eq!(out, r#"[Empty({name: "root", attributes: []}), Eof]"#);
        Ok(())
    }

    #[test]
    fn formats_an_empty_list() -> Result {
        assert_eq!(render(&[])?, "[]");
        Ok(())
    }
}
