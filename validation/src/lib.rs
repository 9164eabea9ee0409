//! Drives the `xmlparser` tokenizer over one document, enforces the
//! well-formedness rules it leaves to its caller, and reports the document
//! as a sequence of SAX-style [`Callback`]s.

#![deny(rust_2018_idioms)]

use hashbrown::HashSet;
use snafu::{ensure, OptionExt, ResultExt, Snafu};
use std::{borrow::Cow, collections::VecDeque};
use tracing::trace;
use util::{QName, StrExt};
use xmlparser::{ElementEnd, EntityDefinition, StrSpan, Token, Tokenizer};

mod namespace;
mod reference;

use namespace::Namespaces;
use reference::{for_each_piece, normalize_line_ends, Entities, Piece};

pub use reference::ReferenceValueError;

/// One low-level parser notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Callback<'a> {
    /// Namespace declarations are consumed and never appear in
    /// `attributes`.
    ElementStart {
        name: QName<&'a str>,
        attributes: Vec<(QName<&'a str>, Cow<'a, str>)>,
    },
    /// A self-closing tag produces an `ElementStart` immediately followed
    /// by this.
    ElementEnd {
        name: QName<&'a str>,
    },
    /// One chunk of character data. A single run of text is usually
    /// delivered as several chunks: one per literal segment, per resolved
    /// reference and per CDATA section.
    Text(Cow<'a, str>),
    Comment(&'a str),
    ProcessingInstruction {
        target: &'a str,
        data: Option<&'a str>,
    },
    DocumentEnd,
}

/// Removes a leading byte order mark.
pub fn strip_bom(s: &str) -> &str {
    s.strip_prefix('\u{FEFF}').unwrap_or(s)
}

#[derive(Debug)]
struct PendingStart<'a> {
    name: QName<&'a str>,
    location: usize,
    attributes: Vec<(QName<&'a str>, Cow<'a, str>)>,
    declarations: Vec<(&'a str, Cow<'a, str>)>,
}

#[derive(Debug, Default)]
struct ValidatorCore<'a> {
    source: &'a str,
    /// Top-level whitespace before this offset is not reported.
    prolog_end: usize,
    cursor: usize,
    element_stack: Vec<QName<&'a str>>,
    namespaces: Namespaces<'a>,
    entities: Entities<'a>,
    attribute_names: HashSet<QName<&'a str>>,
    pending_start: Option<PendingStart<'a>>,
    seen_one_element: bool,
    output: VecDeque<Callback<'a>>,
}

impl<'a> ValidatorCore<'a> {
    fn push(&mut self, token: Token<'a>) -> Result<()> {
        trace!(?token, "token");

        let span = token_span(&token);
        if self.pending_start.is_none() && self.element_stack.is_empty() {
            self.top_level_space(span.start());
        }
        self.cursor = span.end();

        match token {
            Token::Declaration { .. }
            | Token::DtdStart { .. }
            | Token::EmptyDtd { .. }
            | Token::DtdEnd { .. } => {}

            Token::EntityDeclaration {
                name, definition, ..
            } => match definition {
                EntityDefinition::EntityValue(value) => self.entities.declare_internal(
                    name.as_str(),
                    value.as_str(),
                    value.start(),
                )?,
                EntityDefinition::ExternalId(_) => self.entities.declare_external(name.as_str()),
            },

            Token::ProcessingInstruction {
                target,
                content,
                span,
            } => {
                let location = span.start();
                let target = target.as_str();
                ensure!(
                    !target.eq_ignore_ascii_case("xml"),
                    ProcessingInstructionInvalidNameSnafu {
                        location,
                        name: target
                    }
                );

                if let Some(content) = content {
                    check_chars(content)?;
                }

                self.output.push_back(Callback::ProcessingInstruction {
                    target,
                    data: content.map(|c| c.as_str()),
                });
            }

            Token::Comment { text, .. } => {
                check_chars(text)?;
                self.output.push_back(Callback::Comment(text.as_str()));
            }

            Token::ElementStart {
                prefix,
                local,
                span,
            } => {
                let name = QName::from_parts(prefix.as_str(), local.as_str());
                self.start_element(name, span.start())?;
            }

            Token::Attribute {
                prefix,
                local,
                value,
                span,
            } => {
                let name = QName::from_parts(prefix.as_str(), local.as_str());
                self.attribute(name, value, span.start())?;
            }

            Token::ElementEnd { end, span } => match end {
                ElementEnd::Open => {
                    self.finish_element_open_start()?;
                }
                ElementEnd::Empty => {
                    let name = self.finish_element_open_start()?;
                    self.finish_element_close(name, span.start())?;
                }
                ElementEnd::Close(prefix, local) => {
                    let name = QName::from_parts(prefix.as_str(), local.as_str());
                    self.finish_element_close(name, span.start())?;
                }
            },

            Token::Text { text } => self.char_data(text)?,

            Token::Cdata { text, span } => {
                ensure!(
                    !self.element_stack.is_empty(),
                    CDataOutsideOfElementSnafu {
                        location: span.start()
                    }
                );
                check_chars(text)?;
                self.output
                    .push_back(Callback::Text(normalize_line_ends(text.as_str())));
            }
        }

        Ok(())
    }

    /// Reports whitespace the tokenizer skipped between the end of the
    /// prolog markup and the root element.
    fn top_level_space(&mut self, next_token_start: usize) {
        if self.seen_one_element {
            return;
        }

        let from = self.cursor.max(self.prolog_end);
        if from >= next_token_start {
            return;
        }

        // Reported as written, without line-end normalization
        let gap = &self.source[from..next_token_start];
        if gap.is_xml_space() {
            self.output.push_back(Callback::Text(Cow::Borrowed(gap)));
        }
    }

    fn char_data(&mut self, text: StrSpan<'a>) -> Result<()> {
        let raw = text.as_str();
        let location = text.start();

        if self.element_stack.is_empty() {
            ensure!(
                raw.is_xml_space(),
                CharDataOutsideOfElementSnafu {
                    location,
                    text: raw
                }
            );
            if !self.seen_one_element && location >= self.prolog_end {
                self.output.push_back(Callback::Text(Cow::Borrowed(raw)));
            }
            return Ok(());
        }

        check_chars(text)?;
        if let Some(i) = raw.find("]]>") {
            return CDataEndInCharDataSnafu {
                location: location + i,
            }
            .fail();
        }

        let Self {
            entities, output, ..
        } = self;

        for_each_piece(raw, location, |piece| {
            let chunk = match piece {
                Piece::Literal(l) => normalize_line_ends(l),
                Piece::Char(c) => Cow::Owned(c.to_string()),
                Piece::Entity(name) => entities.resolve(name, location)?,
            };
            output.push_back(Callback::Text(chunk));
            Ok(())
        })
    }

    fn start_element(&mut self, name: QName<&'a str>, location: usize) -> Result<()> {
        if self.element_stack.is_empty() {
            ensure!(
                !self.seen_one_element,
                MultipleTopLevelElementsSnafu { location, name }
            );
            self.seen_one_element = true;
        }

        self.attribute_names.clear();
        self.pending_start = Some(PendingStart {
            name,
            location,
            attributes: Vec::new(),
            declarations: Vec::new(),
        });

        Ok(())
    }

    fn attribute(&mut self, name: QName<&'a str>, value: StrSpan<'a>, location: usize) -> Result<()> {
        let Self {
            pending_start,
            attribute_names,
            entities,
            ..
        } = self;

        let pending = pending_start
            .as_mut()
            .context(AttributeWithoutElementSnafu { location })?;

        ensure!(
            attribute_names.insert(name),
            AttributeDuplicateSnafu { location, name }
        );

        let value = attribute_value(value, entities)?;

        match (name.prefix, name.local_part) {
            (None, "xmlns") => pending.declarations.push(("", value)),
            (Some("xmlns"), prefix) => {
                ensure!(!value.is_empty(), NamespaceEmptySnafu { location, prefix });
                pending.declarations.push((prefix, value));
            }
            _ => pending.attributes.push((name, value)),
        }

        Ok(())
    }

    fn finish_element_open_start(&mut self) -> Result<QName<&'a str>> {
        let PendingStart {
            name,
            location,
            attributes,
            declarations,
        } = self
            .pending_start
            .take()
            .context(ElementOpenEndWithoutStartSnafu)?;

        self.namespaces.push_scope(declarations);

        if let Some(prefix) = name.prefix {
            ensure!(prefix != "xmlns", ReservedPrefixSnafu { location, name });
            ensure!(
                self.namespaces.resolve(prefix).is_some(),
                UnboundPrefixSnafu { location, prefix }
            );
        }

        let mut expanded = HashSet::with_capacity(attributes.len());
        for (attribute, _) in &attributes {
            let namespace = match attribute.prefix {
                Some(prefix) => Some(
                    self.namespaces
                        .resolve(prefix)
                        .context(UnboundPrefixSnafu { location, prefix })?,
                ),
                None => None,
            };

            ensure!(
                expanded.insert((namespace, attribute.local_part)),
                AttributeDuplicateSnafu {
                    location,
                    name: *attribute
                }
            );
        }

        self.element_stack.push(name);
        self.output
            .push_back(Callback::ElementStart { name, attributes });

        Ok(name)
    }

    fn finish_element_close(&mut self, close: QName<&'a str>, location: usize) -> Result<()> {
        let open = self
            .element_stack
            .pop()
            .context(ElementClosedWithoutOpenSnafu {
                location,
                name: close,
            })?;
        ensure!(
            open == close,
            ElementOpenAndCloseMismatchedSnafu {
                location,
                open,
                close
            }
        );

        self.namespaces.pop_scope();
        self.output.push_back(Callback::ElementEnd { name: close });

        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(pending) = self.pending_start.take() {
            return ElementOpenedWithoutCloseSnafu { name: pending.name }.fail();
        }

        if let Some(opened) = self.element_stack.pop() {
            return ElementOpenedWithoutCloseSnafu { name: opened }.fail();
        }

        ensure!(self.seen_one_element, NoTopLevelElementsSnafu);

        self.output.push_back(Callback::DocumentEnd);

        Ok(())
    }
}

fn token_span<'a>(token: &Token<'a>) -> StrSpan<'a> {
    match token {
        Token::Text { text } => *text,
        Token::Declaration { span, .. }
        | Token::ProcessingInstruction { span, .. }
        | Token::Comment { span, .. }
        | Token::DtdStart { span, .. }
        | Token::EmptyDtd { span, .. }
        | Token::EntityDeclaration { span, .. }
        | Token::DtdEnd { span }
        | Token::ElementStart { span, .. }
        | Token::Attribute { span, .. }
        | Token::ElementEnd { span, .. }
        | Token::Cdata { span, .. } => *span,
    }
}

fn check_chars(text: StrSpan<'_>) -> Result<()> {
    match text.as_str().find_non_xml_char() {
        Some((i, value)) => InvalidCharSnafu {
            location: text.start() + i,
            value,
        }
        .fail(),
        None => Ok(()),
    }
}

/// Resolves references and applies attribute-value whitespace
/// normalization.
fn attribute_value<'a>(value: StrSpan<'a>, entities: &Entities<'a>) -> Result<Cow<'a, str>> {
    let raw = value.as_str();
    let location = value.start();

    if let Some(i) = memchr::memchr(b'<', raw.as_bytes()) {
        return LessThanInAttributeValueSnafu {
            location: location + i,
        }
        .fail();
    }
    check_chars(value)?;

    let untouched = !raw
        .bytes()
        .any(|b| matches!(b, b'&' | b'\t' | b'\n' | b'\r'));
    if untouched {
        return Ok(Cow::Borrowed(raw));
    }

    fn space(c: char) -> char {
        match c {
            '\t' | '\n' | '\r' => ' ',
            c => c,
        }
    }

    let mut normalized = String::with_capacity(raw.len());
    for_each_piece(raw, location, |piece| {
        match piece {
            Piece::Literal(l) => normalized.extend(normalize_line_ends(l).chars().map(space)),
            Piece::Char(c) => normalized.push(c),
            Piece::Entity(name) => {
                normalized.extend(entities.resolve(name, location)?.chars().map(space))
            }
        }
        Ok(())
    })?;

    Ok(Cow::Owned(normalized))
}

/// Iterates over the callbacks of one document.
///
/// The iterator is fused: after the first error, or after
/// [`Callback::DocumentEnd`], it only returns `None`.
pub struct Validator<'a> {
    tokenizer: Tokenizer<'a>,
    core: ValidatorCore<'a>,
    finished: bool,
}

impl<'a> Validator<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            tokenizer: Tokenizer::from(source),
            core: ValidatorCore {
                source,
                ..Default::default()
            },
            finished: false,
        }
    }

    /// Whitespace between the start of the document and this byte offset
    /// is treated as part of the prolog markup and not reported.
    pub fn with_prolog_end(mut self, offset: usize) -> Self {
        self.core.prolog_end = offset;
        self
    }
}

impl<'a> Iterator for Validator<'a> {
    type Item = Result<Callback<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(callback) = self.core.output.pop_front() {
                return Some(Ok(callback));
            }

            if self.finished {
                return None;
            }

            let step = match self.tokenizer.next() {
                Some(Ok(token)) => self.core.push(token),
                Some(Err(e)) => Err(e).context(TokenizerSnafu),
                None => {
                    self.finished = true;
                    self.core.finish()
                }
            };

            if let Err(e) = step {
                self.finished = true;
                self.core.output.clear();
                return Some(Err(e));
            }
        }
    }
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("{}", source))]
    Tokenizer { source: xmlparser::Error },

    #[snafu(display("The character {:?} at byte {} is not allowed in XML", value, location))]
    InvalidChar { location: usize, value: char },

    #[snafu(display("The sequence `]]>` is not allowed in character data (byte {})", location))]
    CDataEndInCharData { location: usize },

    #[snafu(display("Character data {:?} at byte {} is outside of the root element", text, location))]
    CharDataOutsideOfElement { location: usize, text: String },

    #[snafu(display("A CDATA section at byte {} is outside of the root element", location))]
    CDataOutsideOfElement { location: usize },

    #[snafu(display("The reference at byte {} is missing its `;`", location))]
    UnterminatedReference { location: usize },

    #[snafu(display("The reference {:?} at byte {} is not a name", text, location))]
    ReferenceNameInvalid { location: usize, text: String },

    #[snafu(display("The character reference at byte {} is invalid: {}", location, source))]
    InvalidReference {
        source: ReferenceValueError,
        location: usize,
    },

    #[snafu(display("The entity {:?} referenced at byte {} is not declared", text, location))]
    ReferenceNamedUnknown { location: usize, text: String },

    #[snafu(display("The external entity {:?} referenced at byte {} cannot be loaded", name, location))]
    ExternalEntityReference { location: usize, name: String },

    #[snafu(display("The entity {:?} referenced at byte {} expands recursively", name, location))]
    EntityRecursion { location: usize, name: String },

    #[snafu(display("Expanding the entity {:?} referenced at byte {} produces too much text", name, location))]
    EntityExpansionLimit { location: usize, name: String },

    #[snafu(display("The entity {:?} referenced at byte {} contains markup", name, location))]
    EntityContainsMarkup { location: usize, name: String },

    #[snafu(display("An attribute value contains `<` at byte {}", location))]
    LessThanInAttributeValue { location: usize },

    #[snafu(display("The attribute at byte {} does not belong to an element", location))]
    AttributeWithoutElement { location: usize },

    #[snafu(display("The attribute {} is repeated in the element at byte {}", name, location))]
    AttributeDuplicate {
        location: usize,
        name: QName<String>,
    },

    #[snafu(display("The namespace prefix {:?} is bound to an empty URI at byte {}", prefix, location))]
    NamespaceEmpty { location: usize, prefix: String },

    #[snafu(display("The element {} at byte {} uses a reserved prefix", name, location))]
    ReservedPrefix {
        location: usize,
        name: QName<String>,
    },

    #[snafu(display("The namespace prefix {:?} used at byte {} is not bound", prefix, location))]
    UnboundPrefix { location: usize, prefix: String },

    ElementOpenEndWithoutStart,

    #[snafu(display("The element {} was never closed", name))]
    ElementOpenedWithoutClose { name: QName<String> },

    #[snafu(display("The end tag {} at byte {} closes nothing", name, location))]
    ElementClosedWithoutOpen {
        location: usize,
        name: QName<String>,
    },

    #[snafu(display("The end tag {} at byte {} does not match the start tag {}", close, location, open))]
    ElementOpenAndCloseMismatched {
        location: usize,
        open: QName<String>,
        close: QName<String>,
    },

    #[snafu(display("The document has no root element"))]
    NoTopLevelElements,

    #[snafu(display("The element {} at byte {} is a second root element", name, location))]
    MultipleTopLevelElements {
        location: usize,
        name: QName<String>,
    },

    #[snafu(display("The processing instruction target {:?} at byte {} is reserved", name, location))]
    ProcessingInstructionInvalidName { location: usize, name: String },
}

pub type Result<T = (), E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod test {
    use super::*;
    use easy_ext::ext;

    macro_rules! assert_error {
        ($e:expr, $p:pat $(if $guard:expr)?) => {
            assert!(
                matches!($e, Err($p) $(if $guard)?),
                "Expected {}, but got {:?}",
                stringify!($p),
                $e,
            )
        };
    }

    type TestResult<T = (), E = Box<dyn std::error::Error>> = std::result::Result<T, E>;

    #[ext]
    impl<'a> Validator<'a> {
        fn collect_owned(self) -> super::Result<Vec<OwnedCallback>> {
            self.map(|c| c.map(OwnedCallback::from)).collect()
        }
    }

    #[derive(Debug, PartialEq)]
    enum OwnedCallback {
        Start(String, Vec<(String, String)>),
        End(String),
        Text(String),
        Comment(String),
        Pi(String, Option<String>),
        DocumentEnd,
    }

    impl From<Callback<'_>> for OwnedCallback {
        fn from(other: Callback<'_>) -> Self {
            use OwnedCallback::*;

            match other {
                Callback::ElementStart { name, attributes } => Start(
                    name.to_string(),
                    attributes
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v.into_owned()))
                        .collect(),
                ),
                Callback::ElementEnd { name } => End(name.to_string()),
                Callback::Text(t) => Text(t.into_owned()),
                Callback::Comment(c) => Comment(c.into()),
                Callback::ProcessingInstruction { target, data } => {
                    Pi(target.into(), data.map(Into::into))
                }
                Callback::DocumentEnd => DocumentEnd,
            }
        }
    }

    fn callbacks(s: &str) -> super::Result<Vec<OwnedCallback>> {
        Validator::new(s).collect_owned()
    }

    fn start(name: &str) -> OwnedCallback {
        OwnedCallback::Start(name.into(), vec![])
    }

    fn end(name: &str) -> OwnedCallback {
        OwnedCallback::End(name.into())
    }

    fn text(t: &str) -> OwnedCallback {
        OwnedCallback::Text(t.into())
    }

    #[test]
    fn self_closed_element() -> TestResult {
        let c = callbacks("<alpha/>")?;

        assert_eq!(c, [start("alpha"), end("alpha"), OwnedCallback::DocumentEnd]);

        Ok(())
    }

    #[test]
    fn element_with_no_children() -> TestResult {
        let c = callbacks("<alpha></alpha>")?;

        assert_eq!(c, [start("alpha"), end("alpha"), OwnedCallback::DocumentEnd]);

        Ok(())
    }

    #[test]
    fn attributes_in_source_order() -> TestResult {
        let c = callbacks(r#"<a z="1" y='2'/>"#)?;

        assert_eq!(
            c[0],
            OwnedCallback::Start(
                "a".into(),
                vec![("z".into(), "1".into()), ("y".into(), "2".into())]
            )
        );

        Ok(())
    }

    #[test]
    fn text_is_chunked_at_references() -> TestResult {
        let c = callbacks("<a>x&amp;y&#33;</a>")?;

        assert_eq!(
            c,
            [
                start("a"),
                text("x"),
                text("&"),
                text("y"),
                text("!"),
                end("a"),
                OwnedCallback::DocumentEnd,
            ]
        );

        Ok(())
    }

    #[test]
    fn cdata_is_its_own_chunk() -> TestResult {
        let c = callbacks("<a>x<![CDATA[<y>]]>z</a>")?;

        assert_eq!(c[1..4], [text("x"), text("<y>"), text("z")]);

        Ok(())
    }

    #[test]
    fn line_ends_are_normalized_but_character_references_survive() -> TestResult {
        let c = callbacks("<a>1\r\n2\r3&#13;</a>")?;

        assert_eq!(c[1..3], [text("1\n2\n3"), text("\r")]);

        Ok(())
    }

    #[test]
    fn attribute_whitespace_is_normalized() -> TestResult {
        let c = callbacks("<a b=\"x\ty\r\nz&#10;\"/>")?;

        assert_eq!(
            c[0],
            OwnedCallback::Start("a".into(), vec![("b".into(), "x y z\n".into())])
        );

        Ok(())
    }

    #[test]
    fn namespace_declarations_are_consumed() -> TestResult {
        let c = callbacks(r#"<p:a xmlns="urn:d" xmlns:p="urn:p" p:b="1" c="2"></p:a>"#)?;

        assert_eq!(
            c,
            [
                OwnedCallback::Start(
                    "p:a".into(),
                    vec![("p:b".into(), "1".into()), ("c".into(), "2".into())]
                ),
                end("p:a"),
                OwnedCallback::DocumentEnd,
            ]
        );

        Ok(())
    }

    #[test]
    fn xml_prefix_is_predefined() -> TestResult {
        let c = callbacks(r#"<a xml:lang="en"/>"#)?;

        assert_eq!(
            c[0],
            OwnedCallback::Start("a".into(), vec![("xml:lang".into(), "en".into())])
        );

        Ok(())
    }

    #[test]
    fn internal_entities_are_expanded() -> TestResult {
        let c = callbacks(r#"<!DOCTYPE a [<!ENTITY who "world">]><a>hello &who;</a>"#)?;

        assert_eq!(c[0..3], [start("a"), text("hello "), text("world")]);

        Ok(())
    }

    #[test]
    fn entity_replacement_text_is_parsed_again() -> TestResult {
        let c = callbacks(r#"<!DOCTYPE a [<!ENTITY e "&#38;amp;">]><a>&e;</a>"#)?;

        assert_eq!(c[0..3], [start("a"), text("&"), end("a")]);

        Ok(())
    }

    #[test]
    fn fail_exponential_entity_expansion() {
        let mut source = String::from("<!DOCTYPE a [<!ENTITY e0 \"lol\">");
        for i in 1..10 {
            source.push_str(&format!("<!ENTITY e{} \"{}\">", i, format!("&e{};", i - 1).repeat(10)));
        }
        source.push_str("]><a>&e9;</a>");

        let e = callbacks(&source);

        assert_error!(&e, Error::EntityExpansionLimit { .. });
    }

    #[test]
    fn comments_and_processing_instructions() -> TestResult {
        let c = callbacks("<!--c--><a><?t d?><?u?></a>")?;

        assert_eq!(
            c,
            [
                OwnedCallback::Comment("c".into()),
                start("a"),
                OwnedCallback::Pi("t".into(), Some("d".into())),
                OwnedCallback::Pi("u".into(), None),
                end("a"),
                OwnedCallback::DocumentEnd,
            ]
        );

        Ok(())
    }

    #[test]
    fn prolog_whitespace_is_reported_after_the_prolog_markup() -> TestResult {
        let source = "<?xml version=\"1.0\"?>\n<a/>\n";
        let c = Validator::new(source)
            .with_prolog_end(source.find('\n').unwrap_or(0))
            .collect_owned()?;

        assert_eq!(
            c,
            [text("\n"), start("a"), end("a"), OwnedCallback::DocumentEnd]
        );

        Ok(())
    }

    #[test]
    fn prolog_whitespace_keeps_its_line_ends() -> TestResult {
        let source = "<?xml version=\"1.0\"?>\r\n<a/>";
        let c = Validator::new(source)
            .with_prolog_end(source.find('\r').unwrap_or(0))
            .collect_owned()?;

        assert_eq!(c[0], text("\r\n"));

        Ok(())
    }

    #[test]
    fn whitespace_before_the_prolog_end_is_not_reported() -> TestResult {
        let source = "<!DOCTYPE a>\n<a/>";
        let c = Validator::new(source).with_prolog_end(source.len() - 4).collect_owned()?;

        assert_eq!(c, [start("a"), end("a"), OwnedCallback::DocumentEnd]);

        Ok(())
    }

    #[test]
    fn fail_mismatched_open_and_close() {
        let e = callbacks("<a></b>");

        assert_error!(&e, Error::ElementOpenAndCloseMismatched { open, close, .. } if open == "a" && close == "b");
    }

    #[test]
    fn fail_mismatched_open_and_close_same_prefix() {
        let e = callbacks(r#"<a:b xmlns:a="urn:a"></a:c>"#);

        assert_error!(&e, Error::ElementOpenAndCloseMismatched { open, close, .. } if *open == ("a", "b") && *close == ("a", "c"));
    }

    #[test]
    fn fail_unclosed_open() {
        let e = callbacks("<a>");

        assert_error!(&e, Error::ElementOpenedWithoutClose { name } if name == "a");
    }

    #[test]
    fn fail_no_top_level_elements() {
        let e = callbacks("<!--only a comment-->");

        assert_error!(&e, Error::NoTopLevelElements);
    }

    #[test]
    fn fail_multiple_top_level_elements() {
        assert!(callbacks("<a/><b/>").is_err());
    }

    #[test]
    fn fail_char_data_outside_element() {
        assert!(callbacks("<a/>text").is_err());
    }

    #[test]
    fn fail_duplicated_attribute_name() {
        let e = callbacks(r#"<a b="1" b="2"/>"#);

        assert_error!(&e, Error::AttributeDuplicate { name, .. } if name == "b");
    }

    #[test]
    fn fail_duplicated_expanded_attribute_name() {
        let e = callbacks(r#"<a xmlns:x="urn:1" xmlns:y="urn:1" x:b="1" y:b="2"/>"#);

        assert_error!(&e, Error::AttributeDuplicate { name, .. } if *name == ("y", "b"));
    }

    #[test]
    fn may_differ_by_attribute_namespace() -> TestResult {
        callbacks(r#"<a xmlns:x="urn:1" xmlns:y="urn:2" x:b="1" y:b="2"/>"#)?;
        Ok(())
    }

    #[test]
    fn fail_unbound_element_prefix() {
        let e = callbacks("<p:a/>");

        assert_error!(&e, Error::UnboundPrefix { prefix, .. } if prefix == "p");
    }

    #[test]
    fn fail_unbound_attribute_prefix() {
        let e = callbacks(r#"<a p:b="1"/>"#);

        assert_error!(&e, Error::UnboundPrefix { prefix, .. } if prefix == "p");
    }

    #[test]
    fn prefix_goes_out_of_scope() {
        let e = callbacks(r#"<r><a xmlns:p="urn:p"/><p:b/></r>"#);

        assert_error!(&e, Error::UnboundPrefix { prefix, .. } if prefix == "p");
    }

    #[test]
    fn fail_namespace_empty() {
        let e = callbacks(r#"<a xmlns:b=""/>"#);

        assert_error!(&e, Error::NamespaceEmpty { prefix, .. } if prefix == "b");
    }

    #[test]
    fn may_have_empty_default_namespace() -> TestResult {
        callbacks(r#"<a xmlns=""/>"#)?;
        Ok(())
    }

    #[test]
    fn fail_undefined_entity() {
        let e = callbacks("<a>&nope;</a>");

        assert_error!(&e, Error::ReferenceNamedUnknown { text, .. } if text == "nope");
    }

    #[test]
    fn fail_reference_decimal_invalid() {
        let e = callbacks("<a>&#1;</a>");

        assert_error!(&e, Error::InvalidReference { .. });
    }

    #[test]
    fn fail_cdata_end_in_char_data() {
        assert!(callbacks("<a>]]></a>").is_err());
    }

    #[test]
    fn fail_reserved_processing_instruction_target() {
        assert!(callbacks("<a><?XmL x?></a>").is_err());
    }

    #[test]
    fn fail_tokenizer_error() {
        let e = callbacks("<a");

        assert!(e.is_err(), "{:?}", e);
    }

    #[test]
    fn fused_after_error() {
        let mut v = Validator::new("<a></b><c/>");
        let mut saw_error = false;
        for c in &mut v {
            if c.is_err() {
                saw_error = true;
                break;
            }
        }

        assert!(saw_error);
        assert!(v.next().is_none());
    }

    #[test]
    fn byte_order_mark_is_stripped() {
        assert_eq!(strip_bom("\u{FEFF}<a/>"), "<a/>");
        assert_eq!(strip_bom("<a/>"), "<a/>");
    }
}
