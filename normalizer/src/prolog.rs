//! Recovers the XML declaration and the doctype name, which the callback
//! pass does not report.

use event::Event;
use regex::Regex;
use snafu::{ensure, ResultExt, Snafu};
use std::sync::LazyLock;
use tracing::debug;
use util::CharExt;
use xmlparser::{Token, Tokenizer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<bool>,
}

impl Declaration {
    fn new(version: &str, encoding: Option<&str>, standalone: Option<bool>) -> Result<Self> {
        static VALID_VERSION_STRING: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r#"\A1\.[0-9]+\z"#).unwrap());
        static VALID_ENCODING_STRING: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r#"\A[A-Za-z][A-Za-z0-9._-]*\z"#).unwrap());

        ensure!(
            VALID_VERSION_STRING.is_match(version),
            InvalidDeclarationVersionSnafu { version }
        );

        if let Some(encoding) = encoding {
            ensure!(
                VALID_ENCODING_STRING.is_match(encoding),
                InvalidDeclarationEncodingSnafu { encoding }
            );
        }

        Ok(Self {
            version: version.into(),
            encoding: encoding.map(Into::into),
            standalone,
        })
    }
}

/// What the document declares before its root element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prolog {
    pub declaration: Option<Declaration>,
    /// The root element name given by the doctype.
    pub doctype: Option<String>,
    /// Byte offset just past the declaration or the doctype, whichever
    /// comes last. Zero when there is neither.
    pub markup_end: usize,
}

impl Prolog {
    /// `Decl` then `DocType`, each only when present.
    pub fn events(&self) -> Vec<Event> {
        let declaration = self.declaration.iter().map(|d| Event::Decl {
            version: d.version.clone(),
            encoding: d.encoding.clone(),
            standalone: d
                .standalone
                .map(|s| String::from(if s { "yes" } else { "no" })),
        });

        let doctype = self.doctype.iter().map(|name| Event::DocType {
            root_name: name.clone(),
        });

        declaration.chain(doctype).collect()
    }
}

/// Scans `source` up to its first element start.
///
/// A leading byte order mark must already have been removed.
pub fn extract(source: &str) -> Result<Prolog> {
    let marked = has_declaration_marker(source);
    let mut prolog = Prolog::default();

    for token in Tokenizer::from(source) {
        match token.context(TokenizerSnafu)? {
            Token::Declaration {
                version,
                encoding,
                standalone,
                span,
            } => {
                let declaration =
                    Declaration::new(version.as_str(), encoding.map(|e| e.as_str()), standalone)?;
                prolog.declaration = Some(declaration);
                prolog.markup_end = span.end();
            }

            Token::DtdStart { name, span, .. } | Token::EmptyDtd { name, span, .. } => {
                prolog.doctype = Some(name.as_str().into());
                prolog.markup_end = span.end();
            }

            Token::DtdEnd { span } => prolog.markup_end = span.end(),

            Token::ElementStart { .. } => break,

            _ => {}
        }
    }

    ensure!(!marked || prolog.declaration.is_some(), DeclarationMissingSnafu);

    debug!(
        declaration = prolog.declaration.is_some(),
        doctype = ?prolog.doctype,
        markup_end = prolog.markup_end,
        "extracted prolog",
    );

    Ok(prolog)
}

/// `<?xml` followed by whitespace, after any leading whitespace.
fn has_declaration_marker(source: &str) -> bool {
    source
        .trim_start_matches(|c: char| c.is_xml_space())
        .strip_prefix("<?xml")
        .and_then(|rest| rest.chars().next())
        .map_or(false, |c| c.is_xml_space())
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("{}", source))]
    Tokenizer { source: xmlparser::Error },

    #[snafu(display("The XML declaration could not be parsed"))]
    DeclarationMissing,

    #[snafu(display("The declared version {:?} is not valid", version))]
    InvalidDeclarationVersion { version: String },

    #[snafu(display("The declared encoding {:?} is not valid", encoding))]
    InvalidDeclarationEncoding { encoding: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
