use hashbrown::HashMap;
use snafu::{ensure, OptionExt, ResultExt, Snafu};
use std::{borrow::Cow, cell::Cell};
use util::CharExt;

use crate::{
    EntityContainsMarkupSnafu, EntityExpansionLimitSnafu, EntityRecursionSnafu,
    ExternalEntityReferenceSnafu, InvalidReferenceSnafu, ReferenceNameInvalidSnafu,
    ReferenceNamedUnknownSnafu, Result, UnterminatedReferenceSnafu,
};

/// Entity expansion depth past which we give up.
const MAX_ENTITY_DEPTH: usize = 16;

/// Bytes that entity expansion may produce in one document. Nested
/// expansions are counted at every level.
const MAX_EXPANDED_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug)]
pub(crate) enum Piece<'a> {
    Literal(&'a str),
    Char(char),
    Entity(&'a str),
}

/// Splits raw character data or an attribute value at each reference.
/// `location` is the byte offset of `raw` within the document.
pub(crate) fn for_each_piece<'a>(
    raw: &'a str,
    location: usize,
    mut f: impl FnMut(Piece<'a>) -> Result<()>,
) -> Result<()> {
    let mut rest = raw;
    let mut offset = location;

    while let Some(amp) = memchr::memchr(b'&', rest.as_bytes()) {
        if amp > 0 {
            f(Piece::Literal(&rest[..amp]))?;
        }

        let location = offset + amp;
        let after = &rest[amp + 1..];
        let semi = memchr::memchr(b';', after.as_bytes())
            .context(UnterminatedReferenceSnafu { location })?;
        let body = &after[..semi];

        let piece = if let Some(digits) = body.strip_prefix("#x") {
            Piece::Char(reference_value(digits, 16).context(InvalidReferenceSnafu { location })?)
        } else if let Some(digits) = body.strip_prefix('#') {
            Piece::Char(reference_value(digits, 10).context(InvalidReferenceSnafu { location })?)
        } else {
            ensure!(
                !body.is_empty() && !body.contains(|c: char| c.is_xml_space() || c == '&'),
                ReferenceNameInvalidSnafu { location, text: body },
            );
            Piece::Entity(body)
        };
        f(piece)?;

        offset = location + 1 + semi + 1;
        rest = &after[semi + 1..];
    }

    if !rest.is_empty() {
        f(Piece::Literal(rest))?;
    }

    Ok(())
}

pub(crate) fn reference_value(value: &str, radix: u32) -> Result<char, ReferenceValueError> {
    ensure!(
        !value.is_empty() && value.chars().all(|c| c.is_digit(radix)),
        NotDigitsSnafu { value }
    );
    let value = u32::from_str_radix(value, radix).context(InvalidValueSnafu { value })?;
    let value = char::from_u32(value).context(InvalidUnicodeCharacterSnafu { value })?;
    ensure!(
        value.is_xml_char(),
        DisallowedUnicodeCharacterSnafu { value }
    );
    Ok(value)
}

#[derive(Debug, Snafu)]
pub enum ReferenceValueError {
    #[snafu(display("{:?} is not a sequence of digits", value))]
    NotDigits { value: String },

    #[snafu(display("{:?} is not a valid number", value))]
    InvalidValue {
        source: std::num::ParseIntError,
        value: String,
    },

    #[snafu(display("{:#x} is not a unicode character", value))]
    InvalidUnicodeCharacter { value: u32 },

    #[snafu(display("{:?} is not allowed in XML", value))]
    DisallowedUnicodeCharacter { value: char },
}

/// Converts `\r\n` and lone `\r` into `\n`.
pub(crate) fn normalize_line_ends(s: &str) -> Cow<'_, str> {
    if memchr::memchr(b'\r', s.as_bytes()).is_none() {
        return Cow::Borrowed(s);
    }

    Cow::Owned(s.replace("\r\n", "\n").replace('\r', "\n"))
}

#[derive(Debug, Clone)]
enum Entity {
    /// The replacement text, with character references already substituted.
    Internal(String),
    External,
}

/// General entities declared in the internal DTD subset.
#[derive(Debug, Default)]
pub(crate) struct Entities<'a> {
    declared: HashMap<&'a str, Entity>,
    expanded_bytes: Cell<usize>,
}

impl<'a> Entities<'a> {
    /// The first declaration of a name is binding; later ones are ignored.
    ///
    /// Character references in `value` are replaced now; entity references
    /// are kept and expanded each time the entity is referenced.
    pub(crate) fn declare_internal(
        &mut self,
        name: &'a str,
        value: &'a str,
        location: usize,
    ) -> Result<()> {
        if self.declared.contains_key(name) {
            return Ok(());
        }

        let mut replacement = String::with_capacity(value.len());
        for_each_piece(value, location, |piece| {
            match piece {
                Piece::Literal(l) => replacement.push_str(&normalize_line_ends(l)),
                Piece::Char(c) => replacement.push(c),
                Piece::Entity(e) => {
                    replacement.push('&');
                    replacement.push_str(e);
                    replacement.push(';');
                }
            }
            Ok(())
        })?;

        self.declared.insert(name, Entity::Internal(replacement));
        Ok(())
    }

    pub(crate) fn declare_external(&mut self, name: &'a str) {
        self.declared.entry(name).or_insert(Entity::External);
    }

    pub(crate) fn resolve(&self, name: &str, location: usize) -> Result<Cow<'a, str>> {
        self.resolve_at_depth(name, location, 0)
    }

    fn resolve_at_depth(&self, name: &str, location: usize, depth: usize) -> Result<Cow<'a, str>> {
        if let Some(v) = predefined(name) {
            return Ok(Cow::Borrowed(v));
        }

        let value = match self.declared.get(name) {
            Some(Entity::Internal(value)) => value,
            Some(Entity::External) => {
                return ExternalEntityReferenceSnafu { location, name }.fail()
            }
            None => return ReferenceNamedUnknownSnafu { location, text: name }.fail(),
        };

        ensure!(
            depth < MAX_ENTITY_DEPTH,
            EntityRecursionSnafu { location, name }
        );

        let mut expanded = String::with_capacity(value.len());
        for_each_piece(value, location, |piece| {
            match piece {
                Piece::Literal(l) => {
                    ensure!(
                        !l.contains('<'),
                        EntityContainsMarkupSnafu { location, name }
                    );
                    self.charge(l.len(), location, name)?;
                    expanded.push_str(l);
                }
                Piece::Char(c) => {
                    self.charge(c.len_utf8(), location, name)?;
                    expanded.push(c);
                }
                Piece::Entity(inner) => {
                    let inner = self.resolve_at_depth(inner, location, depth + 1)?;
                    self.charge(inner.len(), location, name)?;
                    expanded.push_str(&inner);
                }
            }
            Ok(())
        })?;

        Ok(Cow::Owned(expanded))
    }

    /// Counts bytes produced by expansion against the per-document limit.
    fn charge(&self, len: usize, location: usize, name: &str) -> Result<()> {
        let total = self.expanded_bytes.get().saturating_add(len);
        self.expanded_bytes.set(total);

        ensure!(
            total <= MAX_EXPANDED_BYTES,
            EntityExpansionLimitSnafu { location, name }
        );

        Ok(())
    }
}

fn predefined(name: &str) -> Option<&'static str> {
    Some(match name {
        "lt" => "<",
        "gt" => ">",
        "amp" => "&",
        "quot" => "\"",
        "apos" => "'",
        _ => return None,
    })
}
