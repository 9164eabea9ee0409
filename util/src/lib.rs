#![deny(rust_2018_idioms)]

use std::fmt;

/// A possibly-prefixed XML name, as written in the source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QName<T> {
    pub prefix: Option<T>,
    pub local_part: T,
}

impl<'a> QName<&'a str> {
    /// Builds a name from tokenizer parts, where an empty prefix means
    /// there was no prefix at all.
    pub fn from_parts(prefix: &'a str, local_part: &'a str) -> Self {
        Self {
            prefix: (!prefix.is_empty()).then_some(prefix),
            local_part,
        }
    }
}

impl<T> QName<T> {
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> QName<U> {
        QName {
            prefix: self.prefix.map(&mut f),
            local_part: f(self.local_part),
        }
    }

    /// Drops the prefix, keeping only the local part.
    pub fn into_local_part(self) -> T {
        self.local_part
    }
}

impl<T> PartialEq<str> for QName<T>
where
    T: AsRef<str>,
{
    fn eq(&self, other: &str) -> bool {
        self.prefix.is_none() && self.local_part.as_ref() == other
    }
}

impl<T> PartialEq<(&str, &str)> for QName<T>
where
    T: AsRef<str>,
{
    fn eq(&self, other: &(&str, &str)) -> bool {
        self.prefix.as_ref().map(AsRef::as_ref) == Some(other.0)
            && self.local_part.as_ref() == other.1
    }
}

impl From<QName<&str>> for QName<String> {
    fn from(other: QName<&str>) -> Self {
        other.map(From::from)
    }
}

impl<T> fmt::Display for QName<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, "{}:", prefix)?;
        }
        self.local_part.fmt(f)
    }
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for char {}
    impl Sealed for str {}
}

pub trait CharExt: sealed::Sealed {
    #[must_use]
    fn is_xml_char(&self) -> bool;

    #[must_use]
    fn is_xml_space(&self) -> bool;
}

impl CharExt for char {
    #[inline]
    fn is_xml_char(&self) -> bool {
        // Sorted by how common each case is
        matches!(
            self,
                '\u{20}'..='\u{FF}'
                | '\u{9}'
                | '\u{A}'
                | '\u{D}'
                | '\u{100}'..='\u{D7FF}'
                | '\u{E000}'..='\u{FFFD}'
                | '\u{10000}'..='\u{10FFFF}'
        )
    }

    #[inline]
    fn is_xml_space(&self) -> bool {
        matches!(self, ' ' | '\t' | '\r' | '\n')
    }
}

pub trait StrExt: sealed::Sealed {
    #[must_use]
    fn is_xml_space(&self) -> bool;

    /// The byte offset of the first character not allowed in XML.
    #[must_use]
    fn find_non_xml_char(&self) -> Option<(usize, char)>;
}

impl StrExt for str {
    #[inline]
    fn is_xml_space(&self) -> bool {
        self.chars().all(|c| c.is_xml_space())
    }

    #[inline]
    fn find_non_xml_char(&self) -> Option<(usize, char)> {
        self.char_indices().find(|(_, c)| !c.is_xml_char())
    }
}
