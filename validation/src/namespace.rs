use std::borrow::Cow;

pub(crate) const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// In-scope prefix bindings, one scope per open element.
#[derive(Debug, Default)]
pub(crate) struct Namespaces<'a> {
    bindings: Vec<(&'a str, Cow<'a, str>)>,
    scopes: Vec<usize>,
}

impl<'a> Namespaces<'a> {
    pub(crate) fn push_scope(&mut self, declarations: impl IntoIterator<Item = (&'a str, Cow<'a, str>)>) {
        self.scopes.push(self.bindings.len());
        self.bindings.extend(declarations);
    }

    pub(crate) fn pop_scope(&mut self) {
        if let Some(len) = self.scopes.pop() {
            self.bindings.truncate(len);
        }
    }

    pub(crate) fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }

        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| *p == prefix)
            .map(|(_, uri)| &**uri)
    }
}
