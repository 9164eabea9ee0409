//! Folds raw parser callbacks into the canonical event stream.

#![deny(rust_2018_idioms)]

use event::{Element, Event};
use std::mem;
use tracing::{debug, trace};
use util::QName;
use validation::{Callback, Validator};

pub mod prolog;

pub use prolog::Prolog;

/// The callback-driven half of one document's conversion.
///
/// A start tag is held back until the next callback shows whether the
/// element has any content; text chunks accumulate until the next
/// non-text callback.
#[derive(Debug, Default)]
pub struct Normalizer {
    events: Vec<Event>,
    pending_start: Option<Element>,
    pending_text: String,
}

impl Normalizer {
    /// `seed` is emitted ahead of anything pushed later.
    pub fn new(seed: impl IntoIterator<Item = Event>) -> Self {
        Self {
            events: seed.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn push(&mut self, callback: Callback<'_>) {
        trace!(?callback, "callback");

        match callback {
            Callback::ElementStart { name, attributes } => {
                self.flush_start();
                self.flush_text();

                let attributes = attributes
                    .into_iter()
                    .map(|(k, v)| (local_name(k), v.into_owned()))
                    .collect();

                self.pending_start = Some(Element {
                    name: local_name(name),
                    attributes,
                });
            }

            Callback::ElementEnd { name } => {
                self.flush_text();

                let name = local_name(name);
                match self.pending_start.take() {
                    Some(element) if element.name == name => {
                        self.events.push(Event::Empty(element));
                    }
                    pending => {
                        self.pending_start = pending;
                        self.flush_start();
                        self.events.push(Event::End { name });
                    }
                }
            }

            Callback::Text(chunk) => {
                // An empty chunk is not content
                if chunk.is_empty() {
                    return;
                }

                self.flush_start();
                self.pending_text.push_str(&chunk);
            }

            Callback::Comment(content) => {
                self.flush_start();
                self.flush_text();
                self.events.push(Event::comment(content));
            }

            Callback::ProcessingInstruction { target, data } => {
                self.flush_start();
                self.flush_text();
                self.events.push(Event::pi(target, data.unwrap_or("")));
            }

            Callback::DocumentEnd => {
                self.flush_start();
                self.flush_text();
                self.events.push(Event::Eof);
            }
        }
    }

    /// Everything emitted so far. Ends with [`Event::Eof`] once
    /// [`Callback::DocumentEnd`] has been pushed.
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    fn flush_start(&mut self) {
        if let Some(element) = self.pending_start.take() {
            self.events.push(Event::Start(element));
        }
    }

    fn flush_text(&mut self) {
        if !self.pending_text.is_empty() {
            let content = mem::take(&mut self.pending_text);
            self.events.push(Event::Text { content });
        }
    }
}

fn local_name(name: QName<&str>) -> String {
    name.into_local_part().into()
}

/// Runs the callback pass over `source`, seeded with the prolog's events.
///
/// On failure no events are returned.
pub fn normalize(source: &str, prolog: &Prolog) -> Result<Vec<Event>, validation::Error> {
    let mut normalizer = Normalizer::new(prolog.events());

    for callback in Validator::new(source).with_prolog_end(prolog.markup_end) {
        normalizer.push(callback?);
    }

    let events = normalizer.into_events();
    debug!(input_len = source.len(), events = events.len(), "normalized document");

    Ok(events)
}
