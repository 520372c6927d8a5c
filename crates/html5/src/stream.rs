//! Streaming façade.
//!
//! A finite, one-pass event sequence over the tokenizer, with adjacent
//! character tokens coalesced. No tree is built.

use crate::tokenizer::{SinkResult, Token, TokenSink, Tokenizer, TokenizerOpts};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Start {
        name: String,
        attrs: Vec<(String, String)>,
    },
    End {
        name: String,
    },
    Text(String),
    Comment(String),
    Doctype {
        name: Option<String>,
        public_id: Option<String>,
        system_id: Option<String>,
    },
}

/// Iterator over the events of one tokenizer pass. Not restartable.
pub struct Events {
    inner: std::vec::IntoIter<Event>,
}

impl Iterator for Events {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        self.inner.next()
    }
}

/// Tokenize `input` and yield its event stream.
pub fn stream_events(input: &str) -> Events {
    #[derive(Default)]
    struct EventSink {
        events: Vec<Event>,
        pending_text: String,
    }

    impl EventSink {
        fn flush_text(&mut self) {
            if !self.pending_text.is_empty() {
                self.events.push(Event::Text(std::mem::take(&mut self.pending_text)));
            }
        }
    }

    impl TokenSink for EventSink {
        fn process_token(&mut self, token: Token) -> SinkResult {
            match token {
                Token::Character(data) => self.pending_text.push_str(&data),
                Token::StartTag(tag) => {
                    self.flush_text();
                    self.events.push(Event::Start {
                        name: tag.name,
                        attrs: tag
                            .attrs
                            .into_iter()
                            .map(|a| (a.name, a.value))
                            .collect(),
                    });
                }
                Token::EndTag(tag) => {
                    self.flush_text();
                    self.events.push(Event::End { name: tag.name });
                }
                Token::Comment(data) => {
                    self.flush_text();
                    self.events.push(Event::Comment(data));
                }
                Token::Doctype(doctype) => {
                    self.flush_text();
                    self.events.push(Event::Doctype {
                        name: doctype.name,
                        public_id: doctype.public_id,
                        system_id: doctype.system_id,
                    });
                }
                Token::Eof => self.flush_text(),
            }
            SinkResult::Continue
        }
    }

    let mut sink = EventSink::default();
    let mut tokenizer = Tokenizer::new(input, TokenizerOpts::default());
    tokenizer.run(&mut sink);
    Events {
        inner: sink.events.into_iter(),
    }
}

#[cfg(test)]
mod tests {
    use super::{Event, stream_events};

    #[test]
    fn coalesces_adjacent_text() {
        let events: Vec<Event> = stream_events("ab&amp;cd").collect();
        assert_eq!(events, vec![Event::Text("ab&cd".to_string())]);
    }

    #[test]
    fn tags_text_and_comments_in_order() {
        let events: Vec<Event> = stream_events("<p class=x>hi</p><!--c-->").collect();
        assert_eq!(
            events,
            vec![
                Event::Start {
                    name: "p".to_string(),
                    attrs: vec![("class".to_string(), "x".to_string())],
                },
                Event::Text("hi".to_string()),
                Event::End {
                    name: "p".to_string()
                },
                Event::Comment("c".to_string()),
            ]
        );
    }

    #[test]
    fn doctype_event_carries_ids() {
        let events: Vec<Event> = stream_events("<!DOCTYPE html>").collect();
        assert_eq!(
            events,
            vec![Event::Doctype {
                name: Some("html".to_string()),
                public_id: None,
                system_id: None,
            }]
        );
    }
}
