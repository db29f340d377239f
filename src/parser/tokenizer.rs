//! Push-based markup tokenizer.
//!
//! Produces tag-open / text / tag-close events from a sequence of `&str`
//! chunks. Tokenizer state survives chunk boundaries, so tags, comments and
//! entities split across reads are handled transparently. Text is buffered to
//! node boundaries and character entities are decoded before the text event
//! is emitted.

/// One tokenizer event. Tag names are lowercased with attributes stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupEvent {
    TagOpen(String),
    Text(String),
    TagClose(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    TagStart,
    Tag,
    Bang,
    Comment,
    Declaration,
}

pub struct MarkupTokenizer {
    state: State,
    text: String,
    tag: String,
    bang_dashes: u8,
    comment_tail: u8,
}

impl MarkupTokenizer {
    pub fn new() -> Self {
        Self {
            state: State::Text,
            text: String::new(),
            tag: String::new(),
            bang_dashes: 0,
            comment_tail: 0,
        }
    }

    /// Feed the next chunk of the document, returning the events it completes.
    pub fn push(&mut self, input: &str) -> Vec<MarkupEvent> {
        let mut events = Vec::new();
        for c in input.chars() {
            match self.state {
                State::Text => {
                    if c == '<' {
                        self.state = State::TagStart;
                    } else {
                        self.text.push(c);
                    }
                }
                State::TagStart => {
                    if c == '/' || c.is_ascii_alphabetic() {
                        self.flush_text(&mut events);
                        self.tag.clear();
                        self.tag.push(c);
                        self.state = State::Tag;
                    } else if c == '!' {
                        self.flush_text(&mut events);
                        self.bang_dashes = 0;
                        self.state = State::Bang;
                    } else if c == '<' {
                        // stray '<' followed by another candidate tag start
                        self.text.push('<');
                    } else {
                        self.text.push('<');
                        self.text.push(c);
                        self.state = State::Text;
                    }
                }
                State::Tag => {
                    if c == '>' {
                        if let Some(event) = tag_event(&self.tag) {
                            events.push(event);
                        }
                        self.state = State::Text;
                    } else {
                        self.tag.push(c);
                    }
                }
                State::Bang => {
                    if c == '-' {
                        self.bang_dashes += 1;
                        if self.bang_dashes == 2 {
                            self.comment_tail = 0;
                            self.state = State::Comment;
                        }
                    } else if c == '>' {
                        self.state = State::Text;
                    } else {
                        self.state = State::Declaration;
                    }
                }
                State::Comment => {
                    if c == '-' {
                        self.comment_tail = self.comment_tail.saturating_add(1);
                    } else if c == '>' && self.comment_tail >= 2 {
                        self.state = State::Text;
                    } else {
                        self.comment_tail = 0;
                    }
                }
                State::Declaration => {
                    if c == '>' {
                        self.state = State::Text;
                    }
                }
            }
        }
        events
    }

    /// Flush any trailing text. An unterminated tag at end of input is
    /// discarded.
    pub fn finish(&mut self) -> Vec<MarkupEvent> {
        let mut events = Vec::new();
        if self.state == State::Text || self.state == State::TagStart {
            if self.state == State::TagStart {
                self.text.push('<');
                self.state = State::Text;
            }
            self.flush_text(&mut events);
        }
        events
    }

    fn flush_text(&mut self, events: &mut Vec<MarkupEvent>) {
        if !self.text.is_empty() {
            let text = decode_entities(&self.text);
            self.text.clear();
            events.push(MarkupEvent::Text(text));
        }
    }
}

impl Default for MarkupTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

fn tag_event(raw: &str) -> Option<MarkupEvent> {
    let raw = raw.trim();
    if let Some(rest) = raw.strip_prefix('/') {
        let name = tag_name(rest);
        (!name.is_empty()).then(|| MarkupEvent::TagClose(name))
    } else {
        let name = tag_name(raw);
        (!name.is_empty()).then(|| MarkupEvent::TagOpen(name))
    }
}

fn tag_name(raw: &str) -> String {
    raw.chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match tail[1..].find(';').filter(|end| *end <= 10) {
            Some(end) => {
                let name = &tail[1..end + 1];
                match decode_entity(name) {
                    Some(c) => {
                        out.push(c);
                        rest = &tail[end + 2..];
                    }
                    None => {
                        out.push('&');
                        rest = &tail[1..];
                    }
                }
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = if let Some(hex) =
                name.strip_prefix("#x").or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse().ok()?
            } else {
                return None;
            };
            char::from_u32(code)
        }
    }
}
