// HTML tokenizer
// Reference: https://html.spec.whatwg.org/multipage/parsing.html#tokenization
//
// Covers what server-rendered content pages use: tags with quoted, unquoted
// and bare attributes, comments, doctype, raw text for script/style and
// escapable raw text for textarea/title, and the common character
// references. Parse errors are recovered silently the way browsers do.

use tracing::trace;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Doctype {
        name: Option<String>,
    },
    StartTag {
        name: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    Comment(String),
    /// A run of character data, references already decoded.
    Text(String),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Tag states per HTML §13.2.5; data, comment and doctype handling is done
/// by dedicated scanners instead of per-character states.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TagState {
    TagName,
    BeforeAttributeName,
    AttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    AttributeValueDoubleQuoted,
    AttributeValueSingleQuoted,
    AttributeValueUnquoted,
    AfterAttributeValueQuoted,
    SelfClosingStartTag,
}

/// Void elements that cannot have content (HTML §13.1.2)
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr",
];

/// Raw text elements (HTML §13.1.2.1)
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Escapable raw text elements (HTML §13.1.2.2)
pub const ESCAPABLE_RAW_TEXT_ELEMENTS: &[&str] = &["textarea", "title"];

pub struct Tokenizer {
    input: Vec<char>,
    pos: usize,
    /// Set after a raw text start tag; the next token is its content.
    raw_text_tag: Option<String>,
    emitted_eof: bool,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            raw_text_tag: None,
            emitted_eof: false,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn consume(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn next_chars_are_case_insensitive(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| {
            self.input
                .get(self.pos + i)
                .is_some_and(|ic| ic.eq_ignore_ascii_case(&c))
        })
    }

    /// Consume up to (and past) `terminator`; returns the text before it.
    fn consume_until(&mut self, terminator: &str) -> String {
        let mut out = String::new();
        while self.pos < self.input.len() {
            if self.next_chars_are_case_insensitive(terminator) {
                self.pos += terminator.chars().count();
                return out;
            }
            out.push(self.input[self.pos]);
            self.pos += 1;
        }
        out
    }

    pub fn next_token(&mut self) -> Option<Token> {
        if let Some(tag) = self.raw_text_tag.take() {
            if let Some(token) = self.raw_text(&tag) {
                return Some(token);
            }
        }

        let token = match self.peek() {
            None => {
                if self.emitted_eof {
                    return None;
                }
                self.emitted_eof = true;
                Token::Eof
            }
            Some('<') => self.tag_open(),
            Some(_) => self.data(),
        };
        trace!(?token, "html token");
        Some(token)
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        tokens
    }

    fn data(&mut self) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '<' {
                break;
            }
            text.push(c);
            self.pos += 1;
        }
        Token::Text(decode_character_references(&text))
    }

    /// Everything up to the matching end tag, which is left for the next call.
    fn raw_text(&mut self, tag: &str) -> Option<Token> {
        let end_tag = format!("</{}", tag);
        let start = self.pos;
        while self.pos < self.input.len() {
            if self.next_chars_are_case_insensitive(&end_tag) {
                let boundary = self.peek_at(end_tag.chars().count());
                if matches!(boundary, None | Some('>') | Some('/')) || boundary.is_some_and(char::is_whitespace) {
                    break;
                }
            }
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        let raw: String = self.input[start..self.pos].iter().collect();
        if ESCAPABLE_RAW_TEXT_ELEMENTS.contains(&tag) {
            Some(Token::Text(decode_character_references(&raw)))
        } else {
            Some(Token::Text(raw))
        }
    }

    fn tag_open(&mut self) -> Token {
        match self.peek_at(1) {
            Some('!') => {
                if self.next_chars_are_case_insensitive("<!--") {
                    self.pos += 4;
                    Token::Comment(self.consume_until("-->"))
                } else if self.next_chars_are_case_insensitive("<!doctype") {
                    self.pos += 9;
                    let rest = self.consume_until(">");
                    let name = rest.split_whitespace().next().map(str::to_ascii_lowercase);
                    Token::Doctype { name }
                } else {
                    self.pos += 2;
                    Token::Comment(self.consume_until(">"))
                }
            }
            Some('?') => {
                self.pos += 1;
                Token::Comment(self.consume_until(">"))
            }
            Some('/') => match self.peek_at(2) {
                Some(c) if c.is_ascii_alphabetic() => {
                    self.pos += 2;
                    self.end_tag()
                }
                Some('>') => {
                    // `</>` is dropped entirely.
                    self.pos += 3;
                    Token::Text(String::new())
                }
                _ => {
                    self.pos += 2;
                    Token::Comment(self.consume_until(">"))
                }
            },
            Some(c) if c.is_ascii_alphabetic() => {
                self.pos += 1;
                self.start_tag()
            }
            _ => {
                self.pos += 1;
                let mut text = String::from("<");
                if let Token::Text(rest) = self.data() {
                    text.push_str(&rest);
                }
                Token::Text(text)
            }
        }
    }

    fn end_tag(&mut self) -> Token {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '/' || c == '>' {
                break;
            }
            name.push(c.to_ascii_lowercase());
            self.pos += 1;
        }
        // Attributes on end tags are a parse error and ignored.
        self.consume_until(">");
        Token::EndTag { name }
    }

    fn start_tag(&mut self) -> Token {
        let mut state = TagState::TagName;
        let mut name = String::new();
        let mut attributes: Vec<Attribute> = Vec::new();
        let mut current: Option<Attribute> = None;
        let mut self_closing = false;

        fn finish(current: &mut Option<Attribute>, attributes: &mut Vec<Attribute>) {
            if let Some(mut attr) = current.take() {
                // First occurrence wins on duplicates.
                if !attributes.iter().any(|a| a.name == attr.name) {
                    attr.value = decode_character_references(&attr.value);
                    attributes.push(attr);
                }
            }
        }

        fn begin(current: &mut Option<Attribute>, c: char) {
            *current = Some(Attribute {
                name: c.to_ascii_lowercase().to_string(),
                value: String::new(),
            });
        }

        while let Some(c) = self.consume() {
            match state {
                TagState::TagName => match c {
                    c if c.is_whitespace() => state = TagState::BeforeAttributeName,
                    '/' => state = TagState::SelfClosingStartTag,
                    '>' => break,
                    c => name.push(c.to_ascii_lowercase()),
                },
                TagState::BeforeAttributeName => match c {
                    c if c.is_whitespace() => {}
                    '/' => state = TagState::SelfClosingStartTag,
                    '>' => break,
                    c => {
                        begin(&mut current, c);
                        state = TagState::AttributeName;
                    }
                },
                TagState::AttributeName => match c {
                    c if c.is_whitespace() => state = TagState::AfterAttributeName,
                    '/' => {
                        finish(&mut current, &mut attributes);
                        state = TagState::SelfClosingStartTag;
                    }
                    '=' => state = TagState::BeforeAttributeValue,
                    '>' => break,
                    c => {
                        if let Some(attr) = current.as_mut() {
                            attr.name.push(c.to_ascii_lowercase());
                        }
                    }
                },
                TagState::AfterAttributeName => match c {
                    c if c.is_whitespace() => {}
                    '/' => {
                        finish(&mut current, &mut attributes);
                        state = TagState::SelfClosingStartTag;
                    }
                    '=' => state = TagState::BeforeAttributeValue,
                    '>' => break,
                    c => {
                        finish(&mut current, &mut attributes);
                        begin(&mut current, c);
                        state = TagState::AttributeName;
                    }
                },
                TagState::BeforeAttributeValue => match c {
                    c if c.is_whitespace() => {}
                    '"' => state = TagState::AttributeValueDoubleQuoted,
                    '\'' => state = TagState::AttributeValueSingleQuoted,
                    '>' => break,
                    c => {
                        if let Some(attr) = current.as_mut() {
                            attr.value.push(c);
                        }
                        state = TagState::AttributeValueUnquoted;
                    }
                },
                TagState::AttributeValueDoubleQuoted | TagState::AttributeValueSingleQuoted => {
                    let quote = if state == TagState::AttributeValueDoubleQuoted { '"' } else { '\'' };
                    if c == quote {
                        finish(&mut current, &mut attributes);
                        state = TagState::AfterAttributeValueQuoted;
                    } else if let Some(attr) = current.as_mut() {
                        attr.value.push(c);
                    }
                }
                TagState::AttributeValueUnquoted => match c {
                    c if c.is_whitespace() => {
                        finish(&mut current, &mut attributes);
                        state = TagState::BeforeAttributeName;
                    }
                    '>' => break,
                    c => {
                        if let Some(attr) = current.as_mut() {
                            attr.value.push(c);
                        }
                    }
                },
                TagState::AfterAttributeValueQuoted => match c {
                    c if c.is_whitespace() => state = TagState::BeforeAttributeName,
                    '/' => state = TagState::SelfClosingStartTag,
                    '>' => break,
                    _ => {
                        self.pos -= 1;
                        state = TagState::BeforeAttributeName;
                    }
                },
                TagState::SelfClosingStartTag => match c {
                    '>' => {
                        self_closing = true;
                        break;
                    }
                    _ => {
                        self.pos -= 1;
                        state = TagState::BeforeAttributeName;
                    }
                },
            }
        }
        finish(&mut current, &mut attributes);

        if !self_closing
            && (RAW_TEXT_ELEMENTS.contains(&name.as_str())
                || ESCAPABLE_RAW_TEXT_ELEMENTS.contains(&name.as_str()))
        {
            self.raw_text_tag = Some(name.clone());
        }

        Token::StartTag {
            name,
            attributes,
            self_closing,
        }
    }
}

/// Decode named and numeric character references. Unknown references are
/// left as written.
pub fn decode_character_references(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest[1..].find(';').filter(|&end| end <= 10).and_then(|end| {
            let body = &rest[1..=end];
            decode_reference(body).map(|c| (c, end + 2))
        });

        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(body: &str) -> Option<char> {
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        "copy" => Some('©'),
        "reg" => Some('®'),
        "hellip" => Some('…'),
        "mdash" => Some('—'),
        "ndash" => Some('–'),
        _ => None,
    }
}
