pub mod parser;

pub use parser::{
    parse_selector, AttributeSelector, Combinator, ComplexSelector, CompoundSelector, PseudoClass,
    SelectorError, SelectorList,
};

/// Tokens of the selector grammar. Declarations and at-rules are not
/// tokenized here; only what selector lists need.
#[derive(Debug, Clone, PartialEq)]
pub enum CssToken {
    Ident(String),
    Hash(String),      // #id
    Dot(String),       // .class
    Asterisk,          // *
    Greater,           // >
    Plus,              // +
    Tilde,             // ~
    OpenBracket,       // [
    CloseBracket,      // ]
    Colon,             // :
    Comma,             // ,
    Equals,            // =
    String(String),
    Whitespace,
    Delim(char),
    Eof,
}

pub struct CssTokenizer {
    input: Vec<char>,
    pos: usize,
}

impl CssTokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn is_ident_char(c: char) -> bool {
        c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
    }

    fn consume_ident(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.pos += 1;
                if let Some(escaped) = self.next() {
                    ident.push(escaped);
                }
            } else if Self::is_ident_char(c) {
                ident.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        ident
    }

    fn consume_string(&mut self, quote: char) -> String {
        let mut s = String::new();
        while let Some(c) = self.next() {
            match c {
                '\\' => {
                    if let Some(escaped) = self.next() {
                        s.push(escaped);
                    }
                }
                c if c == quote => break,
                c => s.push(c),
            }
        }
        s
    }

    pub fn tokenize(&mut self) -> Vec<CssToken> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            let token = match c {
                c if c.is_whitespace() => {
                    while self.peek().is_some_and(char::is_whitespace) {
                        self.pos += 1;
                    }
                    CssToken::Whitespace
                }
                '#' => {
                    self.pos += 1;
                    CssToken::Hash(self.consume_ident())
                }
                '.' => {
                    self.pos += 1;
                    CssToken::Dot(self.consume_ident())
                }
                '"' | '\'' => {
                    self.pos += 1;
                    CssToken::String(self.consume_string(c))
                }
                '*' => { self.pos += 1; CssToken::Asterisk }
                '>' => { self.pos += 1; CssToken::Greater }
                '+' => { self.pos += 1; CssToken::Plus }
                '~' => { self.pos += 1; CssToken::Tilde }
                '[' => { self.pos += 1; CssToken::OpenBracket }
                ']' => { self.pos += 1; CssToken::CloseBracket }
                ':' => { self.pos += 1; CssToken::Colon }
                ',' => { self.pos += 1; CssToken::Comma }
                '=' => { self.pos += 1; CssToken::Equals }
                c if Self::is_ident_char(c) || c == '\\' => CssToken::Ident(self.consume_ident()),
                other => {
                    self.pos += 1;
                    CssToken::Delim(other)
                }
            };
            tokens.push(token);
        }

        tokens.push(CssToken::Eof);
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_compound_selector() {
        let tokens = CssTokenizer::new("main > div.section-wrapper:first-of-type").tokenize();
        assert_eq!(
            tokens,
            vec![
                CssToken::Ident("main".into()),
                CssToken::Whitespace,
                CssToken::Greater,
                CssToken::Whitespace,
                CssToken::Ident("div".into()),
                CssToken::Dot("section-wrapper".into()),
                CssToken::Colon,
                CssToken::Ident("first-of-type".into()),
                CssToken::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_attribute_selector() {
        let tokens = CssTokenizer::new(r#"link[href="/a b.css"]"#).tokenize();
        assert_eq!(tokens[1], CssToken::OpenBracket);
        assert_eq!(tokens[2], CssToken::Ident("href".into()));
        assert_eq!(tokens[3], CssToken::Equals);
        assert_eq!(tokens[4], CssToken::String("/a b.css".into()));
        assert_eq!(tokens[5], CssToken::CloseBracket);
    }
}
