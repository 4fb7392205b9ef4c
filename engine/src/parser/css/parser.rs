// Selector parser
//
// Supports the subset of Selectors Level 3 the decoration passes rely on:
// type and universal selectors, #id, .class, [attr] / [attr=value],
// :first-child / :first-of-type, descendant and child combinators, and
// comma-separated lists. Anything else is rejected rather than ignored.

use super::{CssToken, CssTokenizer};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected token {found} in selector `{selector}`")]
    UnexpectedToken { selector: String, found: String },
    #[error("unsupported pseudo-class :{0}")]
    UnsupportedPseudo(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoClass {
    FirstChild,
    FirstOfType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSelector {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompoundSelector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeSelector>,
    pub pseudo_classes: Vec<PseudoClass>,
}

impl CompoundSelector {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attributes.is_empty()
            && self.pseudo_classes.is_empty()
    }
}

/// Compounds left to right. The combinator stored with a compound joins it
/// to the compound before it; the first one is always `Descendant`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSelector {
    pub compounds: Vec<(Combinator, CompoundSelector)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList(pub Vec<ComplexSelector>);

pub fn parse_selector(input: &str) -> Result<SelectorList, SelectorError> {
    let tokens = CssTokenizer::new(input).tokenize();
    SelectorParser {
        source: input,
        tokens,
        pos: 0,
    }
    .parse_list()
}

static EOF: CssToken = CssToken::Eof;

struct SelectorParser<'a> {
    source: &'a str,
    tokens: Vec<CssToken>,
    pos: usize,
}

impl SelectorParser<'_> {
    fn peek(&self) -> &CssToken {
        self.tokens.get(self.pos).unwrap_or(&EOF)
    }

    fn advance(&mut self) -> CssToken {
        let token = self.peek().clone();
        self.pos += 1;
        token
    }

    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while *self.peek() == CssToken::Whitespace {
            self.pos += 1;
            skipped = true;
        }
        skipped
    }

    fn unexpected(&self) -> SelectorError {
        SelectorError::UnexpectedToken {
            selector: self.source.to_string(),
            found: format!("{:?}", self.peek()),
        }
    }

    fn parse_list(&mut self) -> Result<SelectorList, SelectorError> {
        let mut selectors = Vec::new();
        loop {
            selectors.push(self.parse_complex()?);
            match self.advance() {
                CssToken::Comma => continue,
                CssToken::Eof => break,
                _ => {
                    self.pos -= 1;
                    return Err(self.unexpected());
                }
            }
        }
        Ok(SelectorList(selectors))
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        self.skip_whitespace();
        let first = self.parse_compound()?;
        let mut compounds = vec![(Combinator::Descendant, first)];

        loop {
            let had_whitespace = self.skip_whitespace();
            let combinator = match self.peek() {
                CssToken::Greater => {
                    self.pos += 1;
                    self.skip_whitespace();
                    Combinator::Child
                }
                CssToken::Comma | CssToken::Eof => break,
                CssToken::Plus | CssToken::Tilde => return Err(self.unexpected()),
                _ if had_whitespace => Combinator::Descendant,
                _ => return Err(self.unexpected()),
            };
            compounds.push((combinator, self.parse_compound()?));
        }

        Ok(ComplexSelector { compounds })
    }

    fn parse_compound(&mut self) -> Result<CompoundSelector, SelectorError> {
        let mut compound = CompoundSelector::default();
        let mut universal = false;

        match self.peek().clone() {
            CssToken::Ident(name) => {
                self.pos += 1;
                compound.tag = Some(name.to_ascii_lowercase());
            }
            CssToken::Asterisk => {
                self.pos += 1;
                universal = true;
            }
            _ => {}
        }

        loop {
            match self.peek().clone() {
                CssToken::Hash(id) if !id.is_empty() => {
                    self.pos += 1;
                    compound.id = Some(id);
                }
                CssToken::Dot(class) if !class.is_empty() => {
                    self.pos += 1;
                    compound.classes.push(class);
                }
                CssToken::OpenBracket => {
                    self.pos += 1;
                    compound.attributes.push(self.parse_attribute()?);
                }
                CssToken::Colon => {
                    self.pos += 1;
                    let CssToken::Ident(name) = self.advance() else {
                        self.pos -= 1;
                        return Err(self.unexpected());
                    };
                    let pseudo = match name.to_ascii_lowercase().as_str() {
                        "first-child" => PseudoClass::FirstChild,
                        "first-of-type" => PseudoClass::FirstOfType,
                        _ => return Err(SelectorError::UnsupportedPseudo(name)),
                    };
                    compound.pseudo_classes.push(pseudo);
                }
                _ => break,
            }
        }

        if compound.is_empty() && !universal {
            return Err(match self.peek() {
                CssToken::Eof => SelectorError::Empty,
                _ => self.unexpected(),
            });
        }
        Ok(compound)
    }

    fn parse_attribute(&mut self) -> Result<AttributeSelector, SelectorError> {
        self.skip_whitespace();
        let CssToken::Ident(name) = self.advance() else {
            self.pos -= 1;
            return Err(self.unexpected());
        };
        self.skip_whitespace();

        let value = match self.advance() {
            CssToken::CloseBracket => return Ok(AttributeSelector { name, value: None }),
            CssToken::Equals => {
                self.skip_whitespace();
                match self.advance() {
                    CssToken::String(v) | CssToken::Ident(v) => v,
                    _ => {
                        self.pos -= 1;
                        return Err(self.unexpected());
                    }
                }
            }
            _ => {
                self.pos -= 1;
                return Err(self.unexpected());
            }
        };

        self.skip_whitespace();
        match self.advance() {
            CssToken::CloseBracket => Ok(AttributeSelector {
                name,
                value: Some(value),
            }),
            _ => {
                self.pos -= 1;
                Err(self.unexpected())
            }
        }
    }
}
