pub mod tokenizer;
pub mod tree_builder;

pub use tokenizer::{decode_character_references, Attribute, Token, Tokenizer};
pub use tree_builder::HtmlParser;
