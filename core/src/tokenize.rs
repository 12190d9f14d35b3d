//! Input tokenizer.
//!
//! Splits a raw input line on whitespace runs and classifies each piece as a
//! positional value, a `--name=value` assignment, or a bare `--name` flag.
//! There is no quoting or escaping.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{KEYWORD_MARKER, Signature};

/// One classified input token.
///
/// # Examples
///
/// ```
/// use command_signature_core::{tokenize, Token};
///
/// let tokens = tokenize("add --count=3 --dry-run");
/// assert_eq!(tokens, vec![
///     Token::Positional("add".into()),
///     Token::Keyword("count".into(), Some("3".into())),
///     Token::Keyword("dry-run".into(), None),
/// ]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Token {
    Positional(String),
    /// Name without the marker, and the assigned text if any.
    Keyword(String, Option<String>),
}

/// Splits `input` into classified tokens.
pub fn tokenize(input: &str) -> Vec<Token> {
    input.split_whitespace().map(classify).collect()
}

/// Classifies a single whitespace-free piece of input.
///
/// A bare marker (`--`) or an assignment with no name (`--=x`) is positional.
pub fn classify(raw: &str) -> Token {
    let Some(rest) = raw.strip_prefix(KEYWORD_MARKER) else {
        return Token::Positional(raw.to_string());
    };
    let (name, value) = match rest.split_once('=') {
        Some((name, value)) => (name, Some(value.to_string())),
        None => (rest, None),
    };
    if name.is_empty() {
        return Token::Positional(raw.to_string());
    }
    Token::Keyword(name.to_string(), value)
}

/// Tokens of one input line, split by kind.
///
/// Positional tokens keep their relative order regardless of where keyword
/// tokens appear between them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenStream {
    pub positional: Vec<String>,
    pub keywords: Vec<(String, Option<String>)>,
}

impl TokenStream {
    /// Tokenizes and splits an input line.
    ///
    /// # Examples
    ///
    /// ```
    /// use command_signature_core::TokenStream;
    ///
    /// let stream = TokenStream::parse("a --x=1 b --y");
    /// assert_eq!(stream.positional, vec!["a", "b"]);
    /// assert_eq!(stream.keywords.len(), 2);
    /// ```
    pub fn parse(input: &str) -> Self {
        Self::from_tokens(tokenize(input))
    }

    pub fn from_tokens(tokens: impl IntoIterator<Item = Token>) -> Self {
        let mut stream = Self::default();
        for token in tokens {
            match token {
                Token::Positional(text) => stream.positional.push(text),
                Token::Keyword(name, value) => stream.keywords.push((name, value)),
            }
        }
        stream
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }
}

/// Keyword tokens resolved against one signature.
///
/// Names and aliases are mapped to argument indices; occurrences keep their
/// input order. Tokens that name no keyword argument of the signature are
/// kept as stray and make the signature unmatchable.
#[derive(Debug, Clone, Default)]
pub struct KeywordMap<'a> {
    entries: BTreeMap<usize, Vec<Option<&'a str>>>,
    stray: Vec<&'a str>,
}

impl<'a> KeywordMap<'a> {
    pub fn resolve(stream: &'a TokenStream, signature: &Signature) -> Self {
        let mut map = Self::default();
        for (name, value) in &stream.keywords {
            match signature.resolve(name) {
                Some(index) if signature.arguments()[index].is_keyword() => {
                    map.entries
                        .entry(index)
                        .or_default()
                        .push(value.as_deref());
                }
                _ => map.stray.push(name),
            }
        }
        map
    }

    /// Occurrences for the argument at `index`, in input order.
    pub fn get(&self, index: usize) -> Option<&[Option<&'a str>]> {
        self.entries.get(&index).map(Vec::as_slice)
    }

    /// Number of distinct keyword arguments present.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keyword names that resolve to no keyword argument.
    pub fn stray(&self) -> &[&'a str] {
        &self.stray
    }
}
