//! Signature DSL compiler.
//!
//! Turns text such as `"(int) count [--verbose] | --help"` into a [`Signature`].
//!
//! ```text
//! signature := orxor
//! orxor     := and (('|' | '/') and)*
//! and       := unit+
//! unit      := leaf | '[' signature ']' | '<' signature '>'
//! leaf      := ('(' type ')')? name
//! type      := native | symbol | native '[' digits? ']'
//! ```
//!
//! Juxtaposition (AND) binds tighter than `|` (XOR) and `/` (OR), which share
//! one precedence level and fold left into binary groups. The outermost
//! expression is always a required group.

use std::collections::HashMap;

use tracing::debug;

use crate::error::ParseError;
use crate::types::{
    ArgumentKind, ArgumentSpec, ArrayShape, Combinator, Group, KEYWORD_MARKER, NativeType, Node,
    Signature, TypeDescriptor,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Lexeme {
    Open(char),
    Close(char),
    Op(Combinator),
    /// Contents of a `(...)` annotation.
    Annotation(String),
    Name(String),
}

#[derive(Debug, Clone)]
struct Spanned {
    lexeme: Lexeme,
    offset: usize,
}

/// Compiles a signature.
///
/// # Errors
///
/// Returns a [`ParseError`] describing the first problem found: unbalanced or
/// empty groups, dangling operators, malformed annotations and array sizes,
/// invalid or duplicate names.
///
/// # Examples
///
/// ```
/// use command_signature_core::{compile, Combinator, Node};
///
/// let signature = compile("foo | bar / baz").unwrap();
/// let root = signature.root();
/// assert_eq!(root.combinator, Combinator::Or);
/// assert!(matches!(&root.children[0], Node::Group(inner) if inner.combinator == Combinator::Xor));
///
/// assert!(compile("foo [bar").is_err());
/// assert!(compile("(int[x]) foo").is_err());
/// ```
pub fn compile(source: &str) -> Result<Signature, ParseError> {
    let lexemes = lex(source)?;
    if lexemes.is_empty() {
        return Err(ParseError::EmptySignature);
    }

    let mut parser = Parser {
        lexemes,
        pos: 0,
        arguments: Vec::new(),
    };
    let node = parser.parse_orxor(None)?;
    if let Some(stray) = parser.peek() {
        return Err(match stray.lexeme {
            Lexeme::Close(close) => ParseError::UnmatchedClose {
                close,
                offset: stray.offset,
            },
            // parse_orxor only stops early on a closer.
            _ => ParseError::UnexpectedChar {
                ch: source[stray.offset..].chars().next().unwrap_or(' '),
                offset: stray.offset,
            },
        });
    }

    let root = match node {
        Node::Group(group) => group,
        leaf => Group::new(vec![leaf], Combinator::And, true),
    };

    let lookup = parser
        .arguments
        .iter()
        .enumerate()
        .map(|(index, spec)| (spec.name.clone(), index))
        .collect::<HashMap<_, _>>();

    let signature = Signature {
        source: source.trim().to_string(),
        root,
        arguments: parser.arguments,
        lookup,
    };
    debug!(
        signature = signature.source(),
        arguments = signature.arguments().len(),
        "compiled signature"
    );
    Ok(signature)
}

fn lex(source: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut out = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        let lexeme = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '[' | '<' => {
                chars.next();
                Lexeme::Open(ch)
            }
            ']' | '>' => {
                chars.next();
                Lexeme::Close(ch)
            }
            '|' => {
                chars.next();
                Lexeme::Op(Combinator::Xor)
            }
            '/' => {
                chars.next();
                Lexeme::Op(Combinator::Or)
            }
            '(' => {
                chars.next();
                let start = offset + 1;
                let mut end = None;
                for (idx, c) in chars.by_ref() {
                    if c == ')' {
                        end = Some(idx);
                        break;
                    }
                }
                let Some(end) = end else {
                    return Err(ParseError::UnclosedAnnotation { offset });
                };
                Lexeme::Annotation(source[start..end].trim().to_string())
            }
            c if is_name_char(c) => {
                let mut end = offset;
                while let Some(&(idx, c)) = chars.peek() {
                    if !is_name_char(c) {
                        break;
                    }
                    end = idx + c.len_utf8();
                    chars.next();
                }
                Lexeme::Name(source[offset..end].to_string())
            }
            _ => return Err(ParseError::UnexpectedChar { ch, offset }),
        };
        out.push(Spanned { lexeme, offset });
    }

    Ok(out)
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-')
}

/// Returns `true` for identifiers usable as argument names and type symbols.
pub(crate) fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '-'))
}

struct Parser {
    lexemes: Vec<Spanned>,
    pos: usize,
    arguments: Vec<ArgumentSpec>,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.lexemes.get(self.pos)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let next = self.lexemes.get(self.pos).cloned();
        if next.is_some() {
            self.pos += 1;
        }
        next
    }

    /// `opener` is the offset of the enclosing bracket, if any.
    fn parse_orxor(&mut self, opener: Option<usize>) -> Result<Node, ParseError> {
        let Some(mut left) = self.parse_and()? else {
            return Err(match self.peek() {
                Some(Spanned {
                    lexeme: Lexeme::Op(op),
                    offset,
                }) => ParseError::DanglingOperator {
                    op: operator_char(*op),
                    offset: *offset,
                },
                Some(Spanned {
                    lexeme: Lexeme::Close(close),
                    offset,
                }) if opener.is_none() => ParseError::UnmatchedClose {
                    close: *close,
                    offset: *offset,
                },
                _ => match opener {
                    Some(offset) => ParseError::EmptyGroup { offset },
                    None => ParseError::EmptySignature,
                },
            });
        };

        while let Some(Spanned {
            lexeme: Lexeme::Op(op),
            offset,
        }) = self.peek().cloned()
        {
            self.advance();
            let Some(right) = self.parse_and()? else {
                return Err(ParseError::DanglingOperator {
                    op: operator_char(op),
                    offset,
                });
            };
            left = Node::Group(Group::new(vec![left, right], op, true));
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Option<Node>, ParseError> {
        let mut units = Vec::new();
        while let Some(next) = self.peek() {
            match next.lexeme {
                Lexeme::Open(_) => units.push(self.parse_group()?),
                Lexeme::Annotation(_) | Lexeme::Name(_) => units.push(self.parse_leaf()?),
                Lexeme::Close(_) | Lexeme::Op(_) => break,
            }
        }

        Ok(match units.len() {
            0 => None,
            1 => units.pop(),
            _ => Some(Node::Group(Group::new(units, Combinator::And, true))),
        })
    }

    fn parse_group(&mut self) -> Result<Node, ParseError> {
        let Some(Spanned {
            lexeme: Lexeme::Open(open),
            offset,
        }) = self.advance()
        else {
            unreachable!("parse_group is only called on an opening bracket");
        };
        let expected = if open == '[' { ']' } else { '>' };

        let inner = self.parse_orxor(Some(offset))?;
        match self.advance() {
            Some(Spanned {
                lexeme: Lexeme::Close(close),
                ..
            }) if close == expected => {}
            Some(Spanned {
                lexeme: Lexeme::Close(found),
                ..
            }) => {
                return Err(ParseError::MismatchedGroup {
                    open,
                    found,
                    offset,
                });
            }
            _ => return Err(ParseError::UnbalancedGroup { open, offset }),
        }

        let required = open == '<';
        Ok(match inner {
            Node::Group(mut group) => {
                group.required = required;
                Node::Group(group)
            }
            leaf => Node::Group(Group::new(vec![leaf], Combinator::And, required)),
        })
    }

    fn parse_leaf(&mut self) -> Result<Node, ParseError> {
        let mut annotation = None;
        if let Some(Spanned {
            lexeme: Lexeme::Annotation(text),
            offset,
        }) = self.peek().cloned()
        {
            self.advance();
            annotation = Some(parse_annotation(&text, offset)?);
            if !matches!(
                self.peek(),
                Some(Spanned {
                    lexeme: Lexeme::Name(_),
                    ..
                })
            ) {
                return Err(ParseError::MissingName { offset });
            }
        }

        let Some(Spanned {
            lexeme: Lexeme::Name(raw),
            offset,
        }) = self.advance()
        else {
            unreachable!("parse_leaf is only called on an annotation or a name");
        };

        let (kind, name) = match raw.strip_prefix(KEYWORD_MARKER) {
            Some(rest) => (ArgumentKind::Keyword, rest),
            None => (ArgumentKind::Positional, raw.as_str()),
        };
        if !is_identifier(name) {
            return Err(ParseError::InvalidName { name: raw, offset });
        }
        if self.arguments.iter().any(|spec| spec.name == name) {
            return Err(ParseError::DuplicateName(name.to_string()));
        }

        let (ty, array) = annotation.unwrap_or_else(|| match kind {
            ArgumentKind::Keyword => (TypeDescriptor::Native(NativeType::Bool), ArrayShape::Scalar),
            ArgumentKind::Positional => (TypeDescriptor::Any, ArrayShape::Scalar),
        });

        self.arguments
            .push(ArgumentSpec::new(name, kind, ty, array));
        Ok(Node::Leaf(self.arguments.len() - 1))
    }
}

fn operator_char(op: Combinator) -> char {
    match op {
        Combinator::Or => '/',
        _ => '|',
    }
}

fn parse_annotation(text: &str, offset: usize) -> Result<(TypeDescriptor, ArrayShape), ParseError> {
    let (base, array) = match text.split_once('[') {
        None => (text.trim(), ArrayShape::Scalar),
        Some((base, rest)) => {
            let malformed = || ParseError::MalformedArraySize {
                text: text.to_string(),
                offset,
            };
            let size = rest.trim_end().strip_suffix(']').ok_or_else(malformed)?.trim();
            let array = if size.is_empty() {
                ArrayShape::Greedy
            } else if size.chars().all(|ch| ch.is_ascii_digit()) {
                match size.parse::<usize>() {
                    Ok(count) if count > 0 => ArrayShape::Fixed(count),
                    _ => return Err(malformed()),
                }
            } else {
                return Err(malformed());
            };
            (base.trim(), array)
        }
    };

    let ty = if base == "any" {
        TypeDescriptor::Any
    } else if let Some(native) = NativeType::from_name(base) {
        TypeDescriptor::Native(native)
    } else if is_identifier(base) {
        if array != ArrayShape::Scalar {
            return Err(ParseError::CustomTypeArray {
                symbol: base.to_string(),
                offset,
            });
        }
        TypeDescriptor::Custom(base.to_string())
    } else {
        return Err(ParseError::InvalidType {
            text: text.to_string(),
            offset,
        });
    };

    Ok((ty, array))
}
