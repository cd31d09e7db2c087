//! Parser for Valve's KeyValues text format (`.vdf` / `.acf` files).
//!
//! The parser is a small recursive descent over a token stream and produces an
//! ordered tree. Duplicate keys are kept; lookups return the first match and
//! compare keys ASCII case-insensitively, the way the Steam client does.

use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VdfError {
    #[error("unterminated string starting on line {line}")]
    UnterminatedString { line: usize },
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str },
    #[error("unexpected '{found}' on line {line}")]
    UnexpectedToken { found: String, line: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VdfValue {
    Str(String),
    Object(VdfObject),
}

impl VdfValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            VdfValue::Str(value) => Some(value),
            VdfValue::Object(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&VdfObject> {
        match self {
            VdfValue::Object(object) => Some(object),
            VdfValue::Str(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VdfObject {
    entries: Vec<(String, VdfValue)>,
}

impl VdfObject {
    pub fn get(&self, key: &str) -> Option<&VdfValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(VdfValue::as_str)
    }

    pub fn get_object(&self, key: &str) -> Option<&VdfObject> {
        self.get(key).and_then(VdfValue::as_object)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VdfValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(String),
    Open,
    Close,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
        }
    }

    /// Returns the next token with the line it starts on.
    fn next_token(&mut self) -> Result<Option<(Token, usize)>, VdfError> {
        loop {
            self.skip_whitespace();
            let line = self.line;
            let Some(&ch) = self.chars.peek() else {
                return Ok(None);
            };

            match ch {
                '{' => {
                    self.chars.next();
                    return Ok(Some((Token::Open, line)));
                }
                '}' => {
                    self.chars.next();
                    return Ok(Some((Token::Close, line)));
                }
                '"' => {
                    self.chars.next();
                    let text = self.quoted(line)?;
                    return Ok(Some((Token::Text(text), line)));
                }
                '/' => {
                    self.chars.next();
                    if self.chars.peek() == Some(&'/') {
                        self.skip_line();
                        continue;
                    }
                    let mut text = String::from('/');
                    text.push_str(&self.bare());
                    return Ok(Some((Token::Text(text), line)));
                }
                '[' => {
                    // Platform conditionals like [$WIN32] carry no data for us.
                    self.skip_conditional();
                    continue;
                }
                _ => return Ok(Some((Token::Text(self.bare()), line))),
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if !ch.is_whitespace() {
                break;
            }
            if ch == '\n' {
                self.line += 1;
            }
            self.chars.next();
        }
    }

    fn skip_line(&mut self) {
        for ch in self.chars.by_ref() {
            if ch == '\n' {
                self.line += 1;
                break;
            }
        }
    }

    fn skip_conditional(&mut self) {
        for ch in self.chars.by_ref() {
            if ch == '\n' {
                self.line += 1;
            }
            if ch == ']' {
                break;
            }
        }
    }

    fn quoted(&mut self, start_line: usize) -> Result<String, VdfError> {
        let mut text = String::new();
        while let Some(ch) = self.chars.next() {
            match ch {
                '"' => return Ok(text),
                '\\' => match self.chars.next() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(other) => text.push(other),
                    None => break,
                },
                '\n' => {
                    self.line += 1;
                    text.push(ch);
                }
                _ => text.push(ch),
            }
        }
        Err(VdfError::UnterminatedString { line: start_line })
    }

    fn bare(&mut self) -> String {
        let mut text = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() || matches!(ch, '"' | '{' | '}') {
                break;
            }
            text.push(ch);
            self.chars.next();
        }
        text
    }
}

/// Parse a KeyValues document into its top-level object.
pub fn parse(input: &str) -> Result<VdfObject, VdfError> {
    let mut lexer = Lexer::new(input);
    parse_object(&mut lexer, false)
}

fn parse_object(lexer: &mut Lexer<'_>, nested: bool) -> Result<VdfObject, VdfError> {
    let mut object = VdfObject::default();

    loop {
        let key = match lexer.next_token()? {
            None if nested => return Err(VdfError::UnexpectedEof { expected: "'}'" }),
            None => return Ok(object),
            Some((Token::Close, _)) if nested => return Ok(object),
            Some((Token::Close, line)) => {
                return Err(VdfError::UnexpectedToken {
                    found: "}".to_string(),
                    line,
                })
            }
            Some((Token::Open, line)) => {
                return Err(VdfError::UnexpectedToken {
                    found: "{".to_string(),
                    line,
                })
            }
            Some((Token::Text(key), _)) => key,
        };

        let value = match lexer.next_token()? {
            None => return Err(VdfError::UnexpectedEof { expected: "a value" }),
            Some((Token::Text(text), _)) => VdfValue::Str(text),
            Some((Token::Open, _)) => VdfValue::Object(parse_object(lexer, true)?),
            Some((Token::Close, line)) => {
                return Err(VdfError::UnexpectedToken {
                    found: "}".to_string(),
                    line,
                })
            }
        };

        object.entries.push((key, value));
    }
}
