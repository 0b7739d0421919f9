//! Tokenized binary encoding.
//!
//! Every token starts with a little endian `u16` tag:
//!
//! | Tag   | Token        | Payload                                                     |
//! |-------|--------------|-------------------------------------------------------------|
//! | 1     | Name         | `u32` length, bytes                                         |
//! | 2     | String       | `u32` length, bytes, `u16` terminator                       |
//! | 3     | Integer      | `u32`                                                       |
//! | 5     | GUID         | 16 bytes                                                    |
//! | 6     | Integer list | `u32` count, `count` x `u32`                                |
//! | 7     | Float list   | `u32` count, `count` floats of the width given in the header |
//! | 10-20 | Punctuation  | none                                                        |
//! | 31    | Template     | none, followed by the template declaration                  |
//! | 40-52 | Keywords     | none                                                        |
//!
//! Lists are read one element at a time, so a single list may span several members.

use tracing::{debug, instrument};
use winnow::{
    binary::{le_f32, le_f64, le_u16, le_u32},
    error::ContextError,
    token::take,
    Parser,
};

use super::{read_object, OpenItem, Syntax};
use crate::{
    error::{Error, Result},
    header::{FloatSize, Format, XHeader, HEADER_SIZE},
    mszip,
    object::Value,
    template::{Kind, Scalar},
    XFile,
};

const TOKEN_NAME: u16 = 1;
const TOKEN_STRING: u16 = 2;
const TOKEN_INTEGER: u16 = 3;
const TOKEN_GUID: u16 = 5;
const TOKEN_INTEGER_LIST: u16 = 6;
const TOKEN_FLOAT_LIST: u16 = 7;
const TOKEN_OBRACE: u16 = 10;
const TOKEN_CBRACE: u16 = 11;
const TOKEN_TEMPLATE: u16 = 31;

/// Parse a `bin ` or `bzip` file.
#[instrument(skip(bytes), fields(len = bytes.len()), err)]
pub fn parse(bytes: &[u8]) -> Result<XFile> {
    let header = XHeader::parse(bytes)?;
    if header.format.is_compressed() {
        return parse(&mszip::decompress(bytes)?);
    }
    if header.format != Format::Binary {
        return Err(Error::UnsupportedFormat {
            format: String::from_utf8_lossy(header.format.tag()).into_owned(),
            expected: "bin or bzip",
        });
    }

    let mut tokens = Tokens::new(bytes, HEADER_SIZE, header.float_size);
    let mut objects = Vec::new();

    let mut token = loop {
        if tokens.is_empty() {
            return Ok(XFile::new(header, objects));
        }
        match tokens.next_token()? {
            Token::Template => continue,
            token => break token,
        }
    };

    loop {
        let offset = tokens.offset();
        let Token::Name(name) = token else {
            return Err(Error::UnexpectedToken {
                offset,
                expected: "data object type",
                found: token.to_string(),
            });
        };
        let kind = Kind::from_name(&name).ok_or(Error::UnknownKind { offset, name })?;
        objects.push(read_object(&mut tokens, kind)?);

        if tokens.is_empty() {
            break;
        }
        token = tokens.next_token()?;
    }

    debug!(objects = objects.len(), "parsed binary file");
    Ok(XFile::new(header, objects))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    String(String),
    Integer(u32),
    Guid(String),
    IntegerElement(u32),
    FloatElement(f64),
    Punctuation(u16),
    Template,
    Keyword(u16),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Name(name) => write!(f, "name `{name}`"),
            Token::String(value) => write!(f, "string {value:?}"),
            Token::Integer(value) => write!(f, "integer {value}"),
            Token::Guid(guid) => write!(f, "guid <{guid}>"),
            Token::IntegerElement(value) => write!(f, "integer list element {value}"),
            Token::FloatElement(value) => write!(f, "float list element {value}"),
            Token::Punctuation(tag) => f.write_str(punctuation(*tag)),
            Token::Template => f.write_str("template"),
            Token::Keyword(tag) => write!(f, "keyword {tag}"),
        }
    }
}

fn punctuation(tag: u16) -> &'static str {
    match tag {
        10 => "{",
        11 => "}",
        12 => "(",
        13 => ")",
        14 => "[",
        15 => "]",
        16 => "<",
        17 => ">",
        18 => ".",
        19 => ",",
        _ => ";",
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ListKind {
    Integer,
    Float,
}

/// Cursor over the body of a binary file
struct Tokens<'a> {
    input: &'a [u8],
    total: usize,
    float_size: FloatSize,
    /// Kind and remaining elements of the list being read
    list: Option<(ListKind, u32)>,
}

impl<'a> Tokens<'a> {
    fn new(bytes: &'a [u8], start: usize, float_size: FloatSize) -> Tokens<'a> {
        Tokens {
            input: bytes.get(start..).unwrap_or_default(),
            total: bytes.len(),
            float_size,
            list: None,
        }
    }

    fn is_empty(&self) -> bool {
        self.input.is_empty() && self.list.is_none()
    }

    fn eof(&self) -> Error {
        Error::UnexpectedEof {
            offset: self.offset(),
        }
    }

    fn u16(&mut self) -> Result<u16> {
        le_u16::<_, ContextError>(&mut self.input).map_err(|_| self.eof())
    }

    fn u32(&mut self) -> Result<u32> {
        le_u32::<_, ContextError>(&mut self.input).map_err(|_| self.eof())
    }

    fn float(&mut self) -> Result<f64> {
        match self.float_size {
            FloatSize::F32 => le_f32::<_, ContextError>(&mut self.input).map(f64::from),
            FloatSize::F64 => le_f64::<_, ContextError>(&mut self.input),
        }
        .map_err(|_| self.eof())
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        take::<_, _, ContextError>(len)
            .parse_next(&mut self.input)
            .map_err(|_| self.eof())
    }

    fn text(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        Ok(String::from_utf8_lossy(self.bytes(len)?).into_owned())
    }

    fn guid(&mut self) -> Result<String> {
        let bytes = self.bytes(16)?;
        let data1 = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let data2 = u16::from_le_bytes([bytes[4], bytes[5]]);
        let data3 = u16::from_le_bytes([bytes[6], bytes[7]]);
        let node: String = bytes[10..].iter().map(|b| format!("{b:02x}")).collect();
        Ok(format!(
            "{data1:08x}-{data2:04x}-{data3:04x}-{:02x}{:02x}-{node}",
            bytes[8], bytes[9]
        ))
    }

    fn next_token(&mut self) -> Result<Token> {
        loop {
            if let Some((kind, remaining)) = self.list {
                self.list = (remaining > 1).then_some((kind, remaining - 1));
                return match kind {
                    ListKind::Integer => self.u32().map(Token::IntegerElement),
                    ListKind::Float => self.float().map(Token::FloatElement),
                };
            }

            let offset = self.offset();
            let tag = self.u16()?;
            let token = match tag {
                TOKEN_NAME => Token::Name(self.text()?),
                TOKEN_STRING => {
                    let value = self.text()?;
                    self.u16()?;
                    Token::String(value)
                }
                TOKEN_INTEGER => Token::Integer(self.u32()?),
                TOKEN_GUID => Token::Guid(self.guid()?),
                TOKEN_INTEGER_LIST | TOKEN_FLOAT_LIST => {
                    let count = self.u32()?;
                    if count > 0 {
                        let kind = if tag == TOKEN_INTEGER_LIST {
                            ListKind::Integer
                        } else {
                            ListKind::Float
                        };
                        self.list = Some((kind, count));
                    }
                    continue;
                }
                TOKEN_TEMPLATE => {
                    self.skip_template()?;
                    Token::Template
                }
                10..=20 => Token::Punctuation(tag),
                40..=52 => Token::Keyword(tag),
                _ => return Err(Error::UnknownToken { offset, tag }),
            };
            return Ok(token);
        }
    }

    /// Skip a template declaration, the tag has already been read
    fn skip_template(&mut self) -> Result<()> {
        self.expect("template name", |t| matches!(t, Token::Name(_)))?;
        self.expect("{", |t| *t == Token::Punctuation(TOKEN_OBRACE))?;
        self.expect("template guid", |t| matches!(t, Token::Guid(_)))?;
        while self.next_token()? != Token::Punctuation(TOKEN_CBRACE) {}
        Ok(())
    }

    fn expect(&mut self, expected: &'static str, check: impl Fn(&Token) -> bool) -> Result<Token> {
        let offset = self.offset();
        let token = self.next_token()?;
        if check(&token) {
            Ok(token)
        } else {
            Err(Error::UnexpectedToken {
                offset,
                expected,
                found: token.to_string(),
            })
        }
    }

    fn unexpected(&self, offset: usize, expected: &'static str, token: Token) -> Error {
        Error::UnexpectedToken {
            offset,
            expected,
            found: token.to_string(),
        }
    }
}

impl Syntax for Tokens<'_> {
    fn offset(&self) -> usize {
        self.total - self.input.len()
    }

    fn scalar(&mut self, scalar: Scalar, in_array: bool) -> Result<Value> {
        let offset = self.offset();
        let token = self.next_token()?;
        match (scalar, token) {
            (Scalar::Word | Scalar::Dword, Token::IntegerElement(value)) => {
                Ok(Value::Integer(value))
            }
            (Scalar::Word | Scalar::Dword, Token::Integer(value)) if !in_array => {
                Ok(Value::Integer(value))
            }
            (Scalar::Float, Token::FloatElement(value)) => Ok(Value::Float(value)),
            (Scalar::Float, Token::Integer(value) | Token::IntegerElement(value)) if !in_array => {
                Ok(Value::Float(value as f64))
            }
            (Scalar::String, Token::String(value)) => Ok(Value::String(value)),
            (Scalar::Word | Scalar::Dword, token) if in_array => {
                Err(self.unexpected(offset, "integer list element", token))
            }
            (Scalar::Word | Scalar::Dword, token) => Err(self.unexpected(offset, "integer", token)),
            (Scalar::Float, token) if in_array => {
                Err(self.unexpected(offset, "float list element", token))
            }
            (Scalar::Float, token) => Err(self.unexpected(offset, "float", token)),
            (Scalar::String, token) => Err(self.unexpected(offset, "string", token)),
        }
    }

    fn object_header(&mut self) -> Result<String> {
        let mut offset = self.offset();
        let mut token = self.next_token()?;
        let mut name = String::new();
        if let Token::Name(value) = token {
            name = value;
            offset = self.offset();
            token = self.next_token()?;
        }

        match token {
            Token::Punctuation(TOKEN_OBRACE) => Ok(name),
            token => Err(self.unexpected(offset, "{", token)),
        }
    }

    fn open_item(&mut self) -> Result<OpenItem> {
        let offset = self.offset();
        match self.next_token()? {
            Token::Punctuation(TOKEN_CBRACE) => Ok(OpenItem::Close),
            Token::Punctuation(TOKEN_OBRACE) => {
                let offset = self.offset();
                let name = match self.next_token()? {
                    Token::Name(name) => name,
                    token => return Err(self.unexpected(offset, "reference name", token)),
                };
                self.expect("}", |t| *t == Token::Punctuation(TOKEN_CBRACE))?;
                Ok(OpenItem::Reference(name))
            }
            Token::Name(name) => Kind::from_name(&name)
                .map(OpenItem::Object)
                .ok_or(Error::UnknownKind { offset, name }),
            token => Err(self.unexpected(offset, "child object, reference or }", token)),
        }
    }

    fn close_object(&mut self) -> Result<()> {
        self.expect("} for closed object", |t| *t == Token::Punctuation(TOKEN_CBRACE))?;
        Ok(())
    }
}
