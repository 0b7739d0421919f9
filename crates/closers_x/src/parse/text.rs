//! Plain text encoding.
//!
//! Words are separated by whitespace, `{`, `}` and `;` always stand alone. Members end with `;`,
//! array elements are separated by `,` and the last one ends with `;`. Lines starting with `//`
//! or `#` are comments.

use tracing::{debug, instrument};
use winnow::{
    ascii::multispace1,
    combinator::{alt, preceded, repeat},
    token::take_till,
    PResult, Parser,
};

use super::{read_object, OpenItem, Syntax};
use crate::{
    error::{Error, Result},
    header::{Format, XHeader, HEADER_SIZE},
    mszip,
    object::Value,
    template::{Kind, Scalar},
    XFile,
};

/// Parse a `txt ` or `tzip` file.
#[instrument(skip(bytes), fields(len = bytes.len()), err)]
pub fn parse(bytes: &[u8]) -> Result<XFile> {
    let header = XHeader::parse(bytes)?;
    if header.format.is_compressed() {
        return parse(&mszip::decompress(bytes)?);
    }
    if header.format != Format::Text {
        return Err(Error::UnsupportedFormat {
            format: String::from_utf8_lossy(header.format.tag()).into_owned(),
            expected: "txt or tzip",
        });
    }

    let body = String::from_utf8_lossy(bytes.get(HEADER_SIZE..).unwrap_or_default());
    let mut words = Words::new(&body);
    let mut objects = Vec::new();

    while let Some(word) = words.word() {
        let offset = words.offset() - word.len();
        if word == "template" {
            words.skip_template()?;
            continue;
        }
        let kind = Kind::from_name(word).ok_or_else(|| Error::UnknownKind {
            offset,
            name: word.to_owned(),
        })?;
        objects.push(read_object(&mut words, kind)?);
    }

    debug!(objects = objects.len(), "parsed text file");
    Ok(XFile::new(header, objects))
}

fn punctuation<'a>(input: &mut &'a str) -> PResult<&'a str> {
    alt(("{", "}", ";")).parse_next(input)
}

fn bare_word<'a>(input: &mut &'a str) -> PResult<&'a str> {
    take_till(1.., |c: char| c.is_whitespace() || matches!(c, '{' | '}' | ';')).parse_next(input)
}

fn number<'a>(input: &mut &'a str) -> PResult<&'a str> {
    take_till(1.., |c: char| c.is_whitespace() || matches!(c, ',' | ';')).parse_next(input)
}

fn quoted<'a>(input: &mut &'a str) -> PResult<&'a str> {
    take_till(0.., ['"', '\r', '\n']).parse_next(input)
}

fn comment(input: &mut &str) -> PResult<()> {
    preceded(alt(("//", "#")), take_till(0.., '\n'))
        .void()
        .parse_next(input)
}

/// Whitespace and comments
fn ignored(input: &mut &str) -> PResult<()> {
    repeat(0.., alt((multispace1.void(), comment))).parse_next(input)
}

/// Cursor over the body of a text file
struct Words<'a> {
    input: &'a str,
    total: usize,
}

impl<'a> Words<'a> {
    fn new(body: &'a str) -> Words<'a> {
        Words {
            input: body,
            total: body.len(),
        }
    }

    fn skip(&mut self) {
        let _ = ignored(&mut self.input);
    }

    fn word(&mut self) -> Option<&'a str> {
        self.skip();
        alt((punctuation, bare_word)).parse_next(&mut self.input).ok()
    }

    fn peek_char(&mut self) -> Option<char> {
        self.skip();
        self.input.chars().next()
    }

    fn expect_word(&mut self, expected: char) -> Result<()> {
        let offset = self.offset();
        match self.word() {
            Some(word) if word.len() == 1 && word.starts_with(expected) => Ok(()),
            Some(word) => Err(Error::MissingDelimiter {
                offset,
                expected,
                found: word.to_owned(),
            }),
            None => Err(Error::UnexpectedEof { offset }),
        }
    }

    /// Consume `delimiter` if it comes next
    fn delimiter(&mut self, delimiter: char) -> Option<()> {
        (self.peek_char()? == delimiter).then(|| self.input = &self.input[1..])
    }

    fn missing(&mut self, expected: char) -> Error {
        let offset = self.offset();
        match self.word() {
            Some(found) => Error::MissingDelimiter {
                offset,
                expected,
                found: found.to_owned(),
            },
            None => Error::UnexpectedEof { offset },
        }
    }

    /// Skip `name { <guid> ... }`, the `template` keyword has already been read
    fn skip_template(&mut self) -> Result<()> {
        let offset = self.offset();
        self.word().ok_or(Error::UnexpectedEof { offset })?;
        self.expect_word('{')?;
        loop {
            let offset = self.offset();
            match self.word() {
                Some("}") => return Ok(()),
                Some(_) => {}
                None => return Err(Error::UnexpectedEof { offset }),
            }
        }
    }

    fn string(&mut self) -> Result<String> {
        let offset = self.offset();
        if self.delimiter('"').is_none() {
            return Err(self.missing('"'));
        }
        let value = quoted(&mut self.input).unwrap_or_default();
        if !self.input.starts_with('"') {
            return Err(Error::UnterminatedString { offset });
        }
        self.input = &self.input[1..];
        Ok(value.to_owned())
    }
}

impl Syntax for Words<'_> {
    fn offset(&self) -> usize {
        HEADER_SIZE + self.total - self.input.len()
    }

    fn scalar(&mut self, scalar: Scalar, _in_array: bool) -> Result<Value> {
        if scalar == Scalar::String {
            return self.string().map(Value::String);
        }

        self.skip();
        let offset = self.offset();
        let text = number(&mut self.input).map_err(|_| self.missing(';'))?;
        let invalid = || Error::InvalidNumber {
            offset,
            text: text.to_owned(),
        };

        if scalar.is_integer() {
            // Fractions are dropped, out of range values are refused
            text.parse::<i64>()
                .ok()
                .or_else(|| {
                    text.parse::<f64>()
                        .ok()
                        .map(f64::trunc)
                        .filter(|value| value.abs() < i64::MAX as f64)
                        .map(|value| value as i64)
                })
                .and_then(|value| u32::try_from(value).ok())
                .map(Value::Integer)
                .ok_or_else(invalid)
        } else {
            text.parse::<f64>().map(Value::Float).map_err(|_| invalid())
        }
    }

    fn member_end(&mut self) -> Result<()> {
        self.delimiter(';').ok_or_else(|| self.missing(';'))
    }

    fn element_end(&mut self, index: usize, len: usize) -> Result<()> {
        let last = index + 1 == len;
        let offset = self.offset();
        match self.peek_char() {
            // A trailing comma after the last element is accepted
            Some(',') => {}
            Some(';') if last => {}
            Some(';') => {
                return Err(Error::ArraySizeMismatch {
                    offset,
                    expected: len,
                    found: index + 1,
                })
            }
            _ => return Err(self.missing(if last { ';' } else { ',' })),
        }
        self.input = &self.input[1..];
        Ok(())
    }

    fn empty_array(&mut self) -> Result<()> {
        self.delimiter(';');
        Ok(())
    }

    fn object_header(&mut self) -> Result<String> {
        let offset = self.offset();
        match self.word() {
            Some("{") => Ok(String::new()),
            Some(name) => {
                self.expect_word('{')?;
                Ok(name.to_owned())
            }
            None => Err(Error::UnexpectedEof { offset }),
        }
    }

    fn open_item(&mut self) -> Result<OpenItem> {
        let offset = self.offset();
        match self.word() {
            Some("}") => Ok(OpenItem::Close),
            Some("{") => {
                let offset = self.offset();
                match self.word() {
                    // Refused by the parent as an empty reference
                    Some("}") => Ok(OpenItem::Reference(String::new())),
                    Some(name) => {
                        self.expect_word('}')?;
                        Ok(OpenItem::Reference(name.to_owned()))
                    }
                    None => Err(Error::UnexpectedEof { offset }),
                }
            }
            Some(name) => Kind::from_name(name)
                .map(OpenItem::Object)
                .ok_or_else(|| Error::UnknownKind {
                    offset,
                    name: name.to_owned(),
                }),
            None => Err(Error::UnexpectedEof { offset }),
        }
    }

    fn close_object(&mut self) -> Result<()> {
        self.expect_word('}')
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use super::*;
    use crate::{error::ChildError, object::Child};

    const MESH: &str = "xof 0302txt 0032
// exported by hand
template Vector {
 <3d82ab5e-62da-11cf-ab39-0020af71e433>
 float x;
 float y;
 float z;
}

Mesh Quad {
 4;
 -1.0; -1.0; 0.0;,
 1.0; -1.0; 0.0;,
 1.0; 1.0; 0.0;,
 -1.0; 1.0; 0.0;;
 1;
 4; 0, 1,
    2, 3;;
 MeshTextureCoords {
  4;
  0.0;1.0;, 1.0;1.0;, 1.0;0.0;, 0.0;0.0;;
 }
 # material follows
 MeshMaterialList {
  1; 1; 0;
  { Brick }
 }
}
";

    #[test]
    #[traced_test]
    fn parse_mesh() -> Result<()> {
        let file = parse(MESH.as_bytes())?;
        assert_eq!(file.version_str(), "0302");
        assert_eq!(file.objects.len(), 1);

        let mesh = &file.objects[0];
        assert_eq!((mesh.kind, mesh.name.as_str()), (Kind::Mesh, "Quad"));
        let vertices = mesh.get("vertices").and_then(Value::as_array).unwrap();
        assert_eq!(vertices.len(), 4);
        assert_eq!(
            vertices[3].as_object().and_then(|v| v.get("x")),
            Some(&Value::Float(-1.0))
        );

        let faces = mesh.get("faces").and_then(Value::as_array).unwrap();
        let indices = faces[0].as_object().and_then(|f| f.get("faceVertexIndices"));
        assert_eq!(
            indices.and_then(Value::as_array).map(<[Value]>::len),
            Some(4)
        );

        let Child::Object(list) = &mesh.children()[1] else {
            panic!("expected material list");
        };
        assert_eq!(list.references().collect::<Vec<_>>(), vec!["Brick"]);
        Ok(())
    }

    #[test]
    fn serialize_again() -> Result<()> {
        let file = parse(MESH.as_bytes())?;
        let text = file.to_string();
        assert!(text.starts_with("xof 0302txt 0032\n\nMesh Quad {\n 4;\n -1.000000;"));
        assert_eq!(parse(text.as_bytes())?.objects, file.objects);
        Ok(())
    }

    fn body(text: &str) -> Vec<u8> {
        format!("xof 0303txt 0032{text}").into_bytes()
    }

    #[test]
    fn anonymous_objects_and_strings() -> Result<()> {
        let file = parse(&body(
            "\nFrame {\n TextureFilename { \"a b.dds\"; }\n {Ref}\n}\n",
        ))?;
        let frame = &file.objects[0];
        assert_eq!(frame.name, "");
        let Child::Object(texture) = &frame.children()[0] else {
            panic!("expected texture");
        };
        assert_eq!(texture.get("filename"), Some(&Value::String("a b.dds".into())));
        assert_eq!(frame.children()[1], Child::Reference("Ref".into()));
        Ok(())
    }

    #[test]
    fn integers_written_as_floats() -> Result<()> {
        let file = parse(&body(" AnimTicksPerSecond { 4800.0; }"))?;
        assert_eq!(
            file.objects[0].get("AnimTicksPerSecond"),
            Some(&Value::Integer(4800))
        );
        Ok(())
    }

    #[test]
    fn integers_out_of_range() {
        for text in ["-1", "1e12", "4294967296", "nan", "x12"] {
            let result = parse(&body(&format!(" AnimTicksPerSecond {{ {text}; }}")));
            assert!(
                matches!(&result, Err(Error::InvalidNumber { offset: 38, text: found }) if found == text),
                "{text}: {result:?}"
            );
        }

        let file = parse(&body(" AnimTicksPerSecond { 4294967295; }")).unwrap();
        assert_eq!(
            file.objects[0].get("AnimTicksPerSecond"),
            Some(&Value::Integer(u32::MAX))
        );
    }

    #[test]
    fn array_size_mismatch() {
        let result = parse(&body(" FloatKeys { 3; 1.0, 2.0; }"));
        assert!(matches!(
            result,
            Err(Error::ArraySizeMismatch {
                expected: 3,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn missing_delimiters() {
        assert!(matches!(
            parse(&body(" Coords2d { 0.5 0.5; }")),
            Err(Error::MissingDelimiter { expected: ';', .. })
        ));
        assert!(matches!(
            parse(&body(" FloatKeys { 2; 1.0 2.0; }")),
            Err(Error::MissingDelimiter { expected: ',', .. })
        ));
        assert!(matches!(
            parse(&body(" Coords2d { 0.5; 0.5; ")),
            Err(Error::UnexpectedEof { .. })
        ));
        assert!(matches!(
            parse(&body(" Coords2d Uv 0.5; 0.5; }")),
            Err(Error::MissingDelimiter { expected: '{', .. })
        ));
    }

    #[test]
    fn unterminated_string() {
        assert!(matches!(
            parse(&body(" TextureFilename { \"skin.dds\n\"; }")),
            Err(Error::UnterminatedString { .. })
        ));
    }

    #[test]
    fn bad_children() {
        assert!(matches!(
            parse(&body(" Frame { {} }")),
            Err(Error::InvalidChild {
                source: ChildError::EmptyReference,
                ..
            })
        ));
        assert!(matches!(
            parse(&body(" Frame { Camera { } }")),
            Err(Error::UnknownKind { .. })
        ));
        assert!(matches!(
            parse(&body(" Vector { 1.0; 2.0; 3.0; {Other} }")),
            Err(Error::MissingDelimiter { expected: '}', .. })
        ));
    }

    #[test]
    fn unknown_top_level_word() {
        assert!(matches!(
            parse(&body(" 12 Frame { }")),
            Err(Error::UnknownKind { offset: 17, .. })
        ));
    }

    #[test]
    fn wrong_encoding() {
        assert!(matches!(
            parse(b"xof 0303bin 0032"),
            Err(Error::UnsupportedFormat { .. })
        ));
    }
}
