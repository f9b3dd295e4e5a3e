//! PDF Object Parser
//!
//! Builds direct objects from the token stream according to ISO 32000-1
//! Section 7.3. Indirect references are returned as they are, never resolved.

use super::lexer::{Lexer, TokenKind};
use super::source::ByteSource;
use super::{ParseError, ParseResult};
use crate::objects::{Dictionary, Object, ObjectId};
use tracing::warn;

/// Arrays and dictionaries nested deeper than this are rejected
const MAX_NESTING: usize = 256;

/// Read the next direct object
pub fn read_object<S: ByteSource>(lexer: &mut Lexer<S>) -> ParseResult<Object> {
    lexer.next_valid_token()?;
    parse_current(lexer, 0)
}

/// Read `N G obj <object> endobj`
pub fn read_indirect_object<S: ByteSource>(
    lexer: &mut Lexer<S>,
) -> ParseResult<(ObjectId, Object)> {
    lexer.next_token()?;
    let number = expect_integer(lexer, "object number")?;
    lexer.next_token()?;
    let generation = expect_integer(lexer, "generation number")?;
    lexer.next_token()?;
    expect_keyword(lexer, "obj")?;

    let (Ok(number), Ok(generation)) = (u32::try_from(number), u16::try_from(generation)) else {
        return Err(unexpected(lexer, "object identifier"));
    };
    let object = read_object(lexer)?;

    lexer.next_valid_token()?;
    expect_keyword(lexer, "endobj")?;
    Ok((ObjectId::new(number, generation), object))
}

fn parse_current<S: ByteSource>(lexer: &mut Lexer<S>, depth: usize) -> ParseResult<Object> {
    match lexer.token_kind() {
        TokenKind::Number => Ok(parse_number(lexer)),
        TokenKind::String => {
            let bytes = lexer.value().to_vec();
            Ok(if lexer.is_hex_string() {
                Object::HexString(bytes)
            } else {
                Object::String(bytes)
            })
        }
        TokenKind::Name => Ok(Object::Name(lexer.text())),
        TokenKind::Reference => match lexer.reference() {
            Some(id) => Ok(Object::Reference(id)),
            None => Err(unexpected(lexer, "indirect reference")),
        },
        TokenKind::StartArray => parse_array(lexer, depth + 1),
        TokenKind::StartDict => parse_dictionary(lexer, depth + 1).map(Object::Dictionary),
        TokenKind::Other => match lexer.value() {
            b"true" => Ok(Object::Boolean(true)),
            b"false" => Ok(Object::Boolean(false)),
            b"null" => Ok(Object::Null),
            _ => Err(unexpected(lexer, "PDF object")),
        },
        TokenKind::EndArray
        | TokenKind::EndDict
        | TokenKind::Comment
        | TokenKind::EndOfFile => Err(unexpected(lexer, "PDF object")),
    }
}

fn parse_number<S: ByteSource>(lexer: &Lexer<S>) -> Object {
    let text = lexer.text();
    if text.contains('.') {
        match text.parse::<f64>() {
            Ok(value) => Object::Real(value),
            Err(_) => {
                warn!(
                    offset = lexer.token_offset(),
                    text = %text,
                    "unreadable real number, using 0"
                );
                Object::Real(0.0)
            }
        }
    } else {
        match text.parse::<i64>() {
            Ok(value) => Object::Integer(value),
            Err(_) => {
                warn!(
                    offset = lexer.token_offset(),
                    text = %text,
                    "unreadable integer, using 0"
                );
                Object::Integer(0)
            }
        }
    }
}

fn parse_array<S: ByteSource>(lexer: &mut Lexer<S>, depth: usize) -> ParseResult<Object> {
    check_depth(lexer, depth)?;
    let mut elements = Vec::new();
    loop {
        lexer.next_valid_token()?;
        match lexer.token_kind() {
            TokenKind::EndArray => break,
            TokenKind::EndOfFile => return Err(unexpected(lexer, "']'")),
            _ => elements.push(parse_current(lexer, depth)?),
        }
    }
    Ok(Object::Array(elements))
}

fn parse_dictionary<S: ByteSource>(
    lexer: &mut Lexer<S>,
    depth: usize,
) -> ParseResult<Dictionary> {
    check_depth(lexer, depth)?;
    let mut dict = Dictionary::new();
    loop {
        lexer.next_valid_token()?;
        let key = match lexer.token_kind() {
            TokenKind::EndDict => break,
            TokenKind::Name => lexer.text(),
            _ => return Err(unexpected(lexer, "name or '>>'")),
        };

        lexer.next_valid_token()?;
        let value = parse_current(lexer, depth)?;
        dict.set(key, value);
    }
    Ok(dict)
}

fn check_depth<S: ByteSource>(lexer: &Lexer<S>, depth: usize) -> ParseResult<()> {
    if depth > MAX_NESTING {
        return Err(unexpected(lexer, "shallower nesting"));
    }
    Ok(())
}

fn expect_integer<S: ByteSource>(lexer: &Lexer<S>, expected: &str) -> ParseResult<i64> {
    lexer.int_value().ok_or_else(|| unexpected(lexer, expected))
}

fn expect_keyword<S: ByteSource>(lexer: &Lexer<S>, keyword: &str) -> ParseResult<()> {
    if lexer.token_kind() == TokenKind::Other && lexer.value() == keyword.as_bytes() {
        Ok(())
    } else {
        Err(unexpected(lexer, &format!("'{keyword}'")))
    }
}

fn unexpected<S: ByteSource>(lexer: &Lexer<S>, expected: &str) -> ParseError {
    let found = match lexer.token_kind() {
        TokenKind::EndOfFile => "end of file".to_string(),
        kind => format!("{kind:?} '{}'", lexer.text()),
    };
    ParseError::UnexpectedToken {
        offset: lexer.token_offset(),
        expected: expected.to_string(),
        found,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &[u8]) -> ParseResult<Object> {
        read_object(&mut Lexer::from_bytes(input))
    }

    #[test]
    fn test_parse_simple_objects() {
        assert_eq!(parse(b"null").unwrap(), Object::Null);
        assert_eq!(parse(b"true").unwrap(), Object::Boolean(true));
        assert_eq!(parse(b"false").unwrap(), Object::Boolean(false));
        assert_eq!(parse(b"-123").unwrap(), Object::Integer(-123));
        assert_eq!(parse(b"3.25").unwrap(), Object::Real(3.25));
        assert_eq!(parse(b"/Standard").unwrap(), Object::Name("Standard".into()));
        assert_eq!(parse(b"(Hello)").unwrap(), Object::String(b"Hello".to_vec()));
        assert_eq!(parse(b"<48656C6C6F>").unwrap(), Object::HexString(b"Hello".to_vec()));
        assert_eq!(
            parse(b"12 0 R").unwrap(),
            Object::Reference(ObjectId::new(12, 0))
        );
    }

    #[test]
    fn test_parse_lenient_numbers() {
        assert_eq!(parse(b"1.2.3").unwrap(), Object::Real(0.0));
        assert_eq!(parse(b"--7").unwrap(), Object::Integer(0));
        assert_eq!(parse(b"+5").unwrap(), Object::Integer(5));
    }

    #[test]
    fn test_parse_array_with_references() {
        let obj = parse(b"[1 0 R 2 (x) [/A] 3 4 R]").unwrap();
        assert_eq!(
            obj,
            Object::Array(vec![
                Object::Reference(ObjectId::new(1, 0)),
                Object::Integer(2),
                Object::String(b"x".to_vec()),
                Object::Array(vec![Object::Name("A".into())]),
                Object::Reference(ObjectId::new(3, 4)),
            ])
        );
    }

    #[test]
    fn test_parse_encrypt_dictionary() {
        let input = b"<< /Filter /Standard /V 4 /R 4 % comment\n\
            /CF << /StdCF << /CFM /AESV2 /Length 16 >> >>\n\
            /P -3904 /EncryptMetadata false /O <00FF> >>";
        let obj = parse(input).unwrap();
        let dict = obj.as_dict().unwrap();

        assert_eq!(dict.get_name("Filter"), Some("Standard"));
        assert_eq!(dict.get_integer("R"), Some(4));
        assert_eq!(dict.get_integer("P"), Some(-3904));
        assert_eq!(dict.get("EncryptMetadata"), Some(&Object::Boolean(false)));
        assert_eq!(dict.get_bytes("O"), Some(&[0x00, 0xFF][..]));
        let cfm = dict
            .get_dict("CF")
            .and_then(|cf| cf.get_dict("StdCF"))
            .and_then(|std_cf| std_cf.get_name("CFM"));
        assert_eq!(cfm, Some("AESV2"));
        let keys: Vec<_> = dict.keys().cloned().collect();
        assert_eq!(keys[..3], ["Filter", "V", "R"]);
    }

    #[test]
    fn test_dictionary_key_must_be_name() {
        let err = parse(b"<< (key) 1 >>").unwrap_err();
        match err {
            ParseError::UnexpectedToken {
                offset, expected, ..
            } => {
                assert_eq!(offset, 3);
                assert_eq!(expected, "name or '>>'");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_unexpected_tokens() {
        assert!(matches!(parse(b"]"), Err(ParseError::UnexpectedToken { .. })));
        assert!(matches!(parse(b">>"), Err(ParseError::UnexpectedToken { .. })));
        assert!(matches!(parse(b"obj"), Err(ParseError::UnexpectedToken { .. })));
        assert!(matches!(parse(b""), Err(ParseError::UnexpectedToken { .. })));
        assert!(matches!(parse(b"[1 2"), Err(ParseError::UnexpectedToken { .. })));
        assert!(matches!(parse(b"<< /A"), Err(ParseError::UnexpectedToken { .. })));
    }

    #[test]
    fn test_lexical_errors_propagate() {
        let err = parse(b"[(open").unwrap_err();
        assert!(err.malformed_kind().is_some());
    }

    #[test]
    fn test_nesting_limit() {
        let deep = "[".repeat(MAX_NESTING + 10);
        assert!(matches!(
            parse(deep.as_bytes()),
            Err(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_read_indirect_object() {
        let mut lexer = Lexer::from_bytes(&b"7 0 obj\n<< /V 2 /R 3 >>\nendobj\n"[..]);
        let (id, obj) = read_indirect_object(&mut lexer).unwrap();

        assert_eq!(id, ObjectId::new(7, 0));
        assert_eq!(obj.as_dict().and_then(|d| d.get_integer("R")), Some(3));
    }

    #[test]
    fn test_read_indirect_object_requires_keywords() {
        let mut lexer = Lexer::from_bytes(&b"<< /V 2 >>"[..]);
        assert!(read_indirect_object(&mut lexer).is_err());

        let mut lexer = Lexer::from_bytes(&b"7 0 obj 5"[..]);
        assert!(read_indirect_object(&mut lexer).is_err());
    }
}
