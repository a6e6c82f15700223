//! XML-RPC document parsing.
//!
//! Pull-parses `<methodResponse>` (call replies) and `<methodCall>`
//! (server-initiated callbacks) with `quick-xml`. Untagged `<value>`
//! text defaults to string per XML-RPC.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use quick_xml::events::Event;
use quick_xml::Reader;

use super::Value;
use crate::error::{GbxError, Result};

/// Decoded `<methodResponse>`: one result or one structured fault.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// `<params>` with a single value.
    Success(Value),
    /// `<fault>` with `faultCode` / `faultString`.
    Fault {
        /// Server fault code.
        code: i32,
        /// Server fault message.
        message: String,
    },
}

/// Decode a `<methodResponse>` document.
pub fn decode_response(doc: &[u8]) -> Result<Response> {
    let mut parser = Parser::new(doc)?;
    parser.expect_start("methodResponse")?;

    match parser.next_token()? {
        Tok::Start(name) if name == "params" => {
            parser.expect_start("param")?;
            parser.expect_start("value")?;
            let value = parser.parse_value_body()?;
            parser.expect_end("param")?;
            parser.expect_end("params")?;
            parser.expect_end("methodResponse")?;
            Ok(Response::Success(value))
        }
        Tok::Start(name) if name == "fault" => {
            parser.expect_start("value")?;
            let detail = parser.parse_value_body()?;
            parser.expect_end("fault")?;
            parser.expect_end("methodResponse")?;

            let code = detail.get("faultCode").and_then(Value::as_i32).unwrap_or(0);
            let message = detail
                .get("faultString")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            Ok(Response::Fault { code, message })
        }
        other => Err(unexpected("params or fault", &other)),
    }
}

/// Decode a server-initiated `<methodCall>` into method name and arguments.
pub fn decode_call(doc: &[u8]) -> Result<(String, Vec<Value>)> {
    let mut parser = Parser::new(doc)?;
    parser.expect_start("methodCall")?;
    parser.expect_start("methodName")?;
    let method = parser.text_until_end("methodName")?;

    let mut args = Vec::new();
    match parser.next_token()? {
        Tok::End(name) if name == "methodCall" => return Ok((method, args)),
        Tok::Start(name) if name == "params" => loop {
            match parser.next_token()? {
                Tok::Start(name) if name == "param" => {
                    parser.expect_start("value")?;
                    args.push(parser.parse_value_body()?);
                    parser.expect_end("param")?;
                }
                Tok::End(name) if name == "params" => break,
                other => return Err(unexpected("param", &other)),
            }
        },
        other => return Err(unexpected("params", &other)),
    }
    parser.expect_end("methodCall")?;
    Ok((method, args))
}

/// Structural token with owned names; declarations, comments and
/// formatting whitespace are already filtered out.
#[derive(Debug)]
enum Tok {
    Start(String),
    End(String),
    Empty(String),
    Text(String),
    Eof,
}

fn unexpected(wanted: &str, got: &Tok) -> GbxError {
    GbxError::Protocol(format!("expected {}, found {:?}", wanted, got))
}

struct Parser<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> Parser<'a> {
    fn new(doc: &'a [u8]) -> Result<Self> {
        // Reject invalid UTF-8 up front so text slices are safe below.
        std::str::from_utf8(doc)
            .map_err(|_| GbxError::Protocol("XML-RPC document is not valid UTF-8".to_string()))?;
        Ok(Self {
            reader: Reader::from_reader(doc),
        })
    }

    fn next_token(&mut self) -> Result<Tok> {
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => {
                    return Ok(Tok::Start(
                        String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    ))
                }
                Event::End(e) => {
                    return Ok(Tok::End(
                        String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    ))
                }
                Event::Empty(e) => {
                    return Ok(Tok::Empty(
                        String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    ))
                }
                Event::Text(t) => {
                    let text = t.unescape().map_err(quick_xml::Error::from)?;
                    if text.trim().is_empty() {
                        continue;
                    }
                    return Ok(Tok::Text(text.into_owned()));
                }
                Event::CData(t) => {
                    return Ok(Tok::Text(
                        String::from_utf8_lossy(&t.into_inner()).into_owned(),
                    ))
                }
                Event::Eof => return Ok(Tok::Eof),
                // Decl, comments, processing instructions, doctype.
                _ => continue,
            }
        }
    }

    fn expect_start(&mut self, tag: &str) -> Result<()> {
        match self.next_token()? {
            Tok::Start(name) if name == tag => Ok(()),
            other => Err(unexpected(tag, &other)),
        }
    }

    fn expect_end(&mut self, tag: &str) -> Result<()> {
        match self.next_token()? {
            Tok::End(name) if name == tag => Ok(()),
            other => Err(unexpected(&format!("</{}>", tag), &other)),
        }
    }

    /// Collect text content up to the closing tag.
    fn text_until_end(&mut self, tag: &str) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.next_token()? {
                Tok::Text(t) => out.push_str(&t),
                Tok::End(name) if name == tag => return Ok(out),
                other => return Err(unexpected(&format!("text or </{}>", tag), &other)),
            }
        }
    }

    /// Parse the contents of a `<value>` whose opening tag has been
    /// consumed, through its closing tag.
    fn parse_value_body(&mut self) -> Result<Value> {
        match self.next_token()? {
            // Untagged text is a string value.
            Tok::Text(text) => {
                self.expect_end("value")?;
                Ok(Value::String(text))
            }
            Tok::End(name) if name == "value" => Ok(Value::String(String::new())),
            Tok::Empty(tag) => {
                let value = match tag.as_str() {
                    "string" => Value::String(String::new()),
                    "base64" => Value::Base64(Vec::new()),
                    other => {
                        return Err(GbxError::Protocol(format!(
                            "empty <{}/> is not a valid value",
                            other
                        )))
                    }
                };
                self.expect_end("value")?;
                Ok(value)
            }
            Tok::Start(tag) => {
                let value = self.parse_typed(&tag)?;
                self.expect_end("value")?;
                Ok(value)
            }
            other => Err(unexpected("value contents", &other)),
        }
    }

    fn parse_typed(&mut self, tag: &str) -> Result<Value> {
        match tag {
            "i4" | "int" => {
                let text = self.text_until_end(tag)?;
                text.trim()
                    .parse::<i32>()
                    .map(Value::Int)
                    .map_err(|_| GbxError::Protocol(format!("bad integer: {:?}", text)))
            }
            "boolean" => {
                let text = self.text_until_end(tag)?;
                match text.trim() {
                    "1" | "true" => Ok(Value::Bool(true)),
                    "0" | "false" => Ok(Value::Bool(false)),
                    other => Err(GbxError::Protocol(format!("bad boolean: {:?}", other))),
                }
            }
            "double" => {
                let text = self.text_until_end(tag)?;
                text.trim()
                    .parse::<f64>()
                    .map(Value::Double)
                    .map_err(|_| GbxError::Protocol(format!("bad double: {:?}", text)))
            }
            "string" => Ok(Value::String(self.text_until_end(tag)?)),
            "base64" => {
                let text = self.text_until_end(tag)?;
                BASE64
                    .decode(text.trim())
                    .map(Value::Base64)
                    .map_err(|e| GbxError::Protocol(format!("bad base64: {}", e)))
            }
            "array" => {
                self.expect_start("data")?;
                let mut items = Vec::new();
                loop {
                    match self.next_token()? {
                        Tok::Start(name) if name == "value" => {
                            items.push(self.parse_value_body()?)
                        }
                        Tok::Empty(name) if name == "value" => {
                            items.push(Value::String(String::new()))
                        }
                        Tok::End(name) if name == "data" => break,
                        other => return Err(unexpected("array value", &other)),
                    }
                }
                self.expect_end("array")?;
                Ok(Value::Array(items))
            }
            "struct" => {
                let mut members = BTreeMap::new();
                loop {
                    match self.next_token()? {
                        Tok::Start(name) if name == "member" => {
                            self.expect_start("name")?;
                            let member_name = self.text_until_end("name")?;
                            let value = match self.next_token()? {
                                Tok::Start(name) if name == "value" => self.parse_value_body()?,
                                Tok::Empty(name) if name == "value" => {
                                    Value::String(String::new())
                                }
                                other => return Err(unexpected("member value", &other)),
                            };
                            self.expect_end("member")?;
                            members.insert(member_name, value);
                        }
                        Tok::End(name) if name == "struct" => break,
                        other => return Err(unexpected("struct member", &other)),
                    }
                }
                Ok(Value::Struct(members))
            }
            other => Err(GbxError::Protocol(format!(
                "unsupported value type <{}>",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xmlrpc::encode_call;

    #[test]
    fn test_decode_boolean_response() {
        let doc = b"<?xml version=\"1.0\"?><methodResponse><params><param><value><boolean>1</boolean></value></param></params></methodResponse>";
        let response = decode_response(doc).unwrap();
        assert_eq!(response, Response::Success(Value::Bool(true)));
    }

    #[test]
    fn test_decode_fault_response() {
        let doc = b"<?xml version=\"1.0\"?><methodResponse><fault><value><struct>\
            <member><name>faultCode</name><value><i4>-1000</i4></value></member>\
            <member><name>faultString</name><value><string>Login unknown.</string></value></member>\
            </struct></value></fault></methodResponse>";
        let response = decode_response(doc).unwrap();
        assert_eq!(
            response,
            Response::Fault {
                code: -1000,
                message: "Login unknown.".to_string()
            }
        );
    }

    #[test]
    fn test_decode_struct_response() {
        let doc = b"<methodResponse><params><param><value><struct>\
            <member><name>Name</name><value><string>server</string></value></member>\
            <member><name>Build</name><value>2.11.26</value></member>\
            </struct></value></param></params></methodResponse>";
        let response = decode_response(doc).unwrap();
        let Response::Success(value) = response else {
            panic!("expected success");
        };
        assert_eq!(value.get("Name").and_then(Value::as_str), Some("server"));
        // Untagged value text defaults to string.
        assert_eq!(value.get("Build").and_then(Value::as_str), Some("2.11.26"));
    }

    #[test]
    fn test_decode_call_with_args() {
        let doc = b"<?xml version=\"1.0\"?><methodCall><methodName>ManiaPlanet.PlayerChat</methodName><params>\
            <param><value><i4>12</i4></value></param>\
            <param><value><string>rider</string></value></param>\
            <param><value><string>hello</string></value></param>\
            <param><value><boolean>0</boolean></value></param>\
            </params></methodCall>";
        let (method, args) = decode_call(doc).unwrap();
        assert_eq!(method, "ManiaPlanet.PlayerChat");
        assert_eq!(args.len(), 4);
        assert_eq!(args[0], Value::Int(12));
        assert_eq!(args[1], Value::String("rider".to_string()));
        assert_eq!(args[3], Value::Bool(false));
    }

    #[test]
    fn test_decode_call_without_params() {
        let doc = b"<methodCall><methodName>ManiaPlanet.ServerStop</methodName></methodCall>";
        let (method, args) = decode_call(doc).unwrap();
        assert_eq!(method, "ManiaPlanet.ServerStop");
        assert!(args.is_empty());
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut members = BTreeMap::new();
        members.insert("Login".to_string(), Value::from("rider"));
        members.insert("Time".to_string(), Value::Int(48231));
        let args = vec![
            Value::Int(-7),
            Value::Bool(true),
            Value::Double(1.25),
            Value::String("a <b> & c".to_string()),
            Value::Array(vec![Value::Int(1), Value::String("two".to_string())]),
            Value::Struct(members),
            Value::Base64(vec![0, 1, 2, 255]),
        ];

        let doc = encode_call("TrackMania.Test", &args);
        let (method, decoded) = decode_call(doc.as_bytes()).unwrap();

        assert_eq!(method, "TrackMania.Test");
        assert_eq!(decoded, args);
    }

    #[test]
    fn test_decode_empty_string_forms() {
        let doc = b"<methodResponse><params><param><value><string></string></value></param></params></methodResponse>";
        assert_eq!(
            decode_response(doc).unwrap(),
            Response::Success(Value::String(String::new()))
        );

        let doc = b"<methodResponse><params><param><value><string/></value></param></params></methodResponse>";
        assert_eq!(
            decode_response(doc).unwrap(),
            Response::Success(Value::String(String::new()))
        );

        let doc = b"<methodResponse><params><param><value></value></param></params></methodResponse>";
        assert_eq!(
            decode_response(doc).unwrap(),
            Response::Success(Value::String(String::new()))
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_response(b"not xml at all").is_err());
        assert!(decode_response(b"<methodResponse><params>").is_err());
        assert!(decode_call(b"<methodResponse/>").is_err());
    }

    #[test]
    fn test_decode_rejects_bad_scalars() {
        let doc = b"<methodResponse><params><param><value><i4>abc</i4></value></param></params></methodResponse>";
        assert!(decode_response(doc).is_err());

        let doc = b"<methodResponse><params><param><value><boolean>2</boolean></value></param></params></methodResponse>";
        assert!(decode_response(doc).is_err());
    }
}
