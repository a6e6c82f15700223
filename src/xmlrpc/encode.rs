//! XML-RPC document rendering.
//!
//! Renders `<methodCall>` documents the way the dedicated server expects
//! them: single line, no pretty printing, `i4` for integers.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use quick_xml::escape::escape;

use super::Value;

/// Render a `<methodCall>` document for the given method and arguments.
pub fn encode_call(method: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(128);
    out.push_str("<?xml version=\"1.0\"?><methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for arg in args {
        out.push_str("<param><value>");
        write_value(&mut out, arg);
        out.push_str("</value></param>");
    }
    out.push_str("</params></methodCall>");
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Int(n) => {
            out.push_str("<i4>");
            out.push_str(&n.to_string());
            out.push_str("</i4>");
        }
        Value::Bool(b) => {
            out.push_str("<boolean>");
            out.push(if *b { '1' } else { '0' });
            out.push_str("</boolean>");
        }
        Value::Double(d) => {
            out.push_str("<double>");
            out.push_str(&d.to_string());
            out.push_str("</double>");
        }
        Value::String(s) => {
            out.push_str("<string>");
            out.push_str(&escape(s));
            out.push_str("</string>");
        }
        Value::Base64(bytes) => {
            out.push_str("<base64>");
            out.push_str(&BASE64.encode(bytes));
            out.push_str("</base64>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                out.push_str("<value>");
                write_value(out, item);
                out.push_str("</value>");
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                out.push_str(&escape(name));
                out.push_str("</name><value>");
                write_value(out, member);
                out.push_str("</value></member>");
            }
            out.push_str("</struct>");
        }
    }
}
