// Copyright (c) 2026 The floe Authors
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! A minimal JSON reader, just enough for the COPY processor's JSON file
//! format: objects, arrays, strings, numbers, booleans, null. No streaming,
//! no serde: the COPY path only ever needs one record at a time and callers
//! already hold the whole file in memory.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    Null,
    Bool(bool),
    Number(String),
    String(String),
    Array(Vec<JsonValue>),
    Object(Vec<(String, JsonValue)>),
}

impl JsonValue {
    /// Render a scalar as COPY's column text; compound values serialize
    /// back to compact JSON for storage in a VARIANT/JSON column.
    pub fn as_column_text(&self) -> Option<String> {
        match self {
            JsonValue::Null => None,
            JsonValue::Bool(b) => Some(b.to_string()),
            JsonValue::Number(n) => Some(n.clone()),
            JsonValue::String(s) => Some(s.clone()),
            other => Some(other.to_compact_string()),
        }
    }

    pub fn to_compact_string(&self) -> String {
        match self {
            JsonValue::Null => "null".to_string(),
            JsonValue::Bool(b) => b.to_string(),
            JsonValue::Number(n) => n.clone(),
            JsonValue::String(s) => format!("\"{}\"", escape_json_string(s)),
            JsonValue::Array(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_compact_string()).collect();
                format!("[{}]", parts.join(","))
            }
            JsonValue::Object(fields) => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|(k, v)| format!("\"{}\":{}", escape_json_string(k), v.to_compact_string()))
                    .collect();
                format!("{{{}}}", parts.join(","))
            }
        }
    }
}

fn escape_json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct JsonParseError(pub String);
impl fmt::Display for JsonParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "json parse error: {}", self.0)
    }
}
impl std::error::Error for JsonParseError {}

struct Reader<'a> {
    chars: Vec<char>,
    pos: usize,
    _src: &'a str,
}

impl<'a> Reader<'a> {
    fn new(src: &'a str) -> Self {
        Reader { chars: src.chars().collect(), pos: 0, _src: src }
    }

    fn skip_ws(&mut self) {
        while matches!(self.chars.get(self.pos), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied();
        self.pos += 1;
        c
    }

    fn expect(&mut self, c: char) -> Result<(), JsonParseError> {
        if self.bump() == Some(c) {
            Ok(())
        } else {
            Err(JsonParseError(format!("expected '{c}' at position {}", self.pos)))
        }
    }

    fn parse_value(&mut self) -> Result<JsonValue, JsonParseError> {
        self.skip_ws();
        match self.peek() {
            Some('{') => self.parse_object(),
            Some('[') => self.parse_array(),
            Some('"') => self.parse_string().map(JsonValue::String),
            Some('t') => self.parse_literal("true", JsonValue::Bool(true)),
            Some('f') => self.parse_literal("false", JsonValue::Bool(false)),
            Some('n') => self.parse_literal("null", JsonValue::Null),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            _ => Err(JsonParseError(format!("unexpected character at {}", self.pos))),
        }
    }

    fn parse_literal(&mut self, word: &str, value: JsonValue) -> Result<JsonValue, JsonParseError> {
        for expected in word.chars() {
            if self.bump() != Some(expected) {
                return Err(JsonParseError(format!("expected literal {word}")));
            }
        }
        Ok(value)
    }

    fn parse_number(&mut self) -> Result<JsonValue, JsonParseError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || c == '+' || c == '-') {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if text.is_empty() {
            return Err(JsonParseError("empty number".to_string()));
        }
        Ok(JsonValue::Number(text))
    }

    fn parse_string(&mut self) -> Result<String, JsonParseError> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some('/') => out.push('/'),
                    Some(other) => out.push(other),
                    None => return Err(JsonParseError("unterminated escape".to_string())),
                },
                Some(c) => out.push(c),
                None => return Err(JsonParseError("unterminated string".to_string())),
            }
        }
        Ok(out)
    }

    fn parse_array(&mut self) -> Result<JsonValue, JsonParseError> {
        self.expect('[')?;
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(JsonValue::Array(items));
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(']') => break,
                _ => return Err(JsonParseError("expected ',' or ']'".to_string())),
            }
        }
        Ok(JsonValue::Array(items))
    }

    fn parse_object(&mut self) -> Result<JsonValue, JsonParseError> {
        self.expect('{')?;
        let mut fields = Vec::new();
        self.skip_ws();
        if self.peek() == Some('}') {
            self.pos += 1;
            return Ok(JsonValue::Object(fields));
        }
        loop {
            self.skip_ws();
            let key = self.parse_string()?;
            self.skip_ws();
            self.expect(':')?;
            let value = self.parse_value()?;
            fields.push((key, value));
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some('}') => break,
                _ => return Err(JsonParseError("expected ',' or '}'".to_string())),
            }
        }
        Ok(JsonValue::Object(fields))
    }
}

pub fn parse(src: &str) -> Result<JsonValue, JsonParseError> {
    let mut reader = Reader::new(src);
    let value = reader.parse_value()?;
    reader.skip_ws();
    Ok(value)
}

/// Parse newline-delimited JSON objects, one per non-blank line.
pub fn parse_ndjson(src: &str) -> Result<Vec<JsonValue>, JsonParseError> {
    src.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_object() {
        let v = parse(r#"{"a": 1, "b": "x", "c": null, "d": true}"#).unwrap();
        assert_eq!(
            v,
            JsonValue::Object(vec![
                ("a".to_string(), JsonValue::Number("1".to_string())),
                ("b".to_string(), JsonValue::String("x".to_string())),
                ("c".to_string(), JsonValue::Null),
                ("d".to_string(), JsonValue::Bool(true)),
            ])
        );
    }

    #[test]
    fn parses_ndjson_lines() {
        let values = parse_ndjson("{\"a\":1}\n{\"a\":2}\n").unwrap();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn round_trips_compact_string_for_nested_value() {
        let v = parse(r#"{"a":[1,2,"x"]}"#).unwrap();
        if let JsonValue::Object(fields) = &v {
            assert_eq!(fields[0].1.to_compact_string(), "[1,2,\"x\"]");
        } else {
            panic!("expected object");
        }
    }
}
