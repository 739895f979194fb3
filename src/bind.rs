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

//! Typed placeholder substitution. Positional placeholders come in two
//! forms, `:N` (one-based) and `?` (one-based by textual position); each
//! binding is formatted into a SQL literal per its declared type tag, never
//! interpolated raw, so a malformed value never reaches the engine.

use crate::error::{FloeError, Result};

/// A single parameter: a textual type tag plus its string value. A `None`
/// value always binds as `NULL` regardless of tag.
#[derive(Debug, Clone)]
pub struct BindingValue {
    pub type_tag: String,
    pub value: Option<String>,
}

impl BindingValue {
    pub fn new(type_tag: impl Into<String>, value: impl Into<String>) -> Self {
        BindingValue {
            type_tag: type_tag.into(),
            value: Some(value.into()),
        }
    }

    pub fn null(type_tag: impl Into<String>) -> Self {
        BindingValue {
            type_tag: type_tag.into(),
            value: None,
        }
    }
}

fn is_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b[4] == b'-'
        && b[7] == b'-'
        && b[0..4].iter().all(u8::is_ascii_digit)
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[8..10].iter().all(u8::is_ascii_digit)
}

fn is_time(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() < 8 || bytes[2] != b':' || bytes[5] != b':' {
        return false;
    }
    if !bytes[0..2].iter().all(u8::is_ascii_digit)
        || !bytes[3..5].iter().all(u8::is_ascii_digit)
        || !bytes[6..8].iter().all(u8::is_ascii_digit)
    {
        return false;
    }
    if bytes.len() == 8 {
        return true;
    }
    bytes[8] == b'.' && bytes[9..].iter().all(u8::is_ascii_digit) && bytes.len() > 9
}

fn is_timestamp(s: &str) -> bool {
    if s.len() < 19 {
        return false;
    }
    let (date_part, rest) = s.split_at(10);
    if !is_date(date_part) {
        return false;
    }
    let sep = rest.as_bytes()[0];
    if sep != b'T' && sep != b' ' {
        return false;
    }
    let time_and_zone = &rest[1..];
    let time_part = &time_and_zone[..8.min(time_and_zone.len())];
    if !is_time(time_part) {
        return false;
    }
    let remainder = &time_and_zone[time_part.len()..];
    let (frac, zone) = split_fraction(remainder);
    if !frac.is_empty() && (frac.len() < 2 || frac.as_bytes()[0] != b'.' || !frac[1..].bytes().all(|c| c.is_ascii_digit())) {
        return false;
    }
    zone.is_empty()
        || zone == "Z"
        || is_zone_offset(zone)
}

fn split_fraction(s: &str) -> (&str, &str) {
    if !s.starts_with('.') {
        return ("", s);
    }
    let digits_end = s[1..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| i + 1)
        .unwrap_or(s.len());
    (&s[..digits_end], &s[digits_end..])
}

fn is_zone_offset(s: &str) -> bool {
    let b = s.as_bytes();
    if b.is_empty() || (b[0] != b'+' && b[0] != b'-') {
        return false;
    }
    let rest = &s[1..];
    if rest.len() == 5 && rest.as_bytes()[2] == b':' {
        return rest[0..2].bytes().all(|c| c.is_ascii_digit()) && rest[3..5].bytes().all(|c| c.is_ascii_digit());
    }
    if rest.len() == 4 {
        return rest.bytes().all(|c| c.is_ascii_digit());
    }
    false
}

fn escape_text(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Format one binding as a SQL literal, validating per its type tag.
/// Validation failures surface as `InvalidParameter`; the caller must never
/// execute a statement for which formatting failed.
pub fn format_binding(binding: &BindingValue) -> Result<String> {
    let Some(value) = binding.value.as_deref() else {
        return Ok("NULL".to_string());
    };

    match binding.type_tag.to_ascii_uppercase().as_str() {
        "NULL" => Ok("NULL".to_string()),
        "TEXT" | "VARCHAR" | "STRING" => Ok(escape_text(value)),
        "FIXED" | "INTEGER" | "BIGINT" | "SMALLINT" | "TINYINT" => value
            .parse::<i64>()
            .map(|v| v.to_string())
            .map_err(|_| FloeError::InvalidParameter(format!("not an integer: {value}"))),
        "REAL" | "FLOAT" | "DOUBLE" | "NUMBER" | "DECIMAL" => value
            .parse::<f64>()
            .map(|v| v.to_string())
            .map_err(|_| FloeError::InvalidParameter(format!("not a number: {value}"))),
        "BOOLEAN" => {
            if value == "true" || value == "1" {
                Ok("TRUE".to_string())
            } else {
                Ok("FALSE".to_string())
            }
        }
        "DATE" => {
            if is_date(value) {
                Ok(format!("DATE '{value}'"))
            } else {
                Err(FloeError::InvalidParameter(format!(
                    "invalid DATE literal: {value}"
                )))
            }
        }
        "TIME" => {
            if is_time(value) {
                Ok(format!("TIME '{value}'"))
            } else {
                Err(FloeError::InvalidParameter(format!(
                    "invalid TIME literal: {value}"
                )))
            }
        }
        "TIMESTAMP" | "TIMESTAMP_NTZ" | "TIMESTAMP_LTZ" | "TIMESTAMP_TZ" => {
            if is_timestamp(value) {
                Ok(format!("TIMESTAMP '{value}'"))
            } else {
                Err(FloeError::InvalidParameter(format!(
                    "invalid TIMESTAMP literal: {value}"
                )))
            }
        }
        _ => Ok(escape_text(value)),
    }
}

/// Substitute every `:N` and `?` placeholder in `sql` with its formatted
/// binding. `:N` placeholders are one-based; `?` placeholders bind in
/// one-based textual order. Substitution for `:N` proceeds from the
/// largest `N` down so `:1` never shadows `:10`.
pub fn bind(sql: &str, bindings: &[BindingValue]) -> Result<String> {
    let formatted: Vec<String> = bindings
        .iter()
        .map(format_binding)
        .collect::<Result<Vec<_>>>()?;

    let mut text = sql.to_string();

    let mut numbered: Vec<usize> = (1..=formatted.len()).collect();
    numbered.sort_by(|a, b| b.cmp(a));
    for n in numbered {
        let placeholder = format!(":{n}");
        if let Some(value) = formatted.get(n - 1) {
            text = text.replace(&placeholder, value);
        }
    }

    if text.contains('?') {
        let mut out = String::with_capacity(text.len());
        let mut idx = 0usize;
        for c in text.chars() {
            if c == '?' {
                if let Some(value) = formatted.get(idx) {
                    out.push_str(value);
                } else {
                    out.push('?');
                }
                idx += 1;
            } else {
                out.push(c);
            }
        }
        text = out;
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_binding_escapes_quotes() {
        let b = BindingValue::new("TEXT", "O'Brien");
        assert_eq!(format_binding(&b).unwrap(), "'O''Brien'");
    }

    #[test]
    fn integer_binding_rejects_non_numeric() {
        let b = BindingValue::new("INTEGER", "abc");
        assert!(format_binding(&b).is_err());
    }

    #[test]
    fn date_binding_rejects_invalid_literal_and_never_issues_sql() {
        let b = BindingValue::new("DATE", "2024-01-01'; DROP TABLE x; --");
        assert!(format_binding(&b).is_err());
    }

    #[test]
    fn valid_date_binding_formats_with_date_keyword() {
        let b = BindingValue::new("DATE", "2024-01-01");
        assert_eq!(format_binding(&b).unwrap(), "DATE '2024-01-01'");
    }

    #[test]
    fn valid_timestamp_binding_with_offset() {
        let b = BindingValue::new("TIMESTAMP_TZ", "2024-01-01T10:00:00+02:00");
        assert_eq!(
            format_binding(&b).unwrap(),
            "TIMESTAMP '2024-01-01T10:00:00+02:00'"
        );
    }

    #[test]
    fn null_binding_emits_null_literal() {
        let b = BindingValue::null("TEXT");
        assert_eq!(format_binding(&b).unwrap(), "NULL");
    }

    #[test]
    fn numbered_placeholders_substitute_largest_first() {
        let bindings = vec![
            BindingValue::new("INTEGER", "1"),
            BindingValue::new("INTEGER", "2"),
            BindingValue::new("INTEGER", "3"),
            BindingValue::new("INTEGER", "4"),
            BindingValue::new("INTEGER", "5"),
            BindingValue::new("INTEGER", "6"),
            BindingValue::new("INTEGER", "7"),
            BindingValue::new("INTEGER", "8"),
            BindingValue::new("INTEGER", "9"),
            BindingValue::new("INTEGER", "10"),
        ];
        let out = bind("SELECT :1, :10", &bindings).unwrap();
        assert_eq!(out, "SELECT 1, 10");
    }

    #[test]
    fn question_mark_placeholders_bind_in_order() {
        let bindings = vec![
            BindingValue::new("TEXT", "a"),
            BindingValue::new("INTEGER", "2"),
        ];
        let out = bind("SELECT ?, ?", &bindings).unwrap();
        assert_eq!(out, "SELECT 'a', 2");
    }
}
