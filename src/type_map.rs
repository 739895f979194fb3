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

//! Bidirectional-in-spirit mapping between engine type names and protocol
//! column types, plus column-metadata inference for a query result.

use crate::engine::{EngineColumn, EngineValue};

/// A protocol-facing column type name, as a client driver expects to see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolType {
    Fixed,
    Real,
    Text,
    Boolean,
    TimestampNtz,
    TimestampTz,
    Binary,
    Variant,
    Array,
    Object,
}

impl ProtocolType {
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolType::Fixed => "FIXED",
            ProtocolType::Real => "REAL",
            ProtocolType::Text => "TEXT",
            ProtocolType::Boolean => "BOOLEAN",
            ProtocolType::TimestampNtz => "TIMESTAMP_NTZ",
            ProtocolType::TimestampTz => "TIMESTAMP_TZ",
            ProtocolType::Binary => "BINARY",
            ProtocolType::Variant => "VARIANT",
            ProtocolType::Array => "ARRAY",
            ProtocolType::Object => "OBJECT",
        }
    }
}

/// Column metadata as reported on the wire: name, protocol type, length,
/// precision, scale, nullable.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub name: String,
    pub type_name: &'static str,
    pub length: Option<i64>,
    pub precision: Option<i64>,
    pub scale: Option<i64>,
    pub nullable: bool,
}

/// Map an engine type name to its protocol equivalent. Unknown engine types
/// default to `TEXT`.
pub fn map_engine_type(engine_type: &str) -> ProtocolType {
    match engine_type.to_ascii_lowercase().as_str() {
        "int8" | "int16" | "int32" | "int64" | "integer" | "bigint" | "smallint" | "tinyint" => {
            ProtocolType::Fixed
        }
        "float32" | "float64" | "float" | "double" => ProtocolType::Real,
        "decimal" | "numeric" => ProtocolType::Fixed,
        "utf8" | "string" | "text" | "varchar" | "char" => ProtocolType::Text,
        "timestamp_ntz" | "timestamp" | "datetime" | "naive_timestamp" => {
            ProtocolType::TimestampNtz
        }
        "timestamp_tz" | "timestamp_ltz" | "zoned_timestamp" => ProtocolType::TimestampTz,
        "binary" | "bytes" | "blob" | "varbinary" => ProtocolType::Binary,
        "json" | "variant" => ProtocolType::Variant,
        "list" | "array" => ProtocolType::Array,
        "struct" | "map" | "object" => ProtocolType::Object,
        "bool" | "boolean" => ProtocolType::Boolean,
        _ => ProtocolType::Text,
    }
}

/// Infer column metadata from the engine's own reflection, falling back to
/// nullable `TEXT` when the engine exposes no type information for a column.
pub fn infer_columns(columns: &[EngineColumn]) -> Vec<ColumnMeta> {
    columns
        .iter()
        .map(|c| ColumnMeta {
            name: c.name.clone(),
            type_name: map_engine_type(&c.engine_type).name(),
            length: c.length,
            precision: c.precision,
            scale: c.scale,
            nullable: c.nullable,
        })
        .collect()
}

/// Column metadata for a result set the engine reported with no reflection
/// at all: every column defaults to nullable `TEXT`.
pub fn default_columns(names: &[String]) -> Vec<ColumnMeta> {
    names
        .iter()
        .map(|n| ColumnMeta {
            name: n.clone(),
            type_name: ProtocolType::Text.name(),
            length: None,
            precision: None,
            scale: None,
            nullable: true,
        })
        .collect()
}

/// Format a single engine value as the text the client sees. Byte-sequence
/// scalars pass through unchanged, per the engine interface contract (spec
/// §6: "byte-sequence scalars must be convertible to text").
pub fn format_value(value: &EngineValue) -> Option<String> {
    value.to_text()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_engine_types() {
        assert_eq!(map_engine_type("int64").name(), "FIXED");
        assert_eq!(map_engine_type("float64").name(), "REAL");
        assert_eq!(map_engine_type("utf8").name(), "TEXT");
        assert_eq!(map_engine_type("timestamp_ntz").name(), "TIMESTAMP_NTZ");
        assert_eq!(map_engine_type("timestamp_tz").name(), "TIMESTAMP_TZ");
        assert_eq!(map_engine_type("decimal").name(), "FIXED");
        assert_eq!(map_engine_type("binary").name(), "BINARY");
        assert_eq!(map_engine_type("json").name(), "VARIANT");
        assert_eq!(map_engine_type("list").name(), "ARRAY");
        assert_eq!(map_engine_type("struct").name(), "OBJECT");
    }

    #[test]
    fn unknown_engine_type_defaults_to_text() {
        assert_eq!(map_engine_type("some_future_type").name(), "TEXT");
    }

    #[test]
    fn no_reflection_defaults_to_nullable_text() {
        let cols = default_columns(&["n".to_string()]);
        assert_eq!(cols[0].type_name, "TEXT");
        assert!(cols[0].nullable);
    }

    #[test]
    fn bytes_convert_to_text() {
        let v = EngineValue::Bytes(b"hello".to_vec());
        assert_eq!(format_value(&v), Some("hello".to_string()));
        let v = EngineValue::Bytes(vec![0xff, 0x00, 0xfe]);
        assert_eq!(format_value(&v), Some("ff00fe".to_string()));
    }
}
