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

//! The embedded SQL engine as an external collaborator.
//!
//! `floe` never evaluates SQL itself; it translates warehouse SQL into the
//! engine's dialect and hands the text to whatever implements [`SqlEngine`].
//! This mirrors the old wrapper here (a thin `Error` + `Result<T>` pair
//! around a collaborator that did the real evaluation) without depending on
//! that collaborator's internals.

use std::fmt;

/// Failure from the embedded engine while compiling or running translated SQL.
#[derive(Debug, Clone)]
pub struct SqlExecError(pub String);

impl fmt::Display for SqlExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for SqlExecError {}

pub type EngineResult<T> = std::result::Result<T, SqlExecError>;

/// A scalar value as returned by the engine's row stream.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    /// Byte-sequence scalars, converted to text by the Executor before
    /// reaching a client (spec §6).
    Bytes(Vec<u8>),
}

impl EngineValue {
    /// Render as the text form a client sees; byte sequences become UTF-8
    /// when valid, hex otherwise.
    pub fn to_text(&self) -> Option<String> {
        match self {
            EngineValue::Null => None,
            EngineValue::Int(v) => Some(v.to_string()),
            EngineValue::Float(v) => Some(v.to_string()),
            EngineValue::Bool(v) => Some(v.to_string()),
            EngineValue::Text(v) => Some(v.clone()),
            EngineValue::Bytes(v) => match std::str::from_utf8(v) {
                Ok(s) => Some(s.to_string()),
                Err(_) => Some(hex::encode(v)),
            },
        }
    }
}

/// Column-type reflection exposed by the engine's result set (spec §6:
/// "type name, length, decimal size, nullability").
#[derive(Debug, Clone)]
pub struct EngineColumn {
    pub name: String,
    /// The engine's own type name (e.g. `"int64"`, `"utf8"`), mapped to a
    /// protocol type name by [`crate::type_map`].
    pub engine_type: String,
    pub length: Option<i64>,
    pub precision: Option<i64>,
    pub scale: Option<i64>,
    pub nullable: bool,
}

/// A materialized query result: columns plus every row.
///
/// Column metadata is captured once before rows are drained, because
/// iterating the underlying cursor can invalidate type reflection in a real
/// engine (spec §4.8).
#[derive(Debug, Clone, Default)]
pub struct EngineRows {
    pub columns: Vec<EngineColumn>,
    pub rows: Vec<Vec<EngineValue>>,
}

/// The collaborator contract: compile and run SQL in the engine's own
/// dialect (the output of [`crate::translate`]), never the warehouse dialect.
pub trait SqlEngine: Send + Sync {
    /// Run a mutating statement, returning the number of rows affected.
    fn exec(&self, sql: &str) -> EngineResult<u64>;

    /// Run a query, returning the full result set.
    fn query(&self, sql: &str) -> EngineResult<EngineRows>;
}
