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

//! Canonicalizes `[db.[schema.]]table` references into engine-qualified names.

/// A resolved object reference, with each present segment uppercased.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QualifiedName {
    pub database: Option<String>,
    pub schema: Option<String>,
    pub table: String,
}

/// Split a dotted reference into up to three segments, uppercasing each.
/// One segment names a table only; two, `schema.table`; three,
/// `db.schema.table`; more than three is treated as one opaque table name.
pub fn resolve(reference: &str) -> QualifiedName {
    let parts: Vec<&str> = reference.split('.').collect();
    match parts.as_slice() {
        [table] => QualifiedName {
            database: None,
            schema: None,
            table: table.to_ascii_uppercase(),
        },
        [schema, table] => QualifiedName {
            database: None,
            schema: Some(schema.to_ascii_uppercase()),
            table: table.to_ascii_uppercase(),
        },
        [db, schema, table] => QualifiedName {
            database: Some(db.to_ascii_uppercase()),
            schema: Some(schema.to_ascii_uppercase()),
            table: table.to_ascii_uppercase(),
        },
        _ => QualifiedName {
            database: None,
            schema: None,
            table: reference.to_ascii_uppercase(),
        },
    }
}

/// Build the engine-level qualified name: `DB.SCHEMA_TABLE` when both a
/// database and schema are present, `SCHEMA_TABLE` for a bare schema, or
/// just the bare table name.
pub fn engine_name(name: &QualifiedName) -> String {
    match (&name.database, &name.schema) {
        (Some(db), Some(schema)) => format!("{db}.{schema}_{}", name.table),
        (None, Some(schema)) => format!("{schema}_{}", name.table),
        _ => name.table.clone(),
    }
}

/// Resolve then build the engine-level qualified name in one step. Every
/// caller that hands a table reference to the embedded engine must go
/// through this so the same reference always produces the same engine-level
/// name regardless of which caller resolved it.
pub fn engine_name_for(reference: &str) -> String {
    engine_name(&resolve(reference))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_segment_is_table_only() {
        let n = resolve("t");
        assert_eq!(n.database, None);
        assert_eq!(n.schema, None);
        assert_eq!(n.table, "T");
        assert_eq!(engine_name(&n), "T");
    }

    #[test]
    fn two_segments_are_schema_table() {
        let n = resolve("public.t");
        assert_eq!(n.schema.as_deref(), Some("PUBLIC"));
        assert_eq!(n.table, "T");
        assert_eq!(engine_name(&n), "PUBLIC_T");
    }

    #[test]
    fn three_segments_are_db_schema_table() {
        let n = resolve("db.sch.t");
        assert_eq!(n.database.as_deref(), Some("DB"));
        assert_eq!(n.schema.as_deref(), Some("SCH"));
        assert_eq!(n.table, "T");
        assert_eq!(engine_name(&n), "DB.SCH_T");
    }

    #[test]
    fn more_than_three_segments_is_opaque() {
        let n = resolve("a.b.c.d");
        assert_eq!(n.database, None);
        assert_eq!(n.schema, None);
        assert_eq!(n.table, "A.B.C.D");
    }

    #[test]
    fn engine_name_for_is_resolve_then_engine_name() {
        assert_eq!(engine_name_for("db.public.t"), "DB.PUBLIC_T");
        assert_eq!(engine_name_for("t"), "T");
    }
}
