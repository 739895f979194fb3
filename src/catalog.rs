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

//! The warehouse metadata catalog as an external collaborator: database and
//! schema name lookup, enough for the COPY processor to resolve a target's
//! schema before listing stage files. Persisted catalog storage and the
//! admin list/get/create/drop surfaces are out of scope for the core.

use crate::error::{FloeError, Result};

/// Opaque schema identifier returned by the catalog.
pub type SchemaId = u64;

pub trait Catalog: Send + Sync {
    /// Look up a database by name, returning its opaque id.
    fn lookup_database(&self, name: &str) -> Result<u64>;

    /// Look up a schema by `(db_id, name)`, returning its opaque id.
    fn lookup_schema(&self, db_id: u64, name: &str) -> Result<SchemaId>;

    /// Resolve `(database, schema)` names straight to a schema id,
    /// convenience composition of the two lookups above.
    fn resolve_schema(&self, database: &str, schema: &str) -> Result<SchemaId> {
        let db_id = self.lookup_database(database)?;
        self.lookup_schema(db_id, schema)
    }
}

/// An in-memory catalog sufficient for tests and the demo binary: every
/// `(database, schema)` pair it is told about resolves to a stable id
/// derived from the pair's insertion order.
#[derive(Debug, Default)]
pub struct DemoCatalog {
    databases: std::sync::RwLock<Vec<String>>,
    schemas: std::sync::RwLock<Vec<(u64, String)>>,
}

impl DemoCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a database/schema pair so later lookups succeed.
    pub fn register(&self, database: &str, schema: &str) {
        let db_upper = database.to_ascii_uppercase();
        let db_id = {
            let mut dbs = self.databases.write().unwrap();
            match dbs.iter().position(|d| *d == db_upper) {
                Some(idx) => idx as u64,
                None => {
                    dbs.push(db_upper);
                    (dbs.len() - 1) as u64
                }
            }
        };
        let schema_upper = schema.to_ascii_uppercase();
        let mut schemas = self.schemas.write().unwrap();
        if !schemas
            .iter()
            .any(|(d, s)| *d == db_id && *s == schema_upper)
        {
            schemas.push((db_id, schema_upper));
        }
    }
}

impl Catalog for DemoCatalog {
    fn lookup_database(&self, name: &str) -> Result<u64> {
        let upper = name.to_ascii_uppercase();
        self.databases
            .read()
            .unwrap()
            .iter()
            .position(|d| *d == upper)
            .map(|idx| idx as u64)
            .ok_or_else(|| FloeError::ObjectNotFound(format!("database {name} not found")))
    }

    fn lookup_schema(&self, db_id: u64, name: &str) -> Result<SchemaId> {
        let upper = name.to_ascii_uppercase();
        self.schemas
            .read()
            .unwrap()
            .iter()
            .position(|(d, s)| *d == db_id && *s == upper)
            .map(|idx| idx as u64)
            .ok_or_else(|| FloeError::ObjectNotFound(format!("schema {name} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_registered_pair() {
        let cat = DemoCatalog::new();
        cat.register("db", "public");
        assert!(cat.resolve_schema("db", "public").is_ok());
    }

    #[test]
    fn unregistered_database_is_not_found() {
        let cat = DemoCatalog::new();
        let err = cat.resolve_schema("nope", "public").unwrap_err();
        assert_eq!(err.code(), "390700");
    }
}
