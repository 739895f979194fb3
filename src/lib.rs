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

//! A wire-compatible emulator of a cloud warehouse's client protocol: a
//! client driver built against the real thing connects, authenticates,
//! submits SQL, and retrieves rows without knowing it is talking to a
//! different engine underneath. This crate holds the parts that make that
//! possible:
//!
//! - [`type_map`]: engine type to protocol type mapping (C1).
//! - [`resolver`]: object name resolution (C2).
//! - [`classify`]: statement classification (C3).
//! - [`translate`]: SQL dialect translation (C4).
//! - [`bind`]: typed parameter binding (C5).
//! - [`copy`]: `COPY INTO` processing (C6).
//! - [`merge`]: `MERGE INTO` processing (C7).
//! - [`executor`]: statement execution (C8).
//! - [`statement`]: statement lifecycle management (C9).
//! - [`session`]: session lifecycle management (C10).
//!
//! The embedded SQL engine, the metadata catalog, and stage storage are
//! external collaborators, declared here as traits ([`engine::SqlEngine`],
//! [`catalog::Catalog`], [`stage::Stage`]) with in-memory stand-ins
//! ([`demo_engine::DemoEngine`], [`catalog::DemoCatalog`],
//! [`stage::DemoStage`]) good enough to run this crate's own tests and the
//! `floe-server` demo binary.

pub mod bind;
pub mod catalog;
pub mod classify;
pub mod copy;
pub mod demo_engine;
pub mod engine;
pub mod error;
pub mod executor;
pub mod json;
pub mod merge;
pub mod resolver;
pub mod session;
pub mod stage;
pub mod statement;
pub mod translate;
pub mod type_map;

pub use error::{FloeError, Result};
