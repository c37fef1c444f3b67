//! Tome — a markdown-native knowledge base with vector search, served over
//! [MCP](https://modelcontextprotocol.io/).
//!
//! Documents carry caller-assigned kebab-case ids and live in SQLite, with
//! [sqlite-vec](https://github.com/asg017/sqlite-vec) providing cosine
//! similarity over optional embeddings. Typed links connect documents into a
//! graph, and a markdown bridge round-trips the whole store through
//! frontmattered `.md` files for editing and version control.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite database initialization, schema, and migrations
//! - [`embedding`] — Text-to-vector embedding via OpenAI-compatible APIs or local ONNX
//! - [`kb`] — Core engine: document store, link graph, search, stats, access ledger
//! - [`markdown`] — Import/export bridge between the store and markdown trees
//! - [`server`] — MCP server over stdio or streamable HTTP
//! - [`tools`] — The MCP tool surface

pub mod config;
pub mod db;
pub mod embedding;
pub mod kb;
pub mod markdown;
pub mod server;
pub mod tools;
