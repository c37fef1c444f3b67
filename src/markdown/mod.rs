//! Markdown bridge — bidirectional sync between the database and a
//! directory tree of markdown files with YAML front matter.
//!
//! Files are the interchange format: structured fields live in the front
//! matter, the document content is the body, byte for byte. Embeddings
//! never travel through markdown; they are regenerated after import.

pub mod export;
pub mod frontmatter;
pub mod import;

pub use export::{export, ExportOptions, ExportSummary};
pub use import::{import, ImportOptions, ImportSummary};
