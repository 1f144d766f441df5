//! Object format codec for groupware storage.
//!
//! Groupware objects live inside the remote store as MIME documents: a
//! multipart envelope whose first part is a human-readable summary and whose
//! second part carries the typed payload (`application/x-vnd.kolab.<type>`).
//! This crate turns those documents into typed [`ObjectRecord`]s and back.
//!
//! Parsing is lenient. A payload that cannot be parsed never fails a load;
//! it becomes a [`Payload::Fallback`] that keeps the original bytes and the
//! reason, so the object stays visible. Writes are strict: a payload that
//! cannot be serialized is an error.
//!
//! # Modules
//!
//! - [`data`] -- [`ObjectData`], [`Payload`], [`ObjectRecord`]
//! - [`engine`] -- the [`FormatEngine`] trait and [`FormatFactory`]
//! - [`xml`] -- [`XmlFormat`], the XML payload engine
//! - [`codec`] -- [`ObjectCodec`]: raw pass-through or format-driven
//! - [`structure`] -- [`StructureParser`]: find the payload part of a document
//! - [`envelope`] -- [`Envelope`]: build and rebuild MIME documents
//! - [`loader`] -- [`ObjectLoader`]: structure-aware batch loading
//! - [`error`] -- Error types

pub mod codec;
pub mod data;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod loader;
pub mod structure;
pub mod xml;

pub use codec::{FormatCodec, ObjectCodec};
pub use data::{FailureKind, ObjectData, ObjectRecord, ParseFailure, Payload};
pub use engine::{FormatEngine, FormatFactory, FormatParams};
pub use envelope::Envelope;
pub use error::{FormatError, FormatResult};
pub use loader::ObjectLoader;
pub use structure::{LocatedPart, StructureParser};
pub use xml::XmlFormat;
