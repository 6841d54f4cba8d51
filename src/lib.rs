//! OneDM SDF models
//!
//! Reads models in the Semantic Definition Format, expands their `sdfRef`
//! references against a registry of known namespaces, and turns their data
//! qualities into validators for runtime values.
//!
//! ## Features
//!
//! - **Reference resolution**: local and namespaced `sdfRef`s, merge-patched
//!   with the keys written next to them
//! - **Registries**: in-memory or backed by a directory of `*.sdf.json` files,
//!   newest model version first
//! - **Validation**: every data definition compiles into a validator that
//!   checks and coerces JSON input
//! - **Typed documents**: things, objects, properties, events and data
//!
//! ## Flow
//!
//! ```text
//! JSON ──► loader ──► Resolver ──► resolved Definition ──► Document
//!                        │                                     │
//!                     Registry                        Data::compile()
//!                                                             │
//!                                                  Validator::validate()
//! ```

pub mod config;
pub mod data;
pub mod document;
pub mod error;
pub mod loader;
pub mod named;
pub mod registry;
pub mod resolver;
pub mod validator;
pub mod version;

/// A JSON object in an SDF document, key order preserved
pub type Definition = serde_json::Map<String, serde_json::Value>;

pub use config::SdfConfig;
pub use data::{Data, DataQualities, DataType};
pub use document::{Document, Event, Information, Object, Property, Thing};
pub use error::{Result, SdfError, ValidationError, ValidationErrorKind};
pub use named::NamedMap;
pub use registry::{DirectoryRegistry, InMemoryRegistry, NullRegistry, Registry};
pub use resolver::{resolve, resolve_local, Resolver};
pub use validator::{DataValue, Validator};
pub use version::VersionOrdering;
