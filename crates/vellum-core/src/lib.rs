//! vellum-core: culture-variant content items, send-to-publish eligibility
//! and a typed relation graph persisted in SQLite.
//!
//! # Conventions
//!
//! - **Errors**: domain operations return [`error::Result`] with a typed
//!   [`error::VellumError`]; store-open and config boundaries use
//!   `anyhow::Result` with context.
//! - **Logging**: `tracing` macros only; subscribers are installed by binaries.

pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod model;
pub mod publish;

pub use error::{ErrorCode, Result, VellumError};
pub use model::content::{ContentItem, ContentSettings, ContentTypeRef, PropertyData};
pub use model::content_type::{ContentType, ContentTypeResolver, PropertyType};
pub use model::culture::Culture;
pub use model::relation::{EntityKind, Relation, RelationType};
pub use model::variant::{NameChange, PublicationState, Variant, VariantStore};
