//! Hard failures of the graph model.
//!
//! Structural defects that the canvas can live with are reported as
//! [`Diagnostic`](crate::diagnostics::Diagnostic) values instead.

use crate::id::{TypeId, Uid};

#[derive(Debug, thiserror::Error)]
pub enum SketchError {
    #[error("a link needs a source node")]
    LinkWithoutSource,

    #[error("node {0} does not exist in this project")]
    UnknownNode(Uid),

    #[error("link {0} does not exist in this project")]
    UnknownLink(Uid),

    #[error("type `{0}` does not exist in this palette")]
    UnknownType(TypeId),

    #[error("type id `{0}` is already used in this palette")]
    DuplicateTypeId(TypeId),

    #[error("section `{name}` is still used by {count} type(s)")]
    SectionInUse { name: String, count: usize },

    #[error("section `{0}` does not exist")]
    UnknownSection(String),

    #[error("`{0}` is read-only")]
    ReadOnly(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SketchError>;
