use thiserror::Error;

use crate::model::{ClaimId, RelationId};

/// Errors raised by the entity model, the layout builder and input loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A relation source did not resolve to a live claim.
    #[error("relation source should be a claim, is {found}")]
    InvalidSource { found: String },

    /// A relation target did not resolve to a live claim or relation.
    #[error("relation target should be a claim or relation, is {found}")]
    InvalidTarget { found: String },

    #[error("unknown {cls} reference '{id}'")]
    UnknownReference { cls: String, id: String },

    #[error("unknown type '{0}'")]
    UnknownClass(String),

    #[error("relation id '{0}' occurs multiple times")]
    DuplicateRelation(String),

    #[error("variable \"{0}\" is unknown")]
    UnknownVariable(String),

    #[error("variable \"{0}\" names a relation, which cannot be a source")]
    RelationAsSource(String),

    /// A script statement failed; `line` counts from 1.
    #[error("parse error on line {line}: {source}")]
    Script {
        line: usize,
        source: Box<GraphError>,
    },

    #[error("claim {0} has not been measured yet")]
    Unmeasured(ClaimId),

    #[error("claim {0} is part of a relation cycle")]
    Cycle(ClaimId),

    #[error("relation {0} no longer exists")]
    MissingRelation(RelationId),
}

pub type Result<T, E = GraphError> = std::result::Result<T, E>;
