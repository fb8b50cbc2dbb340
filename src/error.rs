use thiserror::Error;

use crate::registry::CollectedKind;

/// Fatal extraction failures. An unrecognized type is not one of these: it
/// normalizes to `Node::Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("`{origin}` expects {expected} type argument(s), found {found}")]
    Arity {
        origin: String,
        expected: &'static str,
        found: usize,
    },

    #[error("`{base}` declares {declared} type parameter(s) but was given {found}")]
    TypeParams {
        base: String,
        declared: usize,
        found: usize,
    },

    #[error("`...` is only valid as the second argument of `{origin}[X, ...]`")]
    MisplacedEllipsis { origin: String },

    #[error("{kind} `{name}` was already collected from a different definition")]
    RegistryConflict { kind: CollectedKind, name: String },

    #[error("{kind} `{name}` was finalized without being claimed")]
    Unclaimed { kind: CollectedKind, name: String },
}
