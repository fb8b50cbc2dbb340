//! Normalize reflected host type descriptors into a serializable type-shape IR.
//!
//! A [`Pipeline`] runs each [`RawType`] through an ordered chain of
//! [`Recognizer`]s; the first one to claim the type produces the [`Node`].
//! Class, record and function shapes are additionally collected by qualified
//! name, which also breaks cycles in self-referential type graphs.
pub mod cli;
pub mod document;
pub mod error;
pub mod node;
pub mod options;
pub mod pipeline;
pub mod raw;
pub mod recognizers;
pub mod registry;
pub mod schema;

pub use document::{Document, Extraction};
pub use error::ExtractError;
pub use node::Node;
pub use options::{ExtractOption, OptionSet};
pub use pipeline::{Pipeline, Recognized, Recognizer};
pub use raw::RawType;
pub use registry::{Catalog, CollectedKind};
