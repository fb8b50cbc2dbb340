//! Input documents: a batch of raw descriptors produced by a reflection layer.
//!
//! ```json
//! { "definitions": { "pkg.Tree": { "kind": "class", ... } },
//!   "roots": { "tree": { "kind": "ref", "name": "pkg.Tree" } } }
//! ```

use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ExtractError;
use crate::node::Node;
use crate::options::OptionSet;
use crate::pipeline::Pipeline;
use crate::raw::RawType;
use crate::registry::Catalog;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Document {
    /// Targets of `RawType::Ref` handles.
    #[serde(default)]
    pub definitions: IndexMap<String, RawType>,
    /// Entry points, normalized in order.
    #[serde(default)]
    pub roots: IndexMap<String, RawType>,
}

/// Normalized roots plus everything the registry collected on the way.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub roots: IndexMap<String, Node>,
    pub catalog: Catalog,
}

impl Document {
    pub fn parse(src: &str) -> Result<Self> {
        from_str_with_path(src)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        from_value_with_path(value)
    }

    /// Runs every root through a fresh standard pipeline seeded with this
    /// document's definitions.
    pub fn extract(&self, options: &OptionSet) -> Result<Extraction, ExtractError> {
        let pipeline = Pipeline::standard().with_definitions(self.definitions.clone());
        self.extract_with(&pipeline, options)
    }

    /// Same as [`Document::extract`] with a caller-built pipeline; the
    /// document's definitions are not installed.
    pub fn extract_with(&self, pipeline: &Pipeline, options: &OptionSet) -> Result<Extraction, ExtractError> {
        let mut roots = IndexMap::with_capacity(self.roots.len());
        for (name, raw) in &self.roots {
            roots.insert(name.clone(), pipeline.normalize(raw, options)?);
        }
        Ok(Extraction { roots, catalog: pipeline.catalog() })
    }
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        anyhow!("at JSON path {path} → {}", err.into_inner())
    })
}

pub fn from_value_with_path<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| {
        let path = err.path().to_string();
        anyhow!("at JSON path {path} → {}", err.into_inner())
    })
}
