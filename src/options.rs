//! Extraction-time modifiers threaded through every recognizer call.
//!
//! The orchestrator never looks inside an [`OptionSet`]; recognizers read
//! only the flags relevant to their own domain.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractOption {
    /// `Union[X, None]` becomes `Optional(X)`.
    CollapseOptional,
    /// Class and record fields are ordered by name instead of declaration.
    SortFields,
    /// Caller-defined flag; recorded on nodes, ignored by the stock recognizers.
    Custom(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OptionSet(BTreeSet<ExtractOption>);

impl OptionSet {
    pub fn new() -> Self { Self::default() }

    /// Returns a copy with `option` added; the receiver is left untouched.
    pub fn with(&self, option: ExtractOption) -> Self {
        let mut flags = self.0.clone();
        flags.insert(option);
        Self(flags)
    }

    pub fn contains(&self, option: &ExtractOption) -> bool {
        self.0.contains(option)
    }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn iter(&self) -> impl Iterator<Item = &ExtractOption> {
        self.0.iter()
    }
}

impl FromIterator<ExtractOption> for OptionSet {
    fn from_iter<I: IntoIterator<Item = ExtractOption>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for ExtractOption {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "collapse-optional" | "collapse_optional" => ExtractOption::CollapseOptional,
            "sort-fields" | "sort_fields" => ExtractOption::SortFields,
            other => ExtractOption::Custom(other.to_string()),
        })
    }
}

impl fmt::Display for ExtractOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractOption::CollapseOptional => f.write_str("collapse-optional"),
            ExtractOption::SortFields => f.write_str("sort-fields"),
            ExtractOption::Custom(name) => f.write_str(name),
        }
    }
}
