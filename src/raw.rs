//! Host type descriptors.
//!
//! A `RawType` is what an external reflection layer hands us: a serializable
//! snapshot of a host type construct (class, generic alias, union, literal set,
//! type variable, ...). The pipeline only ever reads it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Annotation key under which hosts store a callable's return type.
pub const RETURN_KEY: &str = "return";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawType {
    /// No annotation at all (distinct from `None`).
    Empty,
    None,
    Any,
    /// `...` inside a tuple alias.
    Ellipsis,
    /// Something the reflection layer could not classify.
    Opaque { repr: String },
    Builtin { name: String },
    Generic {
        origin: String,
        #[serde(default)]
        args: Vec<RawType>,
    },
    Union { members: Vec<RawType> },
    Literal { values: Vec<Scalar> },
    Enum {
        name: String,
        members: IndexMap<String, Scalar>,
    },
    TypeVar(Arc<TypeVarDecl>),
    Class(ClassDecl),
    TypedDict(TypedDictDecl),
    NewType {
        name: String,
        supertype: Box<RawType>,
    },
    /// A user generic class bound to concrete arguments (`Box[int]`).
    Parameterized {
        base: Box<RawType>,
        args: Vec<RawType>,
    },
    Function(FunctionDecl),
    /// Handle to a class, typed dict or alias by qualified name.
    Ref { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeVarDecl {
    pub name: String,
    #[serde(default)]
    pub bound: Option<Box<RawType>>,
    #[serde(default)]
    pub constraints: Vec<RawType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    #[serde(default)]
    pub fields: IndexMap<String, RawType>,
    #[serde(default)]
    pub type_params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedDictDecl {
    pub name: String,
    #[serde(default)]
    pub fields: IndexMap<String, RawType>,
    #[serde(default = "default_total")]
    pub total: bool,
}

fn default_total() -> bool { true }

/// A callable as seen through reflection.
///
/// `annotations` carries no order (and may contain the synthesized `return`
/// key); `param_names` is the authoritative parameter order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    #[serde(default)]
    pub annotations: HashMap<String, RawType>,
    #[serde(default)]
    pub param_names: Vec<String>,
}

/// Literal and enum payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64), // only past `i64::MAX`; host ints are unbounded
    Float(OrderedFloat<f64>),
    Str(String),
}

// -------------------------- origin classification -------------------------- //

const LIST_ORIGINS: &[&str] = &[
    "list", "typing.List",
    "set", "typing.Set",
    "frozenset", "typing.FrozenSet",
    "typing.Sequence", "collections.abc.Sequence",
];
const DICT_ORIGINS: &[&str] = &["dict", "typing.Dict"];
const TUPLE_ORIGINS: &[&str] = &["tuple", "typing.Tuple"];
const MAPPING_ORIGINS: &[&str] = &[
    "typing.Mapping", "collections.abc.Mapping",
    "typing.MutableMapping", "collections.abc.MutableMapping",
];

pub fn is_list_origin(origin: &str) -> bool { LIST_ORIGINS.contains(&origin) }
pub fn is_dict_origin(origin: &str) -> bool { DICT_ORIGINS.contains(&origin) }
pub fn is_tuple_origin(origin: &str) -> bool { TUPLE_ORIGINS.contains(&origin) }
pub fn is_mapping_origin(origin: &str) -> bool { MAPPING_ORIGINS.contains(&origin) }

// ------------------------------ constructors ------------------------------- //

impl RawType {
    pub fn builtin(name: impl Into<String>) -> Self {
        RawType::Builtin { name: name.into() }
    }

    pub fn generic(origin: impl Into<String>, args: Vec<RawType>) -> Self {
        RawType::Generic { origin: origin.into(), args }
    }

    pub fn union(members: Vec<RawType>) -> Self {
        RawType::Union { members }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        RawType::Ref { name: name.into() }
    }

    pub fn class<I, K>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, RawType)>,
        K: Into<String>,
    {
        RawType::Class(ClassDecl {
            name: name.into(),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            type_params: Vec::new(),
        })
    }

    /// Short label for log lines; never the full descriptor.
    pub fn label(&self) -> String {
        match self {
            RawType::Empty => "<empty>".into(),
            RawType::None => "None".into(),
            RawType::Any => "Any".into(),
            RawType::Ellipsis => "...".into(),
            RawType::Opaque { repr } => format!("opaque({repr})"),
            RawType::Builtin { name } => name.clone(),
            RawType::Generic { origin, args } => format!("{origin}[{} args]", args.len()),
            RawType::Union { members } => format!("Union[{} members]", members.len()),
            RawType::Literal { values } => format!("Literal[{} values]", values.len()),
            RawType::Enum { name, .. } => format!("enum {name}"),
            RawType::TypeVar(decl) => format!("~{}", decl.name),
            RawType::Class(decl) => format!("class {}", decl.name),
            RawType::TypedDict(decl) => format!("typed_dict {}", decl.name),
            RawType::NewType { name, .. } => format!("new_type {name}"),
            RawType::Parameterized { base, args } => format!("{}[{} args]", base.label(), args.len()),
            RawType::Function(decl) => format!("def {}", decl.name),
            RawType::Ref { name } => format!("ref {name}"),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("None"),
            Scalar::Bool(true) => f.write_str("True"),
            Scalar::Bool(false) => f.write_str("False"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::UInt(u) => write!(f, "{u}"),
            Scalar::Float(x) => write!(f, "{}", x.0),
            Scalar::Str(s) => write!(f, "{s:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptors_deserialize_from_tagged_json() {
        let raw: RawType = serde_json::from_value(json!({
            "kind": "generic",
            "origin": "dict",
            "args": [
                { "kind": "builtin", "name": "str" },
                { "kind": "generic", "origin": "list", "args": [{ "kind": "builtin", "name": "int" }] }
            ]
        })).unwrap();
        assert_eq!(
            raw,
            RawType::generic("dict", vec![
                RawType::builtin("str"),
                RawType::generic("list", vec![RawType::builtin("int")]),
            ])
        );
    }

    #[test]
    fn scalars_keep_their_json_kind() {
        let values: Vec<Scalar> = serde_json::from_value(json!([null, true, 3, 1.5, "a"])).unwrap();
        assert_eq!(values, vec![
            Scalar::Null,
            Scalar::Bool(true),
            Scalar::Int(3),
            Scalar::Float(OrderedFloat(1.5)),
            Scalar::Str("a".into()),
        ]);
    }

    #[test]
    fn ints_past_i64_stay_exact() {
        let values: Vec<Scalar> = serde_json::from_str("[18446744073709551615, -1]").unwrap();
        assert_eq!(values, vec![Scalar::UInt(u64::MAX), Scalar::Int(-1)]);
        assert_eq!(values[0].to_string(), "18446744073709551615");
        assert_eq!(serde_json::to_string(&values[0]).unwrap(), "18446744073709551615");
    }

    #[test]
    fn typed_dict_defaults_to_total() {
        let raw: RawType = serde_json::from_value(json!({
            "kind": "typed_dict", "name": "m.Movie", "fields": {}
        })).unwrap();
        let RawType::TypedDict(decl) = raw else { panic!("expected typed dict") };
        assert!(decl.total);
    }

    #[test]
    fn type_var_decl_is_shared() {
        let raw: RawType = serde_json::from_value(json!({
            "kind": "type_var", "name": "T", "constraints": [{ "kind": "builtin", "name": "int" }]
        })).unwrap();
        let RawType::TypeVar(decl) = raw else { panic!("expected type var") };
        assert_eq!(decl.name, "T");
        assert!(decl.bound.is_none());
        assert_eq!(decl.constraints.len(), 1);
    }

    #[test]
    fn origin_tables_do_not_overlap() {
        assert!(is_list_origin("typing.List"));
        assert!(is_dict_origin("dict"));
        assert!(!is_mapping_origin("dict"));
        assert!(is_mapping_origin("collections.abc.Mapping"));
        assert!(is_tuple_origin("tuple"));
        assert!(!is_list_origin("tuple"));
    }
}
