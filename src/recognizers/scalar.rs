//! Leaf-ish shapes: enums, literals, type variables, `None`, builtins.

use std::sync::Arc;

use crate::error::ExtractError;
use crate::node::{BuiltinNode, EnumNode, LiteralNode, Node, TypeVarNode};
use crate::options::OptionSet;
use crate::pipeline::{Pipeline, Recognized};
use crate::raw::RawType;

pub fn enum_found(raw: &RawType, _pipeline: &Pipeline, _options: &OptionSet) -> Recognized {
    let RawType::Enum { name, members } = raw else { return Ok(None) };
    Ok(Some(Node::Enum(EnumNode {
        name: name.clone(),
        members: members.clone(),
    })))
}

pub fn literal_found(raw: &RawType, _pipeline: &Pipeline, _options: &OptionSet) -> Recognized {
    let RawType::Literal { values } = raw else { return Ok(None) };
    if values.is_empty() {
        return Err(ExtractError::Arity {
            origin: "typing.Literal".into(),
            expected: "at least 1",
            found: 0,
        });
    }
    Ok(Some(Node::Literal(LiteralNode { values: values.clone() })))
}

pub fn type_var_found(raw: &RawType, pipeline: &Pipeline, options: &OptionSet) -> Recognized {
    let RawType::TypeVar(decl) = raw else { return Ok(None) };
    let bound = match &decl.bound {
        Some(bound) => Some(Box::new(pipeline.normalize(bound, options)?)),
        None => None,
    };
    let constraints = decl
        .constraints
        .iter()
        .map(|c| pipeline.normalize(c, options))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(Node::TypeVar(TypeVarNode {
        name: decl.name.clone(),
        bound,
        constraints,
        original: Arc::downgrade(decl),
    })))
}

pub fn none_found(raw: &RawType, _pipeline: &Pipeline, _options: &OptionSet) -> Recognized {
    Ok(matches!(raw, RawType::None).then_some(Node::None))
}

pub fn builtin_found(raw: &RawType, _pipeline: &Pipeline, _options: &OptionSet) -> Recognized {
    let RawType::Builtin { name } = raw else { return Ok(None) };
    Ok(Some(Node::Builtin(BuiltinNode { name: name.clone() })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::{Scalar, TypeVarDecl};
    use indexmap::IndexMap;

    fn norm(raw: &RawType) -> Node {
        Pipeline::standard().normalize(raw, &OptionSet::default()).unwrap()
    }

    #[test]
    fn enum_members_keep_declaration_order() {
        let members: IndexMap<String, Scalar> = [
            ("RED".to_string(), Scalar::Int(3)),
            ("GREEN".to_string(), Scalar::Int(1)),
        ].into_iter().collect();
        let Node::Enum(e) = norm(&RawType::Enum { name: "c.Color".into(), members }) else { panic!("expected enum") };
        assert_eq!(e.members.keys().collect::<Vec<_>>(), vec!["RED", "GREEN"]);
    }

    #[test]
    fn literal_values_are_kept_verbatim() {
        let raw = RawType::Literal { values: vec![Scalar::Str("r".into()), Scalar::Int(1), Scalar::Bool(false)] };
        assert_eq!(norm(&raw).to_string(), r#"Literal["r", 1, False]"#);
    }

    #[test]
    fn empty_literal_is_malformed() {
        let err = Pipeline::standard()
            .normalize(&RawType::Literal { values: vec![] }, &OptionSet::default())
            .unwrap_err();
        assert!(matches!(err, ExtractError::Arity { .. }));
    }

    #[test]
    fn type_var_keeps_a_weak_back_reference() {
        let decl = Arc::new(TypeVarDecl {
            name: "T".into(),
            bound: Some(Box::new(RawType::builtin("int"))),
            constraints: vec![],
        });
        let raw = RawType::TypeVar(decl.clone());
        let Node::TypeVar(tv) = norm(&raw) else { panic!("expected type var") };
        assert_eq!(tv.bound.as_deref(), Some(&Node::builtin("int")));
        assert!(Arc::ptr_eq(&tv.original().unwrap(), &decl));
        assert_eq!(Arc::strong_count(&decl), 2);
    }

    #[test]
    fn none_and_builtins() {
        assert_eq!(norm(&RawType::None), Node::None);
        assert_eq!(norm(&RawType::builtin("bytes")), Node::builtin("bytes"));
    }
}
