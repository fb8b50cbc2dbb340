//! Nominal shapes: classes, typed dicts, references to them, user generics
//! bound to arguments, and `NewType`s.
//!
//! Classes and typed dicts go through [`Pipeline::collect`], so a field that
//! cycles back to its owner becomes a `Reference` instead of recursing.

use indexmap::IndexMap;
use tracing::debug;

use crate::error::ExtractError;
use crate::node::{ClassNode, FixedGenericNode, NewTypeNode, Node, RecordNode};
use crate::options::{ExtractOption, OptionSet};
use crate::pipeline::{Pipeline, Recognized};
use crate::raw::RawType;
use crate::registry::CollectedKind;

pub fn class_found(raw: &RawType, pipeline: &Pipeline, options: &OptionSet) -> Recognized {
    let RawType::Class(decl) = raw else { return Ok(None) };
    let node = pipeline.collect(CollectedKind::Class, &decl.name, raw, || {
        Ok(Node::Class(ClassNode {
            name: decl.name.clone(),
            fields: fields_to_nodes(&decl.fields, pipeline, options)?,
            options: options.clone(),
        }))
    })?;
    Ok(Some(node))
}

pub fn typed_dict_found(raw: &RawType, pipeline: &Pipeline, options: &OptionSet) -> Recognized {
    let RawType::TypedDict(decl) = raw else { return Ok(None) };
    let node = pipeline.collect(CollectedKind::Record, &decl.name, raw, || {
        Ok(Node::Record(RecordNode {
            name: decl.name.clone(),
            fields: fields_to_nodes(&decl.fields, pipeline, options)?,
            total: decl.total,
            options: options.clone(),
        }))
    })?;
    Ok(Some(node))
}

/// Resolves a `Ref` handle against the pipeline's definitions, falling back
/// to whatever the registry already holds under that name.
///
/// Definitions always go through the registry's claim, so a name collected
/// from a different descriptor is reported as a conflict. Definitions that do
/// not register themselves are collected as aliases so a recursive alias still
/// terminates. Unresolvable names decline.
pub fn reference_found(raw: &RawType, pipeline: &Pipeline, options: &OptionSet) -> Recognized {
    let RawType::Ref { name } = raw else { return Ok(None) };
    let Some(definition) = pipeline.definition(name) else {
        if let Some(node) = pipeline.lookup(&CollectedKind::ALL, name) {
            return Ok(Some(node));
        }
        debug!(name = %name, "unresolved reference");
        return Ok(None);
    };
    let node = match definition {
        RawType::Class(_) | RawType::TypedDict(_) | RawType::Function(_) => {
            pipeline.normalize(definition, options)?
        }
        _ => pipeline.collect(CollectedKind::Alias, name, definition, || {
            pipeline.normalize(definition, options)
        })?,
    };
    Ok(Some(node))
}

/// `Base[int, str]` for a user generic `Base` declaring type parameters.
/// Arguments bind to the declared parameters by position.
pub fn fixed_generic_found(raw: &RawType, pipeline: &Pipeline, options: &OptionSet) -> Recognized {
    let RawType::Parameterized { base, args } = raw else { return Ok(None) };
    let params = declared_type_params(base, pipeline);
    if !params.is_empty() && params.len() != args.len() {
        return Err(ExtractError::TypeParams {
            base: base.label(),
            declared: params.len(),
            found: args.len(),
        });
    }
    let base_node = pipeline.normalize(base, options)?;
    let mut bindings = IndexMap::with_capacity(args.len());
    for (i, arg) in args.iter().enumerate() {
        let key = params.get(i).cloned().unwrap_or_else(|| i.to_string());
        bindings.insert(key, pipeline.normalize(arg, options)?);
    }
    Ok(Some(Node::FixedGeneric(FixedGenericNode {
        base: Box::new(base_node),
        bindings,
        options: options.clone(),
    })))
}

pub fn new_type_found(raw: &RawType, pipeline: &Pipeline, options: &OptionSet) -> Recognized {
    let RawType::NewType { name, supertype } = raw else { return Ok(None) };
    Ok(Some(Node::NewType(NewTypeNode {
        name: name.clone(),
        base: Box::new(pipeline.normalize(supertype, options)?),
    })))
}

fn fields_to_nodes(
    fields: &IndexMap<String, RawType>,
    pipeline: &Pipeline,
    options: &OptionSet,
) -> Result<IndexMap<String, Node>, ExtractError> {
    let mut out = IndexMap::with_capacity(fields.len());
    for (name, raw) in fields {
        out.insert(name.clone(), pipeline.normalize(raw, options)?);
    }
    if options.contains(&ExtractOption::SortFields) {
        out.sort_keys();
    }
    Ok(out)
}

fn declared_type_params<'a>(base: &'a RawType, pipeline: &'a Pipeline) -> &'a [String] {
    match base {
        RawType::Class(decl) => &decl.type_params,
        RawType::Ref { name } => match pipeline.definition(name) {
            Some(RawType::Class(decl)) => &decl.type_params,
            _ => &[],
        },
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::{ClassDecl, TypedDictDecl};

    fn int() -> RawType { RawType::builtin("int") }
    fn str_() -> RawType { RawType::builtin("str") }

    fn defs(items: Vec<(&str, RawType)>) -> IndexMap<String, RawType> {
        items.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn class_fields_keep_declaration_order() {
        let raw = RawType::class("m.User", [("name", str_()), ("age", int())]);
        let Node::Class(c) = Pipeline::standard().normalize(&raw, &OptionSet::default()).unwrap() else {
            panic!("expected class")
        };
        assert_eq!(c.fields.keys().collect::<Vec<_>>(), vec!["name", "age"]);
    }

    #[test]
    fn sort_fields_orders_by_name_and_is_recorded() {
        let options = OptionSet::default().with(ExtractOption::SortFields);
        let raw = RawType::class("m.User", [("name", str_()), ("age", int())]);
        let Node::Class(c) = Pipeline::standard().normalize(&raw, &options).unwrap() else {
            panic!("expected class")
        };
        assert_eq!(c.fields.keys().collect::<Vec<_>>(), vec!["age", "name"]);
        assert_eq!(c.options, options);
    }

    #[test]
    fn typed_dict_becomes_a_record() {
        let raw = RawType::TypedDict(TypedDictDecl {
            name: "m.Movie".into(),
            fields: [("title".to_string(), str_())].into_iter().collect(),
            total: false,
        });
        let pipeline = Pipeline::standard();
        let node = pipeline.normalize(&raw, &OptionSet::default()).unwrap();
        let Node::Record(r) = &node else { panic!("expected record") };
        assert!(!r.total);
        assert_eq!(pipeline.catalog().records.get("m.Movie"), Some(&node));
    }

    #[test]
    fn repeated_class_is_served_from_the_registry() {
        let point = RawType::class("g.Point", [("x", int())]);
        let line = RawType::class("g.Line", [("a", point.clone()), ("b", point)]);
        let pipeline = Pipeline::standard();
        let Node::Class(c) = pipeline.normalize(&line, &OptionSet::default()).unwrap() else {
            panic!("expected class")
        };
        assert_eq!(c.fields["a"], c.fields["b"]);
        assert!(matches!(c.fields["b"], Node::Class(_)));
        assert_eq!(pipeline.catalog().classes.len(), 2);
    }

    #[test]
    fn same_name_different_definition_is_a_conflict() {
        let a = RawType::class("g.Point", [("x", int())]);
        let b = RawType::class("g.Point", [("y", int())]);
        let pipeline = Pipeline::standard();
        pipeline.normalize(&a, &OptionSet::default()).unwrap();
        let err = pipeline.normalize(&b, &OptionSet::default()).unwrap_err();
        assert!(matches!(err, ExtractError::RegistryConflict { .. }));
    }

    #[test]
    fn reference_to_a_differently_collected_name_is_a_conflict() {
        let pipeline = Pipeline::standard()
            .with_definitions(defs(vec![("g.Point", RawType::class("g.Point", [("x", int())]))]));
        pipeline.normalize(&RawType::class("g.Point", [("y", str_())]), &OptionSet::default()).unwrap();
        let err = pipeline.normalize(&RawType::reference("g.Point"), &OptionSet::default()).unwrap_err();
        assert!(matches!(err, ExtractError::RegistryConflict { kind: CollectedKind::Class, .. }));
    }

    #[test]
    fn reference_without_definition_uses_the_registry() {
        let point = RawType::class("g.Point", [("x", int())]);
        let pipeline = Pipeline::standard();
        let collected = pipeline.normalize(&point, &OptionSet::default()).unwrap();
        let node = pipeline.normalize(&RawType::reference("g.Point"), &OptionSet::default()).unwrap();
        assert_eq!(node, collected);
    }

    #[test]
    fn recursive_alias_terminates() {
        // Json = Union[str, int, List[Json], Dict[str, Json]]
        let json = RawType::union(vec![
            str_(),
            int(),
            RawType::generic("list", vec![RawType::reference("j.Json")]),
            RawType::generic("dict", vec![str_(), RawType::reference("j.Json")]),
        ]);
        let pipeline = Pipeline::standard().with_definitions(defs(vec![("j.Json", json)]));
        let node = pipeline.normalize(&RawType::reference("j.Json"), &OptionSet::default()).unwrap();
        let alias_ref = Node::reference("j.Json", CollectedKind::Alias);
        assert_eq!(node, Node::union([
            Node::builtin("str"),
            Node::builtin("int"),
            Node::list(alias_ref.clone()),
            Node::dict(Node::builtin("str"), alias_ref),
        ]));
        assert_eq!(pipeline.catalog().aliases.get("j.Json"), Some(&node));
    }

    #[test]
    fn fixed_generic_binds_declared_params() {
        let boxed = RawType::Class(ClassDecl {
            name: "b.Box".into(),
            fields: [("item".to_string(), RawType::reference("T"))].into_iter().collect(),
            type_params: vec!["T".into()],
        });
        let pipeline = Pipeline::standard().with_definitions(defs(vec![("b.Box", boxed)]));
        let raw = RawType::Parameterized { base: Box::new(RawType::reference("b.Box")), args: vec![int()] };
        let node = pipeline.normalize(&raw, &OptionSet::default()).unwrap();
        let Node::FixedGeneric(g) = &node else { panic!("expected fixed generic") };
        assert_eq!(g.bindings.keys().collect::<Vec<_>>(), vec!["T"]);
        assert_eq!(node.to_string(), "b.Box[int]");
    }

    #[test]
    fn fixed_generic_arity_mismatch_is_fatal() {
        let boxed = RawType::Class(ClassDecl {
            name: "b.Pair".into(),
            fields: IndexMap::new(),
            type_params: vec!["K".into(), "V".into()],
        });
        let raw = RawType::Parameterized { base: Box::new(boxed), args: vec![int()] };
        let err = Pipeline::standard().normalize(&raw, &OptionSet::default()).unwrap_err();
        assert_eq!(err, ExtractError::TypeParams { base: "class b.Pair".into(), declared: 2, found: 1 });
    }

    #[test]
    fn new_type_wraps_its_supertype() {
        let raw = RawType::NewType { name: "u.UserId".into(), supertype: Box::new(int()) };
        let Node::NewType(n) = Pipeline::standard().normalize(&raw, &OptionSet::default()).unwrap() else {
            panic!("expected new type")
        };
        assert_eq!(*n.base, Node::builtin("int"));
    }
}
