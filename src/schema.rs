// ————————————————————————————————————————————————————————————————————————————
// JSON SCHEMA CG
// ————————————————————————————————————————————————————————————————————————————

//! Build a JSON Schema (draft-ish) from normalized nodes.
//!
//! Collected shapes (classes, records, aliases) are emitted once under
//! `$defs` and referenced with `$ref`, which is what keeps recursive shapes
//! finite on the schema side too.

use serde_json::{json, Map, Value};

use crate::node::Node;
use crate::registry::{Catalog, CollectedKind};

/// Schema for `root` plus `$defs` for every collected class, record and alias.
pub fn document_schema(root: &Node, catalog: &Catalog) -> Value {
    let mut schema = schema_from_node(root);
    let mut defs = Map::new();
    for kind in [CollectedKind::Class, CollectedKind::Record, CollectedKind::Alias] {
        let table = match kind {
            CollectedKind::Class => &catalog.classes,
            CollectedKind::Record => &catalog.records,
            _ => &catalog.aliases,
        };
        for (name, node) in table {
            defs.insert(name.clone(), definition_body(node));
        }
    }
    if !defs.is_empty() {
        if let Value::Object(map) = &mut schema {
            map.insert("$defs".into(), Value::Object(defs));
        } else {
            schema = json!({ "allOf": [schema], "$defs": defs });
        }
    }
    schema
}

/// Schema for a node in field/argument position. Collected shapes become `$ref`s.
pub fn schema_from_node(n: &Node) -> Value {
    fn nullable(inner: Value) -> Value {
        json!({ "oneOf": [inner, { "type": "null" }] })
    }

    match n {
        Node::Unknown => json!({}),
        Node::None => json!({ "type": "null" }),
        Node::Builtin(b) => builtin_schema(&b.name),

        Node::List(l) => json!({
            "type": "array",
            "items": schema_from_node(&l.element),
        }),

        Node::Tuple(t) if t.variadic => json!({
            "type": "array",
            "items": t.elements.first().map(schema_from_node).unwrap_or_else(|| json!({})),
        }),

        Node::Tuple(t) => json!({
            "type": "array",
            "prefixItems": t.elements.iter().map(schema_from_node).collect::<Vec<_>>(),
            "minItems": t.elements.len(),
            "maxItems": t.elements.len()
        }),

        Node::Dict(d) => map_schema(&d.value),
        Node::Mapping(m) => map_schema(&m.value),

        Node::Union(u) => {
            // Emit oneOf over child schemas; `null` rides along as its own arm.
            json!({ "oneOf": u.members().iter().map(schema_from_node).collect::<Vec<_>>() })
        }

        Node::Optional(o) => nullable(schema_from_node(&o.inner)),

        Node::Literal(l) => json!({
            "enum": l.values.iter().map(scalar_value).collect::<Vec<_>>()
        }),

        Node::Enum(e) => json!({
            "title": e.name,
            "enum": e.members.values().map(scalar_value).collect::<Vec<_>>()
        }),

        Node::TypeVar(t) => {
            if let Some(bound) = &t.bound {
                schema_from_node(bound)
            } else if !t.constraints.is_empty() {
                json!({ "oneOf": t.constraints.iter().map(schema_from_node).collect::<Vec<_>>() })
            } else {
                json!({})
            }
        }

        Node::Class(c) => ref_to(&c.name),
        Node::Record(r) => ref_to(&r.name),
        Node::Reference(r) => match r.target {
            CollectedKind::Function => json!({ "title": r.name }),
            _ => ref_to(&r.name),
        },

        Node::Function(f) => {
            // argument object; the return type has no schema position
            let props = f.params.iter()
                .map(|(k, v)| (k.clone(), schema_from_node(v)))
                .collect::<Map<_, _>>();
            let required = f.params.iter()
                .filter(|(_, v)| !v.is_nullable())
                .map(|(k, _)| Value::from(k.clone()))
                .collect::<Vec<_>>();
            object_of(Some(&f.name), props, required)
        }

        Node::NewType(n) => {
            let mut o = schema_from_node(&n.base);
            if let Value::Object(map) = &mut o {
                map.insert("title".into(), Value::from(n.name.clone()));
            }
            o
        }

        Node::FixedGeneric(g) => schema_from_node(&g.base),
    }
}

/// Full object body for a collected shape, as stored under `$defs`.
fn definition_body(n: &Node) -> Value {
    match n {
        Node::Class(c) => {
            // "required" means the field cannot hold None
            let props = c.fields.iter()
                .map(|(k, v)| (k.clone(), schema_from_node(v)))
                .collect::<Map<_, _>>();
            let required = c.fields.iter()
                .filter(|(_, v)| !v.is_nullable())
                .map(|(k, _)| Value::from(k.clone()))
                .collect::<Vec<_>>();
            object_of(Some(&c.name), props, required)
        }
        Node::Record(r) => {
            // TypedDict totality decides presence, not nullability
            let props = r.fields.iter()
                .map(|(k, v)| (k.clone(), schema_from_node(v)))
                .collect::<Map<_, _>>();
            let required = if r.total {
                r.fields.keys().cloned().map(Value::from).collect()
            } else {
                Vec::new()
            };
            object_of(Some(&r.name), props, required)
        }
        other => schema_from_node(other),
    }
}

fn object_of(title: Option<&str>, props: Map<String, Value>, required: Vec<Value>) -> Value {
    let mut map = Map::new();
    map.insert("type".into(), Value::from("object"));
    if let Some(title) = title {
        map.insert("title".into(), Value::from(title));
    }
    map.insert("properties".into(), Value::Object(props));
    if !required.is_empty() {
        map.insert("required".into(), Value::Array(required));
    }
    Value::Object(map)
}

fn map_schema(value: &Node) -> Value {
    json!({ "type": "object", "additionalProperties": schema_from_node(value) })
}

fn builtin_schema(name: &str) -> Value {
    match name {
        "int" => json!({ "type": "integer" }),
        "float" => json!({ "type": "number" }),
        "str" => json!({ "type": "string" }),
        "bool" => json!({ "type": "boolean" }),
        "bytes" | "bytearray" => json!({ "type": "string", "contentEncoding": "base64" }),
        "list" | "set" | "frozenset" | "tuple" => json!({ "type": "array" }),
        "dict" => json!({ "type": "object" }),
        other => json!({ "title": other }),
    }
}

fn scalar_value(s: &crate::raw::Scalar) -> Value {
    serde_json::to_value(s).unwrap_or(Value::Null)
}

fn ref_to(name: &str) -> Value {
    json!({ "$ref": format!("#/$defs/{}", escape_pointer(name)) })
}

// RFC 6901 token escaping
fn escape_pointer(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}
