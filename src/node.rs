//! Normalized type-shape IR. No RawType in here.

use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use serde::Serialize;

use crate::options::OptionSet;
use crate::raw::{Scalar, TypeVarDecl};
use crate::registry::CollectedKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Unknown,                 // nothing claimed the raw type
    None,                    // the absence type
    Builtin(BuiltinNode),
    List(ListNode),
    Tuple(TupleNode),
    Dict(DictNode),
    Mapping(MappingNode),
    Union(UnionNode),        // set semantics, see `UnionNode::new`
    Optional(OptionalNode),  // only under `collapse_optional`
    Literal(LiteralNode),
    Enum(EnumNode),
    TypeVar(TypeVarNode),
    Class(ClassNode),
    Record(RecordNode),      // TypedDict-like
    Function(FunctionNode),
    NewType(NewTypeNode),
    FixedGeneric(FixedGenericNode),
    Reference(ReferenceNode), // collected entry still being built (or an alias)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltinNode {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListNode {
    pub element: Box<Node>,
    #[serde(skip_serializing_if = "OptionSet::is_empty")]
    pub options: OptionSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TupleNode {
    pub elements: Vec<Node>,
    pub variadic: bool,      // `Tuple[X, ...]`: exactly one element, repeated
    #[serde(skip_serializing_if = "OptionSet::is_empty")]
    pub options: OptionSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DictNode {
    pub key: Box<Node>,
    pub value: Box<Node>,
    #[serde(skip_serializing_if = "OptionSet::is_empty")]
    pub options: OptionSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingNode {
    pub key: Box<Node>,
    pub value: Box<Node>,
    #[serde(skip_serializing_if = "OptionSet::is_empty")]
    pub options: OptionSet,
}

/// Union with set semantics: flattened, duplicate-free, order-insensitive
/// equality. Members keep first-seen order for rendering only.
#[derive(Debug, Clone, Serialize)]
pub struct UnionNode {
    members: Vec<Node>,
    #[serde(skip_serializing_if = "OptionSet::is_empty")]
    pub options: OptionSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionalNode {
    pub inner: Box<Node>,
    #[serde(skip_serializing_if = "OptionSet::is_empty")]
    pub options: OptionSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiteralNode {
    pub values: Vec<Scalar>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumNode {
    pub name: String,
    pub members: IndexMap<String, Scalar>,
}

/// `original` points back at the host declaration for diagnostics. It never
/// keeps the declaration alive and takes no part in equality or output.
#[derive(Debug, Clone, Serialize)]
pub struct TypeVarNode {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bound: Option<Box<Node>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Node>,
    #[serde(skip)]
    pub original: Weak<TypeVarDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassNode {
    pub name: String,
    pub fields: IndexMap<String, Node>,
    #[serde(skip_serializing_if = "OptionSet::is_empty")]
    pub options: OptionSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordNode {
    pub name: String,
    pub fields: IndexMap<String, Node>,
    pub total: bool,
    #[serde(skip_serializing_if = "OptionSet::is_empty")]
    pub options: OptionSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionNode {
    pub name: String,
    pub params: IndexMap<String, Node>,
    pub returns: Box<Node>,
    #[serde(skip_serializing_if = "OptionSet::is_empty")]
    pub options: OptionSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTypeNode {
    pub name: String,
    pub base: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixedGenericNode {
    pub base: Box<Node>,
    pub bindings: IndexMap<String, Node>, // type parameter name -> bound argument
    #[serde(skip_serializing_if = "OptionSet::is_empty")]
    pub options: OptionSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceNode {
    pub name: String,
    pub target: CollectedKind,
}

// -------------------- union set semantics --------------------

impl UnionNode {
    /// Nested unions are spliced in place and structurally equal members
    /// collapse into the first occurrence.
    pub fn new<I>(members: I, options: OptionSet) -> Self
    where
        I: IntoIterator<Item = Node>,
    {
        let mut out: Vec<Node> = Vec::new();
        for member in members {
            match member {
                Node::Union(inner) => {
                    for m in inner.members {
                        push_unique(&mut out, m);
                    }
                }
                other => push_unique(&mut out, other),
            }
        }
        Self { members: out, options }
    }

    pub fn members(&self) -> &[Node] { &self.members }

    pub fn len(&self) -> usize { self.members.len() }

    pub fn is_empty(&self) -> bool { self.members.is_empty() }

    pub fn contains(&self, node: &Node) -> bool { self.members.contains(node) }

    pub fn into_members(self) -> Vec<Node> { self.members }
}

fn push_unique(out: &mut Vec<Node>, node: Node) {
    if !out.contains(&node) {
        out.push(node);
    }
}

impl PartialEq for UnionNode {
    fn eq(&self, other: &Self) -> bool {
        // both sides are duplicate-free, so equal size + inclusion is set equality
        self.options == other.options
            && self.members.len() == other.members.len()
            && self.members.iter().all(|m| other.members.contains(m))
    }
}

// -------------------- type var back-reference --------------------

impl TypeVarNode {
    /// The host declaration, if the caller still holds it.
    pub fn original(&self) -> Option<Arc<TypeVarDecl>> {
        self.original.upgrade()
    }
}

impl PartialEq for TypeVarNode {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.bound == other.bound
            && self.constraints == other.constraints
    }
}

// -------------------- helpers --------------------

impl Node {
    pub fn builtin(name: impl Into<String>) -> Self {
        Node::Builtin(BuiltinNode { name: name.into() })
    }

    pub fn list(element: Node) -> Self {
        Node::List(ListNode { element: Box::new(element), options: OptionSet::default() })
    }

    pub fn dict(key: Node, value: Node) -> Self {
        Node::Dict(DictNode { key: Box::new(key), value: Box::new(value), options: OptionSet::default() })
    }

    pub fn union<I: IntoIterator<Item = Node>>(members: I) -> Self {
        Node::Union(UnionNode::new(members, OptionSet::default()))
    }

    pub fn reference(name: impl Into<String>, target: CollectedKind) -> Self {
        Node::Reference(ReferenceNode { name: name.into(), target })
    }

    pub fn is_unknown(&self) -> bool { matches!(self, Node::Unknown) }

    /// `None`, `Optional(_)`, or a union with a `None` member.
    pub fn is_nullable(&self) -> bool {
        match self {
            Node::None | Node::Optional(_) => true,
            Node::Union(u) => u.contains(&Node::None),
            _ => false,
        }
    }

    /// Qualified name for nodes that live in the collected-type registry.
    pub fn collected_name(&self) -> Option<&str> {
        match self {
            Node::Class(c) => Some(c.name.as_str()),
            Node::Record(r) => Some(r.name.as_str()),
            Node::Function(f) => Some(f.name.as_str()),
            Node::Reference(r) => Some(r.name.as_str()),
            _ => None,
        }
    }
}

// -------------------- rendering --------------------

/// Renders a host-like type expression, e.g. `Dict[str, List[int]]`.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Unknown => f.write_str("Unknown"),
            Node::None => f.write_str("None"),
            Node::Builtin(b) => f.write_str(&b.name),
            Node::List(l) => write!(f, "List[{}]", l.element),
            Node::Tuple(t) if t.variadic => {
                write!(f, "Tuple[")?;
                write_joined(f, &t.elements)?;
                write!(f, ", ...]")
            }
            Node::Tuple(t) if t.elements.is_empty() => f.write_str("Tuple[()]"),
            Node::Tuple(t) => {
                write!(f, "Tuple[")?;
                write_joined(f, &t.elements)?;
                write!(f, "]")
            }
            Node::Dict(d) => write!(f, "Dict[{}, {}]", d.key, d.value),
            Node::Mapping(m) => write!(f, "Mapping[{}, {}]", m.key, m.value),
            Node::Union(u) => {
                write!(f, "Union[")?;
                write_joined(f, u.members())?;
                write!(f, "]")
            }
            Node::Optional(o) => write!(f, "Optional[{}]", o.inner),
            Node::Literal(l) => {
                write!(f, "Literal[")?;
                for (i, v) in l.values.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Node::Enum(e) => f.write_str(&e.name),
            Node::TypeVar(t) => write!(f, "~{}", t.name),
            Node::Class(c) => f.write_str(&c.name),
            Node::Record(r) => f.write_str(&r.name),
            Node::Function(func) => {
                write!(f, "{}(", func.name)?;
                for (i, (name, ty)) in func.params.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{name}: {ty}")?;
                }
                write!(f, ") -> {}", func.returns)
            }
            Node::NewType(n) => f.write_str(&n.name),
            Node::FixedGeneric(g) => {
                write!(f, "{}[", g.base)?;
                for (i, ty) in g.bindings.values().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{ty}")?;
                }
                write!(f, "]")
            }
            Node::Reference(r) => f.write_str(&r.name),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, nodes: &[Node]) -> fmt::Result {
    for (i, n) in nodes.iter().enumerate() {
        if i > 0 { f.write_str(", ")?; }
        write!(f, "{n}")?;
    }
    Ok(())
}
