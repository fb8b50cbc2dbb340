use crate::error::ExtractError;
use crate::node::{Node, OptionalNode, UnionNode};
use crate::options::{ExtractOption, OptionSet};
use crate::pipeline::{Pipeline, Recognized};
use crate::raw::RawType;

/// `Union[...]`, including `Optional[X]` which hosts spell as `Union[X, None]`.
///
/// A union that collapses to one member is that member. Under
/// `CollapseOptional`, `{X, None}` becomes `Optional(X)`.
pub fn union_found(raw: &RawType, pipeline: &Pipeline, options: &OptionSet) -> Recognized {
    let RawType::Union { members } = raw else { return Ok(None) };
    if members.is_empty() {
        return Err(ExtractError::Arity {
            origin: "typing.Union".into(),
            expected: "at least 1",
            found: 0,
        });
    }
    let mut nodes = Vec::with_capacity(members.len());
    for member in members {
        // a nested union may already have collapsed; reopen it so it splices
        match pipeline.normalize(member, options)? {
            Node::Optional(OptionalNode { inner, .. }) => {
                nodes.push(*inner);
                nodes.push(Node::None);
            }
            other => nodes.push(other),
        }
    }
    let union = UnionNode::new(nodes, options.clone());

    if union.len() == 1 {
        return Ok(union.into_members().pop());
    }
    if options.contains(&ExtractOption::CollapseOptional) && union.len() == 2 && union.contains(&Node::None) {
        let inner = union.into_members().into_iter().find(|n| *n != Node::None);
        return Ok(inner.map(|inner| {
            Node::Optional(OptionalNode { inner: Box::new(inner), options: options.clone() })
        }));
    }
    Ok(Some(Node::Union(union)))
}
