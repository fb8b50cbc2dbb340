//! Builtin generic aliases: list-likes, dicts, tuples, mappings.

use crate::error::ExtractError;
use crate::node::{DictNode, ListNode, MappingNode, Node, TupleNode};
use crate::options::OptionSet;
use crate::pipeline::{Pipeline, Recognized};
use crate::raw::{is_dict_origin, is_list_origin, is_mapping_origin, is_tuple_origin, RawType};

pub fn list_found(raw: &RawType, pipeline: &Pipeline, options: &OptionSet) -> Recognized {
    let RawType::Generic { origin, args } = raw else { return Ok(None) };
    if !is_list_origin(origin) {
        return Ok(None);
    }
    let element = match args.as_slice() {
        [] => Node::Unknown,
        [element] => pipeline.normalize(element, options)?,
        _ => return Err(arity(origin, "1", args.len())),
    };
    Ok(Some(Node::List(ListNode {
        element: Box::new(element),
        options: options.clone(),
    })))
}

pub fn dict_found(raw: &RawType, pipeline: &Pipeline, options: &OptionSet) -> Recognized {
    let RawType::Generic { origin, args } = raw else { return Ok(None) };
    if !is_dict_origin(origin) {
        return Ok(None);
    }
    let (key, value) = key_value(origin, args, pipeline, options)?;
    Ok(Some(Node::Dict(DictNode {
        key: Box::new(key),
        value: Box::new(value),
        options: options.clone(),
    })))
}

pub fn mapping_found(raw: &RawType, pipeline: &Pipeline, options: &OptionSet) -> Recognized {
    let RawType::Generic { origin, args } = raw else { return Ok(None) };
    if !is_mapping_origin(origin) {
        return Ok(None);
    }
    let (key, value) = key_value(origin, args, pipeline, options)?;
    Ok(Some(Node::Mapping(MappingNode {
        key: Box::new(key),
        value: Box::new(value),
        options: options.clone(),
    })))
}

/// `Tuple[A, B]` keeps positions; `Tuple[X, ...]` is variadic over `X`.
pub fn tuple_found(raw: &RawType, pipeline: &Pipeline, options: &OptionSet) -> Recognized {
    let RawType::Generic { origin, args } = raw else { return Ok(None) };
    if !is_tuple_origin(origin) {
        return Ok(None);
    }
    let variadic = matches!(args.as_slice(), [_, RawType::Ellipsis]);
    let positional = if variadic { &args[..1] } else { &args[..] };
    if positional.iter().any(|a| matches!(a, RawType::Ellipsis)) {
        return Err(ExtractError::MisplacedEllipsis { origin: origin.clone() });
    }
    let elements = positional
        .iter()
        .map(|a| pipeline.normalize(a, options))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(Node::Tuple(TupleNode {
        elements,
        variadic,
        options: options.clone(),
    })))
}

fn key_value(
    origin: &str,
    args: &[RawType],
    pipeline: &Pipeline,
    options: &OptionSet,
) -> Result<(Node, Node), ExtractError> {
    match args {
        [] => Ok((Node::Unknown, Node::Unknown)),
        [key, value] => Ok((pipeline.normalize(key, options)?, pipeline.normalize(value, options)?)),
        _ => Err(arity(origin, "2", args.len())),
    }
}

fn arity(origin: &str, expected: &'static str, found: usize) -> ExtractError {
    ExtractError::Arity { origin: origin.to_string(), expected, found }
}
