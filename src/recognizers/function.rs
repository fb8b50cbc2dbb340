use crate::node::{FunctionNode, Node};
use crate::options::OptionSet;
use crate::pipeline::{Pipeline, Recognized};
use crate::raw::{RawType, RETURN_KEY};
use crate::registry::CollectedKind;

/// Callables, collected by qualified name. Parameters follow
/// `param_names`; a missing return annotation normalizes like any other
/// missing annotation.
pub fn function_found(raw: &RawType, pipeline: &Pipeline, options: &OptionSet) -> Recognized {
    let RawType::Function(decl) = raw else { return Ok(None) };
    let node = pipeline.collect(CollectedKind::Function, &decl.name, raw, || {
        let params = pipeline.params_to_nodes(&decl.annotations, &decl.param_names, options)?;
        let returns = decl.annotations.get(RETURN_KEY).unwrap_or(&RawType::Empty);
        Ok(Node::Function(FunctionNode {
            name: decl.name.clone(),
            params,
            returns: Box::new(pipeline.normalize(returns, options)?),
            options: options.clone(),
        }))
    })?;
    Ok(Some(node))
}
