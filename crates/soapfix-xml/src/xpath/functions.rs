//! XPath 1.0 core function library.
use crate::xpath::ast::Expr;
use crate::xpath::eval::{Context, Evaluator, in_document_order};
use crate::xpath::node::{self, resolve};
use crate::xpath::{Value, XPathError};

pub(crate) fn call(
    evaluator: &Evaluator<'_>,
    name: &str,
    args: &[Expr],
    context: &Context,
) -> Result<Value, XPathError> {
    let root = evaluator.root;
    let arity = |min: usize, max: Option<usize>| -> Result<(), XPathError> {
        let fits = args.len() >= min && max.is_none_or(|max| args.len() <= max);
        if fits {
            Ok(())
        } else {
            Err(XPathError::ArgumentCount {
                function: name.to_owned(),
                found: args.len(),
            })
        }
    };
    let string_arg = |index: usize| -> Result<String, XPathError> {
        Ok(evaluator.eval(&args[index], context)?.to_xpath_string(root))
    };
    let number_arg = |index: usize| -> Result<f64, XPathError> {
        Ok(evaluator.eval(&args[index], context)?.to_number(root))
    };
    // Defaults to the context node when the argument is omitted.
    let string_or_context = || -> Result<String, XPathError> {
        if args.is_empty() {
            Ok(node::string_value(root, &context.node))
        } else {
            string_arg(0)
        }
    };
    let first_node_or_context = || -> Result<Option<node::NodeId>, XPathError> {
        if args.is_empty() {
            return Ok(Some(context.node.clone()));
        }
        let nodes = in_document_order(evaluator.node_set(&args[0], context)?);
        Ok(nodes.into_iter().next())
    };

    #[allow(clippy::cast_precision_loss)]
    let value = match name {
        "last" => {
            arity(0, Some(0))?;
            Value::Number(context.size as f64)
        }
        "position" => {
            arity(0, Some(0))?;
            Value::Number(context.position as f64)
        }
        "count" => {
            arity(1, Some(1))?;
            Value::Number(evaluator.node_set(&args[0], context)?.len() as f64)
        }
        "name" | "local-name" | "namespace-uri" => {
            arity(0, Some(1))?;
            let node = first_node_or_context()?.and_then(|id| resolve(root, &id));
            Value::String(node.map_or_else(String::new, |node| match name {
                "name" => node.qualified_name(),
                "local-name" => node.local_name().to_owned(),
                _ => node.namespace_uri().to_owned(),
            }))
        }
        "string" => {
            arity(0, Some(1))?;
            Value::String(string_or_context()?)
        }
        "concat" => {
            arity(2, None)?;
            let mut out = String::new();
            for index in 0..args.len() {
                out.push_str(&string_arg(index)?);
            }
            Value::String(out)
        }
        "starts-with" => {
            arity(2, Some(2))?;
            Value::Boolean(string_arg(0)?.starts_with(&string_arg(1)?))
        }
        "contains" => {
            arity(2, Some(2))?;
            Value::Boolean(string_arg(0)?.contains(&string_arg(1)?))
        }
        "substring-before" => {
            arity(2, Some(2))?;
            let haystack = string_arg(0)?;
            let needle = string_arg(1)?;
            Value::String(
                haystack
                    .find(&needle)
                    .map_or_else(String::new, |at| haystack[..at].to_owned()),
            )
        }
        "substring-after" => {
            arity(2, Some(2))?;
            let haystack = string_arg(0)?;
            let needle = string_arg(1)?;
            Value::String(
                haystack
                    .find(&needle)
                    .map_or_else(String::new, |at| haystack[at + needle.len()..].to_owned()),
            )
        }
        "substring" => {
            arity(2, Some(3))?;
            let text = string_arg(0)?;
            let start = round(number_arg(1)?);
            let end = if args.len() == 3 {
                start + round(number_arg(2)?)
            } else {
                f64::INFINITY
            };
            Value::String(
                text.chars()
                    .enumerate()
                    .filter(|(index, _)| {
                        let position = (*index + 1) as f64;
                        position >= start && position < end
                    })
                    .map(|(_, c)| c)
                    .collect(),
            )
        }
        "string-length" => {
            arity(0, Some(1))?;
            Value::Number(string_or_context()?.chars().count() as f64)
        }
        "normalize-space" => {
            arity(0, Some(1))?;
            Value::String(
                string_or_context()?
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" "),
            )
        }
        "translate" => {
            arity(3, Some(3))?;
            let from: Vec<char> = string_arg(1)?.chars().collect();
            let to: Vec<char> = string_arg(2)?.chars().collect();
            Value::String(
                string_arg(0)?
                    .chars()
                    .filter_map(|c| match from.iter().position(|f| *f == c) {
                        Some(index) => to.get(index).copied(),
                        None => Some(c),
                    })
                    .collect(),
            )
        }
        "boolean" => {
            arity(1, Some(1))?;
            Value::Boolean(evaluator.eval(&args[0], context)?.to_boolean())
        }
        "not" => {
            arity(1, Some(1))?;
            Value::Boolean(!evaluator.eval(&args[0], context)?.to_boolean())
        }
        "true" => {
            arity(0, Some(0))?;
            Value::Boolean(true)
        }
        "false" => {
            arity(0, Some(0))?;
            Value::Boolean(false)
        }
        "number" => {
            arity(0, Some(1))?;
            if args.is_empty() {
                Value::Number(Value::String(node::string_value(root, &context.node)).to_number(root))
            } else {
                Value::Number(number_arg(0)?)
            }
        }
        "sum" => {
            arity(1, Some(1))?;
            let total = evaluator
                .node_set(&args[0], context)?
                .iter()
                .map(|id| Value::String(node::string_value(root, id)).to_number(root))
                .sum();
            Value::Number(total)
        }
        "floor" => {
            arity(1, Some(1))?;
            Value::Number(number_arg(0)?.floor())
        }
        "ceiling" => {
            arity(1, Some(1))?;
            Value::Number(number_arg(0)?.ceil())
        }
        "round" => {
            arity(1, Some(1))?;
            Value::Number(round(number_arg(0)?))
        }
        other => return Err(XPathError::UnknownFunction(other.to_owned())),
    };
    Ok(value)
}

/// Rounds half up, towards positive infinity.
fn round(value: f64) -> f64 {
    if value.is_nan() || value.is_infinite() {
        value
    } else {
        (value + 0.5).floor()
    }
}
