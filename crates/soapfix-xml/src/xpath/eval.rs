use std::collections::HashMap;

use crate::builder::Element;
use crate::xpath::ast::{ArithmeticOp, Axis, CompareOp, Expr, LocationPath, NodeTest, Step};
use crate::xpath::node::{self, NodeId, NodeRef, resolve};
use crate::xpath::{Value, XPathError, functions};

/// Position of the node being evaluated within the current node-set.
#[derive(Debug, Clone)]
pub(crate) struct Context {
    pub node: NodeId,
    pub position: usize,
    pub size: usize,
}

impl Context {
    pub(crate) fn start() -> Self {
        Context {
            node: NodeId::context(),
            position: 1,
            size: 1,
        }
    }
}

pub(crate) struct Evaluator<'a> {
    pub root: &'a Element,
    /// Prefix bindings captured when evaluation started.
    pub namespaces: &'a HashMap<String, String>,
}

impl Evaluator<'_> {
    pub(crate) fn eval(&self, expr: &Expr, context: &Context) -> Result<Value, XPathError> {
        match expr {
            Expr::Or(left, right) => Ok(Value::Boolean(
                self.eval(left, context)?.to_boolean()
                    || self.eval(right, context)?.to_boolean(),
            )),
            Expr::And(left, right) => Ok(Value::Boolean(
                self.eval(left, context)?.to_boolean()
                    && self.eval(right, context)?.to_boolean(),
            )),
            Expr::Compare(op, left, right) => {
                let left = self.eval(left, context)?;
                let right = self.eval(right, context)?;
                Ok(Value::Boolean(self.compare(*op, &left, &right)))
            }
            Expr::Arithmetic(op, left, right) => {
                let left = self.eval(left, context)?.to_number(self.root);
                let right = self.eval(right, context)?.to_number(self.root);
                Ok(Value::Number(match op {
                    ArithmeticOp::Add => left + right,
                    ArithmeticOp::Subtract => left - right,
                    ArithmeticOp::Multiply => left * right,
                    ArithmeticOp::Divide => left / right,
                    ArithmeticOp::Modulo => left % right,
                }))
            }
            Expr::Negate(inner) => Ok(Value::Number(-self.eval(inner, context)?.to_number(self.root))),
            Expr::Union(left, right) => {
                let mut nodes = self.node_set(left, context)?;
                nodes.extend(self.node_set(right, context)?);
                Ok(Value::NodeSet(in_document_order(nodes)))
            }
            Expr::Path(path) => self.location_path(path, context).map(Value::NodeSet),
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                let mut nodes = in_document_order(self.node_set(primary, context)?);
                for predicate in predicates {
                    nodes = self.filter(nodes, predicate)?;
                }
                if !steps.is_empty() {
                    nodes = self.follow_steps(nodes, steps)?;
                }
                Ok(Value::NodeSet(nodes))
            }
            Expr::Literal(value) => Ok(Value::String(value.clone())),
            Expr::Number(value) => Ok(Value::Number(*value)),
            Expr::Function { name, args } => functions::call(self, name, args, context),
        }
    }

    pub(crate) fn node_set(&self, expr: &Expr, context: &Context) -> Result<Vec<NodeId>, XPathError> {
        match self.eval(expr, context)? {
            Value::NodeSet(nodes) => Ok(nodes),
            _ => Err(XPathError::NotANodeSet),
        }
    }

    fn location_path(&self, path: &LocationPath, context: &Context) -> Result<Vec<NodeId>, XPathError> {
        let start = if path.absolute {
            NodeId::root()
        } else {
            context.node.clone()
        };
        self.follow_steps(vec![start], &path.steps)
    }

    fn follow_steps(&self, mut nodes: Vec<NodeId>, steps: &[Step]) -> Result<Vec<NodeId>, XPathError> {
        for step in steps {
            let mut next = Vec::new();
            for node in &nodes {
                next.extend(self.step(node, step)?);
            }
            nodes = in_document_order(next);
        }
        Ok(nodes)
    }

    fn step(&self, from: &NodeId, step: &Step) -> Result<Vec<NodeId>, XPathError> {
        let candidates = match step.axis {
            Axis::Child => node::children(self.root, from),
            Axis::Descendant => {
                let mut out = Vec::new();
                node::descendants(self.root, from, &mut out);
                out
            }
            Axis::DescendantOrSelf => {
                let mut out = vec![from.clone()];
                node::descendants(self.root, from, &mut out);
                out
            }
            Axis::SelfAxis => vec![from.clone()],
            Axis::Parent => from.parent().into_iter().collect(),
            Axis::Ancestor => node::ancestors(from),
            Axis::AncestorOrSelf => {
                let mut out = vec![from.clone()];
                out.extend(node::ancestors(from));
                out
            }
            Axis::FollowingSibling => node::siblings(self.root, from, true),
            Axis::PrecedingSibling => node::siblings(self.root, from, false),
            Axis::Attribute => node::attributes(self.root, from),
        };

        let mut selected: Vec<NodeId> = candidates
            .into_iter()
            .filter(|candidate| self.matches(candidate, step.axis, &step.test))
            .collect();

        // Candidates are already in axis order, which is what predicate
        // positions count in.
        for predicate in &step.predicates {
            selected = self.filter(selected, predicate)?;
        }
        Ok(selected)
    }

    fn filter(&self, nodes: Vec<NodeId>, predicate: &Expr) -> Result<Vec<NodeId>, XPathError> {
        let size = nodes.len();
        let mut kept = Vec::new();
        for (index, node) in nodes.into_iter().enumerate() {
            let context = Context {
                node,
                position: index + 1,
                size,
            };
            let keep = match self.eval(predicate, &context)? {
                #[allow(clippy::cast_precision_loss)]
                Value::Number(n) => (n - context.position as f64).abs() < f64::EPSILON,
                other => other.to_boolean(),
            };
            if keep {
                kept.push(context.node);
            }
        }
        Ok(kept)
    }

    fn matches(&self, id: &NodeId, axis: Axis, test: &NodeTest) -> bool {
        let Some(node) = resolve(self.root, id) else {
            return false;
        };
        let principal = match (axis, node) {
            (Axis::Attribute, NodeRef::Attribute(_)) => true,
            (Axis::Attribute, _) => false,
            (_, NodeRef::Element(_)) => true,
            _ => false,
        };

        match test {
            NodeTest::Node => true,
            NodeTest::Text => matches!(node, NodeRef::Text(_)),
            NodeTest::Comment => matches!(node, NodeRef::Comment(_)),
            NodeTest::ProcessingInstruction => false,
            NodeTest::Wildcard => principal,
            NodeTest::NamespaceWildcard(prefix) => {
                principal && Some(node.namespace_uri()) == self.namespaces.get(prefix).map(String::as_str)
            }
            NodeTest::Name { prefix, local } => {
                if !principal || node.local_name() != local {
                    return false;
                }
                let expected = match prefix {
                    Some(prefix) => self.namespaces.get(prefix).map_or("", String::as_str),
                    None => "",
                };
                node.namespace_uri() == expected
            }
        }
    }

    fn compare(&self, op: CompareOp, left: &Value, right: &Value) -> bool {
        let strings = |nodes: &[NodeId]| -> Vec<Value> {
            nodes
                .iter()
                .map(|id| Value::String(node::string_value(self.root, id)))
                .collect()
        };

        match (left, right) {
            (Value::NodeSet(a), Value::NodeSet(b)) => {
                let b = strings(b);
                strings(a)
                    .iter()
                    .any(|x| b.iter().any(|y| compare_atoms(op, x, y)))
            }
            (Value::NodeSet(a), Value::Boolean(_)) => {
                compare_atoms(op, &Value::Boolean(!a.is_empty()), right)
            }
            (Value::Boolean(_), Value::NodeSet(b)) => {
                compare_atoms(op, left, &Value::Boolean(!b.is_empty()))
            }
            (Value::NodeSet(a), atom) => strings(a).iter().any(|x| compare_atoms(op, x, atom)),
            (atom, Value::NodeSet(b)) => strings(b).iter().any(|y| compare_atoms(op, atom, y)),
            (a, b) => compare_atoms(op, a, b),
        }
    }
}

/// Compares two values that are not node-sets.
fn compare_atoms(op: CompareOp, left: &Value, right: &Value) -> bool {
    match op {
        CompareOp::Eq | CompareOp::NotEq => {
            let equal = match (left, right) {
                (Value::Boolean(_), _) | (_, Value::Boolean(_)) => {
                    left.to_boolean() == right.to_boolean()
                }
                (Value::Number(_), _) | (_, Value::Number(_)) => {
                    #[allow(clippy::float_cmp)]
                    let equal = left.atom_number() == right.atom_number();
                    equal
                }
                _ => left.atom_string() == right.atom_string(),
            };
            equal == (op == CompareOp::Eq)
        }
        CompareOp::Lt => left.atom_number() < right.atom_number(),
        CompareOp::LtEq => left.atom_number() <= right.atom_number(),
        CompareOp::Gt => left.atom_number() > right.atom_number(),
        CompareOp::GtEq => left.atom_number() >= right.atom_number(),
    }
}

pub(crate) fn in_document_order(mut nodes: Vec<NodeId>) -> Vec<NodeId> {
    nodes.sort();
    nodes.dedup();
    nodes
}
