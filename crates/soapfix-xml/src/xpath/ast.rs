#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    Arithmetic(ArithmeticOp, Box<Expr>, Box<Expr>),
    Negate(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Path(LocationPath),
    /// A primary expression with predicates, optionally continued by a
    /// relative location path (`(//a)[1]/b`).
    Filter {
        primary: Box<Expr>,
        predicates: Vec<Expr>,
        steps: Vec<Step>,
    },
    Literal(String),
    Number(f64),
    Function {
        name: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    /// The `descendant-or-self::node()` step that `//` abbreviates.
    pub(crate) fn descendant_or_self() -> Self {
        Step {
            axis: Axis::DescendantOrSelf,
            test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    SelfAxis,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Attribute,
}

impl Axis {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "self" => Axis::SelfAxis,
            "parent" => Axis::Parent,
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            "attribute" => Axis::Attribute,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// `node()`
    Node,
    /// `text()`
    Text,
    /// `comment()`
    Comment,
    /// `processing-instruction()`; never matches, instructions are not kept.
    ProcessingInstruction,
    /// `*`
    Wildcard,
    /// `prefix:*`
    NamespaceWildcard(String),
    Name {
        prefix: Option<String>,
        local: String,
    },
}

impl Expr {
    /// Every namespace prefix the expression refers to.
    pub(crate) fn collect_prefixes<'e>(&'e self, out: &mut Vec<&'e str>) {
        match self {
            Expr::Or(left, right)
            | Expr::And(left, right)
            | Expr::Compare(_, left, right)
            | Expr::Arithmetic(_, left, right)
            | Expr::Union(left, right) => {
                left.collect_prefixes(out);
                right.collect_prefixes(out);
            }
            Expr::Negate(inner) => inner.collect_prefixes(out),
            Expr::Path(path) => {
                for step in &path.steps {
                    step.collect_prefixes(out);
                }
            }
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                primary.collect_prefixes(out);
                for predicate in predicates {
                    predicate.collect_prefixes(out);
                }
                for step in steps {
                    step.collect_prefixes(out);
                }
            }
            Expr::Function { args, .. } => {
                for arg in args {
                    arg.collect_prefixes(out);
                }
            }
            Expr::Literal(_) | Expr::Number(_) => {}
        }
    }
}

impl Step {
    fn collect_prefixes<'e>(&'e self, out: &mut Vec<&'e str>) {
        match &self.test {
            NodeTest::NamespaceWildcard(prefix)
            | NodeTest::Name {
                prefix: Some(prefix),
                ..
            } => out.push(prefix),
            _ => {}
        }
        for predicate in &self.predicates {
            predicate.collect_prefixes(out);
        }
    }
}
