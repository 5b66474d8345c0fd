//! Expression evaluation over a [`Document`].

use crate::document::{Document, NodeId, NodeKind};
use crate::error::{XmlError, XmlResult};
use crate::item::{Item, format_number};

use super::parser::{Axis, CompareOp, Expr, Function, NodeTest, Step};

/// A member of a node-set: a tree node or the n-th attribute of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum XNode {
    Node(NodeId),
    Attr(NodeId, usize),
}

#[derive(Debug, Clone)]
pub(crate) enum Value {
    Nodes(Vec<XNode>),
    Str(String),
    Num(f64),
    Bool(bool),
}

#[derive(Debug, Clone, Copy)]
struct Context {
    node: XNode,
    position: usize,
    size: usize,
}

pub(crate) struct Evaluator<'d> {
    doc: &'d Document,
    order: Vec<usize>,
    expression: &'d str,
}

impl<'d> Evaluator<'d> {
    pub(crate) fn new(doc: &'d Document, expression: &'d str) -> Self {
        Self {
            doc,
            order: doc.document_order(),
            expression,
        }
    }

    pub(crate) fn run(&self, expr: &Expr, context: NodeId) -> XmlResult<Vec<Item>> {
        let ctx = Context {
            node: XNode::Node(context),
            position: 1,
            size: 1,
        };
        Ok(match self.eval(expr, ctx)? {
            Value::Nodes(nodes) => nodes.into_iter().map(|n| self.to_item(n)).collect(),
            Value::Str(s) => vec![Item::String(s)],
            Value::Num(n) => vec![Item::Number(n)],
            Value::Bool(b) => vec![Item::Boolean(b)],
        })
    }

    fn to_item(&self, node: XNode) -> Item {
        match node {
            XNode::Attr(owner, index) => {
                let attr = &self.doc.attributes(owner)[index];
                Item::Attribute {
                    name: attr.name.qualified(),
                    value: attr.value.clone(),
                }
            }
            XNode::Node(id) => match self.doc.kind(id) {
                Some(NodeKind::Text(text) | NodeKind::Comment(text)) => Item::Text(text.clone()),
                _ => Item::Element(id),
            },
        }
    }

    fn type_error(&self, message: &str) -> XmlError {
        XmlError::XPathSyntax {
            expression: self.expression.to_string(),
            message: message.to_string(),
        }
    }

    fn eval(&self, expr: &Expr, ctx: Context) -> XmlResult<Value> {
        match expr {
            Expr::Literal(s) => Ok(Value::Str(s.clone())),
            Expr::Number(n) => Ok(Value::Num(*n)),
            Expr::Or(a, b) => Ok(Value::Bool(
                self.boolean(&self.eval(a, ctx)?) || self.boolean(&self.eval(b, ctx)?),
            )),
            Expr::And(a, b) => Ok(Value::Bool(
                self.boolean(&self.eval(a, ctx)?) && self.boolean(&self.eval(b, ctx)?),
            )),
            Expr::Negate(inner) => Ok(Value::Num(-self.number(&self.eval(inner, ctx)?))),
            Expr::Compare(op, a, b) => {
                let left = self.eval(a, ctx)?;
                let right = self.eval(b, ctx)?;
                Ok(Value::Bool(self.compare(*op, &left, &right)))
            }
            Expr::Union(a, b) => {
                let (Value::Nodes(mut left), Value::Nodes(right)) =
                    (self.eval(a, ctx)?, self.eval(b, ctx)?)
                else {
                    return Err(self.type_error("union operands must be node-sets"));
                };
                left.extend(right);
                Ok(Value::Nodes(self.sorted(left)))
            }
            Expr::Path { absolute, steps } => {
                let start = if *absolute {
                    XNode::Node(self.doc.document_node())
                } else {
                    ctx.node
                };
                Ok(Value::Nodes(self.apply_steps(vec![start], steps)?))
            }
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                let Value::Nodes(nodes) = self.eval(primary, ctx)? else {
                    return Err(self.type_error("predicates require a node-set"));
                };
                let mut nodes = self.sorted(nodes);
                for predicate in predicates {
                    nodes = self.filter(nodes, predicate)?;
                }
                Ok(Value::Nodes(self.apply_steps(nodes, steps)?))
            }
            Expr::Call(function, args) => self.call(*function, args, ctx),
        }
    }

    fn apply_steps(&self, mut nodes: Vec<XNode>, steps: &[Step]) -> XmlResult<Vec<XNode>> {
        for step in steps {
            let mut next = Vec::new();
            for &node in &nodes {
                let mut candidates: Vec<XNode> = self
                    .axis(node, step.axis)
                    .into_iter()
                    .filter(|&n| self.matches(n, &step.test))
                    .collect();
                for predicate in &step.predicates {
                    candidates = self.filter(candidates, predicate)?;
                }
                next.extend(candidates);
            }
            nodes = self.sorted(next);
        }
        Ok(nodes)
    }

    fn filter(&self, nodes: Vec<XNode>, predicate: &Expr) -> XmlResult<Vec<XNode>> {
        let size = nodes.len();
        let mut kept = Vec::with_capacity(size);
        for (index, node) in nodes.into_iter().enumerate() {
            let ctx = Context {
                node,
                position: index + 1,
                size,
            };
            let keep = match self.eval(predicate, ctx)? {
                Value::Num(n) => n == (index + 1) as f64,
                other => self.boolean(&other),
            };
            if keep {
                kept.push(node);
            }
        }
        Ok(kept)
    }

    fn axis(&self, node: XNode, axis: Axis) -> Vec<XNode> {
        match (axis, node) {
            (Axis::SelfAxis, _) => vec![node],
            (Axis::Parent, XNode::Attr(owner, _)) => vec![XNode::Node(owner)],
            (Axis::Parent, XNode::Node(id)) => {
                self.doc.parent(id).map(XNode::Node).into_iter().collect()
            }
            (_, XNode::Attr(..)) => Vec::new(),
            (Axis::Child, XNode::Node(id)) => {
                self.doc.children(id).iter().map(|&c| XNode::Node(c)).collect()
            }
            (Axis::Attribute, XNode::Node(id)) => (0..self.doc.attributes(id).len())
                .map(|i| XNode::Attr(id, i))
                .collect(),
            (Axis::Descendant, XNode::Node(id)) => {
                let mut out = Vec::new();
                self.descendants(id, &mut out);
                out
            }
            (Axis::DescendantOrSelf, XNode::Node(id)) => {
                let mut out = vec![node];
                self.descendants(id, &mut out);
                out
            }
        }
    }

    fn descendants(&self, id: NodeId, out: &mut Vec<XNode>) {
        for &child in self.doc.children(id) {
            out.push(XNode::Node(child));
            self.descendants(child, out);
        }
    }

    fn matches(&self, node: XNode, test: &NodeTest) -> bool {
        match node {
            XNode::Attr(owner, index) => {
                let name = &self.doc.attributes(owner)[index].name;
                match test {
                    NodeTest::Node | NodeTest::AnyName => true,
                    NodeTest::Text | NodeTest::Comment => false,
                    NodeTest::NamespaceWildcard(ns) => name.namespace.as_deref() == Some(ns),
                    NodeTest::Name { namespace, local } => {
                        name.namespace == *namespace && name.local == *local
                    }
                }
            }
            // Tree nodes never come from the attribute axis, so the principal
            // node type here is always element.
            XNode::Node(id) => match (test, self.doc.kind(id)) {
                (NodeTest::Node, _) => true,
                (NodeTest::Text, Some(NodeKind::Text(_))) => true,
                (NodeTest::Comment, Some(NodeKind::Comment(_))) => true,
                (NodeTest::AnyName, Some(NodeKind::Element(_))) => true,
                (NodeTest::NamespaceWildcard(ns), Some(NodeKind::Element(data))) => {
                    data.name.namespace.as_deref() == Some(ns)
                }
                (NodeTest::Name { namespace, local }, Some(NodeKind::Element(data))) => {
                    data.name.namespace == *namespace && data.name.local == *local
                }
                _ => false,
            },
        }
    }

    fn order_key(&self, node: XNode) -> (usize, usize) {
        match node {
            XNode::Node(id) => (self.order[id.0], 0),
            XNode::Attr(id, index) => (self.order[id.0], index + 1),
        }
    }

    fn sorted(&self, mut nodes: Vec<XNode>) -> Vec<XNode> {
        nodes.sort_by_key(|&n| self.order_key(n));
        nodes.dedup();
        nodes
    }

    fn node_string(&self, node: XNode) -> String {
        match node {
            XNode::Node(id) => self.doc.string_value(id),
            XNode::Attr(owner, index) => self.doc.attributes(owner)[index].value.clone(),
        }
    }

    fn string(&self, value: &Value) -> String {
        match value {
            Value::Nodes(nodes) => nodes
                .first()
                .map(|&n| self.node_string(n))
                .unwrap_or_default(),
            Value::Str(s) => s.clone(),
            Value::Num(n) => format_number(*n),
            Value::Bool(b) => b.to_string(),
        }
    }

    fn number(&self, value: &Value) -> f64 {
        match value {
            Value::Num(n) => *n,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            other => parse_number(&self.string(other)),
        }
    }

    fn boolean(&self, value: &Value) -> bool {
        match value {
            Value::Nodes(nodes) => !nodes.is_empty(),
            Value::Str(s) => !s.is_empty(),
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Bool(b) => *b,
        }
    }

    fn compare(&self, op: CompareOp, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Nodes(a), Value::Nodes(b)) => a.iter().any(|&x| {
                let xs = self.node_string(x);
                b.iter()
                    .any(|&y| compare_strings(op, &xs, &self.node_string(y)))
            }),
            (Value::Nodes(nodes), other) => nodes
                .iter()
                .any(|&n| self.compare_atomic(op, &Value::Str(self.node_string(n)), other)),
            (other, Value::Nodes(nodes)) => nodes
                .iter()
                .any(|&n| self.compare_atomic(op, other, &Value::Str(self.node_string(n)))),
            (a, b) => self.compare_atomic(op, a, b),
        }
    }

    fn compare_atomic(&self, op: CompareOp, left: &Value, right: &Value) -> bool {
        match op {
            CompareOp::Eq | CompareOp::NotEq => {
                let equal = if matches!(left, Value::Bool(_)) || matches!(right, Value::Bool(_)) {
                    self.boolean(left) == self.boolean(right)
                } else if matches!(left, Value::Num(_)) || matches!(right, Value::Num(_)) {
                    self.number(left) == self.number(right)
                } else {
                    self.string(left) == self.string(right)
                };
                (op == CompareOp::Eq) == equal
            }
            _ => compare_numbers(op, self.number(left), self.number(right)),
        }
    }

    fn context_or_arg(&self, args: &[Expr], ctx: Context) -> XmlResult<Value> {
        match args.first() {
            Some(arg) => self.eval(arg, ctx),
            None => Ok(Value::Nodes(vec![ctx.node])),
        }
    }

    fn call(&self, function: Function, args: &[Expr], ctx: Context) -> XmlResult<Value> {
        let arity = |min: usize, max: usize| -> XmlResult<()> {
            if args.len() < min || args.len() > max {
                Err(self.type_error(&format!(
                    "{function:?} expects {min}..={max} arguments, got {}",
                    args.len()
                )))
            } else {
                Ok(())
            }
        };

        match function {
            Function::Position => {
                arity(0, 0)?;
                Ok(Value::Num(ctx.position as f64))
            }
            Function::Last => {
                arity(0, 0)?;
                Ok(Value::Num(ctx.size as f64))
            }
            Function::True => {
                arity(0, 0)?;
                Ok(Value::Bool(true))
            }
            Function::False => {
                arity(0, 0)?;
                Ok(Value::Bool(false))
            }
            Function::Count => {
                arity(1, 1)?;
                match self.eval(&args[0], ctx)? {
                    Value::Nodes(nodes) => Ok(Value::Num(nodes.len() as f64)),
                    _ => Err(self.type_error("count() requires a node-set")),
                }
            }
            Function::Not => {
                arity(1, 1)?;
                Ok(Value::Bool(!self.boolean(&self.eval(&args[0], ctx)?)))
            }
            Function::Boolean => {
                arity(1, 1)?;
                Ok(Value::Bool(self.boolean(&self.eval(&args[0], ctx)?)))
            }
            Function::Contains | Function::StartsWith => {
                arity(2, 2)?;
                let haystack = self.string(&self.eval(&args[0], ctx)?);
                let needle = self.string(&self.eval(&args[1], ctx)?);
                Ok(Value::Bool(if function == Function::Contains {
                    haystack.contains(&needle)
                } else {
                    haystack.starts_with(&needle)
                }))
            }
            Function::String => {
                arity(0, 1)?;
                Ok(Value::Str(self.string(&self.context_or_arg(args, ctx)?)))
            }
            Function::StringLength => {
                arity(0, 1)?;
                let s = self.string(&self.context_or_arg(args, ctx)?);
                Ok(Value::Num(s.chars().count() as f64))
            }
            Function::NormalizeSpace => {
                arity(0, 1)?;
                let s = self.string(&self.context_or_arg(args, ctx)?);
                Ok(Value::Str(s.split_whitespace().collect::<Vec<_>>().join(" ")))
            }
            Function::Concat => {
                if args.len() < 2 {
                    return Err(self.type_error("concat() expects at least 2 arguments"));
                }
                let mut out = String::new();
                for arg in args {
                    out.push_str(&self.string(&self.eval(arg, ctx)?));
                }
                Ok(Value::Str(out))
            }
            Function::Number => {
                arity(0, 1)?;
                Ok(Value::Num(self.number(&self.context_or_arg(args, ctx)?)))
            }
            Function::LocalName | Function::Name => {
                arity(0, 1)?;
                let Value::Nodes(nodes) = self.context_or_arg(args, ctx)? else {
                    return Err(self.type_error("name functions require a node-set"));
                };
                let name = match nodes.first() {
                    Some(XNode::Node(id)) => self.doc.name(*id).cloned(),
                    Some(XNode::Attr(owner, index)) => {
                        Some(self.doc.attributes(*owner)[*index].name.clone())
                    }
                    None => None,
                };
                Ok(Value::Str(match name {
                    Some(q) if function == Function::LocalName => q.local,
                    Some(q) => q.qualified(),
                    None => String::new(),
                }))
            }
        }
    }
}

fn parse_number(s: &str) -> f64 {
    s.trim().parse().unwrap_or(f64::NAN)
}

fn compare_numbers(op: CompareOp, a: f64, b: f64) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::NotEq => a != b,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
    }
}

fn compare_strings(op: CompareOp, a: &str, b: &str) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::NotEq => a != b,
        _ => compare_numbers(op, parse_number(a), parse_number(b)),
    }
}
