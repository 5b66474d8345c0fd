//! Namespace-aware XPath 1.0 subset.
//!
//! Supported: absolute and relative location paths, `//`, `.`, `..`, `*`,
//! `prefix:*`, `@name`, `text()`, `node()`, `comment()`, the `child`,
//! `attribute`, `self`, `parent`, `descendant` and `descendant-or-self`
//! axes, predicates (positional and boolean), `and`/`or`, comparisons,
//! unions and a handful of core functions.
//!
//! Unprefixed name tests only match elements in no namespace, as in XPath
//! 1.0; use a prefix from the [`Namespaces`] table for namespaced documents.

mod eval;
mod lexer;
mod parser;

use crate::document::{Document, NodeId};
use crate::error::{XmlError, XmlResult};
use crate::item::Item;
use crate::namespaces::Namespaces;

/// A compiled XPath expression.
#[derive(Debug, Clone)]
pub struct XPath {
    source: String,
    expr: parser::Expr,
}

impl XPath {
    /// Compile `expression`, resolving prefixes through `namespaces`.
    pub fn compile(expression: &str, namespaces: &Namespaces) -> XmlResult<Self> {
        let tokens = lexer::tokenize(expression)?;
        let expr = parser::Parser::new(tokens, expression, namespaces).parse()?;
        Ok(Self {
            source: expression.to_string(),
            expr,
        })
    }

    /// The expression text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluate against `doc` with `context` as the context node.
    ///
    /// Node-set results come back in document order without duplicates;
    /// scalar results come back as a single item.
    pub fn evaluate(&self, doc: &Document, context: NodeId) -> XmlResult<Vec<Item>> {
        if !doc.is_container(context) {
            return Err(XmlError::InvalidContext(format!("node {context}")));
        }
        eval::Evaluator::new(doc, &self.source).run(&self.expr, context)
    }
}
