//! Recursive descent parser producing the expression tree.
//!
//! Prefixes are resolved against the namespace table while parsing, so a
//! compiled expression carries namespace URIs only.

use crate::error::{XmlError, XmlResult};
use crate::namespaces::Namespaces;

use super::lexer::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    Child,
    Attribute,
    SelfAxis,
    Parent,
    Descendant,
    DescendantOrSelf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeTest {
    /// `node()`
    Node,
    /// `text()`
    Text,
    /// `comment()`
    Comment,
    /// `*`
    AnyName,
    /// `prefix:*`
    NamespaceWildcard(String),
    /// `local` or `prefix:local`
    Name {
        namespace: Option<String>,
        local: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Step {
    pub(crate) axis: Axis,
    pub(crate) test: NodeTest,
    pub(crate) predicates: Vec<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    Count,
    Not,
    Boolean,
    True,
    False,
    Contains,
    StartsWith,
    String,
    StringLength,
    NormalizeSpace,
    Concat,
    Number,
    LocalName,
    Name,
    Position,
    Last,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "count" => Self::Count,
            "not" => Self::Not,
            "boolean" => Self::Boolean,
            "true" => Self::True,
            "false" => Self::False,
            "contains" => Self::Contains,
            "starts-with" => Self::StartsWith,
            "string" => Self::String,
            "string-length" => Self::StringLength,
            "normalize-space" => Self::NormalizeSpace,
            "concat" => Self::Concat,
            "number" => Self::Number,
            "local-name" => Self::LocalName,
            "name" => Self::Name,
            "position" => Self::Position,
            "last" => Self::Last,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    Negate(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Path { absolute: bool, steps: Vec<Step> },
    Filter {
        primary: Box<Expr>,
        predicates: Vec<Expr>,
        steps: Vec<Step>,
    },
    Literal(String),
    Number(f64),
    Call(Function, Vec<Expr>),
}

pub(crate) struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    expression: &'a str,
    namespaces: &'a Namespaces,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(tokens: Vec<Token>, expression: &'a str, namespaces: &'a Namespaces) -> Self {
        Self {
            tokens,
            pos: 0,
            expression,
            namespaces,
        }
    }

    pub(crate) fn parse(mut self) -> XmlResult<Expr> {
        if self.tokens.is_empty() {
            return Err(self.error("empty expression"));
        }
        let expr = self.parse_or()?;
        if let Some(token) = self.peek() {
            return Err(self.error(&format!("unexpected token {token:?}")));
        }
        Ok(expr)
    }

    fn error(&self, message: &str) -> XmlError {
        XmlError::XPathSyntax {
            expression: self.expression.to_string(),
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> XmlResult<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {expected:?}")))
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Name(n)) if n == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> XmlResult<Expr> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> XmlResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.eat_keyword("and") {
            let right = self.parse_equality()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> XmlResult<Expr> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CompareOp::Eq,
                Some(Token::NotEq) => CompareOp::NotEq,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_relational()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_relational(&mut self) -> XmlResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CompareOp::Lt,
                Some(Token::Le) => CompareOp::Le,
                Some(Token::Gt) => CompareOp::Gt,
                Some(Token::Ge) => CompareOp::Ge,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> XmlResult<Expr> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Negate(Box::new(self.parse_unary()?)));
        }
        self.parse_union()
    }

    fn parse_union(&mut self) -> XmlResult<Expr> {
        let mut left = self.parse_path()?;
        while self.eat(&Token::Pipe) {
            let right = self.parse_path()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn starts_primary(&self) -> bool {
        match self.peek() {
            Some(Token::Literal(_) | Token::Number(_) | Token::LParen) => true,
            Some(Token::Name(name)) => {
                self.peek_at(1) == Some(&Token::LParen)
                    && !matches!(name.as_str(), "text" | "node" | "comment")
            }
            _ => false,
        }
    }

    fn parse_path(&mut self) -> XmlResult<Expr> {
        if self.starts_primary() {
            let primary = self.parse_primary()?;
            let predicates = self.parse_predicates()?;
            let mut steps = Vec::new();
            match self.peek() {
                Some(Token::Slash) => {
                    self.pos += 1;
                    self.parse_relative(&mut steps)?;
                }
                Some(Token::DoubleSlash) => {
                    self.pos += 1;
                    steps.push(descendant_or_self());
                    self.parse_relative(&mut steps)?;
                }
                _ => {}
            }
            if predicates.is_empty() && steps.is_empty() {
                return Ok(primary);
            }
            return Ok(Expr::Filter {
                primary: Box::new(primary),
                predicates,
                steps,
            });
        }

        let mut steps = Vec::new();
        match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                if self.starts_step() {
                    self.parse_relative(&mut steps)?;
                }
                Ok(Expr::Path {
                    absolute: true,
                    steps,
                })
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                steps.push(descendant_or_self());
                self.parse_relative(&mut steps)?;
                Ok(Expr::Path {
                    absolute: true,
                    steps,
                })
            }
            _ => {
                self.parse_relative(&mut steps)?;
                Ok(Expr::Path {
                    absolute: false,
                    steps,
                })
            }
        }
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Name(_) | Token::Star | Token::At | Token::Dot | Token::DotDot)
        )
    }

    fn parse_relative(&mut self, steps: &mut Vec<Step>) -> XmlResult<()> {
        steps.push(self.parse_step()?);
        loop {
            match self.peek() {
                Some(Token::Slash) => {
                    self.pos += 1;
                    steps.push(self.parse_step()?);
                }
                Some(Token::DoubleSlash) => {
                    self.pos += 1;
                    steps.push(descendant_or_self());
                    steps.push(self.parse_step()?);
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_step(&mut self) -> XmlResult<Step> {
        if self.eat(&Token::Dot) {
            return Ok(Step {
                axis: Axis::SelfAxis,
                test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }
        if self.eat(&Token::DotDot) {
            return Ok(Step {
                axis: Axis::Parent,
                test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }

        let axis = if self.eat(&Token::At) {
            Axis::Attribute
        } else if let (Some(Token::Name(name)), Some(Token::DoubleColon)) =
            (self.peek(), self.peek_at(1))
        {
            let axis = match name.as_str() {
                "child" => Axis::Child,
                "attribute" => Axis::Attribute,
                "self" => Axis::SelfAxis,
                "parent" => Axis::Parent,
                "descendant" => Axis::Descendant,
                "descendant-or-self" => Axis::DescendantOrSelf,
                other => return Err(self.error(&format!("unsupported axis '{other}'"))),
            };
            self.pos += 2;
            axis
        } else {
            Axis::Child
        };

        let test = self.parse_node_test()?;
        let predicates = self.parse_predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> XmlResult<NodeTest> {
        match self.advance() {
            Some(Token::Star) => Ok(NodeTest::AnyName),
            Some(Token::Name(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    let test = match name.as_str() {
                        "text" => NodeTest::Text,
                        "node" => NodeTest::Node,
                        "comment" => NodeTest::Comment,
                        other => {
                            return Err(self.error(&format!("unexpected function '{other}' in step")));
                        }
                    };
                    self.pos += 1;
                    self.expect(&Token::RParen)?;
                    return Ok(test);
                }
                match name.split_once(':') {
                    Some((prefix, "*")) => Ok(NodeTest::NamespaceWildcard(self.resolve(prefix)?)),
                    Some((prefix, local)) => Ok(NodeTest::Name {
                        namespace: Some(self.resolve(prefix)?),
                        local: local.to_string(),
                    }),
                    None => Ok(NodeTest::Name {
                        namespace: None,
                        local: name,
                    }),
                }
            }
            other => Err(self.error(&format!("expected node test, found {other:?}"))),
        }
    }

    fn resolve(&self, prefix: &str) -> XmlResult<String> {
        self.namespaces
            .get(prefix)
            .map(str::to_string)
            .ok_or_else(|| XmlError::UnknownPrefix(prefix.to_string()))
    }

    fn parse_predicates(&mut self) -> XmlResult<Vec<Expr>> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.parse_or()?);
            self.expect(&Token::RBracket)?;
        }
        Ok(predicates)
    }

    fn parse_primary(&mut self) -> XmlResult<Expr> {
        match self.advance() {
            Some(Token::Literal(s)) => Ok(Expr::Literal(s)),
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name)) => {
                let function = Function::from_name(&name)
                    .ok_or_else(|| XmlError::UnknownFunction(name.clone()))?;
                self.expect(&Token::LParen)?;
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.parse_or()?);
                        if self.eat(&Token::RParen) {
                            break;
                        }
                        self.expect(&Token::Comma)?;
                    }
                }
                Ok(Expr::Call(function, args))
            }
            other => Err(self.error(&format!("unexpected token {other:?}"))),
        }
    }
}

fn descendant_or_self() -> Step {
    Step {
        axis: Axis::DescendantOrSelf,
        test: NodeTest::Node,
        predicates: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xpath::lexer::tokenize;

    fn parse(expression: &str, ns: &Namespaces) -> XmlResult<Expr> {
        Parser::new(tokenize(expression)?, expression, ns).parse()
    }

    #[test]
    fn test_double_slash_expands_to_descendant_or_self() {
        let ns = Namespaces::new();
        let expr = parse("//a", &ns).unwrap();
        let Expr::Path { absolute, steps } = expr else {
            panic!("expected a path");
        };
        assert!(absolute);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].axis, Axis::DescendantOrSelf);
        assert_eq!(
            steps[1].test,
            NodeTest::Name {
                namespace: None,
                local: "a".into()
            }
        );
    }

    #[test]
    fn test_prefix_resolved_at_parse_time() {
        let ns = Namespaces::from_pairs([("atom", "urn:atom")]);
        let Expr::Path { steps, .. } = parse("atom:entry", &ns).unwrap() else {
            panic!("expected a path");
        };
        assert_eq!(
            steps[0].test,
            NodeTest::Name {
                namespace: Some("urn:atom".into()),
                local: "entry".into()
            }
        );
        assert_eq!(
            parse("foo:entry", &ns),
            Err(XmlError::UnknownPrefix("foo".into()))
        );
    }

    #[test]
    fn test_syntax_errors() {
        let ns = Namespaces::new();
        assert!(matches!(parse("a[", &ns), Err(XmlError::XPathSyntax { .. })));
        assert!(matches!(parse("a b", &ns), Err(XmlError::XPathSyntax { .. })));
        assert!(matches!(parse("", &ns), Err(XmlError::XPathSyntax { .. })));
        assert_eq!(
            parse("frobnicate(1)", &ns),
            Err(XmlError::UnknownFunction("frobnicate".into()))
        );
    }
}
