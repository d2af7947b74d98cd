//! `XPath` 1.0 expression parser.
//!
//! A recursive descent parser over the [`Lexer`]'s token stream, following
//! <https://www.w3.org/TR/xpath-10/#section-Grammar>. Each grammar
//! production is a method on the internal `Parser`.
//!
//! # Operator Precedence
//!
//! From lowest to highest:
//! 1. `or`
//! 2. `and`
//! 3. `=`, `!=`
//! 4. `<`, `<=`, `>`, `>=`
//! 5. `+`, `-`
//! 6. `*`, `div`, `mod`
//! 7. Unary `-`
//! 8. `|`
//! 9. Filter and path expressions

use super::ast::{Axis, BinaryOp, Expr, NodeTest, Step};
use super::lexer::{Lexer, Token};
use super::types::XPathError;

/// Parses an `XPath` expression string into an AST.
///
/// # Errors
///
/// Returns [`XPathError::Syntax`] if the input is empty or is not a valid
/// `XPath` 1.0 expression.
pub fn parse(input: &str) -> Result<Expr, XPathError> {
    let tokens = Lexer::new(input).tokenize()?;
    if tokens.is_empty() {
        return Err(XPathError::syntax(0, "empty XPath expression"));
    }

    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr()?;

    if let Some(token) = parser.peek() {
        return Err(parser.error(format!("unexpected token '{token}' after expression")));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    // -----------------------------------------------------------------------
    // Token access helpers
    // -----------------------------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), XPathError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected '{token}', found {}",
                self.describe_current()
            )))
        }
    }

    fn describe_current(&self) -> String {
        self.peek()
            .map_or_else(|| "end of expression".to_owned(), |t| format!("'{t}'"))
    }

    fn error(&self, message: impl Into<String>) -> XPathError {
        XPathError::syntax(self.pos, message)
    }

    /// Consumes the current token if it is one of the listed operators.
    fn eat_operator(&mut self, ops: &[(Token, BinaryOp)]) -> Option<BinaryOp> {
        let current = self.peek()?;
        let op = ops
            .iter()
            .find_map(|(token, op)| (token == current).then_some(*op))?;
        self.pos += 1;
        Some(op)
    }

    /// Parses a left-associative chain `operand (op operand)*`.
    fn parse_binary_chain(
        &mut self,
        ops: &[(Token, BinaryOp)],
        operand: fn(&mut Self) -> Result<Expr, XPathError>,
    ) -> Result<Expr, XPathError> {
        let mut left = operand(self)?;
        while let Some(op) = self.eat_operator(ops) {
            let right = operand(self)?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    // -----------------------------------------------------------------------
    // Grammar productions
    // -----------------------------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, XPathError> {
        self.parse_or_expr()
    }

    /// `OrExpr ::= AndExpr ('or' AndExpr)*`
    fn parse_or_expr(&mut self) -> Result<Expr, XPathError> {
        self.parse_binary_chain(&[(Token::Or, BinaryOp::Or)], Self::parse_and_expr)
    }

    /// `AndExpr ::= EqualityExpr ('and' EqualityExpr)*`
    fn parse_and_expr(&mut self) -> Result<Expr, XPathError> {
        self.parse_binary_chain(&[(Token::And, BinaryOp::And)], Self::parse_equality_expr)
    }

    fn parse_equality_expr(&mut self) -> Result<Expr, XPathError> {
        self.parse_binary_chain(
            &[(Token::Equal, BinaryOp::Eq), (Token::NotEqual, BinaryOp::Neq)],
            Self::parse_relational_expr,
        )
    }

    fn parse_relational_expr(&mut self) -> Result<Expr, XPathError> {
        self.parse_binary_chain(
            &[
                (Token::LessThan, BinaryOp::Lt),
                (Token::LessThanEqual, BinaryOp::Lte),
                (Token::GreaterThan, BinaryOp::Gt),
                (Token::GreaterThanEqual, BinaryOp::Gte),
            ],
            Self::parse_additive_expr,
        )
    }

    fn parse_additive_expr(&mut self) -> Result<Expr, XPathError> {
        self.parse_binary_chain(
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
            Self::parse_multiplicative_expr,
        )
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr, XPathError> {
        self.parse_binary_chain(
            &[
                (Token::Star, BinaryOp::Mul),
                (Token::Div, BinaryOp::Div),
                (Token::Mod, BinaryOp::Mod),
            ],
            Self::parse_unary_expr,
        )
    }

    /// `UnaryExpr ::= '-'* UnionExpr`
    fn parse_unary_expr(&mut self) -> Result<Expr, XPathError> {
        if self.eat(&Token::Minus) {
            let inner = self.parse_unary_expr()?;
            Ok(Expr::UnaryNeg(Box::new(inner)))
        } else {
            self.parse_union_expr()
        }
    }

    /// `UnionExpr ::= PathExpr ('|' PathExpr)*`
    fn parse_union_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_path_expr()?;
        while self.eat(&Token::Pipe) {
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// Parses a path expression.
    ///
    /// ```text
    /// PathExpr ::= LocationPath
    ///            | FilterExpr
    ///            | FilterExpr '/' RelativeLocationPath
    ///            | FilterExpr '//' RelativeLocationPath
    /// ```
    ///
    /// Location paths start with `/`, `//`, `.`, `..`, `@`, an axis name, a
    /// node type or a name test. Anything else that can start an expression
    /// is a primary expression, which begins a filter expression.
    fn parse_path_expr(&mut self) -> Result<Expr, XPathError> {
        match self.peek() {
            Some(
                Token::Slash
                | Token::DoubleSlash
                | Token::Dot
                | Token::DotDot
                | Token::At
                | Token::AxisName(_)
                | Token::NodeType(_)
                | Token::Name(_),
            ) => self.parse_location_path(),

            Some(
                Token::VariableReference(_)
                | Token::Literal(_)
                | Token::Number(_)
                | Token::LeftParen
                | Token::FunctionName(_),
            ) => {
                let base = self.parse_filter_expr()?;
                let mut steps = Vec::new();
                if self.eat(&Token::DoubleSlash) {
                    steps.push(Step::descendant_or_self());
                } else if !self.eat(&Token::Slash) {
                    return Ok(base);
                }
                self.parse_relative_location_path_into(&mut steps)?;
                Ok(Expr::FilterPath {
                    base: Box::new(base),
                    steps,
                })
            }

            _ => Err(self.error(format!(
                "expected expression, found {}",
                self.describe_current()
            ))),
        }
    }

    /// `FilterExpr ::= PrimaryExpr Predicate*`
    fn parse_filter_expr(&mut self) -> Result<Expr, XPathError> {
        let expr = self.parse_primary_expr()?;
        let predicates = self.parse_predicates()?;
        if predicates.is_empty() {
            Ok(expr)
        } else {
            Ok(Expr::Filter {
                expr: Box::new(expr),
                predicates,
            })
        }
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, XPathError> {
        let expr = match self.peek().cloned() {
            Some(Token::VariableReference(name)) => Expr::Variable(name),
            Some(Token::Literal(value)) => Expr::String(value),
            Some(Token::Number(value)) => Expr::Number(value),
            Some(Token::LeftParen) => {
                self.pos += 1;
                let expr = self.parse_expr()?;
                self.expect(&Token::RightParen)?;
                return Ok(expr);
            }
            Some(Token::FunctionName(name)) => {
                self.pos += 1;
                return self.parse_function_args(name);
            }
            _ => {
                return Err(self.error(format!(
                    "expected primary expression, found {}",
                    self.describe_current()
                )))
            }
        };
        self.pos += 1;
        Ok(expr)
    }

    /// `FunctionCall ::= FunctionName '(' (Argument (',' Argument)*)? ')'`
    fn parse_function_args(&mut self, name: String) -> Result<Expr, XPathError> {
        self.expect(&Token::LeftParen)?;
        let mut args = Vec::new();
        if !self.check(&Token::RightParen) {
            args.push(self.parse_expr()?);
            while self.eat(&Token::Comma) {
                args.push(self.parse_expr()?);
            }
        }
        self.expect(&Token::RightParen)?;
        Ok(Expr::FunctionCall { name, args })
    }

    /// Parses a location path.
    ///
    /// ```text
    /// LocationPath ::= RelativeLocationPath
    ///                | AbsoluteLocationPath
    /// AbsoluteLocationPath ::= '/' RelativeLocationPath?
    ///                        | '//' RelativeLocationPath
    /// ```
    fn parse_location_path(&mut self) -> Result<Expr, XPathError> {
        let mut steps = Vec::new();
        if self.eat(&Token::Slash) {
            if self.is_step_start() {
                self.parse_relative_location_path_into(&mut steps)?;
            }
            Ok(Expr::RootPath { steps })
        } else if self.eat(&Token::DoubleSlash) {
            steps.push(Step::descendant_or_self());
            self.parse_relative_location_path_into(&mut steps)?;
            Ok(Expr::RootPath { steps })
        } else {
            self.parse_relative_location_path_into(&mut steps)?;
            Ok(Expr::Path { steps })
        }
    }

    fn parse_relative_location_path_into(
        &mut self,
        steps: &mut Vec<Step>,
    ) -> Result<(), XPathError> {
        steps.push(self.parse_step()?);
        loop {
            if self.eat(&Token::DoubleSlash) {
                steps.push(Step::descendant_or_self());
            } else if !self.eat(&Token::Slash) {
                break;
            }
            steps.push(self.parse_step()?);
        }
        Ok(())
    }

    fn is_step_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Dot
                    | Token::DotDot
                    | Token::At
                    | Token::Name(_)
                    | Token::NodeType(_)
                    | Token::AxisName(_)
            )
        )
    }

    /// Parses a single step; `.` and `..` abbreviate `self::node()` and
    /// `parent::node()`.
    fn parse_step(&mut self) -> Result<Step, XPathError> {
        let abbreviated = if self.eat(&Token::Dot) {
            Some(Axis::Self_)
        } else if self.eat(&Token::DotDot) {
            Some(Axis::Parent)
        } else {
            None
        };
        if let Some(axis) = abbreviated {
            return Ok(Step {
                axis,
                node_test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }

        let axis = self.parse_axis_specifier()?;
        let node_test = self.parse_node_test()?;
        let predicates = self.parse_predicates()?;
        Ok(Step {
            axis,
            node_test,
            predicates,
        })
    }

    /// `AxisSpecifier ::= AxisName '::' | '@'?`
    fn parse_axis_specifier(&mut self) -> Result<Axis, XPathError> {
        if self.eat(&Token::At) {
            return Ok(Axis::Attribute);
        }
        if let Some(Token::AxisName(name)) = self.peek().cloned() {
            let axis = Axis::parse(&name)
                .ok_or_else(|| self.error(format!("unknown axis: {name}")))?;
            self.pos += 1;
            self.expect(&Token::ColonColon)?;
            return Ok(axis);
        }
        Ok(Axis::Child)
    }

    /// Parses a node test.
    ///
    /// ```text
    /// NodeTest ::= NameTest
    ///            | NodeType '(' ')'
    ///            | 'processing-instruction' '(' Literal ')'
    /// NameTest ::= '*' | NCName ':' '*' | QName | ':' NCName
    /// ```
    fn parse_node_test(&mut self) -> Result<NodeTest, XPathError> {
        match self.peek().cloned() {
            Some(Token::NodeType(name)) => {
                self.pos += 1;
                self.expect(&Token::LeftParen)?;
                let node_test = match name.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    "processing-instruction" => {
                        if let Some(Token::Literal(target)) = self.peek().cloned() {
                            self.pos += 1;
                            NodeTest::ProcessingInstruction(Some(target))
                        } else {
                            NodeTest::ProcessingInstruction(None)
                        }
                    }
                    _ => return Err(self.error(format!("unknown node type: {name}"))),
                };
                self.expect(&Token::RightParen)?;
                Ok(node_test)
            }
            Some(Token::Name(name)) => {
                self.pos += 1;
                Ok(name_test(&name))
            }
            _ => Err(self.error(format!(
                "expected node test, found {}",
                self.describe_current()
            ))),
        }
    }

    /// `Predicate ::= '[' Expr ']'`
    fn parse_predicates(&mut self) -> Result<Vec<Expr>, XPathError> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LeftBracket) {
            predicates.push(self.parse_expr()?);
            self.expect(&Token::RightBracket)?;
        }
        Ok(predicates)
    }
}

fn name_test(name: &str) -> NodeTest {
    if name == "*" {
        return NodeTest::Wildcard;
    }
    if let Some(prefix) = name.strip_suffix(":*") {
        return NodeTest::PrefixWildcard(prefix.to_owned());
    }
    match name.split_once(':') {
        Some((prefix, local)) => NodeTest::Name {
            prefix: Some(prefix.to_owned()),
            local: local.to_owned(),
        },
        None => NodeTest::Name {
            prefix: None,
            local: name.to_owned(),
        },
    }
}
