use crate::xpath::XPathError;
use crate::xpath::ast::{ArithmeticOp, Axis, CompareOp, Expr, LocationPath, NodeTest, Step};
use crate::xpath::lexer::{Spanned, Token, tokenize};

pub(crate) fn parse(source: &str) -> Result<Expr, XPathError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(XPathError::syntax(0, "empty expression"));
    }
    let mut parser = Parser {
        tokens,
        index: 0,
        end: source.len(),
    };
    let expr = parser.or_expr()?;
    if let Some(extra) = parser.tokens.get(parser.index) {
        return Err(XPathError::syntax(
            extra.position,
            format!("unexpected token {:?}", extra.token),
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    index: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index).map(|spanned| &spanned.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens
            .get(self.index + offset)
            .map(|spanned| &spanned.token)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.index)
            .map_or(self.end, |spanned| spanned.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).map(|spanned| spanned.token.clone());
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), XPathError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {expected:?}")))
        }
    }

    fn unexpected(&self, message: &str) -> XPathError {
        match self.peek() {
            Some(token) => XPathError::syntax(self.position(), format!("{message}, found {token:?}")),
            None => XPathError::syntax(self.position(), format!("{message}, found end of expression")),
        }
    }

    fn or_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.and_expr()?;
        while self.eat(&Token::Or) {
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.equality_expr()?;
        while self.eat(&Token::And) {
            let right = self.equality_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn equality_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.relational_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CompareOp::Eq,
                Some(Token::NotEq) => CompareOp::NotEq,
                _ => return Ok(left),
            };
            self.index += 1;
            let right = self.relational_expr()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
    }

    fn relational_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.additive_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CompareOp::Lt,
                Some(Token::LtEq) => CompareOp::LtEq,
                Some(Token::Gt) => CompareOp::Gt,
                Some(Token::GtEq) => CompareOp::GtEq,
                _ => return Ok(left),
            };
            self.index += 1;
            let right = self.additive_expr()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
    }

    fn additive_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.multiplicative_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithmeticOp::Add,
                Some(Token::Minus) => ArithmeticOp::Subtract,
                _ => return Ok(left),
            };
            self.index += 1;
            let right = self.multiplicative_expr()?;
            left = Expr::Arithmetic(op, Box::new(left), Box::new(right));
        }
    }

    fn multiplicative_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.unary_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Multiply) => ArithmeticOp::Multiply,
                Some(Token::Div) => ArithmeticOp::Divide,
                Some(Token::Mod) => ArithmeticOp::Modulo,
                _ => return Ok(left),
            };
            self.index += 1;
            let right = self.unary_expr()?;
            left = Expr::Arithmetic(op, Box::new(left), Box::new(right));
        }
    }

    fn unary_expr(&mut self) -> Result<Expr, XPathError> {
        if self.eat(&Token::Minus) {
            let inner = self.unary_expr()?;
            return Ok(Expr::Negate(Box::new(inner)));
        }
        self.union_expr()
    }

    fn union_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.path_expr()?;
        while self.eat(&Token::Pipe) {
            let right = self.path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn path_expr(&mut self) -> Result<Expr, XPathError> {
        match self.peek() {
            Some(Token::Slash) => {
                self.index += 1;
                let steps = if self.at_step_start() {
                    self.relative_path()?
                } else {
                    Vec::new()
                };
                Ok(Expr::Path(LocationPath {
                    absolute: true,
                    steps,
                }))
            }
            Some(Token::DoubleSlash) => {
                self.index += 1;
                let mut steps = vec![Step::descendant_or_self()];
                steps.extend(self.relative_path()?);
                Ok(Expr::Path(LocationPath {
                    absolute: true,
                    steps,
                }))
            }
            Some(Token::Literal(_) | Token::Number(_) | Token::LParen) => self.filter_expr(),
            Some(Token::Name { prefix: None, local })
                if self.peek_at(1) == Some(&Token::LParen) && !is_node_type(local) =>
            {
                self.filter_expr()
            }
            Some(Token::Name { prefix: Some(_), .. }) if self.peek_at(1) == Some(&Token::LParen) => {
                Err(self.unexpected("extension functions are not supported"))
            }
            _ => {
                let steps = self.relative_path()?;
                Ok(Expr::Path(LocationPath {
                    absolute: false,
                    steps,
                }))
            }
        }
    }

    fn filter_expr(&mut self) -> Result<Expr, XPathError> {
        let primary = self.primary_expr()?;
        let predicates = self.predicates()?;
        let steps = match self.peek() {
            Some(Token::Slash) => {
                self.index += 1;
                self.relative_path()?
            }
            Some(Token::DoubleSlash) => {
                self.index += 1;
                let mut steps = vec![Step::descendant_or_self()];
                steps.extend(self.relative_path()?);
                steps
            }
            _ => Vec::new(),
        };
        if predicates.is_empty() && steps.is_empty() {
            return Ok(primary);
        }
        Ok(Expr::Filter {
            primary: Box::new(primary),
            predicates,
            steps,
        })
    }

    fn primary_expr(&mut self) -> Result<Expr, XPathError> {
        match self.advance() {
            Some(Token::Literal(value)) => Ok(Expr::Literal(value)),
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name { prefix: None, local }) => {
                self.expect(&Token::LParen)?;
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.or_expr()?);
                        if self.eat(&Token::RParen) {
                            break;
                        }
                        self.expect(&Token::Comma)?;
                    }
                }
                Ok(Expr::Function { name: local, args })
            }
            _ => {
                self.index = self.index.saturating_sub(1);
                Err(self.unexpected("expected an expression"))
            }
        }
    }

    fn at_step_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Name { .. }
                    | Token::Star
                    | Token::PrefixWildcard(_)
                    | Token::At
                    | Token::Dot
                    | Token::DoubleDot
            )
        )
    }

    fn relative_path(&mut self) -> Result<Vec<Step>, XPathError> {
        let mut steps = vec![self.step()?];
        loop {
            match self.peek() {
                Some(Token::Slash) => {
                    self.index += 1;
                    steps.push(self.step()?);
                }
                Some(Token::DoubleSlash) => {
                    self.index += 1;
                    steps.push(Step::descendant_or_self());
                    steps.push(self.step()?);
                }
                _ => return Ok(steps),
            }
        }
    }

    fn step(&mut self) -> Result<Step, XPathError> {
        if self.eat(&Token::Dot) {
            return Ok(Step {
                axis: Axis::SelfAxis,
                test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }
        if self.eat(&Token::DoubleDot) {
            return Ok(Step {
                axis: Axis::Parent,
                test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }

        let axis = if self.eat(&Token::At) {
            Axis::Attribute
        } else if let (Some(Token::Name { prefix: None, local }), Some(Token::DoubleColon)) =
            (self.peek(), self.peek_at(1))
        {
            let position = self.position();
            let axis = Axis::from_name(local).ok_or_else(|| {
                XPathError::syntax(position, format!("unsupported axis '{local}'"))
            })?;
            self.index += 2;
            axis
        } else {
            Axis::Child
        };

        let test = self.node_test()?;
        let predicates = self.predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn node_test(&mut self) -> Result<NodeTest, XPathError> {
        match self.peek().cloned() {
            Some(Token::Star) => {
                self.index += 1;
                Ok(NodeTest::Wildcard)
            }
            Some(Token::PrefixWildcard(prefix)) => {
                self.index += 1;
                Ok(NodeTest::NamespaceWildcard(prefix))
            }
            Some(Token::Name { prefix: None, local })
                if is_node_type(&local) && self.peek_at(1) == Some(&Token::LParen) =>
            {
                self.index += 2;
                let test = match local.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => {
                        if matches!(self.peek(), Some(Token::Literal(_))) {
                            self.index += 1;
                        }
                        NodeTest::ProcessingInstruction
                    }
                };
                self.expect(&Token::RParen)?;
                Ok(test)
            }
            Some(Token::Name { prefix, local }) => {
                self.index += 1;
                Ok(NodeTest::Name { prefix, local })
            }
            _ => Err(self.unexpected("expected a node test")),
        }
    }

    fn predicates(&mut self) -> Result<Vec<Expr>, XPathError> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.or_expr()?);
            self.expect(&Token::RBracket)?;
        }
        Ok(predicates)
    }
}

fn is_node_type(name: &str) -> bool {
    matches!(
        name,
        "node" | "text" | "comment" | "processing-instruction"
    )
}
