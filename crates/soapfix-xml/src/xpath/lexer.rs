use crate::builder::{is_name_char, is_name_start};
use crate::xpath::XPathError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Comma,
    DoubleColon,
    Dot,
    DoubleDot,
    Pipe,
    Plus,
    Minus,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// `*` in a name test position.
    Star,
    /// `*` in an operator position.
    Multiply,
    And,
    Or,
    Div,
    Mod,
    Literal(String),
    Number(f64),
    Name {
        prefix: Option<String>,
        local: String,
    },
    /// `prefix:*`
    PrefixWildcard(String),
}

impl Token {
    /// Tokens after which `*` and `and`/`or`/`div`/`mod` are names rather
    /// than operators.
    fn expects_operand_after(&self) -> bool {
        matches!(
            self,
            Token::At
                | Token::DoubleColon
                | Token::LParen
                | Token::LBracket
                | Token::Comma
                | Token::Slash
                | Token::DoubleSlash
                | Token::Pipe
                | Token::Plus
                | Token::Minus
                | Token::Eq
                | Token::NotEq
                | Token::Lt
                | Token::LtEq
                | Token::Gt
                | Token::GtEq
                | Token::Multiply
                | Token::And
                | Token::Or
                | Token::Div
                | Token::Mod
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, XPathError> {
    let mut lexer = Lexer {
        chars: source.char_indices().collect(),
        index: 0,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer {
    chars: Vec<(usize, char)>,
    index: usize,
    tokens: Vec<Spanned>,
}

impl Lexer {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).map(|(_, c)| *c)
    }

    fn position(&self) -> usize {
        self.chars
            .get(self.index)
            .map_or_else(|| self.chars.last().map_or(0, |(i, c)| i + c.len_utf8()), |(i, _)| *i)
    }

    fn operator_position(&self) -> bool {
        self.tokens
            .last()
            .is_some_and(|last| !last.token.expects_operand_after())
    }

    fn push(&mut self, token: Token, position: usize, width: usize) {
        self.tokens.push(Spanned { token, position });
        self.index += width;
    }

    fn run(&mut self) -> Result<(), XPathError> {
        while let Some(c) = self.peek(0) {
            let position = self.position();
            match c {
                c if c.is_whitespace() => self.index += 1,
                '/' if self.peek(1) == Some('/') => self.push(Token::DoubleSlash, position, 2),
                '/' => self.push(Token::Slash, position, 1),
                '[' => self.push(Token::LBracket, position, 1),
                ']' => self.push(Token::RBracket, position, 1),
                '(' => self.push(Token::LParen, position, 1),
                ')' => self.push(Token::RParen, position, 1),
                '@' => self.push(Token::At, position, 1),
                ',' => self.push(Token::Comma, position, 1),
                '|' => self.push(Token::Pipe, position, 1),
                '+' => self.push(Token::Plus, position, 1),
                '-' => self.push(Token::Minus, position, 1),
                '=' => self.push(Token::Eq, position, 1),
                '!' if self.peek(1) == Some('=') => self.push(Token::NotEq, position, 2),
                '<' if self.peek(1) == Some('=') => self.push(Token::LtEq, position, 2),
                '<' => self.push(Token::Lt, position, 1),
                '>' if self.peek(1) == Some('=') => self.push(Token::GtEq, position, 2),
                '>' => self.push(Token::Gt, position, 1),
                ':' if self.peek(1) == Some(':') => self.push(Token::DoubleColon, position, 2),
                '.' if self.peek(1) == Some('.') => self.push(Token::DoubleDot, position, 2),
                '.' if self.peek(1).is_some_and(|next| next.is_ascii_digit()) => self.number()?,
                '.' => self.push(Token::Dot, position, 1),
                '*' if self.operator_position() => self.push(Token::Multiply, position, 1),
                '*' => self.push(Token::Star, position, 1),
                '"' | '\'' => self.literal(c)?,
                c if c.is_ascii_digit() => self.number()?,
                c if is_name_start(c) => self.name()?,
                other => {
                    return Err(XPathError::syntax(
                        position,
                        format!("unexpected character '{other}'"),
                    ));
                }
            }
        }
        Ok(())
    }

    fn literal(&mut self, quote: char) -> Result<(), XPathError> {
        let position = self.position();
        let mut value = String::new();
        let mut offset = 1;
        loop {
            match self.peek(offset) {
                Some(c) if c == quote => break,
                Some(c) => value.push(c),
                None => return Err(XPathError::syntax(position, "unterminated string literal")),
            }
            offset += 1;
        }
        self.push(Token::Literal(value), position, offset + 1);
        Ok(())
    }

    fn number(&mut self) -> Result<(), XPathError> {
        let position = self.position();
        let mut text = String::new();
        let mut offset = 0;
        let mut seen_dot = false;
        while let Some(c) = self.peek(offset) {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '.' && !seen_dot && self.peek(offset + 1) != Some('.') {
                seen_dot = true;
                text.push(c);
            } else {
                break;
            }
            offset += 1;
        }
        let value = text
            .parse::<f64>()
            .map_err(|_| XPathError::syntax(position, format!("invalid number '{text}'")))?;
        self.push(Token::Number(value), position, offset);
        Ok(())
    }

    fn ncname(&self, start: usize) -> (String, usize) {
        let mut name = String::new();
        let mut offset = start;
        while let Some(c) = self.peek(offset) {
            let accepted = if offset == start {
                is_name_start(c)
            } else {
                is_name_char(c)
            };
            if !accepted {
                break;
            }
            name.push(c);
            offset += 1;
        }
        (name, offset)
    }

    fn name(&mut self) -> Result<(), XPathError> {
        let position = self.position();
        let (first, mut width) = self.ncname(0);

        if self.operator_position() {
            let token = match first.as_str() {
                "and" => Token::And,
                "or" => Token::Or,
                "div" => Token::Div,
                "mod" => Token::Mod,
                other => {
                    return Err(XPathError::syntax(
                        position,
                        format!("expected an operator, found '{other}'"),
                    ));
                }
            };
            self.push(token, position, width);
            return Ok(());
        }

        // `prefix:local` or `prefix:*`, but not the `::` of an axis.
        if self.peek(width) == Some(':') && self.peek(width + 1) != Some(':') {
            match self.peek(width + 1) {
                Some('*') => {
                    self.push(Token::PrefixWildcard(first), position, width + 2);
                    return Ok(());
                }
                Some(c) if is_name_start(c) => {
                    let (local, end) = self.ncname(width + 1);
                    width = end;
                    self.push(
                        Token::Name {
                            prefix: Some(first),
                            local,
                        },
                        position,
                        width,
                    );
                    return Ok(());
                }
                _ => {
                    return Err(XPathError::syntax(
                        position,
                        format!("incomplete qualified name '{first}:'"),
                    ));
                }
            }
        }

        self.push(
            Token::Name {
                prefix: None,
                local: first,
            },
            position,
            width,
        );
        Ok(())
    }
}
