use std::iter::Peekable;
use std::num::IntErrorKind;

use crate::ParseError;
use crate::ast::{Expression, NumberType};
use crate::lexer::{Token, tokenize};

/// Default limit on list nesting accepted by the parser
pub const DEFAULT_MAX_PARSE_DEPTH: usize = 256;

/// Configuration for parsing program text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Whether to treat `;` as the start of a comment running to end of line
    pub handle_comments: bool,
    /// Maximum list nesting, counting the implicit outer program list
    pub max_depth: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            handle_comments: false,
            max_depth: DEFAULT_MAX_PARSE_DEPTH,
        }
    }
}

/// Recursive-descent reader over a token stream, one token of lookahead
struct TokenReader<'a> {
    tokens: Peekable<std::vec::IntoIter<Token<'a>>>,
    max_depth: usize,
}

impl TokenReader<'_> {
    fn read_expression(&mut self, depth: usize) -> Result<Expression, ParseError> {
        match self.tokens.next() {
            None => Err(ParseError::UnexpectedEndOfInput),
            Some(Token::Close) => Err(ParseError::UnmatchedCloseParen),
            Some(Token::Atom(text)) => parse_atom(text),
            Some(Token::Open) => {
                if depth >= self.max_depth {
                    return Err(ParseError::TooDeeplyNested {
                        max_depth: self.max_depth,
                    });
                }
                let mut elements = Vec::new();
                loop {
                    match self.tokens.peek() {
                        None => return Err(ParseError::UnexpectedEndOfInput),
                        Some(Token::Close) => {
                            self.tokens.next();
                            return Ok(Expression::List(elements));
                        }
                        Some(_) => elements.push(self.read_expression(depth + 1)?),
                    }
                }
            }
        }
    }

    /// Read top-level expressions until the tokens run out.
    /// The program counts as the outermost nesting level.
    fn read_program(&mut self) -> Result<Vec<Expression>, ParseError> {
        if self.max_depth == 0 {
            return Err(ParseError::TooDeeplyNested { max_depth: 0 });
        }
        let mut program = Vec::new();
        loop {
            match self.tokens.peek() {
                None => return Ok(program),
                Some(Token::Close) => return Err(ParseError::UnmatchedCloseParen),
                Some(_) => program.push(self.read_expression(1)?),
            }
        }
    }
}

/// Integers first; anything that is not an integer is a symbol
fn parse_atom(text: &str) -> Result<Expression, ParseError> {
    match text.parse::<NumberType>() {
        Ok(n) => Ok(Expression::Number(n)),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                Err(ParseError::IntegerOutOfRange(text.to_owned()))
            }
            _ => Ok(Expression::Symbol(text.to_owned())),
        },
    }
}

/// Parse program text into its sequence of top-level expressions.
///
/// The whole text is read as the contents of one implicit outer list, so
/// `"(define x 1) (print-num x)"` yields two expressions and a bare atom such
/// as `"x"` yields a single symbol.
pub fn parse_program(input: &str) -> Result<Vec<Expression>, ParseError> {
    parse_program_with_config(input, ParseConfig::default())
}

/// Parse program text with explicit configuration
pub fn parse_program_with_config(
    input: &str,
    config: ParseConfig,
) -> Result<Vec<Expression>, ParseError> {
    let tokens = tokenize(input, config.handle_comments)?;
    let mut reader = TokenReader {
        tokens: tokens.into_iter().peekable(),
        max_depth: config.max_depth,
    };
    reader.read_program()
}
