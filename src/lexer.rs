//! Tokenizer: splits source text into parentheses and atoms.
//!
//! `(` and `)` are always standalone tokens; every other maximal run of
//! non-whitespace, non-parenthesis characters is an atom. Nothing is validated
//! here: unbalanced input is the parser's concern.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::char,
    combinator::{map, value},
};

use crate::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Open,
    Close,
    Atom(&'a str),
}

fn is_atom_char(c: char, handle_comments: bool) -> bool {
    !(c.is_whitespace() || c == '(' || c == ')' || (handle_comments && c == ';'))
}

/// Skip whitespace and, when enabled, `;` comments running to the end of the line
fn separators(input: &str, handle_comments: bool) -> IResult<&str, ()> {
    let mut input = input;
    loop {
        let (rest, _) = take_while(char::is_whitespace).parse(input)?;
        if handle_comments && rest.starts_with(';') {
            let (rest, _) = take_while(|c: char| c != '\n').parse(rest)?;
            input = rest;
        } else {
            return Ok((rest, ()));
        }
    }
}

fn token(input: &str, handle_comments: bool) -> IResult<&str, Token<'_>> {
    alt((
        value(Token::Open, char('(')),
        value(Token::Close, char(')')),
        map(
            take_while1(move |c: char| is_atom_char(c, handle_comments)),
            Token::Atom,
        ),
    ))
    .parse(input)
}

/// Convert source text into a flat token sequence.
pub fn tokenize(input: &str, handle_comments: bool) -> Result<Vec<Token<'_>>, ParseError> {
    let offset_of = |rest: &str| input.len() - rest.len();
    let mut tokens = Vec::new();
    let mut rest = input;

    loop {
        let (after, ()) = separators(rest, handle_comments).map_err(|_| ParseError::Lex {
            offset: offset_of(rest),
        })?;
        if after.is_empty() {
            return Ok(tokens);
        }
        let (after, tok) = token(after, handle_comments).map_err(|_| ParseError::Lex {
            offset: offset_of(after),
        })?;
        tokens.push(tok);
        rest = after;
    }
}
