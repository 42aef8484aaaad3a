//! Command chain parsing.
//!
//! Turns raw command text into a [`CommandChain`], handling:
//! - Chained commands (`&&`, `;`, newline, `|`)
//! - Single and double quotes, backslash escapes
//! - Rejection of constructs the approval engine does not model
//!   (redirection, subshells, command substitution, background jobs, `||`)

use thiserror::Error;

use super::model::{ChainOperator, CommandChain, CommandSegment};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("empty command segment at position {0}")]
    EmptySegment(usize),

    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),

    #[error("redirection is not supported")]
    Redirection,

    #[error("subshells are not supported")]
    Subshell,

    #[error("command substitution is not supported")]
    CommandSubstitution,

    #[error("background jobs are not supported")]
    Background,

    #[error("operator '{0}' is not supported")]
    UnsupportedOperator(String),

    #[error("chains mixing '{0}' and '{1}' are not supported")]
    MixedOperators(&'static str, &'static str),

    #[error("could not tokenize segment: {0}")]
    Tokenize(String),
}

/// Parse command text into a chain of segments.
///
/// For `cd /app && mix test` this yields an `And` chain of two segments.
/// A single command yields an `And` chain of one segment. The trimmed source
/// text becomes the chain description.
pub fn parse_chain(command: &str) -> Result<CommandChain, ParseError> {
    let trimmed = command.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let (parts, operator) = split_on_operators(trimmed)?;
    let segments = parts
        .iter()
        .enumerate()
        .map(|(idx, part)| parse_segment(idx, part))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CommandChain::new(
        operator.unwrap_or(ChainOperator::And),
        segments,
        trimmed,
    ))
}

/// Tokenize one segment into program + args.
fn parse_segment(idx: usize, text: &str) -> Result<CommandSegment, ParseError> {
    let mut words =
        shlex::split(text).ok_or_else(|| ParseError::Tokenize(text.trim().to_string()))?;
    if words.is_empty() {
        return Err(ParseError::EmptySegment(idx));
    }
    let program = words.remove(0);
    Ok(CommandSegment::new(program, words))
}

/// Split on top-level operators, ignoring anything inside quotes.
fn split_on_operators(command: &str) -> Result<(Vec<&str>, Option<ChainOperator>), ParseError> {
    let chars: Vec<(usize, char)> = command.char_indices().collect();
    let mut parts = Vec::new();
    let mut operator: Option<ChainOperator> = None;
    let mut quote: Option<char> = None;
    let mut current_start = 0;
    let mut i = 0;

    let peek = |i: usize| chars.get(i + 1).map(|(_, c)| *c);

    while i < chars.len() {
        let (pos, c) = chars[i];

        match quote {
            Some('\'') => {
                if c == '\'' {
                    quote = None;
                }
                i += 1;
                continue;
            }
            Some(_) => {
                match c {
                    '\\' => {
                        i += 2;
                        continue;
                    }
                    '"' => quote = None,
                    '`' => return Err(ParseError::CommandSubstitution),
                    '$' if peek(i) == Some('(') => return Err(ParseError::CommandSubstitution),
                    _ => {}
                }
                i += 1;
                continue;
            }
            None => {}
        }

        let found = match c {
            '\\' => {
                i += 2;
                continue;
            }
            '\'' | '"' => {
                quote = Some(c);
                None
            }
            '`' => return Err(ParseError::CommandSubstitution),
            '$' if peek(i) == Some('(') => return Err(ParseError::CommandSubstitution),
            '(' | ')' => return Err(ParseError::Subshell),
            '<' | '>' => return Err(ParseError::Redirection),
            '&' if peek(i) == Some('&') => Some((ChainOperator::And, 2)),
            '&' => return Err(ParseError::Background),
            '|' if peek(i) == Some('|') => {
                return Err(ParseError::UnsupportedOperator("||".to_string()))
            }
            '|' => Some((ChainOperator::Pipe, 1)),
            ';' | '\n' => Some((ChainOperator::Sequence, 1)),
            _ => None,
        };

        if let Some((op, width)) = found {
            if let Some(existing) = operator {
                if existing != op {
                    return Err(ParseError::MixedOperators(existing.as_str(), op.as_str()));
                }
            }
            operator = Some(op);

            let part = &command[current_start..pos];
            if part.trim().is_empty() {
                return Err(ParseError::EmptySegment(parts.len()));
            }
            parts.push(part);

            i += width;
            current_start = chars.get(i).map(|(p, _)| *p).unwrap_or(command.len());
            continue;
        }

        i += 1;
    }

    if let Some(q) = quote {
        return Err(ParseError::UnterminatedQuote(q));
    }

    let last = &command[current_start.min(command.len())..];
    if !last.trim().is_empty() {
        parts.push(last);
    } else if operator != Some(ChainOperator::Sequence) || parts.is_empty() {
        // A trailing `;` is harmless; a trailing `&&` or `|` is not.
        return Err(ParseError::EmptySegment(parts.len()));
    }

    Ok((parts, operator))
}
