// This file is part of lsh, an extended POSIX shell.
// Copyright (C) 2024 The lsh authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Tokenization

use std::ops::Range;
use thiserror::Error;

/// Operator as it appears in the source
///
/// The same lexeme may stand for different operators depending on the
/// context (e.g. unary and binary `-`). That is resolved by the evaluator.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operator {
    /// `,`
    Comma,
    /// `|`
    Bar,
    /// `||`
    BarBar,
    /// `|=`
    BarEqual,
    /// `^`
    Caret,
    /// `^=`
    CaretEqual,
    /// `&`
    And,
    /// `&&`
    AndAnd,
    /// `&=`
    AndEqual,
    /// `=`
    Equal,
    /// `==`
    EqualEqual,
    /// `!`
    Bang,
    /// `!=`
    BangEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `<<`
    LessLess,
    /// `<<=`
    LessLessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `>>`
    GreaterGreater,
    /// `>>=`
    GreaterGreaterEqual,
    /// `+`
    Plus,
    /// `++`
    PlusPlus,
    /// `+=`
    PlusEqual,
    /// `-`
    Minus,
    /// `--`
    MinusMinus,
    /// `-=`
    MinusEqual,
    /// `*`
    Asterisk,
    /// `**`
    AsteriskAsterisk,
    /// `*=`
    AsteriskEqual,
    /// `/`
    Slash,
    /// `/=`
    SlashEqual,
    /// `%`
    Percent,
    /// `%=`
    PercentEqual,
    /// `~`
    Tilde,
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
}

/// Value of a token
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum TokenValue<'a> {
    /// Integer constant
    Integer(i64),
    /// Variable reference
    ///
    /// The name does not include the `$` sign or braces.
    Variable(&'a str),
    /// Nested `$((...))` or `$[...]`
    Nested {
        /// Expression between the delimiters
        expression: &'a str,
        /// Index of the first byte of `expression` in the tokenized source
        offset: usize,
    },
    /// Operator
    Operator(Operator),
}

/// Atomic lexical element of an expression
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Token<'a> {
    pub value: TokenValue<'a>,
    /// Range of the substring where the token occurs in the parsed expression
    pub location: Range<usize>,
}

/// Cause of a tokenization error
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum TokenError {
    /// A value token contains an invalid character.
    #[error("invalid numeric constant")]
    InvalidNumericConstant,
    /// An expression contains a character that is not a whitespace, number,
    /// name, or operator.
    #[error("invalid character")]
    InvalidCharacter,
    /// A nested `$((` or `$[` is not closed.
    #[error("unclosed nested expression")]
    UnclosedExpansion,
}

/// Description of an error that occurred during tokenization
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Error {
    /// Cause of the error
    pub cause: TokenError,
    /// Range of the substring in the evaluated expression string where the error occurred
    pub location: Range<usize>,
}

/// List of all the operators.
///
/// If a prefix of a valid operator is another operator, the prefix (the shorter
/// operator) must appear after the longer. With this ordering, we can
/// short-circuit unnecessary matching on finding a first match.
const OPERATORS: &[(&str, Operator)] = &[
    (",", Operator::Comma),
    ("|=", Operator::BarEqual),
    ("||", Operator::BarBar),
    ("|", Operator::Bar),
    ("^=", Operator::CaretEqual),
    ("^", Operator::Caret),
    ("&=", Operator::AndEqual),
    ("&&", Operator::AndAnd),
    ("&", Operator::And),
    ("==", Operator::EqualEqual),
    ("=", Operator::Equal),
    ("!=", Operator::BangEqual),
    ("<=", Operator::LessEqual),
    ("<<=", Operator::LessLessEqual),
    ("<<", Operator::LessLess),
    ("<", Operator::Less),
    (">=", Operator::GreaterEqual),
    (">>=", Operator::GreaterGreaterEqual),
    (">>", Operator::GreaterGreater),
    (">", Operator::Greater),
    ("+=", Operator::PlusEqual),
    ("++", Operator::PlusPlus),
    ("+", Operator::Plus),
    ("-=", Operator::MinusEqual),
    ("--", Operator::MinusMinus),
    ("-", Operator::Minus),
    ("**", Operator::AsteriskAsterisk),
    ("*=", Operator::AsteriskEqual),
    ("*", Operator::Asterisk),
    ("/=", Operator::SlashEqual),
    ("/", Operator::Slash),
    ("%=", Operator::PercentEqual),
    ("%", Operator::Percent),
    ("~", Operator::Tilde),
    ("!", Operator::Bang),
    ("(", Operator::OpenParen),
    (")", Operator::CloseParen),
];

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Tests whether the character names a single-character special parameter.
fn is_special_parameter(c: char) -> bool {
    matches!(c, '@' | '*' | '#' | '?' | '-' | '$' | '!') || c.is_ascii_digit()
}

/// Tests whether the string can appear between `${` and `}`.
fn is_parameter_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        None => false,
        Some(c) if c.is_ascii_digit() => name.bytes().all(|b| b.is_ascii_digit()),
        Some(c) if is_special_parameter(c) => chars.next().is_none(),
        Some(c) => (c.is_ascii_alphabetic() || c == '_') && chars.all(is_name_char),
    }
}

/// Returns the length of the leading run of name characters.
fn name_len(s: &str) -> usize {
    s.len() - s.trim_start_matches(is_name_char).len()
}

/// Tests whether a `++` or `--` at `index` in `source` is a postfix operator.
///
/// The operator is postfix if the preceding non-blank character can end a
/// name or a parameter expansion.
pub(crate) fn is_postfix_position(source: &str, index: usize) -> bool {
    source[..index]
        .trim_end()
        .chars()
        .next_back()
        .is_some_and(|c| is_name_char(c) || matches!(c, '}' | '@' | '#' | '?' | '$'))
}

/// Finds the `))` that closes a `$((`.
///
/// `s` is the text following the `$((`. Returns the index of the first `)` of
/// the closing `))`, or `None` if the parentheses do not balance that way.
pub(crate) fn find_closing_parens(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0_usize;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' if depth == 0 => return (bytes.get(i + 1) == Some(&b')')).then_some(i),
            b')' => depth -= 1,
            _ => (),
        }
    }
    None
}

/// Finds the `]` that closes a `$[`.
pub(crate) fn find_closing_bracket(s: &str) -> Option<usize> {
    let mut depth = 0_usize;
    for (i, b) in s.bytes().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' if depth == 0 => return Some(i),
            b']' => depth -= 1,
            _ => (),
        }
    }
    None
}

/// Returns the value of a digit symbol in a `base#digits` constant.
///
/// For bases up to 36, letters are case-insensitive. For larger bases,
/// lower-case letters are 10 to 35, upper-case letters 36 to 61, `@` is 62,
/// and `_` is 63.
fn digit_value(c: char, base: u32) -> Option<u32> {
    match c {
        '0'..='9' => Some(c as u32 - '0' as u32),
        'a'..='z' => Some(c as u32 - 'a' as u32 + 10),
        'A'..='Z' if base <= 36 => Some(c as u32 - 'A' as u32 + 10),
        'A'..='Z' => Some(c as u32 - 'A' as u32 + 36),
        '@' => Some(62),
        '_' => Some(63),
        _ => None,
    }
}

fn from_radix(digits: &str, radix: u32) -> Option<i64> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    i64::from_str_radix(digits, radix).ok()
}

fn parse_unsigned(s: &str) -> Option<i64> {
    if let Some((base, digits)) = s.split_once('#') {
        if base.is_empty() || !base.bytes().all(|b| b.is_ascii_digit()) || digits.is_empty() {
            return None;
        }
        let base: u32 = base.parse().ok()?;
        if !(2..=64).contains(&base) {
            return None;
        }
        digits.chars().try_fold(0_i64, |acc, c| {
            let digit = digit_value(c, base).filter(|&d| d < base)?;
            acc.checked_mul(base.into())?.checked_add(digit.into())
        })
    } else if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        from_radix(hex, 16)
    } else if let Some(binary) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        from_radix(binary, 2)
    } else if let Some(octal) = s.strip_prefix('0').filter(|rest| !rest.is_empty()) {
        from_radix(octal, 8)
    } else {
        from_radix(s, 10)
    }
}

/// Parses an integer constant.
///
/// Accepts decimal, `0x` hexadecimal, `0b` binary, leading-zero octal, and
/// `base#digits` constants with an optional leading sign. Returns `None` if
/// the string is not such a constant or the value does not fit in `i64`.
///
/// ```
/// # use lsh_arith::parse_number;
/// assert_eq!(parse_number("42"), Some(42));
/// assert_eq!(parse_number("0x1F"), Some(31));
/// assert_eq!(parse_number("017"), Some(15));
/// assert_eq!(parse_number("-2#101"), Some(-5));
/// assert_eq!(parse_number("abc"), None);
/// ```
pub fn parse_number(s: &str) -> Option<i64> {
    if let Some(magnitude) = s.strip_prefix('-') {
        parse_unsigned(magnitude)?.checked_neg()
    } else {
        parse_unsigned(s.strip_prefix('+').unwrap_or(s))
    }
}

type Lexed<'a> = Result<(TokenValue<'a>, usize), (TokenError, usize)>;

/// Lexes a token starting with `$`.
fn lex_dollar(source: &str, start: usize) -> Lexed<'_> {
    let rest = &source[1..];
    if let Some(inner) = rest.strip_prefix("((") {
        return match find_closing_parens(inner) {
            Some(end) => Ok((
                TokenValue::Nested {
                    expression: &inner[..end],
                    offset: start + 3,
                },
                end + 5,
            )),
            None => Err((TokenError::UnclosedExpansion, source.len())),
        };
    }
    if let Some(inner) = rest.strip_prefix('[') {
        return match find_closing_bracket(inner) {
            Some(end) => Ok((
                TokenValue::Nested {
                    expression: &inner[..end],
                    offset: start + 2,
                },
                end + 3,
            )),
            None => Err((TokenError::UnclosedExpansion, source.len())),
        };
    }
    if let Some(inner) = rest.strip_prefix('{') {
        return match inner.find('}') {
            Some(end) if is_parameter_name(&inner[..end]) => {
                Ok((TokenValue::Variable(&inner[..end]), end + 3))
            }
            _ => Err((TokenError::InvalidCharacter, 1)),
        };
    }
    match rest.chars().next() {
        Some(c) if is_special_parameter(c) => Ok((TokenValue::Variable(&rest[..1]), 2)),
        Some(c) if is_name_char(c) => {
            let len = name_len(rest);
            Ok((TokenValue::Variable(&rest[..len]), len + 1))
        }
        _ => Err((TokenError::InvalidCharacter, 1)),
    }
}

/// Lexes a constant or a bare variable name.
fn lex_term(source: &str) -> Lexed<'_> {
    let Some(first_char) = source.chars().next() else {
        return Err((TokenError::InvalidCharacter, 0));
    };
    let mut len = name_len(source);
    if first_char.is_ascii_digit() {
        if source[..len].bytes().all(|b| b.is_ascii_digit()) && source[len..].starts_with('#') {
            let digits = &source[len + 1..];
            let digits_len = digits.len()
                - digits
                    .trim_start_matches(|c: char| is_name_char(c) || c == '@')
                    .len();
            len += 1 + digits_len;
        }
        match parse_unsigned(&source[..len]) {
            Some(i) => Ok((TokenValue::Integer(i), len)),
            None => Err((TokenError::InvalidNumericConstant, len)),
        }
    } else if len > 0 {
        Ok((TokenValue::Variable(&source[..len]), len))
    } else {
        Err((TokenError::InvalidCharacter, first_char.len_utf8()))
    }
}

/// Iterator extracting tokens from a string
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Tokens<'a> {
    source: &'a str,
    index: usize,
}

impl<'a> Tokens<'a> {
    /// Creates a tokenizer.
    pub fn new(source: &'a str) -> Self {
        Tokens { source, index: 0 }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<Token<'a>, Error>;

    fn next(&mut self) -> Option<Result<Token<'a>, Error>> {
        let source = self.source[self.index..].trim_start();
        let start = self.source.len() - source.len();
        if source.is_empty() {
            self.index = start;
            return None;
        }

        let lexed = if source.starts_with('$') {
            lex_dollar(source, start)
        } else if let Some(&(lexeme, operator)) = OPERATORS
            .iter()
            .find(|&&(lexeme, _)| source.starts_with(lexeme))
        {
            Ok((TokenValue::Operator(operator), lexeme.len()))
        } else {
            lex_term(source)
        };

        Some(match lexed {
            Ok((value, len)) => {
                self.index = start + len;
                Ok(Token {
                    value,
                    location: start..start + len,
                })
            }
            Err((cause, len)) => {
                // Tokenization does not resume after an error.
                self.index = self.source.len();
                Err(Error {
                    cause,
                    location: start..start + len,
                })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(source: &str) -> Option<Result<TokenValue<'_>, Error>> {
        Tokens::new(source)
            .next()
            .map(|result| result.map(|token| token.value))
    }

    #[test]
    fn decimal_integer_constants() {
        assert_eq!(first("1"), Some(Ok(TokenValue::Integer(1))));
        assert_eq!(first("42"), Some(Ok(TokenValue::Integer(42))));
    }

    #[test]
    fn invalid_digit_in_decimal_constant() {
        assert_eq!(
            Tokens::new("1a").next(),
            Some(Err(Error {
                cause: TokenError::InvalidNumericConstant,
                location: 0..2,
            }))
        );
        assert_eq!(
            Tokens::new("  123_456 ").next(),
            Some(Err(Error {
                cause: TokenError::InvalidNumericConstant,
                location: 2..9,
            }))
        );
    }

    #[test]
    fn prefixed_integer_constants() {
        assert_eq!(first("0"), Some(Ok(TokenValue::Integer(0))));
        assert_eq!(first("017"), Some(Ok(TokenValue::Integer(0o17))));
        assert_eq!(first("0xff"), Some(Ok(TokenValue::Integer(255))));
        assert_eq!(first("0XFF"), Some(Ok(TokenValue::Integer(255))));
        assert_eq!(first("0b101"), Some(Ok(TokenValue::Integer(5))));
        assert_eq!(first("0B11"), Some(Ok(TokenValue::Integer(3))));
    }

    #[test]
    fn invalid_prefixed_constants() {
        assert_eq!(
            first("08"),
            Some(Err(Error {
                cause: TokenError::InvalidNumericConstant,
                location: 0..2,
            }))
        );
        assert_eq!(
            first("0x"),
            Some(Err(Error {
                cause: TokenError::InvalidNumericConstant,
                location: 0..2,
            }))
        );
        assert_eq!(
            first("0b12"),
            Some(Err(Error {
                cause: TokenError::InvalidNumericConstant,
                location: 0..4,
            }))
        );
    }

    #[test]
    fn arbitrary_base_constants() {
        assert_eq!(first("8#17"), Some(Ok(TokenValue::Integer(15))));
        assert_eq!(first("2#1010"), Some(Ok(TokenValue::Integer(10))));
        assert_eq!(first("16#fF"), Some(Ok(TokenValue::Integer(255))));
        assert_eq!(first("36#z"), Some(Ok(TokenValue::Integer(35))));
        assert_eq!(first("64#A"), Some(Ok(TokenValue::Integer(36))));
        assert_eq!(first("64#@"), Some(Ok(TokenValue::Integer(62))));
        assert_eq!(first("64#_"), Some(Ok(TokenValue::Integer(63))));
        assert_eq!(first("64#10"), Some(Ok(TokenValue::Integer(64))));
    }

    #[test]
    fn invalid_arbitrary_base_constants() {
        assert_eq!(
            first("1#0"),
            Some(Err(Error {
                cause: TokenError::InvalidNumericConstant,
                location: 0..3,
            }))
        );
        assert_eq!(
            first("65#1"),
            Some(Err(Error {
                cause: TokenError::InvalidNumericConstant,
                location: 0..4,
            }))
        );
        assert_eq!(
            first("8#8"),
            Some(Err(Error {
                cause: TokenError::InvalidNumericConstant,
                location: 0..3,
            }))
        );
        assert_eq!(
            first("2# 1"),
            Some(Err(Error {
                cause: TokenError::InvalidNumericConstant,
                location: 0..2,
            }))
        );
    }

    #[test]
    fn too_large_constant() {
        assert_eq!(
            first("9223372036854775808"),
            Some(Err(Error {
                cause: TokenError::InvalidNumericConstant,
                location: 0..19,
            }))
        );
        assert_eq!(
            first("9223372036854775807"),
            Some(Ok(TokenValue::Integer(i64::MAX)))
        );
    }

    #[test]
    fn bare_variables() {
        assert_eq!(first("abc"), Some(Ok(TokenValue::Variable("abc"))));
        assert_eq!(first("foo_BAR"), Some(Ok(TokenValue::Variable("foo_BAR"))));
        assert_eq!(
            Tokens::new(" _var").next(),
            Some(Ok(Token {
                value: TokenValue::Variable("_var"),
                location: 1..5,
            }))
        );
    }

    #[test]
    fn dollar_variables() {
        assert_eq!(
            Tokens::new("$foo+").next(),
            Some(Ok(Token {
                value: TokenValue::Variable("foo"),
                location: 0..4,
            }))
        );
        assert_eq!(
            Tokens::new(" ${bar}").next(),
            Some(Ok(Token {
                value: TokenValue::Variable("bar"),
                location: 1..7,
            }))
        );
        assert_eq!(first("${10}"), Some(Ok(TokenValue::Variable("10"))));
        assert_eq!(first("$12"), Some(Ok(TokenValue::Variable("1"))));
        assert_eq!(first("$#"), Some(Ok(TokenValue::Variable("#"))));
        assert_eq!(first("$?"), Some(Ok(TokenValue::Variable("?"))));
        assert_eq!(first("$$"), Some(Ok(TokenValue::Variable("$"))));
    }

    #[test]
    fn invalid_dollar() {
        assert_eq!(
            first("$"),
            Some(Err(Error {
                cause: TokenError::InvalidCharacter,
                location: 0..1,
            }))
        );
        assert_eq!(
            first("${a b}"),
            Some(Err(Error {
                cause: TokenError::InvalidCharacter,
                location: 0..1,
            }))
        );
        assert_eq!(
            first("$(echo)"),
            Some(Err(Error {
                cause: TokenError::InvalidCharacter,
                location: 0..1,
            }))
        );
    }

    #[test]
    fn nested_expressions() {
        assert_eq!(
            Tokens::new(" $((1 + (2)))+").next(),
            Some(Ok(Token {
                value: TokenValue::Nested {
                    expression: "1 + (2)",
                    offset: 4,
                },
                location: 1..13,
            }))
        );
        assert_eq!(
            Tokens::new("$[a[1]]").next(),
            Some(Ok(Token {
                value: TokenValue::Nested {
                    expression: "a[1]",
                    offset: 2,
                },
                location: 0..7,
            }))
        );
        assert_eq!(
            first("$((1)"),
            Some(Err(Error {
                cause: TokenError::UnclosedExpansion,
                location: 0..5,
            }))
        );
    }

    #[test]
    fn operators_longest_match_first() {
        let operators: Vec<_> = Tokens::new("<<= << < ** *= * ,")
            .map(|token| token.map(|token| token.value))
            .collect();
        assert_eq!(
            operators,
            [
                Ok(TokenValue::Operator(Operator::LessLessEqual)),
                Ok(TokenValue::Operator(Operator::LessLess)),
                Ok(TokenValue::Operator(Operator::Less)),
                Ok(TokenValue::Operator(Operator::AsteriskAsterisk)),
                Ok(TokenValue::Operator(Operator::AsteriskEqual)),
                Ok(TokenValue::Operator(Operator::Asterisk)),
                Ok(TokenValue::Operator(Operator::Comma)),
            ]
        );
    }

    #[test]
    fn adjacent_operators() {
        let tokens: Vec<_> = Tokens::new("x+++y").map(Result::unwrap).collect();
        assert_eq!(
            tokens,
            [
                Token {
                    value: TokenValue::Variable("x"),
                    location: 0..1,
                },
                Token {
                    value: TokenValue::Operator(Operator::PlusPlus),
                    location: 1..3,
                },
                Token {
                    value: TokenValue::Operator(Operator::Plus),
                    location: 3..4,
                },
                Token {
                    value: TokenValue::Variable("y"),
                    location: 4..5,
                },
            ]
        );
    }

    #[test]
    fn invalid_character_stops_tokenization() {
        let mut tokens = Tokens::new("1 ? 2");
        assert_eq!(
            tokens.next().map(|t| t.map(|t| t.value)),
            Some(Ok(TokenValue::Integer(1)))
        );
        assert_eq!(
            tokens.next(),
            Some(Err(Error {
                cause: TokenError::InvalidCharacter,
                location: 2..3,
            }))
        );
        assert_eq!(tokens.next(), None);
    }

    #[test]
    fn postfix_position() {
        assert!(is_postfix_position("x++", 1));
        assert!(is_postfix_position("x ++", 2));
        assert!(is_postfix_position("${x}++", 4));
        assert!(!is_postfix_position("++x", 0));
        assert!(!is_postfix_position("1+ ++x", 3));
        assert!(!is_postfix_position("(x)++", 3));
    }

    #[test]
    fn parse_number_with_sign() {
        assert_eq!(parse_number("-5"), Some(-5));
        assert_eq!(parse_number("+5"), Some(5));
        assert_eq!(parse_number("--5"), None);
        assert_eq!(parse_number("+-5"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number(" 5"), None);
    }
}
