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

//! This crate implements arithmetic expansion.
//!
//! The [`eval`] function evaluates the text of an arithmetic expansion,
//! optionally wrapped in `$((...))` or `$[...]`. Expressions use signed
//! 64-bit integers and the operators of the C language except the
//! conditional operator `?:`. Variables are accessed through the [`Env`]
//! trait.
//!
//! ```
//! # use lsh_arith::{eval, Value};
//! # use std::collections::HashMap;
//! let mut env = HashMap::new();
//! assert_eq!(eval("$(( x = 2 + 3 * 4 ))", &mut env), Ok(Value::Integer(14)));
//! assert_eq!(env["x"], "14");
//! ```

use std::borrow::Cow;
use std::fmt::Display;
use std::ops::Range;
use thiserror::Error;

mod env;
mod eval;
mod op;
mod token;

pub use env::Env;
pub use token::TokenError;
pub use token::parse_number;

use eval::Context;
use token::{find_closing_bracket, find_closing_parens};

/// Result of arithmetic expansion
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Value {
    Integer(i64),
    /// Value of a variable that is not a number
    ///
    /// An expression consisting of a single variable whose value cannot be
    /// parsed as a number expands to the value itself.
    Text(String),
}

impl Value {
    /// Returns the exit status corresponding to the truth of the value.
    ///
    /// A non-zero integer or a text is true, which yields 0. Zero yields 1.
    #[must_use]
    pub fn exit_status(&self) -> i32 {
        match self {
            Value::Integer(0) => 1,
            Value::Integer(_) | Value::Text(_) => 0,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(i) => i.fmt(f),
            Value::Text(s) => s.fmt(f),
        }
    }
}

/// Bounds on the resources used by an evaluation
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Limits {
    /// Maximum number of items on each of the operator and operand stacks
    pub stack_depth: usize,
    /// Maximum depth of nested expressions
    ///
    /// Both `$((...))` inside an expression and a variable whose value is an
    /// expression count as a nesting level.
    pub nesting_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            stack_depth: 64,
            nesting_depth: 32,
        }
    }
}

/// Cause of an arithmetic expansion error
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum ErrorCause<G, A> {
    /// Error in tokenization
    #[error(transparent)]
    TokenError(#[from] TokenError),
    /// A variable value that is not a valid expression
    #[error("variable value {0:?} is not a valid expression")]
    InvalidVariableValue(String),
    /// `(` without `)` or vice versa
    #[error("missing matching parenthesis")]
    UnmatchedParenthesis,
    /// An operator lacks an operand.
    #[error("missing operand")]
    MissingOperand,
    /// Operands are not separated by an operator.
    #[error("malformed expression")]
    MalformedExpression,
    /// The operator or operand stack is full.
    #[error("expression too complex")]
    StackOverflow,
    /// Too many levels of nested expressions
    #[error("expression nested too deeply")]
    NestingTooDeep,
    /// Result out of bounds
    #[error("overflow")]
    Overflow,
    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,
    /// Bit-shifting with a negative right-hand-side operand
    #[error("negative shift count")]
    ReverseShifting,
    /// Assignment or increment applied to something other than a variable
    #[error("assignment to a non-variable")]
    AssignmentToValue,
    /// Error getting a variable value
    #[error("{0}")]
    GetVariableError(G),
    /// Error assigning a variable value
    #[error("{0}")]
    AssignVariableError(A),
    /// Command substitution tried in place of an invalid expression failed.
    #[error("command substitution failed: {0}")]
    CommandSubstitution(String),
}

impl<G, A> ErrorCause<G, A> {
    /// Tests whether the error comes from the syntax of the expression rather
    /// than from evaluating it.
    #[must_use]
    pub fn is_syntax_error(&self) -> bool {
        use ErrorCause::*;
        matches!(
            self,
            TokenError(_)
                | UnmatchedParenthesis
                | MissingOperand
                | MalformedExpression
                | AssignmentToValue
        )
    }
}

/// Description of an error that occurred during expansion
///
/// The location is relative to the expression with its `$((...))` or
/// `$[...]` envelope removed and, if word expansion was performed, to the
/// expanded text.
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
#[error("{cause}")]
pub struct Error<G, A> {
    /// Cause of the error
    pub cause: ErrorCause<G, A>,
    /// Range of the substring in the evaluated expression string where the error occurred
    pub location: Range<usize>,
}

impl<G, A> From<token::Error> for Error<G, A> {
    fn from(e: token::Error) -> Self {
        Error {
            cause: e.cause.into(),
            location: e.location,
        }
    }
}

/// Error type of evaluation in the environment `E`
pub type EnvError<E> = Error<<E as Env>::GetVariableError, <E as Env>::AssignVariableError>;

/// Removes a `$((...))` or `$[...]` enclosing the whole expression.
fn strip_envelope(expression: &str) -> &str {
    let trimmed = expression.trim();
    if let Some(inner) = trimmed.strip_prefix("$((") {
        if find_closing_parens(inner) == Some(inner.len().wrapping_sub(2)) {
            return &inner[..inner.len() - 2];
        }
    } else if let Some(inner) = trimmed.strip_prefix("$[") {
        if find_closing_bracket(inner) == Some(inner.len().wrapping_sub(1)) {
            return &inner[..inner.len() - 1];
        }
    }
    expression
}

/// Tests whether the expression contains quotes or command substitutions.
fn needs_word_expansion(text: &str) -> bool {
    text.contains(['\'', '"', '`', '\\'])
        || text
            .match_indices("$(")
            .any(|(index, _)| !text[index + 2..].starts_with('('))
}

/// Performs arithmetic expansion with the default [`Limits`].
pub fn eval<E: Env>(expression: &str, env: &mut E) -> Result<Value, EnvError<E>> {
    eval_with_limits(expression, env, Limits::default())
}

/// Performs arithmetic expansion.
///
/// The expression may be wrapped in `$((...))` or `$[...]`. If it contains
/// quotes or command substitutions, it is first passed to
/// [`Env::expand_word`].
///
/// If the expression contains a character that cannot start any token, the
/// whole `expression` is passed to [`Env::substitute_command`] and its output
/// becomes the result. The original error is returned only if command
/// substitution is not available.
///
/// On success, the exit status of the environment is set to 0 if the result
/// is true (non-zero) and 1 otherwise.
pub fn eval_with_limits<E: Env>(
    expression: &str,
    env: &mut E,
    limits: Limits,
) -> Result<Value, EnvError<E>> {
    tracing::trace!(expression, "evaluating arithmetic expression");

    let stripped = strip_envelope(expression);
    let source = if needs_word_expansion(stripped) {
        env.expand_word(stripped)
            .map_or(Cow::Borrowed(stripped), Cow::Owned)
    } else {
        Cow::Borrowed(stripped)
    };

    let mut context = Context::new(&source, env, limits, 0);
    let result = match context.run() {
        Ok(None) => Ok(Value::Integer(0)),
        Ok(Some(item)) => context.result(item),
        Err(error) => Err(error),
    };

    match result {
        Ok(value) => {
            env.set_exit_status(value.exit_status());
            Ok(value)
        }
        Err(error)
            if matches!(
                error.cause,
                ErrorCause::TokenError(TokenError::InvalidCharacter)
            ) =>
        {
            match env.substitute_command(expression) {
                None => Err(error),
                Some(Ok(output)) => {
                    tracing::debug!(expression, "evaluated as command substitution");
                    Ok(Value::Text(output))
                }
                Some(Err(message)) => Err(Error {
                    cause: ErrorCause::CommandSubstitution(message),
                    location: 0..expression.len(),
                }),
            }
        }
        Err(error) => Err(error),
    }
}

/// Evaluates an expression into an integer.
///
/// Unlike [`eval`], this function takes the bare expression, never falls
/// back to command substitution, does not change the exit status, and
/// dereferences a final variable regardless of its value. It is meant for
/// coercing values assigned to integer variables.
pub fn eval_integer<E: Env>(expression: &str, env: &mut E) -> Result<i64, EnvError<E>> {
    Context::new(expression, env, Limits::default(), 0).evaluate_integer()
}
