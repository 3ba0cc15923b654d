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

//! Shunting-yard evaluation
//!
//! A [`Context`] owns the operator and operand stacks of one expression.
//! Nested expressions (`$((...))` and variable values that are expressions
//! themselves) are evaluated in a context of their own, so an error in a
//! nested expression can never leave the outer stacks half-reduced.

use crate::env::Env;
use crate::op::{Arity, Associativity, Tag};
use crate::token::{Operator, TokenValue, Tokens, is_postfix_position, parse_number};
use crate::{EnvError, Error, ErrorCause, Limits, Value};
use std::ops::Range;

/// Operand stack item
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub(crate) enum Item<'a> {
    Integer(i64),
    /// Variable that has not been dereferenced yet
    Variable {
        name: &'a str,
        location: Range<usize>,
    },
}

/// Operator stack item
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct Pending {
    tag: Tag,
    location: Range<usize>,
    /// Whether the operator is in the unevaluated operand of `&&` or `||`
    skip: bool,
}

fn error<G, A>(cause: ErrorCause<G, A>, location: Range<usize>) -> Error<G, A> {
    Error { cause, location }
}

fn unwrap_or_overflow<G, A>(result: Option<i64>, location: Range<usize>) -> Result<i64, Error<G, A>> {
    result.ok_or(Error {
        cause: ErrorCause::Overflow,
        location,
    })
}

fn shift_count<G, A>(rhs: i64, location: &Range<usize>) -> Result<u32, Error<G, A>> {
    if rhs < 0 {
        return Err(error(ErrorCause::ReverseShifting, location.clone()));
    }
    u32::try_from(rhs)
        .ok()
        .filter(|&count| count < i64::BITS)
        .ok_or_else(|| error(ErrorCause::Overflow, location.clone()))
}

fn power<G, A>(base: i64, exponent: i64, location: Range<usize>) -> Result<i64, Error<G, A>> {
    if exponent < 0 {
        return Ok(0);
    }
    match u32::try_from(exponent) {
        Ok(exponent) => unwrap_or_overflow(base.checked_pow(exponent), location),
        Err(_) => match base {
            0 | 1 => Ok(base),
            -1 => Ok(if exponent % 2 == 0 { 1 } else { -1 }),
            _ => Err(error(ErrorCause::Overflow, location)),
        },
    }
}

/// Applies a binary operator that has no side effects.
fn apply_pure<G, A>(tag: Tag, lhs: i64, rhs: i64, location: Range<usize>) -> Result<i64, Error<G, A>> {
    use Tag::*;
    Ok(match tag {
        BitOr => lhs | rhs,
        BitXor => lhs ^ rhs,
        BitAnd => lhs & rhs,
        Equal => (lhs == rhs).into(),
        NotEqual => (lhs != rhs).into(),
        Less => (lhs < rhs).into(),
        LessEqual => (lhs <= rhs).into(),
        Greater => (lhs > rhs).into(),
        GreaterEqual => (lhs >= rhs).into(),
        ShiftLeft => {
            let count = shift_count(rhs, &location)?;
            let result = lhs << count;
            if result >> count != lhs {
                return Err(error(ErrorCause::Overflow, location));
            }
            result
        }
        ShiftRight => lhs >> shift_count(rhs, &location)?,
        Add => unwrap_or_overflow(lhs.checked_add(rhs), location)?,
        Subtract => unwrap_or_overflow(lhs.checked_sub(rhs), location)?,
        Multiply => unwrap_or_overflow(lhs.checked_mul(rhs), location)?,
        Divide | Remainder if rhs == 0 => {
            return Err(error(ErrorCause::DivisionByZero, location));
        }
        Divide => unwrap_or_overflow(lhs.checked_div(rhs), location)?,
        Remainder => unwrap_or_overflow(lhs.checked_rem(rhs), location)?,
        Power => power(lhs, rhs, location)?,
        _ => unreachable!("not a pure binary operator: {}", tag.descriptor().symbol),
    })
}

/// State of evaluating one expression
pub(crate) struct Context<'a, 'e, E: Env> {
    source: &'a str,
    env: &'e mut E,
    limits: Limits,
    /// Number of enclosing contexts
    depth: usize,
    operators: Vec<Pending>,
    operands: Vec<Item<'a>>,
    /// Whether operators pushed now are in an unevaluated operand
    skip: bool,
}

impl<'a, 'e, E: Env> Context<'a, 'e, E> {
    pub fn new(source: &'a str, env: &'e mut E, limits: Limits, depth: usize) -> Self {
        Context {
            source,
            env,
            limits,
            depth,
            operators: Vec::new(),
            operands: Vec::new(),
            skip: false,
        }
    }

    /// Parses and reduces the whole source.
    ///
    /// Returns `None` if the source has no tokens. Otherwise, the returned
    /// item is the sole operand left after reduction, which may still be a
    /// variable.
    pub fn run(&mut self) -> Result<Option<Item<'a>>, EnvError<E>> {
        let mut expect_operand = true;
        for token in Tokens::new(self.source) {
            let token = token?;
            expect_operand = match token.value {
                TokenValue::Integer(i) => {
                    self.push_operand(Item::Integer(i), expect_operand, token.location)?;
                    false
                }
                TokenValue::Variable(name) => {
                    let item = Item::Variable {
                        name,
                        location: token.location.clone(),
                    };
                    self.push_operand(item, expect_operand, token.location)?;
                    false
                }
                TokenValue::Nested { expression, offset } => {
                    let value = if self.skip {
                        0
                    } else {
                        self.evaluate_nested(expression, offset, &token.location)?
                    };
                    self.push_operand(Item::Integer(value), expect_operand, token.location)?;
                    false
                }
                TokenValue::Operator(operator) => {
                    self.operator(operator, token.location, expect_operand)?
                }
            };
        }

        if expect_operand {
            return match self.operators.last() {
                None => Ok(None),
                Some(pending) => Err(error(ErrorCause::MissingOperand, pending.location.clone())),
            };
        }
        while let Some(pending) = self.operators.pop() {
            if pending.tag == Tag::OpenParen {
                return Err(error(ErrorCause::UnmatchedParenthesis, pending.location));
            }
            self.apply(pending)?;
        }
        if self.operands.len() != 1 {
            return Err(error(ErrorCause::MalformedExpression, 0..self.source.len()));
        }
        Ok(self.operands.pop())
    }

    /// Evaluates the source into an integer.
    pub fn evaluate_integer(&mut self) -> Result<i64, EnvError<E>> {
        match self.run()? {
            None => Ok(0),
            Some(item) => self.value(&item),
        }
    }

    /// Converts the item returned from [`run`](Self::run) into the result
    /// of arithmetic expansion.
    ///
    /// A variable whose value is not a number yields the value as is.
    pub fn result(&mut self, item: Item<'a>) -> Result<Value, EnvError<E>> {
        let (name, location) = match item {
            Item::Integer(i) => return Ok(Value::Integer(i)),
            Item::Variable { name, location } => (name, location),
        };
        match self.env.get_variable(name) {
            Ok(Some(text)) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() && parse_number(trimmed).is_none() {
                    return Ok(Value::Text(text.to_owned()));
                }
            }
            Ok(None) => (),
            Err(e) => return Err(error(ErrorCause::GetVariableError(e), location)),
        }
        Ok(Value::Integer(self.resolve(name, &location)?))
    }

    fn push_operand(
        &mut self,
        item: Item<'a>,
        expect_operand: bool,
        location: Range<usize>,
    ) -> Result<(), EnvError<E>> {
        if !expect_operand {
            return Err(error(ErrorCause::MalformedExpression, location));
        }
        if self.operands.len() >= self.limits.stack_depth {
            return Err(error(ErrorCause::StackOverflow, location));
        }
        self.operands.push(item);
        Ok(())
    }

    fn push_operator(&mut self, tag: Tag, location: Range<usize>) -> Result<(), EnvError<E>> {
        if self.operators.len() >= self.limits.stack_depth {
            return Err(error(ErrorCause::StackOverflow, location));
        }
        let skip = self.skip;
        self.operators.push(Pending {
            tag,
            location,
            skip,
        });
        Ok(())
    }

    fn pop_operand(&mut self, location: &Range<usize>) -> Result<Item<'a>, EnvError<E>> {
        self.operands
            .pop()
            .ok_or_else(|| error(ErrorCause::MissingOperand, location.clone()))
    }

    /// Handles an operator token.
    ///
    /// Returns whether an operand is expected next.
    fn operator(
        &mut self,
        operator: Operator,
        location: Range<usize>,
        expect_operand: bool,
    ) -> Result<bool, EnvError<E>> {
        if operator == Operator::CloseParen {
            if expect_operand {
                return Err(error(ErrorCause::MissingOperand, location));
            }
            loop {
                match self.operators.pop() {
                    None => return Err(error(ErrorCause::UnmatchedParenthesis, location)),
                    Some(pending) if pending.tag == Tag::OpenParen => return Ok(false),
                    Some(pending) => self.apply(pending)?,
                }
            }
        }

        if expect_operand {
            let tag = Tag::prefix(operator)
                .ok_or_else(|| error(ErrorCause::MissingOperand, location.clone()))?;
            self.push_operator(tag, location)?;
            return Ok(true);
        }

        if matches!(operator, Operator::PlusPlus | Operator::MinusMinus)
            && is_postfix_position(self.source, location.start)
        {
            let tag = if operator == Operator::PlusPlus {
                Tag::PostIncrement
            } else {
                Tag::PostDecrement
            };
            let operand = self.pop_operand(&location)?;
            let result = self.apply_unary(tag, operand, location, self.skip)?;
            self.operands.push(Item::Integer(result));
            return Ok(false);
        }

        let tag = Tag::binary(operator)
            .ok_or_else(|| error(ErrorCause::MalformedExpression, location.clone()))?;
        self.shunt(tag)?;
        let skip_rhs = match tag {
            Tag::LogicalAnd => self.resolve_top(&location)? == 0,
            Tag::LogicalOr => self.resolve_top(&location)? != 0,
            _ => false,
        };
        self.push_operator(tag, location)?;
        self.skip |= skip_rhs;
        Ok(true)
    }

    /// Applies the stacked operators that bind tighter than the incoming one.
    fn shunt(&mut self, tag: Tag) -> Result<(), EnvError<E>> {
        let incoming = tag.descriptor();
        while let Some(top) = self.operators.last() {
            let top = top.tag.descriptor();
            let pops = top.precedence > incoming.precedence
                || (top.precedence == incoming.precedence
                    && incoming.associativity == Associativity::Left);
            if !pops {
                break;
            }
            let Some(pending) = self.operators.pop() else {
                break;
            };
            self.apply(pending)?;
        }
        Ok(())
    }

    /// Dereferences the top operand in place and returns its value.
    fn resolve_top(&mut self, location: &Range<usize>) -> Result<i64, EnvError<E>> {
        let item = self.pop_operand(location)?;
        let value = if self.skip { 0 } else { self.value(&item)? };
        self.operands.push(Item::Integer(value));
        Ok(value)
    }

    fn apply(&mut self, pending: Pending) -> Result<(), EnvError<E>> {
        let Pending {
            tag,
            location,
            skip,
        } = pending;
        let result = match tag.descriptor().arity {
            Arity::Unary => {
                let operand = self.pop_operand(&location)?;
                self.apply_unary(tag, operand, location, skip)?
            }
            Arity::Binary => {
                let rhs = self.pop_operand(&location)?;
                let lhs = self.pop_operand(&location)?;
                self.apply_binary(tag, lhs, rhs, location, skip)?
            }
        };
        if matches!(tag, Tag::LogicalAnd | Tag::LogicalOr) {
            self.skip = skip;
        }
        self.operands.push(Item::Integer(result));
        Ok(())
    }

    fn apply_unary(
        &mut self,
        tag: Tag,
        operand: Item<'a>,
        location: Range<usize>,
        skip: bool,
    ) -> Result<i64, EnvError<E>> {
        if skip {
            return Ok(0);
        }
        match tag {
            Tag::Plus => self.value(&operand),
            Tag::Negate => unwrap_or_overflow(self.value(&operand)?.checked_neg(), location),
            Tag::LogicalNot => Ok((self.value(&operand)? == 0).into()),
            Tag::BitNot => Ok(!self.value(&operand)?),
            Tag::PreIncrement | Tag::PreDecrement | Tag::PostIncrement | Tag::PostDecrement => {
                let Item::Variable {
                    name,
                    location: variable_location,
                } = operand
                else {
                    return Err(error(ErrorCause::AssignmentToValue, location));
                };
                let old = self.resolve(name, &variable_location)?;
                let delta = match tag {
                    Tag::PreIncrement | Tag::PostIncrement => 1,
                    _ => -1,
                };
                let new = unwrap_or_overflow(old.checked_add(delta), location)?;
                self.assign(name, new, variable_location)?;
                Ok(match tag {
                    Tag::PreIncrement | Tag::PreDecrement => new,
                    _ => old,
                })
            }
            _ => unreachable!("not a unary operator: {}", tag.descriptor().symbol),
        }
    }

    fn apply_binary(
        &mut self,
        tag: Tag,
        lhs: Item<'a>,
        rhs: Item<'a>,
        location: Range<usize>,
        skip: bool,
    ) -> Result<i64, EnvError<E>> {
        if skip {
            return Ok(0);
        }
        match tag {
            Tag::Comma => self.value(&rhs),
            Tag::LogicalAnd => Ok((self.value(&lhs)? != 0 && self.value(&rhs)? != 0).into()),
            Tag::LogicalOr => Ok((self.value(&lhs)? != 0 || self.value(&rhs)? != 0).into()),
            _ if tag.is_assignment() => {
                let Item::Variable {
                    name,
                    location: variable_location,
                } = lhs
                else {
                    return Err(error(ErrorCause::AssignmentToValue, location));
                };
                let rhs = self.value(&rhs)?;
                let value = match tag.compound_base() {
                    None => rhs,
                    Some(base) => {
                        let current = self.resolve(name, &variable_location)?;
                        apply_pure(base, current, rhs, location)?
                    }
                };
                self.assign(name, value, variable_location)?;
                Ok(value)
            }
            _ => {
                let lhs = self.value(&lhs)?;
                let rhs = self.value(&rhs)?;
                apply_pure(tag, lhs, rhs, location)
            }
        }
    }

    fn value(&mut self, item: &Item<'a>) -> Result<i64, EnvError<E>> {
        match item {
            Item::Integer(i) => Ok(*i),
            Item::Variable { name, location } => self.resolve(name, location),
        }
    }

    /// Dereferences a variable.
    ///
    /// An unset or blank variable is zero. A value that is not a number is
    /// evaluated as an expression.
    fn resolve(&mut self, name: &str, location: &Range<usize>) -> Result<i64, EnvError<E>> {
        let text = match self.env.get_variable(name) {
            Ok(None) => return Ok(0),
            Ok(Some(text)) => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(0);
                }
                if let Some(i) = parse_number(text) {
                    return Ok(i);
                }
                text.to_owned()
            }
            Err(e) => return Err(error(ErrorCause::GetVariableError(e), location.clone())),
        };

        if self.depth >= self.limits.nesting_depth {
            return Err(error(ErrorCause::NestingTooDeep, location.clone()));
        }
        let mut context = Context::new(&text, &mut *self.env, self.limits, self.depth + 1);
        context.evaluate_integer().map_err(|e| Error {
            cause: if e.cause.is_syntax_error() {
                ErrorCause::InvalidVariableValue(text.clone())
            } else {
                e.cause
            },
            location: location.clone(),
        })
    }

    /// Evaluates a `$((...))` appearing in the source.
    fn evaluate_nested(
        &mut self,
        expression: &str,
        offset: usize,
        location: &Range<usize>,
    ) -> Result<i64, EnvError<E>> {
        if self.depth >= self.limits.nesting_depth {
            return Err(error(ErrorCause::NestingTooDeep, location.clone()));
        }
        let mut context = Context::new(expression, &mut *self.env, self.limits, self.depth + 1);
        context.evaluate_integer().map_err(|e| Error {
            cause: e.cause,
            location: e.location.start + offset..e.location.end + offset,
        })
    }

    fn assign(
        &mut self,
        name: &str,
        value: i64,
        location: Range<usize>,
    ) -> Result<(), EnvError<E>> {
        self.env
            .assign_variable(name, value.to_string(), location.clone())
            .map_err(|e| error(ErrorCause::AssignVariableError(e), location))
    }
}
