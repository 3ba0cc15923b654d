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

//! Operator table

use crate::token::Operator;

/// Operator after resolving its context-dependent meaning
///
/// The discriminant of each variant is its index in [`TABLE`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum Tag {
    Comma,
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    RemainderAssign,
    ShiftLeftAssign,
    ShiftRightAssign,
    BitAndAssign,
    BitXorAssign,
    BitOrAssign,
    LogicalOr,
    LogicalAnd,
    BitOr,
    BitXor,
    BitAnd,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    ShiftLeft,
    ShiftRight,
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Power,
    Plus,
    Negate,
    LogicalNot,
    BitNot,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
    OpenParen,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum Associativity {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum Arity {
    Unary,
    Binary,
}

/// Static properties of an operator
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct Descriptor {
    pub tag: Tag,
    pub symbol: &'static str,
    /// Higher binds tighter.
    pub precedence: u8,
    pub associativity: Associativity,
    pub arity: Arity,
}

const fn binary(tag: Tag, symbol: &'static str, precedence: u8) -> Descriptor {
    Descriptor {
        tag,
        symbol,
        precedence,
        associativity: Associativity::Left,
        arity: Arity::Binary,
    }
}

const fn assignment(tag: Tag, symbol: &'static str) -> Descriptor {
    Descriptor {
        tag,
        symbol,
        precedence: 2,
        associativity: Associativity::Right,
        arity: Arity::Binary,
    }
}

const fn unary(tag: Tag, symbol: &'static str) -> Descriptor {
    Descriptor {
        tag,
        symbol,
        precedence: 14,
        associativity: Associativity::Right,
        arity: Arity::Unary,
    }
}

/// All operators, in the order of [`Tag`] variants.
///
/// Postfix operators are applied as soon as they are read, so their
/// precedence is only nominal. `(` has the lowest precedence so that no
/// operator is ever shunted past it.
pub(crate) const TABLE: &[Descriptor] = &[
    binary(Tag::Comma, ",", 1),
    assignment(Tag::Assign, "="),
    assignment(Tag::AddAssign, "+="),
    assignment(Tag::SubtractAssign, "-="),
    assignment(Tag::MultiplyAssign, "*="),
    assignment(Tag::DivideAssign, "/="),
    assignment(Tag::RemainderAssign, "%="),
    assignment(Tag::ShiftLeftAssign, "<<="),
    assignment(Tag::ShiftRightAssign, ">>="),
    assignment(Tag::BitAndAssign, "&="),
    assignment(Tag::BitXorAssign, "^="),
    assignment(Tag::BitOrAssign, "|="),
    binary(Tag::LogicalOr, "||", 3),
    binary(Tag::LogicalAnd, "&&", 4),
    binary(Tag::BitOr, "|", 5),
    binary(Tag::BitXor, "^", 6),
    binary(Tag::BitAnd, "&", 7),
    binary(Tag::Equal, "==", 8),
    binary(Tag::NotEqual, "!=", 8),
    binary(Tag::Less, "<", 9),
    binary(Tag::LessEqual, "<=", 9),
    binary(Tag::Greater, ">", 9),
    binary(Tag::GreaterEqual, ">=", 9),
    binary(Tag::ShiftLeft, "<<", 10),
    binary(Tag::ShiftRight, ">>", 10),
    binary(Tag::Add, "+", 11),
    binary(Tag::Subtract, "-", 11),
    binary(Tag::Multiply, "*", 12),
    binary(Tag::Divide, "/", 12),
    binary(Tag::Remainder, "%", 12),
    Descriptor {
        tag: Tag::Power,
        symbol: "**",
        precedence: 13,
        associativity: Associativity::Right,
        arity: Arity::Binary,
    },
    unary(Tag::Plus, "+"),
    unary(Tag::Negate, "-"),
    unary(Tag::LogicalNot, "!"),
    unary(Tag::BitNot, "~"),
    unary(Tag::PreIncrement, "++"),
    unary(Tag::PreDecrement, "--"),
    Descriptor {
        tag: Tag::PostIncrement,
        symbol: "++",
        precedence: 15,
        associativity: Associativity::Left,
        arity: Arity::Unary,
    },
    Descriptor {
        tag: Tag::PostDecrement,
        symbol: "--",
        precedence: 15,
        associativity: Associativity::Left,
        arity: Arity::Unary,
    },
    Descriptor {
        tag: Tag::OpenParen,
        symbol: "(",
        precedence: 0,
        associativity: Associativity::Left,
        arity: Arity::Unary,
    },
];

impl Tag {
    /// Returns the static properties of the operator.
    pub fn descriptor(self) -> &'static Descriptor {
        let descriptor = &TABLE[self as usize];
        debug_assert_eq!(descriptor.tag, self);
        descriptor
    }

    /// Resolves an operator appearing where an operand is expected.
    pub fn prefix(operator: Operator) -> Option<Tag> {
        use Operator::*;
        match operator {
            Plus => Some(Tag::Plus),
            Minus => Some(Tag::Negate),
            Bang => Some(Tag::LogicalNot),
            Tilde => Some(Tag::BitNot),
            PlusPlus => Some(Tag::PreIncrement),
            MinusMinus => Some(Tag::PreDecrement),
            OpenParen => Some(Tag::OpenParen),
            _ => None,
        }
    }

    /// Resolves an operator appearing after an operand.
    pub fn binary(operator: Operator) -> Option<Tag> {
        use Operator::*;
        Some(match operator {
            Comma => Tag::Comma,
            Equal => Tag::Assign,
            PlusEqual => Tag::AddAssign,
            MinusEqual => Tag::SubtractAssign,
            AsteriskEqual => Tag::MultiplyAssign,
            SlashEqual => Tag::DivideAssign,
            PercentEqual => Tag::RemainderAssign,
            LessLessEqual => Tag::ShiftLeftAssign,
            GreaterGreaterEqual => Tag::ShiftRightAssign,
            AndEqual => Tag::BitAndAssign,
            CaretEqual => Tag::BitXorAssign,
            BarEqual => Tag::BitOrAssign,
            BarBar => Tag::LogicalOr,
            AndAnd => Tag::LogicalAnd,
            Bar => Tag::BitOr,
            Caret => Tag::BitXor,
            And => Tag::BitAnd,
            EqualEqual => Tag::Equal,
            BangEqual => Tag::NotEqual,
            Less => Tag::Less,
            LessEqual => Tag::LessEqual,
            Greater => Tag::Greater,
            GreaterEqual => Tag::GreaterEqual,
            LessLess => Tag::ShiftLeft,
            GreaterGreater => Tag::ShiftRight,
            Plus => Tag::Add,
            Minus => Tag::Subtract,
            Asterisk => Tag::Multiply,
            Slash => Tag::Divide,
            Percent => Tag::Remainder,
            AsteriskAsterisk => Tag::Power,
            Bang | Tilde | PlusPlus | MinusMinus | OpenParen | CloseParen => return None,
        })
    }

    /// Tests whether this is one of the assignment operators.
    pub fn is_assignment(self) -> bool {
        self.descriptor().precedence == 2
    }

    /// Returns the operator a compound assignment applies before storing.
    ///
    /// Returns `None` for `=` and non-assignment operators.
    pub fn compound_base(self) -> Option<Tag> {
        use Tag::*;
        match self {
            AddAssign => Some(Add),
            SubtractAssign => Some(Subtract),
            MultiplyAssign => Some(Multiply),
            DivideAssign => Some(Divide),
            RemainderAssign => Some(Remainder),
            ShiftLeftAssign => Some(ShiftLeft),
            ShiftRightAssign => Some(ShiftRight),
            BitAndAssign => Some(BitAnd),
            BitXorAssign => Some(BitXor),
            BitOrAssign => Some(BitOr),
            _ => None,
        }
    }
}
