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

//! Module that defines the [`Entry`] type.

use bitflags::bitflags;
use std::fmt::Debug;
use std::rc::Rc;
use thiserror::Error;

bitflags! {
    /// Attributes of an entry
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct Flags: u16 {
        /// The variable is passed to the environment of commands.
        const EXPORT = 1 << 0;
        /// The value cannot be changed or unset.
        const READONLY = 1 << 1;
        /// The entry was created in a local scope.
        const LOCAL = 1 << 2;
        /// Assigned values are converted to upper case.
        const ALLCAPS = 1 << 3;
        /// Assigned values are converted to lower case.
        const ALLSMALL = 1 << 4;
        /// The function is traced when it runs.
        const FUNCTRACE = 1 << 5;
        /// Assigned values are evaluated as arithmetic expressions.
        const INTEGER = 1 << 6;
        /// Assignments are routed through the special-variable hook.
        const SPECIAL = 1 << 7;
        /// The variable only lives as long as the command it was assigned for.
        const TEMP = 1 << 8;
    }
}

impl Flags {
    /// Applies the case conversion requested by `ALLCAPS` or `ALLSMALL`.
    #[must_use]
    pub fn convert_case(self, value: String) -> String {
        if self.contains(Flags::ALLCAPS) {
            value.to_uppercase()
        } else if self.contains(Flags::ALLSMALL) {
            value.to_lowercase()
        } else {
            value
        }
    }
}

/// Executable body of a function
///
/// The body belongs to the code that defined the function. Entries only hold
/// a reference to it.
pub trait FunctionBody: Debug {
    /// Returns the text of the body as it appears in a listing.
    fn text(&self) -> &str;
}

impl FunctionBody for String {
    fn text(&self) -> &str {
        self
    }
}

/// What an entry is bound to
#[derive(Clone, Debug, Default)]
pub enum ValueKind {
    #[default]
    String,
    Function(Rc<dyn FunctionBody>),
}

/// Function kinds are equal if they share the same body.
impl PartialEq for ValueKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ValueKind::String, ValueKind::String) => true,
            (ValueKind::Function(a), ValueKind::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for ValueKind {}

/// Binding of a variable or function
///
/// The name of an entry is the key it is stored under in a
/// [`SymbolTable`](super::SymbolTable).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Entry {
    /// Value of the variable
    ///
    /// `None` means the entry exists without a value, which is different from
    /// an empty string.
    pub value: Option<String>,
    pub kind: ValueKind,
    pub flags: Flags,
}

/// Error that occurs when assigning to a variable
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum AssignError {
    /// The variable is read-only.
    #[error("cannot assign to read-only variable `{name}`")]
    ReadOnly {
        name: String,
        /// Value that was being assigned
        new_value: Option<String>,
    },
    /// The value assigned to an integer variable is not a valid expression.
    #[error("invalid value for integer variable `{name}`: {message}")]
    NotInteger { name: String, message: String },
}

impl Entry {
    /// Creates a string entry with the given value and no flags.
    #[must_use]
    pub fn new<S: Into<String>>(value: S) -> Self {
        Entry {
            value: Some(value.into()),
            ..Default::default()
        }
    }

    /// Creates a function entry.
    #[must_use]
    pub fn function(body: Rc<dyn FunctionBody>) -> Self {
        Entry {
            value: None,
            kind: ValueKind::Function(body),
            flags: Flags::empty(),
        }
    }

    /// Adds flags in a method chain.
    #[inline]
    #[must_use]
    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags |= flags;
        self
    }

    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.flags.contains(Flags::READONLY)
    }

    #[must_use]
    pub const fn is_exported(&self) -> bool {
        self.flags.contains(Flags::EXPORT)
    }

    /// Returns the body if this is a function entry.
    #[must_use]
    pub fn function_body(&self) -> Option<&Rc<dyn FunctionBody>> {
        match &self.kind {
            ValueKind::String => None,
            ValueKind::Function(body) => Some(body),
        }
    }

    /// Applies the case conversion requested by `ALLCAPS` or `ALLSMALL`.
    #[must_use]
    pub fn convert_case(&self, value: String) -> String {
        self.flags.convert_case(value)
    }

    /// Replaces the value.
    ///
    /// Returns the old value on success. The value is stored as is: no flag
    /// changes it. A read-only entry is left unchanged and an error naming
    /// `name` is returned.
    pub fn assign(
        &mut self,
        name: &str,
        value: Option<String>,
    ) -> Result<Option<String>, AssignError> {
        if self.is_read_only() {
            return Err(AssignError::ReadOnly {
                name: name.to_owned(),
                new_value: value,
            });
        }
        Ok(std::mem::replace(&mut self.value, value))
    }
}
