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

//! Facilities of the shell that live outside the core
//!
//! The [`Env`](crate::Env) reaches word expansion, command substitution,
//! special variables and error reporting through the [`Hooks`] trait. An
//! embedding shell installs its own implementation; [`DefaultHooks`] stands
//! in where none of the facilities exist.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

/// Outcome of assigning a special variable
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum SpecialAssign {
    /// Stores the contained value (which may differ from the assigned one).
    Store(Option<String>),
    /// Leaves the stored value untouched.
    Keep,
}

/// Collaborators the environment calls into
pub trait Hooks: Debug {
    /// Performs word expansion on text that contains quotes or substitutions.
    ///
    /// Returns `None` if word expansion is not available.
    fn expand_word(&mut self, text: &str) -> Option<String> {
        let _ = text;
        None
    }

    /// Runs the text as a command substitution and returns its output.
    ///
    /// Returns `None` if command substitution is not available and
    /// `Some(Err(message))` if the command could not be run.
    fn substitute_command(&mut self, text: &str) -> Option<Result<String, String>> {
        let _ = text;
        None
    }

    /// Reacts to an assignment to a variable flagged as special.
    fn assign_special(&mut self, name: &str, value: Option<&str>) -> SpecialAssign {
        let _ = name;
        SpecialAssign::Store(value.map(str::to_owned))
    }

    /// Reports an error message to the user.
    fn print_error(&mut self, message: &str);
}

/// Hooks that provide no facility
///
/// Error messages are collected in `errors`, which may be shared with the
/// creator of the hooks.
#[derive(Clone, Debug, Default)]
pub struct DefaultHooks {
    pub errors: Rc<RefCell<Vec<String>>>,
}

impl Hooks for DefaultHooks {
    fn print_error(&mut self, message: &str) {
        self.errors.borrow_mut().push(message.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hooks() {
        let mut hooks = DefaultHooks::default();
        let errors = Rc::clone(&hooks.errors);
        assert_eq!(hooks.expand_word("\"1\""), None);
        assert_eq!(hooks.substitute_command("echo 1"), None);
        assert_eq!(
            hooks.assign_special("OPTIND", Some("1")),
            SpecialAssign::Store(Some("1".to_string())),
        );
        hooks.print_error("oops");
        assert_eq!(*errors.borrow(), ["oops"]);
    }
}
