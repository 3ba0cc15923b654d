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

//! This crate defines the shell environment of lsh.
//!
//! An [`Env`] bundles the state the core of the shell works on:
//!
//! - [`variables`](Env::variables): the stack of variable scopes
//!   ([`variable::VariableSet`])
//! - [`functions`](Env::functions): function definitions
//! - [`options`](Env::options): shell options ([`option::OptionSet`])
//! - [`exit_status`](Env::exit_status): the value of `$?`
//! - [`hooks`](Env::hooks): facilities provided by the embedding shell
//!   ([`hooks::Hooks`])
//!
//! Variables are assigned with [`Env::set`], which applies the attributes of
//! the variable: case conversion, evaluation of integer variables and the
//! hook for special variables. The environment also implements
//! [`lsh_arith::Env`] so that arithmetic expansion reads and assigns
//! variables through the same rules.
//!
//! ```
//! # use lsh_env::{Env, SetControl};
//! # use lsh_env::variable::Flags;
//! let mut env = Env::new();
//! env.set("x", Some("3"), Flags::empty(), Flags::empty(), SetControl::empty())
//!     .unwrap();
//! assert_eq!(env.arithmetic_expansion("$((x * 2))").unwrap(), "6");
//! assert_eq!(env.get_int("x", 0), 3);
//! ```

use self::hooks::{DefaultHooks, Hooks, SpecialAssign};
use self::option::{OptionSet, State};
use self::semantics::ExitStatus;
use self::variable::{AssignError, Entry, Flags, FunctionBody, Scope, SymbolTable};
use self::variable::{OPTIND, OPTIND_INITIAL_VALUE, OPTSUB, UnsetError, ValueKind, VariableSet};
use bitflags::bitflags;
use std::ops::Range;
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;

mod alpha_list;
pub mod hooks;
pub mod option;
pub mod semantics;
pub mod variable;

pub use self::alpha_list::AlphaList;

bitflags! {
    /// Modifiers of [`Env::set`]
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct SetControl: u8 {
        /// Assigns the global variable, removing local ones that hide it.
        const GLOBAL = 1 << 0;
        /// Appends to the current value instead of replacing it.
        const APPEND = 1 << 1;
        /// Uses an entry in the topmost scope without looking up outer
        /// scopes.
        const FORCE_NEW = 1 << 2;
    }
}

/// Error reading an unset variable while the `Unset` option is off
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
#[error("{name}: parameter not set")]
pub struct UnsetVariableError {
    pub name: String,
}

/// Error type of arithmetic expansion in an [`Env`]
pub type ArithError = lsh_arith::EnvError<Env>;

/// Whole shell environment
#[derive(Debug)]
pub struct Env {
    pub variables: VariableSet,
    /// Function definitions
    ///
    /// Functions are not scoped, so this is a single table.
    pub functions: SymbolTable,
    pub options: OptionSet,
    /// Exit status of the last executed command
    pub exit_status: ExitStatus,
    pub hooks: Box<dyn Hooks>,
    /// Name of the shell used in error messages
    pub arg0: String,
}

impl Default for Env {
    fn default() -> Self {
        Env::with_hooks(Box::new(DefaultHooks::default()))
    }
}

impl Env {
    /// Creates an environment with [`DefaultHooks`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an environment with the given hooks.
    ///
    /// `OPTIND` is initialized to `1` and flagged as special.
    #[must_use]
    pub fn with_hooks(hooks: Box<dyn Hooks>) -> Self {
        let mut variables = VariableSet::new();
        let optind = variables.get_or_new(OPTIND, Scope::Global);
        optind.value = Some(OPTIND_INITIAL_VALUE.to_owned());
        optind.flags |= Flags::SPECIAL;

        Env {
            variables,
            functions: SymbolTable::new(0),
            options: OptionSet::default(),
            exit_status: ExitStatus::SUCCESS,
            hooks,
            arg0: "lsh".to_owned(),
        }
    }

    /// Returns the value of the visible variable.
    ///
    /// Returns `None` if the variable does not exist or has no value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables.get(name)?.value.as_deref()
    }

    /// Returns the value of the visible variable or `default` if it has none.
    #[must_use]
    pub fn get_or_default<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    /// Returns the value of the visible variable as an integer.
    ///
    /// Returns `default` if the variable has no value or the value is not a
    /// number. The value is not evaluated as an expression.
    #[must_use]
    pub fn get_int(&self, name: &str, default: i64) -> i64 {
        self.get(name)
            .map(str::trim)
            .and_then(lsh_arith::parse_number)
            .unwrap_or(default)
    }

    fn scope_of(control: SetControl) -> Scope {
        if control.contains(SetControl::GLOBAL) {
            Scope::Global
        } else if control.contains(SetControl::FORCE_NEW) {
            Scope::Local
        } else {
            Scope::Visible
        }
    }

    fn read_only_error(name: &str, new_value: Option<String>) -> AssignError {
        debug!(name, "refused to assign to read-only variable");
        AssignError::ReadOnly {
            name: name.to_owned(),
            new_value,
        }
    }

    /// Tests whether putting the variable into the scope would hide or
    /// remove a read-only entry.
    ///
    /// A global assignment removes every entry of the name above the global
    /// table. A new local entry hides the visible one.
    fn hides_read_only(&self, name: &str, scope: Scope) -> bool {
        match scope {
            Scope::Global => self
                .variables
                .get_all(name)
                .any(|(level, entry)| level > 0 && entry.is_read_only()),
            Scope::Local => {
                self.variables.local().lookup(name).is_none()
                    && self.variables.get(name).is_some_and(Entry::is_read_only)
            }
            Scope::Visible => false,
        }
    }

    /// Assigns a variable.
    ///
    /// `value` replaces the current value, or is appended to it if `control`
    /// contains [`SetControl::APPEND`]. A `None` value leaves the variable
    /// existing without a value. `control` also selects the scope of the
    /// variable.
    ///
    /// `set_flags` are added to and `unset_flags` are removed from the
    /// variable before the value is stored, except for `READONLY`: it is
    /// added after storing and is never removed. If the `AllExport` option is
    /// on, `EXPORT` is added as well.
    ///
    /// The value is converted as in [`set_value`](Self::set_value), with the
    /// flags the variable has after the change. Assigning to a read-only
    /// variable, or to a name hidden by or hiding a read-only variable,
    /// fails. On failure, no variable is created, moved or changed.
    pub fn set(
        &mut self,
        name: &str,
        value: Option<&str>,
        set_flags: Flags,
        unset_flags: Flags,
        control: SetControl,
    ) -> Result<(), AssignError> {
        let scope = Self::scope_of(control);
        let target = self.variables.get_scoped(name, scope);
        if self.hides_read_only(name, scope) || target.is_some_and(Entry::is_read_only) {
            return Err(Self::read_only_error(name, value.map(str::to_owned)));
        }

        let value = match value {
            Some(value) if control.contains(SetControl::APPEND) => {
                let current = match scope {
                    Scope::Local => target,
                    Scope::Global | Scope::Visible => self.variables.get(name),
                };
                let current = current.and_then(|entry| entry.value.as_deref());
                Some(format!("{}{}", current.unwrap_or_default(), value))
            }
            value => value.map(str::to_owned),
        };

        let declared = set_flags - Flags::READONLY;
        let mut flags = target.map_or(Flags::empty(), |entry| entry.flags);
        flags |= declared;
        flags -= unset_flags - Flags::READONLY;
        let value = self.convert_value(name, flags, value)?;

        self.declare_in(name, scope, declared, unset_flags);
        if let SpecialAssign::Store(value) = value {
            self.store_value(name, scope, flags, value)?;
        }
        if set_flags.contains(Flags::READONLY) {
            self.variables.get_or_new(name, scope).flags |= Flags::READONLY;
        }
        Ok(())
    }

    /// Changes the flags of a variable without assigning it.
    ///
    /// The variable is created without a value if it does not exist. Like
    /// [`set`](Self::set), `READONLY` is never removed. The flags of a
    /// read-only variable can be changed, but declaring a variable that
    /// would hide or remove a read-only one fails.
    pub fn declare(
        &mut self,
        name: &str,
        set_flags: Flags,
        unset_flags: Flags,
        control: SetControl,
    ) -> Result<(), AssignError> {
        let scope = Self::scope_of(control);
        if self.hides_read_only(name, scope) {
            return Err(Self::read_only_error(name, None));
        }
        self.declare_in(name, scope, set_flags, unset_flags);
        Ok(())
    }

    fn declare_in(&mut self, name: &str, scope: Scope, set_flags: Flags, unset_flags: Flags) {
        let all_export = self.options.get(option::AllExport) == State::On;
        let entry = self.variables.get_or_new(name, scope);
        entry.flags |= set_flags;
        entry.flags -= unset_flags - Flags::READONLY;
        if all_export {
            entry.flags |= Flags::EXPORT;
        }
    }

    /// Stores a value in the variable, applying its flags.
    ///
    /// The first of the following that applies decides what is stored:
    ///
    /// 1. If the variable is `SPECIAL`, the value goes through
    ///    [`Hooks::assign_special`], which may replace it or keep the current
    ///    one.
    /// 2. If the variable is `ALLCAPS` or `ALLSMALL`, the value is converted
    ///    to upper or lower case.
    /// 3. If the variable is `INTEGER`, the value is evaluated as an
    ///    arithmetic expression and the result is stored in decimal.
    ///
    /// Assigning the special variable `OPTIND` resets `OPTSUB` to `0`.
    ///
    /// The variable is created only after the value has been converted, so
    /// a failed conversion leaves the variables untouched.
    pub fn set_value(
        &mut self,
        name: &str,
        scope: Scope,
        value: Option<String>,
    ) -> Result<(), AssignError> {
        let entry = self.variables.get_scoped(name, scope);
        if self.hides_read_only(name, scope) || entry.is_some_and(Entry::is_read_only) {
            return Err(Self::read_only_error(name, value));
        }
        let flags = entry.map_or(Flags::empty(), |entry| entry.flags);
        match self.convert_value(name, flags, value)? {
            SpecialAssign::Store(value) => self.store_value(name, scope, flags, value),
            SpecialAssign::Keep => Ok(()),
        }
    }

    /// Computes the value a variable with the flags should store.
    fn convert_value(
        &mut self,
        name: &str,
        flags: Flags,
        value: Option<String>,
    ) -> Result<SpecialAssign, AssignError> {
        if flags.contains(Flags::SPECIAL) {
            return Ok(self.hooks.assign_special(name, value.as_deref()));
        }
        let value = if flags.intersects(Flags::ALLCAPS | Flags::ALLSMALL) {
            value.map(|value| flags.convert_case(value))
        } else if flags.contains(Flags::INTEGER) {
            match value {
                Some(text) => Some(self.evaluate_integer(name, &text)?.to_string()),
                None => None,
            }
        } else {
            value
        };
        Ok(SpecialAssign::Store(value))
    }

    fn store_value(
        &mut self,
        name: &str,
        scope: Scope,
        flags: Flags,
        value: Option<String>,
    ) -> Result<(), AssignError> {
        self.variables.get_or_new(name, scope).assign(name, value)?;

        if flags.contains(Flags::SPECIAL) && name == OPTIND {
            debug!("OPTIND assigned; restarting option scan at its first character");
            let optsub = self.variables.get_or_new(OPTSUB, scope);
            if !optsub.is_read_only() {
                optsub.value = Some("0".to_owned());
            }
        }
        Ok(())
    }

    fn evaluate_integer(&mut self, name: &str, text: &str) -> Result<i64, AssignError> {
        lsh_arith::eval_integer(text, self).map_err(|error| AssignError::NotInteger {
            name: name.to_owned(),
            message: error.to_string(),
        })
    }

    /// Removes the `READONLY` flag of the visible variable.
    ///
    /// Returns whether the variable exists. No ordinary assignment path calls
    /// this.
    pub fn clear_read_only(&mut self, name: &str) -> bool {
        match self.variables.get_mut(name) {
            Some(entry) => {
                entry.flags.remove(Flags::READONLY);
                true
            }
            None => false,
        }
    }

    /// Removes a variable.
    ///
    /// See [`VariableSet::unset`].
    pub fn unset(&mut self, name: &str, scope: Scope) -> Result<Option<Entry>, UnsetError> {
        self.variables.unset(name, scope).inspect_err(|error| debug!(%error))
    }

    /// Defines a function.
    ///
    /// The flags of an existing definition are kept. A read-only function
    /// cannot be redefined.
    pub fn define_function(
        &mut self,
        name: &str,
        body: Rc<dyn FunctionBody>,
    ) -> Result<(), AssignError> {
        let entry = self.functions.add(name);
        if entry.is_read_only() {
            return Err(Self::read_only_error(name, None));
        }
        entry.kind = ValueKind::Function(body);
        Ok(())
    }

    /// Returns the body of a function.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&Rc<dyn FunctionBody>> {
        self.functions.lookup(name)?.function_body()
    }

    /// Lists visible variables that have all of the `filter` flags.
    ///
    /// Each entry is `name=value` with the value quoted as needed, or just
    /// the name for a variable without a value.
    #[must_use]
    pub fn dump_variables(&self, filter: Flags) -> AlphaList {
        let mut list = AlphaList::new();
        for (name, entry) in self.variables.iter(Scope::Global) {
            if !entry.flags.contains(filter) {
                continue;
            }
            match &entry.value {
                Some(value) => {
                    list.add_fmt(format_args!("{name}={}", yash_quote::quoted(value)))
                }
                None => list.add(name.to_owned()),
            }
        }
        list
    }

    /// Lists function definitions as `name() body`.
    #[must_use]
    pub fn dump_functions(&self) -> AlphaList {
        let mut list = AlphaList::new();
        for (name, entry) in self.functions.iter() {
            if let Some(body) = entry.function_body() {
                list.add_fmt(format_args!("{name}() {}", body.text()));
            }
        }
        list
    }

    /// Performs arithmetic expansion.
    ///
    /// The text may be wrapped in `$((...))` or `$[...]`. On success, the
    /// result is returned in decimal (or verbatim for the value of a
    /// non-numeric variable) and the exit status is updated. On error, the
    /// message is reported through [`Hooks::print_error`].
    pub fn arithmetic_expansion(&mut self, text: &str) -> Result<String, ArithError> {
        match lsh_arith::eval(text, self) {
            Ok(value) => Ok(value.to_string()),
            Err(error) => {
                let message = format!("{}: arithmetic expansion: {error}", self.arg0);
                self.hooks.print_error(&message);
                Err(error)
            }
        }
    }
}

impl lsh_arith::Env for Env {
    type GetVariableError = UnsetVariableError;
    type AssignVariableError = AssignError;

    fn get_variable(&self, name: &str) -> Result<Option<&str>, UnsetVariableError> {
        match self.get(name) {
            Some(value) => Ok(Some(value)),
            None if self.options.get(option::Unset) == State::Off => Err(UnsetVariableError {
                name: name.to_owned(),
            }),
            None => Ok(None),
        }
    }

    /// Assigns the variable through [`Env::set`] and clears its `TEMP` flag.
    fn assign_variable(
        &mut self,
        name: &str,
        value: String,
        _location: Range<usize>,
    ) -> Result<(), AssignError> {
        self.set(
            name,
            Some(&value),
            Flags::empty(),
            Flags::TEMP,
            SetControl::empty(),
        )
    }

    fn expand_word(&mut self, text: &str) -> Option<String> {
        self.hooks.expand_word(text)
    }

    fn substitute_command(&mut self, command: &str) -> Option<Result<String, String>> {
        self.hooks.substitute_command(command)
    }

    fn set_exit_status(&mut self, status: i32) {
        self.exit_status = ExitStatus(status);
    }
}
