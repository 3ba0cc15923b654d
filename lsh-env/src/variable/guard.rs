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

use super::SymbolTable;
use super::VariableSet;
use crate::Env;
use std::ops::Deref;
use std::ops::DerefMut;

/// RAII-style guard for temporarily retaining a scope
///
/// The guard object is created by [`VariableSet::push_scope`].
#[derive(Debug)]
#[must_use = "You must retain ScopeGuard to keep the scope alive"]
pub struct ScopeGuard<'a> {
    set: &'a mut VariableSet,
}

/// RAII-style guard that holds the topmost table away from the set
///
/// The guard object is created by [`VariableSet::lend_top`]. While the guard
/// is alive, operations on the set land in the scope below the lent one.
#[derive(Debug)]
#[must_use = "The table is pushed back when the guard is dropped"]
pub struct LentScope<'a> {
    set: &'a mut VariableSet,
    table: Option<SymbolTable>,
}

impl VariableSet {
    /// Pushes a new empty table.
    ///
    /// This function returns a scope guard that will pop the table when
    /// dropped.
    #[inline]
    pub fn push_scope(&mut self) -> ScopeGuard<'_> {
        self.push();
        ScopeGuard { set: self }
    }

    /// Pops the topmost table from the variable set.
    #[inline]
    pub fn pop_scope(guard: ScopeGuard<'_>) {
        drop(guard)
    }

    /// Removes the topmost table until the returned guard is dropped.
    ///
    /// If only the global table exists, nothing is removed.
    #[inline]
    pub fn lend_top(&mut self) -> LentScope<'_> {
        let table = self.pop();
        LentScope { set: self, table }
    }
}

impl LentScope<'_> {
    /// Returns the table held away from the set.
    #[must_use]
    pub fn table(&self) -> Option<&SymbolTable> {
        self.table.as_ref()
    }
}

impl Drop for ScopeGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.set.pop();
    }
}

impl Drop for LentScope<'_> {
    #[inline]
    fn drop(&mut self) {
        if let Some(table) = self.table.take() {
            self.set.push_table(table)
        }
    }
}

impl Deref for ScopeGuard<'_> {
    type Target = VariableSet;
    #[inline]
    fn deref(&self) -> &VariableSet {
        self.set
    }
}

impl DerefMut for ScopeGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut VariableSet {
        self.set
    }
}

impl Deref for LentScope<'_> {
    type Target = VariableSet;
    #[inline]
    fn deref(&self) -> &VariableSet {
        self.set
    }
}

impl DerefMut for LentScope<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut VariableSet {
        self.set
    }
}

/// RAII-style guard that makes sure a scope is popped properly
///
/// The guard object is created by [`Env::push_scope`].
#[derive(Debug)]
#[must_use = "The scope is popped when the guard is dropped"]
pub struct EnvScopeGuard<'a> {
    env: &'a mut Env,
}

/// RAII-style guard that gives a lent scope back to the environment
///
/// The guard object is created by [`Env::lend_scope`].
#[derive(Debug)]
#[must_use = "The scope is pushed back when the guard is dropped"]
pub struct EnvLentScope<'a> {
    env: &'a mut Env,
    table: Option<SymbolTable>,
}

impl Env {
    /// Pushes a new scope to the variable set.
    ///
    /// This function is equivalent to `self.variables.push_scope()`, but
    /// returns a guard that allows re-borrowing the `Env`.
    #[inline]
    pub fn push_scope(&mut self) -> EnvScopeGuard<'_> {
        self.variables.push();
        EnvScopeGuard { env: self }
    }

    /// Pops the topmost scope from the variable set.
    #[inline]
    pub fn pop_scope(guard: EnvScopeGuard<'_>) {
        drop(guard)
    }

    /// Removes the topmost scope until the returned guard is dropped.
    ///
    /// A built-in running in its own scope uses this to modify the variables
    /// of its caller.
    #[inline]
    pub fn lend_scope(&mut self) -> EnvLentScope<'_> {
        let table = self.variables.pop();
        EnvLentScope { env: self, table }
    }
}

impl Drop for EnvScopeGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.env.variables.pop();
    }
}

impl Drop for EnvLentScope<'_> {
    #[inline]
    fn drop(&mut self) {
        if let Some(table) = self.table.take() {
            self.env.variables.push_table(table)
        }
    }
}

impl Deref for EnvScopeGuard<'_> {
    type Target = Env;
    #[inline]
    fn deref(&self) -> &Env {
        self.env
    }
}

impl DerefMut for EnvScopeGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Env {
        self.env
    }
}

impl Deref for EnvLentScope<'_> {
    type Target = Env;
    #[inline]
    fn deref(&self) -> &Env {
        self.env
    }
}

impl DerefMut for EnvLentScope<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Env {
        self.env
    }
}
