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

//! Type definitions for variables
//!
//! This module provides the [`VariableSet`], a stack of [`SymbolTable`]s.
//! The bottom table holds global variables and is never removed. A new table
//! is [pushed](VariableSet::push) when the shell enters a function or a
//! built-in that has its own scope, and [popped](VariableSet::pop) when it
//! leaves.
//!
//! Lookups walk the stack from the top down, so an entry in an upper table
//! hides entries of the same name below it. The [`Scope`] passed to
//! [`get_or_new`](VariableSet::get_or_new) and other methods selects which
//! tables an operation applies to.
//!
//! ```
//! # use lsh_env::variable::{Scope, VariableSet};
//! let mut set = VariableSet::new();
//! set.get_or_new("x", Scope::Global).value = Some("global".to_string());
//!
//! let mut scope = set.push_scope();
//! scope.get_or_new("x", Scope::Local).value = Some("local".to_string());
//! assert_eq!(scope.get("x").unwrap().value.as_deref(), Some("local"));
//! VariableSet::pop_scope(scope);
//!
//! assert_eq!(set.get("x").unwrap().value.as_deref(), Some("global"));
//! ```

use itertools::Itertools;
use std::collections::HashMap;
use thiserror::Error;
use tracing::trace;

mod constants;
mod entry;
mod guard;

pub use self::constants::*;
pub use self::entry::{AssignError, Entry, Flags, FunctionBody, ValueKind};
pub use self::guard::{EnvLentScope, EnvScopeGuard, LentScope, ScopeGuard};

/// Single level of bindings
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SymbolTable {
    level: usize,
    entries: HashMap<String, Entry>,
}

impl SymbolTable {
    /// Creates an empty table at the given nesting level.
    ///
    /// Level 0 is the global scope.
    #[must_use]
    pub fn new(level: usize) -> Self {
        SymbolTable {
            level,
            entries: HashMap::new(),
        }
    }

    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Entry> {
        self.entries.get_mut(name)
    }

    /// Returns the entry with the given name, creating it if missing.
    ///
    /// A new entry has no value. It has the `LOCAL` flag if this is not the
    /// global table.
    pub fn add(&mut self, name: &str) -> &mut Entry {
        let level = self.level;
        self.entries.entry(name.to_owned()).or_insert_with(|| {
            let mut entry = Entry::default();
            entry.flags.set(Flags::LOCAL, level > 0);
            entry
        })
    }

    /// Inserts an entry, replacing and returning any existing one.
    pub fn insert(&mut self, name: String, entry: Entry) -> Option<Entry> {
        self.entries.insert(name, entry)
    }

    /// Removes an entry.
    ///
    /// Returns `None` if the table has no entry of the name.
    pub fn remove(&mut self, name: &str) -> Option<Entry> {
        self.entries.remove(name)
    }

    /// Returns an iterator over the entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Choice of tables an operation applies to
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Scope {
    /// The global table
    ///
    /// Creating an entry in the global scope removes entries of the same
    /// name from the other tables. Unsetting removes the name from all
    /// tables.
    Global,
    /// The topmost table only
    Local,
    /// The table that has the visible entry of the name
    ///
    /// If no table has it, the topmost table is used to create one.
    Visible,
}

/// Error unsetting a read-only variable
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
#[error("cannot unset read-only variable `{name}`")]
pub struct UnsetError {
    pub name: String,
}

/// Stack of symbol tables
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariableSet {
    /// Never empty. The first table is the global one.
    tables: Vec<SymbolTable>,
}

impl Default for VariableSet {
    fn default() -> Self {
        VariableSet {
            tables: vec![SymbolTable::new(0)],
        }
    }
}

impl VariableSet {
    /// Creates a variable set with an empty global table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of tables, including the global one.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn global(&self) -> &SymbolTable {
        &self.tables[0]
    }

    #[must_use]
    pub fn global_mut(&mut self) -> &mut SymbolTable {
        &mut self.tables[0]
    }

    /// Returns the topmost table.
    ///
    /// This is the global table if no other table has been pushed.
    #[must_use]
    pub fn local(&self) -> &SymbolTable {
        self.tables.last().expect("global table has gone")
    }

    #[must_use]
    pub fn local_mut(&mut self) -> &mut SymbolTable {
        self.tables.last_mut().expect("global table has gone")
    }

    /// Returns the visible entry of the name.
    ///
    /// The tables are searched from the top down.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.tables.iter().rev().find_map(|table| table.lookup(name))
    }

    #[must_use]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Entry> {
        self.tables
            .iter_mut()
            .rev()
            .find_map(|table| table.lookup_mut(name))
    }

    /// Returns the entry [`get_or_new`](Self::get_or_new) would return,
    /// without creating or moving anything.
    #[must_use]
    pub fn get_scoped(&self, name: &str, scope: Scope) -> Option<&Entry> {
        match scope {
            Scope::Global => self.global().lookup(name).or_else(|| self.get(name)),
            Scope::Local => self.local().lookup(name),
            Scope::Visible => self.get(name),
        }
    }

    /// Returns the entries of the name in all tables, from the top down.
    ///
    /// Each entry is paired with the level of its table.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = (usize, &'a Entry)> {
        self.tables
            .iter()
            .rev()
            .filter_map(move |table| Some((table.level(), table.lookup(name)?)))
    }

    /// Index of the topmost table that has the name
    fn position(&self, name: &str) -> Option<usize> {
        self.tables
            .iter()
            .rposition(|table| table.lookup(name).is_some())
    }

    /// Returns the entry of the name in the scope, creating it if missing.
    ///
    /// With `Scope::Global`, entries of the name in tables other than the
    /// global one are removed. If the global table does not have the name,
    /// the topmost of the removed entries is moved into it without its
    /// `LOCAL` flag. Removed entries are not checked for being read-only;
    /// the caller must do that beforehand.
    pub fn get_or_new(&mut self, name: &str, scope: Scope) -> &mut Entry {
        match scope {
            Scope::Global => {
                let mut promoted = None;
                for table in self.tables[1..].iter_mut().rev() {
                    if let Some(entry) = table.remove(name) {
                        if promoted.is_none() {
                            promoted = Some(entry);
                        }
                    }
                }
                let global = self.global_mut();
                if global.lookup(name).is_none() {
                    if let Some(mut entry) = promoted {
                        entry.flags.remove(Flags::LOCAL);
                        global.insert(name.to_owned(), entry);
                    }
                }
                global.add(name)
            }
            Scope::Local => self.local_mut().add(name),
            Scope::Visible => {
                let index = self.position(name).unwrap_or(self.tables.len() - 1);
                self.tables[index].add(name)
            }
        }
    }

    /// Removes an entry.
    ///
    /// The scope chooses the entries to remove:
    ///
    /// - `Global`: every entry of the name in all tables
    /// - `Local`: the entry in the topmost table
    /// - `Visible`: the visible entry, which may reveal an entry in a lower
    ///   table
    ///
    /// Returns the previously visible entry of the removed ones. If any of
    /// them is read-only, nothing is removed and an error is returned.
    pub fn unset(&mut self, name: &str, scope: Scope) -> Result<Option<Entry>, UnsetError> {
        let range = match scope {
            Scope::Global => 0..self.tables.len(),
            Scope::Local => self.tables.len() - 1..self.tables.len(),
            Scope::Visible => match self.position(name) {
                Some(index) => index..index + 1,
                None => return Ok(None),
            },
        };

        let tables = &mut self.tables[range];
        if tables
            .iter()
            .filter_map(|table| table.lookup(name))
            .any(Entry::is_read_only)
        {
            return Err(UnsetError {
                name: name.to_owned(),
            });
        }

        let mut removed = None;
        for table in tables {
            if let Some(entry) = table.remove(name) {
                removed = Some(entry);
            }
        }
        Ok(removed)
    }

    /// Returns an iterator over visible entries.
    ///
    /// With `Scope::Local`, only the topmost table is visited. Otherwise,
    /// all tables are visited but hidden entries are skipped.
    ///
    /// The order of iterated entries is unspecified.
    pub fn iter(&self, scope: Scope) -> impl Iterator<Item = (&str, &Entry)> {
        let tables = match scope {
            Scope::Local => &self.tables[self.tables.len() - 1..],
            Scope::Global | Scope::Visible => &self.tables[..],
        };
        tables
            .iter()
            .rev()
            .flat_map(SymbolTable::iter)
            .unique_by(|&(name, _)| name)
    }

    /// Pushes a new empty table.
    pub fn push(&mut self) {
        let level = self.tables.len();
        trace!(level, "pushing scope");
        self.tables.push(SymbolTable::new(level));
    }

    /// Pushes a table that has been [popped](Self::pop).
    ///
    /// The level of the table is updated to match its new position.
    pub fn push_table(&mut self, mut table: SymbolTable) {
        table.level = self.tables.len();
        trace!(level = table.level, entries = table.len(), "restoring scope");
        self.tables.push(table);
    }

    /// Removes and returns the topmost table.
    ///
    /// Returns `None` if only the global table is left, which is never
    /// removed.
    pub fn pop(&mut self) -> Option<SymbolTable> {
        if self.tables.len() == 1 {
            return None;
        }
        let table = self.tables.pop();
        trace!(level = self.tables.len(), "popped scope");
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn value<'a>(set: &'a VariableSet, name: &str) -> Option<&'a str> {
        set.get(name)?.value.as_deref()
    }

    fn assign(set: &mut VariableSet, name: &str, v: &str, scope: Scope) {
        set.get_or_new(name, scope).value = Some(v.to_string());
    }

    #[test]
    fn new_set_has_global_table_only() {
        let set = VariableSet::new();
        assert_eq!(set.depth(), 1);
        assert_eq!(set.global().level(), 0);
        assert_eq!(set.local(), set.global());
        assert_eq!(set.get("x"), None);
    }

    #[test]
    fn add_returns_existing_entry() {
        let mut table = SymbolTable::new(0);
        table.add("x").value = Some("1".to_string());
        assert_eq!(table.add("x").value.as_deref(), Some("1"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.remove("x"), Some(Entry::new("1")));
        assert_eq!(table.remove("x"), None);
        assert!(table.is_empty());
    }

    #[test]
    fn entries_in_local_tables_are_flagged() {
        let mut table = SymbolTable::new(2);
        assert_eq!(table.add("x").flags, Flags::LOCAL);
        let mut table = SymbolTable::new(0);
        assert_eq!(table.add("x").flags, Flags::empty());
    }

    #[test]
    fn local_entry_hides_global_one_until_popped() {
        for name in ["x", "PATH", "_", "a1"] {
            let mut set = VariableSet::new();
            assign(&mut set, name, "global", Scope::Global);
            set.push();
            assign(&mut set, name, "local", Scope::Local);
            assert_eq!(value(&set, name), Some("local"));
            set.pop();
            assert_eq!(value(&set, name), Some("global"));
        }
    }

    #[test]
    fn local_entry_disappears_when_popped() {
        let mut set = VariableSet::new();
        set.push();
        assign(&mut set, "x", "local", Scope::Local);
        let table = set.pop().unwrap();
        let expected = Entry::new("local").with_flags(Flags::LOCAL);
        assert_eq!(table.lookup("x"), Some(&expected));
        assert_eq!(set.get("x"), None);
    }

    #[test]
    fn global_table_is_never_popped() {
        let mut set = VariableSet::new();
        assert_eq!(set.pop(), None);
        assert_eq!(set.depth(), 1);
    }

    #[test]
    fn visible_scope_updates_outer_entry() {
        let mut set = VariableSet::new();
        assign(&mut set, "x", "1", Scope::Global);
        set.push();
        assign(&mut set, "x", "2", Scope::Visible);
        assert_eq!(set.local().lookup("x"), None);
        assign(&mut set, "y", "3", Scope::Visible);
        assert_eq!(set.local().lookup("y").unwrap().value.as_deref(), Some("3"));
        set.pop();
        assert_eq!(value(&set, "x"), Some("2"));
        assert_eq!(value(&set, "y"), None);
    }

    #[test]
    fn global_scope_removes_shadowing_entries() {
        let mut set = VariableSet::new();
        assign(&mut set, "x", "0", Scope::Global);
        set.push();
        assign(&mut set, "x", "1", Scope::Local);
        set.push();
        assign(&mut set, "x", "2", Scope::Local);

        assign(&mut set, "x", "3", Scope::Global);
        assert_eq!(value(&set, "x"), Some("3"));
        assert_eq!(set.local().lookup("x"), None);
        set.pop();
        set.pop();
        assert_eq!(value(&set, "x"), Some("3"));
    }

    #[test]
    fn global_scope_promotes_local_entry() {
        let mut set = VariableSet::new();
        set.push();
        set.get_or_new("x", Scope::Local).flags |= Flags::EXPORT;
        let entry = set.get_or_new("x", Scope::Global);
        assert_eq!(entry.flags, Flags::EXPORT);
        set.pop();
        assert_eq!(set.get("x").unwrap().flags, Flags::EXPORT);
    }

    #[test]
    fn get_scoped_does_not_create() {
        let mut set = VariableSet::new();
        assign(&mut set, "x", "1", Scope::Global);
        set.push();
        assert_eq!(set.get_scoped("x", Scope::Local), None);
        assert_eq!(set.get_scoped("x", Scope::Visible), Some(&Entry::new("1")));
        assert_eq!(set.get_scoped("x", Scope::Global), Some(&Entry::new("1")));
        assert_eq!(set.depth(), 2);
        assert!(set.local().is_empty());
    }

    #[test]
    fn get_scoped_global_finds_entry_to_be_promoted() {
        let mut set = VariableSet::new();
        set.push();
        assign(&mut set, "x", "1", Scope::Local);
        set.push();
        let entry = set.get_scoped("x", Scope::Global).unwrap();
        assert_eq!(entry.value, Some("1".to_string()));
        assert_eq!(set.global().lookup("x"), None);
    }

    #[test]
    fn entries_in_all_tables() {
        let mut set = VariableSet::new();
        assign(&mut set, "x", "0", Scope::Global);
        set.push();
        set.push();
        assign(&mut set, "x", "2", Scope::Local);
        let entries = set
            .get_all("x")
            .map(|(level, entry)| (level, entry.value.as_deref()))
            .collect::<Vec<_>>();
        assert_eq!(entries, [(2, Some("2")), (0, Some("0"))]);
        assert_eq!(set.get_all("y").count(), 0);
    }

    #[test]
    fn unset_global_removes_all() {
        let mut set = VariableSet::new();
        assign(&mut set, "x", "0", Scope::Global);
        set.push();
        assign(&mut set, "x", "1", Scope::Local);
        let removed = set.unset("x", Scope::Global).unwrap().unwrap();
        assert_eq!(removed.value.as_deref(), Some("1"));
        assert_eq!(set.get("x"), None);
        assert_eq!(set.unset("x", Scope::Global), Ok(None));
    }

    #[test]
    fn unset_visible_reveals_lower_entry() {
        let mut set = VariableSet::new();
        assign(&mut set, "x", "0", Scope::Global);
        set.push();
        assign(&mut set, "x", "1", Scope::Local);
        set.unset("x", Scope::Visible).unwrap();
        assert_eq!(value(&set, "x"), Some("0"));
    }

    #[test]
    fn unset_local_ignores_lower_tables() {
        let mut set = VariableSet::new();
        assign(&mut set, "x", "0", Scope::Global);
        set.push();
        assert_eq!(set.unset("x", Scope::Local), Ok(None));
        assert_eq!(value(&set, "x"), Some("0"));
    }

    #[test]
    fn unset_read_only_fails() {
        let mut set = VariableSet::new();
        set.get_or_new("x", Scope::Global).flags |= Flags::READONLY;
        set.push();
        assign(&mut set, "x", "1", Scope::Local);
        let result = set.unset("x", Scope::Global);
        assert_matches!(&result, Err(UnsetError { name }) => assert_eq!(name, "x"));
        assert_eq!(value(&set, "x"), Some("1"));
        assert_eq!(
            result.unwrap_err().to_string(),
            "cannot unset read-only variable `x`",
        );
    }

    #[test]
    fn iteration_skips_hidden_entries() {
        let mut set = VariableSet::new();
        assign(&mut set, "a", "0", Scope::Global);
        assign(&mut set, "b", "0", Scope::Global);
        set.push();
        assign(&mut set, "a", "1", Scope::Local);
        assign(&mut set, "c", "1", Scope::Local);

        let mut all = set
            .iter(Scope::Global)
            .map(|(name, entry)| (name, entry.value.as_deref().unwrap()))
            .collect::<Vec<_>>();
        all.sort();
        assert_eq!(all, [("a", "1"), ("b", "0"), ("c", "1")]);

        let mut local = set
            .iter(Scope::Local)
            .map(|(name, _)| name)
            .collect::<Vec<_>>();
        local.sort();
        assert_eq!(local, ["a", "c"]);
    }

    #[test]
    fn pushed_back_table_takes_new_level() {
        let mut set = VariableSet::new();
        set.push();
        set.push();
        let table = set.pop().unwrap();
        set.pop();
        set.push_table(table);
        assert_eq!(set.local().level(), 1);
    }
}
