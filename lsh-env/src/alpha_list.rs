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

//! Sorted list of strings for listings

use std::fmt::Display;
use std::fmt::Formatter;

/// List of strings kept in byte-wise lexical order
///
/// Listings such as a dump of variables are built by adding one formatted
/// entry per item and then printing the list, which yields the entries in
/// sorted order regardless of the order of insertion. Duplicates are kept.
///
/// ```
/// # use lsh_env::AlphaList;
/// let mut list = AlphaList::new();
/// list.add("foo=1".to_string());
/// list.add_fmt(format_args!("{}={}", "bar", 2));
/// assert_eq!(list.to_string(), "bar=2\nfoo=1\n");
/// ```
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct AlphaList {
    entries: Vec<String>,
}

impl AlphaList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry at its sorted position.
    pub fn add(&mut self, entry: String) {
        let index = self.entries.partition_point(|e| *e <= entry);
        self.entries.insert(index, entry);
    }

    /// Formats a new entry and inserts it.
    pub fn add_fmt(&mut self, args: std::fmt::Arguments<'_>) {
        self.add(args.to_string())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over the entries in sorted order.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.entries.iter()
    }

    /// Returns the sorted entries.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.entries
    }
}

impl Extend<String> for AlphaList {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        for entry in iter {
            self.add(entry)
        }
    }
}

impl FromIterator<String> for AlphaList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut entries: Vec<String> = iter.into_iter().collect();
        entries.sort();
        AlphaList { entries }
    }
}

impl<'a> IntoIterator for &'a AlphaList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Prints each entry on its own line.
impl Display for AlphaList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.entries.iter().try_for_each(|entry| writeln!(f, "{entry}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list() {
        let list = AlphaList::new();
        assert!(list.is_empty());
        assert_eq!(list.to_string(), "");
    }

    #[test]
    fn entries_are_sorted_after_each_insertion() {
        let mut list = AlphaList::new();
        for entry in ["m", "b", "z", "B", "a", "mm", "_", "b"] {
            list.add(entry.to_string());
            assert!(list.iter().zip(list.iter().skip(1)).all(|(a, b)| a <= b));
        }
        assert_eq!(list.len(), 8);
        assert_eq!(list.into_vec(), ["B", "_", "a", "b", "b", "m", "mm", "z"]);
    }

    #[test]
    fn byte_wise_order() {
        let list: AlphaList = ["é", "z", "Z", "10", "9"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(list.to_string(), "10\n9\nZ\nz\né\n");
    }

    #[test]
    fn formatted_entries() {
        let mut list = AlphaList::new();
        list.add_fmt(format_args!("{}={}", "x", 1));
        list.extend(["a=2".to_string()]);
        assert_eq!(list.to_string(), "a=2\nx=1\n");
    }
}
