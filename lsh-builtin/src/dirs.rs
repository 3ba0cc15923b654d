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

//! Directory stack
//!
//! [`DirStack`] holds the directories saved by `pushd`. The top of the stack
//! is the most recently pushed directory.
//!
//! The stack can be saved to and restored from a text in the following
//! format. Each non-blank line that does not start with `#` is `pushd`
//! followed by a space and a path. Lines are applied in order, so the first
//! line is the bottom of the stack. Formatting a stack with [`Display`]
//! produces lines from the bottom, so parsing the result with [`FromStr`]
//! reproduces the stack.
//!
//! ```
//! # use lsh_builtin::dirs::DirStack;
//! let stack: DirStack = "# saved stack\npushd /usr\n\npushd /tmp\n".parse().unwrap();
//! assert_eq!(stack.top(), Some("/tmp"));
//! assert_eq!(stack.to_string(), "pushd /usr\npushd /tmp\n");
//! ```
//!
//! Reading and writing the file is the job of the caller.

use std::collections::VecDeque;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Error in manipulating a directory stack
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum Error {
    /// A line of the text is not a `pushd` line.
    #[error("line {line}: expected `pushd <path>`: {content}")]
    Syntax { line: usize, content: String },
    /// An index does not name an entry.
    #[error("directory stack index {index} out of range (size {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

const PUSHD: &str = "pushd ";

/// Stack of directories
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct DirStack {
    /// Front is the top.
    entries: VecDeque<String>,
}

impl DirStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a directory onto the top.
    pub fn push(&mut self, path: String) {
        self.entries.push_front(path);
    }

    /// Removes the top directory.
    pub fn pop(&mut self) -> Option<String> {
        self.entries.pop_front()
    }

    #[must_use]
    pub fn top(&self) -> Option<&str> {
        self.entries.front().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry at `index`, counted from the top.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    /// Iterates over the entries from the top.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Rotates the stack so that the entry at `index` comes to the top.
    ///
    /// The entries above it move to the bottom in order.
    pub fn rotate(&mut self, index: usize) -> Result<(), Error> {
        let len = self.entries.len();
        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        self.entries.rotate_left(index);
        Ok(())
    }
}

impl FromStr for DirStack {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Error> {
        let mut stack = DirStack::new();
        for (index, line) in text.lines().enumerate() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match trimmed.strip_prefix(PUSHD) {
                Some(path) if !path.is_empty() => stack.push(path.to_owned()),
                _ => {
                    return Err(Error::Syntax {
                        line: index + 1,
                        content: line.to_owned(),
                    });
                }
            }
        }
        Ok(stack)
    }
}

impl Display for DirStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.iter()
            .rev()
            .try_for_each(|path| writeln!(f, "{PUSHD}{path}"))
    }
}

impl<'a> IntoIterator for &'a DirStack {
    type Item = &'a String;
    type IntoIter = std::collections::vec_deque::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
