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

//! Shell options
//!
//! An [`OptionSet`] records whether each [`Option`] is on or off. Only the
//! options that change the behavior of the core are defined here; the
//! embedding shell may keep its other options elsewhere.

use enumset::EnumSet;
use enumset::EnumSetType;
use std::fmt::Display;
use std::fmt::Formatter;
use std::ops::Not;
use std::str::FromStr;
use thiserror::Error;

/// State of an option
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum State {
    On,
    Off,
}

pub use State::*;

/// Converts a state to a string (`on` or `off`).
impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            On => "on",
            Off => "off",
        }
        .fmt(f)
    }
}

impl Not for State {
    type Output = Self;
    fn not(self) -> Self {
        match self {
            On => Off,
            Off => On,
        }
    }
}

impl From<bool> for State {
    fn from(on: bool) -> Self {
        if on { On } else { Off }
    }
}

/// Shell option
#[derive(Clone, Copy, Debug, EnumSetType, Eq, Hash, PartialEq)]
#[enumset(no_super_impls)]
pub enum Option {
    /// Exports every variable when it is assigned.
    AllExport,
    /// Enables features for interactive use.
    ///
    /// A non-interactive shell exits when a built-in is given an invalid
    /// option.
    Interactive,
    /// Expands unset variables to an empty string (or zero in arithmetic)
    /// rather than erroring out.
    Unset,
}

pub use self::Option::*;

impl Option {
    /// Returns the option name, all in lower case.
    #[must_use]
    pub fn long_name(self) -> &'static str {
        match self {
            AllExport => "allexport",
            Interactive => "interactive",
            Unset => "unset",
        }
    }

    /// Returns the single-character name and the state it turns the option
    /// into when given with `-`.
    #[must_use]
    pub fn short_name(self) -> (char, State) {
        match self {
            AllExport => ('a', On),
            Interactive => ('i', On),
            Unset => ('u', Off),
        }
    }

    /// Returns an iterator over all options in alphabetical order.
    pub fn iter() -> impl DoubleEndedIterator<Item = Option> + ExactSizeIterator {
        EnumSet::<Option>::all().iter()
    }
}

impl Display for Option {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.long_name().fmt(f)
    }
}

/// Error in parsing an option name
#[derive(Clone, Copy, Debug, Eq, Error, Hash, PartialEq)]
pub enum FromStrError {
    #[error("no such option")]
    NoSuchOption,
    /// The name is a prefix of more than one option name.
    #[error("ambiguous option name")]
    Ambiguous,
}

/// Parses an option name.
///
/// The name may be abbreviated to any unambiguous prefix.
///
/// ```
/// # use lsh_env::option::{FromStrError, Option};
/// assert_eq!("allexport".parse(), Ok(Option::AllExport));
/// assert_eq!("inter".parse(), Ok(Option::Interactive));
/// assert_eq!("".parse::<Option>(), Err(FromStrError::Ambiguous));
/// ```
impl FromStr for Option {
    type Err = FromStrError;
    fn from_str(name: &str) -> Result<Self, FromStrError> {
        let mut candidates = Option::iter().filter(|o| o.long_name().starts_with(name));
        let first = candidates.next().ok_or(FromStrError::NoSuchOption)?;
        if first.long_name() == name || candidates.next().is_none() {
            Ok(first)
        } else {
            Err(FromStrError::Ambiguous)
        }
    }
}

/// Parses a single-character option name.
///
/// Returns the option and the state the `-` form sets it to.
#[must_use]
pub fn parse_short(name: char) -> std::option::Option<(Option, State)> {
    Option::iter().find_map(|option| {
        let (c, state) = option.short_name();
        (c == name).then_some((option, state))
    })
}

/// Parses a long option name that may be negated with a `no` prefix.
///
/// ```
/// # use lsh_env::option::{parse_long, Option::*, State::*};
/// assert_eq!(parse_long("unset"), Ok((Unset, On)));
/// assert_eq!(parse_long("nounset"), Ok((Unset, Off)));
/// ```
pub fn parse_long(name: &str) -> Result<(Option, State), FromStrError> {
    match name.strip_prefix("no") {
        Some(rest) if !rest.is_empty() => match Option::from_str(name) {
            Ok(option) => Ok((option, On)),
            Err(_) => Option::from_str(rest).map(|option| (option, Off)),
        },
        _ => Option::from_str(name).map(|option| (option, On)),
    }
}

/// Set of the shell options and their states
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct OptionSet {
    enabled_options: EnumSet<Option>,
}

/// Only `Unset` is enabled by default.
impl Default for OptionSet {
    fn default() -> Self {
        OptionSet {
            enabled_options: Unset.into(),
        }
    }
}

impl OptionSet {
    /// Creates an option set with all options disabled.
    #[must_use]
    pub fn empty() -> Self {
        OptionSet {
            enabled_options: EnumSet::empty(),
        }
    }

    /// Returns the current state of the option.
    #[must_use]
    pub fn get(&self, option: Option) -> State {
        self.enabled_options.contains(option).into()
    }

    /// Changes the state of the option.
    pub fn set(&mut self, option: Option, state: State) {
        match state {
            On => self.enabled_options.insert(option),
            Off => self.enabled_options.remove(option),
        };
    }

    /// Returns an iterator over all options and their states.
    pub fn iter(&self) -> impl Iterator<Item = (Option, State)> + '_ {
        Option::iter().map(|option| (option, self.get(option)))
    }
}
