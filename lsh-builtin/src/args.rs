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

//! Command-line option parser
//!
//! This module parses single-character options the way the `getopt`
//! function does. Each call to [`next`] examines one option and leaves a
//! [`Cursor`] pointing at the next one, so that options combined in a single
//! argument like `-abc` are returned one at a time.
//!
//! ```
//! # use lsh_builtin::args::{next, Cursor, Next, OptArg, OptionSpec};
//! let args = ["cmd", "-ab", "-c", "value", "operand"];
//! let spec = OptionSpec::new("abc:");
//! let mut cursor = Cursor::default();
//! assert_eq!(next(&args, &spec, &mut cursor), Next::Option { name: 'a', plus: false });
//! assert_eq!(next(&args, &spec, &mut cursor), Next::Option { name: 'b', plus: false });
//! assert_eq!(next(&args, &spec, &mut cursor), Next::Option { name: 'c', plus: false });
//! assert_eq!(cursor.argument, OptArg::Given("value".to_string()));
//! assert_eq!(next(&args, &spec, &mut cursor), Next::End);
//! assert_eq!(cursor.index, 4);
//! ```
//!
//! The cursor is owned by the caller and never reset implicitly. Reset it
//! (or create a new one) before parsing another argument list.

use bitflags::bitflags;
use lsh_env::Env;
use lsh_env::option::{Interactive, State};
use lsh_env::semantics::{Divert, ExitStatus};
use std::ops::ControlFlow::{self, Break, Continue};
use thiserror::Error;

/// Type of an option
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OptionType {
    NoArgument,
    TakesArgument,
    /// Option not listed in the option spec
    Unknown,
}

/// Set of accepted options
///
/// The option spec is a string of option characters. A character followed
/// by `:` takes an argument. The string may start with:
///
/// - `:` to make the caller handle errors silently, and
/// - `+` to accept options introduced by `+` as well as `-`,
///
/// in either order.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct OptionSpec<'a> {
    letters: &'a str,
    silent: bool,
    plus: bool,
}

impl<'a> OptionSpec<'a> {
    #[must_use]
    pub fn new(raw: &'a str) -> Self {
        let mut letters = raw;
        let mut silent = false;
        let mut plus = false;
        for _ in 0..2 {
            if !silent {
                if let Some(rest) = letters.strip_prefix(':') {
                    letters = rest;
                    silent = true;
                    continue;
                }
            }
            if !plus {
                if let Some(rest) = letters.strip_prefix('+') {
                    letters = rest;
                    plus = true;
                }
            }
        }
        OptionSpec {
            letters,
            silent,
            plus,
        }
    }

    /// Whether the option spec starts with `:`
    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.silent
    }

    /// Whether `+` introduces options
    #[must_use]
    pub fn allows_plus(&self) -> bool {
        self.plus
    }

    /// Returns the type of the option.
    #[must_use]
    pub fn judge(&self, option: char) -> OptionType {
        if option == ':' {
            return OptionType::Unknown;
        }
        let mut chars = self.letters.chars();
        match chars.find(|&c| c == option) {
            None => OptionType::Unknown,
            Some(_) if chars.next() == Some(':') => OptionType::TakesArgument,
            Some(_) => OptionType::NoArgument,
        }
    }

    /// Tests whether an argument would be parsed as options.
    pub(crate) fn introduces_options(&self, arg: &str) -> bool {
        (arg.starts_with('-') && arg.len() > 1) || (self.plus && arg.starts_with('+'))
    }
}

impl<'a> From<&'a str> for OptionSpec<'a> {
    fn from(raw: &'a str) -> Self {
        Self::new(raw)
    }
}

/// Argument of the last parsed option
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum OptArg {
    /// The option takes no argument, or no option has been parsed.
    #[default]
    Absent,
    Given(String),
    /// The option takes an argument, but none was given.
    ///
    /// This is distinct from `Given(String::new())`, which results from an
    /// empty argument.
    Missing,
}

/// Position of the parser in the arguments
///
/// `index` and `sub` are the resumable part of the state. The other fields
/// describe the result of the last call to [`next`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Cursor {
    /// Index of the argument to examine next
    ///
    /// The argument at index 0 is the command name, so parsing starts at 1.
    pub index: usize,
    /// Byte offset of the next option character in the argument at `index`
    ///
    /// 0 means the argument has not been entered yet.
    pub sub: usize,
    /// Option character that caused the last error
    pub invalid: Option<char>,
    /// Argument of the last parsed option
    pub argument: OptArg,
}

impl Default for Cursor {
    fn default() -> Self {
        Cursor {
            index: 1,
            sub: 0,
            invalid: None,
            argument: OptArg::Absent,
        }
    }
}

impl Cursor {
    /// Moves the cursor back to the first argument.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn advance(&mut self) {
        self.index += 1;
        self.sub = 0;
    }
}

/// Error found in the arguments
#[derive(Clone, Copy, Debug, Eq, Error, Hash, PartialEq)]
pub enum ParseError {
    #[error("invalid option -- '{0}'")]
    UnknownOption(char),
    #[error("option requires an argument -- '{0}'")]
    MissingArgument(char),
}

impl ParseError {
    /// Returns the option character the error is about.
    #[must_use]
    pub fn option(&self) -> char {
        match *self {
            ParseError::UnknownOption(c) | ParseError::MissingArgument(c) => c,
        }
    }
}

/// Result of a call to [`next`]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Next {
    /// An option was parsed.
    Option {
        name: char,
        /// Whether the option was introduced by `+`
        plus: bool,
    },
    /// No more options
    End,
    Error(ParseError),
}

/// Parses the next option.
///
/// `args[0]` is the command name and is never examined.
///
/// Parsing ends at `--`, which is skipped, and at the first argument that
/// does not start with `-` (or `+` if the option spec allows it), which
/// is left for the caller as the first operand. A lone `-` is an operand.
///
/// The argument of an option is the rest of the argument the option appears
/// in, or the next argument if the option is at the end. The next argument
/// is not taken if it looks like options; the argument is then reported
/// missing.
pub fn next<S: AsRef<str>>(args: &[S], spec: &OptionSpec<'_>, cursor: &mut Cursor) -> Next {
    cursor.invalid = None;
    cursor.argument = OptArg::Absent;

    let Some(arg) = args.get(cursor.index).map(AsRef::<str>::as_ref) else {
        cursor.sub = 0;
        return Next::End;
    };

    if cursor.sub == 0 {
        if arg == "--" {
            cursor.advance();
            return Next::End;
        }
        if !spec.introduces_options(arg) || arg.len() < 2 {
            return Next::End;
        }
        cursor.sub = 1;
    } else if cursor.sub >= arg.len() || !arg.is_char_boundary(cursor.sub) {
        // The argument is not the one the cursor was left in.
        cursor.advance();
        return next(args, spec, cursor);
    }

    let plus = arg.starts_with('+');
    let Some(option) = arg[cursor.sub..].chars().next() else {
        cursor.advance();
        return Next::End;
    };
    let after = cursor.sub + option.len_utf8();
    let at_end = after == arg.len();
    if at_end {
        cursor.advance();
    } else {
        cursor.sub = after;
    }

    match spec.judge(option) {
        OptionType::Unknown => {
            cursor.invalid = Some(option);
            return Next::Error(ParseError::UnknownOption(option));
        }
        OptionType::NoArgument => (),
        OptionType::TakesArgument if !at_end => {
            cursor.argument = OptArg::Given(arg[after..].to_owned());
            cursor.advance();
        }
        OptionType::TakesArgument => match args.get(cursor.index).map(AsRef::<str>::as_ref) {
            Some(value) if !spec.introduces_options(value) => {
                cursor.argument = OptArg::Given(value.to_owned());
                cursor.advance();
            }
            _ => {
                cursor.invalid = Some(option);
                cursor.argument = OptArg::Missing;
                return Next::Error(ParseError::MissingArgument(option));
            }
        },
    }
    Next::Option { name: option, plus }
}

bitflags! {
    /// Error handling of [`next_option`]
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct ParseFlags: u8 {
        /// Print an error message unless the option spec is silent.
        const PRINT_ERRORS = 1 << 0;
        /// Exit the shell on error unless it is interactive.
        const EXIT_ON_ERROR = 1 << 1;
    }
}

/// Parses the next option for a built-in.
///
/// This function is [`next`] plus error handling. On error, a message of
/// the form `<command>: invalid option -- 'x'` is printed through the
/// environment's hooks if `flags` has `PRINT_ERRORS` and the option spec
/// is not silent. If `flags` has `EXIT_ON_ERROR` and the shell is not
/// interactive, the result is a `Break` asking to exit with
/// [`ExitStatus::ERROR`].
pub fn next_option<S: AsRef<str>>(
    env: &mut Env,
    command: &str,
    args: &[S],
    spec: &OptionSpec<'_>,
    cursor: &mut Cursor,
    flags: ParseFlags,
) -> ControlFlow<Divert, Next> {
    let result = next(args, spec, cursor);
    if let Next::Error(error) = result {
        if flags.contains(ParseFlags::PRINT_ERRORS) && !spec.is_silent() {
            env.hooks.print_error(&format!("{command}: {error}"));
        }
        if flags.contains(ParseFlags::EXIT_ON_ERROR) && env.options.get(Interactive) == State::Off
        {
            return Break(Divert::Exit(Some(ExitStatus::ERROR)));
        }
    }
    Continue(result)
}

/// Option parsed by [`parse_all`]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Parsed {
    pub name: char,
    pub plus: bool,
    pub argument: Option<String>,
}

/// Parses all options.
///
/// Returns the options and the index of the first operand.
pub fn parse_all<S: AsRef<str>>(
    args: &[S],
    spec: &OptionSpec<'_>,
) -> Result<(Vec<Parsed>, usize), ParseError> {
    let mut cursor = Cursor::default();
    let mut options = Vec::new();
    loop {
        match next(args, spec, &mut cursor) {
            Next::Option { name, plus } => {
                let argument = match std::mem::take(&mut cursor.argument) {
                    OptArg::Given(argument) => Some(argument),
                    OptArg::Absent | OptArg::Missing => None,
                };
                options.push(Parsed {
                    name,
                    plus,
                    argument,
                });
            }
            Next::End => return Ok((options, cursor.index)),
            Next::Error(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use lsh_env::hooks::DefaultHooks;
    use std::rc::Rc;

    fn option(name: char) -> Next {
        Next::Option { name, plus: false }
    }

    #[test]
    fn spec_prefixes() {
        let spec = OptionSpec::new(":+ab:");
        assert!(spec.is_silent());
        assert!(spec.allows_plus());
        let spec = OptionSpec::new("+:a");
        assert!(spec.is_silent());
        assert!(spec.allows_plus());
        let spec = OptionSpec::new("a:");
        assert!(!spec.is_silent());
        assert!(!spec.allows_plus());
    }

    #[test]
    fn judging_options() {
        let spec = OptionSpec::new(":ab:");
        assert_eq!(spec.judge('a'), OptionType::NoArgument);
        assert_eq!(spec.judge('b'), OptionType::TakesArgument);
        assert_eq!(spec.judge('c'), OptionType::Unknown);
        assert_eq!(spec.judge(':'), OptionType::Unknown);
    }

    #[test]
    fn combined_options_one_per_call() {
        let args = ["cmd", "-abc", "foo"];
        let spec = OptionSpec::new("abc");
        let mut cursor = Cursor::default();
        assert_eq!(next(&args, &spec, &mut cursor), option('a'));
        assert_eq!((cursor.index, cursor.sub), (1, 2));
        assert_eq!(next(&args, &spec, &mut cursor), option('b'));
        assert_eq!((cursor.index, cursor.sub), (1, 3));
        assert_eq!(next(&args, &spec, &mut cursor), option('c'));
        assert_eq!((cursor.index, cursor.sub), (2, 0));
        assert_eq!(next(&args, &spec, &mut cursor), Next::End);
        assert_eq!(args[cursor.index], "foo");
        assert_eq!(next(&args, &spec, &mut cursor), Next::End);
        assert_eq!(cursor.index, 2);
    }

    #[test]
    fn missing_argument_at_end() {
        let args = ["cmd", "-a"];
        let spec = OptionSpec::new("a:");
        let mut cursor = Cursor::default();
        let result = next(&args, &spec, &mut cursor);
        assert_eq!(result, Next::Error(ParseError::MissingArgument('a')));
        assert_eq!(cursor.argument, OptArg::Missing);
        assert_ne!(cursor.argument, OptArg::Given(String::new()));
        assert_eq!(cursor.invalid, Some('a'));
        assert_eq!(cursor.index, 2);
    }

    #[test]
    fn argument_in_same_or_next_argument() {
        let args = ["cmd", "-avalue", "-b", "", "-a", "x"];
        let spec = OptionSpec::new("a:b:");
        let mut cursor = Cursor::default();
        assert_eq!(next(&args, &spec, &mut cursor), option('a'));
        assert_eq!(cursor.argument, OptArg::Given("value".to_string()));
        assert_eq!(next(&args, &spec, &mut cursor), option('b'));
        assert_eq!(cursor.argument, OptArg::Given(String::new()));
        assert_eq!(next(&args, &spec, &mut cursor), option('a'));
        assert_eq!(cursor.argument, OptArg::Given("x".to_string()));
        assert_eq!(next(&args, &spec, &mut cursor), Next::End);
        assert_eq!(cursor.index, 6);
    }

    #[test]
    fn argument_that_looks_like_option_is_not_taken() {
        let args = ["cmd", "-a", "-b"];
        let spec = OptionSpec::new("a:b");
        let mut cursor = Cursor::default();
        let result = next(&args, &spec, &mut cursor);
        assert_eq!(result, Next::Error(ParseError::MissingArgument('a')));
        assert_eq!(cursor.index, 2);
        assert_eq!(next(&args, &spec, &mut cursor), option('b'));
    }

    #[test]
    fn unknown_option() {
        let args = ["cmd", "-xa"];
        let spec = OptionSpec::new("a");
        let mut cursor = Cursor::default();
        let result = next(&args, &spec, &mut cursor);
        assert_eq!(result, Next::Error(ParseError::UnknownOption('x')));
        assert_eq!(cursor.invalid, Some('x'));
        assert_eq!(next(&args, &spec, &mut cursor), option('a'));
        assert_eq!(cursor.invalid, None);
    }

    #[test]
    fn double_hyphen_ends_options() {
        let args = ["cmd", "-a", "--", "-a"];
        let spec = OptionSpec::new("a");
        let mut cursor = Cursor::default();
        assert_eq!(next(&args, &spec, &mut cursor), option('a'));
        assert_eq!(next(&args, &spec, &mut cursor), Next::End);
        assert_eq!(cursor.index, 3);
    }

    #[test]
    fn operands_end_options() {
        let spec = OptionSpec::new("a");
        for args in [["cmd", "foo", "-a"], ["cmd", "-", "-a"], ["cmd", "+a", "-a"]] {
            let mut cursor = Cursor::default();
            assert_eq!(next(&args, &spec, &mut cursor), Next::End, "{args:?}");
            assert_eq!(cursor.index, 1);
        }
        let mut cursor = Cursor::default();
        assert_eq!(next(&["cmd"], &spec, &mut cursor), Next::End);
    }

    #[test]
    fn plus_options() {
        let args = ["cmd", "+ab", "-a", "+"];
        let spec = OptionSpec::new("+ab");
        let mut cursor = Cursor::default();
        let plus = |name| Next::Option { name, plus: true };
        assert_eq!(next(&args, &spec, &mut cursor), plus('a'));
        assert_eq!(next(&args, &spec, &mut cursor), plus('b'));
        assert_eq!(next(&args, &spec, &mut cursor), option('a'));
        assert_eq!(next(&args, &spec, &mut cursor), Next::End);
        assert_eq!(cursor.index, 3);
    }

    #[test]
    fn stale_sub_position_moves_to_next_argument() {
        let args = ["cmd", "-a", "-b"];
        let spec = OptionSpec::new("ab");
        let mut cursor = Cursor {
            index: 1,
            sub: 5,
            ..Cursor::default()
        };
        assert_eq!(next(&args, &spec, &mut cursor), option('b'));
    }

    #[test]
    fn non_ascii_options() {
        let args = ["cmd", "-éa"];
        let spec = OptionSpec::new("éa");
        let mut cursor = Cursor::default();
        assert_eq!(next(&args, &spec, &mut cursor), option('é'));
        assert_eq!(cursor.sub, 3);
        assert_eq!(next(&args, &spec, &mut cursor), option('a'));
    }

    #[test]
    fn cursor_is_not_reset_implicitly() {
        let spec = OptionSpec::new("a");
        let mut cursor = Cursor::default();
        assert_eq!(next(&["cmd", "-a"], &spec, &mut cursor), option('a'));
        assert_eq!(next(&["cmd", "-a"], &spec, &mut cursor), Next::End);
        cursor.reset();
        assert_eq!(next(&["cmd", "-a"], &spec, &mut cursor), option('a'));
    }

    #[test]
    fn parsing_all_options() {
        let args = ["cmd", "-ab", "x", "+c", "operand"];
        let (options, index) = parse_all(&args, &OptionSpec::new("+ab:c")).unwrap();
        assert_eq!(
            options,
            [
                Parsed {
                    name: 'a',
                    plus: false,
                    argument: None,
                },
                Parsed {
                    name: 'b',
                    plus: false,
                    argument: Some("x".to_string()),
                },
                Parsed {
                    name: 'c',
                    plus: true,
                    argument: None,
                },
            ],
        );
        assert_eq!(index, 4);

        let result = parse_all(&["cmd", "-z"], &OptionSpec::new("a"));
        assert_eq!(result, Err(ParseError::UnknownOption('z')));
    }

    fn env_with_errors() -> (Env, Rc<std::cell::RefCell<Vec<String>>>) {
        let hooks = DefaultHooks::default();
        let errors = Rc::clone(&hooks.errors);
        (Env::with_hooks(Box::new(hooks)), errors)
    }

    #[test]
    fn printing_errors() {
        let (mut env, errors) = env_with_errors();
        let mut cursor = Cursor::default();
        let result = next_option(
            &mut env,
            "cmd",
            &["cmd", "-x", "-a"],
            &OptionSpec::new("a:"),
            &mut cursor,
            ParseFlags::PRINT_ERRORS,
        );
        assert_eq!(result, Continue(Next::Error(ParseError::UnknownOption('x'))));
        let result = next_option(
            &mut env,
            "cmd",
            &["cmd", "-x", "-a"],
            &OptionSpec::new("a:"),
            &mut cursor,
            ParseFlags::PRINT_ERRORS,
        );
        assert_eq!(result, Continue(Next::Error(ParseError::MissingArgument('a'))));
        assert_eq!(
            *errors.borrow(),
            [
                "cmd: invalid option -- 'x'",
                "cmd: option requires an argument -- 'a'",
            ],
        );
    }

    #[test]
    fn silent_spec_prints_nothing() {
        let (mut env, errors) = env_with_errors();
        let mut cursor = Cursor::default();
        let result = next_option(
            &mut env,
            "cmd",
            &["cmd", "-x"],
            &OptionSpec::new(":a"),
            &mut cursor,
            ParseFlags::PRINT_ERRORS,
        );
        assert_matches!(result, Continue(Next::Error(_)));
        assert!(errors.borrow().is_empty());
    }

    #[test]
    fn exiting_on_error() {
        let (mut env, _errors) = env_with_errors();
        let flags = ParseFlags::PRINT_ERRORS | ParseFlags::EXIT_ON_ERROR;
        let spec = OptionSpec::new("a");
        let mut cursor = Cursor::default();
        let result = next_option(&mut env, "cmd", &["cmd", "-x"], &spec, &mut cursor, flags);
        assert_eq!(result, Break(Divert::Exit(Some(ExitStatus::ERROR))));

        env.options.set(Interactive, State::On);
        cursor.reset();
        let result = next_option(&mut env, "cmd", &["cmd", "-x"], &spec, &mut cursor, flags);
        assert_eq!(result, Continue(Next::Error(ParseError::UnknownOption('x'))));

        cursor.reset();
        let result = next_option(&mut env, "cmd", &["cmd", "-a"], &spec, &mut cursor, flags);
        assert_eq!(result, Continue(option('a')));
    }
}
