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

//! Reporting the result to the environment

use crate::args::{Cursor, Next, OptArg, ParseError};
use lsh_env::variable::{AssignError, Flags, OPTARG, OPTIND, OPTSUB, Scope, UnsetError};
use lsh_env::{Env, SetControl};
use thiserror::Error;

/// Error in reporting the result to the environment
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// Variable name not acceptable
    #[error("`{0}` is not a valid variable name")]
    InvalidVariableName(String),
    #[error(transparent)]
    AssignError(#[from] AssignError),
    #[error(transparent)]
    UnsetError(#[from] UnsetError),
}

/// Tests whether the string is a valid variable name.
fn is_name(name: &str) -> bool {
    !name.starts_with(|c: char| c.is_ascii_digit())
        && !name.is_empty()
        && name.chars().all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn assign(env: &mut Env, name: &str, value: &str) -> Result<(), AssignError> {
    env.set(
        name,
        Some(value),
        Flags::empty(),
        Flags::empty(),
        SetControl::empty(),
    )
}

/// Updates variables to reflect the result and returns an error message to
/// be printed.
///
/// The variable named `var_name` is set to the option (prefixed with `+` if
/// it was given with `+`), `?` on error or at the end of options, or `:` for
/// a missing argument if `silent`. `$OPTARG` is set to the option argument,
/// or to the offending option character on error if `silent`; otherwise it
/// is unset. Finally `$OPTIND` and `$OPTSUB` are set to the cursor position.
///
/// A message is returned for an error found in the arguments unless
/// `silent`.
pub fn report(
    env: &mut Env,
    outcome: Next,
    cursor: &Cursor,
    silent: bool,
    var_name: &str,
) -> Result<Option<String>, Error> {
    if !is_name(var_name) {
        return Err(Error::InvalidVariableName(var_name.to_owned()));
    }

    let (var_value, optarg, message) = match outcome {
        Next::Option { name, plus } => {
            let value = if plus {
                format!("+{name}")
            } else {
                name.to_string()
            };
            let optarg = match &cursor.argument {
                OptArg::Given(argument) => Some(argument.clone()),
                OptArg::Absent | OptArg::Missing => None,
            };
            (value, optarg, None)
        }
        Next::End => ("?".to_owned(), None, None),
        Next::Error(error) if silent => {
            let value = match error {
                ParseError::UnknownOption(_) => "?",
                ParseError::MissingArgument(_) => ":",
            };
            (value.to_owned(), Some(error.option().to_string()), None)
        }
        Next::Error(error) => {
            let message = format!("{}: {error}", env.arg0);
            ("?".to_owned(), None, Some(message))
        }
    };

    assign(env, var_name, &var_value)?;
    match optarg {
        Some(optarg) => assign(env, OPTARG, &optarg)?,
        None => {
            env.unset(OPTARG, Scope::Visible)?;
        }
    }
    assign(env, OPTIND, &cursor.index.to_string())?;
    assign(env, OPTSUB, &cursor.sub.to_string())?;

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn cursor(index: usize, sub: usize, argument: OptArg) -> Cursor {
        Cursor {
            index,
            sub,
            invalid: None,
            argument,
        }
    }

    fn env_with_dummy_optarg() -> Env {
        let mut env = Env::new();
        env.arg0 = "some/arg0".to_string();
        assign(&mut env, OPTARG, "DUMMY").unwrap();
        env
    }

    #[test]
    fn report_standard_result() {
        let mut env = env_with_dummy_optarg();
        let outcome = Next::Option {
            name: 'a',
            plus: false,
        };
        let result = report(&mut env, outcome, &cursor(1, 2, OptArg::Absent), false, "opt");
        assert_eq!(result, Ok(None));
        assert_eq!(env.get("opt"), Some("a"));
        assert_eq!(env.get(OPTARG), None);
        assert_eq!(env.get(OPTIND), Some("1"));
        assert_eq!(env.get(OPTSUB), Some("2"));
    }

    #[test]
    fn report_option_with_argument() {
        let mut env = env_with_dummy_optarg();
        let outcome = Next::Option {
            name: 'b',
            plus: true,
        };
        let argument = OptArg::Given("value".to_string());
        let result = report(&mut env, outcome, &cursor(3, 0, argument), false, "opt");
        assert_eq!(result, Ok(None));
        assert_eq!(env.get("opt"), Some("+b"));
        assert_eq!(env.get(OPTARG), Some("value"));
        assert_eq!(env.get(OPTIND), Some("3"));
        assert_eq!(env.get(OPTSUB), Some("0"));
    }

    #[test]
    fn report_end_of_options() {
        let mut env = env_with_dummy_optarg();
        let result = report(&mut env, Next::End, &cursor(4, 0, OptArg::Absent), false, "o");
        assert_eq!(result, Ok(None));
        assert_eq!(env.get("o"), Some("?"));
        assert_eq!(env.get(OPTARG), None);
        assert_eq!(env.get(OPTIND), Some("4"));
    }

    #[test]
    fn report_errors_verbosely() {
        let mut env = env_with_dummy_optarg();
        let outcome = Next::Error(ParseError::UnknownOption('x'));
        let result = report(&mut env, outcome, &cursor(2, 0, OptArg::Absent), false, "o");
        assert_eq!(
            result,
            Ok(Some("some/arg0: invalid option -- 'x'".to_string())),
        );
        assert_eq!(env.get("o"), Some("?"));
        assert_eq!(env.get(OPTARG), None);

        let outcome = Next::Error(ParseError::MissingArgument('y'));
        let result = report(&mut env, outcome, &cursor(2, 0, OptArg::Missing), false, "o");
        assert_eq!(
            result,
            Ok(Some("some/arg0: option requires an argument -- 'y'".to_string())),
        );
        assert_eq!(env.get("o"), Some("?"));
        assert_eq!(env.get(OPTARG), None);
    }

    #[test]
    fn report_errors_silently() {
        let mut env = env_with_dummy_optarg();
        let outcome = Next::Error(ParseError::UnknownOption('x'));
        let result = report(&mut env, outcome, &cursor(2, 0, OptArg::Absent), true, "o");
        assert_eq!(result, Ok(None));
        assert_eq!(env.get("o"), Some("?"));
        assert_eq!(env.get(OPTARG), Some("x"));

        let outcome = Next::Error(ParseError::MissingArgument('y'));
        let result = report(&mut env, outcome, &cursor(2, 0, OptArg::Missing), true, "o");
        assert_eq!(result, Ok(None));
        assert_eq!(env.get("o"), Some(":"));
        assert_eq!(env.get(OPTARG), Some("y"));
    }

    #[test]
    fn invalid_variable_names() {
        for name in ["", "1a", "a=b", "a-b"] {
            let mut env = Env::new();
            let result = report(&mut env, Next::End, &Cursor::default(), false, name);
            assert_eq!(result, Err(Error::InvalidVariableName(name.to_string())));
            assert_eq!(env.get(OPTIND), Some("1"));
        }
        assert!(is_name("_a1"));
    }

    #[test]
    fn read_only_variable() {
        let mut env = Env::new();
        env.set(
            "o",
            Some("z"),
            Flags::READONLY,
            Flags::empty(),
            SetControl::empty(),
        )
        .unwrap();
        let result = report(&mut env, Next::End, &Cursor::default(), false, "o");
        assert_matches!(result, Err(Error::AssignError(AssignError::ReadOnly { name, .. })) => {
            assert_eq!(name, "o");
        });
        assert_eq!(env.get("o"), Some("z"));
    }

    #[test]
    fn read_only_optarg_cannot_be_unset() {
        let mut env = Env::new();
        env.set(
            OPTARG,
            Some("z"),
            Flags::READONLY,
            Flags::empty(),
            SetControl::empty(),
        )
        .unwrap();
        let result = report(&mut env, Next::End, &Cursor::default(), false, "o");
        assert_eq!(
            result,
            Err(Error::UnsetError(UnsetError {
                name: OPTARG.to_string()
            })),
        );
    }
}
