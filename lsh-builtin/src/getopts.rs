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

//! Getopts built-in
//!
//! The **`getopts`** built-in is used to parse options in shell scripts.
//!
//! # Synopsis
//!
//! ```sh
//! getopts option_spec variable_name [argument...]
//! ```
//!
//! # Description
//!
//! The getopts built-in parses one option each time it is invoked. The
//! script calls it repeatedly, usually in a `while` loop, until it returns a
//! non-zero exit status.
//!
//! The position of the parse survives between invocations in the `OPTIND`
//! and `OPTSUB` variables. `OPTIND` is the index of the argument to examine
//! next, counted from 1. `OPTSUB` is the byte offset of the next option
//! character within that argument, or 0 if the argument has not been
//! entered. Assigning to `OPTIND` resets `OPTSUB`, so a script restarts
//! the parse with `OPTIND=1`.
//!
//! # Options
//!
//! None.
//!
//! # Operands
//!
//! The *option_spec* operand lists the option characters the script
//! accepts. A character followed by `:` takes an argument. A leading `:`
//! selects silent error reporting, and a leading `+` lets options be
//! introduced by `+` as well as `-`. Both may appear in either order.
//!
//! The *variable_name* operand is the name of the variable the parsed
//! option is assigned to.
//!
//! The remaining *argument*s are parsed. The embedding shell passes the
//! positional parameters when the script does not give any.
//!
//! # Errors
//!
//! An option not in *option_spec* and an option missing its argument are
//! reported on the standard error unless silent reporting is selected. In
//! either case *variable_name* is set to `?`; with silent reporting a
//! missing argument sets it to `:` instead and `OPTARG` receives the option
//! character.
//!
//! It is an error if *variable_name* is not a valid variable name or any of
//! the variables cannot be assigned.
//!
//! # Exit status
//!
//! 0 if an option was parsed, 1 at the end of options, and 2 on an error
//! other than those in the parsed arguments.
//!
//! # Examples
//!
//! ```
//! # use lsh_builtin::getopts::main;
//! # use lsh_builtin::invoke;
//! # use lsh_env::Env;
//! let mut env = Env::new();
//! let args = ["a:b", "opt", "-a", "value", "-b", "operand"].map(String::from);
//! invoke(&mut env, main, &args);
//! assert_eq!(env.get("opt"), Some("a"));
//! assert_eq!(env.get("OPTARG"), Some("value"));
//! invoke(&mut env, main, &args);
//! assert_eq!(env.get("opt"), Some("b"));
//! assert_eq!(env.get("OPTIND"), Some("4"));
//! ```
//!
//! # Portability
//!
//! `OPTSUB` is an extension. Other shells keep the position inside an
//! argument in a hidden variable, so assigning to `OPTIND` in the middle of
//! a grouped option argument may behave differently.

use crate::args::{self, Cursor, Next, OptionSpec};
use lsh_env::Env;
use lsh_env::semantics::ExitStatus;
use lsh_env::variable::{OPTIND, OPTIND_INITIAL_VALUE, OPTSUB};
use tracing::debug;

pub mod report;

/// Restores the parse position from `OPTIND` and `OPTSUB`.
///
/// An `OPTIND` that is not a positive integer restarts the parse. An
/// `OPTSUB` that does not point into an option character of the current
/// argument restarts the current argument.
fn load_cursor(env: &Env, spec: &OptionSpec<'_>, argv: &[String]) -> Cursor {
    let optind = env.get(OPTIND).unwrap_or(OPTIND_INITIAL_VALUE);
    let index = match optind.trim().parse::<usize>() {
        Ok(index) if index >= 1 => index,
        _ => {
            debug!(optind, "invalid OPTIND; parsing from the first argument");
            1
        }
    };

    let mut sub = usize::try_from(env.get_int(OPTSUB, 0)).unwrap_or(0);
    if sub > 0 {
        let resumable = argv.get(index).is_some_and(|arg| {
            spec.introduces_options(arg) && sub < arg.len() && arg.is_char_boundary(sub)
        });
        if !resumable {
            debug!(index, sub, "stale OPTSUB; parsing the argument from its start");
            sub = 0;
        }
    }

    Cursor {
        index,
        sub,
        ..Cursor::default()
    }
}

/// Entry point of the getopts built-in
pub fn main(env: &mut Env, args: &[String]) -> crate::Result {
    let args = match args.first() {
        Some(first) if first == "--" => &args[1..],
        _ => args,
    };
    let [spec, var_name, ..] = args else {
        let message = format!(
            "{}: getopts: usage: getopts option_spec variable_name [argument...]",
            env.arg0
        );
        env.hooks.print_error(&message);
        return ExitStatus::ERROR.into();
    };
    let spec = OptionSpec::new(spec);

    // The variable name stands in for the command name at index 0.
    let argv = &args[1..];

    // Results go to the scope of the caller, not that of the built-in.
    let mut env = env.lend_scope();

    let mut cursor = load_cursor(&env, &spec, argv);
    let outcome = args::next(argv, &spec, &mut cursor);
    match report::report(&mut env, outcome, &cursor, spec.is_silent(), var_name) {
        Ok(message) => {
            if let Some(message) = message {
                env.hooks.print_error(&message);
            }
            match outcome {
                Next::End => ExitStatus::FAILURE.into(),
                Next::Option { .. } | Next::Error(_) => ExitStatus::SUCCESS.into(),
            }
        }
        Err(error) => {
            let message = format!("{}: getopts: {error}", env.arg0);
            env.hooks.print_error(&message);
            ExitStatus::ERROR.into()
        }
    }
}
