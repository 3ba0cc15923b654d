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

//! This crate implements the parts of built-in utilities that live in the
//! core of lsh.
//!
//! - [`args`]: the option parser every built-in uses
//! - [`getopts`]: the getopts built-in, which exposes the parser to scripts
//! - [`dirs`]: the directory stack and its text format
//!
//! A built-in is a function of type [`Main`]. [`invoke`] runs it in a scope
//! of its own.

use lsh_env::Env;
use lsh_env::semantics::{Divert, ExitStatus};

pub mod args;
pub mod dirs;
pub mod getopts;

/// Result of built-in utility execution
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Result {
    exit_status: ExitStatus,
    divert: Option<Divert>,
}

impl Result {
    /// Creates a new result.
    #[must_use]
    pub const fn new(exit_status: ExitStatus) -> Self {
        Self {
            exit_status,
            divert: None,
        }
    }

    /// Creates a new result that interrupts the normal flow of execution.
    #[must_use]
    pub const fn with_exit_status_and_divert(exit_status: ExitStatus, divert: Divert) -> Self {
        Self {
            exit_status,
            divert: Some(divert),
        }
    }

    #[must_use]
    pub const fn exit_status(&self) -> ExitStatus {
        self.exit_status
    }

    /// Returns what the caller should do instead of continuing.
    #[must_use]
    pub const fn divert(&self) -> Option<Divert> {
        self.divert
    }
}

impl From<ExitStatus> for Result {
    fn from(exit_status: ExitStatus) -> Self {
        Self::new(exit_status)
    }
}

/// The exit status is that of the divert, or [`ExitStatus::ERROR`] if the
/// divert has none.
impl From<Divert> for Result {
    fn from(divert: Divert) -> Self {
        let exit_status = divert.exit_status().unwrap_or(ExitStatus::ERROR);
        Self::with_exit_status_and_divert(exit_status, divert)
    }
}

/// Entry point of a built-in
///
/// The arguments do not include the name of the built-in.
pub type Main = fn(&mut Env, &[String]) -> Result;

/// Runs a built-in.
///
/// The built-in runs in a new scope that is removed when it returns. The
/// exit status of the environment is updated to that of the result.
pub fn invoke(env: &mut Env, main: Main, args: &[String]) -> Result {
    let result = {
        let mut scope = env.push_scope();
        main(&mut scope, args)
    };
    env.exit_status = result.exit_status();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{Next, OptionSpec, ParseFlags, next_option};
    use lsh_env::option::{Interactive, State};
    use lsh_env::variable::Scope;
    use std::ops::ControlFlow::{Break, Continue};

    fn declare_local(env: &mut Env, _args: &[String]) -> Result {
        env.variables.get_or_new("x", Scope::Local).value = Some("1".to_string());
        ExitStatus::FAILURE.into()
    }

    #[test]
    fn invoked_built_in_has_own_scope() {
        let mut env = Env::new();
        let result = invoke(&mut env, declare_local, &[]);
        assert_eq!(result, Result::new(ExitStatus::FAILURE));
        assert_eq!(result.divert(), None);
        assert_eq!(env.variables.depth(), 1);
        assert_eq!(env.get("x"), None);
        assert_eq!(env.exit_status, ExitStatus::FAILURE);
    }

    fn strict(env: &mut Env, args: &[String]) -> Result {
        let spec = OptionSpec::new("a");
        let mut argv = vec!["strict".to_string()];
        argv.extend_from_slice(args);
        let mut cursor = Default::default();
        loop {
            match next_option(env, "strict", &argv[..], &spec, &mut cursor, ParseFlags::all()) {
                Break(divert) => return divert.into(),
                Continue(Next::End) => return ExitStatus::SUCCESS.into(),
                Continue(Next::Error(_)) => return ExitStatus::ERROR.into(),
                Continue(Next::Option { .. }) => (),
            }
        }
    }

    #[test]
    fn option_error_diverts_non_interactive_shell() {
        let mut env = Env::new();
        let result = invoke(&mut env, strict, &["-a".to_string(), "-x".to_string()]);
        assert_eq!(result.exit_status(), ExitStatus::ERROR);
        assert_eq!(result.divert(), Some(Divert::Exit(Some(ExitStatus::ERROR))));
        assert_eq!(env.exit_status, ExitStatus::ERROR);

        env.options.set(Interactive, State::On);
        let result = invoke(&mut env, strict, &["-x".to_string()]);
        assert_eq!(result, Result::new(ExitStatus::ERROR));

        let result = invoke(&mut env, strict, &["-a".to_string()]);
        assert_eq!(result, Result::new(ExitStatus::SUCCESS));
    }

    #[test]
    fn divert_without_exit_status_yields_error() {
        let result = Result::from(Divert::Exit(None));
        assert_eq!(result.exit_status(), ExitStatus::ERROR);
        assert_eq!(result.divert(), Some(Divert::Exit(None)));
    }
}
