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

//! Exit statuses and interruption of command execution

use std::ops::ControlFlow;

/// Number that summarizes the result of command execution
///
/// The special parameter `$?` expands to the exit status of the last
/// executed command. Arithmetic expansion also updates it: a non-zero result
/// yields [`SUCCESS`](Self::SUCCESS) and zero yields
/// [`FAILURE`](Self::FAILURE).
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ExitStatus(pub i32);

impl std::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i32> for ExitStatus {
    fn from(value: i32) -> ExitStatus {
        ExitStatus(value)
    }
}

impl From<ExitStatus> for i32 {
    fn from(exit_status: ExitStatus) -> i32 {
        exit_status.0
    }
}

impl ExitStatus {
    /// Exit status of 0: success
    pub const SUCCESS: ExitStatus = ExitStatus(0);
    /// Exit status of 1: failure
    pub const FAILURE: ExitStatus = ExitStatus(1);
    /// Exit status of 2: error severer than failure, such as a usage error
    pub const ERROR: ExitStatus = ExitStatus(2);
}

/// Request to stop the normal flow of execution
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Divert {
    /// Exit from the shell with the given exit status, or with the current
    /// exit status if `None`.
    Exit(Option<ExitStatus>),
}

impl Divert {
    /// Returns the exit status associated with the `Divert`.
    #[must_use]
    pub fn exit_status(&self) -> Option<ExitStatus> {
        match self {
            Divert::Exit(exit_status) => *exit_status,
        }
    }
}

/// Result of command execution
///
/// A `Break` carries the [`Divert`] the caller should act on.
pub type Result<T = ()> = ControlFlow<Divert, T>;
