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

//! Names of variables the core uses

/// Name of the variable that holds the index of the next argument `getopts`
/// parses
pub const OPTIND: &str = "OPTIND";

/// Initial value of [`OPTIND`]
pub const OPTIND_INITIAL_VALUE: &str = "1";

/// Name of the variable that holds the position within the current argument
/// of the next option `getopts` parses
///
/// `0` means the argument has not been entered yet.
pub const OPTSUB: &str = "OPTSUB";

/// Name of the variable `getopts` stores an option argument in
pub const OPTARG: &str = "OPTARG";
