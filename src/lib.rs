// Copyright 2025 Chisomo Makombo Sakala
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Lowerbench
//!
//! `lowerbench` measures how long a compiler front-end (such as `vast-front`)
//! takes to lower every compilation unit of a Clang compilation database, and
//! turns the resulting reports into Markdown tables.
//!
//! The `lowerbench` binary has two subcommands that only share the TSV report
//! format: `run` writes one report, `report` merges any number of them.
//!
//! ## Core Modules
//!
//! * [`compile_db`]: Loads `compile_commands.json` into [`compile_db::CompileCommand`]s.
//! * [`command`]: Rewrites one compiler invocation into a front-end invocation.
//! * [`runner`]: Runs every unit on a bounded worker pool and writes the TSV
//!   report, in input order.
//! * [`artifacts`]: Collision-free file naming inside the output directory.
//! * [`report`]: Merges TSV reports on their unit column and renders Markdown.
//! * [`config`]: Resolves CLI arguments, config files and environment
//!   variables into `RunConfig` and `ReportConfig`.
//! * [`cli`]: Defines the `clap`-based command-line interface.
//! * [`error`]: Defines the custom error types for the library.
//! * [`logging`]: Provides the `setup_tracing` utility.

pub mod artifacts;
pub mod cli;
pub mod command;
pub mod compile_db;
pub mod config;
pub mod error;
pub mod logging;
pub mod report;
pub mod runner;
