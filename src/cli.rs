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
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
  version,
  about = "Benchmark a compiler front-end over a Clang compilation database"
)]
pub struct Cli {
  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  /// Run the front-end on every unit of a compilation database.
  ///
  /// The time needed to lower each compilation unit is printed to stdout in
  /// TSV format. Progress is printed to stderr. When an output directory is
  /// given, artifacts land there and each failing unit leaves a `.log` file
  /// with the tool's stderr.
  Run(RunArgs),

  /// Combine TSV runtime reports into one Markdown table.
  ///
  /// Each report has two columns, "Compilation unit" and "Runtime or
  /// failure". The compilation units must match, in order, across all
  /// reports.
  Report(ReportArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
  /// Path to the front-end executable (e.g. vast-front).
  pub tool_path: PathBuf,

  /// Path to the Clang compilation database for the benchmark.
  pub compile_commands_file: PathBuf,

  /// Directory to place results. If omitted, then results will be discarded.
  #[arg(long = "output_directory")]
  pub output_directory: Option<PathBuf>,

  /// Print the command run on each compilation unit.
  #[arg(long = "print_commands", overrides_with = "no_print_commands")]
  pub print_commands: bool,

  #[arg(long = "no-print_commands", overrides_with = "print_commands", hide = true)]
  pub no_print_commands: bool,

  /// Number of units lowered concurrently. Defaults to the number of CPUs.
  #[arg(long = "num_processes")]
  pub num_processes: Option<usize>,

  /// Additional front-end option. Can be given multiple times.
  #[arg(long = "vast_option", allow_hyphen_values = true)]
  pub vast_option: Vec<String>,

  /// Print the stderr of every failing unit.
  #[arg(long = "print_errors", overrides_with = "no_print_errors")]
  pub print_errors: bool,

  #[arg(long = "no-print_errors", overrides_with = "print_errors", hide = true)]
  pub no_print_errors: bool,

  /// JSON file with default run settings.
  #[arg(long, env = "LOWERBENCH_CONFIG")]
  pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
  /// JSON object mapping column names to report files.
  /// Example: '{"before": "base.tsv", "after": "patched.tsv"}'.
  /// A plain path reads a single report.
  pub columns: String,

  /// Output filepath (if omitted, the table is printed to stdout).
  #[arg(short = 'o', long = "output_filepath")]
  pub output_filepath: Option<PathBuf>,

  /// Field separator of the input reports (tab by default).
  #[arg(
    short = 't',
    long = "field-separator",
    default_value = "\t",
    hide_default_value = true,
    allow_hyphen_values = true
  )]
  pub field_separator: String,

  /// Leave out the leading "Total passing" row.
  #[arg(long = "no-summary")]
  pub no_summary: bool,
}

/// Collapses a `--flag` / `--no-flag` pair into an optional override.
pub fn toggle(on: bool, off: bool) -> Option<bool> {
  match (on, off) {
    (true, _) => Some(true),
    (_, true) => Some(false),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn run_args_use_underscore_flags() {
    let Cli { command } = Cli::parse_from([
      "lowerbench",
      "run",
      "vast-front",
      "compile_commands.json",
      "--output_directory",
      "out",
      "--num_processes",
      "3",
      "--vast_option",
      "-vast-emit-mlir=hl",
      "--vast_option=-vast-show-locs",
      "--print_commands",
    ]);

    let Commands::Run(args) = command else {
      panic!("expected run subcommand");
    };
    assert_eq!(args.output_directory, Some(PathBuf::from("out")));
    assert_eq!(args.num_processes, Some(3));
    assert_eq!(args.vast_option, ["-vast-emit-mlir=hl", "-vast-show-locs"]);
    assert_eq!(toggle(args.print_commands, args.no_print_commands), Some(true));
    assert_eq!(toggle(args.print_errors, args.no_print_errors), None);
  }

  #[test]
  fn last_toggle_wins() {
    let Cli { command } = Cli::parse_from([
      "lowerbench",
      "run",
      "vast-front",
      "db.json",
      "--print_errors",
      "--no-print_errors",
    ]);
    let Commands::Run(args) = command else {
      panic!("expected run subcommand");
    };
    assert_eq!(toggle(args.print_errors, args.no_print_errors), Some(false));
  }

  #[test]
  fn report_defaults_to_tab() {
    let Cli { command } = Cli::parse_from(["lowerbench", "report", r#"{"A": "a.tsv"}"#, "-o", "out.md"]);
    let Commands::Report(args) = command else {
      panic!("expected report subcommand");
    };
    assert_eq!(args.field_separator, "\t");
    assert_eq!(args.output_filepath, Some(PathBuf::from("out.md")));
    assert!(!args.no_summary);
  }
}
