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
use crate::artifacts::LOG_EXTENSION;
use crate::artifacts::create_unique;
use crate::artifacts::file_name_for;
use crate::artifacts::reserve_artifact;
use crate::command::ToolSetup;
use crate::command::synthesize;
use crate::compile_db::CompileCommand;
use crate::compile_db::load_compile_commands;
use crate::config::RunConfig;
use crate::error::LowerbenchError;
use crate::error::RunError;
use crate::report::FAIL_MARKER;
use crate::report::UNIT_COLUMN;
use crate::report::VALUE_COLUMN;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::Instrument;

/// Everything needed to lower one compilation unit.
#[derive(Debug, Clone)]
pub struct UnitInput {
  pub tool_path: PathBuf,
  pub tool_options: Vec<String>,
  pub warning_flags: Vec<String>,
  pub compile_command: CompileCommand,
  pub output_directory: Option<PathBuf>,
  pub print_commands: bool,
}

/// How lowering one unit went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
  /// The tool exited successfully after the given wall-clock time.
  Passed(Duration),
  /// The tool failed; carries its stderr (or the spawn error).
  Failed(String),
}

/// Aggregate result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
  pub passing: usize,
  pub total: usize,
}

/// `<seconds>.<hundredths>`, truncated.
pub fn format_elapsed(elapsed: Duration) -> String {
  format!("{}.{:02}", elapsed.as_secs(), elapsed.subsec_millis() / 10)
}

/// Names a unit by its path relative to the compilation database's
/// directory, e.g. `./fs/open.c`. Files outside it keep their full path.
pub fn unit_identifier(database_dir: &Path, input: &Path) -> String {
  match input.strip_prefix(database_dir) {
    Ok(relative) => format!("./{}", relative.display()),
    Err(_) => input.display().to_string(),
  }
}

/// Runs the front-end on one unit and times it.
///
/// A unit whose artifact cannot be reserved fails without running the tool.
pub async fn run_unit(input: UnitInput) -> UnitOutcome {
  let input_path = input.compile_command.input_path();

  let artifact = match &input.output_directory {
    Some(dir) => match reserve_artifact(dir, &input_path) {
      Ok(path) => Some(path),
      Err(e) => {
        tracing::warn!(dir = %dir.display(), error = %e, "Failed to reserve artifact");
        return UnitOutcome::Failed(format!(
          "Failed to reserve output file in {}: {e}",
          dir.display()
        ));
      }
    },
    None => None,
  };

  let tool = ToolSetup {
    tool_path: &input.tool_path,
    tool_options: &input.tool_options,
    warning_flags: &input.warning_flags,
  };
  let command = synthesize(tool, &input.compile_command, artifact.as_deref());

  if input.print_commands {
    eprintln!("{}", command.display_line());
  }
  tracing::debug!(cmd = %command.command_line(), "Spawning front-end");

  let begin = Instant::now();
  let output = command.to_process().output().await;
  let elapsed = begin.elapsed();

  let outcome = match output {
    Ok(output) if output.status.success() => UnitOutcome::Passed(elapsed),
    Ok(output) => {
      tracing::debug!(code = ?output.status.code(), "Front-end failed");
      UnitOutcome::Failed(String::from_utf8_lossy(&output.stderr).into_owned())
    }
    Err(e) => UnitOutcome::Failed(format!(
      "Failed to run front-end in {}: {e}",
      command.current_dir.display()
    )),
  };

  if let (UnitOutcome::Failed(_), Some(path)) = (&outcome, &artifact) {
    if let Err(e) = fs::remove_file(path) {
      tracing::warn!(path = %path.display(), error = %e, "Failed to remove artifact of failed unit");
    }
  }

  outcome
}

/// Writes the diagnostics of a failed unit to `<input stem>.log` in `dir`.
fn write_failure_log(dir: &Path, input: &Path, diagnostics: &str) -> Result<PathBuf, RunError> {
  let name = file_name_for(input, LOG_EXTENSION);
  let (path, mut file) = create_unique(dir, &name).map_err(|source| RunError::WriteLog {
    path: dir.join(&name),
    source,
  })?;
  writeln!(file, "{diagnostics}").map_err(|source| RunError::WriteLog {
    path: path.clone(),
    source,
  })?;
  Ok(path)
}

/// Loads the configured compilation database and benchmarks every unit in
/// it, writing the TSV report to `out`.
pub async fn run_benchmarks<W: Write>(config: &RunConfig, out: &mut W) -> Result<RunSummary, LowerbenchError> {
  let compile_commands = load_compile_commands(&config.compile_commands_file)?;
  let summary = run_units(config, compile_commands, out).await?;
  Ok(summary)
}

/// Benchmarks `compile_commands` on a pool of `num_processes` workers.
///
/// Rows are written in the order of `compile_commands`, whatever order the
/// units finish in. Unit failures become `FAIL` rows, including units whose
/// artifact or log cannot be written; only failing to create the output
/// directory or to write the report aborts the run.
pub async fn run_units<W: Write>(
  config: &RunConfig,
  compile_commands: Vec<CompileCommand>,
  out: &mut W,
) -> Result<RunSummary, RunError> {
  let settings = &config.settings;
  let total = compile_commands.len();
  let span = tracing::info_span!(
    "run_units",
    tool = %config.tool_path.display(),
    units = total,
    workers = settings.num_processes
  );

  async {
    if let Some(dir) = &config.output_directory {
      fs::create_dir_all(dir).map_err(|source| RunError::CreateOutputDir {
        path: dir.clone(),
        source,
      })?;
    }

    writeln!(out, "{UNIT_COLUMN}\t{VALUE_COLUMN}").map_err(RunError::WriteReport)?;
    out.flush().map_err(RunError::WriteReport)?;

    let pool = Arc::new(Semaphore::new(settings.num_processes));
    let mut units = Vec::with_capacity(total);
    for compile_command in compile_commands {
      let input_path = compile_command.input_path();
      let id = unit_identifier(config.database_dir(), &input_path);
      let input = UnitInput {
        tool_path: config.tool_path.clone(),
        tool_options: settings.vast_options.clone(),
        warning_flags: settings.warning_flags.clone(),
        compile_command,
        output_directory: config.output_directory.clone(),
        print_commands: settings.print_commands,
      };

      let pool = Arc::clone(&pool);
      let handle = tokio::spawn(
        async move {
          let _permit = pool.acquire_owned().await?;
          Ok::<_, RunError>(run_unit(input).await)
        }
        .instrument(tracing::debug_span!("unit", id = %id)),
      );
      units.push((id, input_path, handle));
    }

    let mut passing = 0;
    for (index, (id, input_path, handle)) in units.into_iter().enumerate() {
      let fraction = format!("{}/{}", index + 1, total);
      match handle.await?? {
        UnitOutcome::Passed(elapsed) => {
          passing += 1;
          writeln!(out, "{id}\t{}", format_elapsed(elapsed)).map_err(RunError::WriteReport)?;
          eprintln!("finished processing {fraction} files");
        }
        UnitOutcome::Failed(diagnostics) => {
          writeln!(out, "{id}\t{FAIL_MARKER}").map_err(RunError::WriteReport)?;
          eprintln!("error processing {fraction} files");
          if settings.print_errors {
            eprintln!("{diagnostics}");
          }
          if let Some(dir) = &config.output_directory {
            match write_failure_log(dir, &input_path, &diagnostics) {
              Ok(log) => tracing::debug!(%id, log = %log.display(), "Wrote failure log"),
              Err(e) => tracing::warn!(%id, error = %e, "Failed to write failure log"),
            }
          }
        }
      }
      out.flush().map_err(RunError::WriteReport)?;
    }

    eprintln!("Total successful: {passing}/{total}");
    tracing::debug!(passing, total, "Benchmark run complete");
    Ok::<_, RunError>(RunSummary { passing, total })
  }
  .instrument(span)
  .await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::compile_db::Invocation;
  use crate::config::RunSettings;

  fn unit(directory: &Path, file: &str) -> CompileCommand {
    CompileCommand {
      directory: directory.to_path_buf(),
      file: PathBuf::from(file),
      output: PathBuf::from(file).with_extension("o"),
      invocation: Invocation::Arguments(vec![
        "cc".to_string(),
        "-cc1".to_string(),
        "-c".to_string(),
        "-o".to_string(),
        "x.o".to_string(),
        file.to_string(),
      ]),
    }
  }

  fn config(root: &Path, tool: &str, output_directory: Option<PathBuf>) -> RunConfig {
    RunConfig {
      tool_path: PathBuf::from(tool),
      compile_commands_file: root.join("compile_commands.json"),
      output_directory,
      settings: RunSettings {
        num_processes: 2,
        ..RunSettings::default()
      },
    }
  }

  #[test]
  fn elapsed_has_two_truncated_decimals() {
    assert_eq!(format_elapsed(Duration::from_millis(1_234)), "1.23");
    assert_eq!(format_elapsed(Duration::from_millis(5)), "0.00");
    assert_eq!(format_elapsed(Duration::from_millis(60_090)), "60.09");
  }

  #[test]
  fn identifiers_are_relative_to_database() {
    let root = Path::new("/src/linux");
    assert_eq!(unit_identifier(root, Path::new("/src/linux/fs/open.c")), "./fs/open.c");
    assert_eq!(unit_identifier(root, Path::new("/tmp/gen.c")), "/tmp/gen.c");
  }

  #[tokio::test]
  async fn rows_follow_input_order_and_failures_are_logged() {
    let root = tempfile::tempdir().unwrap();
    let out_dir = root.path().join("out");
    let missing = root.path().join("missing");

    let units = vec![
      unit(root.path(), "a.c"),
      unit(&missing, "b.c"),
      unit(root.path(), "c.c"),
    ];
    let config = config(root.path(), "true", Some(out_dir.clone()));

    let mut report = Vec::new();
    let summary = run_units(&config, units, &mut report).await.unwrap();
    let report = String::from_utf8(report).unwrap();
    let lines: Vec<&str> = report.lines().collect();

    assert_eq!(summary, RunSummary { passing: 2, total: 3 });
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "Compilation unit\tRuntime or failure");
    assert!(lines[1].starts_with("./a.c\t"));
    assert_ne!(lines[1], "./a.c\tFAIL");
    assert_eq!(lines[2], "./missing/b.c\tFAIL");
    assert!(lines[3].starts_with("./c.c\t"));

    let mut logs: Vec<_> = fs::read_dir(&out_dir)
      .unwrap()
      .map(|entry| entry.unwrap().file_name())
      .filter(|name| name.to_string_lossy().ends_with(".log"))
      .collect();
    logs.sort();
    assert_eq!(logs, ["b.log"]);
    assert!(out_dir.join("a.mlir").exists());
    assert!(!out_dir.join("b.mlir").exists());
  }

  #[tokio::test]
  async fn unwritable_output_directory_fails_the_unit() {
    let root = tempfile::tempdir().unwrap();
    let gone = root.path().join("gone");
    let input = UnitInput {
      tool_path: PathBuf::from("true"),
      tool_options: Vec::new(),
      warning_flags: Vec::new(),
      compile_command: unit(root.path(), "a.c"),
      output_directory: Some(gone.clone()),
      print_commands: false,
    };

    match run_unit(input).await {
      UnitOutcome::Failed(diagnostics) => assert!(diagnostics.contains("Failed to reserve output file")),
      outcome => panic!("expected a failed unit, got {outcome:?}"),
    }
    assert!(!gone.exists());
  }

  #[test]
  fn failure_log_errors_name_the_log() {
    let root = tempfile::tempdir().unwrap();
    let gone = root.path().join("gone");
    let err = write_failure_log(&gone, Path::new("/src/b.c"), "boom").unwrap_err();
    assert!(matches!(err, RunError::WriteLog { ref path, .. } if path == &gone.join("b.log")));
  }

  #[tokio::test]
  async fn failing_tool_marks_every_unit() {
    let root = tempfile::tempdir().unwrap();
    let units = vec![unit(root.path(), "a.c"), unit(root.path(), "b.c")];
    let config = config(root.path(), "false", None);

    let mut report = Vec::new();
    let summary = run_units(&config, units, &mut report).await.unwrap();
    let report = String::from_utf8(report).unwrap();

    assert_eq!(summary.passing, 0);
    assert_eq!(report.matches("\tFAIL").count(), 2);
  }
}
