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
use crate::error::DatabaseError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

/// One entry of a Clang `compile_commands.json`, as written on disk.
#[derive(Debug, Deserialize)]
struct RawEntry {
  directory: PathBuf,
  file: PathBuf,
  output: PathBuf,
  #[serde(default)]
  arguments: Option<Vec<String>>,
  #[serde(default)]
  command: Option<String>,
}

/// The compiler invocation of a compilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
  /// Pre-split `arguments` array.
  Arguments(Vec<String>),
  /// Single `command` string.
  Command(String),
}

/// A validated compilation database entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileCommand {
  /// Working directory the compiler was run from.
  pub directory: PathBuf,
  /// The main source file, possibly relative to `directory`.
  pub file: PathBuf,
  /// The object file the original invocation produced.
  pub output: PathBuf,
  pub invocation: Invocation,
}

impl CompileCommand {
  /// Returns the compiler invocation as a list of tokens.
  ///
  /// A `command` string is split on whitespace; quoting is left for the shell
  /// that eventually runs the synthesized command line.
  pub fn argument_parts(&self) -> Vec<String> {
    match &self.invocation {
      Invocation::Arguments(arguments) => arguments.clone(),
      Invocation::Command(command) => command.split_whitespace().map(str::to_string).collect(),
    }
  }

  /// The absolute path of the source file.
  pub fn input_path(&self) -> PathBuf {
    self.directory.join(&self.file)
  }

  fn try_from_raw(index: usize, raw: RawEntry) -> Result<Self, DatabaseError> {
    let RawEntry {
      directory,
      file,
      output,
      arguments,
      command,
    } = raw;

    let invocation = match (arguments, command) {
      (Some(arguments), None) => Invocation::Arguments(arguments),
      (None, Some(command)) => Invocation::Command(command),
      (None, None) => return Err(DatabaseError::MissingArguments { index, file }),
      (Some(_), Some(_)) => return Err(DatabaseError::AmbiguousArguments { index, file }),
    };

    let compile_command = CompileCommand {
      directory,
      file,
      output,
      invocation,
    };

    if compile_command.argument_parts().is_empty() {
      return Err(DatabaseError::EmptyArguments {
        index,
        file: compile_command.file,
      });
    }

    Ok(compile_command)
  }
}

/// Parses the text of a compilation database. `path` is only used for error
/// messages.
pub fn parse_compile_commands(path: &Path, json: &str) -> Result<Vec<CompileCommand>, DatabaseError> {
  let entries: Vec<RawEntry> = serde_json::from_str(json).map_err(|source| DatabaseError::Parse {
    path: path.to_path_buf(),
    source,
  })?;

  entries
    .into_iter()
    .enumerate()
    .map(|(index, raw)| CompileCommand::try_from_raw(index, raw))
    .collect()
}

/// Loads the compilation database at `path`, preserving entry order.
pub fn load_compile_commands(path: &Path) -> Result<Vec<CompileCommand>, DatabaseError> {
  let json = fs::read_to_string(path).map_err(|source| DatabaseError::Read {
    path: path.to_path_buf(),
    source,
  })?;

  let compile_commands = parse_compile_commands(path, &json)?;
  tracing::debug!(
    path = %path.display(),
    entries = compile_commands.len(),
    "Loaded compilation database"
  );
  Ok(compile_commands)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(json: &str) -> Result<Vec<CompileCommand>, DatabaseError> {
    parse_compile_commands(Path::new("compile_commands.json"), json)
  }

  #[test]
  fn keeps_entry_order_and_both_forms() {
    let commands = parse(
      r#"[
        {"directory": "/src", "file": "b.c", "output": "b.o",
         "arguments": ["cc", "-c", "-o", "b.o", "b.c"]},
        {"directory": "/src", "file": "a.c", "output": "a.o",
         "command": "cc  -c -o a.o   a.c"}
      ]"#,
    )
    .unwrap();

    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0].file, PathBuf::from("b.c"));
    assert_eq!(commands[1].file, PathBuf::from("a.c"));
    assert_eq!(
      commands[1].argument_parts(),
      vec!["cc", "-c", "-o", "a.o", "a.c"]
    );
    assert_eq!(commands[1].input_path(), PathBuf::from("/src/a.c"));
  }

  #[test]
  fn absolute_file_ignores_directory() {
    let commands = parse(
      r#"[{"directory": "/build", "file": "/src/a.c", "output": "a.o", "command": "cc a.c"}]"#,
    )
    .unwrap();
    assert_eq!(commands[0].input_path(), PathBuf::from("/src/a.c"));
  }

  #[test]
  fn rejects_entry_without_invocation() {
    let err = parse(r#"[{"directory": "/src", "file": "a.c", "output": "a.o"}]"#).unwrap_err();
    assert!(matches!(err, DatabaseError::MissingArguments { index: 0, .. }));
  }

  #[test]
  fn rejects_entry_with_both_forms() {
    let err = parse(
      r#"[{"directory": "/src", "file": "a.c", "output": "a.o",
           "arguments": ["cc"], "command": "cc"}]"#,
    )
    .unwrap_err();
    assert!(matches!(err, DatabaseError::AmbiguousArguments { .. }));
  }

  #[test]
  fn rejects_missing_required_field() {
    let err = parse(r#"[{"directory": "/src", "file": "a.c", "command": "cc a.c"}]"#).unwrap_err();
    assert!(matches!(err, DatabaseError::Parse { .. }));
  }

  #[test]
  fn rejects_malformed_json() {
    assert!(matches!(parse("[{"), Err(DatabaseError::Parse { .. })));
  }

  #[test]
  fn rejects_blank_command() {
    let err = parse(r#"[{"directory": "/src", "file": "a.c", "output": "a.o", "command": "  "}]"#)
      .unwrap_err();
    assert!(matches!(err, DatabaseError::EmptyArguments { .. }));
  }
}
