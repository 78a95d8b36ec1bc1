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
use crate::compile_db::CompileCommand;
use std::path::Path;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Flags appended to every invocation so warnings never turn into failures.
pub const DEFAULT_WARNING_FLAGS: [&str; 3] = ["-w", "-Wno-error", "-Wno-everything"];

/// Where the tool writes its output when no output directory is configured.
pub const NULL_SINK: &str = "/dev/null";

const CC1_FLAG: &str = "-cc1";

/// A synthesized front-end invocation for one compilation unit.
///
/// The arguments are joined into a single command line and handed to `sh -c`,
/// so tokens carry shell escaping (see [`escape_parentheses`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
  /// The front-end executable.
  pub program: PathBuf,

  /// Arguments following the executable, already escaped for the shell.
  pub args: Vec<String>,

  /// The unit's original working directory.
  pub current_dir: PathBuf,
}

impl ToolCommand {
  /// The command line passed to the shell.
  pub fn command_line(&self) -> String {
    std::iter::once(self.program.display().to_string())
      .chain(self.args.iter().cloned())
      .collect::<Vec<_>>()
      .join(" ")
  }

  /// A reproducible form of the command, including the directory change.
  pub fn display_line(&self) -> String {
    format!("cd {} && {}", self.current_dir.display(), self.command_line())
  }

  /// Builds the process that runs this command: stdout is discarded, stderr
  /// is captured for diagnostics.
  pub fn to_process(&self) -> Command {
    let mut cmd = Command::new("sh");
    cmd
      .arg("-c")
      .arg(self.command_line())
      .current_dir(&self.current_dir)
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::piped())
      .kill_on_drop(true);
    cmd
  }
}

/// The per-run parts of a synthesized command.
#[derive(Debug, Clone, Copy)]
pub struct ToolSetup<'a> {
  pub tool_path: &'a Path,
  pub tool_options: &'a [String],
  pub warning_flags: &'a [String],
}

/// Escapes parentheses so the shell passes them through to the tool.
pub fn escape_parentheses(arg: &str) -> String {
  arg.replace('(', "\\(").replace(')', "\\)")
}

/// Drops the compiler name, every `-o <path>` pair and every token naming the
/// unit's own input file from an original compiler invocation.
fn strip_compiler_io(arguments: &[String], compile_command: &CompileCommand) -> Vec<String> {
  let input = compile_command.input_path();
  let names_input = |arg: &str| {
    Path::new(arg) == compile_command.file || compile_command.directory.join(arg) == input
  };

  let mut kept = Vec::with_capacity(arguments.len());
  let mut rest = arguments.iter().skip(1);
  while let Some(arg) = rest.next() {
    if arg == "-o" {
      rest.next();
      continue;
    }
    if names_input(arg) {
      continue;
    }
    kept.push(arg.clone());
  }
  kept
}

/// Builds the front-end invocation for one compilation unit.
///
/// `output` is the artifact path inside the output directory, or `None` to
/// send the tool's output to [`NULL_SINK`].
pub fn synthesize(
  tool: ToolSetup<'_>,
  compile_command: &CompileCommand,
  output: Option<&Path>,
) -> ToolCommand {
  let original = compile_command.argument_parts();
  let mut arguments = strip_compiler_io(&original, compile_command);

  // -cc1 must come right after the executable.
  let has_cc1 = arguments.iter().any(|arg| arg == CC1_FLAG);
  if has_cc1 {
    arguments.retain(|arg| arg != CC1_FLAG);
  }

  let mut args = Vec::with_capacity(arguments.len() + tool.tool_options.len() + 8);
  if has_cc1 {
    args.push(CC1_FLAG.to_string());
  }
  args.extend(tool.tool_options.iter().cloned());
  args.extend(arguments.iter().map(|arg| escape_parentheses(arg)));
  args.extend(tool.warning_flags.iter().cloned());
  args.push(compile_command.input_path().display().to_string());
  args.push("-o".to_string());
  args.push(match output {
    Some(path) => path.display().to_string(),
    None => NULL_SINK.to_string(),
  });

  ToolCommand {
    program: tool.tool_path.to_path_buf(),
    args,
    current_dir: compile_command.directory.clone(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::compile_db::Invocation;

  fn unit(arguments: &[&str]) -> CompileCommand {
    CompileCommand {
      directory: PathBuf::from("/linux"),
      file: PathBuf::from("fs/open.c"),
      output: PathBuf::from("fs/open.o"),
      invocation: Invocation::Arguments(arguments.iter().map(|s| s.to_string()).collect()),
    }
  }

  fn warning_flags() -> Vec<String> {
    DEFAULT_WARNING_FLAGS.iter().map(|s| s.to_string()).collect()
  }

  fn tool<'a>(options: &'a [String], flags: &'a [String]) -> ToolSetup<'a> {
    ToolSetup {
      tool_path: Path::new("/opt/vast/bin/vast-front"),
      tool_options: options,
      warning_flags: flags,
    }
  }

  #[test]
  fn matches_positional_slicing_on_conventional_shape() {
    let original = [
      "gcc",
      "-nostdinc",
      "-Iinclude",
      "-D__KBUILD_MODNAME=kmod_open",
      "-c",
      "-o",
      "fs/open.o",
      "fs/open.c",
    ];
    let flags = warning_flags();
    let cmd = synthesize(tool(&[], &flags), &unit(&original), None);

    let mut expected: Vec<String> = original[1..original.len() - 3]
      .iter()
      .map(|s| s.to_string())
      .collect();
    expected.extend(flags.iter().cloned());
    expected.extend(["/linux/fs/open.c", "-o", "/dev/null"].map(String::from));

    assert_eq!(cmd.args, expected);
    assert_eq!(cmd.current_dir, PathBuf::from("/linux"));
  }

  #[test]
  fn strips_output_and_input_wherever_they_appear() {
    let flags = warning_flags();
    let cmd = synthesize(
      tool(&[], &flags),
      &unit(&["clang", "-o", "fs/open.o", "/linux/fs/open.c", "-O2", "-c"]),
      Some(Path::new("/out/open.mlir")),
    );
    assert_eq!(
      cmd.command_line(),
      "/opt/vast/bin/vast-front -O2 -c -w -Wno-error -Wno-everything /linux/fs/open.c -o /out/open.mlir"
    );
  }

  #[test]
  fn moves_cc1_right_after_tool() {
    let options = vec!["-vast-emit-mlir=hl".to_string()];
    let flags = warning_flags();
    let original = ["clang", "-triple", "x86_64", "-cc1", "-O2", "-o", "a.o", "fs/open.c"];
    let cmd = synthesize(tool(&options, &flags), &unit(&original), None);

    assert_eq!(cmd.args[0], "-cc1");
    assert_eq!(cmd.args[1], "-vast-emit-mlir=hl");
    assert_eq!(cmd.args.iter().filter(|arg| *arg == "-cc1").count(), 1);
    assert_eq!(&cmd.args[2..5], ["-triple", "x86_64", "-O2"]);
  }

  #[test]
  fn escapes_parentheses_in_original_arguments() {
    let flags = warning_flags();
    let cmd = synthesize(
      tool(&[], &flags),
      &unit(&["gcc", "-DKBUILD_STR(s)=#s", "-o", "a.o", "fs/open.c"]),
      None,
    );
    assert_eq!(cmd.args[0], r"-DKBUILD_STR\(s\)=#s");
  }

  #[test]
  fn display_line_includes_directory() {
    let flags: Vec<String> = Vec::new();
    let cmd = synthesize(tool(&[], &flags), &unit(&["gcc", "fs/open.c"]), None);
    assert_eq!(
      cmd.display_line(),
      "cd /linux && /opt/vast/bin/vast-front /linux/fs/open.c -o /dev/null"
    );
  }
}
