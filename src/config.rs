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
use crate::cli::ReportArgs;
use crate::cli::RunArgs;
use crate::cli::toggle;
use crate::command::DEFAULT_WARNING_FLAGS;
use crate::error::ConfigError;
use figment::Figment;
use figment::providers::Env;
use figment::providers::Format;
use figment::providers::Json;
use figment::providers::Serialized;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;
use tokio::sync::Semaphore;

/// Prefix of the environment variables that override run settings,
/// e.g. `LOWERBENCH_NUM_PROCESSES=8`.
pub const ENV_PREFIX: &str = "LOWERBENCH_";

// --- Default Values ---
fn default_num_processes() -> usize {
  std::thread::available_parallelism().map_or(1, std::num::NonZero::get)
}

fn default_warning_flags() -> Vec<String> {
  DEFAULT_WARNING_FLAGS.iter().map(|flag| flag.to_string()).collect()
}

/// Run settings that can come from defaults, a config file, the environment
/// or the command line (in increasing priority).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSettings {
  pub num_processes: usize,
  pub print_commands: bool,
  pub print_errors: bool,
  pub vast_options: Vec<String>,
  pub warning_flags: Vec<String>,
}

impl Default for RunSettings {
  fn default() -> Self {
    RunSettings {
      num_processes: default_num_processes(),
      print_commands: false,
      print_errors: false,
      vast_options: Vec::new(),
      warning_flags: default_warning_flags(),
    }
  }
}

/// Only the settings given explicitly on the command line.
#[derive(Debug, Default, Serialize)]
struct CliOverrides {
  #[serde(skip_serializing_if = "Option::is_none")]
  num_processes: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  print_commands: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  print_errors: Option<bool>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  vast_options: Vec<String>,
}

impl RunSettings {
  /// Layers defaults, the optional JSON `config_file` and `LOWERBENCH_*`
  /// environment variables.
  pub fn figment(config_file: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(RunSettings::default()));
    if let Some(path) = config_file {
      figment = figment.merge(Json::file(path));
    }
    figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["log_file", "config"]))
  }

  fn resolve(config_file: Option<&Path>, overrides: CliOverrides) -> Result<Self, ConfigError> {
    if let Some(path) = config_file {
      if !path.is_file() {
        return Err(ConfigError::MissingConfigFile(path.to_path_buf()));
      }
    }

    let settings: RunSettings = Self::figment(config_file)
      .merge(Serialized::defaults(overrides))
      .extract()
      .map_err(Box::new)?;

    if settings.num_processes == 0 {
      return Err(ConfigError::ZeroProcesses);
    }
    if settings.num_processes > Semaphore::MAX_PERMITS {
      return Err(ConfigError::TooManyProcesses {
        requested: settings.num_processes,
        max: Semaphore::MAX_PERMITS,
      });
    }
    Ok(settings)
  }
}

fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
  std::path::absolute(path).map_err(|source| ConfigError::AbsolutePath {
    path: path.to_path_buf(),
    source,
  })
}

/// Bare executable names are left for `PATH` lookup; anything with a
/// directory component is made absolute since units run in other directories.
fn resolve_tool_path(tool_path: PathBuf) -> Result<PathBuf, ConfigError> {
  if tool_path.components().count() > 1 {
    absolute(&tool_path)
  } else {
    Ok(tool_path)
  }
}

/// Fully validated and resolved configuration of a benchmark run.
#[derive(Debug, Clone)]
pub struct RunConfig {
  pub tool_path: PathBuf,
  /// Absolute path of the compilation database.
  pub compile_commands_file: PathBuf,
  /// Absolute path of the output directory, if any.
  pub output_directory: Option<PathBuf>,
  pub settings: RunSettings,
}

impl RunConfig {
  /// Unit identifiers are paths relative to this directory.
  pub fn database_dir(&self) -> &Path {
    self
      .compile_commands_file
      .parent()
      .unwrap_or_else(|| Path::new("/"))
  }
}

impl TryFrom<RunArgs> for RunConfig {
  type Error = ConfigError;

  fn try_from(
    RunArgs {
      tool_path,
      compile_commands_file,
      output_directory,
      print_commands,
      no_print_commands,
      num_processes,
      vast_option,
      print_errors,
      no_print_errors,
      config,
    }: RunArgs,
  ) -> Result<Self, Self::Error> {
    let overrides = CliOverrides {
      num_processes,
      print_commands: toggle(print_commands, no_print_commands),
      print_errors: toggle(print_errors, no_print_errors),
      vast_options: vast_option,
    };
    let settings = RunSettings::resolve(config.as_deref(), overrides)?;

    Ok(RunConfig {
      tool_path: resolve_tool_path(tool_path)?,
      compile_commands_file: absolute(&compile_commands_file)?,
      output_directory: output_directory.as_deref().map(absolute).transpose()?,
      settings,
    })
  }
}

/// One input report and the column its values go to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportColumn {
  /// `None` keeps the report's own header.
  pub name: Option<String>,
  pub path: PathBuf,
}

/// Where the rendered Markdown goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
  Stdout,
  File(PathBuf),
}

/// Fully validated configuration of a report merge.
#[derive(Debug, Clone)]
pub struct ReportConfig {
  pub columns: Vec<ReportColumn>,
  pub field_separator: String,
  pub destination: Destination,
  pub summary: bool,
}

/// Parses the positional column argument: a JSON object of
/// `column name -> report path`, in the order written, or a single path.
fn parse_columns(columns: &str) -> Result<Vec<ReportColumn>, ConfigError> {
  if !columns.trim_start().starts_with('{') {
    return Ok(vec![ReportColumn {
      name: None,
      path: PathBuf::from(columns),
    }]);
  }

  let mapping: serde_json::Map<String, serde_json::Value> =
    serde_json::from_str(columns).map_err(ConfigError::ParseColumnsJson)?;

  mapping
    .into_iter()
    .map(|(name, path)| match path {
      serde_json::Value::String(path) => Ok(ReportColumn {
        name: Some(name),
        path: PathBuf::from(path),
      }),
      _ => Err(ConfigError::ColumnNotAPath { column: name }),
    })
    .collect()
}

/// The two-character text `\t` means a tab, since shells rarely pass a
/// literal one.
fn parse_separator(separator: String) -> Result<String, ConfigError> {
  match separator.as_str() {
    "" => Err(ConfigError::EmptySeparator),
    "\\t" => Ok("\t".to_string()),
    _ => Ok(separator),
  }
}

impl TryFrom<ReportArgs> for ReportConfig {
  type Error = ConfigError;

  fn try_from(
    ReportArgs {
      columns,
      output_filepath,
      field_separator,
      no_summary,
    }: ReportArgs,
  ) -> Result<Self, Self::Error> {
    let columns = parse_columns(&columns)?;
    if columns.is_empty() {
      return Err(ConfigError::NoInputFiles);
    }

    Ok(ReportConfig {
      columns,
      field_separator: parse_separator(field_separator)?,
      destination: output_filepath.map_or(Destination::Stdout, Destination::File),
      summary: !no_summary,
    })
  }
}
