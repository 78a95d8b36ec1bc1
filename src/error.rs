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
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error enum for the lowerbench library.
#[derive(Error, Debug)]
pub enum LowerbenchError {
  #[error("Compilation database error")]
  Database(#[from] DatabaseError),

  #[error("Configuration error")]
  Config(#[from] ConfigError),

  #[error("Benchmark run failed")]
  Run(#[from] RunError),

  #[error("Report generation failed")]
  Report(#[from] ReportError),
}

/// Errors raised while loading a compilation database (src/compile_db.rs).
#[derive(Error, Debug)]
pub enum DatabaseError {
  #[error("Failed to read compilation database: {path}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to parse compilation database {path}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("Entry {index} ({file}) has neither `arguments` nor `command`")]
  MissingArguments { index: usize, file: PathBuf },

  #[error("Entry {index} ({file}) has both `arguments` and `command`")]
  AmbiguousArguments { index: usize, file: PathBuf },

  #[error("Entry {index} ({file}) has an empty argument list")]
  EmptyArguments { index: usize, file: PathBuf },
}

/// Errors related to configuration resolution (src/config.rs).
#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Failed to resolve run settings: {0}")]
  Settings(#[from] Box<figment::Error>),

  #[error("Config file not found: {0}")]
  MissingConfigFile(PathBuf),

  #[error("--num_processes must be at least 1")]
  ZeroProcesses,

  #[error("--num_processes must be at most {max}, got {requested}")]
  TooManyProcesses { requested: usize, max: usize },

  #[error("Failed to resolve absolute path for {path}")]
  AbsolutePath {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to parse column mapping JSON: {0}")]
  ParseColumnsJson(#[source] serde_json::Error),

  #[error("Column '{column}' must map to a file path string")]
  ColumnNotAPath { column: String },

  #[error("No files to convert to Markdown")]
  NoInputFiles,

  #[error("Field separator must not be empty")]
  EmptySeparator,
}

/// Errors that abort a benchmark run (src/runner.rs). Per-unit tool failures
/// are never reported through this type.
#[derive(Error, Debug)]
pub enum RunError {
  #[error("Failed to create output directory: {path}")]
  CreateOutputDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to write failure log: {path}")]
  WriteLog {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to write report row")]
  WriteReport(#[source] std::io::Error),

  #[error("Worker pool closed unexpectedly")]
  PoolClosed(#[from] tokio::sync::AcquireError),

  #[error("Benchmark worker task failed")]
  WorkerTask(#[from] tokio::task::JoinError),
}

/// Errors related to reading, merging and rendering reports (src/report.rs).
#[derive(Error, Debug)]
pub enum ReportError {
  #[error("Failed to read report: {path}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Report {path} is empty")]
  MissingHeader { path: PathBuf },

  #[error("Report {path} needs at least two columns, header has {found}")]
  TooFewColumns { path: PathBuf, found: usize },

  #[error("Report {path}, line {line}: expected {expected} fields, got {found}")]
  MalformedRow {
    path: PathBuf,
    line: usize,
    expected: usize,
    found: usize,
  },

  #[error(transparent)]
  Merge(#[from] MergeError),

  #[error("Could not convert input to Markdown: the table has no columns")]
  EmptyTable,

  #[error("Failed to write Markdown output: {path}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Raised when a report cannot be joined onto the table built so far.
#[derive(Error, Debug)]
pub enum MergeError {
  #[error("Compilation units of {path} do not match that of previous files.")]
  UnitMismatch { path: PathBuf },
}
