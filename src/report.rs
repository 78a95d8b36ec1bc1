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
//! Merging of runner reports into one Markdown table.
//!
//! A report is a delimited text file whose first line is a header. The first
//! column names the compilation unit, the second holds either the runtime in
//! seconds or the literal `FAIL`. Further columns are ignored.

use crate::config::Destination;
use crate::config::ReportColumn;
use crate::config::ReportConfig;
use crate::error::LowerbenchError;
use crate::error::MergeError;
use crate::error::ReportError;
use std::fs;
use std::path::Path;

/// Header of the identifier column written by the runner.
pub const UNIT_COLUMN: &str = "Compilation unit";

/// Header of the value column written by the runner.
pub const VALUE_COLUMN: &str = "Runtime or failure";

/// Value recorded for a unit the tool failed on.
pub const FAIL_MARKER: &str = "FAIL";

/// First cell of the summary row.
pub const SUMMARY_LABEL: &str = "Total passing";

/// One parsed report file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
  pub unit_header: String,
  pub value_header: String,
  pub units: Vec<String>,
  pub values: Vec<String>,
}

/// Parses the text of a report. `path` is only used for error messages.
pub fn parse_report(path: &Path, text: &str, separator: &str) -> Result<Report, ReportError> {
  let mut lines = text
    .lines()
    .enumerate()
    .map(|(index, line)| (index + 1, line.trim_end_matches('\r')))
    .filter(|(_, line)| !line.is_empty());

  let Some((_, header)) = lines.next() else {
    return Err(ReportError::MissingHeader {
      path: path.to_path_buf(),
    });
  };
  let header: Vec<&str> = header.split(separator).collect();
  if header.len() < 2 {
    return Err(ReportError::TooFewColumns {
      path: path.to_path_buf(),
      found: header.len(),
    });
  }

  let mut units = Vec::new();
  let mut values = Vec::new();
  for (line_number, line) in lines {
    let fields: Vec<&str> = line.split(separator).collect();
    if fields.len() != header.len() {
      return Err(ReportError::MalformedRow {
        path: path.to_path_buf(),
        line: line_number,
        expected: header.len(),
        found: fields.len(),
      });
    }
    units.push(fields[0].to_string());
    values.push(fields[1].to_string());
  }

  Ok(Report {
    unit_header: header[0].to_string(),
    value_header: header[1].to_string(),
    units,
    values,
  })
}

/// Reads and parses the report at `path`.
pub fn read_report(path: &Path, separator: &str) -> Result<Report, ReportError> {
  let text = fs::read_to_string(path).map_err(|source| ReportError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  parse_report(path, &text, separator)
}

/// A named value column of the merged table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
  pub name: String,
  pub values: Vec<String>,
}

impl Column {
  /// Number of values that are not [`FAIL_MARKER`].
  pub fn passing(&self) -> usize {
    self
      .values
      .iter()
      .filter(|value| value.as_str() != FAIL_MARKER)
      .count()
  }
}

/// Reports joined on their compilation-unit column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
  pub unit_header: String,
  pub units: Vec<String>,
  pub columns: Vec<Column>,
}

impl ReportTable {
  /// Starts a table from its first report, renaming the value column to
  /// `name` when one is given.
  pub fn seed(report: Report, name: Option<String>) -> Self {
    let Report {
      unit_header,
      value_header,
      units,
      values,
    } = report;
    ReportTable {
      unit_header,
      units,
      columns: vec![Column {
        name: name.unwrap_or(value_header),
        values,
      }],
    }
  }

  /// Appends the value column of `report`. Its units must equal the table's,
  /// value for value and in the same order.
  pub fn append(&mut self, path: &Path, report: Report, name: Option<String>) -> Result<(), MergeError> {
    if report.units != self.units {
      return Err(MergeError::UnitMismatch {
        path: path.to_path_buf(),
      });
    }
    self.columns.push(Column {
      name: name.unwrap_or(report.value_header),
      values: report.values,
    });
    Ok(())
  }

  /// `Total passing` followed by `<passing>/<total>` for every value column.
  pub fn summary_row(&self) -> Vec<String> {
    let total = self.units.len();
    std::iter::once(SUMMARY_LABEL.to_string())
      .chain(
        self
          .columns
          .iter()
          .map(|column| format!("{}/{}", column.passing(), total)),
      )
      .collect()
  }

  fn header_row(&self) -> Vec<String> {
    std::iter::once(self.unit_header.clone())
      .chain(self.columns.iter().map(|column| column.name.clone()))
      .collect()
  }

  fn data_rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
    self.units.iter().enumerate().map(|(row, unit)| {
      std::iter::once(unit.clone())
        .chain(self.columns.iter().map(|column| column.values[row].clone()))
        .collect()
    })
  }

  /// Renders the table as a left-aligned Markdown pipe table, with the
  /// summary row first when `summary` is set.
  pub fn to_markdown(&self, summary: bool) -> Result<String, ReportError> {
    if self.columns.is_empty() {
      return Err(ReportError::EmptyTable);
    }

    let header = self.header_row();
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(self.units.len() + 1);
    if summary {
      rows.push(self.summary_row());
    }
    rows.extend(self.data_rows());

    let escape = |cell: &str| cell.replace('|', "\\|");
    let header: Vec<String> = header.iter().map(|cell| escape(cell.as_str())).collect();
    let rows: Vec<Vec<String>> = rows
      .iter()
      .map(|row| row.iter().map(|cell| escape(cell.as_str())).collect())
      .collect();

    let widths: Vec<usize> = (0..header.len())
      .map(|col| {
        rows
          .iter()
          .map(|row| row[col].chars().count())
          .chain(std::iter::once(header[col].chars().count()))
          .max()
          .unwrap_or(0)
      })
      .collect();

    let format_row = |cells: &[String]| {
      let padded: Vec<String> = cells
        .iter()
        .zip(&widths)
        .map(|(cell, &width)| format!(" {cell:<width$} "))
        .collect();
      format!("|{}|", padded.join("|"))
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_row(header.as_slice()));
    let rule: Vec<String> = widths
      .iter()
      .map(|width| format!(":{}", "-".repeat(width + 1)))
      .collect();
    lines.push(format!("|{}|", rule.join("|")));
    lines.extend(rows.iter().map(|row| format_row(row.as_slice())));

    Ok(lines.join("\n"))
  }
}

/// Reads every configured report and joins them into one table.
pub fn merge_reports(columns: &[ReportColumn], separator: &str) -> Result<ReportTable, ReportError> {
  let Some((first, rest)) = columns.split_first() else {
    return Err(ReportError::EmptyTable);
  };

  let mut table = ReportTable::seed(read_report(&first.path, separator)?, first.name.clone());
  for column in rest {
    let report = read_report(&column.path, separator)?;
    table.append(&column.path, report, column.name.clone())?;
    tracing::debug!(path = %column.path.display(), "Merged report");
  }
  Ok(table)
}

/// Merges the configured reports, renders them and writes the Markdown to
/// the configured destination. Nothing is written if any step fails.
pub fn generate_report(config: &ReportConfig) -> Result<(), LowerbenchError> {
  let table = merge_reports(&config.columns, &config.field_separator)?;
  let markdown = table.to_markdown(config.summary)?;

  match &config.destination {
    Destination::Stdout => println!("{markdown}"),
    Destination::File(path) => {
      fs::write(path, &markdown).map_err(|source| ReportError::Write {
        path: path.clone(),
        source,
      })?;
      tracing::info!(path = %path.display(), units = table.units.len(), "Markdown report written");
    }
  }
  Ok(())
}
