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
//! File naming inside the output directory.
//!
//! Names are claimed with `create_new`, so two workers can never end up with
//! the same path even when their inputs share a basename.

use std::ffi::OsString;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

/// Extension of the artifact the front-end writes for a successful unit.
pub const ARTIFACT_EXTENSION: &str = "mlir";

/// Extension of the diagnostic log written for a failed unit.
pub const LOG_EXTENSION: &str = "log";

/// `<input stem>.<extension>`, e.g. `open.log` for `fs/open.c`.
pub fn file_name_for(input: &Path, extension: &str) -> OsString {
  let mut name = input
    .file_stem()
    .map(OsString::from)
    .unwrap_or_else(|| OsString::from("unit"));
  name.push(".");
  name.push(extension);
  name
}

/// Creates `dir/name`, appending `_` to the name until the file did not
/// exist before. Returns the claimed path and the open, empty file.
pub fn create_unique(dir: &Path, name: &OsString) -> io::Result<(PathBuf, File)> {
  let mut name = name.clone();
  loop {
    let path = dir.join(&name);
    match OpenOptions::new().write(true).create_new(true).open(&path) {
      Ok(file) => return Ok((path, file)),
      Err(e) if e.kind() == ErrorKind::AlreadyExists => name.push("_"),
      Err(e) => return Err(e),
    }
  }
}

/// Claims the artifact path for `input` inside `dir`.
pub fn reserve_artifact(dir: &Path, input: &Path) -> io::Result<PathBuf> {
  let (path, _file) = create_unique(dir, &file_name_for(input, ARTIFACT_EXTENSION))?;
  Ok(path)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;

  #[test]
  fn names_use_input_stem() {
    assert_eq!(file_name_for(Path::new("./fs/open.c"), LOG_EXTENSION), "open.log");
    assert_eq!(
      file_name_for(Path::new("/linux/init/main.c"), ARTIFACT_EXTENSION),
      "main.mlir"
    );
  }

  #[test]
  fn appends_underscores_on_collision() {
    let dir = tempfile::tempdir().unwrap();
    let name = file_name_for(Path::new("fs/open.c"), LOG_EXTENSION);

    let (first, _) = create_unique(dir.path(), &name).unwrap();
    let (second, _) = create_unique(dir.path(), &name).unwrap();
    let (third, _) = create_unique(dir.path(), &name).unwrap();

    assert_eq!(first, dir.path().join("open.log"));
    assert_eq!(second, dir.path().join("open.log_"));
    assert_eq!(third, dir.path().join("open.log__"));
  }

  #[test]
  fn never_truncates_existing_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("open.mlir"), "module {}").unwrap();

    let reserved = reserve_artifact(dir.path(), Path::new("fs/open.c")).unwrap();

    assert_eq!(reserved, dir.path().join("open.mlir_"));
    assert_eq!(
      fs::read_to_string(dir.path().join("open.mlir")).unwrap(),
      "module {}"
    );
  }

  #[test]
  fn missing_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    assert!(reserve_artifact(&missing, Path::new("a.c")).is_err());
  }
}
