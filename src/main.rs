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
use Commands::Report;
use Commands::Run;
use anyhow::Result;
use clap::Parser;
use lowerbench::cli::Cli;
use lowerbench::cli::Commands;
use lowerbench::config::ReportConfig;
use lowerbench::config::RunConfig;
use lowerbench::error::LowerbenchError;
use lowerbench::logging::setup_tracing;
use lowerbench::report::generate_report;
use lowerbench::runner::run_benchmarks;

#[tokio::main]
async fn main() -> Result<()> {
  let _log_guard = setup_tracing()?;

  let Cli { command } = Cli::parse();

  match command {
    Run(run_args) => {
      let config = RunConfig::try_from(run_args).map_err(LowerbenchError::from)?;
      tracing::debug!(?config, "Resolved run configuration");

      let mut stdout = std::io::stdout().lock();
      run_benchmarks(&config, &mut stdout).await?;
    }
    Report(report_args) => {
      let config = ReportConfig::try_from(report_args).map_err(LowerbenchError::from)?;
      tracing::debug!(?config, "Resolved report configuration");

      generate_report(&config)?;
    }
  }

  Ok(())
}
