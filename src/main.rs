// TalentScore - GPL-3.0-or-later
// This file is part of TalentScore.
//
// Copyright (C) 2025 Daniel Freiermuth
//
// TalentScore is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// TalentScore is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with TalentScore.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use talentscore::invite::{shortlist, AssessmentInvite};
use talentscore::{
    run_pipeline, CandidateTable, PipelineConfig, ProfileSource, RankedTable, TalentConfig,
};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

#[derive(Parser, Debug)]
#[command(name = "talentscore")]
#[command(author = "Daniel Freiermuth")]
#[command(version = VERSION)]
#[command(about = "Rank scraped developer profiles into tiers and 0-100 talent scores", long_about = None)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score candidate CSV tables
    Score(ScoreArgs),
    /// Print the assessment link for a candidate
    Invite(InviteArgs),
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// GitHub profile table
    #[arg(long, value_name = "FILE")]
    github: Vec<PathBuf>,

    /// StackOverflow profile table
    #[arg(long, value_name = "FILE")]
    stackoverflow: Vec<PathBuf>,

    /// Directory for `<stem>.<source>.ranked.csv` reports
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Also print assessment links for the N best candidates of each table
    #[arg(long, value_name = "N")]
    invite_top: Option<usize>,
}

#[derive(Args, Debug)]
struct InviteArgs {
    #[arg(long)]
    username: String,

    #[arg(long, value_enum)]
    source: SourceArg,

    #[arg(long)]
    score: f64,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SourceArg {
    Github,
    Stackoverflow,
}

impl From<SourceArg> for ProfileSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Github => Self::GitHub,
            SourceArg::Stackoverflow => Self::StackOverflow,
        }
    }
}

fn main() -> ExitCode {
    // Set RUST_LOG to override (e.g. RUST_LOG=talentscore=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("talentscore {VERSION}");

    let cli = Cli::parse();
    run(cli).unwrap_or_else(|e| {
        tracing::error!("{e:#}");
        ExitCode::FAILURE
    })
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => TalentConfig::load_from(path)?,
        None => TalentConfig::load(),
    };

    match cli.command {
        Command::Score(args) => score(&config, args),
        Command::Invite(args) => {
            let invite = AssessmentInvite::new(args.username, args.source.into(), args.score);
            println!("{}", invite.link(&config.assessment_url));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn score(config: &TalentConfig, args: ScoreArgs) -> anyhow::Result<ExitCode> {
    let jobs: Vec<(ProfileSource, PathBuf)> = args
        .github
        .into_iter()
        .map(|p| (ProfileSource::GitHub, p))
        .chain(
            args.stackoverflow
                .into_iter()
                .map(|p| (ProfileSource::StackOverflow, p)),
        )
        .collect();

    if jobs.is_empty() {
        bail!("nothing to score, pass --github or --stackoverflow");
    }
    let to_stdout = jobs.len() == 1 && args.out_dir.is_none();
    let outputs = report_paths(&jobs, args.out_dir.as_deref())?;
    if let Some(dir) = &args.out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    // Each table is an independent run with its own fits and RNG
    let results: Vec<anyhow::Result<RankedTable>> = jobs
        .par_iter()
        .map(|(source, path)| score_file(path, config.pipeline(*source)))
        .collect();

    let mut failed = 0;
    for (((source, path), out), result) in jobs.iter().zip(&outputs).zip(results) {
        let outcome = result.and_then(|ranked| {
            if to_stdout {
                print!("{}", ranked.to_csv());
            } else {
                std::fs::write(out, ranked.to_csv())
                    .with_context(|| format!("failed to write {}", out.display()))?;
                tracing::info!("Wrote {} candidates to {}", ranked.len(), out.display());
            }
            if let Some(n) = args.invite_top {
                for invite in shortlist(&ranked, *source, n) {
                    eprintln!("{}", invite.link(&config.assessment_url));
                }
            }
            Ok(())
        });

        if let Err(e) = outcome {
            tracing::error!("{}: {e:#}", path.display());
            failed += 1;
        }
    }

    if failed > 0 {
        tracing::error!("{failed} of {} tables failed", jobs.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn score_file(path: &Path, config: &PipelineConfig) -> anyhow::Result<RankedTable> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let table = CandidateTable::from_csv(&text, config.schema())?;
    tracing::info!(
        "Scoring {} ({} candidates, preset '{}')",
        path.display(),
        table.len(),
        config.name
    );
    Ok(run_pipeline(&table, config)?)
}

/// `<stem>.<source>.ranked.csv`, in `out_dir` or next to the input
fn report_path(input: &Path, source: ProfileSource, out_dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "candidates".into(), |s| s.to_string_lossy());
    let name = format!(
        "{stem}.{}.ranked.csv",
        source.as_str().to_ascii_lowercase()
    );
    out_dir.map_or_else(|| input.with_file_name(&name), |dir| dir.join(&name))
}

/// Report path per job. Two jobs writing the same file is an error.
fn report_paths(
    jobs: &[(ProfileSource, PathBuf)],
    out_dir: Option<&Path>,
) -> anyhow::Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    jobs.iter()
        .map(|(source, input)| {
            let out = report_path(input, *source, out_dir);
            if !seen.insert(out.clone()) {
                bail!(
                    "{} would overwrite the report of another input ({})",
                    input.display(),
                    out.display()
                );
            }
            Ok(out)
        })
        .collect()
}
