//! Subcommand implementations

pub mod build;
pub mod clean;
pub mod graph;
pub mod run;
pub mod validate;

use anyhow::{Context, Result};
use anvil_config::{HostPlatform, VarMap};
use anvil_engine::{load_project, BuildOptions, BuildReport, BuildSession, Registry};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;

/// Flags shared by every verb
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Path to the namespace manifest
    #[arg(long, short = 'm', default_value = "anvil.toml")]
    pub manifest: PathBuf,
    /// Build in release mode (seeds DEBUG=0)
    #[arg(long)]
    pub release: bool,
    /// Worker count; 1 is sequential, 0 uses one worker per core
    #[arg(long, short = 'j', default_value_t = 1)]
    pub jobs: usize,
    /// Abort the build if a single recipe exceeds this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
    /// Verbose output
    #[arg(long, short = 'v')]
    pub verbose: bool,
    /// Quiet output (errors only)
    #[arg(long, short = 'q')]
    pub quiet: bool,
    /// Print the build report as JSON
    #[arg(long, env = "ANVIL_JSON")]
    pub json: bool,
}

/// A loaded project: the registry plus its root namespace
pub struct Project {
    pub registry: Registry,
    pub namespace: String,
}

/// Load the manifest named by the common flags into a fresh registry
pub fn load(common: &CommonArgs) -> Result<Project> {
    let platform = HostPlatform::current();
    let cc = std::env::var("CC").unwrap_or_else(|_| "cc".to_string());
    let seed = VarMap::seeded(platform, !common.release, cc);

    let mut registry = Registry::new();
    let namespace = load_project(&mut registry, &common.manifest, &seed, platform)
        .with_context(|| format!("failed to load {}", common.manifest.display()))?;

    Ok(Project {
        registry,
        namespace,
    })
}

/// Build one target (or the default) and report the result
pub fn execute(common: &CommonArgs, target: Option<&str>) -> Result<()> {
    let project = load(common)?;

    let options = BuildOptions {
        jobs: common.jobs,
        timeout: common.timeout.map(Duration::from_secs),
        verbose: common.verbose && !common.quiet,
    };

    let report = BuildSession::new(&project.registry)
        .with_options(options)
        .build(&project.namespace, target)?;

    print_report(common, &report)
}

fn print_report(common: &CommonArgs, report: &BuildReport) -> Result<()> {
    if common.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    if common.quiet {
        return Ok(());
    }
    if report.executed == 0 {
        println!(
            "{} {} targets up to date ({:.2}s)",
            "Finished".green().bold(),
            report.visited,
            report.duration.as_secs_f64()
        );
    } else {
        println!(
            "{} {} recipes run, {} fresh ({:.2}s)",
            "Finished".green().bold(),
            report.executed,
            report.fresh,
            report.duration.as_secs_f64()
        );
    }
    Ok(())
}
