use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;

use commands::CommonArgs;

/// Anvil build engine.
///
/// Anvil builds dependency graphs declared in anvil.toml manifests:
/// incremental rebuilds, namespace imports, dependency discovery from
/// compiler-emitted record files, and virtual run/clean/validate targets.
///
/// EXAMPLES:
///     anvil build                  Build the default target
///     anvil build out/libnut.so    Build a specific target
///     anvil run                    Build and run the @run action
///     anvil clean                  Run the @clean action
///     anvil graph                  Print the resolved build order
///
/// ENVIRONMENT VARIABLES:
///     ANVIL_JSON   Set to '1' for JSON reports by default
///     CC           Toolchain compiler seeded into namespaces
///     NO_COLOR     Set to disable colored output
#[derive(Parser)]
#[command(name = "anvil")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a target and everything it depends on
    ///
    /// Builds the named target, or the namespace's default target if none
    /// is given. Only stale targets run their recipes.
    ///
    /// EXAMPLES:
    ///     anvil build                    Build the default target
    ///     anvil build out/libnut.so      Build one target
    ///     anvil build -j 8               Build with eight workers
    #[command(visible_alias = "b")]
    Build {
        /// Target to build (defaults to the namespace's default target)
        target: Option<String>,
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Build and execute the @run action
    ///
    /// Builds everything @run depends on, then runs its recipe. Imported
    /// namespaces' @run actions execute first, in import order.
    #[command(visible_alias = "r")]
    Run {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Execute the @clean action
    ///
    /// Runs the namespace's @clean recipe, which typically deletes build
    /// outputs.
    Clean {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Execute the @validate action
    ///
    /// Builds and runs the namespace's @validate target, typically the
    /// test binary under a checker.
    Validate {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Print the resolved build order without building
    ///
    /// Walks declared edges plus existing dependency records and prints
    /// qualified target names, producers first.
    Graph {
        /// Target to plan for (defaults to the namespace's default target)
        target: Option<String>,
        #[command(flatten)]
        common: CommonArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cli_config = config::Config::from_env();

    match cli.command {
        Commands::Build { target, mut common } => {
            common.json = common.json || cli_config.default_json;
            commands::build::run(commands::build::BuildArgs { target, common })?;
        }
        Commands::Run { mut common } => {
            common.json = common.json || cli_config.default_json;
            commands::run::run(common)?;
        }
        Commands::Clean { mut common } => {
            common.json = common.json || cli_config.default_json;
            commands::clean::run(common)?;
        }
        Commands::Validate { mut common } => {
            common.json = common.json || cli_config.default_json;
            commands::validate::run(common)?;
        }
        Commands::Graph { target, mut common } => {
            common.json = common.json || cli_config.default_json;
            commands::graph::run(target.as_deref(), common)?;
        }
    }

    Ok(())
}
