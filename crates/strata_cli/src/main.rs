//! Strata CLI: batch front-end for the incremental rule engine.
//!
//! `strata check` reports diagnostics for a workspace, `strata graph` prints
//! the import graph reachable from a file, and `strata gc` prunes persisted
//! interfaces no longer referenced by any source file.

#![warn(missing_docs)]

mod check;
mod gc;
mod graph;
mod workspace;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use strata_common::{logging, Verbosity};

/// Strata, an incremental checker for language workspaces.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Strata workspace checker")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `strata.toml` file or the directory holding it.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check source files and report diagnostics.
    Check(CheckArgs),
    /// Print the import graph reachable from a file.
    Graph(GraphArgs),
    /// Delete persisted interfaces no source file refers to.
    Gc,
}

/// Arguments for the `strata check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Files to check, relative to the workspace root. Defaults to every
    /// source file under the configured roots.
    pub files: Vec<String>,

    /// Output format for diagnostics.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `strata graph` subcommand.
#[derive(Parser, Debug)]
pub struct GraphArgs {
    /// The file to start from, relative to the workspace root.
    pub file: String,

    /// Output format for the graph.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    logging::init(Verbosity::from_flags(cli.quiet, cli.verbose));

    let color = match cli.color {
        ColorChoice::Auto => is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Check(ref args) => check::run(args, &global),
        Command::Graph(ref args) => graph::run(args, &global),
        Command::Gc => gc::run(&global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

fn is_terminal() -> bool {
    use std::io::IsTerminal;
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_check_default() {
        let cli = Cli::parse_from(["strata", "check"]);
        match cli.command {
            Command::Check(ref args) => {
                assert!(args.files.is_empty());
                assert_eq!(args.format, ReportFormat::Text);
            }
            _ => panic!("expected Check command"),
        }
    }

    #[test]
    fn parse_check_with_files() {
        let cli = Cli::parse_from(["strata", "check", "a.src", "lib/b.src", "--format", "json"]);
        match cli.command {
            Command::Check(ref args) => {
                assert_eq!(args.files, vec!["a.src", "lib/b.src"]);
                assert_eq!(args.format, ReportFormat::Json);
            }
            _ => panic!("expected Check command"),
        }
    }

    #[test]
    fn parse_graph() {
        let cli = Cli::parse_from(["strata", "graph", "main.src"]);
        match cli.command {
            Command::Graph(ref args) => {
                assert_eq!(args.file, "main.src");
                assert_eq!(args.format, ReportFormat::Text);
            }
            _ => panic!("expected Graph command"),
        }
    }

    #[test]
    fn graph_requires_file() {
        assert!(Cli::try_parse_from(["strata", "graph"]).is_err());
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["strata", "--quiet", "--color", "never", "gc"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
        assert!(matches!(cli.command, Command::Gc));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["strata", "check", "--verbose", "--config", "ws/strata.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config.as_deref(), Some("ws/strata.toml"));
    }

    #[test]
    fn color_defaults_to_auto() {
        let cli = Cli::parse_from(["strata", "gc"]);
        assert_eq!(cli.color, ColorChoice::Auto);
    }
}
