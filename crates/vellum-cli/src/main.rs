#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::{OutputMode, fail_any, resolve_output_mode};
use std::env;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use vellum_core::config;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "vl: culture-variant content store with publish eligibility and typed relations",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output (same as `--format json`).
    #[arg(long, global = true)]
    json: bool,

    /// Output format; defaults to pretty on a TTY and text when piped.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self, resolved: &str) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            resolve_output_mode(self.format, resolved)
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a vellum project in the current directory",
        after_help = "EXAMPLES:\n    # English default, French and German enabled\n    vl init --default-language en --language fr --language de"
    )]
    Init(cmd::init::InitArgs),

    #[command(name = "type", about = "Register and list content types")]
    Type(cmd::types::TypeArgs),

    #[command(about = "Create, inspect and edit content items")]
    Content(cmd::content::ContentArgs),

    #[command(about = "Show which variants can be sent to publish")]
    Eligibility(cmd::eligibility::EligibilityArgs),

    #[command(about = "Manage typed relations between entities")]
    Relation(cmd::relation::RelationArgs),
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_env("VELLUM_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() || verbose {
            "vellum=debug,info"
        } else if quiet {
            "error"
        } else {
            "vellum=info,warn"
        })
    });

    let format = env::var("VELLUM_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let config_root = config::find_project_root(&project_root).unwrap_or_else(|| project_root.clone());
    let resolved = config::resolve_config(&config_root, cli.json)
        .map_err(|e| fail_any(cli.output_mode("text"), e))?
        .resolved_output;
    let output = cli.output_mode(&resolved);
    debug!(?output, root = %project_root.display(), "resolved output mode");

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, output, &project_root),
        Commands::Type(args) => cmd::types::run_type(args, output, &project_root),
        Commands::Content(args) => cmd::content::run_content(args, output, &project_root),
        Commands::Eligibility(args) => {
            cmd::eligibility::run_eligibility(args, output, &project_root)
        }
        Commands::Relation(args) => cmd::relation::run_relation(args, output, &project_root),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["vl", "relation", "types", "--json"]);
        assert!(cli.json);
        assert_eq!(cli.output_mode("pretty"), OutputMode::Json);
    }

    #[test]
    fn format_flag_overrides_resolved_config() {
        let cli = Cli::parse_from(["vl", "--format", "text", "type", "list"]);
        assert_eq!(cli.output_mode("json"), OutputMode::Text);
    }

    #[test]
    fn resolved_config_applies_without_flags() {
        let cli = Cli::parse_from(["vl", "type", "list"]);
        assert_eq!(cli.output_mode("json"), OutputMode::Json);
    }

    #[test]
    fn move_requires_a_target() {
        assert!(Cli::try_parse_from(["vl", "content", "move", "3"]).is_err());
        assert!(Cli::try_parse_from(["vl", "content", "move", "3", "--root"]).is_ok());
        assert!(
            Cli::try_parse_from(["vl", "content", "move", "3", "--root", "--parent", "1"])
                .is_err()
        );
    }

    #[test]
    fn cultures_are_validated_at_parse_time() {
        assert!(Cli::try_parse_from(["vl", "eligibility", "1", "--culture", "fr"]).is_ok());
        assert!(Cli::try_parse_from(["vl", "eligibility", "1", "--culture", ""]).is_err());
    }

    #[test]
    fn rm_parent_collects_repeated_types() {
        let cli = Cli::parse_from([
            "vl",
            "relation",
            "rm-parent",
            "1",
            "--type",
            "umbDocument",
            "--type",
            "umbMedia",
        ]);
        let Commands::Relation(args) = cli.command else {
            panic!("expected relation command");
        };
        let cmd::relation::RelationCommand::RmParent(rm) = args.command else {
            panic!("expected rm-parent");
        };
        assert_eq!(rm.parent, 1);
        assert_eq!(rm.aliases, vec!["umbDocument", "umbMedia"]);
    }
}
