use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Download remote images referenced by markdown notes into the vault
#[derive(Debug, Parser)]
#[command(name = "mdlocal", version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Vault root directory
    #[arg(long, value_name = "DIR", default_value = ".", global = true)]
    pub vault: PathBuf,

    /// Additional configuration file (toml, yaml or json)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Show what would change without writing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings that take precedence over every configuration source.
#[derive(Debug, Default, Args)]
pub struct Overrides {
    /// Regex selecting which documents are processed
    #[arg(long, value_name = "REGEX", global = true)]
    pub include: Option<String>,

    /// Vault-relative directory for downloaded media
    #[arg(long, value_name = "DIR", global = true)]
    pub media_root: Option<String>,

    /// Do not repair `[![[alt]]](url)` tags before processing
    #[arg(long, global = true)]
    pub no_clean: bool,

    /// Milliseconds between change queue drains while watching
    #[arg(long, value_name = "MS", global = true)]
    pub interval: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Localize the images of specific documents
    Process {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
    /// Localize the images of every document matching `include`
    All,
    /// Watch the vault and localize documents as they change
    Watch,
    /// Only repair dirty image tags, without downloading anything
    Clean {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the effective settings
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["mdlocal", "all"]).unwrap();
        assert_eq!(cli.vault, PathBuf::from("."));
        assert_eq!(cli.verbose, 0);
        assert!(!cli.dry_run);
        assert!(matches!(cli.command, Command::All));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "mdlocal",
            "process",
            "notes/a.md",
            "notes/b.md",
            "-vv",
            "--dry-run",
            "--vault",
            "/tmp/vault",
            "--media-root",
            "assets",
            "--no-clean",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.dry_run);
        assert_eq!(cli.vault, PathBuf::from("/tmp/vault"));
        assert_eq!(cli.overrides.media_root.as_deref(), Some("assets"));
        assert!(cli.overrides.no_clean);
        let Command::Process { files } = cli.command else { panic!("expected process") };
        assert_eq!(files, [PathBuf::from("notes/a.md"), PathBuf::from("notes/b.md")]);
    }

    #[rstest]
    #[case(&["mdlocal"])]
    #[case(&["mdlocal", "process"])]
    #[case(&["mdlocal", "clean"])]
    #[case(&["mdlocal", "watch", "--interval", "soon"])]
    fn test_rejected(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_err());
    }
}
