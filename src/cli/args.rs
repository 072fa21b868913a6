//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

#[derive(Parser, Debug)]
#[command(
    name = "workspace-watch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Resolve, enumerate and watch IDE workspaces",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create .workspace-watch/settings.toml with default values
    Init {
        /// Overwrite an existing settings file
        #[arg(short, long)]
        force: bool,
    },

    /// Display active settings
    Config,

    /// Print the project roots a workspace resolves to
    Resolve {
        /// Workspace root (.xcworkspace, .xcodeproj or directory)
        workspace: PathBuf,
    },

    /// List every file the enumerator accepts
    Files {
        workspace: PathBuf,

        /// Emit JSON instead of one relative path per line
        #[arg(long)]
        json: bool,
    },

    /// Watch a workspace and print each delivered batch until Ctrl-C
    Watch {
        workspace: PathBuf,

        /// Emit one JSON array per batch
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_files_command() {
        let cli = Cli::parse_from(["workspace-watch", "files", "App.xcworkspace", "--json"]);
        match cli.command {
            Commands::Files { workspace, json } => {
                assert_eq!(workspace, PathBuf::from("App.xcworkspace"));
                assert!(json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["workspace-watch", "config", "--config", "/tmp/s.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.toml")));
        assert!(matches!(cli.command, Commands::Config));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
