use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// eapgen - Wi-Fi/EAP onboarding installer generator
#[derive(Parser)]
#[command(name = "eapgen")]
#[command(about = "Generates Windows Wi-Fi/EAP onboarding installers from profile attributes")]
#[command(version)]
pub struct Cli {
    /// Generator configuration file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build an installer
    Build {
        /// Build request (JSON)
        #[arg(short, long)]
        request: PathBuf,

        /// Directory holding installer assets and script templates
        #[arg(short, long)]
        assets: PathBuf,

        /// Workspace directory, owned by this build
        #[arg(short, long)]
        workspace: PathBuf,

        /// Signing command, called as `<PROGRAM> <unsigned> <signed>`
        #[arg(long, value_name = "PROGRAM")]
        sign: Option<PathBuf>,

        /// Stop after writing the packaging scripts
        #[arg(long)]
        dry_run: bool,
    },
    /// Show method selection, profiles and deletions without writing files
    Plan {
        /// Build request (JSON)
        #[arg(short, long)]
        request: PathBuf,
    },
    /// Validate a build request and the generator configuration
    Validate {
        /// Build request (JSON)
        #[arg(short, long)]
        request: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["eapgen"]).is_err());
    }

    #[test]
    fn test_cli_build() {
        let cli = Cli::try_parse_from([
            "eapgen",
            "build",
            "--request",
            "req.json",
            "--assets",
            "/srv/assets",
            "--workspace",
            "/tmp/build",
            "--sign",
            "/opt/sign.sh",
            "--dry-run",
        ])
        .expect("valid build invocation");
        match cli.command {
            Commands::Build {
                request,
                sign,
                dry_run,
                ..
            } => {
                assert_eq!(request, PathBuf::from("req.json"));
                assert_eq!(sign, Some(PathBuf::from("/opt/sign.sh")));
                assert!(dry_run);
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_cli_build_requires_workspace() {
        let result = Cli::try_parse_from([
            "eapgen",
            "build",
            "--request",
            "req.json",
            "--assets",
            "/srv/assets",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_global_config() {
        let cli = Cli::try_parse_from(["eapgen", "plan", "--request", "req.json", "--config", "cfg.json"])
            .expect("valid plan invocation");
        assert_eq!(cli.config, Some(PathBuf::from("cfg.json")));
        assert!(matches!(cli.command, Commands::Plan { .. }));
    }

    #[test]
    fn test_cli_validate() {
        let cli = Cli::try_parse_from(["eapgen", "validate", "-r", "req.json"]).expect("valid");
        match cli.command {
            Commands::Validate { request } => assert_eq!(request, PathBuf::from("req.json")),
            _ => panic!("Expected Validate command"),
        }
    }
}
