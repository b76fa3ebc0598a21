use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default log destination when the terminal belongs to the monitor
pub const DEFAULT_LOG_FILE: &str = "/tmp/cachyinstall.log";

/// cachyinstall - CachyOS installer for a Btrfs-on-UEFI layout
#[derive(Parser, Debug)]
#[command(name = "cachyinstall")]
#[command(about = "Install CachyOS onto a whole disk with Btrfs subvolumes and zstd compression")]
#[command(version)]
pub struct Cli {
    /// Write log records to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the configuration and install onto the target disk
    Install {
        /// Configuration file (key=value); missing fields are prompted for
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Extra package list, one or more names per line
        #[arg(short, long)]
        packages: Option<PathBuf>,

        /// Save the resolved configuration (without passwords) to this file
        #[arg(long)]
        save_config: Option<PathBuf>,

        /// Skip the disk-wipe confirmation
        #[arg(short, long)]
        yes: bool,

        /// Escalate through sudo even when already root
        #[arg(long)]
        sudo: bool,

        /// Show the full-screen progress monitor
        #[arg(long)]
        tui: bool,

        /// Exit after installing instead of offering reboot/chroot
        #[arg(long)]
        no_post_menu: bool,
    },
    /// Validate a configuration file without prompting or installing
    Validate {
        /// Path to configuration file to validate
        config: PathBuf,

        /// Extra package list to validate alongside
        #[arg(short, long)]
        packages: Option<PathBuf>,

        /// Print the resolved configuration (without passwords) as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Log file to use, if any; the monitor always needs one
    pub fn log_destination(&self) -> Option<PathBuf> {
        match (&self.log_file, &self.command) {
            (Some(path), _) => Some(path.clone()),
            (None, Commands::Install { tui: true, .. }) => Some(PathBuf::from(DEFAULT_LOG_FILE)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["cachyinstall"]).is_err());
    }

    #[test]
    fn test_cli_install_with_config() {
        let cli = Cli::try_parse_from([
            "cachyinstall",
            "install",
            "--config",
            "/root/cachy.conf",
            "--packages",
            "/root/extra.txt",
            "--yes",
        ])
        .unwrap();
        match cli.command {
            Commands::Install {
                config,
                packages,
                yes,
                tui,
                sudo,
                ..
            } => {
                assert_eq!(config.unwrap().to_str().unwrap(), "/root/cachy.conf");
                assert_eq!(packages.unwrap().to_str().unwrap(), "/root/extra.txt");
                assert!(yes);
                assert!(!tui);
                assert!(!sudo);
            }
            _ => panic!("Expected Install command"),
        }
    }

    #[test]
    fn test_cli_validate_json() {
        let cli = Cli::try_parse_from(["cachyinstall", "validate", "cachy.conf", "--json"]).unwrap();
        match cli.command {
            Commands::Validate { config, json, packages } => {
                assert_eq!(config.to_str().unwrap(), "cachy.conf");
                assert!(json);
                assert!(packages.is_none());
            }
            _ => panic!("Expected Validate command"),
        }
    }

    #[test]
    fn test_validate_requires_path() {
        assert!(Cli::try_parse_from(["cachyinstall", "validate"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cachyinstall", "install", "-v", "--log-file", "/tmp/x.log"])
            .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.log_destination(), Some(PathBuf::from("/tmp/x.log")));
    }

    #[test]
    fn test_tui_defaults_log_file() {
        let cli = Cli::try_parse_from(["cachyinstall", "install", "--tui"]).unwrap();
        assert_eq!(cli.log_destination(), Some(PathBuf::from(DEFAULT_LOG_FILE)));

        let cli = Cli::try_parse_from(["cachyinstall", "install"]).unwrap();
        assert_eq!(cli.log_destination(), None);
    }
}
