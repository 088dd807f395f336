//! Command-line interface

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bibliotech-server")]
#[command(version, about = "BiblioTech library management server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the HTTP server (the default)
    Serve,
    /// List database snapshots, newest first
    Backups,
    /// Copy a snapshot over the database file. Stop the server first.
    Restore {
        /// Snapshot file name inside the backup directory
        #[arg(value_name = "FILE")]
        file: String,
    },
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_is_the_default() {
        let cli = Cli::try_parse_from(["bibliotech-server"]).unwrap();
        assert_eq!(cli.command(), Command::Serve);
    }

    #[test]
    fn test_restore_takes_a_file() {
        let cli = Cli::try_parse_from([
            "bibliotech-server",
            "restore",
            "bibliotech_auto_20240315_140509.db",
        ])
        .unwrap();
        assert_eq!(
            cli.command(),
            Command::Restore {
                file: "bibliotech_auto_20240315_140509.db".to_string()
            }
        );

        assert!(Cli::try_parse_from(["bibliotech-server", "restore"]).is_err());
    }
}
