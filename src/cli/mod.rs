// CLI module for administrative operations requiring server access

pub mod seed;

use clap::{Parser, Subcommand};

/// RBAC backend server and administrative commands
#[derive(Parser, Debug)]
#[command(name = "rbac-backend")]
#[command(about = "Role-based access control backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Apply pending database migrations and exit
    Migrate,

    /// Migrate, then seed permissions, built-in roles and the superadmin account
    Seed {
        /// Superadmin password; falls back to SUPERADMIN_PASSWORD, then to a generated one
        #[arg(long)]
        password: Option<String>,
    },
}

impl Cli {
    /// Subcommand to run, defaulting to `serve`
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::parse_from(["rbac-backend"]);
        assert_eq!(cli.command(), Commands::Serve);
    }

    #[test]
    fn test_seed_accepts_password() {
        let cli = Cli::parse_from(["rbac-backend", "seed", "--password", "Admin123!"]);
        assert_eq!(
            cli.command(),
            Commands::Seed {
                password: Some("Admin123!".to_string())
            }
        );
    }
}
