//! TrackGPX command-line interface.
//!
//! Each command group lives in its own module and exposes an `execute`
//! function taking the shared [`CliContext`].

mod auth;
mod common;
pub mod company;
pub mod completions;
pub mod devices;
mod map;
pub mod payments;
pub mod plans;
pub mod users;

// Re-export common utilities for use by CLI commands
pub use common::*;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use tracing::info;

use company::CompanyCommand;
use devices::DevicesCommand;
use payments::PaymentsCommand;
use plans::PlansCommand;
use users::{RolesCommand, UsersCommand};

/// Fleet tracking from the terminal
#[derive(Parser, Debug)]
#[command(name = "trackgpx", version, about = "Command-line client for the TrackGPX fleet-tracking platform", long_about = None, disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Use the local development API for this run
    #[arg(long, global = true)]
    pub dev: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the session token
    Login {
        #[arg(short, long)]
        email: Option<String>,
        /// Password (prompted without echo when omitted)
        #[arg(short, long)]
        password: Option<String>,
        /// Remember the email for the next login
        #[arg(short, long)]
        remember: bool,
    },
    /// Log out and clear the session
    Logout,
    /// Create an account and a company
    Register {
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        email: Option<String>,
        #[arg(short, long)]
        company: Option<String>,
    },
    /// Show the logged-in user
    Whoami {
        /// Check the token against the API
        #[arg(long)]
        verify: bool,
    },
    /// Exchange the session token for a fresh one
    Refresh,
    /// Send a password recovery email
    ForgotPassword {
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Set a new password with a recovery token
    ResetPassword {
        #[arg(short, long)]
        token: Option<String>,
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Company profile, team and logo
    Company {
        #[command(subcommand)]
        command: CompanyCommand,
    },
    /// GPS devices
    Devices {
        #[command(subcommand)]
        command: DevicesCommand,
    },
    /// Subscription plans
    Plans {
        #[command(subcommand)]
        command: PlansCommand,
    },
    /// Cards and billing history
    Payments {
        #[command(subcommand)]
        command: PaymentsCommand,
    },
    /// User accounts
    Users {
        #[command(subcommand)]
        command: UsersCommand,
    },
    /// Roles
    Roles {
        #[command(subcommand)]
        command: RolesCommand,
    },
    /// List available permissions
    Permissions,
    /// Write the fleet map to an HTML file
    Map {
        /// Output file
        #[arg(short, long, default_value = "fleet-map.html")]
        output: String,
        /// JSON file with vehicles instead of live device positions
        #[arg(long)]
        vehicles: Option<String>,
        /// How far back to look for positions
        #[arg(
            long,
            default_value_t = 24,
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_HISTORY_HOURS))
        )]
        hours: u32,
    },
    /// Print the path to the configuration file
    Config,
    /// Print the path to the log file
    Logs,
    /// Generate shell completions
    Completions {
        /// Shell to generate for (detected when omitted)
        shell: Option<Shell>,
    },
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        // Commands that need neither config nor network
        match &self.command {
            Commands::Config => return Self::cmd_config(),
            Commands::Logs => return Self::cmd_logs(),
            Commands::Completions { shell } => return completions::generate(*shell),
            _ => {}
        }

        let ctx = CliContext::load(self.dev)?;
        info!("CLI: {} command executed", command_name(&self.command));

        match self.command {
            Commands::Login {
                email,
                password,
                remember,
            } => auth::cmd_login(&ctx, email, password, remember),
            Commands::Logout => auth::cmd_logout(&ctx),
            Commands::Register {
                name,
                email,
                company,
            } => auth::cmd_register(&ctx, name, email, company),
            Commands::Whoami { verify } => auth::cmd_whoami(&ctx, verify),
            Commands::Refresh => auth::cmd_refresh(&ctx),
            Commands::ForgotPassword { email } => auth::cmd_forgot_password(&ctx, email),
            Commands::ResetPassword { token, email } => {
                auth::cmd_reset_password(&ctx, token, email)
            }
            Commands::Company { command } => company::execute(&ctx, command),
            Commands::Devices { command } => devices::execute(&ctx, command),
            Commands::Plans { command } => plans::execute(&ctx, command),
            Commands::Payments { command } => payments::execute(&ctx, command),
            Commands::Users { command } => users::execute(&ctx, command),
            Commands::Roles { command } => users::execute_roles(&ctx, command),
            Commands::Permissions => users::cmd_permissions(&ctx),
            Commands::Map {
                output,
                vehicles,
                hours,
            } => map::cmd_map(&ctx, &output, vehicles.as_deref(), hours),
            Commands::Config | Commands::Logs | Commands::Completions { .. } => Ok(()),
        }
    }

    fn cmd_logs() -> Result<()> {
        println!("{}", crate::utils::get_log_path().display());
        Ok(())
    }

    fn cmd_config() -> Result<()> {
        println!("{}", crate::utils::get_config_path().display());
        Ok(())
    }
}

/// Command name for the log, without arguments (they may hold secrets)
fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Login { .. } => "login",
        Commands::Logout => "logout",
        Commands::Register { .. } => "register",
        Commands::Whoami { .. } => "whoami",
        Commands::Refresh => "refresh",
        Commands::ForgotPassword { .. } => "forgot-password",
        Commands::ResetPassword { .. } => "reset-password",
        Commands::Company { .. } => "company",
        Commands::Devices { .. } => "devices",
        Commands::Plans { .. } => "plans",
        Commands::Payments { .. } => "payments",
        Commands::Users { .. } => "users",
        Commands::Roles { .. } => "roles",
        Commands::Permissions => "permissions",
        Commands::Map { .. } => "map",
        Commands::Config => "config",
        Commands::Logs => "logs",
        Commands::Completions { .. } => "completions",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_nested_subcommands() {
        let cli = Cli::try_parse_from([
            "trackgpx", "--dev", "devices", "assign", "7", "12",
        ])
        .unwrap();
        assert!(cli.dev);
        assert!(matches!(
            cli.command,
            Commands::Devices {
                command: DevicesCommand::Assign {
                    id: 7,
                    vehicle_id: 12
                }
            }
        ));

        let cli = Cli::try_parse_from(["trackgpx", "plans", "list", "--cycle", "annual"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Plans {
                command: PlansCommand::List {
                    cycle: crate::models::BillingCycle::Annual
                }
            }
        ));
    }

    #[test]
    fn test_compare_needs_two_plans() {
        assert!(Cli::try_parse_from(["trackgpx", "plans", "compare", "1"]).is_err());
        assert!(Cli::try_parse_from(["trackgpx", "plans", "compare", "1", "2"]).is_ok());
    }

    #[test]
    fn test_history_hours_are_bounded() {
        let cli = Cli::try_parse_from(["trackgpx", "map", "--hours", "48"]).unwrap();
        assert!(matches!(cli.command, Commands::Map { hours: 48, .. }));

        for bad in ["0", "-5", "8761", "9223372036854775807"] {
            let arg = format!("--hours={}", bad);
            assert!(Cli::try_parse_from(["trackgpx", "map", arg.as_str()]).is_err());
            assert!(
                Cli::try_parse_from(["trackgpx", "devices", "history", "5", arg.as_str()]).is_err()
            );
        }
    }

    #[test]
    fn test_roles_permissions_are_comma_separated() {
        let cli = Cli::try_parse_from([
            "trackgpx", "roles", "create", "Dispatcher", "-p", "devices.view,map.view",
        ])
        .unwrap();
        match cli.command {
            Commands::Roles {
                command: RolesCommand::Create { permissions, .. },
            } => assert_eq!(permissions, vec!["devices.view", "map.view"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_command_name_hides_arguments() {
        let cli = Cli::try_parse_from(["trackgpx", "login", "-p", "hunter22"]).unwrap();
        assert_eq!(command_name(&cli.command), "login");
    }
}
