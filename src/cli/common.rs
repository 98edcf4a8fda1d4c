//! Common CLI utilities shared across all CLI commands.
//!
//! This module provides:
//! - `CliContext`: config, session, API client and the async runtime
//! - Output helpers: `print_success`, `print_error`, `print_warning`, `print_info`
//! - `history_window`: the `--hours` lookback used by `devices history` and `map`
//! - Prompt helpers: `prompt_string`, `prompt_string_optional`, `prompt_password`,
//!   `prompt_select`, `prompt_confirm`

use crate::client::ApiClient;
use crate::config::{Config, DEVELOPMENT_API_URL};
use crate::models::SessionUser;
use crate::services::{
    AuthService, CompanyService, DeviceService, OpenPayGateway, PaymentService, PlanService,
    UserService,
};
use crate::session::SessionStore;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::future::Future;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use tokio::runtime::Runtime;
use tracing::info;

/// Largest `--hours` lookback accepted by history commands (one year)
pub const MAX_HISTORY_HOURS: u32 = 8760;

/// RFC 3339 `(start, end)` covering the last `hours` before `now`.
pub fn history_window(now: DateTime<Utc>, hours: u32) -> Result<(String, String)> {
    if hours == 0 || hours > MAX_HISTORY_HOURS {
        bail!("--hours must be between 1 and {}", MAX_HISTORY_HOURS);
    }
    let start = TimeDelta::try_hours(i64::from(hours))
        .and_then(|span| now.checked_sub_signed(span))
        .with_context(|| format!("Cannot look back {} hours from {}", hours, now))?;
    Ok((start.to_rfc3339(), now.to_rfc3339()))
}

/// Shared context for CLI commands.
///
/// Owns the tokio runtime the commands block on.
pub struct CliContext {
    /// The loaded configuration
    pub config: Config,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Session file holding the bearer token
    pub session: SessionStore,
    /// REST client bound to `config.api_url`
    pub client: ApiClient,
    runtime: Runtime,
}

impl CliContext {
    /// Load the CLI context from the configuration file.
    ///
    /// With `dev` the development API is used for this run only.
    pub fn load(dev: bool) -> Result<Self> {
        let config_path = crate::utils::get_config_path();

        let mut config =
            Config::load_or_create(&config_path).context("Failed to load configuration")?;
        if dev {
            config.api_url = DEVELOPMENT_API_URL.to_string();
        }
        info!("Using API at {}", config.api_url);

        let session = SessionStore::default_location();
        let client = ApiClient::from_config(&config, session.clone())
            .context("Failed to create HTTP client")?;
        let runtime = Runtime::new().context("Failed to create tokio runtime")?;

        Ok(Self {
            config,
            config_path,
            session,
            client,
            runtime,
        })
    }

    /// Run a future to completion on the context runtime
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// The cached user, or an error telling the user to log in.
    pub fn require_login(&self) -> Result<SessionUser> {
        if self.session.token()?.is_none() {
            bail!("Not logged in. Run 'trackgpx login' first.");
        }
        match self.session.user()? {
            Some(user) => Ok(user),
            None => bail!("Session has no user record. Run 'trackgpx login' again."),
        }
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.client.clone())
    }

    pub fn company(&self) -> CompanyService {
        CompanyService::new(self.client.clone())
    }

    pub fn devices(&self) -> DeviceService {
        DeviceService::new(self.client.clone())
    }

    pub fn payments(&self) -> PaymentService {
        PaymentService::new(self.client.clone())
    }

    pub fn plans(&self) -> PlanService {
        PlanService::new(self.client.clone())
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.client.clone())
    }

    /// Payment provider client from the `[openpay]` config section
    pub fn gateway(&self) -> Result<OpenPayGateway> {
        OpenPayGateway::from_config(&self.config).context("Failed to create payment provider client")
    }
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Print a success message with a checkmark prefix.
pub fn print_success(msg: &str) {
    println!("\u{2713} {}", msg);
}

/// Print an error message with an X prefix to stderr.
pub fn print_error(msg: &str) {
    eprintln!("\u{2717} {}", msg);
}

/// Print a warning message with a warning sign prefix.
pub fn print_warning(msg: &str) {
    println!("\u{26A0}\u{FE0F} {}", msg);
}

/// Print an info message with an info sign prefix.
pub fn print_info(msg: &str) {
    println!("\u{2139}\u{FE0F} {}", msg);
}

/// `value` or a dash for missing optional fields
pub fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => "-",
    }
}

// =============================================================================
// Prompt Helpers
// =============================================================================

fn read_line() -> Result<String> {
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read input")?;
    Ok(input.trim().to_string())
}

/// Prompt the user for a string input with an optional default value.
///
/// # Returns
/// The user's input, or the default if they pressed Enter
pub fn prompt_string(label: &str, default: Option<&str>) -> Result<String> {
    if let Some(def) = default {
        print!("{} [{}]: ", label, def);
    } else {
        print!("{}: ", label);
    }
    io::stdout().flush().context("Failed to flush stdout")?;

    let input = read_line()?;
    if input.is_empty() {
        Ok(default.unwrap_or("").to_string())
    } else {
        Ok(input)
    }
}

/// Prompt the user for an optional string input.
///
/// # Returns
/// `Some(input)` if the user entered text, `None` if they pressed Enter
pub fn prompt_string_optional(label: &str) -> Result<Option<String>> {
    print!("{} (optional): ", label);
    io::stdout().flush().context("Failed to flush stdout")?;

    let input = read_line()?;
    Ok(if input.is_empty() { None } else { Some(input) })
}

/// Use `value` when given, otherwise prompt for it; empty input is rejected
pub fn value_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => {
            let input = prompt_string(label, None)?;
            if input.is_empty() {
                bail!("{} is required", label);
            }
            Ok(input)
        }
    }
}

/// Prompt for a secret without echoing it.
///
/// Falls back to a plain line read when stdin is not a terminal, so
/// secrets can be piped in.
pub fn prompt_password(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().context("Failed to flush stdout")?;

    if !io::stdin().is_terminal() {
        return read_line();
    }

    terminal::enable_raw_mode().context("Failed to enable raw mode")?;
    let result = read_hidden();
    // restore the terminal before reporting anything
    let restored = terminal::disable_raw_mode().context("Failed to disable raw mode");
    println!();
    let secret = result?;
    restored?;
    Ok(secret)
}

fn read_hidden() -> Result<String> {
    let mut secret = String::new();
    loop {
        let Event::Key(key) = event::read().context("Failed to read key")? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(secret),
            KeyCode::Backspace => {
                secret.pop();
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                bail!("Cancelled");
            }
            KeyCode::Esc => bail!("Cancelled"),
            KeyCode::Char(c) => secret.push(c),
            _ => {}
        }
    }
}

/// `value` when given, otherwise a hidden prompt
pub fn password_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => prompt_password(label),
    }
}

/// Prompt the user to select from a numbered list of options.
///
/// # Returns
/// The 0-indexed position of the selected option
pub fn prompt_select(label: &str, options: &[String]) -> Result<usize> {
    if options.is_empty() {
        bail!("No options available for selection");
    }

    println!("{}:", label);
    for (i, option) in options.iter().enumerate() {
        println!("  {}. {}", i + 1, option);
    }
    print!("Enter choice [1-{}]: ", options.len());
    io::stdout().flush().context("Failed to flush stdout")?;

    match read_line()?.parse::<usize>() {
        Ok(n) if n >= 1 && n <= options.len() => Ok(n - 1),
        _ => bail!(
            "Invalid choice. Please enter a number between 1 and {}",
            options.len()
        ),
    }
}

/// Prompt the user for a yes/no confirmation.
///
/// # Returns
/// `true` if the user confirmed (y/yes), `false` otherwise
pub fn prompt_confirm(message: &str) -> Result<bool> {
    print!("{} [y/N]: ", message);
    io::stdout().flush().context("Failed to flush stdout")?;

    let input = read_line()?.to_lowercase();
    Ok(input == "y" || input == "yes")
}
