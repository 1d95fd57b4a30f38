//! Command implementations.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use tracing::debug;

use bcaqr_core::api::client::{transaction_window, DATE_FORMAT};
use bcaqr_core::{ApiClient, ApiError, Config, SessionData};

use crate::cli::{Args, Command};
use crate::output::{format_remaining, render_transactions};

const LOGIN_HINT: &str = "Please run 'bcaqr login' or provide --email and --password";

pub async fn run(args: Args) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = args.base_url {
        config.base_url = url;
    }
    if let Some(path) = args.session_file {
        config.session_file = Some(path);
    }
    debug!(base_url = %config.base_url, session_file = %config.session_path().display(), "Configuration loaded");

    match args.command {
        Command::Login => login(&config).await,
        Command::Transactions {
            email,
            password,
            date,
        } => transactions(&config, email, password, date).await,
        Command::Status => status(&config),
        Command::Logout => logout(&config),
    }
}

async fn login(config: &Config) -> Result<()> {
    let email = prompt_line("Email: ").context("failed to read email")?;
    let password = rpassword::prompt_password("Password: ").context("failed to read password")?;

    if email.is_empty() || password.is_empty() {
        bail!("email and password are required");
    }

    let mut client = ApiClient::from_config(config)?;
    println!("\nLogging in as {}...", email);
    client.login(&email, &password).await.context("login failed")?;

    let session_path = config.session_path();
    client
        .save_session(&session_path)
        .context("failed to save session")?;

    println!("✓ Login successful");
    println!("✓ Session saved to {}", session_path.display());
    println!("\nYou can now use other commands without providing credentials.");
    Ok(())
}

async fn transactions(
    config: &Config,
    email: Option<String>,
    password: Option<String>,
    date: Option<String>,
) -> Result<()> {
    let date = date.unwrap_or_else(|| Local::now().format(DATE_FORMAT).to_string());
    transaction_window(&date)?;

    let email = email.filter(|e| !e.is_empty());
    let password = password.filter(|p| !p.is_empty());

    let client = match (email, password) {
        (None, None) => resume_saved_session(config, &config.session_path())?,
        (Some(email), Some(password)) => {
            let mut client = ApiClient::from_config(config)?;
            println!("Logging in as {}...", email);
            client.login(&email, &password).await.context("login failed")?;
            println!("✓ Login successful");
            client
        }
        _ => bail!("both --email and --password are required when not using saved session"),
    };

    println!("Fetching transactions for {}...", date);
    let transactions = client
        .fetch_transactions(&date)
        .await
        .context("failed to fetch transactions")?;

    print!("{}", render_transactions(&date, &transactions));
    Ok(())
}

fn resume_saved_session(config: &Config, path: &Path) -> Result<ApiClient> {
    if !path.exists() {
        bail!("no saved session found\n{}", LOGIN_HINT);
    }

    println!("Using saved session...");
    let mut client = ApiClient::from_config(config)?;
    client
        .load_session(path)
        .map_err(|e| anyhow!("failed to load session: {}\n{}", e, LOGIN_HINT))?;
    println!("✓ Session loaded");
    Ok(client)
}

fn status(config: &Config) -> Result<()> {
    let path = config.session_path();
    let session = match SessionData::read(&path) {
        Ok(session) => session,
        Err(ApiError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            println!("No saved session at {}", path.display());
            return Ok(());
        }
        Err(e) => return Err(e).context("failed to read session"),
    };

    println!("Session file: {}", path.display());
    println!("Portal:       {}", session.base_url);
    println!(
        "Saved:        {} ({})",
        session.saved_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
        session.age_display()
    );

    match session.validate() {
        Ok(()) => println!(
            "Status:       valid for {}",
            format_remaining(session.time_until_expiry())
        ),
        Err(ApiError::SessionExpired { .. }) => {
            println!("Status:       expired, run 'bcaqr login' to start a new session")
        }
        Err(e) => println!("Status:       unusable ({})", e),
    }
    Ok(())
}

fn logout(config: &Config) -> Result<()> {
    let path = config.session_path();
    if SessionData::remove(&path).context("failed to remove session")? {
        println!("✓ Session removed from {}", path.display());
    } else {
        println!("No saved session at {}", path.display());
    }
    Ok(())
}

fn prompt_line(prompt: &str) -> io::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
