//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// CLI tool to interact with QR Merchant BCA.
///
/// Logs in to qr.klikbca.com, keeps the session for later invocations and
/// fetches transaction data.
#[derive(Parser, Debug)]
#[command(name = "bcaqr")]
#[command(author, version, about)]
pub struct Args {
    /// Session file to use instead of ~/.bcaqr_session.json
    #[arg(long, global = true, value_name = "PATH")]
    pub session_file: Option<PathBuf>,

    /// Portal base URL
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Login interactively and save the session for future use
    Login,

    /// Fetch transactions for a day, using the saved session unless credentials are given
    Transactions {
        /// Email for login (optional if logged in)
        #[arg(short, long)]
        email: Option<String>,

        /// Password for login (optional if logged in)
        #[arg(short, long)]
        password: Option<String>,

        /// Date to fetch transactions (YYYY-MM-DD), defaults to today
        #[arg(short, long, value_name = "YYYY-MM-DD")]
        date: Option<String>,
    },

    /// Show whether the saved session is still usable
    Status,

    /// Delete the saved session
    Logout,
}
