//! Command line argument parsing

use crate::platform::client::FetchOptions;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Extract player signature functions and resolve format URLs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Player script URL (or path with --local)
    pub player: String,

    /// JSON file with formats: an array, streamingData, or a player response
    #[arg(short, long, value_name = "FILE")]
    pub formats: Option<PathBuf>,

    /// Read the player script from a local file
    #[arg(long)]
    pub local: bool,

    /// Print the extracted functions and exit
    #[arg(long)]
    pub extract_only: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// HTTP timeout (e.g., 30s, 1m)
    #[arg(long, value_name = "DURATION", default_value = "30s")]
    pub timeout: humantime::Duration,

    /// Override User-Agent header
    #[arg(long, value_name = "USER_AGENT")]
    pub user_agent: Option<String>,

    /// Proxy URL (http/https/socks)
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Get HTTP timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        self.timeout.into()
    }

    /// Build fetch options from the HTTP flags
    pub fn fetch_options(&self) -> FetchOptions {
        let mut options = FetchOptions::default().with_timeout(self.timeout_duration());
        if let Some(user_agent) = &self.user_agent {
            options = options.with_user_agent(user_agent.clone());
        }
        if let Some(proxy) = &self.proxy {
            options = options.with_proxy(proxy.clone());
        }
        options
    }

    /// Get output verbosity level
    pub fn verbosity_level(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityLevel {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    Normal,
    /// Verbose (debug info)
    Verbose,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            player: String::new(),
            formats: None,
            local: false,
            extract_only: false,
            json: false,
            timeout: humantime::Duration::from(Duration::from_secs(30)),
            user_agent: None,
            proxy: None,
            verbose: false,
            quiet: false,
        }
    }
}
