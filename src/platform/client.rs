//! Player script fetching

use crate::error::SigError;
use reqwest::ClientBuilder;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Desktop browser user agent; the player served to it carries both routines
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Options for fetching a player script
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: Option<String>,
    /// Proxy URL
    pub proxy_url: Option<String>,
    /// Extra request headers
    pub headers: Vec<(String, String)>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
            proxy_url: None,
            headers: Vec::new(),
        }
    }
}

impl FetchOptions {
    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set proxy
    pub fn with_proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    /// Add a request header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Loads a player script body by identifier
#[async_trait::async_trait]
pub trait ScriptFetcher: Send + Sync {
    /// Return the script text named by `script_id`
    async fn fetch(&self, script_id: &str, options: &FetchOptions) -> Result<String, SigError>;
}

/// Fetches player scripts over HTTP
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpScriptFetcher;

impl HttpScriptFetcher {
    /// Create a new HTTP fetcher
    pub fn new() -> Self {
        Self
    }

    fn build_client(options: &FetchOptions) -> Result<reqwest::Client, SigError> {
        let mut builder = ClientBuilder::new()
            .timeout(options.timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(
                options
                    .user_agent
                    .as_deref()
                    .unwrap_or(DEFAULT_USER_AGENT),
            );

        if let Some(proxy_url) = &options.proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        Ok(builder.build()?)
    }
}

#[async_trait::async_trait]
impl ScriptFetcher for HttpScriptFetcher {
    async fn fetch(&self, script_id: &str, options: &FetchOptions) -> Result<String, SigError> {
        debug!("Fetching player script {}", script_id);
        let client = Self::build_client(options)?;

        let mut request = client.get(script_id);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Player script fetch failed with status: {}", status);
            return Err(SigError::FetchStatus {
                url: script_id.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!("Fetched player script ({} bytes)", body.len());
        Ok(body)
    }
}

/// Reads player scripts from disk, treating the identifier as a path
#[derive(Debug, Clone, Default)]
pub struct FileScriptFetcher {
    root: Option<PathBuf>,
}

impl FileScriptFetcher {
    /// Resolve identifiers as given
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Resolve identifiers relative to `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn path_for(&self, script_id: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(script_id),
            None => PathBuf::from(script_id),
        }
    }
}

#[async_trait::async_trait]
impl ScriptFetcher for FileScriptFetcher {
    async fn fetch(&self, script_id: &str, _options: &FetchOptions) -> Result<String, SigError> {
        let path = self.path_for(script_id);
        debug!("Reading player script {}", path.display());
        Ok(tokio::fs::read_to_string(&path).await?)
    }
}
