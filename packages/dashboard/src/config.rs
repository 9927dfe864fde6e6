use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub crawl_api_url: String,
    pub crawl_api_token: Option<String>,
    pub crawl_api_timeout: Duration,
    pub port: u16,
    /// Session owner for CLI commands
    pub user_id: Option<String>,
    pub job_list_page_size: u32,
    /// Zero disables polling
    pub job_list_poll_secs: u64,
    pub queue_poll_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            crawl_api_url: env::var("CRAWL_API_URL").context("CRAWL_API_URL must be set")?,
            crawl_api_token: env::var("CRAWL_API_TOKEN").ok().filter(|t| !t.is_empty()),
            crawl_api_timeout: Duration::from_secs(parse_or("CRAWL_API_TIMEOUT_SECS", 30)?),
            port: parse_or("PORT", 8080)?,
            user_id: env::var("DASHBOARD_USER_ID").ok().filter(|u| !u.is_empty()),
            job_list_page_size: parse_or("JOB_LIST_PAGE_SIZE", 10)?,
            job_list_poll_secs: parse_or("JOB_LIST_POLL_SECS", 0)?,
            queue_poll_secs: parse_or("QUEUE_POLL_SECS", 5)?,
        })
    }

    pub fn job_list_poll_interval(&self) -> Option<Duration> {
        (self.job_list_poll_secs > 0).then(|| Duration::from_secs(self.job_list_poll_secs))
    }

    pub fn queue_poll_interval(&self) -> Duration {
        Duration::from_secs(self.queue_poll_secs.max(1))
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid number")),
        _ => Ok(default),
    }
}
