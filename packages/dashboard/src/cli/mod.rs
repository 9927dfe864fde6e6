//! Operator CLI.

pub mod crawl;
pub mod jobs;
pub mod output;
pub mod queue;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;

use crawl_api_client::CrawlApiClient;
use job_list::{HttpCrawlService, OwnerId, PostgresJobStore};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "dashboard")]
#[command(about = "Crawl job dashboard: API server and operator commands")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server
    Serve,

    /// Inspect and manage crawl jobs
    Jobs {
        #[command(subcommand)]
        command: JobsCommand,
    },

    /// Start crawls
    Crawl {
        #[command(subcommand)]
        command: CrawlCommand,
    },

    /// Inspect the worker queue
    Queue {
        #[command(subcommand)]
        command: QueueCommand,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    /// Defaults to JOB_LIST_PAGE_SIZE
    #[arg(long)]
    pub page_size: Option<u32>,
    /// `all` or a job status
    #[arg(long, default_value = "all")]
    pub status: String,
}

#[derive(Subcommand)]
pub enum JobsCommand {
    /// Print one page of jobs
    List(ListArgs),

    /// Keep a page of jobs on screen, redrawn on every change
    Watch(ListArgs),

    /// Request a stop for a pending or running job
    Stop { id: String },

    /// Delete a job that is no longer in flight
    Delete { id: String },

    /// List pages crawled by a job
    Pages {
        id: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
}

#[derive(Subcommand)]
pub enum CrawlCommand {
    /// Start a crawl from a URL
    Start {
        url: String,
        #[arg(long, default_value_t = 1)]
        max_depth: u32,
        /// Restrict the crawl to these domains (repeatable)
        #[arg(long = "allowed-domain")]
        allowed_domains: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum QueueCommand {
    /// Print one page of the queue
    Status {
        #[arg(long)]
        cursor: Option<String>,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },

    /// Poll the queue until interrupted
    Watch {
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
}

/// What CLI commands need from configuration.
pub struct CliContext {
    pub config: Config,
}

impl CliContext {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn owner(&self) -> Result<OwnerId> {
        self.config
            .user_id
            .clone()
            .map(OwnerId::new)
            .context("DASHBOARD_USER_ID must be set for job commands")
    }

    /// Job store scoped to the configured user.
    pub async fn store(&self) -> Result<PostgresJobStore> {
        let owner = self.owner()?;
        let store = PostgresJobStore::connect(&self.config.database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(store.with_session(owner))
    }

    pub fn crawl_service(&self) -> Result<Arc<HttpCrawlService>> {
        let client = CrawlApiClient::with_timeout(
            &self.config.crawl_api_url,
            self.config.crawl_api_token.clone(),
            self.config.crawl_api_timeout,
        )
        .context("CRAWL_API_URL must be a valid URL")?;
        Ok(Arc::new(HttpCrawlService::new(client)))
    }
}

/// Dispatch a non-server command.
pub async fn run(command: Commands, ctx: &CliContext) -> Result<()> {
    match command {
        Commands::Serve => unreachable!("serve is handled by main"),
        Commands::Jobs { command } => match command {
            JobsCommand::List(args) => jobs::list(ctx, &args).await,
            JobsCommand::Watch(args) => jobs::watch(ctx, &args).await,
            JobsCommand::Stop { id } => jobs::stop(ctx, &id).await,
            JobsCommand::Delete { id } => jobs::delete(ctx, &id).await,
            JobsCommand::Pages {
                id,
                page,
                page_size,
            } => jobs::pages(ctx, &id, page, page_size).await,
        },
        Commands::Crawl { command } => match command {
            CrawlCommand::Start {
                url,
                max_depth,
                allowed_domains,
            } => crawl::start(ctx, &url, max_depth, allowed_domains).await,
        },
        Commands::Queue { command } => match command {
            QueueCommand::Status { cursor, page_size } => {
                queue::status(ctx, cursor.as_deref(), page_size).await
            }
            QueueCommand::Watch { page_size } => queue::watch(ctx, page_size).await,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_nested_commands() {
        let cli = Cli::try_parse_from([
            "dashboard", "jobs", "list", "--page", "2", "--status", "running",
        ])
        .unwrap();
        match cli.command {
            Commands::Jobs {
                command: JobsCommand::List(args),
            } => {
                assert_eq!(args.page, 2);
                assert_eq!(args.status, "running");
                assert_eq!(args.page_size, None);
            }
            _ => panic!("expected jobs list"),
        }

        let cli = Cli::try_parse_from([
            "dashboard",
            "crawl",
            "start",
            "https://example.org",
            "--allowed-domain",
            "example.org",
            "--allowed-domain",
            "docs.example.org",
        ])
        .unwrap();
        match cli.command {
            Commands::Crawl {
                command: CrawlCommand::Start { allowed_domains, max_depth, .. },
            } => {
                assert_eq!(allowed_domains.len(), 2);
                assert_eq!(max_depth, 1);
            }
            _ => panic!("expected crawl start"),
        }
    }
}
