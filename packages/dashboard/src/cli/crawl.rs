use anyhow::Result;

use job_list::{CrawlService, StartCrawl};

use super::output;
use super::CliContext;

pub async fn start(
    ctx: &CliContext,
    url: &str,
    max_depth: u32,
    allowed_domains: Vec<String>,
) -> Result<()> {
    let request = StartCrawl::new(url, max_depth, allowed_domains)?;
    let owner = ctx.owner()?;
    let id = ctx.crawl_service()?.start_crawl(&request, &owner).await?;
    output::success(&format!("Crawl started: {id}"));
    Ok(())
}
