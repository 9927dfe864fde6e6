use anyhow::Result;
use colored::Colorize;

use job_list::{CrawlService, QueueMonitor, QueueMonitorOptions};

use super::output;
use super::CliContext;

pub async fn status(ctx: &CliContext, cursor: Option<&str>, page_size: u32) -> Result<()> {
    let snapshot = ctx
        .crawl_service()?
        .queue_status(cursor, page_size)
        .await?;
    output::print_queue(&snapshot);
    Ok(())
}

pub async fn watch(ctx: &CliContext, page_size: u32) -> Result<()> {
    let monitor = QueueMonitor::spawn(
        ctx.crawl_service()?,
        QueueMonitorOptions {
            page_size,
            poll_interval: ctx.config.queue_poll_interval(),
        },
    );

    let mut rx = monitor.watch();
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }

        let view = rx.borrow_and_update().clone();
        print!("\x1B[2J\x1B[H");
        println!("{}", "Worker queue".bright_cyan().bold());
        println!();
        output::print_queue(&view.snapshot);
        if let Some(err) = &view.error {
            println!("  {}", err.bright_red());
        }
    }
    Ok(())
}
