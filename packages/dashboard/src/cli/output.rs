//! Terminal rendering for CLI commands.

use colored::{ColoredString, Colorize};

use job_list::{CrawledPage, Job, JobListView, JobPage, JobStatus, QueueSnapshot};

pub fn status_label(status: &JobStatus) -> ColoredString {
    let label = status.as_str();
    match status {
        JobStatus::Pending => label.yellow(),
        JobStatus::Running => label.bright_green(),
        JobStatus::Paused => label.cyan(),
        JobStatus::Stopping => label.bright_yellow(),
        JobStatus::Completed | JobStatus::Crawled => label.bright_blue(),
        JobStatus::Failed => label.bright_red(),
        JobStatus::Unknown(_) => label.dimmed(),
    }
}

fn job_line(job: &Job) -> String {
    format!(
        "  {:<38} {:<10} {}  {}",
        job.id.as_str(),
        status_label(&job.status),
        job.created_at.format("%Y-%m-%d %H:%M:%S"),
        job.start_url
    )
}

fn header() -> String {
    format!(
        "  {:<38} {:<10} {:<19}  {}",
        "ID".bold(),
        "STATUS".bold(),
        "CREATED".bold(),
        "URL".bold()
    )
}

pub fn print_page(page: &JobPage) {
    println!("{}", header());
    for job in &page.rows {
        println!("{}", job_line(job));
    }
    if page.rows.is_empty() {
        println!("  {}", "No jobs".dimmed());
    }
    println!();
    println!(
        "  Page {} of {} ({} total)",
        page.page,
        page.total_pages().max(1),
        page.total
    );
}

pub fn print_view(view: &JobListView) {
    // Clear screen and move the cursor home
    print!("\x1B[2J\x1B[H");
    println!(
        "{} {}  filter: {}",
        "Crawl jobs".bright_cyan().bold(),
        if view.live { "● live".bright_green() } else { "○ offline".dimmed() },
        view.query.filter
    );
    println!();
    println!("{}", header());
    for job in &view.rows {
        let mut line = job_line(job);
        if let Some(err) = view.row_errors.get(&job.id) {
            line.push_str(&format!("  {}", err.red()));
        }
        println!("{line}");
    }
    if view.rows.is_empty() {
        println!("  {}", "No jobs".dimmed());
    }
    println!();
    println!(
        "  Page {} of {} ({} total)",
        view.query.page,
        view.total_pages.max(1),
        view.query.total
    );
    if let Some(err) = &view.error {
        let note = if view.stale { " (showing last known data)" } else { "" };
        println!("  {}{}", err.bright_red(), note.dimmed());
    }
}

pub fn print_pages(pages: &[CrawledPage]) {
    if pages.is_empty() {
        println!("  {}", "No pages".dimmed());
        return;
    }
    for page in pages {
        println!(
            "  {} {:<10} {}  {}",
            format!("d{}", page.depth).dimmed(),
            page.status,
            page.url,
            page.title.as_deref().unwrap_or("").dimmed()
        );
    }
}

pub fn print_queue(snapshot: &QueueSnapshot) {
    let stats = &snapshot.queue_stats;
    println!(
        "  {} pending  {} processing  {} completed  {} failed",
        stats.pending.to_string().yellow(),
        stats.processing.to_string().bright_green(),
        stats.completed.to_string().bright_blue(),
        stats.failed.to_string().bright_red()
    );
    println!();
    for entry in &snapshot.jobs {
        println!(
            "  {:<12} {:<38} {}",
            entry.status,
            entry.job_id.as_ref().map(|j| j.as_str()).unwrap_or("-"),
            entry.url
        );
    }
    if let Some(cursor) = &snapshot.pagination.next_cursor {
        if snapshot.pagination.has_more {
            println!();
            println!("  {} --cursor {}", "More:".dimmed(), cursor);
        }
    }
}

pub fn success(msg: &str) {
    println!("{} {}", "✓".bright_green(), msg);
}
