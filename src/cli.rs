//! CLI commands implementation.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;

use crate::config::CrawlConfig;
use crate::crawl::{Crawler, CrawlLimits};
use crate::fetch::{BrowserFetcher, BrowserOptions};
use crate::models::{Category, DateFilter};

#[derive(Parser)]
#[command(name = "penacq")]
#[command(about = "Administrative penalty disclosure acquisition system")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl penalty announcements into structured records
    Crawl {
        /// Categories to crawl (repeatable; defaults to all)
        #[arg(short, long, value_parser = parse_category)]
        category: Vec<Category>,

        /// Restrict to announcements published in this year
        #[arg(long)]
        year: Option<i32>,

        /// Restrict to this month (requires --year)
        #[arg(long)]
        month: Option<u32>,

        /// Restrict to this day of month (requires --month)
        #[arg(long)]
        day: Option<u32>,

        /// Listing pages to visit per category (overrides config)
        #[arg(long)]
        max_pages: Option<u32>,

        /// Cap on records fetched per category
        #[arg(long)]
        max_records: Option<usize>,

        /// Run the browser with a visible window
        #[arg(long)]
        headed: bool,

        /// DevTools URL of an already-running Chrome (e.g. ws://localhost:9222)
        #[arg(long, env = "PENACQ_REMOTE_BROWSER")]
        remote: Option<String>,

        /// Write the JSON result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Config file (TOML); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List the known disclosure categories
    Categories,
}

fn parse_category(s: &str) -> Result<Category, String> {
    Category::from_str(s).ok_or_else(|| {
        format!(
            "unknown category '{}'. Valid options: head_office, provincial_bureau, local_sub_bureau",
            s
        )
    })
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl {
            category,
            year,
            month,
            day,
            max_pages,
            max_records,
            headed,
            remote,
            output,
            config,
        } => {
            cmd_crawl(
                category,
                year,
                month,
                day,
                max_pages,
                max_records,
                headed,
                remote,
                output,
                config,
            )
            .await
        }
        Commands::Categories => cmd_categories(),
    }
}

#[allow(clippy::too_many_arguments)]
async fn cmd_crawl(
    categories: Vec<Category>,
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    max_pages: Option<u32>,
    max_records: Option<usize>,
    headed: bool,
    remote: Option<String>,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = CrawlConfig::load(config_path.as_deref())?;
    let filter = DateFilter::from_parts(year, month, day)?;

    let categories = if categories.is_empty() {
        Category::ALL.to_vec()
    } else {
        categories
    };

    let mut limits = CrawlLimits::for_filter(&config, filter.as_ref());
    if let Some(pages) = max_pages {
        limits.max_pages = pages;
    }
    limits.max_records = max_records;

    match &filter {
        Some(f) => eprintln!(
            "{} window {} across {} categories",
            style("Crawling").green().bold(),
            style(f).cyan(),
            categories.len(),
        ),
        None => eprintln!(
            "{} latest {} pages across {} categories",
            style("Crawling").green().bold(),
            limits.max_pages,
            categories.len(),
        ),
    }

    let options = BrowserOptions {
        headless: !headed,
        remote_url: remote,
        timeout_secs: config.timeout_secs,
        chrome_args: Vec::new(),
    };
    let fetcher = BrowserFetcher::new(options);

    let mut crawler = Crawler::new(fetcher, config, filter);
    let result = crawler.run(&categories, limits).await;

    let total: usize = result.values().map(Vec::len).sum();
    for (category, records) in &result {
        eprintln!(
            "  {} {} — {} records",
            style("✓").green(),
            category.label(),
            records.len(),
        );
    }
    eprintln!("{} {} records total", style("Done:").green().bold(), total);

    let json = serde_json::to_string_pretty(&result)?;
    match output {
        Some(path) => {
            fs::write(&path, json)?;
            eprintln!("Wrote {}", style(path.display()).cyan());
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn cmd_categories() -> anyhow::Result<()> {
    for category in Category::ALL {
        println!("{:<20} {}", category.as_str(), category.label());
    }
    Ok(())
}
