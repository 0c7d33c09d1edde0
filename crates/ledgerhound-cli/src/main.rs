use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ledgerhound_client::{DomLinkSource, OpenAiClassifier, ReqwestFetcher};
use ledgerhound_core::{CrawlConfig, CrawlService};
use ledgerhound_db::{CrawlRepository, Database, DatabaseConfig};

/// Keywords that strongly indicate financial disclosure documents.
const HIGH_PRIORITY_KEYWORDS: &[&str] = &[
    "Contact",
    "ACFR",
    "Budget",
    "Financial Report",
    "Annual Report",
    "Fiscal Year",
    "Financial Statement",
];

/// Weaker signals, mostly organizational.
const MEDIUM_PRIORITY_KEYWORDS: &[&str] =
    &["Finance", "Director", "Department", ".pdf", "Staff", "Treasury"];

/// Crawl targets used when no seeds are given on the command line.
const DEFAULT_SEEDS: &[&str] = &[
    "https://www.a2gov.org/",
    "https://bozeman.net/",
    "https://asu.edu/",
    "https://boerneisd.net/",
];

/// Single-page target for test-mode runs without explicit seeds.
const TEST_SEEDS: &[&str] = &["https://www.austintexas.gov/austin-city-council"];

#[derive(Parser)]
#[command(
    name = "ledgerhound",
    version,
    about = "Keyword-driven relevance crawler for government financial disclosures"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl seed URLs and store LLM-scored links
    Crawl {
        /// Seed URLs to crawl (defaults to the built-in target list)
        seeds: Vec<String>,

        /// Comma-separated high-priority keywords (defaults to the built-in list)
        #[arg(long)]
        high_priority: Option<String>,

        /// Comma-separated medium-priority keywords (defaults to the built-in list)
        #[arg(long)]
        medium_priority: Option<String>,

        /// Maximum recursion depth
        #[arg(long)]
        max_depth: Option<u32>,

        /// Maximum pages fetched per run
        #[arg(long)]
        max_pages: Option<usize>,

        /// Cap on candidate links taken per page
        #[arg(long)]
        max_links: Option<usize>,

        /// Links per classification batch
        #[arg(long)]
        batch_size: Option<usize>,

        /// Minimum relevancy for a link to be stored
        #[arg(long)]
        threshold: Option<f64>,

        /// Minimum relevancy for a stored link to be crawled into
        #[arg(long)]
        follow_threshold: Option<f64>,

        /// Small run for trying things out: one page, depth 1
        #[arg(long, default_value_t = false)]
        test: bool,

        /// LLM model to use (e.g., "gpt-4o-mini", "gemini-2.5-flash")
        #[arg(short, long, env = "LEDGERHOUND_MODEL", default_value = "gpt-4o-mini")]
        model: String,

        /// OpenAI-compatible API base URL
        #[arg(
            short,
            long,
            env = "LEDGERHOUND_BASE_URL",
            default_value = "https://api.openai.com/v1"
        )]
        base_url: String,

        /// API key (reads from LEDGERHOUND_API_KEY env var if not provided)
        #[arg(short, long, env = "LEDGERHOUND_API_KEY")]
        api_key: String,
    },

    /// List crawled pages with link counts
    Pages,

    /// Search stored links
    Search {
        /// Substring matched against URL, title, keywords, and context
        query: String,

        /// Only show links at or above this relevancy
        #[arg(long, default_value_t = 0.0)]
        min_relevancy: f64,

        /// Number of results to show
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ledgerhound=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl {
            seeds,
            high_priority,
            medium_priority,
            max_depth,
            max_pages,
            max_links,
            batch_size,
            threshold,
            follow_threshold,
            test,
            model,
            base_url,
            api_key,
        } => {
            let mut config = if test {
                CrawlConfig::test_mode()
            } else {
                CrawlConfig::default()
            };
            if let Some(depth) = max_depth {
                config.max_depth = depth;
            }
            if let Some(pages) = max_pages {
                config.max_pages = pages;
            }
            if max_links.is_some() {
                config.max_links_per_page = max_links;
            }
            if let Some(size) = batch_size {
                config.batch_size = size;
            }
            if let Some(threshold) = threshold {
                config.relevancy_threshold = threshold;
            }
            if follow_threshold.is_some() {
                config.follow_threshold = follow_threshold;
            }

            let high = high_priority
                .map(|raw| parse_keywords(&raw))
                .unwrap_or_else(|| default_keywords(HIGH_PRIORITY_KEYWORDS));
            let medium = medium_priority
                .map(|raw| parse_keywords(&raw))
                .unwrap_or_else(|| default_keywords(MEDIUM_PRIORITY_KEYWORDS));

            let seeds = resolve_seeds(seeds, test);

            let repo = connect_db().await?;
            cmd_crawl(seeds, high, medium, config, &model, &base_url, &api_key, repo).await?;
        }
        Commands::Pages => {
            let repo = connect_db().await?;
            cmd_pages(&repo).await?;
        }
        Commands::Search {
            query,
            min_relevancy,
            limit,
        } => {
            let repo = connect_db().await?;
            cmd_search(&query, min_relevancy, limit, &repo).await?;
        }
    }

    Ok(())
}

/// Connect to SQLite and make sure the schema exists.
async fn connect_db() -> Result<CrawlRepository> {
    let config = DatabaseConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let db = Database::connect(&config)
        .await
        .context("Failed to connect to database")?;
    db.init_schema().await.map_err(|e| anyhow::anyhow!(e))?;
    Ok(db.crawl_repo())
}

fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

fn default_keywords(keywords: &[&str]) -> Vec<String> {
    keywords.iter().map(|k| k.to_string()).collect()
}

/// Explicit seeds win; otherwise fall back to the built-in list, with
/// the single-page test target in test mode.
fn resolve_seeds(seeds: Vec<String>, test: bool) -> Vec<String> {
    if !seeds.is_empty() {
        return seeds;
    }
    let defaults = if test { TEST_SEEDS } else { DEFAULT_SEEDS };
    defaults.iter().map(|s| s.to_string()).collect()
}

#[allow(clippy::too_many_arguments)]
async fn cmd_crawl(
    seeds: Vec<String>,
    high: Vec<String>,
    medium: Vec<String>,
    config: CrawlConfig,
    model: &str,
    base_url: &str,
    api_key: &str,
    repo: CrawlRepository,
) -> Result<()> {
    let fetcher =
        ReqwestFetcher::with_timeout(config.fetch_timeout).context("Failed to create HTTP client")?;
    let classifier = OpenAiClassifier::with_base_url(api_key, model, base_url)
        .map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        seeds = seeds.len(),
        max_depth = config.max_depth,
        max_pages = config.max_pages,
        model,
        "Starting crawl"
    );

    let mut service = CrawlService::new(fetcher, DomLinkSource::new(), classifier, repo, config);
    let summary = service.run(&seeds, &high, &medium).await;

    println!(
        "Crawl finished: {} pages visited, {} links stored",
        summary.pages_visited, summary.links_stored
    );

    Ok(())
}

async fn cmd_pages(repo: &CrawlRepository) -> Result<()> {
    let pages = repo.list_pages().await.map_err(|e| anyhow::anyhow!(e))?;

    if pages.is_empty() {
        println!("No pages crawled yet.");
        return Ok(());
    }

    for page in pages {
        println!(
            "[{}] {} — {} links ({} high, {} medium), crawled {}",
            page.id,
            page.url,
            page.total_links,
            page.high_relevancy_links,
            page.medium_relevancy_links,
            page.created_at.format("%Y-%m-%d %H:%M UTC"),
        );
    }

    Ok(())
}

async fn cmd_search(
    query: &str,
    min_relevancy: f64,
    limit: i64,
    repo: &CrawlRepository,
) -> Result<()> {
    let links = repo
        .search_links(query, min_relevancy, limit)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    if links.is_empty() {
        println!("No links matching '{query}'.");
        return Ok(());
    }

    for link in links {
        println!("[{:.2}] {}", link.relevancy, link.url);
        if !link.title.is_empty() {
            println!("       title: {}", link.title);
        }
        if !link.high_priority_keywords.is_empty() {
            println!("       high: {}", link.high_priority_keywords.join(", "));
        }
        if !link.medium_priority_keywords.is_empty() {
            println!("       medium: {}", link.medium_priority_keywords.join(", "));
        }
        if !link.relevancy_explanation.is_empty() {
            println!("       why: {}", link.relevancy_explanation);
        }
    }

    Ok(())
}
