use anyhow::Context;
use clap::{Parser, Subcommand};
use content_curator::capabilities::{
    ensure_admin, HttpScraper, HttpSearcher, HttpSummarizer, SignedSocialClient, TokenAdminGate,
};
use content_curator::fetchers::search::SearchFetcher;
use content_curator::fetchers::social::SocialFetcher;
use content_curator::fetchers::web::WebFetcher;
use content_curator::{
    ApproveOverrides, CuratorConfig, PostStore, Section, SourceKind, SourceRegistry,
    SuggestionPatch, SuggestionQueue, SuggestionStatus, SummarizerAdapter, ReviewWorkflow,
    DEFAULT_BATCH_SIZE,
};
use sqlx::postgres::PgPool;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "content-curator", about = "Content intake and curation pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a content source
    AddSource {
        name: String,
        url: String,
        /// twitter | website | google_alerts_rss
        kind: String,
    },
    /// List configured sources
    ListSources {
        #[arg(long)]
        all: bool,
    },
    /// Activate or deactivate a source
    ToggleSource {
        id: String,
        #[arg(long)]
        active: bool,
    },
    /// Rename a source or point it at a new URL
    UpdateSource {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
    },
    /// Delete a source (suggestions keep their weak reference)
    DeleteSource { id: String },
    /// Fetch from all active sources
    Fetch,
    /// Run the standing content search queries
    Search,
    /// Run the trending search queries
    Trending,
    /// Pull liked and bookmarked social posts
    Social,
    /// Summarize unprocessed pending suggestions until the queue is drained
    Process {
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
    /// List suggestions, optionally filtered
    Suggestions {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        section: Option<String>,
    },
    /// Approve a pending suggestion into a published post
    Approve {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        excerpt: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        section: Option<String>,
        #[arg(long)]
        tag: Option<String>,
    },
    /// Reject a pending suggestion
    Reject { id: String },
    /// Edit the suggested fields of a pending suggestion
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        excerpt: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        section: Option<String>,
        #[arg(long)]
        tag: Option<String>,
    },
    /// List published posts
    Posts {
        #[arg(long)]
        section: Option<String>,
    },
    /// Queue counters
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = CuratorConfig::from_env()?;

    let db = PgPool::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    let registry = SourceRegistry::new(db.clone());
    let queue = SuggestionQueue::new(db.clone());
    let review = ReviewWorkflow::new(db.clone());
    let posts = PostStore::new(db.clone());

    // Mutating commands go through the same admin gate the transport layer
    // would use; local runs authenticate with CURATOR_ADMIN_CREDENTIAL.
    let gate = TokenAdminGate::new(config.admin_token.clone());
    let credential = std::env::var("CURATOR_ADMIN_CREDENTIAL").unwrap_or_default();

    match cli.command {
        Command::AddSource { name, url, kind } => {
            ensure_admin(&gate, &credential)?;
            let kind = SourceKind::from_str(&kind)?;
            let id = registry.add_source(&name, &url, kind).await?;
            println!("{id}");
        }
        Command::ListSources { all } => {
            for source in registry.list_sources(!all).await? {
                println!(
                    "{}  {:<20} {:<18} active={}  {}",
                    source.id, source.name, source.kind, source.active, source.url
                );
            }
        }
        Command::ToggleSource { id, active } => {
            ensure_admin(&gate, &credential)?;
            registry.toggle_source(parse_id(&id)?, active).await?;
        }
        Command::UpdateSource { id, name, url } => {
            ensure_admin(&gate, &credential)?;
            registry
                .update_source(parse_id(&id)?, name.as_deref(), url.as_deref())
                .await?;
        }
        Command::DeleteSource { id } => {
            ensure_admin(&gate, &credential)?;
            registry.delete_source(parse_id(&id)?).await?;
        }
        Command::Fetch => {
            let scraper = Arc::new(HttpScraper::new(config.require_scraper()?.clone()));
            let fetcher = WebFetcher::new(registry, queue, scraper);
            let outcome = fetcher.fetch_from_all_active_sources().await?;
            report(outcome.fetched, &outcome.errors, "fetched");
        }
        Command::Search => {
            let searcher = Arc::new(HttpSearcher::new(config.require_search()?.clone()));
            let fetcher = SearchFetcher::new(queue, searcher);
            let outcome = fetcher.search_for_content().await?;
            info!("{} raw hits", outcome.fetched);
            report(outcome.approved, &outcome.errors, "accepted");
        }
        Command::Trending => {
            let searcher = Arc::new(HttpSearcher::new(config.require_search()?.clone()));
            let fetcher = SearchFetcher::new(queue, searcher);
            let outcome = fetcher.search_trending().await?;
            info!("{} raw hits, {} primary", outcome.fetched, outcome.primary);
            report(outcome.approved, &outcome.errors, "accepted");
        }
        Command::Social => {
            let social_config = config.require_social()?.clone();
            let user_id = social_config.user_id.clone();
            let timeline = Arc::new(SignedSocialClient::new(social_config));
            let fetcher = SocialFetcher::new(queue, timeline, user_id);
            let outcome = fetcher.fetch_likes_and_bookmarks().await?;
            report(outcome.fetched, &outcome.errors, "fetched");
        }
        Command::Process { batch_size } => {
            let summarizer = Arc::new(HttpSummarizer::new(config.require_summarizer()?.clone()));
            let adapter = SummarizerAdapter::new(queue, summarizer);

            let mut total = 0usize;
            let mut errors = Vec::new();
            // A full batch means there may be more work; a short batch
            // means the queue is drained.
            loop {
                let outcome = adapter.process_pending_batch(batch_size).await?;
                total += outcome.processed;
                errors.extend(outcome.errors);
                if outcome.processed < batch_size {
                    break;
                }
            }
            report(total, &errors, "processed");
        }
        Command::Suggestions { status, section } => {
            let status = status.as_deref().map(SuggestionStatus::from_str).transpose()?;
            let section = section.as_deref().map(Section::from_str).transpose()?;
            for suggestion in queue.list(status, section).await? {
                println!(
                    "{}  {:<9} processed={}  {}",
                    suggestion.id,
                    suggestion.status,
                    suggestion.is_processed(),
                    suggestion
                        .suggested_title
                        .as_deref()
                        .unwrap_or(&suggestion.original_title)
                );
            }
        }
        Command::Approve {
            id,
            title,
            excerpt,
            content,
            section,
            tag,
        } => {
            ensure_admin(&gate, &credential)?;
            let overrides = ApproveOverrides {
                title,
                excerpt,
                content,
                section: section.as_deref().map(Section::from_str).transpose()?,
                tag,
            };
            let approved = review.approve(parse_id(&id)?, &overrides).await?;
            println!("{}", approved.slug);
        }
        Command::Reject { id } => {
            ensure_admin(&gate, &credential)?;
            review.reject(parse_id(&id)?).await?;
        }
        Command::Update {
            id,
            title,
            excerpt,
            content,
            section,
            tag,
        } => {
            ensure_admin(&gate, &credential)?;
            let patch = SuggestionPatch {
                title,
                excerpt,
                content,
                section: section.as_deref().map(Section::from_str).transpose()?,
                tag,
            };
            review.update(parse_id(&id)?, &patch).await?;
        }
        Command::Posts { section } => {
            let section = section.as_deref().map(Section::from_str).transpose()?;
            for post in posts.list_published(section).await? {
                println!("{}  {:<9} {}  {}", post.date, post.section, post.slug, post.title);
            }
        }
        Command::Stats => {
            let stats = queue.stats().await?;
            let mut entries: Vec<_> = stats.into_iter().collect();
            entries.sort();
            for (key, value) in entries {
                println!("{key}: {value}");
            }
        }
    }

    Ok(())
}

fn parse_id(raw: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("invalid id: {raw}"))
}

fn report(count: usize, errors: &[String], verb: &str) {
    println!("{verb}: {count}");
    if !errors.is_empty() {
        eprintln!("errors ({}):", errors.len());
        for error in errors {
            eprintln!("  {error}");
        }
    }
}
