mod cache;
mod config;
mod enrich;
mod error;
mod models;
mod retry;
mod scrapers;
mod sink;

use anyhow::{Context, Result};
use cache::Cache;
use config::{llm_api_key, Config, EnricherKind};
use enrich::{enrich_rows, inputs_for, Enricher, KeywordEnricher, KnowledgeBase, LlmEnricher};
use scrapers::{related_for_rows, PaginationDriver, TrendsBrowser};
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("📈 Trends Scout - Google Trends Scraper");
    info!("=======================================");

    let config = Config::load()?;
    config.validate(|key| std::env::var(key).ok())?;
    let opts = config.extract_options()?;

    let cache_path = config.cache_path.clone().unwrap_or_else(Cache::default_path);
    let cache = Mutex::new(Cache::load(&cache_path)?);

    let browser = TrendsBrowser::launch(config.headless)?;
    let page = browser.new_page()?;

    info!("Scraping {}", opts.query.trending_url());
    let mut rows = PaginationDriver::new(&page, &opts).scrape_all_pages()?;

    if rows.is_empty() {
        warn!("No trends scraped; check selectors");
        if let Some(dir) = &config.debug_dir {
            if let Err(e) = page.dump_debug(dir, "trending") {
                warn!(error = %e, "Failed to write debug dump");
            }
        }
        return Ok(());
    }
    info!("✅ Scraped {} trends", rows.len());

    if let Some(enricher) = build_enricher(&config, &cache)? {
        let topics = if config.related_topics {
            info!("Fetching related topics for {} trends", rows.len());
            related_for_rows(&rows, &opts, || browser.new_page())
        } else {
            Vec::new()
        };
        let inputs = inputs_for(&rows, topics);
        enrich_rows(&mut rows, &inputs, enricher.as_ref()).await;
    }

    let sink = sink::sink_for(&config.output, config.write_header, opts.query.clone());
    info!("Writing to {}", sink.describe());
    sink.replace_all(&rows).await?;

    cache
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .save()?;

    info!("🎉 Done");
    Ok(())
}

fn build_enricher<'c>(config: &Config, cache: &'c Mutex<Cache>) -> Result<Option<Box<dyn Enricher + 'c>>> {
    let enricher: Box<dyn Enricher + 'c> = match config.enricher {
        EnricherKind::None => return Ok(None),
        EnricherKind::Llm => {
            let key = llm_api_key(|key| std::env::var(key).ok())
                .context("llm enricher needs GPT_AI or OPENAI_API_KEY")?;
            Box::new(LlmEnricher::new(config.llm.clone(), key)?)
        }
        EnricherKind::Keyword => {
            let kb = KnowledgeBase::new(config.knowledge_base.clone(), cache)?;
            Box::new(KeywordEnricher::new(Some(kb)))
        }
    };
    Ok(Some(enricher))
}
