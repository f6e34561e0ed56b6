use crate::enrich::knowledge::KnowledgeBaseSettings;
use crate::enrich::llm::LlmSettings;
use crate::scrapers::types::{ExtractOptions, Selectors, Timing, TrendsQuery};
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Classification applied after scraping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnricherKind {
    #[default]
    None,
    Llm,
    Keyword,
}

impl FromStr for EnricherKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "llm" => Ok(Self::Llm),
            "keyword" => Ok(Self::Keyword),
            other => Err(anyhow!("unknown enricher '{}' (expected none, llm or keyword)", other)),
        }
    }
}

/// Run configuration: an optional JSON file overlaid by `TRENDS_*` environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub query: TrendsQuery,
    /// No default: whether the first row is a header depends on the target
    pub skip_first: Option<bool>,
    pub max_pages: usize,
    pub headless: bool,
    pub selectors: Selectors,
    pub timing: Timing,
    pub output: PathBuf,
    pub write_header: bool,
    /// Where to dump the page when a run finds nothing
    pub debug_dir: Option<PathBuf>,
    pub related_topics: bool,
    pub enricher: EnricherKind,
    pub llm: LlmSettings,
    pub knowledge_base: KnowledgeBaseSettings,
    pub cache_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            query: TrendsQuery::default(),
            skip_first: None,
            max_pages: 50,
            headless: true,
            selectors: Selectors::default(),
            timing: Timing::default(),
            output: PathBuf::from("trends.json"),
            write_header: true,
            debug_dir: None,
            related_topics: false,
            enricher: EnricherKind::None,
            llm: LlmSettings::default(),
            knowledge_base: KnowledgeBaseSettings::default(),
            cache_path: None,
        }
    }
}

impl Config {
    /// Load from the process environment
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match lookup("TRENDS_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env(&lookup)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn apply_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(geo) = lookup("TRENDS_GEO") {
            self.query.geo = geo;
        }
        if let Some(hl) = lookup("TRENDS_HL") {
            self.query.hl = hl;
        }
        if let Some(category) = lookup("TRENDS_CATEGORY") {
            self.query.category = category;
        }
        if let Some(output) = lookup("TRENDS_OUTPUT") {
            self.output = PathBuf::from(output);
        }
        if let Some(skip) = lookup("TRENDS_SKIP_FIRST") {
            self.skip_first = Some(parse_bool(&skip).context("TRENDS_SKIP_FIRST")?);
        }
        if let Some(pages) = lookup("TRENDS_MAX_PAGES") {
            self.max_pages = pages
                .trim()
                .parse()
                .with_context(|| format!("TRENDS_MAX_PAGES is not a number: '{}'", pages))?;
        }
        if let Some(kind) = lookup("TRENDS_ENRICHER") {
            self.enricher = kind.parse()?;
        }
        Ok(())
    }

    /// Scraper options, or an error when something the scraper cannot guess is missing
    pub fn extract_options(&self) -> Result<ExtractOptions> {
        let Some(skip_first) = self.skip_first else {
            bail!("skip_first must be set (config file or TRENDS_SKIP_FIRST)");
        };
        if self.max_pages == 0 {
            bail!("max_pages must be at least 1");
        }
        Ok(ExtractOptions {
            selectors: self.selectors.clone(),
            timing: self.timing.clone(),
            max_pages: self.max_pages,
            ..ExtractOptions::new(self.query.clone(), skip_first)
        })
    }

    /// Check everything a run needs before the browser starts
    pub fn validate(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        self.extract_options()?;
        if self.enricher == EnricherKind::Llm && llm_api_key(lookup).is_none() {
            bail!("llm enricher needs an API key in GPT_AI or OPENAI_API_KEY");
        }
        Ok(())
    }
}

/// API key for the language model, `GPT_AI` first
pub fn llm_api_key(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    ["GPT_AI", "OPENAI_API_KEY"]
        .into_iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.trim().is_empty())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(anyhow!("expected true/false, got '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_need_skip_first() {
        let config = Config::load_with(env(&[])).unwrap();
        assert_eq!(config.query.geo, "KR");
        assert_eq!(config.output, PathBuf::from("trends.json"));
        assert_eq!(config.enricher, EnricherKind::None);
        assert!(config.extract_options().is_err());
    }

    #[test]
    fn environment_overrides() {
        let config = Config::load_with(env(&[
            ("TRENDS_GEO", "US"),
            ("TRENDS_CATEGORY", "20"),
            ("TRENDS_SKIP_FIRST", "yes"),
            ("TRENDS_MAX_PAGES", "3"),
            ("TRENDS_ENRICHER", "Keyword"),
            ("TRENDS_OUTPUT", "out/trends.csv"),
        ]))
        .unwrap();

        let opts = config.extract_options().unwrap();
        assert!(opts.skip_first);
        assert_eq!(opts.max_pages, 3);
        assert_eq!(opts.query.geo, "US");
        assert_eq!(opts.query.category, "20");
        assert_eq!(config.enricher, EnricherKind::Keyword);
        assert_eq!(config.output, PathBuf::from("out/trends.csv"));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(Config::load_with(env(&[("TRENDS_SKIP_FIRST", "maybe")])).is_err());
        assert!(Config::load_with(env(&[("TRENDS_MAX_PAGES", "many")])).is_err());
        assert!(Config::load_with(env(&[("TRENDS_ENRICHER", "oracle")])).is_err());

        let config = Config::load_with(env(&[
            ("TRENDS_SKIP_FIRST", "false"),
            ("TRENDS_MAX_PAGES", "0"),
        ]))
        .unwrap();
        assert!(config.extract_options().is_err());
    }

    #[test]
    fn file_is_overlaid_by_environment() {
        let path = std::env::temp_dir().join(format!("trends-scout-config-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{ "skip_first": true, "query": { "geo": "JP" }, "timing": { "initial_wait_ms": 1000 } }"#,
        )
        .unwrap();
        let path_str = path.to_string_lossy().to_string();

        let config = Config::load_with(env(&[
            ("TRENDS_CONFIG", path_str.as_str()),
            ("TRENDS_HL", "ja"),
        ]))
        .unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.skip_first, Some(true));
        assert_eq!(config.query.geo, "JP");
        assert_eq!(config.query.category, "17");
        assert_eq!(config.query.hl, "ja");
        assert_eq!(config.timing.initial_wait_ms, 1000);
        assert_eq!(config.timing.toggle_timeout_ms, 300);
    }

    #[test]
    fn llm_needs_a_key() {
        let config = Config::load_with(env(&[
            ("TRENDS_SKIP_FIRST", "0"),
            ("TRENDS_ENRICHER", "llm"),
        ]))
        .unwrap();
        assert!(config.validate(env(&[])).is_err());
        assert!(config.validate(env(&[("OPENAI_API_KEY", "sk-test")])).is_ok());
        assert_eq!(
            llm_api_key(env(&[("GPT_AI", "a"), ("OPENAI_API_KEY", "b")])).as_deref(),
            Some("a")
        );
        assert_eq!(
            llm_api_key(env(&[("GPT_AI", " "), ("OPENAI_API_KEY", "b")])).as_deref(),
            Some("b")
        );
    }
}
