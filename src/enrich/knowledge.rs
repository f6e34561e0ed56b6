use crate::cache::{Cache, Claims};
use crate::error::EnrichError;
use crate::retry::{ensure_success, send_with_backoff, Backoff};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

/// "sport" property
pub const SPORT: &str = "P641";
/// "league" property
pub const LEAGUE: &str = "P118";

/// Knowledge-base API location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseSettings {
    pub endpoint: String,
    pub language: String,
}

impl Default for KnowledgeBaseSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://www.wikidata.org/w/api.php".to_string(),
            language: "en".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    id: String,
}

#[derive(Deserialize)]
struct EntitiesResponse {
    #[serde(default)]
    entities: HashMap<String, Entity>,
}

#[derive(Deserialize)]
struct Entity {
    #[serde(default)]
    labels: HashMap<String, LangValue>,
    #[serde(default)]
    claims: HashMap<String, Vec<Statement>>,
}

#[derive(Deserialize)]
struct LangValue {
    value: String,
}

#[derive(Deserialize)]
struct Statement {
    mainsnak: Snak,
}

#[derive(Deserialize)]
struct Snak {
    datavalue: Option<DataValue>,
}

#[derive(Deserialize)]
struct DataValue {
    value: serde_json::Value,
}

/// Wikidata-style entity lookups, answered from the cache when possible
pub struct KnowledgeBase<'c> {
    client: Client,
    settings: KnowledgeBaseSettings,
    backoff: Backoff,
    cache: &'c Mutex<Cache>,
}

impl<'c> KnowledgeBase<'c> {
    pub fn new(settings: KnowledgeBaseSettings, cache: &'c Mutex<Cache>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("trends-scout/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            settings,
            backoff: Backoff::default(),
            cache,
        })
    }

    #[cfg(test)]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    fn with_cache<R>(&self, f: impl FnOnce(&mut Cache) -> R) -> R {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut cache)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T, EnrichError> {
        let response = send_with_backoff(&self.backoff, || {
            self.client.get(&self.settings.endpoint).query(params)
        })
        .await?;
        Ok(ensure_success(response)?.json().await?)
    }

    /// Entity id best matching `term`
    pub async fn resolve(&self, term: &str) -> Result<Option<String>, EnrichError> {
        if let Some(id) = self.with_cache(|c| c.term(term).map(str::to_string)) {
            return Ok(Some(id).filter(|id| !id.is_empty()));
        }

        let body: SearchResponse = self
            .get(&[
                ("action", "wbsearchentities"),
                ("search", term),
                ("language", self.settings.language.as_str()),
                ("limit", "1"),
                ("format", "json"),
            ])
            .await?;
        let id = body.search.into_iter().next().map(|hit| hit.id);
        debug!(term, ?id, "Resolved term");

        self.with_cache(|c| c.insert_term(term, id.as_deref().unwrap_or_default()));
        Ok(id)
    }

    /// Sport and league value ids of entity `id`
    pub async fn claims(&self, id: &str) -> Result<Claims, EnrichError> {
        if let Some(claims) = self.with_cache(|c| c.claims(id).cloned()) {
            return Ok(claims);
        }

        let mut body: EntitiesResponse = self
            .get(&[
                ("action", "wbgetentities"),
                ("ids", id),
                ("props", "claims|labels"),
                ("languages", self.settings.language.as_str()),
                ("format", "json"),
            ])
            .await?;
        let Some(entity) = body.entities.remove(id) else {
            return Err(EnrichError::Data(format!("entity {} missing from response", id)));
        };

        let mut claims = Claims::new();
        for property in [SPORT, LEAGUE] {
            let values: Vec<String> = entity
                .claims
                .get(property)
                .into_iter()
                .flatten()
                .filter_map(|s| s.mainsnak.datavalue.as_ref())
                .filter_map(|v| v.value.get("id").and_then(|id| id.as_str()))
                .map(str::to_string)
                .collect();
            if !values.is_empty() {
                claims.insert(property.to_string(), values);
            }
        }

        let label = entity.labels.get(&self.settings.language).map(|l| l.value.clone());
        self.with_cache(|c| {
            if let Some(label) = &label {
                c.insert_label(id, label);
            }
            c.insert_claims(id, claims.clone());
        });
        Ok(claims)
    }

    /// Labels for `ids`, fetching the uncached ones in a single request
    pub async fn labels(&self, ids: &[String]) -> Result<Vec<String>, EnrichError> {
        let missing: Vec<&str> = self.with_cache(|c| {
            ids.iter()
                .filter(|id| c.label(id).is_none())
                .map(String::as_str)
                .collect()
        });

        if !missing.is_empty() {
            let joined = missing.join("|");
            let body: EntitiesResponse = self
                .get(&[
                    ("action", "wbgetentities"),
                    ("ids", joined.as_str()),
                    ("props", "labels"),
                    ("languages", self.settings.language.as_str()),
                    ("format", "json"),
                ])
                .await?;
            self.with_cache(|c| {
                for (id, entity) in &body.entities {
                    if let Some(label) = entity.labels.get(&self.settings.language) {
                        c.insert_label(id, &label.value);
                    }
                }
            });
        }

        Ok(self.with_cache(|c| {
            ids.iter()
                .filter_map(|id| c.label(id).map(str::to_string))
                .collect()
        }))
    }

    /// Labels of the sport and league claims of the entity matching `term`
    pub async fn sport_labels(&self, term: &str) -> Result<Vec<String>, EnrichError> {
        let Some(id) = self.resolve(term).await? else {
            return Ok(Vec::new());
        };
        let claims = self.claims(&id).await?;
        let ids: Vec<String> = [SPORT, LEAGUE]
            .iter()
            .filter_map(|p| claims.get(*p))
            .flatten()
            .cloned()
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.labels(&ids).await
    }
}
