use crate::enrich::{align, EnrichInput, Enricher, UNKNOWN};
use crate::error::EnrichError;
use crate::models::Classification;
use crate::retry::{ensure_success, send_with_backoff, Backoff};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Chat-completions endpoint and batching settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub endpoint: String,
    pub model: String,
    pub batch_size: usize,
    /// Pause between batches
    pub pause_ms: u64,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            batch_size: 10,
            pause_ms: 500,
            timeout_secs: 60,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Classifies trends in batches through a chat-completion model
pub struct LlmEnricher {
    client: Client,
    settings: LlmSettings,
    api_key: String,
    backoff: Backoff,
}

impl LlmEnricher {
    pub fn new(settings: LlmSettings, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            settings,
            api_key,
            backoff: Backoff::default(),
        })
    }

    #[cfg(test)]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    fn prompt(batch: &[EnrichInput]) -> String {
        let items = serde_json::to_string(batch).unwrap_or_else(|_| "[]".to_string());
        format!(
            "You will be given a JSON list of Google Trends entries, each with a title and \
             the related topics shown for it.\n\
             For each entry, name the sport it most likely relates to \
             (e.g. Soccer, Basketball, MMA, Baseball).\n\
             If it does not relate to sports, answer \"Not a sport\".\n\n\
             Return only a JSON array of strings with one answer per entry, in order, like: \
             [\"Soccer\", \"Basketball\", \"Not a sport\"]\n\n\
             Entries: {}",
            items
        )
    }

    async fn complete(&self, prompt: String) -> Result<String, EnrichError> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            temperature: 0.0,
        };

        let response = send_with_backoff(&self.backoff, || {
            self.client
                .post(&self.settings.endpoint)
                .bearer_auth(&self.api_key)
                .json(&request)
        })
        .await?;
        let body: ChatResponse = ensure_success(response)?.json().await?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| EnrichError::Data("no choices in completion".to_string()))
    }

    async fn classify_batch(&self, batch: &[EnrichInput]) -> Vec<String> {
        let reply = match self.complete(Self::prompt(batch)).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Language model request failed");
                return vec![UNKNOWN.to_string(); batch.len()];
            }
        };
        debug!(%reply, "Raw model reply");

        match parse_label_array(&reply) {
            Some(labels) => {
                if labels.len() != batch.len() {
                    warn!(
                        expected = batch.len(),
                        got = labels.len(),
                        "Model answered a different number of items"
                    );
                }
                align(labels, batch.len(), UNKNOWN.to_string())
            }
            None => {
                warn!("Could not find a JSON array in the model reply");
                vec![UNKNOWN.to_string(); batch.len()]
            }
        }
    }
}

#[async_trait]
impl Enricher for LlmEnricher {
    async fn classify(&self, inputs: &[EnrichInput]) -> Vec<Classification> {
        let mut labels = Vec::with_capacity(inputs.len());
        let batch_size = self.settings.batch_size.max(1);

        for (i, batch) in inputs.chunks(batch_size).enumerate() {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(self.settings.pause_ms)).await;
            }
            labels.extend(self.classify_batch(batch).await);
        }
        labels.into_iter().map(Classification::sport).collect()
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}

/// Pull a JSON array of labels out of a model reply, tolerating code fences and chatter
/// around it. Non-string items are kept in their JSON form.
pub fn parse_label_array(reply: &str) -> Option<Vec<String>> {
    let start = reply.find('[')?;
    let end = reply.rfind(']')?;
    if end < start {
        return None;
    }
    let items: Vec<serde_json::Value> = serde_json::from_str(&reply[start..=end]).ok()?;
    Some(
        items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            })
            .collect(),
    )
}
