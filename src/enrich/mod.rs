pub mod keyword;
pub mod knowledge;
pub mod llm;

use crate::models::{Classification, TrendRow};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

pub use keyword::KeywordEnricher;
pub use knowledge::KnowledgeBase;
pub use llm::LlmEnricher;

/// Label used when a classification could not be obtained
pub const UNKNOWN: &str = "Unknown";
/// Label for trends that are not about sport
pub const NOT_A_SPORT: &str = "Not a sport";

/// What an enricher gets to look at for one trend
#[derive(Debug, Clone, Serialize)]
pub struct EnrichInput {
    pub title: String,
    /// Related topics from the trend's explore page; may be empty
    pub topics: Vec<String>,
}

/// Guesses a sport (and possibly a league) per trend
#[async_trait]
pub trait Enricher: Send + Sync {
    /// One classification per input, in order. Failures become sentinel labels.
    async fn classify(&self, inputs: &[EnrichInput]) -> Vec<Classification>;

    fn name(&self) -> &'static str;
}

/// Truncate or pad `items` to exactly `len`
pub fn align<T: Clone>(mut items: Vec<T>, len: usize, fill: T) -> Vec<T> {
    items.truncate(len);
    items.resize(len, fill);
    items
}

/// Attach a classification to every row. Rows the enricher did not answer for get
/// [`UNKNOWN`]; no row is ever dropped.
pub async fn enrich_rows(rows: &mut [TrendRow], inputs: &[EnrichInput], enricher: &dyn Enricher) {
    info!(enricher = enricher.name(), rows = rows.len(), "Classifying trends");
    let labels = enricher.classify(inputs).await;
    if labels.len() != rows.len() {
        warn!(
            expected = rows.len(),
            got = labels.len(),
            "Enricher returned a mismatched number of labels"
        );
    }
    let labels = align(labels, rows.len(), Classification::sport(UNKNOWN));

    for (row, label) in rows.iter_mut().zip(labels) {
        row.sport = Some(label.sport);
        row.league = label.league;
    }
    if rows.iter().any(|r| r.league.is_some()) {
        for row in rows.iter_mut() {
            row.league.get_or_insert_with(|| UNKNOWN.to_string());
        }
    }
}

/// Inputs for `rows`, pairing each with its related topics (missing topics are empty)
pub fn inputs_for(rows: &[TrendRow], topics: Vec<Vec<String>>) -> Vec<EnrichInput> {
    let topics = align(topics, rows.len(), Vec::new());
    rows.iter()
        .zip(topics)
        .map(|(row, topics)| EnrichInput {
            title: row.title.clone(),
            topics,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<Classification>);

    #[async_trait]
    impl Enricher for Fixed {
        async fn classify(&self, _inputs: &[EnrichInput]) -> Vec<Classification> {
            self.0.clone()
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn rows(n: usize) -> Vec<TrendRow> {
        (0..n)
            .map(|i| TrendRow {
                title: format!("trend {}", i),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn align_pads_and_truncates() {
        assert_eq!(align(vec![1, 2], 4, 0), vec![1, 2, 0, 0]);
        assert_eq!(align(vec![1, 2, 3], 2, 0), vec![1, 2]);
    }

    #[tokio::test]
    async fn short_answer_pads_with_unknown() {
        let mut rows = rows(3);
        let inputs = inputs_for(&rows, Vec::new());
        let enricher = Fixed(vec![Classification::sport("Soccer")]);

        enrich_rows(&mut rows, &inputs, &enricher).await;

        let sports: Vec<_> = rows.iter().map(|r| r.sport.as_deref().unwrap()).collect();
        assert_eq!(sports, ["Soccer", UNKNOWN, UNKNOWN]);
        assert!(rows.iter().all(|r| r.league.is_none()));
    }

    #[tokio::test]
    async fn any_league_fills_league_for_all() {
        let mut rows = rows(2);
        let inputs = inputs_for(&rows, Vec::new());
        let enricher = Fixed(vec![
            Classification::with_league("Baseball", "KBO League"),
            Classification::sport(NOT_A_SPORT),
        ]);

        enrich_rows(&mut rows, &inputs, &enricher).await;

        assert_eq!(rows[0].league.as_deref(), Some("KBO League"));
        assert_eq!(rows[1].league.as_deref(), Some(UNKNOWN));
    }

    #[test]
    fn inputs_pair_titles_with_topics() {
        let rows = rows(2);
        let inputs = inputs_for(&rows, vec![vec!["KBO".to_string()]]);
        assert_eq!(inputs[0].topics, ["KBO"]);
        assert!(inputs[1].topics.is_empty());
        assert_eq!(inputs[1].title, "trend 1");
    }
}
