use crate::enrich::knowledge::KnowledgeBase;
use crate::enrich::{EnrichInput, Enricher, NOT_A_SPORT, UNKNOWN};
use crate::models::Classification;
use async_trait::async_trait;
use tracing::{debug, warn};

/// keyword, sport, league. Checked in order, so specific entries come first.
const RULES: &[(&str, &str, Option<&str>)] = &[
    ("premier league", "Soccer", Some("Premier League")),
    ("champions league", "Soccer", Some("UEFA Champions League")),
    ("la liga", "Soccer", Some("La Liga")),
    ("bundesliga", "Soccer", Some("Bundesliga")),
    ("serie a", "Soccer", Some("Serie A")),
    ("ligue 1", "Soccer", Some("Ligue 1")),
    ("k league", "Soccer", Some("K League")),
    ("k리그", "Soccer", Some("K League")),
    ("major league soccer", "Soccer", Some("MLS")),
    ("mls", "Soccer", Some("MLS")),
    ("wnba", "Basketball", Some("WNBA")),
    ("nba", "Basketball", Some("NBA")),
    ("kbl", "Basketball", Some("KBL")),
    ("nfl", "American Football", Some("NFL")),
    ("mlb", "Baseball", Some("MLB")),
    ("kbo", "Baseball", Some("KBO League")),
    ("npb", "Baseball", Some("NPB")),
    ("nhl", "Ice Hockey", Some("NHL")),
    ("ufc", "MMA", Some("UFC")),
    ("lpga", "Golf", Some("LPGA Tour")),
    ("pga tour", "Golf", Some("PGA Tour")),
    ("formula one", "Motorsport", Some("Formula One")),
    ("formula 1", "Motorsport", Some("Formula One")),
    ("atp", "Tennis", Some("ATP Tour")),
    ("wta", "Tennis", Some("WTA Tour")),
    ("v-league", "Volleyball", Some("V-League")),
    ("ipl", "Cricket", Some("IPL")),
    ("lck", "Esports", Some("LCK")),
    ("american football", "American Football", None),
    ("association football", "Soccer", None),
    ("soccer", "Soccer", None),
    ("football", "Soccer", None),
    ("축구", "Soccer", None),
    ("basketball", "Basketball", None),
    ("농구", "Basketball", None),
    ("baseball", "Baseball", None),
    ("야구", "Baseball", None),
    ("volleyball", "Volleyball", None),
    ("배구", "Volleyball", None),
    ("table tennis", "Table Tennis", None),
    ("tennis", "Tennis", None),
    ("golf", "Golf", None),
    ("골프", "Golf", None),
    ("mixed martial arts", "MMA", None),
    ("mma", "MMA", None),
    ("boxing", "Boxing", None),
    ("ice hockey", "Ice Hockey", None),
    ("hockey", "Hockey", None),
    ("cricket", "Cricket", None),
    ("rugby", "Rugby", None),
    ("badminton", "Badminton", None),
    ("figure skating", "Figure Skating", None),
    ("swimming", "Swimming", None),
    ("esports", "Esports", None),
    ("league of legends", "Esports", None),
];

/// Deterministic classifier: matches a keyword table against the trend's title, its
/// related topics, and, when a knowledge base is attached, the labels of the sport and
/// league the matching entity is known for.
pub struct KeywordEnricher<'c> {
    knowledge: Option<KnowledgeBase<'c>>,
}

impl<'c> KeywordEnricher<'c> {
    pub fn new(knowledge: Option<KnowledgeBase<'c>>) -> Self {
        Self { knowledge }
    }

    async fn classify_one(&self, input: &EnrichInput) -> Classification {
        let mut texts = vec![input.title.clone()];
        texts.extend(input.topics.iter().cloned());

        let mut lookup_failed = false;
        if let Some(kb) = &self.knowledge {
            match kb.sport_labels(&input.title).await {
                Ok(labels) => texts.extend(labels),
                Err(e) => {
                    warn!(title = %input.title, error = %e, "Knowledge-base lookup failed");
                    lookup_failed = true;
                }
            }
        }

        match classify_text(&texts.join("\n")) {
            Some(found) => found,
            None if lookup_failed => Classification::with_league(UNKNOWN, UNKNOWN),
            None => Classification::with_league(NOT_A_SPORT, UNKNOWN),
        }
    }
}

#[async_trait]
impl Enricher for KeywordEnricher<'_> {
    async fn classify(&self, inputs: &[EnrichInput]) -> Vec<Classification> {
        let mut labels = Vec::with_capacity(inputs.len());
        for input in inputs {
            let label = self.classify_one(input).await;
            debug!(title = %input.title, sport = %label.sport, "Classified");
            labels.push(label);
        }
        labels
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

/// First keyword-table hit in `text`
pub fn classify_text(text: &str) -> Option<Classification> {
    let haystack = text.to_lowercase();
    RULES
        .iter()
        .find(|(keyword, _, _)| contains_keyword(&haystack, keyword))
        .map(|(_, sport, league)| {
            Classification::with_league(*sport, league.unwrap_or(UNKNOWN))
        })
}

/// ASCII keywords must stand alone (so `nba` does not match inside `nbanews`); others
/// match anywhere, since Hangul words attach particles directly.
fn contains_keyword(haystack: &str, keyword: &str) -> bool {
    if !keyword.is_ascii() {
        return haystack.contains(keyword);
    }
    haystack.match_indices(keyword).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + keyword.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str, topics: &[&str]) -> EnrichInput {
        EnrichInput {
            title: title.to_string(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn league_beats_generic_sport() {
        let c = classify_text("Tottenham vs Man City\nPremier League\nfootball").unwrap();
        assert_eq!(c.sport, "Soccer");
        assert_eq!(c.league.as_deref(), Some("Premier League"));
    }

    #[test]
    fn hangul_keywords_match_inside_words() {
        let c = classify_text("손흥민 축구선수").unwrap();
        assert_eq!(c.sport, "Soccer");
        assert_eq!(c.league.as_deref(), Some(UNKNOWN));
    }

    #[test]
    fn ascii_keywords_need_word_boundaries() {
        assert!(classify_text("atpase enzyme").is_none());
        assert_eq!(classify_text("Lakers (NBA)").unwrap().sport, "Basketball");
    }

    #[test]
    fn table_tennis_is_not_tennis() {
        assert_eq!(classify_text("table tennis final").unwrap().sport, "Table Tennis");
    }

    #[tokio::test]
    async fn classifies_each_input_without_lookup() {
        let enricher = KeywordEnricher::new(None);
        let labels = enricher
            .classify(&[
                input("doosan bears", &["KBO", "Baseball"]),
                input("weather seoul", &["rain"]),
            ])
            .await;

        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0], Classification::with_league("Baseball", "KBO League"));
        assert_eq!(labels[1].sport, NOT_A_SPORT);
    }
}
