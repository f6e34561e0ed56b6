use serde::{Deserialize, Serialize};

/// Columns written for every scraped trend, in sheet order.
pub const BASE_HEADER: [&str; 7] = [
    "Title",
    "Search Volume",
    "Started",
    "Ended",
    "Explore Link",
    "Target Publish",
    "Breakdown",
];

/// One trend as shown on the trending page
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrendRow {
    pub title: String,
    pub volume: String,
    pub started: String,
    pub ended: String,
    pub explore_url: String,
    pub target_publish: String,
    pub breakdown: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sport: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league: Option<String>,
}

impl TrendRow {
    /// Flatten into sheet cells. Enrichment columns are only emitted when requested,
    /// and an unset value becomes an empty cell so every record has the same width.
    pub fn to_record(&self, with_sport: bool, with_league: bool) -> Vec<String> {
        let mut record = vec![
            self.title.clone(),
            self.volume.clone(),
            self.started.clone(),
            self.ended.clone(),
            self.explore_url.clone(),
            self.target_publish.clone(),
            self.breakdown.clone(),
        ];
        if with_sport {
            record.push(self.sport.clone().unwrap_or_default());
        }
        if with_league {
            record.push(self.league.clone().unwrap_or_default());
        }
        record
    }
}

/// Sport/league guess attached to a row after scraping
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Classification {
    pub sport: String,
    pub league: Option<String>,
}

impl Classification {
    pub fn sport(sport: impl Into<String>) -> Self {
        Self {
            sport: sport.into(),
            league: None,
        }
    }

    pub fn with_league(sport: impl Into<String>, league: impl Into<String>) -> Self {
        Self {
            sport: sport.into(),
            league: Some(league.into()),
        }
    }
}

/// Header row for a set of rows, widened by whichever enrichment columns are present.
pub fn header_for(rows: &[TrendRow]) -> Vec<String> {
    let (with_sport, with_league) = enrichment_columns(rows);
    let mut header: Vec<String> = BASE_HEADER.iter().map(|h| h.to_string()).collect();
    if with_sport {
        header.push("Sport".to_string());
    }
    if with_league {
        header.push("League".to_string());
    }
    header
}

pub fn enrichment_columns(rows: &[TrendRow]) -> (bool, bool) {
    (
        rows.iter().any(|r| r.sport.is_some()),
        rows.iter().any(|r| r.league.is_some()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(title: &str) -> TrendRow {
        TrendRow {
            title: title.to_string(),
            volume: "20K+".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn header_grows_with_enrichment() {
        let mut rows = vec![row("a"), row("b")];
        assert_eq!(header_for(&rows).len(), 7);

        rows[1].sport = Some("Soccer".to_string());
        let header = header_for(&rows);
        assert_eq!(header.last().map(String::as_str), Some("Sport"));

        rows[0].league = Some("K League 1".to_string());
        assert_eq!(header_for(&rows).len(), 9);
    }

    #[test]
    fn record_pads_missing_enrichment_cells() {
        let r = row("a");
        let record = r.to_record(true, true);
        assert_eq!(record.len(), 9);
        assert_eq!(record[0], "a");
        assert_eq!(record[7], "");
        assert_eq!(record[8], "");
    }
}
