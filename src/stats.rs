use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::history::HistoryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Good,
    Warning,
    Poor,
}

impl ScoreBand {
    pub fn of(score: u8) -> Self {
        match score {
            80.. => ScoreBand::Good,
            60..=79 => ScoreBand::Warning,
            _ => ScoreBand::Poor,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreBand::Good => "good",
            ScoreBand::Warning => "warning",
            ScoreBand::Poor => "poor",
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct HistorySummary {
    pub total: usize,
    pub average_score: u8,
    pub latest: Option<DateTime<Utc>>,
    /// Sorted by count descending, then name.
    pub platforms: Vec<(String, usize)>,
    pub good: usize,
    pub warning: usize,
    pub poor: usize,
}

impl HistorySummary {
    /// Expects entries in stored (newest-first) order.
    pub fn from_entries(entries: &[HistoryEntry]) -> Self {
        if entries.is_empty() {
            return Self::default();
        }

        let sum: u32 = entries.iter().map(|e| u32::from(e.score)).sum();
        let average = (f64::from(sum) / entries.len() as f64).round() as u8;

        let mut platform_counts: HashMap<&str, usize> = HashMap::new();
        let mut summary = Self {
            total: entries.len(),
            average_score: average,
            latest: entries.first().map(|e| e.timestamp),
            ..Self::default()
        };

        for entry in entries {
            *platform_counts.entry(entry.platform.as_str()).or_insert(0) += 1;
            match ScoreBand::of(entry.score) {
                ScoreBand::Good => summary.good += 1,
                ScoreBand::Warning => summary.warning += 1,
                ScoreBand::Poor => summary.poor += 1,
            }
        }

        let mut platforms: Vec<(String, usize)> = platform_counts
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        platforms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        summary.platforms = platforms;

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ip::ClientIp;
    use chrono::TimeZone;

    fn entry(score: u8, platform: &str, hour: u32) -> HistoryEntry {
        HistoryEntry {
            id: format!("{platform}-{hour}"),
            url: format!("https://{hour}.example"),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            score,
            platform: platform.to_string(),
            client_ip: ClientIp::Unknown,
        }
    }

    #[test]
    fn empty_history_summarises_to_zero() {
        assert_eq!(HistorySummary::from_entries(&[]), HistorySummary::default());
    }

    #[test]
    fn averages_and_bands() {
        let entries = vec![
            entry(85, "Shopify", 3),
            entry(60, "Cafe24", 2),
            entry(40, "Shopify", 1),
            entry(80, "Custom", 0),
        ];
        let summary = HistorySummary::from_entries(&entries);

        assert_eq!(summary.total, 4);
        // (85 + 60 + 40 + 80) / 4 = 66.25
        assert_eq!(summary.average_score, 66);
        assert_eq!(summary.latest, Some(entries[0].timestamp));
        assert_eq!((summary.good, summary.warning, summary.poor), (2, 1, 1));
        assert_eq!(
            summary.platforms,
            vec![
                ("Shopify".to_string(), 2),
                ("Cafe24".to_string(), 1),
                ("Custom".to_string(), 1),
            ]
        );
    }

    #[test]
    fn average_rounds_half_up() {
        let entries = vec![entry(71, "A", 1), entry(72, "A", 0)];
        assert_eq!(HistorySummary::from_entries(&entries).average_score, 72);
    }

    #[test]
    fn band_edges() {
        assert_eq!(ScoreBand::of(100), ScoreBand::Good);
        assert_eq!(ScoreBand::of(80), ScoreBand::Good);
        assert_eq!(ScoreBand::of(79), ScoreBand::Warning);
        assert_eq!(ScoreBand::of(60), ScoreBand::Warning);
        assert_eq!(ScoreBand::of(59), ScoreBand::Poor);
    }
}
