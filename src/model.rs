use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// One child of a listed directory, as returned by the explore endpoint.
///
/// `name` is opaque: directories end with `/`, anything else is a leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    #[serde(default)]
    pub parent: String,
    pub size: u64,
    #[serde(default)]
    pub count: u64,
}

impl DirectoryEntry {
    pub fn new(name: impl Into<String>, parent: impl Into<String>, size: u64, count: u64) -> Self {
        Self {
            name: name.into(),
            parent: parent.into(),
            size,
            count,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}

/// Decoded body of `GET /explore/{path}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExploreResult {
    #[serde(rename = "path")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub contents: Vec<DirectoryEntry>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<DirectoryEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<DirectoryEntry>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageTier {
    Standard,
    Nearline,
    Coldline,
    Archive,
}

impl StorageTier {
    pub const ALL: [StorageTier; 4] = [
        StorageTier::Standard,
        StorageTier::Nearline,
        StorageTier::Coldline,
        StorageTier::Archive,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StorageTier::Standard => "Standard",
            StorageTier::Nearline => "Nearline",
            StorageTier::Coldline => "Coldline",
            StorageTier::Archive => "Archive",
        }
    }
}

/// Bytes stored per storage tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSizes {
    pub standard: u64,
    pub nearline: u64,
    pub coldline: u64,
    pub archive: u64,
}

impl TierSizes {
    pub fn get(&self, tier: StorageTier) -> u64 {
        match tier {
            StorageTier::Standard => self.standard,
            StorageTier::Nearline => self.nearline,
            StorageTier::Coldline => self.coldline,
            StorageTier::Archive => self.archive,
        }
    }

    pub fn total(&self) -> u64 {
        self.standard
            .saturating_add(self.nearline)
            .saturating_add(self.coldline)
            .saturating_add(self.archive)
    }
}

/// Estimated monthly cost per storage tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TierCosts {
    pub standard: f64,
    pub nearline: f64,
    pub coldline: f64,
    pub archive: f64,
}

impl TierCosts {
    pub fn get(&self, tier: StorageTier) -> f64 {
        match tier {
            StorageTier::Standard => self.standard,
            StorageTier::Nearline => self.nearline,
            StorageTier::Coldline => self.coldline,
            StorageTier::Archive => self.archive,
        }
    }

    pub fn total(&self) -> f64 {
        self.standard + self.nearline + self.coldline + self.archive
    }
}

/// Decoded body of `GET /summary/{path}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub path: String,
    pub size: TierSizes,
    pub cost: TierCosts,
}

impl Summary {
    /// Reject summaries whose costs are not finite non-negative numbers.
    pub fn validate(self) -> Result<Self> {
        for tier in StorageTier::ALL {
            let cost = self.cost.get(tier);
            if !cost.is_finite() || cost < 0.0 {
                return Err(Error::InvalidSummary {
                    path: self.path.clone(),
                    reason: format!("{} cost is {}", tier.label(), cost),
                });
            }
        }
        Ok(self)
    }

    pub fn tiers(&self) -> impl Iterator<Item = (StorageTier, u64, f64)> + '_ {
        StorageTier::ALL
            .into_iter()
            .map(move |tier| (tier, self.size.get(tier), self.cost.get(tier)))
    }
}

/// Ordering requested from the explore endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Let the backend decide (it sorts by size).
    #[default]
    Default,
    Size,
    Count,
}

impl SortKey {
    pub fn as_query(self) -> &'static str {
        match self {
            SortKey::Default => "",
            SortKey::Size => "size",
            SortKey::Count => "count",
        }
    }

    pub fn next(self) -> Self {
        match self {
            SortKey::Default => SortKey::Size,
            SortKey::Size => SortKey::Count,
            SortKey::Count => SortKey::Default,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::Default => "default",
            SortKey::Size => "size",
            SortKey::Count => "count",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explore_result_ignores_extra_fields() {
        let body = r#"{
            "path": "logs/",
            "contents": [
                {"bucket": "b", "name": "logs/", "parent": "", "storageClass": "",
                 "size": 300, "count": 3, "cost": 0, "created": "0001-01-01T00:00:00Z",
                 "updated": "0001-01-01T00:00:00Z"},
                {"bucket": "b", "name": "logs/app.log", "parent": "logs/", "storageClass": "STANDARD",
                 "size": 300, "count": 1, "cost": 0.1}
            ]
        }"#;

        let result: ExploreResult = serde_json::from_str(body).unwrap();
        assert_eq!(result.title, "logs/");
        assert_eq!(result.contents.len(), 2);
        assert!(result.contents[0].is_dir());
        assert!(!result.contents[1].is_dir());
        assert_eq!(result.contents[1].parent, "logs/");
    }

    #[test]
    fn test_null_contents_decode_to_empty() {
        let result: ExploreResult =
            serde_json::from_str(r#"{"path": "", "contents": null}"#).unwrap();
        assert!(result.contents.is_empty());
    }

    #[test]
    fn test_negative_size_is_rejected() {
        let body = r#"{"path": "", "contents": [{"name": "a/", "parent": "", "size": -1, "count": 0}]}"#;
        assert!(serde_json::from_str::<ExploreResult>(body).is_err());
    }

    #[test]
    fn test_summary_decode_and_totals() {
        let body = r#"{
            "path": "data/",
            "cost": {"standard": 0.5, "nearline": 0.25, "coldline": 0.0, "archive": 0.25},
            "size": {"standard": 100, "nearline": 50, "coldline": 0, "archive": 10}
        }"#;
        let summary: Summary = serde_json::from_str::<Summary>(body)
            .unwrap()
            .validate()
            .unwrap();
        assert_eq!(summary.size.total(), 160);
        assert!((summary.cost.total() - 1.0).abs() < f64::EPSILON);

        let tiers: Vec<_> = summary.tiers().collect();
        assert_eq!(tiers[1], (StorageTier::Nearline, 50, 0.25));
    }

    #[test]
    fn test_summary_negative_cost_rejected() {
        let summary = Summary {
            path: "x/".into(),
            size: TierSizes::default(),
            cost: TierCosts {
                archive: -0.1,
                ..TierCosts::default()
            },
        };
        match summary.validate() {
            Err(Error::InvalidSummary { path, reason }) => {
                assert_eq!(path, "x/");
                assert!(reason.contains("Archive"));
            }
            other => panic!("expected InvalidSummary, got {:?}", other),
        }
    }

    #[test]
    fn test_sort_key_cycle() {
        assert_eq!(SortKey::Default.as_query(), "");
        assert_eq!(SortKey::Default.next(), SortKey::Size);
        assert_eq!(SortKey::Size.next(), SortKey::Count);
        assert_eq!(SortKey::Count.next(), SortKey::Default);
    }
}
