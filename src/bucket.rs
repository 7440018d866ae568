use crate::model::DirectoryEntry;

/// Name of the synthetic node grouping everything past the top entries.
pub const OTHER_NAME: &str = "Other";

/// Display weights of the top entries, largest first.
pub const TOP_WEIGHTS: [f64; 3] = [60.0, 25.0, 10.0];

/// Display weight of the "Other" node.
pub const OTHER_WEIGHT: f64 = 5.0;

/// Display weight of each entry reparented under "Other".
pub const OTHER_CHILD_WEIGHT: f64 = 0.1;

/// One row of the visualization dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartNode {
    pub name: String,
    /// `None` marks the root of the chart.
    pub parent: Option<String>,
    pub weight: f64,
}

impl ChartNode {
    pub fn new(name: impl Into<String>, parent: Option<&str>, weight: f64) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(str::to_string),
            weight,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Whether entries past the top three get their own level under "Other".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OtherPolicy {
    /// Emit only the "Other" node.
    Collapsed,
    /// Also emit every remaining entry as a child of "Other".
    #[default]
    Expanded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bucketing {
    pub chart: Vec<ChartNode>,
    /// Name given to the synthetic node. `OTHER_NAME` unless a listed entry
    /// already uses it.
    pub other_name: String,
    /// Real byte total of the entries grouped under "Other".
    pub other_size: u64,
    pub other_count: u64,
}

/// Reduce a listing to a bounded chart dataset: the parent, the next three
/// entries in the given order, and an "Other" node for the rest.
///
/// `entries[0]` is the listed directory itself. Order is taken as given.
pub fn bucket(entries: &[DirectoryEntry], policy: OtherPolicy) -> Vec<ChartNode> {
    bucket_with_totals(entries, policy).chart
}

pub fn bucket_with_totals(entries: &[DirectoryEntry], policy: OtherPolicy) -> Bucketing {
    let Some((root, children)) = entries.split_first() else {
        return Bucketing {
            chart: Vec::new(),
            other_name: OTHER_NAME.to_string(),
            other_size: 0,
            other_count: 0,
        };
    };

    let split = children.len().min(TOP_WEIGHTS.len());
    let (top, rest) = children.split_at(split);

    let other_size = rest.iter().fold(0u64, |sum, e| sum.saturating_add(e.size));
    let other_count = rest.iter().fold(0u64, |sum, e| sum.saturating_add(e.count));
    let other_name = unused_other_name(entries);

    let mut chart = Vec::with_capacity(2 + top.len() + rest.len());
    chart.push(ChartNode::new(root.name.as_str(), None, root.size as f64));
    chart.extend(
        top.iter()
            .zip(TOP_WEIGHTS)
            .map(|(entry, weight)| ChartNode::new(entry.name.as_str(), Some(root.name.as_str()), weight)),
    );
    chart.push(ChartNode::new(other_name.as_str(), Some(root.name.as_str()), OTHER_WEIGHT));

    if policy == OtherPolicy::Expanded {
        chart.extend(rest.iter().map(|entry| {
            ChartNode::new(entry.name.as_str(), Some(other_name.as_str()), OTHER_CHILD_WEIGHT)
        }));
    }

    Bucketing {
        chart,
        other_name,
        other_size,
        other_count,
    }
}

/// Parent references are by name, so the synthetic node must not share one
/// with a listed entry.
fn unused_other_name(entries: &[DirectoryEntry]) -> String {
    let taken = |name: &str| entries.iter().any(|e| e.name == name);
    if !taken(OTHER_NAME) {
        return OTHER_NAME.to_string();
    }
    (2..)
        .map(|n| format!("{} ({})", OTHER_NAME, n))
        .find(|name| !taken(name))
        .unwrap_or_else(|| OTHER_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, size: u64) -> DirectoryEntry {
        DirectoryEntry::new(name, "", size, 1)
    }

    fn sample() -> Vec<DirectoryEntry> {
        vec![
            entry("root", 100),
            entry("a", 50),
            entry("b", 30),
            entry("c", 10),
            entry("d", 5),
            entry("e", 5),
        ]
    }

    #[test]
    fn test_top_three_and_other() {
        let result = bucket_with_totals(&sample(), OtherPolicy::Collapsed);
        let chart = &result.chart;

        assert_eq!(chart[0], ChartNode::new("root", None, 100.0));
        assert_eq!(chart[1], ChartNode::new("a", Some("root"), 60.0));
        assert_eq!(chart[2], ChartNode::new("b", Some("root"), 25.0));
        assert_eq!(chart[3], ChartNode::new("c", Some("root"), 10.0));
        assert_eq!(chart[4], ChartNode::new(OTHER_NAME, Some("root"), 5.0));
        assert_eq!(chart.len(), 5);
        assert_eq!(result.other_size, 10);
        assert_eq!(result.other_count, 2);
    }

    #[test]
    fn test_expanded_reparents_rest_under_other() {
        let chart = bucket(&sample(), OtherPolicy::Expanded);
        assert_eq!(chart.len(), 7);
        assert_eq!(chart[5], ChartNode::new("d", Some(OTHER_NAME), 0.1));
        assert_eq!(chart[6], ChartNode::new("e", Some(OTHER_NAME), 0.1));
    }

    #[test]
    fn test_single_entry_yields_root_and_other() {
        for policy in [OtherPolicy::Collapsed, OtherPolicy::Expanded] {
            let chart = bucket(&[entry("only", 42)], policy);
            assert_eq!(
                chart,
                vec![
                    ChartNode::new("only", None, 42.0),
                    ChartNode::new(OTHER_NAME, Some("only"), OTHER_WEIGHT),
                ]
            );
        }
    }

    #[test]
    fn test_top_tier_count_tracks_length() {
        let all = sample();
        for len in 1..=all.len() {
            let chart = bucket(&all[..len], OtherPolicy::Collapsed);
            let top_tier = chart
                .iter()
                .filter(|n| n.parent.as_deref() == Some("root") && n.name != OTHER_NAME)
                .count();
            assert_eq!(top_tier, 3.min(len - 1), "len {}", len);
            assert_eq!(chart[0], ChartNode::new("root", None, 100.0));
        }
    }

    #[test]
    fn test_short_listing_keeps_fixed_other_weight() {
        let result = bucket_with_totals(&sample()[..3], OtherPolicy::Expanded);
        assert_eq!(result.other_size, 0);
        assert_eq!(result.chart.last(), Some(&ChartNode::new(OTHER_NAME, Some("root"), 5.0)));
    }

    #[test]
    fn test_input_order_is_preserved() {
        let entries = vec![entry("root", 10), entry("small", 1), entry("big", 9)];
        let chart = bucket(&entries, OtherPolicy::Collapsed);
        assert_eq!(chart[1].name, "small");
        assert_eq!(chart[1].weight, 60.0);
    }

    #[test]
    fn test_empty_input() {
        let result = bucket_with_totals(&[], OtherPolicy::Expanded);
        assert!(result.chart.is_empty());
        assert_eq!(result.other_size, 0);
    }

    #[test]
    fn test_entry_named_other_does_not_capture_children() {
        let entries = vec![
            entry("", 100),
            entry(OTHER_NAME, 40),
            entry("b", 30),
            entry("c", 10),
            entry("d", 5),
            entry("e", 5),
        ];
        let result = bucket_with_totals(&entries, OtherPolicy::Expanded);
        assert_eq!(result.other_name, "Other (2)");
        assert_eq!(result.chart[1], ChartNode::new(OTHER_NAME, Some(""), 60.0));
        assert_eq!(result.chart[4], ChartNode::new("Other (2)", Some(""), OTHER_WEIGHT));
        assert_eq!(result.chart[5], ChartNode::new("d", Some("Other (2)"), OTHER_CHILD_WEIGHT));
        assert_eq!(result.chart[6], ChartNode::new("e", Some("Other (2)"), OTHER_CHILD_WEIGHT));
    }

    #[test]
    fn test_repeatable() {
        let entries = sample();
        assert_eq!(
            bucket(&entries, OtherPolicy::Expanded),
            bucket(&entries, OtherPolicy::Expanded)
        );
    }
}
