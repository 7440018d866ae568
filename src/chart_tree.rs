use indextree::{Arena, NodeId};
use std::collections::HashMap;

use crate::bucket::{Bucketing, ChartNode};
use crate::error::{Error, Result};

/// A chart row placed in the tree.
#[derive(Debug, Clone)]
pub struct ChartTreeNode {
    pub name: String,
    pub weight: f64,
    /// Set on the synthetic node grouping the remaining entries.
    pub is_aggregate: bool,
}

/// Bucketed chart dataset arranged as a tree in an arena.
pub struct ChartTree {
    arena: Arena<ChartTreeNode>,
    root: NodeId,
}

impl ChartTree {
    pub fn from_bucketing(bucketing: &Bucketing) -> Result<Self> {
        Self::from_nodes(&bucketing.chart, &bucketing.other_name)
    }

    /// Build from chart rows. Exactly one row may lack a parent and every
    /// other row must name a parent that appears earlier in the dataset.
    /// The row called `aggregate` is flagged as the grouping node.
    pub fn from_nodes(nodes: &[ChartNode], aggregate: &str) -> Result<Self> {
        let mut rows = nodes.iter();
        let root_row = rows
            .next()
            .ok_or_else(|| Error::InvalidChart("dataset is empty".into()))?;
        if !root_row.is_root() {
            return Err(Error::InvalidChart(format!(
                "first row {} has a parent",
                root_row.name
            )));
        }

        let mut arena = Arena::new();
        let root = arena.new_node(ChartTreeNode {
            name: root_row.name.clone(),
            weight: root_row.weight,
            is_aggregate: false,
        });
        let mut name_to_node: HashMap<&str, NodeId> = HashMap::new();
        name_to_node.insert(root_row.name.as_str(), root);

        for row in rows {
            let parent_name = row.parent.as_deref().ok_or_else(|| {
                Error::InvalidChart(format!("second root {}", row.name))
            })?;
            let parent_id = *name_to_node.get(parent_name).ok_or_else(|| {
                Error::InvalidChart(format!(
                    "{} references missing parent {}",
                    row.name, parent_name
                ))
            })?;

            let node_id = arena.new_node(ChartTreeNode {
                name: row.name.clone(),
                weight: row.weight,
                is_aggregate: row.name == aggregate,
            });
            parent_id.append(node_id, &mut arena);
            // Duplicate names resolve to the first occurrence as a parent.
            name_to_node.entry(row.name.as_str()).or_insert(node_id);
        }

        Ok(Self { arena, root })
    }

    pub fn get_root(&self) -> NodeId {
        self.root
    }

    pub fn get_arena(&self) -> &Arena<ChartTreeNode> {
        &self.arena
    }
}
