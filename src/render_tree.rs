use indextree::NodeId;

use crate::chart_tree::ChartTree;
use crate::treemap::{Rect, SquarifiedTreemap, TreemapItem};

/// Rows reserved for the label of a tile that shows its children.
pub const HEADER_HEIGHT: f32 = 1.0;

/// Smallest content area (cells) worth subdividing.
const MIN_NESTED_AREA: f32 = 4.0;

/// A laid-out tile, produced by [`build_render_tree`].
#[derive(Debug, Clone)]
pub struct RenderNode {
    pub name: String,
    pub weight: f64,
    pub outer_rect: Rect,
    /// True for the synthetic "Other" tile.
    pub is_aggregate: bool,
    /// Nested tiles, laid out below the header.
    pub children: Vec<RenderNode>,
}

/// Lay out the children of the chart root inside `container`. Children of
/// those tiles (the expanded "Other" group) are laid out inside their parent.
pub fn build_render_tree(tree: &ChartTree, container: Rect) -> Vec<RenderNode> {
    layout_children(tree, tree.get_root(), container)
}

fn layout_children(tree: &ChartTree, parent: NodeId, container: Rect) -> Vec<RenderNode> {
    let arena = tree.get_arena();
    let children: Vec<NodeId> = parent.children(arena).collect();
    if children.is_empty() {
        return Vec::new();
    }

    let items: Vec<TreemapItem> = children
        .iter()
        .enumerate()
        .filter_map(|(index, id)| {
            arena.get(*id).map(|node| TreemapItem {
                weight: node.get().weight,
                index,
            })
        })
        .collect();

    SquarifiedTreemap::layout(&items, container)
        .into_iter()
        .filter_map(|placed| {
            let id = children[placed.index];
            let data = arena.get(id)?.get();
            let content = placed.rect.inset(HEADER_HEIGHT);
            let nested = if content.area() >= MIN_NESTED_AREA {
                layout_children(tree, id, content)
            } else {
                Vec::new()
            };
            Some(RenderNode {
                name: data.name.clone(),
                weight: data.weight,
                outer_rect: placed.rect,
                is_aggregate: data.is_aggregate,
                children: nested,
            })
        })
        .collect()
}
