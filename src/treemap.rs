/// Rectangle in terminal cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn short_side(&self) -> f32 {
        self.width.min(self.height)
    }

    /// Shrink by `top` rows and one cell on the remaining sides.
    pub fn inset(&self, top: f32) -> Rect {
        Rect::new(
            self.x + 1.0,
            self.y + top,
            (self.width - 2.0).max(0.0),
            (self.height - top - 1.0).max(0.0),
        )
    }
}

/// Item to be laid out in the treemap
#[derive(Debug, Clone)]
pub struct TreemapItem {
    pub weight: f64,
    pub index: usize,
}

/// Result of the treemap layout calculation
#[derive(Debug, Clone)]
pub struct LayoutRect {
    pub rect: Rect,
    pub index: usize,
}

/// Squarified Treemap Algorithm (Bruls, Huizing, van Wijk)
pub struct SquarifiedTreemap;

impl SquarifiedTreemap {
    /// Lay items out so each area is proportional to its weight.
    /// Items with a non-positive or non-finite weight are skipped.
    pub fn layout(items: &[TreemapItem], container: Rect) -> Vec<LayoutRect> {
        let usable: Vec<&TreemapItem> = items
            .iter()
            .filter(|item| item.weight.is_finite() && item.weight > 0.0)
            .collect();
        if usable.is_empty() || container.area() <= 0.0 {
            return vec![];
        }

        let total: f64 = usable.iter().map(|item| item.weight).sum();

        // Normalize weights to fit container area
        let scale = container.area() as f64 / total;
        let mut normalized: Vec<(usize, f32)> = usable
            .iter()
            .map(|item| (item.index, (item.weight * scale) as f32))
            .collect();

        // Sort by size descending for better aspect ratios
        normalized.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut result = Vec::with_capacity(normalized.len());
        let mut row: Vec<(usize, f32)> = Vec::new();
        let mut remaining = container;

        for next in normalized {
            if row.is_empty() {
                row.push(next);
                continue;
            }

            let current_worst = Self::worst_aspect_ratio(&row, remaining);
            row.push(next);
            let test_worst = Self::worst_aspect_ratio(&row, remaining);

            if test_worst > current_worst {
                // Layout current row and start new row
                row.pop();
                let row_total: f32 = row.iter().map(|(_, size)| size).sum();
                Self::layout_row(&row, &mut result, remaining);
                remaining = Self::get_remaining_rect(&remaining, row_total);
                row.clear();
                row.push(next);
            }
        }

        if !row.is_empty() {
            Self::layout_row(&row, &mut result, remaining);
        }

        result
    }

    fn worst_aspect_ratio(row: &[(usize, f32)], container: Rect) -> f32 {
        if row.is_empty() {
            return f32::INFINITY;
        }

        let total: f32 = row.iter().map(|(_, size)| size).sum();
        let w = container.short_side();
        let max_size = row.iter().map(|(_, size)| size).fold(0.0f32, |a, &b| a.max(b));
        let min_size = row.iter().map(|(_, size)| size).fold(f32::INFINITY, |a, &b| a.min(b));

        let aspect1 = (w * w * max_size) / (total * total);
        let aspect2 = (total * total) / (w * w * min_size);

        aspect1.max(aspect2)
    }

    /// Place a row as a strip along the shorter side of `container`.
    fn layout_row(row: &[(usize, f32)], result: &mut Vec<LayoutRect>, container: Rect) {
        let total: f32 = row.iter().map(|(_, size)| size).sum();

        let vertical_strip = container.width >= container.height;
        let length = container.short_side();

        let strip_breadth = if total > 0.0 && length > 0.0 {
            total / length
        } else {
            0.0
        };

        let mut offset = 0.0f32;

        for &(index, size) in row {
            let item_length = if total > 0.0 {
                size / total * length
            } else {
                0.0
            };

            let rect = if vertical_strip {
                Rect::new(container.x, container.y + offset, strip_breadth, item_length)
            } else {
                Rect::new(container.x + offset, container.y, item_length, strip_breadth)
            };

            result.push(LayoutRect { rect, index });
            offset += item_length;
        }
    }

    fn get_remaining_rect(container: &Rect, row_total: f32) -> Rect {
        let vertical_strip = container.width >= container.height;
        let length = container.short_side();

        let strip_breadth = if row_total > 0.0 && length > 0.0 {
            row_total / length
        } else {
            0.0
        };

        if vertical_strip {
            Rect::new(
                container.x + strip_breadth,
                container.y,
                (container.width - strip_breadth).max(0.0),
                container.height,
            )
        } else {
            Rect::new(
                container.x,
                container.y + strip_breadth,
                container.width,
                (container.height - strip_breadth).max(0.0),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(weights: &[f64]) -> Vec<TreemapItem> {
        weights
            .iter()
            .enumerate()
            .map(|(index, &weight)| TreemapItem { weight, index })
            .collect()
    }

    #[test]
    fn test_treemap_basic() {
        let container = Rect::new(0.0, 0.0, 800.0, 600.0);
        let layout = SquarifiedTreemap::layout(&items(&[60.0, 25.0, 10.0, 5.0]), container);

        assert_eq!(layout.len(), 4);
        // Verify total area is approximately preserved (allowing for floating point errors)
        let total_area: f32 = layout.iter().map(|r| r.rect.area()).sum();
        let ratio = total_area / container.area();
        assert!(ratio > 0.99 && ratio < 1.01,
                "Total area ratio {} should be close to 1.0", ratio);
    }

    #[test]
    fn test_area_follows_weight() {
        let container = Rect::new(0.0, 0.0, 100.0, 40.0);
        let layout = SquarifiedTreemap::layout(&items(&[60.0, 25.0, 10.0, 5.0]), container);

        let area_of = |index: usize| {
            layout
                .iter()
                .find(|r| r.index == index)
                .map(|r| r.rect.area())
                .unwrap()
        };
        let share = area_of(0) / container.area();
        assert!((share - 0.6).abs() < 0.01, "share {}", share);
        assert!(area_of(1) > area_of(2));
        assert!(area_of(2) > area_of(3));
    }

    #[test]
    fn test_rects_stay_inside_container() {
        let container = Rect::new(2.0, 3.0, 50.0, 20.0);
        let layout = SquarifiedTreemap::layout(&items(&[5.0, 0.1, 0.1, 0.1, 3.0]), container);
        for r in &layout {
            assert!(r.rect.x >= container.x - 0.01);
            assert!(r.rect.y >= container.y - 0.01);
            assert!(r.rect.x + r.rect.width <= container.x + container.width + 0.01);
            assert!(r.rect.y + r.rect.height <= container.y + container.height + 0.01);
        }
    }

    #[test]
    fn test_zero_weights_and_empty_container() {
        assert!(SquarifiedTreemap::layout(&items(&[0.0, 0.0]), Rect::new(0.0, 0.0, 10.0, 10.0)).is_empty());
        assert!(SquarifiedTreemap::layout(&items(&[1.0]), Rect::new(0.0, 0.0, 0.0, 10.0)).is_empty());

        let layout = SquarifiedTreemap::layout(&items(&[0.0, 2.0]), Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(layout.len(), 1);
        assert_eq!(layout[0].index, 1);
    }
}
