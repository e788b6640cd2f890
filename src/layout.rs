use crate::registry::Registry;

//Wider clamp than the thumbnail one: layout tolerates more skew than the
//placeholder sizing does
pub const LAYOUT_ASPECT_MIN: f32 = 0.4;
pub const LAYOUT_ASPECT_MAX: f32 = 2.5;
///Height factor used until a real aspect ratio is known
pub const DEFAULT_HEIGHT_FACTOR: f32 = 1.2;
///Fixed gap between the image and its cell border, independent of zoom
pub const ITEM_PADDING: f32 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewMode {
    Waterfall,
    Grid,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutParams {
    pub container_width: f32,
    pub columns: usize,
    pub spacing: f32,
    pub view_mode: ViewMode,
}

///Derived, cached geometry for one entry. Never mutated in place; the engine
///recomputes the suffix of slots affected by a change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutSlot {
    pub column: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LayoutSlot {
    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

///Shortest-column masonry layout with suffix-only invalidation. Positions
///are a pure function of (params, aspect ratios of items 0..i) for slot i.
pub struct MasonryLayout {
    params: Option<LayoutParams>,
    slots: Vec<LayoutSlot>,
    valid_len: usize,
    content_height: f32,
    generation: u64,
}

impl Default for MasonryLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl MasonryLayout {
    pub fn new() -> Self {
        Self {
            params: None,
            slots: Vec::new(),
            valid_len: 0,
            content_height: 0.0,
            generation: 0,
        }
    }

    ///Largest column count whose columns fit `available_width` at
    ///`min_column_width`, bounded by `max_columns`. Falls back to a single
    ///column when the container is too narrow for even one.
    pub fn derive_column_count(
        available_width: f32,
        min_column_width: f32,
        spacing: f32,
        max_columns: usize,
    ) -> usize {
        let mut columns = 1;
        for c in 2..=max_columns.max(1) {
            let needed = c as f32 * min_column_width + (c + 1) as f32 * spacing;
            if needed <= available_width {
                columns = c;
            } else {
                break;
            }
        }
        columns
    }

    ///Brings every slot up to date for the registry's current entries.
    ///Only the invalidated suffix is recomputed; a params change drops the
    ///whole cache.
    pub fn compute(&mut self, params: LayoutParams, registry: &Registry) {
        if self.params != Some(params) {
            self.params = Some(params);
            self.valid_len = 0;
            self.generation += 1;
        }

        //Nonsensical geometry yields an empty layout, never an error
        if params.container_width <= 0.0 || params.columns == 0 {
            self.slots.clear();
            self.valid_len = 0;
            self.content_height = 0.0;
            return;
        }

        let n = registry.len();
        if self.valid_len > n {
            self.valid_len = n;
        }
        if self.valid_len == n && self.slots.len() == n {
            return;
        }
        self.slots.truncate(self.valid_len);

        let column_width = (params.container_width
            - (params.columns + 1) as f32 * params.spacing)
            / params.columns as f32;

        //Rebuild per-column running heights from the still-valid prefix
        let mut column_heights = vec![params.spacing; params.columns];
        for slot in &self.slots {
            let h = slot.bottom() + params.spacing;
            if h > column_heights[slot.column] {
                column_heights[slot.column] = h;
            }
        }

        for i in self.valid_len..n {
            let ratio = registry.get(i).and_then(|e| e.aspect_ratio);
            let height = Self::item_height(column_width, ratio, params.view_mode);

            let column = column_heights
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.total_cmp(b.1))
                .map(|(c, _)| c)
                .unwrap_or(0);

            let x = params.spacing + column as f32 * (column_width + params.spacing);
            let y = column_heights[column];

            self.slots.push(LayoutSlot {
                column,
                x,
                y,
                width: column_width,
                height,
            });

            column_heights[column] += height + params.spacing;
        }

        self.valid_len = n;
        self.content_height = column_heights.iter().fold(0.0f32, |acc, h| acc.max(*h));
    }

    fn item_height(column_width: f32, aspect_ratio: Option<f32>, view_mode: ViewMode) -> f32 {
        if view_mode == ViewMode::Grid {
            return column_width + ITEM_PADDING;
        }

        let factor = match aspect_ratio {
            Some(r) => r.clamp(LAYOUT_ASPECT_MIN, LAYOUT_ASPECT_MAX),
            None => DEFAULT_HEIGHT_FACTOR,
        };

        (column_width * factor).round() + ITEM_PADDING
    }

    ///Drops cached slots from `index` onward. Used on insert/remove and when
    ///an entry's real aspect ratio arrives.
    pub fn invalidate_from(&mut self, index: usize) {
        if index < self.valid_len {
            self.valid_len = index;
            self.generation += 1;
        }
    }

    pub fn invalidate_all(&mut self) {
        self.valid_len = 0;
        self.generation += 1;
    }

    pub fn slot(&self, index: usize) -> Option<&LayoutSlot> {
        if index < self.valid_len {
            self.slots.get(index)
        } else {
            None
        }
    }

    pub fn slots(&self) -> &[LayoutSlot] {
        &self.slots[..self.valid_len]
    }

    pub fn len(&self) -> usize {
        self.valid_len
    }

    pub fn is_empty(&self) -> bool {
        self.valid_len == 0
    }

    ///Max final column height; what the scroll container sizes itself by
    pub fn content_height(&self) -> f32 {
        self.content_height
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
