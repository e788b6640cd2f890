use std::rc::Rc;

use crate::layout::MasonryLayout;

///Extra items kept on both ends to compensate for local non-monotonicity of
///slot bottoms across columns
pub const RANGE_PAD: usize = 5;
///Scroll offsets at or below this are treated as top-of-scroll
pub const TOP_EPSILON: f32 = 5.0;
///Window requested at top-of-scroll regardless of (possibly stale) geometry
pub const TOP_WINDOW: usize = 50;
///Below this many slots a linear scan beats the binary search
const LINEAR_SEARCH_LIMIT: usize = 50;

///Where the scroll container currently is. Injected at construction; the
///tracker never goes looking for a scroll area itself.
pub trait ViewportProvider {
    fn current_offset(&self) -> f32;
    fn viewport_height(&self) -> f32;
}

///Inclusive index range of items considered visible
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewportRange {
    pub first: usize,
    pub last: usize,
}

impl ViewportRange {
    pub fn contains(&self, index: usize) -> bool {
        index >= self.first && index <= self.last
    }

    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }
}

///Maps scroll position to an index range using the cached layout geometry.
///Index order is treated as a proxy for vertical order (the shortest-column
///heuristic assigns indices in rough reading order), so the binary search
///over slot bottoms is an approximation; RANGE_PAD absorbs the error.
pub struct ViewportTracker {
    provider: Rc<dyn ViewportProvider>,
}

impl ViewportTracker {
    pub fn new(provider: Rc<dyn ViewportProvider>) -> Self {
        Self { provider }
    }

    pub fn visible_range(&self, layout: &MasonryLayout) -> Option<ViewportRange> {
        Self::range_for(
            layout,
            self.provider.current_offset(),
            self.provider.viewport_height(),
        )
    }

    pub fn range_for(layout: &MasonryLayout, top: f32, height: f32) -> Option<ViewportRange> {
        let n = layout.len();
        if n == 0 {
            return None;
        }

        //At the top the first screenful is always requested eagerly, even if
        //geometry is stale
        if top <= TOP_EPSILON {
            return Some(ViewportRange {
                first: 0,
                last: TOP_WINDOW.min(n) - 1,
            });
        }

        let first = Self::search_first(layout, top);
        let last = Self::search_last(layout, top + height, first);

        Some(ViewportRange {
            first: first.saturating_sub(RANGE_PAD),
            last: (last + RANGE_PAD).min(n - 1),
        })
    }

    ///Smallest index whose slot bottom reaches the visible top. Clamps to
    ///the last slot when the offset is past all content.
    fn search_first(layout: &MasonryLayout, visible_top: f32) -> usize {
        let slots = layout.slots();

        if slots.len() < LINEAR_SEARCH_LIMIT {
            return slots
                .iter()
                .position(|s| s.bottom() >= visible_top)
                .unwrap_or(slots.len() - 1);
        }

        let (mut left, mut right) = (0usize, slots.len() - 1);
        while left <= right {
            let mid = (left + right) / 2;
            if slots[mid].bottom() < visible_top {
                left = mid + 1;
            } else {
                if mid == 0 || slots[mid - 1].bottom() < visible_top {
                    return mid;
                }
                right = mid - 1;
            }
        }

        slots.len() - 1
    }

    ///Last index whose slot top is still above the visible bottom
    fn search_last(layout: &MasonryLayout, visible_bottom: f32, start: usize) -> usize {
        let slots = layout.slots();

        if slots.len() < LINEAR_SEARCH_LIMIT {
            return slots
                .iter()
                .skip(start)
                .position(|s| s.top() > visible_bottom)
                .map(|off| (start + off).saturating_sub(1))
                .unwrap_or(slots.len() - 1);
        }

        let (mut left, mut right) = (start, slots.len() - 1);
        while left <= right {
            let mid = (left + right) / 2;
            if slots[mid].top() <= visible_bottom {
                left = mid + 1;
            } else {
                if mid == start || slots[mid - 1].top() <= visible_bottom {
                    return mid.saturating_sub(1);
                }
                right = mid - 1;
            }
        }

        slots.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LayoutParams, ViewMode};
    use crate::registry::{LoadState, Registry};
    use std::cell::Cell;
    use std::path::PathBuf;

    struct FixedProvider {
        offset: Cell<f32>,
        height: Cell<f32>,
    }

    impl ViewportProvider for FixedProvider {
        fn current_offset(&self) -> f32 {
            self.offset.get()
        }

        fn viewport_height(&self) -> f32 {
            self.height.get()
        }
    }

    fn uniform_layout(n: usize, columns: usize) -> (Registry, MasonryLayout) {
        let mut registry = Registry::new();
        registry.set_all((0..n).map(|i| PathBuf::from(format!("{i}.jpg"))).collect());
        for i in 0..n {
            registry.update_load_state(i, LoadState::Loaded, None, Some(1.0));
        }

        let mut layout = MasonryLayout::new();
        layout.compute(
            LayoutParams {
                container_width: 200.0 * columns as f32 + 10.0 * (columns + 1) as f32,
                columns,
                spacing: 10.0,
                view_mode: ViewMode::Waterfall,
            },
            &registry,
        );
        (registry, layout)
    }

    #[test]
    fn empty_layout_has_no_range() {
        let layout = MasonryLayout::new();
        assert!(ViewportTracker::range_for(&layout, 100.0, 600.0).is_none());
    }

    #[test]
    fn top_of_scroll_short_circuits_to_first_window() {
        let (_, layout) = uniform_layout(200, 2);
        let range = ViewportTracker::range_for(&layout, 0.0, 600.0).unwrap();
        assert_eq!(range, ViewportRange { first: 0, last: TOP_WINDOW - 1 });

        let small = MasonryLayout::new();
        assert!(ViewportTracker::range_for(&small, 3.0, 600.0).is_none());
    }

    #[test]
    fn range_covers_every_truly_visible_slot() {
        let (_, layout) = uniform_layout(300, 3);
        let (top, height) = (2_000.0, 800.0);
        let range = ViewportTracker::range_for(&layout, top, height).unwrap();

        for (i, slot) in layout.slots().iter().enumerate() {
            let intersects = slot.bottom() >= top && slot.top() <= top + height;
            if intersects {
                assert!(range.contains(i), "visible slot {i} outside {range:?}");
            }
        }
    }

    #[test]
    fn range_is_padded_and_bounded() {
        let (_, layout) = uniform_layout(60, 2);
        //scroll far past the end: only the padded tail is requested, never
        //the whole list
        let range = ViewportTracker::range_for(&layout, 1.0e6, 800.0).unwrap();
        assert_eq!(range, ViewportRange { first: 54, last: 59 });

        //same behavior on the linear search path
        let (_, small) = uniform_layout(40, 2);
        let range = ViewportTracker::range_for(&small, 1.0e6, 800.0).unwrap();
        assert_eq!(range, ViewportRange { first: 34, last: 39 });
    }

    #[test]
    fn tracker_reads_through_its_provider() {
        let (_, layout) = uniform_layout(200, 2);
        let provider = Rc::new(FixedProvider {
            offset: Cell::new(0.0),
            height: Cell::new(600.0),
        });
        let tracker = ViewportTracker::new(provider.clone());

        let at_top = tracker.visible_range(&layout).unwrap();
        assert_eq!(at_top.first, 0);

        provider.offset.set(3_000.0);
        let scrolled = tracker.visible_range(&layout).unwrap();
        assert!(scrolled.first > 0);
    }

    #[test]
    fn linear_and_binary_search_agree() {
        let (_, big) = uniform_layout(300, 2);
        let (_, small) = uniform_layout(40, 2);

        //identical geometry prefix, one under and one over the linear limit
        let r_big = ViewportTracker::range_for(&big, 500.0, 400.0).unwrap();
        let r_small = ViewportTracker::range_for(&small, 500.0, 400.0).unwrap();
        assert_eq!(r_big.first, r_small.first);
    }
}
