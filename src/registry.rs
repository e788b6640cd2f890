use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::decode::DecodedImage;

//Thumbnail ratios are clamped so a single extreme panorama cannot skew the
//whole column layout
pub const ASPECT_RATIO_MIN: f32 = 0.6;
pub const ASPECT_RATIO_MAX: f32 = 1.8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
    Failed,
    Evicted,
}

///One photo in the current browse session. `bitmap` is owned here and only
///while `Loaded`; `aspect_ratio` survives eviction so geometry stays put.
pub struct ImageEntry {
    pub path: PathBuf,
    pub index: usize,
    pub aspect_ratio: Option<f32>,
    pub state: LoadState,
    pub bitmap: Option<Arc<DecodedImage>>,
}

impl ImageEntry {
    fn new(path: PathBuf, index: usize) -> Self {
        Self {
            path,
            index,
            aspect_ratio: None,
            state: LoadState::Unloaded,
            bitmap: None,
        }
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    ///Eligible for (re)dispatch by the load scheduler
    pub fn needs_load(&self) -> bool {
        matches!(self.state, LoadState::Unloaded | LoadState::Evicted)
    }
}

pub struct RemovedEntry {
    pub index: usize,
    pub was_loaded: bool,
}

///Ordered list of entries, single source of truth for ordering, indices and
///per-entry load state. All mutation happens on the coordinator thread.
#[derive(Default)]
pub struct Registry {
    entries: Vec<ImageEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    ///Replaces the whole entry list. Every entry starts over as `Unloaded`;
    ///callers must also reset layout and scheduling state.
    pub fn set_all(&mut self, paths: Vec<PathBuf>) {
        self.entries = paths
            .into_iter()
            .enumerate()
            .map(|(i, p)| ImageEntry::new(p, i))
            .collect();
    }

    ///Appends entries at the end, indices continuing where the list left
    ///off. Existing entries and their slots are untouched.
    pub fn append(&mut self, paths: Vec<PathBuf>) {
        let start = self.entries.len();
        self.entries.extend(
            paths
                .into_iter()
                .enumerate()
                .map(|(i, p)| ImageEntry::new(p, start + i)),
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ImageEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn find_index(&self, path: &Path) -> Option<usize> {
        self.entries.iter().position(|e| e.path == path)
    }

    ///No-op when the path is absent. Renumbers every following entry so
    ///indices stay contiguous.
    pub fn remove_by_path(&mut self, path: &Path) -> Option<RemovedEntry> {
        let index = self.find_index(path)?;
        let removed = self.entries.remove(index);

        for entry in &mut self.entries[index..] {
            entry.index -= 1;
        }

        Some(RemovedEntry {
            index,
            was_loaded: removed.state == LoadState::Loaded,
        })
    }

    ///The only mutator of per-entry runtime fields. Returns true when the
    ///aspect ratio changed, which obliges the caller to invalidate layout
    ///from this index onward.
    pub fn update_load_state(
        &mut self,
        index: usize,
        state: LoadState,
        bitmap: Option<Arc<DecodedImage>>,
        aspect_ratio: Option<f32>,
    ) -> bool {
        let entry = match self.entries.get_mut(index) {
            Some(entry) => entry,
            None => return false,
        };

        entry.state = state;
        entry.bitmap = if state == LoadState::Loaded {
            bitmap
        } else {
            None
        };

        let mut ratio_changed = false;
        if let Some(ratio) = aspect_ratio {
            let clamped = ratio.clamp(ASPECT_RATIO_MIN, ASPECT_RATIO_MAX);
            if entry.aspect_ratio != Some(clamped) {
                entry.aspect_ratio = Some(clamped);
                ratio_changed = true;
            }
        }

        ratio_changed
    }

    pub fn loaded_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.state == LoadState::Loaded)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    fn bitmap() -> Arc<DecodedImage> {
        Arc::new(DecodedImage {
            pixels: vec![0; 12],
            width: 2,
            height: 2,
        })
    }

    fn assert_contiguous(registry: &Registry) {
        for (i, entry) in registry.entries().iter().enumerate() {
            assert_eq!(entry.index, i);
        }
    }

    #[test]
    fn set_all_assigns_contiguous_indices() {
        let mut registry = Registry::new();
        registry.set_all(paths(&["a.jpg", "b.jpg", "c.jpg"]));

        assert_eq!(registry.len(), 3);
        assert_contiguous(&registry);
        assert!(registry.entries().iter().all(|e| e.state == LoadState::Unloaded));
    }

    #[test]
    fn append_continues_index_numbering() {
        let mut registry = Registry::new();
        registry.set_all(paths(&["a.jpg", "b.jpg"]));
        registry.update_load_state(0, LoadState::Loaded, Some(bitmap()), Some(1.4));

        registry.append(paths(&["c.jpg", "d.jpg"]));

        assert_eq!(registry.len(), 4);
        assert_contiguous(&registry);
        //existing entries keep their state, new ones start unloaded
        assert_eq!(registry.get(0).unwrap().state, LoadState::Loaded);
        assert_eq!(registry.get(2).unwrap().state, LoadState::Unloaded);
        assert_eq!(registry.get(3).unwrap().path, PathBuf::from("d.jpg"));
    }

    #[test]
    fn remove_renumbers_following_entries() {
        let mut registry = Registry::new();
        registry.set_all(paths(&["a.jpg", "b.jpg", "c.jpg"]));
        registry.update_load_state(1, LoadState::Loaded, Some(bitmap()), Some(1.0));

        let removed = registry.remove_by_path(Path::new("b.jpg")).unwrap();
        assert_eq!(removed.index, 1);
        assert!(removed.was_loaded);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(0).unwrap().path, PathBuf::from("a.jpg"));
        assert_eq!(registry.get(1).unwrap().path, PathBuf::from("c.jpg"));
        assert_contiguous(&registry);
    }

    #[test]
    fn remove_missing_path_is_a_noop() {
        let mut registry = Registry::new();
        registry.set_all(paths(&["a.jpg"]));

        assert!(registry.remove_by_path(Path::new("nope.jpg")).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn bitmap_present_iff_loaded() {
        let mut registry = Registry::new();
        registry.set_all(paths(&["a.jpg"]));

        registry.update_load_state(0, LoadState::Loaded, Some(bitmap()), Some(1.0));
        assert!(registry.get(0).unwrap().bitmap.is_some());

        registry.update_load_state(0, LoadState::Evicted, None, None);
        assert!(registry.get(0).unwrap().bitmap.is_none());

        //a bitmap passed alongside a non-Loaded state is dropped
        registry.update_load_state(0, LoadState::Failed, Some(bitmap()), None);
        assert!(registry.get(0).unwrap().bitmap.is_none());
    }

    #[test]
    fn eviction_preserves_aspect_ratio() {
        let mut registry = Registry::new();
        registry.set_all(paths(&["a.jpg"]));
        registry.update_load_state(0, LoadState::Loaded, Some(bitmap()), Some(1.5));

        registry.update_load_state(0, LoadState::Evicted, None, None);
        let entry = registry.get(0).unwrap();
        assert_eq!(entry.aspect_ratio, Some(1.5));
        assert!(entry.needs_load());
    }

    #[test]
    fn aspect_ratio_is_clamped() {
        let mut registry = Registry::new();
        registry.set_all(paths(&["pano.jpg", "tall.jpg"]));

        registry.update_load_state(0, LoadState::Loaded, Some(bitmap()), Some(0.1));
        registry.update_load_state(1, LoadState::Loaded, Some(bitmap()), Some(9.0));

        assert_eq!(registry.get(0).unwrap().aspect_ratio, Some(ASPECT_RATIO_MIN));
        assert_eq!(registry.get(1).unwrap().aspect_ratio, Some(ASPECT_RATIO_MAX));
    }

    #[test]
    fn ratio_change_is_reported_once() {
        let mut registry = Registry::new();
        registry.set_all(paths(&["a.jpg"]));

        assert!(registry.update_load_state(0, LoadState::Loaded, Some(bitmap()), Some(1.2)));
        assert!(!registry.update_load_state(0, LoadState::Loaded, Some(bitmap()), Some(1.2)));
    }
}
