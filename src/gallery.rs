use std::{
    cell::Cell,
    collections::{HashMap, HashSet},
    io,
    path::PathBuf,
    rc::Rc,
    sync::Arc,
    time::Duration,
};

use eframe::egui::{self, Color32, Rect, Sense, Vec2};
use epaint::{ColorImage, TextureHandle};

use crate::config::Config;
use crate::decode::ImageDecoder;
use crate::deleter;
use crate::layout::{LayoutParams, MasonryLayout, ViewMode};
use crate::reclaimer::MemoryReclaimer;
use crate::registry::{LoadState, Registry};
use crate::scheduler::{LoadEvent, LoadScheduler};
use crate::thumb_cache::ThumbCache;
use crate::viewport::{ViewportProvider, ViewportRange, ViewportTracker};

///Scroll geometry captured from the scroll area each frame, readable by the
///viewport tracker through the provider trait
struct ScrollState {
    offset: Cell<f32>,
    height: Cell<f32>,
}

impl ViewportProvider for ScrollState {
    fn current_offset(&self) -> f32 {
        self.offset.get()
    }

    fn viewport_height(&self) -> f32 {
        self.height.get()
    }
}

///The browse view: a virtualized waterfall (or grid) of thumbnails. Owns the
///registry, layout, scheduler and reclaimer; the app only feeds it paths and
///consumes its events.
pub struct Gallery {
    config: Config,
    registry: Registry,
    layout: MasonryLayout,
    tracker: ViewportTracker,
    scroll: Rc<ScrollState>,
    scheduler: LoadScheduler,
    reclaimer: MemoryReclaimer,
    textures: HashMap<PathBuf, TextureHandle>,
    view_mode: ViewMode,
    visible: Option<ViewportRange>,
    hovered: Option<PathBuf>,
    selected_image: Option<PathBuf>,
    removed_image: Option<PathBuf>,
    scroll_to_top: bool,
}

impl Gallery {
    pub fn new(config: Config) -> io::Result<Gallery> {
        let cache = match ThumbCache::open() {
            Ok(cache) => cache,
            Err(e) => {
                log::warn!("Failure opening thumbnail cache -> {e}, using temp dir");
                ThumbCache::new(std::env::temp_dir().join("cascade-imgv-thumbnails"))?
            }
        };

        let scheduler = LoadScheduler::new(
            Arc::new(ImageDecoder),
            Arc::new(cache),
            config.loading.max_concurrent_loads,
        );
        let reclaimer = MemoryReclaimer::new(
            config.loading.loaded_item_threshold,
            config.loading.protection_margin,
        );
        let scroll = Rc::new(ScrollState {
            offset: Cell::new(0.0),
            height: Cell::new(0.0),
        });

        Ok(Gallery {
            config,
            registry: Registry::new(),
            layout: MasonryLayout::new(),
            tracker: ViewportTracker::new(scroll.clone()),
            scroll,
            scheduler,
            reclaimer,
            textures: HashMap::new(),
            view_mode: ViewMode::Waterfall,
            visible: None,
            hovered: None,
            selected_image: None,
            removed_image: None,
            scroll_to_top: false,
        })
    }

    pub fn set_images(&mut self, paths: Vec<PathBuf>) {
        self.registry.set_all(paths);
        self.layout.invalidate_all();
        self.scheduler.reset();
        self.textures.clear();
        self.visible = None;
        self.scroll_to_top = true;
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        if self.view_mode != mode {
            self.view_mode = mode;
            self.layout.invalidate_all();
            self.scroll_to_top = true;
        }
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn loaded_count(&self) -> usize {
        self.registry.loaded_count()
    }

    pub fn image_paths(&self) -> Vec<PathBuf> {
        self.registry.entries().iter().map(|e| e.path.clone()).collect()
    }

    ///Appends newly discovered images behind the existing entries. Their
    ///slots are laid out on the next frame; nothing already placed moves.
    pub fn load_more(&mut self, paths: Vec<PathBuf>) {
        self.registry.append(paths);
    }

    ///Consumed by the caller, double click opens the preview
    pub fn selected_image(&mut self) -> Option<PathBuf> {
        self.selected_image.take()
    }

    ///Consumed by the caller, raised once per successful removal
    pub fn removed_image(&mut self) -> Option<PathBuf> {
        self.removed_image.take()
    }

    pub fn remove_image(&mut self, path: &std::path::Path) {
        if let Some(removed) = self.registry.remove_by_path(path) {
            self.layout.invalidate_from(removed.index);
            self.textures.remove(path);
            self.removed_image = Some(path.to_path_buf());
        }
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    pub fn ui(&mut self, ctx: &egui::Context) {
        let completed = self.scheduler.drain_completions(&mut self.registry);
        self.apply_events(completed);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.spacing_mut().item_spacing = Vec2::new(0., 0.);

            let available_width = ui.available_width();
            let max_columns = match self.view_mode {
                ViewMode::Waterfall => self.config.gallery.waterfall_columns,
                ViewMode::Grid => self.config.gallery.grid_columns,
            };
            let columns = MasonryLayout::derive_column_count(
                available_width,
                self.config.gallery.min_column_width,
                self.config.gallery.spacing,
                max_columns,
            );
            self.layout.compute(
                LayoutParams {
                    container_width: available_width,
                    columns,
                    spacing: self.config.gallery.spacing,
                    view_mode: self.view_mode,
                },
                &self.registry,
            );

            let mut scroll_area = egui::ScrollArea::vertical().drag_to_scroll(true);
            if self.scroll_to_top {
                self.scroll_to_top = false;
                scroll_area = scroll_area.vertical_scroll_offset(0.0);
            }

            scroll_area.show_viewport(ui, |ui, viewport| {
                ui.set_height(self.layout.content_height());
                ui.set_width(available_width);

                self.scroll.offset.set(viewport.min.y);
                self.scroll.height.set(viewport.height());

                self.visible = self.tracker.visible_range(&self.layout);
                self.hovered = None;

                if let Some(range) = self.visible {
                    let origin = ui.min_rect().min;
                    for i in range.first..=range.last {
                        self.show_item(ui, i, origin);
                    }

                    let buffer = self.config.gallery.buffer_items;
                    let events = self.scheduler.request_visible(
                        &mut self.registry,
                        range,
                        buffer,
                        buffer,
                        self.config.loading.thumbnail_size,
                    );
                    self.apply_events(events);
                }
            });
        });

        self.handle_delete(ctx);
        self.reclaim(ctx);

        if self.scheduler.in_flight() > 0 || self.scheduler.pending_len() > 0 {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }

    ///Ratio changes from finished decodes dirty the layout suffix starting
    ///at the earliest affected entry
    fn apply_events(&mut self, events: Vec<LoadEvent>) {
        let first_dirty = events
            .iter()
            .filter(|e| e.ratio_changed)
            .map(|e| e.index)
            .min();
        if let Some(index) = first_dirty {
            self.layout.invalidate_from(index);
        }
    }

    fn show_item(&mut self, ui: &mut egui::Ui, index: usize, origin: egui::Pos2) {
        let slot = match self.layout.slot(index) {
            Some(slot) => *slot,
            None => return,
        };
        let entry = match self.registry.get(index) {
            Some(entry) => entry,
            None => return,
        };
        let path = entry.path.clone();
        let state = entry.state;
        let name = entry.name();

        let rect = Rect::from_min_size(
            origin + Vec2::new(slot.x, slot.y),
            Vec2::new(slot.width, slot.height),
        );
        //padded range edges sit outside the clip rect, nothing to paint there
        if !ui.is_rect_visible(rect) {
            return;
        }

        let image_rect = rect.shrink(crate::layout::ITEM_PADDING / 2.0);

        match state {
            LoadState::Loaded => {
                if !self.textures.contains_key(&path) {
                    if let Some(bitmap) = self.registry.get(index).and_then(|e| e.bitmap.clone()) {
                        let size = [bitmap.width as usize, bitmap.height as usize];
                        let texture = ui.ctx().load_texture(
                            &name,
                            ColorImage::from_rgb(size, &bitmap.pixels),
                            Default::default(),
                        );
                        self.textures.insert(path.clone(), texture);
                    }
                }

                if let Some(texture) = self.textures.get(&path) {
                    egui::Image::from_texture(texture).paint_at(ui, image_rect);
                } else {
                    ui.painter()
                        .rect_filled(image_rect, egui::CornerRadius::same(2), Color32::from_gray(40));
                }
            }
            LoadState::Failed => {
                ui.painter()
                    .rect_filled(image_rect, egui::CornerRadius::same(2), Color32::from_gray(25));
                ui.painter().text(
                    image_rect.center(),
                    egui::Align2::CENTER_CENTER,
                    &name,
                    egui::FontId::proportional(12.0),
                    Color32::from_gray(120),
                );
            }
            _ => {
                ui.painter()
                    .rect_filled(image_rect, egui::CornerRadius::same(2), Color32::from_gray(40));
            }
        }

        let response = ui.allocate_rect(rect, Sense::click());
        if response.hovered() {
            self.hovered = Some(path.clone());
        }
        if response.double_clicked() && state == LoadState::Loaded {
            self.selected_image = Some(path);
        }
    }

    ///Delete sends the hovered file to the trash and closes the gap
    fn handle_delete(&mut self, ctx: &egui::Context) {
        if !ctx.input(|i| i.key_pressed(egui::Key::Delete)) {
            return;
        }
        let path = match self.hovered.take() {
            Some(path) => path,
            None => return,
        };

        if deleter::trash_file(&path) {
            self.remove_image(&path);
        }
    }

    fn reclaim(&mut self, ctx: &egui::Context) {
        if self.reclaimer.tick(&mut self.registry, self.visible) == 0 {
            return;
        }

        //drop textures of entries that no longer hold a bitmap
        let loaded: HashSet<PathBuf> = self
            .registry
            .entries()
            .iter()
            .filter(|e| e.state == LoadState::Loaded)
            .map(|e| e.path.clone())
            .collect();
        self.textures.retain(|path, _| loaded.contains(path));

        ctx.request_repaint();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn gallery_with(names: &[&str]) -> Gallery {
        let mut gallery = Gallery::new(Config::default()).unwrap();
        gallery.set_images(names.iter().map(PathBuf::from).collect());
        gallery
    }

    #[test]
    fn removal_raises_the_event_exactly_once() {
        let mut gallery = gallery_with(&["a.jpg", "b.jpg", "c.jpg"]);

        gallery.remove_image(Path::new("b.jpg"));

        assert_eq!(gallery.removed_image(), Some(PathBuf::from("b.jpg")));
        assert_eq!(gallery.removed_image(), None);
        assert_eq!(gallery.len(), 2);
    }

    #[test]
    fn removing_an_unknown_path_raises_no_event() {
        let mut gallery = gallery_with(&["a.jpg"]);

        gallery.remove_image(Path::new("nope.jpg"));

        assert_eq!(gallery.removed_image(), None);
        assert_eq!(gallery.len(), 1);
    }

    #[test]
    fn load_more_appends_behind_existing_entries() {
        let mut gallery = gallery_with(&["a.jpg", "b.jpg"]);

        gallery.load_more(vec![PathBuf::from("c.jpg"), PathBuf::from("d.jpg")]);

        let paths = gallery.image_paths();
        assert_eq!(paths.len(), 4);
        assert_eq!(paths[2], PathBuf::from("c.jpg"));
        assert_eq!(paths[3], PathBuf::from("d.jpg"));
    }
}
