use crate::{
    config::Config,
    crawler::{self, SortOrder},
    gallery::Gallery,
    layout::ViewMode,
    preview::{Preview, PreviewAction},
};
use eframe::egui;
use rfd::FileDialog;
use std::{io, path::PathBuf};

pub struct App {
    gallery: Gallery,
    preview: Option<Preview>,
    current_folder: Option<PathBuf>,
    sort_order: SortOrder,
}

impl App {
    pub fn new(cc: &eframe::CreationContext<'_>) -> io::Result<Self> {
        let cfg = Config::new();

        let mut style = (*cc.egui_ctx.style()).clone();
        for t_styles in style.text_styles.iter_mut() {
            t_styles.1.size *= cfg.general.text_scaling;
        }
        cc.egui_ctx.set_style(style);

        let sort_order = SortOrder::NameAscending;
        let mut gallery = Gallery::new(cfg)?;

        let current_folder = crawler::folder_from_args();
        if let Some(folder) = &current_folder {
            gallery.set_images(crawler::crawl(folder, sort_order));
        }

        Ok(Self {
            gallery,
            preview: None,
            current_folder,
            sort_order,
        })
    }

    fn folder_picker(&mut self) {
        let mut file_dialog = FileDialog::new();
        if let Some(folder) = &self.current_folder {
            file_dialog = file_dialog.set_directory(folder);
        }

        if let Some(folder) = file_dialog.pick_folder() {
            self.gallery
                .set_images(crawler::crawl(&folder, self.sort_order));
            self.current_folder = Some(folder);
        }
    }

    fn set_sort_order(&mut self, order: SortOrder) {
        if self.sort_order == order {
            return;
        }
        self.sort_order = order;
        if let Some(folder) = &self.current_folder {
            self.gallery.set_images(crawler::crawl(folder, order));
        }
    }

    fn menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu")
            .show_separator_line(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.menu_button("File", |ui| {
                        if ui.button("Open Folder").clicked() {
                            self.folder_picker();
                            ui.close_menu();
                        }
                    });

                    ui.menu_button("Sort", |ui| {
                        let orders = [
                            (SortOrder::NameAscending, "Name"),
                            (SortOrder::DateDescending, "Newest First"),
                            (SortOrder::SizeDescending, "Largest First"),
                        ];
                        for (order, label) in orders {
                            if ui
                                .radio(self.sort_order == order, label)
                                .clicked()
                            {
                                self.set_sort_order(order);
                                ui.close_menu();
                            }
                        }
                    });

                    ui.separator();
                    let mut mode = self.gallery.view_mode();
                    ui.selectable_value(&mut mode, ViewMode::Waterfall, "Waterfall");
                    ui.selectable_value(&mut mode, ViewMode::Grid, "Grid");
                    self.gallery.set_view_mode(mode);
                });
            });
    }

    fn status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status")
            .show_separator_line(false)
            .show(ctx, |ui| {
                let folder = self
                    .current_folder
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                ui.horizontal(|ui| {
                    ui.monospace(folder);
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.monospace(format!(
                            "{} / {} loaded",
                            self.gallery.loaded_count(),
                            self.gallery.len()
                        ));
                    });
                });
            });
    }

    fn preview_ui(&mut self, ctx: &egui::Context) {
        let action = match &mut self.preview {
            Some(preview) => preview.ui(ctx),
            None => return,
        };

        match action {
            PreviewAction::Close => self.preview = None,
            PreviewAction::Next => self.step_preview(1),
            PreviewAction::Previous => self.step_preview(-1),
            PreviewAction::None => {}
        }
    }

    fn step_preview(&mut self, step: isize) {
        let current = match &self.preview {
            Some(preview) => preview.path().clone(),
            None => return,
        };

        let paths = self.gallery.image_paths();
        let index = match paths.iter().position(|p| *p == current) {
            Some(i) => i as isize,
            None => return,
        };

        let next = (index + step).rem_euclid(paths.len() as isize) as usize;
        self.preview = Some(Preview::open(paths[next].clone()));
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.preview.is_some() {
            self.preview_ui(ctx);
            return;
        }

        self.menu_bar(ctx);
        self.status_bar(ctx);
        self.gallery.ui(ctx);

        if let Some(path) = self.gallery.selected_image() {
            self.preview = Some(Preview::open(path));
        }

        if let Some(path) = self.gallery.removed_image() {
            log::info!("Removed {}", path.display());
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.gallery.stop();
    }
}
