use std::{path::PathBuf, sync::Arc, thread};

use crossbeam_channel::{bounded, Receiver};
use eframe::egui::{self, Color32};
use epaint::{ColorImage, TextureHandle};

use crate::decode::{DecodeError, DecodeService, DecodedImage, ImageDecoder};

pub enum PreviewAction {
    None,
    Close,
    Next,
    Previous,
}

///Full-size view of one image. The decode runs on its own thread so opening
///a large raw never blocks the frame; until it finishes the window shows the
///file name.
pub struct Preview {
    path: PathBuf,
    rx: Receiver<Result<DecodedImage, DecodeError>>,
    texture: Option<TextureHandle>,
    failed: bool,
}

impl Preview {
    pub fn open(path: PathBuf) -> Preview {
        let (tx, rx) = bounded(1);
        let decode_path = path.clone();
        thread::spawn(move || {
            let decoder: Arc<dyn DecodeService> = Arc::new(ImageDecoder);
            let _ = tx.send(decoder.decode(&decode_path, 0, false));
        });

        Preview {
            path,
            rx,
            texture: None,
            failed: false,
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    pub fn ui(&mut self, ctx: &egui::Context) -> PreviewAction {
        if self.texture.is_none() && !self.failed {
            match self.rx.try_recv() {
                Ok(Ok(img)) => {
                    let size = [img.width as usize, img.height as usize];
                    self.texture = Some(ctx.load_texture(
                        self.name(),
                        ColorImage::from_rgb(size, &img.pixels),
                        Default::default(),
                    ));
                }
                Ok(Err(e)) => {
                    log::warn!("{} -> preview decode failed: {e}", self.path.display());
                    self.failed = true;
                }
                Err(_) => {
                    ctx.request_repaint();
                }
            }
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.centered_and_justified(|ui| match (&self.texture, self.failed) {
                (Some(texture), _) => {
                    let available = ui.available_size();
                    let tex_size = texture.size_vec2();
                    let scale = (available.x / tex_size.x)
                        .min(available.y / tex_size.y)
                        .min(1.0);
                    ui.add(
                        egui::Image::from_texture(texture)
                            .fit_to_exact_size(tex_size * scale.max(f32::EPSILON)),
                    );
                }
                (None, true) => {
                    ui.colored_label(
                        Color32::from_gray(120),
                        format!("Could not open {}", self.name()),
                    );
                }
                (None, false) => {
                    ui.label(self.name());
                }
            });
        });

        ctx.input(|i| {
            if i.key_pressed(egui::Key::Escape) || i.key_pressed(egui::Key::Backspace) {
                PreviewAction::Close
            } else if i.key_pressed(egui::Key::ArrowRight) {
                PreviewAction::Next
            } else if i.key_pressed(egui::Key::ArrowLeft) {
                PreviewAction::Previous
            } else {
                PreviewAction::None
            }
        })
    }
}
