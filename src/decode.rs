use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use fast_image_resize::{
    images::Image as FirImage, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
};
use image::{DynamicImage, ImageFormat, RgbImage};
use thiserror::Error;

use crate::is_raw_extension;

//Embedded preview search windows, smallest first. Most RAW files keep a
//usable JPEG preview within the first few hundred KB.
const EMBEDDED_JPEG_TIERS: &[(usize, usize)] = &[
    (256 * 1024, 50_000),
    (512 * 1024, 30_000),
    (5 * 1024 * 1024, 10_000),
];

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failure reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failure decoding {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("no usable embedded preview in {0}")]
    NoEmbeddedPreview(PathBuf),
}

///Decoded RGB8 bitmap plus its natural dimensions. This is the only image
///representation the core components ever hold.
pub struct DecodedImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl DecodedImage {
    pub fn from_dynamic(img: DynamicImage) -> Self {
        let width = img.width();
        let height = img.height();
        Self {
            pixels: img.into_rgb8().into_raw(),
            width,
            height,
        }
    }

    ///Height over width, the factor the masonry layout scales column width by
    pub fn aspect_ratio(&self) -> f32 {
        if self.width == 0 {
            1.0
        } else {
            self.height as f32 / self.width as f32
        }
    }
}

///Contract the scheduler and preview rely on. `fast_mode` trades quality for
///latency and is used for background thumbnailing; full previews pass false.
///Implementations must be callable concurrently across different paths.
pub trait DecodeService: Send + Sync {
    fn decode(
        &self,
        path: &Path,
        target_size: u32,
        fast_mode: bool,
    ) -> Result<DecodedImage, DecodeError>;
}

pub struct ImageDecoder;

impl DecodeService for ImageDecoder {
    fn decode(
        &self,
        path: &Path,
        target_size: u32,
        fast_mode: bool,
    ) -> Result<DecodedImage, DecodeError> {
        let mut f = File::open(path).map_err(|source| DecodeError::Io {
            path: path.to_owned(),
            source,
        })?;

        let mut buffer = Vec::new();
        f.read_to_end(&mut buffer).map_err(|source| DecodeError::Io {
            path: path.to_owned(),
            source,
        })?;

        let mut img = if is_raw_extension(path) {
            decode_raw(&buffer, path)?
        } else {
            image::load_from_memory(&buffer).map_err(|source| DecodeError::Decode {
                path: path.to_owned(),
                source,
            })?
        };

        img = orient(img, read_orientation(&buffer));

        if target_size > 0 {
            img = resize(img, target_size, fast_mode);
        }

        Ok(DecodedImage::from_dynamic(img))
    }
}

///RAW files are decoded through their embedded JPEG preview. Sensor-level
///demosaicing is out of scope for a browser; the preview is what the camera
///itself shows.
fn decode_raw(buffer: &[u8], path: &Path) -> Result<DynamicImage, DecodeError> {
    for &(max_bytes, min_size) in EMBEDDED_JPEG_TIERS {
        let window = &buffer[..buffer.len().min(max_bytes)];
        if let Some(jpeg) = extract_jpeg(window, min_size) {
            match image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg) {
                Ok(img) => return Ok(img),
                Err(e) => {
                    log::warn!("{} -> embedded preview failed to decode: {e}", path.display());
                }
            }
        }
    }

    //Last resort: largest embedded JPEG anywhere in the file, no size floor
    if let Some(jpeg) = extract_largest_jpeg(buffer) {
        if let Ok(img) = image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg) {
            return Ok(img);
        }
    }

    Err(DecodeError::NoEmbeddedPreview(path.to_owned()))
}

///Returns the first embedded JPEG larger than `min_size` bytes
fn extract_jpeg(data: &[u8], min_size: usize) -> Option<&[u8]> {
    let mut starts = Vec::new();
    for (i, window) in data.windows(2).enumerate() {
        if window == [0xFF, 0xD8] {
            starts.push(i);
            if starts.len() > 5 {
                break;
            }
        }
    }

    for &start in &starts {
        if let Some(end_offset) = data[start..].windows(2).position(|w| w == [0xFF, 0xD9]) {
            let end = start + end_offset + 1;
            if end - start + 1 > min_size {
                return Some(&data[start..=end]);
            }
        }
    }

    None
}

fn extract_largest_jpeg(data: &[u8]) -> Option<&[u8]> {
    let mut best: Option<&[u8]> = None;

    for (i, window) in data.windows(2).enumerate() {
        if window != [0xFF, 0xD8] {
            continue;
        }
        if let Some(end_offset) = data[i..].windows(2).position(|w| w == [0xFF, 0xD9]) {
            let candidate = &data[i..=i + end_offset + 1];
            if best.map_or(true, |b| candidate.len() > b.len()) {
                best = Some(candidate);
            }
        }
    }

    best
}

fn read_orientation(buffer: &[u8]) -> u32 {
    let mut cursor = std::io::Cursor::new(buffer);
    let exif = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif,
        Err(_) => return 1,
    };

    match exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY) {
        Some(field) => field.value.get_uint(0).unwrap_or(1),
        None => 1,
    }
}

//see https://magnushoff.com/articles/jpeg-orientation/
fn orient(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.fliph().rotate270(),
        6 => img.rotate90(),
        7 => img.fliph().rotate90(),
        8 => img.rotate270(),
        _ => img,
    }
}

///Downscales so the longest side fits `target_size`, never upscales
fn resize(img: DynamicImage, target_size: u32, fast_mode: bool) -> DynamicImage {
    let aspect_ratio = img.width() as f32 / img.height() as f32;
    let (dest_width, dest_height) = if img.width() > img.height() {
        let w = img.width().min(target_size);
        (w, (w as f32 / aspect_ratio) as u32)
    } else {
        let h = img.height().min(target_size);
        ((h as f32 * aspect_ratio) as u32, h)
    };

    if dest_width == 0 || dest_height == 0 || (dest_width, dest_height) == (img.width(), img.height())
    {
        return img;
    }

    let src_image = match FirImage::from_vec_u8(
        img.width(),
        img.height(),
        img.to_rgb8().into_raw(),
        PixelType::U8x3,
    ) {
        Ok(src) => src,
        Err(e) => {
            log::warn!("Failure building fast_image_resize image from dynamic image -> {e}");
            return img;
        }
    };

    let mut dest_image = FirImage::new(dest_width, dest_height, src_image.pixel_type());

    let filter = if fast_mode {
        FilterType::Bilinear
    } else {
        FilterType::Lanczos3
    };

    let mut resizer = Resizer::new();
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(filter));
    if let Err(e) = resizer.resize(&src_image, &mut dest_image, &options) {
        log::warn!("Failure resizing image -> {e}");
        return img;
    }

    match RgbImage::from_raw(dest_width, dest_height, dest_image.into_vec()) {
        Some(rgb) => DynamicImage::from(rgb),
        None => {
            log::warn!("Failure building rgb image from resized buffer");
            img
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg_blob(payload_len: usize) -> Vec<u8> {
        let mut blob = vec![0xFF, 0xD8];
        blob.extend(std::iter::repeat(0xAB).take(payload_len));
        blob.extend([0xFF, 0xD9]);
        blob
    }

    #[test]
    fn extract_jpeg_finds_first_large_enough_preview() {
        let mut data = vec![0u8; 64];
        let small = jpeg_blob(4);
        let big = jpeg_blob(128);
        data.extend(&small);
        data.extend(vec![0u8; 32]);
        data.extend(&big);

        let found = extract_jpeg(&data, 64).expect("embedded jpeg");
        assert_eq!(found, big.as_slice());
    }

    #[test]
    fn extract_jpeg_respects_min_size() {
        let mut data = vec![0u8; 16];
        data.extend(jpeg_blob(8));
        assert!(extract_jpeg(&data, 1000).is_none());
    }

    #[test]
    fn extract_largest_jpeg_prefers_biggest() {
        let mut data = jpeg_blob(10);
        data.extend(vec![0u8; 8]);
        let big = jpeg_blob(200);
        data.extend(&big);
        assert_eq!(extract_largest_jpeg(&data).unwrap(), big.as_slice());
    }

    #[test]
    fn orientation_six_rotates_dimensions() {
        let img = DynamicImage::new_rgb8(4, 2);
        let rotated = orient(img, 6);
        assert_eq!((rotated.width(), rotated.height()), (2, 4));
    }

    #[test]
    fn resize_bounds_longest_side() {
        let img = DynamicImage::new_rgb8(400, 200);
        let resized = resize(img, 100, true);
        assert_eq!((resized.width(), resized.height()), (100, 50));
    }

    #[test]
    fn resize_never_upscales() {
        let img = DynamicImage::new_rgb8(40, 20);
        let resized = resize(img, 100, false);
        assert_eq!((resized.width(), resized.height()), (40, 20));
    }

    #[test]
    fn aspect_ratio_is_height_over_width() {
        let img = DecodedImage {
            pixels: vec![0; 4 * 8 * 3],
            width: 4,
            height: 8,
        };
        assert_eq!(img.aspect_ratio(), 2.0);
    }
}
