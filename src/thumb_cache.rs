use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use image::{codecs::jpeg::JpegEncoder, ExtendedColorType, ImageFormat};

use crate::decode::DecodedImage;
use crate::{APPLICATION, ORGANIZATION, QUALIFIER};

const THUMB_JPEG_QUALITY: u8 = 80;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

///On-disk thumbnail cache keyed by (hash of source path, size). Writes are
///idempotent for a given key, so concurrent stores only need atomic rename.
pub struct ThumbCache {
    dir: PathBuf,
}

impl ThumbCache {
    pub fn open() -> io::Result<Self> {
        let dirs = directories::ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no usable cache directory"))?;

        Self::new(dirs.cache_dir().join("thumbnails"))
    }

    pub fn new(dir: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn entry_path(&self, path: &Path, size: u32) -> PathBuf {
        let hash = blake3::hash(path.to_string_lossy().as_bytes());
        self.dir.join(format!("{}_{}.jpg", hash.to_hex(), size))
    }

    ///Returns the cached thumbnail if present and not older than the source
    ///file. Stale or unreadable entries are removed on the way out.
    pub fn lookup(&self, path: &Path, size: u32) -> Option<DecodedImage> {
        let entry = self.entry_path(path, size);
        let entry_modified = fs::metadata(&entry).and_then(|m| m.modified()).ok()?;

        if let Ok(source_modified) = fs::metadata(path).and_then(|m| m.modified()) {
            if entry_modified < source_modified {
                let _ = fs::remove_file(&entry);
                return None;
            }
        }

        let buffer = fs::read(&entry).ok()?;
        match image::load_from_memory_with_format(&buffer, ImageFormat::Jpeg) {
            Ok(img) => Some(DecodedImage::from_dynamic(img)),
            Err(e) => {
                log::warn!("Dropping unreadable cache entry {} -> {e}", entry.display());
                let _ = fs::remove_file(&entry);
                None
            }
        }
    }

    ///Encodes to a temp file and renames it into place
    pub fn store(&self, path: &Path, size: u32, img: &DecodedImage) -> io::Result<()> {
        let entry = self.entry_path(path, size);
        let tmp = self.dir.join(format!(
            "store-{}-{}.tmp",
            std::process::id(),
            TMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        let encoded = {
            let mut file = fs::File::create(&tmp)?;
            let mut encoder = JpegEncoder::new_with_quality(&mut file, THUMB_JPEG_QUALITY);
            encoder.encode(&img.pixels, img.width, img.height, ExtendedColorType::Rgb8)
        };
        if let Err(e) = encoded {
            let _ = fs::remove_file(&tmp);
            return Err(io::Error::new(io::ErrorKind::InvalidData, e));
        }

        fs::rename(&tmp, &entry)
    }
}
