pub mod app;
pub mod config;
pub mod crawler;
pub mod decode;
pub mod deleter;
pub mod gallery;
pub mod layout;
pub mod preview;
pub mod reclaimer;
pub mod registry;
pub mod scheduler;
pub mod thumb_cache;
pub mod viewport;

pub const QUALIFIER: &str = "com";
pub const ORGANIZATION: &str = "cascade-imgv";
pub const APPLICATION: &str = "cascade-imgv";

pub const VALID_EXTENSIONS: &[&str] = &[
    "jpg", "png", "jpeg", "webp", "gif", "bmp", "tiff", "tif", "cr2", "crw", "nef", "nrw", "arw",
    "dng", "orf", "rw2", "pef", "srw", "raf", "3fr", "fff", "dcr", "kdc", "mdc", "mos", "mrw",
    "ptx", "rwl", "rwz", "x3f", "bay",
];

pub const RAW_EXTENSIONS: &[&str] = &[
    "cr2", "crw", "nef", "nrw", "arw", "dng", "orf", "rw2", "pef", "srw", "raf", "3fr", "fff",
    "dcr", "kdc", "mdc", "mos", "mrw", "ptx", "rwl", "rwz", "x3f", "bay",
];

pub fn is_raw_extension(path: &std::path::Path) -> bool {
    RAW_EXTENSIONS.contains(
        &path
            .extension()
            .unwrap_or_default()
            .to_str()
            .unwrap_or_default()
            .to_lowercase()
            .as_str(),
    )
}
