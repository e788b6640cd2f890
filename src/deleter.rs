use std::path::Path;

///Moves a file to the system trash rather than unlinking it. Returns false
///on failure so callers keep the entry in place.
pub fn trash_file(path: &Path) -> bool {
    match trash::delete(path) {
        Ok(()) => {
            log::info!("Trashed {}", path.display());
            true
        }
        Err(e) => {
            log::warn!("Failure trashing {} -> {e}", path.display());
            false
        }
    }
}
