use std::{
    env, fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use crate::VALID_EXTENSIONS;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    NameAscending,
    DateDescending,
    SizeDescending,
}

///Resolves a startup argument into a browseable folder. A file argument
///selects its parent folder.
pub fn folder_from_args() -> Option<PathBuf> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return None;
    }

    let mut path = PathBuf::from(&args[1]);
    if let Ok(current_dir) = env::current_dir() {
        if path == PathBuf::from(".") {
            path = current_dir;
        } else if !path.has_root() {
            path = current_dir.join(path.strip_prefix(Path::new(".")).unwrap_or(&path));
        }
    }

    if path.is_dir() {
        Some(path)
    } else {
        path.parent().map(Path::to_path_buf)
    }
}

///Lists supported images directly inside `path`, sorted. Unreadable entries
///are skipped.
pub fn crawl(path: &Path, order: SortOrder) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();

    let dir_info = match fs::read_dir(path) {
        Ok(dir_info) => dir_info,
        Err(e) => {
            log::warn!("Failure reading directory -> {e}");
            return files;
        }
    };

    for file in dir_info {
        match file {
            Ok(f) => {
                let path = f.path();
                if !path.is_file() {
                    continue;
                }
                if !VALID_EXTENSIONS.contains(
                    &path
                        .extension()
                        .unwrap_or_default()
                        .to_str()
                        .unwrap_or("")
                        .to_lowercase()
                        .as_str(),
                ) {
                    continue;
                }
                files.push(path);
            }
            Err(e) => {
                log::warn!("Failure reading file info -> {e}");
                continue;
            }
        };
    }

    sort_paths(&mut files, order);
    files
}

pub fn sort_paths(paths: &mut [PathBuf], order: SortOrder) {
    match order {
        SortOrder::NameAscending => {
            paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        }
        SortOrder::DateDescending => {
            paths.sort_by_key(|p| {
                std::cmp::Reverse(
                    fs::metadata(p)
                        .and_then(|m| m.modified())
                        .unwrap_or(SystemTime::UNIX_EPOCH),
                )
            });
        }
        SortOrder::SizeDescending => {
            paths.sort_by_key(|p| {
                std::cmp::Reverse(fs::metadata(p).map(|m| m.len()).unwrap_or(0))
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "cascade-imgv-crawl-test-{}-{name}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn crawl_keeps_only_supported_extensions() {
        let dir = test_dir("filter");
        fs::write(dir.join("a.jpg"), b"x").unwrap();
        fs::write(dir.join("b.PNG"), b"x").unwrap();
        fs::write(dir.join("c.txt"), b"x").unwrap();
        fs::write(dir.join("d.cr2"), b"x").unwrap();
        fs::create_dir(dir.join("sub.jpg")).unwrap();

        let found = crawl(&dir, SortOrder::NameAscending);
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "d.cr2"]);
    }

    #[test]
    fn crawl_of_missing_directory_is_empty() {
        let dir = test_dir("missing").join("nope");
        assert!(crawl(&dir, SortOrder::NameAscending).is_empty());
    }

    #[test]
    fn size_sort_puts_largest_first() {
        let dir = test_dir("size");
        fs::write(dir.join("small.jpg"), vec![0; 10]).unwrap();
        fs::write(dir.join("large.jpg"), vec![0; 1000]).unwrap();

        let found = crawl(&dir, SortOrder::SizeDescending);
        assert_eq!(found[0].file_name().unwrap(), "large.jpg");
    }

    #[test]
    fn name_sort_ignores_parent_directories() {
        let mut paths = vec![
            PathBuf::from("/z/a.jpg"),
            PathBuf::from("/a/z.jpg"),
            PathBuf::from("/m/b.jpg"),
        ];
        sort_paths(&mut paths, SortOrder::NameAscending);
        assert_eq!(paths[0].file_name().unwrap(), "a.jpg");
        assert_eq!(paths[2].file_name().unwrap(), "z.jpg");
    }
}
