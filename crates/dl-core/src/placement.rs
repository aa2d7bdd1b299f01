//! Output file placement: final path resolution and file pre-creation.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

use crate::classify::ClassificationMap;

#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to create file {}: {source}", path.display())]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to preallocate {size} bytes for {}: {source}", path.display())]
    Preallocate {
        path: PathBuf,
        size: u64,
        #[source]
        source: io::Error,
    },
}

/// `dir/<label>/name` when a classification map is given, else `dir/name`.
///
/// The path is built once; callers must not join the subfolder again.
pub fn resolve_output_path(
    dir: &Path,
    file_name: &str,
    classification: Option<&ClassificationMap>,
) -> PathBuf {
    match classification {
        Some(map) => dir.join(map.folder_for(file_name)).join(file_name),
        None => dir.join(file_name),
    }
}

/// Creates missing parent directories, then creates (truncating) the file and
/// preallocates `size` bytes when known.
pub fn place_file(path: &Path, size: Option<u64>) -> Result<(), PlacementError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            fs::create_dir_all(parent).map_err(|source| PlacementError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
            tracing::info!(dir = %parent.display(), "created sub-directory");
        }
    }

    let file = File::options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|source| PlacementError::CreateFile {
            path: path.to_path_buf(),
            source,
        })?;

    if let Some(size) = size.filter(|s| *s > 0) {
        preallocate(&file, size).map_err(|source| PlacementError::Preallocate {
            path: path.to_path_buf(),
            size,
            source,
        })?;
    }
    tracing::info!(path = %path.display(), ?size, "created output file");
    Ok(())
}

/// `posix_fallocate` on Unix, `set_len` if that is unavailable.
fn preallocate(file: &File, size: u64) -> io::Result<()> {
    #[cfg(unix)]
    {
        let fd = file.as_raw_fd();
        // SAFETY: fd is owned by `file`, which outlives the call.
        let r = unsafe { libc::posix_fallocate(fd, 0, size as libc::off_t) };
        if r == 0 {
            return Ok(());
        }
        tracing::debug!(errno = r, "posix_fallocate failed, falling back to set_len");
    }
    file.set_len(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classified_path_has_subfolder_once() {
        let map = ClassificationMap::with_defaults();
        let p = resolve_output_path(Path::new("/data"), "movie.mp4", Some(&map));
        assert_eq!(p, Path::new("/data/video/movie.mp4"));
        let p = resolve_output_path(Path::new("/data"), "disk.iso", Some(&map));
        assert_eq!(p, Path::new("/data/other/disk.iso"));
    }

    #[test]
    fn unclassified_path_is_flat() {
        let p = resolve_output_path(Path::new("/data"), "movie.mp4", None);
        assert_eq!(p, Path::new("/data/movie.mp4"));
    }

    #[test]
    fn place_creates_subfolder_and_preallocates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video").join("a.mp4");
        place_file(&path, Some(4096)).unwrap();
        assert!(dir.path().join("video").is_dir());
        assert_eq!(fs::metadata(&path).unwrap().len(), 4096);
    }

    #[test]
    fn place_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        fs::write(&path, vec![1u8; 100]).unwrap();
        place_file(&path, None).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn place_fails_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("video");
        fs::write(&blocker, b"x").unwrap();
        let err = place_file(&blocker.join("a.mp4"), Some(10)).unwrap_err();
        assert!(matches!(err, PlacementError::CreateDir { .. }), "{err}");
    }
}
