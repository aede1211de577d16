//! Path Operations Module
//!
//! This module handles path operations for directories and files.

use std::path::PathBuf;

/// Join Paths
///
/// This function takes a slice of strings as input and joins them into a single path string.
/// It uses the PathBuf type to handle platform-specific separators and conversions.
pub fn join(paths: &[&str]) -> String {
    let mut path: PathBuf = PathBuf::new();
    for p in paths {
        path.push(p);
    }
    path.to_string_lossy().into_owned()
}

pub mod dir {
    //! Directory Operations Submodule
    //!
    //! This submodule provides functions for directory operations.

    use std::fs;
    use std::io;
    use std::path::Path;

    use super::{StationDir, StationImg, StationPath};
    use crate::module::define;

    /// Create Directory from Path List
    ///
    /// This function takes a slice of strings as input and creates a directory with the joined path.
    /// It returns the created path.
    pub fn create_dir_from_path_list(paths: &[&str]) -> io::Result<String> {
        let path = super::join(paths);
        fs::create_dir_all(Path::new(&path))?;
        Ok(path)
    }

    /// Create Subdirectory in Either Directory
    ///
    /// This function takes two directory paths and a subdirectory name as input and creates a subdirectory in one of them.
    /// It checks if the first directory exists and uses it as the parent directory if it does.
    /// Otherwise, it uses the second directory as the parent directory.
    pub fn create_subdir_in_either_dir(dir1: &str, dir2: &str, name: &str) -> io::Result<String> {
        let parent: &str = match Path::new(dir1).is_dir() {
            true => dir1,
            false => dir2,
        };
        create_dir_from_path_list(&[parent, name])
    }

    /// Create Application Subdirectory and Paths
    ///
    /// The data directory lives under `define::path::PERSISTENT_DIR` when that exists,
    /// otherwise under `define::path::EPHEMERAL_DIR`. The tmp directory, holding the
    /// frontend images, is always ephemeral.
    pub fn create_app_sub_dir() -> io::Result<StationPath> {
        create_app_sub_dir_in(define::path::PERSISTENT_DIR, define::path::EPHEMERAL_DIR)
    }

    /// Same as [`create_app_sub_dir`] with explicit parent directories.
    pub fn create_app_sub_dir_in(persistent: &str, ephemeral: &str) -> io::Result<StationPath> {
        let data_dir = create_subdir_in_either_dir(persistent, ephemeral, define::system::NAME)?;
        let tmp_dir = create_dir_from_path_list(&[ephemeral, define::system::NAME])?;
        let log_dir = create_dir_from_path_list(&[&data_dir, define::path::LOG_DIR])?;
        Ok(StationPath {
            dir: StationDir {
                data: data_dir,
                tmp: tmp_dir.clone(),
                log: log_dir,
            },
            img: StationImg {
                preview: super::join(&[&tmp_dir, define::path::PREVIEW_IMAGE]),
                last: super::join(&[&tmp_dir, define::path::LAST_IMAGE]),
            },
        })
    }
}

/// Paths of Resources
///
/// This struct represents the paths of the resources used by the application.
#[derive(Debug, Clone)]
pub struct StationPath {
    /// Directories Paths
    pub dir: StationDir,
    /// Images Paths
    pub img: StationImg,
}

/// Paths of Directories
#[derive(Debug, Clone)]
pub struct StationDir {
    /// Data Directory Path
    pub data: String,
    /// Temporary Directory Path
    pub tmp: String,
    /// Log Directory Path
    pub log: String,
}

/// Paths of Images handed to the frontend
#[derive(Debug, Clone)]
pub struct StationImg {
    /// Live Preview Path
    pub preview: String,
    /// Last Processed Thumbnail Path
    pub last: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_create_dir_from_path_list() {
        let root = tempfile::tempdir().unwrap();
        let root = root.path().to_str().unwrap();
        dir::create_dir_from_path_list(&[root, "a", "b"]).unwrap();
        assert!(Path::new(root).join("a/b").is_dir());
    }

    #[test]
    fn test_create_subdir_in_either_dir() {
        let root = tempfile::tempdir().unwrap();
        let fallback = root.path().to_str().unwrap();
        let missing = root.path().join("missing");
        let res =
            dir::create_subdir_in_either_dir(missing.to_str().unwrap(), fallback, "sub").unwrap();
        assert_eq!(res, join(&[fallback, "sub"]));
        assert!(Path::new(&res).is_dir());
    }

    #[test]
    fn test_create_app_sub_dir() {
        let persistent = tempfile::tempdir().unwrap();
        let ephemeral = tempfile::tempdir().unwrap();
        let res = dir::create_app_sub_dir_in(
            persistent.path().to_str().unwrap(),
            ephemeral.path().to_str().unwrap(),
        )
        .unwrap();
        assert!(persistent.path().join("shadowboard/log").is_dir());
        assert_eq!(
            res.img.preview,
            ephemeral
                .path()
                .join("shadowboard/preview.jpg")
                .to_string_lossy()
        );
        assert!(res.img.last.ends_with("shadowboard/last.jpg"));
    }

    #[test]
    fn test_path_join() {
        assert_eq!(join(&["/test/", "test"]), "/test/test");
        assert_eq!(join(&["test", "test", "test"]), "test/test/test");
        assert_eq!(join(&["/test/", "test/"]), "/test/test/");
        assert_eq!(
            join(&["./test/", "test/", "test.txt"]),
            "./test/test/test.txt"
        );
    }
}
