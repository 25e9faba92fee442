//! Filesystem port for the handful of disk operations a scan performs.

use std::path::Path;

/// Provides filesystem access for discovery, cache cleanup and report output.
///
/// Terraform's own cache layout is opaque to the scanner; it only ever removes
/// the whole cache directory and lock file, never their contents.
pub trait FileSystem: Send + Sync {
    /// Writes the given contents to a file, creating or overwriting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (permissions, disk full, etc.).
    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Returns `true` if the path exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;

    /// Returns `true` if the path exists and is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Lists the entry names in a directory, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not a directory or cannot be read.
    fn list_dir(
        &self,
        path: &Path,
    ) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>>;

    /// Recursively removes a directory and everything under it.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory is missing or cannot be removed.
    fn remove_dir_all(&self, path: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Removes a single file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or cannot be removed.
    fn remove_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
