use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::runtime::{Error, IoContext};

/// Sibling location a stage writes into before its output is published
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

pub fn remove_if_exists(path: &Path) -> Result<(), Error> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(_) => return Ok(()),
    };
    result.with_path("Failed to remove", path)
}

/// Move a finished file or directory to its final place with a single rename.
/// Whatever was at the destination before is replaced
pub fn publish(staged: &Path, destination: &Path) -> Result<(), Error> {
    if destination.is_dir() {
        remove_if_exists(destination)?;
    }
    fs::rename(staged, destination).with_path("Failed to publish", destination)?;
    log::debug!("Published {}", destination.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_path() {
        assert_eq!(
            staging_path(Path::new("/data/sample_corrected.fasta")),
            PathBuf::from("/data/sample_corrected.fasta.tmp")
        );
        assert_eq!(
            staging_path(Path::new("out/sample_trim")),
            PathBuf::from("out/sample_trim.tmp")
        );
    }

    #[test]
    fn test_publish_replaces_directory() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("sample_trim");
        fs::create_dir(&old).unwrap();
        fs::write(old.join("stale.fasta"), "x").unwrap();

        let staged = staging_path(&old);
        fs::create_dir(&staged).unwrap();
        fs::write(staged.join("sample.000.fasta"), ">r\nA\n").unwrap();

        publish(&staged, &old).unwrap();
        assert!(!staged.exists());
        assert!(old.join("sample.000.fasta").exists());
        assert!(!old.join("stale.fasta").exists());
    }
}
