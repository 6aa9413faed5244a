use std::fs;
use std::path::{Path, PathBuf};

use crate::runtime::Error;

/// Expands ~ and env vars if possible (only for UTF-8 paths), and always returns an absolute PathBuf.
/// Does NOT fail if the file does not exist.
pub fn expand_and_resolve_path<P: AsRef<Path>>(input: P) -> Result<PathBuf, Error> {
    let input = input.as_ref();
    let expanded: PathBuf = match input.to_str() {
        Some(s) => match shellexpand::full(s) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(e) => {
                return Err(Error::configuration(format!(
                    "Failed to expand path {:?}: {}",
                    input, e
                )))
            }
        },
        None => {
            log::warn!("Path {:?} is not valid UTF-8. Skipping path expansion.", input);
            input.to_path_buf()
        }
    };

    // Try canonicalize, else make absolute
    if let Ok(absolute) = fs::canonicalize(&expanded) {
        return Ok(absolute);
    }
    if expanded.is_absolute() {
        return Ok(expanded);
    }
    let cwd = std::env::current_dir()
        .map_err(|e| Error::io("Failed to get current directory", ".", e))?;
    Ok(cwd.join(expanded))
}
