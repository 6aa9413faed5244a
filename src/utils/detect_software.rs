use std::path::Path;
use std::path::PathBuf;

use log::debug;
use log::info;

use crate::runtime::Error;

/// Locate a program the way the shell would: paths with a separator are taken as-is,
/// bare names are looked up in $PATH
pub fn find_executable(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return is_executable(program).then(|| program.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

pub fn check_executable(program: &Path) -> Result<(), Error> {
    debug!("Checking for {}", program.display());
    match find_executable(program) {
        Some(found) => {
            info!("Found {}", found.display());
            Ok(())
        }
        None => Err(Error::utility_not_executable(program.display().to_string())),
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
