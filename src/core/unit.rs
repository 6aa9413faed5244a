use std::fmt;
use std::path::Path;

use crate::runtime::Error;

/// Narrowest index width. Keeps names like `sample.007` for small unit counts
pub const MIN_INDEX_WIDTH: usize = 3;

/// One of the N partitions of the long reads, named `<prefix>.<zero padded index>`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkUnit {
    prefix: String,
    index: usize,
    width: usize,
}

impl WorkUnit {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:0width$}", self.prefix, self.index, width = self.width)
    }
}

/// Width needed so every index below `count` has the same number of digits
pub fn index_width(count: usize) -> usize {
    let largest = count.saturating_sub(1);
    largest.to_string().len().max(MIN_INDEX_WIDTH)
}

/// Name stem shared by every file of the run: the long read file name without its last extension.
/// Only the last extension is dropped, so `a.b.fasta` gives `a.b` rather than `a`
pub fn derive_prefix(long_reads: &Path) -> Result<String, Error> {
    let stem = long_reads
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    if stem.is_empty() || stem.starts_with('.') {
        return Err(Error::configuration(format!(
            "Cannot derive a file prefix from {:?}",
            long_reads
        )));
    }
    Ok(stem.to_string())
}

/// All work units of a run, in ascending index order
pub fn resolve_units(prefix: &str, count: usize) -> Result<Vec<WorkUnit>, Error> {
    if prefix.is_empty() {
        return Err(Error::configuration("The work unit prefix is empty"));
    }
    if count == 0 {
        return Err(Error::configuration("The number of units must be positive"));
    }
    let width = index_width(count);
    Ok((0..count)
        .map(|index| WorkUnit {
            prefix: prefix.to_string(),
            index,
            width,
        })
        .collect())
}
