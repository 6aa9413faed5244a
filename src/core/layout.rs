use std::path::{Path, PathBuf};

use super::unit::{derive_prefix, WorkUnit};
use crate::runtime::{Error, PipelineConfig};

pub const SPLIT_DIR_SUFFIX: &str = "_trim";
pub const CORRECTED_DIR_SUFFIX: &str = "_corrected";
pub const CORRECTED_FILE_SUFFIX: &str = "_iter2.fasta";
pub const ASSEMBLY_DIR_SUFFIX: &str = "_assembly";
pub const ASSEMBLY_PREFIX: &str = "res";
pub const FASTA_EXTENSION: &str = "fasta";
pub const WORK_DIR: &str = ".work";
pub const MANIFEST_EXTENSION: &str = "units";

/// File names of every artifact of a run. Changing them breaks interoperability with earlier runs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    out_dir: PathBuf,
    prefix: String,
}

impl Layout {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(out_dir: P, prefix: S) -> Layout {
        Layout {
            out_dir: out_dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Layout, Error> {
        Ok(Layout::new(&config.out_dir, derive_prefix(&config.long_reads)?))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// `<prefix>_trim/`
    pub fn split_dir(&self) -> PathBuf {
        self.out_dir.join(format!("{}{}", self.prefix, SPLIT_DIR_SUFFIX))
    }

    /// `<prefix>_trim/<prefix>.<index>.fasta`
    pub fn split_file(&self, unit: &WorkUnit) -> PathBuf {
        self.split_dir()
            .join(format!("{}.{}", unit, FASTA_EXTENSION))
    }

    /// `<prefix>_corrected/`
    pub fn corrected_dir(&self) -> PathBuf {
        self.out_dir
            .join(format!("{}{}", self.prefix, CORRECTED_DIR_SUFFIX))
    }

    /// `<prefix>_corrected/<prefix>.<index>_iter2.fasta`
    pub fn corrected_file(&self, unit: &WorkUnit) -> PathBuf {
        self.corrected_dir()
            .join(format!("{}{}", unit, CORRECTED_FILE_SUFFIX))
    }

    /// Private scratch directory of one correction job
    pub fn unit_work_dir(&self, unit: &WorkUnit) -> PathBuf {
        self.corrected_dir().join(WORK_DIR).join(unit.name())
    }

    /// `<prefix>_corrected.fasta`
    pub fn merged_output(&self) -> PathBuf {
        self.out_dir.join(format!(
            "{}{}.{}",
            self.prefix, CORRECTED_DIR_SUFFIX, FASTA_EXTENSION
        ))
    }

    /// `<prefix>_corrected.units`, the unit names the merged output was built from
    pub fn merged_manifest(&self) -> PathBuf {
        self.out_dir.join(format!(
            "{}{}.{}",
            self.prefix, CORRECTED_DIR_SUFFIX, MANIFEST_EXTENSION
        ))
    }

    /// `<prefix>_assembly/`
    pub fn assembly_dir(&self) -> PathBuf {
        self.out_dir
            .join(format!("{}{}", self.prefix, ASSEMBLY_DIR_SUFFIX))
    }

    /// `<prefix>_assembly/res.contigs.fasta`
    pub fn assembly_contigs(&self) -> PathBuf {
        self.assembly_dir()
            .join(format!("{}.contigs.{}", ASSEMBLY_PREFIX, FASTA_EXTENSION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::unit::resolve_units;

    #[test]
    fn test_paths() {
        let layout = Layout::new("", "sample");
        let units = resolve_units("sample", 2).unwrap();

        assert_eq!(layout.split_dir(), PathBuf::from("sample_trim"));
        assert_eq!(
            layout.split_file(&units[1]),
            PathBuf::from("sample_trim/sample.001.fasta")
        );
        assert_eq!(
            layout.corrected_file(&units[0]),
            PathBuf::from("sample_corrected/sample.000_iter2.fasta")
        );
        assert_eq!(layout.merged_output(), PathBuf::from("sample_corrected.fasta"));
        assert_eq!(layout.merged_manifest(), PathBuf::from("sample_corrected.units"));
        assert_eq!(
            layout.assembly_contigs(),
            PathBuf::from("sample_assembly/res.contigs.fasta")
        );
        assert_eq!(
            layout.unit_work_dir(&units[0]),
            PathBuf::from("sample_corrected/.work/sample.000")
        );
    }
}
