use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::info;

use crate::core::{Layout, WorkUnit};
use crate::runtime::{Error, IoContext};
use crate::utils::{publish, remove_if_exists, staging_path};

pub struct MergeStage {}

impl MergeStage {
    /// The merged output exists and was built from exactly these units
    pub fn is_up_to_date(layout: &Layout, units: &[WorkUnit]) -> bool {
        layout.merged_output().is_file()
            && Self::recorded_units(layout).as_deref() == Some(Self::unit_names(units).as_slice())
    }

    /// Unit names listed in the manifest of the last merge
    pub fn recorded_units(layout: &Layout) -> Option<Vec<String>> {
        fs::read_to_string(layout.merged_manifest())
            .ok()
            .map(|content| content.lines().map(str::to_string).collect())
    }

    fn unit_names(units: &[WorkUnit]) -> Vec<String> {
        units
            .iter()
            .sorted_by_key(|u| u.index())
            .map(|u| u.name())
            .collect()
    }

    /// Corrected files that do not exist yet
    pub fn missing_inputs(layout: &Layout, units: &[WorkUnit]) -> Vec<PathBuf> {
        units
            .iter()
            .map(|u| layout.corrected_file(u))
            .filter(|p| !p.is_file())
            .collect()
    }

    /// Concatenate the corrected files in unit index order into the merged output.
    /// Refuses to run unless every unit has been corrected
    pub fn run(layout: &Layout, units: &[WorkUnit]) -> Result<(), Error> {
        let missing = Self::missing_inputs(layout, units);
        if !missing.is_empty() {
            return Err(Error::missing_upstream_output("merge", missing));
        }

        let mut sorted: Vec<&WorkUnit> = units.iter().collect();
        sorted.sort_by_key(|u| u.index());

        // a manifest must never describe a merged file it was not written with
        let manifest = layout.merged_manifest();
        remove_if_exists(&manifest)?;

        let destination = layout.merged_output();
        let staged = staging_path(&destination);
        let result = Self::concatenate(layout, &sorted, &staged);
        if result.is_err() {
            let _ = remove_if_exists(&staged);
        }
        let bytes = result?;
        publish(&staged, &destination)?;

        let staged_manifest = staging_path(&manifest);
        let names: String = Self::unit_names(units)
            .iter()
            .map(|name| format!("{}\n", name))
            .collect();
        fs::write(&staged_manifest, names).with_path("Failed to write", &staged_manifest)?;
        publish(&staged_manifest, &manifest)?;
        info!(
            "Merged {} corrected files ({} bytes) into {}",
            sorted.len(),
            bytes,
            destination.display()
        );
        Ok(())
    }

    fn concatenate(layout: &Layout, units: &[&WorkUnit], staged: &Path) -> Result<u64, Error> {
        let file = File::create(staged).with_path("Failed to create", staged)?;
        let mut writer = BufWriter::new(file);
        let mut bytes = 0;
        for unit in units {
            let path = layout.corrected_file(unit);
            let mut reader = File::open(&path).with_path("Failed to open", &path)?;
            bytes += io::copy(&mut reader, &mut writer).with_path("Failed to copy", &path)?;
        }
        writer.flush().with_path("Failed to write", staged)?;
        writer
            .into_inner()
            .map_err(|e| Error::io("Failed to write", staged, e.into_error()))?
            .sync_all()
            .with_path("Failed to sync", staged)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolve_units;

    fn write_corrected(layout: &Layout, units: &[WorkUnit]) {
        fs::create_dir_all(layout.corrected_dir()).unwrap();
        for unit in units {
            fs::write(layout.corrected_file(unit), format!(">{}\nACGT\n", unit)).unwrap();
        }
    }

    #[test]
    fn test_merge_in_index_order() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path(), "sample");
        let units = resolve_units("sample", 3).unwrap();

        // write in reverse to rule out dependence on creation order
        let reversed: Vec<WorkUnit> = units.iter().rev().cloned().collect();
        write_corrected(&layout, &reversed);

        MergeStage::run(&layout, &reversed).unwrap();
        assert_eq!(
            fs::read_to_string(layout.merged_output()).unwrap(),
            ">sample.000\nACGT\n>sample.001\nACGT\n>sample.002\nACGT\n"
        );
        assert!(!staging_path(&layout.merged_output()).exists());
        assert!(MergeStage::is_up_to_date(&layout, &units));
    }

    #[test]
    fn test_other_unit_set_is_not_up_to_date() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path(), "sample");
        let units = resolve_units("sample", 2).unwrap();
        write_corrected(&layout, &units);
        MergeStage::run(&layout, &units).unwrap();

        assert_eq!(
            MergeStage::recorded_units(&layout),
            Some(vec!["sample.000".to_string(), "sample.001".to_string()])
        );
        assert!(!MergeStage::is_up_to_date(&layout, &resolve_units("sample", 3).unwrap()));

        // a merged file without its manifest is not trusted either
        fs::remove_file(layout.merged_manifest()).unwrap();
        assert!(!MergeStage::is_up_to_date(&layout, &units));
    }

    #[test]
    fn test_missing_unit_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path(), "sample");
        let units = resolve_units("sample", 3).unwrap();
        write_corrected(&layout, &units);
        fs::remove_file(layout.corrected_file(&units[1])).unwrap();

        match MergeStage::run(&layout, &units) {
            Err(Error::MissingUpstreamOutput { stage, paths }) => {
                assert_eq!(stage, "merge");
                assert_eq!(paths, vec![layout.corrected_file(&units[1])]);
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(!layout.merged_output().exists());
        assert!(!layout.merged_manifest().exists());
        assert!(!staging_path(&layout.merged_output()).exists());
    }
}
