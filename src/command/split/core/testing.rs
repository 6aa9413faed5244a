use std::fs;
use std::path::Path;

use super::splitter::Splitter;
use crate::core::JobRunner;
use crate::runtime::Error;

/// Deals reads out round robin, like an external splitter would, padding indices to 2 digits.
/// `emit` caps the number of parts written
pub struct RoundRobinSplitter {
    pub emit: Option<usize>,
}

impl Splitter for RoundRobinSplitter {
    fn describe(&self, input: &Path, units: usize, _: &JobRunner) -> Vec<String> {
        vec![format!("round-robin {} {}", units, input.display())]
    }

    fn split(&self, input: &Path, units: usize, _: &JobRunner) -> Result<(), Error> {
        let content = fs::read_to_string(input).unwrap();
        let records: Vec<String> = content
            .split('>')
            .filter(|r| !r.is_empty())
            .map(|r| format!(">{}", r))
            .collect();
        let emit = self.emit.unwrap_or(units);
        let stem = input.file_stem().unwrap().to_string_lossy().to_string();
        for i in 0..emit {
            let part: String = records.iter().skip(i).step_by(units).cloned().collect();
            fs::write(input.with_file_name(format!("{}.{:02}.fasta", stem, i)), part).unwrap();
        }
        Ok(())
    }
}
