use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use regex::Regex;
use walkdir::WalkDir;

use super::splitter::Splitter;
use crate::core::{Context, Layout, WorkUnit};
use crate::core::layout::FASTA_EXTENSION;
use crate::runtime::{Error, IoContext};
use crate::utils::{publish, remove_if_exists, staging_path};

pub const STAGING_WORK_DIR: &str = "work";
pub const STAGING_OUT_DIR: &str = "out";

pub struct SplitStage {}

impl SplitStage {
    /// True if the split directory already holds exactly one non-empty file per unit
    pub fn is_up_to_date(layout: &Layout, units: &[WorkUnit]) -> Result<bool, Error> {
        if !layout.split_dir().is_dir() {
            return Ok(false);
        }
        Self::verify(layout, units)?;
        Ok(true)
    }

    /// Check a published split directory against the configured units
    pub fn verify(layout: &Layout, units: &[WorkUnit]) -> Result<(), Error> {
        let dir = layout.split_dir();
        let found = collect_parts(&dir, layout.prefix())?;
        if found.len() != units.len() {
            return Err(Error::output_count_mismatch(dir, units.len(), found.len()));
        }
        let missing: Vec<PathBuf> = units
            .iter()
            .map(|u| layout.split_file(u))
            .filter(|p| !is_non_empty(p))
            .collect();
        if !missing.is_empty() {
            return Err(Error::missing_upstream_output("split", missing));
        }
        Ok(())
    }

    pub fn describe(ctx: &Context, splitter: &dyn Splitter) -> Vec<String> {
        let input = staged_input(&ctx.layout);
        splitter.describe(&input, ctx.units.len(), &ctx.runner)
    }

    /// Split the long reads into one file per unit. Returns false if the output was already there.
    /// Nothing appears under the split directory unless every unit file could be produced
    pub fn run(ctx: &Context, splitter: &dyn Splitter) -> Result<bool, Error> {
        let layout = &ctx.layout;
        if !ctx.config.force && Self::is_up_to_date(layout, &ctx.units)? {
            info!("Split files in {} are up to date", layout.split_dir().display());
            return Ok(false);
        }
        info!(
            "Splitting {} into {} units",
            ctx.config.long_reads.display(),
            ctx.units.len()
        );

        let staging = staging_path(&layout.split_dir());
        remove_if_exists(&staging)?;
        let result = Self::split_into(ctx, splitter, &staging);
        if result.is_err() {
            let _ = remove_if_exists(&staging);
        }
        result?;

        publish(&staging.join(STAGING_OUT_DIR), &layout.split_dir())?;
        remove_if_exists(&staging)?;
        info!("Wrote {} split files to {}", ctx.units.len(), layout.split_dir().display());
        Ok(true)
    }

    fn split_into(ctx: &Context, splitter: &dyn Splitter, staging: &Path) -> Result<(), Error> {
        let layout = &ctx.layout;
        let work_dir = staging.join(STAGING_WORK_DIR);
        let out_dir = staging.join(STAGING_OUT_DIR);
        fs::create_dir_all(&work_dir).with_path("Failed to create", &work_dir)?;
        fs::create_dir_all(&out_dir).with_path("Failed to create", &out_dir)?;

        let input = staged_input(layout);
        link_input(&ctx.config.long_reads, &input)?;
        splitter.split(&input, ctx.units.len(), &ctx.runner)?;

        let parts = collect_parts(&work_dir, layout.prefix())?;
        if parts.len() != ctx.units.len() {
            return Err(Error::output_count_mismatch(
                &work_dir,
                ctx.units.len(),
                parts.len(),
            ));
        }

        // Tools differ in padding and start index, so parts are matched to units by rank
        for (unit, part) in ctx.units.iter().zip(parts.values()) {
            let target = out_dir.join(format!("{}.{}", unit, FASTA_EXTENSION));
            debug!("{} -> {}", part.display(), target.display());
            fs::rename(part, &target).with_path("Failed to move split file", part)?;
        }
        Ok(())
    }
}

/// Where the splitter sees the input: `<prefix>_trim.tmp/work/<prefix>.fasta`
fn staged_input(layout: &Layout) -> PathBuf {
    staging_path(&layout.split_dir())
        .join(STAGING_WORK_DIR)
        .join(format!("{}.{}", layout.prefix(), FASTA_EXTENSION))
}

#[cfg(unix)]
fn link_input(source: &Path, link: &Path) -> Result<(), Error> {
    std::os::unix::fs::symlink(source, link).with_path("Failed to link input", link)
}

#[cfg(not(unix))]
fn link_input(source: &Path, link: &Path) -> Result<(), Error> {
    fs::copy(source, link)
        .map(|_| ())
        .with_path("Failed to copy input", link)
}

fn is_non_empty(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}

/// Non-empty `<prefix>.<digits>.fasta` files in `dir`, keyed by their numeric index
fn collect_parts(dir: &Path, prefix: &str) -> Result<BTreeMap<u64, PathBuf>, Error> {
    let re = Regex::new(&format!(
        r"^{}\.([0-9]+)\.{}$",
        regex::escape(prefix),
        FASTA_EXTENSION
    ))
    .map_err(|e| Error::configuration(format!("Invalid prefix '{}': {}", prefix, e)))?;

    let mut parts = BTreeMap::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
            Error::io(
                "Failed to list",
                path,
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory loop")),
            )
        })?;
        if !entry.file_type().is_file() || !is_non_empty(entry.path()) {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if let Some(index) = re
            .captures(&name)
            .and_then(|c| c[1].parse::<u64>().ok())
        {
            parts.insert(index, entry.path().to_path_buf());
        }
    }
    Ok(parts)
}
