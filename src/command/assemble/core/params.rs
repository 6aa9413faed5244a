use std::path::PathBuf;

use crate::core::Layout;
use crate::runtime::PipelineConfig;

pub struct IO {
    pub path_in: PathBuf,
    pub path_out: PathBuf,
    pub path_contigs: PathBuf,
}

impl IO {
    pub fn from_layout(layout: &Layout) -> IO {
        IO {
            path_in: layout.merged_output(),
            path_out: layout.assembly_dir(),
            path_contigs: layout.assembly_contigs(),
        }
    }
}

pub struct Runtime {
    pub bin: PathBuf,
    pub genome_size: String,
    /// canu gridOptions. When present canu submits its own jobs and returns early
    pub grid_options: Option<String>,
    pub force: bool,
}

impl Runtime {
    pub fn from_config(config: &PipelineConfig) -> Runtime {
        Runtime {
            bin: config.canu_bin.clone(),
            genome_size: config.genome_size.clone(),
            grid_options: config.grid_options.clone(),
            force: config.force,
        }
    }
}
