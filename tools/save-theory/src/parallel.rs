//! Rank/size lookup for multi-process runs.
//!
//! The recorder never talks to the launcher itself. It only asks an injected
//! [`ParallelContext`] for the current rank so that each worker writes to its
//! own file.

use crate::logging::append_run_log;
use crate::types::WorkerRank;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub type EnvMap = BTreeMap<String, String>;

/// Rank/size variable pairs exported by common MPI launchers, in lookup order.
const RANK_SIZE_VARS: &[(&str, &str)] = &[
    ("OMPI_COMM_WORLD_RANK", "OMPI_COMM_WORLD_SIZE"),
    ("PMI_RANK", "PMI_SIZE"),
];

pub trait ParallelContext: Send + Sync {
    /// `None` means no parallel launcher is available.
    fn detect(&self) -> Option<WorkerRank>;
}

/// Plain single-process run.
pub struct NoParallelContext;

impl ParallelContext for NoParallelContext {
    fn detect(&self) -> Option<WorkerRank> {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedParallelContext(pub WorkerRank);

impl ParallelContext for FixedParallelContext {
    fn detect(&self) -> Option<WorkerRank> {
        Some(self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnvParallelContext {
    env: EnvMap,
}

impl EnvParallelContext {
    pub fn new(env: EnvMap) -> Self {
        Self { env }
    }

    pub fn from_process_env() -> Self {
        Self::new(std::env::vars().collect())
    }
}

impl ParallelContext for EnvParallelContext {
    fn detect(&self) -> Option<WorkerRank> {
        for (rank_var, size_var) in RANK_SIZE_VARS {
            let (Some(rank), Some(size)) = (self.env.get(*rank_var), self.env.get(*size_var))
            else {
                continue;
            };
            let (Ok(rank), Ok(size)) = (rank.trim().parse::<u32>(), size.trim().parse::<u32>())
            else {
                append_run_log(
                    "debug",
                    "save_theory.parallel.unparsable",
                    json!({ "rank_var": rank_var, "size_var": size_var }),
                );
                continue;
            };
            if size == 0 || rank >= size {
                continue;
            }
            return Some(WorkerRank { rank, size });
        }
        None
    }
}

/// Appends `.{rank}` to `base` when `mpi` is enabled and more than one worker runs.
pub fn resolve_output_filename(
    base: &Path,
    mpi: bool,
    parallel: &dyn ParallelContext,
) -> PathBuf {
    if !mpi {
        return base.to_path_buf();
    }
    match parallel.detect() {
        Some(worker) if worker.size > 1 => {
            let mut name = base.as_os_str().to_os_string();
            name.push(format!(".{}", worker.rank));
            PathBuf::from(name)
        }
        _ => base.to_path_buf(),
    }
}
