pub mod block;
pub mod config;
pub mod errors;
pub mod logging;
pub mod parallel;
pub mod replay;
pub mod row_format;
pub mod runtime;
pub mod stage;
pub mod types;
pub mod values;

use clap::{error::ErrorKind, Parser};
use config::{load_options, DEFAULT_SECTION};
use errors::SaveTheoryError;
use logging::{init_run_logger, structured_fallback_line};
use replay::evaluation::replay_evaluations;
use runtime::ProductionRuntime;
use stage::configure;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Parser)]
#[command(name = "save-theory")]
#[command(about = "Record every pipeline evaluation's varied parameters and theory vectors")]
pub struct Cli {
    /// Pipeline options file (TOML or ini) with `[pipeline]` and module sections.
    #[arg(long)]
    pub config: PathBuf,
    /// Options section holding this module's `filename`/`mpi` keys.
    #[arg(long, default_value = DEFAULT_SECTION)]
    pub section: String,
    /// JSONL evaluations to record; stdin when omitted.
    #[arg(long)]
    pub evaluations: Option<PathBuf>,
    #[arg(long)]
    pub working_dir: Option<PathBuf>,
}

pub fn run() -> Result<i32, SaveTheoryError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    let cwd = std::env::current_dir().map_err(|e| SaveTheoryError::Io(e.to_string()))?;
    let runtime = ProductionRuntime::new();
    run_with_runtime(&args, &cwd, &runtime)
}

pub fn run_with_runtime(
    args: &[std::ffi::OsString],
    cwd: &Path,
    runtime: &ProductionRuntime,
) -> Result<i32, SaveTheoryError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(SaveTheoryError::Cli(error.to_string())),
        },
    };

    let working_dir = match &cli.working_dir {
        Some(dir) => absolutize_path(cwd, dir),
        None => cwd.to_path_buf(),
    };
    let options = load_options(
        &absolutize_path(cwd, &cli.config),
        &cli.section,
        &working_dir,
        runtime.file_system.as_ref(),
    )?;
    if let Some(log_file) = &options.log_file {
        init_run_logger(log_file);
    }

    let mut state = configure(
        &options,
        runtime.parallel.as_ref(),
        runtime.file_system.as_ref(),
    )?;
    let input = match &cli.evaluations {
        Some(path) => runtime
            .file_system
            .open_lines(&absolutize_path(cwd, path))?,
        None => runtime.terminal.stdin_lines(),
    };
    replay_evaluations(&mut state, input)?;

    let file = state
        .output_path()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let rows = state.finish()?;
    let worker_id = runtime
        .parallel
        .detect()
        .filter(|worker| options.mpi && worker.size > 1)
        .map(|worker| worker.rank.to_string())
        .unwrap_or_else(|| "main".to_string());
    runtime.terminal.write_line(&structured_fallback_line(
        &worker_id,
        "complete",
        &format!("rows={rows} file={file}"),
    ))?;
    Ok(0)
}

fn absolutize_path(base: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        base.join(value)
    }
}
