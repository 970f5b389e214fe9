//! Setup and per-evaluation execution of the theory recorder.
//!
//! [`configure`] runs once per process: it picks the output file, works out
//! which parameters are varied and writes the parameter half of the header.
//! [`RecorderState::record`] then runs once per evaluation. The first call
//! completes the header with one `d_i` label per vector element, because the
//! vector lengths are unknown until the pipeline has actually run. Every call
//! appends one row and flushes it.

use crate::block::EvaluationContext;
use crate::config::ModuleOptions;
use crate::errors::SaveTheoryError;
use crate::logging::append_run_log;
use crate::parallel::{resolve_output_filename, ParallelContext};
use crate::row_format::{format_row, header_prefix, header_suffix};
use crate::runtime::FileSystem;
use crate::types::{ExecStatus, ParamId, SeriesSelection, DATA_VECTOR_GROUP, THEORY_SUFFIX};
use crate::values::varying_parameters;
use serde_json::json;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderState {
    /// Only the parameter labels have been written.
    Pending,
    /// Header line complete; `series` and `width` are fixed for the run.
    Finalized { series: Vec<String>, width: usize },
}

pub struct RecorderState<W: Write> {
    output: W,
    output_path: Option<PathBuf>,
    requested_series: SeriesSelection,
    varying_parameters: Vec<ParamId>,
    header: HeaderState,
    rows_written: u64,
}

pub fn configure(
    options: &ModuleOptions,
    parallel: &dyn ParallelContext,
    fs: &dyn FileSystem,
) -> Result<RecorderState<BufWriter<File>>, SaveTheoryError> {
    let path = resolve_output_filename(&options.filename, options.mpi, parallel);
    let values_text = fs.read_to_string(&options.values)?;
    let varying = varying_parameters(&values_text)?;

    let file = File::create(&path)
        .map_err(|e| SaveTheoryError::Io(format!("{}: {e}", path.display())))?;
    let mut state =
        configure_with_sink(BufWriter::new(file), varying, options.series_selection())?;

    append_run_log(
        "info",
        "save_theory.setup.configured",
        json!({
            "filename": path.display().to_string(),
            "varying": state
                .varying_parameters
                .iter()
                .map(ParamId::label)
                .collect::<Vec<_>>(),
            "series": state.requested_series,
        }),
    );
    state.output_path = Some(path);
    Ok(state)
}

/// Builds a recorder around an already opened sink and writes the header prefix.
///
/// The prefix is flushed straight away so the parameter labels are on disk
/// before the first evaluation arrives.
pub fn configure_with_sink<W: Write>(
    mut output: W,
    varying_parameters: Vec<ParamId>,
    requested_series: SeriesSelection,
) -> Result<RecorderState<W>, SaveTheoryError> {
    output
        .write_all(header_prefix(&varying_parameters).as_bytes())
        .and_then(|()| output.flush())
        .map_err(|e| SaveTheoryError::Io(e.to_string()))?;
    Ok(RecorderState {
        output,
        output_path: None,
        requested_series,
        varying_parameters,
        header: HeaderState::Pending,
        rows_written: 0,
    })
}

impl<W: Write> RecorderState<W> {
    pub fn record(
        &mut self,
        evaluation: &dyn EvaluationContext,
    ) -> Result<ExecStatus, SaveTheoryError> {
        let (row, newly_resolved) = match &self.header {
            HeaderState::Pending => {
                let series = self.first_row_series(evaluation);
                let row = assemble_row(&self.varying_parameters, &series, evaluation)?;
                (row, Some(series))
            }
            HeaderState::Finalized { series, width } => {
                let row = assemble_row(&self.varying_parameters, series, evaluation)?;
                if row.len() != *width {
                    return Err(SaveTheoryError::RowWidth {
                        expected: *width,
                        actual: row.len(),
                    });
                }
                (row, None)
            }
        };

        let mut text = String::new();
        if newly_resolved.is_some() {
            text.push_str(&header_suffix(row.len() - self.varying_parameters.len()));
        }
        text.push_str(&format_row(&row));
        self.output
            .write_all(text.as_bytes())
            .and_then(|()| self.output.flush())
            .map_err(|e| SaveTheoryError::Io(e.to_string()))?;
        self.rows_written += 1;

        if let Some(series) = newly_resolved {
            append_run_log(
                "info",
                "save_theory.record.header_finalized",
                json!({ "series": series, "width": row.len() }),
            );
            self.header = HeaderState::Finalized {
                series,
                width: row.len(),
            };
        }
        Ok(ExecStatus::Ok)
    }

    /// Flushes the sink and reports how many rows were written.
    pub fn finish(mut self) -> Result<u64, SaveTheoryError> {
        self.output
            .flush()
            .map_err(|e| SaveTheoryError::Io(e.to_string()))?;
        append_run_log(
            "info",
            "save_theory.teardown.closed",
            json!({
                "rows": self.rows_written,
                "filename": self.output_path.as_ref().map(|p| p.display().to_string()),
            }),
        );
        Ok(self.rows_written)
    }

    pub fn header(&self) -> &HeaderState {
        &self.header
    }

    pub fn varying_parameters(&self) -> &[ParamId] {
        &self.varying_parameters
    }

    pub fn requested_series(&self) -> &SeriesSelection {
        &self.requested_series
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    fn first_row_series(&self, evaluation: &dyn EvaluationContext) -> Vec<String> {
        match &self.requested_series {
            SeriesSelection::Requested(names) => names.clone(),
            SeriesSelection::AutoDiscover => discover_series(evaluation),
        }
    }
}

impl<W: Write> Drop for RecorderState<W> {
    fn drop(&mut self) {
        if let Err(error) = self.output.flush() {
            append_run_log(
                "error",
                "save_theory.teardown.flush_failed",
                json!({
                    "rows": self.rows_written,
                    "filename": self.output_path.as_ref().map(|p| p.display().to_string()),
                    "error": error.to_string(),
                }),
            );
        }
    }
}

/// Logical names of every `data_vector/*_theory` series, suffix stripped.
pub fn discover_series(evaluation: &dyn EvaluationContext) -> Vec<String> {
    evaluation
        .series_names(DATA_VECTOR_GROUP)
        .into_iter()
        .filter_map(|key| key.strip_suffix(THEORY_SUFFIX).map(str::to_string))
        .collect()
}

fn assemble_row(
    varying: &[ParamId],
    series: &[String],
    evaluation: &dyn EvaluationContext,
) -> Result<Vec<f64>, SaveTheoryError> {
    let mut row = Vec::with_capacity(varying.len());
    for param in varying {
        let value = evaluation
            .scalar(&param.group, &param.name)
            .ok_or_else(|| SaveTheoryError::MissingParameter {
                group: param.group.clone(),
                name: param.name.clone(),
            })?;
        row.push(value);
    }
    for name in series {
        let key = format!("{name}{THEORY_SUFFIX}");
        let values = evaluation
            .series(DATA_VECTOR_GROUP, &key)
            .ok_or_else(|| SaveTheoryError::MissingSeries {
                name: format!("{DATA_VECTOR_GROUP}/{key}"),
            })?;
        row.extend_from_slice(values);
    }
    Ok(row)
}
