use crate::block::DataBlock;
use crate::errors::SaveTheoryError;
use crate::logging::append_run_log;
use crate::stage::RecorderState;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluationRecord {
    #[serde(default)]
    pub scalars: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default)]
    pub series: Map<String, Value>,
}

impl EvaluationRecord {
    pub fn parse(line: &str) -> Result<Self, SaveTheoryError> {
        serde_json::from_str(line).map_err(|e| SaveTheoryError::Evaluation(e.to_string()))
    }

    pub fn into_block(self) -> Result<DataBlock, SaveTheoryError> {
        let mut block = DataBlock::new();
        for (group, params) in &self.scalars {
            for (name, value) in params {
                block.put_scalar(group, name, *value);
            }
        }
        for (group, entries) in self.series {
            let Value::Object(entries) = entries else {
                return Err(SaveTheoryError::Evaluation(format!(
                    "series group `{group}` must be an object"
                )));
            };
            for (name, values) in entries {
                let values: Vec<f64> = serde_json::from_value(values).map_err(|e| {
                    SaveTheoryError::Evaluation(format!("series {group}/{name}: {e}"))
                })?;
                block.put_series(&group, &name, values);
            }
        }
        Ok(block)
    }
}

/// Records every non-blank line of `input` as soon as it is read, stopping at
/// the first failure. Rows are on disk before the next line is requested.
pub fn replay_evaluations<W: Write, R: BufRead>(
    state: &mut RecorderState<W>,
    mut input: R,
) -> Result<u64, SaveTheoryError> {
    let mut recorded = 0u64;
    let mut buffer = String::new();
    let mut line_no = 0usize;
    loop {
        buffer.clear();
        let read = input
            .read_line(&mut buffer)
            .map_err(|e| SaveTheoryError::Io(format!("evaluations line {}: {e}", line_no + 1)))?;
        if read == 0 {
            break;
        }
        line_no += 1;
        let line = buffer.trim();
        if line.is_empty() {
            continue;
        }
        let outcome = EvaluationRecord::parse(line)
            .and_then(EvaluationRecord::into_block)
            .map_err(|e| SaveTheoryError::Evaluation(format!("line {line_no}: {e}")))
            .and_then(|block| state.record(&block));
        if let Err(error) = outcome {
            append_run_log(
                "error",
                "save_theory.replay.failed",
                json!({ "line": line_no, "error": error.to_string() }),
            );
            return Err(error);
        }
        recorded += 1;
    }
    Ok(recorded)
}
