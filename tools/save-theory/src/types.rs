use serde::{Deserialize, Serialize};
use std::fmt;

/// Block group holding the prediction vectors produced by the pipeline.
pub const DATA_VECTOR_GROUP: &str = "data_vector";

/// Suffix marking a `data_vector` entry as a recordable theory prediction.
pub const THEORY_SUFFIX: &str = "_theory";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParamId {
    pub group: String,
    pub name: String,
}

impl ParamId {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    /// Column label used in the output header.
    pub fn label(&self) -> String {
        format!("{}--{}", self.group, self.name)
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}--{}", self.group, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "names")]
pub enum SeriesSelection {
    Requested(Vec<String>),
    AutoDiscover,
}

impl SeriesSelection {
    pub fn from_option(likelihoods: Option<&str>) -> Self {
        match likelihoods {
            Some(raw) => Self::Requested(raw.split_whitespace().map(str::to_string).collect()),
            None => Self::AutoDiscover,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerRank {
    pub rank: u32,
    pub size: u32,
}

/// Status handed back to the host engine after each evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    Ok,
}

impl ExecStatus {
    pub fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
        }
    }
}
