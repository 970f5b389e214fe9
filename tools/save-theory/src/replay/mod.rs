//! Replay of recorded pipeline evaluations through the theory recorder.
//!
//! The input is a JSONL stream with one evaluation object per line:
//!
//! ```json
//! {"scalars": {"cosmo": {"h0": 0.7}}, "series": {"data_vector": {"A_theory": [1.0, 2.0]}}}
//! ```
//!
//! Object key order is preserved, so `data_vector` series are discovered in
//! the order they appear on the line.

pub mod evaluation;
