use crate::types::ParamId;
use std::collections::BTreeMap;

/// Read-only view of one pipeline evaluation.
pub trait EvaluationContext {
    fn scalar(&self, group: &str, name: &str) -> Option<f64>;
    fn series(&self, group: &str, name: &str) -> Option<&[f64]>;
    /// Series names stored under `group`, in insertion order.
    fn series_names(&self, group: &str) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq)]
struct SeriesEntry {
    group: String,
    name: String,
    values: Vec<f64>,
}

/// In-memory evaluation context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataBlock {
    scalars: BTreeMap<ParamId, f64>,
    series: Vec<SeriesEntry>,
}

impl DataBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_scalar(&mut self, group: &str, name: &str, value: f64) -> &mut Self {
        self.scalars.insert(ParamId::new(group, name), value);
        self
    }

    /// Replaces an existing series in place, so its listing position is kept.
    pub fn put_series(&mut self, group: &str, name: &str, values: Vec<f64>) -> &mut Self {
        match self
            .series
            .iter_mut()
            .find(|entry| entry.group == group && entry.name == name)
        {
            Some(entry) => entry.values = values,
            None => self.series.push(SeriesEntry {
                group: group.to_string(),
                name: name.to_string(),
                values,
            }),
        }
        self
    }

    pub fn with_scalar(mut self, group: &str, name: &str, value: f64) -> Self {
        self.put_scalar(group, name, value);
        self
    }

    pub fn with_series(mut self, group: &str, name: &str, values: Vec<f64>) -> Self {
        self.put_series(group, name, values);
        self
    }
}

impl EvaluationContext for DataBlock {
    fn scalar(&self, group: &str, name: &str) -> Option<f64> {
        self.scalars.get(&ParamId::new(group, name)).copied()
    }

    fn series(&self, group: &str, name: &str) -> Option<&[f64]> {
        self.series
            .iter()
            .find(|entry| entry.group == group && entry.name == name)
            .map(|entry| entry.values.as_slice())
    }

    fn series_names(&self, group: &str) -> Vec<String> {
        self.series
            .iter()
            .filter(|entry| entry.group == group)
            .map(|entry| entry.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{DataBlock, EvaluationContext};

    #[test]
    fn series_listing_keeps_insertion_order_across_replacement() {
        let mut block = DataBlock::new()
            .with_series("data_vector", "b_theory", vec![1.0])
            .with_series("other", "x", vec![0.0])
            .with_series("data_vector", "a_theory", vec![2.0]);
        block.put_series("data_vector", "b_theory", vec![3.0, 4.0]);

        assert_eq!(block.series_names("data_vector"), vec!["b_theory", "a_theory"]);
        assert_eq!(block.series("data_vector", "b_theory"), Some(&[3.0, 4.0][..]));
        assert_eq!(block.series("data_vector", "x"), None);
    }

    #[test]
    fn scalar_lookup_is_by_group_and_name() {
        let block = DataBlock::new().with_scalar("cosmo", "h0", 0.7);
        assert_eq!(block.scalar("cosmo", "h0"), Some(0.7));
        assert_eq!(block.scalar("other", "h0"), None);
    }
}
