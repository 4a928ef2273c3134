//! Agent classes: label → index lookup and per-class loss weights.
//!
//! [`ClassRegistry`] is built once from [`TrajectoryConfig::labels`]; the
//! position of a label in that list is its one-hot index. The same registry
//! encodes labels while the dataset is assembled and decodes one-hot rows
//! while the loss is reweighted.
//!
//! [`ClassWeightTable`] mirrors the `classInfo.json` file shipped with each
//! training set:
//!
//! ```json
//! {
//!   "class_weights": { "Pedestrian": 1.0, "Biker": 2.4 },
//!   "class_counts":  { "Pedestrian": 9120, "Biker": 3801 }
//! }
//! ```
//!
//! [`TrajectoryConfig::labels`]: crate::config::TrajectoryConfig::labels

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::config::TrajectoryConfig;
use crate::error::{ConfigError, LossError};

// ---------------------------------------------------------------------------
// ClassRegistry
// ---------------------------------------------------------------------------

/// Immutable label ↔ index mapping.
#[derive(Debug, Clone)]
pub struct ClassRegistry {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl ClassRegistry {
    /// Build a registry from an ordered label list.
    pub fn new<S: AsRef<str>>(labels: &[S]) -> Self {
        let labels: Vec<String> = labels.iter().map(|l| l.as_ref().to_string()).collect();
        let index = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();
        ClassRegistry { labels, index }
    }

    /// Build a registry from the configured labels.
    pub fn from_config(config: &TrajectoryConfig) -> Self {
        Self::new(&config.labels)
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns `true` when no class is configured.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Ordered labels.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Index of `label`, if configured.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// One-hot encoding of `label`, if configured.
    pub fn one_hot(&self, label: &str) -> Option<Array1<f32>> {
        let idx = self.index_of(label)?;
        let mut v = Array1::zeros(self.labels.len());
        v[idx] = 1.0;
        Some(v)
    }

    /// Decode a one-hot row back into its class index.
    ///
    /// Returns `None` unless the row has the registry's length, exactly one
    /// entry equal to `1.0` and zeros elsewhere.
    pub fn index_of_one_hot(&self, row: ArrayView1<'_, f32>) -> Option<usize> {
        if row.len() != self.labels.len() {
            return None;
        }
        let mut found = None;
        for (i, &v) in row.iter().enumerate() {
            if v == 1.0 {
                if found.is_some() {
                    return None;
                }
                found = Some(i);
            } else if v != 0.0 {
                return None;
            }
        }
        found
    }
}

// ---------------------------------------------------------------------------
// ClassWeightTable
// ---------------------------------------------------------------------------

/// Inverse-frequency class weights and the counts they were derived from.
///
/// Loaded once per run and never mutated afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassWeightTable {
    /// Label → loss weight.
    pub class_weights: BTreeMap<String, f64>,
    /// Label → number of training agents of that class.
    #[serde(default)]
    pub class_counts: BTreeMap<String, u64>,
}

impl ClassWeightTable {
    /// Load a table from a `classInfo.json`-style file.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let table: ClassWeightTable =
            serde_json::from_str(&contents).map_err(|source| ConfigError::ParseError {
                path: path.to_path_buf(),
                source,
            })?;
        for (label, &w) in &table.class_weights {
            if !w.is_finite() || w < 0.0 {
                return Err(ConfigError::invalid_value(
                    "class_weights",
                    format!("weight for `{label}` must be finite and >= 0.0, got {w}"),
                ));
            }
        }
        Ok(table)
    }

    /// A table assigning weight 1.0 to every label of `registry`.
    pub fn uniform(registry: &ClassRegistry) -> Self {
        ClassWeightTable {
            class_weights: registry.labels().iter().map(|l| (l.clone(), 1.0)).collect(),
            class_counts: BTreeMap::new(),
        }
    }

    /// Derive inverse-frequency weights from counts, normalised so that the
    /// most frequent class has weight 1.0. Classes with a zero count get
    /// weight 0.0.
    pub fn from_counts(class_counts: BTreeMap<String, u64>) -> Self {
        let max = class_counts.values().copied().max().unwrap_or(0) as f64;
        let class_weights = class_counts
            .iter()
            .map(|(l, &c)| {
                let w = if c == 0 { 0.0 } else { max / c as f64 };
                (l.clone(), w)
            })
            .collect();
        ClassWeightTable { class_weights, class_counts }
    }

    /// Weights ordered by the registry's class indices.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingClassWeight`] if a configured label has no weight.
    pub fn weights_for(&self, registry: &ClassRegistry) -> Result<Vec<f64>, ConfigError> {
        registry
            .labels()
            .iter()
            .map(|l| {
                self.class_weights
                    .get(l)
                    .copied()
                    .ok_or_else(|| ConfigError::MissingClassWeight { label: l.clone() })
            })
            .collect()
    }
}

/// Per-class node counts of one batch, indexed like the registry.
pub fn class_counts(
    registry: &ClassRegistry,
    classes: ndarray::ArrayView2<'_, f32>,
) -> Result<Vec<usize>, LossError> {
    let mut counts = vec![0usize; registry.len()];
    for (row_idx, row) in classes.outer_iter().enumerate() {
        let idx = registry
            .index_of_one_hot(row)
            .ok_or_else(|| LossError::InvalidOneHot { row: row_idx, values: row.to_vec() })?;
        counts[idx] += 1;
    }
    Ok(counts)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use tempfile::tempdir;

    fn registry() -> ClassRegistry {
        ClassRegistry::new(&["Pedestrian", "Biker", "Car"])
    }

    #[test]
    fn one_hot_round_trips_through_index() {
        let reg = registry();
        let enc = reg.one_hot("Biker").unwrap();
        assert_eq!(enc, array![0.0, 1.0, 0.0]);
        assert_eq!(reg.index_of_one_hot(enc.view()), Some(1));
    }

    #[test]
    fn unknown_label_has_no_encoding() {
        assert!(registry().one_hot("Bus").is_none());
    }

    #[test]
    fn malformed_rows_are_rejected() {
        let reg = registry();
        assert_eq!(reg.index_of_one_hot(array![1.0, 1.0, 0.0].view()), None);
        assert_eq!(reg.index_of_one_hot(array![0.0, 0.0, 0.0].view()), None);
        assert_eq!(reg.index_of_one_hot(array![0.5, 0.5, 0.0].view()), None);
        assert_eq!(reg.index_of_one_hot(array![1.0, 0.0].view()), None);
    }

    #[test]
    fn counts_per_class() {
        let reg = registry();
        let classes: Array2<f32> =
            array![[1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]];
        assert_eq!(class_counts(&reg, classes.view()).unwrap(), vec![2, 0, 1]);
    }

    #[test]
    fn weight_table_from_json() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("classInfo.json");
        std::fs::write(
            &path,
            r#"{"class_weights": {"Pedestrian": 1.0, "Biker": 2.5, "Car": 4.0},
                "class_counts": {"Pedestrian": 100, "Biker": 40, "Car": 25}}"#,
        )
        .unwrap();
        let table = ClassWeightTable::from_json(&path).unwrap();
        assert_eq!(table.weights_for(&registry()).unwrap(), vec![1.0, 2.5, 4.0]);
        assert_eq!(table.class_counts["Car"], 25);
    }

    #[test]
    fn missing_weight_is_reported() {
        let mut table = ClassWeightTable::uniform(&registry());
        table.class_weights.remove("Car");
        let err = table.weights_for(&registry()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingClassWeight { ref label } if label == "Car"));
    }

    #[test]
    fn inverse_frequency_weights() {
        let counts: BTreeMap<String, u64> =
            [("A".to_string(), 100), ("B".to_string(), 25)].into_iter().collect();
        let table = ClassWeightTable::from_counts(counts);
        assert!((table.class_weights["A"] - 1.0).abs() < 1e-12);
        assert!((table.class_weights["B"] - 4.0).abs() < 1e-12);
    }
}
