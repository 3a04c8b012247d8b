//! Data loading, normalization, and categorical encoding using Polars

use std::collections::HashMap;

use anyhow::bail;
use ndarray::{Array1, Array2};
use polars::prelude::*;

use crate::error::ClusterError;

/// Mixed-type dataset: a continuous block and a categorical block sharing
/// one row order. Immutable for the lifetime of a clustering run; runs keep
/// their assignment buffers outside this struct, so several runs can share
/// one dataset.
#[derive(Debug, Clone)]
pub struct MixedData {
    /// Continuous features, pre-scaled to [0,1] (n_records x num_numeric)
    pub numeric: Array2<f64>,
    /// Categorical features as dictionary codes (n_records x num_categorical)
    pub categorical: Array2<i64>,
    /// Per categorical column, code -> original token. Empty for datasets
    /// built directly from code matrices.
    pub levels: Vec<Vec<String>>,
}

impl MixedData {
    /// Build a dataset from pre-scaled continuous features and categorical
    /// codes. Both blocks must describe the same records.
    pub fn new(numeric: Array2<f64>, categorical: Array2<i64>) -> Result<Self, ClusterError> {
        if numeric.nrows() != categorical.nrows() {
            return Err(ClusterError::InvalidSchema(format!(
                "numeric block has {} rows but categorical block has {}",
                numeric.nrows(),
                categorical.nrows()
            )));
        }
        Ok(MixedData {
            numeric,
            categorical,
            levels: Vec::new(),
        })
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.numeric.nrows()
    }

    /// Whether the dataset holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of continuous feature columns
    pub fn num_numeric(&self) -> usize {
        self.numeric.ncols()
    }

    /// Number of categorical feature columns
    pub fn num_categorical(&self) -> usize {
        self.categorical.ncols()
    }

    /// Human-readable token for a categorical code, falling back to the code
    /// itself when no level table is available for the column.
    pub fn category_label(&self, column: usize, code: i64) -> String {
        self.levels
            .get(column)
            .and_then(|table| table.get(code as usize))
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }
}

/// Min-max scaler mapping each column onto [0,1]
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    min: Array1<f64>,
    range: Array1<f64>,
}

impl MinMaxScaler {
    /// Fit column-wise minimum and range on a feature matrix
    pub fn fit(features: &Array2<f64>) -> Self {
        let ncols = features.ncols();
        let mut min = Array1::from_elem(ncols, f64::INFINITY);
        let mut max = Array1::from_elem(ncols, f64::NEG_INFINITY);
        for row in features.outer_iter() {
            for (j, &value) in row.iter().enumerate() {
                if value < min[j] {
                    min[j] = value;
                }
                if value > max[j] {
                    max[j] = value;
                }
            }
        }
        let range = &max - &min;
        MinMaxScaler { min, range }
    }

    /// Scale a feature matrix with the fitted bounds. Constant columns
    /// collapse to 0.0.
    pub fn transform(&self, features: &Array2<f64>) -> Array2<f64> {
        let mut scaled = features.clone();
        for mut row in scaled.outer_iter_mut() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = if self.range[j] == 0.0 {
                    0.0
                } else {
                    (*value - self.min[j]) / self.range[j]
                };
            }
        }
        scaled
    }
}

/// Load a CSV file into a `MixedData` per the schema counts
///
/// The file's leading `num_numeric` columns are parsed as continuous features
/// and min-max scaled to [0,1]; the trailing `num_categorical` columns are
/// dictionary-encoded to integer codes in first-seen order, keeping a level
/// table per column for reporting. The two counts must exactly partition the
/// file's columns.
///
/// # Arguments
/// * `file_path` - Path to the CSV file (with a header row)
/// * `num_numeric` - Number of leading continuous columns
/// * `num_categorical` - Number of trailing categorical columns
///
/// # Returns
/// * `MixedData` with scaled features, codes, and level tables
pub fn load_mixed_data(
    file_path: &str,
    num_numeric: usize,
    num_categorical: usize,
) -> crate::Result<MixedData> {
    let df = LazyCsvReader::new(file_path).has_header(true).finish()?.collect()?;

    if num_numeric + num_categorical != df.width() {
        return Err(ClusterError::InvalidSchema(format!(
            "{} numeric + {} categorical columns do not partition the {} columns of {}",
            num_numeric,
            num_categorical,
            df.width(),
            file_path
        ))
        .into());
    }
    if df.height() == 0 {
        bail!("no records found in {}", file_path);
    }

    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let n_records = df.height();

    // Continuous block: parse as floats, reject nulls and unparseable cells
    let mut raw_numeric = Array2::<f64>::zeros((n_records, num_numeric));
    for (j, name) in names[..num_numeric].iter().enumerate() {
        let floats = df.column(name)?.cast(&DataType::Float64)?;
        if floats.null_count() > 0 {
            bail!(
                "numeric column '{}' contains nulls or non-numeric values",
                name
            );
        }
        for (i, value) in floats.f64()?.into_no_null_iter().enumerate() {
            raw_numeric[[i, j]] = value;
        }
    }
    let scaler = MinMaxScaler::fit(&raw_numeric);
    let numeric = scaler.transform(&raw_numeric);

    // Categorical block: dictionary-encode tokens in first-seen order
    let mut categorical = Array2::<i64>::zeros((n_records, num_categorical));
    let mut levels = Vec::with_capacity(num_categorical);
    for (j, name) in names[num_numeric..].iter().enumerate() {
        let tokens = df.column(name)?.cast(&DataType::Utf8)?;
        if tokens.null_count() > 0 {
            bail!("categorical column '{}' contains nulls", name);
        }
        let mut level_index: HashMap<String, i64> = HashMap::new();
        let mut table: Vec<String> = Vec::new();
        for (i, token) in tokens.utf8()?.into_iter().flatten().enumerate() {
            let code = match level_index.get(token) {
                Some(&code) => code,
                None => {
                    let code = table.len() as i64;
                    level_index.insert(token.to_string(), code);
                    table.push(token.to_string());
                    code
                }
            };
            categorical[[i, j]] = code;
        }
        levels.push(table);
    }

    let mut data = MixedData::new(numeric, categorical)?;
    data.levels = levels;
    Ok(data)
}
