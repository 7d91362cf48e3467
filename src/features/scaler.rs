//! Robust feature scaler
//!
//! Per-column affine normalization `(x - center) / scale` with center =
//! median and scale = interquartile range, fit once during offline training
//! and persisted as an artifact. Inference applies the persisted statistics
//! verbatim; there is no re-fit path on the inference side.
//!
//! The artifact declares the schema version and feature-name sequence it was
//! fit against, and loading refuses anything that disagrees with the
//! published schema — silent reordering would corrupt every downstream
//! score.

use crate::features::schema;
use crate::features::FeatureTable;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Floor applied to scales so constant features cannot divide by zero
const SCALE_FLOOR: f64 = 1e-9;

/// Fitted per-feature center/scale statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobustScaler {
    /// Feature schema the statistics were fit against
    pub schema_version: String,
    /// Declared feature columns, in fit order
    pub feature_names: Vec<String>,
    /// Per-feature median
    pub centers: Vec<f64>,
    /// Per-feature interquartile range, floored away from zero
    pub scales: Vec<f64>,
}

impl RobustScaler {
    /// Fit center/scale statistics on a training feature table.
    ///
    /// This is the offline half of the contract; the result is persisted
    /// with [`save`](Self::save) and never re-fit at inference.
    pub fn fit(table: ArrayView2<'_, f64>) -> crate::Result<Self> {
        if table.ncols() != schema::NUM_FEATURES {
            return Err(crate::Error::Schema(format!(
                "training table has {} columns, schema has {}",
                table.ncols(),
                schema::NUM_FEATURES
            )));
        }
        if table.nrows() == 0 {
            return Err(crate::Error::Feature(
                "cannot fit scaler on an empty table".to_string(),
            ));
        }

        let mut centers = Vec::with_capacity(table.ncols());
        let mut scales = Vec::with_capacity(table.ncols());
        for column in table.columns() {
            let mut values: Vec<f64> = column.iter().copied().collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let median = quantile(&values, 0.5);
            let iqr = quantile(&values, 0.75) - quantile(&values, 0.25);
            centers.push(median);
            scales.push(iqr.max(SCALE_FLOOR));
        }

        Ok(Self {
            schema_version: schema::SCHEMA_VERSION.to_string(),
            feature_names: schema::FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            centers,
            scales,
        })
    }

    /// Apply the fitted affine map to a feature table.
    ///
    /// Pure per-column transform; fails if the table width disagrees with
    /// the fitted statistics.
    pub fn transform(&self, table: &FeatureTable) -> crate::Result<FeatureTable> {
        if table.ncols() != self.centers.len() {
            return Err(crate::Error::Schema(format!(
                "table has {} columns, scaler was fit on {}",
                table.ncols(),
                self.centers.len()
            )));
        }

        let mut out = table.clone();
        for (c, mut column) in out.columns_mut().into_iter().enumerate() {
            let center = self.centers[c];
            let scale = self.scales[c];
            column.mapv_inplace(|v| (v - center) / scale);
        }
        Ok(out)
    }

    /// Load a persisted scaler and validate it against the published schema.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::Artifact(format!("cannot read scaler {}: {}", path.display(), e))
        })?;
        let scaler: Self = serde_json::from_str(&content)
            .map_err(|e| crate::Error::Artifact(format!("malformed scaler artifact: {}", e)))?;
        scaler.validate()?;
        Ok(scaler)
    }

    /// Persist the fitted statistics as a JSON artifact
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check internal consistency and schema agreement
    pub fn validate(&self) -> crate::Result<()> {
        schema::validate_names(&self.schema_version, &self.feature_names)?;
        if self.centers.len() != self.feature_names.len()
            || self.scales.len() != self.feature_names.len()
        {
            return Err(crate::Error::Artifact(format!(
                "scaler statistics length mismatch: {} names, {} centers, {} scales",
                self.feature_names.len(),
                self.centers.len(),
                self.scales.len()
            )));
        }
        if self.scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(crate::Error::Artifact(
                "scaler scales must be finite and positive".to_string(),
            ));
        }
        if self.centers.iter().any(|c| !c.is_finite()) {
            return Err(crate::Error::Artifact(
                "scaler centers must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Linear-interpolation quantile of pre-sorted values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::schema::NUM_FEATURES;
    use ndarray::Array2;
    use tempfile::TempDir;

    fn training_table(rows: usize) -> Array2<f64> {
        // Distinct spread per column so fit statistics differ
        Array2::from_shape_fn((rows, NUM_FEATURES), |(r, c)| {
            (r as f64 - rows as f64 / 2.0) * (c as f64 + 1.0) * 0.1
        })
    }

    #[test]
    fn test_fit_then_transform_centers_training_data() {
        let table = training_table(201);
        let scaler = RobustScaler::fit(table.view()).unwrap();
        let scaled = scaler.transform(&table).unwrap();

        for c in 0..NUM_FEATURES {
            let mut column: Vec<f64> = scaled.column(c).iter().copied().collect();
            column.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let median = quantile(&column, 0.5);
            let iqr = quantile(&column, 0.75) - quantile(&column, 0.25);
            assert!(median.abs() < 1e-9, "column {} median {}", c, median);
            assert!((iqr - 1.0).abs() < 1e-9, "column {} iqr {}", c, iqr);
        }
    }

    #[test]
    fn test_transform_is_pure() {
        let table = training_table(101);
        let scaler = RobustScaler::fit(table.view()).unwrap();
        let a = scaler.transform(&table).unwrap();
        let b = scaler.transform(&table).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_constant_column_gets_floored_scale() {
        let mut table = training_table(51);
        table.column_mut(3).fill(7.0);
        let scaler = RobustScaler::fit(table.view()).unwrap();
        assert_eq!(scaler.scales[3], SCALE_FLOOR);

        let scaled = scaler.transform(&table).unwrap();
        assert!(scaled.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_width_mismatch_fails_loudly() {
        let table = training_table(51);
        let scaler = RobustScaler::fit(table.view()).unwrap();

        let narrow = Array2::zeros((10, NUM_FEATURES - 1));
        assert!(scaler.transform(&narrow).is_err());
    }

    #[test]
    fn test_fit_rejects_wrong_width() {
        let table = Array2::zeros((10, 3));
        assert!(RobustScaler::fit(table.view()).is_err());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scaler.json");

        let table = training_table(101);
        let scaler = RobustScaler::fit(table.view()).unwrap();
        scaler.save(&path).unwrap();

        let loaded = RobustScaler::load(&path).unwrap();
        assert_eq!(loaded.centers, scaler.centers);
        assert_eq!(loaded.scales, scaler.scales);
    }

    #[test]
    fn test_load_rejects_foreign_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scaler.json");

        let table = training_table(101);
        let mut scaler = RobustScaler::fit(table.view()).unwrap();
        scaler.feature_names.swap(0, 1);
        scaler.save(&path).unwrap();

        assert!(RobustScaler::load(&path).is_err());
    }

    #[test]
    fn test_load_rejects_stale_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scaler.json");

        let table = training_table(101);
        let mut scaler = RobustScaler::fit(table.view()).unwrap();
        scaler.schema_version = "v0".to_string();
        scaler.save(&path).unwrap();

        assert!(RobustScaler::load(&path).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(RobustScaler::load(Path::new("/nonexistent/scaler.json")).is_err());
    }
}
