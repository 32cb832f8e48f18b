//! JSON input loading for the vigia CLI.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;
use vigia_traits::{EnsembleWeights, ForecastRecord, WeightBounds};

/// Read and deserialize one JSON file.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Load forecast records; each record is validated on deserialization.
pub(crate) fn load_records(path: &Path) -> Result<Vec<ForecastRecord>> {
    let records: Vec<ForecastRecord> = read_json(path)?;
    tracing::debug!(count = records.len(), path = %path.display(), "loaded forecast records");
    Ok(records)
}

/// Load a weight snapshot, or start from equal weights over the record models.
///
/// A snapshot file is checked against the weight invariants as it is parsed.
pub(crate) fn load_weights(
    path: Option<&Path>,
    records: &[ForecastRecord],
    bounds: WeightBounds,
) -> Result<EnsembleWeights> {
    match path {
        Some(p) => read_json(p),
        None => {
            let models = records.iter().map(ForecastRecord::model_id).collect();
            EnsembleWeights::equal(models, bounds).context("building equal weights")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("vigia-cli-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    const RECORDS: &str = r#"[
        {
            "model_id": "arima",
            "values": [100.0, null],
            "timestamps": ["2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z"],
            "confidence_intervals": [
                {"lower": 99.0, "upper": 101.0, "confidence_level": 0.95},
                {"lower": 0.0, "upper": 0.0, "confidence_level": 0.95}
            ],
            "accuracy": {"mae": 0.5, "mse": 0.3, "rmse": 0.2, "mape": 0.1, "r2": 0.5, "directional_accuracy": 0.7}
        }
    ]"#;

    #[test]
    fn test_load_records_with_missing_step() {
        let path = write_temp("records.json", RECORDS);
        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].values()[1].is_nan());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_equal_weights_default() {
        let path = write_temp("records-eq.json", RECORDS);
        let records = load_records(&path).unwrap();
        let bounds = WeightBounds {
            min_weight: 0.0,
            max_weight: 1.0,
        };
        let weights = load_weights(None, &records, bounds).unwrap();
        assert_eq!(weights.weights(), &[1.0]);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let path = write_temp(
            "weights.json",
            r#"{"models": ["arima"], "weights": [0.4], "bounds": {"min_weight": 0.0, "max_weight": 1.0}, "version": 3}"#,
        );
        assert!(load_weights(Some(&path), &[], WeightBounds::default()).is_err());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file() {
        let err = read_json::<Vec<f64>>(Path::new("/nonexistent/file.json")).unwrap_err();
        assert!(err.to_string().contains("reading"));
    }
}
