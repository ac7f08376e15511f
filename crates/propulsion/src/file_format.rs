//! On-disk layout of a packaged engine deck.
//!
//! One JSON file per engine holds the shared training sample table, the
//! fitted kernel configuration, and one weights/trend block per output
//! quantity. Keeping every output of a deck on the same sample table and
//! length-scales is structural here: it is what allows the deck to evaluate
//! all outputs from a single correlation pass.

use serde::{Deserialize, Serialize};

/// A deserialized engine-deck artifact, before validation.
///
/// Payloads are plain vectors; [`EngineDeck::from_deck_file`](crate::EngineDeck::from_deck_file)
/// converts them to arrays and is where every consistency rule is enforced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckFile {
    /// Engine name the deck is keyed by (e.g. `n3`)
    pub name: String,
    /// Human-readable description of the deck
    #[serde(default)]
    pub description: String,
    /// Input dimension names, in the column order of `samples`
    pub inputs: Vec<String>,
    /// Units of each input dimension (empty string for dimensionless)
    pub units: Vec<String>,
    /// Correlation kernel the deck was fitted with
    pub kernel: String,
    /// Trend model the deck was fitted with
    pub trend: String,
    /// Fitted per-dimension length-scales (normalized space)
    pub theta: Vec<f64>,
    /// Training input coordinates, one row per sample
    pub samples: Vec<Vec<f64>>,
    /// One fitted block per output quantity
    pub outputs: Vec<DeckOutput>,
}

/// The fitted constants of one output quantity of an engine deck
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckOutput {
    /// Output name (e.g. `thrust`)
    pub name: String,
    /// Output units (empty string for dimensionless)
    #[serde(default)]
    pub units: String,
    /// Observed output at each training sample
    pub values: Vec<f64>,
    /// Fitted Kriging weights, one per training sample
    pub weights: Vec<f64>,
    /// Fitted trend coefficients, one per basis function of `trend`
    pub beta: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let file = DeckFile {
            name: "toy".to_string(),
            description: String::new(),
            inputs: vec!["altitude".to_string(), "mach".to_string()],
            units: vec!["ft".to_string(), String::new()],
            kernel: "SquaredExponential".to_string(),
            trend: "Constant".to_string(),
            theta: vec![0.5, 0.5],
            samples: vec![vec![0., 0.2], vec![10000., 0.8]],
            outputs: vec![DeckOutput {
                name: "thrust".to_string(),
                units: "N".to_string(),
                values: vec![10000., 7200.],
                weights: vec![0.1, -0.1],
                beta: vec![0.],
            }],
        };
        let json = serde_json::to_string(&file).unwrap();
        let back: DeckFile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "toy");
        assert_eq!(back.outputs.len(), 1);
        assert_eq!(back.outputs[0].values, vec![10000., 7200.]);
    }

    #[test]
    fn test_missing_field_rejected() {
        let json = r#"{ "name": "toy", "inputs": ["altitude"] }"#;
        assert!(serde_json::from_str::<DeckFile>(json).is_err());
    }
}
