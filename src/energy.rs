//! Energy expenditure derivation
//!
//! The instrument reports oxygen consumption; energy expenditure in kcal/h is
//! derived from it using each animal's body weight. Weights are keyed by
//! animal (box) id and round-trip through JSON so a weighing session can be
//! reused across runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::SensorRecord;

/// Caloric factor applied to VO2 times body weight to obtain kcal/h.
pub const VO2_CALORIC_FACTOR: f64 = 5.0e-6;

/// Per-animal body weights and the derived-energy rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyModel {
    /// Body weight per animal id
    weights: BTreeMap<u32, f64>,
}

impl EnergyModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weight(mut self, animal_id: u32, weight: f64) -> Self {
        self.weights.insert(animal_id, weight);
        self
    }

    pub fn set_weight(&mut self, animal_id: u32, weight: f64) {
        self.weights.insert(animal_id, weight);
    }

    pub fn weight(&self, animal_id: u32) -> Option<f64> {
        self.weights.get(&animal_id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Energy expenditure in kcal/h for one VO2 reading, when the animal has
    /// a known weight.
    pub fn kcal_per_hour(&self, animal_id: u32, vo2: f64) -> Option<f64> {
        self.weight(animal_id)
            .map(|w| vo2 * w * VO2_CALORIC_FACTOR)
    }

    /// Fill in missing `energy_expenditure` values from VO2 readings.
    ///
    /// Values already present in the source are left alone; animals without a
    /// weight keep their energy missing.
    pub fn derive(&self, records: &mut [SensorRecord]) {
        for record in records {
            if record.energy_expenditure.is_none() {
                record.energy_expenditure = record
                    .vo2
                    .and_then(|vo2| self.kcal_per_hour(record.animal_id, vo2));
            }
        }
    }

    /// Load a weight table from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the weight table to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
