use serde_derive::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Do not attempt to prune the tree unless at least this many nodes would be removed.
pub const DEFAULT_PRUNE_THRESHOLD: usize = 256;

/// The percentage of a committee's weight granted to a timely proposal.
pub const DEFAULT_PROPOSER_SCORE_BOOST: u64 = 40;

/// The maximum number of validators a beacon state can hold. Votes from higher indices are never
/// tracked.
pub const VALIDATOR_REGISTRY_LIMIT: u64 = 1 << 40;

/// Network parameters consumed by fork choice.
///
/// A value of this type is handed to fork choice at construction and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForkChoiceConfig {
    pub slots_per_epoch: u64,
    pub prune_threshold: usize,
    /// `None` disables proposer boosting.
    pub proposer_score_boost: Option<u64>,
}

impl Default for ForkChoiceConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl ForkChoiceConfig {
    pub fn mainnet() -> Self {
        Self {
            slots_per_epoch: 32,
            prune_threshold: DEFAULT_PRUNE_THRESHOLD,
            proposer_score_boost: Some(DEFAULT_PROPOSER_SCORE_BOOST),
        }
    }

    pub fn minimal() -> Self {
        Self {
            slots_per_epoch: 8,
            ..Self::mainnet()
        }
    }

    /// Read a config from a YAML file. Fields absent from the file take their mainnet value.
    pub fn from_yaml_file(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Unable to open fork choice config {:?}: {:?}", path, e))?;
        let config: Self = serde_yaml::from_reader(file)
            .map_err(|e| format!("Unable to parse fork choice config {:?}: {:?}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, String> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| format!("Unable to parse fork choice config: {:?}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Returns an error if the config cannot be used to compute epochs.
    pub fn validate(&self) -> Result<(), String> {
        if self.slots_per_epoch == 0 {
            return Err("slots_per_epoch must be greater than zero".to_string());
        }
        Ok(())
    }
}
