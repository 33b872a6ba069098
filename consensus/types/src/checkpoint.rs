use crate::{Epoch, Hash256};
use serde_derive::{Deserialize, Serialize};

/// Casper FFG checkpoint, an `(epoch, root)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Checkpoint {
    pub epoch: Epoch,
    pub root: Hash256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_the_zero_checkpoint() {
        let checkpoint = Checkpoint::default();

        assert_eq!(checkpoint.epoch, Epoch::new(0));
        assert!(checkpoint.root.is_zero());
    }

    #[test]
    fn yaml_uses_plain_fields() {
        let checkpoint = Checkpoint {
            epoch: Epoch::new(3),
            root: Hash256::from_low_u64_be(4),
        };

        let yaml = serde_yaml::to_string(&checkpoint).expect("should serialize");
        let decoded: Checkpoint = serde_yaml::from_str(&yaml).expect("should deserialize");

        assert!(yaml.contains("epoch: 3"));
        assert_eq!(decoded, checkpoint);
    }
}
