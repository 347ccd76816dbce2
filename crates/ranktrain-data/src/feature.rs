use std::{num::NonZeroU32, str::FromStr};

use serde::{Deserialize, Serialize};

/// Identifier of a feature column; always a positive integer.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct FeatureId(NonZeroU32);

impl FeatureId {
    /// Returns `None` for `0`, which is not a valid feature id.
    #[must_use]
    pub const fn new(id: u32) -> Option<Self> {
        match NonZeroU32::new(id) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl FromStr for FeatureId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>().ok().and_then(Self::new).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_rejected() {
        assert_eq!(FeatureId::new(0), None);
        assert_eq!("0".parse::<FeatureId>(), Err(()));
        assert_eq!("-3".parse::<FeatureId>(), Err(()));
        assert_eq!("x".parse::<FeatureId>(), Err(()));
    }

    #[test]
    fn test_order_follows_number() {
        let a = FeatureId::new(2).unwrap();
        let b: FeatureId = "10".parse().unwrap();
        assert!(a < b);
        assert_eq!(b.get(), 10);
        assert_eq!(b.to_string(), "10");
    }
}
