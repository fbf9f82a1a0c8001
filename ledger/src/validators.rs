//! Registered validators and stake-weighted proposer selection.
//!
//! Iteration order is registration order; selection walks it accumulating
//! stake, so the order is part of the selection rule and is preserved
//! through serialization.

use qnode_types::{Address, Amount};
use rand::Rng;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Address → staked amount, in registration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidatorSet {
    entries: Vec<(Address, Amount)>,
}

impl ValidatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `stake` to `address`, registering it if new.
    pub fn add_stake(&mut self, address: &Address, stake: Amount) {
        match self.entries.iter_mut().find(|(a, _)| a == address) {
            Some((_, existing)) => *existing += stake,
            None => self.entries.push((address.clone(), stake)),
        }
    }

    pub fn stake_of(&self, address: &Address) -> Option<Amount> {
        self.entries
            .iter()
            .find(|(a, _)| a == address)
            .map(|(_, s)| *s)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.stake_of(address).is_some()
    }

    pub fn total_stake(&self) -> Amount {
        self.entries.iter().map(|(_, s)| *s).sum()
    }

    /// Stake-weighted draw: uniform in `[0, total)`, then the first validator
    /// whose cumulative stake reaches the draw. `None` with no stake.
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(Address, Amount)> {
        let total = self.total_stake().value();
        if self.entries.is_empty() || total <= 0.0 {
            return None;
        }
        let draw = rng.gen_range(0.0..total);
        let mut cumulative = 0.0;
        for (address, stake) in &self.entries {
            cumulative += stake.value();
            if cumulative >= draw {
                return Some((address.clone(), *stake));
            }
        }
        // Float rounding can leave the draw just above the final sum.
        self.entries.last().map(|(a, s)| (a.clone(), *s))
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.entries.iter().map(|(a, _)| a)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, Amount)> {
        self.entries.iter().map(|(a, s)| (a, *s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ValidatorSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (address, stake) in &self.entries {
            map.serialize_entry(address, stake)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ValidatorSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SetVisitor;

        impl<'de> Visitor<'de> for SetVisitor {
            type Value = ValidatorSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a map of address to stake")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut set = ValidatorSet::new();
                while let Some((address, stake)) = access.next_entry::<Address, Amount>()? {
                    set.add_stake(&address, stake);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(SetVisitor)
    }
}
