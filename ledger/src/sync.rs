//! Fork choice: longest valid chain wins, all or nothing.

use qnode_types::Address;

use crate::error::SyncRejection;
use crate::ledger::{validate_chain, Ledger};
use crate::snapshot::LedgerSnapshot;

/// Result of a successful adoption.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncOutcome {
    pub previous_length: usize,
    pub new_length: usize,
}

impl Ledger {
    /// Replace the whole ledger with `candidate` iff its treasury anchor is
    /// `official`, its chain is strictly longer, and it validates.
    pub fn adopt_if_longer(
        &mut self,
        candidate: LedgerSnapshot,
        official: &Address,
    ) -> Result<SyncOutcome, SyncRejection> {
        if candidate.treasury_address.as_ref() != Some(official) {
            return Err(SyncRejection::UntrustedTreasury {
                received: candidate.treasury_address,
                official: official.clone(),
            });
        }
        let local = self.len();
        if candidate.len() <= local {
            return Err(SyncRejection::NotLonger {
                candidate: candidate.len(),
                local,
            });
        }
        validate_chain(&candidate.chain, self.params().tx_max_age_secs)?;

        let replacement = Ledger::from_snapshot(candidate, self.params().clone())?;
        let outcome = SyncOutcome {
            previous_length: local,
            new_length: replacement.len(),
        };
        *self = replacement;
        tracing::info!(
            previous = outcome.previous_length,
            adopted = outcome.new_length,
            "adopted longer chain"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qnode_types::{Amount, ProtocolParams, Timestamp, CANONICAL_TREASURY};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn chain_of(len: usize, treasury: &str) -> Ledger {
        let mut ledger = Ledger::new(ProtocolParams::default(), Some(Address::new(treasury)));
        let mut rng = StdRng::seed_from_u64(3);
        let now = Timestamp::new(1_750_000_000.0);
        for i in 1..len {
            ledger
                .mint(&Address::new(format!("Q{i}")), Amount::new(1.0), now)
                .unwrap();
            ledger.create_block(&mut rng, now).unwrap();
        }
        ledger
    }

    #[test]
    fn longer_valid_chain_replaces_local() {
        let official = Address::new(CANONICAL_TREASURY);
        let mut local = chain_of(3, CANONICAL_TREASURY);
        let peer = chain_of(5, CANONICAL_TREASURY);
        let outcome = local.adopt_if_longer(peer.snapshot(), &official).unwrap();
        assert_eq!(outcome, SyncOutcome { previous_length: 3, new_length: 5 });
        assert_eq!(local.len(), 5);
        assert_eq!(local.tip_hash(), peer.tip_hash());
    }

    #[test]
    fn shorter_chain_never_replaces_local() {
        let official = Address::new(CANONICAL_TREASURY);
        let mut local = chain_of(3, CANONICAL_TREASURY);
        let before = local.snapshot();
        let peer = chain_of(2, CANONICAL_TREASURY);
        assert_eq!(
            local.adopt_if_longer(peer.snapshot(), &official),
            Err(SyncRejection::NotLonger { candidate: 2, local: 3 })
        );
        assert_eq!(local.snapshot(), before);
    }

    #[test]
    fn foreign_treasury_is_rejected_regardless_of_length() {
        let official = Address::new(CANONICAL_TREASURY);
        let mut local = chain_of(2, CANONICAL_TREASURY);
        let peer = chain_of(6, "Qforeign");
        assert!(matches!(
            local.adopt_if_longer(peer.snapshot(), &official),
            Err(SyncRejection::UntrustedTreasury { .. })
        ));
        assert_eq!(local.len(), 2);
    }

    #[test]
    fn invalid_longer_chain_is_rejected() {
        let official = Address::new(CANONICAL_TREASURY);
        let mut local = chain_of(2, CANONICAL_TREASURY);
        let mut snap = chain_of(4, CANONICAL_TREASURY).snapshot();
        snap.chain[2].previous_hash = snap.chain[0].hash.clone();
        assert!(matches!(
            local.adopt_if_longer(snap, &official),
            Err(SyncRejection::InvalidChain(_))
        ));
        assert_eq!(local.len(), 2);
    }
}
