//! Owner set and quorum threshold
//!
//! Every mutation is validated against the post-mutation owner count before
//! anything changes, so a rejected change leaves the set untouched.

use crate::multisig::{Identity, MultisigError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Insertion-ordered unique owners plus the quorum threshold
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OwnerSet {
    owners: Vec<Identity>,
    membership: HashSet<Identity>,
    threshold: usize,
}

impl OwnerSet {
    /// Create an owner set
    ///
    /// # Errors
    /// `InvalidOwner` for a null or repeated owner, `InvalidThreshold` for a
    /// zero threshold and `NotEnoughSigners` when it exceeds the owner count.
    pub fn new(owners: Vec<Identity>, threshold: usize) -> Result<Self, MultisigError> {
        let mut membership = HashSet::with_capacity(owners.len());
        for owner in &owners {
            if owner.is_zero() || !membership.insert(*owner) {
                return Err(MultisigError::InvalidOwner(*owner));
            }
        }

        validate_threshold(threshold, owners.len())?;

        Ok(Self {
            owners,
            membership,
            threshold,
        })
    }

    pub fn owners(&self) -> &[Identity] {
        &self.owners
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.membership.contains(identity)
    }

    /// Get description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.owners.len())
    }

    /// Append an owner and set the new threshold
    pub fn add_owner(&mut self, owner: Identity, threshold: usize) -> Result<(), MultisigError> {
        if owner.is_zero() || self.contains(&owner) {
            return Err(MultisigError::InvalidOwner(owner));
        }
        validate_threshold(threshold, self.owners.len() + 1)?;

        self.owners.push(owner);
        self.membership.insert(owner);
        self.threshold = threshold;
        Ok(())
    }

    /// Remove an owner and set the new threshold
    ///
    /// The removed slot is filled by the last owner; order is not preserved.
    pub fn remove_owner(
        &mut self,
        owner: &Identity,
        threshold: usize,
    ) -> Result<(), MultisigError> {
        let index = self
            .owners
            .iter()
            .position(|candidate| candidate == owner)
            .ok_or(MultisigError::InvalidOwner(*owner))?;
        validate_threshold(threshold, self.owners.len() - 1)?;

        self.owners.swap_remove(index);
        self.membership.remove(owner);
        self.threshold = threshold;
        Ok(())
    }

    pub fn change_threshold(&mut self, threshold: usize) -> Result<(), MultisigError> {
        validate_threshold(threshold, self.owners.len())?;
        self.threshold = threshold;
        Ok(())
    }

    /// Check the membership index agrees with the owner list
    pub fn is_consistent(&self) -> bool {
        self.owners.len() == self.membership.len()
            && self.owners.iter().all(|owner| self.membership.contains(owner))
    }
}

fn validate_threshold(threshold: usize, owner_count: usize) -> Result<(), MultisigError> {
    if threshold == 0 {
        return Err(MultisigError::InvalidThreshold(
            "threshold must be at least 1".to_string(),
        ));
    }
    if threshold > owner_count {
        return Err(MultisigError::NotEnoughSigners {
            threshold,
            owners: owner_count,
        });
    }
    Ok(())
}
