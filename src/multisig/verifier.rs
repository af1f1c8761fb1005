//! Threshold signature verification
//!
//! Signatures must arrive sorted by recovered identity, strictly ascending.
//! That single ordering check doubles as the duplicate check, so a batch is
//! verified in one pass without building a set.

use crate::crypto::SignatureRecovery;
use crate::multisig::{Identity, MultisigError, OwnerSet, TxDigest};

/// Outcome of a successful verification
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verification {
    /// Every recovered identity, in submission order
    pub signers: Vec<Identity>,
    /// Recovered identities that are current owners, in submission order
    pub approvers: Vec<Identity>,
}

impl Verification {
    pub fn valid_count(&self) -> usize {
        self.approvers.len()
    }
}

/// Verify a signature batch against a digest and the current owner set
///
/// # Errors
/// - `InvalidSigner` if a signature cannot be recovered
/// - `DuplicateOrUnorderedSignatures` if recovered identities are not strictly increasing
/// - `InsufficientValidSignatures` if fewer than `threshold` owners signed
pub fn verify_signatures(
    digest: &TxDigest,
    signatures: &[Vec<u8>],
    owners: &OwnerSet,
    recovery: &dyn SignatureRecovery,
) -> Result<Verification, MultisigError> {
    let mut signers = Vec::with_capacity(signatures.len());
    let mut approvers = Vec::with_capacity(signatures.len());
    let mut last: Option<Identity> = None;

    for (index, signature) in signatures.iter().enumerate() {
        let signer = recovery.recover(digest.as_bytes(), signature)?;

        if last.map_or(false, |previous| signer <= previous) {
            return Err(MultisigError::DuplicateOrUnorderedSignatures { index });
        }
        last = Some(signer);

        if owners.contains(&signer) {
            approvers.push(signer);
        } else {
            log::debug!("Ignoring signature from non-owner {}", signer);
        }
        signers.push(signer);
    }

    if approvers.len() < owners.threshold() {
        return Err(MultisigError::InsufficientValidSignatures {
            have: approvers.len(),
            need: owners.threshold(),
        });
    }

    Ok(Verification { signers, approvers })
}

/// Sort a batch by recovered identity, ready for submission
///
/// Duplicates are kept; the verifier rejects them.
pub fn sort_signatures(
    digest: &TxDigest,
    signatures: Vec<Vec<u8>>,
    recovery: &dyn SignatureRecovery,
) -> Result<Vec<Vec<u8>>, MultisigError> {
    let mut keyed = signatures
        .into_iter()
        .map(|signature| -> Result<_, MultisigError> {
            let signer = recovery.recover(digest.as_bytes(), &signature)?;
            Ok((signer, signature))
        })
        .collect::<Result<Vec<_>, _>>()?;

    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(keyed.into_iter().map(|(_, signature)| signature).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KeyPair, Secp256k1Recovery};

    /// Fresh key pairs sorted by identity
    fn sorted_keys(count: usize) -> Vec<KeyPair> {
        let mut keys: Vec<KeyPair> = (0..count).map(|_| KeyPair::generate()).collect();
        keys.sort_by_key(|k| k.identity());
        keys
    }

    fn owner_set(keys: &[KeyPair], threshold: usize) -> OwnerSet {
        OwnerSet::new(keys.iter().map(|k| k.identity()).collect(), threshold).unwrap()
    }

    fn digest() -> TxDigest {
        TxDigest::from([0x42; 32])
    }

    fn sign_all(keys: &[&KeyPair]) -> Vec<Vec<u8>> {
        keys.iter().map(|k| k.sign(digest().as_bytes())).collect()
    }

    #[test]
    fn test_exact_threshold_passes() {
        let keys = sorted_keys(3);
        let owners = owner_set(&keys, 2);

        let signatures = sign_all(&[&keys[0], &keys[2]]);
        let result =
            verify_signatures(&digest(), &signatures, &owners, &Secp256k1Recovery).unwrap();
        assert_eq!(result.valid_count(), 2);
        assert_eq!(result.approvers, vec![keys[0].identity(), keys[2].identity()]);
    }

    #[test]
    fn test_one_short_fails() {
        let keys = sorted_keys(3);
        let owners = owner_set(&keys, 2);

        let signatures = sign_all(&[&keys[1]]);
        let err =
            verify_signatures(&digest(), &signatures, &owners, &Secp256k1Recovery).unwrap_err();
        assert!(matches!(
            err,
            MultisigError::InsufficientValidSignatures { have: 1, need: 2 }
        ));
    }

    #[test]
    fn test_unordered_rejected_even_with_valid_owners() {
        let keys = sorted_keys(3);
        let owners = owner_set(&keys, 2);

        let err = verify_signatures(
            &digest(),
            &sign_all(&[&keys[2], &keys[0]]),
            &owners,
            &Secp256k1Recovery,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MultisigError::DuplicateOrUnorderedSignatures { index: 1 }
        ));
    }

    #[test]
    fn test_duplicate_signer_rejected() {
        let keys = sorted_keys(3);
        let owners = owner_set(&keys, 1);

        let err = verify_signatures(
            &digest(),
            &sign_all(&[&keys[0], &keys[0]]),
            &owners,
            &Secp256k1Recovery,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MultisigError::DuplicateOrUnorderedSignatures { index: 1 }
        ));
    }

    #[test]
    fn test_non_owner_signatures_do_not_count() {
        let mut keys = sorted_keys(4);
        let outsider = keys.pop().unwrap();
        let owners = owner_set(&keys, 2);

        let mut all = vec![&keys[0], &outsider];
        all.sort_by_key(|k| k.identity());
        let err = verify_signatures(&digest(), &sign_all(&all), &owners, &Secp256k1Recovery)
            .unwrap_err();
        assert!(matches!(
            err,
            MultisigError::InsufficientValidSignatures { have: 1, need: 2 }
        ));

        let mut all = vec![&keys[0], &keys[1], &outsider];
        all.sort_by_key(|k| k.identity());
        let result =
            verify_signatures(&digest(), &sign_all(&all), &owners, &Secp256k1Recovery).unwrap();
        assert_eq!(result.signers.len(), 3);
        assert_eq!(result.valid_count(), 2);
        assert!(!result.approvers.contains(&outsider.identity()));
    }

    #[test]
    fn test_malformed_signature_is_invalid_signer() {
        let keys = sorted_keys(2);
        let owners = owner_set(&keys, 1);

        let err = verify_signatures(&digest(), &[vec![1, 2, 3]], &owners, &Secp256k1Recovery)
            .unwrap_err();
        assert!(matches!(err, MultisigError::InvalidSigner(_)));
    }

    #[test]
    fn test_sort_signatures() {
        let keys = sorted_keys(3);
        let owners = owner_set(&keys, 3);

        let reversed = sign_all(&[&keys[2], &keys[1], &keys[0]]);
        let sorted = sort_signatures(&digest(), reversed, &Secp256k1Recovery).unwrap();
        let result = verify_signatures(&digest(), &sorted, &owners, &Secp256k1Recovery).unwrap();
        assert_eq!(result.valid_count(), 3);
    }
}
