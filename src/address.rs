//! Program-owned address derivation.
//!
//! Every account the messaging program owns lives at an address computed from
//! a list of seeds and the program id. The computation is pure: both ends of a
//! conversation, and the program itself, arrive at the same address without a
//! round trip.

use crate::{Error, Pubkey};
use curve25519_dalek::edwards::CompressedEdwardsY;
use sha2::{Digest, Sha256};

/// Maximum length of a single seed.
pub const MAX_SEED_LEN: usize = 32;

/// Maximum number of seeds, bump included.
pub const MAX_SEEDS: usize = 16;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

const PROFILE_SEED: &[u8] = b"profile";
const THREAD_SEED: &[u8] = b"thread";
const MESSAGE_SEED: &[u8] = b"message";
const GROUP_THREAD_SEED: &[u8] = b"group_thread";
const GROUP_MESSAGE_SEED: &[u8] = b"group_message";
const GROUP_INDEX_SEED: &[u8] = b"group_thread_index";
const SUBSCRIPTION_SEED: &[u8] = b"subscription";

/// Returns true if `bytes` decompress to a point on the Ed25519 curve.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    CompressedEdwardsY(*bytes).decompress().is_some()
}

fn check_seeds(seeds: &[&[u8]], max_seeds: usize) -> Result<(), Error> {
    if seeds.len() > max_seeds {
        return Err(Error::invalid(format!(
            "At most {max_seeds} seeds are allowed, got {}",
            seeds.len()
        )));
    }
    if let Some(seed) = seeds.iter().find(|seed| seed.len() > MAX_SEED_LEN) {
        return Err(Error::invalid(format!(
            "Seed of {} bytes exceeds the {MAX_SEED_LEN} byte limit",
            seed.len()
        )));
    }
    Ok(())
}

fn hash_seeds(seeds: &[&[u8]], program_id: &Pubkey) -> Option<Pubkey> {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);
    let hash: [u8; 32] = hasher.finalize().into();

    (!is_on_curve(&hash)).then(|| Pubkey::from(hash))
}

/// Hashes `seeds` with `program_id` into an address, failing if it lands on the curve.
///
/// The bump, if any, must already be the last element of `seeds`.
pub fn create_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<Pubkey, Error> {
    check_seeds(seeds, MAX_SEEDS)?;
    hash_seeds(seeds, program_id)
        .ok_or_else(|| Error::invalid("Seeds produce an on-curve address"))
}

/// Finds the off-curve address for `seeds`, trying bumps from 255 down to 0.
///
/// Returns the address together with the bump that produced it.
pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<(Pubkey, u8), Error> {
    check_seeds(seeds, MAX_SEEDS - 1)?;

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump = seeds.to_vec();
        with_bump.push(&bump_seed);

        if let Some(address) = hash_seeds(&with_bump, program_id) {
            return Ok((address, bump));
        }
    }

    Err(Error::invalid("No bump produces an off-curve address"))
}

/// Orders a pair of identities byte-lexicographically.
///
/// Thread and message addresses are always seeded with the canonical pair, so
/// `(a, b)` and `(b, a)` name the same conversation.
pub fn canonical_pair(a: &Pubkey, b: &Pubkey) -> (Pubkey, Pubkey) {
    if a <= b { (*a, *b) } else { (*b, *a) }
}

/// Address of `owner`'s profile.
pub fn profile_address(program_id: &Pubkey, owner: &Pubkey) -> Result<(Pubkey, u8), Error> {
    find_program_address(&[PROFILE_SEED, owner.as_ref()], program_id)
}

/// Address of the direct thread between `a` and `b`, in either order.
pub fn thread_address(program_id: &Pubkey, a: &Pubkey, b: &Pubkey) -> Result<(Pubkey, u8), Error> {
    let (first, second) = canonical_pair(a, b);
    find_program_address(&[THREAD_SEED, first.as_ref(), second.as_ref()], program_id)
}

/// Address of message `index` in the direct thread between `a` and `b`.
pub fn message_address(
    program_id: &Pubkey,
    index: u32,
    a: &Pubkey,
    b: &Pubkey,
) -> Result<(Pubkey, u8), Error> {
    let (first, second) = canonical_pair(a, b);
    let index = index.to_le_bytes();
    find_program_address(
        &[MESSAGE_SEED, &index, first.as_ref(), second.as_ref()],
        program_id,
    )
}

/// Address of the group called `group_name` owned by `owner`.
pub fn group_thread_address(
    program_id: &Pubkey,
    group_name: &str,
    owner: &Pubkey,
) -> Result<(Pubkey, u8), Error> {
    find_program_address(
        &[GROUP_THREAD_SEED, group_name.as_bytes(), owner.as_ref()],
        program_id,
    )
}

/// Address of message `index` in the group at `group`.
pub fn group_message_address(
    program_id: &Pubkey,
    index: u32,
    group: &Pubkey,
) -> Result<(Pubkey, u8), Error> {
    let index = index.to_le_bytes();
    find_program_address(&[GROUP_MESSAGE_SEED, &index, group.as_ref()], program_id)
}

/// Address of `owner`'s membership marker for the group at `group`.
pub fn group_index_address(
    program_id: &Pubkey,
    group_name: &str,
    owner: &Pubkey,
    group: &Pubkey,
) -> Result<(Pubkey, u8), Error> {
    find_program_address(
        &[
            GROUP_INDEX_SEED,
            group_name.as_bytes(),
            owner.as_ref(),
            group.as_ref(),
        ],
        program_id,
    )
}

/// Address of the edge "`subscriber` follows `subscribed_to`".
pub fn subscription_address(
    program_id: &Pubkey,
    subscriber: &Pubkey,
    subscribed_to: &Pubkey,
) -> Result<(Pubkey, u8), Error> {
    find_program_address(
        &[SUBSCRIPTION_SEED, subscriber.as_ref(), subscribed_to.as_ref()],
        program_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program_id() -> Pubkey {
        Pubkey::new_from_array([42u8; 32])
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let owner = Pubkey::new_from_array([1u8; 32]);
        let first = profile_address(&program_id(), &owner).unwrap();
        let second = profile_address(&program_id(), &owner).unwrap();

        assert_eq!(first, second);
        assert!(!is_on_curve(first.0.as_bytes()));
    }

    #[test]
    fn test_thread_address_ignores_argument_order() {
        let alice = Pubkey::new_from_array([3u8; 32]);
        let bob = Pubkey::new_from_array([9u8; 32]);

        assert_eq!(
            thread_address(&program_id(), &alice, &bob).unwrap(),
            thread_address(&program_id(), &bob, &alice).unwrap()
        );
        assert_eq!(
            message_address(&program_id(), 7, &alice, &bob).unwrap(),
            message_address(&program_id(), 7, &bob, &alice).unwrap()
        );
    }

    #[test]
    fn test_message_addresses_are_unique_per_index() {
        let alice = Pubkey::new_from_array([3u8; 32]);
        let bob = Pubkey::new_from_array([9u8; 32]);

        let first = message_address(&program_id(), 0, &alice, &bob).unwrap();
        let second = message_address(&program_id(), 1, &alice, &bob).unwrap();
        assert_ne!(first.0, second.0);
    }

    #[test]
    fn test_program_id_changes_address() {
        let owner = Pubkey::new_from_array([1u8; 32]);
        let other_program = Pubkey::new_from_array([43u8; 32]);

        assert_ne!(
            profile_address(&program_id(), &owner).unwrap().0,
            profile_address(&other_program, &owner).unwrap().0
        );
    }

    #[test]
    fn test_rejects_long_group_name() {
        let owner = Pubkey::new_from_array([1u8; 32]);
        let name = "x".repeat(MAX_SEED_LEN + 1);

        assert!(matches!(
            group_thread_address(&program_id(), &name, &owner),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rejects_too_many_seeds() {
        let seeds: Vec<&[u8]> = vec![b"s".as_slice(); MAX_SEEDS];

        assert!(matches!(
            find_program_address(&seeds, &program_id()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_create_matches_find() {
        let owner = Pubkey::new_from_array([5u8; 32]);
        let (address, bump) = profile_address(&program_id(), &owner).unwrap();

        let recreated =
            create_program_address(&[PROFILE_SEED, owner.as_ref(), &[bump]], &program_id()).unwrap();
        assert_eq!(recreated, address);
    }

    #[test]
    fn test_find_returns_highest_off_curve_bump() {
        for byte in 0..32u8 {
            let owner = Pubkey::new_from_array([byte; 32]);
            let (address, bump) = profile_address(&program_id(), &owner).unwrap();

            for higher in bump.saturating_add(1)..=u8::MAX {
                if higher == bump {
                    continue;
                }
                assert!(
                    create_program_address(&[PROFILE_SEED, owner.as_ref(), &[higher]], &program_id())
                        .is_err()
                );
            }
            assert_eq!(
                create_program_address(&[PROFILE_SEED, owner.as_ref(), &[bump]], &program_id()),
                Ok(address)
            );
        }
    }
}
