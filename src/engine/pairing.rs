//! Pairing engine.
//!
//! Shuffles the ranked pool uniformly and pairs position `i` with
//! position `n - 1 - i`. The slot indices handed to each matchup are those
//! positions, so every pair's slots sum to `n - 1`.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::types::{DuelError, DuelResult, Pairing, RankedEntity};

/// Pair `entities` into `pool_size / 2` matchups.
///
/// Fails with `InvalidPoolSize` unless the input holds exactly
/// `pool_size` entities and that count is even and non-zero.
pub fn pair_entities<R: Rng + ?Sized>(
    mut entities: Vec<RankedEntity>,
    pool_size: usize,
    rng: &mut R,
) -> DuelResult<Vec<Pairing>> {
    let n = entities.len();
    if n != pool_size || n == 0 || n % 2 != 0 {
        return Err(DuelError::InvalidPoolSize {
            expected: pool_size,
            actual: n,
        });
    }

    // Fisher-Yates.
    entities.shuffle(rng);

    let mut back = entities.split_off(n / 2);
    back.reverse();

    let pairs = entities
        .into_iter()
        .zip(back)
        .enumerate()
        .map(|(i, (home, away))| Pairing {
            home,
            away,
            assigned_home: i,
            assigned_away: n - 1 - i,
        })
        .collect();

    Ok(pairs)
}
