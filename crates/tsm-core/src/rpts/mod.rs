use rayon::prelude::*;
use tracing::debug;

use crate::lottery::Lottery;
use crate::matching::Matching;
use crate::profile::StrictProfile;
use crate::rand_source::{RandomSource, SeededRng};
use crate::stability::find_blocking_pair_randomized;

/// One decentralized run: start with everyone unmatched and repeatedly let a
/// randomly-located blocking pair defect into a match with each other,
/// dissolving whatever engagements the two of them held. The run halts when
/// no blocking pair remains; Roth–Vande Vate (1990) guarantees this happens
/// almost surely under any random selection policy. No round cap is imposed
/// here; callers wanting bounded latency must treat a long run as
/// non-convergence externally.
pub fn single_trial<R: RandomSource>(profile: &StrictProfile, rng: &mut R) -> Matching {
    let mut matching = Matching::empty(profile.proposer_count(), profile.receiver_count());
    let mut rounds = 0usize;
    while let Some((p, r)) = find_blocking_pair_randomized(&matching, profile, rng) {
        matching.engage(p, r);
        rounds += 1;
    }
    debug!(rounds, "random path reached a stable matching");
    matching
}

/// Runs `trials` independent decentralized processes and aggregates the
/// stable matchings they reach into a lottery (deduplicated, with counts).
pub fn random_path_to_stability_with<R: RandomSource>(
    profile: &StrictProfile,
    trials: usize,
    rng: &mut R,
) -> Lottery {
    Lottery::from_matchings((0..trials).map(|_| single_trial(profile, rng)))
}

/// Same lottery, with trials fanned out across rayon workers. Every trial
/// owns an independent random stream forked from `seed`, and aggregation
/// happens only after all trials complete, so the result is reproducible
/// from the seed alone.
pub fn random_path_to_stability_parallel(
    profile: &StrictProfile,
    trials: usize,
    seed: u64,
) -> Lottery {
    let base = SeededRng::new(seed);
    let matchings: Vec<Matching> = (0..trials as u64)
        .into_par_iter()
        .map(|trial| {
            let mut rng = base.fork(trial);
            single_trial(profile, &mut rng)
        })
        .collect();
    Lottery::from_matchings(matchings)
}
