use rayon::prelude::*;

use crate::da::deferred_acceptance;
use crate::error::{MatchError, Result};
use crate::lottery::Lottery;
use crate::matching::Matching;
use crate::profile::{ProposerId, ReceiverId, StrictProfile, WeakProfile};
use crate::rand_source::{RandomSource, SeededRng};
use crate::sic::stable_improvement_cycle;

/// Expands a weak profile into a strict one using explicit priority orders.
///
/// Each indifference tier in a proposer's list is rewritten in the relative
/// order of `receiver_priority`; each tier in a receiver's list follows
/// `proposer_priority`. Singleton entries pass through unchanged. This is
/// the deterministic core of the tie-breaking layer; the random layer only
/// supplies uniformly drawn permutations.
pub fn break_ties_with_priority(
    weak: &WeakProfile,
    proposer_priority: &[ProposerId],
    receiver_priority: &[ReceiverId],
) -> StrictProfile {
    let mut proposer_position = vec![usize::MAX; weak.proposer_count()];
    for (position, p) in proposer_priority.iter().enumerate() {
        proposer_position[p.0] = position;
    }
    let mut receiver_position = vec![usize::MAX; weak.receiver_count()];
    for (position, r) in receiver_priority.iter().enumerate() {
        receiver_position[r.0] = position;
    }

    let proposer_prefs: Vec<Vec<ReceiverId>> = (0..weak.proposer_count())
        .map(|idx| {
            flatten_tiers(weak.proposer_tiers(ProposerId(idx)), |r| {
                receiver_position[r.0]
            })
        })
        .collect();
    let receiver_prefs: Vec<Vec<ProposerId>> = (0..weak.receiver_count())
        .map(|idx| {
            flatten_tiers(weak.receiver_tiers(ReceiverId(idx)), |p| {
                proposer_position[p.0]
            })
        })
        .collect();

    StrictProfile::from_parts(weak.roster().clone(), proposer_prefs, receiver_prefs)
}

fn flatten_tiers<T: Copy, F>(tiers: &[Vec<T>], position: F) -> Vec<T>
where
    F: Fn(T) -> usize,
{
    let mut flat = Vec::with_capacity(tiers.iter().map(Vec::len).sum());
    for tier in tiers {
        let mut ordered = tier.clone();
        ordered.sort_by_key(|&agent| position(agent));
        flat.extend(ordered);
    }
    flat
}

/// Draws one uniformly random priority order per side and expands the weak
/// profile with them. Repeated calls with independent draws produce
/// independent strict profiles.
pub fn break_ties<R: RandomSource>(weak: &WeakProfile, rng: &mut R) -> StrictProfile {
    let mut proposer_priority: Vec<ProposerId> =
        (0..weak.proposer_count()).map(ProposerId).collect();
    let mut receiver_priority: Vec<ReceiverId> =
        (0..weak.receiver_count()).map(ReceiverId).collect();
    rng.shuffle(&mut proposer_priority);
    rng.shuffle(&mut receiver_priority);
    break_ties_with_priority(weak, &proposer_priority, &receiver_priority)
}

fn one_trial<R: RandomSource>(weak: &WeakProfile, apply_sic: bool, rng: &mut R) -> Matching {
    let strict = break_ties(weak, rng);
    let matching = deferred_acceptance(&strict);
    if apply_sic {
        // dimensions always agree: the matching came from this profile
        stable_improvement_cycle(&matching, weak).unwrap_or(matching)
    } else {
        matching
    }
}

/// Tie-broken deferred acceptance, repeated over independent priority
/// draws. Each trial expands the weak profile with fresh priority orders,
/// runs the proposer-optimal engine and, when `apply_sic` is set,
/// post-processes the outcome with the stable improvement cycle. The trial
/// outcomes aggregate into a lottery.
pub fn random_deferred_acceptance_with<R: RandomSource>(
    weak: &WeakProfile,
    trials: usize,
    apply_sic: bool,
    rng: &mut R,
) -> Lottery {
    Lottery::from_matchings((0..trials).map(|_| one_trial(weak, apply_sic, rng)))
}

/// Rayon twin of [`random_deferred_acceptance_with`]: one forked random
/// stream per trial, aggregation after all trials complete.
pub fn random_deferred_acceptance_parallel(
    weak: &WeakProfile,
    trials: usize,
    apply_sic: bool,
    seed: u64,
) -> Lottery {
    let base = SeededRng::new(seed);
    let matchings: Vec<Matching> = (0..trials as u64)
        .into_par_iter()
        .map(|trial| {
            let mut rng = base.fork(trial);
            one_trial(weak, apply_sic, &mut rng)
        })
        .collect();
    Lottery::from_matchings(matchings)
}

/// One outcome of the exhaustive priority sweep: the proposer priority
/// order used and the matching it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TiebreakOutcome {
    pub priority: Vec<String>,
    pub matching: Matching,
}

/// Enumerates every proposer priority order, tie-breaking the receiver side
/// only, and records the matching each order produces. The proposer side
/// must already be strict; a proposer tie fails with
/// [`MatchError::NotStrict`]. Factorial in the number of proposers: meant
/// for studying small markets exhaustively rather than sampling them.
pub fn receiver_tiebreak_sweep(
    weak: &WeakProfile,
    apply_sic: bool,
) -> Result<Vec<TiebreakOutcome>> {
    for idx in 0..weak.proposer_count() {
        let p = ProposerId(idx);
        for tier in weak.proposer_tiers(p) {
            if tier.len() > 1 {
                return Err(MatchError::NotStrict {
                    agent: weak.roster().proposer_name(p).to_string(),
                    tier: tier
                        .iter()
                        .map(|&r| weak.roster().receiver_name(r).to_string())
                        .collect(),
                });
            }
        }
    }

    let receiver_identity: Vec<ReceiverId> =
        (0..weak.receiver_count()).map(ReceiverId).collect();
    let mut outcomes = Vec::new();
    let mut priority: Vec<ProposerId> = (0..weak.proposer_count()).map(ProposerId).collect();

    // Heap's algorithm, iterative form
    let mut counters = vec![0usize; priority.len()];
    let mut record = |priority: &[ProposerId]| {
        let strict = break_ties_with_priority(weak, priority, &receiver_identity);
        let matching = if apply_sic {
            let da = deferred_acceptance(&strict);
            stable_improvement_cycle(&da, weak).unwrap_or(da)
        } else {
            deferred_acceptance(&strict)
        };
        outcomes.push(TiebreakOutcome {
            priority: priority
                .iter()
                .map(|&p| weak.roster().proposer_name(p).to_string())
                .collect(),
            matching,
        });
    };
    record(&priority);
    let mut i = 1;
    while i < priority.len() {
        if counters[i] < i {
            if i % 2 == 0 {
                priority.swap(0, i);
            } else {
                priority.swap(counters[i], i);
            }
            record(&priority);
            counters[i] += 1;
            i = 1;
        } else {
            counters[i] = 0;
            i += 1;
        }
    }

    Ok(outcomes)
}
