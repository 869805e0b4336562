use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};
use crate::matching::Matching;
use crate::profile::{ProposerId, ReceiverId, StrictProfile};
use crate::rand_source::RandomSource;

/// A witnessing pair for an unstable matching: both agents would rather
/// defect into a match with each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingPair {
    pub proposer: String,
    pub receiver: String,
}

/// Verdict of the stability verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stability {
    Stable,
    Blocked(BlockingPair),
}

impl Stability {
    pub fn is_stable(&self) -> bool {
        matches!(self, Stability::Stable)
    }
}

/// Checks `matching` for stability against `profile`.
///
/// Verifies the partial-bijection invariant and the alignment between the
/// matching and the profile first, then searches for a blocking pair in two
/// passes: married couples (each married proposer against every receiver
/// strictly preferred to their partner), then singles (every unmatched agent
/// of either side against their whole list). Returns the first witness
/// found.
pub fn is_stable(matching: &Matching, profile: &StrictProfile) -> Result<Stability> {
    validate(matching, profile)?;
    let witness = married_pass(matching, profile).or_else(|| singles_pass(matching, profile));
    Ok(match witness {
        None => Stability::Stable,
        Some((p, r)) => Stability::Blocked(BlockingPair {
            proposer: profile.roster().proposer_name(p).to_string(),
            receiver: profile.roster().receiver_name(r).to_string(),
        }),
    })
}

fn validate(matching: &Matching, profile: &StrictProfile) -> Result<()> {
    if matching.proposer_count() != profile.proposer_count()
        || matching.receiver_count() != profile.receiver_count()
    {
        return Err(MatchError::IncompatiblePreferences {
            detail: format!(
                "matching covers {}x{} agents but the profile has {}x{}",
                matching.proposer_count(),
                matching.receiver_count(),
                profile.proposer_count(),
                profile.receiver_count()
            ),
        });
    }
    if !matching.mirror_consistent() {
        return mirror_error(matching, profile);
    }
    for (p, partner) in matching.proposers() {
        let Some(r) = partner else { continue };
        if profile.proposer_rank(p, r).is_none() {
            return Err(MatchError::IncompatiblePreferences {
                detail: format!(
                    "{}, who is matched to {}, is not on {}'s preference list",
                    profile.roster().receiver_name(r),
                    profile.roster().proposer_name(p),
                    profile.roster().proposer_name(p)
                ),
            });
        }
        if profile.receiver_rank(r, p).is_none() {
            return Err(MatchError::IncompatiblePreferences {
                detail: format!(
                    "{}, who is matched to {}, is not on {}'s preference list",
                    profile.roster().proposer_name(p),
                    profile.roster().receiver_name(r),
                    profile.roster().receiver_name(r)
                ),
            });
        }
    }
    Ok(())
}

// A matching whose two directions disagree was not produced by this crate's
// constructors; report the collision it implies.
fn mirror_error(matching: &Matching, profile: &StrictProfile) -> Result<()> {
    for (p, partner) in matching.proposers() {
        let Some(r) = partner else { continue };
        match matching.partner_of_receiver(r) {
            Some(q) if q != p => {
                return Err(MatchError::NotAMatching {
                    agent: profile.roster().receiver_name(r).to_string(),
                    first: profile.roster().proposer_name(q).to_string(),
                    second: profile.roster().proposer_name(p).to_string(),
                })
            }
            _ => {}
        }
    }
    Err(MatchError::IncompatiblePreferences {
        detail: "the two sides of the matching disagree".to_string(),
    })
}

// Would receiver `r` leave its current situation for proposer `p`?
fn receiver_accepts(
    matching: &Matching,
    profile: &StrictProfile,
    r: ReceiverId,
    p: ProposerId,
) -> bool {
    let Some(rank) = profile.receiver_rank(r, p) else {
        return false;
    };
    match matching.partner_of_receiver(r) {
        None => true,
        Some(current) => match profile.receiver_rank(r, current) {
            Some(current_rank) => rank < current_rank,
            None => true,
        },
    }
}

// Would proposer `p` leave its current situation for receiver `r`?
fn proposer_accepts(
    matching: &Matching,
    profile: &StrictProfile,
    p: ProposerId,
    r: ReceiverId,
) -> bool {
    let Some(rank) = profile.proposer_rank(p, r) else {
        return false;
    };
    match matching.partner_of_proposer(p) {
        None => true,
        Some(current) => match profile.proposer_rank(p, current) {
            Some(current_rank) => rank < current_rank,
            None => true,
        },
    }
}

fn married_pass(matching: &Matching, profile: &StrictProfile) -> Option<(ProposerId, ReceiverId)> {
    for (p, partner) in matching.proposers() {
        let Some(r_cur) = partner else { continue };
        if let Some(pair) = married_candidates(matching, profile, p, r_cur, None) {
            return Some(pair);
        }
    }
    None
}

// Scans the receivers proposer `p` strictly prefers to its partner, in the
// given order (or list order when no order is supplied).
fn married_candidates(
    matching: &Matching,
    profile: &StrictProfile,
    p: ProposerId,
    r_cur: ReceiverId,
    order: Option<&[ReceiverId]>,
) -> Option<(ProposerId, ReceiverId)> {
    let cut = profile.proposer_rank(p, r_cur)? as usize;
    let better = &profile.proposer_prefs(p)[..cut];
    let scan: &[ReceiverId] = order.unwrap_or(better);
    scan.iter()
        .find(|&&r| receiver_accepts(matching, profile, r, p))
        .map(|&r| (p, r))
}

fn singles_pass(matching: &Matching, profile: &StrictProfile) -> Option<(ProposerId, ReceiverId)> {
    for (p, partner) in matching.proposers() {
        if partner.is_some() {
            continue;
        }
        for &r in profile.proposer_prefs(p) {
            if receiver_accepts(matching, profile, r, p) {
                return Some((p, r));
            }
        }
    }
    for (r, partner) in matching.receivers() {
        if partner.is_some() {
            continue;
        }
        for &p in profile.receiver_prefs(r) {
            if proposer_accepts(matching, profile, p, r) {
                return Some((p, r));
            }
        }
    }
    None
}

/// Blocking-pair search with randomized traversal: the order of the two
/// passes, of the agents within a pass, and of each candidate list are all
/// drawn from `rng`. The verdict is the same as the deterministic search;
/// only which witness is returned differs. Used by the random path to
/// stability.
pub(crate) fn find_blocking_pair_randomized<R: RandomSource>(
    matching: &Matching,
    profile: &StrictProfile,
    rng: &mut R,
) -> Option<(ProposerId, ReceiverId)> {
    if rng.coin() {
        married_pass_randomized(matching, profile, rng)
            .or_else(|| singles_pass_randomized(matching, profile, rng))
    } else {
        singles_pass_randomized(matching, profile, rng)
            .or_else(|| married_pass_randomized(matching, profile, rng))
    }
}

fn married_pass_randomized<R: RandomSource>(
    matching: &Matching,
    profile: &StrictProfile,
    rng: &mut R,
) -> Option<(ProposerId, ReceiverId)> {
    let mut married: Vec<(ProposerId, ReceiverId)> = matching
        .proposers()
        .filter_map(|(p, partner)| partner.map(|r| (p, r)))
        .collect();
    rng.shuffle(&mut married);
    for (p, r_cur) in married {
        let Some(cut) = profile.proposer_rank(p, r_cur) else {
            continue;
        };
        let cut = cut as usize;
        let mut better: Vec<ReceiverId> = profile.proposer_prefs(p)[..cut].to_vec();
        rng.shuffle(&mut better);
        if let Some(pair) = married_candidates(matching, profile, p, r_cur, Some(&better)) {
            return Some(pair);
        }
    }
    None
}

enum Single {
    P(ProposerId),
    R(ReceiverId),
}

fn singles_pass_randomized<R: RandomSource>(
    matching: &Matching,
    profile: &StrictProfile,
    rng: &mut R,
) -> Option<(ProposerId, ReceiverId)> {
    let mut singles: Vec<Single> = matching
        .proposers()
        .filter(|(_, partner)| partner.is_none())
        .map(|(p, _)| Single::P(p))
        .chain(
            matching
                .receivers()
                .filter(|(_, partner)| partner.is_none())
                .map(|(r, _)| Single::R(r)),
        )
        .collect();
    rng.shuffle(&mut singles);
    for single in singles {
        match single {
            Single::P(p) => {
                let mut candidates = profile.proposer_prefs(p).to_vec();
                rng.shuffle(&mut candidates);
                for r in candidates {
                    if receiver_accepts(matching, profile, r, p) {
                        return Some((p, r));
                    }
                }
            }
            Single::R(r) => {
                let mut candidates = profile.receiver_prefs(r).to_vec();
                rng.shuffle(&mut candidates);
                for p in candidates {
                    if proposer_accepts(matching, profile, p, r) {
                        return Some((p, r));
                    }
                }
            }
        }
    }
    None
}
