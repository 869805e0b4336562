use tracing::debug;

use crate::error::{MatchError, Result};
use crate::matching::Matching;
use crate::profile::{ProposerId, ReceiverId, WeakProfile};

/// Removes the Pareto-inefficiency a tie-break can leave behind: proposers
/// trading receivers around a cycle so that every participant lands with a
/// receiver they strictly prefer under the true weak preferences, without
/// creating a blocking pair.
///
/// Each pass rebuilds, from scratch, the improvement graph (which receivers
/// every married proposer strictly prefers to their partner, and per
/// receiver the most-preferred set of proposers currently pointing at it),
/// then resolves every directed cycle it finds by simultaneous reassignment.
/// Passes repeat until one finds no cycle. Applying the function to a
/// cycle-free matching returns it unchanged.
pub fn stable_improvement_cycle(matching: &Matching, weak: &WeakProfile) -> Result<Matching> {
    if matching.proposer_count() != weak.proposer_count()
        || matching.receiver_count() != weak.receiver_count()
    {
        return Err(MatchError::IncompatiblePreferences {
            detail: format!(
                "matching covers {}x{} agents but the profile has {}x{}",
                matching.proposer_count(),
                matching.receiver_count(),
                weak.proposer_count(),
                weak.receiver_count()
            ),
        });
    }

    let mut current = matching.clone();
    let mut passes = 0usize;
    loop {
        passes += 1;
        let reassignments = improvement_pass(&current, weak);
        if reassignments.is_empty() {
            break;
        }
        debug!(passes, cycles_resolved = reassignments.len(), "improvement pass");
        current.reassign(&reassignments);
    }
    Ok(current)
}

// One pass: build the improvement graph and harvest every cycle in it.
// Returns the simultaneous reassignments, empty when the matching is
// cycle-free.
fn improvement_pass(matching: &Matching, weak: &WeakProfile) -> Vec<(ProposerId, ReceiverId)> {
    let proposer_count = weak.proposer_count();
    let receiver_count = weak.receiver_count();

    // receivers each married proposer strictly prefers (by true tier depth)
    // to their current partner, best tiers first
    let mut better: Vec<Vec<ReceiverId>> = vec![Vec::new(); proposer_count];
    for (p, partner) in matching.proposers() {
        let Some(r_cur) = partner else { continue };
        let Some(cur_depth) = weak.proposer_tier_rank(p, r_cur) else {
            continue;
        };
        for (depth, tier) in weak.proposer_tiers(p).iter().enumerate() {
            if depth as u32 >= cur_depth {
                break;
            }
            better[p.0].extend(tier.iter().copied());
        }
    }

    // a receiver can only take part in a cycle alongside its own proposer,
    // so only receivers whose proposer wants to move collect pointers
    let mut pointers: Vec<Vec<ProposerId>> = vec![Vec::new(); receiver_count];
    for idx in 0..proposer_count {
        if better[idx].is_empty() {
            continue;
        }
        for &r in &better[idx] {
            let participates = matching
                .partner_of_receiver(r)
                .is_some_and(|q| !better[q.0].is_empty());
            if participates {
                pointers[r.0].push(ProposerId(idx));
            }
        }
    }

    // dominant set: the pointers the receiver likes best, whole top tier at
    // a time; pointers the receiver does not rank never enter
    let mut dominant: Vec<Vec<ProposerId>> = vec![Vec::new(); receiver_count];
    for r_idx in 0..receiver_count {
        let r = ReceiverId(r_idx);
        let best_depth = pointers[r_idx]
            .iter()
            .filter_map(|&p| weak.receiver_tier_rank(r, p))
            .min();
        if let Some(best_depth) = best_depth {
            dominant[r_idx] = pointers[r_idx]
                .iter()
                .copied()
                .filter(|&p| weak.receiver_tier_rank(r, p) == Some(best_depth))
                .collect();
        }
    }

    harvest_cycles(matching, &better, &dominant)
}

// Walks pointer chains proposer -> preferred receiver -> that receiver's
// proposer -> ... A proposer seen twice closes a cycle, which is claimed
// immediately; a proposer with nowhere left to point is dropped from the
// pass together with its partial chain.
fn harvest_cycles(
    matching: &Matching,
    better: &[Vec<ReceiverId>],
    dominant: &[Vec<ProposerId>],
) -> Vec<(ProposerId, ReceiverId)> {
    let proposer_count = better.len();
    let receiver_count = dominant.len();

    let mut alive: Vec<bool> = better.iter().map(|list| !list.is_empty()).collect();
    let mut claimed = vec![false; receiver_count];
    let mut on_path: Vec<Option<usize>> = vec![None; proposer_count];
    let mut assigned: Vec<(ProposerId, ReceiverId)> = Vec::new();

    for start in 0..proposer_count {
        if !alive[start] {
            continue;
        }
        let mut path: Vec<ProposerId> = vec![ProposerId(start)];
        let mut targets: Vec<ReceiverId> = Vec::new();
        on_path[start] = Some(0);

        while let Some(&tail) = path.last() {
            let choice = better[tail.0].iter().copied().find_map(|r| {
                if claimed[r.0] || !dominant[r.0].contains(&tail) {
                    return None;
                }
                matching
                    .partner_of_receiver(r)
                    .filter(|q| alive[q.0])
                    .map(|q| (r, q))
            });
            match choice {
                None => {
                    // dead end: retire the tail and let its predecessor
                    // choose again
                    alive[tail.0] = false;
                    on_path[tail.0] = None;
                    path.pop();
                    targets.pop();
                }
                Some((r, q)) => match on_path[q.0] {
                    Some(cycle_start) => {
                        targets.push(r);
                        for i in cycle_start..path.len() {
                            assigned.push((path[i], targets[i]));
                            claimed[targets[i].0] = true;
                            alive[path[i].0] = false;
                            on_path[path[i].0] = None;
                        }
                        // the proposer just before the cycle pointed at a
                        // receiver the cycle now claims; it chooses anew
                        path.truncate(cycle_start);
                        targets.truncate(cycle_start.saturating_sub(1));
                    }
                    None => {
                        targets.push(r);
                        on_path[q.0] = Some(path.len());
                        path.push(q);
                    }
                },
            }
        }
    }

    assigned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::da::deferred_acceptance;
    use crate::profile::{RawPref, RawTier, StrictProfile};
    use crate::stability::{is_stable, Stability};
    use crate::tiebreak::break_ties_with_priority;

    // A market where the tie-break priority [B, C, A] forces A and B into
    // each other's second choices while Y is truly indifferent between all
    // three proposers.
    fn crossed_market() -> (WeakProfile, StrictProfile) {
        let weak = WeakProfile::new(
            [
                ("A", RawPref::from(["Y", "X"])),
                ("B", RawPref::from(["X", "Y"])),
                ("C", RawPref::from(["Y", "Z"])),
            ],
            [
                ("X", RawPref::from(["A", "B"])),
                ("Y", RawPref::tiers([RawTier::tie(["A", "B", "C"])])),
                ("Z", RawPref::from("C")),
            ],
        )
        .unwrap();
        let b = weak.roster().proposer("B").unwrap();
        let c = weak.roster().proposer("C").unwrap();
        let a = weak.roster().proposer("A").unwrap();
        let receivers: Vec<_> = (0..weak.receiver_count()).map(ReceiverId).collect();
        let strict = break_ties_with_priority(&weak, &[b, c, a], &receivers);
        (weak, strict)
    }

    fn partner(weak: &WeakProfile, matching: &Matching, proposer: &str) -> Option<String> {
        let p = weak.roster().proposer(proposer).unwrap();
        matching
            .partner_of_proposer(p)
            .map(|r| weak.roster().receiver_name(r).to_string())
    }

    #[test]
    fn resolves_the_crossed_cycle() {
        let (weak, strict) = crossed_market();
        let da = deferred_acceptance(&strict);
        // the tie-break leaves A and B crossed
        assert_eq!(partner(&weak, &da, "A").as_deref(), Some("X"));
        assert_eq!(partner(&weak, &da, "B").as_deref(), Some("Y"));
        assert_eq!(partner(&weak, &da, "C").as_deref(), Some("Z"));

        let improved = stable_improvement_cycle(&da, &weak).unwrap();
        assert_eq!(partner(&weak, &improved, "A").as_deref(), Some("Y"));
        assert_eq!(partner(&weak, &improved, "B").as_deref(), Some("X"));
        assert_eq!(partner(&weak, &improved, "C").as_deref(), Some("Z"));

        // still stable under the true weak preferences, witnessed by the
        // tie-break that ranks the new partners first
        let a = weak.roster().proposer("A").unwrap();
        let b = weak.roster().proposer("B").unwrap();
        let c = weak.roster().proposer("C").unwrap();
        let receivers: Vec<_> = (0..weak.receiver_count()).map(ReceiverId).collect();
        let witness = break_ties_with_priority(&weak, &[a, b, c], &receivers);
        assert_eq!(is_stable(&improved, &witness).unwrap(), Stability::Stable);
    }

    #[test]
    fn idempotent_on_cycle_free_matchings() {
        let (weak, strict) = crossed_market();
        let improved = stable_improvement_cycle(&deferred_acceptance(&strict), &weak).unwrap();
        let again = stable_improvement_cycle(&improved, &weak).unwrap();
        assert_eq!(improved, again);
    }

    #[test]
    fn leaves_singles_alone() {
        let weak = WeakProfile::new(
            [("A", RawPref::from("X")), ("B", RawPref::from("X"))],
            [("X", RawPref::from(["A", "B"]))],
        )
        .unwrap();
        let strict = StrictProfile::new(
            [("A", RawPref::from("X")), ("B", RawPref::from("X"))],
            [("X", RawPref::from(["A", "B"]))],
        )
        .unwrap();
        let da = deferred_acceptance(&strict);
        let improved = stable_improvement_cycle(&da, &weak).unwrap();
        assert_eq!(da, improved);
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        let (weak, _) = crossed_market();
        let err = stable_improvement_cycle(&Matching::empty(1, 1), &weak).unwrap_err();
        assert!(matches!(err, MatchError::IncompatiblePreferences { .. }));
    }
}
