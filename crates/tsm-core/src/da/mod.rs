use tracing::debug;

use crate::matching::Matching;
use crate::profile::{ProposerId, StrictProfile};

/// Gale–Shapley Deferred Acceptance over a strict profile.
///
/// Round-based fixpoint: every proposer without a tentative hold proposes to
/// the next receiver on their list; each receiver keeps only the
/// highest-ranked acceptable proposal among held and new ones and rejects
/// the rest; rejected proposers advance their pointer. The process stops
/// when no proposer can propose: either everyone is held or every unheld
/// proposer has exhausted their list.
///
/// The result is the proposer-optimal (receiver-pessimal) stable matching
/// for the profile. The function is pure: identical profiles produce
/// identical matchings.
pub fn deferred_acceptance(profile: &StrictProfile) -> Matching {
    let proposer_count = profile.proposer_count();
    let receiver_count = profile.receiver_count();

    // next receiver to propose to, per proposer
    let mut pointer = vec![0usize; proposer_count];
    // tentative hold, per receiver
    let mut held: Vec<Option<ProposerId>> = vec![None; receiver_count];
    // mirror of `held` from the proposer side
    let mut engaged = vec![false; proposer_count];

    let mut rounds = 0usize;
    loop {
        rounds += 1;
        let mut proposed = false;
        for idx in 0..proposer_count {
            if engaged[idx] {
                continue;
            }
            let p = ProposerId(idx);
            let Some(&r) = profile.proposer_prefs(p).get(pointer[idx]) else {
                // list exhausted, p stays unmatched
                continue;
            };
            pointer[idx] += 1;
            proposed = true;
            // an unacceptable proposal is rejected outright; the proposer
            // advances to their next choice on the following round
            let Some(rank) = profile.receiver_rank(r, p) else {
                continue;
            };
            match held[r.0] {
                None => {
                    held[r.0] = Some(p);
                    engaged[idx] = true;
                }
                Some(current) => {
                    // a held proposal always has a rank on r's list
                    let current_rank = profile.receiver_rank(r, current);
                    if current_rank.is_none_or(|cur| rank < cur) {
                        held[r.0] = Some(p);
                        engaged[idx] = true;
                        engaged[current.0] = false;
                    }
                }
            }
        }
        if !proposed {
            break;
        }
    }

    debug!(rounds, "deferred acceptance converged");
    Matching::from_holds(&held, proposer_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{RawPref, StrictProfile};

    fn profile(
        proposers: Vec<(&str, RawPref)>,
        receivers: Vec<(&str, RawPref)>,
    ) -> StrictProfile {
        StrictProfile::new(proposers, receivers).unwrap()
    }

    fn partner(profile: &StrictProfile, matching: &Matching, proposer: &str) -> Option<String> {
        let p = profile.roster().proposer(proposer).unwrap();
        matching
            .partner_of_proposer(p)
            .map(|r| profile.roster().receiver_name(r).to_string())
    }

    #[test]
    fn resolves_contested_first_choice() {
        // X holds B over A, so A falls through to Y.
        let profile = profile(
            vec![
                ("A", RawPref::from(["X", "Y"])),
                ("B", RawPref::from(["X", "Y"])),
            ],
            vec![
                ("X", RawPref::from(["B", "A"])),
                ("Y", RawPref::from(["A", "B"])),
            ],
        );
        let matching = deferred_acceptance(&profile);
        assert_eq!(partner(&profile, &matching, "A").as_deref(), Some("Y"));
        assert_eq!(partner(&profile, &matching, "B").as_deref(), Some("X"));
    }

    #[test]
    fn exhausted_proposer_stays_unmatched() {
        let profile = profile(
            vec![("A", RawPref::from("X")), ("B", RawPref::from("X"))],
            vec![("X", RawPref::from(["A", "B"]))],
        );
        let matching = deferred_acceptance(&profile);
        assert_eq!(partner(&profile, &matching, "A").as_deref(), Some("X"));
        assert_eq!(partner(&profile, &matching, "B"), None);
    }

    #[test]
    fn unacceptable_proposals_are_rejected() {
        // X never holds B's proposal because B is not on X's list.
        let profile = profile(
            vec![("A", RawPref::from(["X"])), ("B", RawPref::from(["X"]))],
            vec![("X", RawPref::from(["A"]))],
        );
        let matching = deferred_acceptance(&profile);
        assert_eq!(partner(&profile, &matching, "A").as_deref(), Some("X"));
        assert_eq!(partner(&profile, &matching, "B"), None);
    }

    #[test]
    fn empty_preference_list_never_proposes() {
        let profile = profile(
            vec![("A", RawPref::list(Vec::<&str>::new()))],
            vec![("X", RawPref::from("A"))],
        );
        let matching = deferred_acceptance(&profile);
        assert_eq!(partner(&profile, &matching, "A"), None);
    }

    #[test]
    fn rejection_chain_cascades() {
        // B displaces A at X, A displaces C at Y, C ends at Z.
        let profile = profile(
            vec![
                ("A", RawPref::from(["X", "Y", "Z"])),
                ("B", RawPref::from(["X", "Y", "Z"])),
                ("C", RawPref::from(["Y", "Z", "X"])),
            ],
            vec![
                ("X", RawPref::from(["B", "A", "C"])),
                ("Y", RawPref::from(["A", "C", "B"])),
                ("Z", RawPref::from(["C", "A", "B"])),
            ],
        );
        let matching = deferred_acceptance(&profile);
        assert_eq!(partner(&profile, &matching, "A").as_deref(), Some("Y"));
        assert_eq!(partner(&profile, &matching, "B").as_deref(), Some("X"));
        assert_eq!(partner(&profile, &matching, "C").as_deref(), Some("Z"));
    }
}
