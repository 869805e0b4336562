use tsm_core::{
    is_stable, preferences, BlockingPair, MatchError, Matching, RawPref, Stability,
};

#[test]
fn double_claim_names_the_collision() {
    let profile = preferences(
        [("A", RawPref::from("X")), ("B", RawPref::from("X"))],
        [("X", RawPref::from(["A", "B"]))],
    )
    .unwrap();
    let err = Matching::from_pairs([("A", "X"), ("B", "X")], profile.roster()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "this is not a matching: X is matched with both A and B at the same time"
    );
}

#[test]
fn witness_is_an_actual_blocking_pair() {
    let profile = preferences(
        [
            ("A", RawPref::from(["X", "Y", "Z"])),
            ("B", RawPref::from(["Y", "X", "Z"])),
            ("C", RawPref::from(["X", "Z", "Y"])),
        ],
        [
            ("X", RawPref::from(["C", "A", "B"])),
            ("Y", RawPref::from(["A", "B", "C"])),
            ("Z", RawPref::from(["B", "C", "A"])),
        ],
    )
    .unwrap();
    // give everyone their worst listed partner
    let matching =
        Matching::from_pairs([("A", "Z"), ("B", "X"), ("C", "Y")], profile.roster()).unwrap();
    let Stability::Blocked(BlockingPair { proposer, receiver }) =
        is_stable(&matching, &profile).unwrap()
    else {
        panic!("matching must be unstable");
    };
    let p = profile.roster().proposer(&proposer).unwrap();
    let r = profile.roster().receiver(&receiver).unwrap();
    // the witness strictly improves both of its members
    let p_current = matching.partner_of_proposer(p).unwrap();
    let r_current = matching.partner_of_receiver(r).unwrap();
    assert!(profile.proposer_rank(p, r).unwrap() < profile.proposer_rank(p, p_current).unwrap());
    assert!(profile.receiver_rank(r, p).unwrap() < profile.receiver_rank(r, r_current).unwrap());
}

#[test]
fn stable_matching_with_singles_passes_both_passes() {
    let profile = preferences(
        [("A", RawPref::from(["X"])), ("B", RawPref::from(["X"]))],
        [("X", RawPref::from(["A", "B"]))],
    )
    .unwrap();
    let matching = Matching::from_pairs([("A", "X")], profile.roster()).unwrap();
    assert_eq!(is_stable(&matching, &profile).unwrap(), Stability::Stable);
}

#[test]
fn single_pair_that_both_prefer_blocks() {
    let profile = preferences(
        [("A", RawPref::from(["X"])), ("B", RawPref::from(["X"]))],
        [("X", RawPref::from(["B", "A"]))],
    )
    .unwrap();
    // X would rather hold B than A
    let matching = Matching::from_pairs([("A", "X")], profile.roster()).unwrap();
    assert_eq!(
        is_stable(&matching, &profile).unwrap(),
        Stability::Blocked(BlockingPair {
            proposer: "B".to_string(),
            receiver: "X".to_string(),
        })
    );
}

#[test]
fn foreign_matching_is_incompatible() {
    let profile = preferences(
        [("A", RawPref::from("X"))],
        [("X", RawPref::from("A"))],
    )
    .unwrap();
    let other = preferences(
        [("A", RawPref::from("X")), ("B", RawPref::from("X"))],
        [("X", RawPref::from(["A", "B"]))],
    )
    .unwrap();
    let matching = Matching::from_pairs([("A", "X"), ("B", "X")], other.roster());
    // two proposers cannot both hold X
    assert!(matching.is_err());
    let matching = Matching::from_pairs([("B", "X")], other.roster()).unwrap();
    let err = is_stable(&matching, &profile).unwrap_err();
    assert!(matches!(err, MatchError::IncompatiblePreferences { .. }));
}

#[test]
fn matched_partner_missing_from_list_is_incompatible() {
    let profile = preferences(
        [("A", RawPref::from(["X"])), ("B", RawPref::from(["Y"]))],
        [("X", RawPref::from(["A"])), ("Y", RawPref::from(["B"]))],
    )
    .unwrap();
    let matching = Matching::from_pairs([("A", "Y")], profile.roster()).unwrap();
    let err = is_stable(&matching, &profile).unwrap_err();
    assert_eq!(
        err,
        MatchError::IncompatiblePreferences {
            detail: "Y, who is matched to A, is not on A's preference list".to_string(),
        }
    );
}
