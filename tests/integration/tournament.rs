//! End-to-end tournaments: engine, session and persistence together.

use std::sync::Arc;

use goal_bracket::engine::{
    generate_matchups, get_current_round_matchups, get_next_round_matchups, is_round_complete,
    BracketPhase, BracketSession, SelectionOutcome, SequenceRandom, XorShiftRng,
};
use goal_bracket::identity::StaticIdentity;
use goal_bracket::storage::BracketService;
use goal_bracket::types::{BracketCategory, BracketError, BracketStatus, Goal, Matchup};

use crate::mock_store::{record_at, MockStore};

fn goals(items: &[&str]) -> Vec<Goal> {
    items.iter().map(|s| s.to_string()).collect()
}

fn pick(m: &Matchup, choice: &str) -> Matchup {
    Matchup {
        selected: Some(choice.to_string()),
        ..m.clone()
    }
}

fn session(title: &str, items: &[&str]) -> BracketSession {
    let mut s = BracketSession::new();
    s.set_title(title);
    for g in items {
        s.add_goal(g).unwrap();
    }
    s
}

#[test]
fn four_goals_with_caller_held_state() {
    let mut rng = SequenceRandom::new(vec![0.9, 0.1, 0.8]);
    let mut all: Vec<Matchup> = generate_matchups(&goals(&["a", "b", "c", "d"]), 1, &mut rng).unwrap();
    assert_eq!(all.len(), 2);

    // choose goalA in round one
    all = all.iter().map(|m| pick(m, &m.goal_a)).collect();
    let round1 = get_current_round_matchups(&all, 1).unwrap();
    assert!(is_round_complete(&round1));
    let winners: Vec<String> = round1.iter().map(|m| m.goal_a.clone()).collect();

    let round2 = get_next_round_matchups(&round1, 2, &mut rng).unwrap();
    assert_eq!(round2.len(), 1);
    assert!(winners.contains(&round2[0].goal_a));
    assert!(winners.contains(&round2[0].goal_b));
    all.extend(round2.clone());

    let champion = round2[0].goal_b.clone();
    let final_round = vec![pick(&round2[0], &champion)];
    assert!(get_next_round_matchups(&final_round, 3, &mut rng).unwrap().is_empty());
    assert_eq!(final_round[0].selected.as_deref(), Some(champion.as_str()));
    assert_eq!(all.len(), 3);
}

#[test]
fn three_goals_bye_advances_without_a_comparison() {
    let mut rng = XorShiftRng::new(31);
    let mut s = session("Odd", &["a", "b", "c"]);
    s.start(&mut rng).unwrap();

    let round1 = s.current_round_matchups();
    assert_eq!(round1.len(), 2);
    let bye = round1.iter().find(|m| m.is_bye()).unwrap().clone();
    assert_eq!(bye.selected.as_deref(), Some(bye.goal_a.as_str()));

    let open = round1.iter().find(|m| !m.is_bye()).unwrap().clone();
    let outcome = s.select(open.id, &open.goal_a, &mut rng).unwrap();
    assert_eq!(outcome, SelectionOutcome::Advanced { round: 2, matchups: 1 });

    let final_match = s.current_round_matchups().remove(0);
    assert!(final_match.involves(&bye.goal_a));
    assert!(final_match.involves(&open.goal_a));

    s.select(final_match.id, &bye.goal_a, &mut rng).unwrap();
    assert_eq!(s.phase(), BracketPhase::Won(bye.goal_a.clone()));
}

#[test]
fn advancing_an_incomplete_round_drops_entrants() {
    let mut rng = SequenceRandom::new(vec![]);
    let round1 = generate_matchups(&goals(&["a", "b", "c", "d", "e", "f"]), 1, &mut rng).unwrap();
    let partial: Vec<Matchup> = round1
        .iter()
        .enumerate()
        .map(|(i, m)| if i == 0 { pick(m, &m.goal_b) } else { m.clone() })
        .collect();

    assert!(!is_round_complete(&partial));
    // one entrant survives, so nothing to pair
    assert!(get_next_round_matchups(&partial, 2, &mut rng).unwrap().is_empty());
}

#[tokio::test]
async fn saved_brackets_come_back_newest_first() {
    let store = MockStore::with_records(vec![
        record_at("old", "sam", Some(600)),
        record_at("other-owner", "kim", Some(1)),
        record_at("undated", "sam", None),
    ]);
    let service = BracketService::new(Arc::new(store.clone()), Arc::new(StaticIdentity::signed_in("sam")));

    let mut rng = XorShiftRng::new(9);
    let mut s = session("Fresh", &["x", "y", "z"]);
    s.set_category(BracketCategory::Financial);
    s.start(&mut rng).unwrap();
    let saved = service.save(&s).await.unwrap();
    assert_eq!(saved.status, BracketStatus::InProgress);
    assert_eq!(saved.category, Some(BracketCategory::Financial));
    assert_eq!(saved.round, Some(1));

    let listed = service.list_recent().await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![saved.id.as_str(), "old", "undated"]);
    assert_eq!(store.all_records().len(), 4);
}

#[tokio::test]
async fn completed_bracket_is_saved_with_winner() {
    let store = MockStore::new();
    let service = BracketService::new(Arc::new(store.clone()), Arc::new(StaticIdentity::signed_in("lee")));

    let mut rng = XorShiftRng::new(123);
    let mut s = session("Finish", &["one", "two", "three", "four", "five"]);
    s.start(&mut rng).unwrap();
    while s.winner().is_none() {
        for m in s.current_round_matchups() {
            if !m.is_decided() {
                s.select(m.id, &m.goal_b, &mut rng).unwrap();
            }
        }
    }

    let saved = service.save(&s).await.unwrap();
    assert_eq!(saved.status, BracketStatus::Completed);
    assert_eq!(saved.winner.as_deref(), s.winner());
    assert_eq!(saved.matchups.len(), s.matchups().len());
    assert_eq!(saved.goals.len(), 5);
}

#[tokio::test]
async fn store_failures_keep_their_kind() {
    let store = MockStore::new();
    let service = BracketService::new(Arc::new(store.clone()), Arc::new(StaticIdentity::signed_in("lee")));
    let mut s = session("Flaky", &["a", "b"]);
    s.start(&mut SequenceRandom::new(vec![])).unwrap();

    store.set_error(BracketError::RemoteFailure("timeout".into()));
    let err = service.save(&s).await.unwrap_err();
    assert!(err.is_retryable());

    store.set_error(BracketError::Unauthorized("revoked".into()));
    assert!(matches!(service.list_recent().await, Err(BracketError::Unauthorized(_))));

    // manual retry succeeds once the backend recovers
    store.clear_error();
    assert!(service.save(&s).await.is_ok());
    assert_eq!(store.all_records().len(), 1);
}
