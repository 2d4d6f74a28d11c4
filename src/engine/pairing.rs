//! Bracket pairing: matchup generation, round advancement and completion.
//!
//! Every function here is pure apart from the injected `RandomSource`.
//! Inputs are borrowed and never mutated; results are fresh values.

use tracing::debug;

use super::random::RandomSource;
use crate::types::{BracketError, Goal, Matchup};

/// Round numbers start here.
pub const FIRST_ROUND: u32 = 1;

fn ensure_round(round: u32) -> Result<(), BracketError> {
    if round < FIRST_ROUND {
        return Err(BracketError::InvalidArgument(
            "Round must be a positive number".to_string(),
        ));
    }
    Ok(())
}

/// Fisher–Yates shuffle into a new vector.
///
/// Walks `i` from the last index down to 1, draws `j` uniformly from
/// `[0, i]` and swaps. The input slice is left untouched.
pub fn shuffle_array<T: Clone, R: RandomSource + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut shuffled = items.to_vec();
    for i in (1..shuffled.len()).rev() {
        let j = ((rng.next_unit() * (i + 1) as f64).floor() as usize).min(i);
        shuffled.swap(i, j);
    }
    shuffled
}

/// Shuffle `goals` and pair them off into matchups for `round`.
///
/// Fewer than two goals yields no matchups. With an odd count the
/// entrant left over after pairing gets a bye: it is matched with itself
/// and pre-selected.
pub fn generate_matchups<R: RandomSource + ?Sized>(
    goals: &[Goal],
    round: u32,
    rng: &mut R,
) -> Result<Vec<Matchup>, BracketError> {
    ensure_round(round)?;

    if goals.len() < 2 {
        return Ok(Vec::new());
    }

    let shuffled = shuffle_array(goals, rng);
    let matchups: Vec<Matchup> = shuffled
        .chunks(2)
        .map(|pair| match pair {
            [a, b] => Matchup::new(round, a.clone(), b.clone()),
            [lone] => Matchup::bye(round, lone.clone()),
            _ => unreachable!("chunks(2) yields one or two items"),
        })
        .collect();

    debug!(
        round,
        entrants = goals.len(),
        matchups = matchups.len(),
        bye = goals.len() % 2 == 1,
        "Matchups generated"
    );

    Ok(matchups)
}

/// Build the next round from the winners of `current_matchups`.
///
/// Undecided matchups contribute no entrant and are dropped without an
/// error. Callers must check [`is_round_complete`] first or lose those
/// entrants.
pub fn get_next_round_matchups<R: RandomSource + ?Sized>(
    current_matchups: &[Matchup],
    round: u32,
    rng: &mut R,
) -> Result<Vec<Matchup>, BracketError> {
    let winners: Vec<Goal> = current_matchups
        .iter()
        .filter(|m| m.is_decided())
        .filter_map(|m| m.selected.clone())
        .collect();

    generate_matchups(&winners, round, rng)
}

/// True when every matchup has a selection. Vacuously true when empty.
pub fn is_round_complete(matchups: &[Matchup]) -> bool {
    matchups.iter().all(|m| m.selected.is_some())
}

/// Rounds needed to reduce `goals_count` entrants to one: `ceil(log2(n))`.
///
/// Zero entrants need zero rounds. Negative counts are rejected.
pub fn calculate_rounds(goals_count: i64) -> Result<u32, BracketError> {
    if goals_count < 0 {
        return Err(BracketError::InvalidArgument(
            "Goals count must be a positive number".to_string(),
        ));
    }
    if goals_count <= 1 {
        return Ok(0);
    }
    // ceil(log2(n)) without float rounding: bit length of n - 1
    let n = goals_count as u64;
    Ok(u64::BITS - (n - 1).leading_zeros())
}

/// The matchups belonging to `round`, in their original order.
pub fn get_current_round_matchups(
    matchups: &[Matchup],
    round: u32,
) -> Result<Vec<Matchup>, BracketError> {
    ensure_round(round)?;
    Ok(matchups.iter().filter(|m| m.round == round).cloned().collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
