//! Caller-side bracket state machine.
//!
//! A `BracketSession` holds everything one tournament needs (title,
//! category, goals, the append-only matchup log, the current round and the
//! winner) and threads it explicitly through the pairing functions.
//!
//! ```text
//! Collecting --start--> InRound(1) --select...--> RoundComplete(n)
//!                                                   |-> InRound(n+1)
//!                                                   `-> Won(goal)
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::pairing::{
    calculate_rounds, generate_matchups, get_current_round_matchups, get_next_round_matchups,
    is_round_complete, FIRST_ROUND,
};
use super::random::RandomSource;
use crate::types::{BracketCategory, BracketError, BracketStatus, Goal, Matchup, NewBracket};

pub const MSG_EMPTY_GOAL: &str = "Please enter a goal";
pub const MSG_TOO_FEW_GOALS: &str = "You need at least 2 goals to create a bracket";
pub const MSG_MISSING_TITLE: &str = "Please enter a title for your bracket";
pub const MSG_TOO_FEW_TO_SAVE: &str = "You need at least 2 goals to save a bracket";

/// Minimum number of goals for a tournament.
pub const MIN_GOALS: usize = 2;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BracketPhase {
    /// Goals are still being entered.
    Collecting,
    /// Matchups of round `n` are awaiting selections.
    InRound(u32),
    /// All of round `n` is decided but the next round has not been drawn.
    RoundComplete(u32),
    /// Terminal: the overall winner.
    Won(Goal),
}

/// What a single selection did to the bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionOutcome {
    /// The round still has undecided matchups.
    Recorded,
    /// The round completed and `round` was drawn.
    Advanced { round: u32, matchups: usize },
    /// The bracket is finished.
    Won { winner: Goal },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketSession {
    title: String,
    category: BracketCategory,
    goals: Vec<Goal>,
    matchups: Vec<Matchup>,
    current_round: u32,
    winner: Option<Goal>,
}

impl Default for BracketSession {
    fn default() -> Self {
        Self::new()
    }
}

impl BracketSession {
    pub fn new() -> Self {
        Self {
            title: String::new(),
            category: BracketCategory::default(),
            goals: Vec::new(),
            matchups: Vec::new(),
            current_round: FIRST_ROUND,
            winner: None,
        }
    }

    /// Back to an empty, collecting session.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    // -- Accessors ---------------------------------------------------------

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn category(&self) -> BracketCategory {
        self.category
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    /// Every matchup of every round, oldest round first.
    pub fn matchups(&self) -> &[Matchup] {
        &self.matchups
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    pub fn is_started(&self) -> bool {
        !self.matchups.is_empty()
    }

    pub fn phase(&self) -> BracketPhase {
        if let Some(w) = &self.winner {
            return BracketPhase::Won(w.clone());
        }
        if !self.is_started() {
            return BracketPhase::Collecting;
        }
        let current = self.round_matchups(self.current_round);
        if is_round_complete(&current) {
            BracketPhase::RoundComplete(self.current_round)
        } else {
            BracketPhase::InRound(self.current_round)
        }
    }

    pub fn current_round_matchups(&self) -> Vec<Matchup> {
        self.round_matchups(self.current_round)
    }

    /// Rounds a tournament over the current goal list will take.
    pub fn planned_rounds(&self) -> Result<u32, BracketError> {
        calculate_rounds(self.goals.len() as i64)
    }

    fn round_matchups(&self, round: u32) -> Vec<Matchup> {
        // current_round never drops below FIRST_ROUND
        get_current_round_matchups(&self.matchups, round).unwrap_or_default()
    }

    // -- Collecting --------------------------------------------------------

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_category(&mut self, category: BracketCategory) {
        self.category = category;
    }

    /// Append a goal, trimmed. Blank text is rejected.
    pub fn add_goal(&mut self, text: &str) -> Result<(), BracketError> {
        self.ensure_collecting()?;
        let goal = text.trim();
        if goal.is_empty() {
            return Err(BracketError::Validation(MSG_EMPTY_GOAL.to_string()));
        }
        self.goals.push(goal.to_string());
        Ok(())
    }

    pub fn remove_goal(&mut self, index: usize) -> Result<Goal, BracketError> {
        self.ensure_collecting()?;
        if index >= self.goals.len() {
            return Err(BracketError::InvalidArgument(format!(
                "Goal index {index} out of range (have {})",
                self.goals.len()
            )));
        }
        Ok(self.goals.remove(index))
    }

    fn ensure_collecting(&self) -> Result<(), BracketError> {
        if self.is_started() {
            return Err(BracketError::Validation(
                "Goals cannot change once the bracket has started".to_string(),
            ));
        }
        Ok(())
    }

    /// Draw round one.
    pub fn start<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> Result<&[Matchup], BracketError> {
        self.ensure_collecting()?;
        if self.goals.len() < MIN_GOALS {
            return Err(BracketError::Validation(MSG_TOO_FEW_GOALS.to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(BracketError::Validation(MSG_MISSING_TITLE.to_string()));
        }

        self.matchups = generate_matchups(&self.goals, FIRST_ROUND, rng)?;
        self.current_round = FIRST_ROUND;
        self.winner = None;

        info!(
            title = %self.title.trim(),
            goals = self.goals.len(),
            matchups = self.matchups.len(),
            planned_rounds = self.planned_rounds().unwrap_or(0),
            "Bracket started"
        );

        Ok(&self.matchups)
    }

    // -- Playing -----------------------------------------------------------

    /// Record `choice` as the winner of `matchup_id`.
    ///
    /// Selections can be changed until the round completes. Completing a
    /// round draws the next one, or settles the winner when only one
    /// entrant remains.
    pub fn select<R: RandomSource + ?Sized>(
        &mut self,
        matchup_id: Uuid,
        choice: &str,
        rng: &mut R,
    ) -> Result<SelectionOutcome, BracketError> {
        if let Some(w) = &self.winner {
            return Err(BracketError::InvalidSelection(format!(
                "Bracket is already won by {w}"
            )));
        }

        let current_round = self.current_round;
        let matchup = self
            .matchups
            .iter_mut()
            .find(|m| m.id == matchup_id)
            .ok_or_else(|| BracketError::NotFound(format!("Matchup {matchup_id}")))?;

        if matchup.round != current_round {
            return Err(BracketError::InvalidSelection(format!(
                "Matchup {matchup_id} belongs to round {}, current round is {current_round}",
                matchup.round
            )));
        }
        if !matchup.involves(choice) {
            return Err(BracketError::InvalidSelection(format!(
                "{choice} is not part of matchup {matchup_id}"
            )));
        }

        matchup.selected = Some(choice.to_string());
        debug!(matchup = %matchup, "Selection recorded");

        self.advance(rng)
    }

    fn advance<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> Result<SelectionOutcome, BracketError> {
        let current = self.round_matchups(self.current_round);
        if !is_round_complete(&current) {
            return Ok(SelectionOutcome::Recorded);
        }

        let next_round = self.current_round + 1;
        let next = get_next_round_matchups(&current, next_round, rng)?;

        if !next.is_empty() {
            let count = next.len();
            self.matchups.extend(next);
            self.current_round = next_round;
            info!(round = next_round, matchups = count, "Round advanced");
            return Ok(SelectionOutcome::Advanced {
                round: next_round,
                matchups: count,
            });
        }

        let survivors: Vec<&Goal> = current.iter().filter_map(|m| m.selected.as_ref()).collect();
        match survivors.as_slice() {
            [only] => {
                let winner = (*only).clone();
                self.winner = Some(winner.clone());
                info!(winner = %winner, rounds = self.current_round, "Bracket won");
                Ok(SelectionOutcome::Won { winner })
            }
            _ => Err(BracketError::InvalidArgument(format!(
                "Round {} completed with {} entrants and no next round",
                self.current_round,
                survivors.len()
            ))),
        }
    }

    // -- Saving ------------------------------------------------------------

    /// Snapshot for `BracketStore::create`, stamped with `created_at`.
    pub fn to_new_bracket(&self, created_at: DateTime<Utc>) -> Result<NewBracket, BracketError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(BracketError::Validation(MSG_MISSING_TITLE.to_string()));
        }
        if self.goals.len() < MIN_GOALS {
            return Err(BracketError::Validation(MSG_TOO_FEW_TO_SAVE.to_string()));
        }

        Ok(NewBracket {
            title: title.to_string(),
            category: self.category,
            goals: self.goals.clone(),
            matchups: self.matchups.clone(),
            winner: self.winner.clone(),
            round: self.current_round,
            status: BracketStatus::from_winner(self.winner.as_deref()),
            created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
