//! Shared types for the goal bracket.
//!
//! These types form the data model used across the engine, the session
//! state machine, the persistence collaborators and the HTTP API.
//! Serialized field names follow the stored record shape (camelCase,
//! SCREAMING_SNAKE_CASE enum values).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A user-supplied goal. Opaque, non-empty; duplicates are distinct entrants.
pub type Goal = String;

// ---------------------------------------------------------------------------
// Matchup
// ---------------------------------------------------------------------------

/// One pairwise comparison between two goals within a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matchup {
    pub id: Uuid,
    pub round: u32,
    pub goal_a: Goal,
    pub goal_b: Goal,
    /// The winning goal, once chosen. Always `goal_a` or `goal_b`.
    #[serde(default)]
    pub selected: Option<Goal>,
}

impl Matchup {
    /// A fresh, undecided matchup.
    pub fn new(round: u32, goal_a: Goal, goal_b: Goal) -> Self {
        Self {
            id: Uuid::new_v4(),
            round,
            goal_a,
            goal_b,
            selected: None,
        }
    }

    /// A bye: the lone entrant is paired with itself and already selected.
    pub fn bye(round: u32, goal: Goal) -> Self {
        Self {
            id: Uuid::new_v4(),
            round,
            goal_a: goal.clone(),
            goal_b: goal.clone(),
            selected: Some(goal),
        }
    }

    /// A self-pairing that is already settled for its lone entrant.
    ///
    /// Two equal goals drawn against each other are a real matchup until one
    /// is chosen; once decided, such a matchup reads the same as a bye.
    pub fn is_bye(&self) -> bool {
        self.goal_a == self.goal_b && self.selected.as_deref() == Some(self.goal_a.as_str())
    }

    /// Whether a winner has been chosen (an empty string counts as unset).
    pub fn is_decided(&self) -> bool {
        self.selected.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Whether `choice` is one of the two entrants.
    pub fn involves(&self, choice: &str) -> bool {
        self.goal_a == choice || self.goal_b == choice
    }
}

impl fmt::Display for Matchup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bye() {
            return write!(f, "[R{}] {} (bye)", self.round, self.goal_a);
        }
        match &self.selected {
            Some(s) => write!(
                f,
                "[R{}] {} vs {} -> {s}",
                self.round, self.goal_a, self.goal_b
            ),
            None => write!(f, "[R{}] {} vs {}", self.round, self.goal_a, self.goal_b),
        }
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Bracket category. Metadata at the persistence boundary only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BracketCategory {
    Career,
    Faith,
    Family,
    Fitness,
    Financial,
    #[default]
    Personal,
    Other,
}

impl BracketCategory {
    /// All known categories, in display order.
    pub const ALL: &'static [BracketCategory] = &[
        BracketCategory::Career,
        BracketCategory::Faith,
        BracketCategory::Family,
        BracketCategory::Fitness,
        BracketCategory::Financial,
        BracketCategory::Personal,
        BracketCategory::Other,
    ];

    /// Stored value, e.g. `"FITNESS"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BracketCategory::Career => "CAREER",
            BracketCategory::Faith => "FAITH",
            BracketCategory::Family => "FAMILY",
            BracketCategory::Fitness => "FITNESS",
            BracketCategory::Financial => "FINANCIAL",
            BracketCategory::Personal => "PERSONAL",
            BracketCategory::Other => "OTHER",
        }
    }

    /// Human label, e.g. `"Fitness"`.
    pub fn label(&self) -> String {
        let value = self.as_str();
        let mut chars = value.chars();
        match chars.next() {
            Some(first) => first.to_string() + &chars.as_str().to_lowercase(),
            None => String::new(),
        }
    }
}

impl fmt::Display for BracketCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Case-insensitive parse of a stored category value.
impl std::str::FromStr for BracketCategory {
    type Err = BracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BracketCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BracketError::Validation(format!("Unknown category: {s}")))
    }
}

/// Stored bracket status, derived from whether a winner is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BracketStatus {
    InProgress,
    Completed,
}

impl BracketStatus {
    pub fn from_winner(winner: Option<&str>) -> Self {
        match winner {
            Some(_) => BracketStatus::Completed,
            None => BracketStatus::InProgress,
        }
    }
}

impl fmt::Display for BracketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BracketStatus::InProgress => write!(f, "IN_PROGRESS"),
            BracketStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

// ---------------------------------------------------------------------------
// Persistence records
// ---------------------------------------------------------------------------

/// The authenticated user on whose behalf records are read and written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Input to `BracketStore::create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBracket {
    pub title: String,
    pub category: BracketCategory,
    pub goals: Vec<Goal>,
    pub matchups: Vec<Matchup>,
    pub winner: Option<Goal>,
    pub round: u32,
    pub status: BracketStatus,
    pub created_at: DateTime<Utc>,
}

/// A bracket as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketRecord {
    pub id: String,
    pub owner: String,
    pub title: String,
    #[serde(default)]
    pub category: Option<BracketCategory>,
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub matchups: Vec<Matchup>,
    #[serde(default)]
    pub winner: Option<Goal>,
    #[serde(default)]
    pub round: Option<u32>,
    pub status: BracketStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl BracketRecord {
    /// Materialise a stored record from a create request.
    pub fn from_new(id: String, owner: &Principal, new: NewBracket) -> Self {
        Self {
            id,
            owner: owner.id.clone(),
            title: new.title,
            category: Some(new.category),
            goals: new.goals,
            matchups: new.matchups,
            winner: new.winner,
            round: Some(new.round),
            status: new.status,
            created_at: Some(new.created_at),
            updated_at: Some(Utc::now()),
        }
    }
}

impl fmt::Display for BracketRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.title, self.status)?;
        if let Some(w) = &self.winner {
            write!(f, " winner: {w}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BracketError {
    /// A value of the wrong shape reached an API. A programming error.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// User input that cannot be accepted as-is.
    #[error("{0}")]
    Validation(String),

    /// A selection that does not fit the bracket's current state.
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// No authenticated principal, or the principal lacks access.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any other failure from the persistence collaborator.
    #[error("Remote failure: {0}")]
    RemoteFailure(String),
}

impl BracketError {
    /// Whether a manual retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BracketError::RemoteFailure(_))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
