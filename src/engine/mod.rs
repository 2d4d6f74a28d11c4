//! Bracket engine: pairing, round advancement and the session state machine.

pub mod pairing;
pub mod random;
pub mod session;

pub use pairing::{
    calculate_rounds, generate_matchups, get_current_round_matchups, get_next_round_matchups,
    is_round_complete, shuffle_array, FIRST_ROUND,
};
pub use random::{RandomSource, SequenceRandom, XorShiftRng};
pub use session::{BracketPhase, BracketSession, SelectionOutcome};
