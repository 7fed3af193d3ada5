//! Operation catalog and state module
//!
//! Operations are the only channel through which tasks influence mechanisms:
//! a fixed, named set of digital and analog control channels, written by the
//! active task tree and read by the mechanism drivers each cycle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod operation;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use operation::*;
pub use state::*;
