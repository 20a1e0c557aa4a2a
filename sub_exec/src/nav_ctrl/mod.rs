//! Navigation control module
//!
//! The navigation controller is the top level state machine of the vehicle. It applies messages
//! from the bus as they arrive and, once per cycle, dispatches the control law of the effective
//! mode onto [`crate::movement_ctrl::MovementCtrl`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;
mod waypoint;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use state::*;
pub use waypoint::*;
