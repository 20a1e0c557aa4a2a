//! # Submarine library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access items defined
//! inside the submarine crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Actuators - drive the thrusters, either through the Maestro servo controller or in simulation
pub mod actuator;

/// Bus client - receives navigation messages from the message bus
pub mod bus_client;

/// Ingestion - hands inbound messages and reloaded parameters to the control loop
pub mod ingest;

/// Movement control module - converts poses and remote input into thruster demands
pub mod movement_ctrl;

/// Navigation control module - the top level state machine of the vehicle
pub mod nav_ctrl;

/// Executable parameters
pub mod params;

/// Telemetry server - publishes navigation status onto the message bus
pub mod tm_server;
