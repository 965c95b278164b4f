//! Camera-side collaborators for the capture pipeline.
//!
//! - `SimulatedCamera`: in-process stand-in
//! - `JsonLineBridge`: line-delimited JSON command protocol over any writer
//! - `ProcessBridge`: the same protocol to a spawned helper program

pub mod error;
pub mod json_line;
pub mod process;
pub mod protocol;
pub mod simulated;
pub mod util;

pub use error::BridgeError;
pub use json_line::JsonLineBridge;
pub use process::ProcessBridge;
pub use simulated::SimulatedCamera;
