//! Loadgate App — pipeline wiring, orchestration, and line IO.
//!
//! Everything here is glue around the domain crates: the process-manager
//! saga, the routine supervisor, the reader/writer adapters, and the
//! configuration and telemetry bootstrap used by the binary.

pub mod config;
pub mod error;
pub mod process_manager;
pub mod reader;
pub mod runner;
pub mod telemetry;
pub mod writer;
