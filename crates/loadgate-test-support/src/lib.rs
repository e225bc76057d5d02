//! Shared test mocks and utilities for the Loadgate pipeline.

mod repository;
mod sink;

pub use repository::{FailingEventRepository, RecordingEventRepository};
pub use sink::SharedLineSink;
