//! Loadgate Account — the transaction admission bounded context.
//!
//! Owns the per-customer account aggregate (daily/weekly deposit limits,
//! duplicate detection, balance), the persisted admission event payloads,
//! and the transaction-result read model projected from the account event
//! stream.

pub mod application;
pub mod domain;
pub mod read_model;
