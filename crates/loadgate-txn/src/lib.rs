//! Loadgate Txn — the load-request validation bounded context.
//!
//! Turns raw load requests into validated [`Transaction`]s, emitting
//! `TxnCreated` on success and `TxnCreateFailed` with the rejected
//! request otherwise.
//!
//! [`Transaction`]: loadgate_core::transaction::Transaction

pub mod application;
pub mod domain;
