//! Application services for the transaction-creation context.

pub mod command_handlers;
