//! Application services for the account context.

pub mod command_handlers;
pub mod query_handlers;
