//! Load requests and their validation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use loadgate_core::transaction::Transaction;

/// A raw load request as read from the input, prior to validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadRequest {
    /// Requested transaction id.
    #[serde(default)]
    pub id: String,
    /// Customer the load is for.
    #[serde(default)]
    pub customer_id: String,
    /// Signed currency string, optionally `$`-prefixed (`"-$33.47"`).
    #[serde(default)]
    pub load_amount: String,
    /// Request instant, formatted per `time_format` or the configured
    /// default.
    #[serde(default)]
    pub time: String,
    /// Optional chrono format string overriding the default time format.
    #[serde(default)]
    pub time_format: Option<String>,
}

/// Payload of `TxnCreateFailed` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadRequestFailure {
    /// The request that failed validation.
    pub txn_request: LoadRequest,
    /// Why it was rejected.
    pub error: String,
}

/// Reasons a load request fails validation.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The transaction id was blank.
    #[error("transaction id cannot be blank")]
    BlankId,

    /// The customer id was blank.
    #[error("customer id cannot be blank")]
    BlankCustomerId,

    /// The load amount was blank.
    #[error("load amount cannot be blank")]
    BlankAmount,

    /// The load amount did not parse as a signed currency value.
    #[error("invalid load amount '{0}'")]
    InvalidAmount(String),

    /// The time did not parse under the effective format.
    #[error("error parsing time '{time}' with format '{format}': {source}")]
    InvalidTime {
        /// The raw time string.
        time: String,
        /// The format it was parsed with.
        format: String,
        /// The underlying parse failure.
        source: chrono::ParseError,
    },
}

/// Validates a load request and builds the transaction it describes.
///
/// Checks run in order: blank id, blank customer id, blank or malformed
/// amount (all `$` signs are stripped before the float parse, preserving
/// the sign), then the time parse under the request's format or
/// `default_time_format`.
///
/// # Errors
///
/// Returns the first [`RequestError`] encountered.
pub fn build_transaction(
    request: &LoadRequest,
    default_time_format: &str,
) -> Result<Transaction, RequestError> {
    if request.id.is_empty() {
        return Err(RequestError::BlankId);
    }
    if request.customer_id.is_empty() {
        return Err(RequestError::BlankCustomerId);
    }

    let raw_amount = request.load_amount.trim();
    if raw_amount.is_empty() {
        return Err(RequestError::BlankAmount);
    }
    let load_amount = raw_amount
        .replace('$', "")
        .parse::<f64>()
        .map_err(|_| RequestError::InvalidAmount(request.load_amount.clone()))?;

    let format = request
        .time_format
        .as_deref()
        .filter(|format| !format.is_empty())
        .unwrap_or(default_time_format);
    let time = NaiveDateTime::parse_from_str(&request.time, format)
        .map_err(|source| RequestError::InvalidTime {
            time: request.time.clone(),
            format: format.to_owned(),
            source,
        })?
        .and_utc();

    Ok(Transaction {
        id: request.id.clone(),
        customer_id: request.customer_id.clone(),
        load_amount,
        time,
    })
}
