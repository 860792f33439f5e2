// deployer/src/logs.rs
// Reads a single field out of the events a transaction emitted.

use crate::decoding::{Decoder, DecodedEvent, FieldValue, LogEntry};

use ethers::{abi::Tokenizable, types::TransactionReceipt};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no `{event}` event found in {logs} log(s)")]
    EventNotFound { event: String, logs: usize },

    #[error("`{event}` emitted {count} times, expected exactly once")]
    AmbiguousEvent { event: String, count: usize },

    #[error("event `{event}` has no field `{field}`")]
    FieldNotFound { event: String, field: String },

    #[error("field `{event}.{field}` could not be converted: {message}")]
    Conversion { event: String, field: String, message: String },
}

/// Finds the one log decoding as `event`. Entries the decoder does not
/// recognise are skipped.
pub fn find_event<D: Decoder + ?Sized>(
    logs: &[LogEntry],
    decoder: &D,
    event: &str,
) -> Result<DecodedEvent, ExtractError> {
    let mut matches: Vec<DecodedEvent> = logs
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| match decoder.decode_event(entry) {
            Some(decoded) => Some(decoded),
            None => {
                trace!(index, address = ?entry.address, "skipping undecodable log");
                None
            }
        })
        .filter(|decoded| decoded.name == event)
        .collect();

    match matches.len() {
        0 => Err(ExtractError::EventNotFound { event: event.to_string(), logs: logs.len() }),
        1 => Ok(matches.remove(0)),
        count => Err(ExtractError::AmbiguousEvent { event: event.to_string(), count }),
    }
}

/// Returns `field` of the single `event` among `logs`.
pub fn extract_field<D: Decoder + ?Sized>(
    logs: &[LogEntry],
    decoder: &D,
    event: &str,
    field: &str,
) -> Result<FieldValue, ExtractError> {
    let decoded = find_event(logs, decoder, event)?;
    let token = decoded.param(field).ok_or_else(|| ExtractError::FieldNotFound {
        event: event.to_string(),
        field: field.to_string(),
    })?;
    let value = FieldValue::from(token);
    debug!(event, field, %value, address = ?decoded.address, "extracted event field");
    Ok(value)
}

/// Like [`extract_field`], converting into a concrete Rust type.
pub fn extract_field_as<T: Tokenizable, D: Decoder + ?Sized>(
    logs: &[LogEntry],
    decoder: &D,
    event: &str,
    field: &str,
) -> Result<T, ExtractError> {
    let decoded = find_event(logs, decoder, event)?;
    let token = decoded.param(field).cloned().ok_or_else(|| ExtractError::FieldNotFound {
        event: event.to_string(),
        field: field.to_string(),
    })?;
    T::from_token(token).map_err(|e| ExtractError::Conversion {
        event: event.to_string(),
        field: field.to_string(),
        message: e.to_string(),
    })
}

pub fn receipt_logs(receipt: &TransactionReceipt) -> Vec<LogEntry> {
    receipt.logs.iter().map(LogEntry::from).collect()
}

pub fn extract_from_receipt<D: Decoder + ?Sized>(
    receipt: &TransactionReceipt,
    decoder: &D,
    event: &str,
    field: &str,
) -> Result<FieldValue, ExtractError> {
    extract_field(&receipt_logs(receipt), decoder, event, field)
}

pub fn extract_from_receipt_as<T: Tokenizable, D: Decoder + ?Sized>(
    receipt: &TransactionReceipt,
    decoder: &D,
    event: &str,
    field: &str,
) -> Result<T, ExtractError> {
    extract_field_as(&receipt_logs(receipt), decoder, event, field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoding::Interface;
    use ethers::{
        abi::{self, Token},
        types::{Address, Bytes, H256, U256},
    };

    fn pool() -> Interface {
        Interface::parse(
            "BasicPool",
            &["event LogPoolCreated(uint96 nftId, string name)", "event LogFunded(uint256 amount)"],
        )
        .unwrap()
    }

    fn log(event: &str, tokens: &[Token]) -> LogEntry {
        let signature = pool().abi().event(event).unwrap().signature();
        LogEntry { address: Address::repeat_byte(0x01), topics: vec![signature], data: abi::encode(tokens).into() }
    }

    fn noise() -> LogEntry {
        LogEntry { address: Address::repeat_byte(0x02), topics: vec![H256::repeat_byte(0x99)], data: Bytes::default() }
    }

    #[test]
    fn skips_unknown_logs_and_returns_single_match() {
        let logs = vec![
            noise(),
            log("LogFunded", &[Token::Uint(1_000.into())]),
            log("LogPoolCreated", &[Token::Uint(17.into()), Token::String("BasicPool-ab12".into())]),
        ];
        let nft_id = extract_field(&logs, &pool(), "LogPoolCreated", "nftId").unwrap();
        assert_eq!(nft_id, FieldValue::Uint(17.into()));

        let name: String = extract_field_as(&logs, &pool(), "LogPoolCreated", "name").unwrap();
        assert_eq!(name, "BasicPool-ab12");
    }

    #[test]
    fn missing_field_is_reported() {
        let logs = vec![log("LogFunded", &[Token::Uint(1.into())])];
        assert_eq!(
            extract_field(&logs, &pool(), "LogFunded", "nftId"),
            Err(ExtractError::FieldNotFound { event: "LogFunded".into(), field: "nftId".into() })
        );
    }

    #[test]
    fn wrong_rust_type_is_a_conversion_error() {
        let logs = vec![log("LogPoolCreated", &[Token::Uint(17.into()), Token::String("p".into())])];
        let result: Result<Address, _> = extract_field_as(&logs, &pool(), "LogPoolCreated", "nftId");
        assert!(matches!(result, Err(ExtractError::Conversion { .. })));

        let ok: U256 = extract_field_as(&logs, &pool(), "LogPoolCreated", "nftId").unwrap();
        assert_eq!(ok, U256::from(17));
    }
}
