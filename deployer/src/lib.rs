// deployer/src/lib.rs
// Library interface shared by the CLI and the integration tests.

use ethers::{contract::EthEvent, types::H256};
use lazy_static::lazy_static;

pub mod accounts;
pub mod artifacts;
pub mod bindings;
pub mod components;
pub mod config;
pub mod constants;
pub mod decoding;
pub mod deploy;
pub mod logs;
pub mod scripts;
pub mod transaction;
pub mod utils;

pub use decoding::{DecodedError, DecodedEvent, Decoder, FieldValue, Interface, LogEntry};
pub use logs::{extract_field, extract_field_as, extract_from_receipt, extract_from_receipt_as, ExtractError};
pub use transaction::{execute_tx, CallFailure, InFlight, RevertSource, TxError, TxErrorKind};

lazy_static! {
    pub static ref LOG_REGISTRATION_TOPIC: H256 = bindings::i_registry::LogRegistrationFilter::signature();
    pub static ref ROLE_GRANTED_TOPIC: H256 = bindings::access_manager_extended::RoleGrantedFilter::signature();
}
