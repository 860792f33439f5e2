// deployer/src/decoding.rs
// Log entries, decoded events/errors and the ABI-backed decoder.

use ethers::{
    abi::{self, parse_abi, Abi, ErrorExt, ParseError, RawLog, Token},
    types::{Address, Bytes, Log, H256, I256, U256},
};
use lazy_static::lazy_static;
use std::{fmt, sync::Arc};
use tracing::trace;

/// A single log emitted by a transaction, as found in its receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
}

impl From<&Log> for LogEntry {
    fn from(log: &Log) -> Self {
        Self { address: log.address, topics: log.topics.clone(), data: log.data.clone() }
    }
}

impl From<Log> for LogEntry {
    fn from(log: Log) -> Self {
        Self { address: log.address, topics: log.topics, data: log.data }
    }
}

/// An event log decoded against a known event signature.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    pub name: String,
    pub address: Address,
    pub params: Vec<(String, Token)>,
}

impl DecodedEvent {
    pub fn param(&self, name: &str) -> Option<&Token> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }
}

/// A custom error decoded from revert data.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedError {
    pub name: String,
    /// Canonical signature, e.g. `ErrorNotOwner(address)`.
    pub signature: String,
    pub args: Vec<(String, Token)>,
}

impl fmt::Display for DecodedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, (name, value)) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if name.is_empty() {
                write!(f, "{}", FieldValue::from(value))?;
            } else {
                write!(f, "{}: {}", name, FieldValue::from(value))?;
            }
        }
        write!(f, ")")
    }
}

/// Typed value of a decoded event field or error argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Uint(U256),
    Int(I256),
    Address(Address),
    Bool(bool),
    /// `bytes32` values, which the protocol uses for ids and keys.
    Identifier(H256),
    FixedBytes(Bytes),
    Bytes(Bytes),
    String(String),
    Array(Vec<FieldValue>),
    Tuple(Vec<FieldValue>),
}

impl FieldValue {
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            FieldValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            FieldValue::Address(a) => Some(*a),
            _ => None,
        }
    }
}

impl From<&Token> for FieldValue {
    fn from(token: &Token) -> Self {
        match token {
            Token::Uint(v) => FieldValue::Uint(*v),
            Token::Int(v) => FieldValue::Int(I256::from_raw(*v)),
            Token::Address(a) => FieldValue::Address(*a),
            Token::Bool(b) => FieldValue::Bool(*b),
            Token::FixedBytes(b) if b.len() == 32 => FieldValue::Identifier(H256::from_slice(b)),
            Token::FixedBytes(b) => FieldValue::FixedBytes(Bytes::from(b.clone())),
            Token::Bytes(b) => FieldValue::Bytes(Bytes::from(b.clone())),
            Token::String(s) => FieldValue::String(s.clone()),
            Token::Array(items) | Token::FixedArray(items) => {
                FieldValue::Array(items.iter().map(FieldValue::from).collect())
            }
            Token::Tuple(items) => FieldValue::Tuple(items.iter().map(FieldValue::from).collect()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Uint(v) => write!(f, "{}", v),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Address(a) => write!(f, "{:?}", a),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Identifier(h) => write!(f, "{:?}", h),
            FieldValue::FixedBytes(b) | FieldValue::Bytes(b) => write!(f, "{}", b),
            FieldValue::String(s) => write!(f, "{:?}", s),
            FieldValue::Array(items) => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            FieldValue::Tuple(items) => {
                write!(f, "(")?;
                write_list(f, items)?;
                write!(f, ")")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[FieldValue]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Something that can turn raw logs and revert payloads into named events and errors.
pub trait Decoder {
    /// Returns `None` when the entry matches no known event signature.
    fn decode_event(&self, entry: &LogEntry) -> Option<DecodedEvent>;

    /// Returns `None` when the payload matches no known custom error.
    fn decode_error(&self, data: &[u8]) -> Option<DecodedError>;
}

/// A named contract ABI used for decoding.
#[derive(Debug, Clone)]
pub struct Interface {
    name: String,
    abi: Arc<Abi>,
}

lazy_static! {
    static ref STANDARD_ERRORS: Abi = parse_abi(&["error Error(string)", "error Panic(uint256)"])
        .expect("Error(string) and Panic(uint256) are valid signatures");
}

impl Interface {
    pub fn new(name: impl Into<String>, abi: Abi) -> Self {
        Self { name: name.into(), abi: Arc::new(abi) }
    }

    /// Builds an interface from human readable signatures such as
    /// `event LogRegistration(uint96 nftId)`.
    pub fn parse(name: impl Into<String>, signatures: &[&str]) -> Result<Self, ParseError> {
        Ok(Self::new(name, parse_abi(signatures)?))
    }

    /// Solidity's built-in `Error(string)` and `Panic(uint256)` reverts.
    pub fn standard_errors() -> Self {
        Self::new("Solidity", STANDARD_ERRORS.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn abi(&self) -> &Abi {
        &self.abi
    }
}

impl Decoder for Interface {
    fn decode_event(&self, entry: &LogEntry) -> Option<DecodedEvent> {
        let topic0 = entry.topics.first()?;
        self.abi
            .events
            .values()
            .flatten()
            .filter(|event| !event.anonymous && event.signature() == *topic0)
            .find_map(|event| {
                let raw = RawLog { topics: entry.topics.clone(), data: entry.data.to_vec() };
                match event.parse_log(raw) {
                    Ok(parsed) => Some(DecodedEvent {
                        name: event.name.clone(),
                        address: entry.address,
                        params: parsed.params.into_iter().map(|p| (p.name, p.value)).collect(),
                    }),
                    Err(e) => {
                        trace!(interface = %self.name, event = %event.name, error = %e, "topic matched but log did not decode");
                        None
                    }
                }
            })
    }

    fn decode_error(&self, data: &[u8]) -> Option<DecodedError> {
        if data.len() < 4 {
            return None;
        }
        let (selector, payload) = data.split_at(4);
        self.abi.errors.values().flatten().filter(|e| e.selector() == selector).find_map(|error| {
            let kinds: Vec<_> = error.inputs.iter().map(|p| p.kind.clone()).collect();
            match abi::decode(&kinds, payload) {
                Ok(tokens) => Some(DecodedError {
                    name: error.name.clone(),
                    signature: error.abi_signature(),
                    args: error.inputs.iter().map(|p| p.name.clone()).zip(tokens).collect(),
                }),
                Err(e) => {
                    trace!(interface = %self.name, error_name = %error.name, error = %e, "selector matched but payload did not decode");
                    None
                }
            }
        })
    }
}

/// Interfaces are tried in order; the first one that decodes wins.
impl Decoder for [Interface] {
    fn decode_event(&self, entry: &LogEntry) -> Option<DecodedEvent> {
        self.iter().find_map(|iface| iface.decode_event(entry))
    }

    fn decode_error(&self, data: &[u8]) -> Option<DecodedError> {
        self.iter().find_map(|iface| iface.decode_error(data))
    }
}
