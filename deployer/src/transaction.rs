// deployer/src/transaction.rs
// Single-shot transaction execution with revert classification and decoding.

use crate::decoding::{DecodedError, Decoder, Interface};

use ethers::{
    contract::ContractError,
    middleware::signer::SignerMiddlewareError,
    providers::{JsonRpcClient, Middleware, MiddlewareError, PendingTransaction, ProviderError, RpcError},
    signers::Signer,
    types::{Bytes, TransactionReceipt, TxHash, U64},
};
use std::{fmt, future::Future};
use thiserror::Error;
use tracing::{debug, error, info, instrument};

const TX_FAILURE_STATUS: U64 = U64([0]);

/// An error raised while submitting or confirming a transaction, carrying the
/// message and, for reverts, the raw revert payload.
pub trait RevertSource: fmt::Display {
    fn revert_data(&self) -> Option<Bytes>;

    /// Whether the failure is an execution revert rather than a rejection.
    fn is_revert(&self) -> bool {
        self.revert_data().is_some() || self.to_string().contains("revert")
    }
}

impl RevertSource for ProviderError {
    fn revert_data(&self) -> Option<Bytes> {
        RpcError::as_error_response(self).and_then(|e| e.as_revert_data())
    }
}

impl<M: Middleware> RevertSource for ContractError<M> {
    fn revert_data(&self) -> Option<Bytes> {
        self.as_revert().cloned().or_else(|| {
            self.as_middleware_error()
                .and_then(|e| e.as_error_response())
                .and_then(|e| e.as_revert_data())
        })
    }
}

impl<M: Middleware, S: Signer> RevertSource for SignerMiddlewareError<M, S> {
    fn revert_data(&self) -> Option<Bytes> {
        self.as_error_response().and_then(|e| e.as_revert_data())
    }
}

/// Transport-neutral failure, for clients that do not speak ethers' error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFailure {
    pub message: String,
    pub revert_data: Option<Bytes>,
}

impl CallFailure {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self { message: message.into(), revert_data: None }
    }

    pub fn reverted(message: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self { message: message.into(), revert_data: Some(data.into()) }
    }
}

impl fmt::Display for CallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CallFailure {}

impl RevertSource for CallFailure {
    fn revert_data(&self) -> Option<Bytes> {
        self.revert_data.clone()
    }
}

/// A submitted transaction that has not been confirmed yet.
pub trait InFlight {
    type Error: RevertSource;

    fn tx_hash(&self) -> TxHash;

    /// Resolves once the transaction is included. `Ok(None)` means the client
    /// lost track of it (dropped or replaced).
    fn confirm(self) -> impl Future<Output = Result<Option<TransactionReceipt>, Self::Error>>;
}

impl<'a, P: JsonRpcClient> InFlight for PendingTransaction<'a, P> {
    type Error = ProviderError;

    fn tx_hash(&self) -> TxHash {
        PendingTransaction::tx_hash(self)
    }

    fn confirm(self) -> impl Future<Output = Result<Option<TransactionReceipt>, ProviderError>> {
        self
    }
}

#[derive(Debug, Error)]
pub enum TxErrorKind {
    #[error("transaction rejected before inclusion: {message}")]
    Submission { message: String },

    #[error("{}", describe_revert(.tx_hash, .message, .data, .decoded))]
    Reverted {
        tx_hash: Option<TxHash>,
        message: String,
        data: Option<Bytes>,
        decoded: Option<DecodedError>,
    },

    #[error("transaction {tx_hash:?} dropped before inclusion")]
    Dropped { tx_hash: TxHash },
}

fn describe_revert(
    tx_hash: &Option<TxHash>,
    message: &str,
    data: &Option<Bytes>,
    decoded: &Option<DecodedError>,
) -> String {
    let mut out = match tx_hash {
        Some(hash) => format!("transaction {:?} reverted", hash),
        None => "execution reverted".to_string(),
    };
    match (decoded, data) {
        (Some(decoded), _) => out.push_str(&format!(" with {}", decoded)),
        (None, Some(data)) => out.push_str(&format!(": {} (data: {})", message, data)),
        (None, None) => out.push_str(&format!(": {}", message)),
    }
    out
}

/// A failed transaction with the label of the step that sent it.
#[derive(Debug)]
pub struct TxError {
    pub label: Option<String>,
    pub kind: TxErrorKind,
}

impl TxError {
    pub fn decoded(&self) -> Option<&DecodedError> {
        match &self.kind {
            TxErrorKind::Reverted { decoded, .. } => decoded.as_ref(),
            _ => None,
        }
    }

    pub fn revert_data(&self) -> Option<&Bytes> {
        match &self.kind {
            TxErrorKind::Reverted { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    pub fn is_revert(&self) -> bool {
        matches!(self.kind, TxErrorKind::Reverted { .. })
    }
}

impl fmt::Display for TxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{}: {}", label, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for TxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// Submits a transaction exactly once and waits for it to be included.
///
/// On failure the revert payload (if any) is decoded against `decoders` in
/// order, the outcome is logged, and the classified error is returned. Nothing
/// is retried: deployment steps are not idempotent.
#[instrument(skip_all, fields(label = label.unwrap_or_default()))]
pub async fn execute_tx<F, Fut, P, E>(
    submit: F,
    label: Option<&str>,
    decoders: &[Interface],
) -> Result<TransactionReceipt, TxError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<P, E>>,
    P: InFlight,
    E: RevertSource,
{
    let pending = match submit().await {
        Ok(pending) => pending,
        Err(e) => return Err(report_failure(label, None, &e, decoders)),
    };

    let tx_hash = pending.tx_hash();
    debug!(?tx_hash, "Transaction submitted, awaiting receipt...");

    match pending.confirm().await {
        Ok(Some(receipt)) if receipt.status == Some(TX_FAILURE_STATUS) => {
            let kind = TxErrorKind::Reverted {
                tx_hash: Some(receipt.transaction_hash),
                message: "status 0".to_string(),
                data: None,
                decoded: None,
            };
            error!(tx_hash = ?receipt.transaction_hash, block = ?receipt.block_number, "❌ Transaction reverted on-chain (status 0).");
            Err(TxError { label: label.map(str::to_owned), kind })
        }
        Ok(Some(receipt)) => {
            info!(
                tx_hash = ?receipt.transaction_hash,
                block = ?receipt.block_number,
                gas_used = ?receipt.gas_used,
                logs = receipt.logs.len(),
                "✅ Transaction confirmed."
            );
            Ok(receipt)
        }
        Ok(None) => {
            error!(?tx_hash, "⚠️ Receipt not found (dropped/replaced?).");
            Err(TxError { label: label.map(str::to_owned), kind: TxErrorKind::Dropped { tx_hash } })
        }
        Err(e) => Err(report_failure(label, Some(tx_hash), &e, decoders)),
    }
}

fn report_failure<E: RevertSource>(
    label: Option<&str>,
    tx_hash: Option<TxHash>,
    failure: &E,
    decoders: &[Interface],
) -> TxError {
    let message = failure.to_string();
    let label = label.map(str::to_owned);

    if !failure.is_revert() {
        error!(?tx_hash, error = %message, "❌ Transaction rejected.");
        return TxError { label, kind: TxErrorKind::Submission { message } };
    }

    let data = failure.revert_data();
    let decoded = data.as_ref().and_then(|d| decoders.decode_error(d));
    match &decoded {
        Some(decoded) => {
            let args: Vec<String> = decoded.args.iter().map(|(_, t)| format!("{:?}", t)).collect();
            error!(?tx_hash, error_name = %decoded.name, ?args, "❌ Transaction reverted with custom error.");
        }
        None => {
            error!(?tx_hash, error = %message, data = ?data, "❌ Transaction reverted.");
        }
    }
    TxError { label, kind: TxErrorKind::Reverted { tx_hash, message, data, decoded } }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_failure_classification() {
        assert!(!CallFailure::rejected("insufficient funds for gas").is_revert());
        assert!(CallFailure::rejected("execution reverted").is_revert());
        assert!(CallFailure::reverted("boom", vec![0x01, 0x02, 0x03, 0x04]).is_revert());
    }

    #[test]
    fn label_prefixes_display() {
        let err = TxError {
            label: Some("register pool".into()),
            kind: TxErrorKind::Submission { message: "nonce too low".into() },
        };
        assert_eq!(err.to_string(), "register pool: transaction rejected before inclusion: nonce too low");

        let err = TxError { label: None, kind: TxErrorKind::Submission { message: "nonce too low".into() } };
        assert_eq!(err.to_string(), "transaction rejected before inclusion: nonce too low");
    }
}
