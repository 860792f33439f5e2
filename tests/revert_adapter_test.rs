// tests/revert_adapter_test.rs
// Executor behaviour over the real ethers error and pending-transaction types.
#![allow(clippy::all)]

use gif_deployer::{execute_tx, DecodedError, Interface, TxErrorKind};

use ethers::{
    abi::{self, Token},
    contract::ContractError,
    middleware::signer::SignerMiddlewareError,
    providers::{HttpClientError, JsonRpcError, MockProvider, PendingTransaction, Provider, ProviderError},
    signers::LocalWallet,
    types::{Address, Bytes, Transaction, TransactionReceipt, H256, U64},
    utils::id,
};
use serde_json::json;
use std::{future::ready, time::Duration};

type Pending = PendingTransaction<'static, MockProvider>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn pool_interface() -> Interface {
    Interface::parse("BasicPool", &["error ErrorPoolNotRegistered(uint96 nftId, address caller)"]).unwrap()
}

fn not_registered_revert(nft_id: u64, caller: Address) -> Vec<u8> {
    let mut data = id("ErrorPoolNotRegistered(uint96,address)").to_vec();
    data.extend(abi::encode(&[Token::Uint(nft_id.into()), Token::Address(caller)]));
    data
}

fn rpc_error(code: i64, message: &str, data: Option<serde_json::Value>) -> ProviderError {
    let err = JsonRpcError { code, message: message.to_string(), data };
    ProviderError::JsonRpcClientError(Box::new(HttpClientError::JsonRpcError(err)))
}

fn assert_not_registered(decoded: Option<&DecodedError>, nft_id: u64, caller: Address) {
    let decoded = decoded.expect("custom error should decode");
    assert_eq!(decoded.name, "ErrorPoolNotRegistered");
    assert_eq!(
        decoded.args,
        vec![("nftId".to_string(), Token::Uint(nft_id.into())), ("caller".to_string(), Token::Address(caller))]
    );
}

#[tokio::test]
async fn json_rpc_revert_data_is_decoded() {
    init_tracing();
    let caller = Address::repeat_byte(0x42);
    let data = not_registered_revert(9, caller);
    let err = rpc_error(3, "execution reverted", Some(json!(format!("0x{}", hex::encode(&data)))));

    let err = execute_tx(|| ready(Err::<Pending, _>(err)), Some("register pool"), &[pool_interface()])
        .await
        .unwrap_err();

    assert!(err.is_revert());
    assert_eq!(err.revert_data().map(|d| d.to_vec()), Some(data));
    assert_not_registered(err.decoded(), 9, caller);
}

#[tokio::test]
async fn contract_revert_bytes_are_decoded() {
    init_tracing();
    let caller = Address::repeat_byte(0x07);
    let err = ContractError::<Provider<MockProvider>>::Revert(Bytes::from(not_registered_revert(3, caller)));

    let err = execute_tx(
        || ready(Err::<Pending, _>(err)),
        None,
        &[Interface::standard_errors(), pool_interface()],
    )
    .await
    .unwrap_err();

    assert!(matches!(err.kind, TxErrorKind::Reverted { tx_hash: None, .. }));
    assert_not_registered(err.decoded(), 3, caller);
}

#[tokio::test]
async fn signer_middleware_revert_is_decoded() {
    init_tracing();
    let caller = Address::repeat_byte(0x11);
    let data = not_registered_revert(5, caller);
    let inner = rpc_error(3, "execution reverted", Some(json!(format!("0x{}", hex::encode(&data)))));
    let err = SignerMiddlewareError::<Provider<MockProvider>, LocalWallet>::MiddlewareError(inner);

    let err = execute_tx(|| ready(Err::<Pending, _>(err)), Some("grant role"), &[pool_interface()])
        .await
        .unwrap_err();

    assert_not_registered(err.decoded(), 5, caller);
}

#[tokio::test]
async fn nonce_too_low_is_a_submission_failure() {
    init_tracing();
    let err = rpc_error(-32000, "nonce too low", None);

    let err = execute_tx(|| ready(Err::<Pending, _>(err)), Some("deploy UsdcMock"), &[pool_interface()])
        .await
        .unwrap_err();

    assert!(!err.is_revert());
    assert!(err.revert_data().is_none());
    assert!(matches!(err.kind, TxErrorKind::Submission { ref message } if message.contains("nonce too low")));
}

#[tokio::test]
async fn unknown_selector_keeps_the_raw_payload() {
    init_tracing();
    let err = rpc_error(3, "execution reverted", Some(json!("0xdeadbeef0001")));

    let err = execute_tx(|| ready(Err::<Pending, _>(err)), None, &[pool_interface()]).await.unwrap_err();

    assert!(err.is_revert());
    assert!(err.decoded().is_none());
    assert_eq!(err.revert_data().map(|d| d.to_vec()), Some(vec![0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]));
}

fn mocked_provider() -> (Provider<MockProvider>, MockProvider) {
    let (provider, mock) = Provider::mocked();
    (provider.interval(Duration::from_millis(1)), mock)
}

#[tokio::test]
async fn pending_transaction_resolves_to_its_receipt() {
    init_tracing();
    let (provider, mock) = mocked_provider();
    let hash = H256::repeat_byte(0x0a);
    let expected = TransactionReceipt {
        transaction_hash: hash,
        block_number: Some(U64::from(12)),
        status: Some(U64::from(1)),
        ..Default::default()
    };
    // Responses are served last-in first-out: the transaction lookup comes first.
    mock.push::<TransactionReceipt, _>(expected.clone()).unwrap();
    mock.push::<Transaction, _>(Transaction { hash, block_number: Some(U64::from(12)), ..Default::default() })
        .unwrap();

    let receipt = tokio::time::timeout(
        Duration::from_secs(5),
        execute_tx(|| ready(Ok::<_, ProviderError>(PendingTransaction::new(hash, &provider))), Some("register pool"), &[]),
    )
    .await
    .expect("confirmation should not hang")
    .unwrap();

    assert_eq!(receipt.transaction_hash, hash);
    assert_eq!(receipt.block_number, Some(U64::from(12)));
}

#[tokio::test]
async fn pending_transaction_unknown_to_the_node_is_dropped() {
    init_tracing();
    let (provider, mock) = mocked_provider();
    let hash = H256::repeat_byte(0x0b);
    mock.push::<Option<Transaction>, Option<Transaction>>(None).unwrap();

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        execute_tx(|| ready(Ok::<_, ProviderError>(PendingTransaction::new(hash, &provider))), None, &[]),
    )
    .await
    .expect("confirmation should not hang")
    .unwrap_err();

    assert!(matches!(err.kind, TxErrorKind::Dropped { tx_hash } if tx_hash == hash));
}
