// deployer/src/deploy.rs

use crate::{
    accounts::Client,
    artifacts::ArtifactStore,
    config::{ConfigError, LibraryAddresses},
    decoding::Interface,
    transaction::execute_tx,
};

use ethers::{
    abi::{Abi, Token},
    prelude::Middleware,
    types::{Address, Eip1559TransactionRequest, TransactionReceipt},
};
use eyre::{eyre, Result, WrapErr};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{info, instrument};

/// A freshly deployed contract.
#[derive(Debug, Clone)]
pub struct DeployedContract {
    pub name: String,
    pub address: Address,
    pub abi: Abi,
    pub receipt: TransactionReceipt,
}

impl DeployedContract {
    pub fn interface(&self) -> Interface {
        Interface::new(self.name.clone(), self.abi.clone())
    }
}

/// Deploys `name` from the artifact store, linking `libraries` into its bytecode.
#[instrument(skip_all, fields(contract = %name))]
pub async fn deploy_contract(
    client: Arc<Client>,
    artifacts: &ArtifactStore,
    name: &str,
    args: Vec<Token>,
    libraries: &BTreeMap<String, Address>,
) -> Result<DeployedContract> {
    let artifact = artifacts.load(name).wrap_err_with(|| format!("Failed to load artifact for {}", name))?;
    let bytecode = artifact.link(libraries)?;
    let data = artifact.deployment_data(bytecode, &args)?;

    info!(deployer = ?client.address(), libraries = libraries.len(), "Deploying {}...", name);
    let tx = Eip1559TransactionRequest::new().from(client.address()).data(data);

    let interfaces = [artifact.interface(), Interface::standard_errors()];
    let label = format!("deploy {}", name);
    let receipt = execute_tx(|| client.send_transaction(tx, None), Some(label.as_str()), &interfaces).await?;

    let address = receipt
        .contract_address
        .ok_or_else(|| eyre!("Deployment receipt {:?} has no contract address", receipt.transaction_hash))?;
    info!(?address, "✅ {} deployed at {:?}", name, address);

    Ok(DeployedContract { name: name.to_string(), address, abi: artifact.abi, receipt })
}

/// Builds the link map for `names` from the configured library addresses.
pub fn link_libraries(addresses: &LibraryAddresses, names: &[&str]) -> Result<BTreeMap<String, Address>, ConfigError> {
    names
        .iter()
        .map(|name| addresses.require(name).map(|address| (name.to_string(), address)))
        .collect()
}
