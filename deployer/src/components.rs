// deployer/src/components.rs
// Instance-side setup: role grants plus deploy-and-register of the three components.

use crate::{
    accounts::Client,
    artifacts::ArtifactStore,
    bindings::{AccessManagerExtended, Component, IInstance, IREGISTRY_ABI},
    config::LibraryAddresses,
    constants::{
        role_name, DISTRIBUTION_OWNER_ROLE, GRANT_EXECUTION_DELAY, OBJECT_TYPE_DISTRIBUTION, OBJECT_TYPE_POOL,
        OBJECT_TYPE_PRODUCT, POOL_OWNER_ROLE, PRODUCT_OWNER_ROLE,
    },
    decoding::Interface,
    deploy::{deploy_contract, link_libraries, DeployedContract},
    logs::{extract_from_receipt, extract_from_receipt_as},
    transaction::execute_tx,
    utils::{encode_bytes32_string, unique_name},
};

use ethers::{
    abi::Token,
    providers::Middleware,
    types::{Address, TransactionReceipt, U256},
};
use eyre::{ensure, eyre, Result, WrapErr};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

pub const DISTRIBUTION_LIBRARIES: [&str; 3] = ["AmountLib", "NftIdLib", "ReferralLib"];
pub const POOL_LIBRARIES: [&str; 5] = ["NftIdLib", "AmountLib", "FeeLib", "RoleIdLib", "UFixedLib"];
pub const PRODUCT_LIBRARIES: [&str; 1] = ["NftIdLib"];

/// The instance the components are attached to.
#[derive(Debug, Clone)]
pub struct InstanceContext {
    pub address: Address,
    pub nft_id: U256,
    pub access_manager: Address,
    pub registry: Address,
}

impl InstanceContext {
    /// Reads the access manager and registry addresses from the instance.
    pub async fn connect(client: Arc<Client>, address: Address, nft_id: U256) -> Result<Self> {
        let instance = IInstance::new(address, client);
        let access_manager = instance
            .get_instance_access_manager()
            .call()
            .await
            .wrap_err("Failed to read instance access manager")?;
        let registry = instance.get_registry().call().await.wrap_err("Failed to read registry address")?;
        info!(?address, %nft_id, ?access_manager, ?registry, "✅ Connected to instance.");
        Ok(Self { address, nft_id, access_manager, registry })
    }
}

/// Everything the component deployments share.
#[derive(Debug, Clone)]
pub struct ComponentSetup {
    pub artifacts: ArtifactStore,
    pub libraries: LibraryAddresses,
    pub registry: Address,
    pub registry_interface: Interface,
    pub instance_nft_id: U256,
    pub token: Address,
}

impl ComponentSetup {
    pub fn new(
        artifacts: ArtifactStore,
        libraries: LibraryAddresses,
        instance: &InstanceContext,
        token: Address,
    ) -> Self {
        let registry_interface = Interface::new("IRegistry", IREGISTRY_ABI.clone());
        Self {
            artifacts,
            libraries,
            registry: instance.registry,
            registry_interface,
            instance_nft_id: instance.nft_id,
            token,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredComponent {
    pub name: String,
    pub address: Address,
    pub nft_id: U256,
}

/// Grants `role` to `account` on the instance access manager and checks the
/// `RoleGranted` event names the same account.
#[instrument(skip_all, fields(role = role_name(role), ?account))]
pub async fn grant_role(
    client: Arc<Client>,
    access_manager: Address,
    role: u64,
    account: Address,
) -> Result<TransactionReceipt> {
    let manager = AccessManagerExtended::new(access_manager, client);
    let interface = Interface::new("AccessManagerExtended", manager.abi().clone());
    let call = manager.grant_role(role, account, GRANT_EXECUTION_DELAY);

    let label = format!("grant {} to {:?}", role_name(role), account);
    let decoders = [interface.clone(), Interface::standard_errors()];
    let receipt = execute_tx(|| call.send(), Some(label.as_str()), &decoders).await?;

    let granted: Address = extract_from_receipt_as(&receipt, &interface, "RoleGranted", "account")?;
    ensure!(granted == account, "RoleGranted names {:?}, expected {:?}", granted, account);
    info!("✅ {} granted to {:?}", role_name(role), account);
    Ok(receipt)
}

/// Grants the three component owner roles.
pub async fn grant_component_roles(
    instance_owner: Arc<Client>,
    access_manager: Address,
    distribution_owner: Address,
    pool_owner: Address,
    product_owner: Address,
) -> Result<()> {
    for (role, account) in [
        (DISTRIBUTION_OWNER_ROLE, distribution_owner),
        (POOL_OWNER_ROLE, pool_owner),
        (PRODUCT_OWNER_ROLE, product_owner),
    ] {
        grant_role(instance_owner.clone(), access_manager, role, account).await?;
    }
    Ok(())
}

/// Sends `register()` from the component owner and returns the NFT id the
/// registry assigned, read from its `LogRegistration` event.
#[instrument(skip_all, fields(component = %deployed.name))]
pub async fn register_component(
    owner: Arc<Client>,
    setup: &ComponentSetup,
    deployed: &DeployedContract,
    object_type: u8,
) -> Result<U256> {
    let component = Component::new(deployed.address, owner.clone());
    let call = component.register();

    let label = format!("register {}", deployed.name);
    let decoders = [deployed.interface(), setup.registry_interface.clone(), Interface::standard_errors()];
    let receipt = execute_tx(|| call.send(), Some(label.as_str()), &decoders).await?;

    let registered_type: u8 = extract_from_receipt_as(&receipt, &setup.registry_interface, "LogRegistration", "objectType")?;
    ensure!(
        registered_type == object_type,
        "{} registered as object type {}, expected {}",
        deployed.name,
        registered_type,
        object_type
    );
    let nft_id = extract_from_receipt(&receipt, &setup.registry_interface, "LogRegistration", "nftId")?
        .as_uint()
        .ok_or_else(|| eyre!("LogRegistration.nftId is not an integer"))?;
    verify_nft_id(owner, deployed.address, nft_id).await?;
    info!(%nft_id, "✅ {} registered with NFT id {}", deployed.name, nft_id);
    Ok(nft_id)
}

/// Checks the component's own `getNftId()` against the id the registry logged.
pub async fn verify_nft_id<M: Middleware + 'static>(client: Arc<M>, component: Address, expected: U256) -> Result<()> {
    let on_chain = Component::new(component, client)
        .get_nft_id()
        .call()
        .await
        .wrap_err("getNftId failed")?;
    ensure!(
        U256::from(on_chain) == expected,
        "component {:?} reports NFT id {}, registry logged {}",
        component,
        on_chain,
        expected
    );
    Ok(())
}

fn empty_bytes32() -> Result<Token> {
    Ok(Token::FixedBytes(encode_bytes32_string("")?.to_vec()))
}

async fn deploy_and_register(
    owner: Arc<Client>,
    setup: &ComponentSetup,
    contract: &str,
    name: String,
    libraries: &[&str],
    args: Vec<Token>,
    object_type: u8,
) -> Result<RegisteredComponent> {
    let link = link_libraries(&setup.libraries, libraries)?;
    let deployed = deploy_contract(owner.clone(), &setup.artifacts, contract, args, &link).await?;
    let nft_id = register_component(owner, setup, &deployed, object_type).await?;
    Ok(RegisteredComponent { name, address: deployed.address, nft_id })
}

pub async fn deploy_and_register_distribution(
    owner: Arc<Client>,
    setup: &ComponentSetup,
) -> Result<RegisteredComponent> {
    let name = unique_name("BasicDistribution");
    info!(%name, "Deploying distribution...");
    let args = vec![
        Token::Address(setup.registry),
        Token::Uint(setup.instance_nft_id),
        Token::Address(owner.address()),
        Token::String(name.clone()),
        Token::Address(setup.token),
        empty_bytes32()?,
        empty_bytes32()?,
    ];
    deploy_and_register(owner, setup, "BasicDistribution", name, &DISTRIBUTION_LIBRARIES, args, OBJECT_TYPE_DISTRIBUTION)
        .await
}

pub async fn deploy_and_register_pool(owner: Arc<Client>, setup: &ComponentSetup) -> Result<RegisteredComponent> {
    let name = unique_name("BasicPool");
    info!(%name, "Deploying pool...");
    let args = vec![
        Token::Address(setup.registry),
        Token::Uint(setup.instance_nft_id),
        Token::Address(owner.address()),
        Token::String(name.clone()),
        Token::Address(setup.token),
        Token::Bool(false), // not an interceptor
        empty_bytes32()?,
        empty_bytes32()?,
    ];
    deploy_and_register(owner, setup, "BasicPool", name, &POOL_LIBRARIES, args, OBJECT_TYPE_POOL).await
}

pub async fn deploy_and_register_product(
    owner: Arc<Client>,
    setup: &ComponentSetup,
    pool: Address,
    distribution: Address,
) -> Result<RegisteredComponent> {
    let name = unique_name("InsuranceProduct");
    info!(%name, "Deploying product...");
    let args = vec![
        Token::Address(setup.registry),
        Token::Uint(setup.instance_nft_id),
        Token::Address(owner.address()),
        Token::String(name.clone()),
        Token::Address(setup.token),
        Token::Bool(false),
        Token::Address(pool),
        Token::Address(distribution),
        empty_bytes32()?,
        empty_bytes32()?,
    ];
    deploy_and_register(owner, setup, "InsuranceProduct", name, &PRODUCT_LIBRARIES, args, OBJECT_TYPE_PRODUCT).await
}
