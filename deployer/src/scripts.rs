// deployer/src/scripts.rs
// The two deployment scripts exposed by the CLI.

use crate::{
    accounts::get_named_accounts,
    artifacts::ArtifactStore,
    bindings::GifDeployer,
    components::{
        deploy_and_register_distribution, deploy_and_register_pool, deploy_and_register_product,
        grant_component_roles, ComponentSetup, InstanceContext, RegisteredComponent,
    },
    config::Config,
    deploy::{deploy_contract, link_libraries},
    utils::encode_bytes32_string,
};

use ethers::{
    abi::{ParamType, Token},
    prelude::{Http, Provider},
    types::{Address, U256},
};
use eyre::{bail, Result, WrapErr};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

pub const DISTRIBUTION_DEPLOYER_LIBRARIES: [&str; 3] = ["AmountLib", "NftIdLib", "ReferralLib"];
pub const POOL_DEPLOYER_LIBRARIES: [&str; 5] = ["AmountLib", "FeeLib", "NftIdLib", "RoleIdLib", "UFixedLib"];
pub const PRODUCT_DEPLOYER_LIBRARIES: [&str; 3] = ["AmountLib", "FeeLib", "NftIdLib"];
pub const DEPLOYER_LIBRARIES: [&str; 9] = [
    "AmountLib",
    "FeeLib",
    "NftIdLib",
    "ReferralLib",
    "RiskIdLib",
    "RoleIdLib",
    "SecondsLib",
    "TimestampLib",
    "UFixedLib",
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentsSummary {
    pub instance: Address,
    pub instance_nft_id: U256,
    pub usdc: Address,
    pub distribution: RegisteredComponent,
    pub pool: RegisteredComponent,
    pub product: RegisteredComponent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployerSummary {
    pub deployer: Address,
    pub instance: Address,
    pub instance_nft_id: u128,
    pub usdc: Address,
    pub distribution: Address,
    pub distribution_nft_id: u128,
    pub pool: Address,
    pub pool_nft_id: u128,
    pub product: Address,
    pub product_nft_id: u128,
}

/// Encodes the deployment id as whatever the `Deployer` constructor declares
/// for it. Artifacts without a constructor input fall back to a string.
pub fn deployment_id_token(kind: Option<&ParamType>, deployment_id: &str) -> Result<Token> {
    match kind {
        None | Some(ParamType::String) => Ok(Token::String(deployment_id.to_string())),
        Some(ParamType::Uint(_)) => U256::from_dec_str(deployment_id)
            .map(Token::Uint)
            .wrap_err_with(|| format!("Deployment id {:?} is not a decimal integer", deployment_id)),
        Some(ParamType::FixedBytes(32)) => Ok(Token::FixedBytes(encode_bytes32_string(deployment_id)?.to_vec())),
        Some(other) => bail!("Unsupported deployment id type {}", other),
    }
}

fn connect(config: &Config) -> Result<Provider<Http>> {
    Provider::<Http>::try_from(config.rpc_url.as_str())
        .wrap_err_with(|| format!("Invalid RPC URL {}", config.rpc_url))
}

/// Grants the component owner roles on an existing instance, then deploys and
/// registers a distribution, a pool and a product against it.
pub async fn deploy_components(config: &Config) -> Result<ComponentsSummary> {
    let (instance_address, instance_nft_id) = config.require_instance()?;
    let accounts = get_named_accounts(connect(config)?, &config.mnemonic).await?;
    let artifacts = ArtifactStore::new(&config.artifacts_dir);

    let instance = InstanceContext::connect(accounts.instance_owner.clone(), instance_address, instance_nft_id).await?;

    info!("Granting component owner roles...");
    grant_component_roles(
        accounts.instance_owner.clone(),
        instance.access_manager,
        accounts.distribution_owner.address(),
        accounts.pool_owner.address(),
        accounts.product_owner.address(),
    )
    .await
    .wrap_err("Failed to grant component roles")?;

    let usdc = deploy_contract(accounts.protocol_owner.clone(), &artifacts, "UsdcMock", vec![], &BTreeMap::new())
        .await?
        .address;

    let setup = ComponentSetup::new(artifacts, config.libraries.clone(), &instance, usdc);
    let distribution = deploy_and_register_distribution(accounts.distribution_owner.clone(), &setup)
        .await
        .wrap_err("Distribution deployment failed")?;
    let pool = deploy_and_register_pool(accounts.pool_owner.clone(), &setup)
        .await
        .wrap_err("Pool deployment failed")?;
    let product =
        deploy_and_register_product(accounts.product_owner.clone(), &setup, pool.address, distribution.address)
            .await
            .wrap_err("Product deployment failed")?;

    info!("🎉 Components deployed and registered.");
    Ok(ComponentsSummary { instance: instance.address, instance_nft_id, usdc, distribution, pool, product })
}

/// Deploys the all-in-one `Deployer` contract, which sets up an instance with
/// one component of each kind in its constructor, and reads back what it created.
pub async fn run_deployer(config: &Config) -> Result<DeployerSummary> {
    let registry = config.require_registry()?;
    let accounts = get_named_accounts(connect(config)?, &config.mnemonic).await?;
    let artifacts = ArtifactStore::new(&config.artifacts_dir);
    let client = accounts.distribution_owner.clone();

    let mut libraries = link_libraries(&config.libraries, &DEPLOYER_LIBRARIES)?;
    for (name, needed) in [
        ("DistributionDeployer", &DISTRIBUTION_DEPLOYER_LIBRARIES[..]),
        ("PoolDeployer", &POOL_DEPLOYER_LIBRARIES[..]),
        ("ProductDeployer", &PRODUCT_DEPLOYER_LIBRARIES[..]),
    ] {
        let link = link_libraries(&config.libraries, needed)?;
        let deployed = deploy_contract(client.clone(), &artifacts, name, vec![], &link).await?;
        libraries.insert(name.to_string(), deployed.address);
    }

    let id_type = artifacts.load("Deployer")?.constructor_input(1).cloned();
    let deployment_id = deployment_id_token(id_type.as_ref(), &config.deployment_id)?;
    let args = vec![Token::Address(registry), deployment_id];
    let deployer = deploy_contract(client.clone(), &artifacts, "Deployer", args, &libraries).await?;

    let contract = GifDeployer::new(deployer.address, client);
    let summary = DeployerSummary {
        deployer: deployer.address,
        instance: contract.get_instance().call().await.wrap_err("getInstance failed")?,
        instance_nft_id: contract.get_instance_nft_id().call().await.wrap_err("getInstanceNftId failed")?,
        usdc: contract.get_usdc().call().await.wrap_err("getUsdc failed")?,
        distribution: contract.get_distribution().call().await.wrap_err("getDistribution failed")?,
        distribution_nft_id: contract
            .get_distribution_nft_id()
            .call()
            .await
            .wrap_err("getDistributionNftId failed")?,
        pool: contract.get_pool().call().await.wrap_err("getPool failed")?,
        pool_nft_id: contract.get_pool_nft_id().call().await.wrap_err("getPoolNftId failed")?,
        product: contract.get_product().call().await.wrap_err("getProduct failed")?,
        product_nft_id: contract.get_product_nft_id().call().await.wrap_err("getProductNftId failed")?,
    };

    info!(instance = ?summary.instance, nft_id = summary.instance_nft_id, "instance");
    info!(distribution = ?summary.distribution, nft_id = summary.distribution_nft_id, "distribution");
    info!(pool = ?summary.pool, nft_id = summary.pool_nft_id, "pool");
    info!(product = ?summary.product, nft_id = summary.product_nft_id, "product");
    info!(usdc = ?summary.usdc, "🎉 Deployer finished.");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn deployer_links_every_library_its_parts_need() {
        let all: BTreeSet<_> = DEPLOYER_LIBRARIES.iter().collect();
        for name in DISTRIBUTION_DEPLOYER_LIBRARIES.iter().chain(&POOL_DEPLOYER_LIBRARIES).chain(&PRODUCT_DEPLOYER_LIBRARIES) {
            assert!(all.contains(name), "{}", name);
        }
    }

    #[test]
    fn deployment_id_follows_constructor_type() {
        assert_eq!(deployment_id_token(Some(&ParamType::String), "7").unwrap(), Token::String("7".into()));
        assert_eq!(deployment_id_token(None, "7").unwrap(), Token::String("7".into()));
        assert_eq!(deployment_id_token(Some(&ParamType::Uint(256)), "7").unwrap(), Token::Uint(U256::from(7)));

        let Token::FixedBytes(word) = deployment_id_token(Some(&ParamType::FixedBytes(32)), "7").unwrap() else {
            panic!("expected bytes32");
        };
        assert_eq!(&word[..2], b"7\0");
    }

    #[test]
    fn non_numeric_id_for_uint_constructor_is_rejected() {
        let err = deployment_id_token(Some(&ParamType::Uint(256)), "staging-1").unwrap_err();
        assert!(err.to_string().contains("staging-1"));
        assert!(deployment_id_token(Some(&ParamType::Bool), "1").is_err());
    }

    #[tokio::test]
    async fn scripts_fail_fast_on_missing_addresses() {
        let config = Config::from_lookup(|_| None).unwrap();
        let err = deploy_components(&config).await.unwrap_err();
        assert!(err.to_string().contains("INSTANCE_ADDRESS"));
        let err = run_deployer(&config).await.unwrap_err();
        assert!(err.to_string().contains("REGISTRY_ADDRESS"));
    }
}
