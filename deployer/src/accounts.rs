// deployer/src/accounts.rs
// Role accounts, derived from the deployment mnemonic at fixed indices.

use ethers::{
    prelude::{Http, LocalWallet, Middleware, Provider, Signer, SignerMiddleware},
    signers::{coins_bip39::English, MnemonicBuilder},
    types::Address,
    utils::format_ether,
};
use eyre::{Result, WrapErr};
use std::sync::Arc;
use tracing::info;

pub type Client = SignerMiddleware<Provider<Http>, LocalWallet>;

pub const PROTOCOL_OWNER_INDEX: u32 = 0;
pub const MASTER_INSTANCE_OWNER_INDEX: u32 = 1;
pub const PRODUCT_OWNER_INDEX: u32 = 2;
pub const POOL_OWNER_INDEX: u32 = 3;
pub const DISTRIBUTION_OWNER_INDEX: u32 = 4;
pub const INSTANCE_SERVICE_OWNER_INDEX: u32 = 5;
pub const INSTANCE_OWNER_INDEX: u32 = 10;

/// One signing client per deployment role.
#[derive(Debug, Clone)]
pub struct NamedAccounts {
    pub protocol_owner: Arc<Client>,
    pub master_instance_owner: Arc<Client>,
    pub product_owner: Arc<Client>,
    pub pool_owner: Arc<Client>,
    pub distribution_owner: Arc<Client>,
    pub instance_service_owner: Arc<Client>,
    pub instance_owner: Arc<Client>,
}

impl NamedAccounts {
    pub fn roles(&self) -> [(&'static str, &Arc<Client>); 7] {
        [
            ("protocolOwner", &self.protocol_owner),
            ("masterInstanceOwner", &self.master_instance_owner),
            ("productOwner", &self.product_owner),
            ("poolOwner", &self.pool_owner),
            ("distributionOwner", &self.distribution_owner),
            ("instanceServiceOwner", &self.instance_service_owner),
            ("instanceOwner", &self.instance_owner),
        ]
    }
}

/// Derives the wallet at `index` on the standard `m/44'/60'/0'/0/{index}` path.
pub fn derive_wallet(mnemonic: &str, index: u32, chain_id: u64) -> Result<LocalWallet> {
    let wallet = MnemonicBuilder::<English>::default()
        .phrase(mnemonic)
        .index(index)
        .wrap_err_with(|| format!("Invalid derivation index {}", index))?
        .build()
        .wrap_err("Failed to derive wallet from mnemonic")?;
    Ok(wallet.with_chain_id(chain_id))
}

pub async fn get_named_accounts(provider: Provider<Http>, mnemonic: &str) -> Result<NamedAccounts> {
    let chain_id = provider.get_chainid().await.wrap_err("Failed to fetch chain id")?.as_u64();
    info!(chain_id, "RPC OK.");

    let client = |index: u32| -> Result<Arc<Client>> {
        let wallet = derive_wallet(mnemonic, index, chain_id)?;
        Ok(Arc::new(SignerMiddleware::new(provider.clone(), wallet)))
    };

    let accounts = NamedAccounts {
        protocol_owner: client(PROTOCOL_OWNER_INDEX)?,
        master_instance_owner: client(MASTER_INSTANCE_OWNER_INDEX)?,
        product_owner: client(PRODUCT_OWNER_INDEX)?,
        pool_owner: client(POOL_OWNER_INDEX)?,
        distribution_owner: client(DISTRIBUTION_OWNER_INDEX)?,
        instance_service_owner: client(INSTANCE_SERVICE_OWNER_INDEX)?,
        instance_owner: client(INSTANCE_OWNER_INDEX)?,
    };
    print_balances(&accounts).await?;
    Ok(accounts)
}

pub async fn print_balances(accounts: &NamedAccounts) -> Result<()> {
    for (role, client) in accounts.roles() {
        let address: Address = client.address();
        let balance = client
            .get_balance(address, None)
            .await
            .wrap_err_with(|| format!("Failed to fetch balance of {}", role))?;
        info!("{} {:?}: {}", role, address, format_ether(balance));
    }
    Ok(())
}
