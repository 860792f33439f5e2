// deployer/src/config.rs

use ethers::types::{Address, U256};
use std::{env, path::PathBuf};
use dotenv::dotenv;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";
pub const DEFAULT_DEPLOYMENT_ID: &str = "44";
/// Hardhat's well-known development mnemonic.
pub const DEFAULT_MNEMONIC: &str = "test test test test test test test test test test test junk";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not set")]
    Missing { var: &'static str },
    #[error("{var}={value:?} is not a valid {expected}")]
    Invalid { var: &'static str, value: String, expected: &'static str },
    #[error("no address variable is known for library {0}")]
    UnknownLibrary(String),
}

/// Addresses of the pre-deployed library contracts the components link against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryAddresses {
    pub amount_lib: Option<Address>,
    pub fee_lib: Option<Address>,
    pub nft_id_lib: Option<Address>,
    pub referral_lib: Option<Address>,
    pub risk_id_lib: Option<Address>,
    pub role_id_lib: Option<Address>,
    pub seconds_lib: Option<Address>,
    pub timestamp_lib: Option<Address>,
    pub ufixed_lib: Option<Address>,
}

impl LibraryAddresses {
    /// Resolves a library by its Solidity name, failing with the env var to set.
    pub fn require(&self, library: &str) -> Result<Address, ConfigError> {
        let (value, var) = match library {
            "AmountLib" => (self.amount_lib, "AMOUNTLIB_ADDRESS"),
            "FeeLib" => (self.fee_lib, "FEELIB_ADDRESS"),
            "NftIdLib" => (self.nft_id_lib, "NFTIDLIB_ADDRESS"),
            "ReferralLib" => (self.referral_lib, "REFERRALLIB_ADDRESS"),
            "RiskIdLib" => (self.risk_id_lib, "RISKIDLIB_ADDRESS"),
            "RoleIdLib" => (self.role_id_lib, "ROLEIDLIB_ADDRESS"),
            "SecondsLib" => (self.seconds_lib, "SECONDSLIB_ADDRESS"),
            "TimestampLib" => (self.timestamp_lib, "TIMESTAMPLIB_ADDRESS"),
            "UFixedLib" => (self.ufixed_lib, "UFIXEDLIB_ADDRESS"),
            _ => return Err(ConfigError::UnknownLibrary(library.to_string())),
        };
        value.ok_or(ConfigError::Missing { var })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Network & Keys
    pub rpc_url: String,
    pub mnemonic: String,

    // Build output
    pub artifacts_dir: PathBuf,

    // Contract Addresses
    pub libraries: LibraryAddresses,
    pub registry_address: Option<Address>,
    pub instance_address: Option<Address>,
    pub instance_nft_id: Option<U256>,

    pub deployment_id: String,
}

impl Config {
    pub fn require_registry(&self) -> Result<Address, ConfigError> {
        self.registry_address.ok_or(ConfigError::Missing { var: "REGISTRY_ADDRESS" })
    }

    pub fn require_instance(&self) -> Result<(Address, U256), ConfigError> {
        let address = self.instance_address.ok_or(ConfigError::Missing { var: "INSTANCE_ADDRESS" })?;
        let nft_id = self.instance_nft_id.ok_or(ConfigError::Missing { var: "INSTANCE_NFTID" })?;
        Ok((address, nft_id))
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|s| !s.trim().is_empty());
        let parse_optional_address = |var: &'static str| -> Result<Option<Address>, ConfigError> {
            match get(var) {
                Some(s) => s.trim().parse::<Address>().map(Some).map_err(|_| ConfigError::Invalid {
                    var,
                    value: s,
                    expected: "address",
                }),
                None => Ok(None),
            }
        };
        let parse_optional_u256 = |var: &'static str| -> Result<Option<U256>, ConfigError> {
            match get(var) {
                Some(s) => {
                    let trimmed = s.trim();
                    let parsed = match trimmed.strip_prefix("0x") {
                        Some(hex) => U256::from_str_radix(hex, 16).ok(),
                        None => U256::from_dec_str(trimmed).ok(),
                    };
                    parsed.map(Some).ok_or(ConfigError::Invalid { var, value: s, expected: "uint256" })
                }
                None => Ok(None),
            }
        };

        let libraries = LibraryAddresses {
            amount_lib: parse_optional_address("AMOUNTLIB_ADDRESS")?,
            fee_lib: parse_optional_address("FEELIB_ADDRESS")?,
            nft_id_lib: parse_optional_address("NFTIDLIB_ADDRESS")?,
            referral_lib: parse_optional_address("REFERRALLIB_ADDRESS")?,
            risk_id_lib: parse_optional_address("RISKIDLIB_ADDRESS")?,
            role_id_lib: parse_optional_address("ROLEIDLIB_ADDRESS")?,
            seconds_lib: parse_optional_address("SECONDSLIB_ADDRESS")?,
            timestamp_lib: parse_optional_address("TIMESTAMPLIB_ADDRESS")?,
            ufixed_lib: parse_optional_address("UFIXEDLIB_ADDRESS")?,
        };

        Ok(Config {
            rpc_url: get("RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            mnemonic: get("DEPLOYER_MNEMONIC").unwrap_or_else(|| DEFAULT_MNEMONIC.to_string()),
            artifacts_dir: PathBuf::from(get("ARTIFACTS_DIR").unwrap_or_else(|| DEFAULT_ARTIFACTS_DIR.to_string())),
            libraries,
            registry_address: parse_optional_address("REGISTRY_ADDRESS")?,
            instance_address: parse_optional_address("INSTANCE_ADDRESS")?,
            instance_nft_id: parse_optional_u256("INSTANCE_NFTID")?,
            deployment_id: get("DEPLOYMENT_ID").unwrap_or_else(|| DEFAULT_DEPLOYMENT_ID.to_string()),
        })
    }
}

pub fn load_config() -> Result<Config, ConfigError> {
    info!("Loading configuration from .env file...");
    dotenv().ok();

    let config = Config::from_lookup(|var| env::var(var).ok())?;
    info!(rpc_url = %config.rpc_url, artifacts = ?config.artifacts_dir, "✅ Configuration loaded.");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.mnemonic, DEFAULT_MNEMONIC);
        assert_eq!(config.artifacts_dir, PathBuf::from("artifacts"));
        assert_eq!(config.deployment_id, "44");
        assert_eq!(config.libraries, LibraryAddresses::default());
        assert_eq!(config.require_registry(), Err(ConfigError::Missing { var: "REGISTRY_ADDRESS" }));
    }

    #[test]
    fn parses_addresses_and_nft_id() {
        let config = Config::from_lookup(lookup(&[
            ("NFTIDLIB_ADDRESS", "0x5FbDB2315678afecb367f032d93F642f64180aa3"),
            ("INSTANCE_ADDRESS", "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"),
            ("INSTANCE_NFTID", "23133705"),
            ("RPC_URL", "http://localhost:9545"),
        ]))
        .unwrap();

        assert_eq!(config.rpc_url, "http://localhost:9545");
        let nft_id_lib = config.libraries.require("NftIdLib").unwrap();
        assert_eq!(nft_id_lib, "0x5FbDB2315678afecb367f032d93F642f64180aa3".parse::<Address>().unwrap());
        let (_, nft_id) = config.require_instance().unwrap();
        assert_eq!(nft_id, U256::from(23_133_705u64));
        assert_eq!(
            config.libraries.require("FeeLib"),
            Err(ConfigError::Missing { var: "FEELIB_ADDRESS" })
        );
    }

    #[test]
    fn rejects_malformed_values() {
        let err = Config::from_lookup(lookup(&[("REGISTRY_ADDRESS", "0x1234")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "REGISTRY_ADDRESS", .. }));

        let err = Config::from_lookup(lookup(&[("INSTANCE_NFTID", "twelve")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "INSTANCE_NFTID", .. }));
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = Config::from_lookup(lookup(&[("AMOUNTLIB_ADDRESS", "  "), ("RPC_URL", "")])).unwrap();
        assert_eq!(config.libraries.amount_lib, None);
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
    }
}
