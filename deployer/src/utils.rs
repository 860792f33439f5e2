// deployer/src/utils.rs

use ethers::utils::format_bytes32_string;
use eyre::{bail, eyre, Result};
use rand::Rng;

/// `bytes32` encoding of a short string, as `encodeBytes32String` does.
pub fn encode_bytes32_string(value: &str) -> Result<[u8; 32]> {
    // one byte is reserved for the null terminator
    if value.len() > 31 {
        bail!("{:?} is too long for bytes32", value);
    }
    format_bytes32_string(value).map_err(|e| eyre!("Failed to encode {:?} as bytes32: {}", value, e))
}

/// Short random hex suffix used to keep component names unique per run.
pub fn random_suffix() -> String {
    let value: u32 = rand::thread_rng().gen();
    format!("{:06x}", value & 0x00ff_ffff)
}

pub fn unique_name(prefix: &str) -> String {
    format!("{}-{}", prefix, random_suffix())
}
