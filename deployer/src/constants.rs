// deployer/src/constants.rs
// Role ids and object types as defined by the GIF framework contracts.

pub const DISTRIBUTION_OWNER_ROLE: u64 = 2;
pub const POOL_OWNER_ROLE: u64 = 4;
pub const PRODUCT_OWNER_ROLE: u64 = 5;

pub const OBJECT_TYPE_PRODUCT: u8 = 110;
pub const OBJECT_TYPE_DISTRIBUTION: u8 = 120;
pub const OBJECT_TYPE_POOL: u8 = 140;

/// Execution delay passed along with every role grant.
pub const GRANT_EXECUTION_DELAY: u32 = 0;

pub fn role_name(role: u64) -> &'static str {
    match role {
        DISTRIBUTION_OWNER_ROLE => "DISTRIBUTION_OWNER_ROLE",
        POOL_OWNER_ROLE => "POOL_OWNER_ROLE",
        PRODUCT_OWNER_ROLE => "PRODUCT_OWNER_ROLE",
        _ => "UNKNOWN_ROLE",
    }
}
