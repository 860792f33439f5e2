// deployer/src/bindings.rs
#![allow(clippy::all)]
use ethers::prelude::abigen;

// NftId, RoleId and ObjectType are user defined value types; the ABI sees the
// underlying uint96 / uint64 / uint8.

abigen!(
    IInstance,
    r#"[
        function getInstanceAccessManager() external view returns (address)
        function getRegistry() external view returns (address)
    ]"#
);

abigen!(
    AccessManagerExtended,
    r#"[
        function grantRole(uint64 roleId, address account, uint32 executionDelay) external
        event RoleGranted(uint64 indexed roleId, address indexed account, uint32 delay, uint48 since, bool newMember)
    ]"#
);

abigen!(
    IRegistry,
    r#"[
        event LogRegistration(uint96 nftId, uint96 parentNftId, uint8 objectType, bool isInterceptor, address objectAddress, address initialOwner)
    ]"#,
    event_derives(serde::Deserialize, serde::Serialize)
);

abigen!(
    Component,
    r#"[
        function register() external
        function getNftId() external view returns (uint96)
    ]"#
);

abigen!(
    GifDeployer,
    r#"[
        function getInstance() external view returns (address)
        function getInstanceNftId() external view returns (uint96)
        function getDistribution() external view returns (address)
        function getPool() external view returns (address)
        function getProduct() external view returns (address)
        function getDistributionNftId() external view returns (uint96)
        function getPoolNftId() external view returns (uint96)
        function getProductNftId() external view returns (uint96)
        function getUsdc() external view returns (address)
    ]"#
);

// END OF FILE: deployer/src/bindings.rs
