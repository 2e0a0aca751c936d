//! Minimal ABI bindings for the relay and proxy contracts (§6). These are the
//! external on-chain collaborators this crate drives but does not implement;
//! only the function surface the coordinator actually calls is bound.

use ethers::contract::abigen;

abigen!(
    Relay,
    r#"[
        function addBlock(bytes32 stateRoot, uint256 blockNumber) external
        function getStateRoot(uint256 blockNumber) external view returns (bytes32)
        function getSource() external view returns (address)
        function getMigrationState(address proxy) external view returns (bool)
        function getCurrentBlockNumber(address proxy) external view returns (uint256)
        function getLatestBlockNumber() external view returns (uint256)
        function verifyMigrateContract(bytes srcAccountProof, bytes proxyAccountProof, bytes encodedHeader, address proxy, uint256 targetBlockNum, uint256 srcBlockNum) external
    ]"#
);

abigen!(
    Proxy,
    r#"[
        function addStorage(bytes32[] keys, bytes32[] values) external
        function updateStorage(bytes rlpProof, uint256 blockNumber) external
        function getSourceAddress() external view returns (address)
        function getLogicAddress() external view returns (address)
        function getRelayAddress() external view returns (address)
    ]"#
);
