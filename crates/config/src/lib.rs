//! Loads the engine's configuration surface (§6) from environment variables,
//! prefixed `SYNC_`, failing fast on any missing-when-required or malformed
//! field before an `RpcClient` or signer is ever constructed (§4.H).

use std::env;

use ethers::types::Address;
use sync_types::BlockTag;
use thiserror::Error;

/// Default bound on in-flight requests per pipeline stage (*B*, §4.A).
pub const DEFAULT_BATCH_SIZE: usize = 50;
/// Default number of key/value pairs bulk-migrated per `addStorage` call (*K*, §4.F).
pub const DEFAULT_CHUNK_SIZE: usize = 100;
/// Default page size for `parity_listStorageKeys` (*P*, §4.B).
pub const DEFAULT_PAGE_SIZE: usize = 256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("{0} must be set when {1} is configured")]
    RequiredWhen(&'static str, &'static str),
    #[error("{0} is not a well-formed address: {1}")]
    InvalidAddress(&'static str, String),
    #[error("{0} is not a valid integer: {1}")]
    InvalidInteger(&'static str, String),
    #[error("no signer configured: set either SYNC_KEYSTORE_PATH or SYNC_UNLOCKED_ACCOUNT")]
    NoSigner,
}

/// How the engine authenticates transactions on the target chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerConfig {
    Keystore {
        path: String,
        password: String,
    },
    UnlockedAccount(Address),
}

/// The engine's full configuration surface, enumerated per SPEC_FULL.md §6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub source_endpoint: String,
    pub target_endpoint: String,
    pub source_api_key: Option<String>,
    pub target_api_key: Option<String>,
    pub signer: SignerConfig,
    pub gas_limit: Option<u64>,
    pub batch_size: usize,
    pub chunk_size: usize,
    pub page_size: usize,
    pub relay_address: Option<Address>,
    pub proxy_address: Option<Address>,
    pub logic_address: Option<Address>,
    pub source_address: Address,
    pub source_block_tag: BlockTag,
    pub target_block_tag: BlockTag,
}

impl EngineConfig {
    /// Loads the configuration surface from `std::env`. Required fields are
    /// validated immediately; no RPC handle or signer is constructed here.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_getter(|key| env::var(key).ok())
    }

    /// Testable entry point: `getter` stands in for `std::env::var` so unit
    /// tests can exercise every precondition without mutating the process
    /// environment.
    pub fn from_getter<F>(getter: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source_endpoint = required(&getter, "SYNC_SOURCE_RPC_URL")?;
        let target_endpoint = required(&getter, "SYNC_TARGET_RPC_URL")?;
        let source_api_key = getter("SYNC_SOURCE_API_KEY");
        let target_api_key = getter("SYNC_TARGET_API_KEY");

        let keystore_path = getter("SYNC_KEYSTORE_PATH");
        let keystore_password = getter("SYNC_KEYSTORE_PASSWORD");
        let unlocked_account = getter("SYNC_UNLOCKED_ACCOUNT");

        let signer = match (keystore_path, unlocked_account) {
            (Some(path), _) => {
                let password = keystore_password.ok_or(ConfigError::RequiredWhen(
                    "SYNC_KEYSTORE_PASSWORD",
                    "SYNC_KEYSTORE_PATH",
                ))?;
                SignerConfig::Keystore { path, password }
            }
            (None, Some(account)) => {
                SignerConfig::UnlockedAccount(parse_address("SYNC_UNLOCKED_ACCOUNT", &account)?)
            }
            (None, None) => return Err(ConfigError::NoSigner),
        };

        let gas_limit = optional_u64(&getter, "SYNC_GAS_LIMIT")?;
        let batch_size = optional_usize(&getter, "SYNC_BATCH_SIZE")?.unwrap_or(DEFAULT_BATCH_SIZE);
        let chunk_size = optional_usize(&getter, "SYNC_CHUNK_SIZE")?.unwrap_or(DEFAULT_CHUNK_SIZE);
        let page_size = optional_usize(&getter, "SYNC_PAGE_SIZE")?
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(256);

        let relay_address = optional_address(&getter, "SYNC_RELAY_ADDRESS")?;
        let proxy_address = optional_address(&getter, "SYNC_PROXY_ADDRESS")?;
        let logic_address = optional_address(&getter, "SYNC_LOGIC_ADDRESS")?;
        let source_address =
            parse_address("SYNC_SOURCE_ADDRESS", &required(&getter, "SYNC_SOURCE_ADDRESS")?)?;

        let source_block_tag = optional_block_tag(&getter, "SYNC_SOURCE_BLOCK_TAG")?;
        let target_block_tag = optional_block_tag(&getter, "SYNC_TARGET_BLOCK_TAG")?;

        Ok(EngineConfig {
            source_endpoint,
            target_endpoint,
            source_api_key,
            target_api_key,
            signer,
            gas_limit,
            batch_size,
            chunk_size,
            page_size,
            relay_address,
            proxy_address,
            logic_address,
            source_address,
            source_block_tag,
            target_block_tag,
        })
    }
}

fn required<F: Fn(&str) -> Option<String>>(
    getter: &F,
    key: &'static str,
) -> Result<String, ConfigError> {
    getter(key).ok_or(ConfigError::Missing(key))
}

fn parse_address(field: &'static str, raw: &str) -> Result<Address, ConfigError> {
    raw.parse()
        .map_err(|_| ConfigError::InvalidAddress(field, raw.to_string()))
}

fn optional_address<F: Fn(&str) -> Option<String>>(
    getter: &F,
    key: &'static str,
) -> Result<Option<Address>, ConfigError> {
    getter(key).map(|raw| parse_address(key, &raw)).transpose()
}

fn optional_usize<F: Fn(&str) -> Option<String>>(
    getter: &F,
    key: &'static str,
) -> Result<Option<usize>, ConfigError> {
    getter(key)
        .map(|raw| {
            raw.parse::<usize>()
                .map_err(|_| ConfigError::InvalidInteger(key, raw))
        })
        .transpose()
}

fn optional_u64<F: Fn(&str) -> Option<String>>(
    getter: &F,
    key: &'static str,
) -> Result<Option<u64>, ConfigError> {
    getter(key)
        .map(|raw| {
            raw.parse::<u64>()
                .map_err(|_| ConfigError::InvalidInteger(key, raw))
        })
        .transpose()
}

fn optional_block_tag<F: Fn(&str) -> Option<String>>(
    getter: &F,
    key: &'static str,
) -> Result<BlockTag, ConfigError> {
    match getter(key) {
        None => Ok(BlockTag::Latest),
        Some(raw) => parse_block_tag(key, &raw),
    }
}

fn parse_block_tag(field: &'static str, raw: &str) -> Result<BlockTag, ConfigError> {
    match raw {
        "latest" => Ok(BlockTag::Latest),
        "earliest" => Ok(BlockTag::Earliest),
        "pending" => Ok(BlockTag::Pending),
        n => n
            .parse::<u64>()
            .map(BlockTag::Number)
            .map_err(|_| ConfigError::InvalidInteger(field, raw.to_string())),
    }
}
