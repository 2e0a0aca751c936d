//! Thin smoke-test driver for the storage synchronization engine (§4.J).
//!
//! Parses a single sub-command (`init`, `migrate`, `sync`) and nothing else —
//! every other parameter comes from the `SYNC_*` environment surface via
//! [`sync_config::EngineConfig`]. This binary exists to give the workspace a
//! runnable end-to-end path; it is not the deliverable.

use std::env;

use ethers::types::Bytes;
use log::info;
use smart_sync::{bootstrap, contract_artifacts, EngineError, TargetMiddleware};
use sync_config::EngineConfig;
use sync_diff::diff_via_storage;
use sync_migration::MigrationCoordinator;
use sync_types::BlockTag;

#[tokio::main]
async fn main() -> Result<(), EngineError> {
    env_logger::init();

    let sub_command = env::args().nth(1).unwrap_or_else(|| "init".to_string());
    let config = EngineConfig::from_env()?;
    let (rpc, middleware) = bootstrap(&config).await?;

    let relay_bytecode = env::var("SYNC_RELAY_BYTECODE")
        .ok()
        .map(|hex| Bytes::from(hex::decode(hex.trim_start_matches("0x")).unwrap_or_default()));
    let proxy_bytecode = env::var("SYNC_PROXY_BYTECODE")
        .ok()
        .map(|hex| Bytes::from(hex::decode(hex.trim_start_matches("0x")).unwrap_or_default()));
    let artifacts = contract_artifacts(relay_bytecode, proxy_bytecode);

    match middleware {
        TargetMiddleware::Keystore(target) => {
            let mut coordinator = MigrationCoordinator::new(
                rpc,
                target,
                config.source_address,
                artifacts,
                config.relay_address,
                config.proxy_address,
                config.batch_size,
                config.chunk_size,
                config.page_size,
            );
            run(&mut coordinator, &sub_command, &config).await
        }
        TargetMiddleware::Unlocked(target) => {
            let mut coordinator = MigrationCoordinator::new(
                rpc,
                target,
                config.source_address,
                artifacts,
                config.relay_address,
                config.proxy_address,
                config.batch_size,
                config.chunk_size,
                config.page_size,
            );
            run(&mut coordinator, &sub_command, &config).await
        }
    }
}

async fn run<P, M>(
    coordinator: &mut MigrationCoordinator<P, M>,
    sub_command: &str,
    config: &EngineConfig,
) -> Result<(), EngineError>
where
    P: ethers::providers::JsonRpcClient,
    M: ethers::providers::Middleware,
{
    coordinator.init().await.map_err(EngineError::Migration)?;
    info!("init: engine state is {}", coordinator.state());

    match sub_command {
        "init" => {}
        "migrate" => {
            let outcome = coordinator
                .migrate_src_contract(config.source_block_tag)
                .await
                .map_err(EngineError::Migration)?;
            info!("migrateSrcContract finished: {outcome:?}");
        }
        "sync" => {
            coordinator.get_current_block_number().await.ok();
            // `storage` strategy for this smoke-test path; library callers may
            // pick any of the three (§4.C).
            let proxy_address = config
                .proxy_address
                .ok_or_else(|| EngineError::Fatal("no proxy configured for sync".into()))?;
            let diff = diff_via_storage(
                coordinator.rpc(),
                config.source_address,
                BlockTag::Latest,
                proxy_address,
                BlockTag::Latest,
                config.page_size,
            )
            .await
            .map_err(|e| EngineError::Fatal(e.to_string()))?;

            let outcome = coordinator
                .migrate_changes_to_proxy(&diff, BlockTag::Latest)
                .await
                .map_err(EngineError::Migration)?;
            info!("migrateChangesToProxy finished: {outcome:?}");
        }
        other => {
            return Err(EngineError::Fatal(format!(
                "unknown sub-command `{other}`, expected one of init|migrate|sync"
            )))
        }
    }

    Ok(())
}
