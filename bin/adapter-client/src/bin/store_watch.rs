use std::{env, str::FromStr, sync::Arc};

use color_eyre::{
    eyre::{eyre, Context},
    Result,
};
use dotenv::dotenv;
use solido_adapter::{
    backend::HttpConnector, config::AdapterConfig, AdapterSettings, CallOptions, ContractAdapter,
    ContractCapability, MapAction, ProviderCapability, ReactiveContractStore,
};
use solido_primitives::{contract::ContractImport, env::Environment};
use tracing_subscriber::EnvFilter;
use url::Url;

const DISPATCH_KEY: &str = "watch";

/// Submits one write, then mirrors the configured getter into a store field
/// on every emission of the configured event and prints each new value.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenv().ok();

    let config = AdapterConfig::from_file("config.json").context("Failed to load config")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_max_level(config.log_level()?)
        .init();

    let rpc_url = match Environment::from_env_var() {
        Environment::Production => {
            Url::from_str(&env::var("RPC_URL").context("RPC_URL must be set in production")?)
                .context("Invalid RPC URL")?
        }
        Environment::Development => match env::var("RPC_URL") {
            Ok(url) => Url::from_str(&url).context("Invalid RPC URL")?,
            Err(_) => config.rpc_url()?,
        },
    };
    let private_key = env::var("PRIVATE_KEY").context("PRIVATE_KEY must be set")?;

    let event_name = config
        .event_name
        .clone()
        .ok_or_else(|| eyre!("event_name missing from config"))?;
    let getter = config
        .getter
        .clone()
        .ok_or_else(|| eyre!("getter missing from config"))?;
    let write_method = config
        .write_method
        .clone()
        .ok_or_else(|| eyre!("write_method missing from config"))?;

    let import =
        ContractImport::from_file(&config.artifact_path).context("Failed to load artifact")?;
    let connector = HttpConnector::new(rpc_url).with_poll_interval(config.poll_interval());
    let mut adapter = ContractAdapter::new(import).with_confirmations(config.confirmations);

    // a field must exist before it can be subscribed
    let store = ReactiveContractStore::new()
        .with_action(DISPATCH_KEY, MapAction::mirror_getter(&getter, &event_name))
        .with_field(&getter, serde_json::Value::Null);

    adapter.on_ready(
        AdapterSettings::new(
            Arc::new(connector),
            config.network.clone(),
            config.default_account,
        )
        .with_private_key(private_key)
        .with_store(store),
    )?;

    let mut subscription = adapter
        .subscribe(&getter)
        .ok_or_else(|| eyre!("store has no field {}", getter))?;

    let method = adapter.get_method(&write_method)?;
    let signer = adapter
        .prepare_signing(
            method,
            &CallOptions::new().with_dispatch(DISPATCH_KEY),
            Vec::new(),
        )
        .await?;
    let result = signer.request_signing().await?;
    tracing::info!(
        "{} mined in block {:?}, success: {}",
        write_method,
        result.block_number,
        result.success
    );

    while let Some(value) = subscription.recv().await {
        println!("{} = {}", getter, value);
    }

    Ok(())
}
