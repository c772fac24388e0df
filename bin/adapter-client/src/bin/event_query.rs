use std::{env, str::FromStr, sync::Arc};

use color_eyre::{
    eyre::{eyre, Context},
    Result,
};
use dotenv::dotenv;
use solido_adapter::{
    backend::HttpConnector, config::AdapterConfig, AdapterSettings, ContractAdapter,
    ContractCapability, ProviderCapability,
};
use solido_primitives::{
    alloy::eips::BlockNumberOrTag,
    contract::ContractImport,
    env::Environment,
    events::{BlockRange, EventFilterOptions},
    topic::TopicFilter,
    values::outputs_to_json,
};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Prints the past emissions of one contract event, newest first.
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

    let event_name = config
        .event_name
        .clone()
        .ok_or_else(|| eyre!("event_name missing from config"))?;

    let import =
        ContractImport::from_file(&config.artifact_path).context("Failed to load artifact")?;
    let connector = HttpConnector::new(rpc_url).with_poll_interval(config.poll_interval());

    let mut adapter = ContractAdapter::new(import);
    adapter.on_ready(AdapterSettings::new(
        Arc::new(connector),
        config.network.clone(),
        config.default_account,
    ))?;
    tracing::info!(
        "Adapter ready ({}), {}",
        adapter.provider_type().as_str(),
        adapter.describe()
    );

    let mut options = EventFilterOptions::new();
    if let Some(topics) = &config.topics {
        // any of the listed words at the first indexed position
        let filter = topics
            .iter()
            .fold(TopicFilter::new(), |filter, topic| filter.or(*topic));
        options = options.with_topics(filter);
    }
    if let Some(from_block) = config.from_block {
        options = options.with_blocks(BlockRange::new(from_block, BlockNumberOrTag::Latest));
    }

    let logs = adapter.get_events(&event_name, Some(options)).await?;
    tracing::info!("{} {} event(s) found", logs.len(), event_name);

    for log in logs {
        println!(
            "block {:?} tx {:?}: indexed {} body {}",
            log.block_number,
            log.transaction_hash,
            outputs_to_json(&log.indexed),
            outputs_to_json(&log.body)
        );
    }

    Ok(())
}
