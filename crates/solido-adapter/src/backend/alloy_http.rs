use std::{sync::Arc, time::Duration};

use alloy::{
    contract::{ContractInstance, Interface},
    network::{Ethereum, EthereumWallet, ReceiptResponse},
    providers::{Provider, ProviderBuilder},
    rpc::types::{Filter, Log},
    signers::local::PrivateKeySigner,
    transports::Transport,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use solido_primitives::{
    alloy::{
        dyn_abi::{DynSolValue, EventExt},
        json_abi::{Event, JsonAbi},
        primitives::{keccak256, Address, TxHash, B256},
    },
    events::{DecodedLog, EventOrder, EventQuery, RangeUnit},
    topic::alternatives,
};
use url::Url;

use super::{ChainConnector, ContractBackend, LogStream, PendingTransaction, TxOverrides};
use crate::error::{AdapterError, Result};
use crate::signer::SigningResult;

/// indexed parameters occupy topics 1..=3, topic0 is the event signature
const MAX_INDEXED_TOPICS: usize = 3;

/// Connector for an HTTP JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    rpc_url: Url,
    poll_interval: Duration,
}

impl HttpConnector {
    pub fn new(rpc_url: Url) -> Self {
        Self {
            rpc_url,
            poll_interval: Duration::from_secs(4),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl ChainConnector for HttpConnector {
    fn connect_contract(
        &self,
        address: Address,
        abi: Arc<JsonAbi>,
        credential: Option<&PrivateKeySigner>,
    ) -> Result<Arc<dyn ContractBackend>> {
        match credential {
            Some(signer) => {
                // build wallet for sending txs
                let wallet = EthereumWallet::new(signer.clone());
                let rpc_provider = ProviderBuilder::new()
                    .with_recommended_fillers()
                    .wallet(wallet)
                    .on_http(self.rpc_url.clone());
                Ok(Arc::new(AlloyContract::new(
                    address,
                    abi,
                    rpc_provider,
                    Some(signer.address()),
                    self.poll_interval,
                )))
            }
            None => {
                let rpc_provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
                Ok(Arc::new(AlloyContract::new(
                    address,
                    abi,
                    rpc_provider,
                    None,
                    self.poll_interval,
                )))
            }
        }
    }

    fn describe(&self) -> String {
        self.rpc_url.to_string()
    }
}

/// Contract binding backed by an alloy provider, using the dynamic ABI so
/// methods and events are resolved by name at runtime.
pub struct AlloyContract<T, P> {
    instance: ContractInstance<T, P, Ethereum>,
    abi: Arc<JsonAbi>,
    signer_address: Option<Address>,
    poll_interval: Duration,
}

impl<T, P> AlloyContract<T, P>
where
    T: Transport + Clone + Send + Sync,
    P: Provider<T, Ethereum> + Clone + Send + Sync,
{
    pub fn new(
        address: Address,
        abi: Arc<JsonAbi>,
        rpc_provider: P,
        signer_address: Option<Address>,
        poll_interval: Duration,
    ) -> Self {
        let instance =
            ContractInstance::new(address, rpc_provider, Interface::new(abi.as_ref().clone()));
        Self {
            instance,
            abi,
            signer_address,
            poll_interval,
        }
    }

    fn event(&self, name: &str) -> Result<&Event> {
        self.abi
            .event(name)
            .and_then(|events| events.first())
            .ok_or_else(|| AdapterError::EventNotFound(name.to_string()))
    }
}

#[async_trait]
impl<T, P> ContractBackend for AlloyContract<T, P>
where
    T: Transport + Clone + Send + Sync,
    P: Provider<T, Ethereum> + Clone + Send + Sync + 'static,
{
    fn address(&self) -> Address {
        *self.instance.address()
    }

    fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    fn signer_address(&self) -> Option<Address> {
        self.signer_address
    }

    async fn call_method(
        &self,
        name: &str,
        args: &[DynSolValue],
        from: Option<Address>,
    ) -> Result<Vec<DynSolValue>> {
        let mut call = self
            .instance
            .function(name, args)
            .map_err(|e| AdapterError::CallError(e.to_string()))?;
        if let Some(from) = from {
            call = call.from(from);
        }

        call.call()
            .await
            .map_err(|e| AdapterError::CallError(e.to_string()))
    }

    async fn send_method(
        &self,
        name: &str,
        args: &[DynSolValue],
        overrides: TxOverrides,
    ) -> Result<PendingTransaction> {
        let mut call = self
            .instance
            .function(name, args)
            .map_err(|e| AdapterError::TransactionError(e.to_string()))?
            .gas(overrides.gas_limit);
        if let Some(from) = sender(self.signer_address, &overrides) {
            call = call.from(from);
        }

        let pending = call
            .send()
            .await
            .map_err(|e| AdapterError::TransactionError(e.to_string()))?;

        tracing::info!("submitted {} txs: {}", name, pending.tx_hash());

        Ok(PendingTransaction {
            tx_hash: *pending.tx_hash(),
            gas_limit: overrides.gas_limit,
        })
    }

    async fn get_past_events(&self, name: &str, query: &EventQuery) -> Result<Vec<DecodedLog>> {
        let event = self.event(name)?;
        let filters = build_log_filters(self.address(), event, query)?;

        let mut logs = Vec::new();
        for filter in &filters {
            let matched = self
                .instance
                .provider()
                .get_logs(filter)
                .await
                .map_err(|e| AdapterError::EventFilterError(e.to_string()))?;
            logs.extend(matched);
        }
        if filters.len() > 1 {
            merge_alternatives(&mut logs);
        }

        let decoded = logs
            .iter()
            .map(|log| decode_log(event, log))
            .collect::<Result<Vec<_>>>()?;

        Ok(order_and_page(decoded, query))
    }

    async fn watch_event(&self, name: &str) -> Result<LogStream> {
        let event = self.event(name)?.clone();
        let filter = Filter::new()
            .address(self.address())
            .event_signature(event.selector());

        let event_poller = self
            .instance
            .provider()
            .watch_logs(&filter)
            .await
            .map_err(|e| AdapterError::EventFilterError(e.to_string()))?
            .with_poll_interval(self.poll_interval);

        let stream = event_poller
            .into_stream()
            .flat_map(futures::stream::iter)
            .map(move |log| decode_log(&event, &log));

        Ok(Box::pin(stream))
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash, confirmations: u64) -> Result<SigningResult> {
        let rpc_provider = self.instance.provider();
        loop {
            let receipt = rpc_provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(|e| AdapterError::TransactionFailure(e.to_string()))?;

            if let Some(receipt) = receipt {
                let block_number = receipt.block_number();
                if let Some(mined_at) = block_number {
                    let latest = rpc_provider
                        .get_block_number()
                        .await
                        .map_err(|e| AdapterError::TransactionFailure(e.to_string()))?;
                    if latest + 1 >= mined_at + confirmations.max(1) {
                        return Ok(SigningResult {
                            tx_hash,
                            block_number,
                            success: receipt.status(),
                        });
                    }
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

type TopicSlots = [Option<Vec<B256>>; MAX_INDEXED_TOPICS];

/// Build the `eth_getLogs` filters for `event` from a resolved query, one per
/// topic alternative. The logs of all filters together are the match.
pub(crate) fn build_log_filters(
    address: Address,
    event: &Event,
    query: &EventQuery,
) -> Result<Vec<Filter>> {
    let mut base = Filter::new()
        .address(address)
        .event_signature(event.selector());

    let mut from_block = query.from_block;
    let mut to_block = query.to_block;
    if let Some(range) = query.range {
        match range.unit {
            RangeUnit::Block => {
                from_block = from_block.or(Some(range.from.into()));
                to_block = to_block.or(Some(range.to.into()));
            }
            RangeUnit::Time => {
                return Err(AdapterError::EventFilterError(
                    "time ranges are not supported by log queries, use block bounds".into(),
                ))
            }
        }
    }
    if let Some(from_block) = from_block {
        base = base.from_block(from_block);
    }
    if let Some(to_block) = to_block {
        base = base.to_block(to_block);
    }

    let indexed_slots = indexed_filter_slots(event, query)?;

    let topic_alternatives = query
        .topics
        .as_deref()
        .map(alternatives)
        .unwrap_or_default();
    if topic_alternatives.is_empty() {
        return Ok(vec![with_topics(base, indexed_slots)]);
    }

    topic_alternatives
        .into_iter()
        .map(|alternative| {
            if alternative.len() > MAX_INDEXED_TOPICS {
                return Err(AdapterError::EventFilterError(format!(
                    "topic alternative spans {} positions, at most {} are allowed",
                    alternative.len(),
                    MAX_INDEXED_TOPICS
                )));
            }
            let mut slots = indexed_slots.clone();
            for (position, set) in alternative.into_iter().enumerate() {
                if slots[position].is_some() {
                    return Err(AdapterError::EventFilterError(format!(
                        "topic position {} is set by both topics and filter",
                        position + 1
                    )));
                }
                slots[position] = Some(set);
            }
            Ok(with_topics(base.clone(), slots))
        })
        .collect()
}

/// Topic slots filled from the indexed parameter filter, by parameter name.
fn indexed_filter_slots(event: &Event, query: &EventQuery) -> Result<TopicSlots> {
    let mut slots = TopicSlots::default();
    let Some(indexed_filter) = &query.filter else {
        return Ok(slots);
    };

    let indexed: Vec<_> = event.inputs.iter().filter(|param| param.indexed).collect();
    for (name, values) in indexed_filter {
        let position = indexed
            .iter()
            .position(|param| param.name == *name)
            .ok_or_else(|| {
                AdapterError::EventFilterError(format!(
                    "{} is not an indexed parameter of {}",
                    name, event.name
                ))
            })?;
        slots[position] = Some(values.iter().map(topic_word).collect());
    }
    Ok(slots)
}

fn with_topics(mut filter: Filter, slots: TopicSlots) -> Filter {
    for (position, set) in slots.into_iter().enumerate() {
        if let Some(set) = set {
            filter.topics[position + 1] = set.into();
        }
    }
    filter
}

/// Logs of several alternatives can overlap; restore chain order and drop
/// duplicates.
fn merge_alternatives(logs: &mut Vec<Log>) {
    logs.sort_by_key(|log| (log.block_number, log.log_index));
    logs.dedup_by_key(|log| (log.block_number, log.transaction_hash, log.log_index));
}

/// A credential bearing binding always sends from its signer, a read-only
/// binding from the account the caller supplied.
fn sender(signer_address: Option<Address>, overrides: &TxOverrides) -> Option<Address> {
    signer_address.or(overrides.from)
}

/// Topic encoding of an indexed value: the word itself for static types, the
/// keccak hash of the packed encoding otherwise.
fn topic_word(value: &DynSolValue) -> B256 {
    value
        .as_word()
        .unwrap_or_else(|| keccak256(value.abi_encode_packed()))
}

fn decode_log(event: &Event, log: &Log) -> Result<DecodedLog> {
    let decoded = event
        .decode_log(&log.inner.data, true)
        .map_err(|e| AdapterError::LogParseError(e.to_string()))?;

    Ok(DecodedLog {
        event: event.name.clone(),
        address: log.inner.address,
        block_number: log.block_number,
        transaction_hash: log.transaction_hash,
        log_index: log.log_index,
        indexed: decoded.indexed,
        body: decoded.body,
    })
}

/// Logs arrive ascending from the node; reverse for descending order, then
/// apply offset/limit paging.
pub(crate) fn order_and_page<L>(mut logs: Vec<L>, query: &EventQuery) -> Vec<L> {
    if query.order == EventOrder::Desc {
        logs.reverse();
    }
    match query.options {
        Some(page) => logs
            .into_iter()
            .skip(usize::try_from(page.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit).unwrap_or(usize::MAX))
            .collect(),
        None => logs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::rpc::types::{FilterBlockOption, FilterSet};
    use solido_primitives::{
        alloy::{
            eips::BlockNumberOrTag,
            primitives::{address, U256},
        },
        events::{IndexedFilter, PageOptions, Range},
        topic::TopicFilter,
    };

    const TRANSFER_EVENT: &str = r#"{
        "type": "event",
        "name": "Transfer",
        "anonymous": false,
        "inputs": [
            { "name": "from", "type": "address", "indexed": true },
            { "name": "to", "type": "address", "indexed": true },
            { "name": "value", "type": "uint256", "indexed": false }
        ]
    }"#;

    fn has<V: Eq + std::hash::Hash>(set: &FilterSet<V>, value: &V) -> bool {
        !set.is_empty() && set.matches(value)
    }

    fn transfer_event() -> Event {
        serde_json::from_str(TRANSFER_EVENT).unwrap()
    }

    fn token() -> Address {
        address!("a729a3a5f65c9af4934bfd0f4dfce3898ce0dda3")
    }

    fn single_filter(query: &EventQuery) -> Filter {
        let mut filters = build_log_filters(token(), &transfer_event(), query).unwrap();
        assert_eq!(filters.len(), 1);
        filters.remove(0)
    }

    #[test]
    fn filter_uses_event_signature_as_topic0() {
        let event = transfer_event();
        let filter = single_filter(&EventQuery::default());

        assert!(has(&filter.topics[0], &event.selector()));
        assert!(filter.topics[1].is_empty());
        assert!(has(&filter.address, &token()));
    }

    #[test]
    fn or_alternatives_share_first_indexed_position() {
        let first = B256::repeat_byte(0x01);
        let second = B256::repeat_byte(0x02);
        let query = EventQuery {
            topics: Some(TopicFilter::new().topic(first).or(second).get()),
            ..Default::default()
        };

        let filter = single_filter(&query);

        assert!(has(&filter.topics[1], &first));
        assert!(has(&filter.topics[1], &second));
        assert!(filter.topics[2].is_empty());
    }

    #[test]
    fn and_group_becomes_its_own_filter() {
        let from = B256::repeat_byte(0x01);
        let to = B256::repeat_byte(0x02);
        let other = B256::repeat_byte(0x03);
        let query = EventQuery {
            topics: Some(TopicFilter::new().topic(from).and(to).or(other).get()),
            ..Default::default()
        };

        let filters = build_log_filters(token(), &transfer_event(), &query).unwrap();

        assert_eq!(filters.len(), 2);
        assert!(has(&filters[0].topics[1], &other));
        assert!(filters[0].topics[2].is_empty());
        assert!(has(&filters[1].topics[1], &from));
        assert!(!filters[1].topics[1].matches(&other));
        assert!(has(&filters[1].topics[2], &to));
        assert!(filters[1].topics[3].is_empty());
    }

    #[test]
    fn long_or_list_stays_one_position() {
        let words: Vec<B256> = (1..=5).map(B256::repeat_byte).collect();
        let topics = words
            .iter()
            .fold(TopicFilter::new(), |filter, word| filter.or(*word));
        let query = EventQuery {
            topics: Some(topics.get()),
            ..Default::default()
        };

        let filter = single_filter(&query);

        assert!(words.iter().all(|word| has(&filter.topics[1], word)));
    }

    #[test]
    fn too_many_conjunctive_positions_are_rejected() {
        let word = B256::ZERO;
        let query = EventQuery {
            topics: Some(
                TopicFilter::new()
                    .topic(word)
                    .and(word)
                    .and(word)
                    .and(word)
                    .get(),
            ),
            ..Default::default()
        };

        let err = build_log_filters(token(), &transfer_event(), &query).unwrap_err();
        assert!(matches!(err, AdapterError::EventFilterError(_)));
    }

    #[test]
    fn topics_and_filter_on_same_position_conflict() {
        let mut indexed = IndexedFilter::new();
        indexed.insert("from".into(), vec![DynSolValue::Address(token())]);
        let query = EventQuery {
            filter: Some(indexed),
            topics: Some(TopicFilter::new().topic(B256::ZERO).get()),
            ..Default::default()
        };

        assert!(build_log_filters(token(), &transfer_event(), &query).is_err());
    }

    #[test]
    fn indexed_filter_targets_named_parameter() {
        let receiver = address!("ae5ba923447cb11f2a94b66dff878b0d7cfdd13c");
        let mut indexed = IndexedFilter::new();
        indexed.insert("to".into(), vec![DynSolValue::Address(receiver)]);
        let query = EventQuery {
            filter: Some(indexed),
            ..Default::default()
        };

        let filter = single_filter(&query);

        assert!(filter.topics[1].is_empty());
        assert!(has(&filter.topics[2], &receiver.into_word()));
    }

    #[test]
    fn unindexed_filter_parameter_is_rejected() {
        let mut indexed = IndexedFilter::new();
        indexed.insert("value".into(), vec![DynSolValue::Uint(U256::from(1), 256)]);
        let query = EventQuery {
            filter: Some(indexed),
            ..Default::default()
        };

        assert!(build_log_filters(token(), &transfer_event(), &query).is_err());
    }

    #[test]
    fn block_range_fills_missing_bounds() {
        let query = EventQuery {
            range: Some(Range {
                unit: RangeUnit::Block,
                from: 100,
                to: 200,
            }),
            to_block: Some(BlockNumberOrTag::Latest),
            ..Default::default()
        };

        let filter = single_filter(&query);

        match filter.block_option {
            FilterBlockOption::Range {
                from_block,
                to_block,
            } => {
                assert_eq!(from_block, Some(BlockNumberOrTag::Number(100)));
                assert_eq!(to_block, Some(BlockNumberOrTag::Latest));
            }
            other => panic!("unexpected block option {other:?}"),
        }
    }

    #[test]
    fn time_range_is_rejected() {
        let query = EventQuery {
            range: Some(Range {
                unit: RangeUnit::Time,
                from: 0,
                to: 1,
            }),
            ..Default::default()
        };

        assert!(build_log_filters(token(), &transfer_event(), &query).is_err());
    }

    #[test]
    fn overlapping_alternatives_merge_in_chain_order() {
        let log = |block: u64, index: u64| Log {
            block_number: Some(block),
            log_index: Some(index),
            transaction_hash: Some(B256::with_last_byte(block as u8)),
            ..Default::default()
        };
        let mut logs = vec![log(7, 0), log(3, 1), log(7, 0), log(3, 0)];

        merge_alternatives(&mut logs);

        let order: Vec<_> = logs
            .iter()
            .map(|log| (log.block_number, log.log_index))
            .collect();
        assert_eq!(order, vec![(Some(3), Some(0)), (Some(3), Some(1)), (Some(7), Some(0))]);
    }

    #[test]
    fn read_only_binding_sends_from_supplied_account() {
        let account = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
        let overrides = TxOverrides {
            gas_limit: 21_000,
            from: Some(account),
        };

        assert_eq!(sender(None, &overrides), Some(account));
        assert_eq!(sender(Some(token()), &overrides), Some(token()));
    }

    #[test]
    fn paging_beyond_length_is_empty() {
        let query = EventQuery {
            order: EventOrder::Asc,
            options: Some(PageOptions {
                offset: u64::MAX,
                limit: u64::MAX,
            }),
            ..Default::default()
        };
        assert!(order_and_page(vec![1, 2, 3], &query).is_empty());
    }

    #[test]
    fn desc_order_reverses_before_paging() {
        let query = EventQuery {
            options: Some(PageOptions {
                offset: 1,
                limit: 2,
            }),
            ..Default::default()
        };
        assert_eq!(order_and_page(vec![1, 2, 3, 4, 5], &query), vec![4, 3]);

        let ascending = EventQuery {
            order: EventOrder::Asc,
            ..Default::default()
        };
        assert_eq!(order_and_page(vec![1, 2, 3], &ascending), vec![1, 2, 3]);
    }
}
