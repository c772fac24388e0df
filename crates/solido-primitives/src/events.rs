//! Event query parameters and decoded logs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::alloy::{
    dyn_abi::DynSolValue,
    eips::BlockNumberOrTag,
    primitives::{Address, TxHash, B256},
};
use crate::topic::{TopicEntry, TopicFilter};

/// Accepted values per indexed event parameter name. Values listed under one
/// name are alternatives.
pub type IndexedFilter = BTreeMap<String, Vec<DynSolValue>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeUnit {
    Block,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub unit: RangeUnit,
    pub from: u64,
    pub to: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOptions {
    pub offset: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub from_block: BlockNumberOrTag,
    pub to_block: BlockNumberOrTag,
}

impl BlockRange {
    pub fn new(from_block: impl Into<BlockNumberOrTag>, to_block: impl Into<BlockNumberOrTag>) -> Self {
        Self {
            from_block: from_block.into(),
            to_block: to_block.into(),
        }
    }
}

/// Caller facing filter options for a historical event query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilterOptions {
    pub range: Option<Range>,
    pub filter: Option<IndexedFilter>,
    pub topics: Option<TopicFilter<B256>>,
    pub order: Option<EventOrder>,
    pub page_options: Option<PageOptions>,
    pub blocks: Option<BlockRange>,
}

impl EventFilterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_filter(mut self, filter: IndexedFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_topics(mut self, topics: TopicFilter<B256>) -> Self {
        self.topics = Some(topics);
        self
    }

    pub fn with_order(mut self, order: EventOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_page_options(mut self, page_options: PageOptions) -> Self {
        self.page_options = Some(page_options);
        self
    }

    pub fn with_blocks(mut self, blocks: BlockRange) -> Self {
        self.blocks = Some(blocks);
        self
    }
}

/// Resolved query parameters handed to the chain client. Fields absent from
/// the options stay `None`; only the order is defaulted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    pub filter: Option<IndexedFilter>,
    pub range: Option<Range>,
    pub from_block: Option<BlockNumberOrTag>,
    pub to_block: Option<BlockNumberOrTag>,
    pub topics: Option<Vec<TopicEntry<B256>>>,
    pub order: EventOrder,
    pub options: Option<PageOptions>,
}

impl From<EventFilterOptions> for EventQuery {
    fn from(options: EventFilterOptions) -> Self {
        let EventFilterOptions {
            range,
            filter,
            topics,
            order,
            page_options,
            blocks,
        } = options;

        let (from_block, to_block) = match blocks {
            Some(BlockRange {
                from_block,
                to_block,
            }) => (Some(from_block), Some(to_block)),
            None => (None, None),
        };

        Self {
            filter,
            range,
            from_block,
            to_block,
            topics: topics.map(|topics| topics.get()),
            order: order.unwrap_or_default(),
            options: page_options,
        }
    }
}

/// An event log decoded against the contract ABI.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLog {
    pub event: String,
    pub address: Address,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<TxHash>,
    pub log_index: Option<u64>,
    pub indexed: Vec<DynSolValue>,
    pub body: Vec<DynSolValue>,
}
