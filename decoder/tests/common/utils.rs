//! Byte-for-byte builders for market, wrapper and global account snapshots.
//!
//! Trees are built as plain binary search trees with every node black: the
//! decoder follows links and never rebalances, so balance does not matter.
#![allow(dead_code)]

use bytemuck::{Pod, Zeroable};
use manifest_decoder::state::global::{GlobalFixed, GlobalSeatValue, GLOBAL_BLOCK_SIZE};
use manifest_decoder::state::market::{
    ClaimedSeatValue, MarketFixed, RestingOrderValue, MARKET_BLOCK_SIZE,
};
use manifest_decoder::state::red_black_tree::{DataIndex, NodeHeader, NIL, NODE_HEADER_SIZE};
use manifest_decoder::state::wrapper::{
    MarketInfoValue, OpenOrderValue, WrapperFixed, WRAPPER_BLOCK_SIZE,
};
use manifest_decoder::state::{
    OrderType, Side, GLOBAL_DISCRIMINANT, MARKET_DISCRIMINANT, WRAPPER_DISCRIMINANT,
};
use manifest_decoder::utils::u128_to_words;
use solana_program::pubkey::Pubkey;
use std::collections::HashMap;

pub const PRICE_SCALE: u128 = 1_000_000_000_000_000_000;

/// The blocks after an account's fixed header.
pub struct DynamicRegion {
    pub data: Vec<u8>,
    block_size: usize,
}

impl DynamicRegion {
    pub fn new(block_size: usize) -> Self {
        Self {
            data: vec![],
            block_size,
        }
    }

    /// Appends an unlinked block holding `value`.
    pub fn alloc<T: Pod>(&mut self, value: &T) -> DataIndex {
        let index = self.data.len() as DataIndex;
        let header = NodeHeader {
            left: NIL,
            right: NIL,
            parent: NIL,
            color: 0,
        };
        self.data.extend_from_slice(bytemuck::bytes_of(&header));
        self.data.extend_from_slice(bytemuck::bytes_of(value));
        self.data.resize(index as usize + self.block_size, 0);
        index
    }

    /// A block that no tree links to, full of junk.
    pub fn alloc_free_block(&mut self) -> DataIndex {
        let index = self.data.len() as DataIndex;
        self.data
            .extend(std::iter::repeat(0x5A).take(self.block_size));
        index
    }

    pub fn header(&self, index: DataIndex) -> NodeHeader {
        let start = index as usize;
        bytemuck::pod_read_unaligned(&self.data[start..start + NODE_HEADER_SIZE])
    }

    pub fn set_header(&mut self, index: DataIndex, header: NodeHeader) {
        let start = index as usize;
        self.data[start..start + NODE_HEADER_SIZE].copy_from_slice(bytemuck::bytes_of(&header));
    }

    pub fn value<T: Pod>(&self, index: DataIndex) -> T {
        let start = index as usize + NODE_HEADER_SIZE;
        bytemuck::pod_read_unaligned(&self.data[start..start + std::mem::size_of::<T>()])
    }

    pub fn set_value<T: Pod>(&mut self, index: DataIndex, value: &T) {
        let start = index as usize + NODE_HEADER_SIZE;
        self.data[start..start + std::mem::size_of::<T>()]
            .copy_from_slice(bytemuck::bytes_of(value));
    }
}

/// Unbalanced binary search tree over blocks of a [`DynamicRegion`].
pub struct TreeBuilder<K> {
    pub root: DataIndex,
    keys: HashMap<DataIndex, K>,
}

impl<K: Ord + Copy> TreeBuilder<K> {
    pub fn new() -> Self {
        Self {
            root: NIL,
            keys: HashMap::new(),
        }
    }

    /// Equal keys go right, after the ones already present.
    pub fn insert(&mut self, region: &mut DynamicRegion, index: DataIndex, key: K) {
        self.keys.insert(index, key);
        if self.root == NIL {
            self.root = index;
            return;
        }
        let mut current = self.root;
        loop {
            let mut header = region.header(current);
            let go_left = key < self.keys[&current];
            let next = if go_left { header.left } else { header.right };
            if next == NIL {
                if go_left {
                    header.left = index;
                } else {
                    header.right = index;
                }
                region.set_header(current, header);
                let mut child = region.header(index);
                child.parent = current;
                region.set_header(index, child);
                return;
            }
            current = next;
        }
    }
}

fn assemble<H: Pod>(fixed: &H, region: &DynamicRegion) -> Vec<u8> {
    let mut data = bytemuck::bytes_of(fixed).to_vec();
    data.extend_from_slice(&region.data);
    data
}

pub struct MarketBuilder {
    pub fixed: MarketFixed,
    pub region: DynamicRegion,
    bids: TreeBuilder<(u128, u64)>,
    asks: TreeBuilder<(u128, u64)>,
    seats: TreeBuilder<Pubkey>,
}

impl MarketBuilder {
    pub fn new(base_mint_decimals: u8, quote_mint_decimals: u8) -> Self {
        let mut fixed = MarketFixed::zeroed();
        fixed.discriminant = MARKET_DISCRIMINANT;
        fixed.base_mint_decimals = base_mint_decimals;
        fixed.quote_mint_decimals = quote_mint_decimals;
        fixed.base_mint = Pubkey::new_unique();
        fixed.quote_mint = Pubkey::new_unique();
        fixed.base_vault = Pubkey::new_unique();
        fixed.quote_vault = Pubkey::new_unique();
        fixed.bids_root_index = NIL;
        fixed.bids_best_index = NIL;
        fixed.asks_root_index = NIL;
        fixed.asks_best_index = NIL;
        fixed.claimed_seats_root_index = NIL;
        fixed.free_list_head_index = NIL;
        Self {
            fixed,
            region: DynamicRegion::new(MARKET_BLOCK_SIZE),
            bids: TreeBuilder::new(),
            asks: TreeBuilder::new(),
            seats: TreeBuilder::new(),
        }
    }

    pub fn claim_seat(&mut self, trader: Pubkey, base_atoms: u64, quote_atoms: u64) -> DataIndex {
        let mut value = ClaimedSeatValue::zeroed();
        value.trader = trader;
        value.base_withdrawable_balance = base_atoms;
        value.quote_withdrawable_balance = quote_atoms;
        let index = self.region.alloc(&value);
        self.seats.insert(&mut self.region, index, trader);
        index
    }

    /// Rests an order and returns its data index and sequence number. Bids
    /// sort by ascending price and asks by descending price, with earlier
    /// orders at the same price later in tree order.
    pub fn place_order(
        &mut self,
        seat: DataIndex,
        side: Side,
        price_raw: u128,
        num_base_atoms: u64,
        last_valid_slot: u32,
        order_type: OrderType,
    ) -> (DataIndex, u64) {
        let sequence_number = self.fixed.order_sequence_number;
        self.fixed.order_sequence_number += 1;

        let mut value = RestingOrderValue::zeroed();
        value.trader_index = seat;
        value.last_valid_slot = last_valid_slot;
        value.num_base_atoms = num_base_atoms;
        value.sequence_number = sequence_number;
        value.price = u128_to_words(price_raw);
        value.is_bid = (side == Side::Bid) as u8;
        value.order_type = order_type as u8;
        let index = self.region.alloc(&value);

        let tie_break = u64::MAX - sequence_number;
        match side {
            Side::Bid => self
                .bids
                .insert(&mut self.region, index, (price_raw, tie_break)),
            Side::Ask => self
                .asks
                .insert(&mut self.region, index, (u128::MAX - price_raw, tie_break)),
        }
        (index, sequence_number)
    }

    pub fn limit(
        &mut self,
        seat: DataIndex,
        side: Side,
        price_raw: u128,
        num_base_atoms: u64,
    ) -> (DataIndex, u64) {
        self.place_order(seat, side, price_raw, num_base_atoms, 0, OrderType::Limit)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut fixed = self.fixed;
        fixed.bids_root_index = self.bids.root;
        fixed.asks_root_index = self.asks.root;
        fixed.claimed_seats_root_index = self.seats.root;
        fixed.num_bytes_allocated = self.region.data.len() as u32;
        assemble(&fixed, &self.region)
    }
}

pub struct WrapperBuilder {
    pub fixed: WrapperFixed,
    pub region: DynamicRegion,
    market_infos: TreeBuilder<Pubkey>,
    open_orders: HashMap<DataIndex, TreeBuilder<u64>>,
}

impl WrapperBuilder {
    pub fn new(trader: Pubkey) -> Self {
        let mut fixed = WrapperFixed::zeroed();
        fixed.discriminant = WRAPPER_DISCRIMINANT;
        fixed.trader = trader;
        fixed.free_list_head_index = NIL;
        fixed.market_infos_root_index = NIL;
        Self {
            fixed,
            region: DynamicRegion::new(WRAPPER_BLOCK_SIZE),
            market_infos: TreeBuilder::new(),
            open_orders: HashMap::new(),
        }
    }

    pub fn add_market(&mut self, market: Pubkey, base_atoms: u64, quote_atoms: u64) -> DataIndex {
        let mut value = MarketInfoValue::zeroed();
        value.market = market;
        value.orders_root_index = NIL;
        value.base_balance = base_atoms;
        value.quote_balance = quote_atoms;
        value.last_updated_slot = 1_000;
        let index = self.region.alloc(&value);
        self.market_infos.insert(&mut self.region, index, market);
        self.open_orders.insert(index, TreeBuilder::new());
        index
    }

    pub fn add_open_order(
        &mut self,
        market_info: DataIndex,
        client_order_id: u64,
        order_sequence_number: u64,
        price_raw: u128,
        num_base_atoms: u64,
        side: Side,
    ) -> DataIndex {
        let mut value = OpenOrderValue::zeroed();
        value.client_order_id = client_order_id;
        value.order_sequence_number = order_sequence_number;
        value.price = u128_to_words(price_raw);
        value.num_base_atoms = num_base_atoms;
        value.market_data_index = NIL;
        value.is_bid = (side == Side::Bid) as u8;
        value.order_type = OrderType::Limit as u8;
        let index = self.region.alloc(&value);
        let tree = self
            .open_orders
            .get_mut(&market_info)
            .expect("market info must be added first");
        tree.insert(&mut self.region, index, order_sequence_number);
        index
    }

    pub fn build(&self) -> Vec<u8> {
        let mut region = DynamicRegion {
            data: self.region.data.clone(),
            block_size: WRAPPER_BLOCK_SIZE,
        };
        for (info_index, tree) in &self.open_orders {
            let mut info: MarketInfoValue = region.value(*info_index);
            info.orders_root_index = tree.root;
            region.set_value(*info_index, &info);
        }
        let mut fixed = self.fixed;
        fixed.market_infos_root_index = self.market_infos.root;
        fixed.num_bytes_allocated = region.data.len() as u32;
        assemble(&fixed, &region)
    }
}

pub struct GlobalBuilder {
    pub fixed: GlobalFixed,
    pub region: DynamicRegion,
    seats: TreeBuilder<Pubkey>,
}

impl GlobalBuilder {
    pub fn new(mint: Pubkey) -> Self {
        let mut fixed = GlobalFixed::zeroed();
        fixed.discriminant = GLOBAL_DISCRIMINANT;
        fixed.mint = mint;
        fixed.vault = Pubkey::new_unique();
        fixed.global_seats_root_index = NIL;
        fixed.global_amounts_root_index = NIL;
        fixed.global_amounts_max_index = NIL;
        fixed.free_list_head_index = NIL;
        Self {
            fixed,
            region: DynamicRegion::new(GLOBAL_BLOCK_SIZE),
            seats: TreeBuilder::new(),
        }
    }

    pub fn add_seat(&mut self, trader: Pubkey, balance_atoms: u64, gas_lamports: u64) -> DataIndex {
        let mut value = GlobalSeatValue::zeroed();
        value.trader = trader;
        value.token_balance = balance_atoms;
        value.unclaimed_gas_balance = gas_lamports;
        let index = self.region.alloc(&value);
        self.seats.insert(&mut self.region, index, trader);
        self.fixed.num_seats_claimed += 1;
        index
    }

    pub fn build(&self) -> Vec<u8> {
        let mut fixed = self.fixed;
        fixed.global_seats_root_index = self.seats.root;
        fixed.num_bytes_allocated = self.region.data.len() as u32;
        assemble(&fixed, &self.region)
    }
}
