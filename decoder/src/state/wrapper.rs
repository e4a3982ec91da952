//! Wrapper accounts cache one trader's view of every market they use. The
//! dynamic region holds a tree of per-market records, and each record is the
//! root of its own nested tree of open orders in the same region.
use bytemuck::{Pod, Zeroable};
use solana_program::pubkey::Pubkey;
use std::collections::HashMap;
use std::fmt;
use std::mem::size_of;

use crate::error::DecoderResult;
use crate::quantities::decode_scaled_u128;
use crate::state::market::{MarketData, RestingOrder};
use crate::state::red_black_tree::{DataIndex, RedBlackTreeReader, NODE_HEADER_SIZE};
use crate::state::{DecodeConfig, OrderType, Side};
use crate::utils::{read_pod, u128_from_words};

pub const WRAPPER_FIXED_SIZE: usize = 64;
pub const WRAPPER_BLOCK_SIZE: usize = 96;

#[derive(Debug, Copy, Clone, Pod, Zeroable)]
#[repr(C)]
pub struct WrapperFixed {
    pub discriminant: u64,
    pub trader: Pubkey,
    pub num_bytes_allocated: u32,
    pub free_list_head_index: DataIndex,
    pub market_infos_root_index: DataIndex,
    _padding: [u32; 3],
}

const _: () = assert!(size_of::<WrapperFixed>() == WRAPPER_FIXED_SIZE);

impl WrapperFixed {
    pub const LEN: usize = WRAPPER_FIXED_SIZE;
}

#[derive(Debug, Copy, Clone, Pod, Zeroable)]
#[repr(C)]
pub struct MarketInfoValue {
    pub market: Pubkey,
    pub orders_root_index: DataIndex,
    /// The trader's claimed seat on the market itself.
    pub trader_index: DataIndex,
    pub base_balance: u64,
    pub quote_balance: u64,
    pub quote_volume: u64,
    pub last_updated_slot: u32,
    _padding: [u32; 3],
}

const _: () = assert!(size_of::<MarketInfoValue>() + NODE_HEADER_SIZE == WRAPPER_BLOCK_SIZE);

impl MarketInfoValue {
    pub const LEN: usize = size_of::<Self>();
}

#[derive(Debug, Copy, Clone, Pod, Zeroable)]
#[repr(C)]
pub struct OpenOrderValue {
    pub client_order_id: u64,
    pub order_sequence_number: u64,
    pub price: [u64; 2],
    pub num_base_atoms: u64,
    /// Where the order last rested in the market's dynamic region.
    pub market_data_index: DataIndex,
    pub last_valid_slot: u32,
    pub is_bid: u8,
    pub order_type: u8,
    _padding: [u8; 30],
}

const _: () = assert!(size_of::<OpenOrderValue>() + NODE_HEADER_SIZE == WRAPPER_BLOCK_SIZE);

impl OpenOrderValue {
    pub const LEN: usize = size_of::<Self>();

    pub fn price(&self) -> u128 {
        u128_from_words(self.price)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenOrder {
    pub client_order_id: u64,
    pub order_sequence_number: u64,
    pub price_raw: u128,
    /// Quote atoms per base atom.
    pub price: f64,
    pub num_base_atoms: u64,
    pub market_data_index: DataIndex,
    pub last_valid_slot: u32,
    pub side: Side,
    pub order_type: OrderType,
}

fn read_open_order(index: DataIndex, payload: &[u8]) -> DecoderResult<OpenOrder> {
    let value: OpenOrderValue = read_pod(payload)?;
    let price_raw = value.price();
    Ok(OpenOrder {
        client_order_id: value.client_order_id,
        order_sequence_number: value.order_sequence_number,
        price_raw,
        price: decode_scaled_u128(price_raw),
        num_base_atoms: value.num_base_atoms,
        market_data_index: value.market_data_index,
        last_valid_slot: value.last_valid_slot,
        side: Side::from_is_bid(value.is_bid),
        order_type: OrderType::parse(value.order_type, index)?,
    })
}

impl OpenOrder {
    fn refreshed_from(&self, resting: &RestingOrder) -> Self {
        Self {
            price_raw: resting.price_raw,
            price: resting.price,
            num_base_atoms: resting.num_base_atoms,
            market_data_index: resting.data_index,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketInfoParsed {
    pub market: Pubkey,
    pub trader_index: DataIndex,
    pub base_balance_atoms: u64,
    pub quote_balance_atoms: u64,
    pub quote_volume_atoms: u64,
    pub last_updated_slot: u32,
    pub orders: Vec<OpenOrder>,
}

impl MarketInfoParsed {
    /// The cached orders that still rest on `market`, with price and size
    /// taken from the market. Filled or cancelled orders are dropped.
    pub fn live_orders(&self, market: &MarketData) -> Vec<OpenOrder> {
        let resting: HashMap<u64, &RestingOrder> = market
            .open_orders()
            .map(|order| (order.sequence_number, order))
            .collect();
        self.orders
            .iter()
            .filter_map(|order| {
                resting
                    .get(&order.order_sequence_number)
                    .map(|resting| order.refreshed_from(resting))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WrapperData {
    pub trader: Pubkey,
    pub num_bytes_allocated: u32,
    pub market_infos: Vec<MarketInfoParsed>,
}

impl WrapperData {
    pub fn decode(data: &[u8]) -> DecoderResult<Self> {
        Self::decode_with_config(data, &DecodeConfig::default())
    }

    pub fn decode_with_config(data: &[u8], config: &DecodeConfig) -> DecoderResult<Self> {
        let fixed: WrapperFixed = read_pod(data)?;
        let reader = RedBlackTreeReader::new(&data[WRAPPER_FIXED_SIZE..], WRAPPER_BLOCK_SIZE)?
            .with_color_checks(config.verify_colors);

        let market_infos = reader.traverse_in_order(fixed.market_infos_root_index, |_, payload| {
            let info: MarketInfoValue = read_pod(payload)?;
            Ok(MarketInfoParsed {
                market: info.market,
                trader_index: info.trader_index,
                base_balance_atoms: info.base_balance,
                quote_balance_atoms: info.quote_balance,
                quote_volume_atoms: info.quote_volume,
                last_updated_slot: info.last_updated_slot,
                orders: reader.traverse_in_order(info.orders_root_index, read_open_order)?,
            })
        })?;

        Ok(Self {
            trader: fixed.trader,
            num_bytes_allocated: fixed.num_bytes_allocated,
            market_infos,
        })
    }

    pub fn market_info_for_market(&self, market: &Pubkey) -> Option<&MarketInfoParsed> {
        self.market_infos.iter().find(|info| &info.market == market)
    }

    pub fn open_orders_for_market(&self, market: &Pubkey) -> Option<&[OpenOrder]> {
        self.market_info_for_market(market)
            .map(|info| info.orders.as_slice())
    }

    /// `None` if the wrapper has never touched the market at `address`.
    pub fn live_open_orders_for_market(
        &self,
        market: &MarketData,
        address: &Pubkey,
    ) -> Option<Vec<OpenOrder>> {
        self.market_info_for_market(address)
            .map(|info| info.live_orders(market))
    }
}

impl fmt::Display for WrapperData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "========================")?;
        writeln!(f, "Trader: {}", self.trader)?;
        for info in &self.market_infos {
            writeln!(f, "------------------------")?;
            writeln!(f, "Market: {}", info.market)?;
            writeln!(f, "Last updated slot: {}", info.last_updated_slot)?;
            writeln!(
                f,
                "BaseAtoms: {} QuoteAtoms: {}",
                info.base_balance_atoms, info.quote_balance_atoms
            )?;
            for order in &info.orders {
                writeln!(
                    f,
                    "OpenOrder: ClientOrderId: {} {}@{} SeqNum: {} LastValidSlot: {} IsBid: {}",
                    order.client_order_id,
                    order.num_base_atoms,
                    order.price,
                    order.order_sequence_number,
                    order.last_valid_slot,
                    order.side == Side::Bid
                )?;
            }
        }
        write!(f, "------------------------")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_offsets() {
        let mut fixed = WrapperFixed::zeroed();
        fixed.num_bytes_allocated = 3;
        fixed.market_infos_root_index = 96;
        let bytes = bytemuck::bytes_of(&fixed);
        assert_eq!(bytes[40..44], 3u32.to_le_bytes());
        assert_eq!(bytes[48..52], 96u32.to_le_bytes());

        let mut info = MarketInfoValue::zeroed();
        info.orders_root_index = 192;
        info.last_updated_slot = 77;
        let bytes = bytemuck::bytes_of(&info);
        assert_eq!(bytes[32..36], 192u32.to_le_bytes());
        assert_eq!(bytes[64..68], 77u32.to_le_bytes());

        let mut order = OpenOrderValue::zeroed();
        order.num_base_atoms = 10;
        order.is_bid = 1;
        order.order_type = 2;
        let bytes = bytemuck::bytes_of(&order);
        assert_eq!(bytes[32..40], 10u64.to_le_bytes());
        assert_eq!(bytes[48], 1);
        assert_eq!(bytes[49], 2);
    }

    #[test]
    fn unknown_open_order_type() {
        let mut order = OpenOrderValue::zeroed();
        order.order_type = 9;
        let err = read_open_order(288, bytemuck::bytes_of(&order)).unwrap_err();
        assert_eq!(
            err,
            crate::error::DecoderError::CorruptState {
                index: 288,
                reason: crate::error::Corruption::UnknownOrderType(9)
            }
        );
    }
}
