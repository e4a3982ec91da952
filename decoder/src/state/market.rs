//! Market accounts: a 256 byte fixed header followed by one dynamic region
//! shared by the bid tree, the ask tree and the claimed seat tree.
use bytemuck::{Pod, Zeroable};
use solana_program::pubkey::Pubkey;
use std::fmt;
use std::mem::size_of;

use crate::error::{Corruption, DecoderError, DecoderResult};
use crate::quantities::{atoms_price_to_token_price, atoms_to_tokens, decode_scaled_u128};
use crate::state::red_black_tree::{DataIndex, RedBlackTreeReader, NODE_HEADER_SIZE};
use crate::state::{DecodeConfig, OrderType, Side};
use crate::utils::{read_pod, u128_from_words};

pub const MARKET_FIXED_SIZE: usize = 256;
pub const MARKET_BLOCK_SIZE: usize = 64;
pub const MAX_SUPPORTED_MARKET_VERSION: u8 = 0;

const PRICE_SCALE: u128 = 1_000_000_000_000_000_000;

#[derive(Debug, Copy, Clone, Pod, Zeroable)]
#[repr(C)]
pub struct MarketFixed {
    pub discriminant: u64,
    pub version: u8,
    pub base_mint_decimals: u8,
    pub quote_mint_decimals: u8,
    pub base_vault_bump: u8,
    pub quote_vault_bump: u8,
    _padding1: [u8; 3],
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    /// Incremented for every order placed, so it doubles as an order id.
    pub order_sequence_number: u64,
    /// High water mark of the dynamic region.
    pub num_bytes_allocated: u32,
    pub bids_root_index: DataIndex,
    pub bids_best_index: DataIndex,
    pub asks_root_index: DataIndex,
    pub asks_best_index: DataIndex,
    pub claimed_seats_root_index: DataIndex,
    pub free_list_head_index: DataIndex,
    _padding2: u32,
    pub quote_volume: u64,
    _padding3: [u64; 8],
}

const _: () = assert!(size_of::<MarketFixed>() == MARKET_FIXED_SIZE);

impl MarketFixed {
    pub const LEN: usize = MARKET_FIXED_SIZE;
}

#[derive(Debug, Copy, Clone, Pod, Zeroable)]
#[repr(C)]
pub struct RestingOrderValue {
    /// Data index of the owner's claimed seat.
    pub trader_index: DataIndex,
    pub last_valid_slot: u32,
    pub num_base_atoms: u64,
    pub sequence_number: u64,
    /// Quote atoms per base atom, scaled by 10^18, low word first.
    pub price: [u64; 2],
    pub is_bid: u8,
    pub order_type: u8,
    pub reverse_spread: u16,
    _padding: [u8; 4],
}

const _: () = assert!(size_of::<RestingOrderValue>() + NODE_HEADER_SIZE == MARKET_BLOCK_SIZE);

impl RestingOrderValue {
    pub const LEN: usize = size_of::<Self>();

    pub fn price(&self) -> u128 {
        u128_from_words(self.price)
    }
}

#[derive(Debug, Copy, Clone, Pod, Zeroable)]
#[repr(C)]
pub struct ClaimedSeatValue {
    pub trader: Pubkey,
    pub base_withdrawable_balance: u64,
    pub quote_withdrawable_balance: u64,
}

const _: () = assert!(size_of::<ClaimedSeatValue>() + NODE_HEADER_SIZE == MARKET_BLOCK_SIZE);

impl ClaimedSeatValue {
    pub const LEN: usize = size_of::<Self>();
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestingOrder {
    pub trader: Pubkey,
    pub data_index: DataIndex,
    pub side: Side,
    pub num_base_atoms: u64,
    pub num_base_tokens: f64,
    pub last_valid_slot: u32,
    pub sequence_number: u64,
    /// Stored price, quote atoms per base atom scaled by 10^18.
    pub price_raw: u128,
    /// Quote atoms per base atom.
    pub price: f64,
    /// Quote tokens per base token.
    pub token_price: f64,
    pub order_type: OrderType,
    pub reverse_spread: u16,
}

impl RestingOrder {
    fn from_slot(
        reader: &RedBlackTreeReader,
        data_index: DataIndex,
        payload: &[u8],
        side: Side,
        fixed: &MarketFixed,
    ) -> DecoderResult<Self> {
        let value: RestingOrderValue = read_pod(payload)?;
        let seat = reader
            .payload(value.trader_index)
            .map_err(|_| DecoderError::corrupt(data_index, Corruption::TraderOutOfBounds))?;
        let trader: Pubkey = read_pod(seat)?;

        let price_raw = value.price();
        let price = decode_scaled_u128(price_raw);
        Ok(Self {
            trader,
            data_index,
            side,
            num_base_atoms: value.num_base_atoms,
            num_base_tokens: atoms_to_tokens(value.num_base_atoms, fixed.base_mint_decimals),
            last_valid_slot: value.last_valid_slot,
            sequence_number: value.sequence_number,
            price_raw,
            price,
            token_price: atoms_price_to_token_price(
                price,
                fixed.base_mint_decimals,
                fixed.quote_mint_decimals,
            ),
            order_type: OrderType::parse(value.order_type, data_index)?,
            reverse_spread: value.reverse_spread,
        })
    }

    /// Quote atoms locked by this order if it were a bid, rounded up.
    pub fn quote_atoms(&self) -> u128 {
        let atoms = self.num_base_atoms as u128;
        let whole = atoms.saturating_mul(self.price_raw / PRICE_SCALE);
        let fraction = (atoms * (self.price_raw % PRICE_SCALE) + PRICE_SCALE - 1) / PRICE_SCALE;
        whole.saturating_add(fraction)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedSeat {
    pub trader: Pubkey,
    pub base_balance_atoms: u64,
    pub quote_balance_atoms: u64,
}

impl From<ClaimedSeatValue> for ClaimedSeat {
    fn from(value: ClaimedSeatValue) -> Self {
        Self {
            trader: value.trader,
            base_balance_atoms: value.base_withdrawable_balance,
            quote_balance_atoms: value.quote_withdrawable_balance,
        }
    }
}

/// One trader's funds on a market, in tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TraderBalances {
    pub base_withdrawable: f64,
    pub quote_withdrawable: f64,
    pub base_open_orders: f64,
    pub quote_open_orders: f64,
}

/// Funds deposited on the whole market, in atoms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarketBalances {
    pub base_withdrawable_atoms: u128,
    pub quote_withdrawable_atoms: u128,
    pub base_open_orders_atoms: u128,
    pub quote_open_orders_atoms: u128,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketData {
    pub version: u8,
    pub base_mint_decimals: u8,
    pub quote_mint_decimals: u8,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub order_sequence_number: u64,
    pub num_bytes_allocated: u32,
    pub quote_volume_atoms: u64,
    /// Ascending price, so the best bid is last.
    pub bids: Vec<RestingOrder>,
    /// Descending price, so the best ask is last.
    pub asks: Vec<RestingOrder>,
    pub claimed_seats: Vec<ClaimedSeat>,
}

fn read_resting_orders(
    reader: &RedBlackTreeReader,
    root: DataIndex,
    side: Side,
    fixed: &MarketFixed,
    config: &DecodeConfig,
) -> DecoderResult<Vec<RestingOrder>> {
    let orders = reader.traverse_in_order(root, |index, payload| {
        RestingOrder::from_slot(reader, index, payload, side, fixed)
    })?;
    Ok(orders
        .into_iter()
        .filter(|order| config.is_live(order.last_valid_slot))
        .collect())
}

fn read_claimed_seat(_index: DataIndex, payload: &[u8]) -> DecoderResult<ClaimedSeat> {
    read_pod::<ClaimedSeatValue>(payload).map(ClaimedSeat::from)
}

impl MarketData {
    pub fn decode(data: &[u8]) -> DecoderResult<Self> {
        Self::decode_with_config(data, &DecodeConfig::default())
    }

    pub fn decode_with_config(data: &[u8], config: &DecodeConfig) -> DecoderResult<Self> {
        let fixed: MarketFixed = read_pod(data)?;
        if fixed.version > MAX_SUPPORTED_MARKET_VERSION {
            return Err(DecoderError::UnsupportedVersion {
                version: fixed.version,
                max_supported: MAX_SUPPORTED_MARKET_VERSION,
            });
        }

        let reader = RedBlackTreeReader::new(&data[MARKET_FIXED_SIZE..], MARKET_BLOCK_SIZE)?
            .with_color_checks(config.verify_colors);
        let bids = read_resting_orders(&reader, fixed.bids_root_index, Side::Bid, &fixed, config)?;
        let asks = read_resting_orders(&reader, fixed.asks_root_index, Side::Ask, &fixed, config)?;
        let claimed_seats =
            reader.traverse_in_order(fixed.claimed_seats_root_index, read_claimed_seat)?;

        Ok(Self {
            version: fixed.version,
            base_mint_decimals: fixed.base_mint_decimals,
            quote_mint_decimals: fixed.quote_mint_decimals,
            base_mint: fixed.base_mint,
            quote_mint: fixed.quote_mint,
            base_vault: fixed.base_vault,
            quote_vault: fixed.quote_vault,
            order_sequence_number: fixed.order_sequence_number,
            num_bytes_allocated: fixed.num_bytes_allocated,
            quote_volume_atoms: fixed.quote_volume,
            bids,
            asks,
            claimed_seats,
        })
    }

    pub fn best_bid_price(&self) -> Option<f64> {
        self.bids.last().map(|order| order.token_price)
    }

    pub fn best_ask_price(&self) -> Option<f64> {
        self.asks.last().map(|order| order.token_price)
    }

    /// Bids from most to least competitive.
    pub fn bids_l2(&self) -> impl Iterator<Item = &RestingOrder> {
        self.bids.iter().rev()
    }

    /// Asks from most to least competitive.
    pub fn asks_l2(&self) -> impl Iterator<Item = &RestingOrder> {
        self.asks.iter().rev()
    }

    pub fn open_orders(&self) -> impl Iterator<Item = &RestingOrder> {
        self.bids.iter().chain(self.asks.iter())
    }

    pub fn find_order(&self, sequence_number: u64) -> Option<&RestingOrder> {
        self.open_orders()
            .find(|order| order.sequence_number == sequence_number)
    }

    pub fn seat(&self, trader: &Pubkey) -> Option<&ClaimedSeat> {
        self.claimed_seats.iter().find(|seat| &seat.trader == trader)
    }

    pub fn has_seat(&self, trader: &Pubkey) -> bool {
        self.seat(trader).is_some()
    }

    /// Zero if the trader has no seat.
    pub fn withdrawable_balance_tokens(&self, trader: &Pubkey, is_base: bool) -> f64 {
        match self.seat(trader) {
            Some(seat) if is_base => {
                atoms_to_tokens(seat.base_balance_atoms, self.base_mint_decimals)
            }
            Some(seat) => atoms_to_tokens(seat.quote_balance_atoms, self.quote_mint_decimals),
            None => 0.0,
        }
    }

    /// Seat balances plus funds locked in the trader's resting orders.
    pub fn balances_for_trader(&self, trader: &Pubkey) -> TraderBalances {
        self.trader_balances(trader, true)
    }

    /// Like [`Self::balances_for_trader`], leaving out global orders since
    /// their funds sit in a global account rather than on this market.
    pub fn market_balances_for_trader(&self, trader: &Pubkey) -> TraderBalances {
        self.trader_balances(trader, false)
    }

    fn trader_balances(&self, trader: &Pubkey, include_global: bool) -> TraderBalances {
        let seat = match self.seat(trader) {
            Some(seat) => seat,
            None => return TraderBalances::default(),
        };
        let owned = |order: &&RestingOrder| {
            &order.trader == trader && (include_global || order.order_type != OrderType::Global)
        };
        TraderBalances {
            base_withdrawable: atoms_to_tokens(seat.base_balance_atoms, self.base_mint_decimals),
            quote_withdrawable: atoms_to_tokens(
                seat.quote_balance_atoms,
                self.quote_mint_decimals,
            ),
            base_open_orders: self
                .asks
                .iter()
                .filter(owned)
                .map(|ask| ask.num_base_tokens)
                .sum(),
            quote_open_orders: self
                .bids
                .iter()
                .filter(owned)
                .map(|bid| bid.num_base_tokens * bid.token_price)
                .sum(),
        }
    }

    pub fn market_balances(&self) -> MarketBalances {
        let not_global = |order: &&RestingOrder| order.order_type != OrderType::Global;
        MarketBalances {
            base_withdrawable_atoms: self
                .claimed_seats
                .iter()
                .map(|seat| seat.base_balance_atoms as u128)
                .sum(),
            quote_withdrawable_atoms: self
                .claimed_seats
                .iter()
                .map(|seat| seat.quote_balance_atoms as u128)
                .sum(),
            base_open_orders_atoms: self
                .asks
                .iter()
                .filter(not_global)
                .map(|ask| ask.num_base_atoms as u128)
                .sum(),
            quote_open_orders_atoms: self
                .bids
                .iter()
                .filter(not_global)
                .fold(0u128, |sum, bid| sum.saturating_add(bid.quote_atoms())),
        }
    }
}

impl fmt::Display for MarketData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "========================")?;
        writeln!(f, "Version: {}", self.version)?;
        writeln!(f, "BaseMint: {}", self.base_mint)?;
        writeln!(f, "QuoteMint: {}", self.quote_mint)?;
        writeln!(f, "OrderSequenceNumber: {}", self.order_sequence_number)?;
        writeln!(f, "NumBytesAllocated: {}", self.num_bytes_allocated)?;
        for (title, orders) in [("Bids:", &self.bids), ("Asks:", &self.asks)] {
            writeln!(f, "{}", title)?;
            for order in orders {
                writeln!(
                    f,
                    "trader: {} numBaseTokens: {} token price: {} lastValidSlot: {} sequenceNumber: {}",
                    order.trader,
                    order.num_base_tokens,
                    order.token_price,
                    order.last_valid_slot,
                    order.sequence_number
                )?;
            }
        }
        writeln!(f, "ClaimedSeats:")?;
        for seat in &self.claimed_seats {
            writeln!(
                f,
                "publicKey: {} baseBalance: {} quoteBalance: {}",
                seat.trader, seat.base_balance_atoms, seat.quote_balance_atoms
            )?;
        }
        write!(f, "========================")
    }
}
