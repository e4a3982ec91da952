use num_enum::TryFromPrimitive;
use solana_program::msg;

use crate::error::{Corruption, DecoderError, DecoderResult};
use crate::utils::read_discriminant;

pub use global::GlobalData;
pub use market::MarketData;
pub use red_black_tree::{DataIndex, NIL};
pub use wrapper::WrapperData;

pub mod global;
pub mod market;
/// Read-only traversal of the exchange's in-account red-black trees
pub mod red_black_tree;
pub mod wrapper;

pub const MARKET_DISCRIMINANT: u64 = 4859840929024028656;
pub const GLOBAL_DISCRIMINANT: u64 = 10787423733276977665;
pub const WRAPPER_DISCRIMINANT: u64 = 1;

/// Resting orders with this last valid slot never expire.
pub const NO_EXPIRATION_LAST_VALID_SLOT: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn from_is_bid(is_bid: u8) -> Self {
        if is_bid != 0 {
            Side::Bid
        } else {
            Side::Ask
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum OrderType {
    Limit = 0,
    ImmediateOrCancel = 1,
    PostOnly = 2,
    /// Backed by a global account rather than the trader's market seat.
    Global = 3,
    Reverse = 4,
    ReverseTight = 5,
}

impl OrderType {
    pub(crate) fn parse(raw: u8, index: DataIndex) -> DecoderResult<Self> {
        OrderType::try_from(raw)
            .map_err(|_| DecoderError::corrupt(index, Corruption::UnknownOrderType(raw)))
    }
}

/// Knobs for a single decode call. Decoding is otherwise a pure function of
/// the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeConfig {
    /// When set, resting orders expired at this slot are left out.
    pub current_slot: Option<u32>,
    pub verify_colors: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            current_slot: None,
            verify_colors: cfg!(feature = "verify-colors"),
        }
    }
}

impl DecodeConfig {
    pub fn at_slot(current_slot: u32) -> Self {
        Self {
            current_slot: Some(current_slot),
            ..Self::default()
        }
    }

    /// Orders stay live through `last_valid_slot - 1`.
    pub fn is_live(&self, last_valid_slot: u32) -> bool {
        match self.current_slot {
            Some(slot) => {
                last_valid_slot == NO_EXPIRATION_LAST_VALID_SLOT || last_valid_slot > slot
            }
            None => true,
        }
    }
}

/// Any account owned by the exchange, decoded according to its discriminant.
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestAccount {
    Market(MarketData),
    Wrapper(WrapperData),
    Global(GlobalData),
}

impl ManifestAccount {
    pub fn decode(data: &[u8]) -> DecoderResult<Self> {
        Self::decode_with_config(data, &DecodeConfig::default())
    }

    pub fn decode_with_config(data: &[u8], config: &DecodeConfig) -> DecoderResult<Self> {
        match read_discriminant(data)? {
            MARKET_DISCRIMINANT => Ok(Self::Market(MarketData::decode_with_config(
                data, config,
            )?)),
            WRAPPER_DISCRIMINANT => Ok(Self::Wrapper(WrapperData::decode_with_config(
                data, config,
            )?)),
            GLOBAL_DISCRIMINANT => Ok(Self::Global(GlobalData::decode_with_config(
                data, config,
            )?)),
            other => {
                msg!("Unknown account discriminant {}", other);
                Err(DecoderError::UnknownDiscriminant(other))
            }
        }
    }
}
