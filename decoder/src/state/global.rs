use bytemuck::{Pod, Zeroable};
use solana_program::pubkey::Pubkey;
use std::fmt;
use std::mem::size_of;

use crate::error::DecoderResult;
use crate::quantities::atoms_to_tokens;
use crate::state::red_black_tree::{DataIndex, RedBlackTreeReader, NODE_HEADER_SIZE};
use crate::state::DecodeConfig;
use crate::utils::read_pod;

pub const GLOBAL_FIXED_SIZE: usize = 96;
pub const GLOBAL_BLOCK_SIZE: usize = 64;

/// Gas is held in lamports.
pub const GAS_DECIMALS: u8 = 9;

#[derive(Debug, Copy, Clone, Pod, Zeroable)]
#[repr(C)]
pub struct GlobalFixed {
    pub discriminant: u64,
    pub mint: Pubkey,
    pub vault: Pubkey,
    pub global_seats_root_index: DataIndex,
    pub global_amounts_root_index: DataIndex,
    pub global_amounts_max_index: DataIndex,
    pub free_list_head_index: DataIndex,
    pub num_bytes_allocated: u32,
    pub vault_bump: u8,
    pub global_bump: u8,
    pub num_seats_claimed: u16,
}

const _: () = assert!(size_of::<GlobalFixed>() == GLOBAL_FIXED_SIZE);

impl GlobalFixed {
    pub const LEN: usize = GLOBAL_FIXED_SIZE;
}

#[derive(Debug, Copy, Clone, Pod, Zeroable)]
#[repr(C)]
pub struct GlobalSeatValue {
    pub trader: Pubkey,
    pub token_balance: u64,
    pub unclaimed_gas_balance: u64,
}

const _: () = assert!(size_of::<GlobalSeatValue>() + NODE_HEADER_SIZE == GLOBAL_BLOCK_SIZE);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalSeat {
    pub trader: Pubkey,
    pub balance_atoms: u64,
    pub unclaimed_gas_lamports: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalData {
    pub mint: Pubkey,
    pub vault: Pubkey,
    pub num_bytes_allocated: u32,
    pub num_seats_claimed: u16,
    pub global_seats: Vec<GlobalSeat>,
}

impl GlobalData {
    pub fn decode(data: &[u8]) -> DecoderResult<Self> {
        Self::decode_with_config(data, &DecodeConfig::default())
    }

    pub fn decode_with_config(data: &[u8], config: &DecodeConfig) -> DecoderResult<Self> {
        let fixed: GlobalFixed = read_pod(data)?;
        let global_seats = RedBlackTreeReader::new(&data[GLOBAL_FIXED_SIZE..], GLOBAL_BLOCK_SIZE)?
            .with_color_checks(config.verify_colors)
            .traverse_in_order(fixed.global_seats_root_index, |_, payload| {
                let seat: GlobalSeatValue = read_pod(payload)?;
                Ok(GlobalSeat {
                    trader: seat.trader,
                    balance_atoms: seat.token_balance,
                    unclaimed_gas_lamports: seat.unclaimed_gas_balance,
                })
            })?;

        Ok(Self {
            mint: fixed.mint,
            vault: fixed.vault,
            num_bytes_allocated: fixed.num_bytes_allocated,
            num_seats_claimed: fixed.num_seats_claimed,
            global_seats,
        })
    }

    pub fn seat(&self, trader: &Pubkey) -> Option<&GlobalSeat> {
        self.global_seats.iter().find(|seat| &seat.trader == trader)
    }

    pub fn has_seat(&self, trader: &Pubkey) -> bool {
        self.seat(trader).is_some()
    }

    /// The account does not record its mint's decimals, so the caller
    /// supplies them.
    pub fn balance_tokens(&self, trader: &Pubkey, mint_decimals: u8) -> f64 {
        self.seat(trader)
            .map_or(0.0, |seat| atoms_to_tokens(seat.balance_atoms, mint_decimals))
    }

    pub fn unclaimed_gas_tokens(&self, trader: &Pubkey) -> f64 {
        self.seat(trader).map_or(0.0, |seat| {
            atoms_to_tokens(seat.unclaimed_gas_lamports, GAS_DECIMALS)
        })
    }
}

impl fmt::Display for GlobalData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mint: {}", self.mint)?;
        writeln!(f, "NumSeatsClaimed: {}", self.num_seats_claimed)?;
        writeln!(f, "ClaimedSeats: {}", self.global_seats.len())?;
        for seat in &self.global_seats {
            writeln!(
                f,
                "publicKey: {} balance: {} unclaimedGas: {}",
                seat.trader, seat.balance_atoms, seat.unclaimed_gas_lamports
            )?;
        }
        Ok(())
    }
}
