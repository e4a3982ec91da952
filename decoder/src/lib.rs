/*!
Read-only decoder for the account state of an on-chain orderbook exchange.

## Overview

The exchange keeps its orders and balances in three kinds of accounts: markets, wrappers and globals.
Each account starts with a fixed header and continues with a dynamic region of equally sized blocks.
Blocks are linked into red-black trees by byte offset, and the header records the root of each tree.

This crate turns a raw account snapshot into owned, ordered collections:

- a [`MarketData`][`state::MarketData`] holds the bids, asks and claimed seats of a market,
- a [`WrapperData`][`state::WrapperData`] holds a trader's per-market records with their open orders,
- a [`GlobalData`][`state::GlobalData`] holds the per-trader balances backing global orders.

[`ManifestAccount::decode`][`state::ManifestAccount::decode`] picks the right decoder from the account's discriminant.

## Walking the trees

All traversal goes through [`RedBlackTreeReader`][`state::red_black_tree::RedBlackTreeReader`]. It never
compares keys: in-order position comes from the links alone. Every link is bounds checked against the dynamic
region and every walk is capped at the number of blocks the region could hold, so a corrupt snapshot fails
with [`DecoderError::CorruptState`][`error::DecoderError::CorruptState`] instead of panicking or looping.

## Quantities

Prices are stored as quote atoms per base atom scaled by `10^18`. The [`quantities`] module converts those,
and atom balances, into floating point values, and builds the `(mantissa, exponent)` pairs the exchange
expects for new prices.
*/

pub mod error;
pub mod quantities;
/// Account layouts, decoders and the shared tree walker
pub mod state;
pub mod utils;

pub use error::{DecoderError, DecoderResult};
pub use state::{DecodeConfig, ManifestAccount};
