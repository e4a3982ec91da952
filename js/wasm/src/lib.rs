use manifest_decoder::quantities::{self, TransferDirection};
use manifest_decoder::state::red_black_tree::{DataIndex, RedBlackTreeReader, NIL};
use manifest_decoder::state::MarketData;
use manifest_decoder::DecoderResult;
use wasm_bindgen::prelude::*;

fn to_js<T>(result: DecoderResult<T>) -> Result<T, JsValue> {
    result.map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// `None` only for an empty tree. Any broken link is an error.
fn extreme(
    data: &[u8],
    root: DataIndex,
    slot_size: u32,
    rightmost: bool,
) -> DecoderResult<Option<DataIndex>> {
    if root == NIL {
        return Ok(None);
    }
    let reader = RedBlackTreeReader::new(data, slot_size as usize)?;
    let index = if rightmost {
        reader.find_max(root)?
    } else {
        reader.find_min(root)?
    };
    Ok(Some(index))
}

fn indices(data: &[u8], root: DataIndex, slot_size: u32) -> DecoderResult<Vec<DataIndex>> {
    RedBlackTreeReader::new(data, slot_size as usize)?
        .iter(root)
        .map(|item| item.map(|(index, _)| index))
        .collect()
}

/// `data` is an account's dynamic region, not the whole account.
#[wasm_bindgen]
pub fn find_min(data: &[u8], root: u32, slot_size: u32) -> Result<Option<u32>, JsValue> {
    to_js(extreme(data, root, slot_size, false))
}

#[wasm_bindgen]
pub fn find_max(data: &[u8], root: u32, slot_size: u32) -> Result<Option<u32>, JsValue> {
    to_js(extreme(data, root, slot_size, true))
}

#[wasm_bindgen]
pub fn in_order_indices(data: &[u8], root: u32, slot_size: u32) -> Result<Vec<u32>, JsValue> {
    to_js(indices(data, root, slot_size))
}

/// Best bid and best ask token prices of a whole market account, NaN for an
/// empty side.
#[wasm_bindgen]
pub fn best_prices(data: &[u8]) -> Result<Vec<f64>, JsValue> {
    let market = to_js(MarketData::decode(data))?;
    Ok(vec![
        market.best_bid_price().unwrap_or(f64::NAN),
        market.best_ask_price().unwrap_or(f64::NAN),
    ])
}

#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceParts {
    pub mantissa: u32,
    pub exponent: i32,
}

#[wasm_bindgen]
pub fn to_mantissa_and_exponent(price: f64) -> PriceParts {
    let (mantissa, exponent) = quantities::to_mantissa_and_exponent(price);
    PriceParts { mantissa, exponent }
}

/// Rounds up for deposits and down otherwise.
#[wasm_bindgen]
pub fn tokens_to_atoms(tokens: f64, decimals: u8, deposit: bool) -> u64 {
    let direction = if deposit {
        TransferDirection::Deposit
    } else {
        TransferDirection::Withdraw
    };
    quantities::tokens_to_atoms(tokens, decimals, direction)
}
