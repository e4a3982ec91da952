use thiserror::Error;

use crate::state::red_black_tree::DataIndex;

pub type DecoderResult<T = ()> = Result<T, DecoderError>;

/// Every decode failure is fatal for the snapshot it was raised on.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecoderError {
    #[error("Buffer truncated: expected at least {expected} bytes, got {actual}")]
    TruncatedBuffer { expected: usize, actual: usize },
    #[error("Corrupt state at data index {index}: {reason}")]
    CorruptState {
        index: DataIndex,
        reason: Corruption,
    },
    #[error("Unsupported layout version {version} (max supported {max_supported})")]
    UnsupportedVersion { version: u8, max_supported: u8 },
    #[error("Unknown account discriminant {0:#x}")]
    UnknownDiscriminant(u64),
    #[error("Slot size {0} cannot hold a node header")]
    InvalidSlotSize(usize),
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum Corruption {
    #[error("walk started from a NIL root")]
    NilRoot,
    #[error("slot does not fit in a dynamic region of {region_len} bytes")]
    IndexOutOfBounds { region_len: usize },
    #[error("walk exceeded {max_nodes} nodes, the tree contains a cycle")]
    CycleDetected { max_nodes: usize },
    #[error("red-black coloring invariant broken")]
    ColorViolation,
    #[error("unknown order type {0}")]
    UnknownOrderType(u8),
    #[error("trader index does not point at a claimed seat")]
    TraderOutOfBounds,
}

impl DecoderError {
    pub(crate) fn corrupt(index: DataIndex, reason: Corruption) -> Self {
        DecoderError::CorruptState { index, reason }
    }
}
