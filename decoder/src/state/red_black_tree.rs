//! Read-only walk over the intrusive red-black trees the exchange keeps
//! inside an account's dynamic region.
//!
//! A tree is a set of fixed-size slots addressed by byte offset ("data
//! index") into the region. Each slot starts with a [`NodeHeader`] holding
//! the offsets of its left child, right child and parent. The walker never
//! compares values: in-order position comes entirely from the links the
//! exchange wrote. Slots that are not reachable from the root, such as blocks
//! parked on the free list, are never read.
use bytemuck::{Pod, Zeroable};
use solana_program::msg;

use crate::error::{Corruption, DecoderError, DecoderResult};
use crate::utils::{assert, read_pod};

pub type DataIndex = u32;

/// Sentinel for "no node", never to be confused with data index 0.
pub const NIL: DataIndex = DataIndex::MAX;

pub const NODE_HEADER_SIZE: usize = 16;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Black = 0,
    Red = 1,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct NodeHeader {
    pub left: DataIndex,
    pub right: DataIndex,
    pub parent: DataIndex,
    /// Low byte is the color, the rest belongs to the exchange.
    pub color: u32,
}

const _: () = assert!(std::mem::size_of::<NodeHeader>() == NODE_HEADER_SIZE);

impl NodeHeader {
    pub const LEN: usize = NODE_HEADER_SIZE;

    pub fn color(&self) -> Option<Color> {
        match self.color & 0xFF {
            0 => Some(Color::Black),
            1 => Some(Color::Red),
            _ => None,
        }
    }

    fn is_red(&self) -> bool {
        self.color() == Some(Color::Red)
    }
}

/// A view of one dynamic region, split into slots of `slot_size` bytes.
#[derive(Debug, Clone, Copy)]
pub struct RedBlackTreeReader<'a> {
    data: &'a [u8],
    slot_size: usize,
    verify_colors: bool,
}

impl<'a> RedBlackTreeReader<'a> {
    pub fn new(data: &'a [u8], slot_size: usize) -> DecoderResult<Self> {
        assert(
            slot_size >= NODE_HEADER_SIZE,
            DecoderError::InvalidSlotSize(slot_size),
        )?;
        Ok(Self {
            data,
            slot_size,
            verify_colors: false,
        })
    }

    pub fn with_color_checks(mut self, verify_colors: bool) -> Self {
        self.verify_colors = verify_colors;
        self
    }

    /// Upper bound on the number of live nodes the region could hold. The
    /// format carries no node count, so any walk longer than this is a cycle.
    pub fn max_nodes(&self) -> usize {
        self.data.len() / self.slot_size
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    fn slot(&self, index: DataIndex) -> DecoderResult<&'a [u8]> {
        let start = index as usize;
        match start.checked_add(self.slot_size) {
            Some(end) if index != NIL && end <= self.data.len() => Ok(&self.data[start..end]),
            _ => Err(DecoderError::corrupt(
                index,
                Corruption::IndexOutOfBounds {
                    region_len: self.data.len(),
                },
            )),
        }
    }

    pub fn header(&self, index: DataIndex) -> DecoderResult<NodeHeader> {
        read_pod(self.slot(index)?)
    }

    /// The value bytes of a slot, everything after its node header.
    pub fn payload(&self, index: DataIndex) -> DecoderResult<&'a [u8]> {
        Ok(&self.slot(index)?[NODE_HEADER_SIZE..])
    }

    fn check_steps(&self, steps: usize, index: DataIndex) -> DecoderResult {
        let max_nodes = self.max_nodes();
        if steps >= max_nodes {
            msg!(
                "Tree walk passed {} nodes at data index {}, aborting",
                max_nodes,
                index
            );
            return Err(DecoderError::corrupt(
                index,
                Corruption::CycleDetected { max_nodes },
            ));
        }
        Ok(())
    }

    fn find_extreme(&self, root: DataIndex, rightmost: bool) -> DecoderResult<DataIndex> {
        if root == NIL {
            return Err(DecoderError::corrupt(root, Corruption::NilRoot));
        }
        let mut current = root;
        let mut header = self.header(current)?;
        let mut steps = 0;
        loop {
            let next = if rightmost { header.right } else { header.left };
            if next == NIL {
                return Ok(current);
            }
            steps += 1;
            self.check_steps(steps, next)?;
            current = next;
            header = self.header(current)?;
        }
    }

    /// Leftmost node under `root`. Callers special-case empty trees: a NIL
    /// root is corrupt here.
    pub fn find_min(&self, root: DataIndex) -> DecoderResult<DataIndex> {
        self.find_extreme(root, false)
    }

    pub fn find_max(&self, root: DataIndex) -> DecoderResult<DataIndex> {
        self.find_extreme(root, true)
    }

    /// Next node in order after `index`, or [`NIL`] if `index` is the maximum.
    pub fn successor(&self, index: DataIndex) -> DecoderResult<DataIndex> {
        let header = self.header(index)?;
        if header.right != NIL {
            return self.find_min(header.right);
        }

        // Climb while we are the right child.
        let mut child = index;
        let mut parent = header.parent;
        let mut steps = 0;
        while parent != NIL {
            let parent_header = self.header(parent)?;
            if parent_header.right != child {
                return Ok(parent);
            }
            steps += 1;
            self.check_steps(steps, parent)?;
            child = parent;
            parent = parent_header.parent;
        }
        Ok(NIL)
    }

    fn check_colors(
        &self,
        index: DataIndex,
        header: &NodeHeader,
        is_root: bool,
    ) -> DecoderResult {
        let violation = DecoderError::corrupt(index, Corruption::ColorViolation);
        let color = header.color().ok_or_else(|| violation.clone())?;
        if is_root && (color != Color::Black || header.parent != NIL) {
            return Err(violation);
        }
        if color == Color::Red {
            for child in [header.left, header.right] {
                if child != NIL && self.header(child)?.is_red() {
                    return Err(violation);
                }
            }
        }
        Ok(())
    }

    /// Lazily walks the tree under `root` in order, yielding each slot's data
    /// index and payload. A NIL root is an empty tree.
    pub fn iter(&self, root: DataIndex) -> RedBlackTreeIter<'a> {
        RedBlackTreeIter {
            reader: *self,
            root,
            next: None,
            visited: 0,
            done: root == NIL,
        }
    }

    /// Applies `project` to every payload under `root`, in order.
    pub fn traverse_in_order<T, F>(
        &self,
        root: DataIndex,
        mut project: F,
    ) -> DecoderResult<Vec<T>>
    where
        F: FnMut(DataIndex, &'a [u8]) -> DecoderResult<T>,
    {
        self.iter(root)
            .map(|item| item.and_then(|(index, payload)| project(index, payload)))
            .collect()
    }
}

pub struct RedBlackTreeIter<'a> {
    reader: RedBlackTreeReader<'a>,
    root: DataIndex,
    next: Option<DataIndex>,
    visited: usize,
    done: bool,
}

impl<'a> RedBlackTreeIter<'a> {
    fn step(&mut self) -> DecoderResult<Option<(DataIndex, &'a [u8])>> {
        let current = match self.next {
            Some(index) => index,
            None => {
                let root_header = self.reader.header(self.root)?;
                if self.reader.verify_colors {
                    self.reader.check_colors(self.root, &root_header, true)?;
                }
                self.reader.find_min(self.root)?
            }
        };
        if current == NIL {
            return Ok(None);
        }

        self.visited += 1;
        self.reader.check_steps(self.visited - 1, current)?;

        let payload = self.reader.payload(current)?;
        if self.reader.verify_colors {
            let header = self.reader.header(current)?;
            self.reader.check_colors(current, &header, current == self.root)?;
        }
        self.next = Some(self.reader.successor(current)?);
        Ok(Some((current, payload)))
    }
}

impl<'a> Iterator for RedBlackTreeIter<'a> {
    type Item = DecoderResult<(DataIndex, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
