//! Palette + bit-packed index storage for one cuboid of block states.

use crate::block_position::BlockPosition;
use crate::block_state::BlockState;
use crate::error::{Result, SchematicError};
use rustc_hash::FxHashMap;
use std::collections::HashMap;

/// Fixed-width unsigned integers packed into 64-bit words, little end first.
/// An entry may straddle two words.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PackedBitArray {
    bits: u32,
    len: usize,
    words: Vec<u64>,
}

impl PackedBitArray {
    fn new(bits: u32, len: usize) -> Self {
        PackedBitArray {
            bits,
            len,
            words: vec![0; word_count(len, bits)],
        }
    }

    #[inline]
    fn mask(&self) -> u64 {
        (1u64 << self.bits) - 1
    }

    #[inline]
    fn get(&self, index: usize) -> u32 {
        let bit = index * self.bits as usize;
        let word = bit / 64;
        let offset = bit % 64;
        let mut value = self.words[word] >> offset;
        if offset + self.bits as usize > 64 {
            value |= self.words[word + 1] << (64 - offset);
        }
        (value & self.mask()) as u32
    }

    #[inline]
    fn set(&mut self, index: usize, value: u32) {
        let mask = self.mask();
        let value = value as u64 & mask;
        let bit = index * self.bits as usize;
        let word = bit / 64;
        let offset = bit % 64;
        self.words[word] = (self.words[word] & !(mask << offset)) | (value << offset);
        if offset + self.bits as usize > 64 {
            let spill = 64 - offset;
            self.words[word + 1] =
                (self.words[word + 1] & !(mask >> spill)) | (value >> spill);
        }
    }

    fn resized(&self, bits: u32) -> PackedBitArray {
        let mut out = PackedBitArray::new(bits, self.len);
        for i in 0..self.len {
            out.set(i, self.get(i));
        }
        out
    }
}

fn word_count(len: usize, bits: u32) -> usize {
    len.saturating_mul(bits as usize).div_ceil(64)
}

fn checked_word_count(len: usize, bits: u32) -> Option<usize> {
    Some(len.checked_mul(bits as usize)?.div_ceil(64))
}

/// Bits per entry for a palette of `palette_len` states, never below 2.
pub fn bits_for_palette(palette_len: usize) -> u32 {
    if palette_len <= 4 {
        2
    } else {
        usize::BITS - (palette_len - 1).leading_zeros()
    }
}

/// Dense block storage addressed as `(y * size_z + z) * size_x + x`.
///
/// Palette entry 0 is air, the value of every cell in a fresh container.
#[derive(Debug, Clone)]
pub struct PackedVoxelContainer {
    size: BlockPosition,
    palette: Vec<BlockState>,
    palette_index: FxHashMap<BlockState, u32>,
    storage: PackedBitArray,
}

/// Cell-wise equality: palette order and unused palette entries do not matter.
impl PartialEq for PackedVoxelContainer {
    fn eq(&self, other: &Self) -> bool {
        if self.size != other.size {
            return false;
        }
        if self.palette == other.palette && self.storage == other.storage {
            return true;
        }
        (0..self.storage.len).all(|i| {
            self.palette[self.storage.get(i) as usize] == other.palette[other.storage.get(i) as usize]
        })
    }
}

impl PackedVoxelContainer {
    /// New air-filled container. Negative dimensions are taken by magnitude.
    pub fn new(size: BlockPosition) -> Self {
        let size = size.abs();
        let volume = size.volume() as usize;
        let air = BlockState::air();
        let mut palette_index = FxHashMap::default();
        palette_index.insert(air.clone(), 0);
        PackedVoxelContainer {
            size,
            palette: vec![air],
            palette_index,
            storage: PackedBitArray::new(bits_for_palette(1), volume),
        }
    }

    pub fn size(&self) -> BlockPosition {
        self.size
    }

    pub fn volume(&self) -> usize {
        self.storage.len
    }

    pub fn palette(&self) -> &[BlockState] {
        &self.palette
    }

    pub fn bits_per_entry(&self) -> u32 {
        self.storage.bits
    }

    #[inline]
    pub fn is_in_bounds(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0 && y >= 0 && z >= 0 && x < self.size.x && y < self.size.y && z < self.size.z
    }

    #[inline]
    fn index(&self, x: i32, y: i32, z: i32) -> usize {
        ((y as usize * self.size.z as usize) + z as usize) * self.size.x as usize + x as usize
    }

    fn out_of_bounds(&self, x: i32, y: i32, z: i32) -> SchematicError {
        SchematicError::OutOfBounds {
            pos: BlockPosition::new(x, y, z),
            size: self.size,
            context: None,
        }
    }

    pub fn get(&self, x: i32, y: i32, z: i32) -> Result<&BlockState> {
        if !self.is_in_bounds(x, y, z) {
            return Err(self.out_of_bounds(x, y, z));
        }
        Ok(self.get_unchecked(x, y, z))
    }

    /// Hot-path accessor for callers that validated their scan range.
    /// Coordinates outside the container still panic on the slice index.
    #[inline]
    pub fn get_unchecked(&self, x: i32, y: i32, z: i32) -> &BlockState {
        debug_assert!(self.is_in_bounds(x, y, z));
        let id = self.storage.get(self.index(x, y, z));
        &self.palette[id as usize]
    }

    pub fn set(&mut self, x: i32, y: i32, z: i32, state: &BlockState) -> Result<()> {
        if !self.is_in_bounds(x, y, z) {
            return Err(self.out_of_bounds(x, y, z));
        }
        let id = self.palette_id(state);
        let index = self.index(x, y, z);
        self.storage.set(index, id);
        Ok(())
    }

    /// Palette id for `state`, adding it (and widening storage) if needed.
    fn palette_id(&mut self, state: &BlockState) -> u32 {
        if let Some(&id) = self.palette_index.get(state) {
            return id;
        }
        let id = self.palette.len() as u32;
        self.palette.push(state.clone());
        self.palette_index.insert(state.clone(), id);

        let bits = bits_for_palette(self.palette.len());
        if bits != self.storage.bits {
            self.storage = self.storage.resized(bits);
        }
        id
    }

    /// Palette in first-seen order plus the packed words, as stored on disk.
    pub fn serialize(&self) -> (Vec<BlockState>, Vec<i64>) {
        let words = self.storage.words.iter().map(|&w| w as i64).collect();
        (self.palette.clone(), words)
    }

    /// Rebuilds a container from its stored form. Sizes are validated before
    /// anything is allocated.
    pub fn deserialize(palette: Vec<BlockState>, words: &[i64], size: BlockPosition) -> Result<Self> {
        let size = size
            .checked_abs()
            .ok_or_else(|| SchematicError::corrupt(format!("region size {} is out of range", size)))?;
        if palette.is_empty() {
            return Err(SchematicError::corrupt("block state palette is empty"));
        }
        let bits = bits_for_palette(palette.len());
        let (volume, expected) = size
            .checked_volume()
            .and_then(|volume| Some((volume, checked_word_count(volume, bits)?)))
            .ok_or_else(|| SchematicError::corrupt(format!("region size {} is too large", size)))?;
        if words.len() != expected {
            return Err(SchematicError::corrupt(format!(
                "block state array has {} words, expected {} for volume {} at {} bits",
                words.len(),
                expected,
                volume,
                bits
            )));
        }

        let storage = PackedBitArray {
            bits,
            len: volume,
            words: words.iter().map(|&w| w as u64).collect(),
        };
        let palette_len = palette.len() as u32;
        if let Some(bad) = (0..volume).map(|i| storage.get(i)).find(|&id| id >= palette_len) {
            return Err(SchematicError::corrupt(format!(
                "palette index {} out of range for palette of {}",
                bad, palette_len
            )));
        }

        let mut palette_index = FxHashMap::default();
        for (i, state) in palette.iter().enumerate() {
            palette_index.entry(state.clone()).or_insert(i as u32);
        }

        Ok(PackedVoxelContainer {
            size,
            palette,
            palette_index,
            storage,
        })
    }

    pub fn count_non_air(&self) -> u64 {
        let air: Vec<bool> = self.palette.iter().map(BlockState::is_air).collect();
        (0..self.storage.len)
            .filter(|&i| !air[self.storage.get(i) as usize])
            .count() as u64
    }

    /// Number of cells per distinct state, air included.
    pub fn material_counts(&self) -> HashMap<BlockState, u64> {
        let mut per_id = vec![0u64; self.palette.len()];
        for i in 0..self.storage.len {
            per_id[self.storage.get(i) as usize] += 1;
        }
        self.palette
            .iter()
            .zip(per_id)
            .filter(|(_, count)| *count > 0)
            .fold(HashMap::new(), |mut acc, (state, count)| {
                *acc.entry(state.clone()).or_insert(0) += count;
                acc
            })
    }
}
