// src/core/grid.rs

//! The shared canvas that every connection writes into and every render sink
//! reads from.
//!
//! Each cell is a single `AtomicU32` holding a packed `0x00RRGGBB` value, so a
//! write replaces all three channels at once and a concurrent reader can never
//! observe a torn pixel. No lock is taken on either path. Ordering between
//! different cells is intentionally unspecified: a reader may see any mix of
//! stale and fresh cells, but every cell it sees is a value some writer stored.

use std::sync::atomic::{AtomicU32, Ordering};

/// A 24-bit RGB color. Pure value type, no alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Pixel {
    pub const BLACK: Pixel = Pixel { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packs the channels into the low 24 bits of a word.
    #[inline]
    pub const fn to_packed(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    #[inline]
    pub const fn from_packed(word: u32) -> Self {
        Self {
            r: (word >> 16) as u8,
            g: (word >> 8) as u8,
            b: word as u8,
        }
    }
}

/// A fixed-size `width × height` grid of pixels.
///
/// Bounds are fixed at construction. Out-of-range reads return black and
/// out-of-range writes are ignored; neither is an error because adversarial
/// coordinates are routine input.
#[derive(Debug)]
pub struct PixelGrid {
    width: u16,
    height: u16,
    cells: Box<[AtomicU32]>,
}

impl PixelGrid {
    /// Creates an all-black grid.
    pub fn new(width: u16, height: u16) -> Self {
        let len = width as usize * height as usize;
        let cells = (0..len).map(|_| AtomicU32::new(0)).collect();
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Returns true if `(x, y)` addresses a cell of this grid.
    #[inline]
    pub fn contains(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Reads one cell. Returns `Pixel::BLACK` for out-of-range coordinates.
    #[inline]
    pub fn get(&self, x: u16, y: u16) -> Pixel {
        if !self.contains(x, y) {
            return Pixel::BLACK;
        }
        Pixel::from_packed(self.cells[self.index(x, y)].load(Ordering::Relaxed))
    }

    /// Replaces one cell. Returns `false` (and changes nothing) when the
    /// coordinates are out of range.
    #[inline]
    pub fn set(&self, x: u16, y: u16, pixel: Pixel) -> bool {
        if !self.contains(x, y) {
            return false;
        }
        self.cells[self.index(x, y)].store(pixel.to_packed(), Ordering::Relaxed);
        true
    }
}
