use std::iter::repeat;

use anyhow::{bail, Result};

/// A single-channel (coverage) image living on the CPU.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    pub fn new(width: u32, height: u32) -> Self {
        let data = repeat(0).take((width * height) as usize).collect();
        Self {
            data,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get((y * self.width + x) as usize).copied()
    }

    /// Copies a `w * h` row-major image into this one with its top-left corner at `(x, y)`.
    pub fn blit(&mut self, x: u32, y: u32, w: u32, h: u32, src: &[u8]) -> Result<()> {
        if src.len() != (w * h) as usize {
            bail!(
                "Source image is {} bytes but {}x{} needs {}",
                src.len(),
                w,
                h,
                w * h
            );
        }
        if x + w > self.width || y + h > self.height {
            bail!(
                "{}x{} image at ({}, {}) doesn't fit in {}x{} texture",
                w,
                h,
                x,
                y,
                self.width,
                self.height
            );
        }
        if w == 0 {
            return Ok(());
        }

        for (row, src_row) in src.chunks_exact(w as usize).enumerate() {
            let offset = ((y + row as u32) * self.width + x) as usize;
            self.data[offset..offset + w as usize].copy_from_slice(src_row);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_texture_is_cleared() {
        let texture = Texture::new(4, 3);
        assert_eq!(texture.data.len(), 12);
        assert!(texture.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_blit_places_rows_at_offset() {
        let mut texture = Texture::new(5, 4);
        texture.blit(2, 1, 2, 2, &[1, 2, 3, 4]).unwrap();

        assert_eq!(texture.texel(2, 1), Some(1));
        assert_eq!(texture.texel(3, 1), Some(2));
        assert_eq!(texture.texel(2, 2), Some(3));
        assert_eq!(texture.texel(3, 2), Some(4));
        assert_eq!(texture.texel(1, 1), Some(0));
        assert_eq!(texture.texel(4, 2), Some(0));
        assert_eq!(texture.data.iter().filter(|&&b| b != 0).count(), 4);
    }

    #[test]
    fn test_blit_out_of_bounds_fails() {
        let mut texture = Texture::new(4, 4);
        assert!(texture.blit(3, 0, 2, 1, &[1, 1]).is_err());
        assert!(texture.blit(0, 0, 2, 2, &[1, 1]).is_err());
    }
}
