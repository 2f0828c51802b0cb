use crate::frames::FramesError;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, GenericImageView};

const JPEG_QUALITY: u8 = 90;

/// Layout hint for a storyboard image holding many frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridSpec {
    pub cols: u32,
    /// Inferred from square-ish tiles when absent.
    pub rows: Option<u32>,
    /// Keep only the first N tiles in row-major order.
    pub tile_limit: Option<usize>,
}

impl GridSpec {
    fn resolve(&self, width: u32, height: u32) -> Result<(u32, u32, u32), FramesError> {
        if self.cols == 0 {
            return Err(FramesError::InvalidGrid("cols must be > 0".to_owned()));
        }
        let tile_w = width / self.cols;
        if tile_w == 0 {
            return Err(FramesError::InvalidGrid(format!(
                "{} columns do not fit a {width}px wide image",
                self.cols
            )));
        }
        let rows = match self.rows {
            Some(r) if r > 0 => r,
            _ => (height / tile_w.max(1)).max(1),
        };
        let tile_h = height / rows;
        if tile_h == 0 {
            return Err(FramesError::InvalidGrid(format!(
                "{rows} rows do not fit a {height}px tall image"
            )));
        }
        Ok((rows, tile_w, tile_h))
    }
}

pub fn slice_tiles(sheet: &DynamicImage, grid: GridSpec) -> Result<Vec<DynamicImage>, FramesError> {
    let (width, height) = sheet.dimensions();
    let (rows, tile_w, tile_h) = grid.resolve(width, height)?;

    let limit = grid
        .tile_limit
        .filter(|&n| n > 0)
        .unwrap_or(usize::MAX);

    let tiles = (0..rows)
        .flat_map(|r| (0..grid.cols).map(move |c| (r, c)))
        .take(limit)
        .map(|(r, c)| sheet.crop_imm(c * tile_w, r * tile_h, tile_w, tile_h))
        .collect();
    Ok(tiles)
}

pub fn tile_name(idx: usize) -> String {
    format!("frame_{idx:02}.jpg")
}

pub fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, FramesError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY).encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ColorType::Rgb8,
    )?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn sheet(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 0])
        }))
    }

    #[test]
    fn infers_rows_from_square_tiles() {
        let grid = GridSpec {
            cols: 4,
            rows: None,
            tile_limit: None,
        };
        let tiles = slice_tiles(&sheet(400, 300), grid).unwrap();
        assert_eq!(tiles.len(), 12);
        assert!(tiles.iter().all(|t| t.dimensions() == (100, 100)));
    }

    #[test]
    fn explicit_rows_and_limit() {
        let grid = GridSpec {
            cols: 5,
            rows: Some(2),
            tile_limit: Some(7),
        };
        let tiles = slice_tiles(&sheet(500, 100), grid).unwrap();
        assert_eq!(tiles.len(), 7);
        assert_eq!(tiles[0].dimensions(), (100, 50));
        // row-major: the sixth tile starts the second row
        assert_eq!(tiles[5].get_pixel(0, 0).0[1], 50);
    }

    #[test]
    fn rejects_degenerate_grids() {
        let zero = GridSpec {
            cols: 0,
            rows: None,
            tile_limit: None,
        };
        assert!(matches!(
            slice_tiles(&sheet(10, 10), zero),
            Err(FramesError::InvalidGrid(_))
        ));
        let too_many = GridSpec {
            cols: 20,
            rows: None,
            tile_limit: None,
        };
        assert!(slice_tiles(&sheet(10, 10), too_many).is_err());
    }

    #[test]
    fn tiles_are_named_in_order_and_encode() {
        assert_eq!(tile_name(0), "frame_00.jpg");
        assert_eq!(tile_name(12), "frame_12.jpg");
        let jpeg = encode_jpeg(&sheet(16, 16)).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }
}
