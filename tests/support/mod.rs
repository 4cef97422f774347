#![allow(dead_code)]

//! Builds small PNG files for the tests.

use std::io::Cursor;

use miniz_oxide::deflate::compress_to_vec_zlib;
use pngflow::{png::*, DecodeError, FileSystem};

/// Adam7 passes as `(x0, y0, dx, dy)`.
pub const ADAM7: [(u32, u32, u32, u32); 7] = [
  (0, 0, 8, 8),
  (4, 0, 8, 8),
  (0, 4, 4, 8),
  (2, 0, 4, 4),
  (0, 2, 2, 4),
  (1, 0, 2, 2),
  (0, 1, 1, 2),
];

pub fn write_chunk(out: &mut Vec<u8>, ty: &[u8; 4], data: &[u8]) {
  out.extend_from_slice(&(data.len() as u32).to_be_bytes());
  out.extend_from_slice(ty);
  out.extend_from_slice(data);
  let crc = png_crc(ty.iter().copied().chain(data.iter().copied()));
  out.extend_from_slice(&crc.to_be_bytes());
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
  let p = a as i32 + b as i32 - c as i32;
  let pa = (p - a as i32).abs();
  let pb = (p - b as i32).abs();
  let pc = (p - c as i32).abs();
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

/// Filters one line, and puts it after its filter byte.
pub fn filter_line(out: &mut Vec<u8>, filter: u8, line: &[u8], prev: &[u8], bpp: usize) {
  out.push(filter);
  for i in 0..line.len() {
    let a = if i >= bpp { line[i - bpp] } else { 0 };
    let b = prev[i];
    let c = if i >= bpp { prev[i - bpp] } else { 0 };
    let predicted = match filter {
      0 => 0,
      1 => a,
      2 => b,
      3 => ((a as u16 + b as u16) / 2) as u8,
      4 => paeth(a, b, c),
      _ => 0,
    };
    out.push(line[i].wrapping_sub(predicted));
  }
}

fn channels(color_type: u8) -> usize {
  match color_type {
    2 => 3,
    4 => 2,
    6 => 4,
    _ => 1,
  }
}

/// The settings for a PNG to build.
///
/// Rows are given as full image rows of packed sample bytes, without filter
/// bytes.
#[derive(Debug, Clone)]
pub struct PngBuilder {
  pub width: u32,
  pub height: u32,
  pub bit_depth: u8,
  pub color_type: u8,
  pub interlaced: bool,
  pub palette: Option<Vec<u8>>,
  pub transparency: Option<Vec<u8>>,
  /// Used in turn, one per scanline.
  pub filters: Vec<u8>,
  /// Largest `IDAT` data length.
  pub idat_size: usize,
  /// Extra chunks written just after `IHDR`.
  pub extra_chunks: Vec<([u8; 4], Vec<u8>)>,
}
impl PngBuilder {
  pub fn new(width: u32, height: u32, bit_depth: u8, color_type: u8) -> Self {
    Self {
      width,
      height,
      bit_depth,
      color_type,
      interlaced: false,
      palette: None,
      transparency: None,
      filters: vec![0],
      idat_size: 8192,
      extra_chunks: Vec::new(),
    }
  }

  pub fn rgba8(width: u32, height: u32) -> Self {
    Self::new(width, height, 8, 6)
  }

  pub fn bits_per_pixel(&self) -> usize {
    self.bit_depth as usize * channels(self.color_type)
  }

  pub fn ihdr(&self) -> [u8; 13] {
    let mut data = [0; 13];
    data[0..4].copy_from_slice(&self.width.to_be_bytes());
    data[4..8].copy_from_slice(&self.height.to_be_bytes());
    data[8] = self.bit_depth;
    data[9] = self.color_type;
    data[12] = self.interlaced as u8;
    data
  }

  /// The raw scanline data, filtered but not yet compressed.
  pub fn filtered(&self, rows: &[Vec<u8>]) -> Vec<u8> {
    let bits = self.bits_per_pixel();
    let bpp = (bits / 8).max(1);
    let mut out = Vec::new();
    let mut line_count = 0;
    let mut filter_rows = |out: &mut Vec<u8>, rows: &[Vec<u8>]| {
      let mut prev = vec![0; rows.first().map(Vec::len).unwrap_or(0)];
      for row in rows {
        let filter = self.filters[line_count % self.filters.len()];
        line_count += 1;
        filter_line(out, filter, row, &prev, bpp);
        prev.clone_from(row);
      }
    };
    if self.interlaced {
      assert!(bits % 8 == 0, "the test builder only interlaces whole byte pixels");
      for (x0, y0, dx, dy) in ADAM7 {
        let mut reduced = Vec::new();
        for y in (y0..self.height).step_by(dy as usize) {
          let mut line = Vec::new();
          for x in (x0..self.width).step_by(dx as usize) {
            let i = x as usize * bpp;
            line.extend_from_slice(&rows[y as usize][i..i + bpp]);
          }
          if !line.is_empty() {
            reduced.push(line);
          }
        }
        filter_rows(&mut out, &reduced);
      }
    } else {
      filter_rows(&mut out, rows);
    }
    out
  }

  pub fn build_from_filtered(&self, filtered: &[u8]) -> Vec<u8> {
    let zlib = compress_to_vec_zlib(filtered, 6);
    let mut out = PNG_SIGNATURE.to_vec();
    write_chunk(&mut out, b"IHDR", &self.ihdr());
    for (ty, data) in &self.extra_chunks {
      write_chunk(&mut out, ty, data);
    }
    if let Some(palette) = &self.palette {
      write_chunk(&mut out, b"PLTE", palette);
    }
    if let Some(transparency) = &self.transparency {
      write_chunk(&mut out, b"tRNS", transparency);
    }
    for part in zlib.chunks(self.idat_size) {
      write_chunk(&mut out, b"IDAT", part);
    }
    write_chunk(&mut out, b"IEND", &[]);
    out
  }

  pub fn build(&self, rows: &[Vec<u8>]) -> Vec<u8> {
    self.build_from_filtered(&self.filtered(rows))
  }
}

/// Rows of RGBA8 pixels made by a function of the position.
pub fn rgba_rows(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> Vec<Vec<u8>> {
  (0..height).map(|y| (0..width).flat_map(|x| f(x, y)).collect()).collect()
}

/// A different color for every pixel of images up to 256x256.
pub fn distinct_rgba(x: u32, y: u32) -> [u8; 4] {
  [x as u8, y as u8, (x as u8) ^ (y as u8).wrapping_mul(3), 255 - (x as u8)]
}

/// A PNG of RGBA8 pixels.
pub fn rgba_png(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> Vec<u8> {
  PngBuilder::rgba8(width, height).build(&rgba_rows(width, height, f))
}

/// Files held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemFs(pub Vec<(String, Vec<u8>)>);
impl MemFs {
  pub fn with(path: &str, bytes: Vec<u8>) -> Self {
    Self(vec![(path.to_string(), bytes)])
  }
}
impl FileSystem for MemFs {
  type File = Cursor<Vec<u8>>;
  fn open(&self, path: &str) -> Result<Self::File, DecodeError> {
    self
      .0
      .iter()
      .find(|(p, _)| p == path)
      .map(|(_, bytes)| Cursor::new(bytes.clone()))
      .ok_or(DecodeError::FileOpen)
  }
}
