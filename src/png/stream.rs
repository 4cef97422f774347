use super::*;

use alloc::{boxed::Box, vec::Vec};
use core::ops::ControlFlow;

use bitfrob::u8_replicate_bits;
use miniz_oxide::inflate::{
  core::{decompress, inflate_flags, DecompressorOxide},
  TINFLStatus,
};

// miniz_oxide LZ dictionary size; must be a power of two >= 32768
const DICT_SIZE: usize = 32_768;

/// Receives what a [`PngParser`] finds, while it's being fed.
///
/// All methods are called synchronously from within
/// [`feed`](PngParser::feed), and all default to doing nothing.
pub trait PngEvents {
  /// The `IHDR` was read, so the image dimensions are now known.
  ///
  /// This is called before any pixel is delivered, and before any buffer sized
  /// by the dimensions is allocated. Returning `Break` stops the parser right
  /// away: the `feed` call fails with [`PngError::Stopped`].
  fn on_header(&mut self, _width: u32, _height: u32) -> ControlFlow<()> {
    ControlFlow::Continue(())
  }

  /// A fully decoded pixel.
  ///
  /// `w` and `h` are the size of the area the pixel covers, which is always
  /// `1x1`. Pixels of non-interlaced images arrive in row-major order, top to
  /// bottom and left to right. Pixels of interlaced images arrive one reduced
  /// image at a time, but always with their full image position.
  fn on_pixel(&mut self, _x: u32, _y: u32, _w: u32, _h: u32, _rgba: RGBA8) {}

  /// The `IEND` was reached and every pixel was delivered.
  fn on_complete(&mut self) {}
}
impl PngEvents for () {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum StreamState {
  Signature,
  ChunkPrefix,
  ChunkData,
  ChunkCrc,
  End,
  Failed,
}

/// Transparency info from a `tRNS` chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Transparency {
  #[default]
  None,
  /// This full-precision gray value is transparent.
  Y(u16),
  /// This full-precision RGB value is transparent.
  RGB([u16; 3]),
  /// Alpha per palette index, missing entries are opaque.
  Alphas(Vec<u8>),
}

fn zeroed_vec(len: usize) -> Result<Vec<u8>, PngError> {
  let mut v = Vec::new();
  v.try_reserve_exact(len).map_err(|_| PngError::OutOfMemory)?;
  v.resize(len, 0);
  Ok(v)
}

/// Gets a sub-byte sample, high bits are the leftmost sample.
#[inline]
#[must_use]
fn packed_sample(line: &[u8], px: usize, bit_depth: u8) -> u8 {
  let depth = bit_depth as usize;
  let bit = px * depth;
  let shift = 8 - depth - (bit % 8);
  (line[bit / 8] >> shift) & (((1_u16 << depth) - 1) as u8)
}

#[inline]
#[must_use]
fn be16(line: &[u8], i: usize) -> u16 {
  u16::from_be_bytes([line[i], line[i + 1]])
}

/// Everything needed to turn stored samples into `RGBA8`.
struct ColorContext<'a> {
  ihdr: &'a IHDR,
  palette: &'a [RGB8],
  transparency: &'a Transparency,
}
impl ColorContext<'_> {
  /// The `px`th pixel of an unfiltered line (filter byte already removed).
  fn pixel(&self, line: &[u8], px: usize) -> RGBA8 {
    let depth = self.ihdr.bit_depth;
    match self.ihdr.color_type {
      PngColorType::Y => {
        let (y, full) = if depth == 16 {
          (line[px * 2], be16(line, px * 2))
        } else {
          let s = packed_sample(line, px, depth);
          (u8_replicate_bits(depth as u32, s), s as u16)
        };
        let a = match self.transparency {
          Transparency::Y(key) if *key == full => 0,
          _ => 255,
        };
        RGBA8 { r: y, g: y, b: y, a }
      }
      PngColorType::RGB => {
        let ([r, g, b], full) = if depth == 16 {
          let i = px * 6;
          ([line[i], line[i + 2], line[i + 4]], [be16(line, i), be16(line, i + 2), be16(line, i + 4)])
        } else {
          let i = px * 3;
          let rgb = [line[i], line[i + 1], line[i + 2]];
          (rgb, rgb.map(u16::from))
        };
        let a = match self.transparency {
          Transparency::RGB(key) if *key == full => 0,
          _ => 255,
        };
        RGBA8 { r, g, b, a }
      }
      PngColorType::Index => {
        let i = packed_sample(line, px, depth) as usize;
        let RGB8 { r, g, b } = self.palette.get(i).copied().unwrap_or_default();
        let a = match self.transparency {
          Transparency::Alphas(alphas) => alphas.get(i).copied().unwrap_or(255),
          _ => 255,
        };
        RGBA8 { r, g, b, a }
      }
      PngColorType::YA => {
        let [y, a] = if depth == 16 {
          [line[px * 4], line[px * 4 + 2]]
        } else {
          [line[px * 2], line[px * 2 + 1]]
        };
        RGBA8 { r: y, g: y, b: y, a }
      }
      PngColorType::RGBA => {
        let [r, g, b, a] = if depth == 16 {
          let i = px * 8;
          [line[i], line[i + 2], line[i + 4], line[i + 6]]
        } else {
          let i = px * 4;
          [line[i], line[i + 1], line[i + 2], line[i + 3]]
        };
        RGBA8 { r, g, b, a }
      }
    }
  }
}

/// Collects decompressed bytes into scanlines, and sends out the pixels of
/// each scanline once it's complete.
struct Scanlines {
  dims: [(u32, u32); 8],
  interlaced: bool,
  // 0 for the full image, 1 through 7 for interlaced reduced images
  level: usize,
  row: u32,
  line: Vec<u8>,
  prev: Vec<u8>,
  line_len: usize,
  line_pos: usize,
  done: bool,
}
impl Scanlines {
  fn new(ihdr: &IHDR) -> Result<Self, PngError> {
    let full_line = ihdr
      .bits_per_pixel()
      .checked_mul(ihdr.width as usize)
      .and_then(|bits| bits.checked_add(7))
      .map(|bits| 1 + bits / 8)
      .ok_or(PngError::OutOfMemory)?;
    let mut lines = Self {
      dims: reduced_image_dimensions(ihdr.width, ihdr.height),
      interlaced: ihdr.is_interlaced,
      level: if ihdr.is_interlaced { 1 } else { 0 },
      row: 0,
      line: zeroed_vec(full_line)?,
      prev: zeroed_vec(full_line)?,
      line_len: 0,
      line_pos: 0,
      done: false,
    };
    lines.start_level(ihdr);
    Ok(lines)
  }

  /// Moves to the first non-empty image level at or after the current one.
  fn start_level(&mut self, ihdr: &IHDR) {
    while self.level < self.dims.len() {
      let (width, height) = self.dims[self.level];
      if width > 0 && height > 0 {
        self.line_len = ihdr.bytes_per_filterline(width);
        self.line_pos = 0;
        self.row = 0;
        self.prev.fill(0);
        return;
      }
      // only interlaced images have empty levels.
      self.level += 1;
    }
    self.done = true;
  }

  fn write<E: PngEvents + ?Sized>(
    &mut self, mut bytes: &[u8], colors: &ColorContext<'_>, events: &mut E,
  ) -> Result<(), PngError> {
    // decompressed data past the last scanline is ignored.
    while !bytes.is_empty() && !self.done {
      let n = (self.line_len - self.line_pos).min(bytes.len());
      let (now, later) = bytes.split_at(n);
      self.line[self.line_pos..self.line_pos + n].copy_from_slice(now);
      self.line_pos += n;
      bytes = later;
      if self.line_pos == self.line_len {
        self.finish_line(colors, events)?;
      }
    }
    Ok(())
  }

  fn finish_line<E: PngEvents + ?Sized>(
    &mut self, colors: &ColorContext<'_>, events: &mut E,
  ) -> Result<(), PngError> {
    let line = &mut self.line[..self.line_len];
    let prev = &self.prev[..self.line_len];
    let filter = line[0];
    unfilter_line(filter, &mut line[1..], &prev[1..], colors.ihdr.filter_chunk_size())?;
    let (reduced_width, reduced_height) = self.dims[self.level];
    for reduced_x in 0..reduced_width {
      let rgba = colors.pixel(&line[1..], reduced_x as usize);
      let (x, y) = interlaced_pos_to_full_pos(self.level, reduced_x, self.row);
      events.on_pixel(x, y, 1, 1, rgba);
    }
    core::mem::swap(&mut self.line, &mut self.prev);
    self.line_pos = 0;
    self.row += 1;
    if self.row == reduced_height {
      if self.interlaced {
        self.level += 1;
        self.start_level(colors.ihdr);
      } else {
        self.done = true;
      }
    }
    Ok(())
  }
}

/// The zlib stream that runs across all `IDAT` chunks, plus the scanlines it
/// decompresses into.
struct ImageData {
  decomp: Box<DecompressorOxide>,
  // 32KB circular dictionary for wrapping-mode inflate
  dict: Vec<u8>,
  dict_pos: usize,
  zlib_done: bool,
  lines: Scanlines,
}
impl ImageData {
  fn new(ihdr: &IHDR) -> Result<Self, PngError> {
    Ok(Self {
      decomp: Box::default(),
      dict: zeroed_vec(DICT_SIZE)?,
      dict_pos: 0,
      zlib_done: false,
      lines: Scanlines::new(ihdr)?,
    })
  }

  fn inflate<E: PngEvents + ?Sized>(
    &mut self, mut input: &[u8], colors: &ColorContext<'_>, events: &mut E,
  ) -> Result<(), PngError> {
    // more IDAT can always follow, so we never tell the decompressor that the
    // input has ended.
    let flags =
      inflate_flags::TINFL_FLAG_PARSE_ZLIB_HEADER | inflate_flags::TINFL_FLAG_HAS_MORE_INPUT;
    while !self.zlib_done {
      let write_pos = self.dict_pos & (DICT_SIZE - 1);
      let (status, consumed, produced) =
        decompress(&mut *self.decomp, input, &mut self.dict, write_pos, flags);
      input = &input[consumed..];
      self.dict_pos = self.dict_pos.wrapping_add(produced);
      self.lines.write(&self.dict[write_pos..write_pos + produced], colors, events)?;

      match status {
        TINFLStatus::Done => self.zlib_done = true,
        TINFLStatus::NeedsMoreInput => {
          if input.is_empty() {
            break;
          }
          if consumed == 0 && produced == 0 {
            return Err(PngError::Decompression);
          }
        }
        TINFLStatus::HasMoreOutput => {
          // dictionary full; circular buffer recycles automatically
          if consumed == 0 && produced == 0 {
            return Err(PngError::Decompression);
          }
        }
        _ => return Err(PngError::Decompression),
      }
    }
    Ok(())
  }
}

/// A PNG parser that accepts its input a piece at a time.
///
/// See the [module docs](crate::png) for the overall design.
///
/// ```
/// # use pngflow::png::*;
/// # use pngflow::RGBA8;
/// struct Count(usize);
/// impl PngEvents for Count {
///   fn on_pixel(&mut self, _x: u32, _y: u32, _w: u32, _h: u32, _rgba: RGBA8) {
///     self.0 += 1;
///   }
/// }
/// let mut parser = PngParser::new();
/// let mut count = Count(0);
/// // not a PNG
/// assert!(parser.feed(b"GIF89a..", &mut count).is_err());
/// assert_eq!(count.0, 0);
/// ```
pub struct PngParser {
  state: StreamState,
  staging: [u8; 8],
  staged: usize,
  chunk: ChunkPrefix,
  chunk_left: u32,
  crc: Crc32,
  // data of the small chunks that get interpreted as a whole
  chunk_data: Vec<u8>,
  ihdr: Option<IHDR>,
  palette: Vec<RGB8>,
  transparency: Transparency,
  image_data: Option<ImageData>,
}
impl Debug for PngParser {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("PngParser")
      .field("state", &self.state)
      .field("chunk", &self.chunk)
      .field("chunk_left", &self.chunk_left)
      .field("ihdr", &self.ihdr)
      .field("palette_len", &self.palette.len())
      .field("transparency", &self.transparency)
      .field("image_data_started", &self.image_data.is_some())
      .finish()
  }
}
impl Default for PngParser {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}
impl PngParser {
  /// A parser that's expecting the start of a PNG data stream.
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self {
      state: StreamState::Signature,
      staging: [0; 8],
      staged: 0,
      chunk: ChunkPrefix { length: 0, type_: PngChunkType([0; 4]) },
      chunk_left: 0,
      crc: Crc32::new(),
      chunk_data: Vec::new(),
      ihdr: None,
      palette: Vec::new(),
      transparency: Transparency::None,
      image_data: None,
    }
  }

  /// The image header, once it's been parsed.
  #[inline]
  #[must_use]
  pub const fn header(&self) -> Option<IHDR> {
    self.ihdr
  }

  /// Image width, or 0 before the header is parsed.
  #[inline]
  #[must_use]
  pub fn width(&self) -> u32 {
    self.ihdr.map(|ihdr| ihdr.width).unwrap_or(0)
  }

  /// Image height, or 0 before the header is parsed.
  #[inline]
  #[must_use]
  pub fn height(&self) -> u32 {
    self.ihdr.map(|ihdr| ihdr.height).unwrap_or(0)
  }

  /// If `IEND` has been reached with all pixels delivered.
  #[inline]
  #[must_use]
  pub fn is_complete(&self) -> bool {
    self.state == StreamState::End
  }

  /// Feeds more of the PNG data stream to the parser.
  ///
  /// The `bytes` can be any length, and split at any point of the stream.
  /// Returns how many bytes were consumed, which is always all of them.
  ///
  /// ## Failure
  /// Any [`PngError`]. After an error the parser refuses all further input
  /// with [`PngError::Poisoned`].
  pub fn feed<E: PngEvents + ?Sized>(
    &mut self, bytes: &[u8], events: &mut E,
  ) -> Result<usize, PngError> {
    if self.state == StreamState::Failed {
      return Err(PngError::Poisoned);
    }
    match self.feed_inner(bytes, events) {
      Ok(()) => Ok(bytes.len()),
      Err(e) => {
        self.state = StreamState::Failed;
        Err(e)
      }
    }
  }

  fn feed_inner<E: PngEvents + ?Sized>(
    &mut self, mut bytes: &[u8], events: &mut E,
  ) -> Result<(), PngError> {
    while !bytes.is_empty() {
      match self.state {
        StreamState::Signature => {
          if self.stage(&mut bytes, 8) {
            self.staged = 0;
            if self.staging != PNG_SIGNATURE {
              return Err(PngError::BadSignature);
            }
            self.state = StreamState::ChunkPrefix;
          }
        }
        StreamState::ChunkPrefix => {
          if self.stage(&mut bytes, 8) {
            self.staged = 0;
            self.begin_chunk(ChunkPrefix::from_bytes(self.staging))?;
          }
        }
        StreamState::ChunkData => {
          let n = bytes.len().min(self.chunk_left as usize);
          let (data, rest) = bytes.split_at(n);
          bytes = rest;
          self.chunk_left -= n as u32;
          self.crc.update(data);
          self.chunk_data_part(data, events)?;
          if self.chunk_left == 0 {
            self.state = StreamState::ChunkCrc;
          }
        }
        StreamState::ChunkCrc => {
          if self.stage(&mut bytes, 4) {
            self.staged = 0;
            let [c0, c1, c2, c3, ..] = self.staging;
            if u32::from_be_bytes([c0, c1, c2, c3]) != self.crc.finish() {
              return Err(PngError::CrcMismatch(self.chunk.type_));
            }
            self.end_chunk(events)?;
          }
        }
        StreamState::End => break,
        StreamState::Failed => return Err(PngError::Poisoned),
      }
    }
    Ok(())
  }

  /// Moves bytes into the staging buffer until it holds `want` bytes.
  fn stage(&mut self, bytes: &mut &[u8], want: usize) -> bool {
    let n = (want - self.staged).min(bytes.len());
    self.staging[self.staged..self.staged + n].copy_from_slice(&bytes[..n]);
    self.staged += n;
    *bytes = &bytes[n..];
    self.staged == want
  }

  fn begin_chunk(&mut self, prefix: ChunkPrefix) -> Result<(), PngError> {
    if !prefix.is_length_legal() {
      return Err(PngError::ChunkTooLong(prefix.length));
    }
    log::trace!("chunk {:?}: {} bytes", prefix.type_, prefix.length);
    match prefix.type_ {
      PngChunkType::IHDR => {
        if self.ihdr.is_some() {
          return Err(PngError::DuplicateIHDR);
        }
        if prefix.length != 13 {
          return Err(PngError::IllegalIHDR);
        }
      }
      _ if self.ihdr.is_none() => return Err(PngError::FirstChunkNotIHDR),
      PngChunkType::PLTE => {
        if prefix.length % 3 != 0 || prefix.length > 256 * 3 || self.image_data.is_some() {
          return Err(PngError::IllegalPalette);
        }
      }
      PngChunkType::tRNS => {
        if prefix.length > 256 {
          return Err(PngError::IllegalTransparency);
        }
      }
      PngChunkType::IDAT => {
        if self.image_data.is_none() {
          self.start_image_data()?;
        }
      }
      _ => (),
    }
    self.chunk = prefix;
    self.chunk_left = prefix.length;
    self.crc = Crc32::new();
    self.crc.update(&prefix.type_.0);
    self.chunk_data.clear();
    self.state =
      if prefix.length == 0 { StreamState::ChunkCrc } else { StreamState::ChunkData };
    Ok(())
  }

  fn start_image_data(&mut self) -> Result<(), PngError> {
    let ihdr = self.ihdr.ok_or(PngError::FirstChunkNotIHDR)?;
    if ihdr.color_type == PngColorType::Index && self.palette.is_empty() {
      return Err(PngError::MissingPalette);
    }
    self.image_data = Some(ImageData::new(&ihdr)?);
    Ok(())
  }

  fn chunk_data_part<E: PngEvents + ?Sized>(
    &mut self, data: &[u8], events: &mut E,
  ) -> Result<(), PngError> {
    match self.chunk.type_ {
      PngChunkType::IHDR | PngChunkType::PLTE | PngChunkType::tRNS => {
        // these were size checked in `begin_chunk`
        self.chunk_data.extend_from_slice(data);
      }
      PngChunkType::IDAT => {
        let Self { ihdr, palette, transparency, image_data, .. } = self;
        if let (Some(ihdr), Some(image_data)) = (ihdr.as_ref(), image_data.as_mut()) {
          let colors = ColorContext { ihdr, palette, transparency };
          image_data.inflate(data, &colors, events)?;
        }
      }
      _ => (),
    }
    Ok(())
  }

  fn end_chunk<E: PngEvents + ?Sized>(&mut self, events: &mut E) -> Result<(), PngError> {
    self.state = StreamState::ChunkPrefix;
    match self.chunk.type_ {
      PngChunkType::IHDR => {
        let ihdr = IHDR::try_from(self.chunk_data.as_slice())?;
        log::trace!("{ihdr:?}");
        self.ihdr = Some(ihdr);
        if events.on_header(ihdr.width, ihdr.height).is_break() {
          log::trace!("stopped after the header");
          return Err(PngError::Stopped);
        }
      }
      PngChunkType::PLTE => {
        let entries: &[RGB8] =
          bytemuck::try_cast_slice(&self.chunk_data).map_err(|_| PngError::IllegalPalette)?;
        if entries.is_empty() {
          return Err(PngError::IllegalPalette);
        }
        self.palette.clear();
        self.palette.extend_from_slice(entries);
      }
      PngChunkType::tRNS => {
        self.transparency = self.parse_transparency()?;
      }
      PngChunkType::IEND => {
        let all_rows = self.image_data.as_ref().map(|data| data.lines.done).unwrap_or(false);
        if !all_rows {
          return Err(PngError::MissingImageData);
        }
        self.state = StreamState::End;
        events.on_complete();
      }
      _ => (),
    }
    Ok(())
  }

  fn parse_transparency(&self) -> Result<Transparency, PngError> {
    let color_type = self.ihdr.map(|ihdr| ihdr.color_type).ok_or(PngError::FirstChunkNotIHDR)?;
    Ok(match (color_type, self.chunk_data.as_slice()) {
      (PngColorType::Y, [y0, y1]) => Transparency::Y(u16::from_be_bytes([*y0, *y1])),
      (PngColorType::RGB, [r0, r1, g0, g1, b0, b1]) => Transparency::RGB([
        u16::from_be_bytes([*r0, *r1]),
        u16::from_be_bytes([*g0, *g1]),
        u16::from_be_bytes([*b0, *b1]),
      ]),
      (PngColorType::Index, alphas) if alphas.len() <= self.palette.len() => {
        Transparency::Alphas(alphas.to_vec())
      }
      (PngColorType::YA | PngColorType::RGBA, _) => {
        log::warn!("ignoring tRNS in an image that already has alpha");
        Transparency::None
      }
      _ => return Err(PngError::IllegalTransparency),
    })
  }
}
