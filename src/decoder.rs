//! The streaming decode and pixel conversion pipeline.
//!
//! Bytes move from a [`ByteSource`] into a [`PngParser`] one chunk at a time,
//! using only a small staging buffer. The parser reports to a
//! [`DecodeSession`], which owns the output buffer and converts every
//! delivered pixel into the configured [`ColorDepth`] as it arrives.

use alloc::vec::Vec;
use core::ops::ControlFlow;

use crate::{
  png::{is_png_header_correct, ChunkPrefix, PngEvents, PngParser},
  registry::{ColorFormat, ImageHeader, ImageSource},
  source::{ByteSource, FileSystem},
  ColorDepth, DecodeError, RGBA8,
};

/// The most bytes handed to the parser in a single feed.
pub const FEED_LEN: usize = 1024;

/// Settings for a [`PngDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PngDecoderConfig {
  /// The encoding of decoded pixel buffers.
  pub color_depth: ColorDepth,
  /// Images wider or taller than this fail with
  /// [`DecodeError::DimensionsTooLarge`] before any pixel buffer is allocated.
  pub max_dimension: u32,
}
impl Default for PngDecoderConfig {
  #[inline]
  fn default() -> Self {
    Self { color_depth: ColorDepth::Bits32, max_dimension: 17_000 }
  }
}

/// The width and height of a PNG, as read from its header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageInfo {
  pub width: u32,
  pub height: u32,
}

/// A fully decoded image in one of the target encodings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DecodedImage {
  pub width: u32,
  pub height: u32,
  pub color_depth: ColorDepth,
  /// `width * height` pixels in row-major order, each
  /// [`bytes_per_pixel`](ColorDepth::bytes_per_pixel) bytes.
  pub data: Vec<u8>,
}
impl DecodedImage {
  /// The encoded bytes of the pixel at the position, or `None` if the position
  /// is out of bounds.
  #[inline]
  #[must_use]
  pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
    if x < self.width && y < self.height {
      let bpp = self.color_depth.bytes_per_pixel();
      let i = (y as usize * self.width as usize + x as usize) * bpp;
      self.data.get(i..i + bpp)
    } else {
      None
    }
  }
}

/// The state of a single info query or decode.
///
/// The session is the parser's [`PngEvents`] target. When collecting pixels it
/// allocates the output buffer as soon as the header arrives, so the buffer
/// exists before the first pixel can be delivered.
#[derive(Debug)]
pub struct DecodeSession {
  config: PngDecoderConfig,
  collect_pixels: bool,
  header: Option<ImageInfo>,
  data_ready: bool,
  output: Vec<u8>,
  pixels_written: usize,
  failure: Option<DecodeError>,
}
impl DecodeSession {
  /// A session that only wants the header.
  #[inline]
  #[must_use]
  pub const fn for_info() -> Self {
    Self {
      config: PngDecoderConfig { color_depth: ColorDepth::Bits32, max_dimension: u32::MAX },
      collect_pixels: false,
      header: None,
      data_ready: false,
      output: Vec::new(),
      pixels_written: 0,
      failure: None,
    }
  }

  /// A session that collects every pixel into an output buffer.
  #[inline]
  #[must_use]
  pub const fn for_decode(config: PngDecoderConfig) -> Self {
    Self {
      config,
      collect_pixels: true,
      header: None,
      data_ready: false,
      output: Vec::new(),
      pixels_written: 0,
      failure: None,
    }
  }

  /// The image dimensions, once the header has been parsed.
  #[inline]
  #[must_use]
  pub const fn header(&self) -> Option<ImageInfo> {
    self.header
  }

  #[inline]
  #[must_use]
  pub const fn is_header_ready(&self) -> bool {
    self.header.is_some()
  }

  /// If every pixel has been delivered and the buffer is complete.
  #[inline]
  #[must_use]
  pub const fn is_data_ready(&self) -> bool {
    self.data_ready
  }

  /// Takes any failure that happened inside an event callback.
  #[inline]
  pub fn take_failure(&mut self) -> Option<DecodeError> {
    self.failure.take()
  }

  /// Converts the session into its finished image.
  ///
  /// ## Failure
  /// * [`DecodeError::UnexpectedEof`] if the data isn't ready yet.
  pub fn into_image(self) -> Result<DecodedImage, DecodeError> {
    match (self.data_ready, self.header) {
      (true, Some(ImageInfo { width, height })) => {
        Ok(DecodedImage { width, height, color_depth: self.config.color_depth, data: self.output })
      }
      _ => Err(DecodeError::UnexpectedEof),
    }
  }

  fn allocate(&mut self, width: u32, height: u32) -> Result<(), DecodeError> {
    if width > self.config.max_dimension || height > self.config.max_dimension {
      log::error!(
        "image size {width}x{height} exceeds the limit of {}",
        self.config.max_dimension
      );
      return Err(DecodeError::DimensionsTooLarge);
    }
    let len = (width as usize)
      .checked_mul(height as usize)
      .and_then(|px| px.checked_mul(self.config.color_depth.bytes_per_pixel()))
      .ok_or(DecodeError::CheckedMath)?;
    log::info!("allocating memory for image: {len} bytes");
    let mut output = Vec::new();
    output.try_reserve_exact(len)?;
    output.resize(len, 0);
    self.output = output;
    Ok(())
  }
}
impl PngEvents for DecodeSession {
  fn on_header(&mut self, width: u32, height: u32) -> ControlFlow<()> {
    log::info!("PNG image header read successfully. Size: {width} x {height}");
    self.header = Some(ImageInfo { width, height });
    if self.collect_pixels {
      if let Err(e) = self.allocate(width, height) {
        self.failure = Some(e);
        return ControlFlow::Break(());
      }
    }
    ControlFlow::Continue(())
  }

  fn on_pixel(&mut self, x: u32, y: u32, _w: u32, _h: u32, rgba: RGBA8) {
    log::trace!(
      "received pixel ({x},{y}) with rgba color (0x{:02x},0x{:02x},0x{:02x},0x{:02x})",
      rgba.r,
      rgba.g,
      rgba.b,
      rgba.a
    );
    if self.data_ready {
      return;
    }
    let width = match self.header {
      Some(info) => info.width as usize,
      None => return,
    };
    let bpp = self.config.color_depth.bytes_per_pixel();
    let start = (y as usize * width + x as usize) * bpp;
    // with no buffer (info only, or a failed allocation) this is just skipped.
    if let Some(out) = self.output.get_mut(start..start + bpp) {
      self.config.color_depth.encode_into(rgba, out);
      self.pixels_written += 1;
    }
  }

  fn on_complete(&mut self) {
    log::info!("PNG image read successfully.");
    let pixel_count = self.output.len() / self.config.color_depth.bytes_per_pixel();
    if self.collect_pixels && self.pixels_written != pixel_count {
      log::error!("PNG image ended with {} pixels written", self.pixels_written);
      self.failure = Some(DecodeError::UnexpectedEof);
      return;
    }
    self.data_ready = true;
  }
}

/// Feeds `bytes` to the parser in one go, then checks the session for
/// failures that happened during the feed.
///
/// A session failure wins over the parser's own error, since the session is
/// what stopped the parser.
fn feed_parser(
  parser: &mut PngParser, bytes: &[u8], session: &mut DecodeSession,
) -> Result<(), DecodeError> {
  let fed = parser.feed(bytes, session);
  if let Some(e) = session.take_failure() {
    return Err(e);
  }
  fed?;
  Ok(())
}

/// Reads the 8 byte signature and feeds it to the parser.
fn feed_signature<S: ByteSource + ?Sized>(
  parser: &mut PngParser, src: &mut S, session: &mut DecodeSession,
) -> Result<(), DecodeError> {
  log::info!("reading file signature...");
  let mut signature = [0_u8; 8];
  src.read_exact(&mut signature)?;
  feed_parser(parser, &signature, session).map_err(|e| {
    log::error!("error reading PNG header: couldn't parse file signature.");
    e
  })
}

/// Reads one whole chunk from the source and feeds it to the parser.
///
/// The 8 byte length and type prefix is fed first, then the data and CRC are
/// fed in pieces of at most [`FEED_LEN`] bytes.
pub fn feed_next_chunk<S: ByteSource + ?Sized>(
  parser: &mut PngParser, src: &mut S, session: &mut DecodeSession,
) -> Result<(), DecodeError> {
  let mut prefix_bytes = [0_u8; 8];
  src.read_exact(&mut prefix_bytes)?;
  let prefix = ChunkPrefix::from_bytes(prefix_bytes);
  if !prefix.is_length_legal() {
    log::error!("error reading PNG image: illegal chunk length {}.", prefix.length);
    return Err(DecodeError::ChunkLength(prefix.length));
  }
  feed_parser(parser, &prefix_bytes, session).map_err(|e| {
    log::error!("error reading PNG image: couldn't parse chunk header.");
    e
  })?;
  log::trace!("PNG chunk {:?}, size: {}", prefix.type_, prefix.length);
  let mut buf = [0_u8; FEED_LEN];
  let mut remaining = prefix.remaining_len();
  while remaining > 0 {
    let n = remaining.min(FEED_LEN as u64) as usize;
    src.read_exact(&mut buf[..n])?;
    remaining -= n as u64;
    feed_parser(parser, &buf[..n], session).map_err(|e| {
      log::error!("error reading PNG image: couldn't parse chunk data.");
      e
    })?;
  }
  Ok(())
}

/// Header phase: signature, then whole chunks until the header is ready.
fn feed_header<S: ByteSource + ?Sized>(
  parser: &mut PngParser, src: &mut S, session: &mut DecodeSession,
) -> Result<(), DecodeError> {
  log::info!("reading PNG image header...");
  feed_signature(parser, src, session)?;
  while !session.is_header_ready() {
    feed_next_chunk(parser, src, session)?;
  }
  Ok(())
}

/// Data phase: whole chunks until every pixel has been delivered.
fn feed_data<S: ByteSource + ?Sized>(
  parser: &mut PngParser, src: &mut S, session: &mut DecodeSession,
) -> Result<(), DecodeError> {
  log::info!("reading PNG image data...");
  while !session.is_data_ready() {
    feed_next_chunk(parser, src, session)?;
  }
  Ok(())
}

/// Reads only as far as the PNG header, and reports the image size.
///
/// No pixel buffer is allocated.
pub fn read_png_header<S: ByteSource + ?Sized>(src: &mut S) -> Result<ImageInfo, DecodeError> {
  let mut parser = PngParser::new();
  let mut session = DecodeSession::for_info();
  feed_header(&mut parser, src, &mut session)?;
  Ok(ImageInfo { width: parser.width(), height: parser.height() })
}

/// Decodes a PNG that's read chunk by chunk from `src`.
///
/// ## Failure
/// Any failure at all. The partially filled output buffer is freed before this
/// returns.
pub fn decode_png_stream<S: ByteSource + ?Sized>(
  src: &mut S, config: PngDecoderConfig,
) -> Result<DecodedImage, DecodeError> {
  let mut parser = PngParser::new();
  let mut session = DecodeSession::for_decode(config);
  feed_header(&mut parser, src, &mut session).map_err(|e| {
    log::error!("reading PNG header failed.");
    e
  })?;
  feed_data(&mut parser, src, &mut session).map_err(|e| {
    log::error!("reading PNG data failed.");
    e
  })?;
  session.into_image()
}

/// Decodes a PNG that's entirely in memory.
///
/// The bytes are fed to the parser in slices of at most [`FEED_LEN`] bytes.
///
/// ## Failure
/// Any failure at all, including the bytes running out before the image is
/// complete.
pub fn decode_png_bytes(
  bytes: &[u8], config: PngDecoderConfig,
) -> Result<DecodedImage, DecodeError> {
  let mut parser = PngParser::new();
  let mut session = DecodeSession::for_decode(config);
  let mut slices = bytes.chunks(FEED_LEN);
  while !session.is_data_ready() {
    let slice = slices.next().ok_or_else(|| {
      log::error!("PNG data ended before the image was complete.");
      DecodeError::UnexpectedEof
    })?;
    feed_parser(&mut parser, slice, &mut session).map_err(|e| {
      log::error!("PNG parser returned an error: {e}");
      e
    })?;
  }
  session.into_image()
}

/// If a file path should be handled as a PNG.
///
/// This is a case-sensitive match on the last three characters only.
#[inline]
#[must_use]
pub fn has_png_extension(path: &str) -> bool {
  path.ends_with("png")
}

/// The PNG decoder: answers info and decode requests for image sources.
#[derive(Debug, Clone, Default)]
pub struct PngDecoder<FS> {
  fs: FS,
  config: PngDecoderConfig,
}
impl<FS: FileSystem> PngDecoder<FS> {
  #[inline]
  #[must_use]
  pub const fn new(fs: FS, config: PngDecoderConfig) -> Self {
    Self { fs, config }
  }

  #[inline]
  #[must_use]
  pub const fn config(&self) -> &PngDecoderConfig {
    &self.config
  }

  /// Gets the image header of a source, without decoding pixels.
  ///
  /// * File sources are read just far enough to find the PNG header.
  /// * In-memory sources are only checked for the PNG signature, and then the
  ///   descriptor's own header is reported.
  pub fn info(&self, src: &ImageSource<'_>) -> Result<ImageHeader, DecodeError> {
    match src {
      ImageSource::File(path) => {
        if !has_png_extension(path) {
          return Err(DecodeError::ExtensionMismatch);
        }
        log::info!("reading PNG image info from file: {path}");
        let mut file = self.fs.open(path)?;
        let info = read_png_header(&mut file).map_err(|e| {
          log::error!("couldn't access header from: {path}");
          e
        })?;
        Ok(ImageHeader {
          width: info.width,
          height: info.height,
          color_format: ColorFormat::RawAlpha,
        })
      }
      ImageSource::Variable(dsc) => {
        log::info!("reading PNG image info from buffer...");
        if !is_png_header_correct(dsc.data) {
          return Err(DecodeError::SignatureMismatch);
        }
        Ok(dsc.header)
      }
      ImageSource::Symbol(_) => Err(DecodeError::UnsupportedSource),
    }
  }

  /// Fully decodes a source into the configured [`ColorDepth`].
  pub fn decode(&self, src: &ImageSource<'_>) -> Result<DecodedImage, DecodeError> {
    let result = match src {
      ImageSource::File(path) => {
        if !has_png_extension(path) {
          return Err(DecodeError::ExtensionMismatch);
        }
        log::info!("reading PNG image data from file: {path}");
        let mut file = self.fs.open(path)?;
        decode_png_stream(&mut file, self.config)
      }
      ImageSource::Variable(dsc) => {
        log::info!("reading PNG image data from buffer...");
        if !is_png_header_correct(dsc.data) {
          return Err(DecodeError::SignatureMismatch);
        }
        let image = decode_png_bytes(dsc.data, self.config)?;
        if (image.width, image.height) != (dsc.header.width, dsc.header.height) {
          log::warn!(
            "descriptor says {}x{} but the PNG is {}x{}",
            dsc.header.width,
            dsc.header.height,
            image.width,
            image.height
          );
        }
        Ok(image)
      }
      ImageSource::Symbol(_) => return Err(DecodeError::UnsupportedSource),
    };
    match &result {
      Ok(_) => log::info!("PNG decoding succeeded."),
      Err(e) => log::error!("PNG decoding failed: {e}"),
    }
    result
  }
}
