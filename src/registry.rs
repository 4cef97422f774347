//! A registry of image decoders, and the PNG decoder's place in it.
//!
//! The registry is an ordinary value: create one, register decoders into it,
//! and then ask it for image info or to open images. When more than one
//! decoder could handle a source, the most recently registered one wins.

use alloc::{boxed::Box, vec::Vec};
use core::fmt::Debug;

use crate::{source::FileSystem, DecodeError, PngDecoder, PngDecoderConfig};

/// How the host should interpret a decoded pixel buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColorFormat {
  #[default]
  Unknown,
  /// Decoder specific data, without an alpha channel.
  Raw,
  /// Decoder specific data, with an alpha channel.
  RawAlpha,
  /// The host's native color format.
  TrueColor,
  /// The host's native color format, plus an alpha byte.
  TrueColorAlpha,
}

/// Basic facts about an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageHeader {
  pub width: u32,
  pub height: u32,
  pub color_format: ColorFormat,
}

/// An image that's already in memory, along with a header that describes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDescriptor<'a> {
  pub header: ImageHeader,
  pub data: &'a [u8],
}

/// Where an image comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSource<'a> {
  /// A path on the file system.
  File(&'a str),
  /// Bytes in memory.
  Variable(ImageDescriptor<'a>),
  /// A named symbol, such as a font glyph. No decoder here handles these.
  Symbol(&'a str),
}

/// Identifies one registration within a [`DecoderRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DecoderHandle(u32);

/// An image that a decoder has opened.
///
/// While `img_data` is `Some` the pixel buffer is owned by the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecoderDescriptor<'a> {
  pub src: ImageSource<'a>,
  pub header: ImageHeader,
  pub img_data: Option<Vec<u8>>,
  pub decoder: Option<DecoderHandle>,
}
impl<'a> DecoderDescriptor<'a> {
  /// A descriptor with no decoder and no data attached yet.
  #[inline]
  #[must_use]
  pub const fn new(src: ImageSource<'a>, header: ImageHeader) -> Self {
    Self { src, header, img_data: None, decoder: None }
  }
}

/// Something that can turn image sources into pixels.
pub trait ImageDecoder {
  /// Reports the header of the source, without decoding any pixels.
  ///
  /// An `Err` means this decoder doesn't handle the source.
  fn info(&self, src: &ImageSource<'_>) -> Result<ImageHeader, DecodeError>;

  /// Decodes `dsc.src` and attaches the pixels as `dsc.img_data`.
  ///
  /// On failure nothing is attached.
  fn open(&self, dsc: &mut DecoderDescriptor<'_>) -> Result<(), DecodeError>;

  /// Releases the pixel buffer of an opened descriptor.
  ///
  /// Calling this more than once is fine.
  fn close(&self, dsc: &mut DecoderDescriptor<'_>) {
    dsc.img_data = None;
  }
}

/// The set of decoders available to the host.
#[derive(Default)]
pub struct DecoderRegistry {
  decoders: Vec<(DecoderHandle, Box<dyn ImageDecoder>)>,
  next_id: u32,
}
impl Debug for DecoderRegistry {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_list().entries(self.decoders.iter().map(|(handle, _)| handle)).finish()
  }
}
impl DecoderRegistry {
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self { decoders: Vec::new(), next_id: 0 }
  }

  /// Adds a decoder, ahead of all the decoders already registered.
  pub fn register<D: ImageDecoder + 'static>(&mut self, decoder: D) -> DecoderHandle {
    let handle = DecoderHandle(self.next_id);
    self.next_id = self.next_id.wrapping_add(1);
    self.decoders.push((handle, Box::new(decoder)));
    handle
  }

  /// Removes a decoder, returning if it was registered.
  pub fn unregister(&mut self, handle: DecoderHandle) -> bool {
    let before = self.decoders.len();
    self.decoders.retain(|(h, _)| *h != handle);
    self.decoders.len() != before
  }

  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.decoders.len()
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.decoders.is_empty()
  }

  fn find(&self, handle: DecoderHandle) -> Option<&dyn ImageDecoder> {
    self.decoders.iter().find(|(h, _)| *h == handle).map(|(_, d)| &**d)
  }

  /// Newest first.
  fn candidates(&self) -> impl Iterator<Item = &(DecoderHandle, Box<dyn ImageDecoder>)> {
    self.decoders.iter().rev()
  }

  /// Gets the header of a source from the first decoder that accepts it.
  pub fn get_info(&self, src: &ImageSource<'_>) -> Result<ImageHeader, DecodeError> {
    for (handle, decoder) in self.candidates() {
      match decoder.info(src) {
        Ok(header) => return Ok(header),
        Err(e) => log::trace!("decoder {handle:?} declined: {e}"),
      }
    }
    log::warn!("no decoder accepted the image source");
    Err(DecodeError::NoDecoder)
  }

  /// Opens a source with the first decoder that both accepts it in `info` and
  /// then manages to open it.
  ///
  /// ## Failure
  /// * [`DecodeError::NoDecoder`] if no decoder accepts the source.
  /// * The last accepting decoder's error if none of them can open it.
  pub fn open<'a>(&self, src: ImageSource<'a>) -> Result<DecoderDescriptor<'a>, DecodeError> {
    let mut last_err = DecodeError::NoDecoder;
    for (handle, decoder) in self.candidates() {
      let header = match decoder.info(&src) {
        Ok(header) => header,
        Err(e) => {
          log::trace!("decoder {handle:?} declined: {e}");
          continue;
        }
      };
      let mut dsc = DecoderDescriptor::new(src, header);
      dsc.decoder = Some(*handle);
      match decoder.open(&mut dsc) {
        Ok(()) => return Ok(dsc),
        Err(e) => {
          log::warn!("decoder {handle:?} couldn't open the image: {e}");
          decoder.close(&mut dsc);
          last_err = e;
        }
      }
    }
    if last_err == DecodeError::NoDecoder {
      log::warn!("no decoder accepted the image source");
    }
    Err(last_err)
  }

  /// Releases an opened descriptor's pixel buffer.
  ///
  /// If the decoder that opened it has since been unregistered, the buffer is
  /// simply dropped.
  pub fn close(&self, dsc: &mut DecoderDescriptor<'_>) {
    match dsc.decoder.and_then(|handle| self.find(handle)) {
      Some(decoder) => decoder.close(dsc),
      None => dsc.img_data = None,
    }
  }
}

impl<FS: FileSystem> ImageDecoder for PngDecoder<FS> {
  fn info(&self, src: &ImageSource<'_>) -> Result<ImageHeader, DecodeError> {
    PngDecoder::info(self, src)
  }

  fn open(&self, dsc: &mut DecoderDescriptor<'_>) -> Result<(), DecodeError> {
    let image = self.decode(&dsc.src)?;
    if (image.width, image.height) != (dsc.header.width, dsc.header.height) {
      log::warn!(
        "opened a {}x{} image for a {}x{} header",
        image.width,
        image.height,
        dsc.header.width,
        dsc.header.height
      );
    }
    dsc.img_data = Some(image.data);
    Ok(())
  }

  fn close(&self, dsc: &mut DecoderDescriptor<'_>) {
    if dsc.img_data.take().is_some() {
      log::info!("PNG image buffer released");
    }
  }
}

/// Registers a PNG decoder that reads files through `fs` and decodes into the
/// config's [`ColorDepth`](crate::ColorDepth).
pub fn register_png_decoder<FS: FileSystem + 'static>(
  registry: &mut DecoderRegistry, fs: FS, config: PngDecoderConfig,
) -> DecoderHandle {
  log::info!("registering PNG decoder with {:?}", config.color_depth);
  registry.register(PngDecoder::new(fs, config))
}
