#![no_std]
#![cfg_attr(docs_rs, feature(doc_cfg))]

//! A crate for streaming PNG decoding into display pixel formats.
//!
//! PNG data is pulled from a file or memory one chunk at a time and pushed into
//! a streaming [`png::PngParser`]. Every pixel the parser delivers is converted
//! right away into the selected [`ColorDepth`] and stored in the output buffer.
//!
//! The decoder plugs into a [`DecoderRegistry`], which answers image info
//! queries and opens images using whichever registered decoder accepts them:
//!
//! ```no_run
//! # use pngflow::*;
//! let mut registry = DecoderRegistry::new();
//! let config = PngDecoderConfig { color_depth: ColorDepth::Bits16, ..Default::default() };
//! register_png_decoder(&mut registry, StdFileSystem, config);
//! let src = ImageSource::File("logo.png");
//! let header = registry.get_info(&src).unwrap();
//! let mut dsc = registry.open(src).unwrap();
//! assert_eq!(
//!   dsc.img_data.as_ref().unwrap().len(),
//!   (header.width * header.height * 3) as usize
//! );
//! registry.close(&mut dsc);
//! ```

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

pub mod pixel_formats;
pub use pixel_formats::*;

pub mod png;

mod error;
pub use error::*;

mod source;
pub use source::*;

mod decoder;
pub use decoder::*;

mod registry;
pub use registry::*;
