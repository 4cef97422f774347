use pngflow::*;

use crate::support::*;

/// Accepts everything that isn't a symbol, as a 1x1 image.
struct Anything;
impl ImageDecoder for Anything {
  fn info(&self, src: &ImageSource<'_>) -> Result<ImageHeader, DecodeError> {
    match src {
      ImageSource::Symbol(_) => Err(DecodeError::UnsupportedSource),
      _ => Ok(ImageHeader { width: 1, height: 1, color_format: ColorFormat::TrueColor }),
    }
  }
  fn open(&self, dsc: &mut DecoderDescriptor<'_>) -> Result<(), DecodeError> {
    dsc.img_data = Some(vec![0xEE]);
    Ok(())
  }
}

fn png_fs() -> MemFs {
  MemFs(vec![
    ("red.png".to_string(), rgba_png(3, 2, |_, _| [255, 0, 0, 255])),
    ("broken.png".to_string(), rgba_png(3, 2, |_, _| [255, 0, 0, 255])[..20].to_vec()),
    ("red.txt".to_string(), rgba_png(3, 2, |_, _| [255, 0, 0, 255])),
  ])
}

#[test]
fn test_register_png_decoder_open_close() {
  let mut registry = DecoderRegistry::new();
  let config = PngDecoderConfig { color_depth: ColorDepth::Bits16, ..Default::default() };
  let handle = register_png_decoder(&mut registry, png_fs(), config);
  assert_eq!(registry.len(), 1);
  //
  let src = ImageSource::File("red.png");
  let header = registry.get_info(&src).unwrap();
  assert_eq!(header, ImageHeader { width: 3, height: 2, color_format: ColorFormat::RawAlpha });
  let mut dsc = registry.open(src).unwrap();
  assert_eq!(dsc.decoder, Some(handle));
  assert_eq!(dsc.header, header);
  assert_eq!(dsc.img_data.as_deref(), Some(&[0x00, 0xF8, 0xFF].repeat(6)[..]));
  registry.close(&mut dsc);
  assert_eq!(dsc.img_data, None);
  // closing again is fine
  registry.close(&mut dsc);
  assert_eq!(dsc.img_data, None);
}

#[test]
fn test_registry_rejections() {
  let mut registry = DecoderRegistry::new();
  register_png_decoder(&mut registry, png_fs(), PngDecoderConfig::default());
  assert_eq!(registry.get_info(&ImageSource::File("red.txt")), Err(DecodeError::NoDecoder));
  assert_eq!(registry.open(ImageSource::File("red.txt")), Err(DecodeError::NoDecoder));
  assert_eq!(registry.open(ImageSource::Symbol("\u{F00C}")), Err(DecodeError::NoDecoder));
  // the broken file's IHDR is cut off partway, so info fails
  assert_eq!(registry.open(ImageSource::File("broken.png")), Err(DecodeError::NoDecoder));
}

#[test]
fn test_registry_open_failure_is_reported() {
  let mut registry = DecoderRegistry::new();
  register_png_decoder(&mut registry, png_fs(), PngDecoderConfig::default());
  let bytes = rgba_png(3, 2, distinct_rgba);
  // the signature and IHDR are intact, but the image data is missing
  let src = ImageSource::Variable(ImageDescriptor {
    header: ImageHeader { width: 3, height: 2, color_format: ColorFormat::RawAlpha },
    data: &bytes[..33],
  });
  assert!(registry.get_info(&src).is_ok());
  assert_eq!(registry.open(src), Err(DecodeError::UnexpectedEof));
}

#[test]
fn test_newest_registration_wins() {
  let mut registry = DecoderRegistry::new();
  let png = register_png_decoder(&mut registry, png_fs(), PngDecoderConfig::default());
  let anything = registry.register(Anything);
  let src = ImageSource::File("red.png");
  //
  let mut dsc = registry.open(src).unwrap();
  assert_eq!(dsc.decoder, Some(anything));
  assert_eq!(dsc.img_data.as_deref(), Some(&[0xEE][..]));
  registry.close(&mut dsc);
  // the older decoder is still there underneath
  assert!(registry.unregister(anything));
  let dsc = registry.open(src).unwrap();
  assert_eq!(dsc.decoder, Some(png));
  assert_eq!(dsc.img_data.map(|data| data.len()), Some(3 * 2 * 4));
  //
  assert!(registry.unregister(png));
  assert!(registry.is_empty());
  assert_eq!(registry.get_info(&src), Err(DecodeError::NoDecoder));
}

#[test]
fn test_close_after_unregister() {
  let mut registry = DecoderRegistry::new();
  let handle = register_png_decoder(&mut registry, png_fs(), PngDecoderConfig::default());
  let mut dsc = registry.open(ImageSource::File("red.png")).unwrap();
  registry.unregister(handle);
  registry.close(&mut dsc);
  assert_eq!(dsc.img_data, None);
}
