use std::ops::ControlFlow;

use pngflow::{png::*, RGBA8};

use crate::support::*;

/// Everything the parser reported, in order.
#[derive(Debug, Default, PartialEq, Eq)]
struct Events {
  header: Option<(u32, u32)>,
  pixels: Vec<(u32, u32, RGBA8)>,
  complete: usize,
  pixels_before_header: usize,
}
impl PngEvents for Events {
  fn on_header(&mut self, width: u32, height: u32) -> ControlFlow<()> {
    self.header = Some((width, height));
    ControlFlow::Continue(())
  }
  fn on_pixel(&mut self, x: u32, y: u32, w: u32, h: u32, rgba: RGBA8) {
    assert_eq!((w, h), (1, 1));
    if self.header.is_none() {
      self.pixels_before_header += 1;
    }
    self.pixels.push((x, y, rgba));
  }
  fn on_complete(&mut self) {
    self.complete += 1;
  }
}

fn parse_all(bytes: &[u8], piece: usize) -> Result<Events, PngError> {
  let mut parser = PngParser::new();
  let mut events = Events::default();
  for part in bytes.chunks(piece) {
    assert_eq!(parser.feed(part, &mut events)?, part.len());
  }
  assert!(parser.is_complete());
  Ok(events)
}

#[test]
fn test_PngParser_any_split() {
  let bytes = rgba_png(7, 5, distinct_rgba);
  let whole = parse_all(&bytes, bytes.len()).unwrap();
  assert_eq!(whole.header, Some((7, 5)));
  assert_eq!(whole.pixels.len(), 35);
  assert_eq!(whole.complete, 1);
  assert_eq!(whole.pixels_before_header, 0);
  for piece in [1, 2, 3, 5, 8, 13, 100] {
    assert_eq!(parse_all(&bytes, piece).unwrap(), whole, "{piece}");
  }
}

#[test]
fn test_PngParser_row_major_delivery() {
  let events = parse_all(&rgba_png(4, 3, distinct_rgba), 64).unwrap();
  let positions: Vec<(u32, u32)> = events.pixels.iter().map(|&(x, y, _)| (x, y)).collect();
  let expected: Vec<(u32, u32)> = (0..3).flat_map(|y| (0..4).map(move |x| (x, y))).collect();
  assert_eq!(positions, expected);
  for (x, y, rgba) in events.pixels {
    assert_eq!(rgba, RGBA8::from(distinct_rgba(x, y)));
  }
}

#[test]
fn test_PngParser_interlaced_positions() {
  let (w, h) = (10, 9);
  let mut builder = PngBuilder::rgba8(w, h);
  builder.interlaced = true;
  let events = parse_all(&builder.build(&rgba_rows(w, h, distinct_rgba)), 50).unwrap();
  // the first pass is every 8th pixel of every 8th row
  assert_eq!(events.pixels[..4].iter().map(|&(x, y, _)| (x, y)).collect::<Vec<_>>(), [
    (0, 0),
    (8, 0),
    (0, 8),
    (8, 8)
  ]);
  let mut seen = vec![false; (w * h) as usize];
  for (x, y, rgba) in events.pixels {
    assert_eq!(rgba, RGBA8::from(distinct_rgba(x, y)));
    let i = (y * w + x) as usize;
    assert!(!seen[i], "({x},{y}) delivered twice");
    seen[i] = true;
  }
  assert!(seen.iter().all(|&s| s));
}

#[test]
fn test_PngParser_width_height() {
  let bytes = rgba_png(3, 2, distinct_rgba);
  let mut parser = PngParser::new();
  assert_eq!((parser.width(), parser.height()), (0, 0));
  assert_eq!(parser.header(), None);
  parser.feed(&bytes[..33], &mut ()).unwrap();
  assert_eq!((parser.width(), parser.height()), (3, 2));
  let ihdr = parser.header().unwrap();
  assert_eq!(ihdr.color_type, PngColorType::RGBA);
  assert_eq!(ihdr.bit_depth, 8);
  assert!(!ihdr.is_interlaced);
  assert!(!parser.is_complete());
}

#[test]
fn test_PngParser_early_iend() {
  let builder = PngBuilder::rgba8(4, 4);
  let filtered = builder.filtered(&rgba_rows(4, 4, distinct_rgba));
  // only the first two lines
  let bytes = builder.build_from_filtered(&filtered[..2 * 17]);
  let mut parser = PngParser::new();
  let mut events = Events::default();
  assert_eq!(parser.feed(&bytes, &mut events), Err(PngError::MissingImageData));
  assert_eq!(events.pixels.len(), 8);
  assert_eq!(events.complete, 0);
  assert_eq!(parser.feed(&[0], &mut events), Err(PngError::Poisoned));
}

#[test]
fn test_PngParser_skips_unknown_chunks() {
  let mut builder = PngBuilder::rgba8(2, 2);
  builder.extra_chunks.push((*b"gAMA", vec![0, 0, 0xB1, 0x8F]));
  builder.extra_chunks.push((*b"prVt", vec![1; 100]));
  let events = parse_all(&builder.build(&rgba_rows(2, 2, distinct_rgba)), 10).unwrap();
  assert_eq!(events.pixels.len(), 4);
  assert_eq!(events.complete, 1);
}

#[test]
fn test_PngParser_illegal_ihdr() {
  for (depth, color_type) in [(3, 0), (16, 3), (1, 2), (2, 6), (4, 4), (8, 5)] {
    let mut bytes = PNG_SIGNATURE.to_vec();
    write_chunk(&mut bytes, b"IHDR", &PngBuilder::new(1, 1, depth, color_type).ihdr());
    let mut parser = PngParser::new();
    assert_eq!(
      parser.feed(&bytes, &mut ()),
      Err(PngError::IllegalIHDR),
      "depth {depth}, color type {color_type}"
    );
  }
  let mut bytes = PNG_SIGNATURE.to_vec();
  write_chunk(&mut bytes, b"IHDR", &PngBuilder::rgba8(0, 1).ihdr());
  assert_eq!(PngParser::new().feed(&bytes, &mut ()), Err(PngError::IllegalIHDR));
}

#[test]
fn test_PngParser_random_garbage_no_panics() {
  for _ in 0..20 {
    let v = crate::rand_bytes(1024);
    assert!(PngParser::new().feed(&v, &mut ()).is_err());
    let mut bytes = PNG_SIGNATURE.to_vec();
    bytes.extend_from_slice(&v);
    let _ = PngParser::new().feed(&bytes, &mut Events::default());
  }
  // a good header followed by garbage image data
  let mut bytes = PNG_SIGNATURE.to_vec();
  write_chunk(&mut bytes, b"IHDR", &PngBuilder::rgba8(8, 8).ihdr());
  write_chunk(&mut bytes, b"IDAT", &crate::rand_bytes(300));
  write_chunk(&mut bytes, b"IEND", &[]);
  assert!(PngParser::new().feed(&bytes, &mut Events::default()).is_err());
}

#[test]
fn test_png_crc() {
  assert_eq!(png_crc(b"IEND".iter().copied()), 0xAE42_6082);
}
