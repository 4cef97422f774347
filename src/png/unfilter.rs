use super::*;

#[inline]
#[must_use]
const fn paeth_predict(a: u8, b: u8, c: u8) -> u8 {
  let a_ = a as i32;
  let b_ = b as i32;
  let c_ = c as i32;
  let p: i32 = a_ + b_ - c_;
  let pa = (p - a_).abs();
  let pb = (p - b_).abs();
  let pc = (p - c_).abs();
  // Note: PNG fixes the order of these tests, ties must go to `a` then `b`.
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

/// Reverses the filtering of one scanline in place.
///
/// * `filter` is the scanline's filter type byte.
/// * `line` is the scanline's data, without the filter byte.
/// * `prev` is the previous *unfiltered* scanline of the same reduced image,
///   or all zeroes for the first scanline.
/// * `bpp` is the [filter chunk size](IHDR::filter_chunk_size).
///
/// The "a" byte for the first pixel of the line, and "c" bytes for the first
/// pixel, are an implied zero.
pub(crate) fn unfilter_line(
  filter: u8, line: &mut [u8], prev: &[u8], bpp: usize,
) -> Result<(), PngError> {
  debug_assert_eq!(line.len(), prev.len());
  match filter {
    0 => (),
    1 => {
      // Sub
      for i in bpp..line.len() {
        line[i] = line[i].wrapping_add(line[i - bpp]);
      }
    }
    2 => {
      // Up
      line.iter_mut().zip(prev.iter().copied()).for_each(|(p, b)| *p = p.wrapping_add(b));
    }
    3 => {
      // Average
      for i in 0..line.len() {
        let a = if i >= bpp { line[i - bpp] } else { 0 };
        let b = prev[i];
        line[i] = line[i].wrapping_add(((a as u32 + b as u32) / 2) as u8);
      }
    }
    4 => {
      // Paeth
      for i in 0..line.len() {
        let (a, c) = if i >= bpp { (line[i - bpp], prev[i - bpp]) } else { (0, 0) };
        let b = prev[i];
        line[i] = line[i].wrapping_add(paeth_predict(a, b, c));
      }
    }
    other => return Err(PngError::IllegalFilter(other)),
  }
  Ok(())
}
