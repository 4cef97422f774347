use pngflow::*;

fn main() {
  env_logger::init();

  let mut args = std::env::args().skip(1);
  let Some(path) = args.next() else {
    eprintln!("usage: pngflow <file.png> [32|16|8|1]");
    std::process::exit(2);
  };
  let color_depth = match args.next() {
    None => ColorDepth::default(),
    Some(bits) => match bits.parse().ok().and_then(ColorDepth::from_bits) {
      Some(depth) => depth,
      None => {
        eprintln!("{bits}: color depth must be one of 32, 16, 8, or 1");
        std::process::exit(2);
      }
    },
  };

  let mut registry = DecoderRegistry::new();
  register_png_decoder(
    &mut registry,
    StdFileSystem,
    PngDecoderConfig { color_depth, ..Default::default() },
  );

  let src = ImageSource::File(&path);
  match registry.get_info(&src) {
    Ok(header) => println!("{path}: {header:?}"),
    Err(e) => {
      println!("{path}: info failed: {e}");
      std::process::exit(1);
    }
  }

  let mut dsc = match registry.open(src) {
    Ok(dsc) => dsc,
    Err(e) => {
      println!("{path}: open failed: {e}");
      std::process::exit(1);
    }
  };
  let data = dsc.img_data.as_deref().unwrap_or_default();
  println!("{path}: {} bytes of {color_depth:?} pixels", data.len());
  println!("first pixel: {:02X?}", &data[..color_depth.bytes_per_pixel().min(data.len())]);
  registry.close(&mut dsc);
}
