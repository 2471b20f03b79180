//! Image XObject decoding.
//!
//! lopdf refuses to decompress streams whose subtype is `Image`, so the
//! filter chain is applied here. Samples are then converted to 8-bit gray
//! or RGB and written out as PNG. Anything that cannot be turned into pixels
//! keeps its encoded bytes under an extension naming the format.

use anyhow::{Context, Result, anyhow, bail};
use flate2::read::ZlibDecoder;
use image::{ColorType, ImageEncoder, codecs::png::PngEncoder};
use lopdf::{Dictionary, Document, Object, Stream};
use std::io::Read;
use tracing::warn;

const MAX_COLOUR_SPACE_DEPTH: usize = 8;

/// What ends up on disk for one image.
#[derive(Debug, Clone, PartialEq)]
pub enum ImagePayload {
    Png(Vec<u8>),
    Encoded {
        bytes: Vec<u8>,
        extension: &'static str,
    },
}

impl ImagePayload {
    pub fn extension(&self) -> &'static str {
        match self {
            ImagePayload::Png(_) => "png",
            ImagePayload::Encoded { extension, .. } => *extension,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            ImagePayload::Png(b) => b,
            ImagePayload::Encoded { bytes, .. } => bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ColourSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed {
        base: Box<ColourSpace>,
        palette: Vec<u8>,
    },
}

impl ColourSpace {
    fn components(&self) -> usize {
        match self {
            ColourSpace::Gray | ColourSpace::Indexed { .. } => 1,
            ColourSpace::Rgb => 3,
            ColourSpace::Cmyk => 4,
        }
    }
}

pub fn filter_names(dict: &Dictionary) -> Vec<String> {
    let filter = dict.get(b"Filter").or_else(|_| dict.get(b"F"));
    match filter {
        Ok(Object::Name(n)) => vec![String::from_utf8_lossy(n).into_owned()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .collect(),
        _ => Vec::new(),
    }
}

pub fn decode_image(doc: &Document, stream: &Stream) -> ImagePayload {
    let dict = &stream.dict;
    let filters = filter_names(dict);
    let mut data = stream.content.clone();

    for (i, filter) in filters.iter().enumerate() {
        let last = i + 1 == filters.len();
        let step = match filter.as_str() {
            "FlateDecode" | "Fl" => inflate(&data),
            "LZWDecode" | "LZW" => lzw(&data),
            "ASCIIHexDecode" | "AHx" => Ok(ascii_hex(&data)),
            "DCTDecode" | "DCT" if last => return jpeg(data),
            "JPXDecode" if last => return encoded(data, "jp2"),
            "JBIG2Decode" if last => return encoded(data, "jb2"),
            "CCITTFaxDecode" | "CCF" if last => return encoded(data, "ccitt"),
            other => {
                warn!("unsupported image filter chain at {other}: {filters:?}");
                return encoded(data, "bin");
            }
        };
        data = match step.and_then(|d| unpredict(d, decode_parms(doc, dict, i))) {
            Ok(d) => d,
            Err(e) => {
                warn!("cannot decode {filter} image stream: {e:#}");
                return encoded(stream.content.clone(), "bin");
            }
        };
    }

    match to_png(doc, dict, &data) {
        Ok(png) => ImagePayload::Png(png),
        Err(e) => {
            warn!("cannot convert image samples: {e:#}");
            encoded(data, "bin")
        }
    }
}

fn encoded(bytes: Vec<u8>, extension: &'static str) -> ImagePayload {
    ImagePayload::Encoded { bytes, extension }
}

fn jpeg(data: Vec<u8>) -> ImagePayload {
    let decoded = image::load_from_memory_with_format(&data, image::ImageFormat::Jpeg);
    match decoded {
        Ok(img) => {
            let rgb = img.to_rgb8();
            match png(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8) {
                Ok(bytes) => ImagePayload::Png(bytes),
                Err(e) => {
                    warn!("PNG encode failed: {e:#}");
                    encoded(data, "jpg")
                }
            }
        }
        Err(e) => {
            warn!("cannot decode JPEG image: {e}");
            encoded(data, "jpg")
        }
    }
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match ZlibDecoder::new(data).read_to_end(&mut out) {
        Ok(_) => Ok(out),
        // Truncated streams are common; keep what was inflated.
        Err(e) if !out.is_empty() => {
            warn!("FlateDecode stopped early after {} bytes: {e}", out.len());
            Ok(out)
        }
        Err(e) => Err(e).context("FlateDecode"),
    }
}

fn lzw(data: &[u8]) -> Result<Vec<u8>> {
    weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
        .decode(data)
        .map_err(|e| anyhow!("LZWDecode: {e:?}"))
}

fn ascii_hex(data: &[u8]) -> Vec<u8> {
    let mut digits: Vec<u8> = data
        .iter()
        .take_while(|&&b| b != b'>')
        .filter_map(|&b| (b as char).to_digit(16).map(|d| d as u8))
        .collect();
    if digits.len() % 2 == 1 {
        digits.push(0);
    }
    digits.chunks_exact(2).map(|p| p[0] << 4 | p[1]).collect()
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Parameters for the `index`-th filter. A single dictionary applies to a single filter.
fn decode_parms<'a>(doc: &'a Document, dict: &'a Dictionary, index: usize) -> Option<&'a Dictionary> {
    let parms = dict.get(b"DecodeParms").or_else(|_| dict.get(b"DP")).ok()?;
    match resolve(doc, parms)? {
        Object::Dictionary(d) if index == 0 => Some(d),
        Object::Array(items) => resolve(doc, items.get(index)?)?.as_dict().ok(),
        _ => None,
    }
}

fn dict_int(dict: &Dictionary, key: &[u8], fallback: i64) -> i64 {
    dict.get(key).and_then(Object::as_i64).unwrap_or(fallback)
}

fn unpredict(data: Vec<u8>, parms: Option<&Dictionary>) -> Result<Vec<u8>> {
    let Some(parms) = parms else {
        return Ok(data);
    };
    let predictor = dict_int(parms, b"Predictor", 1);
    let colors = dict_int(parms, b"Colors", 1).max(1) as usize;
    let bpc = dict_int(parms, b"BitsPerComponent", 8).max(1) as usize;
    let columns = dict_int(parms, b"Columns", 1).max(1) as usize;
    let row_len = (colors * bpc * columns).div_ceil(8);
    let bpp = (colors * bpc).div_ceil(8);

    match predictor {
        1 => Ok(data),
        2 if bpc == 8 => Ok(tiff_unpredict(data, row_len, colors)),
        2 => bail!("TIFF predictor with {bpc} bits per component"),
        10..=15 => png_unpredict(&data, row_len, bpp),
        other => bail!("unknown predictor {other}"),
    }
}

fn tiff_unpredict(mut data: Vec<u8>, row_len: usize, colors: usize) -> Vec<u8> {
    for row in data.chunks_mut(row_len) {
        for i in colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - colors]);
        }
    }
    data
}

/// PNG row filters: every row starts with its own filter-type byte.
fn png_unpredict(data: &[u8], row_len: usize, bpp: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut prev = vec![0u8; row_len];

    for chunk in data.chunks(row_len + 1) {
        let Some((&tag, encoded)) = chunk.split_first() else {
            break;
        };
        let mut row = vec![0u8; row_len];
        for (i, &byte) in encoded.iter().enumerate().take(row_len) {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev[i];
            let up_left = if i >= bpp { prev[i - bpp] } else { 0 };
            let predicted = match tag {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((left as u16 + up as u16) / 2) as u8,
                4 => paeth(left, up, up_left),
                other => bail!("invalid PNG row filter {other}"),
            };
            row[i] = byte.wrapping_add(predicted);
        }
        out.extend_from_slice(&row);
        prev = row;
    }
    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let (pa, pb, pc) = ((p - a as i16).abs(), (p - b as i16).abs(), (p - c as i16).abs());
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn colour_space(doc: &Document, obj: &Object, depth: usize) -> Result<ColourSpace> {
    if depth > MAX_COLOUR_SPACE_DEPTH {
        bail!("colour space nested too deeply");
    }
    let obj = resolve(doc, obj).context("dangling colour space reference")?;
    match obj {
        Object::Name(n) => match n.as_slice() {
            b"DeviceGray" | b"G" | b"CalGray" => Ok(ColourSpace::Gray),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Ok(ColourSpace::Rgb),
            b"DeviceCMYK" | b"CMYK" => Ok(ColourSpace::Cmyk),
            other => bail!("colour space {}", String::from_utf8_lossy(other)),
        },
        Object::Array(items) => {
            let family = items.first().and_then(|o| o.as_name().ok()).unwrap_or_default();
            match family {
                b"ICCBased" => {
                    let profile = items
                        .get(1)
                        .and_then(|o| resolve(doc, o))
                        .and_then(|o| o.as_stream().ok())
                        .context("ICCBased without a profile stream")?;
                    match dict_int(&profile.dict, b"N", 0) {
                        1 => Ok(ColourSpace::Gray),
                        3 => Ok(ColourSpace::Rgb),
                        4 => Ok(ColourSpace::Cmyk),
                        n => match profile.dict.get(b"Alternate") {
                            Ok(alt) => colour_space(doc, alt, depth + 1),
                            Err(_) => bail!("ICCBased with {n} components"),
                        },
                    }
                }
                b"CalGray" => Ok(ColourSpace::Gray),
                b"CalRGB" => Ok(ColourSpace::Rgb),
                b"Indexed" | b"I" => {
                    let base = items.get(1).context("Indexed without a base")?;
                    let base = colour_space(doc, base, depth + 1)?;
                    let lookup = items.get(3).context("Indexed without a lookup table")?;
                    let palette = match resolve(doc, lookup) {
                        Some(Object::String(bytes, _)) => bytes.clone(),
                        Some(Object::Stream(s)) => lookup_stream(s)?,
                        _ => bail!("Indexed lookup is neither a string nor a stream"),
                    };
                    Ok(ColourSpace::Indexed {
                        base: Box::new(base),
                        palette,
                    })
                }
                other => bail!("colour space {}", String::from_utf8_lossy(other)),
            }
        }
        _ => bail!("colour space is not a name or array"),
    }
}

fn lookup_stream(stream: &Stream) -> Result<Vec<u8>> {
    let mut data = stream.content.clone();
    for filter in filter_names(&stream.dict) {
        data = match filter.as_str() {
            "FlateDecode" | "Fl" => inflate(&data)?,
            "LZWDecode" | "LZW" => lzw(&data)?,
            "ASCIIHexDecode" | "AHx" => ascii_hex(&data),
            other => bail!("lookup table filter {other}"),
        };
    }
    Ok(data)
}

/// Unpacks `bpc`-bit samples into one byte per sample. Rows are byte-aligned.
fn unpack_samples(data: &[u8], width: usize, height: usize, comps: usize, bpc: usize) -> Result<Vec<u8>> {
    let per_row = width * comps;
    let row_bytes = (per_row * bpc).div_ceil(8);
    if data.len() < row_bytes * height {
        bail!(
            "{} bytes of samples, expected {} for {width}x{height}",
            data.len(),
            row_bytes * height
        );
    }

    let mut out = Vec::with_capacity(per_row * height);
    for row in data.chunks_exact(row_bytes).take(height) {
        match bpc {
            8 => out.extend_from_slice(&row[..per_row]),
            16 => out.extend(row.chunks_exact(2).take(per_row).map(|p| p[0])),
            1 | 2 | 4 => {
                let per_byte = 8 / bpc;
                let mask = (1u8 << bpc) - 1;
                for i in 0..per_row {
                    let shift = 8 - bpc * (i % per_byte + 1);
                    out.push((row[i / per_byte] >> shift) & mask);
                }
            }
            other => bail!("{other} bits per component"),
        }
    }
    Ok(out)
}

fn scale(v: u8, bpc: usize) -> u8 {
    match bpc {
        1 => v * 255,
        2 => v * 85,
        4 => v * 17,
        _ => v,
    }
}

fn cmyk_to_rgb(c: u8, m: u8, y: u8, k: u8) -> [u8; 3] {
    let ink = |v: u8| ((255 - v as u16) * (255 - k as u16) / 255) as u8;
    [ink(c), ink(m), ink(y)]
}

fn base_to_rgb(base: &ColourSpace, px: &[u8]) -> [u8; 3] {
    match (base, px) {
        (ColourSpace::Gray, [v, ..]) => [*v, *v, *v],
        (ColourSpace::Rgb, [r, g, b, ..]) => [*r, *g, *b],
        (ColourSpace::Cmyk, [c, m, y, k, ..]) => cmyk_to_rgb(*c, *m, *y, *k),
        _ => [0, 0, 0],
    }
}

fn to_png(doc: &Document, dict: &Dictionary, data: &[u8]) -> Result<Vec<u8>> {
    let width = dict_int(dict, b"Width", 0);
    let height = dict_int(dict, b"Height", 0);
    if width <= 0 || height <= 0 {
        bail!("image has no size ({width}x{height})");
    }
    let (width, height) = (width as usize, height as usize);

    let stencil = matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true)));
    let (space, bpc) = if stencil {
        (ColourSpace::Gray, 1)
    } else {
        let cs = dict.get(b"ColorSpace").context("image without ColorSpace")?;
        (
            colour_space(doc, cs, 0)?,
            dict_int(dict, b"BitsPerComponent", 8) as usize,
        )
    };

    let samples = unpack_samples(data, width, height, space.components(), bpc)?;
    let (pixels, color): (Vec<u8>, ColorType) = match &space {
        ColourSpace::Gray => (samples.iter().map(|&v| scale(v, bpc)).collect(), ColorType::L8),
        ColourSpace::Rgb => (samples.iter().map(|&v| scale(v, bpc)).collect(), ColorType::Rgb8),
        ColourSpace::Cmyk => (
            samples
                .chunks_exact(4)
                .flat_map(|p| {
                    let p: Vec<u8> = p.iter().map(|&v| scale(v, bpc)).collect();
                    cmyk_to_rgb(p[0], p[1], p[2], p[3])
                })
                .collect(),
            ColorType::Rgb8,
        ),
        ColourSpace::Indexed { base, palette } => {
            let step = base.components();
            let pixels: Vec<u8> = samples
                .iter()
                .flat_map(|&idx| {
                    let at = idx as usize * step;
                    palette
                        .get(at..at + step)
                        .map(|px| base_to_rgb(base, px))
                        .unwrap_or([0, 0, 0])
                })
                .collect();
            (pixels, ColorType::Rgb8)
        }
    };

    png(&pixels, width as u32, height as u32, color)
}

fn png(pixels: &[u8], width: u32, height: u32, color: ColorType) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(pixels, width, height, color)
        .context("PNG encode")?;
    Ok(out)
}
