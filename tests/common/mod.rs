#![allow(dead_code)]

use brochure_forge::render::fonts::encode_win_ansi;
use flate2::{Compression, write::ZlibEncoder};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat, Stream, dictionary};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

/// How the image samples are stored in the fixture PDF.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Encoding {
    Raw,
    Flate,
    /// Flate with PNG row predictors (Sub and Up alternating).
    FlatePredicted,
    Lzw,
    Jpeg,
    FlateJpeg,
    /// Opaque bytes tagged `/JPXDecode`.
    Jpx,
    /// Tagged `/FlateDecode` but not zlib data.
    CorruptFlate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Colour {
    Rgb,
    Gray,
    Cmyk,
    IccRgb,
    /// Two-entry RGB palette, 4 bits per index.
    Indexed4,
}

pub struct FixtureImage {
    pub width: u32,
    pub height: u32,
    pub rgb: [u8; 3],
    pub encoding: Encoding,
    pub colour: Colour,
    pub in_form: bool,
}

impl FixtureImage {
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self {
            width,
            height,
            rgb,
            encoding: Encoding::Raw,
            colour: Colour::Rgb,
            in_form: false,
        }
    }

    pub fn encoded(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn colour(mut self, colour: Colour) -> Self {
        self.colour = colour;
        self
    }

    /// Draw the image from inside a form XObject.
    pub fn in_form(mut self) -> Self {
        self.in_form = true;
        self
    }

    /// The RGB value every pixel should decode to.
    pub fn expected_rgb(&self) -> [u8; 3] {
        match self.colour {
            Colour::Gray => [self.rgb[0]; 3],
            _ => self.rgb,
        }
    }

    fn components(&self) -> usize {
        match self.colour {
            Colour::Gray | Colour::Indexed4 => 1,
            Colour::Rgb | Colour::IccRgb => 3,
            Colour::Cmyk => 4,
        }
    }

    fn bits(&self) -> usize {
        match self.colour {
            Colour::Indexed4 => 4,
            _ => 8,
        }
    }

    fn row_len(&self) -> usize {
        (self.width as usize * self.components() * self.bits()).div_ceil(8)
    }

    fn samples(&self) -> Vec<u8> {
        let (w, h) = (self.width as usize, self.height as usize);
        let [r, g, b] = self.rgb;
        match self.colour {
            Colour::Rgb | Colour::IccRgb => self.rgb.repeat(w * h),
            Colour::Gray => vec![r; w * h],
            Colour::Cmyk => [255 - r, 255 - g, 255 - b, 0].repeat(w * h),
            Colour::Indexed4 => {
                let mut row = vec![0x11u8; w / 2];
                if w % 2 == 1 {
                    row.push(0x10);
                }
                row.repeat(h)
            }
        }
    }

    fn colour_space(&self, doc: &mut Document) -> Object {
        match self.colour {
            Colour::Rgb => "DeviceRGB".into(),
            Colour::Gray => "DeviceGray".into(),
            Colour::Cmyk => "DeviceCMYK".into(),
            Colour::IccRgb => {
                let profile = doc.add_object(Stream::new(
                    dictionary! { "N" => Object::Integer(3), "Alternate" => "DeviceRGB" },
                    b"not a real ICC profile".to_vec(),
                ));
                Object::Array(vec!["ICCBased".into(), Object::Reference(profile)])
            }
            Colour::Indexed4 => {
                let [r, g, b] = self.rgb;
                Object::Array(vec![
                    "Indexed".into(),
                    "DeviceRGB".into(),
                    Object::Integer(1),
                    Object::String(vec![0, 0, 0, r, g, b], StringFormat::Hexadecimal),
                ])
            }
        }
    }

    fn xobject(&self, doc: &mut Document) -> ObjectId {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => Object::Integer(self.width as i64),
            "Height" => Object::Integer(self.height as i64),
            "BitsPerComponent" => Object::Integer(self.bits() as i64),
        };
        let colour_space = self.colour_space(doc);
        dict.set("ColorSpace", colour_space);

        let samples = self.samples();
        let data = match self.encoding {
            Encoding::Raw => samples,
            Encoding::Flate => {
                dict.set("Filter", "FlateDecode");
                zlib(&samples)
            }
            Encoding::FlatePredicted => {
                dict.set("Filter", "FlateDecode");
                dict.set(
                    "DecodeParms",
                    dictionary! {
                        "Predictor" => Object::Integer(15),
                        "Colors" => Object::Integer(self.components() as i64),
                        "BitsPerComponent" => Object::Integer(self.bits() as i64),
                        "Columns" => Object::Integer(self.width as i64),
                    },
                );
                let bpp = (self.components() * self.bits()).div_ceil(8);
                zlib(&png_predict(&samples, self.row_len(), bpp))
            }
            Encoding::Lzw => {
                dict.set("Filter", "LZWDecode");
                weezl::encode::Encoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
                    .encode(&samples)
                    .expect("LZW encode")
            }
            Encoding::Jpeg => {
                dict.set("Filter", "DCTDecode");
                jpeg(self)
            }
            Encoding::FlateJpeg => {
                dict.set(
                    "Filter",
                    Object::Array(vec!["FlateDecode".into(), "DCTDecode".into()]),
                );
                zlib(&jpeg(self))
            }
            Encoding::Jpx => {
                dict.set("Filter", "JPXDecode");
                b"\x00\x00\x00\x0cjP  opaque".to_vec()
            }
            Encoding::CorruptFlate => {
                dict.set("Filter", "FlateDecode");
                b"definitely not zlib".to_vec()
            }
        };
        doc.add_object(Stream::new(dict, data))
    }
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).expect("zlib write");
    enc.finish().expect("zlib finish")
}

fn jpeg(img: &FixtureImage) -> Vec<u8> {
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, 95)
        .encode(
            &img.rgb.repeat((img.width * img.height) as usize),
            img.width,
            img.height,
            image::ColorType::Rgb8,
        )
        .expect("JPEG encode");
    out
}

/// Sub on even rows, Up on odd rows.
fn png_predict(samples: &[u8], row_len: usize, bpp: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut prev = vec![0u8; row_len];
    for (r, row) in samples.chunks(row_len).enumerate() {
        let tag = if r % 2 == 0 { 1u8 } else { 2u8 };
        out.push(tag);
        for (i, &byte) in row.iter().enumerate() {
            let predicted = match tag {
                1 if i >= bpp => row[i - bpp],
                1 => 0,
                _ => prev[i],
            };
            out.push(byte.wrapping_sub(predicted));
        }
        prev = row.to_vec();
    }
    out
}

#[derive(Default)]
pub struct FixturePage {
    pub lines: Vec<String>,
    pub images: Vec<FixtureImage>,
}

impl FixturePage {
    pub fn new(lines: &[&str], images: Vec<FixtureImage>) -> Self {
        Self {
            lines: lines.iter().map(|s| s.to_string()).collect(),
            images,
        }
    }
}

/// Scratch directory removed when the returned guard drops.
pub fn scratch_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("brochure-forge-")
        .tempdir()
        .expect("create scratch dir")
}

/// Writes a small datasheet-like PDF: one text line per `BT`/`ET` block, then the images.
pub fn write_datasheet(path: &Path, pages: &[FixturePage]) {
    write_pdf(path, pages, false);
}

/// Like [`write_datasheet`] but the single page inherits its resources from the page tree.
pub fn write_inherited_datasheet(path: &Path, page: FixturePage) {
    write_pdf(path, &[page], true);
}

fn write_pdf(path: &Path, pages: &[FixturePage], inherit: bool) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids = Vec::new();
    let mut shared = None;
    for page in pages {
        let mut ops = Vec::new();
        let mut y = 740.0f32;
        for line in &page.lines {
            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), Object::Integer(11)],
            ));
            ops.push(Operation::new("Td", vec![Object::Integer(72), y.into()]));
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(line), StringFormat::Hexadecimal)],
            ));
            ops.push(Operation::new("ET", vec![]));
            y -= 14.0;
        }

        let mut xobjects = Dictionary::new();
        for (i, img) in page.images.iter().enumerate() {
            let image_id = img.xobject(&mut doc);
            let (w, h) = (img.width as i64, img.height as i64);
            let name = if img.in_form {
                let form_ops = vec![
                    Operation::new("q", vec![]),
                    Operation::new("cm", vec![w.into(), 0.into(), 0.into(), h.into(), 0.into(), 0.into()]),
                    Operation::new("Do", vec![Object::Name(b"Im1".to_vec())]),
                    Operation::new("Q", vec![]),
                ];
                let form_id = doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Form",
                        "BBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(w), Object::Integer(h)],
                        "Resources" => dictionary! {
                            "XObject" => dictionary! { "Im1" => image_id },
                        },
                    },
                    Content { operations: form_ops }.encode().expect("encode form"),
                ));
                let name = format!("Fm{}", i + 1);
                xobjects.set(name.as_str(), Object::Reference(form_id));
                name
            } else {
                let name = format!("Im{}", i + 1);
                xobjects.set(name.as_str(), Object::Reference(image_id));
                name
            };
            ops.push(Operation::new("q", vec![]));
            if img.in_form {
                ops.push(Operation::new(
                    "cm",
                    vec![1.into(), 0.into(), 0.into(), 1.into(), 72.into(), (72 + 60 * i as i64).into()],
                ));
            } else {
                ops.push(Operation::new(
                    "cm",
                    vec![w.into(), 0.into(), 0.into(), h.into(), 72.into(), (72 + 60 * i as i64).into()],
                ));
            }
            ops.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
            ops.push(Operation::new("Q", vec![]));
        }

        let encoded = Content { operations: ops }.encode().expect("encode content");
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

        let mut resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        };
        if !page.images.is_empty() {
            resources.set("XObject", xobjects);
        }

        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
            "Contents" => content_id,
        };
        if inherit {
            shared = Some(resources);
        } else {
            page_dict.set("Resources", resources);
        }
        kids.push(Object::Reference(doc.add_object(page_dict)));
    }

    let count = kids.len() as i64;
    let mut tree = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => Object::Integer(count),
    };
    if let Some(resources) = shared {
        tree.set("Resources", resources);
    }
    doc.objects.insert(pages_id, Object::Dictionary(tree));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("save fixture PDF");
}

/// The C42GM-style datasheet: overview markers across two pages, images spread over pages.
pub fn c42gm_datasheet(path: &Path, images_per_page: [usize; 2]) {
    c42gm_datasheet_styled(path, images_per_page, Encoding::Raw, Colour::Rgb);
}

pub fn c42gm_datasheet_styled(
    path: &Path,
    images_per_page: [usize; 2],
    encoding: Encoding,
    colour: Colour,
) {
    let palette = [[200, 30, 30], [30, 200, 30], [30, 30, 200], [200, 200, 30], [90, 90, 90]];
    let mut n = 0;
    let mut images = |count: usize| {
        (0..count)
            .map(|_| {
                let img = FixtureImage::solid(8 + n as u32 * 4, 6 + n as u32 * 2, palette[n % palette.len()])
                    .encoded(encoding)
                    .colour(colour);
                n += 1;
                img
            })
            .collect::<Vec<_>>()
    };

    let first = images(images_per_page[0]);
    let second = images(images_per_page[1]);

    write_datasheet(
        path,
        &[
            FixturePage::new(
                &[
                    "C42GM Datasheet",
                    "C42GM is an LTE Cat M1/NB1/NB2 module",
                    "with integrated eSIM and global GNSS features.",
                ],
                first,
            ),
            FixturePage::new(
                &[
                    "Module details and specifications follow.",
                    "Copyright © 2024 Cavli Inc.",
                ],
                second,
            ),
        ],
    );
}
