pub mod flow;
pub mod fonts;

use crate::{
    config::{Content, Layout, SlotPlacement},
    selection::SlotResolution,
    structure::BrochureRecord,
    util::{collapse_whitespace, ensure_dir},
};
use anyhow::{Context, Result};
use flow::{BLACK, DARK_BLUE, Flowable, GREY, ImageBlock, PageGeometry, Paragraph, ParagraphStyle, Run};
use fonts::FontFace;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, content::Content as PageContent, dictionary};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSummary {
    pub output: PathBuf,
    pub page_count: usize,
    pub placed_images: Vec<SlotPlacement>,
}

/// An image read from disk and ready to embed.
struct LoadedImage {
    resource: String,
    placement: SlotPlacement,
    width: f32,
    height: f32,
    pixel_width: u32,
    pixel_height: u32,
    rgb: Vec<u8>,
}

struct Styles {
    title: ParagraphStyle,
    subtitle: ParagraphStyle,
    heading: ParagraphStyle,
    body: ParagraphStyle,
    footer: ParagraphStyle,
}

impl Styles {
    fn new() -> Self {
        let heading = ParagraphStyle::new(18.0, DARK_BLUE).space_after(12.0);
        let body = ParagraphStyle::new(10.0, BLACK).space_after(6.0);
        Self {
            title: heading.with_size(22.0),
            subtitle: body.with_size(14.0),
            heading,
            body,
            footer: ParagraphStyle::new(8.0, GREY).space_before(6.0),
        }
    }
}

fn para(text: &str, face: FontFace, style: ParagraphStyle) -> Flowable {
    Flowable::Paragraph(Paragraph {
        runs: vec![Run::new(text, face)],
        style,
    })
}

fn image_block(img: &LoadedImage) -> Flowable {
    Flowable::Image(ImageBlock {
        resource: img.resource.clone(),
        width: img.width,
        height: img.height,
    })
}

/// Builds the brochure story in its fixed section order.
fn build_story(
    record: &BrochureRecord,
    content: &Content,
    layout: &Layout,
    images: &[LoadedImage],
) -> Vec<Flowable> {
    let styles = Styles::new();
    let slot = |p: SlotPlacement| images.iter().find(|i| i.placement == p);
    let mut story = Vec::new();

    story.push(para(&content.product_name, FontFace::Bold, styles.title));
    story.push(Flowable::Spacer(12.0));
    story.push(para(&content.tagline, FontFace::Oblique, styles.subtitle));
    story.push(Flowable::Spacer(24.0));

    story.push(para(&record.overview.title, FontFace::Bold, styles.heading));
    story.push(Flowable::Spacer(12.0));
    story.push(para(&record.overview.content, FontFace::Regular, styles.body));
    story.push(Flowable::Spacer(24.0));

    if let Some(img) = slot(SlotPlacement::Product) {
        story.push(Flowable::Spacer(0.0));
        story.push(para(&layout.product_label, FontFace::Bold, styles.body));
        story.push(Flowable::Spacer(12.0));
        story.push(para(&content.product_name, FontFace::Regular, styles.body));
        story.push(Flowable::Spacer(12.0));
        story.push(image_block(img));
        story.push(Flowable::Spacer(12.0));
    }

    if let Some(img) = slot(SlotPlacement::Overview) {
        story.push(Flowable::Spacer(24.0));
        story.push(image_block(img));
    }

    story.push(para(&layout.features_heading, FontFace::Bold, styles.heading));
    for highlight in &record.key_highlights {
        story.push(para(
            &format!("{} {}", layout.bullet, highlight),
            FontFace::Regular,
            styles.body,
        ));
        story.push(Flowable::Spacer(6.0));
    }
    story.push(Flowable::Spacer(36.0));

    story.push(para(&layout.specs_heading, FontFace::Bold, styles.heading));
    for entry in &record.basic_module_info {
        story.push(Flowable::Paragraph(Paragraph {
            runs: vec![
                Run::new(format!("{}:", entry.label), FontFace::Bold),
                Run::new(entry.value.clone(), FontFace::Regular),
            ],
            style: styles.body,
        }));
        story.push(Flowable::Spacer(6.0));
    }
    story.push(Flowable::Spacer(24.0));

    if let Some(img) = slot(SlotPlacement::Specs) {
        story.push(Flowable::Spacer(24.0));
        story.push(image_block(img));
    }

    story.push(Flowable::Spacer(24.0));
    story.push(para(
        &collapse_whitespace(&record.footer),
        FontFace::Regular,
        styles.footer,
    ));

    story
}

fn load_images(slots: &[SlotResolution]) -> Result<Vec<LoadedImage>> {
    let mut out = Vec::new();
    for res in slots {
        let Some(img) = &res.image else {
            continue;
        };
        // Already-claimed placements keep the first resolved slot.
        if out.iter().any(|l: &LoadedImage| l.placement == res.slot.placement) {
            continue;
        }
        let bytes = std::fs::read(&img.path)
            .with_context(|| format!("reading image: {}", img.path.display()))?;
        let decoded = image::load_from_memory(&bytes)
            .with_context(|| format!("decoding image: {}", img.path.display()))?
            .to_rgb8();
        out.push(LoadedImage {
            resource: format!("Im{}", out.len() + 1),
            placement: res.slot.placement,
            width: res.slot.width,
            height: res.slot.height,
            pixel_width: decoded.width(),
            pixel_height: decoded.height(),
            rgb: decoded.into_raw(),
        });
    }
    Ok(out)
}

/// Renders the brochure to `output`, replacing any existing file.
///
/// Slots without a resolved image are left out of the story. Reading or
/// decoding a resolved image is an error.
pub fn render_brochure(
    record: &BrochureRecord,
    content: &Content,
    layout: &Layout,
    slots: &[SlotResolution],
    output: &Path,
) -> Result<RenderSummary> {
    let images = load_images(slots)?;
    let story = build_story(record, content, layout, &images);
    let geometry = PageGeometry {
        width: layout.page_width,
        height: layout.page_height,
        margin: layout.margin,
    };
    let pages = flow::layout(&story, geometry);
    debug!("story items={} pages={}", story.len(), pages.len());

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for face in FontFace::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => face.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(face.resource_name(), Object::Reference(font_id));
    }

    let mut xobject_ids: Vec<(String, ObjectId)> = Vec::new();
    for img in &images {
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => Object::Integer(img.pixel_width as i64),
                "Height" => Object::Integer(img.pixel_height as i64),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => Object::Integer(8),
            },
            img.rgb.clone(),
        );
        xobject_ids.push((img.resource.clone(), doc.add_object(stream)));
    }

    let mut kids = Vec::new();
    for page in &pages {
        let encoded = PageContent {
            operations: page.ops.clone(),
        }
        .encode()
        .with_context(|| "encoding page content")?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

        let mut xobjects = Dictionary::new();
        for name in &page.xobjects {
            if let Some((_, id)) = xobject_ids.iter().find(|(n, _)| n == name) {
                xobjects.set(name.as_str(), Object::Reference(*id));
            }
        }
        let mut resources = dictionary! { "Font" => fonts.clone() };
        if !xobjects.is_empty() {
            resources.set("XObject", xobjects);
        }

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                layout.page_width.into(),
                layout.page_height.into(),
            ],
            "Contents" => content_id,
            "Resources" => resources,
        });
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(page_count as i64),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(record.overview.title.as_str()),
        "Producer" => Object::string_literal("brochure-forge"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    doc.save(output)
        .with_context(|| format!("writing brochure: {}", output.display()))?;

    info!("brochure pages={} images={} out={}", page_count, images.len(), output.display());

    Ok(RenderSummary {
        output: output.to_path_buf(),
        page_count,
        placed_images: images.iter().map(|i| i.placement).collect(),
    })
}
