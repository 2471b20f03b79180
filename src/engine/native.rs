use super::{
    Engine,
    decode::{decode_image, filter_names},
    types::*,
};
use crate::util::ensure_dir;
use anyhow::{Context, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;
use tracing::{debug, warn};

const MAX_TREE_DEPTH: usize = 16;

/// Pure-Rust backend over `lopdf`.
#[derive(Debug, Default, Clone)]
pub struct NativeEngine;

impl NativeEngine {
    pub fn new() -> Self {
        Self
    }

    fn load(&self, input: &Path) -> Result<Document> {
        Document::load(input).with_context(|| format!("loading PDF: {}", input.display()))
    }
}

impl Engine for NativeEngine {
    fn probe_pdf(&self, input: &Path) -> Result<ProbeOut> {
        let meta = std::fs::metadata(input).with_context(|| "stat input")?;
        let doc = self.load(input)?;

        let mut images_per_page = Vec::new();
        let mut text_chars = 0usize;
        for (page_num, page_id) in doc.get_pages() {
            let images = page_images(&doc, page_id)
                .with_context(|| format!("listing images on page {page_num}"))?;
            images_per_page.push(images.len() as u32);
            text_chars += page_text(&doc, page_num).chars().count();
        }

        Ok(ProbeOut {
            path: input.display().to_string(),
            file_bytes: meta.len(),
            page_count: images_per_page.len() as u32,
            images_per_page,
            text_chars,
        })
    }

    fn extract_text(&self, input: &Path) -> Result<String> {
        let doc = self.load(input)?;
        let mut text = String::new();
        for (page_num, _page_id) in doc.get_pages() {
            text.push_str(&page_text(&doc, page_num));
        }
        debug!("extracted {} chars from {}", text.len(), input.display());
        Ok(text)
    }

    fn extract_images(&self, input: &Path, out_dir: &Path) -> Result<Vec<ExtractedImage>> {
        ensure_dir(out_dir)?;
        let doc = self.load(input)?;

        let mut out = Vec::new();
        for (page_num, page_id) in doc.get_pages() {
            let images = page_images(&doc, page_id)
                .with_context(|| format!("listing images on page {page_num}"))?;
            for (i, stream) in images.into_iter().enumerate() {
                let index = i as u32 + 1;
                let image = write_image(&doc, stream, out_dir, page_num, index)?;
                debug!(
                    "image page={} index={} {}x{} filter={:?}",
                    page_num, index, image.width, image.height, image.filter
                );
                out.push(image);
            }
        }
        Ok(out)
    }
}

fn page_text(doc: &Document, page_num: u32) -> String {
    match doc.extract_text(&[page_num]) {
        Ok(t) => t,
        Err(e) => {
            warn!("text extraction failed on page {page_num}: {e}");
            String::new()
        }
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Object> {
    match obj {
        Object::Reference(id) => doc
            .get_object(*id)
            .with_context(|| format!("dangling reference {} {}", id.0, id.1)),
        other => Ok(other),
    }
}

/// Page resources, following `Parent` for inherited entries.
fn page_resources(doc: &Document, page_id: ObjectId) -> Result<Option<&Dictionary>> {
    let mut node = doc.get_dictionary(page_id)?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(res) = node.get(b"Resources") {
            return Ok(Some(resolve(doc, res)?.as_dict()?));
        }
        match node.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => node = doc.get_dictionary(parent)?,
            Err(_) => return Ok(None),
        }
    }
    Ok(None)
}

/// Image XObjects of a page in resource order, descending into form XObjects.
fn page_images(doc: &Document, page_id: ObjectId) -> Result<Vec<&Stream>> {
    let mut out = Vec::new();
    if let Some(resources) = page_resources(doc, page_id)? {
        collect_images(doc, resources, &mut out, 0)?;
    }
    Ok(out)
}

fn collect_images<'a>(
    doc: &'a Document,
    resources: &'a Dictionary,
    out: &mut Vec<&'a Stream>,
    depth: usize,
) -> Result<()> {
    let Ok(xobjects) = resources.get(b"XObject") else {
        return Ok(());
    };
    let xobjects = resolve(doc, xobjects)?.as_dict()?;

    for (name, obj) in xobjects.iter() {
        let stream = match resolve(doc, obj)?.as_stream() {
            Ok(s) => s,
            Err(_) => {
                warn!("XObject {} is not a stream", String::from_utf8_lossy(name));
                continue;
            }
        };
        let subtype = stream.dict.get(b"Subtype").and_then(Object::as_name).ok();
        match subtype {
            Some(b"Image") => out.push(stream),
            Some(b"Form") if depth < MAX_TREE_DEPTH => {
                if let Ok(res) = stream.dict.get(b"Resources") {
                    let res = resolve(doc, res)?.as_dict()?;
                    collect_images(doc, res, out, depth + 1)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn dict_u32(dict: &Dictionary, key: &[u8]) -> u32 {
    dict.get(key)
        .and_then(Object::as_i64)
        .ok()
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

fn write_image(
    doc: &Document,
    stream: &Stream,
    out_dir: &Path,
    page: u32,
    index: u32,
) -> Result<ExtractedImage> {
    let payload = decode_image(doc, stream);
    let path = out_dir.join(format!("image_{page}_{index}.{}", payload.extension()));
    std::fs::write(&path, payload.bytes())
        .with_context(|| format!("writing image: {}", path.display()))?;

    Ok(ExtractedImage {
        path,
        page,
        index,
        width: dict_u32(&stream.dict, b"Width"),
        height: dict_u32(&stream.dict, b"Height"),
        filter: filter_names(&stream.dict).last().cloned(),
    })
}
