use crate::{
    config::Config,
    engine::{Engine, ExtractedImage},
    entities::{EntityBuckets, EntityRecognizer, extract_entities},
    overview::{RefinedOverview, refine_overview},
    postprocess,
    render::{RenderSummary, render_brochure},
    report::{BrochureReport, degraded_sections, slot_reports},
    selection::select_images,
    structure::{BrochureRecord, structure_data},
    util::{hash_file, now_rfc3339},
};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info, warn};

pub struct Pipeline<E: Engine> {
    cfg: Config,
    engine: E,
}

pub struct BrochureOutput {
    pub text: String,
    pub overview: RefinedOverview,
    pub record: BrochureRecord,
    pub images: Vec<ExtractedImage>,
    pub entities: Option<EntityBuckets>,
    pub render: RenderSummary,
    pub report: BrochureReport,
}

impl<E: Engine> Pipeline<E> {
    pub fn new(cfg: &Config, engine: E) -> Self {
        Self {
            cfg: cfg.clone(),
            engine,
        }
    }

    /// Page-ordered text of the whole document after post-processing.
    pub fn extract_text(&self, input: &Path) -> Result<String> {
        let raw = self
            .engine
            .extract_text(input)
            .with_context(|| format!("extracting text: {}", input.display()))?;
        Ok(postprocess::clean_text(&self.cfg, &raw))
    }

    pub fn refine(&self, input: &Path) -> Result<RefinedOverview> {
        let text = self.extract_text(input)?;
        Ok(refine_overview(&text, &self.cfg.markers))
    }

    pub fn run(
        &self,
        input: &Path,
        images_dir: &Path,
        output: &Path,
        recognizer: Option<&dyn EntityRecognizer>,
    ) -> Result<BrochureOutput> {
        let started = now_rfc3339();
        let input_sha256 = hash_file(input)
            .with_context(|| format!("hashing input: {}", input.display()))?;

        let images = self
            .engine
            .extract_images(input, images_dir)
            .with_context(|| format!("extracting images: {}", input.display()))?;
        info!("extracted {} images into {}", images.len(), images_dir.display());

        let text = self.extract_text(input)?;
        info!("extracted {} chars of text", text.chars().count());

        let entities = recognizer.map(|r| {
            let buckets = extract_entities(r, &text, &self.cfg.entities.sentence_keywords);
            debug!(
                "entities products={} brands={} dates={} feature_sentences={}",
                buckets.product_name.len(),
                buckets.brand.len(),
                buckets.date.len(),
                buckets.key_features.len()
            );
            buckets
        });

        let overview = refine_overview(&text, &self.cfg.markers);
        if overview.status.is_degraded() {
            warn!("overview degraded: {:?}", overview.status);
        }

        let record = structure_data(&self.cfg.content, overview.content.clone());

        let slots = select_images(&images, &self.cfg.layout.slots);
        for res in &slots {
            debug!(placement = ?res.placement(), status = ?res.status, "image slot");
        }

        let render = render_brochure(
            &record,
            &self.cfg.content,
            &self.cfg.layout,
            &slots,
            output,
        )?;

        let degraded = degraded_sections(overview.status, &slots);
        for d in &degraded {
            warn!("degraded section: {:?}", d);
        }

        let report = BrochureReport {
            input: input.display().to_string(),
            input_sha256,
            text_chars: text.chars().count(),
            image_count: images.len(),
            page_count: render.page_count,
            overview_status: overview.status,
            image_slots: slot_reports(&slots),
            degraded,
            started,
            finished: now_rfc3339(),
        };

        Ok(BrochureOutput {
            text,
            overview,
            record,
            images,
            entities,
            render,
            report,
        })
    }
}
