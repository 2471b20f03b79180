//! Flowable story layout: word wrapping, vertical flow and page breaks.

use super::fonts::{FontFace, encode_win_ansi};
use lopdf::content::Operation;
use lopdf::{Object, StringFormat};

pub type Rgb = [f32; 3];

pub const BLACK: Rgb = [0.0, 0.0, 0.0];
pub const DARK_BLUE: Rgb = [0.0, 0.0, 0.545];
pub const GREY: Rgb = [0.5, 0.5, 0.5];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParagraphStyle {
    pub size: f32,
    pub leading: f32,
    pub color: Rgb,
    pub space_before: f32,
    pub space_after: f32,
}

impl ParagraphStyle {
    pub fn new(size: f32, color: Rgb) -> Self {
        Self {
            size,
            leading: size * 1.2,
            color,
            space_before: 0.0,
            space_after: 0.0,
        }
    }

    pub fn space_before(mut self, v: f32) -> Self {
        self.space_before = v;
        self
    }

    pub fn space_after(mut self, v: f32) -> Self {
        self.space_after = v;
        self
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self.leading = size * 1.2;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub face: FontFace,
}

impl Run {
    pub fn new(text: impl Into<String>, face: FontFace) -> Self {
        Self {
            text: text.into(),
            face,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    pub style: ParagraphStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlock {
    /// XObject resource name, e.g. `Im1`.
    pub resource: String,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Flowable {
    Paragraph(Paragraph),
    Spacer(f32),
    Image(ImageBlock),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageGeometry {
    fn frame_width(&self) -> f32 {
        (self.width - 2.0 * self.margin).max(1.0)
    }

    fn top(&self) -> f32 {
        self.height - self.margin
    }

    fn bottom(&self) -> f32 {
        self.margin
    }
}

#[derive(Debug, Default)]
pub struct PlacedPage {
    pub ops: Vec<Operation>,
    /// XObject resource names drawn on this page.
    pub xobjects: Vec<String>,
}

/// A run of same-face words on one line, offset from the left edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,
    pub face: FontFace,
    pub x: f32,
}

/// Greedy word wrap across runs. A word wider than the line is split by characters.
pub fn wrap(runs: &[Run], size: f32, max_width: f32) -> Vec<Vec<Segment>> {
    let mut words: Vec<(String, FontFace)> = Vec::new();
    for run in runs {
        for w in run.text.split_whitespace() {
            if run.face.text_width(w, size) > max_width {
                words.extend(split_long_word(w, run.face, size, max_width));
            } else {
                words.push((w.to_string(), run.face));
            }
        }
    }

    let mut lines: Vec<Vec<(String, FontFace, f32)>> = Vec::new();
    let mut current: Vec<(String, FontFace, f32)> = Vec::new();
    let mut used = 0.0f32;

    for (text, face) in words {
        let w = face.text_width(&text, size);
        let space = face.text_width(" ", size);
        if current.is_empty() {
            used = w;
            current.push((text, face, 0.0));
        } else if used + space + w <= max_width {
            let x = used + space;
            used = x + w;
            current.push((text, face, x));
        } else {
            lines.push(std::mem::take(&mut current));
            used = w;
            current.push((text, face, 0.0));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
        .into_iter()
        .map(|line| {
            let mut segments: Vec<Segment> = Vec::new();
            for (text, face, x) in line {
                match segments.last_mut() {
                    Some(seg) if seg.face == face => {
                        seg.text.push(' ');
                        seg.text.push_str(&text);
                    }
                    _ => segments.push(Segment { text, face, x }),
                }
            }
            segments
        })
        .collect()
}

fn split_long_word(word: &str, face: FontFace, size: f32, max_width: f32) -> Vec<(String, FontFace)> {
    let mut out = Vec::new();
    let mut piece = String::new();
    for ch in word.chars() {
        piece.push(ch);
        if face.text_width(&piece, size) > max_width && piece.chars().count() > 1 {
            piece.pop();
            out.push((std::mem::take(&mut piece), face));
            piece.push(ch);
        }
    }
    if !piece.is_empty() {
        out.push((piece, face));
    }
    out
}

fn real(v: f32) -> Object {
    v.into()
}

fn name(n: &str) -> Object {
    Object::Name(n.as_bytes().to_vec())
}

struct Flow {
    geometry: PageGeometry,
    pages: Vec<PlacedPage>,
    current: PlacedPage,
    y: f32,
    at_top: bool,
}

impl Flow {
    fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: Vec::new(),
            current: PlacedPage::default(),
            y: geometry.top(),
            at_top: true,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = self.geometry.top();
        self.at_top = true;
    }

    fn fits(&self, height: f32) -> bool {
        self.y - height >= self.geometry.bottom() - 0.01
    }

    fn advance(&mut self, dy: f32) {
        self.y = (self.y - dy).max(self.geometry.bottom());
    }

    fn paragraph(&mut self, p: &Paragraph) {
        let style = p.style;
        let lines = wrap(&p.runs, style.size, self.geometry.frame_width());
        if lines.is_empty() {
            return;
        }

        if !self.at_top && style.space_before > 0.0 {
            if self.fits(style.space_before + style.leading) {
                self.advance(style.space_before);
            } else {
                self.new_page();
            }
        }

        for line in lines {
            if !self.fits(style.leading) && !self.at_top {
                self.new_page();
            }
            let baseline = self.y - style.size;
            self.text_line(&line, baseline, &style);
            self.advance(style.leading);
            self.at_top = false;
        }

        self.advance(style.space_after);
    }

    fn text_line(&mut self, line: &[Segment], baseline: f32, style: &ParagraphStyle) {
        let left = self.geometry.margin;
        let ops = &mut self.current.ops;
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "rg",
            vec![real(style.color[0]), real(style.color[1]), real(style.color[2])],
        ));
        for seg in line {
            ops.push(Operation::new(
                "Tf",
                vec![name(seg.face.resource_name()), real(style.size)],
            ));
            ops.push(Operation::new(
                "Tm",
                vec![
                    real(1.0),
                    real(0.0),
                    real(0.0),
                    real(1.0),
                    real(left + seg.x),
                    real(baseline),
                ],
            ));
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(
                    encode_win_ansi(&seg.text),
                    StringFormat::Hexadecimal,
                )],
            ));
        }
        ops.push(Operation::new("ET", vec![]));
    }

    fn spacer(&mut self, height: f32) {
        // Spacers are discarded at the top of a page.
        if self.at_top {
            return;
        }
        if self.fits(height) {
            self.advance(height);
        } else {
            self.new_page();
        }
    }

    fn image(&mut self, img: &ImageBlock) {
        let frame_w = self.geometry.frame_width();
        let frame_h = self.geometry.top() - self.geometry.bottom();
        let scale = (frame_w / img.width).min(frame_h / img.height).min(1.0);
        let (w, h) = (img.width * scale, img.height * scale);

        if !self.fits(h) && !self.at_top {
            self.new_page();
        }

        let x = self.geometry.margin + (frame_w - w) / 2.0;
        let y = self.y - h;
        let ops = &mut self.current.ops;
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new(
            "cm",
            vec![real(w), real(0.0), real(0.0), real(h), real(x), real(y)],
        ));
        ops.push(Operation::new("Do", vec![name(&img.resource)]));
        ops.push(Operation::new("Q", vec![]));
        if !self.current.xobjects.contains(&img.resource) {
            self.current.xobjects.push(img.resource.clone());
        }

        self.advance(h);
        self.at_top = false;
    }

    fn finish(mut self) -> Vec<PlacedPage> {
        if !self.current.ops.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

/// Lays the story out top to bottom, breaking pages when a flowable does not fit.
pub fn layout(story: &[Flowable], geometry: PageGeometry) -> Vec<PlacedPage> {
    let mut flow = Flow::new(geometry);
    for item in story {
        match item {
            Flowable::Paragraph(p) => flow.paragraph(p),
            Flowable::Spacer(h) => flow.spacer(*h),
            Flowable::Image(img) => flow.image(img),
        }
    }
    flow.finish()
}
