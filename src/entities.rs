//! Rule-based entity extraction over datasheet text.
//!
//! The recognizer is compiled once from `[entities]` config and handed to
//! callers by reference; nothing here is global.

use crate::config;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityLabel {
    Product,
    Organization,
    Location,
    Money,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub label: EntityLabel,
    pub text: String,
    /// Byte offset into the recognized text.
    pub start: usize,
}

pub trait EntityRecognizer {
    /// All recognized spans, ordered by position.
    fn recognize(&self, text: &str) -> Vec<Entity>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityBuckets {
    pub product_name: Vec<String>,
    pub brand: Vec<String>,
    pub location: Vec<String>,
    pub price: Vec<String>,
    pub date: Vec<String>,
    pub key_features: Vec<String>,
}

pub struct RuleRecognizer {
    product: Vec<Regex>,
    organization: Option<Regex>,
    location: Option<Regex>,
    money: Regex,
    date: Regex,
}

impl RuleRecognizer {
    pub fn new(cfg: &config::Entities) -> Result<Self> {
        let product = cfg
            .product_patterns
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("product pattern: {p}")))
            .collect::<Result<Vec<_>>>()?;

        let organization = match alternation(&cfg.organization_suffixes) {
            Some(suffixes) => Some(
                Regex::new(&format!(
                    r"(?:[A-Z][\w&-]*[ \t]+){{0,3}}[A-Z][\w&-]*,?[ \t]+(?:{suffixes})"
                ))
                .with_context(|| "organization pattern")?,
            ),
            None => None,
        };

        let location = match alternation(&cfg.locations) {
            Some(names) => Some(
                Regex::new(&format!(r"\b(?:{names})\b")).with_context(|| "location pattern")?,
            ),
            None => None,
        };

        let money = Regex::new(
            r"[$€£]\s?\d[\d,]*(?:\.\d+)?(?:\s?(?:million|billion|k))?|\b\d[\d,]*(?:\.\d+)?\s?(?:USD|EUR|GBP|dollars)\b",
        )?;

        let date = Regex::new(
            r"\b(?:(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec)[a-z]*\.?\s+(?:\d{1,2},?\s+)?\d{4}|\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{2,4}|(?:19|20)\d{2})\b",
        )?;

        Ok(Self {
            product,
            organization,
            location,
            money,
            date,
        })
    }
}

/// Escaped alternation, longest first so `Inc.` wins over `Inc`.
fn alternation(words: &[String]) -> Option<String> {
    let mut words: Vec<&String> = words.iter().filter(|w| !w.trim().is_empty()).collect();
    if words.is_empty() {
        return None;
    }
    words.sort_by(|a, b| b.len().cmp(&a.len()));
    Some(
        words
            .iter()
            .map(|w| regex::escape(w.trim()))
            .collect::<Vec<_>>()
            .join("|"),
    )
}

fn push_matches(out: &mut Vec<Entity>, re: &Regex, label: EntityLabel, text: &str) {
    for m in re.find_iter(text) {
        out.push(Entity {
            label,
            text: m.as_str().trim().to_string(),
            start: m.start(),
        });
    }
}

impl EntityRecognizer for RuleRecognizer {
    fn recognize(&self, text: &str) -> Vec<Entity> {
        let mut out = Vec::new();

        for re in &self.product {
            push_matches(&mut out, re, EntityLabel::Product, text);
        }

        if let Some(re) = &self.organization {
            for m in re.find_iter(text) {
                // A suffix glued to a longer word is not a suffix.
                let glued = text[m.end()..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_alphanumeric());
                if !glued {
                    out.push(Entity {
                        label: EntityLabel::Organization,
                        text: m.as_str().trim().to_string(),
                        start: m.start(),
                    });
                }
            }
        }

        if let Some(re) = &self.location {
            push_matches(&mut out, re, EntityLabel::Location, text);
        }
        push_matches(&mut out, &self.money, EntityLabel::Money, text);
        push_matches(&mut out, &self.date, EntityLabel::Date, text);

        out.sort_by_key(|e| e.start);
        out
    }
}

pub fn extract_entities(
    recognizer: &dyn EntityRecognizer,
    text: &str,
    keywords: &[String],
) -> EntityBuckets {
    let mut buckets = EntityBuckets::default();

    for ent in recognizer.recognize(text) {
        let bucket = match ent.label {
            EntityLabel::Product => &mut buckets.product_name,
            EntityLabel::Organization => &mut buckets.brand,
            EntityLabel::Location => &mut buckets.location,
            EntityLabel::Money => &mut buckets.price,
            EntityLabel::Date => &mut buckets.date,
        };
        bucket.push(ent.text);
    }

    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    for sentence in split_sentences(text) {
        let lower = sentence.to_lowercase();
        if keywords.iter().any(|k| lower.contains(k.as_str())) {
            buckets.key_features.push(sentence.to_string());
        }
    }

    buckets
}

/// Splits on `.`, `!` or `?` followed by whitespace, and on blank lines.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);
        let boundary = match c {
            '.' | '!' | '?' => next.is_none_or(char::is_whitespace),
            '\n' => next == Some('\n'),
            _ => false,
        };
        if boundary {
            let end = i + c.len_utf8();
            let s = text[start..end].trim();
            if !s.is_empty() {
                out.push(s);
            }
            start = end;
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}
