//! Turns one archived detail page into a [`StainRecord`]. Never errors:
//! a page without usable structure simply yields `None`, and malformed
//! markup degrades through the fallbacks instead of failing the crawl.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::formats::{Method, Section, StainRecord};
use crate::html::{find_content_container, list_items, normalized_text, sibling_blocks_until};

static SEL_H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("static selector"));
static SEL_H2: Lazy<Selector> = Lazy::new(|| Selector::parse("h2").expect("static selector"));
static SEL_UL: Lazy<Selector> = Lazy::new(|| Selector::parse("ul").expect("static selector"));
static SEL_OL: Lazy<Selector> = Lazy::new(|| Selector::parse("ol").expect("static selector"));

/// Tags counted as paragraph-like when gathering intro material.
const INTRO_BLOCK_TAGS: [&str; 4] = ["p", "div", "section", "blockquote"];

pub fn parse_detail_page(
    html: &str,
    archive_url: &str,
    original_url: &str,
) -> Option<StainRecord> {
    let doc = Html::parse_document(html);
    let content = find_content_container(&doc);

    let h1 = content.select(&SEL_H1).next()?;
    let title = normalized_text(h1);
    if title.is_empty() {
        return None;
    }

    // Intro blocks between the H1 and the first H2, with caution text
    // routed to the top-level caution list.
    let mut intro_notes = Vec::new();
    let mut cautions = Vec::new();
    for blk in sibling_blocks_until(h1, &["h2"]) {
        if !INTRO_BLOCK_TAGS.contains(&blk.value().name()) {
            continue;
        }
        let text = normalized_text(blk);
        if text.is_empty() {
            continue;
        }
        if is_caution(&text) {
            cautions.push(text);
        } else {
            intro_notes.push(text);
        }
    }

    let mut sections = Vec::new();
    for h2 in content.select(&SEL_H2) {
        let section_name = normalized_text(h2);
        if section_name.is_empty() {
            continue;
        }

        let blocks = sibling_blocks_until(h2, &["h2"]);
        let methods = methods_from_blocks(&blocks);
        if !methods.is_empty() {
            sections.push(Section {
                section_name,
                methods,
            });
        }
    }

    // Whole-page fallback when no H2 section survived: first lists become
    // the single "General" method.
    if sections.is_empty() {
        let materials = content
            .select(&SEL_UL)
            .next()
            .map(list_items)
            .unwrap_or_default();
        let steps = content
            .select(&SEL_OL)
            .next()
            .map(list_items)
            .unwrap_or_default();
        if !materials.is_empty() || !steps.is_empty() || !intro_notes.is_empty() {
            sections.push(Section {
                section_name: "General".to_owned(),
                methods: vec![Method {
                    materials,
                    steps,
                    notes: intro_notes.clone(),
                    cautions: cautions.clone(),
                    extra: String::new(),
                }],
            });
        }
    }

    if sections.is_empty() {
        return None;
    }

    Some(StainRecord {
        title,
        intro_notes,
        cautions,
        sections,
        extra: Vec::new(),
        source_archive_url: archive_url.to_owned(),
        source_original_url: original_url.to_owned(),
    })
}

/// Splits a section's blocks into alternative-method chunks on an `<h4>`
/// reading exactly "Or", then builds one method per chunk.
fn methods_from_blocks(blocks: &[ElementRef<'_>]) -> Vec<Method> {
    let mut chunks = Vec::new();
    let mut current = Vec::new();
    for &blk in blocks {
        if blk.value().name() == "h4" && normalized_text(blk).eq_ignore_ascii_case("or") {
            chunks.push(std::mem::take(&mut current));
        } else {
            current.push(blk);
        }
    }
    chunks.push(current);

    chunks
        .iter()
        .filter_map(|chunk| method_from_chunk(chunk))
        .collect()
}

fn method_from_chunk(chunk: &[ElementRef<'_>]) -> Option<Method> {
    let h3_positions: Vec<usize> = chunk
        .iter()
        .enumerate()
        .filter(|(_, el)| el.value().name() == "h3")
        .map(|(idx, _)| idx)
        .collect();

    // No H3 substructure: keep the raw text as a single note so
    // unanticipated markup still surfaces content.
    if h3_positions.is_empty() {
        let raw = joined_text(chunk);
        if raw.is_empty() {
            return None;
        }
        return Some(Method {
            notes: vec![raw],
            ..Method::default()
        });
    }

    let mut materials = Vec::new();
    let mut steps = Vec::new();
    let mut notes = Vec::new();
    let mut cautions = Vec::new();

    for (k, &start) in h3_positions.iter().enumerate() {
        let label = normalized_text(chunk[start]).to_lowercase();
        let end = h3_positions.get(k + 1).copied().unwrap_or(chunk.len());
        let segment = &chunk[start + 1..end];

        if label.contains("what you will need") {
            if let Some(&ul) = segment.iter().find(|el| el.value().name() == "ul") {
                materials.extend(list_items(ul));
            }
            // Some pages use paragraphs instead of a list.
            if materials.is_empty() {
                let text = paragraph_text(segment).join(" ");
                if !text.is_empty() {
                    materials.push(text);
                }
            }
        } else if label.contains("steps to clean") {
            if let Some(&ol) = segment.iter().find(|el| el.value().name() == "ol") {
                steps.extend(list_items(ol));
            }
            if steps.is_empty() {
                steps.extend(paragraph_text(segment));
            }
        } else {
            // Anything else becomes notes, with caution sentences split out.
            let text = joined_text(segment);
            for line in split_sentences(&text) {
                if is_caution(&line) {
                    cautions.push(line);
                } else {
                    notes.push(line);
                }
            }
        }
    }

    // Recover caution text sitting outside any recognized H3 segment.
    for &el in chunk {
        let text = normalized_text(el);
        if is_caution(&text) && !cautions.contains(&text) {
            cautions.push(text);
        }
    }

    materials.retain(|s| !s.is_empty());
    steps.retain(|s| !s.is_empty());
    notes.retain(|s| !s.is_empty());
    cautions.retain(|s| !s.is_empty());

    Some(Method {
        materials,
        steps,
        notes,
        cautions,
        extra: String::new(),
    })
}

fn is_caution(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed
        .get(..8)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("caution:"))
}

fn joined_text(elements: &[ElementRef<'_>]) -> String {
    elements
        .iter()
        .map(|&el| normalized_text(el))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn paragraph_text(elements: &[ElementRef<'_>]) -> Vec<String> {
    elements
        .iter()
        .filter(|el| el.value().name() == "p")
        .map(|&el| normalized_text(el))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Splits on explicit line breaks or a period followed by whitespace.
/// Deliberately naive about abbreviations; the source pages' caution text
/// was authored as plain sentences.
fn split_sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            out.push(std::mem::take(&mut current));
            continue;
        }
        current.push(c);
        if c == '.' && chars.peek().is_some_and(|n| n.is_whitespace()) {
            out.push(std::mem::take(&mut current));
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
        }
    }
    out.push(current);

    out.iter()
        .map(|line| line.trim().to_owned())
        .filter(|line| !line.is_empty())
        .collect()
}
