//! Heading-delimited section extraction from guideline pages.
//!
//! A small tag scanner rather than a DOM: it finds the content area
//! (`<main>`, else the element with class `contentArea`, else the whole
//! page), then walks `h1`-`h3`, `p` and `li` elements in document order.
//! Headings open a section; paragraph and list text is appended to it.

use std::sync::OnceLock;

use regex::{Captures, Regex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub content: String,
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<(/?)([A-Za-z][A-Za-z0-9]*)\b([^>]*)>").expect("tag pattern"))
}

fn noise_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?is)<!--.*?-->|<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<noscript\b[^>]*>.*?</noscript\s*>",
        )
        .expect("noise pattern")
    })
}

fn class_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).expect("class pattern")
    })
}

fn entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("entity pattern"))
}

/// Sections in document order. Text that appears before any titled heading
/// is carried into the next titled section. Headings with no text collected
/// for them are dropped, and so is text no titled heading ever claims.
pub fn extract_sections(html: &str) -> Vec<Section> {
    let cleaned = noise_re().replace_all(html, " ");
    let area = content_area(&cleaned);
    walk_blocks(area)
}

fn content_area(html: &str) -> &str {
    if let Some(inner) = find_element(html, |name, _| name == "main") {
        return inner;
    }
    if let Some(inner) = find_element(html, |_, attrs| has_class(attrs, "contentArea")) {
        return inner;
    }
    html
}

fn has_class(attrs: &str, wanted: &str) -> bool {
    class_re().captures(attrs).is_some_and(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .is_some_and(|value| value.as_str().split_whitespace().any(|class| class == wanted))
    })
}

/// Inner HTML of the first element accepted by `matches`, up to its matching
/// close tag (or the end of input when it is never closed).
fn find_element<'a>(html: &'a str, matches: impl Fn(&str, &str) -> bool) -> Option<&'a str> {
    let mut tags = tag_re().captures_iter(html);

    let (name, inner_start) = loop {
        let caps = tags.next()?;
        let name = caps[2].to_ascii_lowercase();
        let attrs = &caps[3];
        if caps[1].is_empty() && !attrs.trim_end().ends_with('/') && matches(&name, attrs) {
            break (name, caps.get(0)?.end());
        }
    };

    let mut depth = 1usize;
    for caps in tags {
        if !caps[2].eq_ignore_ascii_case(&name) {
            continue;
        }
        if caps[1].is_empty() {
            depth += 1;
        } else {
            depth -= 1;
            if depth == 0 {
                return Some(&html[inner_start..caps.get(0)?.start()]);
            }
        }
    }

    Some(&html[inner_start..])
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Heading,
    Text,
}

fn block_kind(name: &str) -> Option<BlockKind> {
    match name {
        "h1" | "h2" | "h3" => Some(BlockKind::Heading),
        "p" | "li" => Some(BlockKind::Text),
        _ => None,
    }
}

#[derive(Default)]
struct SectionBuilder {
    sections: Vec<Section>,
    title: Option<String>,
    parts: Vec<String>,
}

impl SectionBuilder {
    fn heading(&mut self, text: String) {
        self.close_section();
        self.title = if text.is_empty() { None } else { Some(text) };
    }

    fn text(&mut self, text: String) {
        if !text.is_empty() {
            self.parts.push(text);
        }
    }

    /// Collected text stays pending until a titled section claims it.
    fn close_section(&mut self) {
        let Some(title) = self.title.take() else {
            return;
        };
        if self.parts.is_empty() {
            return;
        }
        let content = std::mem::take(&mut self.parts).join(" ").trim().to_string();
        if !content.is_empty() {
            self.sections.push(Section { title, content });
        }
    }

    fn finish(mut self) -> Vec<Section> {
        self.close_section();
        self.sections
    }
}

fn walk_blocks(html: &str) -> Vec<Section> {
    let mut builder = SectionBuilder::default();
    let mut open: Option<(BlockKind, String, String)> = None;
    let mut cursor = 0;

    let flush = |builder: &mut SectionBuilder, open: &mut Option<(BlockKind, String, String)>| {
        if let Some((kind, _, raw)) = open.take() {
            let text = normalize_text(&raw);
            match kind {
                BlockKind::Heading => builder.heading(text),
                BlockKind::Text => builder.text(text),
            }
        }
    };

    for caps in tag_re().captures_iter(html) {
        let Some(whole) = caps.get(0) else { continue };
        if let Some((_, _, raw)) = open.as_mut() {
            raw.push_str(&html[cursor..whole.start()]);
        }
        cursor = whole.end();

        let name = caps[2].to_ascii_lowercase();
        let closing = !caps[1].is_empty();

        if let Some(kind) = block_kind(&name) {
            if closing {
                if open.as_ref().is_some_and(|(_, tag, _)| *tag == name) {
                    flush(&mut builder, &mut open);
                }
            } else {
                flush(&mut builder, &mut open);
                open = Some((kind, name, String::new()));
            }
        } else if name == "br" {
            if let Some((_, _, raw)) = open.as_mut() {
                raw.push(' ');
            }
        }
    }

    if let Some((_, _, raw)) = open.as_mut() {
        raw.push_str(&html[cursor..]);
    }
    flush(&mut builder, &mut open);

    builder.finish()
}

fn normalize_text(raw: &str) -> String {
    decode_entities(raw).split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn decode_entities(text: &str) -> String {
    entity_re()
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(entity)
            };
            match decoded {
                Some(ch) => ch.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "laquo" => '\u{00AB}',
        "raquo" => '\u{00BB}',
        "eacute" => 'é',
        "Eacute" => 'É',
        "egrave" => 'è',
        "agrave" => 'à',
        "ecirc" => 'ê',
        "ccedil" => 'ç',
        "copy" => '©',
        _ => return None,
    };
    Some(ch)
}
