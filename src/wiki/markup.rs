//! Wikitext handling: field extraction from template invocations, and
//! rendering of inline markup into Discord-flavoured markdown.
//!
//! Rendering collects an ordered list of non-overlapping span replacements
//! and applies them back-to-front over one output buffer, so earlier
//! replacements never invalidate the offsets of later ones.

use std::collections::BTreeMap;

use fancy_regex::Regex;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::wiki::constants::DEFAULT_WIKI_BASE;

/// Everything except alphanumerics, `_.-~/` and `%` gets percent-encoded.
/// `%` stays literal so embed placeholders survive URL construction.
const URL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/')
    .remove(b'%');

/// A field mapping extracted from one page's wikitext.
pub type FieldMap = BTreeMap<String, String>;

/// The content kinds a wiki page can parse into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Battlesuit,
    StigmataSet,
    Weapon,
}

/// Decide which content kind a raw field mapping describes.
///
/// Runs once at the translation boundary; model constructors receive an
/// already-classified mapping and never probe for their own kind.
pub fn classify_fields(fields: &FieldMap) -> Option<PageKind> {
    if fields.contains_key("battlesuit") {
        Some(PageKind::Battlesuit)
    } else if ["slotT", "slotM", "slotB"]
        .iter()
        .any(|key| fields.contains_key(*key))
    {
        Some(PageKind::StigmataSet)
    } else if fields.contains_key("ATK") && fields.contains_key("CRT") {
        Some(PageKind::Weapon)
    } else {
        None
    }
}

/// Convert a title to the form the wiki recognizes in URLs.
pub fn urlify(title: &str) -> String {
    utf8_percent_encode(&title.replace(' ', "_"), URL_ENCODE_SET).to_string()
}

/// A page URL on the wiki.
pub fn wiki_link(title: &str) -> String {
    format!("{DEFAULT_WIKI_BASE}{}", urlify(title))
}

/// An image URL on the wiki. Image names additionally have `:` rewritten,
/// matching how the wiki stores file redirects.
pub fn image_link(name: &str) -> String {
    format!(
        "{DEFAULT_WIKI_BASE}Special:Redirect/file/{}.png",
        urlify(&name.replace(':', "_-"))
    )
}

/// Markdown link syntax as Discord renders it in embeds.
pub fn markdown_link(display: &str, url: &str) -> String {
    format!("[{display}]({url})")
}

// Template / wikilink scanning.
//
// The scanners track `{{`/`}}` and `[[`/`]]` nesting with an explicit stack
// instead of regex, since both constructs nest on real pages.

/// One template invocation found in wikitext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Byte span of the whole `{{...}}` invocation.
    pub span: (usize, usize),
    pub name: String,
    /// Named arguments; positional arguments get 1-based indices as names.
    pub args: Vec<(String, String)>,
    /// Whether another template is nested inside this one.
    pub has_nested: bool,
    /// Whether this template is nested inside another template.
    pub top_level: bool,
}

/// One internal link found in wikitext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wikilink {
    /// Byte span of the whole `[[...]]` construct.
    pub span: (usize, usize),
    pub target: String,
    pub text: Option<String>,
    /// Whether another wikilink is nested inside this one (image links).
    pub has_nested: bool,
}

fn delimiter_positions(text: &str, open: &[u8; 2], close: &[u8; 2]) -> Vec<(usize, usize, bool)> {
    // (start, end, is_open) for every delimiter occurrence, left to right.
    // Scans bytes, not chars: the delimiters are ASCII pairs, so every
    // reported position is a char boundary even in multibyte text.
    let mut out = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i + 2 <= bytes.len() {
        if &bytes[i..i + 2] == open {
            out.push((i, i + 2, true));
            i += 2;
        } else if &bytes[i..i + 2] == close {
            out.push((i, i + 2, false));
            i += 2;
        } else {
            i += 1;
        }
    }
    out
}

/// Split template/link inner content on `|` at nesting depth zero.
fn split_top_level(content: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let bytes = content.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].starts_with(b"{{") || bytes[i..].starts_with(b"[[") {
            depth += 1;
            i += 2;
        } else if bytes[i..].starts_with(b"}}") || bytes[i..].starts_with(b"]]") {
            depth = depth.saturating_sub(1);
            i += 2;
        } else if bytes[i] == b'|' && depth == 0 {
            parts.push(&content[start..i]);
            start = i + 1;
            i += 1;
        } else {
            i += 1;
        }
    }
    parts.push(&content[start..]);
    parts
}

/// Find every template invocation in `text`, innermost first.
pub fn scan_templates(text: &str) -> Vec<Template> {
    let mut templates: Vec<Template> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();

    for (start, end, is_open) in delimiter_positions(text, b"{{", b"}}") {
        if is_open {
            stack.push(start);
            continue;
        }
        let Some(open_at) = stack.pop() else {
            continue; // stray closer
        };

        let span = (open_at, end);
        let content = &text[open_at + 2..start];
        let parts = split_top_level(content);
        let name = parts[0].trim().to_owned();

        let mut args = Vec::new();
        let mut positional = 0usize;
        for part in &parts[1..] {
            match part.split_once('=') {
                Some((key, value)) => {
                    args.push((key.trim().to_owned(), value.trim().to_owned()));
                }
                None => {
                    positional += 1;
                    args.push((positional.to_string(), part.trim().to_owned()));
                }
            }
        }

        let has_nested = templates
            .iter()
            .any(|t| t.span.0 > span.0 && t.span.1 < span.1);
        templates.push(Template {
            span,
            name,
            args,
            has_nested,
            top_level: stack.is_empty(),
        });
    }

    templates
}

/// Find every internal link in `text`, innermost first.
pub fn scan_wikilinks(text: &str) -> Vec<Wikilink> {
    let mut links: Vec<Wikilink> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();

    for (start, end, is_open) in delimiter_positions(text, b"[[", b"]]") {
        if is_open {
            stack.push(start);
            continue;
        }
        let Some(open_at) = stack.pop() else {
            continue;
        };

        let span = (open_at, end);
        let content = &text[open_at + 2..start];
        let (target, text_part) = match content.split_once('|') {
            Some((target, rest)) => (target.trim().to_owned(), Some(rest.trim().to_owned())),
            None => (content.trim().to_owned(), None),
        };

        let has_nested = links
            .iter()
            .any(|l| l.span.0 > span.0 && l.span.1 < span.1);
        links.push(Wikilink {
            span,
            target,
            text: text_part,
            has_nested,
        });
    }

    links
}

/// Collect every named argument of every top-level template invocation.
///
/// Arguments of templates nested inside another template are not data
/// fields and are skipped.
pub fn extract_fields(wikitext: &str) -> FieldMap {
    let mut fields = FieldMap::new();
    for template in scan_templates(wikitext) {
        if !template.top_level {
            continue;
        }
        for (name, value) in template.args {
            fields.insert(name, value);
        }
    }
    fields
}

/// One pending span replacement in the output buffer.
#[derive(Debug)]
struct Replacement {
    start: usize,
    end: usize,
    text: String,
}

/// Renders inline wikitext spans into Discord markdown.
pub struct MarkupRenderer {
    break_pattern: Regex,
    tag_pattern: Regex,
    class_pattern: Regex,
}

impl Default for MarkupRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupRenderer {
    pub fn new() -> Self {
        Self {
            break_pattern: Regex::new(r"(?i)<br\s*/?>").unwrap(),
            tag_pattern: Regex::new(r#"(?is)<([a-z]+)((?:[^>"]|"[^"]*")*)>(.*?)</\1>"#).unwrap(),
            class_pattern: Regex::new(r#"class="([^"]*)""#).unwrap(),
        }
    }

    /// Rewrite bold/italic spans, known HTML-like tags, line breaks,
    /// internal links and a small fixed template table into Discord
    /// markdown. Unhandled templates collapse to nothing.
    pub fn render_inline(&self, wikitext: &str) -> String {
        let mut replacements = Vec::new();

        self.collect_emphasis(wikitext, &mut replacements);
        self.collect_tags(wikitext, &mut replacements);
        collect_wikilinks(wikitext, &mut replacements);
        collect_templates(wikitext, &mut replacements);

        apply_replacements(wikitext, replacements)
    }

    /// Bold (`'''`) and italic (`''`) delimiters. Bold is matched first;
    /// italic candidates inside a bold delimiter are skipped.
    fn collect_emphasis(&self, text: &str, out: &mut Vec<Replacement>) {
        let bold: Vec<usize> = find_runs(text, "'''");
        for pair in bold.chunks_exact(2) {
            out.push(Replacement {
                start: pair[0],
                end: pair[0] + 3,
                text: "**".to_owned(),
            });
            out.push(Replacement {
                start: pair[1],
                end: pair[1] + 3,
                text: "**".to_owned(),
            });
        }

        let taken: Vec<(usize, usize)> = bold.iter().map(|&i| (i, i + 3)).collect();
        let italic: Vec<usize> = find_runs(text, "''")
            .into_iter()
            .filter(|&i| !taken.iter().any(|&(s, e)| i >= s && i < e))
            .collect();
        for pair in italic.chunks_exact(2) {
            out.push(Replacement {
                start: pair[0],
                end: pair[0] + 2,
                text: "_".to_owned(),
            });
            out.push(Replacement {
                start: pair[1],
                end: pair[1] + 2,
                text: "_".to_owned(),
            });
        }
    }

    fn collect_tags(&self, text: &str, out: &mut Vec<Replacement>) {
        for m in self.break_pattern.find_iter(text).flatten() {
            out.push(Replacement {
                start: m.start(),
                end: m.end(),
                text: "\n".to_owned(),
            });
        }

        for caps in self.tag_pattern.captures_iter(text).flatten() {
            let (Some(whole), Some(contents)) = (caps.get(0), caps.get(3)) else {
                continue;
            };
            let class = caps
                .get(2)
                .and_then(|attrs| {
                    self.class_pattern
                        .captures(attrs.as_str())
                        .ok()
                        .flatten()
                        .and_then(|c| c.get(1).map(|m| m.as_str().to_owned()))
                })
                .unwrap_or_default();

            let marker = match class.as_str() {
                "inc" | "increase" | "color-blue" | "inco" => "**",
                _ => "",
            };

            out.push(Replacement {
                start: whole.start(),
                end: contents.start(),
                text: marker.to_owned(),
            });
            out.push(Replacement {
                start: contents.end(),
                end: whole.end(),
                text: marker.to_owned(),
            });
        }
    }
}

/// Non-overlapping occurrences of `needle`, longest-run-first semantics:
/// a `'''` at some index consumes all three quotes.
fn find_runs(text: &str, needle: &str) -> Vec<usize> {
    let mut out = Vec::new();
    let mut i = 0;
    while let Some(found) = text[i..].find(needle) {
        let at = i + found;
        out.push(at);
        i = at + needle.len();
    }
    out
}

fn collect_wikilinks(text: &str, out: &mut Vec<Replacement>) {
    let links = scan_wikilinks(text);
    for link in &links {
        let contained = links
            .iter()
            .any(|other| other.span.0 < link.span.0 && link.span.1 < other.span.1);
        if contained {
            continue;
        }

        // Image links and namespaced links are opaque to the renderer.
        // Known limitation: they surface as a placeholder.
        let rendered = if link.has_nested || link.target.contains(':') {
            "<placeholder>".to_owned()
        } else {
            match &link.text {
                Some(display) if !display.is_empty() => {
                    markdown_link(display, &wiki_link(&link.target))
                }
                _ => markdown_link(&link.target, &wiki_link(&link.target)),
            }
        };

        out.push(Replacement {
            start: link.span.0,
            end: link.span.1,
            text: rendered,
        });
    }
}

fn collect_templates(text: &str, out: &mut Vec<Replacement>) {
    for template in scan_templates(text) {
        if template.has_nested {
            continue;
        }
        let rendered = match template.name.as_str() {
            "star" => "\u{2605}".to_owned(),
            _ => String::new(),
        };
        out.push(Replacement {
            start: template.span.0,
            end: template.span.1,
            text: rendered,
        });
    }
}

/// Apply span replacements back-to-front. Overlapping spans keep the
/// earliest-starting replacement and drop the rest.
fn apply_replacements(text: &str, mut replacements: Vec<Replacement>) -> String {
    replacements.sort_by_key(|r| (r.start, r.end));

    let mut accepted: Vec<Replacement> = Vec::with_capacity(replacements.len());
    for repl in replacements {
        if accepted
            .last()
            .map(|prev| repl.start < prev.end)
            .unwrap_or(false)
        {
            continue;
        }
        accepted.push(repl);
    }

    let mut output = text.to_owned();
    for repl in accepted.iter().rev() {
        output.replace_range(repl.start..repl.end, &repl.text);
    }
    output
}
