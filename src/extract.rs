//! Text extraction for fetched documents (HTML pages, PDF bytes).
//!
//! Extraction is pipeline-layer: collectors supply bytes or markup, this
//! module returns plain UTF-8 text. HTML handling is best-effort by design:
//! pages in the wild are not well-formed XML, so reader errors end the scan
//! and whatever text was gathered so far is kept.

use crate::error::IngestError;

/// Elements whose text content is never page copy.
const SKIPPED_ELEMENTS: &[&[u8]] = &[b"script", b"style", b"noscript"];

/// Page chrome skipped in addition when falling back to whole-body scans.
const CHROME_ELEMENTS: &[&[u8]] = &[b"nav", b"header", b"footer", b"aside"];

/// HTML void elements: they produce no end tag, so they must not count
/// toward element depth.
const VOID_ELEMENTS: &[&[u8]] = &[
    b"area", b"base", b"br", b"col", b"embed", b"hr", b"img", b"input", b"link", b"meta",
    b"source", b"track", b"wbr",
];

/// Elements that imply a line break around their content.
const BLOCK_ELEMENTS: &[&[u8]] = &[
    b"p", b"div", b"h1", b"h2", b"h3", b"h4", b"h5", b"h6", b"li", b"ul", b"ol", b"tr",
    b"table", b"blockquote", b"section", b"article", b"main", b"pre",
];

/// Matches one candidate content container by tag, and optionally by `id` or
/// by one of its `class` values.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    tag: &'static str,
    id: Option<&'static str>,
    class: Option<&'static str>,
}

impl Matcher {
    pub const fn tag(tag: &'static str) -> Self {
        Matcher { tag, id: None, class: None }
    }

    pub const fn id(tag: &'static str, id: &'static str) -> Self {
        Matcher { tag, id: Some(id), class: None }
    }

    pub const fn class(tag: &'static str, class: &'static str) -> Self {
        Matcher { tag, id: None, class: Some(class) }
    }

    fn matches(&self, name: &[u8], e: &quick_xml::events::BytesStart) -> bool {
        if !name.eq_ignore_ascii_case(self.tag.as_bytes()) {
            return false;
        }
        if let Some(id) = self.id {
            if attr_value(e, b"id").as_deref() != Some(id) {
                return false;
            }
        }
        if let Some(class) = self.class {
            let classes = attr_value(e, b"class").unwrap_or_default();
            if !classes.split_whitespace().any(|c| c.eq_ignore_ascii_case(class)) {
                return false;
            }
        }
        true
    }
}

/// What to pull out of a page.
#[derive(Debug, Clone, Copy)]
pub enum Target {
    /// Text of the first element matching one of the matchers, with generic
    /// containers and then the whole body as fallbacks.
    Container(&'static [Matcher]),
    /// Concatenated `<pre>` blocks, no fallback. Used for tab pages where
    /// everything outside the tab rendering is noise.
    PreBlocks,
}

/// Per-site extraction rule, selected by domain substring.
pub struct SiteRule {
    domains: &'static [&'static str],
    pub target: Target,
}

const SITE_RULES: &[SiteRule] = &[
    SiteRule {
        domains: &["musictheory.net"],
        target: Target::Container(&[Matcher::id("div", "content")]),
    },
    SiteRule {
        domains: &["guitarinstitute.com"],
        target: Target::Container(&[Matcher::tag("main"), Matcher::class("div", "content")]),
    },
    SiteRule {
        domains: &["openmusictheory.github.io", "openmusictheory.com"],
        target: Target::Container(&[Matcher::class("div", "page-content"), Matcher::tag("main")]),
    },
    SiteRule {
        domains: &["iconcollective.edu"],
        target: Target::Container(&[Matcher::tag("article"), Matcher::class("div", "content")]),
    },
    SiteRule {
        domains: &["jazzadvice.com"],
        target: Target::Container(&[Matcher::class("div", "post-content"), Matcher::tag("article")]),
    },
    SiteRule {
        domains: &["premierguitar.com"],
        target: Target::Container(&[Matcher::tag("article"), Matcher::class("div", "article-body")]),
    },
    SiteRule {
        domains: &["ultimate-guitar.com"],
        target: Target::PreBlocks,
    },
];

/// Containers tried for sites without a dedicated rule.
pub const GENERIC_CONTAINERS: &[Matcher] = &[
    Matcher::tag("main"),
    Matcher::tag("article"),
    Matcher::id("div", "content"),
    Matcher::class("div", "content"),
    Matcher::class("div", "post-content"),
];

/// Look up the extraction rule for a URL by domain substring.
pub fn site_rule_for(url: &str) -> Option<&'static SiteRule> {
    SITE_RULES
        .iter()
        .find(|rule| rule.domains.iter().any(|d| url.contains(d)))
}

/// Extract the main text of a page under the given rule (generic container
/// scan when no rule applies). Never fails; unusable pages come back empty
/// and the caller decides whether that is worth logging.
pub fn extract_main_text(html: &str, rule: Option<&SiteRule>) -> String {
    let matchers = match rule.map(|r| r.target) {
        Some(Target::PreBlocks) => return collect_pre_blocks(html),
        Some(Target::Container(matchers)) => matchers,
        None => GENERIC_CONTAINERS,
    };
    let text = collect(html, matchers, false);
    if !text.is_empty() {
        return text;
    }
    let text = collect(html, GENERIC_CONTAINERS, false);
    if !text.is_empty() {
        return text;
    }
    collect(html, &[Matcher::tag("body")], true)
}

/// Page title: `<title>` text, else the first `<h1>`, else `None`.
pub fn page_title(html: &str) -> Option<String> {
    let mut reader = quick_xml::Reader::from_reader(html.as_bytes());
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = false;
    let mut buf = Vec::new();
    let mut in_title = false;
    let mut in_h1 = false;
    let mut title = String::new();
    let mut h1 = String::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                let name = e.local_name().as_ref().to_ascii_lowercase();
                if name == b"title" {
                    in_title = true;
                } else if name == b"h1" && h1.is_empty() {
                    in_h1 = true;
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                let name = e.local_name().as_ref().to_ascii_lowercase();
                if name == b"title" {
                    in_title = false;
                    if !title.trim().is_empty() {
                        break;
                    }
                } else if name == b"h1" {
                    in_h1 = false;
                }
            }
            Ok(quick_xml::events::Event::Text(t)) => {
                if in_title {
                    title.push_str(&html_text(&t));
                } else if in_h1 {
                    h1.push_str(&html_text(&t));
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    for candidate in [title, h1] {
        let flat: String = candidate.split_whitespace().collect::<Vec<_>>().join(" ");
        if !flat.is_empty() {
            return Some(flat);
        }
    }
    None
}

/// Extract plain text from PDF bytes.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, IngestError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| IngestError::Parse(format!("pdf: {e}")))
}

/// Scan for the first element matching one of `matchers` and gather its
/// text, skipping scripts and styles (plus page chrome when `skip_chrome`).
/// Inline whitespace is collapsed; block elements become line breaks; `<pre>`
/// content keeps its internal line structure.
fn collect(html: &str, matchers: &[Matcher], skip_chrome: bool) -> String {
    let mut reader = quick_xml::Reader::from_reader(html.as_bytes());
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = false;
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut depth = 0usize;
    let mut skip = 0usize;
    let mut pre = 0usize;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                let name = e.local_name().as_ref().to_ascii_lowercase();
                if depth == 0 {
                    if matchers.iter().any(|m| m.matches(&name, &e)) {
                        depth = 1;
                    }
                } else if VOID_ELEMENTS.contains(&name.as_slice()) {
                    if skip == 0 && (name == b"br" || name == b"hr") {
                        push_block_break(&mut out);
                    }
                } else {
                    depth += 1;
                    if is_skipped(&name, skip_chrome) {
                        skip += 1;
                    } else if name == b"pre" {
                        pre += 1;
                    }
                    if skip == 0 && BLOCK_ELEMENTS.contains(&name.as_slice()) {
                        push_block_break(&mut out);
                    }
                }
            }
            Ok(quick_xml::events::Event::Empty(e)) => {
                if depth > 0 && skip == 0 {
                    let name = e.local_name().as_ref().to_ascii_lowercase();
                    if name == b"br" || name == b"hr" {
                        push_block_break(&mut out);
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if depth == 0 {
                    buf.clear();
                    continue;
                }
                let name = e.local_name().as_ref().to_ascii_lowercase();
                if VOID_ELEMENTS.contains(&name.as_slice()) {
                    buf.clear();
                    continue;
                }
                if is_skipped(&name, skip_chrome) && skip > 0 {
                    skip -= 1;
                } else if name == b"pre" && pre > 0 {
                    pre -= 1;
                }
                depth -= 1;
                if depth == 0 {
                    break;
                }
                if skip == 0 && BLOCK_ELEMENTS.contains(&name.as_slice()) {
                    push_block_break(&mut out);
                }
            }
            Ok(quick_xml::events::Event::Text(t)) => {
                if depth > 0 && skip == 0 {
                    let text = html_text(&t);
                    if pre > 0 {
                        out.push_str(&text);
                    } else {
                        push_collapsed(&mut out, &text);
                    }
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    out.trim().to_string()
}

/// Gather the raw text of every top-level `<pre>` block, joined by blank
/// lines. Tab bodies must keep their line structure, so nothing is collapsed.
fn collect_pre_blocks(html: &str) -> String {
    let mut reader = quick_xml::Reader::from_reader(html.as_bytes());
    reader.config_mut().check_end_names = false;
    let mut buf = Vec::new();
    let mut blocks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut pre = 0usize;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref().eq_ignore_ascii_case(b"pre") {
                    pre += 1;
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref().eq_ignore_ascii_case(b"pre") && pre > 0 {
                    pre -= 1;
                    if pre == 0 {
                        let block = current.trim().to_string();
                        if !block.is_empty() {
                            blocks.push(block);
                        }
                        current.clear();
                    }
                }
            }
            Ok(quick_xml::events::Event::Text(t)) => {
                if pre > 0 {
                    current.push_str(&html_text(&t));
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    blocks.join("\n\n")
}

fn is_skipped(name: &[u8], skip_chrome: bool) -> bool {
    SKIPPED_ELEMENTS.contains(&name) || (skip_chrome && CHROME_ELEMENTS.contains(&name))
}

/// Append text with runs of whitespace collapsed to single spaces, joining
/// onto the previous fragment with a space unless a line break precedes.
fn push_collapsed(out: &mut String, text: &str) {
    for word in text.split_whitespace() {
        if !out.is_empty() && !out.ends_with(['\n', ' ']) {
            out.push(' ');
        }
        out.push_str(word);
    }
}

/// Append a line break, trimming trailing spaces first. At most one blank
/// line accumulates.
fn push_block_break(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
    if !out.is_empty() && !out.ends_with("\n\n") {
        out.push('\n');
    }
}

/// Unescape a text node, resolving the common HTML entities quick-xml does
/// not know. Falls back to the raw bytes on unknown entities.
fn html_text(t: &quick_xml::events::BytesText) -> String {
    match t.unescape_with(resolve_html_entity) {
        Ok(text) => text.into_owned(),
        Err(_) => String::from_utf8_lossy(t.as_ref()).into_owned(),
    }
}

fn resolve_html_entity(entity: &str) -> Option<&'static str> {
    match entity {
        "nbsp" => Some(" "),
        "ndash" | "mdash" => Some("-"),
        "rsquo" | "lsquo" => Some("'"),
        "ldquo" | "rdquo" => Some("\""),
        "hellip" => Some("..."),
        "copy" => Some("(c)"),
        _ => None,
    }
}

fn attr_value(e: &quick_xml::events::BytesStart, name: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref().eq_ignore_ascii_case(name) {
            return match attr.unescape_value() {
                Ok(v) => Some(v.into_owned()),
                Err(_) => Some(String::from_utf8_lossy(&attr.value).into_owned()),
            };
        }
    }
    None
}
