//! Markdown to HTML.
//!
//! Rendering is a pure function of the text (plus an optional find keyword):
//! it produces the HTML body, the table of contents and the list of code
//! blocks that can be copied. Nothing here touches the session or the store.

use crate::find::find_matches;
use crate::model::Theme;
use chrono::{DateTime, Local};
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

const SLUG_MAX_CHARS: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// 1 to 3
    pub level: u8,
    pub text: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub lang: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    pub toc: Vec<TocEntry>,
    pub code_blocks: Vec<CodeBlock>,
    /// Number of `<mark>` highlights inserted for the find keyword
    pub hits: usize,
    /// True when the renderer failed and the text is shown verbatim
    pub fallback: bool,
}

fn options() -> Options {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts.insert(Options::ENABLE_FOOTNOTES);
    opts
}

/// Renders `markdown`, highlighting `keyword` outside code when it is
/// non-blank. A renderer panic degrades to the escaped text in a `<pre>`.
pub fn render(markdown: &str, keyword: Option<&str>) -> Rendered {
    let keyword = keyword.map(str::trim).filter(|k| !k.is_empty());
    match panic::catch_unwind(AssertUnwindSafe(|| render_markdown(markdown, keyword))) {
        Ok(rendered) => rendered,
        Err(_) => {
            warn!("markdown renderer failed, showing plain text");
            Rendered {
                html: format!("<pre>{}</pre>", escape_html(markdown)),
                fallback: true,
                ..Default::default()
            }
        }
    }
}

fn render_markdown(markdown: &str, keyword: Option<&str>) -> Rendered {
    let events: Vec<Event> = Parser::new_ext(markdown, options()).collect();
    let heading_ids = assign_heading_ids(&events);

    let mut rendered = Rendered::default();
    let mut out: Vec<Event> = Vec::with_capacity(events.len());
    let mut headings = heading_ids.into_iter();
    let mut current_heading: Option<(u8, String, String)> = None;
    let mut code: Option<CodeBlock> = None;
    let mut image_depth = 0usize;

    for event in events {
        match event {
            Event::Start(Tag::Heading {
                level,
                classes,
                attrs,
                ..
            }) => {
                let id = headings.next().unwrap_or_default();
                current_heading = Some((heading_rank(level), id.clone(), String::new()));
                out.push(Event::Start(Tag::Heading {
                    level,
                    id: Some(CowStr::from(id)),
                    classes,
                    attrs,
                }));
            }
            Event::End(TagEnd::Heading(level)) => {
                if let Some((rank, id, text)) = current_heading.take() {
                    if rank <= 3 {
                        let text = text.trim();
                        rendered.toc.push(TocEntry {
                            level: rank,
                            text: if text.is_empty() {
                                "(untitled)".to_string()
                            } else {
                                text.to_string()
                            },
                            id,
                        });
                    }
                }
                out.push(Event::End(TagEnd::Heading(level)));
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match &kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(|s| s.to_string()),
                    CodeBlockKind::Indented => None,
                };
                code = Some(CodeBlock {
                    lang,
                    text: String::new(),
                });
                out.push(Event::Start(Tag::CodeBlock(kind)));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(block) = code.take() {
                    rendered.code_blocks.push(block);
                }
                out.push(Event::End(TagEnd::CodeBlock));
            }
            Event::Start(Tag::Link {
                dest_url, title, ..
            }) => {
                let title_attr = if title.is_empty() {
                    String::new()
                } else {
                    format!(" title=\"{}\"", escape_html(&title))
                };
                out.push(Event::InlineHtml(CowStr::from(format!(
                    "<a href=\"{}\"{} target=\"_blank\" rel=\"noopener noreferrer\">",
                    escape_href(&dest_url),
                    title_attr
                ))));
            }
            Event::End(TagEnd::Link) => out.push(Event::InlineHtml(CowStr::from("</a>"))),
            Event::Start(Tag::Image { .. }) => {
                image_depth += 1;
                out.push(event);
            }
            Event::End(TagEnd::Image) => {
                image_depth = image_depth.saturating_sub(1);
                out.push(event);
            }
            Event::SoftBreak => out.push(Event::HardBreak),
            Event::Code(ref text) => {
                if let Some((_, _, heading_text)) = current_heading.as_mut() {
                    heading_text.push_str(text);
                }
                out.push(event);
            }
            Event::Text(text) => {
                if let Some(block) = code.as_mut() {
                    block.text.push_str(&text);
                    out.push(Event::Text(text));
                    continue;
                }
                if let Some((_, _, heading_text)) = current_heading.as_mut() {
                    heading_text.push_str(&text);
                }
                match keyword {
                    Some(keyword) if image_depth == 0 => {
                        rendered.hits += highlight(&text, keyword, &mut out);
                    }
                    _ => out.push(Event::Text(text)),
                }
            }
            other => out.push(other),
        }
    }

    html::push_html(&mut rendered.html, out.into_iter());
    rendered
}

/// Splits `text` around case-insensitive hits, wrapping each in `<mark>`.
fn highlight<'a>(text: &str, keyword: &str, out: &mut Vec<Event<'a>>) -> usize {
    let matches = find_matches(text, keyword);
    if matches.is_empty() {
        out.push(Event::Text(CowStr::from(text.to_string())));
        return 0;
    }
    let mut last = 0;
    for &(start, end) in &matches {
        if start > last {
            out.push(Event::Text(CowStr::from(text[last..start].to_string())));
        }
        out.push(Event::InlineHtml(CowStr::from("<mark>")));
        out.push(Event::Text(CowStr::from(text[start..end].to_string())));
        out.push(Event::InlineHtml(CowStr::from("</mark>")));
        last = end;
    }
    if last < text.len() {
        out.push(Event::Text(CowStr::from(text[last..].to_string())));
    }
    matches.len()
}

fn heading_rank(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// One id per heading, in document order.
fn assign_heading_ids(events: &[Event]) -> Vec<String> {
    let mut slugger = Slugger::default();
    let mut ids = Vec::new();
    let mut text: Option<String> = None;
    for event in events {
        match event {
            Event::Start(Tag::Heading { .. }) => text = Some(String::new()),
            Event::Text(t) | Event::Code(t) => {
                if let Some(buf) = text.as_mut() {
                    buf.push_str(t);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                let heading = text.take().unwrap_or_default();
                ids.push(slugger.slug(&heading));
            }
            _ => {}
        }
    }
    ids
}

/// Lowercase, keep ASCII word characters, CJK ideographs, whitespace and
/// hyphens, collapse whitespace runs into `-`, cap at 80 characters.
pub fn slugify(text: &str) -> String {
    let kept: String = text
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| {
            c.is_ascii_alphanumeric()
                || *c == '_'
                || *c == '-'
                || c.is_whitespace()
                || ('\u{4e00}'..='\u{9fff}').contains(c)
        })
        .collect();

    let mut slug = String::with_capacity(kept.len());
    let mut in_space = false;
    for c in kept.chars() {
        if c.is_whitespace() {
            if !in_space {
                slug.push('-');
            }
            in_space = true;
        } else {
            slug.push(c);
            in_space = false;
        }
    }
    slug.chars().take(SLUG_MAX_CHARS).collect()
}

/// Hands out unique heading ids for one document.
#[derive(Debug, Default)]
pub struct Slugger {
    used: HashSet<String>,
    ordinal: usize,
}

impl Slugger {
    pub fn slug(&mut self, text: &str) -> String {
        self.ordinal += 1;
        let mut base = slugify(text);
        if base.is_empty() {
            base = format!("h-{}", self.ordinal);
        }
        if self.used.insert(base.clone()) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}-{}", base, n);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Escape text for HTML bodies and quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    // Writing into a String cannot fail
    let _ = pulldown_cmark_escape::escape_html(&mut out, s);
    out
}

fn escape_href(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let _ = pulldown_cmark_escape::escape_href(&mut out, s);
    out
}

/// `Source: <descriptor> • Size: 1,234 chars • Rendered: <time>`
pub fn meta_line(descriptor: &str, chars: usize, when: DateTime<Local>) -> String {
    format!(
        "Source: {} • Size: {} chars • Rendered: {}",
        descriptor,
        group_thousands(chars),
        when.format("%Y-%m-%d %H:%M:%S")
    )
}

fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// What goes around a rendered body when it is written out as a page.
#[derive(Debug, Clone)]
pub struct PageOptions<'a> {
    pub title: &'a str,
    pub theme: Theme,
    pub scroll: u64,
    pub meta: &'a str,
}

const PAGE_STYLE: &str = r#"
:root[data-theme="dark"] { --bg:#0f1115; --fg:#e6e6e6; --muted:#9aa0a6; --code:#1a1d24; --mark:#b8860b; }
:root[data-theme="light"] { --bg:#ffffff; --fg:#1f2328; --muted:#59636e; --code:#f6f8fa; --mark:#fff3a3; }
:root[data-theme="eye"] { --bg:#f4ecd8; --fg:#3b3125; --muted:#7a6a55; --code:#ebe0c6; --mark:#e8c468; }
body { background:var(--bg); color:var(--fg); font-family:system-ui,sans-serif; line-height:1.6; margin:0; display:flex; }
nav.toc { width:240px; padding:16px; font-size:13px; }
nav.toc a { display:block; color:var(--muted); text-decoration:none; }
nav.toc a.l2 { margin-left:10px; } nav.toc a.l3 { margin-left:20px; }
main { flex:1; padding:16px 24px; min-width:0; }
.meta { color:var(--muted); font-size:12px; }
pre { background:var(--code); padding:12px; white-space:pre; overflow-x:auto; position:relative; }
mark { background:var(--mark); }
.copybtn { position:absolute; top:4px; left:4px; font-size:11px; }
"#;

const PAGE_SCRIPT: &str = r#"
document.querySelectorAll("pre > code").forEach(function (code) {
  var btn = document.createElement("button");
  btn.className = "copybtn"; btn.type = "button"; btn.textContent = "Copy";
  btn.addEventListener("click", function () {
    var text = code.innerText || code.textContent || "";
    navigator.clipboard.writeText(text).then(function () {
      btn.textContent = "Copied"; setTimeout(function () { btn.textContent = "Copy"; }, 900);
    }, function () { prompt("Copy the text below:", text); });
  });
  code.parentElement.appendChild(btn);
});
window.scrollTo(0, parseInt(document.body.dataset.scroll, 10) || 0);
"#;

/// Wraps a rendered body into a standalone HTML page with the theme applied.
pub fn page(rendered: &Rendered, opts: &PageOptions) -> String {
    let mut toc = String::new();
    if rendered.toc.is_empty() {
        toc.push_str("<div class=\"meta\">(no H1-H3 headings)</div>");
    }
    for entry in &rendered.toc {
        toc.push_str(&format!(
            "<a class=\"l{}\" href=\"#{}\">{}</a>\n",
            entry.level,
            escape_html(&entry.id),
            escape_html(&entry.text)
        ));
    }

    format!(
        "<!doctype html>\n<html data-theme=\"{theme}\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>{style}</style>\n</head>\n\
         <body data-scroll=\"{scroll}\">\n<nav class=\"toc\">\n{toc}</nav>\n<main>\n\
         <div class=\"meta\">{meta}</div>\n{body}</main>\n<script>{script}</script>\n</body>\n</html>\n",
        theme = opts.theme.as_str(),
        title = escape_html(opts.title),
        style = PAGE_STYLE,
        scroll = opts.scroll,
        toc = toc,
        meta = escape_html(opts.meta),
        body = rendered.html,
        script = PAGE_SCRIPT,
    )
}
