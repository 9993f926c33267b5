//! Parses Markdown into a [`Document`]: a flat list of top-level [`Block`]s.
//! Headings and code blocks are lifted out of the event stream so that
//! document transforms (see [`crate::toc`]) can inspect and replace them;
//! every other block keeps its original [`pulldown_cmark`] events and is
//! rendered unchanged by [`crate::htmlrenderer`].

use crate::htmlrenderer::HtmlRenderer;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag};
use std::collections::HashMap;
use std::io;
use url::{ParseError, Url};

/// A parsed Markdown document.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Document<'a> {
    pub blocks: Vec<Block<'a>>,
}

/// A top-level block of a [`Document`].
#[derive(Clone, Debug, PartialEq)]
pub enum Block<'a> {
    Heading(Heading<'a>),
    Code(CodeBlock<'a>),

    /// Raw HTML emitted verbatim. Transforms use this to splice generated
    /// markup into a document.
    Html(String),

    /// Any other block, kept as the events that make it up.
    Other(Vec<Event<'a>>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Heading<'a> {
    /// 1 for `#`, 2 for `##`, etc.
    pub depth: u32,

    /// The heading's plain text (inline markup stripped).
    pub text: String,

    /// The heading's `id` attribute, unique within the document.
    pub anchor: String,

    /// The inline events between the heading's start and end tags.
    pub inlines: Vec<Event<'a>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CodeBlock<'a> {
    /// The first word of a fenced block's info string, if any.
    pub lang: Option<String>,

    /// The literal contents of the block.
    pub value: String,

    /// The events that make up the block, start and end tags included.
    pub events: Vec<Event<'a>>,
}

impl<'a> Document<'a> {
    /// Returns the document's headings in order.
    pub fn headings(&self) -> impl Iterator<Item = &Heading<'a>> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Heading(heading) => Some(heading),
            _ => None,
        })
    }

    /// Resolves relative link and image destinations against `base` (the URL
    /// of the directory the source file lives in), so that references to
    /// files next to the source still work once the page is rendered
    /// elsewhere. Absolute URLs, fragments and email links are kept as is.
    pub fn resolve_links(self, base: &Url) -> Result<Document<'a>, ParseError> {
        let resolve = |events: Vec<Event<'a>>| -> Result<Vec<Event<'a>>, ParseError> {
            events
                .into_iter()
                .map(|event| match event {
                    Event::Start(tag) => Ok(Event::Start(resolve_tag(tag, base)?)),
                    event => Ok(event),
                })
                .collect()
        };

        let mut blocks = Vec::with_capacity(self.blocks.len());
        for block in self.blocks {
            blocks.push(match block {
                Block::Heading(mut heading) => {
                    heading.inlines = resolve(heading.inlines)?;
                    Block::Heading(heading)
                }
                Block::Other(events) => Block::Other(resolve(events)?),
                block => block,
            });
        }
        Ok(Document { blocks })
    }

    /// Renders the document to HTML, appending to `out`. Footnote references
    /// are prefixed with `footnote_prefix` (typically the post's URL) so
    /// they resolve even when rendered outside the post page.
    pub fn push_html(
        &self,
        out: &mut String,
        footnote_prefix: &str,
    ) -> io::Result<()> {
        HtmlRenderer::with_footnote_prefix(footnote_prefix).render(out, self)
    }
}

fn resolve_tag<'a>(tag: Tag<'a>, base: &Url) -> Result<Tag<'a>, ParseError> {
    Ok(match tag {
        Tag::Link(LinkType::Email, dest, title) => Tag::Link(LinkType::Email, dest, title),
        Tag::Link(link_type, dest, title) => Tag::Link(link_type, resolve_url(dest, base)?, title),
        Tag::Image(link_type, dest, title) => Tag::Image(link_type, resolve_url(dest, base)?, title),
        tag => tag,
    })
}

fn resolve_url<'a>(dest: CowStr<'a>, base: &Url) -> Result<CowStr<'a>, ParseError> {
    if dest.is_empty() || dest.starts_with('#') {
        return Ok(dest);
    }
    match Url::parse(&dest) {
        Ok(_) => Ok(dest),
        Err(ParseError::RelativeUrlWithoutBase) => Ok(CowStr::from(base.join(&dest)?.to_string())),
        Err(err) => Err(err),
    }
}

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Parses `markdown` into a [`Document`].
pub fn parse(markdown: &str) -> Document<'_> {
    let mut anchors = Anchors::default();
    let mut blocks = Vec::new();
    let mut current: Vec<Event> = Vec::new();
    let mut depth = 0usize;

    for event in Parser::new_ext(markdown, options()) {
        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
        current.push(event);
        if depth == 0 {
            blocks.push(to_block(std::mem::take(&mut current), &mut anchors));
        }
    }

    // The parser always balances its tags, but don't drop trailing events
    // if it ever doesn't.
    if !current.is_empty() {
        blocks.push(Block::Other(current));
    }

    Document { blocks }
}

fn to_block<'a>(events: Vec<Event<'a>>, anchors: &mut Anchors) -> Block<'a> {
    match events.first() {
        Some(Event::Start(Tag::Heading(depth))) => {
            let depth = *depth;
            let inlines = inner(events);
            let text = plain_text(&inlines);
            Block::Heading(Heading {
                depth,
                anchor: anchors.claim(&text),
                text,
                inlines,
            })
        }
        Some(Event::Start(Tag::CodeBlock(kind))) => {
            let lang = match kind {
                CodeBlockKind::Fenced(info) => info
                    .split(' ')
                    .next()
                    .filter(|lang| !lang.is_empty())
                    .map(str::to_owned),
                CodeBlockKind::Indented => None,
            };
            let value = plain_text(&events);
            Block::Code(CodeBlock {
                lang,
                value,
                events,
            })
        }
        _ => Block::Other(events),
    }
}

// Strips the outer start and end tags from a block's events.
fn inner(mut events: Vec<Event>) -> Vec<Event> {
    events.pop();
    if !events.is_empty() {
        events.remove(0);
    }
    events
}

fn plain_text(events: &[Event]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(s) | Event::Code(s) => text.push_str(s),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

/// Hands out heading anchors, appending `-1`, `-2`, etc. to repeated slugs
/// so that every heading in a document gets a distinct `id`.
#[derive(Default)]
struct Anchors {
    seen: HashMap<String, usize>,
}

impl Anchors {
    fn claim(&mut self, text: &str) -> String {
        let base = slug::slugify(text);
        let mut anchor = base.clone();
        while self.seen.contains_key(&anchor) {
            let count = self.seen.entry(base.clone()).or_insert(0);
            *count += 1;
            anchor = format!("{}-{}", base, count);
        }
        self.seen.insert(anchor.clone(), 0);
        anchor
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_lifts_headings_and_code() {
        let doc = parse("# Hello *World*\n\nSome text.\n\n```rust\nfn main() {}\n```\n");
        assert_eq!(3, doc.blocks.len());
        match &doc.blocks[0] {
            Block::Heading(h) => {
                assert_eq!(1, h.depth);
                assert_eq!("Hello World", h.text);
                assert_eq!("hello-world", h.anchor);
            }
            other => panic!("wanted heading; found {:?}", other),
        }
        assert!(matches!(&doc.blocks[1], Block::Other(_)));
        match &doc.blocks[2] {
            Block::Code(code) => {
                assert_eq!(Some("rust"), code.lang.as_deref());
                assert_eq!("fn main() {}\n", code.value);
            }
            other => panic!("wanted code block; found {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_heading_anchors() {
        let doc = parse("## Setup\n\n## Setup\n\n## Setup\n");
        let anchors: Vec<&str> =
            doc.headings().map(|h| h.anchor.as_str()).collect();
        assert_eq!(vec!["setup", "setup-1", "setup-2"], anchors);
    }

    #[test]
    fn test_indented_code_has_no_lang() {
        let doc = parse("    indented\n");
        match &doc.blocks[0] {
            Block::Code(code) => assert_eq!(None, code.lang),
            other => panic!("wanted code block; found {:?}", other),
        }
    }

    #[test]
    fn test_push_html() -> io::Result<()> {
        let doc = parse("## Intro\n\nHello, *world*.\n");
        let mut out = String::new();
        doc.push_html(&mut out, "")?;
        assert_eq!(
            "<h2 id=\"intro\">Intro</h2>\n<p>Hello, <em>world</em>.</p>\n",
            out
        );
        Ok(())
    }

    #[test]
    fn test_resolve_links() -> Result<(), ParseError> {
        let base = Url::parse("https://example.org/posts/bundle/")?;
        let doc = parse(
            "![cat](img/cat.jpg) [next](../other.html) [top](#top) [home](https://example.com/)\n",
        )
        .resolve_links(&base)?;
        let mut out = String::new();
        doc.push_html(&mut out, "").unwrap();
        assert!(out.contains("src=\"https://example.org/posts/bundle/img/cat.jpg\""), "{}", out);
        assert!(out.contains("href=\"https://example.org/posts/other.html\""), "{}", out);
        assert!(out.contains("href=\"#top\""), "{}", out);
        assert!(out.contains("href=\"https://example.com/\""), "{}", out);
        Ok(())
    }
}
