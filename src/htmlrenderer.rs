//! Renders a [`Document`] to HTML. This is a custom renderer rather than
//! [`pulldown_cmark::html::push_html`] for three reasons:
//!
//! * footnote references need a configurable prefix. A post's excerpt is shown
//!   on listing pages while its footnote definitions only exist on the post
//!   page, so references must link to `{post_url}#{footnote}`;
//! * headings lifted into [`Block::Heading`] carry an `id` so the table of
//!   contents (see [`crate::toc`]) can link to them;
//! * [`Block::Html`] nodes spliced in by document transforms are emitted
//!   verbatim.

use crate::markdown::{Block, Document, Heading};
use pulldown_cmark::escape::{escape_href, escape_html, StrWrite};
use pulldown_cmark::{Alignment, CodeBlockKind, CowStr, Event, LinkType, Tag};
use std::fmt::{self, Display};
use std::io;

// Bridges `fmt::Write` to pulldown-cmark's `StrWrite` so the escaping helpers
// can be used inside `Display` impls.
struct Adaptor<'a, T> {
    formatter: &'a mut T,
    result: fmt::Result,
}

impl<T> Adaptor<'_, T> {
    fn handle_result(&mut self, result: fmt::Result) -> io::Result<()> {
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                self.result = result;
                Err(io::Error::new(io::ErrorKind::Other, e))
            }
        }
    }
}

impl<T: fmt::Write> StrWrite for Adaptor<'_, T> {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        let result = self.formatter.write_str(s);
        self.handle_result(result)
    }

    fn write_fmt(&mut self, args: fmt::Arguments) -> io::Result<()> {
        let result = self.formatter.write_fmt(args);
        self.handle_result(result)
    }
}

pub(crate) struct EscapeHref<'a>(pub(crate) CowStr<'a>);

impl<'a> Display for EscapeHref<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adaptor = Adaptor {
            formatter: f,
            result: Ok(()),
        };
        let _ = escape_href(&mut adaptor, &self.0);
        adaptor.result
    }
}

pub(crate) struct EscapeHtml<'a>(pub(crate) CowStr<'a>);

impl<'a> Display for EscapeHtml<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adaptor = Adaptor {
            formatter: f,
            result: Ok(()),
        };
        let _ = escape_html(&mut adaptor, &self.0);
        adaptor.result
    }
}

enum TableState {
    Head,
    Body,
}

/// Renders [`Document`]s into HTML. The event handling is largely modeled
/// after [`pulldown_cmark`]'s private `HtmlWriter`.
pub(crate) struct HtmlRenderer {
    table_alignments: Vec<Alignment>,
    table_state: TableState,
    table_cell_index: usize,

    /// Set while inside an image; holds the image title. Text events are
    /// written into the `alt` attribute until the image ends.
    image_title: Option<String>,

    /// The prefix to prepend onto footnote links.
    footnote_prefix: String,
}

impl HtmlRenderer {
    pub(crate) fn with_footnote_prefix(footnote_prefix: &str) -> Self {
        HtmlRenderer {
            table_alignments: Vec::default(),
            table_state: TableState::Head,
            table_cell_index: usize::default(),
            image_title: None,
            footnote_prefix: footnote_prefix.to_owned(),
        }
    }

    /// Renders every block of `document` into `w`, one block per line.
    pub(crate) fn render<W: StrWrite>(
        &mut self,
        w: &mut W,
        document: &Document,
    ) -> io::Result<()> {
        for block in &document.blocks {
            match block {
                Block::Heading(heading) => self.on_heading(w, heading)?,
                Block::Code(code) => self.on_events(w, &code.events)?,
                Block::Html(html) => w.write_str(html)?,
                Block::Other(events) => self.on_events(w, events)?,
            }
            w.write_str("\n")?;
        }
        Ok(())
    }

    fn on_heading<W: StrWrite>(
        &mut self,
        w: &mut W,
        heading: &Heading,
    ) -> io::Result<()> {
        write!(
            w,
            r#"<h{} id="{}">"#,
            heading.depth,
            EscapeHtml(CowStr::Borrowed(&heading.anchor)),
        )?;
        self.on_events(w, &heading.inlines)?;
        write!(w, "</h{}>", heading.depth)
    }

    fn on_events<W: StrWrite>(
        &mut self,
        w: &mut W,
        events: &[Event],
    ) -> io::Result<()> {
        for event in events {
            self.on_event(w, event.clone())?;
        }
        Ok(())
    }

    fn on_event<'a, W: StrWrite>(
        &mut self,
        w: &mut W,
        event: Event<'a>,
    ) -> io::Result<()> {
        if self.image_title.is_some() {
            return self.on_image_event(w, event);
        }
        match event {
            Event::Start(tag) => self.on_start(w, tag),
            Event::End(tag) => self.on_end(w, tag),
            Event::Code(code) => {
                write!(w, "<code>{}</code>", EscapeHtml(code))
            }
            Event::FootnoteReference(name) => write!(
                w,
                r#"<sup class="footnote-reference"><a href="{}#{}">{}</a></sup>"#,
                EscapeHtml(CowStr::from(self.footnote_prefix.as_str())),
                EscapeHtml(name.clone()),
                EscapeHtml(name),
            ),
            Event::HardBreak => w.write_str("<br />\n"),
            Event::Html(html) => w.write_str(&html),
            Event::Rule => w.write_str("<hr />"),
            Event::SoftBreak => w.write_str("\n"),
            Event::TaskListMarker(checked) => write!(
                w,
                r#"<input disabled="" type="checkbox" {}/>"#,
                match checked {
                    true => r#"checked="" "#,
                    false => "",
                }
            ),
            Event::Text(text) => escape_html(w, &text),
        }
    }

    // Inside an image only text makes it into the output (as alt text); any
    // inline markup in the alt is dropped.
    fn on_image_event<'a, W: StrWrite>(
        &mut self,
        w: &mut W,
        event: Event<'a>,
    ) -> io::Result<()> {
        match event {
            Event::Text(text) | Event::Code(text) => escape_html(w, &text),
            Event::SoftBreak | Event::HardBreak => w.write_str(" "),
            Event::End(Tag::Image(..)) => {
                let title = self.image_title.take().unwrap_or_default();
                match title.is_empty() {
                    true => w.write_str(r#"" />"#),
                    false => write!(
                        w,
                        r#"" title="{}" />"#,
                        EscapeHtml(CowStr::from(title.as_str())),
                    ),
                }
            }
            _ => Ok(()),
        }
    }

    fn on_start<'a, W: StrWrite>(
        &mut self,
        w: &mut W,
        tag: Tag<'a>,
    ) -> io::Result<()> {
        match tag {
            Tag::BlockQuote => w.write_str("<blockquote>\n"),
            Tag::CodeBlock(CodeBlockKind::Fenced(info)) => {
                match info.split(' ').next().unwrap_or_default() {
                    "" => w.write_str("<pre><code>"),
                    lang => write!(
                        w,
                        r#"<pre><code class="language-{}">"#,
                        EscapeHtml(CowStr::Borrowed(lang)),
                    ),
                }
            }
            Tag::CodeBlock(CodeBlockKind::Indented) => {
                w.write_str("<pre><code>")
            }
            Tag::Emphasis => w.write_str("<em>"),
            Tag::FootnoteDefinition(name) => {
                let name = EscapeHtml(name);
                write!(
                    w,
                    r#"<div class="footnote-definition" id="{}"><sup class="footnote-definition-label">{}</sup>"#,
                    &name, &name,
                )
            }
            Tag::Heading(level) => write!(w, "<h{}>", level),
            Tag::Image(_link_type, dest, title) => {
                self.image_title = Some(title.to_string());
                write!(w, r#"<img src="{}" alt=""#, EscapeHref(dest))
            }
            Tag::Item => w.write_str("<li>"),
            Tag::Link(LinkType::Email, dest, title) => {
                write!(w, r#"<a href="mailto:{}""#, EscapeHref(dest))?;
                self.on_link_title(w, title)
            }
            Tag::Link(_link_type, dest, title) => {
                write!(w, r#"<a href="{}""#, EscapeHref(dest))?;
                self.on_link_title(w, title)
            }
            Tag::List(None) => w.write_str("<ul>\n"),
            Tag::List(Some(1)) => w.write_str("<ol>\n"),
            Tag::List(Some(start)) => write!(w, "<ol start=\"{}\">\n", start),
            Tag::Paragraph => w.write_str("<p>"),
            Tag::Strikethrough => w.write_str("<del>"),
            Tag::Strong => w.write_str("<strong>"),
            Tag::Table(alignments) => {
                self.table_alignments = alignments;
                w.write_str("<table>")
            }
            Tag::TableHead => {
                self.table_state = TableState::Head;
                self.table_cell_index = 0;
                w.write_str("<thead><tr>")
            }
            Tag::TableRow => {
                self.table_cell_index = 0;
                w.write_str("<tr>")
            }
            Tag::TableCell => write!(
                w,
                "<{}{}>",
                match self.table_state {
                    TableState::Head => "th",
                    TableState::Body => "td",
                },
                match self.table_alignments.get(self.table_cell_index) {
                    Some(Alignment::Left) => r#" style="text-align: left""#,
                    Some(Alignment::Right) => r#" style="text-align: right""#,
                    Some(Alignment::Center) => r#" style="text-align: center""#,
                    _ => "",
                }
            ),
        }
    }

    fn on_link_title<'a, W: StrWrite>(
        &mut self,
        w: &mut W,
        title: CowStr<'a>,
    ) -> io::Result<()> {
        match title.is_empty() {
            true => w.write_str(">"),
            false => write!(w, r#" title="{}">"#, EscapeHtml(title)),
        }
    }

    fn on_end<'a, W: StrWrite>(
        &mut self,
        w: &mut W,
        tag: Tag<'a>,
    ) -> io::Result<()> {
        match tag {
            Tag::BlockQuote => w.write_str("</blockquote>"),
            Tag::CodeBlock(_) => w.write_str("</code></pre>"),
            Tag::Emphasis => w.write_str("</em>"),
            Tag::FootnoteDefinition(_) => w.write_str("</div>"),
            Tag::Heading(level) => write!(w, "</h{}>", level),
            Tag::Image(..) => Ok(()), // handled by on_image_event
            Tag::Item => w.write_str("</li>\n"),
            Tag::Link(..) => w.write_str("</a>"),
            Tag::List(Some(_)) => w.write_str("</ol>"),
            Tag::List(None) => w.write_str("</ul>"),
            Tag::Paragraph => w.write_str("</p>"),
            Tag::Strikethrough => w.write_str("</del>"),
            Tag::Strong => w.write_str("</strong>"),
            Tag::Table(_) => w.write_str("</tbody></table>"),
            Tag::TableHead => {
                self.table_state = TableState::Body;
                w.write_str("</tr></thead><tbody>")
            }
            Tag::TableRow => w.write_str("</tr>"),
            Tag::TableCell => {
                self.table_cell_index += 1;
                w.write_str(match self.table_state {
                    TableState::Head => "</th>",
                    TableState::Body => "</td>",
                })
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::markdown::{parse, Block, Document};

    fn render(markdown: &str, footnote_prefix: &str) -> String {
        let mut out = String::new();
        parse(markdown)
            .push_html(&mut out, footnote_prefix)
            .unwrap();
        out
    }

    #[test]
    fn test_heading_ids() {
        assert_eq!(
            "<h1 id=\"title\">Title</h1>\n<h2 id=\"section-one\">Section <code>one</code></h2>\n",
            render("# Title\n\n## Section `one`\n", ""),
        );
    }

    #[test]
    fn test_footnote_prefix() {
        let html = render(
            "Hello[^1]\n\n[^1]: World\n",
            "https://example.org/posts/hello.html",
        );
        assert!(html.contains(
            r#"<a href="https://example.org/posts/hello.html#1">1</a>"#
        ));
        assert!(html.contains(r#"<div class="footnote-definition" id="1">"#));
    }

    #[test]
    fn test_image_alt_text() {
        assert_eq!(
            "<p><img src=\"cat.png\" alt=\"a cat\" title=\"Cat\" /></p>\n",
            render("![a *cat*](cat.png \"Cat\")\n", ""),
        );
    }

    #[test]
    fn test_code_block_language() {
        assert_eq!(
            "<pre><code class=\"language-rust\">let x = 1;\n</code></pre>\n",
            render("```rust\nlet x = 1;\n```\n", ""),
        );
    }

    #[test]
    fn test_raw_html_block() {
        let doc = Document {
            blocks: vec![Block::Html("<div class=\"toc\">".to_owned())],
        };
        let mut out = String::new();
        doc.push_html(&mut out, "").unwrap();
        assert_eq!("<div class=\"toc\">\n", out);
    }
}
