//! Table-of-contents insertion. A post asks for a table of contents by
//! including a fenced code block tagged `toc`:
//!
//! ````md
//! ```toc
//! fromHeading: 2
//! toHeading: 3
//! exclude: Introduction
//! ```
//! ````
//!
//! [`transform`] replaces the first such block with a nested list of links to
//! the document's headings. The block's contents are optional YAML overriding
//! the site-wide [`TocConfig`].

use crate::htmlrenderer::{EscapeHref, EscapeHtml};
use crate::markdown::{Block, Document, Heading};
use log::{debug, warn};
use pulldown_cmark::CowStr;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

/// The code-block language that marks where the table of contents goes.
pub const MARKER_LANG: &str = "toc";

/// Settings for a generated table of contents.
#[derive(Clone, Debug, PartialEq)]
pub struct TocConfig {
    /// When `false`, each entry's link is wrapped in a `<p>`.
    pub tight: bool,

    /// The shallowest heading depth to include.
    pub from_heading: u32,

    /// The deepest heading depth to include.
    pub to_heading: u32,

    /// Patterns for heading texts to leave out. Each pattern must match the
    /// whole heading text, ignoring case.
    pub exclude: Vec<String>,

    /// Use `<ol>` rather than `<ul>`.
    pub ordered: bool,
}

impl Default for TocConfig {
    fn default() -> Self {
        TocConfig {
            tight: false,
            from_heading: 2,
            to_heading: 6,
            exclude: Vec::new(),
            ordered: false,
        }
    }
}

/// A partial [`TocConfig`], as written in a `toc` block or in the site config.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TocOverrides {
    pub tight: Option<bool>,
    pub from_heading: Option<u32>,
    pub to_heading: Option<u32>,
    pub exclude: Option<Exclude>,
    pub ordered: Option<bool>,
}

/// `exclude` may be written as a single pattern or a list of them.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum Exclude {
    One(String),
    Many(Vec<String>),
}

impl TocConfig {
    /// Returns a copy of `self` with every field set in `overrides` replaced.
    pub fn merge(&self, overrides: &TocOverrides) -> TocConfig {
        TocConfig {
            tight: overrides.tight.unwrap_or(self.tight),
            from_heading: overrides.from_heading.unwrap_or(self.from_heading),
            to_heading: overrides.to_heading.unwrap_or(self.to_heading),
            exclude: match &overrides.exclude {
                None => self.exclude.clone(),
                Some(Exclude::One(pattern)) => vec![pattern.clone()],
                Some(Exclude::Many(patterns)) => patterns.clone(),
            },
            ordered: overrides.ordered.unwrap_or(self.ordered),
        }
    }

    /// Merges the YAML contents of a `toc` block over `self`. Malformed YAML
    /// is logged and ignored.
    fn merge_yaml(&self, yaml: &str) -> TocConfig {
        if yaml.trim().is_empty() {
            return self.clone();
        }
        match serde_yaml::from_str::<TocOverrides>(yaml) {
            Ok(overrides) => self.merge(&overrides),
            Err(err) => {
                warn!("Invalid table of contents config, using defaults: {}", err);
                self.clone()
            }
        }
    }

    fn exclude_regex(&self) -> Option<Regex> {
        if self.exclude.is_empty() {
            return None;
        }
        let pattern = format!("^({})$", self.exclude.join("|"));
        match RegexBuilder::new(&pattern).case_insensitive(true).build() {
            Ok(regex) => Some(regex),
            Err(err) => {
                warn!("Invalid table of contents exclude pattern `{}`: {}", pattern, err);
                None
            }
        }
    }
}

/// Inserts a table of contents into `document` in place of its first `toc`
/// code block. Documents without a `toc` block are returned unchanged.
pub fn transform<'a>(document: Document<'a>, defaults: &TocConfig) -> Document<'a> {
    transform_linked(document, defaults, "")
}

/// Like [`transform`], but the entries link to `{page_url}#{anchor}` so the
/// table of contents still works when a post's summary is shown on another
/// page.
pub fn transform_linked<'a>(
    document: Document<'a>,
    defaults: &TocConfig,
    page_url: &str,
) -> Document<'a> {
    let marker = document
        .blocks
        .iter()
        .enumerate()
        .find_map(|(i, block)| match block {
            Block::Code(code) if code.lang.as_deref() == Some(MARKER_LANG) => {
                Some((i, code.value.clone()))
            }
            _ => None,
        });
    let (position, yaml) = match marker {
        Some(marker) => marker,
        None => return document,
    };

    let config = defaults.merge_yaml(&yaml);
    let entries = outline(document.headings(), &config);
    debug!("Inserting table of contents with {} top-level entries", entries.len());
    let rendered = render(&entries, &config, page_url);

    let mut blocks = Vec::with_capacity(document.blocks.len() + rendered.len());
    for (i, block) in document.blocks.into_iter().enumerate() {
        if i == position {
            blocks.extend(rendered.iter().cloned().map(Block::Html));
        } else {
            blocks.push(block);
        }
    }
    Document { blocks }
}

/// One entry in a table of contents.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub depth: u32,
    pub text: String,
    pub anchor: String,
    pub children: Vec<Entry>,
}

/// Builds the nested outline of `headings` allowed by `config`. A heading
/// nests under the previous entry when it is deeper than that entry.
pub fn outline<'h, 'a: 'h>(
    headings: impl Iterator<Item = &'h Heading<'a>>,
    config: &TocConfig,
) -> Vec<Entry> {
    let exclude = config.exclude_regex();
    let mut entries = Vec::new();
    for heading in headings {
        if heading.depth < config.from_heading || heading.depth > config.to_heading {
            continue;
        }
        if let Some(exclude) = &exclude {
            if exclude.is_match(&heading.text) {
                continue;
            }
        }
        insert(
            &mut entries,
            Entry {
                depth: heading.depth,
                text: heading.text.clone(),
                anchor: heading.anchor.clone(),
                children: Vec::new(),
            },
        );
    }
    entries
}

fn insert(entries: &mut Vec<Entry>, entry: Entry) {
    match entries.last_mut() {
        Some(last) if entry.depth > last.depth => insert(&mut last.children, entry),
        _ => entries.push(entry),
    }
}

// Renders the wrapper and outline as the raw HTML blocks that replace the
// marker.
fn render(entries: &[Entry], config: &TocConfig, page_url: &str) -> Vec<String> {
    let mut blocks = vec![
        r#"<div class="toc">"#.to_owned(),
        "<h3>Table of Contents</h3>".to_owned(),
    ];
    if !entries.is_empty() {
        let mut list = String::new();
        render_list(&mut list, entries, config, page_url);
        blocks.push(list);
    }
    blocks.push("</div>".to_owned());
    blocks
}

fn render_list(out: &mut String, entries: &[Entry], config: &TocConfig, page_url: &str) {
    let list_tag = match config.ordered {
        true => "ol",
        false => "ul",
    };
    out.push_str(&format!("<{}>\n", list_tag));
    for entry in entries {
        let link = format!(
            r##"<a href="{}#{}">{}</a>"##,
            EscapeHref(CowStr::Borrowed(page_url)),
            EscapeHref(CowStr::Borrowed(&entry.anchor)),
            EscapeHtml(CowStr::Borrowed(&entry.text)),
        );
        out.push_str("<li>");
        match config.tight {
            true => out.push_str(&link),
            false => out.push_str(&format!("<p>{}</p>", link)),
        }
        if !entry.children.is_empty() {
            out.push('\n');
            render_list(out, &entry.children, config, page_url);
        }
        out.push_str("</li>\n");
    }
    out.push_str(&format!("</{}>", list_tag));
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::markdown::parse;

    fn anchors(entries: &[Entry]) -> Vec<String> {
        let mut out = Vec::new();
        for entry in entries {
            out.push(entry.anchor.clone());
            out.extend(anchors(&entry.children));
        }
        out
    }

    fn toc_html(document: &Document) -> String {
        document
            .blocks
            .iter()
            .filter_map(|block| match block {
                Block::Html(html) => Some(html.as_str()),
                _ => None,
            })
            .collect::<Vec<&str>>()
            .join("\n")
    }

    #[test]
    fn test_no_marker_is_noop() {
        let source = "# Title\n\n## One\n\n```rust\nfn main() {}\n```\n";
        let document = parse(source);
        assert_eq!(parse(source), transform(document, &TocConfig::default()));
    }

    #[test]
    fn test_replaces_marker_and_keeps_order() {
        let document = parse("Intro\n\n```toc\n```\n\n## One\n\n### Two\n\n## Three\n");
        let transformed = transform(document, &TocConfig::default());
        let kinds: Vec<&str> = transformed
            .blocks
            .iter()
            .map(|block| match block {
                Block::Heading(_) => "heading",
                Block::Code(_) => "code",
                Block::Html(_) => "html",
                Block::Other(_) => "other",
            })
            .collect();
        assert_eq!(
            vec!["other", "html", "html", "html", "html", "heading", "heading", "heading"],
            kinds,
        );
        assert_eq!(
            "<div class=\"toc\">\n\
             <h3>Table of Contents</h3>\n\
             <ul>\n\
             <li><p><a href=\"#one\">One</a></p>\n\
             <ul>\n\
             <li><p><a href=\"#two\">Two</a></p></li>\n\
             </ul></li>\n\
             <li><p><a href=\"#three\">Three</a></p></li>\n\
             </ul>\n\
             </div>",
            toc_html(&transformed),
        );
    }

    #[test]
    fn test_from_heading() {
        let document = parse("## A\n\n### B\n\n## C\n\n### D\n");
        let all = outline(document.headings(), &TocConfig::default());
        assert_eq!(vec!["a", "b", "c", "d"], anchors(&all));

        let config = TocConfig {
            from_heading: 3,
            ..TocConfig::default()
        };
        let deep = outline(document.headings(), &config);
        assert_eq!(vec!["b", "d"], anchors(&deep));
        assert!(deep.iter().all(|entry| entry.children.is_empty()));
    }

    #[test]
    fn test_yaml_overrides() {
        let document = parse("```toc\ntight: true\ntoHeading: 2\nordered: true\n```\n\n## A\n\n### B\n");
        let html = toc_html(&transform(document, &TocConfig::default()));
        assert!(html.contains("<ol>\n<li><a href=\"#a\">A</a></li>\n</ol>"), "{}", html);
        assert!(!html.contains("#b"));
    }

    #[test]
    fn test_malformed_yaml_uses_defaults() {
        let config = TocConfig::default().merge_yaml("fromHeading: [unclosed");
        assert_eq!(TocConfig::default(), config);
    }

    #[test]
    fn test_exclude() {
        let document = parse("## Introduction\n\n## Details\n\n## Summary\n");
        let config = TocConfig::default().merge_yaml("exclude: [introduction, summ.*]");
        assert_eq!(vec!["details"], anchors(&outline(document.headings(), &config)));

        let config = TocConfig::default().merge_yaml("exclude: Details");
        assert_eq!(
            vec!["introduction", "summary"],
            anchors(&outline(document.headings(), &config)),
        );
    }

    #[test]
    fn test_only_first_marker_is_replaced() {
        let document = parse("```toc\n```\n\n## A\n\n```toc\n```\n");
        let transformed = transform(document, &TocConfig::default());
        let markers = transformed
            .blocks
            .iter()
            .filter(|block| matches!(block, Block::Code(code) if code.lang.as_deref() == Some(MARKER_LANG)))
            .count();
        assert_eq!(1, markers);
    }

    #[test]
    fn test_links_carry_page_url() {
        let document = parse("```toc\ntight: true\n```\n\n## A\n");
        let html = toc_html(&transform_linked(
            document,
            &TocConfig::default(),
            "https://example.org/posts/a.html",
        ));
        assert!(
            html.contains("<a href=\"https://example.org/posts/a.html#a\">A</a>"),
            "{}",
            html
        );
    }
}
