//! Renders [`PageRequest`]s to disk. [`Writer`] is the [`PageRegistry`] used
//! by real builds: it resolves a request's context against the [`Site`],
//! converts it into a template [`Value`], applies the component's template and
//! writes the result.

use crate::config::Author;
use crate::pages::{listing_file_name, Component, PageContext, PageRegistry, PageRequest};
use crate::paginate::{page_links, PageDescriptor, PageLink};
use crate::post::Post;
use crate::site::Site;
use crate::tag::tag_slug;
use gtmpl::{Template, Value};
use log::debug;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// The parsed templates for each [`Component`]. Tag listings share the
/// listing template; templates can tell them apart by the `tag` field.
pub struct Templates {
    pub index: Template,
    pub post: Template,
    pub page: Template,
}

impl Templates {
    fn for_component(&self, component: Component) -> &Template {
        match component {
            Component::Post => &self.post,
            Component::Listing | Component::TagListing => &self.index,
            Component::Page => &self.page,
        }
    }
}

/// Responsible for templating and writing HTML pages to disk.
pub struct Writer<'a> {
    /// The content the pages are rendered from.
    pub site: &'a Site,

    pub templates: &'a Templates,

    /// The root output directory. [`PageRequest::path`]s are relative to it.
    pub output_directory: &'a Path,

    /// The base URL for the listing of all posts. Its pages are located at
    /// `{index_url}/index.html`, `{index_url}/2.html`, etc.
    pub index_url: &'a Url,

    /// The base URL for tag listings. A tag's pages are located at
    /// `{tags_url}/{tag}/index.html`, `{tags_url}/{tag}/2.html`, etc.
    pub tags_url: &'a Url,

    /// The maximum number of links in a listing page's pagination bar.
    pub max_page_links: usize,

    /// The URL for the site's home page. This is made available to every
    /// template, typically as the destination for the site-header link.
    pub home_page: &'a Url,

    /// The URL for the static assets. This is made available to every
    /// template, typically for the theme's stylesheet.
    pub static_url: &'a Url,

    /// The URL for the Atom feed.
    pub atom_url: &'a Url,

    pub title: &'a str,
    pub author: Option<&'a Author>,

    /// Directories already created during this build.
    pub seen_dirs: HashSet<PathBuf>,
}

impl PageRegistry for Writer<'_> {
    type Error = Error;

    /// Takes a single [`PageRequest`], templates it, and writes it to disk.
    fn create_page(&mut self, page: PageRequest) -> Result<()> {
        let file_path = self.output_directory.join(&page.path);
        if let Some(dir) = file_path.parent() {
            if self.seen_dirs.insert(dir.to_owned()) {
                std::fs::create_dir_all(dir)?;
            }
        }

        let mut value = self.page_value(&page.context)?;
        if let Value::Object(obj) = &mut value {
            obj.extend(self.globals());
        }

        debug!("Writing {}", file_path.display());
        self.templates.for_component(page.component).execute(
            &mut std::fs::File::create(&file_path)?,
            &gtmpl::Context::from(value)?,
        )?;
        Ok(())
    }
}

impl Writer<'_> {
    /// Converts a [`PageContext`] into a [`Value::Object`] with the fields
    /// `item`, `prev` and `next`, plus `tag`, `page` and `page_links` for
    /// listings.
    fn page_value(&self, context: &PageContext) -> Result<Value> {
        let option_to_value = |opt: Option<Url>| match opt {
            Some(url) => Value::String(url.to_string()),
            None => Value::Nil,
        };

        let mut m: HashMap<String, Value> = HashMap::new();
        match context {
            PageContext::Post { slug, prev, next } => {
                let post = self.post(slug)?;
                let neighbor_url = |slug: &Option<String>| -> Result<Option<Url>> {
                    match slug {
                        Some(slug) => Ok(Some(self.post(slug)?.url.clone())),
                        None => Ok(None),
                    }
                };
                m.insert("item".to_owned(), post.to_value());
                m.insert("prev".to_owned(), option_to_value(neighbor_url(prev)?));
                m.insert("next".to_owned(), option_to_value(neighbor_url(next)?));
            }
            PageContext::Listing { tag, descriptor } => {
                let base_url = self.listing_url(tag.as_deref())?;
                let page_url = |number: usize| base_url.join(&listing_file_name(number));
                let posts = self.site.listing(tag.as_deref(), descriptor);

                m.insert(
                    "item".to_owned(),
                    Value::Array(posts.iter().map(|p| p.summarize()).collect()),
                );
                m.insert(
                    "tag".to_owned(),
                    match tag {
                        Some(tag) => Value::String(tag.clone()),
                        None => Value::Nil,
                    },
                );
                m.insert("page".to_owned(), descriptor_value(descriptor));
                m.insert(
                    "page_links".to_owned(),
                    Value::Array(
                        page_links(
                            descriptor.page_number,
                            descriptor.total_pages,
                            self.max_page_links,
                        )
                        .into_iter()
                        .map(|link| page_link_value(&link, &page_url))
                        .collect::<std::result::Result<Vec<Value>, url::ParseError>>()?,
                    ),
                );
                m.insert(
                    "prev".to_owned(),
                    option_to_value(match descriptor.is_first() {
                        true => None,
                        false => Some(page_url(descriptor.page_number - 1)?),
                    }),
                );
                m.insert(
                    "next".to_owned(),
                    option_to_value(match descriptor.is_last() {
                        true => None,
                        false => Some(page_url(descriptor.page_number + 1)?),
                    }),
                );
            }
            PageContext::Page { slug } => {
                let page = self
                    .site
                    .page_by_slug(slug)
                    .ok_or_else(|| Error::UnknownSlug(slug.clone()))?;
                m.insert("item".to_owned(), page.to_value());
                m.insert("prev".to_owned(), Value::Nil);
                m.insert("next".to_owned(), Value::Nil);
            }
        }
        Ok(Value::Object(m))
    }

    fn post(&self, slug: &str) -> Result<&Post> {
        self.site
            .post_by_slug(slug)
            .ok_or_else(|| Error::UnknownSlug(slug.to_owned()))
    }

    fn listing_url(&self, tag: Option<&str>) -> Result<Url> {
        Ok(match tag {
            None => self.index_url.clone(),
            Some(tag) => self.tags_url.join(&format!("{}/", tag_slug(tag)))?,
        })
    }

    /// The values every template receives regardless of component.
    fn globals(&self) -> HashMap<String, Value> {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert(
            "home_page".to_owned(),
            Value::String(self.home_page.to_string()),
        );
        m.insert(
            "static_url".to_owned(),
            Value::String(self.static_url.to_string()),
        );
        m.insert(
            "atom_url".to_owned(),
            Value::String(self.atom_url.to_string()),
        );
        m.insert("title".to_owned(), Value::String(self.title.to_owned()));
        m.insert(
            "author".to_owned(),
            match self.author {
                Some(author) => {
                    let mut a: HashMap<String, Value> = HashMap::new();
                    a.insert("name".to_owned(), Value::String(author.name.clone()));
                    a.insert(
                        "email".to_owned(),
                        match &author.email {
                            Some(email) => Value::String(email.clone()),
                            None => Value::Nil,
                        },
                    );
                    Value::Object(a)
                }
                None => Value::Nil,
            },
        );
        m.insert(
            "tags".to_owned(),
            Value::Array(
                self.site
                    .tags()
                    .iter()
                    .filter_map(|tag| {
                        let url = self.listing_url(Some(tag)).ok()?;
                        let mut t: HashMap<String, Value> = HashMap::new();
                        t.insert("tag".to_owned(), Value::String(tag.clone()));
                        t.insert("slug".to_owned(), Value::String(tag_slug(tag)));
                        t.insert("url".to_owned(), Value::String(url.to_string()));
                        t.insert(
                            "count".to_owned(),
                            Value::from(self.site.posts_tagged(tag).len()),
                        );
                        Some(Value::Object(t))
                    })
                    .collect(),
            ),
        );
        m.insert(
            "popular".to_owned(),
            Value::Array(
                self.site
                    .popular_posts()
                    .iter()
                    .map(|post| post.summarize())
                    .collect(),
            ),
        );
        m.insert(
            "pages".to_owned(),
            Value::Array(self.site.pages().iter().map(link_value).collect()),
        );
        m
    }
}

fn link_value(page: &Post) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("title".to_owned(), Value::String(page.title.clone()));
    m.insert("slug".to_owned(), Value::String(page.slug.clone()));
    m.insert("url".to_owned(), Value::String(page.url.to_string()));
    Value::Object(m)
}

fn descriptor_value(descriptor: &PageDescriptor) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("number".to_owned(), Value::from(descriptor.page_number));
    m.insert("total".to_owned(), Value::from(descriptor.total_pages));
    m.insert("offset".to_owned(), Value::from(descriptor.offset));
    m.insert("limit".to_owned(), Value::from(descriptor.limit));
    Value::Object(m)
}

// An ellipsis is rendered as an object with `ellipsis` set and no `url`, so
// templates can test a single field.
fn page_link_value(
    link: &PageLink,
    page_url: &dyn Fn(usize) -> std::result::Result<Url, url::ParseError>,
) -> std::result::Result<Value, url::ParseError> {
    let mut m: HashMap<String, Value> = HashMap::new();
    match link {
        PageLink::Page { number, current } => {
            m.insert("number".to_owned(), Value::from(*number));
            m.insert("url".to_owned(), Value::String(page_url(*number)?.to_string()));
            m.insert("current".to_owned(), Value::Bool(*current));
            m.insert("ellipsis".to_owned(), Value::Bool(false));
        }
        PageLink::Ellipsis => {
            m.insert("current".to_owned(), Value::Bool(false));
            m.insert("ellipsis".to_owned(), Value::Bool(true));
        }
    }
    Ok(Value::Object(m))
}

/// The result of a fallible page-writing operation.
type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(String),

    /// A page context names a post or page the site doesn't have.
    UnknownSlug(String),

    /// An error building a page URL.
    UrlParse(url::ParseError),

    /// An error writing the output files.
    Io(io::Error),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use the
    /// `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`]. This
    /// allows us to use the `?` operator for fallible template operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::UnknownSlug(slug) => write!(f, "No content with slug `{}`", slug),
            Error::UrlParse(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(_) => None,
            Error::UnknownSlug(_) => None,
            Error::UrlParse(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pages::create_pages;
    use crate::post::test_post;

    fn template(text: &str) -> Template {
        let mut template = Template::default();
        template.parse(text).unwrap();
        template
    }

    #[test]
    fn test_writer_renders_pages() -> Result<()> {
        let site = Site::new(
            vec![
                test_post("c", "2021-01-03", &["rust"]),
                test_post("b", "2021-01-02", &["rust"]),
                test_post("a", "2021-01-01", &[]),
            ],
            vec![test_post("about", "2020-01-01", &[])],
            &["a".to_owned()],
        );
        let templates = Templates {
            index: template(
                "{{.title}}|{{range .item}}{{.slug}},{{end}}|{{if .next}}{{.next}}{{end}}|{{range .page_links}}{{if .ellipsis}}...{{else}}{{.number}}{{end}} {{end}}",
            ),
            post: template("{{.item.title}}|{{if .prev}}{{.prev}}{{end}}|{{range .popular}}{{.slug}}{{end}}"),
            page: template("{{.item.title}}"),
        };
        let dir = tempfile::tempdir()?;
        let index_url = Url::parse("https://example.org/pages/").unwrap();
        let tags_url = Url::parse("https://example.org/tags/").unwrap();
        let site_root = Url::parse("https://example.org/").unwrap();
        let mut writer = Writer {
            site: &site,
            templates: &templates,
            output_directory: dir.path(),
            index_url: &index_url,
            tags_url: &tags_url,
            max_page_links: 5,
            home_page: &site_root,
            static_url: &site_root,
            atom_url: &site_root,
            title: "Blog",
            author: None,
            seen_dirs: HashSet::new(),
        };
        create_pages(&site, 2, &mut writer)?;

        let read = |path: &str| std::fs::read_to_string(dir.path().join(path)).unwrap();
        assert_eq!(
            "Blog|c,b,|https://example.org/pages/2.html|1 2 ",
            read("pages/index.html")
        );
        assert_eq!("Blog|a,||1 2 ", read("pages/2.html"));
        assert_eq!("Blog|c,b,||1 ", read("tags/rust/index.html"));
        assert_eq!("B|https://example.org/posts/c.html|a", read("posts/b.html"));
        assert_eq!("ABOUT", read("about.html"));
        Ok(())
    }
}
