//! Decides which pages a site has. [`create_pages`] walks a [`Site`] and
//! registers one [`PageRequest`] per output page with a [`PageRegistry`]:
//!
//! * `posts/{slug}.html` for every post;
//! * `pages/index.html`, `pages/2.html`, ... for the listing of all posts;
//! * `tags/{tag}/index.html`, `tags/{tag}/2.html`, ... for every tag;
//! * `{slug}.html` for every standalone page.
//!
//! A request carries only the parameters a page needs (slugs, a tag, a
//! [`PageDescriptor`]); the registry resolves them against the [`Site`] when
//! it renders the page.

use crate::paginate::{paginate, PageDescriptor};
use crate::site::Site;
use crate::tag::tag_slug;
use log::debug;
use std::path::PathBuf;

/// Selects the template a page is rendered with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Component {
    Post,
    Listing,
    TagListing,
    Page,
}

/// The parameters a page is rendered from.
#[derive(Clone, Debug, PartialEq)]
pub enum PageContext {
    /// A single post, with the slugs of its neighbors in the listing (newer
    /// first).
    Post {
        slug: String,
        prev: Option<String>,
        next: Option<String>,
    },

    /// One page of a listing. `tag` is `None` for the listing of all posts.
    Listing {
        tag: Option<String>,
        descriptor: PageDescriptor,
    },

    /// A standalone page.
    Page { slug: String },
}

/// A page to create: where it goes, what renders it and with which context.
#[derive(Clone, Debug, PartialEq)]
pub struct PageRequest {
    /// The page's path relative to the output root.
    pub path: PathBuf,
    pub component: Component,
    pub context: PageContext,
}

/// Receives the pages [`create_pages`] computes.
pub trait PageRegistry {
    type Error;

    fn create_page(&mut self, page: PageRequest) -> Result<(), Self::Error>;
}

impl PageRegistry for Vec<PageRequest> {
    type Error = std::convert::Infallible;

    /// Collects the requests, e.g. for inspection in tests.
    fn create_page(&mut self, page: PageRequest) -> Result<(), Self::Error> {
        self.push(page);
        Ok(())
    }
}

/// The file name of a listing's `page_number`th page.
pub fn listing_file_name(page_number: usize) -> String {
    match page_number {
        1 => String::from("index.html"),
        n => format!("{}.html", n),
    }
}

/// Registers every page of `site` with `registry`, paginating listings at
/// `posts_per_page` posts. Returns the number of pages registered.
pub fn create_pages<R: PageRegistry>(
    site: &Site,
    posts_per_page: usize,
    registry: &mut R,
) -> Result<usize, R::Error> {
    let mut count = 0;
    let mut register = |registry: &mut R, page: PageRequest| {
        debug!("Creating page {:?}", page.path);
        count += 1;
        registry.create_page(page)
    };

    let posts = site.posts();
    for (i, post) in posts.iter().enumerate() {
        register(
            registry,
            PageRequest {
                path: PathBuf::from("posts").join(format!("{}.html", post.slug)),
                component: Component::Post,
                context: PageContext::Post {
                    slug: post.slug.clone(),
                    prev: match i {
                        0 => None,
                        _ => Some(posts[i - 1].slug.clone()),
                    },
                    next: posts.get(i + 1).map(|next| next.slug.clone()),
                },
            },
        )?;
    }

    for descriptor in paginate(posts.len(), posts_per_page) {
        register(
            registry,
            PageRequest {
                path: PathBuf::from("pages").join(listing_file_name(descriptor.page_number)),
                component: Component::Listing,
                context: PageContext::Listing {
                    tag: None,
                    descriptor,
                },
            },
        )?;
    }

    for tag in site.tags() {
        let dir = tag_slug(tag);
        let tagged = site.posts_tagged(tag).len();
        for descriptor in paginate(tagged, posts_per_page) {
            register(
                registry,
                PageRequest {
                    path: PathBuf::from("tags")
                        .join(&dir)
                        .join(listing_file_name(descriptor.page_number)),
                    component: Component::TagListing,
                    context: PageContext::Listing {
                        tag: Some(tag.clone()),
                        descriptor,
                    },
                },
            )?;
        }
    }

    for page in site.pages() {
        register(
            registry,
            PageRequest {
                path: PathBuf::from(format!("{}.html", page.slug)),
                component: Component::Page,
                context: PageContext::Page {
                    slug: page.slug.clone(),
                },
            },
        )?;
    }

    Ok(count)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::test_post;
    use std::collections::HashSet;

    fn requests(site: &Site, posts_per_page: usize) -> Vec<PageRequest> {
        let mut requests: Vec<PageRequest> = Vec::new();
        match create_pages(site, posts_per_page, &mut requests) {
            Ok(count) => assert_eq!(count, requests.len()),
            Err(never) => match never {},
        }
        requests
    }

    fn paths(requests: &[PageRequest], component: Component) -> Vec<String> {
        requests
            .iter()
            .filter(|r| r.component == component)
            .map(|r| r.path.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_create_pages() {
        let site = Site::new(
            vec![
                test_post("c", "2021-01-03", &["Rust"]),
                test_post("b", "2021-01-02", &["Rust", "life"]),
                test_post("a", "2021-01-01", &["Rust"]),
            ],
            vec![test_post("about", "2020-01-01", &[])],
            &[],
        );
        let requests = requests(&site, 2);

        assert_eq!(
            vec!["posts/c.html", "posts/b.html", "posts/a.html"],
            paths(&requests, Component::Post)
        );
        assert_eq!(
            vec!["pages/index.html", "pages/2.html"],
            paths(&requests, Component::Listing)
        );
        assert_eq!(
            vec!["tags/rust/index.html", "tags/rust/2.html", "tags/life/index.html"]
                .into_iter()
                .collect::<HashSet<&str>>(),
            paths(&requests, Component::TagListing)
                .iter()
                .map(String::as_str)
                .collect::<HashSet<&str>>()
        );
        assert_eq!(vec!["about.html"], paths(&requests, Component::Page));

        assert_eq!(
            PageContext::Post {
                slug: "b".to_owned(),
                prev: Some("c".to_owned()),
                next: Some("a".to_owned()),
            },
            requests[1].context
        );

        let rust_second = requests
            .iter()
            .find(|r| r.path == PathBuf::from("tags/rust/2.html"))
            .map(|r| r.context.clone());
        assert_eq!(
            Some(PageContext::Listing {
                tag: Some("Rust".to_owned()),
                descriptor: PageDescriptor {
                    page_number: 2,
                    offset: 2,
                    limit: 1,
                    total_pages: 2,
                },
            }),
            rust_second
        );
    }

    #[test]
    fn test_empty_site_has_no_listing_pages() {
        let site = Site::new(Vec::new(), Vec::new(), &[]);
        assert!(requests(&site, 10).is_empty());
    }

    #[test]
    fn test_colliding_tags_share_one_listing() {
        let site = Site::new(
            vec![
                test_post("b", "2021-01-02", &["Blog"]),
                test_post("a", "2021-01-01", &["blog"]),
            ],
            Vec::new(),
            &[],
        );
        let requests = requests(&site, 10);
        assert_eq!(
            vec!["tags/blog/index.html"],
            paths(&requests, Component::TagListing)
        );

        let listed: Vec<String> = requests
            .iter()
            .filter_map(|r| match &r.context {
                PageContext::Listing {
                    tag: Some(tag),
                    descriptor,
                } => Some(site.listing(Some(tag.as_str()), descriptor)),
                _ => None,
            })
            .flatten()
            .map(|post| post.slug.clone())
            .collect();
        assert_eq!(vec!["b", "a"], listed);
    }

    #[test]
    fn test_listing_file_name() {
        assert_eq!("index.html", listing_file_name(1));
        assert_eq!("3.html", listing_file_name(3));
    }
}
