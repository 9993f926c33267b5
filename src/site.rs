//! The in-memory content store. A [`Site`] owns every parsed post and page and
//! answers the lookups that page creation and templating need.

use crate::paginate::PageDescriptor;
use crate::post::Post;
use crate::tag::{extract_tags, tag_slug};
use log::warn;
use std::collections::{HashMap, HashSet};

pub struct Site {
    /// Posts ordered newest first.
    posts: Vec<Post>,

    /// Standalone pages ordered by slug.
    pages: Vec<Post>,

    /// Distinct tag names in ascending order, one per tag slug. Names that
    /// slugify alike (e.g. `Blog` and `blog`) share one listing, named after
    /// the first of them.
    tags: Vec<String>,

    /// Maps post slugs to indices into `posts`.
    by_slug: HashMap<String, usize>,

    /// Indices into `posts` of the configured popular posts, in display
    /// order.
    popular: Vec<usize>,
}

impl Site {
    /// Builds a site from posts (ordered newest first) and standalone pages.
    /// `popular_slugs` are resolved against the posts; unknown slugs are
    /// logged and skipped.
    pub fn new(posts: Vec<Post>, pages: Vec<Post>, popular_slugs: &[String]) -> Site {
        let by_slug: HashMap<String, usize> = posts
            .iter()
            .enumerate()
            .map(|(i, post)| (post.slug.clone(), i))
            .collect();

        let popular = popular_slugs
            .iter()
            .filter_map(|slug| match by_slug.get(slug) {
                Some(&i) => Some(i),
                None => {
                    warn!("Popular post `{}` does not exist; skipping", slug);
                    None
                }
            })
            .collect();

        let mut slugs: HashSet<String> = HashSet::new();
        let tags = extract_tags(&posts)
            .into_iter()
            .filter(|tag| {
                let fresh = slugs.insert(tag_slug(tag));
                if !fresh {
                    warn!(
                        "Tag `{}` shares its listing with another tag (`tags/{}/`)",
                        tag,
                        tag_slug(tag)
                    );
                }
                fresh
            })
            .collect();

        Site {
            tags,
            posts,
            pages,
            by_slug,
            popular,
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn pages(&self) -> &[Post] {
        &self.pages
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn post_by_slug(&self, slug: &str) -> Option<&Post> {
        self.by_slug.get(slug).map(|&i| &self.posts[i])
    }

    pub fn page_by_slug(&self, slug: &str) -> Option<&Post> {
        self.pages.iter().find(|page| page.slug == slug)
    }

    /// Returns the position of the post with `slug` in the listing order.
    pub fn position(&self, slug: &str) -> Option<usize> {
        self.by_slug.get(slug).copied()
    }

    /// Returns the posts carrying the tag `name` or any tag with the same
    /// slug, newest first.
    pub fn posts_tagged(&self, name: &str) -> Vec<&Post> {
        let slug = tag_slug(name);
        self.posts
            .iter()
            .filter(|post| post.tags.iter().any(|tag| tag.slug() == slug))
            .collect()
    }

    /// Returns the posts shown on one listing page: the slice described by
    /// `descriptor` of either every post or, given a `tag`, the posts with
    /// that tag.
    pub fn listing(&self, tag: Option<&str>, descriptor: &PageDescriptor) -> Vec<&Post> {
        let posts = match tag {
            Some(name) => self.posts_tagged(name),
            None => self.posts.iter().collect(),
        };
        posts.get(descriptor.range()).map(<[_]>::to_vec).unwrap_or_default()
    }

    /// Returns the configured popular posts in display order.
    pub fn popular_posts(&self) -> Vec<&Post> {
        self.popular.iter().map(|&i| &self.posts[i]).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::paginate::paginate;
    use crate::post::test_post;

    fn site() -> Site {
        Site::new(
            vec![
                test_post("d", "2021-01-04", &["rust"]),
                test_post("c", "2021-01-03", &["life"]),
                test_post("b", "2021-01-02", &["rust", "life"]),
                test_post("a", "2021-01-01", &["rust"]),
            ],
            vec![test_post("about", "2020-01-01", &[])],
            &["b".to_owned(), "missing".to_owned(), "d".to_owned()],
        )
    }

    fn slugs(posts: &[&Post]) -> Vec<String> {
        posts.iter().map(|p| p.slug.clone()).collect()
    }

    #[test]
    fn test_lookups() {
        let site = site();
        assert_eq!(vec!["life", "rust"], site.tags());
        assert_eq!(Some("c"), site.post_by_slug("c").map(|p| p.slug.as_str()));
        assert!(site.post_by_slug("about").is_none());
        assert_eq!(Some("about"), site.page_by_slug("about").map(|p| p.slug.as_str()));
        assert_eq!(Some(2), site.position("b"));
    }

    #[test]
    fn test_popular_posts_skip_unknown() {
        assert_eq!(vec!["b", "d"], slugs(&site().popular_posts()));
    }

    #[test]
    fn test_listing_slices() {
        let site = site();
        let pages = paginate(site.posts().len(), 3);
        assert_eq!(vec!["d", "c", "b"], slugs(&site.listing(None, &pages[0])));
        assert_eq!(vec!["a"], slugs(&site.listing(None, &pages[1])));

        let tagged = site.posts_tagged("rust");
        assert_eq!(vec!["d", "b", "a"], slugs(&tagged));
        let pages = paginate(tagged.len(), 2);
        assert_eq!(vec!["a"], slugs(&site.listing(Some("rust"), &pages[1])));
    }

    #[test]
    fn test_tags_sharing_a_slug_share_a_listing() {
        let site = Site::new(
            vec![
                test_post("x", "2021-01-02", &["Blog"]),
                test_post("y", "2021-01-01", &["blog"]),
            ],
            Vec::new(),
            &[],
        );
        assert_eq!(vec!["Blog"], site.tags());
        assert_eq!(vec!["x", "y"], slugs(&site.posts_tagged("Blog")));
        assert_eq!(vec!["x", "y"], slugs(&site.posts_tagged("blog")));
    }
}
