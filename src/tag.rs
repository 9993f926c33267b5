//! Defines the [`Tag`] type, which represents a [`crate::post::Post`] tag, and
//! [`extract_tags`], which computes the tag set of a whole site.

use crate::post::Post;
use gtmpl::Value;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use url::Url;

/// Represents a [`crate::post::Post`] tag.
#[derive(Clone, Debug)]
pub struct Tag {
    /// The tag's name exactly as written in the post's frontmatter.
    pub name: String,

    /// The URL for the tag's first listing page. Given an `index_url`, this
    /// looks like `{index_url}/tags/{slug}/index.html`.
    pub url: Url,
}

impl Tag {
    /// The path segment used for the tag's listing pages. Tags are written
    /// freely in frontmatter, so the name is slugified before it is dropped
    /// into a URL or a file path.
    pub fn slug(&self) -> String {
        tag_slug(&self.name)
    }
}

/// Slugifies a tag name for use in URLs and output paths.
pub fn tag_slug(name: &str) -> String {
    slug::slugify(name)
}

impl Hash for Tag {
    /// Implements [`Hash`] for [`Tag`] by delegating directly to the `name`
    /// field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}

impl PartialEq for Tag {
    /// Implements [`PartialEq`] and [`Eq`] for [`Tag`] by delegating directly
    /// to the `name` field.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for Tag {}

impl From<&Tag> for Value {
    /// Converts [`Tag`]s into [`Value`]s for templating.
    fn from(t: &Tag) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("tag".to_owned(), Value::String(t.name.clone()));
        m.insert("slug".to_owned(), Value::String(t.slug()));
        m.insert("url".to_owned(), Value::String(t.url.to_string()));
        Value::Object(m)
    }
}

/// Collects the distinct tag names across `posts` in ascending, case-sensitive
/// order.
pub fn extract_tags(posts: &[Post]) -> Vec<String> {
    posts
        .iter()
        .flat_map(|post| post.tags.iter().map(|tag| tag.name.clone()))
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::test_post;

    #[test]
    fn test_extract_tags_sorted_and_unique() {
        let posts = vec![
            test_post("a", "2021-01-03", &["rust", "Blog"]),
            test_post("b", "2021-01-02", &["blog", "rust"]),
            test_post("c", "2021-01-01", &[]),
        ];
        let tags = extract_tags(&posts);
        assert_eq!(vec!["Blog", "blog", "rust"], tags);
        assert_eq!(tags, extract_tags(&posts));
    }

    #[test]
    fn test_extract_tags_empty() {
        assert!(extract_tags(&[]).is_empty());
    }

    #[test]
    fn test_tag_slug() {
        assert_eq!("machine-learning", tag_slug("Machine Learning"));
    }
}
