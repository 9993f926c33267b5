//! Support for creating Atom feeds from a list of posts.

use crate::config::Author;
use crate::post::Post;
use atom_syndication::{Entry, Error as AtomError, Feed, Link, Person, Text};
use chrono::{DateTime, FixedOffset, Utc};
use std::fmt;
use std::io::Write;
use url::Url;

/// Bundled configuration for creating a feed.
pub struct FeedConfig {
    pub title: String,
    pub id: String,
    pub author: Option<Author>,
    pub home_page: Url,
    pub atom_url: Url,
}

/// Creates a feed from some configuration ([`FeedConfig`]) and a list of
/// [`Post`]s and writes the result to a [`std::io::Write`]. This function takes
/// ownership of the provided [`FeedConfig`].
pub fn write_feed<W: Write>(config: FeedConfig, posts: &[Post], w: W) -> Result<()> {
    feed(config, posts).write_to(w)?;
    Ok(())
}

fn feed(config: FeedConfig, posts: &[Post]) -> Feed {
    // The feed is as fresh as its freshest post; an empty feed falls back to
    // the build time.
    let updated = posts
        .iter()
        .map(last_updated)
        .max()
        .unwrap_or_else(|| Utc::now().into());

    let mut feed = Feed::default();
    feed.set_entries(feed_entries(&config, posts));
    feed.set_title(config.title.as_str());
    feed.set_id(config.id.as_str());
    feed.set_updated(updated);
    feed.set_authors(author_to_people(config.author.as_ref()));
    feed.set_links(vec![
        link(config.home_page.as_str(), "alternate"),
        link(config.atom_url.as_str(), "self"),
    ]);
    feed
}

fn feed_entries(config: &FeedConfig, posts: &[Post]) -> Vec<Entry> {
    posts
        .iter()
        .map(|post| {
            let (summary, _) = post.summary();
            let mut entry = Entry::default();
            entry.set_id(post.url.as_str());
            entry.set_title(post.title.as_str());
            entry.set_updated(last_updated(post));
            entry.set_published(Some(post.published));
            entry.set_authors(author_to_people(config.author.as_ref()));
            entry.set_links(vec![link(post.url.as_str(), "alternate")]);
            entry.set_summary(Some(Text::html(summary)));
            entry
        })
        .collect()
}

fn last_updated(post: &Post) -> DateTime<FixedOffset> {
    post.modified.unwrap_or(post.published)
}

fn link(href: &str, rel: &str) -> Link {
    let mut link = Link::default();
    link.set_href(href);
    link.set_rel(rel);
    link
}

fn author_to_people(author: Option<&Author>) -> Vec<Person> {
    match author {
        Some(author) => {
            let mut person = Person::default();
            person.set_name(author.name.as_str());
            person.set_email(author.email.clone());
            vec![person]
        }
        None => Vec::new(),
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem writing a feed.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is an Atom-related error, including I/O errors
    /// writing the feed.
    Atom(AtomError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Atom(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Atom(err) => Some(err),
        }
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::test_post;

    #[test]
    fn test_write_feed() -> Result<()> {
        let mut newest = test_post("newer", "2021-02-01", &[]);
        newest.body = "<p>Intro</p>\n<!-- more -->\n<p>Rest</p>\n".to_owned();
        let posts = vec![newest, test_post("older", "2021-01-01", &[])];

        let mut out = Vec::new();
        write_feed(
            FeedConfig {
                title: "Blog".to_owned(),
                id: "https://example.org/".to_owned(),
                author: Some(Author {
                    name: "Jane".to_owned(),
                    email: None,
                }),
                home_page: Url::parse("https://example.org/").unwrap(),
                atom_url: Url::parse("https://example.org/feed.atom").unwrap(),
            },
            &posts,
            &mut out,
        )?;

        let xml = String::from_utf8(out).unwrap();
        assert!(xml.contains(">Blog</title>"), "{}", xml);
        assert!(xml.contains("https://example.org/posts/newer.html"));
        assert!(xml.contains("https://example.org/posts/older.html"));
        assert!(xml.contains("<name>Jane</name>"));
        assert!(xml.contains("2021-02-01T00:00:00+00:00"));
        assert!(!xml.contains("Rest"));
        Ok(())
    }
}
