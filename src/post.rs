//! Defines the [`Post`], [`Parser`], and [`Error`] types, and the logic for
//! parsing posts and standalone pages from the file system into memory. See
//! [`Post::to_value`] and [`Post::summarize`] for how posts are converted into
//! template values.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    fs::{read_dir, File},
    path::{Path, PathBuf},
};

use chrono::{DateTime, FixedOffset, NaiveDateTime, ParseResult, TimeZone, Utc};
use gtmpl::Value;
use log::debug;
use serde::Deserialize;
use url::Url;

use crate::{markdown, tag::Tag, toc};

const MARKDOWN_EXTENSION: &str = ".md";
const BUNDLE_INDEX: &str = "index.md";

/// Page slugs whose `{slug}.html` output would clash with a generated file.
const RESERVED_PAGE_SLUGS: &[&str] = &["index"];

/// Marks the end of a post's summary.
pub const FOLD_TAG: &str = "<!-- more -->";

/// A post (or standalone page) parsed from a Markdown source file.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    pub title: String,

    /// Identifies the post in URLs, output paths and config. Unique across
    /// the site.
    pub slug: String,

    /// The post's tags in the order first written, without duplicates.
    pub tags: Vec<Tag>,

    pub published: DateTime<FixedOffset>,
    pub modified: Option<DateTime<FixedOffset>>,

    /// The thumbnail image, resolved against the post's source location.
    pub thumbnail: Option<Url>,

    /// A short description written in the frontmatter.
    pub description: Option<String>,

    /// The rendered HTML body.
    pub body: String,

    /// The target location on disk for the rendered page.
    pub file_path: PathBuf,

    pub url: Url,
}

impl Post {
    /// Returns the part of the body above the [`FOLD_TAG`] and `true`, or the
    /// whole body and `false` if the post has no fold.
    pub fn summary(&self) -> (&str, bool) {
        match self.body.find(FOLD_TAG) {
            Some(i) => (&self.body[..i], true),
            None => (&self.body, false),
        }
    }

    /// Converts the post into a template value with the full body.
    pub fn to_value(&self) -> Value {
        let mut m = self.common_values();
        m.insert("body".to_owned(), Value::String(self.body.clone()));
        Value::Object(m)
    }

    /// Converts the post into a template value for listing pages. The `body`
    /// field holds the summary only and `summarized` reports whether anything
    /// was cut.
    pub fn summarize(&self) -> Value {
        let (summary, summarized) = self.summary();
        let mut m = self.common_values();
        m.insert("body".to_owned(), Value::String(summary.to_owned()));
        m.insert("summarized".to_owned(), Value::Bool(summarized));
        Value::Object(m)
    }

    fn common_values(&self) -> HashMap<String, Value> {
        let option_to_value = |opt: Option<String>| match opt {
            Some(s) => Value::String(s),
            None => Value::Nil,
        };

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), Value::String(self.title.clone()));
        m.insert("slug".to_owned(), Value::String(self.slug.clone()));
        m.insert("url".to_owned(), Value::String(self.url.to_string()));
        m.insert(
            "date".to_owned(),
            Value::String(self.published.format("%Y-%m-%d").to_string()),
        );
        m.insert(
            "published".to_owned(),
            Value::String(self.published.to_rfc3339()),
        );
        m.insert(
            "modified".to_owned(),
            option_to_value(self.modified.map(|d| d.to_rfc3339())),
        );
        m.insert(
            "thumbnail".to_owned(),
            option_to_value(self.thumbnail.as_ref().map(Url::to_string)),
        );
        m.insert(
            "description".to_owned(),
            option_to_value(self.description.clone()),
        );
        m.insert(
            "tags".to_owned(),
            Value::Array(self.tags.iter().map(Value::from).collect()),
        );
        m
    }
}

/// Parses [`Post`] objects from source files.
pub struct Parser<'a> {
    /// `tags_url` is the base URL for tag listing pages. A tag's first page
    /// is `{tags_url}/{tag_slug}/index.html`.
    tags_url: &'a Url,

    /// `posts_url` is the base URL for the parsed pages. A post's page is
    /// `{posts_url}/{slug}.html`.
    posts_url: &'a Url,

    /// `posts_directory` is the directory in which the pages will be
    /// rendered.
    posts_directory: &'a Path,

    /// The site-wide table-of-contents settings.
    toc: &'a toc::TocConfig,
}

impl<'a> Parser<'a> {
    /// Constructs a new parser. See fields on [`Parser`] for argument
    /// descriptions.
    pub fn new(
        tags_url: &'a Url,
        posts_url: &'a Url,
        posts_directory: &'a Path,
        toc: &'a toc::TocConfig,
    ) -> Parser<'a> {
        Parser {
            tags_url,
            posts_url,
            posts_directory,
            toc,
        }
    }

    /// Searches `source_directory` for post files (extension `.md`) and post
    /// bundles (directories holding an `index.md` alongside assets) and
    /// returns the posts sorted by publish date, most recent first, together
    /// with the bundles' asset files. Each post file is structured as
    /// follows:
    ///
    /// 1. Initial frontmatter fence (`---`)
    /// 2. YAML frontmatter with fields `title`, `date`, and optionally
    ///    `modified`, `slug`, `tags`, `thumbnail` and `description`
    /// 3. Terminal frontmatter fence (`---`)
    /// 4. Post body
    ///
    /// For example:
    ///
    /// ```md
    /// ---
    /// title: Hello, world!
    /// date: 2021-04-16
    /// tags: [greet]
    /// ---
    /// # Hello
    ///
    /// World
    /// ```
    pub fn parse_posts(&self, source_directory: &Path) -> Result<Posts> {
        let mut posts = Vec::new();
        let mut static_files = Vec::new();
        for result in read_dir(source_directory)? {
            let entry = result?;
            let os_file_name = entry.file_name();
            let file_name = os_file_name.to_string_lossy();
            if Self::is_bundle(&entry)? {
                posts.push(self.parse_post_bundle(
                    source_directory,
                    Path::new(os_file_name.as_os_str()),
                    &mut static_files,
                )?);
            } else if file_name.ends_with(MARKDOWN_EXTENSION) {
                posts.push(self.parse_post(
                    source_directory,
                    Path::new(os_file_name.as_os_str()),
                    true,
                )?);
            }
        }

        check_unique_slugs(&posts)?;
        sort_posts(&mut posts);
        debug!("Parsed {} posts from {:?}", posts.len(), source_directory);
        Ok((posts, static_files))
    }

    /// Parses standalone pages (e.g., `about.md`) from `source_directory`.
    /// Pages may omit `date`. Fails with [`Error::MissingContent`] if any slug
    /// in `required` has no page, and with [`Error::InvalidSlug`] for a page
    /// named `index`. A missing directory is treated as empty.
    pub fn parse_pages(
        &self,
        source_directory: &Path,
        required: &[String],
    ) -> Result<Vec<Post>> {
        let mut pages = Vec::new();
        if source_directory.is_dir() {
            for result in read_dir(source_directory)? {
                let entry = result?;
                let os_file_name = entry.file_name();
                if entry.file_type()?.is_file()
                    && os_file_name.to_string_lossy().ends_with(MARKDOWN_EXTENSION)
                {
                    pages.push(self.parse_post(
                        source_directory,
                        Path::new(os_file_name.as_os_str()),
                        false,
                    )?);
                }
            }
        }

        if let Some(page) = pages
            .iter()
            .find(|page| RESERVED_PAGE_SLUGS.contains(&page.slug.as_str()))
        {
            return Err(Error::InvalidSlug(page.slug.clone()));
        }

        for slug in required {
            if !pages.iter().any(|page| &page.slug == slug) {
                return Err(Error::MissingContent(slug.clone()));
            }
        }

        check_unique_slugs(&pages)?;
        pages.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(pages)
    }

    fn parse_post_bundle(
        &self,
        posts_source_directory: &Path,
        relative_path: &Path,
        static_files: &mut Vec<StaticFile>,
    ) -> Result<Post> {
        // We want to make sure we can parse a post before we mutate
        // `static_files`
        let post = self.parse_post(
            posts_source_directory,
            &relative_path.join(BUNDLE_INDEX),
            true,
        )?;

        use walkdir::WalkDir;
        let abs = posts_source_directory.join(relative_path);
        for result in WalkDir::new(&abs) {
            let entry = result?;
            if entry.file_type().is_file() && entry.path() != abs.join(BUNDLE_INDEX) {
                // strip_prefix can't fail since `abs` is always an ancestor
                // of the entry's path
                if let Ok(rel) = entry.path().strip_prefix(&abs) {
                    static_files.push((
                        entry.path().to_owned(),
                        self.posts_directory.join(relative_path).join(rel),
                    ));
                }
            }
        }

        Ok(post)
    }

    fn parse_post(
        &self,
        source_directory: &Path,
        relative_path: &Path,
        require_date: bool,
    ) -> Result<Post> {
        match self._parse_post(source_directory, relative_path, require_date) {
            Ok(p) => Ok(p),
            Err(e) => Err(Error::Annotated(
                format!("parsing post `{}`", relative_path.display()),
                Box::new(e),
            )),
        }
    }

    fn _parse_post(
        &self,
        source_directory: &Path,
        relative_path: &Path,
        require_date: bool,
    ) -> Result<Post> {
        use std::io::Read;
        let mut contents = String::new();
        File::open(source_directory.join(relative_path))?
            .read_to_string(&mut contents)?;

        // Bundles are named after their directory and resolve relative
        // references from inside it.
        let (stem, base_url) = if relative_path.ends_with(BUNDLE_INDEX) {
            let dir = relative_path
                .parent()
                .and_then(Path::to_str)
                .ok_or_else(|| InvalidFileNameError(relative_path.to_owned()))?;
            (dir.to_owned(), self.posts_url.join(&format!("{}/", dir))?)
        } else {
            let stem = relative_path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .ok_or_else(|| InvalidFileNameError(relative_path.to_owned()))?;
            (stem.to_owned(), self.posts_url.clone())
        };

        self.parse_source(&contents, &stem, &base_url, require_date)
    }

    /// Parses a post from its source text. `default_slug` is used when the
    /// frontmatter has no `slug`, and `base_url` resolves relative
    /// thumbnails.
    fn parse_source(
        &self,
        input: &str,
        default_slug: &str,
        base_url: &Url,
        require_date: bool,
    ) -> Result<Post> {
        let (yaml_start, yaml_stop, body_start) = frontmatter_indices(input)?;
        let frontmatter: Frontmatter =
            serde_yaml::from_str(&input[yaml_start..yaml_stop])?;

        let slug = frontmatter
            .slug
            .unwrap_or_else(|| default_slug.to_owned());
        if slug.is_empty() || slug.contains('/') {
            return Err(Error::InvalidSlug(slug));
        }

        let published = match (frontmatter.date, require_date) {
            (Some(date), _) => parse_date(&date)
                .map_err(|err| Error::DateTimeParse(date.clone(), err))?,
            (None, true) => return Err(Error::MissingDate),
            (None, false) => DateTime::<Utc>::from(std::time::UNIX_EPOCH).into(),
        };
        let modified = match frontmatter.modified {
            Some(date) => Some(
                parse_date(&date).map_err(|err| Error::DateTimeParse(date.clone(), err))?,
            ),
            None => None,
        };

        let mut tags: Vec<Tag> = Vec::with_capacity(frontmatter.tags.len());
        let mut seen: HashSet<&str> = HashSet::new();
        for name in &frontmatter.tags {
            if seen.insert(name.as_str()) {
                tags.push(Tag {
                    name: name.clone(),
                    // NOTE: `tags_url.join(slug).join("index.html")` would
                    // drop the slug: without a trailing slash [`Url::join`]
                    // treats the last segment as a file name.
                    url: self
                        .tags_url
                        .join(&format!("{}/index.html", crate::tag::tag_slug(name)))?,
                });
            }
        }

        let file_name = format!("{}.html", slug);
        let url = self.posts_url.join(&file_name)?;
        let thumbnail = match &frontmatter.thumbnail {
            Some(thumbnail) => Some(base_url.join(thumbnail)?),
            None => None,
        };

        let document = toc::transform_linked(
            markdown::parse(&input[body_start..]).resolve_links(base_url)?,
            self.toc,
            url.as_str(),
        );
        let mut body = String::new();
        document.push_html(&mut body, url.as_str())?;

        Ok(Post {
            title: frontmatter.title,
            file_path: self.posts_directory.join(&file_name),
            slug,
            tags,
            published,
            modified,
            thumbnail,
            description: frontmatter.description,
            body,
            url,
        })
    }

    fn is_bundle(entry: &std::fs::DirEntry) -> std::io::Result<bool> {
        Ok(entry.file_type()?.is_dir() && entry.path().join(BUNDLE_INDEX).is_file())
    }
}

fn frontmatter_indices(input: &str) -> Result<(usize, usize, usize)> {
    const FENCE: &str = "---";
    if !input.starts_with(FENCE) {
        return Err(Error::FrontmatterMissingStartFence);
    }
    match input[FENCE.len()..].find(FENCE) {
        None => Err(Error::FrontmatterMissingEndFence),
        Some(offset) => Ok((
            FENCE.len(),                        // yaml_start
            FENCE.len() + offset,               // yaml_stop
            FENCE.len() + offset + FENCE.len(), // body_start
        )),
    }
}

/// Parses a frontmatter date: RFC 3339, `YYYY-MM-DD HH:MM:SS` or
/// `YYYY-MM-DD`. Dates without an offset are taken to be UTC.
pub fn parse_date(input: &str) -> ParseResult<DateTime<FixedOffset>> {
    let input = input.trim();
    if let Ok(date_time) = DateTime::parse_from_rfc3339(input) {
        return Ok(date_time);
    }
    let naive = match NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S") {
        Ok(naive) => naive,
        Err(_) => NaiveDateTime::parse_from_str(
            &format!("{}T00:00:00", input),
            "%Y-%m-%dT%H:%M:%S",
        )?,
    };
    Ok(Utc.from_utc_datetime(&naive).into())
}

/// Orders posts newest first. Posts published at the same instant are ordered
/// by slug so builds are reproducible.
pub fn sort_posts(posts: &mut [Post]) {
    posts.sort_by(|a, b| {
        b.published
            .cmp(&a.published)
            .then_with(|| a.slug.cmp(&b.slug))
    });
}

fn check_unique_slugs(posts: &[Post]) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for post in posts {
        if !seen.insert(&post.slug) {
            return Err(Error::DuplicateSlug(post.slug.clone()));
        }
    }
    Ok(())
}

#[derive(Deserialize, Clone)]
struct Frontmatter {
    title: String,

    #[serde(default)]
    date: Option<String>,

    #[serde(default)]
    modified: Option<String>,

    #[serde(default)]
    slug: Option<String>,

    #[serde(default)]
    tags: Vec<String>,

    #[serde(default)]
    thumbnail: Option<String>,

    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug)]
pub struct InvalidFileNameError(PathBuf);

impl fmt::Display for InvalidFileNameError {
    /// Displays an [`InvalidFileNameError`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid file name: {:?}", &self.0)
    }
}

impl std::error::Error for InvalidFileNameError {}

/// The posts and the bundle assets that accompany them.
pub type Posts = (Vec<Post>, Vec<StaticFile>);

/// A `(source, destination)` pair for a file to copy into the output.
pub type StaticFile = (PathBuf, PathBuf);

/// Represents the result of a [`Post`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Post`] object.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post source file is missing its starting frontmatter
    /// fence (`---`).
    FrontmatterMissingStartFence,

    /// Returned when a post source file is missing its terminal frontmatter
    /// fence (`---` i.e., the starting fence was found but the ending one was
    /// missing).
    FrontmatterMissingEndFence,

    /// Returned when there was an error parsing the frontmatter as YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when a post's frontmatter has no `date`.
    MissingDate,

    /// Returned when a frontmatter date can't be parsed.
    DateTimeParse(String, chrono::ParseError),

    /// Returned when a slug is empty or contains a `/`.
    InvalidSlug(String),

    /// Returned when two posts (or two pages) share a slug.
    DuplicateSlug(String),

    /// Returned when a required standalone page has no source file.
    MissingContent(String),

    /// Returned when there is a problem parsing URLs.
    UrlParse(url::ParseError),

    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// Returned when a source file name isn't valid UTF-8.
    InvalidFileName(InvalidFileNameError),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingStartFence => {
                write!(f, "Post must begin with `---`")
            }
            Error::FrontmatterMissingEndFence => {
                write!(f, "Missing closing `---`")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::MissingDate => write!(f, "Missing `date` in frontmatter"),
            Error::DateTimeParse(date, err) => {
                write!(f, "Invalid date `{}`: {}", date, err)
            }
            Error::InvalidSlug(slug) => write!(f, "Invalid slug `{}`", slug),
            Error::DuplicateSlug(slug) => {
                write!(f, "More than one source file has slug `{}`", slug)
            }
            Error::MissingContent(slug) => {
                write!(f, "Missing required page `{}.md`", slug)
            }
            Error::UrlParse(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::InvalidFileName(err) => err.fmt(f),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingStartFence => None,
            Error::FrontmatterMissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::MissingDate => None,
            Error::DateTimeParse(_, err) => Some(err),
            Error::InvalidSlug(_) => None,
            Error::DuplicateSlug(_) => None,
            Error::MissingContent(_) => None,
            Error::UrlParse(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::InvalidFileName(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<InvalidFileNameError> for Error {
    fn from(err: InvalidFileNameError) -> Error {
        Error::InvalidFileName(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL parsing and joining functions.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

/// Builds a minimal post for tests in other modules.
#[cfg(test)]
pub(crate) fn test_post(slug: &str, date: &str, tags: &[&str]) -> Post {
    let tags_url = Url::parse("https://example.org/tags/").unwrap();
    let posts_url = Url::parse("https://example.org/posts/").unwrap();
    Post {
        title: slug.to_uppercase(),
        slug: slug.to_owned(),
        tags: tags
            .iter()
            .map(|name| Tag {
                name: (*name).to_owned(),
                url: tags_url
                    .join(&format!("{}/index.html", crate::tag::tag_slug(name)))
                    .unwrap(),
            })
            .collect(),
        published: parse_date(date).unwrap(),
        modified: None,
        thumbnail: None,
        description: None,
        body: format!("<p>{}</p>\n", slug),
        file_path: PathBuf::from(format!("/out/posts/{}.html", slug)),
        url: posts_url.join(&format!("{}.html", slug)).unwrap(),
    }
}
