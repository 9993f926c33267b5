//! Loads a [`Config`] from a project directory. A project looks like this:
//!
//! ```text
//! inkpost.yaml        site settings (see `Project`)
//! posts/              post sources (`*.md` files and `*/index.md` bundles)
//! pages/              standalone pages such as `about.md`
//! static/             copied verbatim to `{output}/static/`
//! theme/theme.yaml    lists the template files for each page component
//! ```

use crate::toc::{TocConfig, TocOverrides};
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file.
pub const PROJECT_FILE: &str = "inkpost.yaml";

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

#[derive(Deserialize)]
struct MaxPageLinks(usize);
impl Default for MaxPageLinks {
    fn default() -> Self {
        MaxPageLinks(5)
    }
}

/// The author of the site, used in the Atom feed and made available to
/// templates.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Author {
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
struct Project {
    title: String,

    #[serde(default)]
    author: Option<Author>,

    site_root: Url,

    #[serde(default)]
    home_page: String,

    #[serde(default)]
    posts_per_page: PageSize,

    #[serde(default)]
    max_page_links: MaxPageLinks,

    #[serde(default)]
    popular_posts: Vec<String>,

    #[serde(default)]
    required_pages: Vec<String>,

    #[serde(default)]
    toc: TocOverrides,
}

#[derive(Deserialize)]
struct Theme {
    index_template: Vec<PathBuf>,
    posts_template: Vec<PathBuf>,

    #[serde(default)]
    page_template: Vec<PathBuf>,
}

/// The fully-resolved settings for a build.
#[derive(Clone, Debug)]
pub struct Config {
    pub title: String,
    pub author: Option<Author>,

    /// The URL of the site root. Always ends with a `/`.
    pub site_root: Url,
    pub home_page: Url,
    pub index_url: Url,
    pub tags_url: Url,
    pub posts_url: Url,
    pub static_url: Url,
    pub atom_url: Url,

    pub posts_source_directory: PathBuf,
    pub pages_source_directory: PathBuf,
    pub static_source_directory: PathBuf,

    pub index_template: Vec<PathBuf>,
    pub posts_template: Vec<PathBuf>,
    pub page_template: Vec<PathBuf>,

    pub root_output_directory: PathBuf,
    pub index_output_directory: PathBuf,
    pub tags_output_directory: PathBuf,
    pub posts_output_directory: PathBuf,
    pub static_output_directory: PathBuf,

    /// The number of posts per listing page. Never zero.
    pub posts_per_page: usize,

    /// The maximum number of page links in a listing page's pagination bar.
    pub max_page_links: usize,

    /// Slugs of posts to feature on every page, in display order.
    pub popular_posts: Vec<String>,

    /// Slugs of standalone pages which must exist.
    pub required_pages: Vec<String>,

    /// Site-wide table-of-contents defaults.
    pub toc: TocConfig,
}

impl Config {
    /// Searches `dir` and its ancestors for a [`PROJECT_FILE`] and loads it.
    pub fn from_directory(dir: &Path, output_directory: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path, output_directory)
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, output_directory),
                None => Err(Error::ProjectNotFound),
            }
        }
    }

    /// Loads the config from the project file at `path`. The project root is
    /// the file's parent directory.
    pub fn from_project_file(path: &Path, output_directory: &Path) -> Result<Config> {
        let project: Project = load_yaml(path)?;
        let project_root = path.parent().ok_or_else(|| Error::NoParent(path.to_owned()))?;
        let theme_dir = project_root.join("theme");
        let theme: Theme = load_yaml(&theme_dir.join("theme.yaml"))?;

        if project.posts_per_page.0 < 1 {
            return Err(Error::InvalidPageSize);
        }

        let site_root = with_trailing_slash(project.site_root);
        let theme_paths = |paths: Vec<PathBuf>| -> Vec<PathBuf> {
            paths.iter().map(|relpath| theme_dir.join(relpath)).collect()
        };
        let page_template = match theme.page_template.is_empty() {
            true => theme.posts_template.clone(),
            false => theme.page_template,
        };

        Ok(Config {
            title: project.title,
            author: project.author,
            home_page: site_root.join(&project.home_page)?,
            index_url: site_root.join("pages/")?,
            tags_url: site_root.join("tags/")?,
            posts_url: site_root.join("posts/")?,
            static_url: site_root.join("static/")?,
            atom_url: site_root.join("feed.atom")?,
            site_root,
            posts_source_directory: project_root.join("posts"),
            pages_source_directory: project_root.join("pages"),
            static_source_directory: project_root.join("static"),
            index_template: theme_paths(theme.index_template),
            posts_template: theme_paths(theme.posts_template),
            page_template: theme_paths(page_template),
            root_output_directory: output_directory.to_owned(),
            index_output_directory: output_directory.join("pages"),
            tags_output_directory: output_directory.join("tags"),
            posts_output_directory: output_directory.join("posts"),
            static_output_directory: output_directory.join("static"),
            posts_per_page: project.posts_per_page.0,
            max_page_links: project.max_page_links.0,
            popular_posts: project.popular_posts,
            required_pages: project.required_pages,
            toc: TocConfig::default().merge(&project.toc),
        })
    }
}

fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|err| Error::Open {
        path: path.to_owned(),
        err,
    })?;
    serde_yaml::from_reader(file).map_err(|err| Error::DeserializeYaml {
        path: path.to_owned(),
        err,
    })
}

// `Url::join` treats the last path segment as a file name unless it ends in
// a slash, so the site root must always carry one.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// The result of loading a [`Config`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading a [`Config`].
#[derive(Debug)]
pub enum Error {
    /// Returned when no [`PROJECT_FILE`] exists in the start directory or any
    /// of its ancestors.
    ProjectNotFound,

    /// Returned when the project file has no parent directory.
    NoParent(PathBuf),

    /// Returned when a config file can't be opened.
    Open { path: PathBuf, err: std::io::Error },

    /// Returned when a config file isn't valid YAML or has the wrong shape.
    DeserializeYaml { path: PathBuf, err: serde_yaml::Error },

    /// Returned when `posts_per_page` is zero.
    InvalidPageSize,

    /// Returned when a configured URL can't be joined onto the site root.
    UrlParse(url::ParseError),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ProjectNotFound => write!(
                f,
                "Could not find `{}` in any parent directory",
                PROJECT_FILE
            ),
            Error::NoParent(path) => write!(
                f,
                "Can't get parent directory for project file '{}'",
                path.display()
            ),
            Error::Open { path, err } => {
                write!(f, "Opening config file '{}': {}", path.display(), err)
            }
            Error::DeserializeYaml { path, err } => {
                write!(f, "Parsing config file '{}': {}", path.display(), err)
            }
            Error::InvalidPageSize => {
                write!(f, "`posts_per_page` must be at least 1")
            }
            Error::UrlParse(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ProjectNotFound => None,
            Error::NoParent(_) => None,
            Error::Open { path: _, err } => Some(err),
            Error::DeserializeYaml { path: _, err } => Some(err),
            Error::InvalidPageSize => None,
            Error::UrlParse(err) => Some(err),
        }
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL joining functions.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn write_project(root: &Path, project: &str) {
        fs::create_dir_all(root.join("theme")).unwrap();
        fs::write(root.join(PROJECT_FILE), project).unwrap();
        fs::write(
            root.join("theme/theme.yaml"),
            "index_template: [base.html, index.html]\nposts_template: [base.html, post.html]\n",
        )
        .unwrap();
    }

    #[test]
    fn test_from_directory_searches_ancestors() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        write_project(
            dir.path(),
            "title: Blog\nsite_root: https://example.org/blog\nposts_per_page: 3\ntoc:\n  fromHeading: 3\n",
        );
        let nested = dir.path().join("posts/drafts");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::from_directory(&nested, Path::new("/tmp/out"))?;
        assert_eq!("Blog", config.title);
        assert_eq!("https://example.org/blog/", config.site_root.as_str());
        assert_eq!("https://example.org/blog/posts/", config.posts_url.as_str());
        assert_eq!("https://example.org/blog/", config.home_page.as_str());
        assert_eq!(3, config.posts_per_page);
        assert_eq!(5, config.max_page_links);
        assert_eq!(3, config.toc.from_heading);
        assert_eq!(6, config.toc.to_heading);
        assert_eq!(
            vec![dir.path().join("theme/base.html"), dir.path().join("theme/post.html")],
            config.page_template,
        );
        assert_eq!(Path::new("/tmp/out/tags"), config.tags_output_directory);
        Ok(())
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_project(
            dir.path(),
            "title: Blog\nsite_root: https://example.org/\nposts_per_page: 0\n",
        );
        match Config::from_directory(dir.path(), Path::new("/tmp/out")) {
            Err(Error::InvalidPageSize) => {}
            other => panic!("wanted InvalidPageSize; found {:?}", other.map(|c| c.title)),
        }
    }

    #[test]
    fn test_missing_project() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::from_project_file(&dir.path().join(PROJECT_FILE), Path::new("out")).is_err());
    }
}
