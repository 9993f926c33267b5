//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: parsing the posts and pages
//! ([`crate::post`]), creating and rendering pages ([`crate::pages`],
//! [`crate::write`]), copying static files, and generating the Atom feed.

use crate::config::Config;
use crate::feed::{write_feed, Error as FeedError, FeedConfig};
use crate::pages::create_pages;
use crate::post::{Error as ParseError, Parser as PostParser, StaticFile};
use crate::site::Site;
use crate::write::{Error as WriteError, Templates, Writer};
use gtmpl::Template;
use log::info;
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Builds the site from a [`Config`] object. This calls into
/// [`PostParser::parse_posts`], [`create_pages`] and [`write_feed`] which do
/// the heavy lifting. This function also copies the static assets from the
/// source directory to the output directory.
pub fn build_site(config: Config) -> Result<()> {
    let post_parser = PostParser::new(
        &config.tags_url,
        &config.posts_url,
        &config.posts_output_directory,
        &config.toc,
    );
    let page_parser = PostParser::new(
        &config.tags_url,
        &config.site_root,
        &config.root_output_directory,
        &config.toc,
    );

    // collect all posts and pages
    let (posts, static_files) =
        post_parser.parse_posts(&config.posts_source_directory)?;
    let pages = page_parser
        .parse_pages(&config.pages_source_directory, &config.required_pages)?;
    info!("Parsed {} posts and {} pages", posts.len(), pages.len());
    let site = Site::new(posts, pages, &config.popular_posts);

    // Parse the template files.
    let templates = Templates {
        index: parse_template(config.index_template.iter())?,
        post: parse_template(config.posts_template.iter())?,
        page: parse_template(config.page_template.iter())?,
    };

    // Blow away the old output directories so we don't have any collisions. We
    // don't naively delete the whole root output directory in case the user
    // accidentally passes the wrong directory.
    rmdir(&config.posts_output_directory)?;
    rmdir(&config.index_output_directory)?;
    rmdir(&config.tags_output_directory)?;
    rmdir(&config.static_output_directory)?;
    std::fs::create_dir_all(&config.root_output_directory)?;

    // write the post, listing and standalone pages
    let mut writer = Writer {
        site: &site,
        templates: &templates,
        output_directory: &config.root_output_directory,
        index_url: &config.index_url,
        tags_url: &config.tags_url,
        max_page_links: config.max_page_links,
        home_page: &config.home_page,
        static_url: &config.static_url,
        atom_url: &config.atom_url,
        title: &config.title,
        author: config.author.as_ref(),
        seen_dirs: HashSet::new(),
    };
    let count = create_pages(&site, config.posts_per_page, &mut writer)?;
    info!("Wrote {} pages", count);

    // copy static directory and post bundle assets
    if config.static_source_directory.is_dir() {
        copy_dir(
            &config.static_source_directory,
            &config.static_output_directory,
        )?;
    }
    copy_static_files(&static_files)?;

    // copy /pages/index.html to /index.html
    let index = config.index_output_directory.join("index.html");
    if index.is_file() {
        std::fs::copy(&index, config.root_output_directory.join("index.html"))?;
    }

    // create the atom feed
    write_feed(
        FeedConfig {
            title: config.title.clone(),
            id: config.home_page.to_string(),
            author: config.author.clone(),
            home_page: config.home_page.clone(),
            atom_url: config.atom_url.clone(),
        },
        site.posts(),
        File::create(config.root_output_directory.join("feed.atom"))?,
    )?;
    info!("Built site in {}", config.root_output_directory.display());

    Ok(())
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            copy_dir(&src.join(entry.file_name()), &dst.join(entry.file_name()))?;
        } else {
            std::fs::copy(src.join(entry.file_name()), dst.join(entry.file_name()))?;
        }
    }

    Ok(())
}

fn copy_static_files(static_files: &[StaticFile]) -> Result<()> {
    for (src, dst) in static_files {
        if let Some(dir) = dst.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::copy(src, dst)?;
    }
    Ok(())
}

// Loads the template file contents, concatenates them, and parses the result
// into a template.
fn parse_template<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<Template> {
    let mut contents = String::new();
    for template_file in template_files {
        use std::io::Read;
        let template_file = template_file.as_ref();
        File::open(&template_file)
            .map_err(|e| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err: e,
            })?
            .read_to_string(&mut contents)?;
        contents.push(' ');
    }

    let mut template = Template::default();
    template.parse(&contents).map_err(Error::ParseTemplate)?;
    Ok(template)
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during parsing, writing,
/// cleaning output directories, parsing template files, and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors during parsing.
    Parse(ParseError),

    /// Returned for errors writing pages to disk as HTML files.
    Write(WriteError),

    /// Returned for I/O problems while cleaning output directories.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate(String),

    /// Returned for errors writing the feed.
    Feed(FeedError),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => err.fmt(f),
            Error::Feed(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate(_) => None,
            Error::Feed(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}
