//! The library code for the `inkpost` static site generator. A build proceeds
//! in three steps:
//!
//! 1. Parsing posts and standalone pages from Markdown source files on disk
//!    ([`crate::post`]). Headings get anchors and a fenced `toc` block is
//!    replaced with a table of contents ([`crate::markdown`], [`crate::toc`]).
//! 2. Deciding which output pages exist ([`crate::pages`]): one per post, one
//!    per standalone page, and paginated listings of all posts and of each
//!    tag ([`crate::paginate`], [`crate::tag`]).
//! 3. Rendering every page through the theme's templates ([`crate::write`])
//!    and writing the Atom feed ([`crate::feed`]).
//!
//! [`crate::build::build_site`] ties the steps together.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod feed;
mod htmlrenderer;
pub mod markdown;
pub mod pages;
pub mod paginate;
pub mod post;
pub mod site;
pub mod tag;
pub mod toc;
pub mod write;
