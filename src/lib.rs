//! The library code for `mirror2site`, which turns a mirrored snapshot of a
//! CMS-driven website into a self-contained static site. The work splits into
//! two stages:
//!
//! 1. Converting mirrored HTML pages into Markdown pages with front matter,
//!    copying the assets they reference into the site's asset tree
//!    ([`crate::convert`])
//! 2. Rendering the Markdown pages through a layout into the output
//!    directory ([`crate::build`])
//!
//! The conversion stage leans on [`crate::extract`] to read pages and
//! [`crate::asset`] to resolve references against the mirror, where renamed
//! downloads are common. The build stage is the more delicate one: raw HTML
//! embeds do not survive a trip through Markdown, so [`crate::preserve`]
//! swaps them for placeholder tokens around the conversion and restores them
//! afterwards. [`crate::rewrite`] and [`crate::template`] then produce the
//! final page.
//!
//! Both stages are driven by a [`crate::config::Config`], so several builds
//! can run side by side against separate trees.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod asset;
pub mod build;
pub mod config;
pub mod convert;
pub mod extract;
pub mod frontmatter;
pub mod markdown;
pub mod page;
pub mod preserve;
pub mod rewrite;
pub mod template;
mod util;
