//! Exports [`convert_site`], which turns the mirrored pages listed in the
//! project's page inventory into Markdown pages with front matter. Assets
//! referenced by each page are resolved against the mirror, copied into the
//! site's asset tree and the page's references rewritten to the copies.
//!
//! YouTube videos a page mentions without embedding them in its content are
//! appended as embeds under a trailing heading, and an `assets_manifest.json`
//! listing every relocated asset and video is written beside the pages.
//!
//! Everything here is recoverable per item except writing the page files:
//! a missing source page is skipped, an unresolved asset keeps its original
//! reference.

use crate::asset::{Relocator, Resolver};
use crate::config::{Config, PageDescriptor};
use crate::extract::{Document, Video};
use crate::frontmatter::DELIMITER;
use crate::markdown::{Commonmark, Converter};
use crate::preserve::Filter;
use crate::rewrite::ASSET_ROOT;
use crate::util::read_lossy;
use log::{debug, info, warn};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;
use thiserror::Error;

/// The manifest written to the site directory.
pub const MANIFEST_FILE: &str = "assets_manifest.json";

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("blank-run pattern is valid"));

/// Counts reported at the end of a conversion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub pages_created: usize,

    /// Listed pages whose source file could not be read.
    pub pages_skipped: usize,

    /// Distinct files copied into the asset tree.
    pub assets_copied: usize,

    /// References that were external, missing or failed to copy.
    pub assets_unresolved: usize,

    /// Copies that replaced a different source relocated earlier in the run.
    pub asset_collisions: usize,

    /// Video embeds added to the end of pages.
    pub videos_appended: usize,
}

/// The contents of [`MANIFEST_FILE`].
#[derive(Debug, Default, Serialize)]
struct Manifest {
    /// Relocated asset references, e.g. `/assets/wp-content/uploads/a.png`.
    assets: BTreeSet<String>,

    /// YouTube video ids found across all pages.
    videos: BTreeSet<String>,
}

/// Converts the pages listed in `config` with the [`Commonmark`] converter.
pub fn convert_site(config: &Config) -> Result<Summary> {
    SiteConverter::new(config, Commonmark).convert()
}

pub struct SiteConverter<'a, C> {
    config: &'a Config,
    converter: C,
    filter: Filter<'static>,
}

/// A page ready to be written as Markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedPage {
    pub slug: String,
    pub title: String,
    pub source: String,
    pub markdown: String,

    /// Every video the source page mentions, embedded or not.
    pub videos: Vec<Video>,
}

impl ConvertedPage {
    /// The page file contents: front matter followed by the Markdown body.
    pub fn to_source(&self) -> String {
        format!(
            "{d}\ntitle: \"{}\"\noriginal_file: {}\nlayout: default\n{d}\n\n{}\n",
            self.title.replace(|c: char| c == '\r' || c == '\n', " "),
            self.source,
            self.markdown,
            d = DELIMITER,
        )
    }
}

impl<'a, C: Converter> SiteConverter<'a, C> {
    pub fn new(config: &'a Config, converter: C) -> SiteConverter<'a, C> {
        SiteConverter {
            config,
            converter,
            filter: Filter::default(),
        }
    }

    pub fn convert(&self) -> Result<Summary> {
        let config = self.config;
        let site = &config.site_directory;
        fs::create_dir_all(site).map_err(|err| Error::Write {
            path: site.to_owned(),
            err,
        })?;

        let asset_directory = config.asset_directory();
        let url_prefix = ASSET_ROOT.trim_end_matches('/');
        let resolver = Resolver::new(&config.mirror_directory, &config.source_domain);
        let relocator = Relocator::new(
            &config.mirror_directory,
            &asset_directory,
            url_prefix,
            &config.relocation_markers,
        );

        let mut summary = Summary::default();
        let mut copied: BTreeMap<String, PathBuf> = BTreeMap::new();
        let mut manifest = Manifest::default();
        for descriptor in &config.pages {
            let source = config.mirror_directory.join(&descriptor.source);
            let html = match read_lossy(&source) {
                Ok(html) => html,
                Err(err) => {
                    warn!("skipping {}: {}", source.display(), err);
                    summary.pages_skipped += 1;
                    continue;
                }
            };

            let mut assets = Assets {
                resolver: &resolver,
                relocator: &relocator,
                copied: &mut copied,
                unresolved: 0,
                collisions: 0,
            };
            let page = self.convert_page(descriptor, &html, &mut assets);
            summary.assets_unresolved += assets.unresolved;
            summary.asset_collisions += assets.collisions;
            summary.videos_appended += page.videos.iter().filter(|v| !v.embedded).count();
            manifest
                .videos
                .extend(page.videos.iter().map(|video| video.id.clone()));

            let path = site.join(format!("{}.md", page.slug));
            fs::write(&path, page.to_source()).map_err(|err| Error::Write {
                path: path.clone(),
                err,
            })?;
            info!("created {}", path.display());
            summary.pages_created += 1;
        }

        summary.assets_copied = copied.len();
        manifest.assets = copied.into_keys().collect();
        let path = site.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&manifest)?;
        fs::write(&path, json).map_err(|err| Error::Write {
            path: path.clone(),
            err,
        })?;
        debug!("wrote {}", path.display());
        Ok(summary)
    }

    /// Extracts, relocates assets for and converts a single mirrored page.
    fn convert_page(
        &self,
        descriptor: &PageDescriptor,
        html: &str,
        assets: &mut Assets,
    ) -> ConvertedPage {
        let markers = &self.config.relocation_markers;
        let slug = descriptor.slug();
        let document = Document::parse(html);
        let title = descriptor
            .title
            .clone()
            .or_else(|| document.title())
            .unwrap_or_else(|| format!("page-{}", slug));

        let mut replacements = BTreeMap::new();
        for reference in document.content_references(markers) {
            if let Some(new_reference) = assets.relocate(&reference) {
                replacements.insert(reference, new_reference);
            }
        }
        for reference in document.head_references(markers) {
            assets.relocate(&reference);
        }
        let rewritten = document.rewrite(&replacements);
        debug!("{}: rewrote {} references", descriptor.source, rewritten);

        let videos = document.videos();
        let mut markdown = self.to_markdown(&document.content_html());
        let mut appended = videos.iter().filter(|video| !video.embedded).peekable();
        if appended.peek().is_some() {
            markdown.push_str(&format!("\n\n## {}", self.config.video_heading));
            for video in appended {
                markdown.push_str("\n\n");
                markdown.push_str(&video.embed_html());
            }
        }

        ConvertedPage {
            markdown,
            source: descriptor.source.clone(),
            slug,
            title,
            videos,
        }
    }

    /// Reduces HTML to Markdown, keeping embeds as raw HTML.
    pub fn to_markdown(&self, html: &str) -> String {
        let (shielded, placeholders) = self.filter.preserve(html);
        let markdown = self.converter.to_markdown(&shielded);
        let restored = self.filter.restore(&markdown, placeholders);
        for token in &restored.missing {
            warn!("placeholder {} was lost during Markdown conversion", token);
        }
        BLANK_RUNS
            .replace_all(&restored.text, "\n\n")
            .trim()
            .to_owned()
    }
}

/// Resolves and relocates the assets of the page being converted.
struct Assets<'r, 'c> {
    resolver: &'r Resolver<'r>,
    relocator: &'r Relocator<'r>,

    /// Every reference relocated so far in this conversion, with the file
    /// it was copied from.
    copied: &'c mut BTreeMap<String, PathBuf>,

    /// References of this page that could not be relocated.
    unresolved: usize,

    /// Copies of this page that overwrote a different source.
    collisions: usize,
}

impl Assets<'_, '_> {
    /// Returns the relocated reference, or `None` when the asset stays where
    /// it is.
    fn relocate(&mut self, reference: &str) -> Option<String> {
        let source = match self.resolver.resolve(reference) {
            Some(source) => source,
            None => {
                debug!("unresolved asset {}", reference);
                self.unresolved += 1;
                return None;
            }
        };
        match self.relocator.relocate(&source) {
            Ok(relocated) => {
                let previous = self.copied.insert(relocated.reference.clone(), source.clone());
                if let Some(previous) = previous.filter(|previous| *previous != source) {
                    warn!(
                        "{} overwrote {} at {}",
                        source.display(),
                        previous.display(),
                        relocated.path.display()
                    );
                    self.collisions += 1;
                }
                Some(relocated.reference)
            }
            Err(err) => {
                warn!("{}", err);
                self.unresolved += 1;
                None
            }
        }
    }
}

/// The result of a fallible conversion.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error that aborts a conversion.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned for I/O problems writing page files or the manifest.
    #[error("writing `{}`: {err}", path.display())]
    Write { path: PathBuf, err: std::io::Error },

    /// Returned when the asset manifest can't be serialized.
    #[error("serializing asset manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}
