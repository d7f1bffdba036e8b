//! Exports [`build_site`], which renders the Markdown pages of the site
//! directory into the output directory: the static asset tree is copied
//! first, then each page runs through front-matter splitting, raw-HTML
//! preservation, Markdown conversion, restoration, base-path rewriting and
//! the layout template.
//!
//! Pages are processed one at a time in file-name order, so two builds of
//! unchanged sources produce identical output.

use crate::config::{Config, SiteConfig, HOME_SLUG};
use crate::markdown::{Commonmark, Converter};
use crate::page::Page;
use crate::preserve::Filter;
use crate::rewrite::{Rewriter, ASSET_ROOT};
use crate::template::{self, Template, Values};
use crate::util::{read_lossy, replace_tree};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const MARKDOWN_EXTENSION: &str = "md";

/// Counts reported at the end of a build.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub pages_written: usize,

    /// Pages that were listed but could not be read.
    pub pages_skipped: usize,

    /// Files copied from the static asset tree.
    pub assets_copied: usize,

    /// Placeholder tokens that survived into the output.
    pub unrestored_placeholders: usize,
}

/// Builds the site described by `config` with the [`Commonmark`] converter.
pub fn build_site(config: &Config) -> Result<Summary> {
    Builder::new(config, Commonmark).build()
}

/// Renders pages with a particular [`Converter`].
pub struct Builder<'a, C> {
    config: &'a Config,
    converter: C,
    filter: Filter<'static>,
}

impl<'a, C: Converter> Builder<'a, C> {
    pub fn new(config: &'a Config, converter: C) -> Builder<'a, C> {
        Builder {
            config,
            converter,
            filter: Filter::default(),
        }
    }

    /// Runs the build. A missing layout aborts before anything is written;
    /// unreadable pages are skipped and counted.
    pub fn build(&self) -> Result<Summary> {
        let template = Template::load(&self.config.layout)?;
        let site = SiteConfig::load(&self.config.site_config_file())?;
        let rewriter = Rewriter::new(&site.baseurl, ASSET_ROOT);
        let mut summary = Summary::default();

        let output = &self.config.output_directory;
        fs::create_dir_all(output).map_err(|err| Error::Write {
            path: output.to_owned(),
            err,
        })?;

        let assets = self.config.asset_directory();
        if assets.is_dir() {
            let destination = self.config.output_asset_directory();
            summary.assets_copied =
                replace_tree(&assets, &destination).map_err(|err| Error::CopyAssets {
                    path: destination.clone(),
                    err,
                })?;
            info!(
                "copied {} assets to {}",
                summary.assets_copied,
                destination.display()
            );
        }

        for source in self.page_sources()? {
            let text = match read_lossy(&source) {
                Ok(text) => text,
                Err(err) => {
                    warn!("skipping page {}: {}", source.display(), err);
                    summary.pages_skipped += 1;
                    continue;
                }
            };
            let page = Page::parse(&source, &text);
            let (html, unrestored) = self.render(&page, &template, &site, &rewriter);
            summary.unrestored_placeholders += unrestored;

            let path = self.output_path(&page.slug);
            write_file(&path, &html)?;
            info!("wrote {}", path.display());
            summary.pages_written += 1;
        }

        Ok(summary)
    }

    /// The Markdown files of the site directory, minus excluded stems,
    /// sorted by file name.
    pub fn page_sources(&self) -> Result<Vec<PathBuf>> {
        let dir = &self.config.site_directory;
        let entries = fs::read_dir(dir).map_err(|err| Error::ListPages {
            path: dir.to_owned(),
            err,
        })?;

        let mut sources = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|err| Error::ListPages {
                    path: dir.to_owned(),
                    err,
                })?
                .path();
            let is_markdown = path.extension().map_or(false, |ext| ext == MARKDOWN_EXTENSION);
            let excluded = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map_or(true, |stem| {
                    self.config.excluded_pages.iter().any(|name| name == stem)
                });
            if is_markdown && !excluded && path.is_file() {
                sources.push(path);
            }
        }
        sources.sort();
        Ok(sources)
    }

    /// Renders one page through the layout. Returns the HTML and the number
    /// of placeholders that could not be restored.
    pub fn render(
        &self,
        page: &Page,
        template: &Template,
        site: &SiteConfig,
        rewriter: &Rewriter,
    ) -> (String, usize) {
        let (shielded, placeholders) = self.filter.preserve(&page.body);
        let converted = self.converter.to_html(&shielded);
        let restored = self.filter.restore(&converted, placeholders);
        for token in &restored.missing {
            warn!(
                "placeholder {} was lost during conversion of {}",
                token,
                page.source.display()
            );
        }
        let content = rewriter.rewrite(&restored.text);
        debug!("rendering {} ({} bytes)", page.slug, content.len());

        let html = template.render(&Values {
            content: &content,
            page_title: &page.title,
            site_title: &site.title,
            site_baseurl: &site.baseurl,
        });
        (html, restored.missing.len())
    }

    /// The home page is written to the output root; every other page to
    /// `{slug}/index.html`.
    pub fn output_path(&self, slug: &str) -> PathBuf {
        let output = &self.config.output_directory;
        match slug == HOME_SLUG {
            true => output.join("index.html"),
            false => output.join(slug).join("index.html"),
        }
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| Error::Write {
            path: parent.to_owned(),
            err,
        })?;
    }
    fs::write(path, contents).map_err(|err| Error::Write {
        path: path.to_owned(),
        err,
    })
}

/// The result of a fallible build operation.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Every variant aborts the build.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the layout is missing or unreadable.
    #[error(transparent)]
    Template(#[from] template::Error),

    /// Returned when `_config.yml` exists but can't be read.
    #[error(transparent)]
    Config(#[from] crate::config::Error),

    /// Returned when the site directory can't be listed.
    #[error("listing pages in `{}`: {err}", path.display())]
    ListPages { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems copying the static asset tree.
    #[error("copying assets to `{}`: {err}", path.display())]
    CopyAssets { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems writing output files.
    #[error("writing `{}`: {err}", path.display())]
    Write { path: PathBuf, err: std::io::Error },
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_output_path() {
        let config = Config::rooted_at(Path::new("/proj"));
        let builder = Builder::new(&config, Commonmark);
        assert_eq!(PathBuf::from("/proj/site/_site/index.html"), builder.output_path("index"));
        assert_eq!(
            PathBuf::from("/proj/site/_site/about/index.html"),
            builder.output_path("about")
        );
    }

    #[test]
    fn test_page_sources_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        let config = Config::rooted_at(dir.path());
        fs::create_dir_all(config.site_directory.join("notes.md")).unwrap();
        for name in ["zeta.md", "README.md", "alpha.md", "index.md", "style.css"] {
            fs::write(config.site_directory.join(name), "x").unwrap();
        }
        let builder = Builder::new(&config, Commonmark);
        let names: Vec<String> = builder
            .page_sources()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(vec!["alpha.md", "index.md", "zeta.md"], names);
    }

    #[test]
    fn test_render_page() {
        let config = Config::rooted_at(Path::new("/proj"));
        let builder = Builder::new(&config, Commonmark);
        let template = Template::new("<h1>{{ page.title }}</h1>{{ content }}");
        let site = SiteConfig {
            title: "Site".to_owned(),
            baseurl: "/sub".to_owned(),
        };
        let page = Page::parse(
            Path::new("about.md"),
            "---\ntitle: About\n---\n![a](/assets/a.png)\n\n<iframe src=\"https://v.example/e\">\n\n</iframe>\n",
        );
        let (html, unrestored) = builder.render(&page, &template, &site, &Rewriter::new(&site.baseurl, ASSET_ROOT));
        assert_eq!(0, unrestored);
        assert_eq!(
            "<h1>About</h1><p><img src=\"/sub/assets/a.png\" alt=\"a\" /></p>\n\
             <iframe src=\"https://v.example/e\">\n\n</iframe>\n",
            html
        );
    }
}
