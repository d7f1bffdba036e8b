//! Project configuration. A `mirror2site.yaml` project file is searched for
//! from a starting directory upward; its settings are resolved into a
//! [`Config`] of concrete paths that is handed to the orchestrators. The
//! site's own `_config.yml` is read separately into a [`SiteConfig`].

use crate::frontmatter::Fields;
use crate::util::read_lossy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The project file name.
pub const PROJECT_FILE: &str = "mirror2site.yaml";

/// The slug whose page is written to the output root.
pub const HOME_SLUG: &str = "index";

const DEFAULT_SITE_TITLE: &str = "Static Site";

const DEFAULT_VIDEO_HEADING: &str = "Videos";

/// An entry in the page inventory converted from the mirror.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PageDescriptor {
    /// The page's file name relative to the mirror root (e.g.
    /// `page_125.html`).
    pub source: String,

    /// The output slug. Derived from the source file stem when absent.
    #[serde(default)]
    pub slug: Option<String>,

    /// The page title. Taken from the page's `<title>` when absent.
    #[serde(default)]
    pub title: Option<String>,
}

impl PageDescriptor {
    pub fn new(source: &str) -> PageDescriptor {
        PageDescriptor {
            source: source.to_owned(),
            slug: None,
            title: None,
        }
    }

    pub fn slug(&self) -> String {
        match &self.slug {
            Some(slug) => slug.clone(),
            None => {
                let stem = Path::new(&self.source)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                slug::slugify(stem)
            }
        }
    }
}

#[derive(Deserialize, Default)]
struct Project {
    #[serde(default)]
    site_directory: Option<PathBuf>,

    #[serde(default)]
    output_directory: Option<PathBuf>,

    #[serde(default)]
    mirror_directory: Option<PathBuf>,

    #[serde(default)]
    source_domain: String,

    #[serde(default)]
    layout: Option<PathBuf>,

    #[serde(default)]
    excluded_pages: Option<Vec<String>>,

    #[serde(default)]
    relocation_markers: Option<Vec<String>>,

    #[serde(default)]
    video_heading: Option<String>,

    #[serde(default)]
    pages: Vec<PageDescriptor>,
}

/// Fully resolved build settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Source tree holding `_config.yml`, the layout, `assets/` and the
    /// Markdown pages.
    pub site_directory: PathBuf,

    /// Where the rendered site is written.
    pub output_directory: PathBuf,

    /// Root of the mirrored snapshot.
    pub mirror_directory: PathBuf,

    /// Host whose absolute URLs resolve into the mirror.
    pub source_domain: String,

    /// The layout template.
    pub layout: PathBuf,

    /// Page file stems that are never built.
    pub excluded_pages: Vec<String>,

    /// Ordered segment markers for asset relocation.
    pub relocation_markers: Vec<String>,

    /// Heading of the section that collects a page's unembedded videos.
    pub video_heading: String,

    /// The pages converted from the mirror, in order.
    pub pages: Vec<PageDescriptor>,
}

impl Config {
    /// Searches `dir` and its ancestors for [`PROJECT_FILE`]. Without one,
    /// returns the defaults rooted at `dir`.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let mut current = Some(dir);
        while let Some(candidate) = current {
            let path = candidate.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path);
            }
            current = candidate.parent();
        }
        Ok(Config::rooted_at(dir))
    }

    /// Loads a project file. Relative paths in it are relative to the
    /// directory containing the file.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let text = read_lossy(path).map_err(|err| Error::Read {
            path: path.to_owned(),
            err,
        })?;
        let project: Project = match text.trim().is_empty() {
            true => Project::default(),
            false => serde_yaml::from_str(&text).map_err(|err| Error::Parse {
                path: path.to_owned(),
                err,
            })?,
        };
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(Config::from_project(root, project))
    }

    /// The default settings for a project rooted at `root`.
    pub fn rooted_at(root: &Path) -> Config {
        Config::from_project(root, Project::default())
    }

    fn from_project(root: &Path, project: Project) -> Config {
        let site_directory = root.join(project.site_directory.unwrap_or_else(|| "site".into()));
        Config {
            output_directory: match project.output_directory {
                Some(dir) => root.join(dir),
                None => site_directory.join("_site"),
            },
            mirror_directory: root.join(project.mirror_directory.unwrap_or_else(|| "mirror".into())),
            source_domain: project.source_domain,
            layout: site_directory.join(
                project
                    .layout
                    .unwrap_or_else(|| Path::new("_layouts").join("default.html")),
            ),
            excluded_pages: project
                .excluded_pages
                .unwrap_or_else(|| vec!["README".to_owned(), "Gemfile".to_owned()]),
            relocation_markers: project.relocation_markers.unwrap_or_else(|| {
                vec![
                    "wp-content/uploads".to_owned(),
                    "wp-content/themes".to_owned(),
                    "wp-includes".to_owned(),
                ]
            }),
            video_heading: project
                .video_heading
                .unwrap_or_else(|| DEFAULT_VIDEO_HEADING.to_owned()),
            pages: project.pages,
            site_directory,
        }
    }

    /// The site's `_config.yml`.
    pub fn site_config_file(&self) -> PathBuf {
        self.site_directory.join("_config.yml")
    }

    /// The static asset tree copied verbatim into the output, and the
    /// destination of relocated page assets.
    pub fn asset_directory(&self) -> PathBuf {
        self.site_directory.join("assets")
    }

    pub fn output_asset_directory(&self) -> PathBuf {
        self.output_directory.join("assets")
    }
}

/// Site-wide values from `_config.yml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub title: String,

    /// Path prefix for subdirectory deployments. Empty when served from `/`.
    pub baseurl: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            title: DEFAULT_SITE_TITLE.to_owned(),
            baseurl: String::new(),
        }
    }
}

impl SiteConfig {
    /// Parses the flat `key: value` dialect, skipping `#` comment lines.
    /// Missing keys take defaults.
    pub fn parse(text: &str) -> SiteConfig {
        let uncommented: Vec<&str> = text
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .collect();
        let fields = Fields::parse(&uncommented.join("\n"));
        let defaults = SiteConfig::default();
        SiteConfig {
            title: fields.get("title").map_or(defaults.title, str::to_owned),
            baseurl: fields.get("baseurl").map_or(defaults.baseurl, str::to_owned),
        }
    }

    /// Reads `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<SiteConfig> {
        match read_lossy(path) {
            Ok(text) => Ok(SiteConfig::parse(&text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(SiteConfig::default()),
            Err(err) => Err(Error::Read {
                path: path.to_owned(),
                err,
            }),
        }
    }
}

/// The result of a fallible configuration operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when a configuration file can't be read.
    #[error("reading `{}`: {err}", path.display())]
    Read { path: PathBuf, err: std::io::Error },

    /// Returned when the project file isn't valid YAML for a project.
    #[error("parsing project file `{}`: {err}", path.display())]
    Parse {
        path: PathBuf,
        err: serde_yaml::Error,
    },
}
