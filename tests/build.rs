use mirror2site::build::{build_site, Builder, Error};
use mirror2site::config::Config;
use mirror2site::markdown::{Commonmark, Converter};
use mirror2site::template;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

const LAYOUT: &str = "<!DOCTYPE html>\n<html><head><title>{{ page.title }} | {{ site.title }}</title>\
<link rel=\"stylesheet\" href=\"{{ site.baseurl }}/assets/css/site.css\"></head>\
<body><main>{{ content }}</main></body></html>\n";

const EMBED: &str = "<iframe width=\"100%\" height=\"480\" src=\"https://www.youtube.com/embed/abc\"\n  allowfullscreen></iframe>";

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn site(root: &Path, baseurl: &str) -> Config {
    let config = Config::rooted_at(root);
    let site = &config.site_directory;
    write(&config.layout, LAYOUT);
    write(
        &site.join("_config.yml"),
        &format!("title: \"Example Site\"\nbaseurl: \"{}\"\n", baseurl),
    );
    write(&site.join("assets/css/site.css"), "body {}\n");
    write(&site.join("assets/js/main.js"), "// main\n");
    write(
        &site.join("index.md"),
        "---\ntitle: \"Home\"\nlayout: default\n---\n\n# Welcome\n\n![logo](/assets/img/logo.png)\n",
    );
    write(
        &site.join("about.md"),
        &format!("---\ntitle: About\n---\n\nAbout us.\n\n{}\n\nLinks: [b](https://example.com/assets/b.png)\n", EMBED),
    );
    write(&site.join("README.md"), "# Not a page\n");
    config
}

fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(dir)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            (
                e.path().strip_prefix(dir).unwrap().to_owned(),
                fs::read(e.path()).unwrap(),
            )
        })
        .collect()
}

#[test]
fn test_home_and_slug_routing() {
    let dir = TempDir::new().unwrap();
    let config = site(dir.path(), "");
    let summary = build_site(&config).unwrap();

    assert_eq!(2, summary.pages_written);
    assert_eq!(0, summary.pages_skipped);
    assert_eq!(2, summary.assets_copied);

    let out = &config.output_directory;
    let home = fs::read_to_string(out.join("index.html")).unwrap();
    assert!(home.contains("<title>Home | Example Site</title>"), "{}", home);
    assert!(home.contains("<h1>Welcome</h1>"), "{}", home);
    assert!(out.join("about/index.html").is_file());
    assert!(!out.join("README").exists());
    assert!(out.join("assets/css/site.css").is_file());
    assert!(out.join("assets/js/main.js").is_file());
}

#[test]
fn test_embeds_survive_conversion() {
    let dir = TempDir::new().unwrap();
    let config = site(dir.path(), "");
    build_site(&config).unwrap();

    let about = fs::read_to_string(config.output_directory.join("about/index.html")).unwrap();
    assert_eq!(1, about.matches(EMBED).count(), "{}", about);
    assert!(!about.contains("RAWHTMLBLOCK"), "{}", about);
}

#[test]
fn test_base_path_rewrite() {
    let dir = TempDir::new().unwrap();
    let config = site(dir.path(), "/site");
    build_site(&config).unwrap();

    let out = &config.output_directory;
    let home = fs::read_to_string(out.join("index.html")).unwrap();
    assert!(home.contains("src=\"/site/assets/img/logo.png\""), "{}", home);
    assert!(home.contains("href=\"/site/assets/css/site.css\""), "{}", home);

    let about = fs::read_to_string(out.join("about/index.html")).unwrap();
    assert!(about.contains("href=\"https://example.com/assets/b.png\""), "{}", about);
}

#[test]
fn test_idempotent() {
    let dir = TempDir::new().unwrap();
    let config = site(dir.path(), "/site");
    build_site(&config).unwrap();
    let first = snapshot(&config.output_directory);
    build_site(&config).unwrap();
    assert_eq!(first, snapshot(&config.output_directory));
}

#[test]
fn test_assets_replaced_wholesale() {
    let dir = TempDir::new().unwrap();
    let config = site(dir.path(), "");
    let stale = config.output_directory.join("assets/old.css");
    write(&stale, "stale");
    build_site(&config).unwrap();
    assert!(!stale.exists());
}

#[test]
fn test_missing_template_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = site(dir.path(), "");
    fs::remove_file(&config.layout).unwrap();

    match build_site(&config) {
        Err(Error::Template(template::Error::Missing(path))) => assert_eq!(config.layout, path),
        other => panic!("wanted missing template error, got {:?}", other),
    }
    assert!(!config.output_directory.exists());
}

/// Wraps every non-empty line in bold paragraphs, the way a converter that
/// mistakes a lone token for emphasis would.
struct Emphasizing;

impl Converter for Emphasizing {
    fn to_html(&self, markdown: &str) -> String {
        markdown
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| format!("<p><strong>{}</strong></p>\n", line.trim()))
            .collect()
    }

    fn to_markdown(&self, html: &str) -> String {
        Commonmark.to_markdown(html)
    }
}

#[test]
fn test_placeholder_round_trip_with_wrapping_converter() {
    let dir = TempDir::new().unwrap();
    let config = site(dir.path(), "");
    let other = "<iframe src=\"https://player.example/v\"></iframe>";
    write(
        &config.site_directory.join("videos.md"),
        &format!("---\ntitle: Videos\n---\n{}\n\ntext\n\n{}\n\n{}\n", EMBED, other, EMBED),
    );

    let summary = Builder::new(&config, Emphasizing).build().unwrap();
    assert_eq!(0, summary.unrestored_placeholders);

    let videos = fs::read_to_string(config.output_directory.join("videos/index.html")).unwrap();
    assert_eq!(2, videos.matches(EMBED).count(), "{}", videos);
    assert_eq!(1, videos.matches(other).count(), "{}", videos);
    assert!(!videos.contains("RAWHTMLBLOCK"), "{}", videos);
}

/// Drops everything, losing the placeholder tokens.
struct Lossy;

impl Converter for Lossy {
    fn to_html(&self, _markdown: &str) -> String {
        String::new()
    }

    fn to_markdown(&self, _html: &str) -> String {
        String::new()
    }
}

#[test]
fn test_lost_placeholders_are_counted() {
    let dir = TempDir::new().unwrap();
    let config = site(dir.path(), "");
    let summary = Builder::new(&config, Lossy).build().unwrap();
    assert_eq!(2, summary.pages_written);
    assert_eq!(1, summary.unrestored_placeholders);
}
