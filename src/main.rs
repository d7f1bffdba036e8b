use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use mirror2site::build::build_site;
use mirror2site::config::Config;
use mirror2site::convert::convert_site;
use std::path::PathBuf;

/// Converts a mirrored CMS website into a static site.
#[derive(Parser)]
#[command(name = "mirror2site", version, about)]
struct Cli {
    /// Log each page and asset as it is processed.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Start the search for `mirror2site.yaml` here instead of the current
    /// directory.
    #[arg(short = 'C', long, global = true)]
    directory: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Render the Markdown pages into the output directory (the default).
    Build,

    /// Convert the mirrored pages into Markdown pages and copy their assets.
    Convert,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            true => LevelFilter::Debug,
            false => LevelFilter::Info,
        })
        .parse_default_env()
        .init();

    let directory = match cli.directory {
        Some(directory) => directory,
        None => std::env::current_dir().context("determining the working directory")?,
    };
    let config = Config::from_directory(&directory).context("loading configuration")?;

    match cli.command.unwrap_or(Command::Build) {
        Command::Build => {
            let summary = build_site(&config).with_context(|| {
                format!("building site from `{}`", config.site_directory.display())
            })?;
            println!();
            println!("Build complete.");
            println!("  pages written: {}", summary.pages_written);
            if summary.pages_skipped > 0 {
                println!("  pages skipped: {}", summary.pages_skipped);
            }
            println!("  assets copied: {}", summary.assets_copied);
            if summary.unrestored_placeholders > 0 {
                println!("  unrestored embeds: {}", summary.unrestored_placeholders);
            }
            println!("  output: {}", config.output_directory.join("index.html").display());
        }
        Command::Convert => {
            let summary = convert_site(&config).with_context(|| {
                format!("converting mirror `{}`", config.mirror_directory.display())
            })?;
            println!();
            println!("Conversion complete.");
            println!("  pages created: {}", summary.pages_created);
            println!("  pages skipped: {}", summary.pages_skipped);
            println!("  assets copied: {}", summary.assets_copied);
            println!("  assets left in place: {}", summary.assets_unresolved);
            if summary.asset_collisions > 0 {
                println!("  assets overwritten: {}", summary.asset_collisions);
            }
            println!("  videos appended: {}", summary.videos_appended);
        }
    }
    Ok(())
}
