use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

use cvpress::{Document, ExportConfig, Exporter, PageImageMode, Viewport, DEFAULT_FILENAME};

#[derive(Parser)]
#[command(name = "cvpress", version, about = "Export a résumé preview to a paginated PDF")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture an element of an HTML file and save it as an A4 PDF
    Export {
        /// HTML file holding the rendered résumé
        html: PathBuf,
        /// Id of the element to capture
        #[arg(long, default_value = "resume-preview")]
        element: String,
        /// Output file name
        #[arg(long, default_value = DEFAULT_FILENAME)]
        out: String,
        /// Output directory (overrides the config file)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// JSON export configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Embed one cropped image per page instead of one shared image
        #[arg(long)]
        sliced: bool,
        /// Origin the document was loaded from, for cross-origin image checks
        #[arg(long)]
        base_url: Option<String>,
        /// Viewport width used for layout
        #[arg(long, default_value_t = 1280)]
        viewport_width: u32,
    },
    /// Rewrite a bullet point or summary with the enhancement service
    #[cfg(feature = "enhance")]
    Enhance {
        text: String,
        #[arg(long, value_enum, default_value_t = KindArg::Bullet)]
        kind: KindArg,
        /// Ask for improvement tips as well
        #[arg(long)]
        suggestions: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
#[cfg_attr(not(feature = "enhance"), allow(dead_code))]
enum KindArg {
    Bullet,
    Summary,
}

#[allow(clippy::too_many_arguments)]
async fn export(
    html: PathBuf,
    element: String,
    out: String,
    dir: Option<PathBuf>,
    config: Option<PathBuf>,
    sliced: bool,
    base_url: Option<String>,
    viewport_width: u32,
) -> anyhow::Result<()> {
    let mut cfg = match &config {
        Some(path) => ExportConfig::from_json_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => ExportConfig::default(),
    };
    if let Some(dir) = dir {
        cfg.output_dir = dir;
    }
    if sliced {
        cfg.page_image_mode = PageImageMode::Sliced;
    }

    let source = std::fs::read_to_string(&html).with_context(|| format!("reading {}", html.display()))?;
    let viewport = Viewport { width: viewport_width, ..Viewport::default() };
    let mut doc = Document::parse_html(&source, viewport);
    if let Some(url) = base_url {
        doc = doc.with_base_url(&url)?;
    }

    let report = Exporter::new(cfg).generate_pdf(&mut doc, &element, &out).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(feature = "enhance")]
fn enhance(text: String, kind: KindArg, suggestions: bool) -> anyhow::Result<()> {
    use cvpress::enhance::{EnhanceKind, EnhanceRequest, Enhancer, EnhancerConfig, HttpEnhancer};

    let kind = match kind {
        KindArg::Bullet => EnhanceKind::Bullet,
        KindArg::Summary => EnhanceKind::Summary,
    };
    let enhancer = HttpEnhancer::new(EnhancerConfig::from_env())?;
    let request = EnhanceRequest::new(text, kind).with_suggestions(suggestions);
    let response = enhancer.enhance(&request).context("enhancement request failed")?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Export { html, element, out, dir, config, sliced, base_url, viewport_width } => {
            export(html, element, out, dir, config, sliced, base_url, viewport_width).await
        }
        #[cfg(feature = "enhance")]
        Command::Enhance { text, kind, suggestions } => {
            // The blocking client must not run on a runtime worker thread.
            tokio::task::spawn_blocking(move || enhance(text, kind, suggestions)).await?
        }
    }
}
