mod logging;
mod render;

use anyhow::Result;
use clap::Parser;
use journalpix_core::{Config, Exporter};
use render::{ColorMode, RenderOptions, Renderer};
use std::path::PathBuf;
use std::process::ExitCode;

/// journalpix: export the photographs of a journal PDF as captioned, backdated image files
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Prints the config file locations that are searched, then exits
    #[arg(long, exclusive = true)]
    config_path: bool,
    /// PDF export to read (defaults to `input` from the config file, or `input.pdf`)
    input: Option<PathBuf>,
    /// Directory to write images into (e.g., `journalpix export.pdf -o photos`)
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Zero-based index of the first page to scan; earlier pages (cover, index) are skipped
    #[arg(long, env = "JOURNALPIX_START_PAGE")]
    start_page: Option<usize>,
    /// Program used to embed captions into the images
    #[arg(long)]
    exiftool: Option<String>,
    /// Write and backdate images without embedding captions
    #[arg(long)]
    no_tags: bool,
    /// List the entries and files that would be written, without writing anything
    #[arg(long, short = 'n')]
    dry_run: bool,
    /// Control ANSI colors in output.
    /// By default, colors are disabled when output is redirected (e.g with `>` or `|`).
    #[arg(long, value_enum, default_value_t = ColorMode::Auto)]
    color: ColorMode,
    /// Log progress to stderr (same as `--log-level debug`)
    #[arg(long, short)]
    verbose: bool,
    /// Log filter, e.g. `info` or `journalpix_core=trace`
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("journalpix: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose, cli.log_level.as_deref())?;

    let renderer = Renderer::new(Some(RenderOptions {
        date_format: "%a, %d %b %Y %H:%M".to_string(),
        use_color: cli.color.use_color(),
    }));

    if cli.config_path {
        for path in Config::config_file_paths() {
            renderer.print_line(&path.display().to_string());
        }
        return Ok(());
    }

    let config = apply_overrides(Config::load()?, &cli);
    tracing::debug!(?config, dry_run = cli.dry_run, "resolved configuration");
    let exporter = Exporter::with_config(config);
    let summary = exporter.run(cli.dry_run)?;

    renderer.print_entries(&summary.entries);
    let verb = if cli.dry_run { "Would write" } else { "Wrote" };
    renderer.print_info(&format!(
        "{verb} {} images from {} entries ({} pages scanned) to {}",
        summary.image_count(),
        summary.entries.len(),
        summary.pages_scanned,
        exporter.config.output_dir.display()
    ));
    if summary.unfinished {
        renderer.print_info("The last entry was incomplete and was skipped.");
    }

    Ok(())
}

fn apply_overrides(mut config: Config, cli: &Cli) -> Config {
    if let Some(input) = &cli.input {
        config.input = input.clone();
    }
    if let Some(output) = &cli.output {
        config.output_dir = output.clone();
    }
    if let Some(start_page) = cli.start_page {
        config.start_page = start_page;
    }
    if let Some(exiftool) = &cli.exiftool {
        config.exiftool = exiftool.clone();
    }
    if cli.no_tags {
        config.tag_captions = false;
    }
    config
}
