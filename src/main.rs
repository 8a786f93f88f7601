use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cdn_css_rewriter::{CdnAssetHost, RewriterConfig, StylesheetRewriter};

/// Rewrite url() references in stylesheets to content-keyed CDN URLs.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to process. Defaults to the configured stylesheets directory.
    root: Option<PathBuf>,

    /// JSON config file. Defaults to `cdn_rewrite.config.json` in the working directory.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory that absolute references resolve against.
    #[arg(long)]
    public_root: Option<PathBuf>,

    /// Delivery host prefix, e.g. `//cdn.example.com`.
    #[arg(long)]
    asset_host: Option<String>,

    /// Drop `?query` suffixes from rewritten references.
    #[arg(long)]
    strip_query_strings: bool,

    /// Report what would change without writing anything.
    #[arg(long)]
    dry_run: bool,

    /// Print the batch result as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Process files one at a time.
    #[arg(long)]
    sequential: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cdn_css_rewriter=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let host = CdnAssetHost::from_config(&config).context("invalid asset host configuration")?;
    let root = cli.root.clone().unwrap_or_else(|| config.stylesheets_dir());
    let rewriter = StylesheetRewriter::new(config, host);

    let result = if cli.dry_run {
        rewriter.rewrite_all_dry_run(&root)
    } else {
        rewriter.rewrite_all(&root)
    };

    if cli.json {
        let rendered =
            serde_json::to_string_pretty(&result).context("failed to serialise batch result")?;
        println!("{rendered}");
    } else {
        println!(
            "{}: {} rewritten, {} unchanged, {} failed, {} diagnostics",
            root.display(),
            result.rewritten().count(),
            result.unchanged().count(),
            result.failed().count(),
            result.diagnostic_count(),
        );
    }

    let failures = result.failed().count();
    if failures > 0 {
        bail!("{failures} stylesheet(s) could not be rewritten");
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<RewriterConfig> {
    let mut config = match &cli.config {
        Some(path) => RewriterConfig::from_path(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => {
            let cwd = env::current_dir().context("failed to read working directory")?;
            RewriterConfig::discover(&cwd).context("failed to load configuration")?
        }
    };

    if let Some(public_root) = &cli.public_root {
        config.public_root = public_root.clone();
    }
    if let Some(asset_host) = &cli.asset_host {
        config.asset_host = asset_host.clone();
    }
    if cli.strip_query_strings {
        config.strip_query_strings = true;
    }
    if cli.sequential {
        config.parallel = false;
    }

    Ok(config)
}
