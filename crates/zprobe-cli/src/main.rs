//! zprobe: Zstandard availability and signature CLI
//!
//! Commands:
//!   status [--json]               - is the zstd codec usable, and is the answer cached
//!   detect <path>...              - report which files start with a zstd frame
//!   compress <input> <output>     - compress a file with zstd
//!   config show                   - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

use zprobe_core::ZprobeConfig;
use zprobe_zstd::{FrameKind, HostEnvironment};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "zprobe",
    version,
    about = "Zstandard availability and format detection",
    long_about = "zprobe: check whether the zstd codec is usable, detect zstd frames, and compress files"
)]
struct Cli {
    /// Path to zprobe.toml configuration file
    #[arg(long, short = 'c', env = "ZPROBE_CONFIG", default_value = "/etc/zprobe/config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides config
    #[arg(long, env = "ZPROBE_LOG")]
    log: Option<String>,

    /// Log format; overrides config
    #[arg(long, env = "ZPROBE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show whether the zstd codec is available and how the answer is cached
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Check files for a zstd frame or skippable frame signature
    Detect {
        /// Files to inspect
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Compress a file into a single zstd frame
    Compress {
        /// Uncompressed input file
        input: PathBuf,
        /// Destination for the compressed output
        output: PathBuf,
        /// zstd level (overrides config compress.level)
        #[arg(long, short = 'l')]
        level: Option<i32>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ZprobeConfig::load(&cli.config)
        .with_context(|| format!("loading config: {}", cli.config.display()))?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = match cli.log_format {
        Some(format) => format,
        None => LogFormat::from_str(&config.log.format, true)
            .map_err(|e| anyhow::anyhow!("invalid log.format in config: {e}"))?,
    };
    init_logging(&level, &format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "zprobe starting"
    );

    zprobe_zstd::init_global(&config.codec);

    match cli.command {
        Commands::Status { json } => cmd_status(&config, json),
        Commands::Detect { paths } => cmd_detect(&paths),
        Commands::Compress { input, output, level } => {
            cmd_compress(&config, &input, &output, level)
        }
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &cli.config),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so command output on stdout stays parseable
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── `zprobe status` ───────────────────────────────────────────────────────────

fn cmd_status(config: &ZprobeConfig, json: bool) -> Result<()> {
    let support = zprobe_zstd::global();
    let available = support.is_available();
    let state = support.cached_state();
    let host = HostEnvironment::detect();
    let caching = config.codec.caching_enabled(host.plugin_host);

    if json {
        let report = serde_json::json!({
            "available": available,
            "cached": state.known().is_some(),
            "cache_state": format!("{state:?}"),
            "plugin_host": host.plugin_host || config.codec.plugin_host,
            "caching_enabled": caching,
            "compiled_with_zstd": cfg!(feature = "zstd"),
        });
        let rendered =
            serde_json::to_string_pretty(&report).context("serializing status to JSON")?;
        println!("{rendered}");
        return Ok(());
    }

    println!("zstd codec:   {}", if available { "available" } else { "unavailable" });
    println!("cache state:  {state:?}");
    println!("caching:      {}", if caching { "enabled" } else { "disabled" });
    if host.plugin_host || config.codec.plugin_host {
        println!("plugin host:  yes");
    }
    if !cfg!(feature = "zstd") {
        println!("note:         built without the `zstd` feature");
    }
    Ok(())
}

// ── `zprobe detect` ───────────────────────────────────────────────────────────

fn cmd_detect(paths: &[PathBuf]) -> Result<()> {
    let mut failures = 0usize;

    for path in paths {
        match zprobe_zstd::sniff_path(path) {
            Ok(kind) => println!("{}: {}", path.display(), describe(kind)),
            Err(e) => {
                eprintln!("{}: error: {e}", path.display());
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} paths could not be read", paths.len());
    }
    Ok(())
}

fn describe(kind: Option<FrameKind>) -> String {
    match kind {
        Some(FrameKind::Frame) => "zstd frame".into(),
        Some(FrameKind::Skippable { variant }) => {
            format!("zstd skippable frame (variant {variant:#x})")
        }
        None => "not zstd".into(),
    }
}

// ── `zprobe compress` ─────────────────────────────────────────────────────────

fn cmd_compress(
    config: &ZprobeConfig,
    input: &Path,
    output: &Path,
    level: Option<i32>,
) -> Result<()> {
    if !zprobe_zstd::is_zstd_compression_available() {
        anyhow::bail!("zstd codec is not available in this build");
    }

    let mut options = config.compress.clone();
    if let Some(level) = level {
        options.level = level;
    }

    let source =
        File::open(input).with_context(|| format!("opening input: {}", input.display()))?;
    let input_size = source
        .metadata()
        .with_context(|| format!("reading metadata: {}", input.display()))?
        .len();
    let dest =
        File::create(output).with_context(|| format!("creating output: {}", output.display()))?;
    let mut sink = BufWriter::new(dest);

    let written = zprobe_zstd::compress_stream_with_options(source, &mut sink, &options)
        .with_context(|| format!("compressing {}", input.display()))?;
    sink.into_inner()
        .map_err(|e| e.into_error())
        .and_then(|file| file.sync_all())
        .with_context(|| format!("writing output: {}", output.display()))?;

    println!(
        "{} -> {}: {} -> {} bytes (level {})",
        input.display(),
        output.display(),
        input_size,
        written,
        options.level
    );
    Ok(())
}

// ── `zprobe config show` ──────────────────────────────────────────────────────

fn cmd_config_show(config: &ZprobeConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_frame_kinds() {
        assert_eq!(describe(Some(FrameKind::Frame)), "zstd frame");
        assert_eq!(
            describe(Some(FrameKind::Skippable { variant: 0xA })),
            "zstd skippable frame (variant 0xa)"
        );
        assert_eq!(describe(None), "not zstd");
    }

    #[test]
    fn cli_parses_compress() {
        let cli =
            Cli::try_parse_from(["zprobe", "compress", "in.bin", "out.zst", "-l", "9"]).unwrap();
        match cli.command {
            Commands::Compress { input, output, level } => {
                assert_eq!(input, PathBuf::from("in.bin"));
                assert_eq!(output, PathBuf::from("out.zst"));
                assert_eq!(level, Some(9));
            }
            other => panic!("expected Compress, got: {other:?}"),
        }
    }

    #[test]
    fn cli_detect_requires_a_path() {
        assert!(Cli::try_parse_from(["zprobe", "detect"]).is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
