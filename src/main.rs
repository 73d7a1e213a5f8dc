use anyhow::Context;
use clap::Parser;
use trac_extract::extractor::{format_duration, format_number};
use trac_extract::{Extractor, ExtractorConfig, OutputFormat, Selection, TimeUnit};

#[derive(Parser)]
#[command(name = "trac_extract")]
#[command(about = "Export Trac tickets and comments for migration")]
struct Args {
    /// Trac SQLite database (usually <env>/db/trac.db)
    #[arg(long)]
    database: String,

    /// Output directory for exported files
    #[arg(long)]
    out_dir: String,

    /// What to export
    #[arg(long, value_enum, default_value_t = Selection::All)]
    what: Selection,

    /// Output file format
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Unit of stored timestamps (Trac 0.12+ uses micros)
    #[arg(long, value_enum, default_value_t = TimeUnit::Micros)]
    time_unit: TimeUnit,

    /// Add the ticket component column
    #[arg(long, default_value_t = false)]
    with_component: bool,

    /// Omit the CSV header row
    #[arg(long, default_value_t = false)]
    no_header: bool,

    /// Snappy-compress Parquet output
    #[arg(long, default_value_t = false)]
    compress: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    println!("=== TRAC EXTRACT ===");
    println!("Database: {}", args.database);
    println!("Output: {}", args.out_dir);
    println!("Export: {:?} as {:?}", args.what, args.format);
    println!("Stored time unit: {:?}", args.time_unit);
    println!();

    let config = ExtractorConfig {
        format: args.format,
        time_unit: args.time_unit,
        include_component: args.with_component,
        write_header: !args.no_header,
        use_compression: args.compress,
        ..ExtractorConfig::new(&args.database, &args.out_dir)
    };

    let extractor = Extractor::new(config)
        .with_context(|| format!("cannot read Trac database {}", args.database))?;
    let all_stats = extractor.export(args.what).context("extraction failed")?;

    println!();
    println!("=== EXTRACTION COMPLETE ===");
    for stats in &all_stats {
        println!("File: {}", stats.path.display());
        println!("  Rows: {}", format_number(stats.rows_extracted as i64));
        println!("  Duration: {}", format_duration(stats.duration_secs));
        println!("  File size: {:.2} MB", stats.file_size_mb);
        println!("  SHA-256: {}", stats.sha256);
    }

    Ok(())
}
