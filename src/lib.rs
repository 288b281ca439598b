pub mod classify;
pub mod cli;
pub mod descriptor;
pub mod diff;
pub mod error;
pub mod io_utils;
pub mod numeric;
pub mod schema;
pub mod transform;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info, warn};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_recast", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Describe(args) => handle_describe(&args),
        Commands::Diff(args) => handle_diff(&args),
        Commands::Transform(args) => handle_transform(&args),
    }
}

fn handle_describe(args: &cli::DescribeArgs) -> Result<()> {
    let delimiter = io_utils::resolve_delimiter(args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Describing '{}' with delimiter '{delimiter}'",
        args.input.display()
    );
    let reader = io_utils::open_input(&args.input, encoding)?;
    let sampled = schema::Schema::from_reader(reader, delimiter)
        .with_context(|| format!("Inferring layout from {:?}", args.input))?;
    let writer = io_utils::open_output(args.output.as_deref(), encoding_rs::UTF_8)?;
    sampled
        .write_json(writer)
        .with_context(|| format!("Writing schema for {:?}", args.input))?;
    info!(
        "Described {} column(s) from '{}'",
        sampled.column_count(),
        args.input.display()
    );
    Ok(())
}

fn handle_diff(args: &cli::DiffArgs) -> Result<()> {
    let delimiter = io_utils::resolve_delimiter(args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Diffing '{}' against '{}'",
        args.old.display(),
        args.new.display()
    );
    let old = schema::Schema::from_reader(io_utils::open_input(&args.old, encoding)?, delimiter)
        .with_context(|| format!("Inferring layout from {:?}", args.old))?;
    let new = schema::Schema::from_reader(io_utils::open_input(&args.new, encoding)?, delimiter)
        .with_context(|| format!("Inferring layout from {:?}", args.new))?;

    let report = diff::diff(&old, &new);
    for column in &report.unknown_columns {
        warn!(
            "column {} resolved to {}; review the descriptor by hand (sample: {:?})",
            column.name(),
            column.column_type,
            column.sample
        );
    }

    let writer = io_utils::open_output(args.output.as_deref(), encoding_rs::UTF_8)?;
    report
        .descriptor
        .write_json(writer)
        .context("Writing transformation descriptor")?;
    info!(
        "Diffed {} column pair(s): {} change(s), {} unknown(s)",
        old.column_count().min(new.column_count()),
        report.descriptor.len(),
        report.unknown_columns.len()
    );
    Ok(())
}

fn handle_transform(args: &cli::TransformArgs) -> Result<()> {
    let delimiter = io_utils::resolve_delimiter(args.delimiter);
    let input_encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let output_encoding = io_utils::resolve_encoding(args.output_encoding.as_deref())?;
    info!(
        "Transforming '{}' -> '{}' using '{}'",
        args.input.display(),
        args.output
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".into()),
        args.format.display()
    );
    let descriptor = descriptor::Descriptor::load(&args.format)?;
    let reader = io_utils::open_input(&args.input, input_encoding)?;
    let writer = io_utils::open_output(args.output.as_deref(), output_encoding)?;
    let written = transform::transform(descriptor, reader, writer, delimiter)
        .with_context(|| format!("Transforming {:?}", args.input))?;
    info!("Wrote {written} row(s)");
    Ok(())
}
