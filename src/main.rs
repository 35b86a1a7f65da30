use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use rusty_chart::{
    build_chart, export_chart, list_sheets, normalize, ChartKind, ExportFormat, RasterConfig,
    RasterExporter, Resource,
};

#[derive(Parser, Debug)]
#[command(name = "rusty-chart", version, about = "Normalize spreadsheet headers and build charts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the sheet names of a workbook as JSON
    Sheets { file: PathBuf },

    /// Print the normalized column schema of a sheet as JSON
    Columns {
        file: PathBuf,
        #[arg(long)]
        sheet: Option<String>,
        /// Include the data rows
        #[arg(long)]
        rows: bool,
    },

    /// Build a chart description (JSON) from a sheet
    Chart {
        file: PathBuf,
        #[arg(long)]
        sheet: Option<String>,
        /// X column; defaults to the first X candidate
        #[arg(long)]
        x: Option<String>,
        /// Y columns; default to every Y candidate
        #[arg(long, num_args = 1..)]
        y: Vec<String>,
        /// line, bar or scatter
        #[arg(long, default_value = "line")]
        kind: String,
        #[arg(long, default_value = "Data Visualization")]
        title: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render a chart description to an image
    Export {
        chart: PathBuf,
        /// jpg, png or pdf
        #[arg(long, default_value = "jpg")]
        format: String,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        #[arg(long)]
        quality: Option<u8>,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Command::Sheets { file } => {
            let sheets = list_sheets(&Resource::from(file.as_path()));
            println!("{}", serde_json::to_string_pretty(&sheets)?);
        }
        Command::Columns { file, sheet, rows } => {
            let result = normalize(&Resource::from(file.as_path()), sheet.as_deref())
                .with_context(|| format!("normalizing {}", file.display()))?;
            let json = if rows {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string_pretty(&result.schema())?
            };
            println!("{json}");
        }
        Command::Chart {
            file,
            sheet,
            x,
            y,
            kind,
            title,
            output,
        } => {
            let kind: ChartKind = kind.parse()?;
            let result = normalize(&Resource::from(file.as_path()), sheet.as_deref())
                .with_context(|| format!("normalizing {}", file.display()))?;
            let x = x
                .or_else(|| result.x_columns.first().cloned())
                .context("sheet has no columns to use as X")?;
            let y = if y.is_empty() { result.y_columns.clone() } else { y };

            let figure = build_chart(&result.rows, &x, &y, kind, &title)?;
            write_output(output.as_deref(), figure.to_json()?.as_bytes())?;
        }
        Command::Export {
            chart,
            format,
            output,
            width,
            height,
            quality,
        } => {
            let format: ExportFormat = format.parse()?;
            let document = fs::read_to_string(&chart)
                .with_context(|| format!("reading chart {}", chart.display()))?;

            let defaults = RasterConfig::default();
            let exporter = RasterExporter::new(RasterConfig {
                width: width.unwrap_or(defaults.width),
                height: height.unwrap_or(defaults.height),
                jpeg_quality: quality.unwrap_or(defaults.jpeg_quality),
                ..defaults
            });
            let bytes = export_chart(&document, format, &exporter)?;
            write_output(Some(output.as_path()), &bytes)?;
            info!("wrote {}", output.display());
        }
    }
    Ok(())
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes).context("writing to stdout")?;
            stdout.write_all(b"\n").context("writing to stdout")
        }
    }
}
