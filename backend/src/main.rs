//! factcheck CLI - decode fact-checking export files
//!
//! # Main Commands
//!
//! ```bash
//! factcheck decode export.csv          # Decode an export to JSON rows
//! factcheck serve                      # Start HTTP server (port 3000)
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! factcheck presentation "<literal>"   # Extract one presentation literal
//! factcheck value "<literal>"          # Decode one value literal
//! ```

use clap::{Parser, Subcommand};
use factcheck::config::{port_from_env, MAX_WORKERS};
use factcheck::{
    decode_file_concurrent, decode_value, extract_presentation, normalize, ColumnLayout,
    DecodeOptions,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "factcheck")]
#[command(about = "Decode fact-checking export files into typed records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode an export file and output JSON rows
    Decode {
        /// Input export file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Field delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Trust the column labels instead of swapping them
        #[arg(long)]
        as_labelled: bool,

        /// Header holding the presentation literal
        #[arg(long)]
        presentation_column: Option<String>,

        /// Header holding the post literal
        #[arg(long)]
        post_column: Option<String>,

        /// Decode workers (1 = sequential)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Write diagnostics JSON to this file
        #[arg(long)]
        diagnostics: Option<PathBuf>,
    },

    /// Extract a single presentation literal
    Presentation {
        literal: String,
    },

    /// Decode a single value literal
    Value {
        literal: String,

        /// Print the normalized post record instead of raw fields
        #[arg(short, long)]
        normalize: bool,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: FACTCHECK_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Decode {
            input,
            output,
            delimiter,
            as_labelled,
            presentation_column,
            post_column,
            workers,
            diagnostics,
        } => {
            let mut options = DecodeOptions::from_env();
            if delimiter.is_some() {
                options.delimiter = delimiter;
            }
            if as_labelled {
                options.layout = ColumnLayout::AsLabelled;
            }
            if let Some(name) = presentation_column {
                options.presentation_column = name;
            }
            if let Some(name) = post_column {
                options.post_column = name;
            }
            if let Some(n) = workers {
                options.workers = n.clamp(1, MAX_WORKERS);
            }
            cmd_decode(&input, &options, output.as_deref(), diagnostics.as_deref()).await
        }

        Commands::Presentation { literal } => cmd_presentation(&literal),

        Commands::Value { literal, normalize } => cmd_value(&literal, normalize),

        Commands::Serve { port } => cmd_serve(port.unwrap_or_else(port_from_env)).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_decode(
    input: &Path,
    options: &DecodeOptions,
    output: Option<&Path>,
    diagnostics_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Decoding: {}", input.display());

    let result = decode_file_concurrent(input, options).await;
    let diagnostics = &result.diagnostics;

    if let Some(path) = diagnostics_path {
        fs::write(path, serde_json::to_string_pretty(diagnostics)?)?;
        eprintln!("   💾 Diagnostics written to: {}", path.display());
    }

    if let Some(ref reason) = diagnostics.source_error {
        return Err(format!("Source unreadable: {}", reason).into());
    }

    for skipped in diagnostics.skipped.iter().take(5) {
        eprintln!("   Row {}: {}", skipped.row, skipped.reason);
    }
    if diagnostics.skipped.len() > 5 {
        eprintln!("   ... and {} more", diagnostics.skipped.len() - 5);
    }

    let json = serde_json::to_string_pretty(&result.rows)?;
    write_output(&json, output)?;

    eprintln!("\n✨ {}", diagnostics.summary());
    Ok(())
}

fn cmd_presentation(literal: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (record, misses) = extract_presentation(literal);
    for miss in &misses {
        eprintln!("   ⚠️  {}", miss);
    }
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn cmd_value(literal: &str, normalized: bool) -> Result<(), Box<dyn std::error::Error>> {
    let fields = decode_value(literal)?;

    let json = if normalized {
        let result = normalize(fields);
        for issue in &result.issues {
            eprintln!("   ⚠️  {}", issue);
        }
        serde_json::to_string_pretty(&result.record)?
    } else {
        serde_json::to_string_pretty(&fields)?
    };
    println!("{}", json);
    Ok(())
}

async fn cmd_serve(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    factcheck::server::start_server(port, DecodeOptions::from_env()).await?;
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
