use anyhow::{Context, Result};
use csvcolumns::{archive::aggregate_zip_file, output::to_csv_bytes, ColumnNumber};
use std::{
    env, fs,
    io::{self, Write},
    path::Path,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    // Expect: <archive.zip> <column> [output.csv]
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 || args.len() > 4 {
        eprintln!("Usage: {} <archive.zip> <column> [output.csv]", args[0]);
        std::process::exit(1);
    }
    let zip_path = Path::new(&args[1]);
    let column: ColumnNumber = args[2]
        .parse()
        .with_context(|| format!("column must be a positive integer, got '{}'", args[2]))?;

    let result = aggregate_zip_file(zip_path, column)
        .with_context(|| format!("aggregating {}", zip_path.display()))?;
    let csv = to_csv_bytes(&result.into_rows())?;

    match args.get(3) {
        Some(out) => {
            fs::write(out, &csv).with_context(|| format!("writing {}", out))?;
            info!("wrote {} bytes to {}", csv.len(), out);
        }
        None => io::stdout().write_all(&csv)?,
    }

    Ok(())
}
