use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};
use std::process;

use debt_recon::{
    convert_batch, extract_file, resolve_file, report_path, Dataset, SpreadsheetValidator,
    REQUIRED_COLUMNS,
};
use debt_recon::extract::PAYLOAD_COLUMN;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let outcome = match args.get(1).map(String::as_str) {
        Some("resolve") => run_resolve(&args[2..]),
        Some("convert") => run_convert(&args[2..]),
        Some("extract") => run_extract(&args[2..]),
        Some("validate") => run_validate(&args[2..]),
        _ => {
            print_usage();
            process::exit(2);
        }
    };

    if let Err(e) = outcome {
        eprintln!("❌ {}", e);
        process::exit(1);
    }

    Ok(())
}

fn print_usage() {
    eprintln!("debt-recon {}", debt_recon::VERSION);
    eprintln!("Usage:");
    eprintln!("  debt-recon resolve <input.xlsx|csv> <output.xlsx>");
    eprintln!("  debt-recon convert <dest_dir> <file.csv> [file.csv ...]");
    eprintln!("  debt-recon extract <input.xlsx|csv> <output.xlsx> [payload_column]");
    eprintln!("  debt-recon validate <input.xlsx|csv> [required_column ...]");
}

fn run_resolve(args: &[String]) -> Result<()> {
    let (input, output) = match args {
        [input, output] => (Path::new(input), Path::new(output)),
        _ => anyhow::bail!("resolve expects <input> <output>"),
    };

    println!("📂 Loading {}...", input.display());
    let summary = resolve_file(input, output)?;

    println!("✓ Total input rows: {}", summary.total_rows);
    println!("✓ Duplicate groups resolved: {}", summary.duplicate_groups);
    println!("✓ Rows selected: {}", summary.rows_selected);
    println!("✓ Duplication rate: {:.1}%", summary.duplication_rate);
    for (rule, count) in &summary.rule_counts {
        println!("  - {}: {}", rule, count);
    }
    if !summary.warnings.is_empty() {
        println!("⚠️  {} normalization warnings (see report)", summary.warnings.len());
    }
    println!("💾 Output saved: {}", output.display());
    println!("📝 Report saved: {}", report_path(output).display());

    Ok(())
}

fn run_convert(args: &[String]) -> Result<()> {
    let (dest, files) = match args {
        [dest, files @ ..] if !files.is_empty() => (Path::new(dest), files),
        _ => anyhow::bail!("convert expects <dest_dir> <file.csv> [file.csv ...]"),
    };

    let paths: Vec<PathBuf> = files.iter().map(PathBuf::from).collect();
    println!("📂 Converting {} file(s) into {}...", paths.len(), dest.display());

    let summary = convert_batch(&paths, dest)?;
    println!("✓ Converted: {}", summary.converted);
    if !summary.failures.is_empty() {
        println!(
            "⚠️  {} file(s) failed; details in {}",
            summary.failures.len(),
            dest.join(debt_recon::convert::FAILURE_LOG).display()
        );
    }

    Ok(())
}

fn run_extract(args: &[String]) -> Result<()> {
    let (input, output, column) = match args {
        [input, output] => (Path::new(input), Path::new(output), PAYLOAD_COLUMN),
        [input, output, column] => (Path::new(input), Path::new(output), column.as_str()),
        _ => anyhow::bail!("extract expects <input> <output> [payload_column]"),
    };

    println!("📂 Extracting '{}' payloads from {}...", column, input.display());
    let summary = extract_file(input, output, column)?;

    println!("✓ Rows processed: {}", summary.total_rows);
    println!("✓ Records extracted: {}", summary.extracted);
    if !summary.failures.is_empty() {
        println!("⚠️  {} row(s) skipped:", summary.failures.len());
        for failure in &summary.failures {
            println!("  - {}", failure);
        }
    }
    println!("💾 Output saved: {}", output.display());

    Ok(())
}

fn run_validate(args: &[String]) -> Result<()> {
    let (input, columns) = match args {
        [input, columns @ ..] => (Path::new(input), columns),
        _ => anyhow::bail!("validate expects <input> [required_column ...]"),
    };

    // Default to the resolver's required columns.
    let required: Vec<&str> = if columns.is_empty() {
        REQUIRED_COLUMNS.to_vec()
    } else {
        columns.iter().map(String::as_str).collect()
    };

    println!("📂 Validating {}...", input.display());
    let dataset = Dataset::load(input)?;
    let report = SpreadsheetValidator::new().validate(&dataset, &required);

    println!("{}", report.summary());
    for issue in &report.issues {
        let location = match issue.row {
            Some(row) => format!("row {}", row),
            None => "table".to_string(),
        };
        println!("  [{:?}] {} ({}): {}", issue.severity, issue.field, location, issue.message);
    }

    if !report.is_valid() {
        anyhow::bail!("validation failed");
    }
    println!("✓ File is valid");
    Ok(())
}
