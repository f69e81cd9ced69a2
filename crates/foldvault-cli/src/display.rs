//! Human readable output for the FoldVault CLI

use console::style;
use foldvault_engine::{RecordMetadata, SearchResult, StoreReceipt, VaultStats};

/// Display the outcome of a store
pub fn display_receipt(receipt: &StoreReceipt) {
    println!();
    println!("{}", style("Stored Record:").bold().underlined());
    println!("  Id: {}", style(receipt.record_id).cyan());
    println!("  Class: {}", style(receipt.content_class).cyan());
    println!(
        "  Size: {} -> {}",
        style(format_bytes(receipt.original_size)).green(),
        style(format_bytes(receipt.final_size)).green()
    );
    println!("  Ratio: {}", ratio_style(receipt.ratio));
    println!(
        "  Pipeline: {}",
        style(&receipt.pipeline_trace_summary).blue()
    );
    println!(
        "  Quality: {}",
        style(format!("{:.3}", receipt.quality_score)).dim()
    );
}

/// Display record metadata
pub fn display_metadata(metadata: &RecordMetadata) {
    println!();
    println!(
        "{} {}",
        style("Record").bold().underlined(),
        style(metadata.record_id).cyan()
    );
    println!(
        "  Location: {}/{}/{}",
        metadata.owner_id, metadata.collection_id, metadata.name
    );
    println!("  Class: {}", style(metadata.content_class).cyan());
    println!(
        "  Size: {} -> {}",
        style(format_bytes(metadata.original_size)).green(),
        style(format_bytes(metadata.final_size)).green()
    );
    println!("  Ratio: {}", ratio_style(metadata.ratio));
    println!(
        "  Pipeline: {}",
        style(&metadata.pipeline_trace_summary).blue()
    );
    if let Some(lines) = metadata.line_count {
        println!("  Lines: {}", lines);
    }
    if metadata.landmarks > 0 {
        println!("  Landmarks: {}", metadata.landmarks);
    }
    println!("  Integrity: {}", style(&metadata.integrity_hash).dim());
    println!(
        "  Created: {}",
        metadata.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("  Accesses: {}", metadata.access_count);
}

/// Display search matches, one per line
pub fn display_search(term: &str, result: &SearchResult) {
    let source = if result.used_index { "index" } else { "scan" };
    println!(
        "{} {} match(es) for {} ({})",
        style("🔍").blue().bold(),
        result.len(),
        style(term).cyan(),
        style(source).dim()
    );
    for found in &result.matches {
        println!("  line {:>6}  offset {:>10}", found.line, found.offset);
    }
}

/// Display vault statistics
pub fn display_stats(owner: Option<&str>, stats: &VaultStats) {
    println!();
    let title = match owner {
        Some(owner) => format!("Vault Statistics for {}:", owner),
        None => "Vault Statistics:".to_string(),
    };
    println!("{}", style(title).bold().underlined());
    println!("  Records: {}", style(stats.record_count).green());
    println!(
        "  Original: {}",
        style(format_bytes(stats.total_original_size)).green()
    );
    println!(
        "  Stored: {}",
        style(format_bytes(stats.total_final_size)).green()
    );
    println!(
        "  Saved: {}",
        style(format_bytes(stats.space_saved())).green().bold()
    );
    println!("  Overall ratio: {}", ratio_style(stats.overall_ratio));

    if !stats.strategy_usage.is_empty() {
        println!("  Strategies:");
        for (strategy, count) in &stats.strategy_usage {
            println!("    • {} {}", style(strategy).cyan(), style(count).dim());
        }
    }
}

fn ratio_style(ratio: f64) -> console::StyledObject<String> {
    let text = format!("{:.3} ({:.1}% of original)", ratio, ratio * 100.0);
    if ratio <= 0.5 {
        style(text).green().bold()
    } else if ratio < 1.0 {
        style(text).yellow()
    } else {
        style(text).dim()
    }
}

/// Format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Display an error message with proper formatting
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), style(message).red());
}

/// Display a success message with proper formatting
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), style(message).green());
}

/// Display an info message with proper formatting
pub fn display_info(message: &str) {
    println!("{} {}", style("ℹ").blue().bold(), style(message).blue());
}
