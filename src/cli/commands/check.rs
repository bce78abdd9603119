//! Tool availability check.

use console::style;

use crate::config::Config;
use crate::ocr::{check_binary, RecognitionProvider};

pub fn cmd_check(config: &Config) -> anyhow::Result<()> {
    println!("\n{}", style("External Tools").bold());
    for (tool, purpose) in [
        ("pdftoppm", "page rendering"),
        ("pdftotext", "native text"),
        ("tesseract", "recognition"),
    ] {
        let status = if check_binary(tool) {
            style("✓ found").green()
        } else {
            style("✗ not found").red()
        };
        println!("  {:<10} {} ({})", tool, status, style(purpose).dim());
    }

    println!("\n{}", style("Recognition Provider:").cyan());
    match RecognitionProvider::parse(&config.ocr.provider) {
        Ok(provider) if provider.is_available() => {
            println!("  {} {} ({})", style("→").green(), provider, config.ocr.profiles.join(", "));
        }
        Ok(provider) => {
            println!("  {} {}", style("✗").red(), provider);
            println!("    {}", style(provider.availability_hint()).dim());
        }
        Err(e) => println!("  {} {}", style("✗").red(), e),
    }

    match &config.ocr.spacing.command {
        Some(command) => println!(
            "\n{} spacing command: {}",
            style("→").cyan(),
            command.join(" ")
        ),
        None => println!("\n{} spacing: script-boundary rules", style("→").cyan()),
    }
    Ok(())
}
