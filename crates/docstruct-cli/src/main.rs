//! docstruct CLI - DOCX structure conversion tool
//!
//! Converts an OOXML word-processing document into a navigable HTML page or a
//! JSON element list keyed by hierarchical context.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use docstruct_backend::DocxBackend;
use docstruct_core::{HtmlOptions, HtmlSerializer, JsonOptions, JsonSerializer};
use std::fs;
use std::path::{Path, PathBuf};

/// Output format of the conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// JSON element list
    Json,
    /// HTML page with a table-of-contents sidebar
    Html,
}

#[derive(Debug, Parser)]
#[command(
    name = "docstruct",
    version,
    about = "Convert DOCX documents into structured HTML or JSON"
)]
struct Cli {
    /// Input DOCX file
    input: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Output file; derived from the input name when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print to stdout instead of writing a file
    #[arg(long)]
    stdout: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

/// Output path next to the input: "spec.docx" becomes "spec.json" / "spec.html"
fn smart_output_path(input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    let ext = match format {
        OutputFormat::Json => "json",
        OutputFormat::Html => "html",
    };
    input.with_file_name(format!("{}.{}", stem.to_string_lossy(), ext))
}

/// Wrap the rendered body and TOC into a standalone page with a sidebar.
fn html_page(body_html: &str, toc_html: &str) -> String {
    format!(
        "<!DOCTYPE html>\
         <html><head><meta charset=\"utf-8\"><title>docstruct</title>\
         <style>\
         body{{margin:0;font-family:sans-serif;display:flex;}}\
         nav{{width:22em;overflow-y:auto;height:100vh;padding:1em;background:#f4f4f4;}}\
         main{{flex:1;overflow-y:auto;height:100vh;padding:1em 2em;}}\
         table{{border-collapse:collapse;margin:1em 0;}}\
         td,th{{border:1px solid #999;padding:0.2em 0.5em;}}\
         </style></head>\
         <body><nav>{toc_html}</nav><main>{body_html}</main></body></html>"
    )
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let backend = DocxBackend::new();
    let stream = backend
        .parse_file(&cli.input)
        .with_context(|| format!("failed to convert {}", cli.input.display()))?;

    let rendered = match cli.format {
        OutputFormat::Json => JsonSerializer::with_options(JsonOptions {
            pretty: cli.pretty,
            ..JsonOptions::from(backend.options())
        })
        .to_json_string(&stream),
        OutputFormat::Html => {
            let serializer = HtmlSerializer::with_options(HtmlOptions::from(backend.options()));
            let (body_html, toc_html) = serializer.serialize(&stream);
            html_page(&body_html, &toc_html)
        }
    };

    if cli.stdout {
        println!("{rendered}");
        return Ok(());
    }

    let output = cli
        .output
        .unwrap_or_else(|| smart_output_path(&cli.input, cli.format));
    fs::write(&output, &rendered)
        .with_context(|| format!("failed to write {}", output.display()))?;
    eprintln!(
        "{} {} -> {} ({} elements)",
        "✓".green(),
        cli.input.display(),
        output.display(),
        stream.len().saturating_sub(1)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smart_output_path_swaps_the_extension() {
        assert_eq!(
            smart_output_path(Path::new("docs/spec.docx"), OutputFormat::Json),
            PathBuf::from("docs/spec.json")
        );
        assert_eq!(
            smart_output_path(Path::new("spec.docx"), OutputFormat::Html),
            PathBuf::from("spec.html")
        );
    }

    #[test]
    fn html_page_embeds_both_panes() {
        let page = html_page("<p>body</p>", "<a href=\"#x\">x</a>");
        assert!(page.contains("<nav><a href=\"#x\">x</a></nav>"));
        assert!(page.contains("<main><p>body</p></main>"));
    }
}
