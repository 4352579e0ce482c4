//! cvgen – command-line CV generator (JSON data + HTML template → PDF).
//!
//! Usage:
//!   cvgen [--data cv.json] [--template templates/cv_template.html]
//!         [--output out.pdf] [--html]
//!
//! Defaults: data `cv_data.json`, template `templates/cv_template.html`,
//! output `cv_<name>.pdf` derived from the data's `personal.name` field.

use std::{env, fs, path::PathBuf, process};

use cvgen::pipeline::{generate_pdf, PipelineConfig};
use cvgen::{data, template::TemplateRenderer};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut data_path = PathBuf::from("cv_data.json");
    let mut template_path = PathBuf::from("templates/cv_template.html");
    let mut output_path: Option<PathBuf> = None;
    let mut emit_html = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--data" | "-d" => match iter.next() {
                Some(v) => data_path = PathBuf::from(v),
                None => {
                    eprintln!("Error: --data requires a path");
                    process::exit(1);
                }
            },
            "--template" | "-t" => match iter.next() {
                Some(v) => template_path = PathBuf::from(v),
                None => {
                    eprintln!("Error: --template requires a path");
                    process::exit(1);
                }
            },
            "--output" | "-o" => match iter.next() {
                Some(v) => output_path = Some(PathBuf::from(v)),
                None => {
                    eprintln!("Error: --output requires a path");
                    process::exit(1);
                }
            },
            "--html" => emit_html = true,
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    // Validate inputs before doing any work.
    if !data_path.exists() {
        eprintln!("Error: data file not found: {}", data_path.display());
        process::exit(1);
    }
    if !template_path.exists() {
        eprintln!("Error: template file not found: {}", template_path.display());
        process::exit(1);
    }

    // Load data
    println!("Loading data from: {}", data_path.display());
    let document = match data::load_document(&data_path) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    // Render template
    println!("Rendering template: {}", template_path.display());
    let template_dir = template_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let template_name = match template_path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.to_string(),
        None => {
            eprintln!("Error: template path has no file name");
            process::exit(1);
        }
    };
    let renderer = TemplateRenderer::from_dir(&template_dir);
    let html = match renderer.render(&template_name, &document) {
        Ok(html) => html,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    // Determine output filename
    let output = output_path.unwrap_or_else(|| PathBuf::from(data::default_output_name(&document)));

    // Optionally save the intermediate HTML
    if emit_html {
        let html_path = output.with_extension("html");
        if let Err(e) = fs::write(&html_path, &html) {
            eprintln!("Error writing '{}': {e}", html_path.display());
            process::exit(1);
        }
        println!("HTML generated: {}", html_path.display());
    }

    // Convert to PDF; relative assets resolve against the data file's home.
    let config = PipelineConfig {
        title: data::person_name(&document)
            .map(|n| n.to_string())
            .unwrap_or_else(|| "Curriculum Vitae".to_string()),
        base_dir: data_path.parent().map(PathBuf::from),
        ..PipelineConfig::default()
    };

    match generate_pdf(&html, &config) {
        Ok((bytes, layout)) => {
            if let Some(parent) = output.parent() {
                if !parent.as_os_str().is_empty() {
                    if let Err(e) = fs::create_dir_all(parent) {
                        eprintln!("Error creating output directory: {e}");
                        process::exit(1);
                    }
                }
            }
            if let Err(e) = fs::write(&output, &bytes) {
                eprintln!("Error writing '{}': {e}", output.display());
                process::exit(1);
            }
            let pages = layout.pages.len();
            println!(
                "PDF generated: {} ({} bytes, {} page{})",
                output.display(),
                bytes.len(),
                pages,
                if pages == 1 { "" } else { "s" }
            );
            println!("\nDone!");
        }
        Err(e) => {
            eprintln!("Error generating PDF: {e}");
            process::exit(1);
        }
    }
}

fn print_usage(prog: &str) {
    eprintln!("cvgen – CV generator (JSON data + HTML template → PDF)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} [--data <path>] [--template <path>] [--output <path>] [--html]");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --data, -d      JSON data file              (default: cv_data.json)");
    eprintln!("  --template, -t  HTML template               (default: templates/cv_template.html)");
    eprintln!("  --output, -o    Output PDF path             (default: cv_<name>.pdf from the data)");
    eprintln!("  --html          Also write the rendered HTML next to the PDF");
    eprintln!("  --help          Print this message");
}
