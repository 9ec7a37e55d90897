use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pdf_xref_core::Document;

#[derive(Parser)]
#[command(name = "pdf-xref-inspect", version, about = "Inspect a PDF document's cross-reference table")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open a document and print its page count and trailer references.
    Inspect {
        path: PathBuf,

        /// Also print per-page media boxes and resolved font/image counts.
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Inspect { path, verbose } => match run_inspect(&path, verbose) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("error: {err}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run_inspect(path: &PathBuf, verbose: bool) -> pdf_xref_core::Result<()> {
    log::info!("opening {}", path.display());
    let doc = Document::open(path)?;

    println!("pages: {}", doc.get_num_pages());

    if verbose {
        for i in 0..doc.get_num_pages() {
            let page = doc.get_page(i)?;
            let runs = page.text_runs();
            let images = page.image_xobjects();
            println!(
                "  page {i}: media_box={:?} text_runs={} images={}",
                page.media_box,
                runs.len(),
                images.len()
            );
        }
    }

    Ok(())
}
