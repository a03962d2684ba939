use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gemx_core::view::replay::DEFAULT_WINDOW_HEIGHT;
use gemx_core::{
    ChatUrl, ChatView, Clock, ExportSettings, LoaderConfig, ReplayView, StaticView, SystemClock,
    export_to_raw_json, extract, write_export,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "gemx", version, about = "Export a Gemini conversation to Markdown")]
struct Cli {
    /// Saved conversation page (.html), or a directory of scroll snapshots ordered oldest first
    input: PathBuf,

    /// Address the page was captured from; anything outside gemini.google.com is refused
    #[arg(long)]
    url: Option<String>,

    /// Directory for the exported file (default: GEMX_OUTPUT_DIR, then the download directory)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Print the document instead of writing a file
    #[arg(long)]
    stdout: bool,

    /// Output the extracted messages as JSON instead of markdown
    #[arg(long)]
    raw: bool,

    /// Scroll extent covered by each snapshot in a snapshot directory
    #[arg(long, default_value_t = DEFAULT_WINDOW_HEIGHT)]
    window_height: f64,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("GEMX_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> gemx_core::Result<()> {
    if let Some(url) = cli.url.as_deref() {
        let page = ChatUrl::parse(url)?;
        info!(conversation = ?page.conversation_id, "page accepted");
    }

    let mut view: Box<dyn ChatView> = if cli.input.is_dir() {
        Box::new(ReplayView::from_dir(&cli.input, cli.window_height)?)
    } else {
        Box::new(StaticView::from_path(&cli.input)?)
    };
    let mut clock = SystemClock;
    let config = LoaderConfig::immediate().with_env_overrides();

    let export = extract(view.as_mut(), &mut clock, &config)?;

    if cli.raw {
        let raw_json = export_to_raw_json(&export)?;
        println!("{raw_json}");
        return Ok(());
    }

    if cli.stdout {
        print!("{}", export.document);
        return Ok(());
    }

    let output_dir = match cli.output_dir {
        Some(dir) => dir,
        None => ExportSettings::from_env_or_home()?.output_dir,
    };
    let path = write_export(&output_dir, &export, clock.now().date_naive())?;
    println!(
        "exported {} messages to {}",
        export.message_count,
        path.display()
    );

    Ok(())
}
