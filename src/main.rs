//! Pixel Life CLI - advance the image-encoded game by one generation, or
//! export looping GIF animations.

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

use pixel_life::{
    FrameOutcome, RunOutcome,
    render::ChromeRenderer,
    schema::{DEFAULT_CANVAS, DEFAULT_NAME, SettingsInput},
};

const EXIT_FAILURE: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "pixel-life", version, about = "Conway's Game of Life stored in an image")]
struct Cli {
    /// Output directory
    #[arg(short, long, default_value = ".")]
    path: String,

    /// Base name of the persisted frame and counter
    #[arg(long, default_value = DEFAULT_NAME)]
    name: String,

    /// Color of dead cells
    #[arg(long)]
    cdead: Option<String>,

    /// Color of alive cells
    #[arg(long)]
    calive: Option<String>,

    /// Color of cells about to die
    #[arg(long)]
    cdying: Option<String>,

    /// Canvas size in pixels, as height,width
    #[arg(long, default_value = DEFAULT_CANVAS)]
    canvas: String,

    /// Grid size in cells, as rows,cols [default: 84,240]
    #[arg(long)]
    grid: Option<String>,

    /// Build a looping GIF from this image, GIF, SVG or URL
    #[arg(long)]
    gif: Option<String>,

    /// Frames to generate; negative continues one past an existing GIF
    #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
    gif_length: i64,

    /// Frame duration in milliseconds
    #[arg(long, default_value_t = 100, allow_negative_numbers = true)]
    gif_speed: i64,

    /// First image of a transition
    #[arg(long)]
    from: Option<String>,

    /// Second image of a transition
    #[arg(long)]
    to: Option<String>,

    /// Print the resolved settings as JSON and exit
    #[arg(long)]
    print_config: bool,
}

impl From<Cli> for SettingsInput {
    fn from(cli: Cli) -> Self {
        SettingsInput {
            path: cli.path,
            name: cli.name,
            cdead: cli.cdead,
            calive: cli.calive,
            cdying: cli.cdying,
            canvas: cli.canvas,
            grid: cli.grid,
            gif: cli.gif,
            gif_length: cli.gif_length,
            gif_speed: cli.gif_speed,
            from: cli.from,
            to: cli.to,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let print_config = cli.print_config;

    let resolved = match SettingsInput::from(cli).resolve(&ChromeRenderer::new()) {
        Ok(resolved) => resolved,
        Err(e) => {
            log::error!("{}", report(&e));
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    if print_config {
        return match serde_json::to_string_pretty(&resolved.settings) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                log::error!("Error serializing settings: {}", e);
                ExitCode::from(EXIT_FAILURE)
            }
        };
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || {
        log::warn!("Interrupted, finishing with the frames generated so far...");
        flag.store(true, Ordering::SeqCst);
    }) {
        log::warn!("Could not install Ctrl-C handler: {}", e);
    }

    let code = match pixel_life::run(resolved.settings.clone(), Arc::clone(&cancel)) {
        Ok(outcome) => {
            summarize(&outcome);
            if cancel.load(Ordering::SeqCst) {
                ExitCode::from(EXIT_INTERRUPTED)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            log::error!("{}", report(&e));
            ExitCode::from(EXIT_FAILURE)
        }
    };

    // Rendered sources are removed here.
    drop(resolved);
    code
}

fn summarize(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Frame(FrameOutcome::Started) => log::info!("New game started"),
        RunOutcome::Frame(FrameOutcome::Progressed) => log::info!("Advanced one generation"),
        RunOutcome::Frame(FrameOutcome::Converged) => log::info!("Game converged, new game started"),
        RunOutcome::Frame(FrameOutcome::Recovered { reason }) => {
            log::info!("Recovered from unreadable frame ({}), new game started", reason)
        }
        RunOutcome::Exported {
            path,
            frames,
            cancelled,
        } => {
            let suffix = if *cancelled { " (interrupted)" } else { "" };
            log::info!("Saved {} frames to {}{}", frames, path.display(), suffix);
        }
    }
}

/// Error message with its chain of causes.
fn report(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        // Wrappers that already print their cause inline.
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

