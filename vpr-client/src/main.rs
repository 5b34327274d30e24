//! vpr-client - VoxPrivacyRecord console client
//!
//! Line-oriented front end over `Session`. Errors are printed inline and the
//! loop keeps running until `quit` or end of input.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use vpr_client::api::DEFAULT_SERVER_URL;
use vpr_client::capture::file_backend::FileBackend;
use vpr_client::{ApiClient, CaptureBackend, Session};

#[derive(Parser, Debug)]
#[command(name = "vpr-client")]
#[command(about = "VoxPrivacyRecord console recording client")]
#[command(version)]
struct Args {
    /// Recording server base URL
    #[arg(long, env = "VPR_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server_url: String,

    /// Log in as this user on startup
    #[arg(short, long)]
    username: Option<String>,

    /// Directory of prerecorded takes, consumed in file-name order
    #[arg(long)]
    takes_dir: Option<PathBuf>,

    /// Capture from the default microphone
    #[cfg(feature = "microphone")]
    #[arg(long, conflicts_with = "takes_dir")]
    microphone: bool,
}

const HELP: &str = "\
Commands:
  login <username>   log in and load the next task
  start | r          start recording
  stop | s           stop recording
  play | p           play the captured take
  submit | u         upload the captured take
  discard | d        drop the captured take
  retry              reload the current task
  status             redraw the screen
  logout             return to the login screen
  quit | q           exit";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let api = ApiClient::new(&args.server_url)?;
    info!("Using server {}", api.base_url());

    let mut session = Session::new(api, select_backend(&args)?);

    if let Some(username) = &args.username {
        // Failure is already recorded on the session and shown below
        let _ = session.login(username).await;
    }
    print!("{}", session.render());
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let result = match command {
            "login" => session.login(rest).await,
            "start" | "r" => session.start(),
            "stop" | "s" => session.stop(),
            "play" | "p" => session.play(),
            "submit" | "u" => session.submit().await,
            "discard" | "d" => session.discard(),
            "retry" => session.retry().await,
            "logout" => {
                session.logout();
                Ok(())
            }
            "status" => Ok(()),
            "help" | "?" => {
                println!("{HELP}");
                continue;
            }
            "quit" | "q" | "exit" => break,
            other => {
                println!("Unknown command '{other}'. Type 'help' for commands.");
                continue;
            }
        };

        // Errors are rendered from the session's inline error
        let _ = result;
        print!("{}", session.render());
    }

    Ok(())
}

fn select_backend(args: &Args) -> Result<Box<dyn CaptureBackend>> {
    #[cfg(feature = "microphone")]
    if args.microphone {
        return Ok(Box::new(vpr_client::capture::cpal_backend::CpalBackend::new()));
    }

    let backend = match &args.takes_dir {
        Some(dir) => FileBackend::from_dir(dir)?,
        None => FileBackend::from_files(Vec::new()),
    };
    Ok(Box::new(backend))
}
