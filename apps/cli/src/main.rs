mod cli;
mod recognizer;
mod render;
mod results;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use reflect_audio::{AudioSinkRef, NoopMicrophone, SimulatedSink, WavFileSink};
use reflect_events::{Telemetry, TelemetrySinkRef, TracingTelemetry};
use reflect_gemini::{GeminiClient, GeminiOptions};
use reflect_results::Lifeline;
use reflect_session::{AssessmentConfig, SessionDeps, SessionHandle, SessionRuntime};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use cli::CliArgs;
use recognizer::TerminalRecognizer;
use render::Renderer;
use results::ResultsPage;

const HELP: &str = "Type your answer and press enter. Commands: /voice, /finish, /quit";
const RESULTS_HELP: &str =
    "[d] save brief  [t] save transcript  [s] share  [l] LinkedIn  [c] book a call  [q] quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.debug);
    tracing::info!("Starting reflect");

    let config = load_config(args.config.as_deref())?;
    let options = GeminiOptions::from_env().context("GEMINI_API_KEY must be set")?;
    let gemini = GeminiClient::new(options);

    let sink: AudioSinkRef = match &args.audio_out {
        Some(dir) => {
            let sink = WavFileSink::new(dir)?;
            tracing::info!(dir = %sink.dir().display(), "Writing spoken replies");
            Arc::new(sink)
        }
        None => Arc::new(SimulatedSink),
    };
    let (recognizer_tx, mut recognizer_rx) = mpsc::unbounded_channel();
    let recognizer = Arc::new(TerminalRecognizer::new(recognizer_tx));
    let telemetry = Telemetry::new(
        args.telemetry
            .then(|| Arc::new(TracingTelemetry) as TelemetrySinkRef),
    );

    let deps = SessionDeps {
        chat: Arc::new(gemini.clone()),
        synthesizer: Arc::new(gemini.clone()),
        sink,
        recognizer: recognizer.clone(),
        microphone: Arc::new(NoopMicrophone::new()),
        telemetry: telemetry.clone(),
    };
    let (session, handle, notices) = SessionRuntime::spawn(config, deps);

    let forward = handle.clone();
    tokio::spawn(async move {
        while let Some(event) = recognizer_rx.recv().await {
            if forward.recognizer_event(event).is_err() {
                break;
            }
        }
    });

    println!("{HELP}");
    if args.voice {
        handle.toggle_voice()?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let renderer = Renderer::new().run(notices);
    tokio::pin!(renderer);
    let mut stdin_open = true;

    let completed = loop {
        tokio::select! {
            turns = &mut renderer => break turns,
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => handle_line(&handle, &recognizer, line.trim()),
                None => {
                    stdin_open = false;
                    let _ = handle.shutdown();
                }
            },
            _ = tokio::signal::ctrl_c() => {
                let _ = handle.shutdown();
            }
        }
    };
    let _ = session.await;

    let Some(turns) = completed else {
        println!("Session ended.");
        return Ok(());
    };

    println!("Preparing your strategic reflection...");
    let analysis = results::generate_analysis(&gemini, &turns).await;
    let today = chrono::Local::now().date_naive();
    let page = ResultsPage::new(analysis, turns, today, telemetry);
    println!("\n{}\n", page.brief());

    if !stdin_open {
        page.export_brief(&args.out_dir)?;
        return Ok(());
    }

    println!("{RESULTS_HELP}");
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "d" => saved(page.export_brief(&args.out_dir)?.as_path()),
            "t" => saved(page.export_transcript(&args.out_dir)?.as_path()),
            "s" => println!("\n{}\n", page.share(&args.share_url)),
            "l" => println!("{}", page.lifeline(Lifeline::LinkedIn)),
            "c" => println!("{}", page.lifeline(Lifeline::Calendar)),
            "q" => break,
            _ => println!("{RESULTS_HELP}"),
        }
    }
    Ok(())
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info,reflect=debug" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AssessmentConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match AssessmentConfig::default_path() {
            Some(path) => path,
            None => return Ok(AssessmentConfig::default()),
        },
    };
    tracing::debug!(path = %path.display(), "Loading config");
    AssessmentConfig::load_or_default(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))
}

/// Route one line of user input to the session.
fn handle_line(handle: &SessionHandle, recognizer: &TerminalRecognizer, line: &str) {
    let sent = match line {
        "" => Ok(()),
        "/voice" => handle.toggle_voice(),
        "/finish" => handle.finish_now(),
        "/quit" => handle.shutdown(),
        _ if recognizer.hear(line) => Ok(()),
        _ => handle.send_text(line),
    };
    if let Err(e) = sent {
        tracing::warn!("Session did not accept input: {}", e);
    }
}

fn saved(path: &Path) {
    println!("Saved {}", path.display());
}
