//! Voice booking - console front end
//!
//! Runs one dialogue session in the terminal: lines typed on stdin are the
//! recognised speech, and the system's prompts are printed to stdout.

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voice_booking::config::{LogFormat, Settings};
use voice_booking::grammar::Grammar;
use voice_booking::runtime::{
    spawn_session, ConsoleBridge, LineSource, LoggingBridge, SessionEvent,
};
use voice_booking::state_machine::DialogState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "voice_booking=warn".into());
    let registry = tracing_subscriber::registry().with(filter);
    match settings.log_format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }

    let grammar = match &settings.grammar_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading grammar");
            Grammar::load(path)?
        }
        None => Grammar::builtin(),
    };
    tracing::info!(entries = grammar.len(), "Grammar ready");

    let input = LineSource::stdin();
    let bridge = LoggingBridge::new(ConsoleBridge::new(input.clone(), settings.speech.clone()));
    let session = spawn_session(Arc::new(grammar), bridge);

    let mut events = session.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::BookingCommitted { booking }) => {
                    println!("[booked: {booking}]");
                }
                Ok(SessionEvent::Error { message }) => eprintln!("[speech error: {message}]"),
                Ok(SessionEvent::Snapshot(snapshot)) => {
                    tracing::debug!(path = %snapshot.path, label = snapshot.label, "Snapshot");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Session observer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // The start trigger: Enter, whenever the dialogue is idle
    let mut snapshots = session.watch();
    loop {
        let idle = snapshots
            .wait_for(|s| matches!(s.state, DialogState::WaitToStart | DialogState::Done))
            .await
            .is_ok();
        if !idle {
            break;
        }

        println!("[press Enter to start]");
        if input.next_line().await.is_none() || session.start().await.is_err() {
            break;
        }

        // Wait until the dialogue has left the idle state before prompting again
        if snapshots
            .wait_for(|s| !matches!(s.state, DialogState::WaitToStart | DialogState::Done))
            .await
            .is_err()
        {
            break;
        }
    }

    session.shutdown();
    session.join().await;
    Ok(())
}
