//! Loom Console
//!
//! Terminal host for one assistant session. Lines typed on stdin are sent as user
//! turns; streamed replies are echoed as they arrive.
//!
//! Commands: `/open`, `/close`, `/state <text>` (changes the observed component
//! state and may trigger an automatic explanation), `/quit`.

use loom_core::{
    AssistClient, AssistConfig, ChatRequest, ComponentContext, CredentialMonitor, HttpTransport,
    Phase, SessionSnapshot,
};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn console_context() -> ComponentContext {
    ComponentContext::new(
        "Loom Console",
        "Terminal view of the active Ralph loops and their threads",
    )
    .with_state("no loops running")
    .with_actions(vec![
        "type a question".into(),
        "/state <text> to describe what is on screen".into(),
        "/close and /open to restart the conversation".into(),
    ])
    .with_concepts(vec!["Ralph Loops".into(), "Threads".into()])
}

/// Run a request in the background so stdin stays responsive.
fn dispatch(client: &AssistClient, request: Option<ChatRequest>) {
    if let Some(request) = request {
        let client = client.clone();
        tokio::spawn(async move { client.run(request).await });
    }
}

/// Prints only what changed since the previous snapshot.
#[derive(Default)]
struct Echo {
    printed_messages: usize,
    printed_chars: usize,
    phase: Phase,
}

impl Echo {
    fn render(&mut self, snapshot: &SessionSnapshot) {
        if snapshot.messages.len() < self.printed_messages {
            self.printed_messages = 0;
            self.printed_chars = 0;
        }
        for (index, message) in snapshot.messages.iter().enumerate().skip(self.printed_messages) {
            if !message.is_assistant() {
                self.printed_messages = index + 1;
                continue;
            }
            let tail: String = message.content.chars().skip(self.printed_chars).collect();
            if self.printed_chars == 0 && !tail.is_empty() {
                print!("assistant> ");
            }
            print!("{}", tail);
            self.printed_chars += tail.chars().count();
            if index + 1 < snapshot.messages.len() || snapshot.phase != Phase::Streaming {
                println!();
                self.printed_messages = index + 1;
                self.printed_chars = 0;
            }
        }
        if snapshot.phase != self.phase {
            if snapshot.awaiting_first_fragment() {
                println!("(thinking...)");
            }
            self.phase = snapshot.phase;
        }
        let _ = std::io::stdout().flush();
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[loom-console] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match AssistConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[loom-console] invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    let credentials = config.credential_store();
    let transport = match HttpTransport::new(&config.endpoint, config.request_timeout()) {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            eprintln!("[loom-console] failed to build HTTP client: {}", e);
            std::process::exit(2);
        }
    };
    let client = AssistClient::new(
        console_context(),
        transport,
        Arc::clone(&credentials),
        &config.credential_key,
    );
    let monitor = CredentialMonitor::start(
        credentials,
        &config.credential_key,
        config.credential_poll_interval(),
    );
    let mut presence = monitor.receiver();
    let mut snapshots = client.subscribe();
    let mut context = console_context();

    tracing::info!(
        endpoint = %config.endpoint,
        credential_present = monitor.is_present(),
        "Loom console started"
    );
    if !monitor.is_present() {
        println!(
            "No API key found. Set `{}` in {} or the environment to enable the assistant.",
            config.credential_key, config.credential_path
        );
    }

    dispatch(&client, client.open().await);

    let mut echo = Echo::default();
    let mut presence_live = true;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "stdin read failed");
                        break;
                    }
                };
                let line = line.trim();
                match line.split_once(' ').map_or((line, ""), |(c, rest)| (c, rest.trim())) {
                    ("/quit", _) => break,
                    ("/open", _) => dispatch(&client, client.open().await),
                    ("/close", _) => {
                        client.close().await;
                        println!("(closed)");
                    }
                    ("/state", state) => {
                        context = context.with_state(state);
                        dispatch(&client, client.observe_context(context.clone()).await);
                    }
                    _ if line.is_empty() => {}
                    _ => {
                        let request = client.start_user_message(line).await;
                        if request.is_none() {
                            println!("(not sent: assistant busy, closed or missing an API key)");
                        }
                        dispatch(&client, request);
                    }
                }
            }
            changed = presence.changed(), if presence_live => {
                if changed.is_err() {
                    presence_live = false;
                    continue;
                }
                let present = *presence.borrow_and_update();
                dispatch(&client, client.credential_changed(present).await);
            }
            changed = snapshots.changed() => {
                if changed.is_ok() {
                    let snapshot = snapshots.borrow_and_update().clone();
                    echo.render(&snapshot);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; shutting down console");
                break;
            }
        }
    }
}
