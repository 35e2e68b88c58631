//! # lanchat
//!
//! Terminal client for a LAN chat relay. Lines typed on stdin are either
//! slash commands or messages; view events from the session are printed as
//! they arrive.

use std::path::Path;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lanchat_client::console::{mime_for_path, parse_line, render_event, ConsoleCommand, HELP};
use lanchat_client::{event_channel, ChatSession, ClientConfig, HttpAnnouncer, WsConnector};
use lanchat_shared::{Attachment, MessageId};
use lanchat_store::{Database, LocalStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lanchat_client=debug,lanchat_store=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    info!("Starting lanchat v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    let store: Box<dyn LocalStore> = Box::new(match &config.data_dir {
        Some(dir) => Database::open_in(dir),
        None => Database::new(),
    }
    .context("Failed to open local database")?);

    let (event_tx, mut event_rx) = event_channel();
    let (connector, mut transport_rx) = WsConnector::channel();
    let announcer = HttpAnnouncer::new(config.update_name_url());

    let mut session = ChatSession::new(
        config.ws_url(),
        Box::new(connector),
        Box::new(announcer),
        store,
        event_tx,
    );

    if let Some(name) = &config.display_name {
        session.configure(name, "")?;
    } else if !session.local().display_name.is_empty() {
        let name = session.local().display_name.clone();
        session.configure(&name, "")?;
    }

    println!("{HELP}");
    if session.is_configured() {
        println!("Name: {}. /connect to join the public room.", session.local().display_name);
    } else {
        println!("Set a name with /name <name>, then /connect.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !run_command(&mut session, parse_line(&line)) {
                    break;
                }
            }
            Some((generation, event)) = transport_rx.recv() => {
                session.handle_transport_event(generation, event);
            }
            Some(event) = event_rx.recv() => {
                for line in render_event(&event) {
                    println!("{line}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    session.disconnect();
    Ok(())
}

/// Apply one console command. Returns `false` when the user wants to leave.
fn run_command(session: &mut ChatSession, command: ConsoleCommand) -> bool {
    let result: anyhow::Result<()> = match command {
        ConsoleCommand::Empty => Ok(()),
        ConsoleCommand::Quit => return false,
        ConsoleCommand::Help => {
            println!("{HELP}");
            Ok(())
        }
        ConsoleCommand::Invalid(hint) => {
            println!("{hint}");
            Ok(())
        }
        ConsoleCommand::Name(name) => session.set_display_name(&name).map_err(Into::into),
        ConsoleCommand::Room(passphrase) => session.join_room(&passphrase).map_err(Into::into),
        ConsoleCommand::Connect => session.connect().map_err(Into::into),
        ConsoleCommand::Disconnect => {
            session.disconnect();
            Ok(())
        }
        ConsoleCommand::Send(body) => session
            .send_message(&body, None)
            .map(|sent| {
                if sent.is_none() {
                    println!("Not connected yet, message not sent.");
                }
            })
            .map_err(Into::into),
        ConsoleCommand::Reply(id) => {
            if !session.reply_to_message(&MessageId(id.clone())) {
                println!("No message with id {id}");
            }
            Ok(())
        }
        ConsoleCommand::Cancel => {
            session.cancel_reply();
            session.clear_pending_attachment();
            Ok(())
        }
        ConsoleCommand::Cache(path) => load_attachment(&path)
            .and_then(|image| session.cache_image(image).map_err(Into::into))
            .map(|inserted| {
                if !inserted {
                    println!("Already cached.");
                }
            }),
        ConsoleCommand::Images => {
            for (i, image) in session.images().iter().enumerate() {
                println!("  {i}: {} ({})", image.file_name, image.mime_type);
            }
            Ok(())
        }
        ConsoleCommand::Attach(index) => {
            match session.attach_from_cache(index) {
                Some(image) => println!("Next message carries {}", image.file_name),
                None => println!("No cached image {index}"),
            }
            Ok(())
        }
        ConsoleCommand::Uncache(index) => {
            if session.delete_from_cache(index).is_none() {
                println!("No cached image {index}");
            }
            Ok(())
        }
        ConsoleCommand::Peers => {
            for entry in session.render_roster().entries {
                println!("  {}", entry.label);
            }
            Ok(())
        }
        ConsoleCommand::Clear => {
            session.clear_messages();
            Ok(())
        }
    };

    if let Err(e) = result {
        warn!(error = %e, "Command failed");
        println!("Error: {e}");
    }
    true
}

fn load_attachment(path: &Path) -> anyhow::Result<Attachment> {
    let bytes = std::fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    Ok(Attachment::from_bytes(file_name, mime_for_path(path), &bytes)?)
}
