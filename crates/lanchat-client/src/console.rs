//! Line-oriented terminal front end: command parsing and event rendering.

use std::path::{Path, PathBuf};

use chrono::Local;

use crate::events::ViewEvent;

pub const HELP: &str = "\
/name <name>        set display name
/room [passphrase]  join a room (no passphrase: public room)
/connect            connect to the relay
/disconnect         disconnect from the relay
/reply <id>         quote a message in the next send
/cancel             drop the pending reply and attachment
/cache <path>       add an image file to the image cache
/images             list cached images
/attach <n>         attach cached image n to the next message
/uncache <n>        remove cached image n
/peers              show who is in the room
/clear              clear the message log
/quit               leave
anything else is sent as a message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Name(String),
    Room(String),
    Connect,
    Disconnect,
    Reply(String),
    Cancel,
    Cache(PathBuf),
    Images,
    Attach(usize),
    Uncache(usize),
    Peers,
    Clear,
    Help,
    Quit,
    Send(String),
    Empty,
    /// A slash command that could not be parsed, with a hint for the user.
    Invalid(String),
}

pub fn parse_line(line: &str) -> ConsoleCommand {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleCommand::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ConsoleCommand::Send(line.to_string());
    };

    let (verb, arg) = match command.split_once(char::is_whitespace) {
        Some((verb, arg)) => (verb, arg.trim()),
        None => (command, ""),
    };

    match verb {
        "name" if !arg.is_empty() => ConsoleCommand::Name(arg.to_string()),
        "name" => ConsoleCommand::Invalid("usage: /name <name>".into()),
        "room" => ConsoleCommand::Room(arg.to_string()),
        "connect" => ConsoleCommand::Connect,
        "disconnect" => ConsoleCommand::Disconnect,
        "reply" if !arg.is_empty() => ConsoleCommand::Reply(arg.to_string()),
        "reply" => ConsoleCommand::Invalid("usage: /reply <message-id>".into()),
        "cancel" => ConsoleCommand::Cancel,
        "cache" if !arg.is_empty() => ConsoleCommand::Cache(PathBuf::from(arg)),
        "cache" => ConsoleCommand::Invalid("usage: /cache <path>".into()),
        "images" => ConsoleCommand::Images,
        "attach" => parse_index(arg, "attach").map_or_else(ConsoleCommand::Invalid, ConsoleCommand::Attach),
        "uncache" => parse_index(arg, "uncache").map_or_else(ConsoleCommand::Invalid, ConsoleCommand::Uncache),
        "peers" => ConsoleCommand::Peers,
        "clear" => ConsoleCommand::Clear,
        "help" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => ConsoleCommand::Invalid(format!("unknown command /{other}, try /help")),
    }
}

fn parse_index(arg: &str, verb: &str) -> Result<usize, String> {
    arg.parse::<usize>()
        .map_err(|_| format!("usage: /{verb} <n> (see /images)"))
}

/// MIME type guessed from the file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Lines to print for one view event.
pub fn render_event(event: &ViewEvent) -> Vec<String> {
    match event {
        ViewEvent::PeerListChanged(view) => {
            let labels: Vec<&str> = view.entries.iter().map(|e| e.label.as_str()).collect();
            vec![format!("[peers] {}", labels.join(", "))]
        }
        ViewEvent::MessageAppended(m) => {
            let mut lines = Vec::with_capacity(3);
            if let Some(reply) = &m.reply_to {
                lines.push(format!(
                    "    > {}: {}",
                    reply.sender_display_name, reply.body_preview
                ));
            }
            lines.push(format!(
                "[{}] {}: {}  ({})",
                m.received_at.with_timezone(&Local).format("%H:%M:%S"),
                m.sender_display_name,
                m.body,
                m.id
            ));
            if let Some(att) = &m.attachment {
                lines.push(format!("    [attachment] {} ({})", att.file_name, att.mime_type));
            }
            lines
        }
        ViewEvent::MessagesCleared => vec!["[messages cleared]".to_string()],
        ViewEvent::ReplyStateChanged(Some(reply)) => vec![format!(
            "[replying to {}: {}] /cancel to drop",
            reply.sender_display_name, reply.body_preview
        )],
        ViewEvent::ReplyStateChanged(None) => vec!["[reply cleared]".to_string()],
        ViewEvent::ImageCacheChanged(images) => vec![format!("[images] {} cached", images.len())],
        ViewEvent::StatusChanged { state, detail } => vec![format!("[status] {state}: {detail}")],
    }
}
