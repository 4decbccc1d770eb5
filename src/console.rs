//! Line-oriented terminal front end
//!
//! Reads commands from stdin and turns them into events, and renders the
//! current application state after each change.

use crate::app::{App, Event, View};
use crate::drafts::VariantStyle;
use crate::session::{RequestKind, SelectedFile, Stage, ACCEPTED_EXTENSIONS};
use std::fmt;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Terminates a multi-line text block
const END_OF_TEXT: &str = ".";

/// A parsed console command
#[derive(Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Login { username: String, password: String },
    Logout,
    Navigate(View),
    File(String),
    Upload,
    EditTranscript,
    Generate,
    Variant(usize),
    EditVariant(usize),
    Back,
    Open(String),
    Send(String),
    Copy,
    CopySummary,
    Help,
    Quit,
}

impl Command {
    /// Short name for logging, without payloads such as passwords
    pub fn name(&self) -> &'static str {
        match self {
            Command::Login { .. } => "login",
            Command::Logout => "logout",
            Command::Navigate(_) => "navigate",
            Command::File(_) => "file",
            Command::Upload => "upload",
            Command::EditTranscript => "edit",
            Command::Generate => "generate",
            Command::Variant(_) => "variant",
            Command::EditVariant(_) => "edit-variant",
            Command::Back => "back",
            Command::Open(_) => "open",
            Command::Send(_) => "send",
            Command::Copy => "copy",
            Command::CopySummary => "copy-summary",
            Command::Help => "help",
            Command::Quit => "quit",
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Login { username, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Command::Navigate(view) => f.debug_tuple("Navigate").field(view).finish(),
            Command::File(path) => f.debug_tuple("File").field(path).finish(),
            Command::Variant(index) => f.debug_tuple("Variant").field(index).finish(),
            Command::EditVariant(index) => f.debug_tuple("EditVariant").field(index).finish(),
            Command::Open(id) => f.debug_tuple("Open").field(id).finish(),
            Command::Send(service) => f.debug_tuple("Send").field(service).finish(),
            other => f.write_str(other.name()),
        }
    }
}

fn log_command(command: &Command) {
    debug!(command = command.name(), "Parsed command");
}

/// Parse a single input line
///
/// Variant numbers are 1-based on the console.
pub(crate) fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    match name {
        "login" => {
            let (username, password) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| "usage: login <username> <password>".to_string())?;
            Ok(Command::Login {
                username: username.to_string(),
                password: password.trim().to_string(),
            })
        }
        "logout" => Ok(Command::Logout),
        "new" => Ok(Command::Navigate(View::NewMeeting)),
        "history" => Ok(Command::Navigate(View::History)),
        "file" if !rest.is_empty() => Ok(Command::File(rest.to_string())),
        "file" => Err("usage: file <path>".to_string()),
        "upload" => Ok(Command::Upload),
        "edit" => Ok(Command::EditTranscript),
        "generate" => Ok(Command::Generate),
        "variant" => parse_variant_number(rest).map(Command::Variant),
        "edit-variant" => parse_variant_number(rest).map(Command::EditVariant),
        "back" => Ok(Command::Back),
        "open" if !rest.is_empty() => Ok(Command::Open(rest.to_string())),
        "open" => Err("usage: open <id>".to_string()),
        "gmail" | "outlook" => Ok(Command::Send(name.to_string())),
        "send" if !rest.is_empty() => Ok(Command::Send(rest.to_string())),
        "send" => Err("usage: send <gmail|outlook>".to_string()),
        "copy" => Ok(Command::Copy),
        "copy-summary" => Ok(Command::CopySummary),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        "" => Err(String::new()),
        other => Err(format!("Unknown command: {} (type 'help')", other)),
    }
}

fn parse_variant_number(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err("variant number must be 1, 2 or 3".to_string()),
    }
}

/// Read stdin until EOF or `quit`, forwarding events to the app
pub(crate) async fn read_input(events: mpsc::UnboundedSender<Event>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Input closed");
                let _ = events.send(Event::Quit);
                return;
            }
            Err(e) => {
                warn!("Failed to read input: {}", e);
                let _ = events.send(Event::Quit);
                return;
            }
        };

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                if !message.is_empty() {
                    println!("{}", message);
                }
                continue;
            }
        };
        log_command(&command);

        let event = match command {
            Command::Login { username, password } => Event::Login { username, password },
            Command::Logout => Event::Logout,
            Command::Navigate(view) => Event::Navigate(view),
            Command::File(path) => match SelectedFile::read(Path::new(&path)).await {
                Ok(file) if file.has_accepted_extension() => Event::SelectFile(file),
                Ok(file) => {
                    println!(
                        "{} is not accepted. Choose a .{} file.",
                        file.name(),
                        ACCEPTED_EXTENSIONS.join(" or .")
                    );
                    continue;
                }
                Err(e) => {
                    println!("Could not read {}: {}", path, e);
                    continue;
                }
            },
            Command::Upload => Event::ConfirmUpload,
            Command::EditTranscript => match read_block(&mut lines).await {
                Some(text) => Event::EditTranscript(text),
                None => continue,
            },
            Command::Generate => Event::Generate,
            Command::Variant(index) => Event::SelectVariant(index),
            Command::EditVariant(index) => match read_block(&mut lines).await {
                Some(text) => Event::EditVariant { index, text },
                None => continue,
            },
            Command::Back => Event::Back,
            Command::Open(id) => Event::RestoreHistory { id },
            Command::Send(service) => Event::SendEmail { service },
            Command::Copy => Event::CopySelectedVariant,
            Command::CopySummary => Event::CopySummary,
            Command::Help => {
                print_help();
                continue;
            }
            Command::Quit => Event::Quit,
        };

        let quit = matches!(event, Event::Quit);
        if events.send(event).is_err() || quit {
            return;
        }
    }
}

/// Collect lines until a lone `.`
async fn read_block(lines: &mut Lines<BufReader<Stdin>>) -> Option<String> {
    println!("Enter text, finish with a line containing only '{}':", END_OF_TEXT);
    let mut block = Vec::new();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line == END_OF_TEXT => return Some(block.join("\n")),
            Ok(Some(line)) => block.push(line),
            Ok(None) | Err(_) => return None,
        }
    }
}

fn print_help() {
    println!(
        "\
Commands:
  login <username> <password>   sign in
  logout                        sign out
  new | history                 switch view
  file <path>                   choose a .txt or .docx transcript
  upload                        upload the chosen file
  edit                          replace the transcript (multi-line)
  generate                      generate summary and drafts
  variant <1-3>                 select a draft
  edit-variant <1-3>            replace a draft (multi-line)
  back                          go back one step
  open <id>                     restore a history entry
  gmail | outlook               open the selected draft in a mail client
  copy | copy-summary           copy the selected draft or the summary
  quit"
    );
}

/// Print the current state of the app
pub(crate) fn render(app: &mut App) {
    println!();
    let Some(identity) = app.identity() else {
        println!("== Sign in ==");
        if let Some(error) = app.login_error() {
            println!("! {}", error);
        }
        println!("login <username> <password>");
        return;
    };

    let initial = identity.initial().unwrap_or('?');
    let (new_tab, history_tab) = match app.view() {
        View::NewMeeting => ("[New Meeting]", "History"),
        View::History => ("New Meeting", "[History]"),
    };
    println!("({}) {}  |  {}  {}", initial, identity, new_tab, history_tab);

    match app.view() {
        View::NewMeeting => render_session(app),
        View::History => render_history(app),
    }

    if let Some(notice) = app.take_notice() {
        println!("* {}", notice);
    }
}

fn render_session(app: &App) {
    let machine = app.machine();
    let session = machine.session();

    match machine.stage() {
        Stage::Upload => {
            println!("== Upload transcript ==");
            match session.file() {
                Some(file) => println!("Selected: {}", file.name()),
                None => println!("No file selected"),
            }
        }
        Stage::Transcript => {
            println!("== Transcript: {} ==", session.filename());
            println!("{}", session.transcript());
        }
        Stage::Result => {
            println!("== Results: {} ==", session.filename());
            if let Some(drafts) = session.drafts() {
                println!("Summary:\n{}\n", drafts.summary());
                for (i, variant) in drafts.variants().iter().enumerate() {
                    let marker = if i == drafts.selected_index() { ">" } else { " " };
                    let style = VariantStyle::from_index(i)
                        .map(|s| s.to_string())
                        .unwrap_or_default();
                    println!("{} {}. {}", marker, i + 1, style);
                }
                println!("\n{}", drafts.selected());
            }
        }
    }

    match machine.pending() {
        Some(RequestKind::Upload) => println!("... uploading"),
        Some(RequestKind::Generate) => println!("... generating"),
        None => {}
    }
    if let Some(error) = machine.error() {
        println!("! {}", error);
        if error.is_retryable() {
            println!("  (run the same command again to retry)");
        }
    }
}

fn render_history(app: &App) {
    println!("== History ==");
    if app.is_history_loading() && app.history().entries().is_empty() {
        println!("Loading...");
        return;
    }
    if app.history().entries().is_empty() {
        println!("No history found.");
        return;
    }
    for entry in app.history().entries() {
        println!("[{}] {}  {}", entry.id, entry.filename, entry.local_timestamp());
        println!("    {}", entry.preview());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_parse_login() {
        assert_eq!(
            parse_command("login admin  s3cret pass"),
            Ok(Command::Login {
                username: "admin".to_string(),
                password: "s3cret pass".to_string()
            })
        );
        assert!(parse_command("login admin").is_err());
    }

    #[test]
    fn test_parse_variant_is_one_based() {
        assert_eq!(parse_command("variant 1"), Ok(Command::Variant(0)));
        assert_eq!(parse_command("edit-variant 3"), Ok(Command::EditVariant(2)));
        assert!(parse_command("variant 0").is_err());
        assert!(parse_command("variant two").is_err());
    }

    #[test]
    fn test_parse_navigation_and_send() {
        assert_eq!(parse_command("history"), Ok(Command::Navigate(View::History)));
        assert_eq!(parse_command(" new "), Ok(Command::Navigate(View::NewMeeting)));
        assert_eq!(parse_command("gmail"), Ok(Command::Send("gmail".to_string())));
        assert_eq!(parse_command("send yahoo"), Ok(Command::Send("yahoo".to_string())));
    }

    #[test]
    fn test_parse_paths_and_ids() {
        assert_eq!(
            parse_command("file /tmp/my notes.txt"),
            Ok(Command::File("/tmp/my notes.txt".to_string()))
        );
        assert_eq!(parse_command("open 42"), Ok(Command::Open("42".to_string())));
        assert!(parse_command("file").is_err());
    }

    #[test]
    fn test_parse_unknown_and_blank() {
        assert!(parse_command("dance").unwrap_err().contains("Unknown command"));
        assert_eq!(parse_command("   "), Err(String::new()));
    }

    /// Collects formatted log output in memory
    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_login_password_never_logged() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let command = parse_command("login admin hunter2").unwrap();
            log_command(&command);
            debug!(?command, "Parsed command");
            let event = Event::Login {
                username: "admin".to_string(),
                password: "hunter2".to_string(),
            };
            debug!(?event, "Forwarding event");
        });

        let out = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("login"));
        assert!(out.contains("admin"));
        assert!(!out.contains("hunter2"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let command = parse_command("login admin hunter2").unwrap();
        assert!(!format!("{:?}", command).contains("hunter2"));
        assert_eq!(format!("{:?}", Command::Variant(1)), "Variant(1)");
        assert_eq!(format!("{:?}", Command::Upload), "upload");
    }

    #[test]
    fn test_parse_back() {
        assert_eq!(parse_command("back"), Ok(Command::Back));
    }
}
