//! TWA Shell headless host.
//!
//! Runs the launch sequencer with a logging host and renderer, and drives the
//! push and client-bridge paths from stdin:
//!
//! - `token <token>` - simulate a delivery token rotation
//! - `message <title>|<body>` - simulate an incoming push message
//! - `check` - issue `check_messages` on the local client session
//! - `quit` - tear the shell down (Ctrl-C works too)

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use mimalloc::MiMalloc;
use tokio::sync::mpsc;

use twa_shell::constants::CHECK_MESSAGES_COMMAND;
use twa_shell::env::Environment;
use twa_shell::launch::{self, LaunchEvent, LoggingHost, PromptBehavior, StaticPermissionGateway};
use twa_shell::push::{self, LoggingPresenter, PushEvent, PushHandler, RemoteMessage, TokenStore};
use twa_shell::relay::{ChannelSession, MessageRelayQueue};
use twa_shell::{LaunchSequencer, ShellConfig};

/// Global allocator configured per M-MIMALLOC-APPS guideline.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "twa-shell", version, about = "Headless host for the TWA launch shell")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the shell and read host commands from stdin.
    Run {
        /// Override the launch URL.
        #[arg(long)]
        url: Option<String>,
        /// Override the splash delay in milliseconds.
        #[arg(long)]
        splash_delay_ms: Option<u64>,
        /// How the notification permission behaves.
        #[arg(long, value_enum, default_value_t = PermissionMode::Granted)]
        permission: PermissionMode,
    },
    /// Print the effective configuration.
    Config {
        /// Also write it to the config file.
        #[arg(long)]
        save: bool,
    },
}

/// Simulated platform permission behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PermissionMode {
    /// Grant already held.
    Granted,
    /// Prompt, user grants.
    PromptGrant,
    /// Prompt, user denies.
    PromptDeny,
    /// Prompt never answers.
    Never,
    /// Platform has no runtime grant.
    NotRequired,
}

impl PermissionMode {
    fn gateway(self) -> StaticPermissionGateway {
        match self {
            Self::Granted => StaticPermissionGateway::already_granted(),
            Self::PromptGrant => StaticPermissionGateway::prompting(PromptBehavior::Grant),
            Self::PromptDeny => StaticPermissionGateway::prompting(PromptBehavior::Deny),
            Self::Never => StaticPermissionGateway::prompting(PromptBehavior::Never),
            Self::NotRequired => StaticPermissionGateway::not_required(),
        }
    }

    fn notifications_permitted(self) -> bool {
        matches!(self, Self::Granted | Self::PromptGrant | Self::NotRequired)
    }
}

/// One stdin line, parsed.
#[derive(Debug, PartialEq, Eq)]
enum HostCommand {
    Push(PushEvent),
    Check,
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> Option<HostCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    Some(match verb {
        "token" => HostCommand::Push(PushEvent::NewToken(rest.to_string())),
        "message" => {
            let (title, body) = rest.split_once('|').unwrap_or((rest, ""));
            HostCommand::Push(PushEvent::Message(RemoteMessage {
                title: (!title.trim().is_empty()).then(|| title.trim().to_string()),
                body: Some(body.trim().to_string()),
                ..RemoteMessage::default()
            }))
        }
        "check" => HostCommand::Check,
        "quit" | "exit" => HostCommand::Quit,
        other => HostCommand::Unknown(other.to_string()),
    })
}

/// Host command loop: stdin lines in, client notifications out.
///
/// Notifications are always printed before the next line is handled, and
/// whatever a final `check` flushed is printed before returning, so a flush
/// followed by EOF, `quit` or `shutdown` loses nothing.
async fn control_loop<W: Write>(
    lines: &mut mpsc::UnboundedReceiver<String>,
    notifications: &mut mpsc::UnboundedReceiver<String>,
    queue: &MessageRelayQueue,
    session: &mut ChannelSession,
    push_tx: &std::sync::mpsc::Sender<PushEvent>,
    shutdown: impl Future<Output = ()>,
    out: &mut W,
) -> Result<()> {
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            biased;
            Some(notification) = notifications.recv() => writeln!(out, "{notification}")?,
            line = lines.recv() => {
                let Some(line) = line else { break };
                match parse_command(&line) {
                    Some(HostCommand::Push(event)) => {
                        if push_tx.send(event).is_err() {
                            log::error!("[Host] Push worker has stopped");
                            break;
                        }
                    }
                    Some(HostCommand::Check) => {
                        let args = serde_json::Value::Null;
                        if !queue.handle_session_command(session, CHECK_MESSAGES_COMMAND, &args) {
                            log::info!("[Host] No pending messages");
                        }
                    }
                    Some(HostCommand::Quit) => break,
                    Some(HostCommand::Unknown(verb)) => {
                        log::warn!("[Host] Unknown command: {verb}");
                    }
                    None => {}
                }
            }
            () = &mut shutdown => break,
        }
    }

    while let Ok(notification) = notifications.try_recv() {
        writeln!(out, "{notification}")?;
    }
    out.flush()?;
    Ok(())
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("[Host] Ctrl-C handler unavailable: {e}");
        std::future::pending::<()>().await;
    }
}

async fn run_shell(config: ShellConfig, mode: PermissionMode) -> Result<()> {
    let queue = Arc::new(MessageRelayQueue::with_capacity(config.relay_capacity()));

    let mut handler = PushHandler::new(
        Arc::clone(&queue),
        LoggingPresenter::new(mode.notifications_permitted()),
        config.default_notification_title.clone(),
    );
    match TokenStore::open_default() {
        Ok(store) => {
            match store.load() {
                Ok(Some(_)) => {
                    log::info!("[Push] Last delivery token found in {}", store.path().display());
                }
                Ok(None) => {}
                Err(e) => log::warn!("[Push] Ignoring stored token: {e:#}"),
            }
            handler = handler.with_token_store(store);
        }
        Err(e) => log::warn!("[Push] Token persistence disabled: {e:#}"),
    }

    let (push_tx, push_rx) = std::sync::mpsc::channel();
    let worker = push::spawn_push_worker(handler, push_rx)?;

    let (events, rx) = launch::channel();
    let sequencer =
        LaunchSequencer::new(config.launch_config(), mode.gateway(), LoggingHost, events.clone());
    events.send(LaunchEvent::Start);

    let (mut session, mut notifications) = ChannelSession::new();

    let (line_tx, mut lines) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        })?;

    let control = async {
        let mut stdout = std::io::stdout();
        let result = control_loop(
            &mut lines,
            &mut notifications,
            &queue,
            &mut session,
            &push_tx,
            ctrl_c(),
            &mut stdout,
        )
        .await;
        events.send(LaunchEvent::Destroyed);
        result
    };

    let (sequencer, control_result) = tokio::join!(sequencer.run(rx), control);
    log::info!("Shell stopped in {:?} (permission: {:?})", sequencer.state(), sequencer.outcome());

    drop(push_tx);
    worker
        .join()
        .map_err(|panic| anyhow::anyhow!("Push worker panicked: {panic:?}"))?;
    control_result
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = ShellConfig::load()?;

    let permission = match cli.command {
        Some(Commands::Config { save }) => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if save {
                config.save()?;
                log::info!("[Config] Saved to {}", ShellConfig::config_dir()?.display());
            }
            return Ok(());
        }
        Some(Commands::Run {
            url,
            splash_delay_ms,
            permission,
        }) => {
            if let Some(url) = url {
                config.launch_url = url;
            }
            if let Some(ms) = splash_delay_ms {
                config.splash_delay_ms = ms;
            }
            permission
        }
        None => PermissionMode::Granted,
    };

    log::info!(
        "TWA shell v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        Environment::current()
    );
    tokio::runtime::Runtime::new()?.block_on(run_shell(config, permission))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_command() {
        assert_eq!(
            parse_command("token abc123"),
            Some(HostCommand::Push(PushEvent::NewToken("abc123".to_string())))
        );
    }

    #[test]
    fn test_parse_message_command() {
        let Some(HostCommand::Push(PushEvent::Message(message))) =
            parse_command("message Hello|World")
        else {
            panic!("expected message");
        };
        assert_eq!(message.title.as_deref(), Some("Hello"));
        assert_eq!(message.body.as_deref(), Some("World"));

        let Some(HostCommand::Push(PushEvent::Message(untitled))) = parse_command("message |Body")
        else {
            panic!("expected message");
        };
        assert_eq!(untitled.title, None);
    }

    #[test]
    fn test_parse_misc_commands() {
        assert_eq!(parse_command("  "), None);
        assert_eq!(parse_command("check"), Some(HostCommand::Check));
        assert_eq!(parse_command("quit"), Some(HostCommand::Quit));
        assert_eq!(
            parse_command("dance"),
            Some(HostCommand::Unknown("dance".to_string()))
        );
    }

    struct Host {
        lines: mpsc::UnboundedSender<String>,
        line_rx: mpsc::UnboundedReceiver<String>,
        notifications: mpsc::UnboundedReceiver<String>,
        session: ChannelSession,
        queue: MessageRelayQueue,
        push_tx: std::sync::mpsc::Sender<PushEvent>,
        push_rx: std::sync::mpsc::Receiver<PushEvent>,
    }

    fn host(commands: &[&str]) -> Host {
        let (lines, line_rx) = mpsc::unbounded_channel();
        for command in commands {
            lines.send((*command).to_string()).unwrap();
        }
        let (session, notifications) = ChannelSession::new();
        let (push_tx, push_rx) = std::sync::mpsc::channel();
        Host {
            lines,
            line_rx,
            notifications,
            session,
            queue: MessageRelayQueue::new(),
            push_tx,
            push_rx,
        }
    }

    async fn drive(host: &mut Host, shutdown: impl Future<Output = ()>) -> Vec<String> {
        let mut out = Vec::new();
        control_loop(
            &mut host.line_rx,
            &mut host.notifications,
            &host.queue,
            &mut host.session,
            &host.push_tx,
            shutdown,
            &mut out,
        )
        .await
        .unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn messages(printed: &[String]) -> Vec<String> {
        printed
            .iter()
            .map(|raw| {
                let twa_shell::relay::ClientNotification::Message { data } =
                    serde_json::from_str(raw).unwrap();
                data.message
            })
            .collect()
    }

    #[tokio::test]
    async fn test_check_then_eof_prints_flushed_messages() {
        let mut host = host(&["check"]);
        host.queue.enqueue(r#"{"type":"fcm_token","token":"abc"}"#);
        host.queue.enqueue("second");
        let (closed, _) = mpsc::unbounded_channel();
        drop(std::mem::replace(&mut host.lines, closed));

        let printed = drive(&mut host, std::future::pending()).await;

        assert_eq!(
            messages(&printed),
            vec![r#"{"type":"fcm_token","token":"abc"}"#, "second"]
        );
        assert!(host.queue.is_empty());
    }

    #[tokio::test]
    async fn test_check_then_quit_prints_flushed_messages() {
        let mut host = host(&["check", "quit", "check"]);
        host.queue.enqueue("A");

        let printed = drive(&mut host, std::future::pending()).await;

        assert_eq!(messages(&printed), vec!["A"]);
        // Lines after quit are left unread.
        assert_eq!(host.line_rx.try_recv().unwrap(), "check");
    }

    #[tokio::test]
    async fn test_shutdown_still_prints_pending_notifications() {
        let mut host = host(&[]);
        host.queue.enqueue("A");
        host.queue.flush(&mut host.session);

        let printed = drive(&mut host, std::future::ready(())).await;

        assert_eq!(messages(&printed), vec!["A"]);
    }

    #[tokio::test]
    async fn test_push_commands_reach_worker_channel() {
        let mut host = host(&["token t1", "quit"]);

        let printed = drive(&mut host, std::future::pending()).await;

        assert!(printed.is_empty());
        assert_eq!(
            host.push_rx.try_recv().unwrap(),
            PushEvent::NewToken("t1".to_string())
        );
    }

    #[test]
    fn test_permission_modes() {
        assert!(PermissionMode::Granted.notifications_permitted());
        assert!(!PermissionMode::PromptDeny.notifications_permitted());
        assert_eq!(PermissionMode::Never.gateway().request_count(), 0);
    }
}
