use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use marquee_core::{
    Config, EventSink, FavoriteItem, FavoritesController, FavoritesEvent, FavoritesService,
    Locale, Message, PosterFields, config_file,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod output;

use output::ColorMode;

/// Marquee - manage your movie favorites from the terminal
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Favorites API base URL (overrides MARQUEE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Bearer token (overrides MARQUEE_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Notification language: en or es (overrides MARQUEE_LANG)
    #[arg(long, global = true)]
    lang: Option<Locale>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List your favorites
    List,

    /// Add a movie to your favorites
    Add {
        /// Movie id
        id: String,
    },

    /// Remove a favorite, with a window to undo
    Remove {
        /// Movie id
        id: String,

        /// Undo window in milliseconds
        #[arg(long)]
        window_ms: Option<u64>,

        /// Commit immediately instead of waiting for the undo window
        #[arg(long)]
        now: bool,
    },

    /// Check whether a movie is in your favorites
    Has {
        /// Movie id
        id: String,
    },

    /// Print poster candidates for movie records in a JSON file
    Posters {
        /// File holding one movie object or an array of them
        json_file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let color = ColorMode(!cli.no_color && std::io::stdout().is_terminal());
    let config = resolve_config(&cli)?;
    tracing::debug!(?config, "resolved config");

    match cli.command {
        Command::List => list(&config, color).await,
        Command::Add { id } => add(&config, id, color).await,
        Command::Remove { id, window_ms, now } => {
            remove(config, id, window_ms, now, color).await
        }
        Command::Has { id } => has(&config, &id).await,
        Command::Posters { json_file } => posters(&config, &json_file, color),
    }
}

/// Config precedence: CLI flags > env vars > `.marquee.toml` > platform config.
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::from_file(&config_file::load_config())?;
    config.apply_env();
    if let Some(url) = &cli.api_url {
        config.api_url = Some(url.clone());
    }
    if let Some(token) = &cli.token {
        config.token = Some(token.clone());
    }
    if let Some(lang) = cli.lang {
        config.locale = lang;
    }
    config.validate()?;
    Ok(config)
}

/// Forward controller events into a channel the command loop can await.
fn event_channel() -> (EventSink, mpsc::UnboundedReceiver<FavoritesEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink: EventSink = Arc::new(move |event: FavoritesEvent| {
        let _ = tx.send(event);
    });
    (sink, rx)
}

fn print_pending(
    rx: &mut mpsc::UnboundedReceiver<FavoritesEvent>,
    locale: Locale,
    color: ColorMode,
) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    while let Ok(event) = rx.try_recv() {
        output::print_event(&mut out, &event, locale, color)?;
    }
    out.flush()
}

fn controller(config: &Config) -> anyhow::Result<(
    FavoritesController,
    mpsc::UnboundedReceiver<FavoritesEvent>,
)> {
    let service = config.rest_service()?;
    if !service.is_authenticated() {
        eprintln!("{}", Message::NotAuthenticated.text(config.locale));
    }
    let (events, rx) = event_channel();
    Ok((
        FavoritesController::from_config(Arc::new(service), events, config),
        rx,
    ))
}

async fn list(config: &Config, color: ColorMode) -> anyhow::Result<()> {
    let (controller, mut rx) = controller(config)?;
    controller.load().await;
    print_pending(&mut rx, controller.locale(), color)?;

    let mut out = std::io::stdout().lock();
    output::print_cards(&mut out, &controller.cards(), color)?;
    Ok(())
}

async fn add(config: &Config, id: String, color: ColorMode) -> anyhow::Result<()> {
    let (controller, mut rx) = controller(config)?;
    controller.load().await;
    if controller.contains(&id) {
        println!("{id} is already a favorite");
        return Ok(());
    }
    controller.add(FavoriteItem::new(id.clone(), id)).await;
    print_pending(&mut rx, controller.locale(), color)?;
    Ok(())
}

async fn has(config: &Config, id: &str) -> anyhow::Result<()> {
    let service = config.rest_service()?;
    let found = service.has(id).await?;
    println!("{}", if found { "yes" } else { "no" });
    Ok(())
}

fn posters(config: &Config, path: &std::path::Path, color: ColorMode) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    let data: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    let records = match data {
        serde_json::Value::Array(records) => records,
        other => vec![other],
    };

    let resolver = config.resolver();
    let mut out = std::io::stdout().lock();
    for (i, record) in records.iter().enumerate() {
        // Favorites payloads nest the movie under `movie`.
        let fields = PosterFields::from_value(&record["movie"])
            .or(PosterFields::from_value(record));
        let label = fields
            .title
            .clone()
            .unwrap_or_else(|| format!("record {}", i + 1));
        output::print_candidates(&mut out, &label, &resolver.resolve(&fields), color)?;
    }
    Ok(())
}

/// Read stdin lines on a plain thread so a pending read never blocks runtime shutdown.
fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn remove(
    mut config: Config,
    id: String,
    window_ms: Option<u64>,
    now: bool,
    color: ColorMode,
) -> anyhow::Result<()> {
    if let Some(ms) = window_ms {
        anyhow::ensure!(ms > 0, "--window-ms must be greater than zero");
        config.undo_window = Duration::from_millis(ms);
    }

    let (controller, mut rx) = controller(&config)?;
    controller.load().await;
    if !controller.remove(&id) {
        print_pending(&mut rx, controller.locale(), color)?;
        anyhow::bail!("{id} is not in your favorites");
    }

    if now {
        controller.commit_now(&id).await;
    } else {
        output::print_undo_prompt(&mut std::io::stdout(), controller.window(), color)?;
    }

    let cancel = CancellationToken::new();

    // Set up Ctrl+C handler
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let mut input = stdin_lines();
    let mut interrupted = false;
    loop {
        tokio::select! {
            Some(event) = rx.recv() => {
                output::print_event(&mut std::io::stdout(), &event, controller.locale(), color)?;
                let settled = matches!(
                    &event,
                    FavoritesEvent::Committed { id: done } | FavoritesEvent::Restored { id: done }
                        if *done == id
                );
                if settled {
                    break;
                }
            }
            Some(line) = input.recv(), if !now => {
                match line.trim() {
                    "u" | "U" => {
                        controller.undo(&id).await;
                    }
                    "d" | "D" => {
                        controller.commit_now(&id).await;
                    }
                    _ => {}
                }
            }
            _ = cancel.cancelled(), if !interrupted => {
                // Settle the removal rather than abandon it mid-window.
                interrupted = true;
                controller.commit_now(&id).await;
            }
            else => break,
        }
    }

    // A failed commit reports its error right after restoring.
    print_pending(&mut rx, controller.locale(), color)?;
    controller.dispose();
    Ok(())
}
