use std::{
    error::Error,
    fs,
    io::{self, stdin},
    path::PathBuf,
};

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use tracing::{info, warn};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use headsup::{
    app::DrawOptions,
    app_dirs::AppDirs,
    config::{Config, ConfigError, ConfigStore, FileConfigStore},
    deck::{parse_words, Deck, DeckSource, DeckStore},
    error,
    history::HistoryLog,
    input::{FeedMotion, MotionSource, NoMotion},
    logging::init_logging,
    runtime::{CrosstermEventSource, FixedTicker, GameEvent, Runner, Step},
    ui, App, AppControl, SessionConfig,
};

/// tilt-to-guess party game for the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A heads-up style party game: hold up the card, let your team shout clues, then mark it correct or skip it before the clock runs out. Directions come from the keyboard or from a motion feed."
)]
pub struct Cli {
    #[clap(subcommand)]
    command: Option<Command>,

    /// deck to play, built in or custom
    #[clap(short = 'd', long)]
    deck: Option<String>,

    /// play the items in this file, one per line, instead of a deck
    #[clap(short = 'f', long, conflicts_with = "deck")]
    file: Option<PathBuf>,

    /// number of seconds per game
    #[clap(short = 't', long = "time")]
    time_limit_secs: Option<u32>,

    /// number of seconds to count down before play
    #[clap(short = 'c', long)]
    countdown: Option<u32>,

    /// delay before a correct answer is committed
    #[clap(long)]
    confirm_delay_ms: Option<u64>,

    /// play the deck in file order
    #[clap(long)]
    no_shuffle: bool,

    /// maximum number of cards per game
    #[clap(short = 'n', long)]
    max_items: Option<usize>,

    /// file or FIFO of motion directions (up/down/neutral, one per line)
    #[clap(short = 'm', long)]
    motion_feed: Option<PathBuf>,

    /// log level when RUST_LOG is unset
    #[clap(long)]
    log_level: Option<String>,

    /// store the effective settings as the new defaults
    #[clap(long)]
    save_config: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// list, show, add or remove decks
    Decks {
        #[clap(subcommand)]
        action: DeckCommand,
    },
    /// show recently finished games
    History {
        /// number of games to show
        #[clap(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum DeckCommand {
    /// list built-in and custom decks
    List,
    /// print the items of a deck
    Show { name: String },
    /// create a custom deck from words or a file
    Add {
        name: String,
        /// read items from this file, one per line
        #[clap(short = 'f', long)]
        file: Option<PathBuf>,
        words: Vec<String>,
    },
    /// delete a custom deck
    Remove { name: String },
}

impl Cli {
    /// Layers the command line over the stored settings.
    fn apply(&self, cfg: &mut Config) {
        if let Some(deck) = &self.deck {
            cfg.deck = deck.clone();
        }
        if let Some(secs) = self.time_limit_secs {
            cfg.time_limit_secs = secs;
        }
        if let Some(secs) = self.countdown {
            cfg.countdown_secs = secs;
        }
        if let Some(ms) = self.confirm_delay_ms {
            cfg.confirm_delay_ms = ms;
        }
        if self.no_shuffle {
            cfg.shuffle = false;
        }
        if let Some(max) = self.max_items {
            cfg.max_items = Some(max);
        }
        if let Some(level) = &self.log_level {
            cfg.log_level = level.clone();
        }
    }

    fn motion_source(&self) -> Box<dyn MotionSource> {
        match &self.motion_feed {
            Some(path) => Box::new(FeedMotion::new(path)),
            None => Box::new(NoMotion),
        }
    }

    fn load_deck(&self, cfg: &Config, store: &DeckStore) -> Result<Deck, Box<dyn Error>> {
        let Some(path) = &self.file else {
            return Ok(store.load(&cfg.deck)?);
        };
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("file")
            .to_string();
        Ok(Deck {
            name,
            source: DeckSource::Custom,
            words: parse_words(&fs::read_to_string(path)?),
        })
    }
}

fn run_deck_command(action: &DeckCommand, store: &DeckStore) -> error::Result<()> {
    match action {
        DeckCommand::List => {
            for deck in store.list()? {
                println!("{:<24} {:>4}  {}", deck.name, deck.size, deck.source);
            }
        }
        DeckCommand::Show { name } => {
            for word in store.load(name)?.words {
                println!("{word}");
            }
        }
        DeckCommand::Add { name, file, words } => {
            let name = match file {
                Some(path) => store.create_from_text(name, &fs::read_to_string(path)?)?,
                None => store.create(name, words)?,
            };
            println!("created deck {name} in {}", store.dir().display());
        }
        DeckCommand::Remove { name } => {
            store.delete(name)?;
            println!("deleted deck {name}");
        }
    }
    Ok(())
}

fn print_history(log: &HistoryLog, limit: usize) -> error::Result<()> {
    let records = log.recent(limit)?;
    if records.is_empty() {
        println!("no games played yet");
    }
    for r in records {
        println!(
            "{}  {:<20} {:>4}s  {:>3} correct  {:>3} skipped",
            r.finished_at.format("%Y-%m-%d %H:%M"),
            r.deck,
            r.time_limit_secs,
            r.correct,
            r.skipped,
        );
    }
    Ok(())
}

/// Stored settings, or the defaults plus the reason the file was unusable.
/// Reported by the caller once it knows where output goes.
fn read_config(store: &FileConfigStore) -> (Config, Option<ConfigError>) {
    match store.read() {
        Ok(cfg) => (cfg.unwrap_or_default(), None),
        Err(e) => (Config::default(), Some(e)),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_store = FileConfigStore::new();
    let (mut config, config_problem) = read_config(&config_store);
    cli.apply(&mut config);

    if cli.command.is_some() {
        if let Some(e) = &config_problem {
            eprintln!("ignoring unreadable config {}: {e}", config_store.path().display());
        }
    }
    match &cli.command {
        Some(Command::Decks { action }) => return Ok(run_deck_command(action, &DeckStore::new())?),
        Some(Command::History { limit }) => return Ok(print_history(&HistoryLog::new(), *limit)?),
        None => {}
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Err(e) = init_logging(&config.log_level, &AppDirs::state_dir()) {
        eprintln!("logging disabled: {e}");
    }
    if let Some(e) = &config_problem {
        warn!(path = %config_store.path().display(), error = %e, "ignoring unreadable config");
    }

    if cli.save_config {
        config_store.save(&config)?;
        info!(path = %config_store.path().display(), "settings saved");
    }

    let deck = cli.load_deck(&config, &DeckStore::new())?;
    let mut app = App::new(
        deck,
        SessionConfig::from(&config),
        DrawOptions::from(&config),
        cli.motion_source(),
    )
    .with_history(HistoryLog::new());

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());

    terminal.draw(|f| ui::draw(app, f))?;

    loop {
        let Step { event, elapsed } = runner.step();

        if let GameEvent::Key(key) = event {
            if app.on_key(key) == AppControl::Quit {
                break;
            }
        }
        app.update(elapsed);
        terminal.draw(|f| ui::draw(app, f))?;
    }

    Ok(())
}
