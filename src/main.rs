use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use ivltune::{
    ConfigStore, DeckId, Error, Id, ItemId, Recommendation, TargetRetention, TuningSession,
    clock::SchedulerClock,
    config::{NamedWindow, Settings},
    review::{Grade, ReviewEvent, ReviewKind},
    store::Store,
};
use tracing_subscriber::EnvFilter;

mod ui;

#[derive(Debug, Parser)]
#[command(version, about = "Tune interval modifiers toward a target retention")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List decks with their options group and interval modifier
    Decks,
    /// Show measured retention and the recommended interval modifier
    Status {
        /// Deck name or id
        deck: String,
        /// Retention period, as named in the config
        #[arg(short, long)]
        window: Option<String>,
        /// Target retention percentage
        #[arg(short, long)]
        target: Option<i64>,
    },
    /// Write an interval modifier to a deck's options group
    Set { deck: String, modifier: f64 },
    /// Create a deck
    AddDeck {
        name: String,
        #[arg(short, long, default_value = "Default")]
        group: String,
        #[arg(long)]
        filtered: bool,
    },
    /// Append a review to the log
    Record {
        deck: String,
        /// 1: again, 2: hard, 3: good, 4: easy
        #[arg(value_parser = parse_grade)]
        grade: Grade,
        #[arg(long, value_enum, default_value_t = ReviewKind::Review)]
        kind: ReviewKind,
        /// Card id; a new card is created when omitted
        #[arg(long)]
        item: Option<Id>,
        /// Milliseconds since the Unix epoch, defaults to now
        #[arg(long)]
        at: Option<i64>,
    },
    /// Interactive tuner
    Tune,
}

fn parse_grade(s: &str) -> Result<Grade, String> {
    let ease: u8 = s.parse().map_err(|_| format!("`{s}` is not a grade"))?;
    Grade::try_from(ease)
}

fn find_deck(store: &Store, query: &str) -> anyhow::Result<DeckId> {
    store
        .collection()
        .find_deck(query)
        .ok_or_else(|| anyhow!("no deck named `{query}`"))
}

fn find_window<'a>(settings: &'a Settings, name: Option<&str>) -> anyhow::Result<&'a NamedWindow> {
    match name {
        None => settings
            .windows
            .first()
            .ok_or_else(|| anyhow!("no retention periods configured")),
        Some(name) => settings.window(name).ok_or_else(|| {
            let known: Vec<_> = settings.windows.iter().map(|w| w.name.as_str()).collect();
            anyhow!("unknown period `{name}`, expected one of: {}", known.join(", "))
        }),
    }
}

fn list_decks(store: &Store) {
    let collection = store.collection();
    for (id, deck) in collection.tunable_decks() {
        let (group, modifier) = collection
            .groups
            .get(&deck.group)
            .map_or(("?", f64::NAN), |g| (g.name.as_str(), g.interval_modifier));
        println!("{id}  {:<24} {group:<16} {modifier}", deck.name);
    }
}

fn status(
    store: &Store,
    settings: &Settings,
    deck: &str,
    window: Option<&str>,
    target: Option<i64>,
) -> anyhow::Result<()> {
    let deck = find_deck(store, deck)?;
    let window = find_window(settings, window)?;
    let target = match target {
        Some(t) => TargetRetention::new(t)?,
        None => settings.default_target,
    };
    let clock = SchedulerClock::new(settings.rollover_hour);
    let session = TuningSession::open(store, &clock, deck, window.lookback(), target)?;

    let sample = session.sample();
    println!("Retention period:          {}", window.name);
    println!("Current interval modifier: {}", session.current_modifier());
    println!("Target retention:          {target}");
    println!(
        "Current retention:         {}% ({} passed, {} failed)",
        sample.display_percent(),
        sample.passed,
        sample.failed
    );
    match session.recommendation() {
        Ok(rec) => match rec.recommended {
            Recommendation::Computed(v) => println!("New interval modifier:     {v}"),
            Recommendation::Degenerate => println!(
                "100% retention breaks the equation. Update Interval Modifier manually."
            ),
        },
        Err(Error::DegenerateInput { .. }) => {
            println!("No due review was passed. Update Interval Modifier manually.")
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("IVLTUNE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load().context("failed to load settings")?;
    let mut store = Store::open()?;

    match cli.command.unwrap_or(Command::Tune) {
        Command::Decks => list_decks(&store),
        Command::Status {
            deck,
            window,
            target,
        } => status(&store, &settings, &deck, window.as_deref(), target)?,
        Command::Set { deck, modifier } => {
            let deck = find_deck(&store, &deck)?;
            let group = store.group_of(&deck)?;
            store.write_modifier(&group, modifier)?;
            println!("Set");
        }
        Command::AddDeck {
            name,
            group,
            filtered,
        } => {
            let id = store.collection_mut().add_deck(&name, &group, filtered);
            store.save()?;
            println!("{id}");
        }
        Command::Record {
            deck,
            grade,
            kind,
            item,
            at,
        } => {
            let deck = find_deck(&store, &deck)?;
            let item: ItemId = item.unwrap_or_else(Id::random);
            let at = at.unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
            store.collection_mut().record(
                deck,
                ReviewEvent {
                    item,
                    at,
                    grade,
                    kind,
                },
            )?;
            store.save()?;
            tracing::debug!(%deck, %item, ?grade, ?kind, "recorded review");
            println!("{item}");
        }
        Command::Tune => {
            let clock = SchedulerClock::new(settings.rollover_hour);
            ui::run(&mut store, clock, &settings)?;
        }
    }
    Ok(())
}
