//! Finder CLI
//!
//! Headless driver for a finder flow. Loads a flow manifest, replays a
//! script of shopper actions against it and prints every bus message as one
//! JSON line on stdout.
//!
//! # Usage
//!
//! ```bash
//! # Run a script against a flow
//! finder-cli --flow demos/running-shoes.toml --script demos/shopper.script
//!
//! # Read the script from stdin, drop requests made while busy
//! echo "next" | finder-cli --flow demos/running-shoes.toml --busy-policy drop
//!
//! # With verbose logging (stderr)
//! RUST_LOG=debug finder-cli --flow demos/running-shoes.toml
//! ```
//!
//! # Script Commands
//!
//! ```text
//! next                 continue button
//! goto <id>            jump to a screen
//! index <n>            navigate towards position n
//! answer <query>       merge name=value&... into the form values
//! back | forward       browser history
//! settle               the surface finished animating
//! results <n>          results surface shows n results
//! wait <ms>            pause before the next command
//! # comment
//! ```

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use finder_core::config::{load_config_from_path, ConfigOverrides};
use finder_core::{
    default_config_path, parse_query, BusyPolicy, Finder, FinderEvent, FlowManifest, FormValue,
    HistoryDirection, ScreenId,
};

/// Run a finder flow headlessly
#[derive(Debug, Parser)]
#[command(name = "finder-cli", version, about)]
struct Args {
    /// Flow manifest (TOML)
    #[arg(long, env = "FINDER_FLOW")]
    flow: PathBuf,

    /// Configuration file (defaults to ~/.config/finder/finder.toml)
    #[arg(long, env = "FINDER_CONFIG")]
    config: Option<PathBuf>,

    /// Script of shopper actions (defaults to stdin)
    #[arg(long)]
    script: Option<PathBuf>,

    /// Override the transition start delay
    #[arg(long)]
    start_delay_ms: Option<u64>,

    /// Override the transition end delay
    #[arg(long)]
    end_delay_ms: Option<u64>,

    /// Override the busy policy (drop or coalesce)
    #[arg(long, value_parser = parse_busy_policy)]
    busy_policy: Option<BusyPolicy>,
}

fn parse_busy_policy(s: &str) -> Result<BusyPolicy, String> {
    BusyPolicy::parse(s).ok_or_else(|| format!("unknown busy policy '{s}' (drop, coalesce)"))
}

/// One script line
#[derive(Clone, Debug, PartialEq, Eq)]
enum ScriptCommand {
    Next,
    Goto(String),
    Index(usize),
    Answer(String),
    Back,
    Forward,
    Settle,
    Results(u32),
    Wait(u64),
}

impl ScriptCommand {
    /// Parse a line; `None` for blank lines and comments
    fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };

        let command = match (command, arg) {
            ("next", "") => Self::Next,
            ("back", "") => Self::Back,
            ("forward", "") => Self::Forward,
            ("settle", "") => Self::Settle,
            ("goto", id) if !id.is_empty() => Self::Goto(id.to_string()),
            ("answer", query) if !query.is_empty() => Self::Answer(query.to_string()),
            ("index", n) => Self::Index(n.parse().with_context(|| format!("bad index '{n}'"))?),
            ("results", n) => Self::Results(n.parse().with_context(|| format!("bad count '{n}'"))?),
            ("wait", ms) => Self::Wait(ms.parse().with_context(|| format!("bad wait '{ms}'"))?),
            _ => bail!("unknown command '{line}'"),
        };
        Ok(Some(command))
    }
}

/// Parse a whole script, reporting the offending line number
fn parse_script(script: &str) -> anyhow::Result<Vec<ScriptCommand>> {
    let mut commands = Vec::new();
    for (number, line) in script.lines().enumerate() {
        if let Some(command) =
            ScriptCommand::parse(line).with_context(|| format!("script line {}", number + 1))?
        {
            commands.push(command);
        }
    }
    Ok(commands)
}

/// Merge `query` into the running form values; named fields are replaced
fn merge_answers(values: &mut Vec<FormValue>, query: &str) {
    let answers = parse_query(query);
    values.retain(|value| !answers.iter().any(|answer| answer.name == value.name));
    values.extend(answers);
}

/// Feed script commands into the finder's event channel
async fn feed(commands: Vec<ScriptCommand>, tx: mpsc::Sender<FinderEvent>) {
    let mut values = Vec::new();

    for command in commands {
        let event = match command {
            ScriptCommand::Next => FinderEvent::NextScreen,
            ScriptCommand::Goto(id) => FinderEvent::ChangeScreen {
                id: ScreenId::new(id),
            },
            ScriptCommand::Index(index) => FinderEvent::RequestScreen { index },
            ScriptCommand::Answer(query) => {
                merge_answers(&mut values, &query);
                FinderEvent::FormChanged {
                    values: values.clone(),
                }
            }
            ScriptCommand::Back => FinderEvent::HistoryPop {
                direction: HistoryDirection::Back,
            },
            ScriptCommand::Forward => FinderEvent::HistoryPop {
                direction: HistoryDirection::Forward,
            },
            ScriptCommand::Settle => FinderEvent::TransitionSettled,
            ScriptCommand::Results(count) => FinderEvent::ResultsCounted { count },
            ScriptCommand::Wait(ms) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                continue;
            }
        };

        if tx.send(event).await.is_err() {
            break;
        }
    }
}

fn read_script(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display())),
        None => {
            let mut script = String::new();
            std::io::stdin()
                .read_to_string(&mut script)
                .context("Failed to read script from stdin")?;
            Ok(script)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("finder_cli=info".parse()?)
                .add_directive("finder_core=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let args = Args::parse();

    let mut config = load_config_from_path(args.config.clone().or_else(default_config_path))?;
    let mut overrides = ConfigOverrides::new();
    if let Some(ms) = args.start_delay_ms {
        overrides = overrides.with_start_delay_ms(ms);
    }
    if let Some(ms) = args.end_delay_ms {
        overrides = overrides.with_end_delay_ms(ms);
    }
    if let Some(policy) = args.busy_policy {
        overrides = overrides.with_busy_policy(policy);
    }
    overrides.apply(&mut config);
    info!(source = %config.source(), "Configuration loaded");

    let manifest = FlowManifest::from_path(&args.flow)?;
    let commands = parse_script(&read_script(args.script.as_ref())?)?;

    let mut finder = Finder::from_manifest(&manifest, config)?;
    info!(session_id = %finder.session_id(), commands = commands.len(), "Running flow");

    let (_, mut messages) = finder.subscribe("stdout");
    let printer = tokio::spawn(async move {
        while let Some(message) = messages.recv().await {
            match serde_json::to_string(&message) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::error!(error = %e, "Failed to serialize message"),
            }
        }
    });

    let (tx, rx) = mpsc::channel(64);
    tx.send(FinderEvent::Start).await?;
    let feeder = tokio::spawn(feed(commands, tx));

    finder.run(rx).await?;
    feeder.await?;

    // Dropping the finder closes the bus and ends the printer
    drop(finder);
    printer.await?;

    info!("Flow finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ScriptCommand::parse("next").unwrap(), Some(ScriptCommand::Next));
        assert_eq!(
            ScriptCommand::parse("  goto Results ").unwrap(),
            Some(ScriptCommand::Goto("Results".to_string()))
        );
        assert_eq!(
            ScriptCommand::parse("index 3").unwrap(),
            Some(ScriptCommand::Index(3))
        );
        assert_eq!(
            ScriptCommand::parse("answer terrain=trail&goals=speed").unwrap(),
            Some(ScriptCommand::Answer("terrain=trail&goals=speed".to_string()))
        );
        assert_eq!(
            ScriptCommand::parse("results 12").unwrap(),
            Some(ScriptCommand::Results(12))
        );
        assert_eq!(
            ScriptCommand::parse("wait 250").unwrap(),
            Some(ScriptCommand::Wait(250))
        );
        assert_eq!(ScriptCommand::parse("back").unwrap(), Some(ScriptCommand::Back));
        assert_eq!(
            ScriptCommand::parse("forward").unwrap(),
            Some(ScriptCommand::Forward)
        );
        assert_eq!(
            ScriptCommand::parse("settle").unwrap(),
            Some(ScriptCommand::Settle)
        );
    }

    #[test]
    fn test_parse_skips_blank_and_comments() {
        assert_eq!(ScriptCommand::parse("").unwrap(), None);
        assert_eq!(ScriptCommand::parse("   # go to terrain").unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_bad_lines() {
        assert!(ScriptCommand::parse("jump").is_err());
        assert!(ScriptCommand::parse("goto").is_err());
        assert!(ScriptCommand::parse("index two").is_err());
        assert!(ScriptCommand::parse("next please").is_err());
    }

    #[test]
    fn test_parse_script_reports_line() {
        let err = parse_script("next\n\nfly\n").unwrap_err();
        assert!(format!("{err:#}").contains("script line 3"));
    }

    #[test]
    fn test_merge_answers_replaces_named_fields() {
        let mut values = Vec::new();
        merge_answers(&mut values, "terrain=road&goals=speed&goals=distance");
        merge_answers(&mut values, "goals=recovery&mileage=20");
        assert_eq!(
            values,
            vec![
                FormValue::new("terrain", "road"),
                FormValue::new("goals", "recovery"),
                FormValue::new("mileage", "20"),
            ]
        );
    }

    #[test]
    fn test_read_script_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"next\n").unwrap();
        let script = read_script(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(parse_script(&script).unwrap(), vec![ScriptCommand::Next]);
    }

    #[test]
    fn test_busy_policy_arg() {
        assert_eq!(parse_busy_policy("drop"), Ok(BusyPolicy::Drop));
        assert!(parse_busy_policy("later").is_err());
    }

    #[tokio::test]
    async fn test_feed_translates_commands() {
        let (tx, mut rx) = mpsc::channel(8);
        feed(
            vec![
                ScriptCommand::Answer("terrain=road".to_string()),
                ScriptCommand::Wait(1),
                ScriptCommand::Goto("Results".to_string()),
            ],
            tx,
        )
        .await;

        assert!(matches!(
            rx.recv().await,
            Some(FinderEvent::FormChanged { ref values }) if values.len() == 1
        ));
        assert!(matches!(
            rx.recv().await,
            Some(FinderEvent::ChangeScreen { ref id }) if id.as_str() == "Results"
        ));
        assert!(rx.recv().await.is_none());
    }
}
