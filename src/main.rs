// src/main.rs

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use myblocks::{App, AppConfig, BlockStore, CommandLineInput, LocalBackend, SubmitControl};
use std::fs;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const HELP: &str = "\
Commands:
  show               render the current page
  open <path>        go to / or /page/<id>
  home               go to the home page
  back               return to the previous page
  follow <n>         open the n-th child page
  add <text>         append a paragraph (Insert Block)
  page <title>       append a child page (Create Page)
  move <n> <order>   move the n-th child to position <order>
  help               show this help
  quit               exit";

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_file_path = std::env::temp_dir().join("myblocks.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    // stdout belongs to the REPL.
    let console_appender = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(console_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stderr")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// One line of REPL input.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand {
    Show,
    Open(String),
    Home,
    Back,
    Follow(usize),
    Add(String, SubmitControl),
    Move(usize, i32),
    Help,
    Quit,
}

impl ReplCommand {
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map(|(word, rest)| (word, rest.trim()))
            .unwrap_or((line, ""));

        let command = match word {
            "" => return Ok(None),
            "show" | "ls" => ReplCommand::Show,
            "open" if !rest.is_empty() => ReplCommand::Open(rest.to_string()),
            "home" => ReplCommand::Home,
            "back" => ReplCommand::Back,
            "follow" => ReplCommand::Follow(parse_number(rest)?),
            "add" => ReplCommand::Add(rest.to_string(), SubmitControl::InsertBlock),
            "page" => ReplCommand::Add(rest.to_string(), SubmitControl::CreatePage),
            "move" => {
                let (n, order) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "usage: move <n> <order>".to_string())?;
                let order = order
                    .trim()
                    .parse()
                    .map_err(|_| format!("not a position: {}", order.trim()))?;
                ReplCommand::Move(parse_number(n)?, order)
            }
            "help" | "?" => ReplCommand::Help,
            "quit" | "exit" => ReplCommand::Quit,
            other => return Err(format!("unknown command '{}', try 'help'", other)),
        };
        Ok(Some(command))
    }
}

fn parse_number(raw: &str) -> Result<usize, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("expected a child number, got '{}'", raw.trim()))
}

/// Runs one command and returns the text to print.
async fn execute(app: &mut App, command: ReplCommand) -> String {
    let outcome = match command {
        ReplCommand::Show | ReplCommand::Help | ReplCommand::Quit => Ok(()),
        ReplCommand::Open(path) => app.open(&path).map(|_| ()).map_err(|e| e.to_string()),
        ReplCommand::Home => {
            app.home();
            Ok(())
        }
        ReplCommand::Back => {
            if app.back().is_none() {
                log::info!("Already at the first page");
            }
            Ok(())
        }
        ReplCommand::Follow(n) => app.follow(n).await.map(|_| ()).map_err(|e| e.to_string()),
        ReplCommand::Add(content, control) => app
            .add(&content, control)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string()),
        ReplCommand::Move(n, order) => app
            .move_child(n, order)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string()),
    };

    match outcome {
        Ok(()) => {
            let rendered = app.render().await;
            format!("{}\n{}", app.route(), rendered)
        }
        Err(message) => format!("error: {}\n", message),
    }
}

async fn run_repl(mut app: App) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout.write_all(execute(&mut app, ReplCommand::Show).await.as_bytes()).await?;
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let output = match ReplCommand::parse(&line) {
            Ok(None) => continue,
            Ok(Some(ReplCommand::Quit)) => break,
            Ok(Some(ReplCommand::Help)) => format!("{}\n", HELP),
            Ok(Some(command)) => execute(&mut app, command).await,
            Err(message) => format!("{}\n", message),
        };
        stdout.write_all(output.as_bytes()).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose).map_err(|e| anyhow::anyhow!("could not set up logging: {}", e))?;

    let config = AppConfig::resolve(cli)?;
    log::info!("Using block store {}", config.data_file.display());

    let store = BlockStore::open(&config.data_file)
        .with_context(|| format!("opening {}", config.data_file.display()))?;
    let mut backend = LocalBackend::new(Arc::new(store));
    if let Some(workspace_id) = config.workspace_id.clone() {
        backend = backend.with_workspace(workspace_id);
    }

    let app = App::new(Arc::new(backend), config.cache_capacity);
    run_repl(app).await
}
