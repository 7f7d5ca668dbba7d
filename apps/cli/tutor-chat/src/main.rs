use tutor_chat::app::{Flow, TutorChat, credential_from_env, format_entry};
use tutor_chat::error::TutorChatError;
use tutor_chat::logger::initialize as LoggerInitialize;
use tutor_chat::repl::{HELP_TEXT, ReplCommand};

use chat_core::config::{ChatCoreConfig, default_config_dir, load_dotenv};

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::process::ExitCode;

use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader, stdin};

const APP_DIR_NAME: &str = "tutor-chat";

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), TutorChatError> {
    let log_dir = dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| TutorChatError::TutorChat {
            message: String::from("Failed to get log directory"),
            location: ErrorLocation::from(Location::caller()),
        })?;
    create_dir_all(&log_dir)?;

    // Initialize logger FIRST
    LoggerInitialize(&log_dir)?;
    info!("tutor-chat starting");

    load_dotenv();

    let config_dir = default_config_dir().ok_or_else(|| TutorChatError::TutorChat {
        message: String::from("Failed to get config directory"),
        location: ErrorLocation::from(Location::caller()),
    })?;
    let mut config = ChatCoreConfig::load(&config_dir)?;
    config.apply_env_overrides()?;

    let credential = credential_from_env()?;
    let chat = TutorChat::new(&config, credential)?;

    chat.log().subscribe(|entry| println!("{}", format_entry(entry)));
    chat.manager()
        .on_reconnect_exhausted(|e| eprintln!("Connection lost for good: {e} (use /connect)"));
    chat.manager()
        .on_refresh_denied(|e| eprintln!("Session expired: {e}"));

    if let Err(e) = chat.connect().await {
        warn!("First connection attempt failed, retrying in the background: {e}");
    }

    println!("{HELP_TEXT}");

    let mut lines = BufReader::new(stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match ReplCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        match chat.handle(command).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Print(text)) => println!("{text}"),
            Ok(Flow::Quit) => break,
            Err(e) => {
                error!("{e}");
            }
        }
    }

    chat.shutdown().await;
    info!("tutor-chat stopped");
    Ok(())
}
