//! WebSocket client session management.

use std::{fmt, sync::Arc};

use futures_util::{Sink, SinkExt, StreamExt};
use gamejam_server::{
    domain::ViewMode,
    infrastructure::dto::{
        http::CreateGameRequest,
        websocket::{ClientMessage, ServerMessage},
    },
};
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, protocol::Message},
};

use crate::{
    command::{Command, HELP, parse_command},
    domain::SessionView,
    error::ClientError,
    formatter::MessageFormatter,
    game_api::GameApiClient,
    ui::print_with_prompt,
};

/// Where and as whom to join.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket endpoint, e.g. `ws://127.0.0.1:8080/ws`
    pub url: String,
    /// Base of the HTTP API, e.g. `http://127.0.0.1:8080/api`
    pub api_url: String,
    pub session_id: String,
    pub user_id: String,
    pub username: String,
}

impl SessionConfig {
    /// WebSocket URL with the identity encoded as query parameters
    pub fn connect_url(&self) -> Result<String, ClientError> {
        let mut url = reqwest::Url::parse(&self.url)
            .map_err(|e| ClientError::Connection(format!("invalid url '{}': {}", self.url, e)))?;
        url.query_pairs_mut()
            .append_pair("session_id", &self.session_id)
            .append_pair("user_id", &self.user_id)
            .append_pair("username", &self.username);
        Ok(url.to_string())
    }
}

enum Flow {
    Continue,
    Quit,
}

/// Run the WebSocket client session
pub async fn run_client_session(config: &SessionConfig) -> Result<(), ClientError> {
    let url = config.connect_url()?;

    let ws_stream = match connect_async(url.as_str()).await {
        Ok((ws_stream, _)) => ws_stream,
        Err(WsError::Http(response)) if response.status().as_u16() == 409 => {
            return Err(ClientError::DuplicateUser(config.user_id.clone()));
        }
        Err(e) => return Err(ClientError::Connection(e.to_string())),
    };

    tracing::info!("Connected to game-jam server!");
    println!(
        "\nYou are '{}' in session '{}'. Type a prompt and press Enter, /help for commands.\n",
        config.username, config.session_id
    );

    let (mut write, mut read) = ws_stream.split();
    let view = Arc::new(Mutex::new(SessionView::new(config.user_id.clone())));

    // Spawn a task to apply incoming state changes
    let read_view = view.clone();
    let read_config = config.clone();
    let mut read_task = tokio::spawn(async move {
        let mut connection_error = false;

        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(message) => {
                        let events = read_view.lock().await.apply(message);
                        for event in events {
                            let formatted =
                                MessageFormatter::format_event(&event, &read_config.user_id);
                            print_with_prompt(&formatted, &read_config.username);
                        }
                    }
                    Err(_) => {
                        let formatted = MessageFormatter::format_raw_message(&text);
                        print_with_prompt(&formatted, &read_config.username);
                    }
                },
                Ok(Message::Close(_)) => {
                    tracing::info!("Server closed the connection");
                    connection_error = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    connection_error = true;
                    break;
                }
                _ => {}
            }
        }

        connection_error
    });

    // Create channel for rustyline input
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();

    // Spawn a blocking thread for rustyline (synchronous readline)
    let prompt = format!("{}> ", config.username);
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    // Spawn a task to run commands typed at the prompt
    let api = GameApiClient::new(config.api_url.clone());
    let write_config = config.clone();
    let mut write_task = tokio::spawn(async move {
        while let Some(line) = input_rx.recv().await {
            let command = match parse_command(&line) {
                Ok(command) => command,
                Err(e) => {
                    print_with_prompt(&format!("\n! {}\n", e), &write_config.username);
                    continue;
                }
            };
            match execute(command, &mut write, &view, &api, &write_config).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => return false,
                Err(e) => {
                    tracing::warn!("Failed to send message: {}", e);
                    return true;
                }
            }
        }
        false
    });

    // If any one of the tasks completes, abort the other
    let connection_lost = tokio::select! {
        read_result = &mut read_task => {
            write_task.abort();
            read_result.unwrap_or(false)
        }
        write_result = &mut write_task => {
            read_task.abort();
            write_result.unwrap_or(false)
        }
    };
    if connection_lost {
        return Err(ClientError::Connection("Connection lost".to_string()));
    }

    Ok(())
}

async fn send<S>(write: &mut S, message: ClientMessage) -> Result<(), ClientError>
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    let json = serde_json::to_string(&message)
        .map_err(|e| ClientError::Connection(format!("failed to encode message: {}", e)))?;
    write
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| ClientError::Connection(e.to_string()))
}

/// Run one command. Only a failed WebSocket send is an error; API failures
/// are reported at the prompt.
async fn execute<S>(
    command: Command,
    write: &mut S,
    view: &Mutex<SessionView>,
    api: &GameApiClient,
    config: &SessionConfig,
) -> Result<Flow, ClientError>
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    let notice = |text: String| print_with_prompt(&format!("\n{}\n", text), &config.username);

    let message = match command {
        Command::Say(text) => ClientMessage::Submit { text },
        Command::Typing => ClientMessage::TypingStatus {
            is_composing: true,
            draft: String::new(),
        },
        Command::Idle => ClientMessage::TypingStatus {
            is_composing: false,
            draft: String::new(),
        },
        Command::Play => ClientMessage::SetViewMode {
            mode: ViewMode::Play,
        },
        Command::Edit => ClientMessage::SetViewMode {
            mode: ViewMode::Edit,
        },
        Command::Code(code) => ClientMessage::EditCode { code },
        Command::Apply => ClientMessage::ApplyCode,
        Command::Example(name) => {
            notice(format!("Loading example '{}'", name));
            ClientMessage::LoadExample { name }
        }
        Command::Load(id) => match api.get(&id).await {
            Ok(game) => {
                notice(format!("Loading '{}'", game.title));
                ClientMessage::LoadCode { code: game.code }
            }
            Err(e) => {
                notice(format!("! could not load '{}': {}", id, e));
                return Ok(Flow::Continue);
            }
        },
        Command::Save(title) => {
            let code = view.lock().await.editor_code().map(str::to_string);
            let Some(code) = code else {
                notice("! nothing to save yet".to_string());
                return Ok(Flow::Continue);
            };
            let request = CreateGameRequest {
                title: Some(title),
                description: None,
                code: Some(code),
                author_id: Some(config.user_id.clone()),
                author_username: Some(config.username.clone()),
            };
            match api.create(&request).await {
                Ok(game) => notice(format!("Saved '{}' as {}", game.title, game.id)),
                Err(e) => notice(format!("! save failed: {}", e)),
            }
            return Ok(Flow::Continue);
        }
        Command::Games => {
            match api.list_by_author(&config.user_id).await {
                Ok(games) => print_with_prompt(
                    &MessageFormatter::format_games(&games),
                    &config.username,
                ),
                Err(e) => notice(format!("! could not list games: {}", e)),
            }
            return Ok(Flow::Continue);
        }
        Command::Players => {
            let view = view.lock().await;
            let formatted = MessageFormatter::format_session_joined(
                &config.session_id,
                view.players(),
                &config.user_id,
            );
            print_with_prompt(&formatted, &config.username);
            return Ok(Flow::Continue);
        }
        Command::Help => {
            notice(HELP.to_string());
            return Ok(Flow::Continue);
        }
        Command::Quit => return Ok(Flow::Quit),
    };

    send(write, message).await?;
    Ok(Flow::Continue)
}
