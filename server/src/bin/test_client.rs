use clap::Parser;
use futures::{SinkExt, StreamExt};
use shared::{GameState, LoginRequest, LoginResponse, CHAT_PATH, LOGIN_PATH};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Interactive hub client: logs in, handshakes, then sends stdin lines as chat
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:4444")]
    server: String,
    /// Username to log in as
    #[arg(short, long, default_value = "guest")]
    username: String,
    /// Password (not checked by the server)
    #[arg(long, default_value = "")]
    password: String,
}

fn describe(message: &Message) -> Option<String> {
    match message {
        Message::Text(text) => Some(text.to_string()),
        Message::Binary(bytes) => Some(match GameState::decode(bytes) {
            Ok(state) => format!(
                "[state] {} ({} players, {} bytes)",
                state.session_id,
                state.players.len(),
                bytes.len()
            ),
            Err(_) => format!("[state] {} opaque bytes", bytes.len()),
        }),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    // Log in
    let login_url = format!("http://{}{}", args.server, LOGIN_PATH);
    println!("Logging in as {} at {}", args.username, login_url);
    let response: LoginResponse = reqwest::Client::new()
        .post(&login_url)
        .json(&LoginRequest {
            username: args.username.clone(),
            password: args.password.clone(),
        })
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    // Connect and present the token
    let chat_url = format!("ws://{}{}", args.server, CHAT_PATH);
    let (socket, _) = connect_async(chat_url.as_str()).await?;
    println!("Connected to {}", chat_url);
    let (mut sink, mut stream) = socket.split();
    sink.send(Message::Text(response.session_id)).await?;

    let printer = tokio::spawn(async move {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Close(_)) => break,
                Ok(message) => {
                    if let Some(line) = describe(&message) {
                        println!("{}", line);
                    }
                }
                Err(e) => {
                    println!("Connection error: {}", e);
                    break;
                }
            }
        }
        println!("Server closed the connection");
    });

    // Forward stdin
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            continue;
        }
        if sink.send(Message::Text(line)).await.is_err() {
            break;
        }
    }

    let _ = sink.send(Message::Close(None)).await;
    let _ = printer.await;
    println!("Test client finished");

    Ok(())
}
