// Interactive terminal front end over the same ChatService the web widget uses.

use anyhow::{Context, Result};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::session::{self, ChatService, Message, Sender};

const HELP: &str = "Commandes : /suggestions, /1 à /7 (remplir avec une suggestion), /appel (appeler le 18), /quitter\nUne ligne vide envoie la suggestion en attente.";

fn render(message: &Message) -> String {
    let who = match message.sender {
        Sender::User => "Vous",
        Sender::Assistant => "Assistant",
    };
    let mut header = format!("[{}] {}", message.display_time(), who);
    if message.is_emergency() {
        header.push_str(" [URGENCE VITALE]");
    }
    if let Some(label) = message.source_label() {
        header.push_str(&format!(" ({})", label));
    }
    format!("{}\n{}\n", header, message.text)
}

enum Command {
    Quit,
    Help,
    Suggestions,
    Suggestion(usize),
    Call,
    Send(String),
}

fn parse_line(line: &str) -> Command {
    let line = line.trim();
    match line {
        "/quitter" | "/quit" | "/q" => Command::Quit,
        "/aide" | "/help" => Command::Help,
        "/suggestions" => Command::Suggestions,
        "/appel" | "/18" => Command::Call,
        _ => match line.strip_prefix('/').and_then(|n| n.parse::<usize>().ok()) {
            Some(n) if n >= 1 => Command::Suggestion(n - 1),
            _ => Command::Send(line.to_string()),
        },
    }
}

pub async fn run_terminal_chat(service: ChatService) -> Result<()> {
    info!("Starting terminal chat session");
    let mut stdout = std::io::stdout();

    for message in service.messages().await {
        println!("{}", render(&message));
    }
    println!("{}\n", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        stdout.flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read from stdin")? else {
            break;
        };

        match parse_line(&line) {
            Command::Quit => break,
            Command::Help => println!("{}", HELP),
            Command::Suggestions => {
                for (i, phrase) in session::suggestions().iter().enumerate() {
                    println!("  /{} {}", i + 1, phrase);
                }
            }
            Command::Suggestion(index) => match service.apply_suggestion(index).await {
                Ok(phrase) => println!("Suggestion prête : « {} » (Entrée pour envoyer)", phrase),
                Err(e) => println!("{}", e),
            },
            Command::Call => println!("\n{}\n", session::emergency_call_notice()),
            Command::Send(text) => {
                let text = if text.is_empty() { service.take_input().await } else { text };
                if text.trim().is_empty() {
                    continue;
                }
                println!("{}", service.loading_hint());
                match service.submit(&text).await {
                    Ok(exchange) => println!("\n{}", render(&exchange.assistant)),
                    Err(e) => println!("{}", e),
                }
            }
        }
    }

    println!("Au revoir.");
    Ok(())
}
