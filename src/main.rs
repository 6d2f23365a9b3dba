use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use secours::constants;
use secours::matcher::{KeywordMatcher, GENERAL};
use secours::session::{self, ChatService, Message, SessionRegistry};
use secours::{chat, web_server, Settings};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Bearer credential for the inference endpoint. Without it only the local table answers.
    #[arg(long, global = true, env = "HUGGINGFACE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Text-generation endpoint URL.
    #[arg(long, global = true, env = "SECOURS_INFERENCE_URL", default_value_t = constants::INFERENCE_URL.clone())]
    endpoint: String,

    /// Timeout applied to each remote request, in seconds.
    #[arg(long, global = true, env = "SECOURS_TIMEOUT_SECS", default_value_t = constants::DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Minimum time before an answer is shown, in milliseconds (0 disables).
    #[arg(long, global = true, env = "SECOURS_RESPONSE_DELAY_MS", default_value_t = constants::DEFAULT_RESPONSE_DELAY_MS)]
    delay_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

// Define the available subcommands
#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the chat widget and its JSON API.
    Serve {
        #[arg(long, default_value_t = constants::DEFAULT_PORT, help = "Port for the web server.")]
        port: u16,
        #[arg(long, default_value_t = constants::TEMPLATES_DIR.clone(), help = "Directory holding page templates.")]
        templates: String,
        #[arg(long, default_value_t = constants::STATIC_DIR.clone(), help = "Directory served under /static.")]
        static_dir: String,
    },
    /// Chat with the assistant in the terminal.
    Chat,
    /// Answer a single message and exit.
    Ask {
        /// Description of the situation.
        text: String,
        #[arg(long, help = "Print the answer as JSON.")]
        json: bool,
    },
    /// List the local advice categories in match order.
    Categories,
    /// Show what the emergency-call button does (no call is placed).
    Call,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for the inference credential)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG (e.g. RUST_LOG=info,secours=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("secours starting with command: {:?}", cli.command);

    let settings = Settings::new(cli.api_key, cli.endpoint, cli.timeout_secs, cli.delay_ms);

    match cli.command {
        Commands::Serve { port, templates, static_dir } => {
            let sessions = SessionRegistry::new(settings.build_resolver());
            let mut web_server_handle = tokio::spawn(async move {
                if let Err(e) = web_server::start_web_server(port, sessions, &templates, &static_dir).await {
                    error!("Web server failed: {:?}", e);
                }
            });

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Ctrl-C received, shutting down...");
                }
                res = &mut web_server_handle => {
                    match res {
                        Ok(_) => info!("Web server task completed unexpectedly."),
                        Err(e) if e.is_panic() => error!("Web server task panicked: {:?}", e),
                        Err(e) => error!("Web server task failed: {:?}", e),
                    }
                }
            }
        }
        Commands::Chat => {
            let service = ChatService::new(settings.build_resolver());
            chat::run_terminal_chat(service).await?;
        }
        Commands::Ask { text, json } => {
            // One-shot answers skip the display delay
            let service = ChatService::new(settings.build_resolver().with_response_delay(None));
            let exchange = service.submit(&text).await.context("Could not submit message")?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&exchange.assistant).context("Failed to encode answer")?
                );
            } else {
                print_answer(&exchange.assistant);
            }
        }
        Commands::Categories => {
            for (i, category) in KeywordMatcher::categories().iter().enumerate() {
                let severity = if category.is_emergency { "urgence" } else { "-" };
                println!("{}. {:<14} {:<8} {}", i + 1, category.name, severity, category.keywords.join(", "));
            }
            println!("-  {:<14} {:<8} (aucun mot-clé reconnu)", GENERAL.name, "-");
        }
        Commands::Call => {
            println!("{}", session::emergency_call_notice());
        }
    }

    Ok(())
}

fn print_answer(message: &Message) {
    if message.is_emergency() {
        println!("URGENCE VITALE");
    }
    if let Some(label) = message.source_label() {
        println!("Source : {}", label);
    }
    println!("{}", message.text);
}
