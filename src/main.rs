use std::io::Write as _;
use std::sync::Arc;

use color_eyre::eyre::{bail, eyre};
use color_eyre::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use cozeterm::adapters::FileCredentialsProvider;
use cozeterm::client::{CozeClient, COZE_BASE_URL};
use cozeterm::models::{generate_user_id, MessageRole};
use cozeterm::session::ChatSession;
use cozeterm::traits::CredentialsProvider;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "\
cozeterm - terminal chat client for Coze agents

USAGE:
    cozeterm [OPTIONS]

OPTIONS:
    --api-key <KEY>     Coze API key (persisted after first use)
    --bot-id <ID>       Agent id to chat with (persisted after first use)
    --base-url <URL>    Override the API endpoint
    --new               Start a fresh conversation
    -V, --version       Print version
    -h, --help          Print this help

COMMANDS (interactive):
    /history            Reload and print the conversation history
    /new                Start a fresh conversation
    /quit               Exit
";

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    api_key: Option<String>,
    bot_id: Option<String>,
    base_url: Option<String>,
    fresh: bool,
    version: bool,
    help: bool,
}

fn parse_args<I>(mut args: I) -> Result<CliArgs>
where
    I: Iterator<Item = String>,
{
    let mut parsed = CliArgs::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--api-key" => {
                parsed.api_key = Some(args.next().ok_or_else(|| eyre!("--api-key needs a value"))?)
            }
            "--bot-id" => {
                parsed.bot_id = Some(args.next().ok_or_else(|| eyre!("--bot-id needs a value"))?)
            }
            "--base-url" => {
                parsed.base_url =
                    Some(args.next().ok_or_else(|| eyre!("--base-url needs a value"))?)
            }
            "--new" => parsed.fresh = true,
            "--version" | "-V" => parsed.version = true,
            "--help" | "-h" => parsed.help = true,
            other => bail!("unknown argument: {} (try --help)", other),
        }
    }
    Ok(parsed)
}

fn print_transcript(session: &ChatSession) {
    for message in session.messages() {
        let prefix = match message.role {
            MessageRole::User => "you",
            MessageRole::Assistant => "bot",
        };
        println!("{}> {}", prefix, message.text);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    if args.version {
        println!("cozeterm {}", VERSION);
        return Ok(());
    }
    if args.help {
        print!("{}", USAGE);
        return Ok(());
    }

    let store = FileCredentialsProvider::new().map_err(|e| eyre!("{}", e))?;
    let mut credentials = store
        .load()
        .await
        .map_err(|e| eyre!("{}", e))?
        .unwrap_or_default();

    if let Some(api_key) = args.api_key {
        credentials.api_key = api_key;
    }
    if let Some(bot_id) = args.bot_id {
        credentials.bot_id = bot_id;
    }
    if args.fresh {
        credentials.conversation_id = None;
    }
    if credentials.api_key.is_empty() || credentials.bot_id.is_empty() {
        bail!("missing configuration: pass --api-key and --bot-id once (they are persisted)");
    }
    // Generated once per configuration, never regenerated.
    if credentials.user_id.is_empty() {
        credentials.user_id = generate_user_id();
    }
    store.save(&credentials).await.map_err(|e| eyre!("{}", e))?;

    let base_url = args.base_url.unwrap_or_else(|| COZE_BASE_URL.to_string());
    let client = CozeClient::with_base_url(base_url);
    let mut session = ChatSession::new(client, Arc::new(store), credentials);

    if session.credentials().conversation_id.is_some() {
        match session.load_history().await {
            Ok(count) if count > 0 => print_transcript(&session),
            Ok(_) => {}
            Err(e) => eprintln!("加载历史消息失败: {}", e),
        }
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut input = stdin.lines();

    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let line = match input.next_line().await? {
            Some(line) => line,
            None => break,
        };
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/new" => {
                session
                    .reset_conversation()
                    .await
                    .map_err(|e| eyre!("{}", e))?;
                println!("(new conversation)");
            }
            "/history" => match session.load_history().await {
                Ok(_) => print_transcript(&session),
                Err(e) => eprintln!("加载历史消息失败: {}", e),
            },
            text => {
                print!("bot> ");
                std::io::stdout().flush()?;

                let mut print_delta = |delta: &str| {
                    print!("{}", delta);
                    let _ = std::io::stdout().flush();
                };
                let result = session.send_with(text, Some(&mut print_delta)).await;

                match result.error {
                    Some(err) => println!("错误: {}", err),
                    None => println!(),
                }
            }
        }
    }

    Ok(())
}
