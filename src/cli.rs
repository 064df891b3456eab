use std::error::Error;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use biblebot_rs::web::{self, WebConfig};
use biblebot_rs::{TopicStore, VerseApiConfig, VersePolicy, rank};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "biblebot-rs", about = "Answer questions with Bible verses", version)]
pub struct Cli {
    /// JSON file mapping topic names to verse lists.
    #[arg(long, global = true, env = "TOPIC_MAP", default_value = "topic_map.json")]
    topics: PathBuf,

    /// Emit JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP backend.
    Serve {
        /// Address to bind; all interfaces unless narrowed.
        #[arg(long, default_value = "0.0.0.0")]
        host: IpAddr,
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
        #[command(flatten)]
        responder: ResponderArgs,
    },
    /// Answer a single message the same way `POST /ask` would.
    Ask {
        #[arg(required = true)]
        message: Vec<String>,
        #[command(flatten)]
        responder: ResponderArgs,
    },
    /// Show how a message scores against every topic.
    Resolve {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// List the loaded topics.
    Topics,
}

#[derive(Args, Debug)]
struct ResponderArgs {
    /// Base URL of the bible-api.com compatible verse service.
    #[arg(long, env = "VERSE_API_URL", default_value = "https://bible-api.com")]
    verse_api: String,
    /// Translation requested from the verse service.
    #[arg(long, env = "VERSE_TRANSLATION", default_value = "kjv")]
    translation: String,
    /// Seconds before a verse lookup is abandoned.
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,
    /// Reply with the stored reference instead of fetching its text.
    #[arg(long)]
    reference_only: bool,
    /// Seed for verse and phrase selection.
    #[arg(long)]
    seed: Option<u64>,
}

impl ResponderArgs {
    fn into_config(self, addr: SocketAddr) -> WebConfig {
        WebConfig {
            addr,
            verse_api: VerseApiConfig {
                base_url: self.verse_api,
                translation: self.translation,
                timeout: Duration::from_secs(self.timeout_secs),
            },
            policy: if self.reference_only {
                VersePolicy::ReferenceOnly
            } else {
                VersePolicy::FetchText
            },
            seed: self.seed,
        }
    }
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing();
    let store = match TopicStore::load(&cli.topics) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            error!(path = %cli.topics.display(), error = %err, "Could not load topic map");
            return Err(err.into());
        }
    };
    match cli.command {
        Command::Serve {
            host,
            port,
            responder,
        } => {
            let config = responder.into_config(SocketAddr::new(host, port));
            runtime()?.block_on(web::serve(config, store))?;
            Ok(())
        }
        Command::Ask { message, responder } => {
            handle_ask(message.join(" "), responder, store, cli.json)
        }
        Command::Resolve { query } => handle_resolve(query.join(" "), &store, cli.json),
        Command::Topics => handle_topics(&store, cli.json),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("biblebot_rs=info,tower_http=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
}

fn handle_ask(
    message: String,
    args: ResponderArgs,
    store: Arc<TopicStore>,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let config = args.into_config(WebConfig::default().addr);
    let responder = web::build_responder(store, &config)?;
    let reply = runtime()?.block_on(responder.handle(&message))?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&reply)?);
    } else {
        println!("{}", reply.text);
    }
    Ok(())
}

fn handle_resolve(query: String, store: &TopicStore, as_json: bool) -> Result<(), Box<dyn Error>> {
    let matches = rank(&query, store);
    if as_json {
        let payload = json!({
            "query": query,
            "best": matches.first().map(|m| m.topic),
            "results": matches.iter().map(|m| {
                json!({
                    "topic": m.topic,
                    "matched": m.score.matched,
                    "total": m.score.total,
                    "score": m.score.ratio(),
                })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }
    if matches.is_empty() {
        println!("No topic shares a word with \"{query}\".");
        return Ok(());
    }
    let width = matches
        .iter()
        .map(|m| m.topic.len())
        .max()
        .unwrap_or(5)
        .max("TOPIC".len());
    println!("{:<width$}  {:>5}  {}", "TOPIC", "SCORE", "OVERLAP", width = width);
    println!("{:-<width$}  {:->5}  {}", "", "", "-------", width = width);
    for m in &matches {
        println!(
            "{:<width$}  {:>5.2}  {}/{}",
            m.topic,
            m.score.ratio(),
            m.score.matched,
            m.score.total,
            width = width
        );
    }
    Ok(())
}

fn handle_topics(store: &TopicStore, as_json: bool) -> Result<(), Box<dyn Error>> {
    if as_json {
        let payload: Vec<_> = store
            .iter()
            .map(|topic| json!({ "name": topic.name(), "verses": topic.verses() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }
    if store.is_empty() {
        println!("No topics loaded.");
        return Ok(());
    }
    let width = store
        .iter()
        .map(|topic| topic.name().len())
        .max()
        .unwrap_or(5)
        .max("TOPIC".len());
    println!("{:<width$}  {}", "TOPIC", "VERSES", width = width);
    println!("{:-<width$}  {}", "", "------", width = width);
    for topic in store.iter() {
        println!("{:<width$}  {}", topic.name(), topic.verses().join("; "), width = width);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_binds_all_interfaces_by_default() {
        let cli = Cli::try_parse_from(["biblebot-rs", "serve"]).unwrap();
        match cli.command {
            Command::Serve { host, .. } => assert_eq!(host, IpAddr::from([0, 0, 0, 0])),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn serve_host_can_be_narrowed() {
        let args = ["biblebot-rs", "serve", "--host", "127.0.0.1", "--port", "8080"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Serve { host, port, .. } => {
                assert!(host.is_loopback());
                assert_eq!(port, 8080);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
