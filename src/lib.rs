pub mod citation;
pub mod cli;
pub mod client;
pub mod conversation;
pub mod error;
pub mod history;
pub mod models;
pub mod render;
pub mod session;
pub mod stream;
pub mod transport;

use cli::Args;
use client::ChatClient;
use error::{ ChatError, TransportError };
use log::{ error, info, warn };
use render::terminal::TerminalSink;
use std::error::Error;
use std::sync::Arc;
use tokio::io::{ AsyncBufReadExt, BufReader };
use transport::{ Endpoints, HttpTransport };

const HELP: &str = "commands: /cancel  /new  /edit [id]  /doc <file>  /quit";

fn transport_from_args(args: &Args) -> Result<HttpTransport, TransportError> {
    let endpoints = Endpoints::new(
        &args.base_url,
        &args.chat_route,
        &args.history_route,
        &args.document_route
    )?;
    info!(
        "Transport configured: chat={}, history={}, document={}",
        endpoints.chat,
        endpoints.history,
        endpoints.document
    );
    HttpTransport::new(endpoints)
}

fn report(result: Result<client::SendOutcome, ChatError>) {
    match result {
        Ok(outcome) => info!("Exchange finished: {:?}", outcome),
        Err(ChatError::Aborted) => info!("Exchange aborted."),
        Err(e) => error!("Send failed: {}", e),
    }
}

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Backend: {}", args.base_url);
    info!("Chat Route: {}", args.chat_route);
    info!("History Route: {}", args.history_route);
    info!("Document Route: {}", args.document_route);
    info!("Load History: {}", !args.skip_history);
    info!("-------------------------");

    let transport = Arc::new(transport_from_args(&args)?);
    let client = Arc::new(ChatClient::new(transport, Arc::new(TerminalSink::stdout())));

    if !args.skip_history {
        if let Err(e) = client.load_history().await {
            warn!("Continuing without history: {}", e);
        }
    }

    if let Some(message) = args.message.as_deref() {
        let outcome = client.send_message(message).await?;
        info!("Exchange finished: {:?}", outcome);
        return Ok(());
    }

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input.split_once(' ').map(|(cmd, rest)| (cmd, rest.trim())).unwrap_or((input, "")) {
            ("/quit", _) => {
                client.cancel();
                break;
            }
            ("/cancel", _) => client.cancel(),
            ("/new", _) => client.new_thread().await,
            ("/help", _) => println!("{}", HELP),
            ("/edit", target) => {
                let id = if target.is_empty() {
                    client.last_user_message_id().await
                } else {
                    Some(target.to_string())
                };
                let Some(id) = id else {
                    println!("nothing to edit");
                    continue;
                };
                let client = Arc::clone(&client);
                tokio::spawn(async move { report(client.resubmit(&id).await) });
            }
            ("/doc", "") => println!("usage: /doc <file>"),
            ("/doc", file_name) => {
                match client.fetch_document(file_name).await {
                    Ok(text) => println!("----- {} -----\n{}\n-----", file_name, text),
                    Err(e) => println!("!! {}", e),
                }
            }
            _ => {
                let client = Arc::clone(&client);
                let message = input.to_string();
                tokio::spawn(async move { report(client.send_message(&message).await) });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn transport_is_built_from_args() {
        let args = Args::try_parse_from([
            "agent-chat",
            "--base-url",
            "http://10.0.0.2:8080",
            "--chat-route",
            "/api/chat",
        ]).unwrap();
        assert!(transport_from_args(&args).is_ok());

        let args = Args::try_parse_from(["agent-chat", "--base-url", "not a url"]).unwrap();
        assert!(matches!(transport_from_args(&args), Err(TransportError::Endpoint(_))));
    }
}
