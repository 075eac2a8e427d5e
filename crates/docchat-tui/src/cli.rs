//! One-shot subcommands sharing the TUI's controller and clients

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;

use docchat_core::{upload, BackendClient, ChatController, FileList, HistoryStore, Notice, UploadState};

fn print_notice(notice: Notice) -> Result<()> {
    match notice {
        Notice::Success(text) => {
            println!("{}", text);
            Ok(())
        }
        Notice::Failure(text) => bail!(text),
    }
}

/// Submit one query and print the reply. History is persisted the same way
/// the TUI does it.
pub async fn ask(api: &BackendClient, store: HistoryStore, query: &str) -> Result<()> {
    let mut chat = ChatController::open(store);
    let token = CancellationToken::new();

    if !chat.submit_query(query, api, &token).await {
        bail!("Nothing to send");
    }

    let Some(reply) = chat.messages().last() else {
        bail!("No reply recorded");
    };
    if reply.is_error {
        bail!(reply.text.clone());
    }
    println!("{}", reply.text);
    Ok(())
}

pub async fn files(api: &BackendClient, legacy: bool) -> Result<()> {
    let token = CancellationToken::new();

    if legacy {
        let names = api
            .list_files(&token)
            .await
            .context("Failed to list files")?;
        for name in names {
            println!("{}", name);
        }
        return Ok(());
    }

    let mut list = FileList::new();
    list.refresh(api, &token).await;
    for entry in list.entries() {
        println!("{}", entry);
    }
    Ok(())
}

pub async fn upload(api: &BackendClient, path: &Path) -> Result<()> {
    let token = CancellationToken::new();
    let mut state = UploadState::new();
    let mut list = FileList::new();

    if !upload::has_accepted_extension(path) {
        eprintln!(
            "Note: expected one of {}",
            upload::ACCEPTED_EXTENSIONS.join(", ")
        );
    }

    match upload::upload(&mut state, &mut list, api, Some(path), &token).await {
        Some(notice) => print_notice(notice),
        None => Ok(()),
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "Yes"))
}

pub async fn delete(api: &BackendClient, name: &str, yes: bool) -> Result<()> {
    let confirmed = yes || confirm(&format!("Delete '{}'?", name))?;
    let token = CancellationToken::new();
    let mut list = FileList::new();

    match list.delete(api, name, confirmed, &token).await {
        Some(notice) => print_notice(notice),
        None => Ok(()),
    }
}

pub fn history(store: HistoryStore) -> Result<()> {
    let messages = store.try_load().context("Failed to read chat history")?;
    if messages.is_empty() {
        println!("No chat history");
        return Ok(());
    }

    for msg in &messages {
        let who = if msg.is_user() { "You" } else { "AI" };
        let flag = if msg.is_error { " (error)" } else { "" };
        println!("[{}] {}{}:", msg.local_time(), who, flag);
        println!("{}\n", msg.text);
    }
    Ok(())
}

pub fn clear(store: HistoryStore) -> Result<()> {
    let mut chat = ChatController::open(store);
    chat.clear();
    println!("Chat history cleared");
    Ok(())
}
