use anyhow::Result;
use quill::app::{App, SessionAction, SessionHandle};
use quill::config::Config;
use quill::groups::SEARCH_GROUPS;
use quill::session::{SessionUpdate, StreamStatus, UserTurn};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let (initial_query, fallback_query) = parse_query_args();
    let (app, handle, update_rx) = App::new(config, initial_query, fallback_query)?;

    tokio::spawn(read_input(handle.clone()));
    tokio::spawn(print_updates(update_rx));

    app.run().await
}

/// Deep-link aliases: `--query <text>` wins over `--q <text>`.
fn parse_query_args() -> (Option<String>, Option<String>) {
    let mut query = None;
    let mut fallback = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--query" => query = args.next(),
            "--q" => fallback = args.next(),
            _ => {}
        }
    }
    (query, fallback)
}

async fn read_input(handle: SessionHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            _ => break,
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input.split_once(' ').unwrap_or((input, "")) {
            ("/quit" | "/q" | "/exit", _) => break,
            ("/stop", _) => handle.send(SessionAction::Stop),
            ("/new", _) => handle.send(SessionAction::NewSession),
            ("/time", _) => handle.send(SessionAction::SubmitClockPrompt),
            ("/model", model) if !model.is_empty() => {
                handle.send(SessionAction::SetModel(model.to_string()));
            }
            ("/group", group) if !group.is_empty() => {
                handle.send(SessionAction::SetGroup(group.to_string()));
            }
            ("/groups", _) => {
                for group in SEARCH_GROUPS {
                    println!("  {:<10} {}", group.id, group.description);
                }
            }
            ("/edit", rest) => match rest.split_once(' ') {
                Some((index, content)) => match index.parse::<usize>() {
                    Ok(index) => handle.send(SessionAction::EditTurn {
                        index,
                        content: content.to_string(),
                    }),
                    Err(_) => eprintln!("usage: /edit <turn-index> <new content>"),
                },
                None => eprintln!("usage: /edit <turn-index> <new content>"),
            },
            _ => handle.send(SessionAction::Submit(UserTurn::text(input))),
        }
    }
    handle.send(SessionAction::Shutdown);
}

async fn print_updates(mut update_rx: tokio::sync::mpsc::UnboundedReceiver<SessionUpdate>) {
    use std::io::Write;

    while let Some(update) = update_rx.recv().await {
        match update {
            SessionUpdate::StreamDelta(text) => {
                print!("{text}");
                let _ = std::io::stdout().flush();
            }
            SessionUpdate::StatusChanged(status) => match status {
                StreamStatus::Ready | StreamStatus::Errored => println!(),
                _ => {}
            },
            SessionUpdate::SuggestionsChanged(questions) if !questions.is_empty() => {
                println!("* Suggested follow-ups:");
                for question in questions {
                    println!("  - {question}");
                }
            }
            SessionUpdate::Notice(message) => eprintln!("* Error: {message}"),
            // A line UI has no viewport; scroll commands and clock beats are
            // consumed by richer front ends.
            _ => {}
        }
    }
}
