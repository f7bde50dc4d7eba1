use crate::chat::{ChatEngine, LiveReply, SendOptions};
use crate::completion::StreamEvent;
use crate::store::types::{ScheduleEvent, UserProfile};
use crate::templates::GeneratorKind;
use anyhow::Result;
use std::io::Write as _;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::error;

const HELP: &str = "Commands:\n\
    /docs                      list your documents\n\
    /upload <path>             upload and extract a document\n\
    /rmdoc <id>                delete a document\n\
    /use <id>                  ground the chat in a document\n\
    /nodoc                     stop grounding in a document\n\
    /events                    list schedule events\n\
    /event <date> <title>      add a schedule event (date: YYYY-MM-DD)\n\
    /rmevent <id>              delete a schedule event\n\
    /lesson <topic>            generate a lesson plan\n\
    /quiz <topic>              generate a quiz\n\
    /rubric <topic>            generate a rubric\n\
    /instruction <text>        set the system instruction (admin)\n\
    /status                    show session info\n\
    /quit                      exit\n\
    Anything else is sent to the assistant.";

pub async fn run(engine: Arc<ChatEngine>, profile: UserProfile) -> Result<()> {
    println!(
        "Chalkbox - signed in as {} ({:?} plan). Type /help for commands.",
        profile.display_name, profile.plan
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut selected_doc: Option<String> = None;

    prompt();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            prompt();
            continue;
        }

        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (line.as_str(), ""),
        };

        match command {
            "/quit" | "/exit" => break,
            "/help" => println!("{}", HELP),
            "/status" => {
                println!(
                    "User: {} ({:?}, {:?} plan) | grounding: {} | phase: {:?}",
                    profile.display_name,
                    profile.role,
                    profile.plan,
                    selected_doc.as_deref().unwrap_or("none"),
                    engine.phase().await
                );
            }
            "/docs" => match engine.store().documents(&profile.id).await {
                Ok(docs) if docs.is_empty() => println!("No documents yet."),
                Ok(docs) => {
                    for doc in docs {
                        println!("{}  {} ({} bytes)", doc.id, doc.name, doc.size_bytes);
                    }
                }
                Err(e) => error!("Could not list documents: {}", e),
            },
            "/upload" => upload(&engine, &profile, rest).await,
            "/rmdoc" => {
                if let Err(e) = engine.store().delete_document(&profile.id, rest).await {
                    error!("Could not delete document: {}", e);
                } else {
                    if selected_doc.as_deref() == Some(rest) {
                        selected_doc = None;
                    }
                    println!("Deleted.");
                }
            }
            "/use" => {
                selected_doc = Some(rest.to_string());
                println!("Grounding chat in document {}.", rest);
            }
            "/nodoc" => {
                selected_doc = None;
                println!("Document grounding off.");
            }
            "/events" => match engine.store().events(&profile.id).await {
                Ok(events) if events.is_empty() => println!("No events yet."),
                Ok(events) => {
                    for event in events {
                        println!("{}  {}  {} [{}]", event.id, event.date, event.title, event.category);
                    }
                }
                Err(e) => error!("Could not list events: {}", e),
            },
            "/event" => match rest.split_once(char::is_whitespace) {
                Some((date, title)) => {
                    let event = ScheduleEvent::new(&profile.id, title.trim(), date, "general");
                    match engine.store().save_event(&event).await {
                        Ok(()) => println!("Added event {}.", event.id),
                        Err(e) => error!("Could not save event: {}", e),
                    }
                }
                None => println!("Usage: /event <date> <title>"),
            },
            "/rmevent" => {
                if let Err(e) = engine.store().delete_event(&profile.id, rest).await {
                    error!("Could not delete event: {}", e);
                } else {
                    println!("Deleted.");
                }
            }
            "/lesson" => generate(&engine, &profile, &selected_doc, GeneratorKind::LessonPlan, rest).await,
            "/quiz" => generate(&engine, &profile, &selected_doc, GeneratorKind::Quiz, rest).await,
            "/rubric" => generate(&engine, &profile, &selected_doc, GeneratorKind::Rubric, rest).await,
            "/instruction" => match engine.set_system_instruction(&profile, rest).await {
                Ok(()) => println!("System instruction updated."),
                Err(e) => println!("{}", e),
            },
            _ => {
                let opts = SendOptions {
                    document_id: selected_doc.clone(),
                    ..Default::default()
                };
                send_turn(&engine, &profile.id, &line, opts).await;
            }
        }
        prompt();
    }

    Ok(())
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

async fn upload(engine: &Arc<ChatEngine>, profile: &UserProfile, path: &str) {
    if path.is_empty() {
        println!("Usage: /upload <path>");
        return;
    }
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            println!("Could not read {}: {}", path, e);
            return;
        }
    };
    let filename = path.rsplit('/').next().unwrap_or(path);
    match engine.upload_document(profile, filename, &bytes).await {
        Ok(doc) => println!("Uploaded {} as {}.", doc.name, doc.id),
        Err(e) => println!("{}", e),
    }
}

async fn generate(
    engine: &Arc<ChatEngine>,
    profile: &UserProfile,
    selected_doc: &Option<String>,
    kind: GeneratorKind,
    topic: &str,
) {
    if topic.is_empty() {
        println!("Give a topic for the {}, e.g. photosynthesis.", kind.label());
        return;
    }
    let opts = SendOptions {
        document_id: selected_doc.clone(),
        include_document: Some(selected_doc.is_some()),
        format_directive: Some(kind.format_directive().to_string()),
        intent: Some(kind.intent()),
    };
    send_turn(engine, &profile.id, &kind.seed_prompt(topic), opts).await;
}

/// One chat turn: spawn the engine call, relay stream deltas to stdout as
/// they arrive, then report suggestions or errors. The loop sends nothing
/// else until this returns, so turns never overlap.
async fn send_turn(engine: &Arc<ChatEngine>, owner_id: &str, text: &str, opts: SendOptions) {
    let (tx, mut rx) = mpsc::channel::<StreamEvent>(128);

    let task_engine = engine.clone();
    let task_owner = owner_id.to_string();
    let task_text = text.to_string();
    let handle =
        tokio::spawn(async move { task_engine.send_message(&task_owner, &task_text, opts, tx).await });

    let mut live = LiveReply::new();
    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::Delta(delta) => {
                live.apply_chunk(&delta);
                print!("{}", delta);
                let _ = std::io::stdout().flush();
            }
            StreamEvent::Done | StreamEvent::Error(_) => break,
        }
    }
    println!();

    match handle.await {
        Ok(Ok(message)) => {
            if message.is_error {
                // Partial streamed text was already printed; set it off from
                // the error notice.
                if !live.message().text.is_empty() {
                    println!();
                }
                println!("{}", message.text);
            }
            for suggestion in &message.suggestions {
                println!("  -> {}", suggestion.label);
            }
        }
        Ok(Err(e)) => println!("{}", e),
        Err(e) => error!("Chat task failed: {}", e),
    }
}
