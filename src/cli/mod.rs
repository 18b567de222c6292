pub mod attachments;
pub mod commands;
pub mod interrupt;
pub mod printer;

use std::io::{self, Stdout, Write};
use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::api::models::Conversation;
use crate::api::HttpGateway;
use crate::cli::attachments::{code_block, describe_actions, download_target, image, last_reply};
use crate::cli::commands::{Commands, ConversationAction};
use crate::cli::interrupt::Interrupts;
use crate::cli::printer::{render_checked, TranscriptPrinter};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::identity::{FileStore, IdentityManager};
use crate::render::images::ImageChecker;
use crate::render::terminal::render_conversation_list;
use crate::render::SUGGESTIONS;
use crate::session::{ChatController, RejectReason, SendOutcome};

const HELP: &str = "\
/new               start a new chat
/list [query]      list saved conversations
/open <n|id>       open a saved conversation
/delete <n|id>     delete a saved conversation
/rename <title>    rename the open conversation
/suggest <n>       send one of the suggestions
/copy <n>          print code block n of the last reply as plain text
/image <n>         show what can be done with image n of the last reply
/save <n>          download image n of the last reply
/clear             delete all conversations
/help              show this help
/exit              quit (Ctrl-D works too)";

pub async fn run_cli(command: Option<Commands>, config: AppConfig) -> Result<(), AppError> {
    let store = FileStore::new(config.identity_path());
    let user_id = IdentityManager::new(store, config.identity.key.clone()).resolve()?;
    info!("Using backend {} as {}", config.api.base_url, user_id);

    let gateway = Arc::new(HttpGateway::from_config(&config.api));
    let controller = ChatController::new(gateway, user_id);

    match command.unwrap_or(Commands::Chat { conversation: None }) {
        Commands::Whoami => println!("{}", controller.user_id()),
        Commands::Chat { conversation } => run_repl(controller, config, conversation).await?,
        Commands::Conversations { action } => run_conversation_action(&controller, action).await?,
    }
    Ok(())
}

async fn run_conversation_action(
    controller: &ChatController,
    action: ConversationAction,
) -> Result<(), AppError> {
    match action {
        ConversationAction::List { search } => {
            controller.refresh_conversations().await?;
            let items = controller
                .search_conversations(search.as_deref().unwrap_or(""))
                .await;
            println!("{}", render_conversation_list(&items, None));
        }
        ConversationAction::Show { id } => {
            controller.select_conversation(&id).await?;
            // Title comes from the list; the transcript is printed either way
            let _ = controller.refresh_conversations().await;
            if let Some(title) = controller.active_title().await {
                println!("{}", title.bold().underline());
            }
            let images = ImageChecker::default();
            for message in controller.snapshot().await.messages {
                println!("\n{}", render_checked(&message, &images).await);
            }
        }
        ConversationAction::Delete { id } => {
            controller.delete_conversation(&id).await?;
            println!("Deleted conversation {}", id);
        }
        ConversationAction::Rename { id, title } => {
            let title = title.trim();
            if title.is_empty() {
                return Err(AppError::InvalidInput("title must not be empty".to_string()));
            }
            controller.rename_conversation(&id, title).await?;
            println!("Renamed conversation {} to \"{}\"", id, title);
        }
        ConversationAction::Clear => {
            controller.clear_conversations().await?;
            println!("Deleted all conversations");
        }
    }
    controller.wait_background().await;
    Ok(())
}

enum Flow {
    Continue,
    Exit,
}

async fn run_repl(
    controller: ChatController,
    config: AppConfig,
    conversation: Option<String>,
) -> Result<(), AppError> {
    let _ = controller.refresh_conversations().await;
    if let Some(id) = conversation {
        let _ = controller.select_conversation(&id).await;
    }

    println!("--- Convo Terminal Chat ---");
    println!("Type /help for commands, /exit to quit.");
    println!("---------------------------");

    let interrupts = Interrupts::listen();
    let mut printer = TranscriptPrinter::new(
        io::stdout(),
        config.reveal.clone(),
        interrupts.clone(),
        ImageChecker::default(),
    );
    if let Some(title) = controller.active_title().await {
        println!("{}", title.bold().underline());
    }
    printer.render(&controller.snapshot().await).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n{} ", "You>".bold());
        io::stdout().flush()?;

        let line = tokio::select! {
            biased;
            _ = interrupts.quit_requested() => return quit(),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            println!();
            break;
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        if let Some(command) = text.strip_prefix('/') {
            match handle_command(&controller, &mut printer, command).await? {
                Flow::Continue => continue,
                Flow::Exit => break,
            }
        }

        send_and_render(&controller, &mut printer, text).await?;
        if interrupts.is_quitting() {
            return quit();
        }
    }

    controller.wait_background().await;
    Ok(())
}

/// Leaves on Ctrl-C. The blocking stdin reader cannot be cancelled, so the
/// process exits here instead of waiting for the runtime to wind down.
fn quit() -> Result<(), AppError> {
    println!();
    io::stdout().flush()?;
    std::process::exit(130)
}

async fn handle_command(
    controller: &ChatController,
    printer: &mut TranscriptPrinter<Stdout>,
    command: &str,
) -> Result<Flow, AppError> {
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name {
        "exit" | "quit" => return Ok(Flow::Exit),
        "help" => println!("{}", HELP),
        "new" => controller.new_chat().await,
        "list" => {
            let _ = controller.refresh_conversations().await;
            let items = controller.search_conversations(arg).await;
            let active = controller.snapshot().await.conversation_id;
            println!("{}", render_conversation_list(&items, active.as_deref()));
        }
        "open" => {
            let items = controller.conversations().await;
            match resolve_selector(&items, arg) {
                Some(id) => {
                    if controller.select_conversation(&id).await.is_ok() {
                        if let Some(title) = controller.active_title().await {
                            println!("\n{}", title.bold().underline());
                        }
                    }
                }
                None => println!("Usage: /open <n|id>"),
            }
        }
        "delete" => {
            let items = controller.conversations().await;
            match resolve_selector(&items, arg) {
                Some(id) => {
                    if controller.delete_conversation(&id).await.is_ok() {
                        println!("Deleted conversation {}", id);
                    }
                }
                None => println!("Usage: /delete <n|id>"),
            }
        }
        "rename" => {
            let active = controller.snapshot().await.conversation_id;
            match (active, arg.is_empty()) {
                (Some(id), false) => {
                    if controller.rename_conversation(&id, arg).await.is_ok() {
                        println!("Renamed to \"{}\"", arg);
                    }
                }
                (None, _) => println!("Open or start a conversation first."),
                (_, true) => println!("Usage: /rename <title>"),
            }
        }
        "suggest" => {
            let suggestion = arg
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| SUGGESTIONS.get(i));
            match suggestion {
                Some(suggestion) => {
                    let prompt = suggestion.prompt();
                    println!("{} {}", "You>".bold(), prompt);
                    send_and_render(controller, printer, &prompt).await?;
                    return Ok(Flow::Continue);
                }
                None => println!("Usage: /suggest <1-{}>", SUGGESTIONS.len()),
            }
        }
        "clear" => {
            if controller.clear_conversations().await.is_ok() {
                println!("Deleted all conversations");
            }
        }
        "copy" => {
            let doc = last_reply(&controller.snapshot().await);
            match (doc, arg.parse::<usize>()) {
                (Some(doc), Ok(n)) => match code_block(&doc, n) {
                    Some(block) => println!("{}", block.copy_text()),
                    None => println!("The last reply has no code block {}.", n),
                },
                (None, _) => println!("No reply to copy from yet."),
                (_, Err(_)) => println!("Usage: /copy <n>"),
            }
            return Ok(Flow::Continue);
        }
        "image" | "save" => {
            let Ok(n) = arg.parse::<usize>() else {
                println!("Usage: /{} <n>", name);
                return Ok(Flow::Continue);
            };
            let Some(mut doc) = last_reply(&controller.snapshot().await) else {
                println!("No reply with images yet.");
                return Ok(Flow::Continue);
            };
            printer.images().check_all(&mut doc).await;
            let Some(node) = image(&doc, n) else {
                println!("The last reply has no image {}.", n);
                return Ok(Flow::Continue);
            };

            if name == "image" {
                let actions = describe_actions(node);
                if actions.is_empty() {
                    println!("Image {} failed to load: {}", n, node.src);
                }
                for line in actions {
                    println!("{}", line);
                }
            } else {
                match download_target(node) {
                    Some((url, file_name)) => {
                        match printer.images().download(&url, Path::new(&file_name)).await {
                            Ok(()) => println!("Saved {}", file_name),
                            Err(e) => println!("Could not save image: {}", e),
                        }
                    }
                    None => println!("Image {} failed to load: {}", n, node.src),
                }
            }
            return Ok(Flow::Continue);
        }
        other => println!("Unknown command /{}. Type /help for commands.", other),
    }

    printer.render(&controller.snapshot().await).await?;
    Ok(Flow::Continue)
}

/// Sends in a background task and redraws on every state change until the
/// reply has settled.
async fn send_and_render(
    controller: &ChatController,
    printer: &mut TranscriptPrinter<Stdout>,
    text: &str,
) -> Result<(), AppError> {
    let interrupts = printer.interrupts().clone();
    let mut changes = controller.changes();
    let mut send = {
        let controller = controller.clone();
        let text = text.to_string();
        tokio::spawn(async move { controller.send(&text).await })
    };

    let outcome = loop {
        tokio::select! {
            biased;
            _ = interrupts.quit_requested() => return Ok(()),
            joined = &mut send => break joined.ok(),
            changed = changes.changed() => {
                if changed.is_err() {
                    break (&mut send).await.ok();
                }
                printer.render(&controller.snapshot().await).await?;
            }
        }
    };
    printer.render(&controller.snapshot().await).await?;

    match outcome {
        Some(SendOutcome::Rejected(RejectReason::Busy)) => {
            println!("Still waiting for the previous reply.")
        }
        Some(outcome) => info!("Send finished: {:?}", outcome),
        None => {}
    }
    Ok(())
}

/// `n` picks the n-th listed conversation; anything else is taken as an id.
fn resolve_selector(items: &[Conversation], selector: &str) -> Option<String> {
    let selector = selector.trim();
    if selector.is_empty() {
        return None;
    }
    if let Ok(n) = selector.parse::<usize>() {
        if let Some(conversation) = n.checked_sub(1).and_then(|i| items.get(i)) {
            return Some(conversation.id.clone());
        }
    }
    Some(selector.to_string())
}
