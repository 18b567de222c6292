use colored::Colorize;

use crate::api::models::{Conversation, Role};
use crate::render::markdown::{plain_text, Block, Document, ImageNode, ImageState, Inline};
use crate::render::Suggestion;

const RULE_WIDTH: usize = 40;

pub fn role_label(role: Role) -> String {
    match role {
        Role::User => "You".bold().to_string(),
        Role::Model => "Assistant".bright_magenta().bold().to_string(),
    }
}

pub fn render_document(doc: &Document) -> String {
    let mut code_index = 0;
    render_blocks(&doc.blocks, &mut code_index).join("\n\n")
}

fn render_blocks(blocks: &[Block], code_index: &mut usize) -> Vec<String> {
    blocks
        .iter()
        .map(|block| render_block(block, code_index))
        .collect()
}

fn render_block(block: &Block, code_index: &mut usize) -> String {
    match block {
        Block::Paragraph(inlines) => render_inlines(inlines),
        Block::Heading { level, content } => {
            let text = render_inlines(content);
            match level {
                1 => text.bold().underline().to_string(),
                2 => text.bold().to_string(),
                _ => text.italic().bold().to_string(),
            }
        }
        Block::List { start, items } => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let marker = match start {
                    Some(n) => format!("{}.", n + i as u64),
                    None => "•".to_string(),
                };
                let body = render_blocks(item, code_index).join("\n");
                indent_after_first(&format!("{} {}", marker, body), marker.chars().count() + 1)
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Block::Quote(inner) => render_blocks(inner, code_index)
            .join("\n\n")
            .lines()
            .map(|line| format!("{} {}", "│".dimmed(), line))
            .collect::<Vec<_>>()
            .join("\n"),
        Block::Rule => "─".repeat(RULE_WIDTH).dimmed().to_string(),
        Block::Code(code) => {
            *code_index += 1;
            let header = format!(
                "┌ {} · /copy {}",
                code.language.as_deref().unwrap_or("code"),
                code_index
            );
            let mut out = vec![header.dimmed().to_string()];
            for line in code.copy_text().lines() {
                out.push(format!("{} {}", "│".dimmed(), line.green()));
            }
            out.push("└".dimmed().to_string());
            out.join("\n")
        }
    }
}

fn render_inlines(inlines: &[Inline]) -> String {
    inlines.iter().map(render_inline).collect()
}

fn render_inline(inline: &Inline) -> String {
    match inline {
        Inline::Text(text) => text.clone(),
        Inline::Strong(inner) => render_inlines(inner).bold().to_string(),
        Inline::Emphasis(inner) => render_inlines(inner).italic().to_string(),
        Inline::Code(code) => code.yellow().to_string(),
        Inline::Link { url, content } => {
            let label = plain_text(content);
            if label == *url {
                url.cyan().underline().to_string()
            } else {
                format!("{} ({})", render_inlines(content), url.cyan().underline())
            }
        }
        Inline::Image(node) => render_image(node),
        Inline::Break => "\n".to_string(),
    }
}

fn render_image(node: &ImageNode) -> String {
    let state = match node.state() {
        ImageState::Loading => "loading",
        ImageState::Loaded => "loaded",
        ImageState::Errored => "failed to load",
    };
    format!(
        "[image: {}] {} ({})",
        node.alt,
        node.src.cyan().underline(),
        state.dimmed()
    )
}

fn indent_after_first(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 || line.is_empty() {
                line.to_string()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_welcome(suggestions: &[Suggestion]) -> String {
    let mut out = vec![format!("What can {} help with?", "Assistant".bright_magenta().bold())];
    for (i, suggestion) in suggestions.iter().enumerate() {
        out.push(format!(
            "  {} {} {}",
            format!("[{}]", i + 1).dimmed(),
            suggestion.title.bold(),
            suggestion.subtitle.dimmed()
        ));
    }
    out.push("Pick one with /suggest <n> or type a message.".dimmed().to_string());
    out.join("\n")
}

pub fn render_thinking() -> String {
    "Assistant is thinking…".dimmed().italic().to_string()
}

/// Numbered list of conversations, marking the active one.
pub fn render_conversation_list(items: &[Conversation], active: Option<&str>) -> String {
    if items.is_empty() {
        return "No conversations yet. Your history will appear here.".dimmed().to_string();
    }

    items
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let marker = if Some(c.id.as_str()) == active { "*" } else { " " };
            let updated = c
                .updated_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            format!(
                "{} {:>3}  {:<40}  {:<16}  {}",
                marker,
                i + 1,
                truncate(&c.title, 40),
                updated,
                c.id.dimmed()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
