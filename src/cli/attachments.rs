use chrono::Utc;

use crate::render::markdown::{CodeBlock, Document, ImageAction, ImageNode};
use crate::session::SessionSnapshot;

/// Markdown of the newest assistant message, the one `/copy`, `/image` and
/// `/save` refer to.
pub fn last_reply(snapshot: &SessionSnapshot) -> Option<Document> {
    snapshot
        .messages
        .iter()
        .rev()
        .find(|m| !m.is_user())
        .map(|m| Document::parse(&m.content))
}

/// 1-based lookup, matching the numbers printed next to code blocks.
pub fn code_block(doc: &Document, n: usize) -> Option<&CodeBlock> {
    n.checked_sub(1).and_then(|i| doc.code_blocks().get(i).copied())
}

pub fn image(doc: &Document, n: usize) -> Option<&ImageNode> {
    n.checked_sub(1).and_then(|i| doc.images().get(i).copied())
}

/// One line per available action; a failed image offers none.
pub fn describe_actions(node: &ImageNode) -> Vec<String> {
    node.actions(Utc::now())
        .into_iter()
        .map(|action| match action {
            ImageAction::Open { url } => format!("open      {}", url),
            ImageAction::Download { url, file_name } => {
                format!("download  {} -> {}", url, file_name)
            }
        })
        .collect()
}

/// Source URL and file name for `/save`, if the image can be downloaded.
pub fn download_target(node: &ImageNode) -> Option<(String, String)> {
    node.actions(Utc::now())
        .into_iter()
        .find_map(|action| match action {
            ImageAction::Download { url, file_name } => Some((url, file_name)),
            ImageAction::Open { .. } => None,
        })
}
