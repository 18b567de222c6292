use crate::api::models::Conversation;

/// Cached conversation summaries for the current user, in server order.
///
/// Every change bumps `revision`, so a fetch that started before a local
/// change can tell it has been overtaken.
#[derive(Debug, Default, Clone)]
pub struct ConversationList {
    items: Vec<Conversation>,
    revision: u64,
}

impl ConversationList {
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn replace(&mut self, items: Vec<Conversation>) {
        self.items = items;
        self.revision += 1;
    }

    /// Replaces the items only if nothing changed since `seen` was read.
    pub fn replace_if_unchanged(&mut self, items: Vec<Conversation>, seen: u64) -> bool {
        if self.revision != seen {
            return false;
        }
        self.replace(items);
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|c| c.id != id);
        self.revision += 1;
        self.items.len() != before
    }

    pub fn rename(&mut self, id: &str, title: &str) -> bool {
        self.revision += 1;
        match self.items.iter_mut().find(|c| c.id == id) {
            Some(conversation) => {
                conversation.title = title.to_string();
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.revision += 1;
    }

    pub fn find(&self, id: &str) -> Option<&Conversation> {
        self.items.iter().find(|c| c.id == id)
    }

    /// Case-insensitive title filter; an empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<&Conversation> {
        let needle = query.trim().to_lowercase();
        self.items
            .iter()
            .filter(|c| needle.is_empty() || c.title.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn active_title(&self, active_id: Option<&str>) -> Option<&str> {
        active_id
            .and_then(|id| self.find(id))
            .map(|c| c.title.as_str())
    }

    pub fn items(&self) -> &[Conversation] {
        &self.items
    }
}
