pub mod images;
pub mod markdown;
pub mod reveal;
pub mod terminal;

use crate::api::models::{Message, Role};
use crate::session::SessionSnapshot;

pub use reveal::{play_reveal, Reveal, RevealState};

/// A canned prompt offered on the empty-session screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Suggestion {
    pub title: &'static str,
    pub subtitle: &'static str,
}

impl Suggestion {
    /// The text sent when the suggestion is picked.
    pub fn prompt(&self) -> String {
        format!("{} {}", self.title, self.subtitle)
    }
}

pub const SUGGESTIONS: [Suggestion; 4] = [
    Suggestion {
        title: "Explain quantum physics",
        subtitle: "in simple terms for a beginner",
    },
    Suggestion {
        title: "Help me plan",
        subtitle: "a 10 year old's birthday party",
    },
    Suggestion {
        title: "Create an image",
        subtitle: "of a futuristic city with flying cars",
    },
    Suggestion {
        title: "Write a blog post",
        subtitle: "about the future of AI technology",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// Show the whole content at once.
    Full,
    /// Replay the content through a [`Reveal`].
    Reveal,
}

#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    pub index: usize,
    pub message: &'a Message,
    pub presentation: Presentation,
}

#[derive(Debug)]
pub enum View<'a> {
    Welcome {
        suggestions: &'static [Suggestion],
    },
    Transcript {
        entries: Vec<Entry<'a>>,
        thinking: bool,
    },
}

/// Chooses what to draw for a snapshot.
///
/// Only the reply most recently appended by a send animates, and only while
/// it is still the last assistant message of the session.
pub fn view(snapshot: &SessionSnapshot) -> View<'_> {
    if snapshot.messages.is_empty() && !snapshot.loading {
        return View::Welcome {
            suggestions: &SUGGESTIONS,
        };
    }

    let last_model = snapshot
        .messages
        .iter()
        .rposition(|m| m.role == Role::Model);
    let animated = snapshot.fresh_reply.filter(|i| Some(*i) == last_model);

    let entries = snapshot
        .messages
        .iter()
        .enumerate()
        .map(|(index, message)| Entry {
            index,
            message,
            presentation: if Some(index) == animated {
                Presentation::Reveal
            } else {
                Presentation::Full
            },
        })
        .collect();

    View::Transcript {
        entries,
        thinking: snapshot.loading,
    }
}

/// Tracks whether the viewport should jump to the end of the transcript.
#[derive(Debug, Default)]
pub struct ScrollFollower {
    last: Option<(u64, usize, bool)>,
}

impl ScrollFollower {
    /// True when the message count, session or loading flag changed since the
    /// previous observation.
    pub fn observe(&mut self, snapshot: &SessionSnapshot) -> bool {
        let current = (snapshot.epoch, snapshot.messages.len(), snapshot.loading);
        let changed = self.last != Some(current);
        self.last = Some(current);
        changed
    }
}
