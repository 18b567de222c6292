use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    Pending,
    Revealing,
    Revealed,
}

/// Character-by-character disclosure of text that is already fully known.
#[derive(Debug, Clone)]
pub struct Reveal {
    content: String,
    /// Byte offset of the end of the disclosed prefix; always a char boundary.
    cursor: usize,
    state: RevealState,
}

impl Reveal {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            cursor: 0,
            state: RevealState::Pending,
        }
    }

    pub fn state(&self) -> RevealState {
        self.state
    }

    pub fn visible(&self) -> &str {
        &self.content[..self.cursor]
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Discloses one more visible character and returns it as a slice, or
    /// `None` once everything is visible. Terminal escape sequences around
    /// the character travel with it and never cost a tick of their own.
    pub fn tick(&mut self) -> Option<&str> {
        if self.state == RevealState::Revealed {
            return None;
        }

        let start = self.cursor;
        let rest = &self.content[start..];
        let lead = escape_len(rest);
        match rest[lead..].chars().next() {
            Some(ch) => {
                self.cursor += lead + ch.len_utf8();
                self.cursor += escape_len(&self.content[self.cursor..]);
            }
            None => self.cursor = self.content.len(),
        }

        self.state = if self.cursor == self.content.len() {
            RevealState::Revealed
        } else {
            RevealState::Revealing
        };
        if self.cursor == start {
            None
        } else {
            Some(&self.content[start..self.cursor])
        }
    }

    /// Jumps straight to the full content.
    pub fn finish(&mut self) -> &str {
        let rest = &self.content[self.cursor..];
        self.cursor = self.content.len();
        self.state = RevealState::Revealed;
        rest
    }
}

/// Byte length of the ANSI escape sequences at the start of `text`. Always
/// ends on a char boundary.
fn escape_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut i = 0;
    while bytes.get(i) == Some(&0x1b) {
        match bytes.get(i + 1) {
            Some(b'[') => {
                let mut j = i + 2;
                while j < bytes.len() && !(0x40..=0x7e).contains(&bytes[j]) {
                    j += 1;
                }
                i = (j + 1).min(bytes.len());
            }
            Some(b) if b.is_ascii() => i += 2,
            _ => i += 1,
        }
    }
    i
}

/// Plays `reveal` at one character per `cadence`, handing each new piece to
/// `on_piece`. Stops early when `token` is cancelled and returns whether the
/// reveal completed.
pub async fn play_reveal<F>(
    reveal: &mut Reveal,
    cadence: Duration,
    token: &CancellationToken,
    mut on_piece: F,
) -> bool
where
    F: FnMut(&str),
{
    let mut interval = tokio::time::interval(cadence);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return false,
            _ = interval.tick() => {
                match reveal.tick() {
                    Some(piece) => on_piece(piece),
                    None => return true,
                }
                if reveal.state() == RevealState::Revealed {
                    return true;
                }
            }
        }
    }
}
