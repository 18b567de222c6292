use std::io::{self, Write};
use std::time::Duration;

use crate::api::models::{Message, Role};
use crate::cli::interrupt::Interrupts;
use crate::config::RevealConfig;
use crate::render::images::ImageChecker;
use crate::render::markdown::Document;
use crate::render::terminal::{render_document, render_thinking, render_welcome, role_label};
use crate::render::{play_reveal, view, Presentation, Reveal, ScrollFollower, View};
use crate::session::SessionSnapshot;

/// Label and body of one message. Assistant markdown has its images checked
/// first so their state is final when printed.
pub async fn render_checked(message: &Message, images: &ImageChecker) -> String {
    format!("{}\n{}", role_label(message.role), render_body(message, images).await)
}

async fn render_body(message: &Message, images: &ImageChecker) -> String {
    match message.role {
        Role::User => message.content.clone(),
        Role::Model => {
            let mut doc = Document::parse(&message.content);
            images.check_all(&mut doc).await;
            render_document(&doc)
        }
    }
}

/// Appends the session to `out` as it changes.
///
/// Messages the user typed at the prompt are not echoed again; a changed
/// session epoch redraws the whole transcript.
pub struct TranscriptPrinter<W: Write> {
    out: W,
    reveal: RevealConfig,
    interrupts: Interrupts,
    images: ImageChecker,
    follower: ScrollFollower,
    epoch: Option<u64>,
    printed: usize,
    thinking_shown: bool,
}

impl<W: Write> TranscriptPrinter<W> {
    pub fn new(out: W, reveal: RevealConfig, interrupts: Interrupts, images: ImageChecker) -> Self {
        Self {
            out,
            reveal,
            interrupts,
            images,
            follower: ScrollFollower::default(),
            epoch: None,
            printed: 0,
            thinking_shown: false,
        }
    }

    pub fn interrupts(&self) -> &Interrupts {
        &self.interrupts
    }

    pub fn images(&self) -> &ImageChecker {
        &self.images
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub async fn render(&mut self, snapshot: &SessionSnapshot) -> io::Result<()> {
        if !self.follower.observe(snapshot) {
            return Ok(());
        }

        let redraw = self.epoch != Some(snapshot.epoch);
        self.epoch = Some(snapshot.epoch);

        match view(snapshot) {
            View::Welcome { suggestions } => {
                if redraw {
                    writeln!(self.out, "\n{}", render_welcome(suggestions))?;
                }
                self.printed = 0;
                self.thinking_shown = false;
            }
            View::Transcript { entries, thinking } => {
                if redraw {
                    self.printed = 0;
                    self.thinking_shown = false;
                }

                for entry in entries.iter().skip(self.printed) {
                    if entry.message.is_user() && !redraw {
                        continue;
                    }
                    match entry.presentation {
                        Presentation::Full => {
                            let text = render_checked(entry.message, &self.images).await;
                            writeln!(self.out, "\n{}", text)?;
                        }
                        Presentation::Reveal => self.reveal_message(entry.message).await?,
                    }
                }
                self.printed = entries.len();

                if thinking && !self.thinking_shown {
                    writeln!(self.out, "\n{}", render_thinking())?;
                }
                self.thinking_shown = thinking;
            }
        }

        self.out.flush()
    }

    async fn reveal_message(&mut self, message: &Message) -> io::Result<()> {
        let body = render_body(message, &self.images).await;
        writeln!(self.out, "\n{}", role_label(message.role))?;

        if !self.reveal.enabled || self.reveal.tick_ms == 0 {
            return writeln!(self.out, "{}", body);
        }

        // Ctrl-C skips the animation and prints the rest at once
        let token = self.interrupts.begin_reveal();
        let mut reveal = Reveal::new(body);
        let out = &mut self.out;
        let completed = play_reveal(
            &mut reveal,
            Duration::from_millis(self.reveal.tick_ms),
            &token,
            |piece| {
                let _ = out.write_all(piece.as_bytes());
                let _ = out.flush();
            },
        )
        .await;
        self.interrupts.end_reveal();

        if !completed {
            write!(self.out, "{}", reveal.finish())?;
        }
        writeln!(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn printer(reveal: bool) -> TranscriptPrinter<Vec<u8>> {
        colored::control::set_override(false);
        TranscriptPrinter::new(
            Vec::new(),
            RevealConfig {
                enabled: reveal,
                tick_ms: 1,
            },
            Interrupts::default(),
            ImageChecker::default(),
        )
    }

    fn output(printer: &TranscriptPrinter<Vec<u8>>) -> String {
        String::from_utf8(printer.get_ref().clone()).unwrap()
    }

    fn snapshot(
        epoch: u64,
        messages: Vec<Message>,
        loading: bool,
        fresh_reply: Option<usize>,
    ) -> SessionSnapshot {
        SessionSnapshot {
            conversation_id: None,
            messages,
            loading,
            epoch,
            fresh_reply,
        }
    }

    #[tokio::test]
    async fn test_typed_message_is_not_echoed() {
        let mut printer = printer(false);

        printer.render(&snapshot(0, vec![], false, None)).await.unwrap();
        assert!(output(&printer).contains("What can Assistant help with?"));

        let asked = vec![Message::user("is it raining?")];
        printer.render(&snapshot(0, asked.clone(), true, None)).await.unwrap();

        let mut answered = asked;
        answered.push(Message::model("Not today."));
        printer.render(&snapshot(0, answered, false, Some(1))).await.unwrap();

        let out = output(&printer);
        assert!(!out.contains("is it raining?"));
        assert!(out.contains("Assistant\nNot today."));
    }

    #[tokio::test]
    async fn test_thinking_line_once_per_send() {
        let mut printer = printer(false);
        let first = vec![Message::user("a")];
        let answered = vec![Message::user("a"), Message::model("b")];
        let second = vec![Message::user("a"), Message::model("b"), Message::user("c")];

        printer.render(&snapshot(0, vec![], false, None)).await.unwrap();
        printer.render(&snapshot(0, first.clone(), true, None)).await.unwrap();
        printer.render(&snapshot(0, first, true, None)).await.unwrap();
        printer.render(&snapshot(0, answered, false, Some(1))).await.unwrap();
        printer.render(&snapshot(0, second, true, Some(1))).await.unwrap();

        assert_eq!(output(&printer).matches("Assistant is thinking").count(), 2);
    }

    #[tokio::test]
    async fn test_new_epoch_redraws_user_and_assistant_messages() {
        let mut printer = printer(false);
        printer
            .render(&snapshot(0, vec![Message::user("draft")], true, None))
            .await
            .unwrap();

        let opened = vec![Message::user("**as typed**"), Message::model("**bold**")];
        printer.render(&snapshot(1, opened, false, None)).await.unwrap();

        let out = output(&printer);
        assert!(out.contains("You\n**as typed**"));
        assert!(out.contains("Assistant\nbold"));
    }

    #[tokio::test]
    async fn test_reveal_prints_whole_reply_and_releases_interrupt() {
        let mut printer = printer(true);
        printer.render(&snapshot(0, vec![], false, None)).await.unwrap();

        let messages = vec![Message::user("hi"), Message::model("Hello there")];
        printer.render(&snapshot(0, messages, false, Some(1))).await.unwrap();

        assert!(output(&printer).contains("Assistant\nHello there\n"));

        // Nothing is revealing any more, so Ctrl-C means quit
        printer.interrupts().interrupt();
        assert!(printer.interrupts().is_quitting());
    }

    #[tokio::test]
    async fn test_render_checked_marks_failed_images() {
        colored::control::set_override(false);
        let message = Message::model("![plot](ftp://example.invalid/p.png)");

        let out = render_checked(&message, &ImageChecker::default()).await;

        assert!(out.ends_with("(failed to load)"));
    }
}
