//! Structural view of a markdown reply.
//!
//! The parser output is folded into a small tree of [`Block`]s and
//! [`Inline`]s. Presentation-specific behaviour (copying a code block, the
//! lifecycle of an image) lives on the nodes themselves so any front end can
//! drive it.

use chrono::{DateTime, Utc};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

const DEFAULT_IMAGE_ALT: &str = "Generated image";

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    Heading { level: u8, content: Vec<Inline> },
    List { start: Option<u64>, items: Vec<Vec<Block>> },
    Quote(Vec<Block>),
    Rule,
    Code(CodeBlock),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Code(String),
    Link { url: String, content: Vec<Inline> },
    Image(ImageNode),
    Break,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: Option<String>,
    pub code: String,
}

impl CodeBlock {
    /// What the copy action puts on the clipboard: the code without its
    /// trailing newline.
    pub fn copy_text(&self) -> &str {
        self.code.strip_suffix('\n').unwrap_or(&self.code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageState {
    Loading,
    Loaded,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageAction {
    Download { url: String, file_name: String },
    Open { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageNode {
    pub src: String,
    pub alt: String,
    state: ImageState,
}

impl ImageNode {
    pub fn new(src: impl Into<String>, alt: impl Into<String>) -> Self {
        let alt = alt.into();
        Self {
            src: src.into(),
            alt: if alt.trim().is_empty() {
                DEFAULT_IMAGE_ALT.to_string()
            } else {
                alt
            },
            state: ImageState::Loading,
        }
    }

    pub fn state(&self) -> ImageState {
        self.state
    }

    /// Loading -> Loaded. Ignored once the image has settled.
    pub fn mark_loaded(&mut self) {
        if self.state == ImageState::Loading {
            self.state = ImageState::Loaded;
        }
    }

    /// Loading -> Errored. Ignored once the image has settled.
    pub fn mark_failed(&mut self) {
        if self.state == ImageState::Loading {
            self.state = ImageState::Errored;
        }
    }

    pub fn actions(&self, now: DateTime<Utc>) -> Vec<ImageAction> {
        if self.state == ImageState::Errored {
            return Vec::new();
        }
        vec![
            ImageAction::Download {
                url: self.src.clone(),
                file_name: format!("generated-{}.png", now.timestamp_millis()),
            },
            ImageAction::Open {
                url: self.src.clone(),
            },
        ]
    }
}

impl Document {
    pub fn parse(text: &str) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        let mut builder = Builder::new();
        for event in Parser::new_ext(text, options) {
            builder.event(event);
        }
        builder.finish()
    }

    pub fn code_blocks(&self) -> Vec<&CodeBlock> {
        let mut out = Vec::new();
        collect_code(&self.blocks, &mut out);
        out
    }

    pub fn images(&self) -> Vec<&ImageNode> {
        let mut out = Vec::new();
        for block in &self.blocks {
            block_images(block, &mut out);
        }
        out
    }

    pub fn images_mut(&mut self) -> Vec<&mut ImageNode> {
        let mut out = Vec::new();
        for block in self.blocks.iter_mut() {
            block_images_mut(block, &mut out);
        }
        out
    }
}

fn collect_code<'a>(blocks: &'a [Block], out: &mut Vec<&'a CodeBlock>) {
    for block in blocks {
        match block {
            Block::Code(code) => out.push(code),
            Block::Quote(inner) => collect_code(inner, out),
            Block::List { items, .. } => items.iter().for_each(|item| collect_code(item, out)),
            _ => {}
        }
    }
}

fn block_images<'a>(block: &'a Block, out: &mut Vec<&'a ImageNode>) {
    match block {
        Block::Paragraph(content) | Block::Heading { content, .. } => inline_images(content, out),
        Block::Quote(inner) => inner.iter().for_each(|b| block_images(b, out)),
        Block::List { items, .. } => items.iter().flatten().for_each(|b| block_images(b, out)),
        Block::Rule | Block::Code(_) => {}
    }
}

fn inline_images<'a>(inlines: &'a [Inline], out: &mut Vec<&'a ImageNode>) {
    for inline in inlines {
        match inline {
            Inline::Image(node) => out.push(node),
            Inline::Strong(inner) | Inline::Emphasis(inner) => inline_images(inner, out),
            Inline::Link { content, .. } => inline_images(content, out),
            _ => {}
        }
    }
}

fn block_images_mut<'a>(block: &'a mut Block, out: &mut Vec<&'a mut ImageNode>) {
    match block {
        Block::Paragraph(content) | Block::Heading { content, .. } => inline_images_mut(content, out),
        Block::Quote(inner) => inner.iter_mut().for_each(|b| block_images_mut(b, out)),
        Block::List { items, .. } => items
            .iter_mut()
            .flatten()
            .for_each(|b| block_images_mut(b, out)),
        Block::Rule | Block::Code(_) => {}
    }
}

fn inline_images_mut<'a>(inlines: &'a mut [Inline], out: &mut Vec<&'a mut ImageNode>) {
    for inline in inlines.iter_mut() {
        match inline {
            Inline::Image(node) => out.push(node),
            Inline::Strong(inner) | Inline::Emphasis(inner) => inline_images_mut(inner, out),
            Inline::Link { content, .. } => inline_images_mut(content, out),
            _ => {}
        }
    }
}

/// Plain text of an inline run, used for image alt text.
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(t) | Inline::Code(t) => out.push_str(t),
            Inline::Strong(inner) | Inline::Emphasis(inner) => out.push_str(&plain_text(inner)),
            Inline::Link { content, .. } => out.push_str(&plain_text(content)),
            Inline::Image(node) => out.push_str(&node.alt),
            Inline::Break => out.push(' '),
        }
    }
    out
}

#[derive(Debug)]
enum FrameKind {
    Document,
    Quote,
    Item,
    List(Option<u64>),
    Paragraph,
    Heading(u8),
    Strong,
    Emphasis,
    Link(String),
    Image(String),
    Code(Option<String>),
    /// Anything not modelled; its children are handed to the parent.
    Other,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    blocks: Vec<Block>,
    inlines: Vec<Inline>,
    items: Vec<Vec<Block>>,
    text: String,
}

impl Frame {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            blocks: Vec::new(),
            inlines: Vec::new(),
            items: Vec::new(),
            text: String::new(),
        }
    }

    /// Inlines that appear directly in a container (tight list items) become
    /// an implicit paragraph.
    fn flush_inlines(&mut self) {
        if !self.inlines.is_empty() {
            let inlines = std::mem::take(&mut self.inlines);
            self.blocks.push(Block::Paragraph(inlines));
        }
    }

    fn into_blocks(mut self) -> Vec<Block> {
        self.flush_inlines();
        self.blocks
    }
}

struct Builder {
    stack: Vec<Frame>,
}

impl Builder {
    fn new() -> Self {
        Self {
            stack: vec![Frame::new(FrameKind::Document)],
        }
    }

    fn top(&mut self) -> &mut Frame {
        // The document frame is never popped
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn push_inline(&mut self, inline: Inline) {
        let top = self.top();
        if let (Inline::Text(new), Some(Inline::Text(prev))) = (&inline, top.inlines.last_mut()) {
            prev.push_str(new);
            return;
        }
        top.inlines.push(inline);
    }

    fn push_block(&mut self, block: Block) {
        let top = self.top();
        top.flush_inlines();
        top.blocks.push(block);
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => self.end(),
            Event::Text(text) => {
                if let FrameKind::Code(_) = self.top().kind {
                    self.top().text.push_str(&text);
                } else {
                    self.push_inline(Inline::Text(text.to_string()));
                }
            }
            Event::Code(code) => self.push_inline(Inline::Code(code.to_string())),
            Event::Html(html) | Event::InlineHtml(html) => {
                self.push_inline(Inline::Text(html.to_string()))
            }
            Event::SoftBreak => self.push_inline(Inline::Text(" ".to_string())),
            Event::HardBreak => self.push_inline(Inline::Break),
            Event::Rule => self.push_block(Block::Rule),
            Event::TaskListMarker(done) => {
                let marker = if done { "[x] " } else { "[ ] " };
                self.push_inline(Inline::Text(marker.to_string()));
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let kind = match tag {
            Tag::Paragraph => FrameKind::Paragraph,
            Tag::Heading { level, .. } => FrameKind::Heading(level as u8),
            Tag::BlockQuote { .. } => FrameKind::Quote,
            Tag::CodeBlock(CodeBlockKind::Fenced(lang)) => {
                let lang = lang.split_whitespace().next().unwrap_or("").to_string();
                FrameKind::Code(if lang.is_empty() { None } else { Some(lang) })
            }
            Tag::CodeBlock(CodeBlockKind::Indented) => FrameKind::Code(None),
            Tag::List(start) => FrameKind::List(start),
            Tag::Item => FrameKind::Item,
            Tag::Emphasis => FrameKind::Emphasis,
            Tag::Strong => FrameKind::Strong,
            Tag::Link { dest_url, .. } => FrameKind::Link(dest_url.to_string()),
            Tag::Image { dest_url, .. } => FrameKind::Image(dest_url.to_string()),
            _ => FrameKind::Other,
        };
        self.stack.push(Frame::new(kind));
    }

    fn end(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };

        match frame.kind {
            FrameKind::Paragraph => self.push_block(Block::Paragraph(frame.inlines)),
            FrameKind::Heading(level) => self.push_block(Block::Heading {
                level,
                content: frame.inlines,
            }),
            FrameKind::Strong => self.push_inline(Inline::Strong(frame.inlines)),
            FrameKind::Emphasis => self.push_inline(Inline::Emphasis(frame.inlines)),
            FrameKind::Link(url) => self.push_inline(Inline::Link {
                url,
                content: frame.inlines,
            }),
            FrameKind::Image(src) => {
                let alt = plain_text(&frame.inlines);
                self.push_inline(Inline::Image(ImageNode::new(src, alt)));
            }
            FrameKind::Code(language) => self.push_block(Block::Code(CodeBlock {
                language,
                code: frame.text,
            })),
            FrameKind::List(start) => self.push_block(Block::List {
                start,
                items: frame.items,
            }),
            FrameKind::Item => {
                let blocks = frame.into_blocks();
                self.top().items.push(blocks);
            }
            FrameKind::Quote => {
                let blocks = frame.into_blocks();
                self.push_block(Block::Quote(blocks));
            }
            FrameKind::Other | FrameKind::Document => {
                for inline in frame.inlines {
                    self.push_inline(inline);
                }
                for block in frame.blocks {
                    self.push_block(block);
                }
            }
        }
    }

    fn finish(mut self) -> Document {
        while self.stack.len() > 1 {
            self.end();
        }
        let blocks = self
            .stack
            .pop()
            .map(Frame::into_blocks)
            .unwrap_or_default();
        Document { blocks }
    }
}
