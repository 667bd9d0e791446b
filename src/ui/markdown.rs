//! Markdown to styled terminal lines.
//!
//! Supports headings, emphasis, inline and fenced code, lists (including task
//! items), block quotes, links, rules, simple tables and `$...$` / `$$...$$` math.
//! Math is shown verbatim in its own style; the terminal cannot typeset it.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};

use super::styles;

const RULE_WIDTH: usize = 24;
const CODE_INDENT: &str = "  ";
const QUOTE_PREFIX: &str = "▎ ";

pub fn render_markdown(text: &str) -> Vec<Line<'static>> {
    let options = Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TABLES
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_MATH;

    let mut renderer = MarkdownRenderer::default();
    for event in Parser::new_ext(text, options) {
        renderer.handle(event);
    }
    renderer.finish()
}

#[derive(Default)]
struct MarkdownRenderer {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    inline_styles: Vec<Style>,
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    in_code_block: bool,
    link_targets: Vec<String>,
}

impl MarkdownRenderer {
    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.push_span(code.to_string(), styles::inline_code_style()),
            Event::InlineMath(math) => {
                self.push_span(format!("${math}$"), styles::math_style());
            }
            Event::DisplayMath(math) => {
                self.flush();
                for line in math.trim().lines() {
                    self.lines.push(Line::from(vec![
                        Span::raw(CODE_INDENT),
                        Span::styled(line.to_owned(), styles::math_style()),
                    ]));
                }
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                self.push_span(html.trim_end().to_owned(), styles::message_meta_style());
            }
            Event::SoftBreak => self.push_span(" ".to_owned(), self.style()),
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.lines.push(Line::from(Span::styled(
                    "─".repeat(RULE_WIDTH),
                    styles::message_meta_style(),
                )));
                self.blank_line();
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.push_span(marker.to_owned(), styles::message_meta_style());
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {}
            Tag::Heading { level, .. } => {
                self.flush();
                let hashes = "#".repeat(level as usize);
                self.inline_styles.push(styles::heading_style());
                self.push_span(format!("{hashes} "), styles::heading_style());
            }
            Tag::BlockQuote { .. } => {
                self.flush();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(kind) => {
                self.flush();
                let language = match kind {
                    CodeBlockKind::Fenced(language) => language.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                self.lines.push(Line::from(Span::styled(
                    format!("```{language}"),
                    styles::code_fence_style(),
                )));
                self.in_code_block = true;
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(number)) => {
                        let marker = format!("{number}. ");
                        *number += 1;
                        marker
                    }
                    _ => "• ".to_owned(),
                };
                self.current
                    .push(Span::raw(format!("{}{marker}", "  ".repeat(depth))));
            }
            Tag::Emphasis => self.push_modifier(Modifier::ITALIC),
            Tag::Strong => self.push_modifier(Modifier::BOLD),
            Tag::Strikethrough => self.push_modifier(Modifier::CROSSED_OUT),
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                self.inline_styles.push(styles::link_style());
                self.link_targets.push(dest_url.to_string());
            }
            Tag::Table(_) | Tag::TableHead | Tag::TableRow => self.flush(),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Heading(_) => {
                self.inline_styles.pop();
                self.flush();
                self.blank_line();
            }
            TagEnd::BlockQuote { .. } => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                if self.quote_depth == 0 {
                    self.blank_line();
                }
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.lines.push(Line::from(Span::styled(
                    "```".to_owned(),
                    styles::code_fence_style(),
                )));
                self.blank_line();
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Item => self.flush(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.inline_styles.pop();
            }
            TagEnd::Link | TagEnd::Image => {
                self.inline_styles.pop();
                let label = self.current.last().map(|span| span.content.to_string());
                if let Some(target) = self
                    .link_targets
                    .pop()
                    .filter(|target| !target.is_empty() && label.as_deref() != Some(target.as_str()))
                {
                    self.push_span(format!(" ({target})"), styles::message_meta_style());
                }
            }
            TagEnd::TableCell => {
                self.push_span(" │ ".to_owned(), styles::message_meta_style());
            }
            TagEnd::TableHead => {
                self.flush();
                self.lines.push(Line::from(Span::styled(
                    "─".repeat(RULE_WIDTH),
                    styles::message_meta_style(),
                )));
            }
            TagEnd::TableRow => self.flush(),
            TagEnd::Table => {
                self.flush();
                self.blank_line();
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_code_block {
            for line in text.trim_end_matches('\n').split('\n') {
                self.lines.push(Line::from(vec![
                    Span::raw(CODE_INDENT),
                    Span::styled(line.to_owned(), styles::code_block_style()),
                ]));
            }
            return;
        }

        self.push_span(text.to_owned(), self.style());
    }

    fn style(&self) -> Style {
        self.inline_styles
            .last()
            .copied()
            .unwrap_or_else(styles::message_text_style)
    }

    fn push_modifier(&mut self, modifier: Modifier) {
        let style = self.style().add_modifier(modifier);
        self.inline_styles.push(style);
    }

    fn push_span(&mut self, text: String, style: Style) {
        self.current.push(Span::styled(text, style));
    }

    fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }

        let mut spans = Vec::with_capacity(self.current.len() + 1);
        if self.quote_depth > 0 {
            spans.push(Span::styled(
                QUOTE_PREFIX.repeat(self.quote_depth),
                styles::quote_style(),
            ));
        }
        spans.append(&mut self.current);
        self.lines.push(Line::from(spans));
    }

    fn blank_line(&mut self) {
        if self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            return;
        }
        self.lines.push(Line::default());
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}
