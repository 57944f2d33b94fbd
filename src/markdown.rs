//! Markdown to styled terminal lines.
//!
//! Handles the subset the recommendation server emits: headings, emphasis,
//! lists, quotes, code spans, rules and GitHub tables. Tables pass through
//! [`recommendation::clean_table`] before they are drawn.

use crate::recommendation::{self, TextTable};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

pub fn render(markdown: &str, accent: Color) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut renderer = Renderer::new(accent);
    for event in Parser::new_ext(markdown, options) {
        renderer.push(event);
    }
    renderer.finish()
}

#[derive(Default)]
struct TableBuilder {
    table: TextTable,
    row: Vec<String>,
    cell: String,
    in_head: bool,
}

struct Renderer {
    accent: Color,
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    strong: usize,
    emphasis: usize,
    strike: usize,
    quote: usize,
    heading: Option<HeadingLevel>,
    lists: Vec<Option<u64>>,
    table: Option<TableBuilder>,
}

impl Renderer {
    fn new(accent: Color) -> Self {
        Renderer {
            accent,
            lines: Vec::new(),
            spans: Vec::new(),
            strong: 0,
            emphasis: 0,
            strike: 0,
            quote: 0,
            heading: None,
            lists: Vec::new(),
            table: None,
        }
    }

    fn style(&self) -> Style {
        let mut style = Style::default();
        if self.heading.is_some() {
            style = style.fg(self.accent).add_modifier(Modifier::BOLD);
        }
        if self.strong > 0 {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.emphasis > 0 {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.strike > 0 {
            style = style.add_modifier(Modifier::CROSSED_OUT);
        }
        style
    }

    fn text(&mut self, text: &str) {
        if let Some(table) = self.table.as_mut() {
            table.cell.push_str(text);
            return;
        }
        let style = self.style();
        self.spans.push(Span::styled(text.to_string(), style));
    }

    fn flush(&mut self) {
        if !self.spans.is_empty() {
            let mut spans = std::mem::take(&mut self.spans);
            if self.quote > 0 {
                spans.insert(
                    0,
                    Span::styled("│ ".repeat(self.quote), Style::default().fg(Color::DarkGray)),
                );
            }
            self.lines.push(Line::from(spans));
        }
    }

    fn blank(&mut self) {
        self.flush();
        if self.lines.last().is_some_and(|l| !l.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }

    fn push(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                if let Some(table) = self.table.as_mut() {
                    table.cell.push_str(&code);
                } else {
                    self.spans.push(Span::styled(
                        code.to_string(),
                        Style::default().fg(Color::Cyan),
                    ));
                }
            }
            Event::SoftBreak => self.text(" "),
            Event::HardBreak => self.flush(),
            Event::InlineHtml(html) | Event::Html(html) => {
                if html.trim_start().starts_with("<br") {
                    self.flush();
                }
            }
            Event::Rule => {
                self.blank();
                self.lines.push(Line::styled(
                    "─".repeat(24),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.blank();
                self.heading = Some(level);
            }
            Tag::Paragraph => {
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            Tag::BlockQuote(_) => {
                self.blank();
                self.quote += 1;
            }
            Tag::Strong => self.strong += 1,
            Tag::Emphasis => self.emphasis += 1,
            Tag::Strikethrough => self.strike += 1,
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.spans.push(Span::styled(
                    format!("{}{marker}", "  ".repeat(depth)),
                    Style::default().fg(self.accent),
                ));
            }
            Tag::Table(_) => {
                self.blank();
                self.table = Some(TableBuilder::default());
            }
            Tag::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.in_head = true;
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => {
                self.flush();
                self.heading = None;
            }
            TagEnd::Paragraph | TagEnd::Item => self.flush(),
            TagEnd::BlockQuote(_) => {
                self.flush();
                self.quote = self.quote.saturating_sub(1);
            }
            TagEnd::Strong => self.strong = self.strong.saturating_sub(1),
            TagEnd::Emphasis => self.emphasis = self.emphasis.saturating_sub(1),
            TagEnd::Strikethrough => self.strike = self.strike.saturating_sub(1),
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
            }
            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    let cell = std::mem::take(&mut table.cell).trim().to_string();
                    table.row.push(cell);
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.table.header = std::mem::take(&mut table.row);
                    table.in_head = false;
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    if !table.in_head {
                        let row = std::mem::take(&mut table.row);
                        table.table.rows.push(row);
                    }
                }
            }
            TagEnd::Table => {
                if let Some(builder) = self.table.take() {
                    let cleaned = recommendation::clean_table(builder.table);
                    self.lines.extend(table_lines(&cleaned, self.accent));
                }
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.first().is_some_and(|l| l.spans.is_empty()) {
            self.lines.remove(0);
        }
        self.lines
    }
}

fn table_lines(table: &TextTable, accent: Color) -> Vec<Line<'static>> {
    let columns = table
        .rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(table.header.len()))
        .max()
        .unwrap_or(0);
    if columns == 0 {
        return Vec::new();
    }

    let mut widths = vec![0usize; columns];
    for row in std::iter::once(&table.header).chain(table.rows.iter()) {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.width());
        }
    }

    let format_row = |row: &[String]| -> String {
        widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                format!("{cell}{}", " ".repeat(w.saturating_sub(cell.width())))
            })
            .collect::<Vec<_>>()
            .join(" │ ")
    };

    let mut lines = Vec::with_capacity(table.rows.len() + 2);
    if !table.header.is_empty() {
        lines.push(Line::styled(
            format_row(&table.header),
            Style::default().fg(accent).add_modifier(Modifier::BOLD),
        ));
        let rule = widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─");
        lines.push(Line::styled(rule, Style::default().fg(Color::DarkGray)));
    }
    for row in &table.rows {
        lines.push(Line::raw(format_row(row)));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_text(lines: &[Line<'_>]) -> String {
        lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn headings_and_lists_become_lines() {
        let lines = render("# 제목\n\n- 하나\n- 둘\n\n1. first\n2. second", Color::Blue);
        let text = plain_text(&lines);
        assert!(text.starts_with("제목"));
        assert!(text.contains("• 하나"));
        assert!(text.contains("• 둘"));
        assert!(text.contains("2. second"));
    }

    #[test]
    fn tables_are_cleaned_before_drawing() {
        let md = "| 분류 | 제목 | 추천 이유 |\n|---|---|---|\n| **영화** | 인사이드 아웃 | 공감 |\n| 음악 | 추천 이유: 잔잔함 | - |\n";
        let text = plain_text(&render(md, Color::Blue));
        assert!(!text.contains("추천 이유"));
        assert!(text.contains("🎬"));
        assert!(text.contains("인사이드 아웃"));
        assert!(!text.contains("잔잔함"));
    }

    #[test]
    fn text_without_tables_is_untouched() {
        let text = plain_text(&render("산책을 해 보세요. **햇빛**이 좋아요.", Color::Blue));
        assert_eq!(text, "산책을 해 보세요. 햇빛이 좋아요.");
    }

    #[test]
    fn quotes_get_a_gutter() {
        let text = plain_text(&render("> 오늘도 수고했어요", Color::Blue));
        assert_eq!(text, "│ 오늘도 수고했어요");
    }

    #[test]
    fn br_tags_break_lines() {
        let lines = render("첫째<br>둘째", Color::Blue);
        assert_eq!(lines.len(), 2);
    }
}
