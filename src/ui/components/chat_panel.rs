use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::app::ChatItem;
use crate::ui::layout::wrapped_line_count;
use crate::ui::theme::Theme;

pub struct ChatPanel<'a> {
    items: &'a [ChatItem],
    awaiting_reply: bool,
    theme: &'a Theme,
}

impl<'a> ChatPanel<'a> {
    pub fn new(items: &'a [ChatItem], awaiting_reply: bool, theme: &'a Theme) -> Self {
        Self {
            items,
            awaiting_reply,
            theme,
        }
    }

    fn transcript_lines(&self) -> Vec<Line<'a>> {
        let colors = &self.theme.colors;
        let mut lines = Vec::new();

        for item in self.items {
            match item {
                ChatItem::User(text) => {
                    lines.push(Line::from(vec![
                        Span::styled(
                            "You: ",
                            Style::default()
                                .fg(colors.user())
                                .add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(text.as_str(), Style::default().fg(colors.fg())),
                    ]));
                }
                ChatItem::Model(text) => {
                    lines.push(Line::from(vec![
                        Span::styled(
                            "Mentor: ",
                            Style::default()
                                .fg(colors.model())
                                .add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(text.as_str(), Style::default().fg(colors.fg())),
                    ]));
                }
                ChatItem::VideoCard(video_data) => {
                    lines.push(Line::from(Span::styled(
                        format!("┌ ▶ {}", video_data.title),
                        Style::default()
                            .fg(colors.accent())
                            .add_modifier(Modifier::BOLD),
                    )));
                    lines.push(Line::from(Span::styled(
                        format!("└ https://www.youtube.com/watch?v={}", video_data.video_id),
                        Style::default().fg(colors.dim()),
                    )));
                }
                ChatItem::Notice(text) => {
                    lines.push(Line::from(Span::styled(
                        format!("· {text}"),
                        Style::default()
                            .fg(colors.notice())
                            .add_modifier(Modifier::ITALIC),
                    )));
                }
            }
            lines.push(Line::from(""));
        }

        if self.awaiting_reply {
            lines.push(Line::from(Span::styled(
                "Mentor is typing…",
                Style::default()
                    .fg(colors.dim())
                    .add_modifier(Modifier::ITALIC),
            )));
        }

        lines
    }
}

impl Widget for &ChatPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .title(" Chat ")
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let lines = self.transcript_lines();

        // Keep the tail visible: scroll past everything that does not fit.
        let width = inner.width as usize;
        let total: usize = lines
            .iter()
            .map(|line| {
                let text: String = line.iter().map(|span| span.content.as_ref()).collect();
                wrapped_line_count(&text, width.max(1))
            })
            .sum();
        let scroll = total.saturating_sub(inner.height as usize) as u16;

        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0))
            .render(inner, buf);
    }
}
