use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget, Wrap};

use crate::app::{GradingFocus, GradingModal};
use crate::lesson::grading::GradingState;
use crate::ui::layout::centered_rect;
use crate::ui::line_input::LineInput;
use crate::ui::theme::Theme;

pub struct CheckpointModal<'a> {
    modal: &'a GradingModal,
    theme: &'a Theme,
}

impl<'a> CheckpointModal<'a> {
    pub fn new(modal: &'a GradingModal, theme: &'a Theme) -> Self {
        Self { modal, theme }
    }

    fn input_line(&self, label: &str, input: &'a LineInput, focused: bool) -> Line<'a> {
        let colors = &self.theme.colors;
        let label_style = Style::default().fg(if focused {
            colors.accent()
        } else {
            colors.dim()
        });

        let mut spans = vec![Span::styled(format!("{label}: "), label_style)];
        let (before, at, after) = input.render_parts();
        spans.push(Span::styled(before, Style::default().fg(colors.fg())));
        if focused {
            match at {
                Some(ch) => {
                    spans.push(Span::styled(
                        ch.to_string(),
                        Style::default().fg(colors.bg()).bg(colors.fg()),
                    ));
                    spans.push(Span::styled(after, Style::default().fg(colors.fg())));
                }
                None => {
                    spans.push(Span::styled(
                        " ",
                        Style::default().bg(colors.fg()),
                    ));
                }
            }
        } else if let Some(ch) = at {
            spans.push(Span::styled(
                ch.to_string(),
                Style::default().fg(colors.fg()),
            ));
            spans.push(Span::styled(after, Style::default().fg(colors.fg())));
        }
        Line::from(spans)
    }
}

impl Widget for &CheckpointModal<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let modal = self.modal;
        let checkpoint = &modal.session.checkpoint;

        let popup = centered_rect(60, 60, area);
        Clear.render(popup, buf);

        let block = Block::bordered()
            .title(format!(" Checkpoint: {} ", checkpoint.topic))
            .border_style(Style::default().fg(colors.border_focused()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(popup);
        block.render(popup, buf);

        let mut lines = vec![
            Line::from(Span::styled(
                checkpoint.question.clone(),
                Style::default().fg(colors.fg()),
            )),
            Line::from(""),
        ];

        match modal.session.state() {
            GradingState::Collecting => {
                lines.push(self.input_line(
                    "Your answer",
                    &modal.answer,
                    modal.focus == GradingFocus::Answer,
                ));
                if modal.has_link_field() {
                    lines.push(self.input_line(
                        "Drive link",
                        &modal.link,
                        modal.focus == GradingFocus::Link,
                    ));
                }
                lines.push(Line::from(""));
                let hint = if modal.has_link_field() {
                    "[Enter] Submit  [Tab] Switch field  [Esc] Skip for now"
                } else {
                    "[Enter] Submit  [Esc] Skip for now"
                };
                lines.push(Line::from(Span::styled(
                    hint,
                    Style::default().fg(colors.dim()),
                )));
            }
            GradingState::Submitting => {
                lines.push(Line::from(Span::styled(
                    "Grading your answer…",
                    Style::default()
                        .fg(colors.warning())
                        .add_modifier(Modifier::ITALIC),
                )));
            }
            GradingState::Passed => {
                lines.push(Line::from(Span::styled(
                    format!("✓ {}", modal.session.feedback()),
                    Style::default()
                        .fg(colors.success())
                        .add_modifier(Modifier::BOLD),
                )));
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "[Enter] Continue the video",
                    Style::default().fg(colors.dim()),
                )));
            }
            GradingState::Failed => {
                lines.push(Line::from(Span::styled(
                    format!("✗ {}", modal.session.feedback()),
                    Style::default().fg(colors.error()),
                )));
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "[Enter] Try again  [Esc] Skip for now",
                    Style::default().fg(colors.dim()),
                )));
            }
        }

        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}
