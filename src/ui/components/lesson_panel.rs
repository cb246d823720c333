use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::app::ActiveLesson;
use crate::lesson::LessonSource;
use crate::player::PlayerState;
use crate::ui::theme::Theme;

fn format_time(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

pub struct LessonPanel<'a> {
    lesson: &'a ActiveLesson,
    theme: &'a Theme,
}

impl<'a> LessonPanel<'a> {
    pub fn new(lesson: &'a ActiveLesson, theme: &'a Theme) -> Self {
        Self { lesson, theme }
    }
}

impl Widget for &LessonPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let lesson = self.lesson;

        let block = Block::bordered()
            .title(" Lesson ")
            .border_style(Style::default().fg(colors.border_focused()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let state_text = match lesson.player_state {
            PlayerState::Loading => "loading",
            PlayerState::Playing => "playing",
            PlayerState::Paused => "paused",
            PlayerState::Ended => "ended",
        };
        let source_text = match lesson.payload.source {
            LessonSource::Curated => "curated",
            LessonSource::DynamicSearch => "search",
        };

        let mut lines = vec![
            Line::from(Span::styled(
                lesson.payload.video_data.title.clone(),
                Style::default()
                    .fg(colors.accent())
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!(
                    "{} | {} | {}",
                    format_time(lesson.position),
                    state_text,
                    source_text
                ),
                Style::default().fg(colors.dim()),
            )),
            Line::from(""),
        ];

        let total = lesson.payload.checkpoints.len();
        if total == 0 {
            lines.push(Line::from(Span::styled(
                "Generating a lesson plan for this video…",
                Style::default()
                    .fg(colors.dim())
                    .add_modifier(Modifier::ITALIC),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                format!("Checkpoints ({}/{})", lesson.completed.len(), total),
                Style::default().fg(colors.fg()).add_modifier(Modifier::BOLD),
            )));
            let mut ordered = lesson.payload.checkpoints.clone();
            ordered.sort_by_key(|cp| cp.time_seconds);
            for cp in &ordered {
                let done = lesson.completed.contains(&cp.id);
                let (marker, style) = if done {
                    ("✓", Style::default().fg(colors.success()))
                } else {
                    ("○", Style::default().fg(colors.fg()))
                };
                lines.push(Line::from(vec![
                    Span::styled(format!(" {marker} "), style),
                    Span::styled(
                        format!("{} ", format_time(cp.time_seconds)),
                        Style::default().fg(colors.dim()),
                    ),
                    Span::styled(
                        format!("[{}] {}", cp.kind.as_str(), cp.topic),
                        if done {
                            Style::default().fg(colors.dim())
                        } else {
                            Style::default().fg(colors.fg())
                        },
                    ),
                ]));
            }
        }

        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_times_as_minutes_seconds() {
        assert_eq!(format_time(0), "0:00");
        assert_eq!(format_time(61), "1:01");
        assert_eq!(format_time(900), "15:00");
    }
}
