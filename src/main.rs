mod app;
mod config;
mod curated;
mod event;
mod lesson;
mod player;
mod router;
mod services;
mod store;
mod ui;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use tracing_subscriber::EnvFilter;

use app::{App, GradingFocus};
use config::Config;
use event::{AppEvent, EventHandler};
use lesson::grading::GradingState;
use store::{JsonFileBackend, ProgressStore};
use ui::components::chat_panel::ChatPanel;
use ui::components::checkpoint_modal::CheckpointModal;
use ui::components::lesson_panel::LessonPanel;
use ui::layout::{AppLayout, pack_hint_lines};
use ui::line_input::InputResult;

#[derive(Parser)]
#[command(name = "mentor", version, about = "Terminal AI mentor with interactive video lessons")]
struct Cli {
    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(short, long, help = "Video player command (default: mpv)")]
    player: Option<String>,

    #[arg(short, long, help = "Data directory override")]
    data_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_default();
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }
    if let Some(player) = cli.player {
        config.player_command = player;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir.to_string_lossy().to_string();
    }

    let data_dir = PathBuf::from(&config.data_dir);
    init_logging(&data_dir)?;
    config.require_credentials()?;

    let progress = ProgressStore::new(Box::new(JsonFileBackend::with_base_dir(
        data_dir.join("progress"),
    )?));

    let events = EventHandler::new(Duration::from_millis(100));
    let mut app = App::new(config, progress, events.sender());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, &events);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

/// The terminal owns stdout, so logs go to a file under the data dir.
fn init_logging(data_dir: &Path) -> Result<()> {
    fs::create_dir_all(data_dir)?;
    let log_file = fs::File::create(data_dir.join("mentor.log"))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .init();
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, app))?;

        match events.next()? {
            AppEvent::Key(key) => handle_key(app, key),
            AppEvent::Tick => app.tick(),
            AppEvent::Resize(_, _) => {}
            AppEvent::Service(service_event) => app.on_service_event(service_event),
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => {
                app.should_quit = true;
                return;
            }
            KeyCode::Char('l') if app.active_lesson.is_some() => {
                app.close_lesson();
                return;
            }
            KeyCode::Char('p') if app.active_lesson.is_some() && app.grading.is_none() => {
                app.toggle_playback();
                return;
            }
            _ => {}
        }
    }

    // The checkpoint modal is strictly modal: while it is up, every key
    // belongs to it.
    if app.grading.is_some() {
        handle_grading_key(app, key);
        return;
    }

    match app.chat_input.handle(key) {
        InputResult::Submit => app.submit_chat(),
        InputResult::Cancel | InputResult::Continue => {}
    }
}

fn handle_grading_key(app: &mut App, key: KeyEvent) {
    let Some(state) = app.grading.as_ref().map(|m| m.session.state()) else {
        return;
    };

    match state {
        GradingState::Collecting => match key.code {
            KeyCode::Enter => app.submit_grading(),
            KeyCode::Esc => app.close_grading(),
            KeyCode::Tab | KeyCode::BackTab => {
                if let Some(modal) = app.grading.as_mut() {
                    if modal.has_link_field() {
                        modal.focus = match modal.focus {
                            GradingFocus::Answer => GradingFocus::Link,
                            GradingFocus::Link => GradingFocus::Answer,
                        };
                    }
                }
            }
            _ => {
                if let Some(modal) = app.grading.as_mut() {
                    let input = match modal.focus {
                        GradingFocus::Answer => &mut modal.answer,
                        GradingFocus::Link => &mut modal.link,
                    };
                    input.handle(key);
                }
            }
        },
        GradingState::Submitting => {}
        GradingState::Passed => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                app.close_grading();
            }
        }
        GradingState::Failed => match key.code {
            KeyCode::Enter => app.retry_grading(),
            KeyCode::Esc => app.close_grading(),
            _ => {}
        },
    }
}

fn render(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let bg = Block::default().style(Style::default().bg(colors.bg()));
    frame.render_widget(bg, area);

    let layout = AppLayout::new(area, app.active_lesson.is_some());

    render_header(frame, app, layout.header);

    let chat = ChatPanel::new(&app.chat_items, app.awaiting_reply, app.theme);
    frame.render_widget(&chat, layout.chat);

    render_input(frame, app, layout.input);

    if let (Some(sidebar_area), Some(lesson)) = (layout.sidebar, app.active_lesson.as_ref()) {
        let panel = LessonPanel::new(lesson, app.theme);
        frame.render_widget(&panel, sidebar_area);
    }

    render_footer(frame, app, layout.footer);

    if let Some(modal) = app.grading.as_ref() {
        let widget = CheckpointModal::new(modal, app.theme);
        frame.render_widget(&widget, area);
    }
}

fn render_header(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let colors = &app.theme.colors;

    let mut spans = vec![Span::styled(
        " mentor ",
        Style::default()
            .fg(colors.header_fg())
            .bg(colors.header_bg())
            .add_modifier(Modifier::BOLD),
    )];
    spans.push(Span::styled(
        format!(" {} ", app.config.model_name),
        Style::default().fg(colors.dim()).bg(colors.header_bg()),
    ));
    if let Some(lesson) = app.active_lesson.as_ref() {
        spans.push(Span::styled(
            format!(" ▶ {} ", lesson.payload.video_data.title),
            Style::default().fg(colors.accent()).bg(colors.header_bg()),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(colors.header_bg()));
    frame.render_widget(header, area);
}

fn render_input(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let colors = &app.theme.colors;
    let focused = app.grading.is_none();

    let block = Block::bordered()
        .title(" Message ")
        .border_style(Style::default().fg(if focused {
            colors.border_focused()
        } else {
            colors.border()
        }))
        .style(Style::default().bg(colors.bg()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let (before, at, after) = app.chat_input.render_parts();
    let mut spans = vec![Span::styled(before, Style::default().fg(colors.fg()))];
    if focused {
        match at {
            Some(ch) => {
                spans.push(Span::styled(
                    ch.to_string(),
                    Style::default().fg(colors.bg()).bg(colors.fg()),
                ));
                spans.push(Span::styled(after, Style::default().fg(colors.fg())));
            }
            None => spans.push(Span::styled(" ", Style::default().bg(colors.fg()))),
        }
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), inner);
}

fn render_footer(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let colors = &app.theme.colors;

    let mut hints: Vec<&str> = vec!["[Enter] Send", "[Ctrl+C] Quit"];
    if app.active_lesson.is_some() {
        hints.push("[Ctrl+P] Play/Pause");
        hints.push("[Ctrl+L] Close lesson");
    }

    let packed = pack_hint_lines(&hints, area.width as usize);
    if let Some(line) = packed.first() {
        let footer = Paragraph::new(Line::from(Span::styled(
            line.clone(),
            Style::default().fg(colors.dim()),
        )));
        frame.render_widget(footer, area);
    }
}
