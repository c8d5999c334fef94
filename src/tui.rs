use crate::clock::{Clock, Ticker};
use crate::loops::{LoopRegistry, Toggle};
use crate::models::TaskRecord;
use crate::store::RecordStore;
use crate::tracker::Tracker;
use crate::utils::{format_clock, format_min_sec, format_money};
use anyhow::Result;
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::rc::Rc;
use std::time::Duration as StdDuration;

#[derive(PartialEq)]
enum InputMode {
    Normal,
    EditTask,
    EditRate,
    AddLoop,
}

#[derive(PartialEq, Clone, Copy)]
enum Pane {
    Loops,
    History,
}

pub struct App {
    pub tracker: Tracker,
    pub registry: LoopRegistry,
    store: RecordStore,
    clock: Rc<dyn Clock>,
    history: Vec<TaskRecord>,
    show_minerals: bool,
    history_minimized: bool,
    streak: u32,
    deadline: Option<DateTime<Utc>>,
    input_mode: InputMode,
    input: String,
    pane: Pane,
    loop_cursor: usize,
    history_cursor: usize,
}

impl App {
    pub fn new(
        tracker: Tracker,
        registry: LoopRegistry,
        store: RecordStore,
        clock: Rc<dyn Clock>,
        streak: u32,
        deadline: Option<DateTime<Utc>>,
    ) -> Self {
        let history = store.task_history();
        let show_minerals = store.show_minerals();
        let history_minimized = store.history_minimized();
        Self {
            tracker,
            registry,
            store,
            clock,
            history,
            show_minerals,
            history_minimized,
            streak,
            deadline,
            input_mode: InputMode::Normal,
            input: String::new(),
            pane: Pane::Loops,
            loop_cursor: 0,
            history_cursor: 0,
        }
    }

    fn today(&self) -> chrono::NaiveDate {
        self.clock.now().with_timezone(&Local).date_naive()
    }
}

pub fn run_tui(app: &mut App) -> Result<()> {
    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_loop(&mut terminal, app);

    // restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    Ok(())
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    let mut ticker = Ticker::new(app.clock.clone(), Duration::seconds(1));
    loop {
        terminal.draw(|f| draw(f, app))?;

        if event::poll(StdDuration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if handle_key(app, key)? {
                    return Ok(());
                }
            }
        }

        for _ in 0..ticker.due() {
            app.tracker.tick()?;
            app.registry.tick()?;
        }

        if let Some(deadline) = app.deadline {
            if app.clock.now() >= deadline {
                return Ok(());
            }
        }
    }
}

/// Returns true when the session should end.
fn handle_key(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.input_mode {
        InputMode::Normal => match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('f') => {
                if let Some(record) = app.tracker.finish()? {
                    app.history.insert(0, record);
                }
            }
            KeyCode::Char('r') => app.tracker.reset()?,
            KeyCode::Char('p') => {
                if app.tracker.is_running() {
                    app.tracker.pause()?;
                } else {
                    // Resuming the main task takes the clock back from
                    // whichever loop holds it.
                    if let Some(id) = app.registry.active().map(|l| l.id) {
                        app.registry.toggle_play(id)?;
                    }
                    app.tracker.resume();
                }
            }
            KeyCode::Char('e') => {
                app.input = app.tracker.current_task.clone();
                app.input_mode = InputMode::EditTask;
            }
            KeyCode::Char('v') => {
                app.input = app.tracker.hourly_rate.to_string();
                app.input_mode = InputMode::EditRate;
            }
            KeyCode::Char('c') => {
                let next = app.tracker.current_category.cycle();
                app.tracker.set_category(next)?;
            }
            KeyCode::Char('a') => {
                app.input.clear();
                app.input_mode = InputMode::AddLoop;
            }
            KeyCode::Char('m') => {
                app.show_minerals = !app.show_minerals;
                app.store.set_show_minerals(app.show_minerals)?;
            }
            KeyCode::Char('o') => app.registry.toggle_minimized()?,
            KeyCode::Char('t') => {
                app.history_minimized = !app.history_minimized;
                app.store.set_history_minimized(app.history_minimized)?;
            }
            KeyCode::Tab => {
                app.pane = match app.pane {
                    Pane::Loops => Pane::History,
                    Pane::History => Pane::Loops,
                };
            }
            KeyCode::Char('j') | KeyCode::Down => match app.pane {
                Pane::Loops => {
                    if !app.registry.loops.is_empty() {
                        app.loop_cursor = (app.loop_cursor + 1) % app.registry.loops.len();
                    }
                }
                Pane::History => {
                    if !app.history.is_empty() {
                        app.history_cursor = (app.history_cursor + 1) % app.history.len();
                    }
                }
            },
            KeyCode::Char('k') | KeyCode::Up => match app.pane {
                Pane::Loops => {
                    let len = app.registry.loops.len();
                    if len > 0 {
                        app.loop_cursor = (app.loop_cursor + len - 1) % len;
                    }
                }
                Pane::History => {
                    let len = app.history.len();
                    if len > 0 {
                        app.history_cursor = (app.history_cursor + len - 1) % len;
                    }
                }
            },
            KeyCode::Char(' ') => {
                if app.pane == Pane::Loops {
                    let id = app.registry.loops.get(app.loop_cursor).map(|l| l.id);
                    if let Some(id) = id {
                        if app.registry.toggle_play(id)? == Some(Toggle::Activated) {
                            app.tracker.pause()?;
                        }
                    }
                }
            }
            KeyCode::Char('x') => {
                if app.pane == Pane::Loops {
                    let id = app.registry.loops.get(app.loop_cursor).map(|l| l.id);
                    if let Some(id) = id {
                        app.registry.complete(id)?;
                        let len = app.registry.loops.len();
                        app.loop_cursor = app.loop_cursor.min(len.saturating_sub(1));
                    }
                }
            }
            KeyCode::Char('d') => {
                if app.pane == Pane::History && app.history_cursor < app.history.len() {
                    app.history.remove(app.history_cursor);
                    app.store.save_task_history(&app.history)?;
                    let len = app.history.len();
                    app.history_cursor = app.history_cursor.min(len.saturating_sub(1));
                }
            }
            _ => {}
        },
        _ => match key.code {
            KeyCode::Enter => {
                let input = std::mem::take(&mut app.input);
                match app.input_mode {
                    InputMode::EditTask => app.tracker.set_task_name(&input)?,
                    InputMode::EditRate => {
                        // Unparseable input is dropped silently, and any
                        // number is accepted, zero and negative included.
                        if let Ok(rate) = input.trim().parse::<f64>() {
                            app.tracker.set_rate(rate)?;
                        }
                    }
                    InputMode::AddLoop => {
                        if app.registry.add(&input)? {
                            app.loop_cursor = 0;
                        }
                    }
                    InputMode::Normal => {}
                }
                app.input_mode = InputMode::Normal;
            }
            KeyCode::Esc => {
                app.input.clear();
                app.input_mode = InputMode::Normal;
            }
            KeyCode::Backspace => {
                app.input.pop();
            }
            KeyCode::Char(c) => app.input.push(c),
            _ => {}
        },
    }
    Ok(false)
}

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(7), // Main task
            Constraint::Min(8),    // Chart + lists
            Constraint::Length(3), // Footer
        ])
        .split(frame.size());

    draw_header(frame, chunks[0], app);
    draw_task(frame, chunks[1], app);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[2]);
    draw_chart(frame, body[0], app);

    let lists = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(body[1]);
    draw_loops(frame, lists[0], app);
    draw_history(frame, lists[1], app);

    draw_footer(frame, chunks[3], app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let status = if app.tracker.is_running() {
        Span::styled(
            "TRACKING",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
    } else if app.registry.active().is_some() {
        Span::styled(
            "OPEN LOOP",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("PAUSED", Style::default().fg(Color::Red))
    };

    let amount = format_money(app.tracker.amount_spent());
    let header_content = Line::from(vec![
        Span::styled(
            " Burnmeter ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        status,
        Span::raw(" | "),
        Span::styled(
            format!("Streak: {}d", app.streak),
            Style::default().fg(Color::Magenta),
        ),
        Span::raw(" | "),
        Span::raw(format!("${}/hr", app.tracker.hourly_rate)),
        Span::raw(" | "),
        Span::styled(
            format!("-${}", amount),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(
            app.clock
                .now()
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        ),
    ]);

    let header = Paragraph::new(header_content).block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn draw_task(frame: &mut Frame, area: Rect, app: &App) {
    let mut lines = Vec::new();

    let name_line = match app.input_mode {
        InputMode::EditTask => Line::from(vec![
            Span::raw("  Task: "),
            Span::styled(
                format!("{}_", app.input),
                Style::default().fg(Color::Cyan),
            ),
        ]),
        _ => {
            if app.tracker.current_task.is_empty() {
                Line::from(vec![
                    Span::raw("  Task: "),
                    Span::styled(
                        "press 'e' to name the one thing",
                        Style::default().fg(Color::DarkGray),
                    ),
                ])
            } else {
                Line::from(vec![
                    Span::raw("  Task: "),
                    Span::styled(
                        app.tracker.current_task.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  [{}]", app.tracker.current_category.as_str()),
                        Style::default().fg(Color::Blue),
                    ),
                ])
            }
        }
    };
    lines.push(name_line);

    lines.push(Line::from(vec![
        Span::raw("  "),
        Span::styled(
            format_clock(app.tracker.elapsed),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled(
            format!("${}", format_money(app.tracker.amount_spent())),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    ]));

    let rate_line = match app.input_mode {
        InputMode::EditRate => Line::from(vec![
            Span::raw("  Rate: $"),
            Span::styled(
                format!("{}_", app.input),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw("/hr"),
        ]),
        _ => Line::from(vec![Span::styled(
            format!(
                "  ${}/min   ${}/sec",
                format_money(app.tracker.per_minute()),
                format_money(app.tracker.per_second())
            ),
            Style::default().fg(Color::DarkGray),
        )]),
    };
    lines.push(rate_line);

    let block = Block::default()
        .title(Span::styled(
            " Work on the one thing ",
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_chart(frame: &mut Frame, area: Rect, app: &App) {
    let title = if app.show_minerals {
        " Last 7 Days (Rock: Blue, Pebble: Yellow, Sand: Magenta) "
    } else {
        " Tasks Finished - Last 7 Days "
    };
    let chart_block = Block::default().title(title).borders(Borders::ALL);
    let inner_area = chart_block.inner(area);
    frame.render_widget(chart_block, area);

    if inner_area.height < 2 || inner_area.width < 14 {
        return;
    }

    let minerals = crate::stats::mineral_counts(&app.history, app.today());
    let max_total = minerals.iter().map(|m| m.total()).max().unwrap_or(0).max(1) as u64;

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(14),
            Constraint::Percentage(14),
            Constraint::Percentage(14),
            Constraint::Percentage(14),
            Constraint::Percentage(14),
            Constraint::Percentage(14),
            Constraint::Percentage(14),
        ])
        .split(inner_area);

    for (i, m) in minerals.iter().enumerate() {
        let col_area = columns[i];

        let bar_label_split = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(col_area);

        let bar_area = bar_label_split[0];
        let label_area = bar_label_split[1];

        let bar_width = 5.min(bar_area.width);
        let bar_x_offset = (bar_area.width - bar_width) / 2;
        let centered_bar_area = Rect::new(
            bar_area.x + bar_x_offset,
            bar_area.y,
            bar_width,
            bar_area.height,
        );

        frame.render_widget(
            Paragraph::new(m.day.format("%a").to_string())
                .alignment(ratatui::layout::Alignment::Center),
            label_area,
        );

        if centered_bar_area.height == 0 {
            continue;
        }
        let total_height = centered_bar_area.height as u64;

        if app.show_minerals {
            let rock_height = (m.rock as u64 * total_height / max_total) as u16;
            let pebble_height = (m.pebble as u64 * total_height / max_total) as u16;
            let sand_height = (m.sand as u64 * total_height / max_total) as u16;
            let remaining = centered_bar_area
                .height
                .saturating_sub(rock_height + pebble_height + sand_height);

            let bar_chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(remaining),
                    Constraint::Length(sand_height),
                    Constraint::Length(pebble_height),
                    Constraint::Length(rock_height),
                ])
                .split(centered_bar_area);

            if sand_height > 0 {
                frame.render_widget(Block::default().bg(Color::Magenta), bar_chunks[1]);
            }
            if pebble_height > 0 {
                frame.render_widget(Block::default().bg(Color::Yellow), bar_chunks[2]);
            }
            if rock_height > 0 {
                frame.render_widget(Block::default().bg(Color::Blue), bar_chunks[3]);
            }
        } else {
            let bar_height = (m.total() as u64 * total_height / max_total) as u16;
            let remaining = centered_bar_area.height.saturating_sub(bar_height);

            let bar_chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(remaining), Constraint::Length(bar_height)])
                .split(centered_bar_area);

            if bar_height > 0 {
                frame.render_widget(Block::default().bg(Color::Blue), bar_chunks[1]);
            }
        }
    }
}

fn draw_loops(frame: &mut Frame, area: Rect, app: &App) {
    let focused = app.pane == Pane::Loops;
    let title = format!(" Open Loops ({}) ", app.registry.loops.len());
    let block = Block::default()
        .title(Span::styled(
            title,
            if focused {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            },
        ))
        .borders(Borders::ALL);

    let mut lines = Vec::new();

    if app.input_mode == InputMode::AddLoop {
        lines.push(Line::from(vec![
            Span::raw("  Add: "),
            Span::styled(format!("{}_", app.input), Style::default().fg(Color::Cyan)),
        ]));
    }

    if app.registry.minimized {
        lines.push(Line::from(Span::styled(
            "  minimized - press 'o' to expand",
            Style::default().fg(Color::DarkGray),
        )));
    } else if app.registry.loops.is_empty() {
        lines.push(Line::from(Span::styled(
            "  No open loops. Press 'a' to add one.",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        for (i, loop_) in app.registry.loops.iter().enumerate() {
            let marker = if loop_.is_active { "▶" } else { " " };
            let mut style = if loop_.is_active {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            if focused && i == app.loop_cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            lines.push(Line::from(Span::styled(
                format!(
                    " {} [ ] {}  {}  ${} spent",
                    marker,
                    loop_.title,
                    format_clock(loop_.time),
                    LoopRegistry::cost(loop_)
                ),
                style,
            )));
        }
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_history(frame: &mut Frame, area: Rect, app: &App) {
    let focused = app.pane == Pane::History;
    let title = format!(" Task History ({}) ", app.history.len());
    let block = Block::default()
        .title(Span::styled(
            title,
            if focused {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            },
        ))
        .borders(Borders::ALL);

    let mut lines = Vec::new();

    if app.history_minimized {
        lines.push(Line::from(Span::styled(
            "  minimized - press 't' to expand",
            Style::default().fg(Color::DarkGray),
        )));
    } else if app.history.is_empty() {
        lines.push(Line::from(Span::styled(
            "  No tasks finished yet.",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        let visible = (area.height.saturating_sub(2)) as usize;
        for (i, rec) in app.history.iter().enumerate().take(visible.max(1)) {
            let name = if rec.name.trim().is_empty() {
                "Untitled"
            } else {
                rec.name.as_str()
            };
            let when = Utc
                .timestamp_millis_opt(rec.timestamp)
                .single()
                .map(|t| t.with_timezone(&Local).format("%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            let duration = rec
                .duration
                .map(format_min_sec)
                .unwrap_or_else(|| "-".to_string());
            let mut style = Style::default();
            if focused && i == app.history_cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            lines.push(Line::from(Span::styled(
                format!(
                    "  ${:>8}  {:>8}  {}  [{}] {}",
                    rec.amount,
                    duration,
                    when,
                    rec.category.as_str(),
                    name
                ),
                style,
            )));
        }
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
    let help = match app.input_mode {
        InputMode::Normal => {
            "q quit | f finish | r reset | p pause | e task | v rate | c category | \
             a add loop | space play | x check | d delete | m minerals | o/t fold | tab focus"
        }
        _ => "Enter save | Esc cancel",
    };
    let footer = Paragraph::new(help)
        .block(Block::default().borders(Borders::ALL))
        .alignment(ratatui::layout::Alignment::Center);
    frame.render_widget(footer, area);
}
