use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph, Sparkline};

use footlens::cache::DatasetCache;
use footlens::config::Settings;
use footlens::dashboard::{AgeDropPoint, DashboardSnapshot, Panel, TimelinePoint};
use footlens::export;
use footlens::phase::Phase;
use footlens::state::{AppState, FilterFocus, Screen};

struct App {
    state: AppState,
    cache: DatasetCache,
    should_quit: bool,
}

impl App {
    fn new(settings: &Settings) -> Self {
        Self {
            state: AppState::new(settings),
            cache: DatasetCache::new(),
            should_quit: false,
        }
    }

    fn load(&mut self) -> Result<()> {
        let path = self.state.data_path.clone();
        let dataset = self
            .cache
            .get_or_load(&path)
            .with_context(|| format!("load {}", path.display()))?;
        self.state.set_dataset(dataset);
        Ok(())
    }

    fn reload(&mut self) {
        let misses = self.cache.misses();
        match self.load() {
            Ok(()) if self.cache.misses() == misses => {
                self.state.push_log("[INFO] Source unchanged, reused cached dataset");
            }
            Ok(()) => {}
            Err(err) => self.state.push_log(format!("[WARN] Reload failed: {err:#}")),
        }
    }

    fn export(&mut self) {
        let Some(snapshot) = self.state.snapshot.as_ref() else {
            self.state.push_log("[INFO] Nothing to export yet");
            return;
        };
        let path = PathBuf::from(format!(
            "footlens_{}.xlsx",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ));
        match export::export_snapshot_xlsx(&path, snapshot) {
            Ok(report) => {
                self.state.push_log(format!(
                    "[INFO] Exported {} ({} impact rows, {} comeback rows)",
                    path.display(),
                    report.impact_rows,
                    report.comeback_rows
                ));
                self.state.last_export = Some(path);
            }
            Err(err) => self.state.push_log(format!("[WARN] Export failed: {err:#}")),
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('1') => self.state.screen = Screen::Overview,
            KeyCode::Char('2') => self.state.screen = Screen::Impact,
            KeyCode::Char('3') => self.state.screen = Screen::Comeback,
            KeyCode::Char('4') => self.state.screen = Screen::Timeline,
            KeyCode::Char('5') => self.state.screen = Screen::Heatmap,
            KeyCode::Char('6') => self.state.screen = Screen::Age,
            KeyCode::Char(']') | KeyCode::Down => self.state.cycle_screen_next(),
            KeyCode::Char('[') | KeyCode::Up => self.state.cycle_screen_prev(),
            KeyCode::Tab => self.state.cycle_focus(),
            KeyCode::Right | KeyCode::Char('l') => self.state.next_value(),
            KeyCode::Left | KeyCode::Char('h') => self.state.prev_value(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.state.adjust_window(true),
            KeyCode::Char('-') => self.state.adjust_window(false),
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('e') => self.export(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    // The terminal belongs to the dashboard; only warnings reach stderr by default.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let settings = Settings::load();
    let mut app = App::new(&settings);
    // Schema problems abort before the terminal is touched.
    app.load()?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.context("dashboard loop")
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(1),
            Constraint::Length(5),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_lines(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.snapshot.as_ref() {
        Some(snapshot) => match app.state.screen {
            Screen::Overview => render_overview(frame, chunks[1], snapshot),
            Screen::Impact => render_impact(frame, chunks[1], snapshot),
            Screen::Comeback => render_comeback(frame, chunks[1], snapshot),
            Screen::Timeline => render_timeline(frame, chunks[1], &app.state, snapshot),
            Screen::Heatmap => render_heatmap(frame, chunks[1], snapshot),
            Screen::Age => render_age(frame, chunks[1], snapshot),
        },
        None => {
            let empty = Paragraph::new("No dataset loaded").style(Style::default().fg(Color::DarkGray));
            frame.render_widget(empty, chunks[1]);
        }
    }

    let footer = Paragraph::new(format!("{}\n{}", console_text(&app.state), footer_text()))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[2]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_lines(state: &AppState) -> Vec<Line<'static>> {
    let mut tabs = vec![Span::styled(
        " FOOTLENS ",
        Style::default().fg(Color::Black).bg(Color::Cyan),
    )];
    for (idx, screen) in Screen::ALL.iter().enumerate() {
        let style = if *screen == state.screen {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        tabs.push(Span::raw("  "));
        tabs.push(Span::styled(format!("{} {}", idx + 1, screen.title()), style));
    }

    let mut filters = Vec::new();
    for focus in [FilterFocus::Club, FilterFocus::Season, FilterFocus::Player] {
        let style = if focus == state.focus {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default()
        };
        filters.push(Span::styled(
            format!(" {}: {} ", focus.label(), state.focused_value(focus)),
            style,
        ));
        filters.push(Span::raw(" "));
    }
    filters.push(Span::styled(
        format!("Window: {}d  Top: {}", state.params.window_days, state.params.top_k),
        Style::default().fg(Color::Cyan),
    ));

    let source = Line::from(Span::styled(
        format!(" {}", state.data_path.display()),
        Style::default().fg(Color::DarkGray),
    ));
    vec![Line::from(tabs), Line::from(filters), source]
}

fn footer_text() -> &'static str {
    "Tab Filter | ←/→ Value | 1-6 Screen | +/- Window | r Reload | e Export | ? Help | q Quit"
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_overview(frame: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(1)])
        .split(area);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 5); 5])
        .split(rows[0]);
    let k = &snapshot.kpis;
    let values = [
        ("Observations", k.observations.to_string()),
        ("Injuries", k.injury_count.to_string()),
        ("Matches", k.match_count.to_string()),
        ("Avg rating", fmt_opt(k.avg_rating, 2)),
        ("Avg goal diff", fmt_opt(k.avg_goal_diff, 2)),
    ];
    for (area, (title, value)) in cards.iter().zip(values) {
        let card = Paragraph::new(value)
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::BOLD))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(card, *area);
    }

    let mut lines = Vec::new();
    if let Some(top) = snapshot.impacts.ready().and_then(|r| r.first()) {
        lines.push(format!(
            "Largest drop: {} ({}) {:+.2} goal diff/match",
            top.player, top.team, top.performance_drop_index
        ));
    }
    if let Some(best) = snapshot.comebacks.ready().and_then(|r| r.first()) {
        lines.push(format!(
            "Best comeback: {} ({}) {:+.2} rating",
            best.player, best.team, best.rating_change
        ));
    }
    let notices = snapshot.notices();
    if !notices.is_empty() {
        lines.push(String::new());
        lines.extend(notices);
    }
    let summary = Paragraph::new(lines.join("\n"))
        .block(Block::default().title("Summary").borders(Borders::ALL));
    frame.render_widget(summary, rows[1]);
}

fn render_impact(frame: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
    let records = match &snapshot.impacts {
        Panel::Ready(records) => records,
        Panel::Unavailable(why) => return render_unavailable(frame, area, "Performance drop", why),
    };
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let mut lines = vec![format!(
        "{:<18} {:<12} {:<10} {:>7} {:>7} {:>7}",
        "Player", "Team", "Start", "Before", "During", "Drop"
    )];
    lines.extend(records.iter().map(|r| {
        format!(
            "{:<18} {:<12} {:<10} {:>7.2} {:>7.2} {:>+7.2}",
            truncate(&r.player, 18),
            truncate(&r.team, 12),
            r.injury_start,
            r.before_perf,
            r.during_perf,
            r.performance_drop_index
        )
    }));
    let table = Paragraph::new(lines.join("\n")).block(
        Block::default()
            .title(format!("Top {} drops", records.len()))
            .borders(Borders::ALL),
    );
    frame.render_widget(table, columns[0]);

    let bars: Vec<Bar> = records
        .iter()
        .map(|r| {
            let style = if r.performance_drop_index >= 0.0 {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::Green)
            };
            Bar::default()
                .label(truncate(&r.player, 12).into())
                .value((r.performance_drop_index.max(0.0) * 100.0).round() as u64)
                .text_value(format!("{:+.2}", r.performance_drop_index))
                .style(style)
        })
        .collect();
    let chart = BarChart::default()
        .block(Block::default().title("Drop index").borders(Borders::ALL))
        .data(BarGroup::default().bars(&bars))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0);
    frame.render_widget(chart, columns[1]);
}

fn render_comeback(frame: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
    let records = match &snapshot.comebacks {
        Panel::Ready(records) => records,
        Panel::Unavailable(why) => {
            return render_unavailable(frame, area, "Comeback leaderboard", why);
        }
    };
    let mut lines = vec![format!(
        "{:>3} {:<20} {:<14} {:>7} {:>7} {:>7}",
        "#", "Player", "Team", "Before", "After", "Change"
    )];
    lines.extend(records.iter().enumerate().map(|(idx, r)| {
        format!(
            "{:>3} {:<20} {:<14} {:>7.2} {:>7.2} {:>+7.2}",
            idx + 1,
            truncate(&r.player, 20),
            truncate(&r.team, 14),
            r.rating_before,
            r.rating_after,
            r.rating_change
        )
    }));
    let table = Paragraph::new(lines.join("\n"))
        .block(Block::default().title("Comeback leaderboard").borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn render_timeline(frame: &mut Frame, area: Rect, state: &AppState, snapshot: &DashboardSnapshot) {
    let points = match &snapshot.timeline {
        Panel::Ready(points) => points,
        Panel::Unavailable(why) => return render_unavailable(frame, area, "Player timeline", why),
    };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(1)])
        .split(area);

    let ratings = rating_series(points);
    let spark = Sparkline::default()
        .block(
            Block::default()
                .title(format!("{} rating", state.focused_value(FilterFocus::Player)))
                .borders(Borders::ALL),
        )
        .data(&ratings)
        .style(Style::default().fg(Color::Cyan));
    frame.render_widget(spark, rows[0]);

    let lines: Vec<Line> = points
        .iter()
        .map(|p| {
            Line::from(vec![
                Span::raw(format!(
                    "{}  rating {:>5}  diff {:>3}  ",
                    p.match_date,
                    fmt_opt(p.rating, 1),
                    p.goal_diff.map(|d| format!("{d:+}")).unwrap_or_else(|| "-".to_string())
                )),
                Span::styled(p.phase.label(), Style::default().fg(phase_color(p.phase))),
            ])
        })
        .collect();
    let list = Paragraph::new(lines).block(Block::default().title("Matches").borders(Borders::ALL));
    frame.render_widget(list, rows[1]);
}

/// Sparkline values in tenths of a rating point. Matches without a rating are left out.
fn rating_series(points: &[TimelinePoint]) -> Vec<u64> {
    points
        .iter()
        .filter_map(|p| p.rating)
        .map(|r| (r.max(0.0) * 10.0).round() as u64)
        .collect()
}

fn render_age(frame: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
    let points = match &snapshot.age_vs_drop {
        Panel::Ready(points) => points,
        Panel::Unavailable(why) => return render_unavailable(frame, area, "Age vs drop", why),
    };
    let mut lines = vec![Line::from(format!(
        "{:>5} {:<20} {:<14} {:>7}",
        "Age", "Player", "Team", "Drop"
    ))];
    lines.extend(by_age(points).into_iter().map(|p| {
        let color = if p.performance_drop_index > 0.0 { Color::Red } else { Color::Green };
        Line::from(vec![
            Span::raw(format!(
                "{:>5.0} {:<20} {:<14} ",
                p.age,
                truncate(&p.player, 20),
                truncate(&p.team, 14)
            )),
            Span::styled(
                format!("{:>+7.2}", p.performance_drop_index),
                Style::default().fg(color),
            ),
        ])
    }));
    let table = Paragraph::new(lines)
        .block(Block::default().title("Age vs performance drop").borders(Borders::ALL));
    frame.render_widget(table, area);
}

/// Youngest first; equal ages keep their ranking order.
fn by_age(points: &[AgeDropPoint]) -> Vec<&AgeDropPoint> {
    let mut sorted: Vec<&AgeDropPoint> = points.iter().collect();
    sorted.sort_by(|a, b| a.age.total_cmp(&b.age));
    sorted
}

fn render_heatmap(frame: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
    let cells = match &snapshot.heatmap {
        Panel::Ready(cells) => cells,
        Panel::Unavailable(why) => return render_unavailable(frame, area, "Injury heatmap", why),
    };
    let mut months: Vec<&str> = cells.iter().map(|c| c.month.as_str()).collect();
    months.sort_unstable();
    months.dedup();
    let mut clubs: Vec<&str> = cells.iter().map(|c| c.club.as_str()).collect();
    clubs.dedup();
    let max = cells.iter().map(|c| c.injury_count).max().unwrap_or(1).max(1);

    let mut header = vec![Span::raw(format!("{:<14}", ""))];
    header.extend(months.iter().map(|m| Span::raw(format!("{:>8}", m))));
    let mut lines = vec![Line::from(header)];
    for club in clubs {
        let mut spans = vec![Span::raw(format!("{:<14}", truncate(club, 14)))];
        for month in &months {
            let count = cells
                .iter()
                .find(|c| c.club == club && c.month == *month)
                .map(|c| c.injury_count)
                .unwrap_or(0);
            let text = if count == 0 { "·".to_string() } else { count.to_string() };
            spans.push(Span::styled(
                format!("{:>8}", text),
                Style::default().fg(heat_color(count, max)),
            ));
        }
        lines.push(Line::from(spans));
    }
    let grid = Paragraph::new(lines)
        .block(Block::default().title("Injuries by club and month").borders(Borders::ALL));
    frame.render_widget(grid, area);
}

fn render_unavailable(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    why: &footlens::error::InsufficientData,
) {
    let msg = Paragraph::new(why.to_string())
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().title(title.to_string()).borders(Borders::ALL));
    frame.render_widget(msg, area);
}

fn phase_color(phase: Phase) -> Color {
    match phase {
        Phase::BeforeInjury => Color::Green,
        Phase::DuringAbsence => Color::Red,
        Phase::AfterReturn => Color::Yellow,
        Phase::NoRecordedInjury => Color::DarkGray,
    }
}

fn heat_color(count: usize, max: usize) -> Color {
    if count == 0 {
        Color::DarkGray
    } else if count * 3 >= max * 2 {
        Color::Red
    } else if count * 3 >= max {
        Color::Yellow
    } else {
        Color::Green
    }
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{v:.decimals$}"))
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(raw: &str, max: usize) -> String {
    if raw.chars().count() <= max {
        return raw.to_string();
    }
    let mut out: String = raw.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "FootLens - Help",
        "",
        "Screens:",
        "  1-6 / [ ]    Overview, Impact, Comeback, Timeline, Heatmap, Age",
        "",
        "Filters:",
        "  Tab          Focus club / season / player",
        "  ←/→ or h/l   Change focused value",
        "",
        "Analysis:",
        "  + / -        Grow / shrink trailing window (7 days)",
        "  r            Reload source (cached while unchanged)",
        "  e            Export xlsx report",
        "",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("Arsenal", 10), "Arsenal");
        assert_eq!(truncate("Wolverhampton", 6), "Wolve…");
    }

    #[test]
    fn absent_ratings_are_not_plotted_as_zero() {
        let point = |day, rating| TimelinePoint {
            match_date: chrono::NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            rating,
            goal_diff: None,
            phase: Phase::NoRecordedInjury,
        };
        let points = [point(1, Some(6.5)), point(8, None), point(15, Some(7.04))];
        assert_eq!(rating_series(&points), vec![65, 70]);
        assert!(rating_series(&[point(1, None)]).is_empty());
    }

    #[test]
    fn age_rows_sort_youngest_first() {
        let point = |player: &str, age| AgeDropPoint {
            player: player.to_string(),
            team: "X".to_string(),
            age,
            performance_drop_index: 0.5,
        };
        let points = [point("A", 31.0), point("B", 22.0), point("C", 31.0)];
        let names: Vec<&str> = by_age(&points).iter().map(|p| p.player.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn heat_scale() {
        assert_eq!(heat_color(0, 3), Color::DarkGray);
        assert_eq!(heat_color(3, 3), Color::Red);
        assert_eq!(heat_color(1, 3), Color::Yellow);
        assert_eq!(heat_color(1, 4), Color::Green);
    }
}
