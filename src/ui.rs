use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use finguard::config::{MAX_TICK_SECS, MIN_TICK_SECS};
use finguard::{LiveLoop, Origin, TickOutcome, Ticker, Transaction, TransactionStatus};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

const SPEED_STEP_SECS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    LiveFeed,
    ExpenseSummary,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::LiveFeed => Page::ExpenseSummary,
            Page::ExpenseSummary => Page::LiveFeed,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::LiveFeed => "Live Feed",
            Page::ExpenseSummary => "Expense Summary",
        }
    }
}

pub struct App {
    pub live: LiveLoop,
    pub state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
    pub paused: bool,
    pub interval_secs: f64,
    pub currency: String,
    pub last_event: Option<String>,
}

impl App {
    pub fn new(live: LiveLoop, interval_secs: f64, currency: String) -> Self {
        Self {
            live,
            state: TableState::default(),
            current_page: Page::LiveFeed,
            show_detail: false,
            paused: false,
            interval_secs,
            currency,
            last_event: None,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }

    /// Run one tick and keep the selection inside the ledger
    pub fn step(&mut self) {
        match self.live.tick() {
            TickOutcome::Appended(_) => {}
            TickOutcome::Skipped(err) => {
                self.last_event = Some(format!("Tick skipped: {}", err));
            }
            TickOutcome::Halted => {}
        }
        self.clamp_selection();
    }

    pub fn inject_attack(&mut self) {
        self.last_event = Some(match self.live.inject_attack() {
            TickOutcome::Appended(_) => "High-risk transaction injected".to_string(),
            TickOutcome::Skipped(err) => format!("Injection rejected: {}", err),
            TickOutcome::Halted => "Lockdown active - injection ignored".to_string(),
        });
        self.state.select(Some(0));
    }

    pub fn toggle_force_anomaly(&mut self) {
        let force = !self.live.force_anomaly();
        self.live.set_force_anomaly(force);
        self.last_event = Some(if force {
            "Simulating high-risk transactions".to_string()
        } else {
            "Back to normal traffic".to_string()
        });
    }

    pub fn lockdown(&mut self) {
        self.live.halt();
        self.last_event = Some("LOCKDOWN - no further transactions will be processed".to_string());
    }

    pub fn faster(&mut self) {
        self.interval_secs = (self.interval_secs - SPEED_STEP_SECS).max(MIN_TICK_SECS);
    }

    pub fn slower(&mut self) {
        self.interval_secs = (self.interval_secs + SPEED_STEP_SECS).min(MAX_TICK_SECS);
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_transaction(&self) -> Option<&Transaction> {
        self.state.selected().and_then(|i| self.live.ledger().get(i))
    }

    fn clamp_selection(&mut self) {
        let len = self.live.ledger().len();
        match self.state.selected() {
            Some(i) if i >= len => self.state.select(len.checked_sub(1)),
            None if len > 0 => self.state.select(Some(0)),
            _ => {}
        }
    }

    pub fn next(&mut self) {
        let len = self.live.ledger().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.live.ledger().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    /// Returns true when the user asked to quit
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('f') => self.inject_attack(),
            KeyCode::Char('b') => self.toggle_force_anomaly(),
            KeyCode::Char('x') => self.lockdown(),
            KeyCode::Char('p') => self.paused = !self.paused,
            KeyCode::Char(' ') if self.paused => self.step(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.faster(),
            KeyCode::Char('-') => self.slower(),
            KeyCode::Enter => self.toggle_detail(),
            KeyCode::Tab => self.current_page = self.current_page.next(),
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::Home => self.state.select(Some(0)),
            _ => {}
        }
        false
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.context("dashboard loop failed")
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    let mut ticker = Ticker::new(app.interval());

    loop {
        terminal.draw(|f| ui(f, app))?;

        // Waiting for input doubles as the pause between ticks
        if event::poll(ticker.timeout())? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key(key) {
                    return Ok(());
                }
            }
        }

        ticker.set_interval(app.interval());
        if ticker.is_due() {
            if !app.paused {
                app.step();
            }
            ticker.reset();
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with metrics
            Constraint::Length(3), // Risk gauge
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_risk_gauge(f, chunks[1], app);

    match app.current_page {
        Page::LiveFeed if app.show_detail => {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Percentage(60), // Transaction list
                    Constraint::Percentage(40), // Explanation panel
                ])
                .split(chunks[2]);

            render_table(f, content_chunks[0], app);
            render_detail_panel(f, content_chunks[1], app);
        }
        Page::LiveFeed => render_table(f, chunks[2], app),
        Page::ExpenseSummary => render_expense_summary(f, chunks[2], app),
    }

    render_status_bar(f, chunks[3], app);
}

fn status_color(status: TransactionStatus) -> Color {
    match status {
        TransactionStatus::Approved => Color::Green,
        TransactionStatus::Review => Color::Yellow,
        TransactionStatus::Blocked => Color::Red,
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let agg = app.live.ledger().aggregate();

    let mut spans = vec![];
    for (i, page) in [Page::LiveFeed, Page::ExpenseSummary].iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }
        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(page.title().to_string(), style));
    }

    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Approved: {:.2} {}", agg.approved_volume, app.currency),
        Style::default().fg(Color::Green),
    ));
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Blocked: {}", agg.blocked_count),
        Style::default().fg(Color::Red),
    ));
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Review: {}", agg.review_count),
        Style::default().fg(Color::Yellow),
    ));
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Speed: {:.1}s", app.interval_secs),
        Style::default().fg(Color::White),
    ));

    if app.live.is_halted() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            " HALTED ",
            Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
        ));
    } else if app.paused {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(" PAUSED ", Style::default().fg(Color::Black).bg(Color::Yellow)));
    }

    let header = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" FinGuard - Real-Time Transaction Risk "),
    );

    f.render_widget(header, area);
}

fn render_risk_gauge(f: &mut Frame, area: Rect, app: &App) {
    let head = app.live.ledger().head();
    let (score, color, label) = match head {
        Some(tx) => (
            tx.risk_score(),
            status_color(tx.status()),
            format!("{} / 100  {}", tx.risk_score(), tx.status().verdict()),
        ),
        None => (0, Color::DarkGray, "Waiting for first transaction".to_string()),
    };

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Last Fraud Risk Score "),
        )
        .gauge_style(Style::default().fg(color))
        .percent(u16::from(score))
        .label(label);

    f.render_widget(gauge, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Time", "Amount", "Merchant", "Location", "Category", "Risk", "Status"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.live.ledger().iter().map(|tx| {
        let color = status_color(tx.status());
        let marker = match tx.origin() {
            Origin::Injected => "⚡",
            Origin::Simulated => "",
        };

        let cells = vec![
            Cell::from(tx.timestamp().format("%H:%M:%S").to_string()),
            Cell::from(format!("{:.2}", tx.amount())),
            Cell::from(format!("{}{}", marker, truncate(tx.merchant(), 20))),
            Cell::from(truncate(tx.location(), 18)),
            Cell::from(truncate(tx.category(), 14)),
            Cell::from(format!("{}", tx.risk_score())).style(Style::default().fg(color)),
            Cell::from(tx.status().label()).style(Style::default().fg(color).add_modifier(Modifier::BOLD)),
        ];

        Row::new(cells).height(1)
    });

    let title = format!(
        " Transactions ({}/{}) ",
        app.live.ledger().len(),
        app.live.ledger().capacity()
    );

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(22),
            Constraint::Length(19),
            Constraint::Length(15),
            Constraint::Length(6),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let tx = match app.selected_transaction() {
        Some(t) => t,
        None => {
            let no_selection = Paragraph::new("No transaction selected").block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow))
                    .title(" Risk Analysis "),
            );
            f.render_widget(no_selection, area);
            return;
        }
    };

    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let color = status_color(tx.status());

    let mut content = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Amount: ", label),
            Span::raw(format!("{:.2} {}", tx.amount(), app.currency)),
        ]),
        Line::from(vec![Span::styled("  Merchant: ", label), Span::raw(tx.merchant())]),
        Line::from(vec![Span::styled("  Location: ", label), Span::raw(tx.location())]),
        Line::from(vec![Span::styled("  Category: ", label), Span::raw(tx.category())]),
        Line::from(vec![
            Span::styled("  Time: ", label),
            Span::raw(tx.timestamp().format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Risk Score: ", label),
            Span::styled(format!("{}", tx.risk_score()), Style::default().fg(color)),
        ]),
        Line::from(vec![Span::styled(
            format!("  {}", tx.status().verdict()),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "  EXPLANATION",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )]),
        Line::from(""),
    ];

    for reason in tx.explanation() {
        content.push(Line::from(format!("  - {}", reason)));
    }

    if tx.origin() == Origin::Injected {
        content.push(Line::from(""));
        content.push(Line::from(Span::styled(
            "  Injected by operator",
            Style::default().fg(Color::Magenta).add_modifier(Modifier::ITALIC),
        )));
    }

    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "  Press Enter to close",
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )));

    let detail_panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Risk Analysis "),
    );

    f.render_widget(detail_panel, area);
}

fn render_expense_summary(f: &mut Frame, area: Rect, app: &App) {
    let totals = app.live.ledger().category_totals();
    // Bar labels must outlive the chart; values are whole currency units
    let data: Vec<(&str, u64)> = totals
        .iter()
        .map(|(category, total)| (category.as_str(), total.round() as u64))
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" Approved Spend by Category ({}) ", app.currency)),
        )
        .bar_width(14)
        .bar_gap(2)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan))
        .data(data.as_slice());

    f.render_widget(chart, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![Span::styled(
        format!(" {} ", app.live.state().name()),
        Style::default().fg(Color::Cyan),
    )];

    if app.live.force_anomaly() {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled("High-risk mode", Style::default().fg(Color::Red)));
    }

    if let Some(event) = &app.last_event {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(event.clone(), Style::default().fg(Color::Magenta)));
    }

    let keys = [
        ("f", " Inject"),
        ("b", " Bias"),
        ("x", " Lockdown"),
        ("p", " Pause"),
        ("+/-", " Speed"),
        ("Enter", " Details"),
        ("Tab", " Page"),
    ];
    for (key, action) in keys {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(action));
    }
    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finguard::SimulationConfig;
    use ratatui::backend::TestBackend;

    fn app() -> App {
        let live = LiveLoop::seeded(&SimulationConfig::default(), 21).unwrap();
        App::new(live, 1.0, "INR".to_string())
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_inject_key_puts_attack_on_top() {
        let mut app = app();
        app.step();
        press(&mut app, KeyCode::Char('f'));

        let selected = app.selected_transaction().unwrap();
        assert_eq!(selected.origin(), Origin::Injected);
        assert_eq!(selected.status(), TransactionStatus::Blocked);
    }

    #[test]
    fn test_lockdown_key_halts_loop() {
        let mut app = app();
        press(&mut app, KeyCode::Char('x'));
        app.step();

        assert!(app.live.is_halted());
        assert!(app.live.ledger().is_empty());
    }

    #[test]
    fn test_speed_is_bounded() {
        let mut app = app();
        for _ in 0..50 {
            press(&mut app, KeyCode::Char('+'));
        }
        assert!((app.interval_secs - MIN_TICK_SECS).abs() < 1e-9);

        for _ in 0..50 {
            press(&mut app, KeyCode::Char('-'));
        }
        assert!((app.interval_secs - MAX_TICK_SECS).abs() < 1e-9);
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app();
        assert!(!press(&mut app, KeyCode::Char('b')));
        assert!(app.live.force_anomaly());
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_renders_both_pages() {
        let mut app = app();
        for _ in 0..8 {
            app.step();
        }
        app.show_detail = true;
        let head_merchant = app.live.ledger().head().unwrap().merchant().to_string();

        let mut terminal = Terminal::new(TestBackend::new(160, 40)).unwrap();
        terminal.draw(|f| ui(f, &mut app)).unwrap();
        let text = screen(&terminal);

        assert!(text.contains("Live Feed"));
        assert!(text.contains("Transactions (8/50)"));
        assert!(text.contains(&head_merchant));
        assert!(text.contains("Risk Analysis"));
        assert!(text.contains("EXPLANATION"));
        assert!(text.contains("IDLE"));
        assert!(!text.contains("HALTED"));

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.current_page, Page::ExpenseSummary);
        terminal.draw(|f| ui(f, &mut app)).unwrap();
        let text = screen(&terminal);

        assert!(text.contains("Approved Spend by Category (INR)"));
        assert!(!text.contains("Transactions (8/50)"));
    }

    #[test]
    fn test_lockdown_shows_halted_banner() {
        let mut app = app();
        app.step();
        press(&mut app, KeyCode::Char('x'));

        let mut terminal = Terminal::new(TestBackend::new(160, 40)).unwrap();
        terminal.draw(|f| ui(f, &mut app)).unwrap();
        let text = screen(&terminal);

        assert!(text.contains(" HALTED "));
        assert!(text.contains("LOCKDOWN - no further transactions"));
        assert!(text.contains("Transactions (1/50)"));
    }
}
