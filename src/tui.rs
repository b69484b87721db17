use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::app::{LoadOutcome, LoadTicket, ProgressEvent, ProgressSink, Session};
use crate::domain::PokemonRecord;
use crate::error::PokedexError;
use crate::pokeapi::PokeApiClient;
use crate::store::CatalogStore;

const LOGS_MAX: usize = 200;
const LOGS_VISIBLE: usize = 6;
const PAGE_SIZE_STEP: usize = 5;
const STAT_BAR_WIDTH: usize = 20;
const STAT_BAR_MAX: u32 = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    List,
    Fetch,
    Done,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Phase::List => "List",
            Phase::Fetch => "Fetch",
            Phase::Done => "Done",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
}

#[derive(Debug, Default)]
struct LoadProgress {
    phase: Option<Phase>,
    status: String,
    done: usize,
    total: usize,
    logs: VecDeque<String>,
}

struct TuiProgress {
    state: Arc<Mutex<LoadProgress>>,
}

impl ProgressSink for TuiProgress {
    fn event(&self, event: ProgressEvent) {
        if let Ok(mut state) = self.state.lock() {
            let message = event.message.trim().to_string();
            if let Some((phase, payload)) = parse_phase(&message) {
                state.phase = Some(phase);
                if let Some((done, total)) = parse_counter(payload) {
                    state.done = done;
                    state.total = total;
                }
                state.status = payload.to_string();
            } else {
                state.status = message.clone();
            }
            let line = match event.elapsed {
                Some(elapsed) => {
                    format!("[{}] {message} ({:.1}s)", timestamp(), elapsed.as_secs_f64())
                }
                None => format!("[{}] {message}", timestamp()),
            };
            push_log(&mut state.logs, line);
        }
    }
}

type LoadResult = Result<Vec<PokemonRecord>, PokedexError>;

struct PendingLoad {
    ticket: LoadTicket,
    rx: Receiver<LoadResult>,
    started: Instant,
}

enum Screen {
    Loading(PendingLoad),
    Browsing,
    Failed { message: String, retryable: bool },
}

/// Interactive catalog browser. The catalog loads on a background thread;
/// leaving the browser before it finishes cancels the load.
pub struct Tui {
    progress: Arc<Mutex<LoadProgress>>,
    input_mode: InputMode,
    search: String,
    cursor: usize,
    notice: Option<String>,
}

impl Default for Tui {
    fn default() -> Self {
        Self::new()
    }
}

impl Tui {
    pub fn new() -> Self {
        Self {
            progress: Arc::new(Mutex::new(LoadProgress::default())),
            input_mode: InputMode::Normal,
            search: String::new(),
            cursor: 0,
            notice: None,
        }
    }

    pub fn run<C>(&mut self, session: &mut Session<C>) -> miette::Result<()>
    where
        C: PokeApiClient + Clone + 'static,
    {
        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let result = self.event_loop(&mut terminal, session);

        if session.cancel_load() {
            tracing::debug!("browser closed while loading");
        }
        disable_raw_mode().into_diagnostic()?;
        let mut stdout = io::stdout();
        stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
        result
    }

    fn event_loop<C>(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        session: &mut Session<C>,
    ) -> miette::Result<()>
    where
        C: PokeApiClient + Clone + 'static,
    {
        let mut screen = Screen::Loading(self.start_load(session));
        let mut tick = 0usize;
        loop {
            if let Screen::Loading(pending) = &screen {
                if let Some(next) = self.poll_load(session, pending) {
                    screen = next;
                }
            }

            terminal
                .draw(|frame| self.draw(frame, session.store(), &screen, tick))
                .into_diagnostic()?;

            if event::poll(Duration::from_millis(120)).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    if self.handle_key(key, session, &mut screen) {
                        break;
                    }
                }
            }

            tick = tick.wrapping_add(1);
        }
        Ok(())
    }

    fn start_load<C>(&mut self, session: &mut Session<C>) -> PendingLoad
    where
        C: PokeApiClient + Clone + 'static,
    {
        if let Ok(mut progress) = self.progress.lock() {
            progress.phase = None;
            progress.status = "starting".to_string();
            progress.done = 0;
            progress.total = 0;
        }

        let ticket = session.begin_load();
        let fetcher = session.fetcher().clone();
        let cancel = ticket.cancel_token().clone();
        let sink = TuiProgress {
            state: self.progress.clone(),
        };
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || tx.send(fetcher.fetch_catalog(&cancel, &sink)));

        PendingLoad {
            ticket,
            rx,
            started: Instant::now(),
        }
    }

    fn poll_load<C: PokeApiClient>(
        &mut self,
        session: &mut Session<C>,
        pending: &PendingLoad,
    ) -> Option<Screen> {
        match pending.rx.try_recv() {
            Ok(result) => Some(self.complete_load(session, &pending.ticket, result)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                tracing::warn!(
                    generation = pending.ticket.generation(),
                    "catalog.load_thread_lost"
                );
                session.cancel_load();
                Some(Screen::Failed {
                    message: "catalog load stopped without a result".to_string(),
                    retryable: true,
                })
            }
        }
    }

    fn complete_load<C: PokeApiClient>(
        &mut self,
        session: &mut Session<C>,
        ticket: &LoadTicket,
        result: LoadResult,
    ) -> Screen {
        match session.finish_load(ticket, result) {
            Ok(LoadOutcome::Applied(count)) => {
                self.cursor = 0;
                self.notice = Some(format!("loaded {count} pokemon"));
                Screen::Browsing
            }
            Ok(LoadOutcome::Discarded) => Screen::Browsing,
            Err(err) => Screen::Failed {
                retryable: err.is_retryable_load(),
                message: err.to_string(),
            },
        }
    }

    fn handle_key<C>(
        &mut self,
        key: KeyEvent,
        session: &mut Session<C>,
        screen: &mut Screen,
    ) -> bool
    where
        C: PokeApiClient + Clone + 'static,
    {
        if key.kind != KeyEventKind::Press {
            return false;
        }

        match screen {
            Screen::Loading(_) => matches!(key.code, KeyCode::Esc | KeyCode::Char('q')),
            Screen::Failed { retryable, .. } => {
                let retryable = *retryable;
                match key.code {
                    KeyCode::Char('r') if retryable => {
                        *screen = Screen::Loading(self.start_load(session));
                        false
                    }
                    KeyCode::Char('q') | KeyCode::Esc => true,
                    _ => false,
                }
            }
            Screen::Browsing => match self.input_mode {
                InputMode::Search => {
                    self.handle_search_key(key, session.store_mut());
                    false
                }
                InputMode::Normal => {
                    if key.code == KeyCode::Char('r') {
                        *screen = Screen::Loading(self.start_load(session));
                        return false;
                    }
                    self.handle_browse_key(key, session.store_mut())
                }
            },
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent, store: &mut CatalogStore) {
        match key.code {
            KeyCode::Char(ch) => {
                self.search.push(ch);
                store.set_search_text(&self.search);
                self.cursor = 0;
            }
            KeyCode::Backspace => {
                self.search.pop();
                store.set_search_text(&self.search);
                self.cursor = 0;
            }
            KeyCode::Enter | KeyCode::Esc => self.input_mode = InputMode::Normal,
            _ => {}
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent, store: &mut CatalogStore) -> bool {
        self.notice = None;
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('/') => {
                self.search = store.search_text().to_string();
                self.input_mode = InputMode::Search;
            }
            KeyCode::Char('n') | KeyCode::Right => {
                if store.next_page() {
                    self.cursor = 0;
                }
            }
            KeyCode::Char('p') | KeyCode::Left => {
                if store.previous_page() {
                    self.cursor = 0;
                }
            }
            KeyCode::Down => {
                let len = store.current_page_items().len();
                self.cursor = (self.cursor + 1).min(len.saturating_sub(1));
            }
            KeyCode::Up => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Enter => {
                let name = store
                    .current_page_items()
                    .get(self.cursor)
                    .map(|record| record.name.clone());
                if let Some(name) = name {
                    store.select(&name);
                }
            }
            KeyCode::Esc => store.close_detail(),
            KeyCode::Char('+') => {
                let items_per_page = store.items_per_page() + PAGE_SIZE_STEP;
                self.resize_page(store, items_per_page);
            }
            KeyCode::Char('-') => {
                let items_per_page = store.items_per_page().saturating_sub(PAGE_SIZE_STEP);
                self.resize_page(store, items_per_page);
            }
            _ => {}
        }
        false
    }

    fn resize_page(&mut self, store: &mut CatalogStore, items_per_page: usize) {
        match store.set_items_per_page(items_per_page) {
            Ok(()) => self.cursor = 0,
            Err(err) => self.notice = Some(err.to_string()),
        }
    }

    fn draw(&self, frame: &mut ratatui::Frame, store: &CatalogStore, screen: &Screen, tick: usize) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(3),
            ])
            .split(frame.area());

        frame.render_widget(draw_header(store, screen, tick), chunks[0]);

        match screen {
            Screen::Loading(pending) => {
                if let Ok(progress) = self.progress.lock() {
                    frame.render_widget(
                        draw_loading(&progress, pending.started.elapsed()),
                        chunks[1],
                    );
                }
            }
            Screen::Failed { message, retryable } => {
                frame.render_widget(draw_failure(message, *retryable), chunks[1]);
            }
            Screen::Browsing => self.draw_browser(frame, store, chunks[1]),
        }

        self.draw_footer(frame, screen, chunks[2]);
    }

    fn draw_browser(&self, frame: &mut ratatui::Frame, store: &CatalogStore, area: Rect) {
        let selected = store.selected().filter(|_| store.is_detail_visible());
        match selected {
            Some(record) => {
                let main = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
                    .split(area);
                frame.render_widget(draw_list(store, self.cursor), main[0]);
                frame.render_widget(draw_detail(record), main[1]);
            }
            None => frame.render_widget(draw_list(store, self.cursor), area),
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame, screen: &Screen, area: Rect) {
        let line = match (screen, self.input_mode) {
            (Screen::Loading(_), _) => hint_line("Esc cancel and quit"),
            (Screen::Failed { retryable: true, .. }, _) => hint_line("r retry   q quit"),
            (Screen::Failed { .. }, _) => hint_line("q quit"),
            (Screen::Browsing, InputMode::Search) => Line::from(vec![
                Span::styled(
                    "/ ",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(self.search.clone(), Style::default().fg(Color::White)),
            ]),
            (Screen::Browsing, InputMode::Normal) => match &self.notice {
                Some(notice) => Line::from(Span::styled(
                    notice.clone(),
                    Style::default().fg(Color::Yellow),
                )),
                None => hint_line(
                    "/ search   n/p page   +/- page size   Enter details   Esc close   r reload   q quit",
                ),
            },
        };
        frame.render_widget(
            Paragraph::new(line).block(Block::default().borders(Borders::TOP)),
            area,
        );

        if matches!(screen, Screen::Browsing) && self.input_mode == InputMode::Search {
            let offset = 2 + self.search.chars().count() as u16;
            let cursor_x = area
                .x
                .saturating_add(offset)
                .min(area.x.saturating_add(area.width.saturating_sub(1)));
            frame.set_cursor_position((cursor_x, area.y.saturating_add(1)));
        }
    }
}

fn draw_header(store: &CatalogStore, screen: &Screen, tick: usize) -> Paragraph<'static> {
    let hb = if tick % 2 == 0 { "*" } else { " " };
    let state_label = match screen {
        Screen::Loading(_) => Span::styled("loading", Style::default().fg(Color::Yellow)),
        Screen::Failed { .. } => Span::styled("failed", Style::default().fg(Color::Red)),
        Screen::Browsing => Span::styled("ready", Style::default().fg(Color::Green)),
    };
    let title_line = Line::from(vec![
        Span::styled(
            "POKEDEX",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(env!("CARGO_PKG_VERSION"), Style::default().fg(Color::Gray)),
        Span::raw("   "),
        state_label,
        Span::raw("   "),
        Span::styled(hb, Style::default().fg(Color::Green)),
    ]);
    let search = if store.search_text().is_empty() {
        "-".to_string()
    } else {
        format!("\"{}\"", store.search_text())
    };
    let page_line = Line::from(Span::styled(
        format!(
            "Page {}/{} · {} of {} pokemon · {} per page · search: {}",
            store.current_page(),
            store.total_pages(),
            store.filtered_len(),
            store.records().len(),
            store.items_per_page(),
            search
        ),
        Style::default().fg(Color::Gray),
    ));
    Paragraph::new(vec![title_line, page_line])
        .alignment(Alignment::Left)
        .block(Block::default().borders(Borders::BOTTOM))
}

fn draw_list(store: &CatalogStore, cursor: usize) -> Paragraph<'static> {
    let offset = (store.current_page() - 1) * store.items_per_page();
    let items = store.current_page_items();
    if items.is_empty() {
        let message = if store.records().is_empty() {
            "No pokemon loaded."
        } else {
            "No pokemon match the search."
        };
        return Paragraph::new(Line::from(Span::styled(
            message,
            Style::default().fg(Color::DarkGray),
        )))
        .block(Block::default().borders(Borders::RIGHT));
    }

    let lines = items
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let is_cursor = index == cursor;
            let marker = if is_cursor { "> " } else { "  " };
            let style = if is_cursor {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(marker, style),
                Span::styled(
                    format!("{:>3}. ", offset + index + 1),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(format!("{:<14}", record.name), style),
                Span::styled(record.types.join("/"), Style::default().fg(Color::Gray)),
            ])
        })
        .collect::<Vec<_>>();
    Paragraph::new(lines).block(Block::default().borders(Borders::RIGHT))
}

fn draw_detail(record: &PokemonRecord) -> Paragraph<'static> {
    let label = Style::default().fg(Color::Gray);
    let mut lines = vec![
        Line::from(Span::styled(
            record.name.to_uppercase(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("Types: ", label),
            Span::raw(record.types.join(", ")),
        ]),
        Line::from(vec![
            Span::styled("Abilities: ", label),
            Span::raw(
                record
                    .abilities
                    .iter()
                    .map(|ability| ability.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        ]),
        Line::from(vec![
            Span::styled("Sprite: ", label),
            Span::raw(record.sprite.clone().unwrap_or_else(|| "--".to_string())),
        ]),
        Line::from(""),
        Line::from(record.description.clone()),
        Line::from(""),
        Line::from(Span::styled("Base stats", label)),
    ];
    for stat in &record.stats {
        lines.push(Line::from(vec![
            Span::styled(format!("{:<16}", stat.name), label),
            Span::raw(format!("{:>3} ", stat.base_stat)),
            Span::styled(stat_bar(stat.base_stat), Style::default().fg(Color::Green)),
        ]));
    }
    Paragraph::new(lines)
        .block(Block::default().borders(Borders::NONE))
        .wrap(Wrap { trim: true })
}

fn draw_loading(progress: &LoadProgress, elapsed: Duration) -> Paragraph<'static> {
    let percent = if progress.total == 0 {
        0
    } else {
        (progress.done * 100 / progress.total) as u8
    };
    let phase = progress.phase.map(Phase::label).unwrap_or("Start");
    let mut lines = vec![
        Line::from(Span::styled(
            "LOADING CATALOG",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("Phase: ", Style::default().fg(Color::Gray)),
            Span::styled(format!("{phase:<6} "), Style::default().fg(Color::Yellow)),
            Span::raw(progress_bar(percent)),
            Span::raw(format!(" {percent:>3}%")),
        ]),
        Line::from(vec![
            Span::styled("Elapsed: ", Style::default().fg(Color::Gray)),
            Span::raw(format!("{:.1}s", elapsed.as_secs_f64())),
        ]),
        Line::from(vec![
            Span::styled("Status: ", Style::default().fg(Color::Gray)),
            Span::raw(progress.status.clone()),
        ]),
        Line::from(""),
    ];
    let skip = progress.logs.len().saturating_sub(LOGS_VISIBLE);
    for log in progress.logs.iter().skip(skip) {
        lines.push(Line::from(Span::styled(
            log.clone(),
            Style::default().fg(Color::DarkGray),
        )));
    }
    Paragraph::new(lines).wrap(Wrap { trim: true })
}

fn draw_failure(message: &str, retryable: bool) -> Paragraph<'static> {
    let mut lines = vec![
        Line::from(Span::styled(
            "CATALOG LOAD FAILED",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(message.to_string()),
    ];
    if retryable {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Press r to try again.",
            Style::default().fg(Color::Gray),
        )));
    }
    Paragraph::new(lines).wrap(Wrap { trim: true })
}

fn hint_line(text: &'static str) -> Line<'static> {
    Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)))
}

fn progress_bar(percent: u8) -> String {
    let total = 20;
    let filled = (percent.min(100) as usize * total) / 100;
    let mut out = String::from("[");
    for i in 0..total {
        out.push(if i < filled { '#' } else { '.' });
    }
    out.push(']');
    out
}

fn stat_bar(value: u32) -> String {
    let filled = (value.min(STAT_BAR_MAX) as usize * STAT_BAR_WIDTH) / STAT_BAR_MAX as usize;
    "|".repeat(filled.max(1))
}

fn parse_phase(message: &str) -> Option<(Phase, &str)> {
    if let Some(rest) = message.strip_prefix("phase=List;") {
        return Some((Phase::List, rest.trim()));
    }
    if let Some(rest) = message.strip_prefix("phase=Fetch;") {
        return Some((Phase::Fetch, rest.trim()));
    }
    if let Some(rest) = message.strip_prefix("phase=Done;") {
        return Some((Phase::Done, rest.trim()));
    }
    None
}

// "12/151 pikachu" -> (12, 151)
fn parse_counter(payload: &str) -> Option<(usize, usize)> {
    let counter = payload.split_whitespace().next()?;
    let (done, total) = counter.split_once('/')?;
    Some((done.parse().ok()?, total.parse().ok()?))
}

fn push_log(buffer: &mut VecDeque<String>, item: String) {
    buffer.push_back(item);
    while buffer.len() > LOGS_MAX {
        buffer.pop_front();
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
