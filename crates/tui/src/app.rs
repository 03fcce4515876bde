use std::{
    io, thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{
        self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
        Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        MouseButton, MouseEvent, MouseEventKind, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use guandan_core::{
    gesture::{LongPress, Press},
    offline::ShellEvent,
    Action, AppConfig, Language, Scoreboard, ScoreboardState, Step, TeamId,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::{labels::Labels, level_font};

const MAX_NAME_CHARS: usize = 24;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    stage: Color,
    muted: Color,
    danger: Color,
    on_accent: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            stage: Color::Yellow,
            muted: Color::DarkGray,
            danger: Color::Red,
            on_accent: Color::Black,
        }
    }
}

/// Clickable region of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    KeepAwake,
    Sound,
    LargeDigits,
    Language,
    TeamName(TeamId),
    Level(TeamId, Step),
    Wins(TeamId, Step),
    NextRound,
    ToggleStage,
}

#[derive(Debug, Default)]
struct Hitboxes {
    entries: Vec<(Rect, Control)>,
}

impl Hitboxes {
    fn clear(&mut self) {
        self.entries.clear();
    }

    fn push(&mut self, area: Rect, control: Control) {
        self.entries.push((area, control));
    }

    fn at(&self, column: u16, row: u16) -> Option<Control> {
        self.entries
            .iter()
            .rev()
            .find(|(area, _)| {
                column >= area.x
                    && column < area.x.saturating_add(area.width)
                    && row >= area.y
                    && row < area.y.saturating_add(area.height)
            })
            .map(|(_, control)| *control)
    }
}

/// Team-name editor. The cursor counts characters, not bytes.
#[derive(Debug, Clone)]
struct RenameModal {
    team: TeamId,
    input: String,
    cursor: usize,
}

impl RenameModal {
    fn new(team: TeamId, current: &str) -> Self {
        Self {
            team,
            input: current.to_string(),
            cursor: current.chars().count(),
        }
    }

    fn len(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_offset(&self, cursor: usize) -> usize {
        self.input
            .char_indices()
            .nth(cursor)
            .map(|(offset, _)| offset)
            .unwrap_or(self.input.len())
    }

    fn move_cursor(&mut self, delta: isize) {
        let next = self.cursor as isize + delta;
        self.cursor = next.clamp(0, self.len() as isize) as usize;
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.len();
    }

    fn insert(&mut self, ch: char) {
        if self.len() >= MAX_NAME_CHARS || ch.is_control() {
            return;
        }
        let offset = self.byte_offset(self.cursor);
        self.input.insert(offset, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let offset = self.byte_offset(self.cursor);
        self.input.remove(offset);
    }

    fn delete(&mut self) {
        if self.cursor < self.len() {
            let offset = self.byte_offset(self.cursor);
            self.input.remove(offset);
        }
    }

    fn before_cursor(&self) -> &str {
        &self.input[..self.byte_offset(self.cursor)]
    }
}

enum AppEvent {
    Input(Event),
    Tick,
}

/// Terminal front end hosting the scoreboard controller.
pub struct ScoreboardApp {
    board: Scoreboard,
    state: UiState,
    theme: Theme,
    hitboxes: Hitboxes,
    next_round: LongPress,
    name_press: LongPress,
    name_target: Option<TeamId>,
    next_round_by_key: bool,
    key_release_events: bool,
    rename: Option<RenameModal>,
    hint_duration: Duration,
    tick: Duration,
    sync_rx: Option<mpsc::Receiver<ShellEvent>>,
}

impl ScoreboardApp {
    pub fn new(board: Scoreboard, config: &AppConfig) -> Self {
        Self {
            board,
            state: UiState::default(),
            theme: Theme::default(),
            hitboxes: Hitboxes::default(),
            next_round: LongPress::new(config.gestures.next_round_hold()),
            name_press: LongPress::new(config.gestures.rename_hold()),
            name_target: None,
            next_round_by_key: false,
            key_release_events: false,
            rename: None,
            hint_duration: config.hint_duration(),
            tick: config.tick(),
            sync_rx: None,
        }
    }

    pub fn attach_sync(&mut self, receiver: mpsc::Receiver<ShellEvent>) {
        self.sync_rx = Some(receiver);
    }

    pub async fn run(&mut self) -> Result<()> {
        self.state.set_status(self.labels().ready.to_string());

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(
            stdout,
            EnterAlternateScreen,
            EnableMouseCapture,
            EnableFocusChange
        )
        .context("failed to enter alternate screen")?;
        self.key_release_events = supports_keyboard_enhancement().unwrap_or(false);
        if self.key_release_events {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )
            .context("failed to enable key release events")?;
        }
        info!(
            key_release_events = self.key_release_events,
            "terminal initialised"
        );
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx, self.tick);

        let mut sync_rx = self.sync_rx.take();

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }

            if let Some(rx) = sync_rx.as_mut() {
                let mut sync_closed = false;
                tokio::select! {
                    maybe_event = event_rx.recv() => {
                        if !self.process_app_event(maybe_event) {
                            break;
                        }
                    }
                    maybe_sync = rx.recv() => {
                        match maybe_sync {
                            Some(event) => self.handle_shell_event(event),
                            None => sync_closed = true,
                        }
                    }
                }
                if sync_closed {
                    sync_rx = None;
                }
            } else {
                let maybe_event = event_rx.recv().await;
                if !self.process_app_event(maybe_event) {
                    break;
                }
            }
        }

        restore_terminal(&mut terminal, self.key_release_events)?;
        self.board.shutdown();
        Ok(())
    }

    fn labels(&self) -> &'static Labels {
        Labels::for_language(self.board.state().language)
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Err(err) = self.handle_input(event) {
                    self.state.set_status(format!("Error: {err}"));
                }
                true
            }
            Some(AppEvent::Tick) => {
                self.handle_tick(Instant::now());
                true
            }
            None => false,
        }
    }

    fn handle_tick(&mut self, now: Instant) {
        if self.next_round.poll(now) == Some(Press::Long) {
            self.dispatch(Action::ResetLevels);
        }
        if self.name_press.poll(now) == Some(Press::Long) {
            if let Some(team) = self.name_target.take() {
                self.dispatch(Action::ResetTeamName(team));
            }
        }
        if let Some((_, shown_at)) = &self.state.toast {
            if now.duration_since(*shown_at) >= self.hint_duration {
                self.state.toast = None;
            }
        }
    }

    fn handle_shell_event(&mut self, event: ShellEvent) {
        let stamp = Local::now().format("%H:%M:%S");
        match event {
            ShellEvent::Ready {
                cached,
                purged,
                source,
            } => {
                info!(cached, purged = purged.len(), ?source, "offline shell synced");
                self.state.set_status(format!(
                    "[{stamp}] Offline shell ready ({cached} cached, {} purged, root from {source:?})",
                    purged.len()
                ));
            }
            ShellEvent::Error(err) => {
                error!(?err, "offline shell sync failed");
                self.state
                    .set_status(format!("[{stamp}] Offline shell sync failed: {err}"));
            }
        }
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::FocusGained => self.board.on_visibility(true),
            Event::FocusLost => self.board.on_visibility(false),
            Event::Resize(_, _) | Event::Paste(_) => {}
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match key.kind {
            KeyEventKind::Repeat => return,
            KeyEventKind::Release => {
                if self.next_round_by_key && matches!(key.code, KeyCode::Char('n')) {
                    self.next_round_by_key = false;
                    self.finish_next_round(Instant::now());
                }
                return;
            }
            KeyEventKind::Press => {}
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.state.should_quit = true;
            return;
        }
        if self.rename.is_some() {
            self.handle_rename_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('Q') => self.state.should_quit = true,
            KeyCode::Char('n') if self.key_release_events => {
                self.next_round_by_key = true;
                self.next_round.begin(Instant::now());
            }
            KeyCode::Char('a') => self.open_rename(TeamId::A),
            KeyCode::Char('b') => self.open_rename(TeamId::B),
            _ => {
                if let Some(action) = key_action(&key) {
                    self.dispatch(action);
                }
            }
        }
    }

    fn handle_rename_key(&mut self, key: KeyEvent) {
        let mut finalize: Option<(TeamId, String)> = None;
        let mut cancel = false;
        if let Some(modal) = self.rename.as_mut() {
            match key.code {
                KeyCode::Esc => cancel = true,
                KeyCode::Enter => finalize = Some((modal.team, modal.input.clone())),
                KeyCode::Left => modal.move_cursor(-1),
                KeyCode::Right => modal.move_cursor(1),
                KeyCode::Home => modal.move_home(),
                KeyCode::End => modal.move_end(),
                KeyCode::Backspace => modal.backspace(),
                KeyCode::Delete => modal.delete(),
                KeyCode::Char(ch) => {
                    if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                        modal.insert(ch);
                    }
                }
                _ => {}
            }
        }

        if cancel {
            self.rename = None;
            return;
        }
        if let Some((team, name)) = finalize {
            self.rename = None;
            self.dispatch(Action::RenameTeam { team, name });
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let now = Instant::now();
        let target = self.hitboxes.at(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.rename.is_some() {
                    return;
                }
                match target {
                    Some(Control::NextRound) => self.next_round.begin(now),
                    Some(Control::TeamName(team)) => {
                        self.name_target = Some(team);
                        self.name_press.begin(now);
                    }
                    Some(control) => {
                        if let Some(action) = control_action(control) {
                            self.dispatch(action);
                        }
                    }
                    None => {}
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if !self.next_round_by_key {
                    self.finish_next_round(now);
                }
                self.finish_name_press(now);
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if self.next_round.is_pending()
                    && !self.next_round_by_key
                    && target != Some(Control::NextRound)
                {
                    self.next_round.cancel();
                }
                if let Some(team) = self.name_target {
                    if target != Some(Control::TeamName(team)) {
                        self.name_press.cancel();
                        self.name_target = None;
                    }
                }
            }
            _ => {}
        }
    }

    fn finish_next_round(&mut self, now: Instant) {
        match self.next_round.end(now) {
            Some(Press::Short) => self.dispatch(Action::NextRoundTap),
            Some(Press::Long) => self.dispatch(Action::ResetLevels),
            None => {}
        }
    }

    fn finish_name_press(&mut self, now: Instant) {
        let Some(team) = self.name_target.take() else {
            return;
        };
        match self.name_press.end(now) {
            Some(Press::Short) => self.open_rename(team),
            Some(Press::Long) => self.dispatch(Action::ResetTeamName(team)),
            None => {}
        }
    }

    fn open_rename(&mut self, team: TeamId) {
        let current = self.board.state().team(team).name.clone();
        self.rename = Some(RenameModal::new(team, &current));
    }

    fn dispatch(&mut self, action: Action) {
        let outcome = self.board.dispatch(action);
        if let Some(hint) = outcome.hint {
            let text = self.labels().hint(hint).to_string();
            self.state.toast = Some((text, Instant::now()));
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        self.hitboxes.clear();
        let area = frame.size();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
                Constraint::Length(4),
            ])
            .split(area);

        self.render_header(frame, rows[0]);
        let cards = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);
        self.render_team_card(frame, cards[0], TeamId::A);
        self.render_team_card(frame, cards[1], TeamId::B);
        self.render_footer(frame, rows[2]);
        self.render_status(frame, rows[3]);

        if let Some((text, _)) = &self.state.toast {
            self.render_toast(frame, rows[1], text);
        }
        if let Some(modal) = &self.rename {
            self.render_rename(frame, modal);
        }
    }

    fn render_header(&mut self, frame: &mut Frame, area: Rect) {
        let labels = self.labels();
        let state = self.board.state().clone();
        let chips = [
            (Control::KeepAwake, labels.keep_awake, state.keep_awake_enabled),
            (Control::Sound, labels.sound, state.sound_enabled),
            (Control::LargeDigits, labels.large_digits, state.large_digits_mode),
            (Control::Language, labels.language_switch, false),
        ];
        let widths: Vec<u16> = chips
            .iter()
            .map(|(_, text, _)| Span::raw(*text).width() as u16 + 4)
            .collect();
        let total: u16 = widths.iter().sum();

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(10), Constraint::Length(total)])
            .split(area);

        let brand = Paragraph::new(vec![
            Line::from(vec![
                Span::styled(
                    " 掼 ",
                    Style::default()
                        .fg(self.theme.on_accent)
                        .bg(self.theme.danger)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(" "),
                Span::styled(labels.title, Style::default().add_modifier(Modifier::BOLD)),
            ]),
            Line::from(Span::styled(
                labels.subtitle,
                Style::default().fg(self.theme.muted),
            )),
        ]);
        frame.render_widget(brand, columns[0]);

        let chip_areas = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(widths.iter().map(|width| Constraint::Length(*width)))
            .split(columns[1]);
        for ((control, text, active), chip_area) in chips.into_iter().zip(chip_areas.iter()) {
            let style = if active {
                Style::default().fg(self.theme.on_accent).bg(self.theme.accent)
            } else {
                Style::default().fg(self.theme.primary_fg)
            };
            let chip = Paragraph::new(Line::from(Span::styled(text, style)))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(chip, *chip_area);
            self.hitboxes.push(*chip_area, control);
        }
    }

    fn render_team_card(&mut self, frame: &mut Frame, area: Rect, team_id: TeamId) {
        let labels = self.labels();
        let state = self.board.state().clone();
        let team = state.team(team_id);
        let on_stage = state.effective_stage() == Some(team_id);
        let border = if on_stage {
            Style::default().fg(self.theme.stage)
        } else {
            Style::default().fg(self.theme.muted)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(Span::styled(
                format!(" {} ", team.display_name(labels.default_team_name(team_id))),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(inner);

        let name = Paragraph::new(Line::from(vec![
            Span::styled(
                team.display_name(labels.default_team_name(team_id)).to_string(),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::UNDERLINED),
            ),
            Span::styled(
                format!("  {}", labels.edit_hint),
                Style::default().fg(self.theme.muted),
            ),
        ]));
        frame.render_widget(name, rows[0]);
        self.hitboxes.push(rows[0], Control::TeamName(team_id));

        let badge = if on_stage {
            Span::styled(
                format!(" {} ", labels.stage),
                Style::default()
                    .fg(self.theme.on_accent)
                    .bg(self.theme.stage)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled(labels.no_stage, Style::default().fg(self.theme.muted))
        };
        frame.render_widget(Paragraph::new(Line::from(badge)), rows[1]);

        self.render_level(frame, rows[2], &state, team_id);

        let level_row = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(10),
                Constraint::Length(7),
                Constraint::Length(7),
                Constraint::Min(0),
            ])
            .split(rows[3]);
        frame.render_widget(
            Paragraph::new(Span::styled(labels.level, Style::default().fg(self.theme.muted))),
            level_row[0],
        );
        self.render_button(frame, level_row[1], "[ ▼ ]", Control::Level(team_id, Step::Down));
        self.render_button(frame, level_row[2], "[ ▲ ]", Control::Level(team_id, Step::Up));

        let wins_row = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(10),
                Constraint::Length(5),
                Constraint::Length(5),
                Constraint::Length(5),
                Constraint::Min(0),
            ])
            .split(rows[4]);
        frame.render_widget(
            Paragraph::new(Span::styled(labels.wins, Style::default().fg(self.theme.muted))),
            wins_row[0],
        );
        self.render_button(frame, wins_row[1], "[−]", Control::Wins(team_id, Step::Down));
        frame.render_widget(
            Paragraph::new(Span::styled(
                team.win_count.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center),
            wins_row[2],
        );
        self.render_button(frame, wins_row[3], "[+]", Control::Wins(team_id, Step::Up));
    }

    fn render_level(&self, frame: &mut Frame, area: Rect, state: &ScoreboardState, team: TeamId) {
        let label = state.team(team).level();
        let style = Style::default()
            .fg(self.theme.primary_fg)
            .add_modifier(Modifier::BOLD);

        let mut lines: Vec<Line> = if state.large_digits_mode
            && area.height as usize >= level_font::FONT_HEIGHT
            && area.width as usize >= level_font::width(label.main) + 2
        {
            let mut rows = level_font::render(label.main);
            if let Some(last) = rows.last_mut() {
                last.push_str(&to_subscript(label.sub));
            }
            rows.into_iter()
                .map(|row| Line::from(Span::styled(row, style)))
                .collect()
        } else {
            vec![Line::from(Span::styled(
                format!("{}{}", label.main, to_subscript(label.sub)),
                style,
            ))]
        };

        let padding = (area.height as usize).saturating_sub(lines.len()) / 2;
        let mut content = vec![Line::from(String::new()); padding];
        content.append(&mut lines);
        frame.render_widget(
            Paragraph::new(content).alignment(Alignment::Center),
            area,
        );
    }

    fn render_button(&mut self, frame: &mut Frame, area: Rect, text: &str, control: Control) {
        frame.render_widget(
            Paragraph::new(Span::styled(
                text.to_string(),
                Style::default().fg(self.theme.accent),
            )),
            area,
        );
        self.hitboxes.push(area, control);
    }

    fn render_footer(&mut self, frame: &mut Frame, area: Rect) {
        let labels = self.labels();
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let pressed = self.next_round.is_pending();
        let next_style = if pressed {
            Style::default().fg(self.theme.on_accent).bg(self.theme.danger)
        } else {
            Style::default().fg(self.theme.danger)
        };
        let next_round = Paragraph::new(Line::from(vec![
            Span::styled(labels.next_round, next_style.add_modifier(Modifier::BOLD)),
            Span::styled(format!("  {}", labels.hold), next_style),
        ]))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.theme.danger)),
        );
        frame.render_widget(next_round, columns[0]);
        self.hitboxes.push(columns[0], Control::NextRound);

        if self.board.state().stage_available() {
            let toggle = Paragraph::new(Span::styled(
                labels.toggle_stage,
                Style::default()
                    .fg(self.theme.stage)
                    .add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.stage)),
            );
            frame.render_widget(toggle, columns[1]);
            self.hitboxes.push(columns[1], Control::ToggleStage);
        } else {
            let pill = Paragraph::new(Span::styled(
                labels.stage_locked,
                Style::default().fg(self.theme.muted),
            ))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.muted)),
            );
            frame.render_widget(pill, columns[1]);
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let paragraph = Paragraph::new(vec![
            Line::from(self.state.status.clone()),
            Line::from(Span::styled(
                self.labels().key_help,
                Style::default().fg(self.theme.muted),
            )),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_toast(&self, frame: &mut Frame, area: Rect, text: &str) {
        let width = (Span::raw(text).width() as u16 + 4).min(area.width);
        let toast_area = Rect::new(
            area.x + area.width.saturating_sub(width) / 2,
            area.y + area.height.saturating_sub(4),
            width,
            3.min(area.height),
        );
        frame.render_widget(Clear, toast_area);
        frame.render_widget(
            Paragraph::new(text.to_string())
                .alignment(Alignment::Center)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(self.theme.accent)),
                ),
            toast_area,
        );
    }

    fn render_rename(&self, frame: &mut Frame, modal: &RenameModal) {
        let labels = self.labels();
        let area = centered_rect(48, 6, frame.size());
        frame.render_widget(Clear, area);

        let default = labels.default_team_name(modal.team);
        let input_line = Line::from(vec![
            Span::styled("> ", Style::default().fg(self.theme.accent)),
            Span::raw(modal.input.clone()),
        ]);
        let helper = Line::from(Span::styled(
            labels.rename_help,
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let paragraph = Paragraph::new(vec![input_line, Line::from(""), helper])
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("{} - {}", labels.rename_prompt, default)),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);

        let offset = Span::raw(modal.before_cursor()).width() as u16;
        let cursor_x = (area.x + 3 + offset).min(area.x + area.width.saturating_sub(2));
        frame.set_cursor(cursor_x, area.y + 1);
    }
}

/// Keyboard shortcut for actions that need no gesture handling.
fn key_action(key: &KeyEvent) -> Option<Action> {
    let action = match key.code {
        KeyCode::Char('w') => Action::ChangeLevel {
            team: TeamId::A,
            step: Step::Up,
        },
        KeyCode::Char('s') => Action::ChangeLevel {
            team: TeamId::A,
            step: Step::Down,
        },
        KeyCode::Char('e') => Action::ChangeWins {
            team: TeamId::A,
            step: Step::Up,
        },
        KeyCode::Char('d') => Action::ChangeWins {
            team: TeamId::A,
            step: Step::Down,
        },
        KeyCode::Char('i') => Action::ChangeLevel {
            team: TeamId::B,
            step: Step::Up,
        },
        KeyCode::Char('k') => Action::ChangeLevel {
            team: TeamId::B,
            step: Step::Down,
        },
        KeyCode::Char('o') => Action::ChangeWins {
            team: TeamId::B,
            step: Step::Up,
        },
        KeyCode::Char('l') => Action::ChangeWins {
            team: TeamId::B,
            step: Step::Down,
        },
        KeyCode::Char(' ') | KeyCode::Char('t') => Action::ToggleStage,
        KeyCode::Char('n') => Action::NextRoundTap,
        KeyCode::Char('N') => Action::ResetLevels,
        KeyCode::Char('A') => Action::ResetTeamName(TeamId::A),
        KeyCode::Char('B') => Action::ResetTeamName(TeamId::B),
        KeyCode::Char('1') => Action::ToggleKeepAwake,
        KeyCode::Char('2') => Action::ToggleSound,
        KeyCode::Char('3') => Action::ToggleLargeDigits,
        KeyCode::Char('4') => Action::ToggleLanguage,
        KeyCode::Char('z') => Action::SetLanguage(Language::Zh),
        KeyCode::Char('x') => Action::SetLanguage(Language::En),
        _ => return None,
    };
    Some(action)
}

/// Action for a single-click control. Gesture controls have none.
fn control_action(control: Control) -> Option<Action> {
    let action = match control {
        Control::KeepAwake => Action::ToggleKeepAwake,
        Control::Sound => Action::ToggleSound,
        Control::LargeDigits => Action::ToggleLargeDigits,
        Control::Language => Action::ToggleLanguage,
        Control::Level(team, step) => Action::ChangeLevel { team, step },
        Control::Wins(team, step) => Action::ChangeWins { team, step },
        Control::ToggleStage => Action::ToggleStage,
        Control::TeamName(_) | Control::NextRound => return None,
    };
    Some(action)
}

fn restore_terminal(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    key_release_events: bool,
) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    if key_release_events {
        if let Err(err) = execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags) {
            warn!(error = %err, "failed to restore keyboard flags");
        }
    }
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        DisableMouseCapture,
        LeaveAlternateScreen
    )
    .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>, tick: Duration) {
    thread::spawn(move || loop {
        match event::poll(tick) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

#[derive(Default)]
struct UiState {
    status: String,
    toast: Option<(String, Instant)>,
    should_quit: bool,
}

impl UiState {
    fn set_status(&mut self, message: String) {
        self.status = message;
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn to_subscript(digits: &str) -> String {
    digits
        .chars()
        .map(|ch| match ch {
            '0' => '₀',
            '1' => '₁',
            '2' => '₂',
            '3' => '₃',
            '4' => '₄',
            '5' => '₅',
            '6' => '₆',
            '7' => '₇',
            '8' => '₈',
            '9' => '₉',
            other => other,
        })
        .collect()
}
