use std::{cmp, io, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame, Terminal,
};
use tally_core::{
    parse_int, Applied, KeyValueStore, Mirror, PlayerId, RestoreOutcome, ScoreOutcome, ScoreTable,
    Scoreboard, StartView,
};
use tokio::sync::mpsc;
use tracing::{error, info};

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_INPUT_LEN: usize = 64;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    selection_fg: Color,
    danger: Color,
    on_danger: Color,
    total_bg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::Blue,
            selection_fg: Color::White,
            danger: Color::Red,
            on_danger: Color::White,
            total_bg: Color::Gray,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Scoreboard,
    Table,
}

impl From<StartView> for Screen {
    fn from(view: StartView) -> Self {
        match view {
            StartView::Scoreboard => Screen::Scoreboard,
            StartView::Table => Screen::Table,
        }
    }
}

/// What a submitted prompt does with its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptAction {
    AddPlayer,
    AddScore(PlayerId),
    EditScore { player: PlayerId, round: usize },
    RenamePlayer(PlayerId),
    EditCell { row: usize, col: usize },
    RenameColumn(usize),
}

#[derive(Debug, Clone)]
struct PromptModal {
    title: String,
    input: String,
    cursor: usize,
    action: PromptAction,
}

impl PromptModal {
    fn new(title: impl Into<String>, initial: impl Into<String>, action: PromptAction) -> Self {
        let input = initial.into();
        let cursor = input.chars().count();
        Self {
            title: title.into(),
            input,
            cursor,
            action,
        }
    }

    fn char_len(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor)
            .map(|(index, _)| index)
            .unwrap_or(self.input.len())
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.char_len() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.char_len();
    }

    fn insert(&mut self, ch: char) {
        if self.char_len() >= MAX_INPUT_LEN || ch.is_control() {
            return;
        }
        let index = self.byte_index();
        self.input.insert(index, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let index = self.byte_index();
        self.input.remove(index);
    }

    fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let index = self.byte_index();
            self.input.remove(index);
        }
    }
}

/// Destructive operations that wait for a yes/no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfirmAction {
    DeletePlayer(PlayerId),
    NewGame,
    DeleteColumn(usize),
    ResetTable,
}

#[derive(Debug, Clone)]
struct ConfirmModal {
    message: String,
    action: ConfirmAction,
}

#[derive(Debug, Clone)]
enum Modal {
    Prompt(PromptModal),
    Confirm(ConfirmModal),
}

enum AppEvent {
    Input(Event),
    Tick,
}

#[derive(Debug, Clone, Copy, Default)]
struct GridCursor {
    row: usize,
    col: usize,
}

/// Terminal front end for the scoreboard and the score table.
pub struct TallyApp<S: KeyValueStore> {
    scoreboard: Mirror<Scoreboard, S>,
    table: Mirror<ScoreTable, S>,
    screen: Screen,
    modal: Option<Modal>,
    board_cursor: GridCursor,
    table_cursor: GridCursor,
    status: String,
    last_saved: Option<String>,
    store_label: String,
    should_quit: bool,
    theme: Theme,
}

impl<S: KeyValueStore> TallyApp<S> {
    pub fn new(
        scoreboard: Mirror<Scoreboard, S>,
        table: Mirror<ScoreTable, S>,
        start_view: StartView,
        store_label: String,
    ) -> Self {
        let status = startup_status(scoreboard.outcome(), table.outcome());
        Self {
            scoreboard,
            table,
            screen: start_view.into(),
            modal: None,
            board_cursor: GridCursor::default(),
            table_cursor: GridCursor::default(),
            status,
            last_saved: None,
            store_label,
            should_quit: false,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);
        info!(screen = ?self.screen, "Tally started");

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }
            match event_rx.recv().await {
                Some(AppEvent::Input(Event::Key(key))) => {
                    if let Err(err) = self.handle_key(key) {
                        error!(?err, "Key handling failed");
                        self.status = format!("{err:#}");
                    }
                }
                Some(AppEvent::Input(_)) | Some(AppEvent::Tick) => {}
                None => break,
            }
        }

        restore_terminal(&mut terminal)?;
        info!("Tally stopped");
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.kind == KeyEventKind::Release {
            return Ok(());
        }
        if let Some(modal) = self.modal.take() {
            return match modal {
                Modal::Prompt(prompt) => self.handle_prompt_key(prompt, key),
                Modal::Confirm(confirm) => self.handle_confirm_key(confirm, key),
            };
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if let KeyCode::Char('c') = key.code {
                self.should_quit = true;
            }
            return Ok(());
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                Ok(())
            }
            KeyCode::Tab => {
                self.screen = match self.screen {
                    Screen::Scoreboard => Screen::Table,
                    Screen::Table => Screen::Scoreboard,
                };
                self.status = match self.screen {
                    Screen::Scoreboard => "Scoreboard".to_string(),
                    Screen::Table => "Score table".to_string(),
                };
                Ok(())
            }
            _ => match self.screen {
                Screen::Scoreboard => self.handle_scoreboard_key(key),
                Screen::Table => self.handle_table_key(key),
            },
        }
    }

    fn handle_prompt_key(&mut self, mut prompt: PromptModal, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.status = "Cancelled".to_string();
                return Ok(());
            }
            KeyCode::Enter => return self.submit_prompt(prompt.action, prompt.input),
            KeyCode::Left => prompt.move_cursor(-1),
            KeyCode::Right => prompt.move_cursor(1),
            KeyCode::Home => prompt.move_home(),
            KeyCode::End => prompt.move_end(),
            KeyCode::Backspace => prompt.backspace(),
            KeyCode::Delete => prompt.delete(),
            KeyCode::Char(ch) => {
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                    prompt.insert(ch);
                }
            }
            _ => {}
        }
        self.modal = Some(Modal::Prompt(prompt));
        Ok(())
    }

    fn handle_confirm_key(&mut self, confirm: ConfirmModal, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.apply_confirmed(confirm.action)
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.status = "Cancelled".to_string();
                Ok(())
            }
            _ => {
                self.modal = Some(Modal::Confirm(confirm));
                Ok(())
            }
        }
    }

    fn submit_prompt(&mut self, action: PromptAction, value: String) -> Result<()> {
        match action {
            PromptAction::AddPlayer => {
                let added = self
                    .scoreboard
                    .update_with(|board| board.add_player(&value), Option::is_some);
                match self.check_saved(added)? {
                    Some(id) => {
                        if let Some(position) = self.scoreboard.state().position(id) {
                            self.board_cursor.col = position;
                        }
                        self.status = format!("Added {}", value.trim());
                    }
                    None if value.trim().is_empty() => {
                        self.status = "Player name cannot be empty".to_string();
                    }
                    None => self.status = "No more players can be added".to_string(),
                }
            }
            PromptAction::AddScore(player) => {
                let Some(score) = parse_int(&value) else {
                    self.status = format!("Ignored non-numeric score '{value}'");
                    return Ok(());
                };
                let outcome = self.scoreboard.update_with(
                    |board| board.add_score(player, score),
                    |outcome| outcome.is_recorded(),
                );
                let outcome = self.check_saved(outcome)?;
                self.report_score(player, score, outcome);
            }
            PromptAction::EditScore { player, round } => {
                let Some(score) = parse_int(&value) else {
                    self.status = format!("Ignored non-numeric score '{value}'");
                    return Ok(());
                };
                let outcome = self.scoreboard.update_with(
                    |board| board.edit_score(player, round, score),
                    |outcome| outcome.is_recorded(),
                );
                let outcome = self.check_saved(outcome)?;
                self.report_score(player, score, outcome);
            }
            PromptAction::RenamePlayer(player) => {
                let renamed = self
                    .scoreboard
                    .update(|board| board.edit_player(player, &value));
                if self.check_written(renamed)? {
                    self.status = format!("Renamed to {}", value.trim());
                } else {
                    self.status = "Name unchanged".to_string();
                }
            }
            PromptAction::EditCell { row, col } => {
                let written = self.table.update(|table| table.set_cell(row, col, value));
                if self.check_written(written)? {
                    self.status = format!("Updated row {} column {}", row + 1, col + 1);
                }
            }
            PromptAction::RenameColumn(col) => {
                let renamed = self
                    .table
                    .update(|table| table.rename_column(col, value.clone()));
                if self.check_written(renamed)? {
                    self.status = format!("Column {} renamed to '{value}'", col + 1);
                }
            }
        }
        self.clamp_cursors();
        Ok(())
    }

    fn apply_confirmed(&mut self, action: ConfirmAction) -> Result<()> {
        match action {
            ConfirmAction::DeletePlayer(player) => {
                let name = self.player_name(player);
                let deleted = self.scoreboard.update(|board| board.delete_player(player));
                if self.check_written(deleted)? {
                    info!(%player, name = %name, "Player deleted");
                    self.status = format!("Deleted {name}");
                }
            }
            ConfirmAction::NewGame => {
                let cleared = self.scoreboard.update(|board| board.new_game());
                self.check_written(cleared)?;
                info!(players = self.scoreboard.state().len(), "New game started");
                self.board_cursor.row = 0;
                self.status = "New game started".to_string();
            }
            ConfirmAction::DeleteColumn(col) => {
                let deleted = self.table.update(|table| table.delete_column(col));
                if self.check_written(deleted)? {
                    self.status = format!("Deleted column {}", col + 1);
                }
            }
            ConfirmAction::ResetTable => {
                let reset = self.table.update(|table| table.reset_table());
                self.check_written(reset)?;
                info!("Score table reset");
                self.status = "Table reset".to_string();
            }
        }
        self.clamp_cursors();
        Ok(())
    }

    /// Stamp the save time when a snapshot was written, or surface a failed
    /// write. The in-memory change survives a failure, so cursors are clamped
    /// to it either way.
    fn check_saved<T>(&mut self, result: Result<Applied<T>>) -> Result<T> {
        match result {
            Ok(Applied { value, written }) => {
                if written {
                    self.last_saved = Some(Local::now().format("%H:%M:%S").to_string());
                }
                Ok(value)
            }
            Err(err) => {
                self.clamp_cursors();
                error!(error = %format!("{err:#}"), "Auto-save failed");
                Err(err.context("Auto-save failed"))
            }
        }
    }

    fn check_written(&mut self, result: Result<bool>) -> Result<bool> {
        self.check_saved(result.map(|written| Applied {
            value: written,
            written,
        }))
    }

    fn report_score(&mut self, player: PlayerId, score: i64, outcome: ScoreOutcome) {
        let board = self.scoreboard.state();
        let name = self.player_name(player);
        let total = board.calculate_total(player);
        self.status = match outcome {
            ScoreOutcome::Recorded => format!("Recorded {score} for {name} (total {total})"),
            ScoreOutcome::Locked => format!("{name} is out at {total}; scores are locked"),
            ScoreOutcome::UnknownPlayer => "That player no longer exists".to_string(),
            ScoreOutcome::NoSuchRound => "That round does not exist yet".to_string(),
        };
    }

    fn handle_scoreboard_key(&mut self, key: KeyEvent) -> Result<()> {
        let selected = self.selected_player();
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.move_board_cursor(0, -1),
            KeyCode::Right | KeyCode::Char('l') => self.move_board_cursor(0, 1),
            KeyCode::Up | KeyCode::Char('k') => self.move_board_cursor(-1, 0),
            KeyCode::Down | KeyCode::Char('j') => self.move_board_cursor(1, 0),
            KeyCode::Char('a') => {
                self.open_prompt("Add player", "", PromptAction::AddPlayer);
            }
            KeyCode::Enter | KeyCode::Char('s') => {
                let Some(player) = selected else {
                    self.status = "Add a player first".to_string();
                    return Ok(());
                };
                let name = self.player_name(player);
                if self.scoreboard.state().is_out(player) {
                    let total = self.scoreboard.state().calculate_total(player);
                    self.status = format!("{name} is out at {total}; scores are locked");
                    return Ok(());
                }
                self.open_prompt(
                    format!("Score for {name}"),
                    "",
                    PromptAction::AddScore(player),
                );
            }
            KeyCode::Char('e') => {
                let Some(player) = selected else {
                    self.status = "Add a player first".to_string();
                    return Ok(());
                };
                let round = self.board_cursor.row;
                let current = self
                    .scoreboard
                    .state()
                    .round_score(player, round)
                    .map(|score| score.to_string())
                    .unwrap_or_default();
                let name = self.player_name(player);
                self.open_prompt(
                    format!("Edit round {} for {name}", round + 1),
                    current,
                    PromptAction::EditScore { player, round },
                );
            }
            KeyCode::Char('r') => {
                let Some(player) = selected else {
                    self.status = "Add a player first".to_string();
                    return Ok(());
                };
                let name = self.player_name(player);
                self.open_prompt(
                    format!("Rename {name}"),
                    name,
                    PromptAction::RenamePlayer(player),
                );
            }
            KeyCode::Char('d') => {
                let Some(player) = selected else {
                    self.status = "Add a player first".to_string();
                    return Ok(());
                };
                let name = self.player_name(player);
                self.open_confirm(
                    format!("Delete {name} and all of their scores?"),
                    ConfirmAction::DeletePlayer(player),
                );
            }
            KeyCode::Char('n') => {
                self.open_confirm(
                    "Start a new game? All scores are cleared, names are kept.",
                    ConfirmAction::NewGame,
                );
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_table_key(&mut self, key: KeyEvent) -> Result<()> {
        let GridCursor { row, col } = self.table_cursor;
        let has_columns = self.table.state().column_count() > 0;
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.move_table_cursor(0, -1),
            KeyCode::Right | KeyCode::Char('l') => self.move_table_cursor(0, 1),
            KeyCode::Up | KeyCode::Char('k') => self.move_table_cursor(-1, 0),
            KeyCode::Down | KeyCode::Char('j') => self.move_table_cursor(1, 0),
            KeyCode::Enter | KeyCode::Char('e') if has_columns => {
                let current = self
                    .table
                    .state()
                    .cell(row, col)
                    .map(str::to_string)
                    .unwrap_or_default();
                self.open_prompt(
                    format!("Row {} · {}", row + 1, self.column_label(col)),
                    current,
                    PromptAction::EditCell { row, col },
                );
            }
            KeyCode::Backspace | KeyCode::Delete if has_columns => {
                let cleared = self.table.update(|table| table.set_cell(row, col, ""));
                if self.check_written(cleared)? {
                    self.status = format!("Cleared row {} column {}", row + 1, col + 1);
                }
            }
            KeyCode::Char('c') => {
                let added = self.table.update(|table| table.add_column());
                self.check_written(added)?;
                self.table_cursor.col = self.table.state().column_count().saturating_sub(1);
                self.status = format!("Added {}", self.column_label(self.table_cursor.col));
            }
            KeyCode::Char('r') if has_columns => {
                let current = self
                    .table
                    .state()
                    .column_names()
                    .get(col)
                    .cloned()
                    .unwrap_or_default();
                self.open_prompt(
                    format!("Rename column {}", col + 1),
                    current,
                    PromptAction::RenameColumn(col),
                );
            }
            KeyCode::Char('x') if has_columns => {
                self.open_confirm(
                    format!("Delete column '{}' and its cells?", self.column_label(col)),
                    ConfirmAction::DeleteColumn(col),
                );
            }
            KeyCode::Char('n') => {
                self.open_confirm(
                    "Reset the table? Every cell is cleared, columns are kept.",
                    ConfirmAction::ResetTable,
                );
            }
            KeyCode::Enter
            | KeyCode::Char('e')
            | KeyCode::Char('r')
            | KeyCode::Char('x')
            | KeyCode::Backspace
            | KeyCode::Delete => {
                self.status = "Add a column first".to_string();
            }
            _ => {}
        }
        Ok(())
    }

    fn open_prompt(
        &mut self,
        title: impl Into<String>,
        initial: impl Into<String>,
        action: PromptAction,
    ) {
        let prompt = PromptModal::new(title, initial, action);
        self.status = prompt.title.clone();
        self.modal = Some(Modal::Prompt(prompt));
    }

    fn open_confirm(&mut self, message: impl Into<String>, action: ConfirmAction) {
        let message = message.into();
        self.status = message.clone();
        self.modal = Some(Modal::Confirm(ConfirmModal { message, action }));
    }

    fn selected_player(&self) -> Option<PlayerId> {
        self.scoreboard
            .state()
            .players()
            .get(self.board_cursor.col)
            .map(|player| player.id)
    }

    fn player_name(&self, id: PlayerId) -> String {
        self.scoreboard
            .state()
            .player(id)
            .map(|player| player.name.clone())
            .unwrap_or_else(|| format!("player {id}"))
    }

    fn column_label(&self, col: usize) -> String {
        match self.table.state().column_names().get(col) {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("column {}", col + 1),
        }
    }

    fn move_board_cursor(&mut self, delta_row: isize, delta_col: isize) {
        let board = self.scoreboard.state();
        self.board_cursor = offset_cursor(
            self.board_cursor,
            delta_row,
            delta_col,
            board.row_count(),
            board.len(),
        );
    }

    fn move_table_cursor(&mut self, delta_row: isize, delta_col: isize) {
        let table = self.table.state();
        self.table_cursor = offset_cursor(
            self.table_cursor,
            delta_row,
            delta_col,
            table.row_count(),
            table.column_count(),
        );
    }

    fn clamp_cursors(&mut self) {
        self.move_board_cursor(0, 0);
        self.move_table_cursor(0, 0);
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.size();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(4),
                Constraint::Length(4),
            ])
            .split(area);

        self.render_tabs(frame, rows[0]);
        match self.screen {
            Screen::Scoreboard => self.render_scoreboard(frame, rows[1]),
            Screen::Table => self.render_table(frame, rows[1]),
        }
        self.render_help(frame, rows[2]);
        self.render_status(frame, rows[3]);

        match &self.modal {
            Some(Modal::Prompt(prompt)) => self.render_prompt(frame, prompt),
            Some(Modal::Confirm(confirm)) => self.render_confirm(frame, confirm),
            None => {}
        }
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let tab = |label: &'static str, screen: Screen| {
            if self.screen == screen {
                Span::styled(
                    format!(" {label} "),
                    Style::default()
                        .fg(self.theme.selection_fg)
                        .bg(self.theme.accent)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                Span::styled(format!(" {label} "), Style::default().fg(self.theme.muted))
            }
        };
        let line = Line::from(vec![
            tab("Scoreboard", Screen::Scoreboard),
            Span::raw("  "),
            tab("Score Table", Screen::Table),
        ]);
        let paragraph = Paragraph::new(line)
            .block(Block::default().borders(Borders::ALL).title("Tally"))
            .alignment(Alignment::Left);
        frame.render_widget(paragraph, area);
    }

    fn render_scoreboard(&self, frame: &mut Frame, area: Rect) {
        let board = self.scoreboard.state();
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Card Game Scoreboard");
        if board.is_empty() {
            let paragraph = Paragraph::new(vec![
                Line::from(""),
                Line::from("No players yet. Press 'a' to add one."),
            ])
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
            return;
        }

        let header = Row::new(
            std::iter::once(Cell::from("Round")).chain(board.players().iter().enumerate().map(
                |(index, player)| {
                    let mut style = Style::default().add_modifier(Modifier::BOLD);
                    if index == self.board_cursor.col {
                        style = style.fg(self.theme.accent);
                    }
                    Cell::from(player.name.clone()).style(style)
                },
            )),
        )
        .bottom_margin(1);

        // Borders, header, its margin and the totals row.
        let visible = usize::from(area.height.saturating_sub(5)).max(1);
        let first = scroll_start(self.board_cursor.row, visible);
        let last = cmp::min(board.row_count(), first + visible);

        let mut rows: Vec<Row> = (first..last)
            .map(|round| {
                let cells = std::iter::once(
                    Cell::from(format!("{}", round + 1)).style(Style::default().fg(self.theme.muted)),
                )
                .chain(board.players().iter().enumerate().map(|(index, player)| {
                    let text = player
                        .scores
                        .get(round)
                        .map(|score| score.to_string())
                        .unwrap_or_default();
                    let selected =
                        index == self.board_cursor.col && round == self.board_cursor.row;
                    Cell::from(text).style(self.score_style(player.is_out(), selected))
                }));
                Row::new(cells)
            })
            .collect();

        rows.push(Row::new(
            std::iter::once(Cell::from("Total").style(Style::default().add_modifier(Modifier::BOLD)))
                .chain(board.players().iter().map(|player| {
                    let style = if player.is_out() {
                        Style::default().fg(self.theme.on_danger).bg(self.theme.danger)
                    } else {
                        Style::default().fg(Color::Black).bg(self.theme.total_bg)
                    };
                    Cell::from(player.total().to_string())
                        .style(style.add_modifier(Modifier::BOLD))
                })),
        ));

        let widths = std::iter::once(Constraint::Length(6))
            .chain(board.players().iter().map(|_| Constraint::Min(8)))
            .collect::<Vec<_>>();
        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .column_spacing(1);
        frame.render_widget(table, area);
    }

    fn render_table(&self, frame: &mut Frame, area: Rect) {
        let table = self.table.state();
        let block = Block::default().borders(Borders::ALL).title("Score Table");
        if table.column_count() == 0 {
            let paragraph = Paragraph::new(vec![
                Line::from(""),
                Line::from("No columns. Press 'c' to add one."),
            ])
            .block(block)
            .alignment(Alignment::Center);
            frame.render_widget(paragraph, area);
            return;
        }

        let header = Row::new(table.column_names().iter().enumerate().map(|(index, name)| {
            let mut style = Style::default().add_modifier(Modifier::BOLD);
            if index == self.table_cursor.col {
                style = style.fg(self.theme.accent);
            }
            Cell::from(name.clone()).style(style)
        }))
        .bottom_margin(1);

        let visible = usize::from(area.height.saturating_sub(5)).max(1);
        let first = scroll_start(self.table_cursor.row, visible);
        let last = cmp::min(table.row_count(), first + visible);

        let mut rows: Vec<Row> = table.rows()[first..last]
            .iter()
            .enumerate()
            .map(|(offset, cells)| {
                let row = first + offset;
                Row::new(cells.iter().enumerate().map(|(col, text)| {
                    let selected = row == self.table_cursor.row && col == self.table_cursor.col;
                    Cell::from(text.clone()).style(self.score_style(false, selected))
                }))
            })
            .collect();

        rows.push(Row::new(table.column_totals().into_iter().map(|total| {
            let color = if ScoreTable::is_over_threshold(total) {
                self.theme.danger
            } else {
                self.theme.primary_fg
            };
            Cell::from(total.to_string())
                .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        })));

        let widths = table
            .column_names()
            .iter()
            .map(|_| Constraint::Min(10))
            .collect::<Vec<_>>();
        let widget = Table::new(rows, widths)
            .header(header)
            .block(block)
            .column_spacing(1);
        frame.render_widget(widget, area);
    }

    fn score_style(&self, out: bool, selected: bool) -> Style {
        if selected {
            Style::default()
                .fg(self.theme.selection_fg)
                .bg(self.theme.selection_bg)
        } else if out {
            Style::default().fg(self.theme.on_danger).bg(self.theme.danger)
        } else {
            Style::default().fg(self.theme.primary_fg)
        }
    }

    fn render_help(&self, frame: &mut Frame, area: Rect) {
        let key = |label: &'static str| {
            Span::styled(label, Style::default().add_modifier(Modifier::BOLD))
        };
        let lines = match self.screen {
            Screen::Scoreboard => vec![
                Line::from(vec![
                    key("a"),
                    Span::raw(" add player  "),
                    key("Enter"),
                    Span::raw(" add score  "),
                    key("e"),
                    Span::raw(" edit score  "),
                    key("r"),
                    Span::raw(" rename  "),
                    key("d"),
                    Span::raw(" delete"),
                ]),
                Line::from(vec![
                    key("n"),
                    Span::raw(" new game  "),
                    key("Tab"),
                    Span::raw(" score table  "),
                    key("q"),
                    Span::raw(" quit"),
                ]),
            ],
            Screen::Table => vec![
                Line::from(vec![
                    key("Enter"),
                    Span::raw(" edit cell  "),
                    key("Del"),
                    Span::raw(" clear  "),
                    key("c"),
                    Span::raw(" add column  "),
                    key("r"),
                    Span::raw(" rename  "),
                    key("x"),
                    Span::raw(" delete column"),
                ]),
                Line::from(vec![
                    key("n"),
                    Span::raw(" reset table  "),
                    key("Tab"),
                    Span::raw(" scoreboard  "),
                    key("q"),
                    Span::raw(" quit"),
                ]),
            ],
        };
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Keys"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let saved = self
            .last_saved
            .as_deref()
            .map(|time| format!("last saved {time}"))
            .unwrap_or_else(|| "no changes yet".to_string());
        let secondary = format!("Store: {}  ({saved})", self.store_label);
        let paragraph = Paragraph::new(vec![
            Line::from(self.status.clone()),
            Line::from(Span::styled(secondary, Style::default().fg(self.theme.muted))),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_prompt(&self, frame: &mut Frame, prompt: &PromptModal) {
        let frame_area = frame.size();
        let width = cmp::max(cmp::min(60_u16, frame_area.width.saturating_sub(4)), 24_u16);
        let area = centered_rect(width, 6, frame_area);

        frame.render_widget(Clear, area);

        let input_line = Line::from(vec![
            Span::styled("> ", Style::default().fg(self.theme.accent)),
            Span::raw(prompt.input.clone()),
        ]);
        let helper = Line::from(vec![
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" confirm  "),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancel"),
        ]);
        let paragraph = Paragraph::new(vec![input_line, Line::from(""), helper])
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(prompt.title.clone()),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);

        let cursor_x =
            (area.x + 3 + prompt.cursor as u16).min(area.x + area.width.saturating_sub(2));
        frame.set_cursor(cursor_x, area.y + 1);
    }

    fn render_confirm(&self, frame: &mut Frame, confirm: &ConfirmModal) {
        let frame_area = frame.size();
        let width = cmp::max(cmp::min(64_u16, frame_area.width.saturating_sub(4)), 24_u16);
        let area = centered_rect(width, 6, frame_area);

        frame.render_widget(Clear, area);

        let helper = Line::from(vec![
            Span::styled("y", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" confirm  "),
            Span::styled("n", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancel"),
        ]);
        let paragraph = Paragraph::new(vec![
            Line::from(confirm.message.clone()),
            Line::from(""),
            helper,
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm")
                .border_style(Style::default().fg(self.theme.danger)),
        )
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn startup_status(board: &RestoreOutcome, table: &RestoreOutcome) -> String {
    let describe = |label: &str, outcome: &RestoreOutcome| match outcome {
        RestoreOutcome::Fresh => None,
        RestoreOutcome::Restored => Some(format!("{label} restored")),
        RestoreOutcome::Recovered { reason } => {
            Some(format!("Stored {label} was unreadable ({reason}); started fresh"))
        }
    };
    let notes: Vec<String> = [describe("scoreboard", board), describe("table", table)]
        .into_iter()
        .flatten()
        .collect();
    if notes.is_empty() {
        "Ready".to_string()
    } else {
        notes.join(" • ")
    }
}

fn offset_cursor(
    cursor: GridCursor,
    delta_row: isize,
    delta_col: isize,
    rows: usize,
    cols: usize,
) -> GridCursor {
    let clamp = |value: usize, delta: isize, len: usize| {
        let max = len.saturating_sub(1) as isize;
        (value as isize + delta).clamp(0, max) as usize
    };
    GridCursor {
        row: clamp(cursor.row, delta_row, rows),
        col: clamp(cursor.col, delta_col, cols),
    }
}

fn scroll_start(cursor: usize, visible: usize) -> usize {
    cursor.saturating_sub(visible.saturating_sub(1))
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
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
