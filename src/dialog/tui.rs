//! Full-screen dialog backend
//!
//! Draws a centered dialog window with ratatui and runs its own crossterm
//! event loop until a button is pressed. Key handling (`TuiDialogState`) and
//! drawing (`render_dialog`) do not touch the terminal, so both are tested
//! without one.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;
use std::time::Duration;
use tracing::debug;

use super::{
    Button, DialogBackend, DialogContent, DialogOutcome, DialogSpec, Payload, normalize_selection,
};
use crate::error::{Result, WizardError};
use crate::theme::Styles;
use crate::types::{ButtonAlign, CANCEL_PAGE_CODE, ExitCode, FINISH_PAGE_CODE};

/// Mutable interaction state of one dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuiDialogState {
    /// Row under the cursor
    pub cursor: usize,
    /// Checked flags for checklist / radiolist rows
    pub checked: Vec<bool>,
    /// Index of the focused button
    pub focused_button: usize,
    /// Text typed into an input dialog
    pub text: String,
}

impl TuiDialogState {
    pub fn new(content: &DialogContent) -> Self {
        let text = match content {
            DialogContent::Input { initial, .. } => initial.clone(),
            _ => String::new(),
        };
        Self {
            cursor: 0,
            checked: content.initial_selection(),
            focused_button: 0,
            text,
        }
    }

    /// Apply one key press. Returns the exit code when a button fires.
    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        content: &DialogContent,
        buttons: &[Button],
    ) -> Option<ExitCode> {
        let rows = content.row_count();
        let is_input = matches!(content, DialogContent::Input { .. });

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Some(CANCEL_PAGE_CODE);
            }
            KeyCode::Esc => return Some(CANCEL_PAGE_CODE),
            KeyCode::Enter => {
                return buttons
                    .get(self.focused_button)
                    .map(|b| b.code)
                    .or(Some(FINISH_PAGE_CODE));
            }
            KeyCode::Tab | KeyCode::Right if !buttons.is_empty() => {
                self.focused_button = (self.focused_button + 1) % buttons.len();
            }
            KeyCode::BackTab | KeyCode::Left if !buttons.is_empty() => {
                self.focused_button = (self.focused_button + buttons.len() - 1) % buttons.len();
            }
            KeyCode::Up if rows > 0 => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Down if rows > 0 => {
                self.cursor = (self.cursor + 1).min(rows - 1);
            }
            KeyCode::Backspace if is_input => {
                self.text.pop();
            }
            KeyCode::Char(c) if is_input => {
                self.text.push(c);
            }
            KeyCode::Char(' ') => self.toggle(content),
            _ => {}
        }
        None
    }

    fn toggle(&mut self, content: &DialogContent) {
        match content {
            DialogContent::CheckList(_) => {
                if let Some(flag) = self.checked.get_mut(self.cursor) {
                    *flag = !*flag;
                }
            }
            DialogContent::RadioList(_) => {
                let cursor = self.cursor;
                for (i, flag) in self.checked.iter_mut().enumerate() {
                    *flag = i == cursor;
                }
            }
            _ => {}
        }
    }
}

/// Dialog rendered by ratatui on the controlling terminal
pub struct TuiDialog {
    spec: DialogSpec,
    buttons: Vec<Button>,
    align: ButtonAlign,
    state: TuiDialogState,
}

impl TuiDialog {
    pub fn new(spec: DialogSpec) -> Self {
        let state = TuiDialogState::new(&spec.content);
        Self {
            spec,
            buttons: Vec::new(),
            align: ButtonAlign::default(),
            state,
        }
    }

    pub fn state(&self) -> &TuiDialogState {
        &self.state
    }

    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    /// Feed a key without a terminal; returns the outcome when a button fires
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<DialogOutcome> {
        let code = self
            .state
            .handle_key(key, &self.spec.content, &self.buttons)?;
        Some(self.report_exit(code))
    }

    /// Draw the dialog into a frame
    pub fn render(&self, f: &mut Frame) {
        render_dialog(f, &self.spec, &self.buttons, self.align, &self.state);
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    ) -> Result<DialogOutcome> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if event::poll(Duration::from_millis(250))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if let Some(outcome) = self.handle_key(key) {
                        debug!(
                            "Dialog '{}' closed with exit code {}",
                            self.spec.title, outcome.exit_code
                        );
                        return Ok(outcome);
                    }
                }
            }
        }
    }
}

impl DialogBackend for TuiDialog {
    fn spec(&self) -> &DialogSpec {
        &self.spec
    }

    fn add_buttons(&mut self, buttons: &[Button], align: ButtonAlign) {
        self.buttons = buttons.to_vec();
        self.align = align;
        self.state.focused_button = 0;
    }

    fn run(&mut self) -> Result<DialogOutcome> {
        enable_raw_mode()
            .map_err(|e| WizardError::dialog(format!("Failed to enable raw mode: {}", e)))?;
        crossterm::execute!(stdout(), EnterAlternateScreen).map_err(|e| {
            let _ = disable_raw_mode();
            WizardError::dialog(format!("Failed to enter alternate screen: {}", e))
        })?;

        let result = match Terminal::new(CrosstermBackend::new(stdout())) {
            Ok(mut terminal) => {
                let result = self.event_loop(&mut terminal);
                let _ = terminal.show_cursor();
                result
            }
            Err(e) => Err(WizardError::dialog(format!("Failed to create terminal: {}", e))),
        };

        // Cleanup terminal (always attempt cleanup, even if the loop failed)
        let _ = disable_raw_mode();
        let _ = crossterm::execute!(stdout(), LeaveAlternateScreen);

        result
    }

    fn selected_items(&self) -> Vec<bool> {
        self.state.checked.clone()
    }

    fn set_selected_items(&mut self, selection: &[bool]) {
        self.state.checked = normalize_selection(&self.spec.content, selection);
    }

    fn report_exit(&self, code: ExitCode) -> DialogOutcome {
        let payload = match &self.spec.content {
            DialogContent::CheckList(_) | DialogContent::RadioList(_) => {
                Payload::Selection(self.selected_items())
            }
            DialogContent::Input { .. } => Payload::Text(self.state.text.clone()),
            _ => Payload::None,
        };
        DialogOutcome::new(code, payload)
    }
}

/// Centered rectangle no larger than the requested size
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

/// Render a dialog window with its body and button row
pub fn render_dialog(
    f: &mut Frame,
    spec: &DialogSpec,
    buttons: &[Button],
    align: ButtonAlign,
    state: &TuiDialogState,
) {
    let area = f.area();
    f.render_widget(Block::default().style(Styles::screen()), area);

    let dialog_area = centered_rect(spec.width, spec.height, area);

    // Shadow one cell down and right of the window
    let shadow = Rect::new(
        dialog_area.x.saturating_add(1),
        dialog_area.y.saturating_add(1),
        dialog_area.width,
        dialog_area.height,
    )
    .intersection(area);
    f.render_widget(Block::default().style(Styles::shadow()), shadow);
    f.render_widget(Clear, dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(format!(" {} ", spec.title), Styles::title()))
        .title_alignment(Alignment::Center)
        .style(Styles::body());
    let inner = block.inner(dialog_area);
    f.render_widget(block, dialog_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Body
            Constraint::Length(1), // Divider
            Constraint::Length(1), // Buttons
        ])
        .split(inner);

    render_body(f, spec, state, chunks[0]);
    render_buttons(f, buttons, align, state.focused_button, chunks[2]);
}

fn render_body(f: &mut Frame, spec: &DialogSpec, state: &TuiDialogState, area: Rect) {
    match &spec.content {
        DialogContent::Message(text) => {
            let body = Paragraph::new(text.as_str())
                .style(Styles::body())
                .wrap(Wrap { trim: false });
            f.render_widget(body, area);
        }
        DialogContent::Input { prompt, .. } => {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(2), Constraint::Length(1), Constraint::Min(0)])
                .split(area);
            f.render_widget(
                Paragraph::new(prompt.as_str())
                    .style(Styles::body())
                    .wrap(Wrap { trim: true }),
                rows[0],
            );
            f.render_widget(
                Paragraph::new(format!("{}_", state.text)).style(Styles::input_field()),
                rows[1],
            );
        }
        DialogContent::CheckList(items) | DialogContent::RadioList(items) => {
            let radio = matches!(spec.content, DialogContent::RadioList(_));
            let list_items: Vec<ListItem> = items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let on = state.checked.get(i).copied().unwrap_or(false);
                    let marker = match (radio, on) {
                        (false, true) => "[X]",
                        (false, false) => "[ ]",
                        (true, true) => "(*)",
                        (true, false) => "( )",
                    };
                    ListItem::new(Line::from(vec![
                        Span::raw(format!("{} ", marker)),
                        Span::raw(format!("{:<30}", item.tag)),
                        Span::raw(item.description.clone()),
                    ]))
                })
                .collect();
            render_list(f, list_items, state.cursor, area);
        }
        DialogContent::List(rows) => {
            let list_items: Vec<ListItem> = rows
                .iter()
                .map(|row| {
                    ListItem::new(Line::from(vec![
                        Span::raw(format!("{:<30}", row.name)),
                        Span::styled(row.value.clone(), Styles::check_result(row.ok)),
                    ]))
                })
                .collect();
            render_list(f, list_items, state.cursor, area);
        }
    }
}

fn render_list(f: &mut Frame, items: Vec<ListItem>, cursor: usize, area: Rect) {
    let list = List::new(items)
        .style(Styles::body())
        .highlight_style(Styles::focused_row());
    let mut list_state = ListState::default();
    list_state.select(Some(cursor));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn render_buttons(
    f: &mut Frame,
    buttons: &[Button],
    align: ButtonAlign,
    focused: usize,
    area: Rect,
) {
    let mut spans = Vec::with_capacity(buttons.len() * 2);
    for (i, button) in buttons.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("   "));
        }
        let style = if i == focused {
            Styles::button_active()
        } else {
            Styles::button_inactive()
        };
        spans.push(Span::styled(format!("< {} >", button.label), style));
    }
    let alignment = match align {
        ButtonAlign::Left => Alignment::Left,
        ButtonAlign::Center => Alignment::Center,
        ButtonAlign::Right => Alignment::Right,
    };
    f.render_widget(
        Paragraph::new(Line::from(spans))
            .alignment(alignment)
            .style(Styles::body()),
        area,
    );
}
