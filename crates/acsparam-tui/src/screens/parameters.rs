//! Parameter browser: every parameter of one device in a searchable table,
//! with per-row object and refresh controls.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use acsparam_core::{
    CoreError, Device, ExpressionCache, ParameterRow, ParameterView, RowControl, Task, csv_url,
};
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, BorderType, Borders, Cell, HighlightSpacing, Paragraph, Row, Table, TableState, Wrap,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use tui_input::Input;
use url::Url;

use crate::action::{Action, Notification};
use crate::component::Component;
use crate::theme;
use crate::widgets::long_text;
use crate::widgets::text_input;
use crate::widgets::value_editor::{EditorEvent, ValueEditor};

const PAGE: isize = 10;
const HIGHLIGHT_SYMBOL: &str = "▸";
const COLUMN_SPACING: u16 = 1;
const CONTROLS_WIDTH: u16 = 6;

/// `[key, value, controls]` column widths for a table `width` cells wide,
/// after the one-cell highlight marker. Key gets 45% of the remainder.
fn column_widths(width: u16) -> [u16; 3] {
    let free = width.saturating_sub(1 + 2 * COLUMN_SPACING);
    let controls = CONTROLS_WIDTH.min(free);
    let rest = free - controls;
    let key = u16::try_from(u32::from(rest) * 45 / 100).unwrap_or(rest);
    [key, rest - key, controls]
}

pub struct ParametersScreen {
    action_tx: Option<UnboundedSender<Action>>,
    device: Device,
    device_id: String,
    csv_link: Url,
    view: ParameterView,
    search: Input,
    search_focused: bool,
    table_state: TableState,
    expanded: HashSet<String>,
    editor: Option<ValueEditor>,
}

impl ParametersScreen {
    /// Fails when the device has no usable `DeviceID.ID`.
    pub fn new(
        device: Device,
        ui_url: &Url,
        cache: Arc<ExpressionCache>,
        debounce: Duration,
    ) -> Result<Self, CoreError> {
        let device_id = device.id()?.to_owned();
        let csv_link = csv_url(ui_url, &device)?;

        let mut view = ParameterView::new(cache, debounce);
        view.render(&device)?;

        let mut screen = Self {
            action_tx: None,
            device,
            device_id,
            csv_link,
            view,
            search: Input::default(),
            search_focused: false,
            table_state: TableState::default(),
            expanded: HashSet::new(),
            editor: None,
        };
        screen.select(0);
        Ok(screen)
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn csv_link(&self) -> &Url {
        &self.csv_link
    }

    pub fn view(&self) -> &ParameterView {
        &self.view
    }

    fn selected_row(&self) -> Option<&ParameterRow> {
        let idx = self.table_state.selected()?;
        self.view.visible_rows().nth(idx)
    }

    pub fn selected_key(&self) -> Option<&str> {
        self.selected_row().map(|r| r.key.as_str())
    }

    fn select(&mut self, idx: usize) {
        let count = self.view.visible_count();
        if count == 0 {
            self.table_state.select(None);
        } else {
            self.table_state.select(Some(idx.min(count - 1)));
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let current = self.table_state.selected().unwrap_or(0);
        let next = if delta < 0 {
            current.saturating_sub(delta.unsigned_abs())
        } else {
            current.saturating_add(delta.unsigned_abs())
        };
        self.select(next);
    }

    /// Recompute rows, keeping the cursor on the same parameter if it is
    /// still visible.
    fn rerender(&mut self) -> Result<(), CoreError> {
        let selected = self.selected_key().map(str::to_owned);
        self.view.on_search_settled(&self.device)?;
        let idx = selected
            .and_then(|key| self.view.visible_rows().position(|r| r.key == key))
            .unwrap_or(0);
        self.select(idx);
        Ok(())
    }

    fn on_search_changed(&mut self) {
        let tx = self.action_tx.clone();
        self.view.on_search_input(self.search.value(), move || {
            if let Some(tx) = tx {
                let _ = tx.send(Action::SearchSettled);
            }
        });
    }

    fn control_action(&self, control: RowControl) -> Option<Action> {
        let row = self.selected_row()?;
        match row.task(control, &self.device_id) {
            Some(task) => Some(Action::QueueTask(task)),
            None => Some(Action::Notify(Notification::info(format!(
                "{}: not available for {}",
                control.title(),
                row.key
            )))),
        }
    }

    fn open_editor(&mut self) -> Option<Action> {
        let row = self.selected_row()?;
        if !row.has_control(RowControl::Edit) {
            return None;
        }
        if !row.writable {
            return Some(Action::Notify(Notification::info(format!(
                "{} is read-only",
                row.key
            ))));
        }
        let expression = row.expression.clone()?;
        let editor = ValueEditor::new(
            expression,
            row.value.as_deref(),
            row.value_type.as_deref(),
        );
        self.editor = Some(editor);
        None
    }

    fn toggle_expanded(&mut self) {
        let Some(key) = self.selected_key().map(str::to_owned) else {
            return;
        };
        if !self.expanded.remove(&key) {
            self.expanded.insert(key);
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) -> Option<Action> {
        let editor = self.editor.as_mut()?;
        match editor.handle_key(key) {
            EditorEvent::Pending => None,
            EditorEvent::Cancel => {
                self.editor = None;
                None
            }
            EditorEvent::Submit(value) => {
                let task = Task::set_value(
                    &self.device_id,
                    &editor.expression().to_string(),
                    &value,
                    editor.value_type(),
                );
                self.editor = None;
                Some(Action::QueueTask(task))
            }
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => self.search_focused = false,
            _ => {
                if text_input::apply(&mut self.search, key) {
                    self.on_search_changed();
                }
            }
        }
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let [link_area, search_area] =
            Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(area);

        let link = Line::from(vec![
            Span::styled(" Device ", theme::key_hint()),
            Span::styled(self.device_id.as_str(), theme::title_style()),
            Span::styled("   CSV ", theme::key_hint()),
            Span::styled(self.csv_link.as_str(), theme::link()),
        ]);
        frame.render_widget(Paragraph::new(link), link_area);

        let [label_area, input_area] =
            Layout::horizontal([Constraint::Length(9), Constraint::Min(1)]).areas(search_area);
        let label_style = if self.search_focused {
            theme::key_hint_key()
        } else {
            theme::key_hint()
        };
        frame.render_widget(Paragraph::new(Span::styled(" Search ", label_style)), label_area);

        if self.search.value().is_empty() && !self.search_focused {
            frame.render_widget(
                Paragraph::new(Span::styled("Search parameters", theme::key_hint())),
                input_area,
            );
        } else {
            text_input::render(
                frame,
                input_area,
                &self.search,
                Style::default().fg(theme::NEON_CYAN),
                self.search_focused && self.editor.is_none(),
            );
        }
    }

    fn render_table(&self, frame: &mut Frame, area: Rect) {
        let [key_width, value_width, controls_width] = column_widths(area.width);
        let widths = [
            Constraint::Length(key_width),
            Constraint::Length(value_width),
            Constraint::Length(controls_width),
        ];

        let header = Row::new(vec![
            Cell::from("Parameter").style(theme::table_header()),
            Cell::from("Value").style(theme::table_header()),
            Cell::from("").style(theme::table_header()),
        ]);

        let rows: Vec<Row> = self
            .view
            .visible_rows()
            .map(|row| {
                let value = row.value.as_deref().unwrap_or_default();
                let (key_lines, value_lines) = if self.expanded.contains(&row.key) {
                    (
                        long_text::wrap(&row.key, usize::from(key_width)),
                        long_text::wrap(value, usize::from(value_width)),
                    )
                } else {
                    (
                        vec![long_text::truncate(&row.key, usize::from(key_width)).into_owned()],
                        vec![long_text::truncate(value, usize::from(value_width)).into_owned()],
                    )
                };
                let height = key_lines.len().max(value_lines.len());
                let controls = row
                    .controls()
                    .into_iter()
                    .map(RowControl::glyph)
                    .collect::<Vec<_>>()
                    .join(" ");

                Row::new(vec![
                    Cell::from(key_lines.into_iter().collect::<Text>())
                        .style(theme::parameter_key()),
                    Cell::from(value_lines.into_iter().collect::<Text>())
                        .style(theme::parameter_value()),
                    Cell::from(controls).style(theme::control_glyph()),
                ])
                .height(u16::try_from(height).unwrap_or(u16::MAX))
                .style(theme::table_row())
            })
            .collect();

        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(COLUMN_SPACING)
            .row_highlight_style(theme::table_selected())
            .highlight_symbol(HIGHLIGHT_SYMBOL)
            .highlight_spacing(HighlightSpacing::Always);

        let mut state = self.table_state;
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect, row: &ParameterRow) {
        let block = Block::default()
            .borders(Borders::TOP)
            .border_style(theme::border_default());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let mut meta = vec![Span::styled(row.key.as_str(), theme::parameter_key())];
        if let Some(ref kind) = row.value_type {
            meta.push(Span::styled(format!("  {kind}"), theme::key_hint()));
        }
        if row.writable {
            meta.push(Span::styled("  writable", theme::key_hint()));
        }

        let lines = vec![
            Line::from(meta),
            Line::from(Span::styled(
                row.value.as_deref().unwrap_or_default(),
                theme::parameter_value(),
            )),
        ];
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
    }

    fn render_hints(frame: &mut Frame, area: Rect) {
        let hints = Line::from(vec![
            Span::styled("  / ", theme::key_hint_key()),
            Span::styled("search  ", theme::key_hint()),
            Span::styled("Enter ", theme::key_hint_key()),
            Span::styled("expand  ", theme::key_hint()),
            Span::styled("e ", theme::key_hint_key()),
            Span::styled("edit  ", theme::key_hint()),
            Span::styled("a ", theme::key_hint_key()),
            Span::styled("create  ", theme::key_hint()),
            Span::styled("d ", theme::key_hint_key()),
            Span::styled("delete  ", theme::key_hint()),
            Span::styled("r ", theme::key_hint_key()),
            Span::styled("refresh", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(hints), area);
    }
}

impl Component for ParametersScreen {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        self.action_tx = Some(action_tx);
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.editor.is_some() {
            return Ok(self.handle_editor_key(key));
        }
        if self.search_focused {
            self.handle_search_key(key);
            return Ok(None);
        }

        let action = match key.code {
            KeyCode::Char('/') => {
                self.search_focused = true;
                None
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.move_selection(1);
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.move_selection(-1);
                None
            }
            KeyCode::Char('g') | KeyCode::Home => {
                self.select(0);
                None
            }
            KeyCode::Char('G') | KeyCode::End => {
                self.select(usize::MAX);
                None
            }
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.move_selection(PAGE);
                None
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.move_selection(-PAGE);
                None
            }
            KeyCode::PageDown => {
                self.move_selection(PAGE);
                None
            }
            KeyCode::PageUp => {
                self.move_selection(-PAGE);
                None
            }
            KeyCode::Enter => {
                self.toggle_expanded();
                None
            }
            KeyCode::Char('e') => self.open_editor(),
            KeyCode::Char('a') => self.control_action(RowControl::AddInstance),
            KeyCode::Char('d') => self.control_action(RowControl::DeleteInstance),
            KeyCode::Char('r') => self.control_action(RowControl::Refresh),
            _ => None,
        };
        Ok(action)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        if let Action::SearchSettled = action {
            debug!(search = %self.view.search(), "search settled");
            if let Err(e) = self.rerender() {
                return Ok(Some(Action::Notify(Notification::error(e.to_string()))));
            }
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let title = format!(
            " Parameters ({}/{}) ",
            self.view.visible_count(),
            self.view.rows().len()
        );
        let block = Block::default()
            .title(title)
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.search_focused {
                theme::border_default()
            } else {
                theme::border_focused()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let expanded_row = self
            .selected_row()
            .filter(|row| self.expanded.contains(&row.key));
        let detail_height = if expanded_row.is_some() { 5 } else { 0 };

        let [header_area, table_area, detail_area, hint_area] = Layout::vertical([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(detail_height),
            Constraint::Length(1),
        ])
        .areas(inner);

        self.render_header(frame, header_area);
        self.render_table(frame, table_area);
        if let Some(row) = expanded_row {
            self.render_detail(frame, detail_area, row);
        }
        Self::render_hints(frame, hint_area);

        if let Some(ref editor) = self.editor {
            editor.render(frame, area);
        }
    }

    fn captures_input(&self) -> bool {
        self.search_focused || self.editor.is_some()
    }
}
