//! Popup for typing a new value into a writable scalar parameter.

use std::sync::Arc;

use acsparam_core::Expression;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use tui_input::Input;

use crate::theme;
use crate::widgets::text_input;

/// What the editor wants the screen to do after a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    Pending,
    Cancel,
    Submit(String),
}

/// Addressed by the parameter's parsed expression, not its raw key.
#[derive(Debug)]
pub struct ValueEditor {
    expression: Arc<Expression>,
    value_type: String,
    input: Input,
}

impl ValueEditor {
    pub fn new(
        expression: Arc<Expression>,
        current: Option<&str>,
        value_type: Option<&str>,
    ) -> Self {
        Self {
            expression,
            value_type: value_type.unwrap_or("xsd:string").to_owned(),
            input: Input::new(current.unwrap_or_default().to_owned()),
        }
    }

    pub fn expression(&self) -> &Arc<Expression> {
        &self.expression
    }

    pub fn value_type(&self) -> &str {
        &self.value_type
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> EditorEvent {
        match key.code {
            KeyCode::Esc => EditorEvent::Cancel,
            KeyCode::Enter => EditorEvent::Submit(self.input.value().to_owned()),
            _ => {
                text_input::apply(&mut self.input, key);
                EditorEvent::Pending
            }
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let width = 64u16.min(area.width.saturating_sub(4));
        let height = 6u16.min(area.height);
        let popup = Rect::new(
            area.x + area.width.saturating_sub(width) / 2,
            area.y + area.height.saturating_sub(height) / 2,
            width,
            height,
        );

        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title(" Edit value ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused())
            .style(Style::default().bg(theme::BG_DARK));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let [key_area, input_area, hint_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(inner);

        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(self.expression.to_string(), theme::parameter_key()),
                Span::styled(format!("  ({})", self.value_type), theme::key_hint()),
            ])),
            key_area,
        );

        text_input::render(frame, input_area, &self.input, theme::parameter_value(), true);

        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled("Enter ", theme::key_hint_key()),
                Span::styled("apply  ", theme::key_hint()),
                Span::styled("Esc ", theme::key_hint_key()),
                Span::styled("cancel", theme::key_hint()),
            ])),
            hint_area,
        );
    }
}
