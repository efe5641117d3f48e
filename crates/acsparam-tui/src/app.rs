//! Application core: event loop, action dispatch, status bar, help.

use std::time::Duration;

use acsparam_core::{DeliveryStatus, TaskOutcome, TaskQueue};
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::action::{Action, Notification, NotificationLevel};
use crate::component::Component;
use crate::event::{Event, EventReader};
use crate::theme;
use crate::tui::Tui;

/// Where queued tasks end up, for the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkLabel {
    Nbi(String),
    Staged,
}

pub struct App {
    screen: Box<dyn Component>,
    queue: TaskQueue,
    sink: SinkLabel,
    running: bool,
    help_visible: bool,
    in_flight: usize,
    notification: Option<Notification>,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
}

impl App {
    pub fn new(screen: Box<dyn Component>, queue: TaskQueue, sink: SinkLabel) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        Self {
            screen,
            queue,
            sink,
            running: true,
            help_visible: false,
            in_flight: 0,
            notification: None,
            action_tx,
            action_rx,
        }
    }

    /// Sender for background tasks that feed actions into the loop.
    pub fn action_sender(&self) -> mpsc::UnboundedSender<Action> {
        self.action_tx.clone()
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;
        self.screen.init(self.action_tx.clone())?;

        let mut events = EventReader::new(Duration::from_millis(33));
        info!("event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => self.action_tx.send(Action::Resize(w, h))?,
                Event::Render => self.action_tx.send(Action::Render)?,
            }

            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;
                if matches!(action, Action::Render | Action::Resize(..)) {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        events.stop();
        info!("event loop ended");
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(Some(Action::Quit));
        }

        if self.screen.captures_input() {
            return self.screen.handle_key_event(key);
        }

        if self.help_visible {
            return Ok(match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Some(Action::ToggleHelp),
                _ => None,
            });
        }

        match key.code {
            KeyCode::Char('q') => Ok(Some(Action::Quit)),
            KeyCode::Char('?') => Ok(Some(Action::ToggleHelp)),
            _ => self.screen.handle_key_event(key),
        }
    }

    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => self.running = false,

            Action::Render | Action::Resize(..) => {}

            Action::ToggleHelp => self.help_visible = !self.help_visible,

            Action::Notify(notification) => self.notification = Some(notification.clone()),

            Action::QueueTask(task) => {
                debug!(task = task.name(), object = %task.target(), "queueing task");
                self.queue.queue_task(task.clone());
                self.in_flight += 1;
                self.notification = Some(Notification::info(format!(
                    "{} {} queued",
                    task.name(),
                    task.target()
                )));
            }

            Action::TaskFinished(outcome) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.notification = Some(outcome_notification(outcome));
            }

            other => {
                if let Some(follow_up) = self.screen.update(other)? {
                    self.action_tx.send(follow_up)?;
                }
            }
        }
        Ok(())
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let [content, status] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(area);

        self.screen.render(frame, content);
        self.render_status_bar(frame, status);

        if self.help_visible {
            render_help_overlay(frame, area);
        }
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let sink = match &self.sink {
            SinkLabel::Nbi(url) => {
                Span::styled(format!("● {url}"), Style::default().fg(theme::SUCCESS_GREEN))
            }
            SinkLabel::Staged => {
                Span::styled("○ staged", Style::default().fg(theme::ELECTRIC_YELLOW))
            }
        };

        let mut spans = vec![Span::raw(" "), sink];
        if self.in_flight > 0 {
            spans.push(Span::styled(
                format!("  {} pending", self.in_flight),
                Style::default().fg(theme::ELECTRIC_YELLOW),
            ));
        }
        if let Some(ref n) = self.notification {
            let color = match n.level {
                NotificationLevel::Info => theme::DIM_WHITE,
                NotificationLevel::Success => theme::SUCCESS_GREEN,
                NotificationLevel::Error => theme::ERROR_RED,
            };
            spans.push(Span::styled(" │ ", theme::key_hint()));
            spans.push(Span::styled(n.message.as_str(), Style::default().fg(color)));
        }
        spans.push(Span::styled(" │ ? help  q quit", theme::key_hint()));

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

fn outcome_notification(outcome: &TaskOutcome) -> Notification {
    match outcome {
        TaskOutcome::Delivered { task, status } => {
            let verb = match status {
                DeliveryStatus::Completed => "completed",
                DeliveryStatus::Queued => "queued on ACS",
                DeliveryStatus::Staged => "staged",
            };
            Notification::success(format!("{} {} {verb}", task.name(), task.target()))
        }
        TaskOutcome::Failed { task, error } => {
            Notification::error(format!("{} {} failed: {error}", task.name(), task.target()))
        }
    }
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let width = 52u16.min(area.width.saturating_sub(4));
    let height = 18u16.min(area.height.saturating_sub(2));
    let help_area = Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    );

    frame.render_widget(Clear, help_area);

    let block = Block::default()
        .title(" Keyboard Shortcuts ")
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border_focused())
        .style(Style::default().bg(theme::BG_DARK));
    let inner = block.inner(help_area);
    frame.render_widget(block, help_area);

    let entry = |keys: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {keys:<10}"), theme::key_hint_key()),
            Span::styled(what, theme::key_hint()),
        ])
    };

    let lines = vec![
        Line::from(""),
        entry("j/k ↑/↓", "Move up/down"),
        entry("g/G", "Top / bottom"),
        entry("Ctrl+d/u", "Page down / up"),
        entry("Enter", "Expand / collapse key and value"),
        entry("/", "Search (Esc to leave)"),
        Line::from(""),
        entry("e", "Edit value"),
        entry("a", "Create a new instance"),
        entry("d", "Delete this instance"),
        entry("r", "Refresh tree"),
        Line::from(""),
        entry("?", "This help"),
        entry("q", "Quit"),
        Line::from(""),
        Line::from(Span::styled("              Esc or ? to close", theme::key_hint())),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use acsparam_core::Task;
    use pretty_assertions::assert_eq;

    use super::*;

    /// Screen that records the actions routed to it.
    struct Probe {
        seen: Vec<Action>,
        capturing: bool,
    }

    impl Component for Probe {
        fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
            Ok(match key.code {
                KeyCode::Char('x') => Some(Action::QueueTask(Task::refresh("D", "Device."))),
                _ => None,
            })
        }

        fn update(&mut self, action: &Action) -> Result<Option<Action>> {
            self.seen.push(action.clone());
            Ok(None)
        }

        fn render(&self, _frame: &mut Frame, _area: Rect) {}

        fn captures_input(&self) -> bool {
            self.capturing
        }
    }

    fn app(capturing: bool) -> (App, mpsc::UnboundedReceiver<Task>) {
        let (queue, rx) = TaskQueue::channel();
        let probe = Probe {
            seen: Vec::new(),
            capturing,
        };
        (App::new(Box::new(probe), queue, SinkLabel::Staged), rx)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn global_keys() {
        let (mut app, _rx) = app(false);
        assert_eq!(app.handle_key_event(key(KeyCode::Char('q'))).unwrap(), Some(Action::Quit));
        assert_eq!(
            app.handle_key_event(key(KeyCode::Char('?'))).unwrap(),
            Some(Action::ToggleHelp)
        );
        assert_eq!(
            app.handle_key_event(key(KeyCode::Char('x'))).unwrap(),
            Some(Action::QueueTask(Task::refresh("D", "Device.")))
        );
    }

    #[test]
    fn text_entry_suspends_global_keys() {
        let (mut app, _rx) = app(true);
        assert_eq!(app.handle_key_event(key(KeyCode::Char('q'))).unwrap(), None);
        assert_eq!(
            app.handle_key_event(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))
                .unwrap(),
            Some(Action::Quit)
        );
    }

    #[test]
    fn queued_tasks_reach_the_dispatcher() {
        let (mut app, mut rx) = app(false);
        let task = Task::delete_object("00259E-X-0000", "Device.WiFi.1");
        app.process_action(&Action::QueueTask(task.clone())).unwrap();

        assert_eq!(rx.try_recv().unwrap(), task);
        assert_eq!(app.in_flight, 1);

        app.process_action(&Action::TaskFinished(TaskOutcome::Failed {
            task,
            error: "Device not found".into(),
        }))
        .unwrap();
        assert_eq!(app.in_flight, 0);
        let n = app.notification.clone().unwrap();
        assert_eq!(n.level, NotificationLevel::Error);
        assert!(n.message.contains("Device not found"));
    }

    #[test]
    fn help_swallows_keys_until_closed() {
        let (mut app, _rx) = app(false);
        app.process_action(&Action::ToggleHelp).unwrap();
        assert_eq!(app.handle_key_event(key(KeyCode::Char('x'))).unwrap(), None);
        assert_eq!(
            app.handle_key_event(key(KeyCode::Esc)).unwrap(),
            Some(Action::ToggleHelp)
        );
    }

    #[test]
    fn quit_stops_the_loop() {
        let (mut app, _rx) = app(false);
        app.process_action(&Action::Quit).unwrap();
        assert!(!app.running);
    }
}
