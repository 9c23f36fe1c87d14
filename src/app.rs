use crossterm::event::KeyEvent;
use tracing::{debug, info};

use crate::fetch::{FetchMessage, FetchRequest};
use crate::level::{Level, NavContext, Screen};
use crate::model::TerminalSize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Resize(TerminalSize),
    Key(KeyEvent),
    Fetched(FetchMessage),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    Quit,
    Fetch(FetchRequest),
}

pub struct App {
    running: bool,
    started: bool,
    level: Level,
    ctx: NavContext,
    cluster: String,
    context: String,
}

impl App {
    pub fn new(cluster: String, context: String, size: TerminalSize) -> Self {
        Self {
            running: true,
            started: false,
            level: Level::default(),
            ctx: NavContext::new(size),
            cluster,
            context,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    #[cfg(test)]
    pub fn size(&self) -> TerminalSize {
        self.ctx.size()
    }

    #[cfg(test)]
    pub fn level(&self) -> &Level {
        &self.level
    }

    /// Issues the root level's initial fetch. Only the first call does anything.
    pub fn start(&mut self) -> Option<FetchRequest> {
        if self.started {
            return None;
        }
        self.started = true;
        let command = self.level.init(&mut self.ctx);
        self.apply_command(command)
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Option<FetchRequest> {
        if !self.running {
            debug!("session finished, dropping event");
            return None;
        }

        if let AppEvent::Resize(size) = &event {
            self.ctx.set_size(*size);
        }

        let previous = self.level.kind();
        let level = std::mem::take(&mut self.level);
        let (next, command) = level.handle(event, &mut self.ctx);
        if next.kind() != previous {
            info!(
                "navigated {previous} -> {} (depth {})",
                next.kind(),
                next.depth()
            );
        }
        self.level = next;
        self.apply_command(command)
    }

    pub fn screen(&self) -> Screen {
        self.level.render()
    }

    fn apply_command(&mut self, command: AppCommand) -> Option<FetchRequest> {
        match command {
            AppCommand::None => None,
            AppCommand::Quit => {
                info!("quit requested from {} level", self.level.kind());
                self.running = false;
                None
            }
            AppCommand::Fetch(request) => Some(request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{App, AppEvent};
    use crate::fetch::{FetchMessage, Payload, Query};
    use crate::model::{LevelKind, NamespaceItem, TerminalSize};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn app() -> App {
        App::new(
            "https://cluster".to_string(),
            "kind-dev".to_string(),
            TerminalSize::new(80, 24),
        )
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn namespaces(names: &[&str]) -> Payload {
        Payload::Namespaces(Ok(names
            .iter()
            .map(|name| NamespaceItem {
                name: name.to_string(),
                ..NamespaceItem::default()
            })
            .collect()))
    }

    #[test]
    fn start_issues_root_fetch_once() {
        let mut app = app();
        let request = app.start().expect("root fetch");
        assert_eq!(request.query, Query::Namespaces);
        assert!(app.start().is_none());
    }

    #[test]
    fn resize_updates_terminal_dimensions() {
        let mut app = app();
        app.start();
        let request = app.handle_event(AppEvent::Resize(TerminalSize::new(132, 43)));
        assert!(request.is_none());
        assert_eq!(app.size(), TerminalSize::new(132, 43));
        assert_eq!(app.level().kind(), LevelKind::Namespaces);
    }

    #[test]
    fn completion_is_applied_before_next_render() {
        let mut app = app();
        let request = app.start().expect("root fetch");
        app.handle_event(AppEvent::Fetched(FetchMessage::new(
            request.ticket,
            namespaces(&["default", "kube-system"]),
        )));
        let screen = app.screen();
        let text = screen
            .text
            .lines
            .iter()
            .map(|line| line.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(text.contains("> default"));
        assert!(text.contains("  kube-system"));
        assert!(!text.contains("Retrieving"));
    }

    #[test]
    fn drilling_hands_child_fetch_to_caller() {
        let mut app = app();
        let request = app.start().expect("root fetch");
        app.handle_event(AppEvent::Fetched(FetchMessage::new(
            request.ticket,
            namespaces(&["a", "b"]),
        )));
        app.handle_event(key(KeyCode::Char('j')));
        let child = app.handle_event(key(KeyCode::Enter)).expect("pods fetch");
        assert_eq!(
            child.query,
            Query::Pods {
                namespace: "b".to_string()
            }
        );
        assert_eq!(app.level().kind(), LevelKind::Pods);
        assert_eq!(app.screen().path, vec!["b".to_string()]);
    }

    #[test]
    fn quit_stops_processing_further_events() {
        let mut app = app();
        let request = app.start().expect("root fetch");
        app.handle_event(key(KeyCode::Char('q')));
        assert!(!app.running());

        app.handle_event(AppEvent::Fetched(FetchMessage::new(
            request.ticket,
            namespaces(&["late"]),
        )));
        let text = app.screen().text.lines.len();
        assert!(app.handle_event(key(KeyCode::Char('r'))).is_none());
        assert_eq!(app.screen().text.lines.len(), text);
        assert_eq!(app.level().kind(), LevelKind::Namespaces);
        match app.level() {
            crate::level::Level::Namespaces(level) => assert!(!level.list().populated()),
            other => panic!("unexpected level {:?}", other.kind()),
        }
    }

    #[test]
    fn ctrl_c_quits() {
        let mut app = app();
        app.start();
        app.handle_event(AppEvent::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        )));
        assert!(!app.running());
    }
}
