use chrono::{DateTime, Local};
use crossterm::event::Event;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use tracing::debug;

use crate::app::{AppCommand, AppEvent};
use crate::fetch::{FetchMessage, FetchRequest, Payload, Query};
use crate::input::{Action, map_key, map_log_key};
use crate::model::{
    ContainerItem, LevelKind, LogTarget, NamespaceItem, PodItem, SelectableList, TerminalSize,
    Ticket, order_containers,
};
use crate::ui::{ACCENT, ERROR, KIND_TAG, MUTED};
use crate::viewport::LogViewport;

const LIST_HINT: &str = "q quit  r refresh  enter/l open  h back";
const ROOT_HINT: &str = "q quit  r refresh  enter/l open";
const LOG_HINT: &str = "q quit  h back  j/k scroll  f/b page  g/G top/bottom";

/// Per-session state threaded through every transition.
#[derive(Debug, Clone)]
pub struct NavContext {
    size: TerminalSize,
    next_ticket: u64,
}

impl NavContext {
    pub fn new(size: TerminalSize) -> Self {
        Self {
            size,
            next_ticket: 1,
        }
    }

    pub fn size(&self) -> TerminalSize {
        self.size
    }

    pub fn set_size(&mut self, size: TerminalSize) {
        self.size = size;
    }

    pub fn request(&mut self, query: Query) -> FetchRequest {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        FetchRequest { ticket, query }
    }
}

/// One rendered frame of a level, independent of the terminal backend.
#[derive(Debug, Clone)]
pub struct Screen {
    pub title: String,
    pub path: Vec<String>,
    pub text: Text<'static>,
    /// First line of the selected entry and how many lines it spans.
    pub cursor: Option<(usize, usize)>,
    pub status: Option<String>,
    pub hint: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Level {
    Namespaces(NamespaceLevel),
    Pods(PodLevel),
    Containers(ContainerLevel),
    Logs(LogLevel),
}

impl Default for Level {
    fn default() -> Self {
        Self::Namespaces(NamespaceLevel::default())
    }
}

impl Level {
    pub fn kind(&self) -> LevelKind {
        match self {
            Self::Namespaces(_) => LevelKind::Namespaces,
            Self::Pods(_) => LevelKind::Pods,
            Self::Containers(_) => LevelKind::Containers,
            Self::Logs(_) => LevelKind::Logs,
        }
    }

    /// Depth of the back-reference chain below this level.
    pub fn depth(&self) -> usize {
        match self {
            Self::Namespaces(_) => 0,
            Self::Pods(_) => 1,
            Self::Containers(_) => 2,
            Self::Logs(_) => 3,
        }
    }

    pub fn init(&mut self, ctx: &mut NavContext) -> AppCommand {
        match self {
            Self::Namespaces(level) => level.init(ctx),
            Self::Pods(level) => level.init(ctx),
            Self::Containers(level) => level.init(ctx),
            Self::Logs(level) => level.init(ctx),
        }
    }

    pub fn handle(self, event: AppEvent, ctx: &mut NavContext) -> (Level, AppCommand) {
        match self {
            Self::Namespaces(level) => level.handle(event, ctx),
            Self::Pods(level) => level.handle(event, ctx),
            Self::Containers(level) => level.handle(event, ctx),
            Self::Logs(level) => level.handle(event, ctx),
        }
    }

    pub fn render(&self) -> Screen {
        match self {
            Self::Namespaces(level) => level.render(),
            Self::Pods(level) => level.render(),
            Self::Containers(level) => level.render(),
            Self::Logs(level) => level.render(),
        }
    }
}

fn enter(mut level: Level, ctx: &mut NavContext) -> (Level, AppCommand) {
    let command = level.init(ctx);
    debug!("entered {} level", level.kind());
    (level, command)
}

fn absorb<T>(
    list: &mut SelectableList<T>,
    kind: LevelKind,
    ticket: Ticket,
    result: Result<Vec<T>, String>,
    fetched_at: DateTime<Local>,
) {
    if !list.apply(ticket, result, fetched_at) {
        debug!("discarding stale {kind} completion {ticket}");
    }
}

fn discard(active: LevelKind, ticket: Ticket, payload: &Payload) {
    debug!(
        "discarding {} completion {ticket} while {active} is active",
        payload.kind()
    );
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamespaceLevel {
    list: SelectableList<NamespaceItem>,
}

impl NamespaceLevel {
    #[cfg(test)]
    pub fn list(&self) -> &SelectableList<NamespaceItem> {
        &self.list
    }

    fn init(&mut self, ctx: &mut NavContext) -> AppCommand {
        let request = ctx.request(Query::Namespaces);
        self.list.begin_fetch(request.ticket);
        AppCommand::Fetch(request)
    }

    fn handle(mut self, event: AppEvent, ctx: &mut NavContext) -> (Level, AppCommand) {
        match event {
            AppEvent::Fetched(FetchMessage {
                ticket,
                fetched_at,
                payload,
            }) => match payload {
                Payload::Namespaces(result) => absorb(
                    &mut self.list,
                    LevelKind::Namespaces,
                    ticket,
                    result,
                    fetched_at,
                ),
                other => discard(LevelKind::Namespaces, ticket, &other),
            },
            AppEvent::Key(key) => match map_key(key) {
                Some(Action::Quit) => return (Level::Namespaces(self), AppCommand::Quit),
                Some(Action::Up) => self.list.move_cursor(-1),
                Some(Action::Down) => self.list.move_cursor(1),
                Some(Action::Refresh) => {
                    debug!("restarting from a fresh namespace list");
                    return enter(Level::Namespaces(NamespaceLevel::default()), ctx);
                }
                Some(Action::Select) => {
                    if let Some(namespace) = self.list.selected().map(|item| item.name.clone()) {
                        let child = PodLevel::new(Box::new(self), namespace);
                        return enter(Level::Pods(child), ctx);
                    }
                }
                Some(Action::Back) | None => {}
            },
            AppEvent::Resize(_) => {}
        }
        (Level::Namespaces(self), AppCommand::None)
    }

    fn render(&self) -> Screen {
        let mut lines = self
            .list
            .items()
            .iter()
            .enumerate()
            .map(|(index, namespace)| {
                let mut spans = cursor_spans(index == self.list.cursor(), &namespace.name);
                spans.push(Span::styled(
                    format!("  {} · {}", namespace.phase, namespace.age),
                    Style::default().fg(MUTED),
                ));
                Line::from(spans)
            })
            .collect::<Vec<_>>();
        push_list_state(&mut lines, &self.list, "Retrieving Namespaces");

        Screen {
            title: "Select Namespace".to_string(),
            path: Vec::new(),
            text: Text::from(lines),
            cursor: list_cursor(&self.list, 1),
            status: refreshed_status(&self.list),
            hint: ROOT_HINT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodLevel {
    parent: Box<NamespaceLevel>,
    namespace: String,
    list: SelectableList<PodItem>,
}

impl PodLevel {
    pub fn new(parent: Box<NamespaceLevel>, namespace: String) -> Self {
        Self {
            parent,
            namespace,
            list: SelectableList::default(),
        }
    }

    #[cfg(test)]
    pub fn list(&self) -> &SelectableList<PodItem> {
        &self.list
    }

    fn init(&mut self, ctx: &mut NavContext) -> AppCommand {
        let request = ctx.request(Query::Pods {
            namespace: self.namespace.clone(),
        });
        self.list.begin_fetch(request.ticket);
        AppCommand::Fetch(request)
    }

    fn handle(mut self, event: AppEvent, ctx: &mut NavContext) -> (Level, AppCommand) {
        match event {
            AppEvent::Fetched(FetchMessage {
                ticket,
                fetched_at,
                payload,
            }) => match payload {
                Payload::Pods(result) => absorb(
                    &mut self.list,
                    LevelKind::Pods,
                    ticket,
                    result,
                    fetched_at,
                ),
                other => discard(LevelKind::Pods, ticket, &other),
            },
            AppEvent::Key(key) => match map_key(key) {
                Some(Action::Quit) => return (Level::Pods(self), AppCommand::Quit),
                Some(Action::Up) => self.list.move_cursor(-1),
                Some(Action::Down) => self.list.move_cursor(1),
                Some(Action::Refresh) => {
                    let command = self.init(ctx);
                    return (Level::Pods(self), command);
                }
                Some(Action::Select) => {
                    if let Some(pod) = self.list.selected().cloned() {
                        let namespace = self.namespace.clone();
                        let child = ContainerLevel::new(Box::new(self), namespace, pod);
                        return enter(Level::Containers(child), ctx);
                    }
                }
                Some(Action::Back) => {
                    debug!("leaving pods of {}", self.namespace);
                    return (Level::Namespaces(*self.parent), AppCommand::None);
                }
                None => {}
            },
            AppEvent::Resize(_) => {}
        }
        (Level::Pods(self), AppCommand::None)
    }

    fn render(&self) -> Screen {
        let mut lines = self
            .list
            .items()
            .iter()
            .enumerate()
            .map(|(index, pod)| {
                let mut spans = cursor_spans(index == self.list.cursor(), &pod.name);
                spans.push(Span::styled(
                    format!(
                        "  {} · {}/{} ready · {} restarts · {} · {}",
                        pod.phase,
                        pod.ready,
                        pod.total,
                        pod.restarts,
                        container_summary(pod),
                        pod.age
                    ),
                    Style::default().fg(MUTED),
                ));
                Line::from(spans)
            })
            .collect::<Vec<_>>();
        push_list_state(&mut lines, &self.list, "Retrieving Pods");

        Screen {
            title: "Select Pod".to_string(),
            path: vec![self.namespace.clone()],
            text: Text::from(lines),
            cursor: list_cursor(&self.list, 1),
            status: refreshed_status(&self.list),
            hint: LIST_HINT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerLevel {
    parent: Box<PodLevel>,
    namespace: String,
    pod: PodItem,
    list: SelectableList<ContainerItem>,
}

impl ContainerLevel {
    pub fn new(parent: Box<PodLevel>, namespace: String, pod: PodItem) -> Self {
        Self {
            parent,
            namespace,
            pod,
            list: SelectableList::default(),
        }
    }

    #[cfg(test)]
    pub fn list(&self) -> &SelectableList<ContainerItem> {
        &self.list
    }

    fn init(&mut self, ctx: &mut NavContext) -> AppCommand {
        let request = ctx.request(Query::Containers {
            pod: self.pod.clone(),
        });
        self.list.begin_fetch(request.ticket);
        AppCommand::Fetch(request)
    }

    fn handle(mut self, event: AppEvent, ctx: &mut NavContext) -> (Level, AppCommand) {
        match event {
            AppEvent::Fetched(FetchMessage {
                ticket,
                fetched_at,
                payload,
            }) => match payload {
                Payload::Containers(result) => absorb(
                    &mut self.list,
                    LevelKind::Containers,
                    ticket,
                    result.map(order_containers),
                    fetched_at,
                ),
                other => discard(LevelKind::Containers, ticket, &other),
            },
            AppEvent::Key(key) => match map_key(key) {
                Some(Action::Quit) => return (Level::Containers(self), AppCommand::Quit),
                Some(Action::Up) => self.list.move_cursor(-1),
                Some(Action::Down) => self.list.move_cursor(1),
                Some(Action::Refresh) => {
                    let command = self.init(ctx);
                    return (Level::Containers(self), command);
                }
                Some(Action::Select) => {
                    if let Some(container) = self.list.selected().map(|item| item.name.clone()) {
                        let target = LogTarget {
                            namespace: self.namespace.clone(),
                            pod: self.pod.name.clone(),
                            container,
                        };
                        let child = LogLevel::new(Box::new(self), target);
                        return enter(Level::Logs(child), ctx);
                    }
                }
                Some(Action::Back) => {
                    debug!("leaving containers of {}/{}", self.namespace, self.pod.name);
                    return (Level::Pods(*self.parent), AppCommand::None);
                }
                None => {}
            },
            AppEvent::Resize(_) => {}
        }
        (Level::Containers(self), AppCommand::None)
    }

    fn render(&self) -> Screen {
        let mut lines = Vec::new();
        for (index, container) in self.list.items().iter().enumerate() {
            let mut spans = cursor_spans(index == self.list.cursor(), &container.name);
            spans.push(Span::styled(
                format!("  {} · {}", container.state, container.image),
                Style::default().fg(MUTED),
            ));
            lines.push(Line::from(spans));
            lines.push(Line::from(Span::styled(
                format!("    {}", container.kind.label()),
                Style::default().fg(KIND_TAG),
            )));
        }
        push_list_state(&mut lines, &self.list, "Retrieving Containers");

        Screen {
            title: "Select Container".to_string(),
            path: vec![self.namespace.clone(), self.pod.name.clone()],
            text: Text::from(lines),
            cursor: list_cursor(&self.list, 2),
            status: refreshed_status(&self.list),
            hint: LIST_HINT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLevel {
    parent: Box<ContainerLevel>,
    target: LogTarget,
    pending: Option<Ticket>,
    viewport: Option<LogViewport>,
}

impl LogLevel {
    pub fn new(parent: Box<ContainerLevel>, target: LogTarget) -> Self {
        Self {
            parent,
            target,
            pending: None,
            viewport: None,
        }
    }

    #[cfg(test)]
    pub fn viewport(&self) -> Option<&LogViewport> {
        self.viewport.as_ref()
    }

    fn init(&mut self, ctx: &mut NavContext) -> AppCommand {
        let request = ctx.request(Query::Logs {
            target: self.target.clone(),
        });
        self.pending = Some(request.ticket);
        AppCommand::Fetch(request)
    }

    fn handle(mut self, event: AppEvent, ctx: &mut NavContext) -> (Level, AppCommand) {
        match event {
            AppEvent::Fetched(FetchMessage {
                ticket, payload, ..
            }) => match payload {
                Payload::Logs(text) if self.pending == Some(ticket) => {
                    let body = ctx.size().body();
                    let mut viewport = LogViewport::new(body.width, body.height);
                    viewport.set_content(&text);
                    debug!(
                        "log view ready for {} ({} lines)",
                        self.target,
                        viewport.line_count()
                    );
                    self.pending = None;
                    self.viewport = Some(viewport);
                }
                other => discard(LevelKind::Logs, ticket, &other),
            },
            AppEvent::Key(key) => match map_log_key(key) {
                Some(Action::Quit) => return (Level::Logs(self), AppCommand::Quit),
                Some(Action::Back) => {
                    debug!("leaving logs of {}", self.target);
                    return (Level::Containers(*self.parent), AppCommand::None);
                }
                _ => {
                    if let Some(viewport) = self.viewport.as_mut() {
                        viewport.handle(&Event::Key(key));
                    }
                }
            },
            AppEvent::Resize(_) => {
                if let Some(viewport) = self.viewport.as_mut() {
                    let body = ctx.size().body();
                    viewport.handle(&Event::Resize(body.width, body.height));
                }
            }
        }
        (Level::Logs(self), AppCommand::None)
    }

    fn render(&self) -> Screen {
        let path = vec![
            self.target.namespace.clone(),
            self.target.pod.clone(),
            self.target.container.clone(),
        ];
        let title = format!("Logs {}", self.target);
        match self.viewport.as_ref() {
            Some(viewport) => Screen {
                title,
                path,
                text: viewport.render(),
                cursor: None,
                status: Some(format!(
                    "{} lines · {}%",
                    viewport.line_count(),
                    viewport.scroll_percent()
                )),
                hint: LOG_HINT,
            },
            None => Screen {
                title,
                path,
                text: Text::from("Retrieving logs ..."),
                cursor: None,
                status: None,
                hint: LOG_HINT,
            },
        }
    }
}

fn container_summary(pod: &PodItem) -> String {
    let regular = match pod.containers.len() {
        1 => "1 container".to_string(),
        count => format!("{count} containers"),
    };
    match pod.init_containers.len() {
        0 => regular,
        init => format!("{regular} + {init} init"),
    }
}

fn cursor_spans(selected: bool, name: &str) -> Vec<Span<'static>> {
    if selected {
        vec![
            Span::styled("> ", Style::default().fg(ACCENT)),
            Span::styled(
                name.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]
    } else {
        vec![Span::raw("  "), Span::raw(name.to_string())]
    }
}

fn push_list_state<T>(lines: &mut Vec<Line<'static>>, list: &SelectableList<T>, placeholder: &str) {
    if let Some(error) = list.error() {
        lines.push(Line::from(""));
        for (index, line) in error.lines().enumerate() {
            let text = if index == 0 {
                format!("Error: {line}")
            } else {
                format!("       {line}")
            };
            lines.push(Line::from(Span::styled(text, Style::default().fg(ERROR))));
        }
        lines.push(Line::from(Span::styled(
            "Press r to retry",
            Style::default().fg(MUTED),
        )));
        return;
    }

    if !list.populated() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            placeholder.to_string(),
            Style::default().fg(MUTED),
        )));
    } else if list.items().is_empty() {
        lines.push(Line::from(Span::styled(
            "Nothing here",
            Style::default().fg(MUTED),
        )));
    }
}

fn list_cursor<T>(list: &SelectableList<T>, lines_per_item: usize) -> Option<(usize, usize)> {
    list.items()
        .get(list.cursor())
        .map(|_| (list.cursor() * lines_per_item, lines_per_item))
}

fn refreshed_status<T>(list: &SelectableList<T>) -> Option<String> {
    if list.pending().is_some() {
        return Some("refreshing…".to_string());
    }
    list.refreshed_at()
        .map(|at| format!("refreshed {}", at.format("%H:%M:%S")))
}
