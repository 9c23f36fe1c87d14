use chrono::{DateTime, Local};
use std::fmt::{Display, Formatter};

/// Rows taken by the header, footer and panel borders around the body.
pub const CHROME_ROWS: u16 = 4;
/// Columns taken by the panel borders.
pub const CHROME_COLUMNS: u16 = 2;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct TerminalSize {
    pub width: u16,
    pub height: u16,
}

impl TerminalSize {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Area left for level content once the chrome is drawn.
    pub fn body(self) -> Self {
        Self {
            width: self.width.saturating_sub(CHROME_COLUMNS).max(1),
            height: self.height.saturating_sub(CHROME_ROWS).max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum LevelKind {
    Namespaces,
    Pods,
    Containers,
    Logs,
}

impl LevelKind {
    pub fn title(self) -> &'static str {
        match self {
            Self::Namespaces => "Namespaces",
            Self::Pods => "Pods",
            Self::Containers => "Containers",
            Self::Logs => "Logs",
        }
    }
}

impl Display for LevelKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// Generation tag attached to every fetch and echoed by its completion.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ticket(pub u64);

impl Display for Ticket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct NamespaceItem {
    pub name: String,
    pub phase: String,
    pub age: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct PodItem {
    pub name: String,
    pub namespace: String,
    pub phase: String,
    pub ready: usize,
    pub total: usize,
    pub restarts: i32,
    pub age: String,
    pub init_containers: Vec<String>,
    pub containers: Vec<String>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ContainerKind {
    Init,
    Regular,
}

impl ContainerKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Init => "init container",
            Self::Regular => "container",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ContainerItem {
    pub name: String,
    pub kind: ContainerKind,
    pub image: String,
    pub state: String,
}

impl ContainerItem {
    pub fn new(name: impl Into<String>, kind: ContainerKind) -> Self {
        Self {
            name: name.into(),
            kind,
            image: "-".to_string(),
            state: "Unknown".to_string(),
        }
    }
}

/// Init containers first, then regular ones, each group keeping provider order.
pub fn order_containers(containers: Vec<ContainerItem>) -> Vec<ContainerItem> {
    let (mut ordered, regular): (Vec<_>, Vec<_>) = containers
        .into_iter()
        .partition(|container| container.kind == ContainerKind::Init);
    ordered.extend(regular);
    ordered
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LogTarget {
    pub namespace: String,
    pub pod: String,
    pub container: String,
}

impl Display for LogTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}:{}", self.namespace, self.pod, self.container)
    }
}

/// Cursor-addressed list fed by one fetch at a time.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SelectableList<T> {
    items: Vec<T>,
    cursor: usize,
    populated: bool,
    error: Option<String>,
    pending: Option<Ticket>,
    refreshed_at: Option<DateTime<Local>>,
}

impl<T> Default for SelectableList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            cursor: 0,
            populated: false,
            error: None,
            pending: None,
            refreshed_at: None,
        }
    }
}

impl<T> SelectableList<T> {
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn populated(&self) -> bool {
        self.populated
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn pending(&self) -> Option<Ticket> {
        self.pending
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Local>> {
        self.refreshed_at
    }

    /// Entry under the cursor. Nothing is selectable while a fetch for this list is
    /// outstanding, so the rows on screen may be stale.
    pub fn selected(&self) -> Option<&T> {
        if self.pending.is_some() {
            return None;
        }
        self.items.get(self.cursor)
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if self.items.is_empty() {
            self.cursor = 0;
            return;
        }

        let max_index = self.items.len().saturating_sub(1) as isize;
        let current = self.cursor.min(max_index as usize) as isize;
        self.cursor = (current + delta).clamp(0, max_index) as usize;
    }

    /// Marks a new fetch as outstanding. The old rows stay visible until it lands.
    pub fn begin_fetch(&mut self, ticket: Ticket) {
        self.cursor = 0;
        self.populated = false;
        self.pending = Some(ticket);
    }

    pub fn accepts(&self, ticket: Ticket) -> bool {
        self.pending == Some(ticket)
    }

    pub fn apply(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<T>, String>,
        fetched_at: DateTime<Local>,
    ) -> bool {
        if !self.accepts(ticket) {
            return false;
        }

        self.pending = None;
        self.refreshed_at = Some(fetched_at);
        match result {
            Ok(items) => {
                self.items = items;
                self.error = None;
                self.populated = true;
                self.cursor = self.cursor.min(self.items.len().saturating_sub(1));
            }
            Err(error) => {
                self.items.clear();
                self.error = Some(error);
                self.populated = false;
                self.cursor = 0;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ContainerItem, ContainerKind, SelectableList, TerminalSize, Ticket, order_containers,
    };
    use chrono::Local;

    fn loaded(items: &[&str]) -> SelectableList<String> {
        let mut list = SelectableList::default();
        list.begin_fetch(Ticket(1));
        list.apply(
            Ticket(1),
            Ok(items.iter().map(|item| item.to_string()).collect()),
            Local::now(),
        );
        list
    }

    #[test]
    fn cursor_stays_within_bounds() {
        let mut list = loaded(&["a", "b", "c"]);
        list.move_cursor(-1);
        assert_eq!(list.cursor(), 0);
        for _ in 0..10 {
            list.move_cursor(1);
        }
        assert_eq!(list.cursor(), 2);
        list.move_cursor(-1);
        assert_eq!(list.selected().map(String::as_str), Some("b"));
    }

    #[test]
    fn cursor_is_inert_on_empty_list() {
        let mut list = loaded(&[]);
        list.move_cursor(1);
        list.move_cursor(-3);
        assert_eq!(list.cursor(), 0);
        assert!(list.selected().is_none());
        assert!(list.populated());
    }

    #[test]
    fn apply_ignores_unexpected_ticket() {
        let mut list = SelectableList::<String>::default();
        list.begin_fetch(Ticket(4));
        assert!(!list.apply(Ticket(3), Ok(vec!["x".to_string()]), Local::now()));
        assert!(list.items().is_empty());
        assert!(!list.populated());
        assert_eq!(list.pending(), Some(Ticket(4)));
    }

    #[test]
    fn failure_keeps_list_empty_with_error() {
        let mut list = loaded(&["a"]);
        list.begin_fetch(Ticket(2));
        assert!(list.apply(Ticket(2), Err("forbidden".to_string()), Local::now()));
        assert!(list.items().is_empty());
        assert_eq!(list.error(), Some("forbidden"));
        assert!(!list.populated());
    }

    #[test]
    fn nothing_is_selected_while_refreshing() {
        let mut list = loaded(&["a", "b"]);
        list.begin_fetch(Ticket(2));
        assert_eq!(list.items().len(), 2);
        assert!(list.selected().is_none());

        assert!(list.apply(Ticket(2), Ok(vec!["c".to_string()]), Local::now()));
        assert_eq!(list.selected().map(String::as_str), Some("c"));
    }

    #[test]
    fn shorter_result_clamps_cursor() {
        let mut list = loaded(&["a", "b", "c"]);
        list.move_cursor(2);
        list.begin_fetch(Ticket(2));
        list.move_cursor(2);
        assert!(list.apply(Ticket(2), Ok(vec!["a".to_string()]), Local::now()));
        assert_eq!(list.cursor(), 0);
    }

    #[test]
    fn init_containers_come_first_in_provider_order() {
        let ordered = order_containers(vec![
            ContainerItem::new("app", ContainerKind::Regular),
            ContainerItem::new("migrate", ContainerKind::Init),
            ContainerItem::new("sidecar", ContainerKind::Regular),
            ContainerItem::new("wait", ContainerKind::Init),
        ]);
        let names = ordered
            .iter()
            .map(|container| container.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["migrate", "wait", "app", "sidecar"]);
    }

    #[test]
    fn body_subtracts_chrome() {
        let body = TerminalSize::new(80, 24).body();
        assert_eq!(body, TerminalSize::new(78, 20));
        assert_eq!(TerminalSize::new(1, 2).body(), TerminalSize::new(1, 1));
    }
}
