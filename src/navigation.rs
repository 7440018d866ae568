//! Directory navigation state and the controller driving it.
//!
//! [`NavState`] is a plain value with pure transitions. [`Navigator`] owns one,
//! turns inbound [`Command`]s into [`FetchRequest`]s and folds completed
//! fetches back into the displayed listing. Only the completion of the most
//! recently issued request is ever applied.

use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::model::{DirectoryEntry, ExploreResult, SortKey, Summary};

pub const ROOT_PATH: &str = "/";
const SEPARATOR: char = '/';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    /// Tabular listing.
    #[default]
    Directory,
    /// Treemap.
    Visual,
}

impl ViewMode {
    pub fn toggle(self) -> Self {
        match self {
            ViewMode::Directory => ViewMode::Visual,
            ViewMode::Visual => ViewMode::Directory,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Directory => "directory",
            ViewMode::Visual => "treemap",
        }
    }
}

/// Path stack, active view and sort order of one browsing session.
///
/// The stack is root-first and never empty; its first element is always `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavState {
    stack: Vec<String>,
    view: ViewMode,
    sort: SortKey,
}

impl Default for NavState {
    fn default() -> Self {
        Self {
            stack: vec![ROOT_PATH.to_string()],
            view: ViewMode::default(),
            sort: SortKey::default(),
        }
    }
}

impl NavState {
    pub fn new(view: ViewMode, sort: SortKey) -> Self {
        Self {
            view,
            sort,
            ..Self::default()
        }
    }

    pub fn current(&self) -> &str {
        self.stack.last().map(String::as_str).unwrap_or(ROOT_PATH)
    }

    pub fn stack(&self) -> &[String] {
        &self.stack
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    /// Only directories (trailing separator) other than the current one can be entered.
    pub fn accepts(&self, path: &str) -> bool {
        if !path.ends_with(SEPARATOR) {
            return false;
        }
        let top = self.current();
        let same = path == top
            || top.strip_prefix(SEPARATOR) == Some(path)
            || path.strip_prefix(SEPARATOR) == Some(top);
        !same
    }

    /// Enter `path`. `None` when the move is rejected.
    pub fn push(&self, path: &str) -> Option<Self> {
        if !self.accepts(path) {
            return None;
        }
        let mut next = self.clone();
        next.stack.push(path.to_string());
        Some(next)
    }

    /// Leave the current directory. `None` at the root.
    pub fn pop(&self) -> Option<Self> {
        if self.stack.len() <= 1 {
            return None;
        }
        let mut next = self.clone();
        next.stack.pop();
        Some(next)
    }

    pub fn set_view(&self, view: ViewMode) -> Self {
        Self {
            view,
            ..self.clone()
        }
    }

    pub fn set_sort(&self, sort: SortKey) -> Self {
        Self {
            sort,
            ..self.clone()
        }
    }
}

/// Inbound commands from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Navigate(String),
    Back,
    SetView(ViewMode),
    Refresh,
    SetSort(SortKey),
}

/// Outbound notifications for whatever renders the navigator.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    DirectoryChanged {
        title: String,
        entries: Vec<DirectoryEntry>,
    },
    ViewChanged(ViewMode),
    SummaryChanged(Summary),
    FetchFailed {
        path: String,
        message: String,
    },
}

/// A listing + summary fetch for one path, tagged with its issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub seq: u64,
    pub path: String,
    pub sort: SortKey,
}

#[derive(Debug)]
pub enum FetchOutcome {
    Listing(Result<ExploreResult>),
    Summary(Result<Summary>),
}

#[derive(Debug)]
pub struct FetchCompletion {
    pub seq: u64,
    pub path: String,
    pub outcome: FetchOutcome,
}

pub struct Navigator {
    state: NavState,
    title: String,
    entries: Vec<DirectoryEntry>,
    summary: Option<Summary>,
    /// Summary that arrived before its listing, keyed by request.
    held_summary: Option<(u64, Summary)>,
    last_error: Option<String>,
    latest_seq: u64,
    /// Request whose listing is on display.
    shown_seq: u64,
    pending_listing: bool,
    outbox: Vec<Notification>,
}

impl Navigator {
    pub fn new(state: NavState) -> Self {
        Self {
            state,
            title: String::new(),
            entries: Vec::new(),
            summary: None,
            held_summary: None,
            last_error: None,
            latest_seq: 0,
            shown_seq: 0,
            pending_listing: false,
            outbox: Vec::new(),
        }
    }

    pub fn state(&self) -> &NavState {
        &self.state
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Summary of the displayed listing. `None` until one arrives for it.
    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// True while the listing for the latest request has not come back.
    pub fn is_loading(&self) -> bool {
        self.pending_listing
    }

    pub fn handle(&mut self, command: Command) -> Option<FetchRequest> {
        match command {
            Command::Navigate(path) => self.navigate_to(&path),
            Command::Back => self.navigate_back(),
            Command::SetView(view) => {
                self.set_view(view);
                None
            }
            Command::Refresh => Some(self.refresh()),
            Command::SetSort(sort) => self.set_sort(sort),
        }
    }

    pub fn navigate_to(&mut self, path: &str) -> Option<FetchRequest> {
        let next = self.state.push(path)?;
        debug!(path, depth = next.depth(), "navigate");
        self.state = next;
        Some(self.refresh())
    }

    pub fn navigate_back(&mut self) -> Option<FetchRequest> {
        let next = self.state.pop()?;
        debug!(path = next.current(), "back");
        self.state = next;
        Some(self.refresh())
    }

    /// Re-issue the fetch for the top of the stack.
    pub fn refresh(&mut self) -> FetchRequest {
        self.latest_seq += 1;
        self.pending_listing = true;
        let request = FetchRequest {
            seq: self.latest_seq,
            path: self.state.current().to_string(),
            sort: self.state.sort(),
        };
        debug!(seq = request.seq, path = %request.path, sort = request.sort.label(), "fetch issued");
        request
    }

    /// Switch the presentation only. No data is fetched.
    pub fn set_view(&mut self, view: ViewMode) {
        self.state = self.state.set_view(view);
        self.outbox.push(Notification::ViewChanged(view));
    }

    pub fn set_sort(&mut self, sort: SortKey) -> Option<FetchRequest> {
        if self.state.sort() == sort {
            return None;
        }
        self.state = self.state.set_sort(sort);
        Some(self.refresh())
    }

    /// Fold a finished fetch into the displayed state. Returns whether it was applied.
    ///
    /// Completions of superseded requests are dropped. Failures leave the
    /// previous listing and summary in place. A summary is only shown next to
    /// the listing fetched by the same request.
    pub fn apply(&mut self, completion: FetchCompletion) -> bool {
        let FetchCompletion { seq, path, outcome } = completion;
        if seq != self.latest_seq {
            debug!(seq, latest = self.latest_seq, path = %path, "discarding stale response");
            return false;
        }

        match outcome {
            FetchOutcome::Listing(Ok(result)) => {
                self.pending_listing = false;
                info!(path = %path, title = %result.title, entries = result.contents.len(), "listing loaded");
                self.title = result.title;
                self.entries = result.contents;
                self.shown_seq = seq;
                self.summary = None;
                self.last_error = None;
                self.outbox.push(Notification::DirectoryChanged {
                    title: self.title.clone(),
                    entries: self.entries.clone(),
                });
                if let Some((held_seq, summary)) = self.held_summary.take() {
                    if held_seq == seq {
                        self.show_summary(summary);
                    }
                }
                true
            }
            FetchOutcome::Listing(Err(err)) => {
                self.pending_listing = false;
                self.held_summary = None;
                self.fail(path, &err, "error fetching path");
                false
            }
            FetchOutcome::Summary(Ok(summary)) => {
                if self.shown_seq == seq {
                    self.show_summary(summary);
                    true
                } else if self.pending_listing {
                    debug!(seq, path = %path, "holding summary until its listing arrives");
                    self.held_summary = Some((seq, summary));
                    false
                } else {
                    debug!(seq, path = %path, "dropping summary of a failed listing");
                    false
                }
            }
            FetchOutcome::Summary(Err(err)) => {
                self.fail(path, &err, "error fetching summary");
                false
            }
        }
    }

    fn show_summary(&mut self, summary: Summary) {
        self.summary = Some(summary.clone());
        self.outbox.push(Notification::SummaryChanged(summary));
    }

    fn fail(&mut self, path: String, err: &Error, what: &str) {
        if err.is_fetch_failure() {
            warn!(path = %path, error = %err, "{}", what);
        } else {
            error!(path = %path, error = %err, "{}", what);
        }
        let message = err.to_string();
        self.last_error = Some(format!("{}: {}", path, message));
        self.outbox.push(Notification::FetchFailed { path, message });
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(NavState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn listing(title: &str, names: &[&str]) -> ExploreResult {
        ExploreResult {
            title: title.to_string(),
            contents: names
                .iter()
                .map(|name| DirectoryEntry::new(*name, title, 10, 1))
                .collect(),
        }
    }

    fn complete(request: &FetchRequest, result: Result<ExploreResult>) -> FetchCompletion {
        FetchCompletion {
            seq: request.seq,
            path: request.path.clone(),
            outcome: FetchOutcome::Listing(result),
        }
    }

    #[test]
    fn test_initial_state() {
        let state = NavState::default();
        assert_eq!(state.stack(), &["/".to_string()]);
        assert_eq!(state.view(), ViewMode::Directory);
        assert_eq!(state.current(), "/");
    }

    #[test]
    fn test_push_then_pop() {
        let state = NavState::default();
        let pushed = state.push("/a/").unwrap();
        assert_eq!(pushed.stack(), &["/".to_string(), "/a/".to_string()]);
        assert_eq!(pushed.pop().unwrap(), state);
        assert!(state.pop().is_none());
    }

    #[test]
    fn test_push_rejects_leaves_and_current() {
        let state = NavState::default().push("/a/").unwrap();
        assert!(state.push("/a/file.txt").is_none());
        assert!(state.push("/a/").is_none());
        assert!(state.push("a/").is_none());

        let relative = NavState::default().push("a/").unwrap();
        assert!(relative.push("/a/").is_none());
        assert!(relative.push("a/b/").is_some());
    }

    #[test]
    fn test_navigate_issues_one_fetch() {
        let mut nav = Navigator::default();
        let request = nav.handle(Command::Navigate("/a/".into())).unwrap();
        assert_eq!(nav.state().stack(), &["/".to_string(), "/a/".to_string()]);
        assert_eq!(request.path, "/a/");
        assert!(nav.is_loading());
    }

    #[test]
    fn test_navigate_noop_issues_nothing() {
        let mut nav = Navigator::default();
        assert!(nav.navigate_to("/a").is_none());
        assert!(nav.navigate_to("/").is_none());
        assert_eq!(nav.state().depth(), 1);
        assert!(!nav.is_loading());
    }

    #[test]
    fn test_back_at_root_is_noop() {
        let mut nav = Navigator::default();
        assert!(nav.handle(Command::Back).is_none());
        assert_eq!(nav.state().depth(), 1);
    }

    #[test]
    fn test_back_fetches_parent() {
        let mut nav = Navigator::default();
        nav.navigate_to("a/").unwrap();
        nav.navigate_to("a/b/").unwrap();
        let request = nav.navigate_back().unwrap();
        assert_eq!(request.path, "a/");
        assert_eq!(nav.state().depth(), 2);
    }

    #[test]
    fn test_successful_fetch_replaces_title_and_entries() {
        let mut nav = Navigator::default();
        let request = nav.refresh();
        assert!(nav.apply(complete(&request, Ok(listing("/", &["/", "a/", "b/"])))));

        assert_eq!(nav.title(), "/");
        assert_eq!(nav.entries().len(), 3);
        assert!(!nav.is_loading());
        assert_eq!(
            nav.take_notifications(),
            vec![Notification::DirectoryChanged {
                title: "/".into(),
                entries: nav.entries().to_vec(),
            }]
        );
    }

    #[test]
    fn test_failed_fetch_keeps_previous_listing() {
        let mut nav = Navigator::default();
        let first = nav.refresh();
        nav.apply(complete(&first, Ok(listing("/", &["/", "a/"]))));
        nav.take_notifications();

        let second = nav.navigate_to("a/").unwrap();
        assert!(!nav.apply(complete(&second, Err(Error::Status(500)))));

        assert_eq!(nav.title(), "/");
        assert_eq!(nav.entries().len(), 2);
        assert!(nav.last_error().unwrap().contains("500"));
        assert!(!nav.is_loading());
        assert!(matches!(
            nav.take_notifications().as_slice(),
            [Notification::FetchFailed { path, .. }] if path == "a/"
        ));
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut nav = Navigator::default();
        let slow = nav.navigate_to("a/").unwrap();
        let fast = nav.navigate_to("a/b/").unwrap();

        assert!(nav.apply(complete(&fast, Ok(listing("a/b/", &["a/b/"])))));
        assert!(!nav.apply(complete(&slow, Ok(listing("a/", &["a/", "a/x/"])))));
        assert_eq!(nav.title(), "a/b/");
        assert_eq!(nav.entries().len(), 1);
    }

    #[test]
    fn test_set_view_does_not_fetch() {
        let mut nav = Navigator::default();
        assert!(nav.handle(Command::SetView(ViewMode::Visual)).is_none());
        assert_eq!(nav.state().view(), ViewMode::Visual);
        assert!(!nav.is_loading());
        assert_eq!(
            nav.take_notifications(),
            vec![Notification::ViewChanged(ViewMode::Visual)]
        );
    }

    #[test]
    fn test_sort_change_refetches_current_path() {
        let mut nav = Navigator::default();
        nav.navigate_to("logs/").unwrap();
        let request = nav.handle(Command::SetSort(SortKey::Count)).unwrap();
        assert_eq!(request.path, "logs/");
        assert_eq!(request.sort, SortKey::Count);
        assert!(nav.set_sort(SortKey::Count).is_none());
    }

    fn summary_for(path: &str) -> Summary {
        Summary {
            path: path.into(),
            size: Default::default(),
            cost: Default::default(),
        }
    }

    fn summary_done(request: &FetchRequest, result: Result<Summary>) -> FetchCompletion {
        FetchCompletion {
            seq: request.seq,
            path: request.path.clone(),
            outcome: FetchOutcome::Summary(result),
        }
    }

    #[test]
    fn test_summary_follows_its_listing() {
        let mut nav = Navigator::default();
        let request = nav.refresh();
        nav.apply(complete(&request, Ok(listing("/", &["/", "a/"]))));
        assert!(nav.summary().is_none());

        assert!(nav.apply(summary_done(&request, Ok(summary_for("/")))));
        assert_eq!(nav.summary(), Some(&summary_for("/")));
    }

    #[test]
    fn test_early_summary_waits_for_listing() {
        let mut nav = Navigator::default();
        let request = nav.refresh();
        assert!(!nav.apply(summary_done(&request, Ok(summary_for("/")))));
        assert!(nav.summary().is_none());
        assert!(nav.is_loading());

        nav.apply(complete(&request, Ok(listing("/", &["/"]))));
        assert_eq!(nav.summary(), Some(&summary_for("/")));
    }

    #[test]
    fn test_summary_of_failed_listing_not_shown() {
        let mut nav = Navigator::default();
        let first = nav.refresh();
        nav.apply(complete(&first, Ok(listing("/", &["/", "a/"]))));
        nav.apply(summary_done(&first, Ok(summary_for("/"))));

        let second = nav.navigate_to("a/").unwrap();
        nav.apply(complete(&second, Err(Error::Status(500))));
        assert!(!nav.apply(summary_done(&second, Ok(summary_for("a/")))));

        assert_eq!(nav.title(), "/");
        assert_eq!(nav.entries().len(), 2);
        assert_eq!(nav.summary().map(|s| s.path.as_str()), Some("/"));
    }

    #[test]
    fn test_new_listing_drops_previous_summary() {
        let mut nav = Navigator::default();
        let first = nav.refresh();
        nav.apply(complete(&first, Ok(listing("/", &["/", "a/"]))));
        nav.apply(summary_done(&first, Ok(summary_for("/"))));

        let second = nav.navigate_to("a/").unwrap();
        nav.apply(complete(&second, Ok(listing("a/", &["a/"]))));
        nav.apply(summary_done(&second, Err(Error::Status(502))));

        assert_eq!(nav.title(), "a/");
        assert!(nav.summary().is_none());
        assert!(nav.last_error().unwrap().contains("502"));
    }
}
