use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect as UiRect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Widget, Wrap};
use ratatui::{Frame, Terminal};
use std::io::{self, stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};
use storage_explorer::bucket::{bucket_with_totals, Bucketing, OtherPolicy, TOP_WEIGHTS};
use storage_explorer::chart_tree::ChartTree;
use storage_explorer::client::HttpDataSource;
use storage_explorer::config::{init_logging, Args};
use storage_explorer::fetcher::Fetcher;
use storage_explorer::format::{format_cost, format_count, format_size};
use storage_explorer::model::DirectoryEntry;
use storage_explorer::navigation::{Command, Navigator, Notification, ViewMode};
use storage_explorer::render_tree::{build_render_tree, RenderNode};
use storage_explorer::treemap::Rect;
use tracing::{error, info, warn};

#[derive(Clone)]
struct VisibleTile {
    name: String,
    label: String,
    weight: f64,
    is_aggregate: bool,
    depth: u16,
    rect: Rect,
}

#[derive(Clone)]
struct HitTile {
    name: String,
    is_aggregate: bool,
    depth: u16,
    x0: u16,
    y0: u16,
    x1: u16,
    y1: u16,
}

impl HitTile {
    fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}

#[derive(Default, Clone, Copy)]
struct UiLayoutState {
    listing_inner_area: Option<UiRect>,
}

struct App {
    navigator: Navigator,
    fetcher: Fetcher,
    other_policy: OtherPolicy,
    table_state: TableState,
    status: String,
    last_loaded_at: Option<Instant>,
    hit_tiles: Vec<HitTile>,
    ui_layout: UiLayoutState,
    should_quit: bool,
}

impl App {
    fn new(navigator: Navigator, fetcher: Fetcher, other_policy: OtherPolicy) -> Self {
        Self {
            navigator,
            fetcher,
            other_policy,
            table_state: TableState::default(),
            status: String::from("Loading..."),
            last_loaded_at: None,
            hit_tiles: Vec::new(),
            ui_layout: UiLayoutState::default(),
            should_quit: false,
        }
    }

    fn run(&mut self, command: Command) {
        if let Some(request) = self.navigator.handle(command) {
            self.status = format!("Loading {} ...", request.path);
            self.fetcher.dispatch(request);
        }
    }

    fn poll_fetch_updates(&mut self) {
        for completion in self.fetcher.poll() {
            self.navigator.apply(completion);
        }

        for notification in self.navigator.take_notifications() {
            match notification {
                Notification::DirectoryChanged { title, entries } => {
                    self.table_state.select(if entries.is_empty() { None } else { Some(0) });
                    self.last_loaded_at = Some(Instant::now());
                    self.status = format!("{} ({} entries)", display_path(&title), entries.len());
                }
                Notification::ViewChanged(view) => {
                    self.status = format!("Showing {} view", view.label());
                }
                Notification::SummaryChanged(_) => {}
                Notification::FetchFailed { path, message } => {
                    self.status = format!("Fetch failed for {}: {}", display_path(&path), message);
                }
            }
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
            self.should_quit = true;
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => self.open_selected(),
            KeyCode::Backspace | KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('u') => {
                self.run(Command::Back)
            }
            KeyCode::Char('r') => self.run(Command::Refresh),
            KeyCode::Char('v') | KeyCode::Tab => {
                let next = self.navigator.state().view().toggle();
                self.run(Command::SetView(next));
            }
            KeyCode::Char('s') => {
                let next = self.navigator.state().sort().next();
                self.run(Command::SetSort(next));
            }
            _ => {}
        }
    }

    fn on_mouse(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => match self.navigator.state().view() {
                ViewMode::Visual => {
                    if let Some(tile) = self.tile_at(event.column, event.row).cloned() {
                        if tile.is_aggregate {
                            self.status = format!("{} groups the remaining entries", tile.name);
                        } else {
                            self.run(Command::Navigate(tile.name));
                        }
                    }
                }
                ViewMode::Directory => {
                    if let Some(index) = self.row_at(event.row) {
                        if self.table_state.selected() == Some(index) {
                            self.open_selected();
                        } else {
                            self.table_state.select(Some(index));
                        }
                    }
                }
            },
            MouseEventKind::Down(MouseButton::Right) | MouseEventKind::Down(MouseButton::Middle) => {
                self.run(Command::Back);
            }
            MouseEventKind::ScrollDown => self.move_selection(1),
            MouseEventKind::ScrollUp => self.move_selection(-1),
            _ => {}
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.navigator.entries().len();
        if len == 0 {
            self.table_state.select(None);
            return;
        }
        let current = self.table_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, len as isize - 1);
        self.table_state.select(Some(next as usize));
    }

    fn selected_entry(&self) -> Option<&DirectoryEntry> {
        self.table_state
            .selected()
            .and_then(|index| self.navigator.entries().get(index))
    }

    fn open_selected(&mut self) {
        let Some((name, is_dir)) = self.selected_entry().map(|e| (e.name.clone(), e.is_dir())) else {
            return;
        };
        if !is_dir {
            self.status = format!("{} is not a directory", name);
            return;
        }
        self.run(Command::Navigate(name));
    }

    fn row_at(&self, y: u16) -> Option<usize> {
        let area = self.ui_layout.listing_inner_area?;
        // First row is the header.
        let first_row = area.y.saturating_add(1);
        if y < first_row || y >= area.y.saturating_add(area.height) {
            return None;
        }
        let index = (y - first_row) as usize + self.table_state.offset();
        (index < self.navigator.entries().len()).then_some(index)
    }

    fn bucketing(&self) -> Bucketing {
        bucket_with_totals(self.navigator.entries(), self.other_policy)
    }

    fn build_visible_tiles(&mut self, area: UiRect) -> Vec<VisibleTile> {
        self.hit_tiles.clear();
        if area.width <= 2 || area.height <= 2 {
            return Vec::new();
        }

        let bucketing = self.bucketing();
        let tree = match ChartTree::from_bucketing(&bucketing) {
            Ok(tree) => tree,
            Err(err) => {
                warn!(title = %self.navigator.title(), error = %err, "cannot chart listing");
                return Vec::new();
            }
        };

        let layout_container = Rect::new(0.0, 0.0, area.width as f32, area.height as f32);
        let render_nodes = build_render_tree(&tree, layout_container);

        let mut tiles = Vec::new();
        flatten_render_nodes(&render_nodes, 0, self.navigator.entries(), &bucketing, &mut tiles);
        self.hit_tiles = tiles
            .iter()
            .filter_map(|tile| {
                tile_bounds_in_area(tile, area).map(|(x0, y0, x1, y1)| HitTile {
                    name: tile.name.clone(),
                    is_aggregate: tile.is_aggregate,
                    depth: tile.depth,
                    x0,
                    y0,
                    x1,
                    y1,
                })
            })
            .collect();

        tiles
    }

    fn tile_at(&self, x: u16, y: u16) -> Option<&HitTile> {
        self.hit_tiles
            .iter()
            .filter(|tile| tile.contains(x, y))
            .max_by_key(|tile| tile.depth)
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

fn flatten_render_nodes(
    nodes: &[RenderNode],
    depth: u16,
    entries: &[DirectoryEntry],
    bucketing: &Bucketing,
    out: &mut Vec<VisibleTile>,
) {
    for node in nodes {
        let label = if node.is_aggregate {
            format!(
                "{} ({} items, {})",
                node.name,
                format_count(bucketing.other_count),
                format_size(bucketing.other_size)
            )
        } else {
            match entries.iter().skip(1).find(|e| e.name == node.name) {
                Some(entry) => format!("{} {}", node.name, format_size(entry.size)),
                None => node.name.clone(),
            }
        };

        out.push(VisibleTile {
            name: node.name.clone(),
            label,
            weight: node.weight,
            is_aggregate: node.is_aggregate,
            depth,
            rect: node.outer_rect,
        });

        if !node.children.is_empty() {
            flatten_render_nodes(&node.children, depth.saturating_add(1), entries, bucketing, out);
        }
    }
}

/// Cells `[first, last]` covered by a span starting at `start` of length `len`,
/// offset by `origin` and limited to `extent` cells.
fn cell_span(start: f32, len: f32, origin: u16, extent: u16) -> Option<(u16, u16)> {
    if extent == 0 {
        return None;
    }
    let last_cell = extent - 1;
    let first = (start.floor().max(0.0) as u16).min(last_cell);
    let last = (((start + len).ceil() as u16).saturating_sub(1)).min(last_cell);
    (last >= first).then(|| (origin + first, origin + last))
}

fn tile_bounds_in_area(tile: &VisibleTile, area: UiRect) -> Option<(u16, u16, u16, u16)> {
    let (x0, x1) = cell_span(tile.rect.x, tile.rect.width, area.x, area.width)?;
    let (y0, y1) = cell_span(tile.rect.y, tile.rect.height, area.y, area.height)?;
    Some((x0, y0, x1, y1))
}

const BACKGROUND: Color = Color::Rgb(16, 20, 24);
const AGGREGATE_BG: Color = Color::Rgb(70, 72, 78);
const GROUPED_BG: Color = Color::Rgb(92, 96, 104);
const EDGE: Color = Color::Rgb(200, 206, 214);
const SELECTED_EDGE: Color = Color::Rgb(250, 200, 90);

/// Top entries are shaded by display weight; 60 is the brightest.
fn tile_color(tile: &VisibleTile) -> Color {
    if tile.is_aggregate {
        return AGGREGATE_BG;
    }
    if tile.depth > 0 {
        return GROUPED_BG;
    }
    let shade = (tile.weight / TOP_WEIGHTS[0]).clamp(0.0, 1.0);
    Color::Rgb(
        (30.0 + shade * 40.0) as u8,
        (90.0 + shade * 60.0) as u8,
        (110.0 + shade * 70.0) as u8,
    )
}

struct TreemapWidget<'a> {
    tiles: &'a [VisibleTile],
    /// Entry highlighted in the table; its tile gets a bright edge.
    selected: Option<&'a str>,
}

impl Widget for TreemapWidget<'_> {
    fn render(self, area: UiRect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        buf.set_style(area, Style::default().bg(BACKGROUND));

        // Parents first so grouped entries land on top of "Other".
        let mut draw_order: Vec<&VisibleTile> = self.tiles.iter().collect();
        draw_order.sort_by_key(|tile| tile.depth);

        for tile in draw_order {
            let Some((x0, y0, x1, y1)) = tile_bounds_in_area(tile, area) else {
                continue;
            };
            let bg = tile_color(tile);
            let edge = if self.selected == Some(tile.name.as_str()) {
                SELECTED_EDGE
            } else {
                EDGE
            };
            let cells = UiRect::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1);

            buf.set_style(cells, Style::default().bg(bg));
            for pos in cells.positions() {
                buf[pos].set_char(' ');
            }
            if cells.width >= 2 && cells.height >= 2 {
                let border_set = if tile.is_aggregate {
                    ratatui::symbols::border::ROUNDED
                } else {
                    ratatui::symbols::border::PLAIN
                };
                Block::default()
                    .borders(Borders::ALL)
                    .border_set(border_set)
                    .border_style(Style::default().fg(edge).bg(bg))
                    .render(cells, buf);
            }
            draw_tile_label(tile, cells, bg, buf);
        }
    }
}

/// Label along the top edge, inside the corners.
fn draw_tile_label(tile: &VisibleTile, cells: UiRect, bg: Color, buf: &mut Buffer) {
    let width = cells.width.saturating_sub(2) as usize;
    if width < 4 {
        return;
    }
    let mut label: String = tile.label.chars().take(width).collect();
    if tile.label.chars().count() > width {
        label.pop();
        label.push('…');
    }
    let style = Style::default().fg(Color::White).bg(bg).add_modifier(Modifier::BOLD);
    buf.set_stringn(cells.x + 1, cells.y, &label, width, style);
}

fn draw_listing(frame: &mut Frame, app: &mut App, area: UiRect) {
    let header = Row::new(vec!["Name", "Size", "Count"])
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = app
        .navigator
        .entries()
        .iter()
        .map(|entry| {
            let name_style = if entry.is_dir() {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(entry.name.clone()).style(name_style),
                Cell::from(format_size(entry.size)),
                Cell::from(format_count(entry.count)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [Constraint::Min(20), Constraint::Length(12), Constraint::Length(12)],
    )
    .header(header)
    .highlight_style(Style::default().bg(Color::Rgb(60, 60, 70)).add_modifier(Modifier::BOLD))
    .highlight_symbol("▶ ");

    frame.render_stateful_widget(table, area, &mut app.table_state);
}

fn summary_lines(app: &App) -> Vec<Line<'static>> {
    let Some(summary) = app.navigator.summary() else {
        return vec![Line::from("No summary yet")];
    };

    let mut lines = vec![Line::from(vec![
        Span::styled("For ", Style::default().fg(Color::Gray)),
        Span::raw(display_path(&summary.path).to_string()),
    ])];
    lines.extend(summary.tiers().map(|(tier, size, cost)| {
        Line::from(vec![
            Span::styled(format!("{:<9}", tier.label()), Style::default().fg(Color::Gray)),
            Span::raw(format!("{:>10}  {:>9}", format_size(size), format_cost(cost))),
        ])
    }));
    lines.push(Line::from(vec![
        Span::styled(format!("{:<9}", "Total"), Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(
            format!(
                "{:>10}  {:>9}",
                format_size(summary.size.total()),
                format_cost(summary.cost.total())
            ),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ]));
    lines
}

fn draw_ui(frame: &mut Frame, app: &mut App) {
    let root = frame.area();
    let split = Layout::horizontal([Constraint::Length(42), Constraint::Min(30)]).split(root);
    let left = split[0];
    let right = split[1];

    let left_block = Block::default()
        .title(" Storage Explorer ")
        .borders(Borders::ALL);
    let left_inner = left_block.inner(left);
    frame.render_widget(left_block, left);

    let left_rows = Layout::vertical([
        Constraint::Length(5),
        Constraint::Length(8),
        Constraint::Min(4),
        Constraint::Length(6),
    ])
    .split(left_inner);

    let state = app.navigator.state();
    let location_lines = vec![
        Line::from(vec![
            Span::styled("Path: ", Style::default().fg(Color::Gray)),
            Span::raw(display_path(state.current()).to_string()),
        ]),
        Line::from(vec![
            Span::styled("Depth: ", Style::default().fg(Color::Gray)),
            Span::raw(state.depth().to_string()),
            Span::raw("  "),
            Span::styled("Sort: ", Style::default().fg(Color::Gray)),
            Span::raw(state.sort().label()),
        ]),
        Line::from(vec![
            Span::styled("Title: ", Style::default().fg(Color::Gray)),
            Span::raw(display_path(app.navigator.title()).to_string()),
        ]),
    ];
    frame.render_widget(
        Paragraph::new(location_lines)
            .block(Block::default().title(" Location ").borders(Borders::ALL)),
        left_rows[0],
    );

    frame.render_widget(
        Paragraph::new(summary_lines(app))
            .block(Block::default().title(" Summary ").borders(Borders::ALL)),
        left_rows[1],
    );

    let mut status_lines = vec![Line::from(app.status.clone())];
    if app.navigator.is_loading() {
        status_lines.push(Line::styled("Loading...", Style::default().fg(Color::Yellow)));
    }
    if let Some(err) = app.navigator.last_error() {
        status_lines.push(Line::styled(
            format!("Last error: {}", err),
            Style::default().fg(Color::Red),
        ));
    }
    if let Some(instant) = app.last_loaded_at {
        status_lines.push(Line::from(format!(
            "Loaded {}s ago",
            instant.elapsed().as_secs()
        )));
    }
    frame.render_widget(
        Paragraph::new(status_lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().title(" Status ").borders(Borders::ALL)),
        left_rows[2],
    );

    let help_lines = vec![
        Line::from("↑/↓: select   Enter/→: open"),
        Line::from("Backspace/←: back   r: refresh"),
        Line::from("v/Tab: table/treemap   s: sort"),
        Line::from("Click: open   Right click: back   q: quit"),
    ];
    frame.render_widget(
        Paragraph::new(help_lines).block(Block::default().title(" Controls ").borders(Borders::ALL)),
        left_rows[3],
    );

    let view = app.navigator.state().view();
    let title = match view {
        ViewMode::Directory => " Directory ".to_string(),
        ViewMode::Visual => " Treemap (click: open, right click: back) ".to_string(),
    };
    let right_block = Block::default().title(title).borders(Borders::ALL);
    let right_inner = right_block.inner(right);
    frame.render_widget(right_block, right);
    app.ui_layout.listing_inner_area = Some(right_inner);

    if app.navigator.entries().is_empty() {
        app.hit_tiles.clear();
        frame.render_widget(
            Paragraph::new("Nothing to show yet.").style(Style::default().fg(Color::Gray)),
            right_inner,
        );
        return;
    }

    match view {
        ViewMode::Directory => {
            app.hit_tiles.clear();
            draw_listing(frame, app, right_inner);
        }
        ViewMode::Visual => {
            let tiles = app.build_visible_tiles(right_inner);
            let selected = app.selected_entry().map(|e| e.name.clone());
            frame.render_widget(
                TreemapWidget {
                    tiles: &tiles,
                    selected: selected.as_deref(),
                },
                right_inner,
            );
        }
    }
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, app: &mut App) -> io::Result<()> {
    let initial = app.navigator.refresh();
    app.fetcher.dispatch(initial);

    loop {
        app.poll_fetch_updates();

        terminal.draw(|frame| {
            draw_ui(frame, app);
        })?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => app.on_key(key),
                Event::Mouse(mouse) => app.on_mouse(mouse),
                Event::Resize(_, _) => {}
                Event::FocusGained | Event::FocusLost | Event::Paste(_) => {}
            }
        }
    }

    Ok(())
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    args.validate().map_err(io::Error::other)?;
    init_logging(&args).map_err(io::Error::other)?;

    let source = HttpDataSource::new(&args.api_url, args.timeout()).map_err(io::Error::other)?;
    info!(api = source.base_url(), "starting storage explorer");
    let navigator = Navigator::new(args.initial_state());
    let mut app = App::new(navigator, Fetcher::new(Arc::new(source)), args.other_policy());

    enable_raw_mode()?;
    crossterm::execute!(stdout(), EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let app_result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &app_result {
        error!(error = %err, "terminal loop failed");
    }
    app_result
}
