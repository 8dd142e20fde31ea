// 🖥️ Terminal adapter for the directory
// Thin layer: key events -> FilterState / selection, then render(view)

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use jawala_directory::{
    contact, selection, view, Business, Catalog, CategoryIndex, FilterOutcome, FilterState,
    History, MemoryHistory,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Categories,
    Search,
    Results,
}

impl Focus {
    pub fn next(&self) -> Self {
        match self {
            Focus::Categories => Focus::Search,
            Focus::Search => Focus::Results,
            Focus::Results => Focus::Categories,
        }
    }
}

/// One rendered line of the business list
enum ListRow<'a> {
    Header(String),
    Business(&'a Business),
}

pub struct App {
    pub catalog: Catalog,
    pub index: CategoryIndex,
    pub filter_state: FilterState,
    pub history: MemoryHistory,
    pub focus: Focus,
    pub category_state: ListState,
    pub results_state: TableState,
    pub show_detail: bool,
    pub site_url: String,
}

impl App {
    /// Pre-seed the selection from the start URL's `cat` parameter
    pub fn new(catalog: Catalog, start_url: &str, site_url: &str) -> Self {
        let index = CategoryIndex::build(&catalog.categories);
        let history = MemoryHistory::new(start_url);
        let seeded = selection::initial_selection(&history.location().query, &catalog, &index);

        let filter_state =
            FilterState::default().with_category(seeded.category.map(|c| c.id.as_str()));

        let mut category_state = ListState::default();
        category_state.select(Some(seeded.grid_position));

        Self {
            catalog,
            index,
            filter_state,
            history,
            focus: Focus::Categories,
            category_state,
            results_state: TableState::default(),
            show_detail: false,
            site_url: site_url.to_string(),
        }
    }

    pub fn select_category_at(&mut self, position: usize) {
        let Some(entry) = self.index.get(position) else {
            return;
        };
        let selected = entry.category_id().map(|s| s.to_string());

        self.category_state.select(Some(position));
        self.filter_state = self.filter_state.clone().with_category(selected.as_deref());
        selection::sync_selection(&mut self.history, selected.as_deref());
        self.results_state.select(None);
    }

    pub fn push_search_char(&mut self, c: char) {
        self.filter_state.search_term.push(c);
        self.results_state.select(None);
    }

    pub fn pop_search_char(&mut self) {
        self.filter_state.search_term.pop();
        self.results_state.select(None);
    }

    pub fn move_category(&mut self, delta: isize) {
        let len = self.index.len() as isize;
        if len == 0 {
            return;
        }
        let current = self.category_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.category_state.select(Some(next));
    }

    pub fn move_result(&mut self, delta: isize) {
        let len = self.visible_businesses().len() as isize;
        if len == 0 {
            self.results_state.select(None);
            return;
        }
        let current = self.results_state.selected().map(|i| i as isize).unwrap_or(-1);
        let next = (current + delta).rem_euclid(len) as usize;
        self.results_state.select(Some(next));
    }

    /// Businesses in display order (headers skipped)
    pub fn visible_businesses(&self) -> Vec<&Business> {
        rows(&view(&self.catalog, &self.filter_state))
            .into_iter()
            .filter_map(|row| match row {
                ListRow::Business(b) => Some(b),
                ListRow::Header(_) => None,
            })
            .collect()
    }

    pub fn selected_business(&self) -> Option<&Business> {
        let i = self.results_state.selected()?;
        self.visible_businesses().get(i).copied()
    }
}

fn rows<'a>(outcome: &FilterOutcome<'a>) -> Vec<ListRow<'a>> {
    match outcome {
        FilterOutcome::NoResults { .. } => Vec::new(),
        FilterOutcome::Flat { businesses } => {
            businesses.iter().map(|&b| ListRow::Business(b)).collect()
        }
        FilterOutcome::Grouped { groups } => groups
            .iter()
            .flat_map(|g| {
                std::iter::once(ListRow::Header(g.header().to_string()))
                    .chain(g.businesses.iter().map(|&b| ListRow::Business(b)))
            })
            .collect(),
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.map_err(Into::into)
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };

        if key.code == KeyCode::Esc
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
        {
            return Ok(());
        }

        match (app.focus, key.code) {
            (_, KeyCode::Tab) => app.focus = app.focus.next(),
            (Focus::Search, KeyCode::Char(c)) => app.push_search_char(c),
            (Focus::Search, KeyCode::Backspace) => app.pop_search_char(),
            (Focus::Categories, KeyCode::Down | KeyCode::Char('j')) => app.move_category(1),
            (Focus::Categories, KeyCode::Up | KeyCode::Char('k')) => app.move_category(-1),
            (Focus::Categories, KeyCode::Enter | KeyCode::Char(' ')) => {
                let position = app.category_state.selected().unwrap_or(0);
                app.select_category_at(position);
            }
            (Focus::Results, KeyCode::Down | KeyCode::Char('j')) => app.move_result(1),
            (Focus::Results, KeyCode::Up | KeyCode::Char('k')) => app.move_result(-1),
            (Focus::Results, KeyCode::Enter) => app.show_detail = !app.show_detail,
            (_, KeyCode::Char('q')) => return Ok(()),
            _ => {}
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Search box
            Constraint::Min(0),    // Categories + businesses
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_search(f, chunks[0], app);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(0)])
        .split(chunks[1]);

    render_categories(f, body[0], app);

    if app.show_detail {
        let content = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(body[1]);
        render_businesses(f, content[0], app);
        render_detail_panel(f, content[1], app);
    } else {
        render_businesses(f, body[1], app);
    }

    render_status_bar(f, chunks[2], app);
}

fn border_for(app: &App, focus: Focus) -> Style {
    if app.focus == focus {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    }
}

fn render_search(f: &mut Frame, area: Rect, app: &App) {
    let search = Paragraph::new(Line::from(vec![
        Span::styled("🔍 ", Style::default().fg(Color::Cyan)),
        Span::raw(app.filter_state.search_term.clone()),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_for(app, Focus::Search))
            .title(" Search "),
    );

    f.render_widget(search, area);
}

fn render_categories(f: &mut Frame, area: Rect, app: &mut App) {
    let active = app.index.position_of(app.filter_state.selected_category.as_deref());

    let items: Vec<ListItem> = app
        .index
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let style = if Some(i) == active {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(entry.label().to_string()).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_for(app, Focus::Categories))
                .title(" Categories "),
        )
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("→ ");

    f.render_stateful_widget(list, area, &mut app.category_state);
}

fn render_businesses(f: &mut Frame, area: Rect, app: &mut App) {
    let outcome = view(&app.catalog, &app.filter_state);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_for(app, Focus::Results))
        .title(" Businesses ");

    if let FilterOutcome::NoResults { message } = outcome {
        let empty = Paragraph::new(message).style(Style::default().fg(Color::DarkGray)).block(block);
        f.render_widget(empty, area);
        return;
    }

    let table_rows = rows(&outcome).into_iter().map(|row| match row {
        ListRow::Header(label) => Row::new(vec![Cell::from(label).style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )]),
        ListRow::Business(b) => Row::new(vec![
            Cell::from(b.shop_name.clone()),
            Cell::from(b.owner_name.clone()),
            Cell::from(contact::format_phone_number(&b.contact_number)),
        ]),
    });

    // Selection counts businesses only; map it to the row index
    let mut row_state = TableState::default();
    if let Some(selected) = app.results_state.selected() {
        let row_index = rows(&outcome)
            .iter()
            .enumerate()
            .filter(|(_, row)| matches!(row, ListRow::Business(_)))
            .nth(selected)
            .map(|(i, _)| i);
        row_state.select(row_index);
    }

    let table = Table::new(
        table_rows,
        [
            Constraint::Percentage(40),
            Constraint::Percentage(35),
            Constraint::Percentage(25),
        ],
    )
    .block(block)
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut row_state);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let lines = match app.selected_business() {
        Some(b) => vec![
            Line::from(Span::styled(
                b.shop_name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("मालक: {}", b.owner_name)),
            Line::from(format!("संपर्क: {}", contact::format_phone_number(&b.contact_number))),
            Line::from(""),
            Line::from(contact::tel_uri(b)),
            Line::from(contact::whatsapp_uri(b)),
            Line::from(contact::share_url(b, &app.site_url)),
        ],
        None => vec![Line::from("Select a business (Tab, ↑/↓)")],
    };

    let detail = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Contact "),
    );

    f.render_widget(detail, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let count = view(&app.catalog, &app.filter_state).count();

    let status_spans = vec![
        Span::styled(format!(" {} ", app.history.location().href()), Style::default().fg(Color::Cyan)),
        Span::raw(" | "),
        Span::styled(format!("{} shown", count), Style::default().fg(Color::Green)),
        Span::raw(" | "),
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(" Focus | "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" Select | "),
        Span::styled("Esc", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(Line::from(status_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}
