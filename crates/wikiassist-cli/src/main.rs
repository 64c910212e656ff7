use anyhow::{Context, Result, anyhow};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use relative_path::RelativePathBuf;
use std::{
    env,
    fs::{self, OpenOptions},
    io::{Stdout, stdout},
    path::{Path, PathBuf},
    process,
};
use wikiassist_config::Config;
use wikiassist_engine::{
    DraftFile, EditingMode, FeedbackId, FeedbackRecord, FeedbackStatus, Marker, Notification,
    ReviewSession, Severity, io,
};

struct App {
    drafts_path: PathBuf,
    draft: DraftFile,
    session: ReviewSession,
    feedback_list_state: ListState,
    status: String,
}

impl App {
    fn new(drafts_path: PathBuf, draft: DraftFile, review_path: PathBuf) -> Result<Self> {
        let content = io::read_draft(draft.relative_path(), &drafts_path)?;
        let mut session = ReviewSession::from_markdown(&content);

        let status = match io::read_review(&review_path) {
            Ok(response) => {
                session.load_review(response);
                format!("Loaded review from {}", review_path.display())
            }
            Err(io::IoError::NotFound(_)) => format!(
                "No review at {}; run `wikiassist request {}`",
                review_path.display(),
                draft.relative_path()
            ),
            Err(e) => return Err(e.into()),
        };

        let mut app = Self {
            drafts_path,
            draft,
            session,
            feedback_list_state: ListState::default(),
            status,
        };

        if !app.session.feedback().is_empty() {
            app.select_index(0);
        }

        Ok(app)
    }

    fn selected_id(&self) -> Option<FeedbackId> {
        let index = self.feedback_list_state.selected()?;
        self.session.feedback().records().get(index).map(|r| r.id)
    }

    fn select_index(&mut self, index: usize) {
        self.feedback_list_state.select(Some(index));
        let id = self.selected_id();
        if let Err(e) = self.session.select(id) {
            log::warn!("selection failed: {e}");
        }
    }

    fn next_feedback(&mut self) {
        let len = self.session.feedback().len();
        if len == 0 {
            return;
        }
        let i = match self.feedback_list_state.selected() {
            Some(i) => (i + 1) % len,
            None => 0,
        };
        self.select_index(i);
    }

    fn previous_feedback(&mut self) {
        let len = self.session.feedback().len();
        if len == 0 {
            return;
        }
        let i = match self.feedback_list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.select_index(i);
    }

    /// Move to the first pending record after the current one, wrapping around.
    fn select_next_pending(&mut self) {
        let current = self.feedback_list_state.selected().unwrap_or(0);
        let feedback = self.session.feedback();
        let pending: Vec<usize> = feedback
            .pending()
            .filter_map(|r| feedback.position(r.id))
            .collect();
        let next = pending
            .iter()
            .copied()
            .find(|&i| i > current)
            .or_else(|| pending.first().copied());
        if let Some(i) = next {
            self.select_index(i);
        }
    }

    fn accept_selected(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        self.status = match self.session.accept(id) {
            Ok(notification) => {
                self.select_next_pending();
                describe(&notification)
            }
            Err(e) => format!("Could not accept: {e}"),
        };
    }

    fn reject_selected(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        self.status = match self.session.reject(id) {
            Ok(notification) => {
                self.select_next_pending();
                describe(&notification)
            }
            Err(e) => format!("Could not reject: {e}"),
        };
    }

    fn toggle_mode(&mut self) {
        let mode = self.session.mode().toggled();
        self.session.set_mode(mode);
        self.status = match mode {
            EditingMode::Structured => "Showing document with highlights".to_string(),
            EditingMode::Flattened => "Showing markdown source".to_string(),
        };
    }

    fn save(&mut self) {
        let markdown = self.session.markdown();
        self.status = match io::write_draft(self.draft.relative_path(), &self.drafts_path, &markdown)
        {
            Ok(()) => {
                log::info!("saved {}", self.draft.relative_path());
                format!("Saved {}", self.draft.relative_path())
            }
            Err(e) => format!("Save failed: {e}"),
        };
    }

    fn document_lines(&self) -> Vec<Line<'static>> {
        match self.session.mode() {
            EditingMode::Flattened => self
                .session
                .markdown()
                .lines()
                .map(|line| Line::from(line.to_string()))
                .collect(),
            EditingMode::Structured => {
                highlighted_lines(self.session.index().flat_text(), self.session.overlay())
            }
        }
    }
}

fn describe(notification: &Notification) -> String {
    match notification {
        Notification::FeedbackSelected(id) => format!("Selected {id}"),
        Notification::Accepted(record) => format!("Accepted: {}", record.suggested_text),
        Notification::Rejected(record) => format!("Rejected: {}", record.original_sentence),
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::High => Color::Red,
        Severity::Medium => Color::Yellow,
        Severity::Low => Color::Blue,
    }
}

fn marker_style(marker: &Marker) -> Style {
    let style = Style::default()
        .fg(severity_color(marker.severity))
        .add_modifier(Modifier::UNDERLINED);
    if marker.selected {
        style.add_modifier(Modifier::REVERSED)
    } else {
        style
    }
}

/// Split the flat text into lines, styling the characters under each marker.
fn highlighted_lines(flat: &str, markers: &[Marker]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut offset = 0;

    for text in flat.split('\n') {
        let mut spans: Vec<Span<'static>> = Vec::new();
        let mut run = String::new();
        let mut run_style = Style::default();

        for ch in text.chars() {
            let style = markers
                .iter()
                .find(|m| m.flat.contains(&offset))
                .map(marker_style)
                .unwrap_or_default();
            if style != run_style && !run.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut run), run_style));
            }
            run_style = style;
            run.push(ch);
            offset += 1;
        }
        if !run.is_empty() {
            spans.push(Span::styled(run, run_style));
        }

        lines.push(Line::from(spans));
        lines.push(Line::default());
        // the synthetic separator
        offset += 1;
    }

    lines
}

fn status_label(status: FeedbackStatus) -> &'static str {
    match status {
        FeedbackStatus::Pending => " ",
        FeedbackStatus::Accepted => "✓",
        FeedbackStatus::Rejected => "✗",
    }
}

fn feedback_item(record: &FeedbackRecord) -> ListItem<'static> {
    let style = if record.is_pending() {
        Style::default().fg(severity_color(record.severity))
    } else {
        Style::default().fg(Color::DarkGray)
    };
    ListItem::new(vec![
        Line::from(vec![Span::styled(
            format!(
                "[{}] {} ({})",
                status_label(record.status),
                record.issue_type.label(),
                record.severity.as_str()
            ),
            style,
        )]),
        Line::from(format!("    {}", record.original_sentence)),
    ])
}

/// Resolve a command-line draft argument against the drafts root.
fn resolve_draft(drafts_path: &Path, arg: &str) -> Result<DraftFile> {
    let path = Path::new(arg);
    let relative = if path.is_absolute() {
        path.strip_prefix(drafts_path).with_context(|| {
            format!(
                "'{}' is not inside the drafts folder '{}'",
                path.display(),
                drafts_path.display()
            )
        })?
    } else {
        path
    };
    let relative = RelativePathBuf::from_path(relative)
        .map_err(|e| anyhow!("Invalid draft path '{}': {e}", path.display()))?;
    Ok(DraftFile::new(relative))
}

fn init_logging() -> Result<()> {
    let log_path = Config::log_path();
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    // The terminal belongs to the TUI, so logs go to a file
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn usage(program: &str) -> ! {
    eprintln!("Usage:");
    eprintln!("  {program} <draft.md> [review.json]   review a draft");
    eprintln!("  {program} request <draft.md> [title]  print the review request body");
    eprintln!("  {program} list                        list drafts");
    process::exit(1);
}

fn main() -> Result<()> {
    init_logging()?;
    log::info!("wikiassist starting up");

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("wikiassist");
    let config_path = Config::config_path();

    let config = match Config::load() {
        Ok(Some(config)) => config,
        Ok(None) => {
            // First run: remember the current directory as the drafts folder
            let config = Config::new(env::current_dir()?);
            match config.save() {
                Ok(()) => log::info!(
                    "wrote default config to {} with drafts folder {}",
                    config_path.display(),
                    config.drafts_path.display()
                ),
                Err(e) => log::warn!("could not write default config: {e}"),
            }
            config
        }
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = io::validate_drafts_dir(&config.drafts_path) {
        eprintln!(
            "Error: Drafts path '{}' from config file '{}' is invalid: {e}",
            config.drafts_path.display(),
            config_path.display()
        );
        process::exit(1);
    }

    match args.get(1).map(String::as_str) {
        None => usage(program),
        Some("list") => {
            for path in io::scan_drafts(&config.drafts_path)? {
                let shown = path.strip_prefix(&config.drafts_path).unwrap_or(&path);
                println!("{}", shown.display());
            }
            Ok(())
        }
        Some("request") => {
            let Some(draft_arg) = args.get(2) else {
                usage(program)
            };
            let draft = resolve_draft(&config.drafts_path, draft_arg)?;
            let content = io::read_draft(draft.relative_path(), &config.drafts_path)?;
            let session = ReviewSession::from_markdown(&content);
            let title = args.get(3).cloned().unwrap_or_else(|| draft.review_title());

            eprintln!("POST {}", config.review_endpoint());
            println!(
                "{}",
                serde_json::to_string_pretty(&session.review_request(Some(title)))?
            );
            eprintln!(
                "Save the response as {}",
                draft.review_path().to_path(&config.drafts_path).display()
            );
            Ok(())
        }
        Some(draft_arg) => {
            let draft = resolve_draft(&config.drafts_path, draft_arg)?;
            let review_path = match args.get(2) {
                Some(path) => PathBuf::from(path),
                None => draft.review_path().to_path(&config.drafts_path),
            };
            let app = App::new(config.drafts_path.clone(), draft, review_path)?;
            run_tui(app)
        }
    }
}

fn run_tui(mut app: App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Down | KeyCode::Char('j') => app.next_feedback(),
                KeyCode::Up | KeyCode::Char('k') => app.previous_feedback(),
                KeyCode::Char('a') => app.accept_selected(),
                KeyCode::Char('r') => app.reject_selected(),
                KeyCode::Char('m') => app.toggle_mode(),
                KeyCode::Char('s') => app.save(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)].as_ref())
        .split(f.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)].as_ref())
        .split(rows[0]);

    // Feedback panel
    let summary = app.session.feedback().summary();
    let title = match app.session.overview() {
        Some(overview) => format!(
            "Feedback: {} pending, score {}",
            summary.pending, overview.overall_score
        ),
        None => "Feedback".to_string(),
    };
    let items: Vec<ListItem> = app
        .session
        .feedback()
        .records()
        .iter()
        .map(feedback_item)
        .collect();
    let feedback_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));

    f.render_stateful_widget(feedback_list, chunks[0], &mut app.feedback_list_state);

    // Document panel, with the selected suggestion underneath
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(6)].as_ref())
        .split(chunks[1]);

    let document_title = match app.session.mode() {
        EditingMode::Structured => app.draft.display_name().to_string(),
        EditingMode::Flattened => format!("{} (markdown)", app.draft.display_name()),
    };
    let document = Paragraph::new(app.document_lines())
        .block(Block::default().borders(Borders::ALL).title(document_title))
        .wrap(Wrap { trim: false });
    f.render_widget(document, right[0]);

    let detail = match app
        .selected_id()
        .and_then(|id| app.session.feedback().get(id))
    {
        Some(record) => vec![
            Line::from(record.feedback.clone()),
            Line::from(vec![
                Span::styled("→ ", Style::default().fg(Color::Green)),
                Span::raw(record.suggested_text.clone()),
            ]),
        ],
        None => vec![Line::from("No feedback selected")],
    };
    let detail = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title("Suggestion"))
        .wrap(Wrap { trim: true });
    f.render_widget(detail, right[1]);

    // Instructions
    let help = Paragraph::new(vec![
        Line::from(app.status.clone()),
        Line::from(vec![
            Span::raw("q: Quit | "),
            Span::raw("↑/k ↓/j: Select | "),
            Span::raw("a: Accept | r: Reject | "),
            Span::raw("m: Toggle markdown | s: Save"),
        ]),
    ]);
    f.render_widget(help, rows[1]);
}
