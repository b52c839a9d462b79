mod ui;

use chrono::{DateTime, Local, Utc};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use echotype::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    corpus::{filter, BookFilter, BookListPage, BookRecord, Corpus, LengthMode},
    feedback::{FeedbackDraft, FeedbackOutbox},
    history::HistoryDb,
    logging,
    runtime::{CrosstermEventSource, EchoEvent, FixedTicker, Runner},
    selector::{BookSelector, SelectionRequest},
    session::{SessionResult, SessionSignal, TypingSession},
    typing_policy::KeyPress,
};
use rand::{rngs::StdRng, SeedableRng};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    fs::File,
    io::{self, stdin, Write},
    path::PathBuf,
    time::{Duration, SystemTime},
};
use tracing::{info, warn};
use webbrowser::Browser;

const TICK_RATE_MS: u64 = 100;

/// typing practice against quotes from public-domain books
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Practice typing against quotes from public-domain books, with live speed and accuracy, a results view with speed/accuracy charts, and a local session history."
)]
pub struct Cli {
    /// quote length to practice (defaults to the last mode used)
    #[clap(short = 'm', long, value_enum)]
    mode: Option<LengthMode>,

    /// JSON file of book records to practice with (defaults to the built-in sample)
    #[clap(short = 'c', long, value_name = "PATH")]
    corpus: Option<PathBuf>,

    /// practice a custom text instead of a book quote
    #[clap(short = 'q', long)]
    quote: Option<String>,

    /// only offer books whose title contains this text
    #[clap(long)]
    title: Option<String>,

    /// only offer books whose author contains this text
    #[clap(long)]
    author: Option<String>,

    /// only offer books in this language
    #[clap(long)]
    language: Option<String>,

    /// print the books matching the filter and exit
    #[clap(long)]
    list_books: bool,

    /// print the N most recent sessions and personal bests, then exit
    #[clap(long, value_name = "N", num_args = 0..=1, default_missing_value = "10")]
    history: Option<usize>,

    /// write the session history as CSV to PATH and exit
    #[clap(long, value_name = "PATH")]
    export_history: Option<PathBuf>,

    /// queue feedback for the maintainers and exit
    #[clap(long, value_name = "TEXT")]
    feedback: Option<String>,

    /// agree to the feedback being stored and processed
    #[clap(long, requires = "feedback")]
    agree: bool,

    /// do not record finished sessions in the history database
    #[clap(long)]
    no_history: bool,
}

impl Cli {
    fn book_filter(&self) -> BookFilter {
        BookFilter {
            title: self.title.clone().unwrap_or_default(),
            author: self.author.clone().unwrap_or_default(),
            language: self.language.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AppState {
    #[default]
    Typing,
    Results,
    Filter,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterField {
    #[default]
    Title,
    Author,
    Language,
    Books,
}

impl FilterField {
    fn next(self) -> Self {
        match self {
            FilterField::Title => FilterField::Author,
            FilterField::Author => FilterField::Language,
            FilterField::Language => FilterField::Books,
            FilterField::Books => FilterField::Title,
        }
    }

    fn previous(self) -> Self {
        match self {
            FilterField::Title => FilterField::Books,
            FilterField::Author => FilterField::Title,
            FilterField::Language => FilterField::Author,
            FilterField::Books => FilterField::Language,
        }
    }
}

/// Draft criteria and browse position while the filter screen is open
#[derive(Debug, Clone, Default)]
pub struct FilterPanel {
    pub draft: BookFilter,
    pub focus: FilterField,
    pub page: BookListPage,
    pub selected: usize,
    pub suggestion: Option<usize>,
    pub return_to: AppState,
}

impl FilterPanel {
    fn open(applied: &BookFilter, return_to: AppState) -> Self {
        Self {
            draft: applied.clone(),
            return_to,
            ..Self::default()
        }
    }

    /// Selectable books matching the draft
    pub fn matches<'a>(&self, books: &'a [BookRecord]) -> Vec<&'a BookRecord> {
        self.draft
            .apply(books)
            .into_iter()
            .filter(|book| book.is_selectable())
            .collect()
    }

    pub fn visible_books<'a>(&self, books: &'a [BookRecord]) -> Vec<&'a BookRecord> {
        self.page.visible(&self.matches(books)).to_vec()
    }

    pub fn suggestions(&self, books: &[BookRecord]) -> Vec<String> {
        match self.focus {
            FilterField::Title => filter::title_suggestions(books, &self.draft.title),
            FilterField::Author => filter::author_suggestions(books, &self.draft.author),
            FilterField::Language | FilterField::Books => Vec::new(),
        }
    }

    fn edit(&mut self, change: impl FnOnce(&mut String)) {
        match self.focus {
            FilterField::Title => change(&mut self.draft.title),
            FilterField::Author => change(&mut self.draft.author),
            FilterField::Language | FilterField::Books => return,
        }
        self.reset_results();
    }

    fn reset_results(&mut self) {
        self.page.reset();
        self.selected = 0;
        self.suggestion = None;
    }

    fn focus_next(&mut self) {
        self.focus = self.focus.next();
        self.suggestion = None;
    }

    fn focus_previous(&mut self) {
        self.focus = self.focus.previous();
        self.suggestion = None;
    }

    fn step_suggestion(&mut self, count: usize, forward: bool) {
        if count == 0 {
            self.suggestion = None;
            return;
        }
        self.suggestion = Some(match (self.suggestion, forward) {
            (None, true) => 0,
            (None, false) => count - 1,
            (Some(idx), true) => (idx + 1) % count,
            (Some(idx), false) => (idx + count - 1) % count,
        });
    }

    fn step_selection(&mut self, visible: usize, forward: bool) {
        if visible == 0 {
            self.selected = 0;
        } else if forward {
            self.selected = (self.selected + 1).min(visible - 1);
        } else {
            self.selected = self.selected.saturating_sub(1);
        }
    }

    /// Walk "any language" -> first -> ... -> last -> "any language"
    fn cycle_language(&mut self, languages: &[String], forward: bool) {
        let current = self
            .draft
            .language
            .as_ref()
            .and_then(|lang| languages.iter().position(|l| l == lang));
        let next = match (current, forward) {
            (None, true) => languages.first(),
            (None, false) => languages.last(),
            (Some(idx), true) => languages.get(idx + 1),
            (Some(idx), false) => idx.checked_sub(1).and_then(|prev| languages.get(prev)),
        };
        self.draft.language = next.cloned();
        self.reset_results();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

pub struct App {
    pub corpus: Corpus,
    selector: BookSelector<StdRng>,
    pub mode: LengthMode,
    /// Filter currently handed to the selector
    pub filter: BookFilter,
    filtered: Vec<BookRecord>,
    pub current_book: Option<BookRecord>,
    pub custom_quote: Option<String>,
    pub session: TypingSession,
    pub last_result: Option<SessionResult>,
    pub best_speed: Option<u32>,
    pub state: AppState,
    pub filter_panel: FilterPanel,
    history: Option<HistoryDb>,
    /// Clock used for the live elapsed-time readout
    pub now: SystemTime,
}

impl App {
    pub fn new(
        corpus: Corpus,
        mode: LengthMode,
        filter: BookFilter,
        custom_quote: Option<String>,
        rng: StdRng,
    ) -> Self {
        let filtered = filter.subset(corpus.books());
        let mut app = Self {
            corpus,
            selector: BookSelector::new(rng),
            mode,
            filter,
            filtered,
            current_book: None,
            custom_quote: None,
            session: TypingSession::default(),
            last_result: None,
            best_speed: None,
            state: AppState::Typing,
            filter_panel: FilterPanel::default(),
            history: None,
            now: SystemTime::now(),
        };

        match custom_quote {
            Some(quote) => {
                app.session.load(quote.as_str());
                app.custom_quote = Some(quote);
            }
            None => app.select_quote(false, None),
        }
        app
    }

    pub fn with_history(mut self, history: HistoryDb) -> Self {
        self.history = Some(history);
        self.refresh_best_speed();
        self
    }

    /// Ask the selector for the next quote and start a fresh session with it
    pub fn select_quote(&mut self, force_new_book: bool, explicit: Option<BookRecord>) {
        self.custom_quote = None;

        let request = SelectionRequest {
            mode: self.mode,
            filtered: &self.filtered,
            force_new_book,
            current_book: self.current_book.as_ref(),
            explicit_book: explicit.as_ref(),
        };
        let picked = self
            .selector
            .select(&self.corpus, &request)
            .map(|selection| {
                (
                    selection.book.clone(),
                    selection.quote.to_string(),
                    selection.mode,
                )
            });

        match picked {
            Some((book, quote, mode)) => {
                self.mode = mode;
                self.current_book = Some(book);
                self.session.load(quote);
            }
            None => {
                info!(mode = %self.mode, "No quote available");
                self.current_book = None;
                self.session = TypingSession::default();
            }
        }

        self.last_result = None;
        self.state = AppState::Typing;
        self.refresh_best_speed();
    }

    pub fn retake(&mut self) {
        let quote = self.session.quote().to_string();
        self.session.load(quote);
        self.last_result = None;
        self.state = AppState::Typing;
    }

    pub fn cycle_mode(&mut self, forward: bool) {
        self.mode = if forward {
            self.mode.next()
        } else {
            self.mode.previous()
        };
        self.select_quote(false, None);
    }

    pub fn handle_key(&mut self, key: KeyEvent, at: SystemTime) -> Control {
        if key.kind != KeyEventKind::Press {
            return Control::Continue;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Control::Quit;
        }

        match self.state {
            AppState::Typing => self.on_typing_key(key, at),
            AppState::Results => self.on_results_key(key),
            AppState::Filter => {
                self.on_filter_key(key);
                Control::Continue
            }
        }
    }

    fn on_typing_key(&mut self, key: KeyEvent, at: SystemTime) -> Control {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Esc => return Control::Quit,
            KeyCode::Left => self.cycle_mode(false),
            KeyCode::Right => self.cycle_mode(true),
            KeyCode::Char('f') if ctrl => self.open_filter(),
            KeyCode::Char('r') if ctrl => self.retake(),
            KeyCode::Tab if self.session.is_empty() => self.select_quote(true, None),
            _ => match self.session.key_press(&KeyPress::from(key), at) {
                SessionSignal::NextBookRequested => self.select_quote(true, None),
                SessionSignal::Finished(result) => self.finish(result, at),
                SessionSignal::Ignored | SessionSignal::Updated => {}
            },
        }
        Control::Continue
    }

    fn on_results_key(&mut self, key: KeyEvent) -> Control {
        match key.code {
            KeyCode::Esc => return Control::Quit,
            KeyCode::Char('r') => self.retake(),
            KeyCode::Char('n') | KeyCode::Tab => self.select_quote(true, None),
            KeyCode::Char('f') => self.open_filter(),
            KeyCode::Char('o') => self.open_source(),
            _ => {}
        }
        Control::Continue
    }

    fn on_filter_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Esc => self.state = self.filter_panel.return_to,
            KeyCode::Char('a') if ctrl => self.apply_filter(),
            KeyCode::Char('l') if ctrl => self.filter_panel.page.load_more(),
            KeyCode::Tab => self.filter_panel.focus_next(),
            KeyCode::BackTab => self.filter_panel.focus_previous(),
            KeyCode::Up => self.move_in_filter(false),
            KeyCode::Down => self.move_in_filter(true),
            KeyCode::Left | KeyCode::Right if self.filter_panel.focus == FilterField::Language => {
                let languages = filter::available_languages(self.corpus.books());
                self.filter_panel
                    .cycle_language(&languages, key.code == KeyCode::Right);
            }
            KeyCode::Enter => self.confirm_in_filter(),
            KeyCode::Backspace => self.filter_panel.edit(|text| {
                text.pop();
            }),
            KeyCode::Char(c) if !ctrl => self.filter_panel.edit(|text| text.push(c)),
            _ => {}
        }
    }

    fn move_in_filter(&mut self, forward: bool) {
        match self.filter_panel.focus {
            FilterField::Title | FilterField::Author => {
                let count = self.filter_panel.suggestions(self.corpus.books()).len();
                self.filter_panel.step_suggestion(count, forward);
            }
            FilterField::Language => {
                let languages = filter::available_languages(self.corpus.books());
                self.filter_panel.cycle_language(&languages, forward);
            }
            FilterField::Books => {
                let visible = self.filter_panel.visible_books(self.corpus.books()).len();
                self.filter_panel.step_selection(visible, forward);
            }
        }
    }

    fn confirm_in_filter(&mut self) {
        match self.filter_panel.focus {
            FilterField::Title | FilterField::Author => {
                let suggestions = self.filter_panel.suggestions(self.corpus.books());
                let chosen = self
                    .filter_panel
                    .suggestion
                    .and_then(|idx| suggestions.get(idx))
                    .cloned();
                match chosen {
                    Some(value) => self.filter_panel.edit(|text| *text = value),
                    None => self.filter_panel.focus_next(),
                }
            }
            FilterField::Language => self.filter_panel.focus_next(),
            FilterField::Books => {
                let picked = self
                    .filter_panel
                    .visible_books(self.corpus.books())
                    .get(self.filter_panel.selected)
                    .map(|book| (*book).clone());
                if let Some(book) = picked {
                    info!(book_id = %book.book_id, "Picked book from filter panel");
                    self.select_quote(true, Some(book));
                }
            }
        }
    }

    fn open_filter(&mut self) {
        self.filter_panel = FilterPanel::open(&self.filter, self.state);
        self.state = AppState::Filter;
    }

    /// Hand the draft's subset to the selector and draw a book from it
    fn apply_filter(&mut self) {
        self.filter = self.filter_panel.draft.clone();
        self.filtered = self.filter.subset(self.corpus.books());
        if self.filtered.is_empty() && !self.filter.is_empty() {
            warn!(filter = ?self.filter, "Filter matched no books, using the whole corpus");
        } else {
            info!(books = self.filtered.len(), "Applied book filter");
        }
        self.select_quote(true, None);
    }

    fn finish(&mut self, result: SessionResult, at: SystemTime) {
        if let Some(history) = self.history.as_mut() {
            let finished_at: DateTime<Local> = at.into();
            if let Err(err) =
                history.record(&result, self.current_book.as_ref(), self.mode, finished_at)
            {
                warn!("Failed to record session history: {err}");
            }
        }

        self.last_result = Some(result);
        self.refresh_best_speed();
        self.state = AppState::Results;
    }

    fn open_source(&self) {
        let Some(book) = &self.current_book else {
            return;
        };
        if Browser::is_available() {
            if let Err(err) = webbrowser::open(&book.resolved_source_url()) {
                warn!(book_id = %book.book_id, "Failed to open source text: {err}");
            }
        }
    }

    fn refresh_best_speed(&mut self) {
        self.best_speed = match &self.history {
            Some(history) => history.best_speed(self.mode).unwrap_or_else(|err| {
                warn!("Failed to read personal best: {err}");
                None
            }),
            None => None,
        };
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let store = FileConfigStore::new();
    let mut config = store.load();

    if let Some(path) = AppDirs::log_path() {
        if let Err(err) = logging::init_tracing(&config.log_level, &path) {
            eprintln!("echotype: logging disabled: {err}");
        }
    }

    if let Some(text) = cli.feedback.clone() {
        return submit_feedback(text, cli.agree, &config);
    }
    if cli.history.is_some() || cli.export_history.is_some() {
        return report_history(&cli);
    }

    let corpus = load_corpus(&cli, &config)?;
    if cli.list_books {
        list_books(&corpus, &cli.book_filter(), &mut io::stdout())?;
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mode = cli.mode.unwrap_or(config.length_mode);
    let mut app = App::new(
        corpus,
        mode,
        cli.book_filter(),
        cli.quote.clone(),
        StdRng::from_entropy(),
    );
    if config.record_history && !cli.no_history {
        if let Some(history) = open_history() {
            app = app.with_history(history);
        }
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    outcome?;

    config.length_mode = app.mode;
    if let Err(err) = store.save(&config) {
        warn!("Failed to save config: {err}");
    }

    Ok(())
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    terminal.draw(|f| ui(app, f))?;

    loop {
        match runner.step() {
            EchoEvent::Tick => {
                app.now = SystemTime::now();
                // redraw only while the elapsed-time readout is moving
                if app.state == AppState::Typing
                    && app.session.has_started()
                    && !app.session.is_finished()
                {
                    terminal.draw(|f| ui(app, f))?;
                }
            }
            EchoEvent::Resize => {
                terminal.draw(|f| ui(app, f))?;
            }
            EchoEvent::Key { event, at } => {
                app.now = at;
                if app.handle_key(event, at) == Control::Quit {
                    break;
                }
                terminal.draw(|f| ui(app, f))?;
            }
        }
    }

    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    ui::screen::current_screen(&app.state).render(app, f);
}

fn load_corpus(cli: &Cli, config: &Config) -> Result<Corpus, Box<dyn Error>> {
    let corpus = match cli.corpus.as_ref().or(config.corpus_path.as_ref()) {
        Some(path) => Corpus::from_path(path)?,
        None => Corpus::embedded()?,
    };
    Ok(corpus)
}

fn open_history() -> Option<HistoryDb> {
    let path = AppDirs::history_db_path()?;
    match HistoryDb::open(&path) {
        Ok(history) => Some(history),
        Err(err) => {
            warn!(path = %path.display(), "Session history disabled: {err}");
            None
        }
    }
}

fn submit_feedback(text: String, agreed: bool, config: &Config) -> Result<(), Box<dyn Error>> {
    let record = match FeedbackDraft::new(text, agreed)
        .into_record(&config.feedback_destination, Utc::now())
    {
        Ok(record) => record,
        Err(err) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::ValueValidation, err).exit();
        }
    };

    let path = AppDirs::feedback_outbox_path().ok_or("no state directory for the feedback outbox")?;
    let outbox = FeedbackOutbox::new(&path);
    outbox.submit(&record)?;
    println!("Feedback {} queued in {}", record.feedback_id, path.display());
    Ok(())
}

fn report_history(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let path = AppDirs::history_db_path().ok_or("no state directory for the history database")?;
    let history = HistoryDb::open(&path)?;

    if let Some(out) = &cli.export_history {
        let written = history.export_csv(File::create(out)?)?;
        println!("Exported {written} sessions to {}", out.display());
    }
    if let Some(limit) = cli.history {
        print_history(&history, limit, Local::now(), &mut io::stdout())?;
    }
    Ok(())
}

fn print_history<W: Write>(
    history: &HistoryDb,
    limit: usize,
    now: DateTime<Local>,
    out: &mut W,
) -> Result<(), Box<dyn Error>> {
    let entries = history.recent(limit)?;
    if entries.is_empty() {
        writeln!(out, "No sessions recorded yet.")?;
        return Ok(());
    }

    for entry in &entries {
        writeln!(
            out,
            "{:>4} wpm  {:>3}% acc  {:<6}  {}  ({})",
            entry.speed,
            entry.accuracy,
            entry.mode.to_string(),
            entry.title.as_deref().unwrap_or("custom text"),
            entry.age(now)
        )?;
    }

    writeln!(out)?;
    for mode in LengthMode::ALL {
        if let Some(best) = history.best_speed(mode)? {
            writeln!(out, "best {:<6} {best} wpm", mode.to_string())?;
        }
    }
    Ok(())
}

fn list_books<W: Write>(corpus: &Corpus, filter: &BookFilter, out: &mut W) -> io::Result<()> {
    let books: Vec<&BookRecord> = filter
        .apply(corpus.books())
        .into_iter()
        .filter(|book| book.is_selectable())
        .collect();

    for book in &books {
        writeln!(
            out,
            "{} by {} ({}, {})  short:{} medium:{} long:{}",
            book.title,
            book.author,
            book.language,
            book.release_year(),
            book.short_quotes.len(),
            book.medium_quotes.len(),
            book.large_quotes.len()
        )?;
    }
    writeln!(out, "{} of {} books", books.len(), corpus.len())
}
