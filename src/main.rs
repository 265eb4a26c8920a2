mod backend;
mod config;
mod ending;
mod game;
mod popup;
mod render;
mod room;
mod state;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
        KeyboardEnhancementFlags, MouseButton, MouseEvent, MouseEventKind, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Frame, Terminal};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use backend::{HttpBackend, NewGameResponse, Reply, Request, Worker};
use config::{Config, RevealSetting};
use game::{ClickTarget, Game, RevealMode};
use popup::ClickPoint;
use room::{load_registry, Registry};
use ui::{draw_game, draw_loading, Screen, ScreenLayout};

const FRAME: Duration = Duration::from_millis(33);
const CONNECTING_TEXT: &str = "ESTABLISHING CONNECTION...";
const CONNECTION_FAILED_TEXT: &str = "CONNECTION FAILED - Check if backend is running";

/// The Bunker - wake up, look around, and talk HAVEN into opening the door.
#[derive(Parser, Debug)]
#[command(name = "bunker", version, about)]
struct Args {
    /// Config file (defaults to ./bunker.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend API root, e.g. http://localhost:8000/api
    #[arg(long)]
    api_base: Option<String>,

    /// Directory of room_*.toml files to use instead of the built-in rooms
    #[arg(long)]
    rooms: Option<PathBuf>,
}

enum Mode {
    Connecting,
    ConnectionFailed,
    Playing(Box<Game<Screen>>),
}

struct App {
    registry: Rc<Registry>,
    worker: Worker,
    reveal_mode: RevealMode,
    mode: Mode,
    layout: ScreenLayout,
}

impl App {
    fn new(registry: Registry, worker: Worker, reveal_mode: RevealMode) -> Self {
        App {
            registry: Rc::new(registry),
            worker,
            reveal_mode,
            mode: Mode::Connecting,
            layout: ScreenLayout::new(Rect::default()),
        }
    }

    /// Asks the backend for a new session. The game starts once the reply
    /// is drained in `tick`; anything still in flight from an earlier
    /// session is dropped.
    fn connect(&mut self) {
        self.worker.restart();
        self.mode = Mode::Connecting;
        self.worker.dispatch(Request::NewGame);
    }

    fn on_session(&mut self, session: Result<NewGameResponse>) {
        let started = session.context("starting a new session").and_then(|session| {
            Game::start(session, Rc::clone(&self.registry), Screen::default(), self.reveal_mode)
        });
        self.mode = match started {
            Ok(game) => Mode::Playing(Box::new(game)),
            Err(e) => {
                error!(error = %format!("{:#}", e), "session start failed");
                Mode::ConnectionFailed
            }
        };
    }

    fn flush_requests(&mut self) {
        if let Mode::Playing(game) = &mut self.mode {
            for request in game.take_requests() {
                self.worker.dispatch(request);
            }
        }
    }

    fn tick(&mut self, elapsed: Duration) {
        for reply in self.worker.drain() {
            if let Mode::Playing(game) = &mut self.mode {
                game.on_reply(reply);
                continue;
            }
            match reply {
                Reply::NewGame(session) if matches!(self.mode, Mode::Connecting) => self.on_session(session),
                other => debug!(reply = ?other, "dropping reply"),
            }
        }
        if let Mode::Playing(game) = &mut self.mode {
            game.tick(elapsed);
        }
        self.flush_requests();
    }

    /// Returns false when the player wants out.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let pressed = key.kind != KeyEventKind::Release;
        if pressed && key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return false;
        }

        match &mut self.mode {
            Mode::Connecting => {}
            Mode::ConnectionFailed => {
                if pressed {
                    return false;
                }
            }
            Mode::Playing(game) => {
                if pressed && game.restart_available() && matches!(key.code, KeyCode::Char('r') | KeyCode::Char('R'))
                {
                    info!("restarting");
                    self.connect();
                } else {
                    game.on_key(key);
                }
            }
        }
        true
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if !matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left)) {
            return;
        }
        let Mode::Playing(game) = &mut self.mode else {
            return;
        };
        let target = if let Some((x, y)) = self.layout.room_point(mouse.column, mouse.row) {
            ClickTarget::Room(ClickPoint::new(x, y))
        } else if self.layout.in_chat(mouse.column, mouse.row) {
            ClickTarget::Chat
        } else {
            ClickTarget::Elsewhere
        };
        game.on_click(target);
    }

    fn ending(&self) -> Option<ending::EndingKind> {
        match &self.mode {
            Mode::Playing(game) => game.port().ending().map(|e| e.kind),
            _ => None,
        }
    }
}

fn draw_ui(f: &mut Frame, app: &mut App) {
    app.layout = ScreenLayout::new(f.area());
    match &app.mode {
        Mode::Connecting => draw_loading(f, CONNECTING_TEXT, false),
        Mode::ConnectionFailed => draw_loading(f, CONNECTION_FAILED_TEXT, true),
        Mode::Playing(game) => draw_game(f, game),
    }
}

fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    // The terminal belongs to the UI, so logs only go to the file.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("BUNKER_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    terminal.draw(|f| draw_ui(f, app))?;
    app.connect();

    let mut last = Instant::now();
    loop {
        terminal.draw(|f| draw_ui(f, app))?;

        if event::poll(FRAME)? {
            match event::read()? {
                Event::Key(key) => {
                    if !app.handle_key(key) {
                        break;
                    }
                }
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }

        let now = Instant::now();
        app.tick(now - last);
        last = now;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(api_base) = args.api_base {
        config.api_base = api_base;
    }
    if let Some(rooms) = args.rooms {
        config.rooms_dir = Some(rooms);
    }

    init_logging(&config.log_file)?;
    info!(api = %config.api_base, "starting");

    let registry = match &config.rooms_dir {
        Some(dir) => load_registry(dir)?,
        None => Registry::builtin()?,
    };
    let backend = Arc::new(HttpBackend::new(&config.api_base, config.request_timeout()));
    let worker = Worker::new(backend);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let key_releases = crossterm::terminal::supports_keyboard_enhancement().unwrap_or(false);
    if key_releases {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    let reveal_mode = match config.hold_to_reveal {
        RevealSetting::Hold => RevealMode::Hold,
        RevealSetting::Toggle => RevealMode::Toggle,
        RevealSetting::Auto if key_releases => RevealMode::Hold,
        RevealSetting::Auto => RevealMode::Toggle,
    };

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let mut app = App::new(registry, worker, reveal_mode);

    let result = run(&mut terminal, &mut app);

    if key_releases {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result?;

    if let Some(ending) = app.ending() {
        println!("\nThe Bunker: {} ending.\n", ending);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend::fake::FakeBackend;

    fn app(backend: FakeBackend) -> App {
        App::new(Registry::builtin().unwrap(), Worker::new(Arc::new(backend)), RevealMode::Hold)
    }

    fn tick_until(app: &mut App, done: impl Fn(&App) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            app.tick(Duration::from_millis(5));
            if done(app) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn playing(app: &App) -> bool {
        matches!(app.mode, Mode::Playing(_))
    }

    #[test]
    fn connect_does_not_wait_for_the_backend() {
        let mut backend = FakeBackend::new();
        backend.new_game_delay = Duration::from_millis(300);
        let mut app = app(backend);

        let started = Instant::now();
        app.connect();
        assert!(started.elapsed() < Duration::from_millis(300));
        assert!(matches!(app.mode, Mode::Connecting));

        app.tick(Duration::from_millis(5));
        assert!(matches!(app.mode, Mode::Connecting));
        assert!(tick_until(&mut app, playing));
    }

    #[test]
    fn ctrl_c_quits_while_connecting() {
        let mut backend = FakeBackend::new();
        backend.new_game_delay = Duration::from_millis(300);
        let mut app = app(backend);
        app.connect();
        assert!(!app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn failed_session_shows_connection_failure() {
        let mut backend = FakeBackend::new();
        backend.fail_all = true;
        let mut app = app(backend);
        app.connect();
        assert!(tick_until(&mut app, |a| matches!(a.mode, Mode::ConnectionFailed)));
        assert!(!app.handle_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE)));
    }

    #[test]
    fn greeting_follows_the_session() {
        let mut app = app(FakeBackend::new());
        app.connect();
        assert!(tick_until(&mut app, |a| match &a.mode {
            Mode::Playing(game) => game.state().popup_open(),
            _ => false,
        }));
    }

    #[test]
    fn reconnect_starts_over() {
        let mut app = app(FakeBackend::new());
        app.connect();
        assert!(tick_until(&mut app, playing));

        app.connect();
        assert!(matches!(app.mode, Mode::Connecting));
        assert!(tick_until(&mut app, playing));
    }
}
