use crate::backend::{Backend, MpvBackend, TrackEvent};
use crate::config::Settings;
use crate::core::{PlayerState, Skip};
use crate::error::{Error, Result};
use crate::input::{InputSource, Readiness};
use crate::keys::{Command, command_for_key};
use crate::library::Catalog;
use crate::signal;
use crate::ui::{self, Screen};
use crate::view::ViewState;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::{Position, Rect};
use std::io::{self, Stdout, stdout};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct RunOptions {
    pub root: PathBuf,
    pub settings: Settings,
}

/// Everything one run of the player owns: the catalog, the engine link and
/// the state both the loop and the renderer read.
pub struct Session<B: Backend> {
    catalog: Catalog,
    backend: B,
    player: PlayerState,
    view: ViewState,
    area: Rect,
    seek_step: i32,
    volume_step: i32,
    status: Option<String>,
    dirty: bool,
    quit: bool,
}

impl<B: Backend> Session<B> {
    pub fn new(
        catalog: Catalog,
        backend: B,
        player: PlayerState,
        area: Rect,
        settings: &Settings,
    ) -> Self {
        let view = ViewState::new(catalog.len(), ui::list_rows(area));
        Self {
            catalog,
            backend,
            player,
            view,
            area,
            seek_step: settings.seek_step_seconds,
            volume_step: settings.volume_step_percent,
            status: None,
            dirty: true,
            quit: false,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Returns whether a redraw is due and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn screen(&self) -> Screen<'_> {
        Screen {
            catalog: &self.catalog,
            player: &self.player,
            view: &self.view,
            status: self.status.as_deref(),
        }
    }

    pub fn dispatch(&mut self, command: Command) {
        debug!(?command, "dispatch");
        match command {
            Command::Quit => self.quit = true,
            Command::CursorUp => self.view.cursor_up(),
            Command::CursorDown => self.view.cursor_down(),
            Command::ScrollUp => self.view.scroll_up(),
            Command::ScrollDown => self.view.scroll_down(),
            Command::JumpTop => self.view.jump_top(),
            Command::JumpBottom => self.view.jump_bottom(),
            Command::PlaySelection => {
                if let Some(index) = self.view.selected() {
                    self.player.play_at(index, &self.catalog, &mut self.backend);
                }
            }
            Command::TogglePause => self.player.toggle_pause(&mut self.backend),
            Command::SeekBackward => self.backend.seek(-self.seek_step),
            Command::SeekForward => self.backend.seek(self.seek_step),
            Command::VolumeDown => self.backend.set_volume(-self.volume_step),
            Command::VolumeUp => self.backend.set_volume(self.volume_step),
            Command::Previous => {
                self.player.prev(&self.catalog, &mut self.backend);
            }
            Command::Next => {
                if self.player.next(&self.catalog, &mut self.backend) == Skip::NoMoreTracks {
                    self.set_status("No more tracks");
                }
            }
            Command::ToggleAutoplay => {
                let message = if self.player.toggle_autoplay() {
                    "Autoplay on"
                } else {
                    "Autoplay off"
                };
                self.set_status(message);
            }
            Command::Shuffle => match self.player.enter_shuffle(self.catalog.len()) {
                Some(first) => {
                    self.player.play_at(first, &self.catalog, &mut self.backend);
                    let message = format!("Shuffle: {} tracks", self.catalog.len());
                    self.set_status(&message);
                }
                None => self.set_status("No tracks to shuffle"),
            },
        }
        self.dirty = true;
    }

    pub fn handle_terminal_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => {
                if let Some(command) = command_for_key(key) {
                    self.dispatch(command);
                }
            }
            Event::Resize(width, height) => {
                self.area = Rect::new(0, 0, width, height);
                self.view.on_resize(ui::list_rows(self.area));
                self.dirty = true;
            }
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let [list, _] = ui::panes(self.area);
        if !list.contains(Position::new(mouse.column, mouse.row)) {
            return;
        }
        match mouse.kind {
            MouseEventKind::ScrollDown => self.view.scroll_down(),
            MouseEventKind::ScrollUp => self.view.scroll_up(),
            _ => return,
        }
        self.dirty = true;
    }

    /// Services one readable notification from the engine.
    pub fn handle_backend_ready(&mut self) {
        match self.backend.poll_notification() {
            Ok(TrackEvent::TrackFinishedNaturally) => {
                let status = self.player.advance_for_eof(&self.catalog, &mut self.backend);
                debug!(?status, "track finished");
                self.dirty = true;
            }
            Ok(TrackEvent::NoEvent) => {}
            Err(err) => {
                warn!(error = %err, "continuing without playback engine");
                self.set_status("Playback engine disconnected");
                self.dirty = true;
            }
        }
    }

    /// Releases the engine before the catalog.
    pub fn shutdown(self) {
        let Self {
            catalog,
            mut backend,
            ..
        } = self;
        backend.terminate();
        drop(backend);
        drop(catalog);
    }

    fn set_status(&mut self, message: &str) {
        self.status = Some(message.to_string());
    }
}

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Raw mode, alternate screen and mouse capture, undone on drop.
struct TerminalGuard {
    terminal: Tui,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut out = stdout();
        if let Err(err) = execute!(out, EnterAlternateScreen, EnableMouseCapture) {
            restore_terminal();
            return Err(err);
        }

        match Terminal::new(CrosstermBackend::new(out)) {
            Ok(terminal) => Ok(Self { terminal }),
            Err(err) => {
                restore_terminal();
                Err(err)
            }
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
        let _ = self.terminal.show_cursor();
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(stdout(), LeaveAlternateScreen, DisableMouseCapture);
}

/// Startup, event loop and teardown. Resources are released in reverse
/// order of acquisition no matter how the loop ends.
pub fn run(options: RunOptions) -> Result<()> {
    signal::install().map_err(Error::Signal)?;

    let catalog = Catalog::scan(&options.root)?;
    let backend = MpvBackend::start(&options.settings.backend)?;
    let input = InputSource::open()
        .map_err(Error::DisplayInit)?
        .watch_wake_pipe(signal::wake_fd());

    let mut guard = TerminalGuard::enter().map_err(Error::DisplayInit)?;
    let size = guard.terminal.size().map_err(Error::DisplayInit)?;
    if let Err(err) = guard.terminal.clear() {
        debug!(error = %err, "initial clear failed");
    }

    let area = Rect::new(0, 0, size.width, size.height);
    let mut session = Session::new(catalog, backend, PlayerState::new(), area, &options.settings);
    info!(tracks = session.catalog().len(), "session started");

    let result = event_loop(&mut session, &mut guard.terminal, &input);

    drop(guard);
    session.shutdown();
    info!(ok = result.is_ok(), "session ended");
    result
}

fn event_loop<B: Backend>(
    session: &mut Session<B>,
    terminal: &mut Tui,
    input: &InputSource,
) -> Result<()> {
    loop {
        if session.should_quit() {
            return Ok(());
        }
        if signal::interrupt_requested() {
            info!("interrupted");
            return Ok(());
        }

        if session.take_dirty()
            && let Err(err) = terminal.draw(|frame| ui::draw(frame, &session.screen()))
        {
            warn!(error = %err, "draw failed");
        }

        let buffered = event::poll(Duration::ZERO).map_err(Error::EventLoop)?;
        // Signals landing after this check leave a byte on the wake pipe.
        if signal::interrupt_requested() {
            info!("interrupted");
            return Ok(());
        }
        let readiness = input
            .wait(session.backend().notification_fd(), buffered)
            .map_err(Error::EventLoop)?;

        match readiness {
            Readiness::Backend => session.handle_backend_ready(),
            Readiness::Keyboard => {
                if event::poll(Duration::ZERO).map_err(Error::EventLoop)? {
                    let event = event::read().map_err(Error::EventLoop)?;
                    session.handle_terminal_event(event);
                }
            }
            Readiness::Interrupted => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{RecordingBackend, Sent};
    use crate::error::BackendError;
    use crate::model::{PlaybackMode, PlayerStatus, Track};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;

    fn session(len: usize, rows: u16) -> Session<RecordingBackend> {
        let catalog = Catalog::from_tracks(
            (0..len)
                .map(|i| Track::new(format!("{i}.mp3"), format!("/m/{i}.mp3")))
                .collect(),
        );
        Session::new(
            catalog,
            RecordingBackend::new(),
            PlayerState::with_rng(SmallRng::seed_from_u64(3)),
            Rect::new(0, 0, 80, rows + 2),
            &Settings::default(),
        )
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn enter_plays_the_selected_row() {
        let mut session = session(3, 10);
        session.handle_terminal_event(key(KeyCode::Char('j')));
        session.handle_terminal_event(key(KeyCode::Enter));

        assert_eq!(session.player().current_index(), Some(1));
        assert_eq!(session.backend().loads(), vec![std::path::Path::new("/m/1.mp3")]);
    }

    #[test]
    fn autoplay_at_last_track_goes_idle_on_eof() {
        let mut session = session(3, 10);
        session.dispatch(Command::ToggleAutoplay);
        session.dispatch(Command::JumpBottom);
        session.dispatch(Command::PlaySelection);
        session.backend_mut().clear();

        session.backend_mut().push_event(TrackEvent::TrackFinishedNaturally);
        session.handle_backend_ready();

        assert_eq!(session.player().status(), PlayerStatus::Idle);
        assert!(session.backend().loads().is_empty());
    }

    fn sent_lines(engine: &mut UnixStream) -> Vec<String> {
        let mut received = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            match engine.read(&mut chunk) {
                Ok(0) => break,
                Ok(read) => received.extend_from_slice(&chunk[..read]),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => panic!("engine read failed: {err}"),
            }
        }
        String::from_utf8_lossy(&received)
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn superseded_notification_does_not_advance() {
        let (ours, mut engine) = UnixStream::pair().expect("socket pair");
        engine.set_nonblocking(true).expect("nonblocking");
        let catalog = Catalog::from_tracks(
            (0..3)
                .map(|i| Track::new(format!("{i}.mp3"), format!("/m/{i}.mp3")))
                .collect(),
        );
        let mut session = Session::new(
            catalog,
            MpvBackend::from_stream(ours),
            PlayerState::with_rng(SmallRng::seed_from_u64(3)),
            Rect::new(0, 0, 80, 12),
            &Settings::default(),
        );
        session.dispatch(Command::ToggleAutoplay);
        session.dispatch(Command::PlaySelection);
        session.dispatch(Command::Next);
        assert_eq!(sent_lines(&mut engine).len(), 4);

        // Loading the next track makes the engine report the previous one as stopped.
        engine
            .write_all(b"{\"event\":\"end-file\",\"reason\":\"stop\"}\n")
            .expect("write");
        session.handle_backend_ready();
        assert_eq!(session.player().current_index(), Some(1));
        assert_eq!(session.player().status(), PlayerStatus::Playing);
        assert!(sent_lines(&mut engine).is_empty());

        engine
            .write_all(b"{\"event\":\"end-file\",\"reason\":\"eof\"}\n")
            .expect("write");
        session.handle_backend_ready();
        assert_eq!(session.player().current_index(), Some(2));
        let lines = sent_lines(&mut engine);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("/m/2.mp3"));
    }

    #[test]
    fn seek_and_volume_use_configured_steps() {
        let mut session = session(1, 10);
        session.handle_terminal_event(key(KeyCode::Left));
        session.handle_terminal_event(key(KeyCode::Char('l')));
        session.handle_terminal_event(key(KeyCode::Char('-')));
        session.handle_terminal_event(key(KeyCode::Char('+')));

        assert_eq!(
            session.backend().sent,
            vec![Sent::Seek(-5), Sent::Seek(5), Sent::Volume(-5), Sent::Volume(5)]
        );
    }

    #[test]
    fn next_past_the_end_reports_no_more_tracks() {
        let mut session = session(2, 10);
        session.dispatch(Command::JumpBottom);
        session.dispatch(Command::PlaySelection);
        session.dispatch(Command::Next);

        assert_eq!(session.status(), Some("No more tracks"));
        assert_eq!(session.backend().loads().len(), 1);
    }

    #[test]
    fn shuffle_plays_first_of_order_and_reports_size() {
        let mut session = session(4, 10);
        session.dispatch(Command::Shuffle);

        let first = session.player().shuffle().expect("shuffle").order()[0];
        assert_eq!(session.player().current_index(), Some(first));
        assert_eq!(session.player().mode(), PlaybackMode::Shuffle);
        assert_eq!(session.status(), Some("Shuffle: 4 tracks"));
    }

    #[test]
    fn selecting_during_shuffle_keeps_the_order() {
        let mut session = session(4, 10);
        session.dispatch(Command::Shuffle);
        let before = session.player().shuffle().cloned();

        session.dispatch(Command::JumpBottom);
        session.dispatch(Command::PlaySelection);
        assert_eq!(session.player().current_index(), Some(3));
        assert_eq!(session.player().shuffle().cloned(), before);
    }

    #[test]
    fn degraded_channel_is_reported_and_ui_survives() {
        let mut session = session(2, 10);
        session.backend_mut().push_error(BackendError::ChannelDegraded {
            source: io::ErrorKind::UnexpectedEof.into(),
        });
        session.handle_backend_ready();
        assert_eq!(session.status(), Some("Playback engine disconnected"));

        session.handle_terminal_event(key(KeyCode::Down));
        assert_eq!(session.view().selected(), Some(1));
        assert!(!session.should_quit());
    }

    #[test]
    fn resize_shrinks_the_viewport() {
        let mut session = session(20, 10);
        session.handle_terminal_event(Event::Resize(80, 6));
        assert_eq!(session.view().viewport_rows(), 4);
        assert!(session.take_dirty());
        assert!(!session.take_dirty());
    }

    #[test]
    fn mouse_wheel_scrolls_only_over_the_list() {
        let mut session = session(20, 5);
        let wheel = |column| {
            Event::Mouse(MouseEvent {
                kind: MouseEventKind::ScrollDown,
                column,
                row: 2,
                modifiers: KeyModifiers::NONE,
            })
        };

        session.handle_terminal_event(wheel(70));
        assert_eq!(session.view().scroll_offset(), 0);
        session.handle_terminal_event(wheel(5));
        assert_eq!(session.view().scroll_offset(), 1);
    }

    #[test]
    fn quit_keys_set_the_flag() {
        let mut session = session(1, 5);
        session.handle_terminal_event(Event::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        )));
        assert!(session.should_quit());
    }
}
