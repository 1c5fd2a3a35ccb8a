#![no_main]

use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use ratatui::prelude::Rect;
use reed::app::Session;
use reed::backend::{RecordingBackend, TrackEvent};
use reed::config::Settings;
use reed::core::PlayerState;
use reed::keys::Command;
use reed::library::Catalog;
use reed::model::Track;

fuzz_target!(|data: &[u8]| {
    let Some((&header, ops)) = data.split_first() else {
        return;
    };
    let len = usize::from(header % 24);
    let catalog = Catalog::from_tracks(
        (0..len)
            .map(|idx| Track::new(format!("track_{idx}.mp3"), format!("/m/track_{idx}.mp3")))
            .collect(),
    );
    let mut session = Session::new(
        catalog,
        RecordingBackend::new(),
        PlayerState::with_rng(SmallRng::seed_from_u64(u64::from(header))),
        Rect::new(0, 0, 80, u16::from(header % 9) + 2),
        &Settings::default(),
    );

    for byte in ops {
        let pick = usize::from(*byte) % (Command::ALL.len() + 2);
        match Command::ALL.get(pick) {
            Some(Command::Quit) => {}
            Some(command) => session.dispatch(*command),
            None if pick == Command::ALL.len() => {
                session
                    .backend_mut()
                    .push_event(TrackEvent::TrackFinishedNaturally);
                session.handle_backend_ready();
            }
            None => session.handle_terminal_event(crossterm::event::Event::Resize(
                80,
                u16::from(*byte % 13),
            )),
        }

        let view = session.view();
        if let Some(index) = view.selected() {
            assert!(index < len);
        }
        if let Some(index) = session.player().current_index() {
            assert!(index < len);
        }
        if let Some(shuffle) = session.player().shuffle() {
            assert!(shuffle.position() < shuffle.len());
        }
    }
});
