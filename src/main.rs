//! Arena Arcade entry point
//!
//! On the web the page mounts the arcade through the exported bindings. The
//! native build plays a few headless matches and logs what would be sent to
//! the server.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    arena_arcade::platform::web::init();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use arena_arcade::api::{Credential, Participant, PlayerIdentity};
    use arena_arcade::session::{ActiveGame, Session, TournamentGame};
    use arena_arcade::tournament::{Player, TournamentStatus};

    const FRAME_MS: f64 = 1000.0 / 60.0;
    /// Give up on a demo after this much simulated time
    const LIMIT_MS: f64 = 30.0 * 60.0 * 1000.0;

    fn seat(name: &str) -> Participant {
        Participant::new(PlayerIdentity::new(name), Credential::new(format!("local-{name}")))
    }

    /// Run frames until `done`, tapping a key every second so menus and
    /// tournament pauses move on
    fn play(session: &mut Session, now: &mut f64, done: impl Fn(&Session) -> bool) {
        let deadline = *now + LIMIT_MS;
        let mut next_tap = *now;
        while !done(session) && *now < deadline {
            if *now >= next_tap {
                session.key_down("Enter", *now);
                session.key_up("Enter");
                next_tap = *now + 1000.0;
            }
            for outbound in session.frame(*now) {
                log::info!("Would send: {}", outbound.label());
            }
            *now += FRAME_MS;
        }
        if *now >= deadline {
            log::warn!("Demo stopped after {} simulated seconds", LIMIT_MS / 1000.0);
        }
    }

    fn pong_over(session: &Session) -> bool {
        matches!(session.current(), Some(ActiveGame::Pong(m)) if m.phase().is_over())
    }

    fn tetris_over(session: &Session) -> bool {
        matches!(session.current(), Some(ActiveGame::Tetris(t)) if t.is_finished())
    }

    pub fn run(seed: u64) {
        let mut session = Session::new(arena_arcade::Settings::default(), seed);
        let mut now = 0.0;

        log::info!("Single-player pong against the AI");
        session.start_single_pong(seat("arthur"));
        play(&mut session, &mut now, pong_over);

        log::info!("Two-board tetris, gravity only");
        if let Err(e) = session.start_tetris(vec![seat("arthur"), seat("ford")], now) {
            log::error!("Could not start tetris: {}", e);
            return;
        }
        play(&mut session, &mut now, tetris_over);
        if let Some(ActiveGame::Tetris(t)) = session.current() {
            for (name, score) in t.scoreboard() {
                log::info!("{}: {}", name, score);
            }
        }

        log::info!("Three-player pong tournament");
        let host = Player::primary("arthur", Credential::new("local-arthur"));
        let opened = session
            .open_tournament(host, TournamentGame::Pong)
            .and_then(|()| {
                session.register_player(Player::new("ford", Some(Credential::new("local-ford"))))
            })
            .and_then(|()| {
                session.register_player(Player::new("zaphod", Some(Credential::new("local-zaphod"))))
            })
            .and_then(|()| session.start_tournament());
        match opened {
            Ok(lines) => lines.iter().for_each(|line| log::info!("{}", line)),
            Err(e) => {
                log::error!("Could not start tournament: {}", e);
                return;
            }
        }
        play(&mut session, &mut now, |s| {
            s.tournament()
                .is_none_or(|run| matches!(run.bracket().status(), TournamentStatus::Finished { .. }))
        });
        if let Some(champion) = session.tournament().and_then(|run| run.bracket().champion()) {
            log::info!("Champion: {}", champion);
        }
        session.teardown();
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Arena Arcade (native) starting...");
    log::info!("The browser build is the playable one; running headless demos");

    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64);
    headless::run(seed);
}
