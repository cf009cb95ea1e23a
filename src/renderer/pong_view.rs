//! Pong field, paddles, ball and HUD

use super::{Color, Surface, TextAlign};
use crate::sim::{MatchPhase, PaddleController, PongMatch, PongRules, Side};

const BACKGROUND: Color = Color::rgb(44, 62, 80);
const NET_WIDTH: f32 = 10.0;
const NET_DASH: f32 = 7.0;
const NET_GAP: f32 = 15.0;
/// Net stops this far from the top and bottom walls
const NET_MARGIN: f32 = 140.0;

/// Text shown over a finished match
pub fn result_banner<O: PaddleController>(m: &PongMatch<O>) -> Option<String> {
    let outcome = m.outcome()?;
    let text = match (m.seat(Side::Right), outcome.winner) {
        (None, Side::Left) => "Winner!".to_string(),
        (None, Side::Right) => "You lost!".to_string(),
        (Some(_), winner) => {
            let name = m.seat(winner).map(|s| s.identity.label()).unwrap_or("?");
            format!("{name} wins!")
        }
    };
    Some(text)
}

fn headline<O: PaddleController>(m: &PongMatch<O>) -> String {
    match m.seat(Side::Right) {
        Some(right) => {
            let left = m.seat(Side::Left).map(|s| s.identity.label()).unwrap_or("?");
            format!("{} VS {}", left, right.identity.label())
        }
        None => format!("First one who scores {} wins!", m.rules().target_score),
    }
}

/// Shown under the result banner when the same seats can play again
pub fn draw_rematch_prompt<S: Surface>(rules: &PongRules, surface: &mut S) {
    let (w, h) = (rules.field_width, rules.field_height);
    surface.draw_text(
        "Press any key to play again",
        w / 2.0,
        h / 2.0 + 70.0,
        30.0,
        Color::WHITE,
        TextAlign::Center,
    );
}

pub fn draw_pong<O: PaddleController, S: Surface>(m: &PongMatch<O>, surface: &mut S, now_ms: f64) {
    let rules = m.rules();
    let (w, h) = (rules.field_width, rules.field_height);
    surface.clear(BACKGROUND);

    // Dashed net
    let net_x = w / 2.0 - NET_WIDTH / 2.0;
    let mut y = NET_MARGIN;
    while y < h - NET_MARGIN {
        let dash = NET_DASH.min(h - NET_MARGIN - y);
        surface.fill_rect(net_x, y, NET_WIDTH, dash, Color::WHITE);
        y += NET_DASH + NET_GAP;
    }

    for side in [Side::Left, Side::Right] {
        let p = m.paddle(side);
        surface.fill_rect(p.pos.x, p.pos.y, p.size.x, p.size.y, Color::WHITE);
    }

    if m.ball_visible(now_ms) && m.phase() != MatchPhase::Menu {
        let b = m.ball();
        surface.fill_rect(b.pos.x, b.pos.y, b.size.x, b.size.y, Color::WHITE);
    }

    let left = m.paddle(Side::Left).score.to_string();
    let right = m.paddle(Side::Right).score.to_string();
    surface.draw_text(&left, w / 2.0 - 300.0, 200.0, 100.0, Color::WHITE, TextAlign::Center);
    surface.draw_text(&right, w / 2.0 + 300.0, 200.0, 100.0, Color::WHITE, TextAlign::Center);
    surface.draw_text(&headline(m), w / 2.0, 50.0, 30.0, Color::WHITE, TextAlign::Center);

    match m.phase() {
        MatchPhase::Menu => {
            surface.fill_rect(0.0, 0.0, w, h, Color::SHADE);
            surface.draw_text(
                "Press any key to begin",
                w / 2.0,
                h / 2.0,
                50.0,
                Color::WHITE,
                TextAlign::Center,
            );
        }
        MatchPhase::Over => {
            if let Some(banner) = result_banner(m) {
                surface.fill_rect(0.0, 0.0, w, h, Color::SHADE);
                surface.draw_text(&banner, w / 2.0, h / 2.0, 60.0, Color::GOLD, TextAlign::Center);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Credential, Participant, PlayerIdentity};
    use crate::input::ControlMap;
    use crate::renderer::recording::RecordingSurface;
    use crate::sim::{AiController, KeyboardController, PaddleAction};

    fn keys() -> ControlMap<PaddleAction> {
        ControlMap::new().bind("w", PaddleAction::Up)
    }

    fn seat(name: &str) -> Participant {
        Participant::new(PlayerIdentity::new(name), Credential::new(name))
    }

    fn solo() -> PongMatch<AiController> {
        PongMatch::new(
            PongRules::default(),
            seat("arthur"),
            None,
            KeyboardController::new(keys()),
            AiController,
            1,
        )
    }

    #[test]
    fn test_menu_prompts_for_key() {
        let mut m = solo();
        m.show();
        let mut s = RecordingSurface::default();
        draw_pong(&m, &mut s, 0.0);
        let texts = s.texts();
        assert!(texts.contains(&"Press any key to begin".to_string()));
        assert!(texts.contains(&"First one who scores 5 wins!".to_string()));
    }

    #[test]
    fn test_versus_headline_names_both() {
        let m = PongMatch::new(
            PongRules::default(),
            seat("arthur"),
            Some(seat("ford")),
            KeyboardController::new(keys()),
            KeyboardController::new(ControlMap::new()),
            1,
        );
        let mut s = RecordingSurface::default();
        draw_pong(&m, &mut s, 0.0);
        assert!(s.texts().contains(&"arthur VS ford".to_string()));
        assert_eq!(result_banner(&m), None);
    }

    #[test]
    fn test_scores_are_drawn() {
        let mut m = solo();
        m.show();
        let mut s = RecordingSurface::default();
        draw_pong(&m, &mut s, 0.0);
        assert_eq!(s.texts().iter().filter(|t| *t == "0").count(), 2);
    }

    #[test]
    fn test_rematch_prompt_text() {
        let rules = PongRules::default();
        let mut s = RecordingSurface::default();
        draw_rematch_prompt(&rules, &mut s);
        assert_eq!(s.texts(), vec!["Press any key to play again"]);
    }
}
