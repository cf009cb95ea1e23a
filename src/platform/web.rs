//! Browser bindings
//!
//! Everything registered with the page is owned by a Rust value and undone
//! when that value drops: [`FrameLoop`] cancels its animation frame and
//! [`KeyListener`] detaches its handlers. Unmounting the app therefore leaves
//! no callbacks behind.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{
    CanvasRenderingContext2d, EventTarget, HtmlCanvasElement, KeyboardEvent, Request,
    RequestInit, RequestMode, Response,
};

use crate::api::{
    Credential, GameApi, GameSummary, MatchId, MatchResultReport, PlayerIdentity, ScoreReport,
};
use crate::error::ApiError;
use crate::renderer::{Color, Surface, TextAlign};
use crate::session::{Session, TournamentGame, deliver_all, setup};
use crate::settings::Settings;

fn js_error(value: JsValue) -> ApiError {
    ApiError::Network(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Milliseconds on the same clock as animation-frame timestamps
fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map_or_else(js_sys::Date::now, |p| p.now())
}

/// Canvas2D-backed drawing surface
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self { canvas, ctx })
    }

    /// Resize the backing store when the view changes
    pub fn fit(&mut self, (w, h): (f32, f32)) {
        let (w, h) = (w.round() as u32, h.round() as u32);
        if self.canvas.width() != w || self.canvas.height() != h {
            self.canvas.set_width(w);
            self.canvas.set_height(h);
        }
    }
}

impl Surface for CanvasSurface {
    fn size(&self) -> (f32, f32) {
        (self.canvas.width() as f32, self.canvas.height() as f32)
    }

    fn clear(&mut self, color: Color) {
        let (w, h) = self.size();
        self.ctx.set_fill_style_str(&color.to_css());
        self.ctx.fill_rect(0.0, 0.0, f64::from(w), f64::from(h));
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        self.ctx.set_fill_style_str(&color.to_css());
        self.ctx
            .fill_rect(f64::from(x), f64::from(y), f64::from(w), f64::from(h));
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, size: f32, color: Color, align: TextAlign) {
        self.ctx.set_fill_style_str(&color.to_css());
        self.ctx.set_font(&format!("{size}px sans-serif"));
        self.ctx.set_text_align(match align {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
        });
        let _ = self.ctx.fill_text(text, f64::from(x), f64::from(y));
    }
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// `requestAnimationFrame` loop, cancelled on drop
pub struct FrameLoop {
    handle: Rc<Cell<Option<i32>>>,
    callback: FrameCallback,
}

impl FrameLoop {
    pub fn start(mut on_frame: impl FnMut(f64) + 'static) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let handle = Rc::new(Cell::new(None));
        let callback: FrameCallback = Rc::new(RefCell::new(None));

        // Weak so the closure does not keep itself alive after drop
        let next: Weak<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::downgrade(&callback);
        let slot = handle.clone();
        *callback.borrow_mut() = Some(Closure::new(move |time: f64| {
            on_frame(time);
            let Some(cb) = next.upgrade() else {
                return;
            };
            if let (Some(window), Some(closure)) = (web_sys::window(), cb.borrow().as_ref()) {
                slot.set(
                    window
                        .request_animation_frame(closure.as_ref().unchecked_ref())
                        .ok(),
                );
            }
        }));

        if let Some(closure) = callback.borrow().as_ref() {
            handle.set(Some(
                window.request_animation_frame(closure.as_ref().unchecked_ref())?,
            ));
        }
        Ok(Self { handle, callback })
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        if let (Some(id), Some(window)) = (self.handle.take(), web_sys::window()) {
            let _ = window.cancel_animation_frame(id);
        }
        self.callback.borrow_mut().take();
        log::debug!("Frame loop stopped");
    }
}

type KeyHandler = Closure<dyn FnMut(KeyboardEvent)>;

/// Keydown/keyup handlers, detached on drop
pub struct KeyListener {
    target: EventTarget,
    down: KeyHandler,
    up: KeyHandler,
}

impl KeyListener {
    pub fn attach(
        target: EventTarget,
        on_down: impl FnMut(KeyboardEvent) + 'static,
        on_up: impl FnMut(KeyboardEvent) + 'static,
    ) -> Result<Self, JsValue> {
        let down: KeyHandler = Closure::new(on_down);
        let up: KeyHandler = Closure::new(on_up);
        target.add_event_listener_with_callback("keydown", down.as_ref().unchecked_ref())?;
        target.add_event_listener_with_callback("keyup", up.as_ref().unchecked_ref())?;
        Ok(Self { target, down, up })
    }
}

impl Drop for KeyListener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback("keydown", self.down.as_ref().unchecked_ref());
        let _ = self
            .target
            .remove_event_listener_with_callback("keyup", self.up.as_ref().unchecked_ref());
        log::debug!("Key listeners detached");
    }
}

/// Game server client over `fetch`
pub struct WebApi {
    base_url: String,
    /// Authorizes delegation requests
    host: Credential,
}

#[derive(serde::Deserialize)]
struct DelegationResponse {
    status: String,
    #[serde(default)]
    token: Option<String>,
}

impl WebApi {
    /// Delegation requests still pending after this many polls are refused
    const DELEGATION_ATTEMPTS: usize = 5;

    pub fn new(base_url: impl Into<String>, host: Credential) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            host,
        }
    }

    async fn send<B: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        credential: &Credential,
        body: Option<&B>,
    ) -> Result<R, ApiError> {
        let init = RequestInit::new();
        init.set_method(method);
        init.set_mode(RequestMode::Cors);
        if let Some(body) = body {
            let json = serde_json::to_string(body).map_err(|e| ApiError::Malformed(e.to_string()))?;
            init.set_body(&JsValue::from_str(&json));
        }

        let url = format!("{}{}", self.base_url, path);
        let request = Request::new_with_str_and_init(&url, &init).map_err(js_error)?;
        let headers = request.headers();
        headers
            .set("Content-Type", "application/json")
            .map_err(js_error)?;
        headers
            .set("Authorization", &format!("Bearer {}", credential.token()))
            .map_err(js_error)?;

        let window = web_sys::window().ok_or_else(|| ApiError::Network("no window".into()))?;
        let response: Response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(js_error)?
            .dyn_into()
            .map_err(js_error)?;

        match response.status() {
            401 | 403 => return Err(ApiError::Unauthorized),
            status if !response.ok() => return Err(ApiError::Http { status }),
            _ => {}
        }

        let text = JsFuture::from(response.text().map_err(js_error)?)
            .await
            .map_err(js_error)?
            .as_string()
            .unwrap_or_default();
        let text = if text.trim().is_empty() { "null" } else { &text };
        serde_json::from_str(text).map_err(|e| ApiError::Malformed(e.to_string()))
    }
}

impl GameApi for WebApi {
    async fn current_user(&self, credential: &Credential) -> Result<PlayerIdentity, ApiError> {
        self.send::<(), _>("GET", "/me", credential, None).await
    }

    async fn acquire_opponent_credential(&self, username: &str) -> Result<Credential, ApiError> {
        let window = web_sys::window().ok_or_else(|| ApiError::Network("no window".into()))?;
        let prompt = format!("{username}, allow this session to play on your behalf?");
        if !window.confirm_with_message(&prompt).unwrap_or(false) {
            return Err(ApiError::Denied);
        }

        let body = serde_json::json!({ "username": username });
        for attempt in 1..=Self::DELEGATION_ATTEMPTS {
            let reply: DelegationResponse = self
                .send("POST", "/token/delegate", &self.host, Some(&body))
                .await?;
            match (reply.status.as_str(), reply.token) {
                ("success", Some(token)) => return Ok(Credential::new(token)),
                ("pending", _) => {
                    log::debug!("Delegation for {} pending (attempt {})", username, attempt);
                }
                _ => return Err(ApiError::Denied),
            }
        }
        Err(ApiError::Denied)
    }

    async fn publish_score(&self, credential: &Credential, report: &ScoreReport) -> Result<(), ApiError> {
        self.send::<_, serde_json::Value>("POST", "/pong/score", credential, Some(report))
            .await
            .map(drop)
    }

    async fn report_match_result(
        &self,
        credential: &Credential,
        report: &MatchResultReport,
    ) -> Result<(), ApiError> {
        self.send::<_, serde_json::Value>("POST", "/tournament/match", credential, Some(report))
            .await
            .map(drop)
    }

    async fn submit_game_summary(
        &self,
        credential: &Credential,
        summary: &GameSummary,
    ) -> Result<(), ApiError> {
        self.send::<_, serde_json::Value>("POST", "/tetris/scores", credential, Some(summary))
            .await
            .map(drop)
    }

    async fn ping_tournament(&self, credential: &Credential, match_id: MatchId) -> Result<(), ApiError> {
        let body = serde_json::json!({ "match_id": match_id });
        self.send::<_, serde_json::Value>("PATCH", "/tournament/ping", credential, Some(&body))
            .await
            .map(drop)
    }
}

/// Everything the page mounted. Dropping it stops the loop and detaches input.
struct App {
    session: Rc<RefCell<Session>>,
    api: Rc<WebApi>,
    credential: Credential,
    _frames: FrameLoop,
    _keys: KeyListener,
}

thread_local! {
    static APP: RefCell<Option<App>> = const { RefCell::new(None) };
}

fn handles() -> Result<(Rc<RefCell<Session>>, Rc<WebApi>, Credential), JsValue> {
    APP.with(|cell| {
        cell.borrow()
            .as_ref()
            .map(|app| (app.session.clone(), app.api.clone(), app.credential.clone()))
            .ok_or_else(|| JsValue::from_str("arcade is not mounted"))
    })
}

/// Attach to `canvas_id` and start the frame loop
#[wasm_bindgen]
pub fn mount(canvas_id: &str, base_url: &str, token: &str) -> Result<(), JsValue> {
    unmount();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas: HtmlCanvasElement = document
        .get_element_by_id(canvas_id)
        .ok_or_else(|| JsValue::from_str("no canvas"))?
        .dyn_into()?;

    let credential = Credential::new(token);
    let seed = js_sys::Date::now() as u64;
    let session = Rc::new(RefCell::new(Session::new(Settings::load(), seed)));
    let api = Rc::new(WebApi::new(base_url, credential.clone()));
    let surface = Rc::new(RefCell::new(CanvasSurface::new(canvas)?));
    log::info!("Arcade mounted with seed: {}", seed);

    let frames = {
        let (session, api, surface) = (session.clone(), api.clone(), surface.clone());
        FrameLoop::start(move |time| {
            let outbound = {
                let mut s = session.borrow_mut();
                let out = s.frame(time);
                let mut surface = surface.borrow_mut();
                surface.fit(s.view_size());
                s.draw(&mut *surface, time);
                out
            };
            if !outbound.is_empty() {
                let api = api.clone();
                spawn_local(async move {
                    deliver_all(&*api, outbound).await;
                });
            }
        })?
    };

    let keys = {
        let (down_session, up_session) = (session.clone(), session.clone());
        KeyListener::attach(
            document.into(),
            move |event: KeyboardEvent| {
                if down_session.borrow_mut().key_down(&event.key(), now_ms()) {
                    event.prevent_default();
                }
            },
            move |event: KeyboardEvent| {
                if up_session.borrow_mut().key_up(&event.key()) {
                    event.prevent_default();
                }
            },
        )?
    };

    APP.with(|cell| {
        *cell.borrow_mut() = Some(App {
            session,
            api,
            credential,
            _frames: frames,
            _keys: keys,
        });
    });
    Ok(())
}

/// Tear everything down
#[wasm_bindgen]
pub fn unmount() {
    let app = APP.with(|cell| cell.borrow_mut().take());
    if let Some(app) = app {
        app.session.borrow_mut().teardown();
        drop(app);
        log::info!("Arcade unmounted");
    }
}

#[wasm_bindgen]
pub async fn start_single_pong() -> Result<(), JsValue> {
    let (session, api, credential) = handles()?;
    let seat = setup::resolve_primary(&*api, &credential).await.map_err(to_js)?;
    session.borrow_mut().start_single_pong(seat);
    Ok(())
}

#[wasm_bindgen]
pub async fn start_versus_pong(opponent: String) -> Result<(), JsValue> {
    let (session, api, credential) = handles()?;
    let left = setup::resolve_primary(&*api, &credential).await.map_err(to_js)?;
    let right = setup::resolve_opponent(&*api, &opponent).await.map_err(to_js)?;
    session.borrow_mut().start_versus_pong(left, right);
    Ok(())
}

#[wasm_bindgen]
pub async fn start_tetris(opponents: Vec<String>) -> Result<(), JsValue> {
    let (session, api, credential) = handles()?;
    let max = session.borrow().settings().max_local_tetris_players();
    let seats = setup::resolve_tetris_seats(&*api, &credential, &opponents, max)
        .await
        .map_err(to_js)?;
    session
        .borrow_mut()
        .start_tetris(seats, now_ms())
        .map_err(to_js)
}

/// `game` is "pong" or "tetris"
#[wasm_bindgen]
pub async fn open_tournament(game: String) -> Result<(), JsValue> {
    let game = match game.as_str() {
        "pong" => TournamentGame::Pong,
        "tetris" => TournamentGame::Tetris,
        other => return Err(JsValue::from_str(&format!("unknown game: {other}"))),
    };
    let (session, api, credential) = handles()?;
    let host = setup::resolve_host(&*api, &credential).await.map_err(to_js)?;
    session.borrow_mut().open_tournament(host, game).map_err(to_js)
}

#[wasm_bindgen]
pub async fn add_tournament_player(username: String) -> Result<(), JsValue> {
    let (session, api, _) = handles()?;
    if session.borrow().is_registered(&username) {
        return Err(JsValue::from_str(&format!("{username} is already registered")));
    }
    let player = setup::resolve_entrant(&*api, &username).await.map_err(to_js)?;
    session.borrow_mut().register_player(player).map_err(to_js)
}

#[wasm_bindgen]
pub fn remove_tournament_player(username: &str) -> Result<(), JsValue> {
    let (session, _, _) = handles()?;
    let removed = session.borrow_mut().remove_player(username).map_err(to_js)?;
    log::info!("Removed {}", removed.username);
    Ok(())
}

/// Returns the round-one bracket lines
#[wasm_bindgen]
pub fn start_tournament() -> Result<Vec<String>, JsValue> {
    let (session, _, _) = handles()?;
    let lines = session.borrow_mut().start_tournament().map_err(to_js)?;
    Ok(lines)
}

#[wasm_bindgen]
pub fn cancel_tournament() -> Result<(), JsValue> {
    let (session, _, _) = handles()?;
    session.borrow_mut().cancel_tournament();
    Ok(())
}

#[wasm_bindgen]
pub fn stop_game() -> Result<(), JsValue> {
    let (session, _, _) = handles()?;
    session.borrow_mut().teardown();
    Ok(())
}

/// Logger and panic hook
pub fn init() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"logger already initialized".into());
    }
    log::info!("Arena Arcade starting...");
}
