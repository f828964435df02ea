//! Shelfmark RPC Server: JSON-RPC over stdin/stdout.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"collection.move_bookmark", "params":{"owner_id":"u1","id":"...","current_index":3,"new_index":1}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":{"status":400,"kind":"invalid_argument","message":"..."}}
//!
//! Logs go to stderr.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Instant;

use shelfmark::app::App;
use shelfmark::rpc_handler::handle_method;
use shelfmark::services::logging;
use shelfmark::services::settings_engine::{SettingsEngine, SettingsEngineTrait};

use serde_json::{json, Value};

/// Fixed-window limiter: at most `max_per_second` requests per one-second window.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

fn write_line(out: &mut impl Write, value: &Value) -> io::Result<()> {
    writeln!(out, "{}", value)?;
    out.flush()
}

fn main() -> ExitCode {
    let mut settings_engine = SettingsEngine::new(std::env::var("SHELFMARK_CONFIG").ok());
    let settings_error = settings_engine.load().err();
    logging::init(&settings_engine.get_settings().logging);
    if let Some(e) = settings_error {
        tracing::warn!("settings not loaded, using defaults: {}", e);
    }

    let max_per_second = settings_engine.get_settings().rpc.max_requests_per_second;
    let app = match App::from_settings(settings_engine) {
        Ok(app) => Mutex::new(app),
        Err(e) => {
            tracing::error!("failed to initialize: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if write_line(&mut out, &json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")})).is_err() {
        return ExitCode::FAILURE;
    }

    let mut rate_limiter = RateLimiter::new(max_per_second);

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::error!("stdin read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(&line) {
            Err(e) => json!({"id": null, "error": {"status": 400, "kind": "invalid_argument", "message": format!("parse error: {}", e)}}),
            Ok(req) => {
                let id = req.get("id").cloned().unwrap_or(Value::Null);
                if !rate_limiter.check() {
                    tracing::warn!("rate limit exceeded");
                    json!({"id": id, "error": {"status": 429, "kind": "rate_limited", "message": "rate limit exceeded"}})
                } else {
                    let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
                    let params = req.get("params").cloned().unwrap_or(json!({}));
                    match handle_method(&app, method, &params) {
                        Ok(val) => json!({"id": id, "result": val}),
                        Err(err) => {
                            tracing::debug!(method, status = err.status, "request failed: {}", err.message);
                            json!({"id": id, "error": err})
                        }
                    }
                }
            }
        };

        if write_line(&mut out, &response).is_err() {
            break;
        }
    }

    ExitCode::SUCCESS
}
