// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Process supervision under `/procs`.
//!
//! Foreground runs execute within the request and return a [`RunResult`];
//! background runs are tracked in the store and looked up by id. Every run
//! is bounded by a timeout and holds a cancellation token so `DELETE` can
//! kill it.

use axum::extract::{Path as UrlPath, State};
use axum::response::{IntoResponse, Json, Redirect, Response};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use webfs_proto::{Proc, RunResult, RunState};

use crate::respond::not_found;
use crate::server::AppState;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// In-memory registry of supervised processes.
pub struct ProcStore {
    root: PathBuf,
    base_url: Url,
    procs: Mutex<HashMap<String, Proc>>,
    cancels: Mutex<HashMap<String, CancellationToken>>,
}

impl ProcStore {
    pub fn new(root: PathBuf, base_url: Url) -> Self {
        ProcStore {
            root,
            base_url,
            procs: Mutex::new(HashMap::new()),
            cancels: Mutex::new(HashMap::new()),
        }
    }

    fn add(&self, mut proc: Proc) -> CancellationToken {
        proc.created = epoch_secs();
        let token = CancellationToken::new();
        self.cancels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(proc.id.clone(), token.clone());
        self.procs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(proc.id.clone(), proc);
        token
    }

    fn remove(&self, id: &str) {
        self.procs.lock().unwrap_or_else(|e| e.into_inner()).remove(id);
        self.cancels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
    }

    fn get(&self, id: &str) -> Option<Proc> {
        let procs = self.procs.lock().unwrap_or_else(|e| e.into_inner());
        procs.get(id).map(|p| {
            let mut p = p.clone();
            p.elapsed = epoch_secs() - p.created;
            p
        })
    }

    fn list(&self) -> Vec<Proc> {
        let now = epoch_secs();
        let procs = self.procs.lock().unwrap_or_else(|e| e.into_inner());
        procs
            .values()
            .map(|p| {
                let mut p = p.clone();
                p.elapsed = now - p.created;
                p
            })
            .collect()
    }

    fn update(&self, id: &str, apply: impl FnOnce(&mut Proc)) {
        let mut procs = self.procs.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(p) = procs.get_mut(id) {
            apply(p);
        }
    }

    fn cancel(&self, id: &str) {
        if let Some(token) = self
            .cancels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
        {
            token.cancel();
        }
    }

    fn resolve(&self, name: &str) -> PathBuf {
        join_clean(&self.root, name)
    }
}

fn epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub(crate) async fn list_procs(State(state): State<AppState>) -> Response {
    Json(state.procs.list()).into_response()
}

pub(crate) async fn get_proc(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<String>,
) -> Response {
    match state.procs.get(&id) {
        Some(proc) => Json(proc).into_response(),
        None => not_found(format!("proc {}", id)),
    }
}

pub(crate) async fn create_proc(
    State(state): State<AppState>,
    Json(mut proc): Json<Proc>,
) -> Response {
    if proc.id.is_empty() {
        proc.id = Uuid::new_v4().to_string();
    }
    info!(id = %proc.id, command = %proc.command, bg = proc.background, "create proc");

    proc.args = resolve_args(&state.procs.root, &proc.resolve, &proc.args);

    let store = state.procs.clone();
    let token = store.add(proc.clone());

    if proc.background {
        let id = proc.id.clone();
        tokio::spawn(async move {
            run_proc(&store, proc, token).await;
        });
        let location = state
            .procs
            .base_url
            .join(&format!("procs/{}", id))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("/procs/{}", id));
        return Redirect::to(&location).into_response();
    }

    let result = run_proc(&store, proc, token).await;
    store.remove(&result.id);
    Json(result).into_response()
}

pub(crate) async fn remove_proc(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<String>,
) -> Response {
    if state.procs.get(&id).is_none() {
        return not_found(format!("proc {}", id));
    }
    state.procs.cancel(&id);
    state.procs.remove(&id);
    axum::http::StatusCode::NO_CONTENT.into_response()
}

/// Execute one process to completion, keeping its store entry current.
async fn run_proc(store: &ProcStore, proc: Proc, token: CancellationToken) -> RunResult {
    let id = proc.id.clone();
    let mut result = RunResult {
        id: id.clone(),
        command: proc.command.clone(),
        args: proc.args.clone(),
        background: proc.background,
        outfile: proc.outfile.clone(),
        errfile: proc.errfile.clone(),
        ..RunResult::default()
    };

    let fail = |store: &ProcStore, result: &mut RunResult, err: String| {
        store.update(&result.id, |p| {
            p.state = RunState::FAILED;
            p.status = 1;
            p.error = err.clone();
        });
        result.status = 1;
        result.error = err;
    };

    debug!(id = %id, command = %proc.command, args = ?proc.args, "run");

    let mut cmd = tokio::process::Command::new(&proc.command);
    cmd.args(&proc.args);
    cmd.current_dir(if proc.dir.is_empty() {
        store.root.clone()
    } else {
        store.resolve(&proc.dir)
    });
    for pair in &proc.env {
        if let Some((key, value)) = pair.split_once('=') {
            cmd.env(key, value);
        }
    }
    cmd.kill_on_drop(true);

    // stdout/stderr either redirect to files under the root or get captured.
    let redirect_out = !proc.outfile.is_empty();
    let redirect_err = !proc.errfile.is_empty();
    let mut outfile = None;
    if redirect_out {
        match std::fs::File::create(store.resolve(&proc.outfile)) {
            Ok(f) => outfile = Some(f),
            Err(err) => {
                fail(store, &mut result, format!("create outfile: {}", err));
                return result;
            }
        }
    }
    if redirect_out {
        // The handle was just created; cloning it cannot reasonably fail.
        if let Some(f) = outfile.as_ref().and_then(|f| f.try_clone().ok()) {
            cmd.stdout(Stdio::from(f));
        }
    } else {
        cmd.stdout(Stdio::piped());
    }
    if redirect_err {
        let errfile = if proc.errfile == proc.outfile {
            outfile.as_ref().and_then(|f| f.try_clone().ok())
        } else {
            match std::fs::File::create(store.resolve(&proc.errfile)) {
                Ok(f) => Some(f),
                Err(err) => {
                    fail(store, &mut result, format!("create errfile: {}", err));
                    return result;
                }
            }
        };
        if let Some(f) = errfile {
            cmd.stderr(Stdio::from(f));
        }
    } else {
        cmd.stderr(Stdio::piped());
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            fail(store, &mut result, format!("start: {}", err));
            return result;
        }
    };

    store.update(&id, |p| {
        p.pid = child.id().map(|pid| pid as i32).unwrap_or(0);
        p.state = RunState::RUNNING;
        p.status = 0;
        p.error = String::new();
    });

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let out_reader = tokio::spawn(drain(stdout));
    let err_reader = tokio::spawn(drain(stderr));

    let timeout = if proc.timeout <= 0 {
        DEFAULT_TIMEOUT
    } else {
        Duration::from_secs(proc.timeout as u64)
    };
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let mut killed: Option<&str> = None;
    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            _ = token.cancelled(), if killed.is_none() => {
                killed = Some("killed");
                let _ = child.start_kill();
            }
            _ = &mut deadline, if killed.is_none() => {
                killed = Some("timed out");
                let _ = child.start_kill();
            }
        }
    };

    result.stdout = out_reader.await.unwrap_or_default();
    result.stderr = err_reader.await.unwrap_or_default();

    match status {
        Ok(status) if status.success() && killed.is_none() => {
            store.update(&id, |p| {
                p.state = RunState::DONE;
                p.status = 0;
                p.error = String::new();
            });
        }
        Ok(status) => {
            let code = status.code().unwrap_or(1);
            let err = killed
                .map(|reason| reason.to_string())
                .unwrap_or_else(|| format!("exit status {}", code));
            store.update(&id, |p| {
                p.state = RunState::FAILED;
                p.status = code;
                p.error = err.clone();
            });
            result.status = code;
            result.error = err;
        }
        Err(err) => fail(store, &mut result, format!("wait: {}", err)),
    }

    result
}

async fn drain(pipe: Option<impl tokio::io::AsyncRead + Unpin>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Prepend the root to an arg when it uses the `file:` scheme or follows
/// one of the option flags named in `options`.
pub fn resolve_args(root: &Path, options: &[String], args: &[String]) -> Vec<String> {
    let mut resolved = Vec::with_capacity(args.len());
    let mut opt: Option<&str> = None;

    for arg in args {
        if arg.starts_with('-') {
            opt = Some(arg);
            resolved.push(arg.clone());
            continue;
        }
        let value = if let Some(rest) = arg.strip_prefix("file:") {
            join_clean(root, file_url_path(rest)).to_string_lossy().into_owned()
        } else if opt.is_some_and(|o| options.iter().any(|v| v == o)) {
            join_clean(root, arg).to_string_lossy().into_owned()
        } else {
            arg.clone()
        };
        opt = None;
        resolved.push(value);
    }

    resolved
}

/// Path component of a `file:` reference, after the scheme. Opaque forms
/// (`file:.`) carry no path; `file://host/p` drops the authority.
fn file_url_path(rest: &str) -> &str {
    if let Some(after) = rest.strip_prefix("//") {
        match after.find('/') {
            Some(i) => &after[i..],
            None => "",
        }
    } else if rest.starts_with('/') {
        rest
    } else {
        ""
    }
}

/// Lexical join: `.` disappears, `..` pops, the result stays anchored at
/// `root`.
fn join_clean(root: &Path, rel: &str) -> PathBuf {
    let mut out = root.to_path_buf();
    for comp in Path::new(rel).components() {
        match comp {
            Component::Normal(c) => out.push(c),
            Component::ParentDir => {
                if out != root {
                    out.pop();
                }
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    out
}
