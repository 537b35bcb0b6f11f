//! # Minihost CLI
//!
//! Command-line front end for the minihost canvas host.
//!
//! ## Usage
//!
//! ```bash
//! minihost render scene.json            # export to a temp file
//! minihost render scene.json --data-url # print a data URI
//! minihost info                         # print system info
//! minihost auth --scope scope.camera    # request a permission scope
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `RenderScript` - JSON drawing script (see [`script`])
//! - `run` - Executes a command against a [`Host`] and returns its JSON output

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod script;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use minihost_canvas::{CanvasSurface, Context2d, Host, HostConfig, RenderingContext, WebGlContext};
use minihost_core::{
    listener, CoreError, Event, EventTarget, EventType, HitRegions, InMemoryPermissions,
    ListenerOptions, Rect, Scope, TouchTracker,
};
use serde::Serialize;

pub use script::{DrawOp, RenderScript, TouchPhase, TouchStep};

/// Command-line arguments for minihost.
#[derive(Debug, Clone, Parser)]
#[command(name = "minihost")]
#[command(about = "Render canvas scripts, export snapshots and query the host")]
#[command(version)]
pub struct CliArgs {
    /// Host configuration file (JSON)
    #[arg(long, env = "MINIHOST_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory for exported files (overrides the config file)
    #[arg(long, env = "MINIHOST_TEMP_DIR", global = true)]
    pub temp_dir: Option<PathBuf>,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Render a JSON drawing script and export the canvas
    Render {
        /// Path to the render script
        script: PathBuf,

        /// Print a data URI instead of writing a temp file
        #[arg(long)]
        data_url: bool,

        /// Export through the asynchronous export queue
        #[arg(long = "async")]
        queued: bool,
    },

    /// Print host system info as JSON
    Info,

    /// Query or request permission scopes
    Auth {
        /// Scope to authorize (e.g. scope.camera)
        #[arg(long)]
        scope: Option<Scope>,

        /// Deny undecided scopes instead of granting them
        #[arg(long)]
        deny: bool,

        /// Return the setting as edited on the settings page
        #[arg(long)]
        open: bool,
    },
}

impl CliArgs {
    /// Resolve the host configuration from the config file and overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded.
    pub fn host_config(&self) -> anyhow::Result<HostConfig> {
        let config = match &self.config {
            Some(path) => HostConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => HostConfig::default(),
        };
        Ok(match &self.temp_dir {
            Some(dir) => config.with_temp_dir(dir),
            None => config,
        })
    }
}

/// How a render is exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    /// Write a temp file synchronously.
    Sync,
    /// Write a temp file through the export queue.
    Queued,
    /// Return a data URI.
    DataUrl,
}

/// Result of a render command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderReport {
    /// Written file, for file exports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_file_path: Option<PathBuf>,
    /// Encoded image, for data URI exports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
    /// Touch events delivered to the canvas, in order.
    pub events: Vec<Event>,
}

/// Result of an auth command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthReport {
    /// Scope that was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    /// `authorize:ok` or the denial message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err_msg: Option<String>,
    /// Current decisions.
    pub auth_setting: minihost_core::AuthSetting,
}

/// Build a host with the software backend and in-memory accessors.
///
/// `deny` makes undecided permission scopes resolve to denied.
#[must_use]
pub fn build_host(config: HostConfig, deny: bool) -> Host {
    Host::with_permissions(
        config,
        Arc::new(InMemoryPermissions::with_prompt(move |_| !deny)),
    )
}

/// Run a parsed command and return its JSON output.
///
/// # Errors
///
/// Returns an error if configuration, rendering, export or a host accessor fails.
pub async fn run(args: CliArgs) -> anyhow::Result<String> {
    let config = args.host_config()?;
    match args.command {
        Command::Render {
            script,
            data_url,
            queued,
        } => {
            let mode = if data_url {
                ExportMode::DataUrl
            } else if queued {
                ExportMode::Queued
            } else {
                ExportMode::Sync
            };
            let host = build_host(config, false);
            let report = render_file(&host, &script, mode).await?;
            Ok(serde_json::to_string_pretty(&report)?)
        }
        Command::Info => {
            let host = build_host(config, false);
            let info = host.system_info().system_info().await?;
            Ok(serde_json::to_string_pretty(&info)?)
        }
        Command::Auth { scope, deny, open } => {
            let host = build_host(config, deny);
            let report = auth(&host, scope, open).await?;
            Ok(serde_json::to_string_pretty(&report)?)
        }
    }
}

/// Load a script file and render it.
///
/// # Errors
///
/// Returns an error if the script is invalid or rendering/export fails.
pub async fn render_file(host: &Host, path: &Path, mode: ExportMode) -> anyhow::Result<RenderReport> {
    let script = RenderScript::from_file(path)?;
    render(host, &script, mode).await
}

/// Render a script on a new canvas, replay its touches and export it.
///
/// # Errors
///
/// Returns an error if an op does not fit the context, or drawing or export fails.
pub async fn render(host: &Host, script: &RenderScript, mode: ExportMode) -> anyhow::Result<RenderReport> {
    let kind = script.context_kind();
    let mut canvas = match (script.width, script.height) {
        (Some(width), Some(height)) => host.create_canvas_with_size(kind, width, height),
        _ => host.create_canvas(kind),
    };
    tracing::info!(
        "Rendering {} ops on {kind} canvas {}x{}",
        script.ops.len(),
        canvas.width(),
        canvas.height()
    );

    match canvas.get_context(kind, &script.attributes)? {
        RenderingContext::TwoD(mut ctx) => {
            for op in &script.ops {
                apply_2d(&mut ctx, op)?;
            }
        }
        RenderingContext::WebGl(mut gl) => {
            for op in &script.ops {
                apply_webgl(&mut gl, op)?;
            }
        }
    }

    let events = replay_touches(&mut canvas, &script.touches, script.prevent_default);
    let mut report = RenderReport {
        temp_file_path: None,
        data_url: None,
        events,
    };

    match mode {
        ExportMode::DataUrl => {
            let uri = host.exporter().to_data_url_as(
                &canvas,
                script.export.file_type,
                script.export.quality,
            )?;
            report.data_url = Some(uri);
        }
        ExportMode::Sync => {
            let result = host.exporter().export_sync(&canvas, &script.export)?;
            report.temp_file_path = Some(result.temp_file_path);
        }
        ExportMode::Queued => {
            let (queue, worker) = host.export_queue();
            let worker = tokio::spawn(worker.run());
            let pending = queue.export_future(&canvas, &script.export);
            drop(queue);
            drop(canvas);

            let result = pending.await?;
            worker.await.context("Export worker failed")?;
            report.temp_file_path = Some(result.temp_file_path);
        }
    }
    Ok(report)
}

fn apply_2d(ctx: &mut Context2d<'_>, op: &DrawOp) -> anyhow::Result<()> {
    match *op {
        DrawOp::FillStyle { color } => ctx.set_fill_style(color),
        DrawOp::StrokeStyle { color } => ctx.set_stroke_style(color),
        DrawOp::LineWidth { width } => ctx.set_line_width(width),
        DrawOp::GlobalAlpha { alpha } => ctx.set_global_alpha(alpha),
        DrawOp::FillRect {
            x,
            y,
            width,
            height,
        } => ctx.fill_rect(x, y, width, height)?,
        DrawOp::StrokeRect {
            x,
            y,
            width,
            height,
        } => ctx.stroke_rect(x, y, width, height)?,
        DrawOp::ClearRect {
            x,
            y,
            width,
            height,
        } => ctx.clear_rect(x, y, width, height)?,
        DrawOp::ClearColor { .. } | DrawOp::Clear => {
            anyhow::bail!("{} requires a webgl context", op.name())
        }
    }
    Ok(())
}

fn apply_webgl(gl: &mut WebGlContext<'_>, op: &DrawOp) -> anyhow::Result<()> {
    match *op {
        DrawOp::ClearColor { color } => gl.clear_color(color),
        DrawOp::Clear => gl.clear()?,
        _ => anyhow::bail!("{} requires a 2d context", op.name()),
    }
    Ok(())
}

/// Feed touch steps through a tracker and dispatch the events to the canvas.
#[allow(clippy::cast_precision_loss)]
fn replay_touches(canvas: &mut CanvasSurface, steps: &[TouchStep], prevent_default: bool) -> Vec<Event> {
    if steps.is_empty() {
        return Vec::new();
    }

    let mut hits = HitRegions::new();
    let (width, height) = (canvas.width() as f32, canvas.height() as f32);
    hits.attach(canvas.id(), Rect::new(0.0, 0.0, width, height), 0);

    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&delivered);
    let record = listener(move |event: &mut Event| {
        if prevent_default {
            event.prevent_default();
        }
        if let Ok(mut log) = sink.lock() {
            log.push(event.clone());
        }
    });
    for event_type in [
        EventType::TouchStart,
        EventType::TouchMove,
        EventType::TouchEnd,
        EventType::TouchCancel,
    ] {
        canvas.add_event_listener(event_type, Arc::clone(&record), ListenerOptions::default());
    }

    let mut tracker = TouchTracker::new();
    for step in steps {
        let event = match step.phase {
            TouchPhase::Start => tracker.on_contact_start(&step.contact, &hits),
            TouchPhase::Move => tracker.on_contact_move(&step.contact),
            TouchPhase::End => tracker.on_contact_end(&step.contact),
            TouchPhase::Cancel => tracker.on_contact_cancel(&step.contact),
        };
        let Some(touch) = event else { continue };

        if touch.base.target != Some(canvas.id()) {
            tracing::debug!("Touch {} is outside the canvas", step.contact.id.as_str());
            continue;
        }
        let mut event = Event::from(touch);
        let outcome = canvas.dispatch_event(&mut event);
        tracing::debug!(
            "Delivered {} to {} listener(s), default prevented: {}",
            event.event_type().as_str(),
            outcome.delivered,
            outcome.default_prevented
        );
    }

    let events = match delivered.lock() {
        Ok(mut log) => std::mem::take(&mut *log),
        Err(_) => Vec::new(),
    };
    events
}

/// Run the settings flow for an auth command.
///
/// # Errors
///
/// Returns an error if the permission accessor fails for a reason other than
/// a denial.
pub async fn auth(host: &Host, scope: Option<Scope>, open: bool) -> anyhow::Result<AuthReport> {
    let permissions = host.permissions();
    let err_msg = match scope {
        Some(scope) => match permissions.authorize(scope).await {
            Ok(()) => Some("authorize:ok".to_string()),
            Err(CoreError::AuthorizeDenied(msg)) => Some(msg),
            Err(e) => return Err(e.into()),
        },
        None => None,
    };
    let auth_setting = if open {
        permissions.open_setting().await?
    } else {
        permissions.get_setting().await?
    };
    Ok(AuthReport {
        scope,
        err_msg,
        auth_setting,
    })
}
