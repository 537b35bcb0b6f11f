//! JSON drawing scripts.
//!
//! A script describes one canvas, the drawing calls to issue on it, touch
//! input to replay against it, and what to export afterwards:
//!
//! ```json
//! {
//!   "width": 100,
//!   "height": 100,
//!   "context": "2d",
//!   "ops": [
//!     { "op": "fillStyle", "color": "#1e90ff" },
//!     { "op": "fillRect", "x": 0, "y": 0, "width": 50, "height": 50 }
//!   ],
//!   "touches": [
//!     { "phase": "start", "id": "t1", "screenX": 10, "screenY": 10 },
//!     { "phase": "end", "id": "t1", "screenX": 10, "screenY": 10 }
//!   ],
//!   "export": { "width": 50, "height": 50, "destWidth": 25, "destHeight": 25 }
//! }
//! ```

use std::path::Path;

use anyhow::Context as _;
use minihost_canvas::{Color, ContextAttributes, ContextKind, SnapshotRequest};
use minihost_core::RawContact;
use serde::{Deserialize, Serialize};

/// A complete render script.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderScript {
    /// Canvas width; the window width when omitted.
    pub width: Option<u32>,
    /// Canvas height; the window height when omitted.
    pub height: Option<u32>,
    /// Context family, `2d` when omitted.
    pub context: Option<ContextKind>,
    /// Context attributes.
    pub attributes: ContextAttributes,
    /// Drawing calls, in order.
    pub ops: Vec<DrawOp>,
    /// Touch input to replay after drawing.
    pub touches: Vec<TouchStep>,
    /// Whether the canvas's touch listener suppresses default handling.
    pub prevent_default: bool,
    /// Export request.
    pub export: SnapshotRequest,
}

impl RenderScript {
    /// Read a script from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid render script {}", path.display()))
    }

    /// The context family to acquire.
    #[must_use]
    pub fn context_kind(&self) -> ContextKind {
        self.context.unwrap_or(ContextKind::TwoD)
    }
}

/// One drawing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DrawOp {
    /// Set the 2D fill color.
    FillStyle {
        /// New color.
        color: Color,
    },
    /// Set the 2D stroke color.
    StrokeStyle {
        /// New color.
        color: Color,
    },
    /// Set the 2D line width.
    LineWidth {
        /// New width.
        width: f32,
    },
    /// Set the 2D global alpha.
    GlobalAlpha {
        /// New alpha.
        alpha: f32,
    },
    /// Fill a rectangle.
    FillRect {
        /// Left edge.
        x: f32,
        /// Top edge.
        y: f32,
        /// Width.
        width: f32,
        /// Height.
        height: f32,
    },
    /// Outline a rectangle.
    StrokeRect {
        /// Left edge.
        x: f32,
        /// Top edge.
        y: f32,
        /// Width.
        width: f32,
        /// Height.
        height: f32,
    },
    /// Clear a rectangle to transparent.
    ClearRect {
        /// Left edge.
        x: f32,
        /// Top edge.
        y: f32,
        /// Width.
        width: f32,
        /// Height.
        height: f32,
    },
    /// Set the WebGL clear color.
    ClearColor {
        /// New color.
        color: Color,
    },
    /// Clear the WebGL buffer.
    Clear,
}

impl DrawOp {
    /// The op's script name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::FillStyle { .. } => "fillStyle",
            Self::StrokeStyle { .. } => "strokeStyle",
            Self::LineWidth { .. } => "lineWidth",
            Self::GlobalAlpha { .. } => "globalAlpha",
            Self::FillRect { .. } => "fillRect",
            Self::StrokeRect { .. } => "strokeRect",
            Self::ClearRect { .. } => "clearRect",
            Self::ClearColor { .. } => "clearColor",
            Self::Clear => "clear",
        }
    }
}

/// Transition of a replayed contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchPhase {
    /// Contact begins.
    Start,
    /// Contact moves.
    Move,
    /// Contact lifts.
    End,
    /// Contact is cancelled by the platform.
    Cancel,
}

/// One replayed touch sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchStep {
    /// Transition.
    pub phase: TouchPhase,
    /// Contact sample.
    #[serde(flatten)]
    pub contact: RawContact,
}
