//! Context acquisition and the one-context-per-surface rule.
//!
//! A surface's context family is fixed when it is created. Asking for the
//! other family fails with [`CanvasError::ContextConflict`] instead of
//! replacing the bound context, so drawing state is never silently dropped.
//! Re-acquiring the bound family returns the existing context unchanged,
//! even when different attributes are passed; attributes are fixed at first
//! acquisition.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::backend::{BufferId, RenderBackend};
use crate::error::{CanvasError, CanvasResult};

/// Rendering context family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextKind {
    /// Raster 2D context.
    #[serde(rename = "2d")]
    TwoD,
    /// GPU-style WebGL context.
    #[serde(rename = "webgl")]
    WebGl,
}

impl ContextKind {
    /// The wire name (`2d` or `webgl`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TwoD => "2d",
            Self::WebGl => "webgl",
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextKind {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2d" => Ok(Self::TwoD),
            "webgl" => Ok(Self::WebGl),
            other => Err(CanvasError::UnsupportedContext(other.to_string())),
        }
    }
}

/// Capability flags fixed at acquisition time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextAttributes {
    /// Enable anti-aliasing.
    pub antialias: bool,
    /// Keep the drawing buffer after presentation.
    pub preserve_drawing_buffer: bool,
    /// Anti-aliasing sample count (iOS hosts only), at least 2.
    pub antialias_samples: Option<u32>,
}

impl ContextAttributes {
    /// Check attribute ranges.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidAttributes`] if the sample count is below 2.
    pub fn validate(&self) -> CanvasResult<()> {
        match self.antialias_samples {
            Some(samples) if samples < 2 => Err(CanvasError::InvalidAttributes(format!(
                "antialiasSamples must be at least 2, got {samples}"
            ))),
            _ => Ok(()),
        }
    }
}

/// Description of an acquired context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextInfo {
    /// Context family.
    pub kind: ContextKind,
    /// Attributes fixed at acquisition.
    pub attributes: ContextAttributes,
    /// Backend buffer the context draws into.
    pub buffer: BufferId,
    /// Backing store width.
    pub width: u32,
    /// Backing store height.
    pub height: u32,
}

/// Tracks the single context bound to a surface.
#[derive(Debug)]
pub struct ContextRegistry {
    family: ContextKind,
    active: Option<ContextInfo>,
}

impl ContextRegistry {
    /// Create a registry for a surface of the given family.
    #[must_use]
    pub fn new(family: ContextKind) -> Self {
        Self {
            family,
            active: None,
        }
    }

    /// The context family of the surface.
    #[must_use]
    pub fn family(&self) -> ContextKind {
        self.family
    }

    /// The acquired context, if any.
    #[must_use]
    pub fn active(&self) -> Option<&ContextInfo> {
        self.active.as_ref()
    }

    /// Return the bound context, creating it on first use.
    ///
    /// First acquisition allocates a `width` x `height` backend buffer.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::ContextConflict`] for the other family,
    /// [`CanvasError::InvalidAttributes`] for bad attributes on first
    /// acquisition, or a backend error if allocation fails. The existing
    /// context is untouched on failure.
    pub fn acquire(
        &mut self,
        backend: &mut dyn RenderBackend,
        width: u32,
        height: u32,
        kind: ContextKind,
        attributes: &ContextAttributes,
    ) -> CanvasResult<ContextInfo> {
        self.check_family(kind)?;

        if let Some(active) = self.active {
            if active.attributes != *attributes {
                tracing::warn!(
                    "Ignoring new attributes for already acquired {kind} context: {:?}",
                    attributes
                );
            }
            return Ok(active);
        }

        let info = Self::bind(backend, width, height, kind, attributes)?;
        self.active = Some(info);
        Ok(info)
    }

    /// Replace the bound context with a fresh one sized to `width` x `height`.
    ///
    /// The new buffer is allocated before the old one is released, so a
    /// failure leaves the existing context usable.
    ///
    /// # Errors
    ///
    /// Same as [`ContextRegistry::acquire`].
    pub fn reacquire(
        &mut self,
        backend: &mut dyn RenderBackend,
        width: u32,
        height: u32,
        attributes: &ContextAttributes,
    ) -> CanvasResult<ContextInfo> {
        let info = Self::bind(backend, width, height, self.family, attributes)?;
        if let Some(old) = self.active.replace(info) {
            backend.release_buffer(old.buffer);
        }
        Ok(info)
    }

    /// Release the bound context's backend resources.
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(old) = self.active.take() {
            backend.release_buffer(old.buffer);
        }
    }

    fn check_family(&self, requested: ContextKind) -> CanvasResult<()> {
        if requested == self.family {
            Ok(())
        } else {
            Err(CanvasError::ContextConflict {
                bound: self.family,
                requested,
            })
        }
    }

    fn bind(
        backend: &mut dyn RenderBackend,
        width: u32,
        height: u32,
        kind: ContextKind,
        attributes: &ContextAttributes,
    ) -> CanvasResult<ContextInfo> {
        attributes.validate()?;

        let buffer = backend.allocate_buffer(width, height)?;
        if let Err(e) = backend.bind_context(buffer, kind, attributes) {
            backend.release_buffer(buffer);
            return Err(e.into());
        }

        tracing::debug!(
            "Acquired {kind} context on {} buffer {buffer} ({width}x{height})",
            backend.name()
        );
        Ok(ContextInfo {
            kind,
            attributes: *attributes,
            buffer,
            width,
            height,
        })
    }
}
