//! # Client Geometry Probing
//!
//! Best-effort measurement of the client's viewport and screen, sent along as
//! an auxiliary signal. The ambient environment is reached only through the
//! [`EnvironmentProbe`] trait so the builder can be exercised with fakes.
//!
//! ## Browsing-context traversal
//!
//! In an embedded (framed) placement the interesting viewport belongs to the
//! outermost context, but a parent on another origin refuses access.
//! [`topmost_accessible`] climbs parents until it reaches the top or hits such
//! a boundary, and returns the last context it could read. It never fails.

use std::sync::Arc;

/// Traversal stops after this many parent hops, so a malformed (cyclic)
/// context graph cannot loop forever.
pub const MAX_FRAME_DEPTH: usize = 64;

/// A width/height pair where either side may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extent {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Extent {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }
}

/// Ambient client-environment lookups.
pub trait EnvironmentProbe: Send + Sync {
    /// Inner size of the most accessible browsing context.
    fn viewport_size(&self) -> Extent;
    /// Physical screen size.
    fn screen_size(&self) -> Extent;
    fn device_pixel_ratio(&self) -> Option<f64>;
}

/// Geometry sampled once per resolution.
///
/// Values are kept as reported; the parameter builder decides which ones are
/// worth sending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeometrySnapshot {
    pub viewport_width: Option<u32>,
    pub viewport_height: Option<u32>,
    pub screen_width: Option<u32>,
    pub screen_height: Option<u32>,
}

impl GeometrySnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn sample(probe: &dyn EnvironmentProbe) -> Self {
        let viewport = probe.viewport_size();
        let screen = probe.screen_size();
        Self {
            viewport_width: viewport.width,
            viewport_height: viewport.height,
            screen_width: screen.width,
            screen_height: screen.height,
        }
    }

    /// Screen size as a single `"WxH"` string, when both sides are non-zero.
    pub fn combined_screen(&self) -> Option<String> {
        match (non_zero(self.screen_width), non_zero(self.screen_height)) {
            (Some(w), Some(h)) => Some(format!("{w}x{h}")),
            _ => None,
        }
    }
}

/// Zero and unknown are both treated as "absent".
pub(crate) fn non_zero(value: Option<u32>) -> Option<u32> {
    value.filter(|v| *v > 0)
}

/// Reading a parent context across an origin boundary was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cross-origin access to parent browsing context denied")]
pub struct CrossOriginDenied;

/// A (possibly nested) browsing context.
pub trait BrowsingContext: Send + Sync {
    /// Parent context; `Ok(None)` at the top.
    fn parent(&self) -> Result<Option<Arc<dyn BrowsingContext>>, CrossOriginDenied>;
    fn viewport_size(&self) -> Extent;
    fn screen_size(&self) -> Extent;
    fn device_pixel_ratio(&self) -> Option<f64> {
        None
    }
}

/// Climb from `start` to the most distant context reachable without a
/// cross-origin denial.
pub fn topmost_accessible(start: Arc<dyn BrowsingContext>) -> Arc<dyn BrowsingContext> {
    let mut current = start;
    for _ in 0..MAX_FRAME_DEPTH {
        match current.parent() {
            Ok(Some(parent)) => current = parent,
            Ok(None) | Err(CrossOriginDenied) => break,
        }
    }
    current
}

/// [`EnvironmentProbe`] that reads from the topmost accessible context.
pub struct FrameProbe {
    context: Arc<dyn BrowsingContext>,
}

impl FrameProbe {
    pub fn new(context: Arc<dyn BrowsingContext>) -> Self {
        Self { context }
    }

    fn top(&self) -> Arc<dyn BrowsingContext> {
        topmost_accessible(Arc::clone(&self.context))
    }
}

impl EnvironmentProbe for FrameProbe {
    fn viewport_size(&self) -> Extent {
        self.top().viewport_size()
    }

    fn screen_size(&self) -> Extent {
        self.top().screen_size()
    }

    fn device_pixel_ratio(&self) -> Option<f64> {
        self.top().device_pixel_ratio()
    }
}

/// In-memory browsing context, for hosts that mirror their frame tree and for
/// tests.
#[derive(Clone)]
pub struct FrameNode {
    parent: Option<Arc<dyn BrowsingContext>>,
    parent_cross_origin: bool,
    viewport: Extent,
    screen: Extent,
    device_pixel_ratio: Option<f64>,
}

impl FrameNode {
    /// A top-level context.
    pub fn top(viewport: Extent, screen: Extent) -> Self {
        Self {
            parent: None,
            parent_cross_origin: false,
            viewport,
            screen,
            device_pixel_ratio: None,
        }
    }

    /// A context nested inside `parent`.
    pub fn child_of(parent: Arc<dyn BrowsingContext>, viewport: Extent, screen: Extent) -> Self {
        Self {
            parent: Some(parent),
            parent_cross_origin: false,
            viewport,
            screen,
            device_pixel_ratio: None,
        }
    }

    /// Mark the parent as living on another origin.
    pub fn cross_origin(mut self) -> Self {
        self.parent_cross_origin = true;
        self
    }

    pub fn with_device_pixel_ratio(mut self, ratio: f64) -> Self {
        self.device_pixel_ratio = Some(ratio);
        self
    }
}

impl BrowsingContext for FrameNode {
    fn parent(&self) -> Result<Option<Arc<dyn BrowsingContext>>, CrossOriginDenied> {
        match &self.parent {
            Some(_) if self.parent_cross_origin => Err(CrossOriginDenied),
            Some(parent) => Ok(Some(Arc::clone(parent))),
            None => Ok(None),
        }
    }

    fn viewport_size(&self) -> Extent {
        self.viewport
    }

    fn screen_size(&self) -> Extent {
        self.screen
    }

    fn device_pixel_ratio(&self) -> Option<f64> {
        self.device_pixel_ratio
    }
}

/// Probe returning fixed values, e.g. from command-line flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticProbe {
    pub viewport: Extent,
    pub screen: Extent,
    pub device_pixel_ratio: Option<f64>,
}

impl EnvironmentProbe for StaticProbe {
    fn viewport_size(&self) -> Extent {
        self.viewport
    }

    fn screen_size(&self) -> Extent {
        self.screen
    }

    fn device_pixel_ratio(&self) -> Option<f64> {
        self.device_pixel_ratio
    }
}

/// Probe for environments with no display at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProbe;

impl EnvironmentProbe for NullProbe {
    fn viewport_size(&self) -> Extent {
        Extent::unknown()
    }

    fn screen_size(&self) -> Extent {
        Extent::unknown()
    }

    fn device_pixel_ratio(&self) -> Option<f64> {
        None
    }
}
