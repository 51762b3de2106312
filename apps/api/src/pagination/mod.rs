//! Print pagination — infers page count and the current page from the rendered
//! preview's pixel height and scroll position under a zoom factor.
//!
//! Height measurement needs a layout pass on the render surface, so it is debounced
//! by the session before `on_height_measured` runs. Scroll handling is plain
//! arithmetic and runs on every scroll tick without re-measuring.

use serde::{Deserialize, Serialize};

/// A4 at 96 DPI.
pub const A4_PAGE_HEIGHT_PX: f64 = 1122.0;

/// Content ending within this many pixels past a page boundary does not start a new page.
pub const PAGE_MARGIN_BUFFER_PX: f64 = 20.0;

/// Fraction of a scaled page that must scroll past the viewport top before the next
/// page counts as current.
pub const CURRENT_PAGE_LEAD_FRACTION: f64 = 0.30;

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 2.0;
pub const ZOOM_STEP: f64 = 0.1;
pub const DEFAULT_ZOOM: f64 = 1.0;

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

/// `max(1, ceil((height - buffer) / page_height))`.
///
/// Zero, negative or non-finite inputs (nothing rendered yet) yield 1.
pub fn compute_total_pages(measured_height_px: f64, page_height_px: f64) -> u32 {
    if !measured_height_px.is_finite()
        || !page_height_px.is_finite()
        || measured_height_px <= 0.0
        || page_height_px <= 0.0
    {
        return 1;
    }

    let pages = ((measured_height_px - PAGE_MARGIN_BUFFER_PX) / page_height_px).ceil();
    if pages < 1.0 {
        1
    } else {
        pages.min(f64::from(u32::MAX)) as u32
    }
}

/// The page the reader is mostly looking at, always within `[1, total_pages]`.
pub fn compute_current_page(
    scroll_offset_px: f64,
    page_height_px: f64,
    zoom_factor: f64,
    total_pages: u32,
) -> u32 {
    let total_pages = total_pages.max(1);
    let zoom = if zoom_factor.is_finite() && zoom_factor > 0.0 {
        zoom_factor
    } else {
        DEFAULT_ZOOM
    };
    let scaled_page_height = page_height_px * zoom;
    if !scaled_page_height.is_finite() || scaled_page_height <= 0.0 {
        return 1;
    }
    let scroll = if scroll_offset_px.is_finite() {
        scroll_offset_px.max(0.0)
    } else {
        0.0
    };

    let page_index =
        ((scroll + scaled_page_height * CURRENT_PAGE_LEAD_FRACTION) / scaled_page_height).floor();
    let page = (page_index + 1.0).min(f64::from(total_pages));
    (page as u32).clamp(1, total_pages)
}

/// Clamps a requested zoom factor into `[MIN_ZOOM, MAX_ZOOM]`.
pub fn clamp_zoom(requested: f64) -> f64 {
    if requested.is_finite() {
        requested.clamp(MIN_ZOOM, MAX_ZOOM)
    } else {
        DEFAULT_ZOOM
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Zoom
// ────────────────────────────────────────────────────────────────────────────

/// Preview zoom factor, always within bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "f64", from = "f64")]
pub struct Zoom(f64);

impl Default for Zoom {
    fn default() -> Self {
        Zoom(DEFAULT_ZOOM)
    }
}

impl From<f64> for Zoom {
    fn from(value: f64) -> Self {
        Zoom::new(value)
    }
}

impl From<Zoom> for f64 {
    fn from(zoom: Zoom) -> Self {
        zoom.0
    }
}

impl Zoom {
    pub fn new(requested: f64) -> Self {
        Zoom(clamp_zoom(requested))
    }

    pub fn factor(self) -> f64 {
        self.0
    }

    pub fn percent(self) -> u32 {
        (self.0 * 100.0).round() as u32
    }

    pub fn zoom_in(self) -> Self {
        Zoom::new(round_to_step(self.0 + ZOOM_STEP))
    }

    pub fn zoom_out(self) -> Self {
        Zoom::new(round_to_step(self.0 - ZOOM_STEP))
    }

    pub fn reset(self) -> Self {
        Zoom::default()
    }
}

/// Keeps repeated steps on the 0.1 grid instead of drifting (0.1 + 0.2 != 0.3).
fn round_to_step(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ────────────────────────────────────────────────────────────────────────────
// State
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationState {
    pub total_pages: u32,
    pub current_page: u32,
    pub zoom: Zoom,
    /// Last applied height; `None` until the render surface reports one.
    pub measured_height_px: Option<f64>,
    pub scroll_offset_px: f64,
    pub page_height_px: f64,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            total_pages: 1,
            current_page: 1,
            zoom: Zoom::default(),
            measured_height_px: None,
            scroll_offset_px: 0.0,
            page_height_px: A4_PAGE_HEIGHT_PX,
        }
    }
}

impl PaginationState {
    /// Fresh state for a new preview entry: zoom 1.0, page 1, nothing measured.
    pub fn reset(&mut self) {
        *self = PaginationState {
            page_height_px: self.page_height_px,
            ..PaginationState::default()
        };
    }

    /// Recomputes the page count after a layout change and re-clamps the current page.
    pub fn on_height_measured(&mut self, height_px: f64) {
        self.measured_height_px = Some(height_px);
        self.total_pages = compute_total_pages(height_px, self.page_height_px);
        self.refresh_current_page();
    }

    /// Cheap path: page-from-scroll only.
    pub fn on_scroll(&mut self, scroll_offset_px: f64) {
        self.scroll_offset_px = scroll_offset_px;
        self.refresh_current_page();
    }

    pub fn zoom_in(&mut self) {
        self.zoom = self.zoom.zoom_in();
        self.refresh_current_page();
    }

    pub fn zoom_out(&mut self) {
        self.zoom = self.zoom.zoom_out();
        self.refresh_current_page();
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = self.zoom.reset();
        self.refresh_current_page();
    }

    pub fn set_zoom(&mut self, requested: f64) {
        self.zoom = Zoom::new(requested);
        self.refresh_current_page();
    }

    fn refresh_current_page(&mut self) {
        self.current_page = compute_current_page(
            self.scroll_offset_px,
            self.page_height_px,
            self.zoom.factor(),
            self.total_pages,
        );
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
