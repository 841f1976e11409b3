//! Per-segment camera motion.
//!
//! [`motion_at`] is the reference definition of every motion: a pure
//! function from a frame index to the zoom factor, the top-left corner of
//! the visible window (in source pixels), and a rotation angle.
//! [`motion_filter`] emits the ffmpeg expressions evaluating the same
//! formulas, with `on` (zoompan output frame) or `n` (rotate frame) standing
//! in for the frame index.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use slidecast_core::config::EffectsConfig;
use slidecast_effects::Motion;

use crate::graph::num;

/// Tunables shared by all motions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Zoom added per frame by `kenburns`.
    pub kenburns_rate: f64,
    /// Zoom ceiling for `kenburns` and the end point of `zoom_in`/`zoom_out`.
    pub max_zoom: f64,
    /// Fixed zoom used while panning or shaking, so there is room to move.
    pub pan_zoom: f64,
    /// Shake amplitude in pixels.
    pub shake_amplitude: f64,
    /// Frames per shake oscillation.
    pub shake_period_frames: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self::from(&EffectsConfig::default())
    }
}

impl From<&EffectsConfig> for MotionConfig {
    fn from(cfg: &EffectsConfig) -> Self {
        Self {
            kenburns_rate: cfg.kenburns_rate,
            max_zoom: cfg.max_zoom,
            pan_zoom: cfg.pan_zoom,
            shake_amplitude: cfg.shake_amplitude,
            shake_period_frames: cfg.shake_period_frames.max(1),
        }
    }
}

/// Camera state for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionFrame {
    pub zoom: f64,
    pub x: f64,
    pub y: f64,
    /// Radians, positive is clockwise.
    pub angle: f64,
}

impl MotionFrame {
    fn identity() -> Self {
        Self {
            zoom: 1.0,
            x: 0.0,
            y: 0.0,
            angle: 0.0,
        }
    }

    fn centered(zoom: f64, w: f64, h: f64) -> Self {
        Self {
            zoom,
            x: (w - w / zoom) / 2.0,
            y: (h - h / zoom) / 2.0,
            angle: 0.0,
        }
    }
}

/// Number of frames a segment of `seconds` spans at `fps`.
pub fn frame_count(seconds: f64, fps: u32) -> u32 {
    ((seconds * f64::from(fps)).ceil() as u32).max(1)
}

/// Denominator for progress: the last frame index, never zero.
fn last_index(count: u32) -> f64 {
    f64::from(count.saturating_sub(1).max(1))
}

/// Shake amplitude limited to the margin the zoom leaves on each side.
fn shake_amplitudes(cfg: &MotionConfig, w: f64, h: f64) -> (f64, f64) {
    let z = cfg.pan_zoom.max(1.0);
    let ax = cfg.shake_amplitude.min((w - w / z) / 2.0).max(0.0);
    let ay = cfg.shake_amplitude.min((h - h / z) / 2.0).max(0.0);
    (ax, ay)
}

/// Camera state at `frame` of a `count`-frame segment.
pub fn motion_at(
    motion: Motion,
    frame: u32,
    count: u32,
    width: u32,
    height: u32,
    cfg: &MotionConfig,
) -> MotionFrame {
    let w = f64::from(width);
    let h = f64::from(height);
    let p = (f64::from(frame) / last_index(count)).clamp(0.0, 1.0);
    let max_zoom = cfg.max_zoom.max(1.0);
    let pan_zoom = cfg.pan_zoom.max(1.0);

    match motion {
        Motion::Static => MotionFrame::identity(),
        Motion::Kenburns => {
            let zoom = (1.0 + cfg.kenburns_rate * f64::from(frame)).min(max_zoom);
            MotionFrame::centered(zoom, w, h)
        }
        Motion::ZoomIn => MotionFrame::centered(1.0 + (max_zoom - 1.0) * p, w, h),
        Motion::ZoomOut => MotionFrame::centered(max_zoom - (max_zoom - 1.0) * p, w, h),
        Motion::PanLeft | Motion::PanRight | Motion::PanUp | Motion::PanDown => {
            let mut f = MotionFrame::centered(pan_zoom, w, h);
            let span_x = w - w / pan_zoom;
            let span_y = h - h / pan_zoom;
            match motion {
                Motion::PanLeft => f.x = span_x * (1.0 - p),
                Motion::PanRight => f.x = span_x * p,
                Motion::PanUp => f.y = span_y * (1.0 - p),
                _ => f.y = span_y * p,
            }
            f
        }
        Motion::RotateClockwise => MotionFrame {
            angle: 2.0 * PI * p,
            ..MotionFrame::identity()
        },
        Motion::RotateCounter => MotionFrame {
            angle: -2.0 * PI * p,
            ..MotionFrame::identity()
        },
        Motion::Shake => {
            let (ax, ay) = shake_amplitudes(cfg, w, h);
            let phase = 2.0 * PI * f64::from(frame) / f64::from(cfg.shake_period_frames.max(1));
            let mut f = MotionFrame::centered(pan_zoom, w, h);
            f.x += ax * phase.sin();
            f.y += ay * phase.cos();
            f
        }
    }
}

fn zoompan(z: &str, x: &str, y: &str, width: u32, height: u32, fps: u32) -> String {
    format!("zoompan=z='{z}':x='{x}':y='{y}':d=1:s={width}x{height}:fps={fps}")
}

/// ffmpeg filter chain applying `motion` to a `frames`-long segment that is
/// already `width`x`height`.
pub fn motion_filter(
    motion: Motion,
    frames: u32,
    width: u32,
    height: u32,
    fps: u32,
    cfg: &MotionConfig,
) -> String {
    let last = num(last_index(frames));
    let max_zoom = num(cfg.max_zoom.max(1.0));
    let pan_zoom = num(cfg.pan_zoom.max(1.0));
    let cx = "iw/2-(iw/zoom/2)";
    let cy = "ih/2-(ih/zoom/2)";

    match motion {
        Motion::Static => format!("fps={fps}"),
        Motion::Kenburns => zoompan(
            &format!("min(1+{}*on,{max_zoom})", num(cfg.kenburns_rate)),
            cx,
            cy,
            width,
            height,
            fps,
        ),
        Motion::ZoomIn => zoompan(
            &format!("1+({max_zoom}-1)*on/{last}"),
            cx,
            cy,
            width,
            height,
            fps,
        ),
        Motion::ZoomOut => zoompan(
            &format!("{max_zoom}-({max_zoom}-1)*on/{last}"),
            cx,
            cy,
            width,
            height,
            fps,
        ),
        Motion::PanLeft => zoompan(
            &pan_zoom,
            &format!("(iw-iw/zoom)*(1-on/{last})"),
            cy,
            width,
            height,
            fps,
        ),
        Motion::PanRight => zoompan(
            &pan_zoom,
            &format!("(iw-iw/zoom)*on/{last}"),
            cy,
            width,
            height,
            fps,
        ),
        Motion::PanUp => zoompan(
            &pan_zoom,
            cx,
            &format!("(ih-ih/zoom)*(1-on/{last})"),
            width,
            height,
            fps,
        ),
        Motion::PanDown => zoompan(
            &pan_zoom,
            cx,
            &format!("(ih-ih/zoom)*on/{last}"),
            width,
            height,
            fps,
        ),
        Motion::RotateClockwise | Motion::RotateCounter => {
            let sign = if motion == Motion::RotateCounter { "-" } else { "" };
            format!(
                "{},rotate=a='{sign}2*PI*n/{last}':ow={width}:oh={height}:c=black",
                zoompan("1", "0", "0", width, height, fps)
            )
        }
        Motion::Shake => {
            let (ax, ay) = shake_amplitudes(cfg, f64::from(width), f64::from(height));
            let period = cfg.shake_period_frames.max(1);
            zoompan(
                &pan_zoom,
                &format!("{cx}+{}*sin(2*PI*on/{period})", num(ax)),
                &format!("{cy}+{}*cos(2*PI*on/{period})", num(ay)),
                width,
                height,
                fps,
            )
        }
    }
}
