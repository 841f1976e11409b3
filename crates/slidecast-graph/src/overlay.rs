//! Synthesized overlay layers.
//!
//! Each overlay is a generated source stream (sparse random specks shaped by
//! scaling and blurring, or a drifting gradient) that is blended onto the
//! composed video. Speck layers are generated below output resolution and
//! scaled up, which both sizes the specks and keeps `geq` cheap.

use slidecast_effects::Overlay;

use crate::graph::num;

/// Generated layer and how it composites onto the main stream.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLayer {
    /// Source filter chain (no input pads).
    pub source: String,
    /// `blend` mode.
    pub mode: &'static str,
    pub opacity: f64,
}

struct Specks {
    /// Generation resolution divisor.
    divisor: u32,
    /// Probability that a pixel lights up in a frame.
    density: f64,
    brightness: u8,
    scale_flags: &'static str,
    shaping: Option<&'static str>,
}

fn specks(s: Specks, width: u32, height: u32, fps: u32, seconds: f64) -> String {
    let gw = (width / s.divisor).max(1);
    let gh = (height / s.divisor).max(1);
    let mut chain = format!(
        "color=c=black:s={gw}x{gh}:r={fps}:d={},format=gray,\
         geq=lum='if(lt(random(1),{}),{},0)',scale={width}:{height}:flags={}",
        num(seconds),
        s.density,
        s.brightness,
        s.scale_flags
    );
    if let Some(shaping) = s.shaping {
        chain.push(',');
        chain.push_str(shaping);
    }
    chain
}

/// Build the layer for `overlay` covering `seconds` of `width`x`height` video.
pub fn overlay_layer(
    overlay: Overlay,
    width: u32,
    height: u32,
    fps: u32,
    seconds: f64,
    pixel_format: &str,
) -> OverlayLayer {
    let d = num(seconds);
    let (source, mode, opacity) = match overlay {
        Overlay::Particles => (
            specks(
                Specks {
                    divisor: 4,
                    density: 0.0008,
                    brightness: 255,
                    scale_flags: "bilinear",
                    shaping: Some("gblur=sigma=1.5"),
                },
                width,
                height,
                fps,
                seconds,
            ),
            "screen",
            0.6,
        ),
        Overlay::LightLeaks => (
            format!(
                "gradients=s={width}x{height}:r={fps}:d={d}:\
                 c0=0xff7a1a:c1=0xffd27a:nb_colors=2:speed=0.015"
            ),
            "screen",
            0.35,
        ),
        Overlay::Dust => (
            specks(
                Specks {
                    divisor: 2,
                    density: 0.0004,
                    brightness: 220,
                    scale_flags: "neighbor",
                    shaping: None,
                },
                width,
                height,
                fps,
                seconds,
            ),
            "screen",
            0.3,
        ),
        Overlay::Scratches => (
            // one row of noise stretched to full height gives vertical lines
            format!(
                "color=c=black:s={width}x1:r={fps}:d={d},format=gray,\
                 geq=lum='if(lt(random(1),0.003),200,0)',scale={width}:{height}:flags=neighbor"
            ),
            "screen",
            0.4,
        ),
        Overlay::Bokeh => (
            specks(
                Specks {
                    divisor: 8,
                    density: 0.002,
                    brightness: 255,
                    scale_flags: "bilinear",
                    shaping: Some("gblur=sigma=12"),
                },
                width,
                height,
                fps,
                seconds,
            ),
            "screen",
            0.5,
        ),
        Overlay::LensFlare => (
            format!(
                "gradients=s={width}x{height}:r={fps}:d={d}:type=radial:\
                 c0=0xfff4d6:c1=0x000000:nb_colors=2:x0={}:y0={}:x1={width}:y1={}:speed=0",
                width * 4 / 5,
                height / 5,
                height / 2
            ),
            "screen",
            0.45,
        ),
        Overlay::Rain => (
            specks(
                Specks {
                    divisor: 2,
                    density: 0.002,
                    brightness: 200,
                    scale_flags: "neighbor",
                    shaping: Some("avgblur=sizeX=1:sizeY=24"),
                },
                width,
                height,
                fps,
                seconds,
            ),
            "screen",
            0.35,
        ),
        Overlay::Snow => (
            specks(
                Specks {
                    divisor: 4,
                    density: 0.0015,
                    brightness: 255,
                    scale_flags: "bilinear",
                    shaping: Some("gblur=sigma=2"),
                },
                width,
                height,
                fps,
                seconds,
            ),
            "screen",
            0.6,
        ),
    };

    OverlayLayer {
        source: format!("{source},setsar=1,format={pixel_format}"),
        mode,
        opacity,
    }
}

/// The `blend` filter compositing a layer onto the main stream.
pub fn composite_filter(layer: &OverlayLayer) -> String {
    format!(
        "blend=all_mode={}:all_opacity={}:shortest=1",
        layer.mode,
        num(layer.opacity)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_overlay_is_a_bounded_source() {
        for overlay in Overlay::ALL {
            let layer = overlay_layer(*overlay, 1280, 720, 30, 12.5, "yuv420p");
            assert!(layer.source.contains("d=12.5"), "{overlay}: {}", layer.source);
            assert!(layer.source.ends_with(",setsar=1,format=yuv420p"));
            assert!(layer.opacity > 0.0 && layer.opacity <= 1.0);
        }
    }

    #[test]
    fn scratches_stretch_a_single_row() {
        let layer = overlay_layer(Overlay::Scratches, 1920, 1080, 30, 10.0, "yuv420p");
        assert!(layer.source.starts_with("color=c=black:s=1920x1:"));
        assert!(layer.source.contains("scale=1920:1080:flags=neighbor"));
    }

    #[test]
    fn rain_and_snow_shape_specks_differently() {
        let rain = overlay_layer(Overlay::Rain, 1920, 1080, 30, 10.0, "yuv420p");
        let snow = overlay_layer(Overlay::Snow, 1920, 1080, 30, 10.0, "yuv420p");
        assert!(rain.source.contains("avgblur=sizeX=1:sizeY=24"));
        assert!(snow.source.contains("gblur=sigma=2"));
    }

    #[test]
    fn composite_uses_blend_mode_and_opacity() {
        let layer = overlay_layer(Overlay::LightLeaks, 1920, 1080, 30, 10.0, "yuv420p");
        assert_eq!(
            composite_filter(&layer),
            "blend=all_mode=screen:all_opacity=0.35:shortest=1"
        );
    }
}
