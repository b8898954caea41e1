//! Transition timeline: layered still frames rendered to raw RGB frames.
//!
//! A timeline is a stack of [`Layer`]s. Each layer is a still image with a
//! start time, a duration and a [`Placement`] that maps time to an (x, y)
//! offset. Rendering frame `i` draws every layer visible at `t = i / fps`
//! bottom to top onto a black canvas, clipping anything outside it.

use backdrop_models::{vertical_wipe_offset, TransitionSpec};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage};
use tracing::debug;

/// Bytes per `rgb24` pixel.
pub const RGB_CHANNELS: usize = 3;

/// How a layer moves over time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Anchored at the origin.
    Static,
    /// Slides down from one canvas-height above the top edge, reaching the
    /// origin after `duration` seconds.
    VerticalWipe { duration: f64 },
}

impl Placement {
    /// Offset of the layer's top-left corner at local time `t`.
    pub fn offset_at(&self, t: f64, canvas_height: u32) -> (f64, f64) {
        match *self {
            Placement::Static => (0.0, 0.0),
            Placement::VerticalWipe { duration } => {
                (0.0, vertical_wipe_offset(t, duration, canvas_height))
            }
        }
    }
}

/// A still image placed on the timeline.
#[derive(Debug, Clone)]
pub struct Layer {
    image: RgbImage,
    start: f64,
    duration: f64,
    placement: Placement,
}

impl Layer {
    pub fn new(image: RgbImage, start: f64, duration: f64, placement: Placement) -> Self {
        Self {
            image,
            start,
            duration,
            placement,
        }
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    pub fn is_visible(&self, t: f64) -> bool {
        t >= self.start && t < self.end()
    }

    /// Integer pixel offset at global time `t`.
    fn pixel_offset(&self, t: f64, canvas_height: u32) -> (i64, i64) {
        let (x, y) = self.placement.offset_at(t - self.start, canvas_height);
        (x.round() as i64, y.round() as i64)
    }
}

/// Layer stack rendered at a fixed frame rate.
#[derive(Debug, Clone)]
pub struct TransitionTimeline {
    width: u32,
    height: u32,
    fps: u32,
    layers: Vec<Layer>,
}

impl TransitionTimeline {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            fps,
            layers: Vec::new(),
        }
    }

    /// Add a layer above the existing ones.
    pub fn push_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// The standard wipe: `frame_a` underneath for the wipe duration,
    /// `frame_b` sliding in above it and holding.
    ///
    /// The canvas takes `frame_a`'s size; `frame_b` is stretched to match
    /// when the two differ.
    pub fn vertical_wipe(
        frame_a: &DynamicImage,
        frame_b: &DynamicImage,
        spec: &TransitionSpec,
    ) -> Self {
        let (width, height) = frame_a.dimensions();
        let frame_b = if frame_b.dimensions() != (width, height) {
            debug!(
                from_width = frame_b.width(),
                from_height = frame_b.height(),
                width,
                height,
                "Resizing incoming frame to match the original"
            );
            frame_b.resize_exact(width, height, FilterType::CatmullRom)
        } else {
            frame_b.clone()
        };

        Self::new(width, height, spec.fps)
            .push_layer(Layer::new(
                frame_a.to_rgb8(),
                0.0,
                spec.wipe_duration,
                Placement::Static,
            ))
            .push_layer(Layer::new(
                frame_b.to_rgb8(),
                0.0,
                spec.hold_duration,
                Placement::VerticalWipe {
                    duration: spec.wipe_duration,
                },
            ))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Length of the composite: the latest layer end.
    pub fn duration(&self) -> f64 {
        self.layers.iter().map(Layer::end).fold(0.0, f64::max)
    }

    pub fn frame_count(&self) -> u64 {
        (self.duration() * f64::from(self.fps)).round() as u64
    }

    pub fn frame_time(&self, index: u64) -> f64 {
        index as f64 / f64::from(self.fps)
    }

    /// Size of one `rgb24` frame in bytes.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * RGB_CHANNELS
    }

    /// Render frame `index` into `buffer` (`rgb24`, row-major).
    pub fn render_frame_into(&self, index: u64, buffer: &mut [u8]) {
        debug_assert_eq!(buffer.len(), self.frame_len());
        buffer.fill(0);

        let t = self.frame_time(index);
        for layer in self.layers.iter().filter(|l| l.is_visible(t)) {
            let (dx, dy) = layer.pixel_offset(t, self.height);
            self.blit(buffer, &layer.image, dx, dy);
        }
    }

    /// Render frame `index` as an image.
    pub fn render_frame(&self, index: u64) -> RgbImage {
        let mut buffer = vec![0u8; self.frame_len()];
        self.render_frame_into(index, &mut buffer);
        RgbImage::from_raw(self.width, self.height, buffer)
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    /// Copy `image` onto the canvas with its top-left corner at (dx, dy).
    fn blit(&self, canvas: &mut [u8], image: &RgbImage, dx: i64, dy: i64) {
        let canvas_w = i64::from(self.width);
        let canvas_h = i64::from(self.height);
        let (img_w, img_h) = (i64::from(image.width()), i64::from(image.height()));

        let x0 = dx.max(0);
        let x1 = (dx + img_w).min(canvas_w);
        let y0 = dy.max(0);
        let y1 = (dy + img_h).min(canvas_h);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let src = image.as_raw();
        let span = (x1 - x0) as usize * RGB_CHANNELS;
        for y in y0..y1 {
            let src_row = (y - dy) as usize * img_w as usize;
            let src_start = (src_row + (x0 - dx) as usize) * RGB_CHANNELS;
            let dst_start = (y as usize * canvas_w as usize + x0 as usize) * RGB_CHANNELS;
            canvas[dst_start..dst_start + span].copy_from_slice(&src[src_start..src_start + span]);
        }
    }
}
