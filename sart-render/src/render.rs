use crate::screens::{fallback_text, pixmap_from_rgba, stretch_to};
use crate::text::{render_text_block, render_text_pixmap};
use ab_glyph::FontArc;
use anyhow::{Context, Result, anyhow};
use bytemuck::{cast_slice, cast_slice_mut};
use sart_cache::get_text;
use sart_core::{CacheId, Digit, Screen, Stimulus, StimulusType};
use sart_timing::{CalibrationStats, HighPrecisionTimer, Timer};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tiny_skia::{Color, Paint, Pixmap, Rect, Transform};

const WHITE: [u8; 4] = [255, 255, 255, 255];

// Text heights in norm units (the window is 2 units tall).
const FIXATION_HEIGHT: f32 = 0.1;
const FEEDBACK_HEIGHT: f32 = 0.15;
const SCREEN_TEXT_HEIGHT: f32 = 0.1;
// Text wraps at 1.5 of the window's 2 norm units of width.
const WRAP_WIDTH: f32 = 1.5;

pub struct FrameStats {
    pub clear: Duration,
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
    pub dirty_count: usize,
}

/// Software rasteriser for the task's stimuli.
///
/// Every stimulus is rendered once per window size into a pixmap keyed by its
/// [`CacheId`]; a frame then only clears the previous stimulus' rectangle and
/// blits the new one.
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    center: (f32, f32),

    font: FontArc,
    digit_heights: Vec<f32>,
    target: Digit,

    cache: HashMap<CacheId, Arc<Pixmap>>,
    screen_images: HashMap<Screen, Pixmap>,

    canvas: Pixmap,
    dirty_regions: Vec<Rect>,
    first_frame: bool,

    component_timers: HashMap<&'static str, HighPrecisionTimer>,
    clear_buffer: Vec<u8>,
}

impl SkiaRenderer {
    /// `digit_heights` are in norm units, indexed by a digit stimulus' `size`.
    pub fn new(
        width: u32,
        height: u32,
        font_data: Vec<u8>,
        digit_heights: Vec<f32>,
        target: Digit,
    ) -> Result<Self> {
        let font = FontArc::try_from_vec(font_data).context("font data is not a usable font")?;

        Ok(SkiaRenderer {
            width,
            height,
            center: (width as f32 / 2.0, height as f32 / 2.0),
            font,
            digit_heights,
            target,
            cache: HashMap::new(),
            screen_images: HashMap::new(),
            canvas: opaque_canvas(width, height)?,
            dirty_regions: Vec::with_capacity(16),
            first_frame: true,
            component_timers: ["draw", "clear", "copy"]
                .iter()
                .map(|&k| (k, HighPrecisionTimer::new()))
                .collect(),
            clear_buffer: clear_buffer(width, height),
        })
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<()> {
        self.width = new_width;
        self.height = new_height;
        self.center = (new_width as f32 / 2.0, new_height as f32 / 2.0);
        self.canvas = opaque_canvas(new_width, new_height)?;
        self.clear_buffer = clear_buffer(new_width, new_height);
        self.dirty_regions.clear();
        // Sizes are relative to the window, so every cached pixmap is stale.
        self.cache.clear();
        self.first_frame = true;
        Ok(())
    }

    /// Registers a page image (straight RGBA8). Pages without one fall back to text.
    pub fn set_screen_image(
        &mut self,
        screen: Screen,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<()> {
        let pm = pixmap_from_rgba(width, height, rgba)
            .ok_or_else(|| anyhow!("bad image buffer for {screen:?} ({width}x{height})"))?;
        self.screen_images.insert(screen, pm);
        self.cache.remove(&CacheId::Screen(screen));
        Ok(())
    }

    /// Builds every cacheable pixmap up front so no frame pays for rasterising.
    pub fn warm_cache(&mut self) -> Result<()> {
        let mut stimuli = vec![StimulusType::Fixation];
        for digit in Digit::all() {
            for size in 0..self.digit_heights.len() {
                stimuli.push(StimulusType::Digit {
                    digit,
                    size: size as u8,
                });
            }
        }
        stimuli.extend(Screen::ALL.into_iter().map(StimulusType::Screen));
        for stimulus in &stimuli {
            self.cached(stimulus)?;
        }
        tracing::debug!(entries = self.cache.len(), "stimulus cache warmed");
        Ok(())
    }

    fn px(&self, norm_height: f32) -> f32 {
        (norm_height * self.height as f32 / 2.0).max(1.0)
    }

    fn wrap_px(&self) -> f32 {
        WRAP_WIDTH * self.width as f32 / 2.0
    }

    fn cached(&mut self, stimulus: &StimulusType) -> Result<Option<Arc<Pixmap>>> {
        let Some(id) = stimulus.cache_id() else {
            return Ok(None);
        };
        if let Some(pm) = self.cache.get(&id) {
            return Ok(Some(Arc::clone(pm)));
        }
        let pm = Arc::new(self.rasterise(stimulus)?);
        self.cache.insert(id, Arc::clone(&pm));
        Ok(Some(pm))
    }

    fn rasterise(&self, stimulus: &StimulusType) -> Result<Pixmap> {
        let pm = match stimulus {
            StimulusType::Blank => Pixmap::new(1, 1),
            StimulusType::Fixation => self.fixation_cross(),
            StimulusType::Digit { digit, size } => {
                let norm = self
                    .digit_heights
                    .get(*size as usize)
                    .copied()
                    .ok_or_else(|| anyhow!("no digit height for size {size}"))?;
                render_text_pixmap(&digit.to_string(), self.px(norm), &self.font, WHITE)
            }
            StimulusType::Feedback { text_id, tone } => {
                let text =
                    get_text(*text_id).ok_or_else(|| anyhow!("unknown text id {text_id}"))?;
                render_text_block(
                    &text,
                    self.px(FEEDBACK_HEIGHT),
                    self.wrap_px(),
                    &self.font,
                    tone.color(),
                )
            }
            StimulusType::Screen(screen) => match self.screen_images.get(screen) {
                Some(image) => stretch_to(image, self.width, self.height),
                None => render_text_block(
                    &fallback_text(*screen, self.target),
                    self.px(SCREEN_TEXT_HEIGHT),
                    self.wrap_px(),
                    &self.font,
                    WHITE,
                ),
            },
        };
        pm.ok_or_else(|| anyhow!("could not allocate pixmap for {stimulus:?}"))
    }

    fn fixation_cross(&self) -> Option<Pixmap> {
        let size = self.px(FIXATION_HEIGHT).round().max(4.0);
        let thickness = (size / 12.0).round().max(2.0);
        let mut pm = Pixmap::new(size as u32, size as u32)?;

        let mut paint = Paint::default();
        paint.anti_alias = false;
        paint.set_color(Color::WHITE);

        let h = Rect::from_xywh(0.0, (size - thickness) * 0.5, size, thickness)?;
        pm.fill_rect(h, &paint, Transform::identity(), None);
        let v = Rect::from_xywh((size - thickness) * 0.5, 0.0, thickness, size)?;
        pm.fill_rect(v, &paint, Transform::identity(), None);
        Some(pm)
    }

    fn clear_dirty(&mut self, dirty: &[Rect]) {
        let stride = self.width as usize * 4;
        let canvas_data = self.canvas.data_mut();

        for rect in dirty {
            let Some((x0, y0, x1, y1)) = clamp_rect(rect, self.width, self.height) else {
                continue;
            };
            let row_len = (x1 - x0) * 4;
            for y in y0..y1 {
                let off = y * stride + x0 * 4;
                canvas_data[off..off + row_len]
                    .copy_from_slice(&self.clear_buffer[off..off + row_len]);
            }
        }
    }

    fn copy_dirty_region(&self, dirty: &Rect, frame_buffer: &mut [u8]) {
        let Some((x0, y0, x1, y1)) = clamp_rect(dirty, self.width, self.height) else {
            return;
        };
        let bytes = (x1 - x0) * 4;
        let row_bytes = self.width as usize * 4;
        let canvas_data = self.canvas.data();

        for row in y0..y1 {
            let off = row * row_bytes + x0 * 4;
            frame_buffer[off..off + bytes].copy_from_slice(&canvas_data[off..off + bytes]);
        }
    }

    pub(crate) fn coalesce_dirty(rects: &mut Vec<Rect>) {
        rects.sort_by(|a, b| a.y().total_cmp(&b.y()).then(a.x().total_cmp(&b.x())));
        let mut out: Vec<Rect> = Vec::with_capacity(rects.len());
        for r in rects.drain(..) {
            if let Some(last) = out.last_mut() {
                let same_row =
                    (r.y() - last.y()).abs() < 1.0 && (r.height() - last.height()).abs() < 1.0;
                let touching = r.x() <= last.x() + last.width() + 1.0;
                if same_row && touching {
                    let nx = last.x().min(r.x());
                    let nx2 = (last.x() + last.width()).max(r.x() + r.width());
                    if let Some(merged) = Rect::from_xywh(nx, last.y(), nx2 - nx, last.height()) {
                        *last = merged;
                        continue;
                    }
                }
            }
            out.push(r);
        }
        *rects = out;
    }

    /// Replaces the previous frame's content with `stimulus` and copies the
    /// changed rectangles into `frame_buffer` (RGBA8, window sized).
    pub fn render_frame(
        &mut self,
        stimulus: &StimulusType,
        frame_buffer: &mut [u8],
        timer: &mut HighPrecisionTimer,
    ) -> Result<FrameStats> {
        let t_total = timer.now();
        if frame_buffer.len() != self.clear_buffer.len() {
            return Err(anyhow!(
                "frame buffer is {} bytes, expected {}",
                frame_buffer.len(),
                self.clear_buffer.len()
            ));
        }

        if self.first_frame {
            self.first_frame = false;
            self.canvas.fill(Color::BLACK);
            frame_buffer.copy_from_slice(&self.clear_buffer);
            self.dirty_regions.clear();
        }

        // Clear what the previous stimulus covered on the offscreen canvas
        let old_dirty = std::mem::take(&mut self.dirty_regions);
        let t_clear = {
            let t = timer.now();
            self.clear_dirty(&old_dirty);
            timer.elapsed(t)
        };

        let t_draw = {
            let t = timer.now();
            if let Some(pm) = self.cached(stimulus)? {
                if let Some(rect) = blit(&mut self.canvas, &pm, self.center) {
                    self.dirty_regions.push(rect);
                }
            }
            timer.elapsed(t)
        };

        let mut present_rects = old_dirty;
        present_rects.extend_from_slice(&self.dirty_regions);
        Self::coalesce_dirty(&mut present_rects);

        let t_copy = {
            let t = timer.now();
            for rect in &present_rects {
                self.copy_dirty_region(rect, frame_buffer);
            }
            timer.elapsed(t)
        };

        let total = timer.elapsed(t_total);
        for (key, d) in [("draw", t_draw), ("clear", t_clear), ("copy", t_copy)] {
            if let Some(t) = self.component_timers.get_mut(key) {
                t.record_frame(d);
            }
        }
        timer.record_frame(total);

        Ok(FrameStats {
            clear: t_clear,
            draw: t_draw,
            copy: t_copy,
            total,
            dirty_count: present_rects.len(),
        })
    }

    /// Per-stage rasterisation timings collected so far.
    pub fn component_stats(&self) -> Vec<(&'static str, CalibrationStats)> {
        let mut stats: Vec<_> = self
            .component_timers
            .iter()
            .map(|(k, t)| (*k, t.calibration_stats()))
            .collect();
        stats.sort_by_key(|(k, _)| *k);
        stats
    }
}

fn opaque_canvas(width: u32, height: u32) -> Result<Pixmap> {
    let mut canvas = Pixmap::new(width.max(1), height.max(1))
        .ok_or_else(|| anyhow!("cannot allocate a {width}x{height} canvas"))?;
    // Opaque once so the whole pipeline stays premultiplied + memcpy.
    canvas.fill(Color::BLACK);
    Ok(canvas)
}

fn clear_buffer(width: u32, height: u32) -> Vec<u8> {
    [0u8, 0, 0, 255]
        .into_iter()
        .cycle()
        .take(width.max(1) as usize * height.max(1) as usize * 4)
        .collect()
}

fn clamp_rect(rect: &Rect, width: u32, height: u32) -> Option<(usize, usize, usize, usize)> {
    let x0 = rect.x().floor().max(0.0).min(width as f32) as usize;
    let y0 = rect.y().floor().max(0.0).min(height as f32) as usize;
    let x1 = (rect.x() + rect.width()).ceil().min(width as f32) as usize;
    let y1 = (rect.y() + rect.height()).ceil().min(height as f32) as usize;
    (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
}

/// Blends `pm` centred on `pos` into `canvas`, returning the touched rectangle.
fn blit(canvas: &mut Pixmap, pm: &Pixmap, pos: (f32, f32)) -> Option<Rect> {
    let (w, h) = (pm.width() as usize, pm.height() as usize);
    let (cw, ch) = (canvas.width() as usize, canvas.height() as usize);

    let x = (pos.0 - w as f32 * 0.5).floor() as i32;
    let y = (pos.1 - h as f32 * 0.5).floor() as i32;

    // Cull fully off-screen
    if x + w as i32 <= 0 || y + h as i32 <= 0 || x >= cw as i32 || y >= ch as i32 {
        return None;
    }

    let dst_x = x.max(0) as usize;
    let dst_y = y.max(0) as usize;
    let src_x_offset = (-x).max(0) as usize;
    let src_y_offset = (-y).max(0) as usize;
    let copy_w = (w - src_x_offset).min(cw - dst_x);
    let copy_h = (h - src_y_offset).min(ch - dst_y);

    let src_u32: &[u32] = cast_slice(pm.data());
    let dst_u32: &mut [u32] = cast_slice_mut(canvas.data_mut());

    let fully_opaque = (0..copy_h).all(|row| {
        let start = (src_y_offset + row) * w + src_x_offset;
        src_u32[start..start + copy_w].iter().all(|&p| p >> 24 == 0xFF)
    });

    for row in 0..copy_h {
        let src_row = (src_y_offset + row) * w + src_x_offset;
        let dst_row = (dst_y + row) * cw + dst_x;

        if fully_opaque {
            dst_u32[dst_row..dst_row + copy_w].copy_from_slice(&src_u32[src_row..src_row + copy_w]);
            continue;
        }

        for i in 0..copy_w {
            let s = src_u32[src_row + i];
            let d = dst_u32[dst_row + i];
            let inv = 255 - (s >> 24);

            // Premultiplied over, per channel
            let mut out = 0u32;
            for shift in [0, 8, 16, 24] {
                let sc = (s >> shift) & 0xFF;
                let dc = (d >> shift) & 0xFF;
                out |= ((sc + (dc * inv + 127) / 255).min(255)) << shift;
            }
            dst_u32[dst_row + i] = out;
        }
    }

    Rect::from_xywh(dst_x as f32, dst_y as f32, copy_w as f32, copy_h as f32)
}
