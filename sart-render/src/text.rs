use ab_glyph::{Font, Glyph, PxScale, ScaleFont, point};
use tiny_skia::{Pixmap, PixmapPaint, PremultipliedColorU8, Transform};

/// Rasterises one line of text into a pixmap cropped to the ink bounds.
///
/// Returns a 1x1 transparent pixmap when nothing has an outline (spaces only).
pub fn render_text_pixmap<F: Font>(
    text: &str,
    font_size: f32,
    font: &F,
    color: [u8; 4],
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    // Layout with baseline at ascent
    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let outlines: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for out in &outlines {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }

    if outlines.is_empty() {
        return Pixmap::new(1, 1);
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;

    // Pixmap::new starts transparent, which is what the blend below expects.
    let mut pm = Pixmap::new(w, h)?;
    let stride = w as usize;
    let dst = pm.pixels_mut();

    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x).floor() as i32;
            let iy = (y as f32 + b.min.y - min_y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            // Premultiply source by (coverage * alpha)
            let a_lin = (cov * color[3] as f32 / 255.0).clamp(0.0, 1.0);
            let sa = (a_lin * 255.0) as u8;
            let bg = dst[i];

            // Porter-Duff over in premultiplied space: out = src + bg * (1 - src.a)
            let inv = 1.0 - (sa as f32 / 255.0);
            let blended = PremultipliedColorU8::from_rgba(
                ((color[0] as f32 * a_lin) as u8).saturating_add((bg.red() as f32 * inv) as u8),
                ((color[1] as f32 * a_lin) as u8).saturating_add((bg.green() as f32 * inv) as u8),
                ((color[2] as f32 * a_lin) as u8).saturating_add((bg.blue() as f32 * inv) as u8),
                sa.saturating_add((bg.alpha() as f32 * inv) as u8),
            );
            if let Some(px) = blended {
                dst[i] = px;
            }
        });
    }

    Some(pm)
}

/// Pen advance of `line` at `font_size`, kerning included.
fn line_width<F: Font>(line: &str, font_size: f32, font: &F) -> f32 {
    let sf = font.as_scaled(PxScale::from(font_size));
    let mut width = 0.0;
    let mut prev = None;
    for ch in line.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = prev {
            width += sf.kern(prev, id);
        }
        width += sf.h_advance(id);
        prev = Some(id);
    }
    width
}

/// Greedy word wrap. Explicit line breaks are kept; a word wider than
/// `max_width` on its own still gets a line.
pub fn wrap_words(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{current} {word}");
            if measure(&candidate) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        lines.push(current);
    }
    lines
}

/// Rasterises text wrapped to `max_width` pixels, each line centred, lines
/// `1.3 × font_size` apart.
pub fn render_text_block<F: Font>(
    text: &str,
    font_size: f32,
    max_width: f32,
    font: &F,
    color: [u8; 4],
) -> Option<Pixmap> {
    let line_height = (font_size * 1.3).ceil();
    let lines: Vec<Option<Pixmap>> = wrap_words(text, max_width, |line| {
        line_width(line, font_size, font)
    })
    .iter()
    .map(|line| match line.as_str() {
        "" => Some(None),
        line => render_text_pixmap(line, font_size, font, color).map(Some),
    })
    .collect::<Option<_>>()?;

    let width = lines
        .iter()
        .flatten()
        .map(|p| p.width())
        .max()
        .unwrap_or(1);
    let height = (line_height * lines.len().max(1) as f32) as u32;
    let mut block = Pixmap::new(width, height)?;

    for (row, line) in lines.iter().enumerate() {
        let Some(line) = line else { continue };
        // Ink-cropped lines sit on the bottom of their slot, roughly on the baseline.
        let x = (width - line.width()) as i32 / 2;
        let y = (line_height * (row as f32 + 1.0)) as i32 - line.height() as i32;
        block.draw_pixmap(
            x,
            y.max(0),
            line.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }

    Some(block)
}
