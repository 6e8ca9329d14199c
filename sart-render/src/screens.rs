//! Full-screen pages. A page is a caller-supplied image when one was loaded,
//! otherwise a block of text.

use sart_core::{Digit, Screen};
use tiny_skia::{ColorU8, FilterQuality, Pixmap, PixmapPaint, Transform};

/// Text drawn when no image was supplied for `screen`.
pub fn fallback_text(screen: Screen, target: Digit) -> String {
    match screen {
        Screen::Instructions => format!(
            "Digits from 0 to 9 will appear one at a time.\n\
             \n\
             Press SPACE as quickly as you can for every digit,\n\
             except {target}. When you see {target}, do NOT press anything.\n\
             \n\
             Press SPACE to start the practice."
        ),
        Screen::PracticeComplete => format!(
            "Practice complete!\n\
             \n\
             Reminder:\n\
             If the digit is {target}, do NOT press anything\n\
             Otherwise, press SPACE\n\
             \n\
             Press SPACE to start the test."
        ),
        Screen::AttentionProbe => "Where was your attention just before this screen?\n\
             \n\
             1 = completely on the task\n\
             6 = completely off the task\n\
             \n\
             Press a key from 1 to 6."
            .to_string(),
        Screen::AwarenessProbe => "Were you aware of where your attention was?\n\
             \n\
             1 = completely unaware\n\
             6 = completely aware\n\
             \n\
             Press a key from 1 to 6."
            .to_string(),
        Screen::Continue => "Press SPACE to continue the task.".to_string(),
        Screen::Debrief => "Thank you!\n\
             \n\
             The test is now complete.\n\
             \n\
             Press SPACE to exit."
            .to_string(),
    }
}

/// Builds a premultiplied pixmap from straight RGBA8 pixels.
pub fn pixmap_from_rgba(width: u32, height: u32, rgba: &[u8]) -> Option<Pixmap> {
    if rgba.len() != width as usize * height as usize * 4 {
        return None;
    }
    let mut pm = Pixmap::new(width, height)?;
    for (dst, px) in pm.pixels_mut().iter_mut().zip(rgba.chunks_exact(4)) {
        *dst = ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
    }
    Some(pm)
}

/// Stretches `src` over a `width`×`height` pixmap, like a page image that
/// fills the whole window.
pub fn stretch_to(src: &Pixmap, width: u32, height: u32) -> Option<Pixmap> {
    let mut dst = Pixmap::new(width, height)?;
    let sx = width as f32 / src.width() as f32;
    let sy = height as f32 / src.height() as f32;
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    dst.draw_pixmap(0, 0, src.as_ref(), &paint, Transform::from_scale(sx, sy), None);
    Some(dst)
}
