use std::io::Cursor;

use image::{ImageFormat, RgbaImage, imageops, imageops::FilterType};

use crate::error::StoryResult;
use crate::story::{STORY_HEIGHT, STORY_WIDTH, StoryCanvas};

/// Download name for a story rendered from `original`.
pub fn story_file_name(original: &str) -> String {
    format!("story-{original}")
}

impl StoryCanvas {
    /// PNG-encode the canvas.
    pub fn to_png(&self) -> StoryResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        Ok(buf)
    }

    /// Scale the story uniformly so it fits inside `max_w × max_h`.
    pub fn thumbnail(&self, max_w: u32, max_h: u32) -> RgbaImage {
        let scale = (max_w as f64 / STORY_WIDTH as f64).min(max_h as f64 / STORY_HEIGHT as f64);
        let w = (STORY_WIDTH as f64 * scale).round().max(1.0) as u32;
        let h = (STORY_HEIGHT as f64 * scale).round().max(1.0) as u32;
        imageops::resize(&self.image, w, h, FilterType::Triangle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DisplaySettings;
    use crate::story::compose_story;
    use image::{DynamicImage, Rgba};

    fn story() -> StoryCanvas {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 128, 0, 255])));
        compose_story(&img, &[], &DisplaySettings::default())
    }

    #[test]
    fn file_name_is_prefixed() {
        assert_eq!(story_file_name("IMG_0001.jpg"), "story-IMG_0001.jpg");
    }

    #[test]
    fn png_decodes_back_to_story_size() {
        let png = story().to_png().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let back = image::load_from_memory(&png).unwrap();
        assert_eq!((back.width(), back.height()), (STORY_WIDTH, STORY_HEIGHT));
    }

    #[test]
    fn thumbnail_keeps_nine_by_sixteen() {
        let t = story().thumbnail(270, 1000);
        assert_eq!(t.dimensions(), (270, 480));
        let t = story().thumbnail(1000, 192);
        assert_eq!(t.dimensions(), (108, 192));
    }
}
