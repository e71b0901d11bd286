use image::{DynamicImage, GenericImageView, Rgba, RgbaImage, imageops, imageops::FilterType};

use crate::color::{HexColor, PALETTE_LEN};
use crate::settings::DisplaySettings;
use crate::text::{MonoFont, fill_rect};

pub const STORY_WIDTH: u32 = 1080;
pub const STORY_HEIGHT: u32 = 1920;
pub const MARGIN: f64 = 15.0;
/// Vertical room kept free for the palette strip.
pub const PALETTE_HEADROOM: f64 = 80.0;
pub const SWATCH_SIZE: f64 = 80.0;
pub const FONT_SIZE: f64 = 50.0;

const CAMERA_TEXT_OFFSET: f64 = 70.0;
const SETTINGS_TEXT_OFFSET: f64 = 40.0;
const PALETTE_GAP: f64 = 40.0;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A line of text anchored at its left edge on an alphabetic baseline.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f64,
    pub baseline: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Swatch {
    pub rect: Rect,
    pub color: HexColor,
}

/// Every placement decision of a story, independent of pixel data.
#[derive(Clone, Debug, PartialEq)]
pub struct StoryLayout {
    pub image: Rect,
    pub camera: Option<TextRun>,
    pub lens: Option<TextRun>,
    pub settings: Option<TextRun>,
    pub swatches: Vec<Swatch>,
}

impl StoryLayout {
    pub fn compute(
        image_width: u32,
        image_height: u32,
        settings: &DisplaySettings,
        palette: &[HexColor],
    ) -> Self {
        let canvas_w = STORY_WIDTH as f64;
        let available_w = canvas_w;
        let available_h = STORY_HEIGHT as f64 - MARGIN * 2.0 - PALETTE_HEADROOM;

        let image_aspect = image_width as f64 / image_height as f64;
        let available_aspect = available_w / available_h;

        // Strict: an exact aspect match takes the tall branch.
        let image = if image_aspect > available_aspect {
            let height = available_w / image_aspect;
            Rect {
                x: 0.0,
                y: MARGIN + (available_h - height) / 2.0,
                width: available_w,
                height,
            }
        } else {
            let width = available_h * image_aspect;
            Rect {
                x: (canvas_w - width) / 2.0,
                y: MARGIN,
                width,
                height: available_h,
            }
        };

        let font = MonoFont::new(FONT_SIZE);
        let meta = &settings.metadata;
        let toggles = &settings.toggles;

        let (camera, lens) = if toggles.show_camera_info {
            let baseline = image.y - CAMERA_TEXT_OFFSET;
            (
                Some(TextRun {
                    text: meta.camera_model.clone(),
                    x: MARGIN,
                    baseline,
                }),
                Some(TextRun {
                    text: meta.lens.clone(),
                    x: MARGIN,
                    baseline: baseline + FONT_SIZE,
                }),
            )
        } else {
            (None, None)
        };

        let settings_run = toggles
            .show_settings
            .then(|| meta.settings_line())
            .flatten()
            .map(|text| TextRun {
                text: text.to_string(),
                x: canvas_w - MARGIN - font.measure(text),
                baseline: image.y - SETTINGS_TEXT_OFFSET,
            });

        let swatches = if toggles.show_color_palette {
            let strip_x = (canvas_w - PALETTE_LEN as f64 * SWATCH_SIZE) / 2.0;
            let strip_y = image.y + image.height + PALETTE_GAP;
            palette
                .iter()
                .take(PALETTE_LEN)
                .enumerate()
                .map(|(i, &color)| Swatch {
                    rect: Rect {
                        x: strip_x + i as f64 * SWATCH_SIZE,
                        y: strip_y,
                        width: SWATCH_SIZE,
                        height: SWATCH_SIZE,
                    },
                    color,
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            image,
            camera,
            lens,
            settings: settings_run,
            swatches,
        }
    }

    fn text_runs(&self) -> impl Iterator<Item = &TextRun> {
        [&self.camera, &self.lens, &self.settings]
            .into_iter()
            .flatten()
    }
}

/// A rendered 1080×1920 story and the layout it was drawn from.
#[derive(Clone, Debug)]
pub struct StoryCanvas {
    pub layout: StoryLayout,
    pub image: RgbaImage,
}

/// Render `img` into a fresh story canvas.
///
/// The caller guarantees a decoded image with non-zero dimensions.
#[tracing::instrument(skip_all, fields(w = img.width(), h = img.height()))]
pub fn compose_story(
    img: &DynamicImage,
    palette: &[HexColor],
    settings: &DisplaySettings,
) -> StoryCanvas {
    let (w, h) = img.dimensions();
    let layout = StoryLayout::compute(w, h, settings, palette);
    tracing::debug!(image = ?layout.image, swatches = layout.swatches.len(), "story layout");

    let mut canvas = RgbaImage::from_pixel(STORY_WIDTH, STORY_HEIGHT, BACKGROUND);

    let r = layout.image;
    let draw_w = r.width.round().max(1.0) as u32;
    let draw_h = r.height.round().max(1.0) as u32;
    let scaled = imageops::resize(img, draw_w, draw_h, FilterType::Triangle);
    imageops::overlay(&mut canvas, &scaled, r.x.round() as i64, r.y.round() as i64);

    let font = MonoFont::new(FONT_SIZE);
    for run in layout.text_runs() {
        font.draw(&mut canvas, &run.text, run.x, run.baseline, INK);
    }

    for swatch in &layout.swatches {
        let Rect { x, y, width, height } = swatch.rect;
        fill_rect(&mut canvas, x, y, width, height, Rgba(swatch.color.rgba()));
    }

    StoryCanvas {
        layout,
        image: canvas,
    }
}
