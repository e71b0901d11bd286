use image::{DynamicImage, imageops, imageops::FilterType};
use palette::{Hsl, IntoColor, Srgb};

use crate::color::{HexColor, PALETTE_LEN, Palette};

/// Larger images are downscaled to at most this many pixels before clustering.
pub const SAMPLE_PIXELS: u64 = 10_000;
/// Samples with alpha at or below this value are ignored.
pub const MIN_ALPHA: u8 = 250;

/// Normalized RGB distance under which two colors merge.
pub const COLOR_DISTANCE: f32 = 0.22;
pub const SATURATION_DISTANCE: f32 = 0.2;
pub const LIGHTNESS_DISTANCE: f32 = 0.2;
pub const HUE_DISTANCE: f32 = 1.0 / 12.0;

// 4 bits per channel for the first grouping pass.
const BUCKET_SHIFT: u8 = 4;
const BUCKET_COUNT: usize = 1 << (3 * (8 - BUCKET_SHIFT));

/// Extract five representative colors from `img`, most dominant first.
///
/// Images without enough distinct opaque colors are padded from
/// [`Palette::fallback`], so the result always has five entries.
pub fn extract_palette(img: &DynamicImage) -> Palette {
    Palette::padded(dominant_colors(img))
}

/// Decode `input` and extract its palette. Undecodable input is logged and
/// answered with the fallback palette; no error reaches the caller.
pub fn extract_palette_bytes(input: &[u8]) -> Palette {
    match image::load_from_memory(input) {
        Ok(img) => extract_palette(&img),
        Err(e) => {
            tracing::warn!(%e, "unable to decode image for palette, using fallback");
            Palette::fallback()
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Bucket {
    sum: [u64; 3],
    count: u32,
}

#[derive(Clone, Copy, Debug)]
struct Cluster {
    rgb: Srgb<u8>,
    hsl: Hsl,
    count: u32,
}

impl Cluster {
    fn new(rgb: Srgb<u8>, count: u32) -> Self {
        let hsl: Hsl = rgb.into_format::<f32>().into_color();
        Self { rgb, hsl, count }
    }

    fn is_similar(&self, other: &Cluster) -> bool {
        rgb_distance(self.rgb, other.rgb) < COLOR_DISTANCE
            || (hue_distance(&self.hsl, &other.hsl) < HUE_DISTANCE
                && (self.hsl.saturation - other.hsl.saturation).abs() < SATURATION_DISTANCE
                && (self.hsl.lightness - other.hsl.lightness).abs() < LIGHTNESS_DISTANCE)
    }
}

/// Clustered colors ordered by population, at most [`PALETTE_LEN`] of them.
fn dominant_colors(img: &DynamicImage) -> Vec<HexColor> {
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    let total = u64::from(w) * u64::from(h);

    // Nearest-neighbour keeps source colors intact, no blended in-betweens.
    let rgba = if total > SAMPLE_PIXELS {
        let ratio = (SAMPLE_PIXELS as f64 / total as f64).sqrt();
        let sw = ((w as f64) * ratio).floor().max(1.0) as u32;
        let sh = ((h as f64) * ratio).floor().max(1.0) as u32;
        imageops::resize(&rgba, sw, sh, FilterType::Nearest)
    } else {
        rgba
    };

    // --------------------------------------------------------
    // First pass: coarse buckets over the opaque samples
    // --------------------------------------------------------
    let mut buckets = vec![Bucket::default(); BUCKET_COUNT];
    let mut sampled = 0usize;
    for px in rgba.pixels() {
        let [r, g, b, a] = px.0;
        if a <= MIN_ALPHA {
            continue;
        }
        let key = ((r >> BUCKET_SHIFT) as usize) << 8
            | ((g >> BUCKET_SHIFT) as usize) << 4
            | (b >> BUCKET_SHIFT) as usize;
        let bucket = &mut buckets[key];
        bucket.sum[0] += u64::from(r);
        bucket.sum[1] += u64::from(g);
        bucket.sum[2] += u64::from(b);
        bucket.count += 1;
        sampled += 1;
    }

    let mut seeds: Vec<(usize, Cluster)> = buckets
        .iter()
        .enumerate()
        .filter(|(_, b)| b.count > 0)
        .map(|(key, b)| {
            let n = u64::from(b.count);
            let mean = |i: usize| ((b.sum[i] + n / 2) / n) as u8;
            (key, Cluster::new(Srgb::new(mean(0), mean(1), mean(2)), b.count))
        })
        .collect();
    seeds.sort_by(|(ka, a), (kb, b)| b.count.cmp(&a.count).then(ka.cmp(kb)));

    // --------------------------------------------------------
    // Second pass: greedy merge into the most populated match
    // --------------------------------------------------------
    let mut clusters: Vec<Cluster> = Vec::new();
    for (_, seed) in seeds {
        match clusters.iter_mut().find(|c| c.is_similar(&seed)) {
            Some(c) => c.count += seed.count,
            None => clusters.push(seed),
        }
    }
    // Stable sort keeps discovery order among equal populations.
    clusters.sort_by(|a, b| b.count.cmp(&a.count));

    tracing::debug!(
        sampled,
        w = rgba.width(),
        h = rgba.height(),
        clusters = clusters.len(),
        "palette clusters"
    );

    clusters
        .into_iter()
        .take(PALETTE_LEN)
        .map(|c| HexColor::from(c.rgb))
        .collect()
}

/// Euclidean RGB distance scaled so black to white is 1.0.
fn rgb_distance(a: Srgb<u8>, b: Srgb<u8>) -> f32 {
    let d = |x: u8, y: u8| (f32::from(x) - f32::from(y)) / 255.0;
    let (dr, dg, db) = (d(a.red, b.red), d(a.green, b.green), d(a.blue, b.blue));
    ((dr * dr + dg * dg + db * db) / 3.0).sqrt()
}

/// Circular hue distance as a fraction of the full turn.
fn hue_distance(a: &Hsl, b: &Hsl) -> f32 {
    let ha = a.hue.into_positive_degrees() / 360.0;
    let hb = b.hue.into_positive_degrees() / 360.0;
    let d = (ha - hb).abs();
    d.min(1.0 - d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn solid(w: u32, h: u32, px: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(px)))
    }

    /// Vertical stripes, one per color, each as wide as its count.
    fn stripes(h: u32, colors: &[([u8; 3], u32)]) -> DynamicImage {
        let w: u32 = colors.iter().map(|(_, n)| n).sum();
        let mut img = RgbaImage::new(w, h);
        let mut x0 = 0;
        for (rgb, n) in colors {
            for x in x0..x0 + n {
                for y in 0..h {
                    img.put_pixel(x, y, Rgba([rgb[0], rgb[1], rgb[2], 255]));
                }
            }
            x0 += n;
        }
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn monochrome_image_is_padded_from_index_one() {
        let p = extract_palette(&solid(40, 40, [200, 30, 30, 255]));
        assert_eq!(
            p.to_hex(),
            ["#C81E1E", "#333333", "#666666", "#999999", "#CCCCCC"]
        );
    }

    #[test]
    fn fully_transparent_image_yields_fallback() {
        let p = extract_palette(&solid(16, 16, [255, 0, 0, 250]));
        assert_eq!(p, Palette::fallback());
    }

    #[test]
    fn alpha_just_above_threshold_is_kept() {
        let p = extract_palette(&solid(10, 10, [1, 2, 3, 251]));
        assert_eq!(
            p.to_hex(),
            ["#010203", "#333333", "#666666", "#999999", "#CCCCCC"]
        );
    }

    #[test]
    fn empty_image_yields_fallback() {
        let p = extract_palette(&DynamicImage::ImageRgba8(RgbaImage::new(0, 0)));
        assert_eq!(p, Palette::fallback());
    }

    #[test]
    fn undecodable_bytes_yield_fallback() {
        assert_eq!(extract_palette_bytes(b"not an image"), Palette::fallback());
    }

    #[test]
    fn colors_ordered_by_population() {
        let img = stripes(
            10,
            &[([0, 0, 255], 10), ([255, 0, 0], 40), ([0, 200, 0], 20)],
        );
        let p = extract_palette(&img);
        assert_eq!(
            p.to_hex(),
            ["#FF0000", "#00C800", "#0000FF", "#999999", "#CCCCCC"]
        );
    }

    #[test]
    fn near_identical_shades_merge() {
        let img = stripes(10, &[([250, 250, 250], 30), ([235, 235, 235], 10)]);
        let p = extract_palette(&img);
        assert_eq!(p.colors()[0].to_string(), "#FAFAFA");
        assert_eq!(p.colors()[1].to_string(), "#333333");
    }

    #[test]
    fn never_more_than_five() {
        let img = stripes(
            4,
            &[
                ([255, 0, 0], 7),
                ([0, 255, 0], 6),
                ([0, 0, 255], 5),
                ([255, 255, 0], 4),
                ([0, 0, 0], 3),
                ([255, 255, 255], 2),
            ],
        );
        let p = extract_palette(&img);
        assert_eq!(
            p.to_hex(),
            ["#FF0000", "#00FF00", "#0000FF", "#FFFF00", "#000000"]
        );
    }

    #[test]
    fn large_images_are_subsampled() {
        let p = extract_palette(&solid(400, 300, [10, 120, 200, 255]));
        assert_eq!(p.colors()[0], HexColor::new(10, 120, 200));
    }

    #[test]
    fn downsampling_covers_every_column_pattern() {
        // 1px alternating columns; a row-major stride would see one color only.
        let mut img = RgbaImage::new(200, 100);
        for (x, _, p) in img.enumerate_pixels_mut() {
            *p = if x % 2 == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            };
        }
        let hex = extract_palette(&DynamicImage::ImageRgba8(img)).to_hex();
        assert!(hex[..2].contains(&"#FF0000".to_string()));
        assert!(hex[..2].contains(&"#0000FF".to_string()));
        assert_eq!(&hex[2..], ["#666666", "#999999", "#CCCCCC"]);
    }

    #[test]
    fn hue_distance_wraps() {
        let a: Hsl = Srgb::new(1.0f32, 0.0, 0.05).into_color();
        let b: Hsl = Srgb::new(1.0f32, 0.05, 0.0).into_color();
        assert!(hue_distance(&a, &b) < 0.05);
    }
}
