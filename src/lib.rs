use js_sys::{Array, Function, Object, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;

pub mod color;
pub mod error;
pub mod export;
pub mod extract;
pub mod library;
pub mod settings;
pub mod story;
pub mod text;

pub use color::{FALLBACK_HEX, HexColor, PALETTE_LEN, Palette};
pub use error::{StoryError, StoryResult};
pub use export::story_file_name;
pub use extract::{extract_palette, extract_palette_bytes};
pub use library::{BatchPacing, PhotoId, PhotoLibrary, PhotoRecord, PreviewHandle, StoryExport};
pub use settings::{DisplaySettings, PhotoMetadata, SettingsPatch, Toggles};
pub use story::{STORY_HEIGHT, STORY_WIDTH, StoryCanvas, StoryLayout, compose_story};

// ------------------------------------------------------------
// JS conversion helpers
// ------------------------------------------------------------

fn js_err(e: StoryError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn hex_array(palette: &Palette) -> Array {
    let out = Array::new();
    for hex in palette.to_hex() {
        out.push(&JsValue::from_str(&hex));
    }
    out
}

fn read_string(obj: &Object, key: &str) -> Result<Option<String>, JsValue> {
    let v = Reflect::get(obj, &JsValue::from_str(key))?;
    if v.is_undefined() || v.is_null() {
        return Ok(None);
    }
    v.as_string()
        .map(Some)
        .ok_or_else(|| JsValue::from_str(&format!("{key} must be a string")))
}

fn read_bool(obj: &Object, key: &str) -> Result<Option<bool>, JsValue> {
    let v = Reflect::get(obj, &JsValue::from_str(key))?;
    if v.is_undefined() || v.is_null() {
        return Ok(None);
    }
    v.as_bool()
        .map(Some)
        .ok_or_else(|| JsValue::from_str(&format!("{key} must be a boolean")))
}

/// Read a `{ cameraModel, lens, ..., showColorPalette }` object. Missing keys
/// stay `None`.
fn read_patch(obj: &Object) -> Result<SettingsPatch, JsValue> {
    Ok(SettingsPatch {
        camera_model: read_string(obj, "cameraModel")?,
        lens: read_string(obj, "lens")?,
        aperture: read_string(obj, "aperture")?,
        film_stock: read_string(obj, "filmStock")?,
        custom_settings: read_string(obj, "customSettings")?,
        show_camera_info: read_bool(obj, "showCameraInfo")?,
        show_settings: read_bool(obj, "showSettings")?,
        show_color_palette: read_bool(obj, "showColorPalette")?,
    })
}

/// Full settings object: every present key is taken as-is, empty strings
/// included, unlike a bulk patch.
fn read_settings(obj: &Object, base: DisplaySettings) -> Result<DisplaySettings, JsValue> {
    let mut s = base;
    s.overwrite(read_patch(obj)?);
    Ok(s)
}

fn read_palette(palette: &Array) -> Result<Vec<HexColor>, JsValue> {
    palette
        .iter()
        .map(|val| {
            let s = val
                .as_string()
                .ok_or_else(|| JsValue::from_str("Palette values must be strings"))?;
            s.parse::<HexColor>().map_err(js_err)
        })
        .collect()
}

fn png_array(story: &StoryCanvas) -> Result<Uint8Array, JsValue> {
    let png = story.to_png().map_err(js_err)?;
    Ok(Uint8Array::from(png.as_slice()))
}

// ------------------------------------------------------------
// Stateless entry points
// ------------------------------------------------------------

/// Five `#RRGGBB` strings describing the encoded image in `input`.
///
/// Never throws; undecodable input yields the neutral fallback ramp.
#[wasm_bindgen(js_name = extractPalette)]
pub fn extract_palette_js(input: Vec<u8>) -> Array {
    hex_array(&extract_palette_bytes(&input))
}

/// Render a 1080×1920 story PNG from the encoded image in `input`.
///
/// `palette` is an array of hex strings (at most five are drawn) and
/// `settings` a plain object with the editor fields; absent keys take the
/// ingestion defaults.
#[wasm_bindgen(js_name = composeStory)]
pub fn compose_story_js(input: Vec<u8>, palette: Array, settings: Object) -> Result<Uint8Array, JsValue> {
    let img = image::load_from_memory(&input)
        .map_err(|e| JsValue::from_str(&format!("Unable to decode image: {e}")))?;
    let colors = read_palette(&palette)?;
    let settings = read_settings(&settings, DisplaySettings::default())?;
    png_array(&compose_story(&img, &colors, &settings))
}

// ------------------------------------------------------------
// Stateful session
// ------------------------------------------------------------

/// The uploaded photos of one page session.
#[wasm_bindgen]
#[derive(Default)]
pub struct StoryStudio {
    library: PhotoLibrary,
}

#[wasm_bindgen]
impl StoryStudio {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    #[wasm_bindgen(getter)]
    pub fn length(&self) -> usize {
        self.library.len()
    }

    /// Ingest an encoded image. `revoke`, when given, is called with
    /// `previewUrl` once the photo is removed or the studio cleared.
    #[wasm_bindgen(js_name = addPhoto)]
    pub fn add_photo(
        &mut self,
        file_name: String,
        input: Vec<u8>,
        preview_url: String,
        revoke: Option<Function>,
    ) -> Result<String, JsValue> {
        let preview = match revoke {
            Some(f) => PreviewHandle::new(preview_url, move |url: &str| {
                if let Err(e) = f.call1(&JsValue::NULL, &JsValue::from_str(url)) {
                    tracing::warn!(?e, "preview release callback failed");
                }
            }),
            None => PreviewHandle::detached(),
        };
        let id = self
            .library
            .ingest_bytes(file_name, &input, preview)
            .map_err(js_err)?;
        Ok(id.to_string())
    }

    pub fn ids(&self) -> Array {
        self.library
            .iter()
            .map(|r| JsValue::from_str(r.id().as_str()))
            .collect()
    }

    pub fn palette(&self, id: &str) -> Result<Array, JsValue> {
        let rec = self
            .library
            .get(&PhotoId::from(id))
            .ok_or_else(|| js_err(StoryError::UnknownPhoto(id.to_string())))?;
        Ok(hex_array(rec.palette()))
    }

    /// Current editor fields and toggles of one photo.
    pub fn settings(&self, id: &str) -> Result<Object, JsValue> {
        let s = self
            .library
            .display_settings(&PhotoId::from(id))
            .ok_or_else(|| js_err(StoryError::UnknownPhoto(id.to_string())))?;
        let obj = Object::new();
        let m = &s.metadata;
        for (key, value) in [
            ("cameraModel", &m.camera_model),
            ("lens", &m.lens),
            ("aperture", &m.aperture),
            ("filmStock", &m.film_stock),
            ("customSettings", &m.custom_settings),
        ] {
            Reflect::set(&obj, &JsValue::from_str(key), &JsValue::from_str(value))?;
        }
        let t = &s.toggles;
        for (key, value) in [
            ("showCameraInfo", t.show_camera_info),
            ("showSettings", t.show_settings),
            ("showColorPalette", t.show_color_palette),
        ] {
            Reflect::set(&obj, &JsValue::from_str(key), &JsValue::from_bool(value))?;
        }
        Ok(obj)
    }

    #[wasm_bindgen(js_name = updateSettings)]
    pub fn update_settings(&mut self, id: &str, settings: Object) -> Result<(), JsValue> {
        let id = PhotoId::from(id);
        let base = self
            .library
            .display_settings(&id)
            .ok_or_else(|| js_err(StoryError::UnknownPhoto(id.to_string())))?;
        let next = read_settings(&settings, base)?;
        self.library.update_settings(&id, next).map_err(js_err)
    }

    /// Merge a partial settings object into every photo; empty strings are
    /// ignored.
    #[wasm_bindgen(js_name = applyBulk)]
    pub fn apply_bulk(&mut self, patch: Object) -> Result<(), JsValue> {
        let patch = read_patch(&patch)?;
        self.library.apply_bulk(&patch);
        Ok(())
    }

    /// Render one photo's story as PNG bytes.
    pub fn render(&self, id: &str) -> Result<Uint8Array, JsValue> {
        let story = self.library.render(&PhotoId::from(id)).map_err(js_err)?;
        png_array(&story)
    }

    /// `story-<original name>` for one photo.
    #[wasm_bindgen(js_name = exportName)]
    pub fn export_name(&self, id: &str) -> Result<String, JsValue> {
        self.library
            .get(&PhotoId::from(id))
            .map(|r| story_file_name(r.file_name()))
            .ok_or_else(|| js_err(StoryError::UnknownPhoto(id.to_string())))
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.library.remove(&PhotoId::from(id))
    }

    pub fn clear(&mut self) {
        self.library.clear();
    }
}
