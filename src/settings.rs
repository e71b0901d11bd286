use serde::{Deserialize, Serialize};

/// Free-text photography fields shown on a story.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhotoMetadata {
    pub camera_model: String,
    pub lens: String,
    pub aperture: String,
    pub film_stock: String,
    pub custom_settings: String,
}

impl Default for PhotoMetadata {
    /// Placeholder text a freshly ingested photo starts with.
    fn default() -> Self {
        Self {
            camera_model: "Camera Model".to_string(),
            lens: "Lens Model".to_string(),
            aperture: "f/2.8".to_string(),
            film_stock: "Film Stock".to_string(),
            custom_settings: "Custom Settings".to_string(),
        }
    }
}

impl PhotoMetadata {
    /// The single line drawn in the top-right corner: the first non-empty of
    /// aperture, film stock and custom settings.
    pub fn settings_line(&self) -> Option<&str> {
        [&self.aperture, &self.film_stock, &self.custom_settings]
            .into_iter()
            .map(String::as_str)
            .find(|s| !s.is_empty())
    }
}

/// Which overlays a story render includes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Toggles {
    pub show_camera_info: bool,
    pub show_settings: bool,
    pub show_color_palette: bool,
}

impl Default for Toggles {
    fn default() -> Self {
        Self {
            show_camera_info: true,
            show_settings: true,
            show_color_palette: true,
        }
    }
}

/// Everything one compositing call is parameterized by, besides the image
/// and its palette.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplaySettings {
    #[serde(flatten)]
    pub metadata: PhotoMetadata,
    #[serde(flatten)]
    pub toggles: Toggles,
}

/// Partial update applied to many photos at once.
///
/// Strings only overwrite when present and non-empty; toggles overwrite
/// whenever present.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub camera_model: Option<String>,
    pub lens: Option<String>,
    pub aperture: Option<String>,
    pub film_stock: Option<String>,
    pub custom_settings: Option<String>,
    pub show_camera_info: Option<bool>,
    pub show_settings: Option<bool>,
    pub show_color_palette: Option<bool>,
}

impl PhotoMetadata {
    pub fn apply(&mut self, patch: &SettingsPatch) {
        fn merge(field: &mut String, value: &Option<String>) {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                *field = v.to_string();
            }
        }
        merge(&mut self.camera_model, &patch.camera_model);
        merge(&mut self.lens, &patch.lens);
        merge(&mut self.aperture, &patch.aperture);
        merge(&mut self.film_stock, &patch.film_stock);
        merge(&mut self.custom_settings, &patch.custom_settings);
    }
}

impl Toggles {
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(v) = patch.show_camera_info {
            self.show_camera_info = v;
        }
        if let Some(v) = patch.show_settings {
            self.show_settings = v;
        }
        if let Some(v) = patch.show_color_palette {
            self.show_color_palette = v;
        }
    }
}

impl DisplaySettings {
    pub fn apply(&mut self, patch: &SettingsPatch) {
        self.metadata.apply(patch);
        self.toggles.apply(patch);
    }

    /// Take every present field as-is, empty strings included. Used when a
    /// single editor submits its full state rather than a bulk patch.
    pub fn overwrite(&mut self, patch: SettingsPatch) {
        self.toggles.apply(&patch);
        let SettingsPatch {
            camera_model,
            lens,
            aperture,
            film_stock,
            custom_settings,
            ..
        } = patch;
        let m = &mut self.metadata;
        for (field, value) in [
            (&mut m.camera_model, camera_model),
            (&mut m.lens, lens),
            (&mut m.aperture, aperture),
            (&mut m.film_stock, film_stock),
            (&mut m.custom_settings, custom_settings),
        ] {
            if let Some(v) = value {
                *field = v;
            }
        }
    }
}
