//! The ordered set of uploaded photos and everything done to them as a group.

use std::fmt;
use std::time::Duration;

use image::DynamicImage;

use crate::color::Palette;
use crate::error::{StoryError, StoryResult};
use crate::export::story_file_name;
use crate::extract::extract_palette;
use crate::settings::{DisplaySettings, PhotoMetadata, SettingsPatch, Toggles};
use crate::story::{StoryCanvas, compose_story};

/// Opaque record key, random per ingestion.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PhotoId(String);

impl PhotoId {
    pub fn generate() -> StoryResult<Self> {
        let mut bytes = [0u8; 8];
        getrandom::fill(&mut bytes).map_err(|e| StoryError::Entropy(e.to_string()))?;
        Ok(Self(bytes.iter().map(|b| format!("{b:02x}")).collect()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PhotoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

type Release = Box<dyn FnOnce(&str)>;

/// A host-side preview resource (a browser object URL, say) that must be
/// released exactly once when its photo goes away.
pub struct PreviewHandle {
    url: String,
    release: Option<Release>,
}

impl PreviewHandle {
    pub fn new(url: impl Into<String>, release: impl FnOnce(&str) + 'static) -> Self {
        Self {
            url: url.into(),
            release: Some(Box::new(release)),
        }
    }

    /// A handle with nothing to release.
    pub fn detached() -> Self {
        Self {
            url: String::new(),
            release: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("url", &self.url)
            .field("live", &self.release.is_some())
            .finish()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            tracing::debug!(url = %self.url, "releasing preview");
            release(&self.url);
        }
    }
}

/// One uploaded photo.
#[derive(Debug)]
pub struct PhotoRecord {
    id: PhotoId,
    file_name: String,
    image: DynamicImage,
    preview: PreviewHandle,
    pub metadata: PhotoMetadata,
    palette: Palette,
}

impl PhotoRecord {
    pub fn id(&self) -> &PhotoId {
        &self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    /// Computed once at ingestion.
    pub fn palette(&self) -> &Palette {
        &self.palette
    }
}

#[derive(Debug)]
struct Entry {
    record: PhotoRecord,
    toggles: Toggles,
}

impl Entry {
    fn settings(&self) -> DisplaySettings {
        DisplaySettings {
            metadata: self.record.metadata.clone(),
            toggles: self.toggles,
        }
    }
}

/// Pacing for [`PhotoLibrary::export_all`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchPacing {
    /// Pause between two consecutive exports.
    pub delay: Duration,
}

impl Default for BatchPacing {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
        }
    }
}

/// A rendered story ready to be written somewhere.
#[derive(Clone, Debug)]
pub struct StoryExport {
    pub id: PhotoId,
    pub file_name: String,
    pub png: Vec<u8>,
}

/// Photos in upload order.
#[derive(Debug, Default)]
pub struct PhotoLibrary {
    entries: Vec<Entry>,
}

impl PhotoLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a decoded photo, extracting its palette.
    pub fn ingest(
        &mut self,
        file_name: impl Into<String>,
        image: DynamicImage,
        preview: PreviewHandle,
    ) -> StoryResult<PhotoId> {
        let id = PhotoId::generate()?;
        let file_name = file_name.into();
        let palette = extract_palette(&image);
        tracing::info!(%id, %file_name, w = image.width(), h = image.height(), "photo ingested");
        self.entries.push(Entry {
            record: PhotoRecord {
                id: id.clone(),
                file_name,
                image,
                preview,
                metadata: PhotoMetadata::default(),
                palette,
            },
            toggles: Toggles::default(),
        });
        Ok(id)
    }

    /// Decode `bytes` and ingest the result.
    pub fn ingest_bytes(
        &mut self,
        file_name: impl Into<String>,
        bytes: &[u8],
        preview: PreviewHandle,
    ) -> StoryResult<PhotoId> {
        let image = image::load_from_memory(bytes)?;
        self.ingest(file_name, image, preview)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhotoRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    pub fn ids(&self) -> Vec<PhotoId> {
        self.iter().map(|r| r.id.clone()).collect()
    }

    pub fn get(&self, id: &PhotoId) -> Option<&PhotoRecord> {
        self.entry(id).map(|e| &e.record)
    }

    pub fn display_settings(&self, id: &PhotoId) -> Option<DisplaySettings> {
        self.entry(id).map(Entry::settings)
    }

    /// Replace one photo's editable fields and toggles.
    pub fn update_settings(&mut self, id: &PhotoId, settings: DisplaySettings) -> StoryResult<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| &e.record.id == id)
            .ok_or_else(|| StoryError::UnknownPhoto(id.to_string()))?;
        entry.record.metadata = settings.metadata;
        entry.toggles = settings.toggles;
        Ok(())
    }

    /// Merge `patch` into every photo.
    pub fn apply_bulk(&mut self, patch: &SettingsPatch) {
        for entry in &mut self.entries {
            entry.record.metadata.apply(patch);
            entry.toggles.apply(patch);
        }
        tracing::info!(photos = self.entries.len(), "bulk settings applied");
    }

    /// Drop one photo, releasing its preview. Returns whether it existed.
    pub fn remove(&mut self, id: &PhotoId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.record.id != id);
        before != self.entries.len()
    }

    /// Drop every photo, releasing all previews.
    pub fn clear(&mut self) {
        tracing::info!(photos = self.entries.len(), "clearing library");
        self.entries.clear();
    }

    pub fn render(&self, id: &PhotoId) -> StoryResult<StoryCanvas> {
        let entry = self
            .entry(id)
            .ok_or_else(|| StoryError::UnknownPhoto(id.to_string()))?;
        Ok(render_entry(entry))
    }

    /// Render and hand every photo to `sink`, strictly one after another, in
    /// upload order, pausing `pacing.delay` between items. Stops at the first
    /// error. Returns the number of stories exported.
    #[cfg(not(target_arch = "wasm32"))]
    #[tracing::instrument(skip_all, fields(photos = self.entries.len()))]
    pub fn export_all<F>(&self, pacing: &BatchPacing, mut sink: F) -> StoryResult<usize>
    where
        F: FnMut(StoryExport) -> StoryResult<()>,
    {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 && !pacing.delay.is_zero() {
                std::thread::sleep(pacing.delay);
            }
            let png = render_entry(entry).to_png()?;
            tracing::debug!(id = %entry.record.id, bytes = png.len(), "story exported");
            sink(StoryExport {
                id: entry.record.id.clone(),
                file_name: story_file_name(&entry.record.file_name),
                png,
            })?;
        }
        Ok(self.entries.len())
    }

    fn entry(&self, id: &PhotoId) -> Option<&Entry> {
        self.entries.iter().find(|e| &e.record.id == id)
    }
}

fn render_entry(entry: &Entry) -> StoryCanvas {
    compose_story(
        &entry.record.image,
        entry.record.palette.colors(),
        &entry.settings(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Instant;

    fn photo(px: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(12, 9, Rgba(px)))
    }

    fn tracked(url: &str, log: &Rc<RefCell<Vec<String>>>) -> PreviewHandle {
        let log = Rc::clone(log);
        PreviewHandle::new(url, move |u: &str| log.borrow_mut().push(u.to_string()))
    }

    #[test]
    fn ids_are_unique() {
        let a = PhotoId::generate().unwrap();
        let b = PhotoId::generate().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 16);
    }

    #[test]
    fn ingest_sets_defaults_and_palette() {
        let mut lib = PhotoLibrary::new();
        let id = lib
            .ingest("a.jpg", photo([10, 20, 30, 255]), PreviewHandle::detached())
            .unwrap();
        let rec = lib.get(&id).unwrap();
        assert_eq!(rec.file_name(), "a.jpg");
        assert_eq!(rec.metadata, PhotoMetadata::default());
        assert_eq!(rec.palette().colors()[0].to_string(), "#0A141E");
        assert_eq!(lib.display_settings(&id).unwrap().toggles, Toggles::default());
    }

    #[test]
    fn insertion_order_is_kept() {
        let mut lib = PhotoLibrary::new();
        let ids: Vec<_> = ["1.png", "2.png", "3.png"]
            .iter()
            .map(|n| lib.ingest(*n, photo([0, 0, 0, 255]), PreviewHandle::detached()).unwrap())
            .collect();
        assert_eq!(lib.ids(), ids);
        let names: Vec<_> = lib.iter().map(PhotoRecord::file_name).collect();
        assert_eq!(names, ["1.png", "2.png", "3.png"]);
    }

    #[test]
    fn remove_releases_only_that_preview() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut lib = PhotoLibrary::new();
        let a = lib.ingest("a", photo([0; 4]), tracked("blob:a", &log)).unwrap();
        let _b = lib.ingest("b", photo([0; 4]), tracked("blob:b", &log)).unwrap();

        assert!(lib.remove(&a));
        assert_eq!(*log.borrow(), ["blob:a"]);
        assert!(!lib.remove(&a));
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(lib.len(), 1);
    }

    #[test]
    fn clear_releases_everything_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut lib = PhotoLibrary::new();
        lib.ingest("a", photo([0; 4]), tracked("blob:a", &log)).unwrap();
        lib.ingest("b", photo([0; 4]), tracked("blob:b", &log)).unwrap();
        lib.clear();
        assert!(lib.is_empty());
        assert_eq!(*log.borrow(), ["blob:a", "blob:b"]);
        drop(lib);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn bulk_apply_merges_into_every_photo() {
        let mut lib = PhotoLibrary::new();
        let a = lib.ingest("a", photo([0; 4]), PreviewHandle::detached()).unwrap();
        let b = lib.ingest("b", photo([0; 4]), PreviewHandle::detached()).unwrap();
        let mut custom = lib.display_settings(&b).unwrap();
        custom.metadata.lens = "Summicron 50".into();
        lib.update_settings(&b, custom).unwrap();

        lib.apply_bulk(&SettingsPatch {
            camera_model: Some("Nikon FM2".into()),
            lens: Some(String::new()),
            show_color_palette: Some(false),
            ..Default::default()
        });

        let sa = lib.display_settings(&a).unwrap();
        let sb = lib.display_settings(&b).unwrap();
        assert_eq!(sa.metadata.camera_model, "Nikon FM2");
        assert_eq!(sb.metadata.camera_model, "Nikon FM2");
        assert_eq!(sa.metadata.lens, "Lens Model");
        assert_eq!(sb.metadata.lens, "Summicron 50");
        assert!(!sa.toggles.show_color_palette);
        assert!(sb.toggles.show_camera_info);
    }

    #[test]
    fn unknown_ids_are_errors() {
        let mut lib = PhotoLibrary::new();
        let ghost = PhotoId::from("nope");
        assert!(matches!(lib.render(&ghost), Err(StoryError::UnknownPhoto(_))));
        assert!(lib.update_settings(&ghost, DisplaySettings::default()).is_err());
        assert!(lib.display_settings(&ghost).is_none());
    }

    #[test]
    fn export_all_is_sequential_and_paced() {
        let mut lib = PhotoLibrary::new();
        for n in ["x.jpg", "y.jpg", "z.jpg"] {
            lib.ingest(n, photo([200, 200, 0, 255]), PreviewHandle::detached())
                .unwrap();
        }
        let pacing = BatchPacing {
            delay: Duration::from_millis(20),
        };
        let mut names = Vec::new();
        let start = Instant::now();
        let count = lib
            .export_all(&pacing, |item| {
                assert!(item.png.starts_with(b"\x89PNG"));
                names.push(item.file_name);
                Ok(())
            })
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(40));
        assert_eq!(count, 3);
        assert_eq!(names, ["story-x.jpg", "story-y.jpg", "story-z.jpg"]);
    }

    #[test]
    fn export_all_stops_on_sink_error() {
        let mut lib = PhotoLibrary::new();
        for n in ["a", "b", "c"] {
            lib.ingest(n, photo([0; 4]), PreviewHandle::detached()).unwrap();
        }
        let pacing = BatchPacing {
            delay: Duration::ZERO,
        };
        let mut seen = 0;
        let res = lib.export_all(&pacing, |_| {
            seen += 1;
            if seen == 2 {
                Err(StoryError::export("disk full"))
            } else {
                Ok(())
            }
        });
        assert!(res.is_err());
        assert_eq!(seen, 2);
    }
}
