//! Display surface
//!
//! The runtime hands complete [`Frame`]s to a [`DisplaySurface`]. The
//! fullscreen flag belongs to the surface alone; toggling it never touches
//! navigation.
//!
//! [`SnapshotSurface`] is the stock surface: it writes the current view as
//! `view.json` and the letterboxed canvas as `frame.png` into an output
//! directory, replacing both atomically on every frame. A viewer (or a
//! kiosk script) watches that directory.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::ImageFormat;
use serde::Serialize;
use tracing::debug;

use crate::error::SurfaceError;
use crate::input::LinkStatus;
use crate::render::{RenderSize, SlideImage};

/// One row of the deck listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingRow {
    pub name: String,
    pub flagged: bool,
}

/// What the surface shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scene {
    Listing {
        rows: Vec<ListingRow>,
        cursor: usize,
    },
    Slide {
        image: Arc<SlideImage>,
        index: usize,
        count: usize,
    },
    /// Stand-in for a slide that could not be converted
    Placeholder {
        index: usize,
        count: usize,
        message: String,
    },
}

/// Scene plus status bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub scene: Scene,
    pub status: String,
    pub link: LinkStatus,
}

pub trait DisplaySurface {
    fn present(&mut self, frame: &Frame) -> Result<(), SurfaceError>;

    /// Flip fullscreen; returns the new value
    fn toggle_fullscreen(&mut self) -> bool;

    fn is_fullscreen(&self) -> bool;
}

/// Placement of a scaled image inside a canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Scale `image` to fit `canvas` keeping its aspect ratio, centered
pub fn fit_centered(image: (u32, u32), canvas: RenderSize) -> Placement {
    let (iw, ih) = (u64::from(image.0.max(1)), u64::from(image.1.max(1)));
    let (cw, ch) = (u64::from(canvas.width), u64::from(canvas.height));

    // Compare cw/iw with ch/ih without floats
    let (width, height) = if cw * ih <= ch * iw {
        (cw, (ih * cw / iw).max(1))
    } else {
        ((iw * ch / ih).max(1), ch)
    };

    Placement {
        x: ((cw - width) / 2) as u32,
        y: ((ch - height) / 2) as u32,
        width: width as u32,
        height: height as u32,
    }
}

const BACKGROUND: [u8; 3] = [0, 0, 0];
const PLACEHOLDER: [u8; 3] = [48, 48, 48];

/// Compose a scene onto a canvas of `size`
pub fn compose(scene: &Scene, size: RenderSize) -> SlideImage {
    match scene {
        Scene::Slide { image, .. } => letterbox(image, size),
        Scene::Placeholder { .. } => SlideImage::filled(size.width, size.height, PLACEHOLDER),
        Scene::Listing { .. } => SlideImage::filled(size.width, size.height, BACKGROUND),
    }
}

/// Lanczos scale into a black canvas
fn letterbox(image: &SlideImage, size: RenderSize) -> SlideImage {
    let mut canvas = SlideImage::filled(size.width, size.height, BACKGROUND).into_rgb();
    if image.width() == 0 || image.height() == 0 {
        return canvas.into();
    }

    let place = fit_centered((image.width(), image.height()), size);
    let scaled = imageops::resize(
        image.as_rgb(),
        place.width,
        place.height,
        FilterType::Lanczos3,
    );
    imageops::overlay(&mut canvas, &scaled, i64::from(place.x), i64::from(place.y));
    canvas.into()
}

#[derive(Serialize)]
struct View<'a> {
    fullscreen: bool,
    status: &'a str,
    link: &'static str,
    #[serde(flatten)]
    scene: SceneView<'a>,
}

#[derive(Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
enum SceneView<'a> {
    Listing {
        decks: &'a [ListingRow],
        cursor: usize,
    },
    Slide {
        slide: usize,
        count: usize,
    },
    Placeholder {
        slide: usize,
        count: usize,
        message: &'a str,
    },
}

impl<'a> From<&'a Scene> for SceneView<'a> {
    fn from(scene: &'a Scene) -> Self {
        match scene {
            Scene::Listing { rows, cursor } => SceneView::Listing {
                decks: rows,
                cursor: *cursor,
            },
            // One-based for display
            Scene::Slide { index, count, .. } => SceneView::Slide {
                slide: index + 1,
                count: *count,
            },
            Scene::Placeholder {
                index,
                count,
                message,
            } => SceneView::Placeholder {
                slide: index + 1,
                count: *count,
                message,
            },
        }
    }
}

/// Writes `view.json` and `frame.png` to a directory
#[derive(Debug)]
pub struct SnapshotSurface {
    dir: PathBuf,
    size: RenderSize,
    fullscreen: bool,
    frames: u64,
}

impl SnapshotSurface {
    pub fn new(
        dir: impl Into<PathBuf>,
        size: RenderSize,
        fullscreen: bool,
    ) -> Result<Self, SurfaceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            size,
            fullscreen,
            frames: 0,
        })
    }

    pub fn view_path(&self) -> PathBuf {
        self.dir.join("view.json")
    }

    pub fn frame_path(&self) -> PathBuf {
        self.dir.join("frame.png")
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Write via a temporary file so readers never see a partial frame
fn replace(path: &Path, bytes: &[u8]) -> Result<(), SurfaceError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl DisplaySurface for SnapshotSurface {
    fn present(&mut self, frame: &Frame) -> Result<(), SurfaceError> {
        let view = View {
            fullscreen: self.fullscreen,
            status: &frame.status,
            link: frame.link.label(),
            scene: SceneView::from(&frame.scene),
        };
        let json = serde_json::to_vec_pretty(&view)?;

        let canvas = compose(&frame.scene, self.size);
        let mut png = Vec::new();
        canvas
            .as_rgb()
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        replace(&self.frame_path(), &png)?;
        replace(&self.view_path(), &json)?;

        self.frames += 1;
        debug!(frame = self.frames, status = %frame.status, "Presented frame");
        Ok(())
    }

    fn toggle_fullscreen(&mut self) -> bool {
        self.fullscreen = !self.fullscreen;
        self.fullscreen
    }

    fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas(width: u32, height: u32) -> RenderSize {
        RenderSize { width, height }
    }

    #[test]
    fn test_fit_wide_image_letterboxes_vertically() {
        let place = fit_centered((1600, 400), canvas(800, 600));
        assert_eq!(
            place,
            Placement {
                x: 0,
                y: 200,
                width: 800,
                height: 200
            }
        );
    }

    #[test]
    fn test_fit_tall_image_pillarboxes() {
        let place = fit_centered((300, 600), canvas(800, 600));
        assert_eq!(
            place,
            Placement {
                x: 250,
                y: 0,
                width: 300,
                height: 600
            }
        );
    }

    #[test]
    fn test_letterbox_pixels() {
        let image = SlideImage::filled(2, 1, [200, 100, 50]);
        let out = compose(
            &Scene::Slide {
                image: Arc::new(image),
                index: 0,
                count: 1,
            },
            canvas(4, 4),
        );
        assert_eq!(out.pixel(0, 0), BACKGROUND);
        assert_eq!(out.pixel(0, 1), [200, 100, 50]);
        assert_eq!(out.pixel(3, 2), [200, 100, 50]);
        assert_eq!(out.pixel(3, 3), BACKGROUND);
    }

    #[test]
    fn test_letterbox_downscales_to_canvas() {
        let image = SlideImage::filled(1600, 400, [10, 20, 30]);
        let out = compose(
            &Scene::Slide {
                image: Arc::new(image),
                index: 0,
                count: 1,
            },
            canvas(80, 60),
        );
        assert_eq!((out.width(), out.height()), (80, 60));
        assert_eq!(out.pixel(0, 19), BACKGROUND);
        assert_eq!(out.pixel(40, 30), [10, 20, 30]);
        assert_eq!(out.pixel(79, 40), BACKGROUND);
    }

    #[test]
    fn test_snapshot_writes_view_and_frame() {
        let dir = std::env::temp_dir().join(format!("deckpilot-surface-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let mut surface = SnapshotSurface::new(&dir, canvas(8, 6), true).unwrap();

        let frame = Frame {
            scene: Scene::Listing {
                rows: vec![ListingRow {
                    name: "talk.pdf".to_string(),
                    flagged: false,
                }],
                cursor: 0,
            },
            status: "Found 1 presentations".to_string(),
            link: LinkStatus::Connected,
        };
        surface.present(&frame).unwrap();
        assert!(!surface.toggle_fullscreen());
        surface.present(&frame).unwrap();

        let view: serde_json::Value =
            serde_json::from_slice(&fs::read(surface.view_path()).unwrap()).unwrap();
        assert_eq!(view["mode"], "listing");
        assert_eq!(view["fullscreen"], false);
        assert_eq!(view["link"], "Connected");
        assert_eq!(view["decks"][0]["name"], "talk.pdf");

        let raster = image::open(surface.frame_path()).unwrap();
        assert_eq!((raster.width(), raster.height()), (8, 6));
        assert_eq!(surface.frames(), 2);
    }

    #[test]
    fn test_placeholder_view_is_one_based() {
        let scene = Scene::Placeholder {
            index: 2,
            count: 5,
            message: "Error displaying slide".to_string(),
        };
        let json = serde_json::to_value(SceneView::from(&scene)).unwrap();
        assert_eq!(json["mode"], "placeholder");
        assert_eq!(json["slide"], 3);
        assert_eq!(json["message"], "Error displaying slide");
    }
}
