mod draw;

use anyhow::bail;
use image::{Rgba, RgbaImage};

use crate::feature::FeatureCollection;
use crate::raster::{Extent, GeoTiffRaster};

pub use draw::draw_features;

/// White, like the road overlay in the reference SpaceNet renderings.
pub const OVERLAY_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

pub const BACKGROUND_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Maps world coordinates onto a pixel canvas. Row 0 is the northern edge.
#[derive(Debug, Clone, Copy)]
pub struct WorldWindow {
    extent: Extent,
    width: u32,
    height: u32,
}

impl WorldWindow {
    pub fn new(extent: Extent, width: u32, height: u32) -> Self {
        WorldWindow {
            extent,
            width,
            height,
        }
    }

    /// A window matching the raster's own grid, so canvas pixels line up 1:1
    /// with raster pixels.
    pub fn of_raster(raster: &GeoTiffRaster) -> Self {
        let (width, height) = raster.dimensions();

        WorldWindow {
            extent: raster.extent(),
            width,
            height,
        }
    }

    /// A window of the given pixel width; the height follows the extent's
    /// aspect ratio.
    pub fn with_width(extent: Extent, width: u32) -> Self {
        let aspect = if extent.width() > 0.0 {
            extent.height() / extent.width()
        } else {
            1.0
        };
        let height = ((width as f64 * aspect).round() as u32).max(1);

        WorldWindow {
            extent,
            width: width.max(1),
            height,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    pub fn to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.extent.min_x) / self.extent.width() * self.width as f64,
            (self.extent.max_y - y) / self.extent.height() * self.height as f64,
        )
    }

    pub fn to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.extent.min_x + col / self.width as f64 * self.extent.width(),
            self.extent.max_y - row / self.height as f64 * self.extent.height(),
        )
    }
}

pub fn new_canvas(window: &WorldWindow) -> RgbaImage {
    let (width, height) = window.dimensions();

    RgbaImage::from_pixel(width, height, BACKGROUND_COLOR)
}

/// Paint a raster into the window, nearest-neighbour sampled, with per-band
/// linear min/max stretch. No-data pixels keep the canvas background.
pub fn paint_raster(
    canvas: &mut RgbaImage,
    window: &WorldWindow,
    raster: &GeoTiffRaster,
) -> anyhow::Result<()> {
    let rgb_bands: [usize; 3] = match raster.n_bands() {
        1 => [0, 0, 0],
        n if n >= 3 => [0, 1, 2],
        n => bail!("Cannot render {}-band raster as RGB", n),
    };

    let ranges: Vec<(f32, f32)> = rgb_bands
        .iter()
        .map(|&b| raster.band_range(b).unwrap_or((0.0, 0.0)))
        .collect();

    let extent = raster.extent();
    let (canvas_width, canvas_height) = window.dimensions();

    // canvas region covered by this raster
    let (left, top) = window.to_pixel(extent.min_x, extent.max_y);
    let (right, bottom) = window.to_pixel(extent.max_x, extent.min_y);

    let col_start = left.floor().max(0.0) as u32;
    let row_start = top.floor().max(0.0) as u32;
    let col_end = (right.ceil().max(0.0) as u32).min(canvas_width);
    let row_end = (bottom.ceil().max(0.0) as u32).min(canvas_height);

    let (raster_width, raster_height) = raster.dimensions();

    for row in row_start..row_end {
        for col in col_start..col_end {
            // sample at the canvas pixel center
            let (x, y) = window.to_world(col as f64 + 0.5, row as f64 + 0.5);
            let (src_col, src_row) = raster.transform().world_to_pixel(x, y);

            let src_col = src_col.floor();
            let src_row = src_row.floor();

            if src_col < 0.0
                || src_row < 0.0
                || src_col >= raster_width as f64
                || src_row >= raster_height as f64
            {
                continue;
            }

            let values: Vec<f32> = rgb_bands
                .iter()
                .map(|&b| raster.value(b, src_col as u32, src_row as u32))
                .collect();

            if values.iter().any(|v| raster.is_no_data(*v)) {
                continue;
            }

            let channels: Vec<u8> = values
                .iter()
                .zip(ranges.iter())
                .map(|(&v, &(min, max))| stretch(v, min, max))
                .collect();

            canvas.put_pixel(col, row, Rgba([channels[0], channels[1], channels[2], 255]));
        }
    }

    Ok(())
}

/// Render a single raster with its overlay at native resolution.
pub fn render_overlay(
    raster: &GeoTiffRaster,
    features: &FeatureCollection<f64>,
) -> anyhow::Result<RgbaImage> {
    let window = WorldWindow::of_raster(raster);
    let mut canvas = new_canvas(&window);

    paint_raster(&mut canvas, &window, raster)?;
    draw_features(&mut canvas, &window, features);

    Ok(canvas)
}

fn stretch(value: f32, min: f32, max: f32) -> u8 {
    let span = max - min;
    if span <= 0.0 {
        return 0;
    }

    (((value - min) / span) * 255.0).round().clamp(0.0, 255.0) as u8
}
