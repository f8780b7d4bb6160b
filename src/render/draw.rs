use geo::{Geometry, Line, LineString, Point, Polygon};
use image::RgbaImage;
use imageproc::drawing::{draw_antialiased_line_segment_mut, draw_filled_circle_mut};
use imageproc::pixelops::interpolate;

use crate::feature::FeatureCollection;

use super::{WorldWindow, OVERLAY_COLOR};

const POINT_RADIUS: i32 = 2;

/// Draw all geometries of a collection onto the canvas. Coordinates must
/// already be in the window's reference system.
pub fn draw_features(canvas: &mut RgbaImage, window: &WorldWindow, features: &FeatureCollection<f64>) {
    for feature in features.iter() {
        draw_geometry(canvas, window, &feature.geometry);
    }
}

fn draw_geometry(canvas: &mut RgbaImage, window: &WorldWindow, geometry: &Geometry<f64>) {
    match geometry {
        Geometry::Point(p) => draw_point(canvas, window, p),
        Geometry::MultiPoint(mp) => {
            for p in &mp.0 {
                draw_point(canvas, window, p);
            }
        }
        Geometry::Line(l) => draw_segment(canvas, window, l),
        Geometry::LineString(ls) => draw_line_string(canvas, window, ls),
        Geometry::MultiLineString(mls) => {
            for ls in &mls.0 {
                draw_line_string(canvas, window, ls);
            }
        }
        Geometry::Polygon(poly) => draw_polygon(canvas, window, poly),
        Geometry::MultiPolygon(mp) => {
            for poly in &mp.0 {
                draw_polygon(canvas, window, poly);
            }
        }
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                draw_geometry(canvas, window, g);
            }
        }
        Geometry::Rect(r) => draw_polygon(canvas, window, &r.to_polygon()),
        Geometry::Triangle(t) => draw_polygon(canvas, window, &t.to_polygon()),
    }
}

fn draw_point(canvas: &mut RgbaImage, window: &WorldWindow, point: &Point<f64>) {
    if let Some((col, row)) = canvas_coords(window, point.x(), point.y()) {
        draw_filled_circle_mut(canvas, (col, row), POINT_RADIUS, OVERLAY_COLOR);
    }
}

fn draw_segment(canvas: &mut RgbaImage, window: &WorldWindow, line: &Line<f64>) {
    let start = canvas_coords(window, line.start.x, line.start.y);
    let end = canvas_coords(window, line.end.x, line.end.y);

    let (start, end) = match (start, end) {
        (Some(s), Some(e)) => (s, e),
        _ => return,
    };

    let (width, height) = canvas.dimensions();
    if outside_canvas(start, end, width as i32, height as i32) {
        return;
    }

    draw_antialiased_line_segment_mut(canvas, start, end, OVERLAY_COLOR, interpolate);
}

fn draw_line_string(canvas: &mut RgbaImage, window: &WorldWindow, line_string: &LineString<f64>) {
    for line in line_string.lines() {
        draw_segment(canvas, window, &line);
    }
}

/// Polygons are drawn as ring outlines, exterior and interiors alike.
fn draw_polygon(canvas: &mut RgbaImage, window: &WorldWindow, polygon: &Polygon<f64>) {
    draw_line_string(canvas, window, polygon.exterior());
    for interior in polygon.interiors() {
        draw_line_string(canvas, window, interior);
    }
}

fn canvas_coords(window: &WorldWindow, x: f64, y: f64) -> Option<(i32, i32)> {
    let (col, row) = window.to_pixel(x, y);

    // features far outside the window would overflow i32 after rounding
    if !col.is_finite() || !row.is_finite() || col.abs() > 1e7 || row.abs() > 1e7 {
        return None;
    }

    Some((col.round() as i32, row.round() as i32))
}

fn outside_canvas(start: (i32, i32), end: (i32, i32), width: i32, height: i32) -> bool {
    (start.0 < 0 && end.0 < 0)
        || (start.1 < 0 && end.1 < 0)
        || (start.0 >= width && end.0 >= width)
        || (start.1 >= height && end.1 >= height)
}
