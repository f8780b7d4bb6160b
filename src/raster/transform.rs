use super::RasterError;

/// Affine north-up mapping between pixel and world coordinates, built from
/// the ModelTiepoint and ModelPixelScale tags. Row 0 sits at the top
/// (largest y), so the pixel height is negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    origin_x: f64,
    origin_y: f64,
    pixel_width: f64,
    pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        GeoTransform {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Build from raw tag values. The tiepoint is `[i, j, k, x, y, z]`, tying
    /// pixel `(i, j)` to world `(x, y)`; the scale is `[sx, sy, sz]`.
    pub fn from_tags(tiepoint: &[f64], scale: &[f64]) -> Result<Self, RasterError> {
        if tiepoint.len() < 6 {
            return Err(RasterError::InvalidGeoreferencing(format!(
                "ModelTiepoint has {} values, expected 6",
                tiepoint.len()
            )));
        }
        if scale.len() < 2 || scale[0] <= 0.0 || scale[1] <= 0.0 {
            return Err(RasterError::InvalidGeoreferencing(
                "ModelPixelScale must hold two positive values".to_string(),
            ));
        }

        Ok(GeoTransform {
            origin_x: tiepoint[3] - tiepoint[0] * scale[0],
            origin_y: tiepoint[4] + tiepoint[1] * scale[1],
            pixel_width: scale[0],
            pixel_height: -scale[1],
        })
    }

    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    pub fn extent(&self, width: u32, height: u32) -> Extent {
        let (max_x, min_y) = self.pixel_to_world(width as f64, height as f64);

        Extent {
            min_x: self.origin_x,
            min_y,
            max_x,
            max_y: self.origin_y,
        }
    }
}

/// Axis-aligned bounding box in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Extent {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn union(&self, other: &Extent) -> Extent {
        Extent {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}
