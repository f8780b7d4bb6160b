use std::fs::File;
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::ColorType;

use crate::crs::CrsCode;

use super::{Extent, GeoTransform, RasterError};

// SpaceNet tiles are small, but pan-sharpened strips can exceed the decoder
// defaults
const DECODER_LIMIT: usize = 512 * 1024 * 1024;

/// A georeferenced raster loaded from a GeoTIFF file.
///
/// Pixel data is stored planar, one `Vec<f32>` per band in row-major order
/// (north to south, west to east).
#[derive(Debug)]
pub struct GeoTiffRaster {
    width: u32,
    height: u32,
    bands: Vec<Vec<f32>>,
    transform: GeoTransform,
    crs: CrsCode,
    no_data: Option<f32>,
}

impl GeoTiffRaster {
    pub fn from_file(path: &Path) -> Result<Self, RasterError> {
        let file = File::open(path)?;
        let mut decoder = Decoder::new(file)?;

        let mut limits = Limits::default();
        limits.decoding_buffer_size = DECODER_LIMIT;
        limits.intermediate_buffer_size = DECODER_LIMIT;
        limits.ifd_value_size = DECODER_LIMIT;
        decoder = decoder.with_limits(limits);

        let (width, height) = decoder.dimensions()?;

        let transform = read_geotransform(&mut decoder, path)?;
        let crs = read_crs(&mut decoder)?;
        let samples = samples_per_pixel(decoder.colortype()?)?;
        let no_data = read_no_data(&mut decoder);

        let data = decode_samples(&mut decoder)?;
        let bands = deinterleave(data, samples, width, height)?;

        Ok(GeoTiffRaster {
            width,
            height,
            bands,
            transform,
            crs,
            no_data,
        })
    }

    pub fn new(
        width: u32,
        height: u32,
        bands: Vec<Vec<f32>>,
        transform: GeoTransform,
        crs: CrsCode,
        no_data: Option<f32>,
    ) -> Self {
        GeoTiffRaster {
            width,
            height,
            bands,
            transform,
            crs,
            no_data,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn n_bands(&self) -> usize {
        self.bands.len()
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> CrsCode {
        self.crs
    }

    pub fn no_data(&self) -> Option<f32> {
        self.no_data
    }

    pub fn extent(&self) -> Extent {
        self.transform.extent(self.width, self.height)
    }

    pub fn value(&self, band: usize, col: u32, row: u32) -> f32 {
        self.bands[band][(row * self.width + col) as usize]
    }

    pub fn is_no_data(&self, value: f32) -> bool {
        match self.no_data {
            Some(no_data) => value.is_nan() || (value - no_data).abs() < f32::EPSILON,
            None => value.is_nan(),
        }
    }

    /// Min/max of a band, ignoring no-data pixels. `None` when every pixel is
    /// no-data.
    pub fn band_range(&self, band: usize) -> Option<(f32, f32)> {
        self.bands[band]
            .iter()
            .filter(|v| !self.is_no_data(**v))
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((min, max)) => Some((min.min(v), max.max(v))),
            })
    }
}

fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    path: &Path,
) -> Result<GeoTransform, RasterError> {
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag);
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag);

    match (tiepoint, scale) {
        (Ok(tiepoint), Ok(scale)) => GeoTransform::from_tags(&tiepoint, &scale),
        _ => Err(RasterError::MissingGeoreferencing(
            path.display().to_string(),
        )),
    }
}

fn read_crs<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<CrsCode, RasterError> {
    let keys = decoder
        .get_tag_u32_vec(Tag::GeoKeyDirectoryTag)
        .map_err(|_| crate::crs::CrsError::MissingCrs)?;

    let keys: Vec<u16> = keys.into_iter().map(|v| v as u16).collect();

    Ok(CrsCode::from_geo_key_directory(&keys)?)
}

fn read_no_data<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
    decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

fn samples_per_pixel(colortype: ColorType) -> Result<usize, RasterError> {
    match colortype {
        ColorType::Gray(_) => Ok(1),
        ColorType::RGB(_) => Ok(3),
        ColorType::RGBA(_) => Ok(4),
        other => Err(RasterError::UnsupportedColorType(format!("{:?}", other))),
    }
}

fn decode_samples<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<Vec<f32>, RasterError> {
    let result = decoder.read_image()?;

    let data = match result {
        DecodingResult::U8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
    };

    Ok(data)
}

fn deinterleave(
    data: Vec<f32>,
    samples: usize,
    width: u32,
    height: u32,
) -> Result<Vec<Vec<f32>>, RasterError> {
    let pixels = (width * height) as usize;

    if data.len() != pixels * samples {
        return Err(RasterError::TruncatedData {
            expected: pixels * samples,
            actual: data.len(),
        });
    }

    if samples == 1 {
        return Ok(vec![data]);
    }

    let mut bands = vec![Vec::with_capacity(pixels); samples];
    for chunk in data.chunks(samples) {
        for (band, &value) in bands.iter_mut().zip(chunk.iter()) {
            band.push(value);
        }
    }

    Ok(bands)
}
