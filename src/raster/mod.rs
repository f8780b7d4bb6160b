mod error;
mod geotiff;
mod transform;

use std::fs::{read_dir, DirEntry};
use std::path::Path;

use anyhow::bail;

pub use error::RasterError;
pub use geotiff::GeoTiffRaster;
pub use transform::{Extent, GeoTransform};

pub fn load_geotiff(path: &Path) -> anyhow::Result<GeoTiffRaster> {
    if !path.is_file() {
        bail!("Couldn't find raster {}", path.display());
    }

    let raster = GeoTiffRaster::from_file(path)?;

    Ok(raster)
}

pub fn find_raster_files(dir: &Path) -> anyhow::Result<Vec<DirEntry>> {
    let mut files = Vec::<DirEntry>::new();

    if dir.is_dir() {
        for entry in read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                files.extend(find_raster_files(&path)?);
            } else {
                let name = entry.file_name().to_str().unwrap_or("").to_lowercase();
                if name.ends_with(".tif") || name.ends_with(".tiff") {
                    files.push(entry);
                }
            }
        }
    }

    Ok(files)
}
