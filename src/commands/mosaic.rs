use std::path::Path;
use std::time::Instant;

use anyhow::bail;
use clap::{arg, App};
use image::DynamicImage;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::commands::Command;
use crate::crs;
use crate::feature::load_vector_dir;
use crate::raster::{find_raster_files, Extent, GeoTiffRaster};
use crate::render::{draw_features, new_canvas, paint_raster, WorldWindow};
use crate::utils::{encode_png, SourceError};

const DEFAULT_WIDTH: u32 = 2048;


pub struct Mosaic {}

impl Command for Mosaic {
    fn identifier(&self) -> &'static str {
        "mosaic"
    }

    fn register(&self) -> App<'static> {
        App::new(self.identifier())
            .about("Compose all GeoTIFF tiles and GeoJSON layers below a directory into one overview PNG.")
            .arg(arg!(-i --input <INPUT_DIR> "Path to a directory of SpaceNet tiles and annotations"))
            .arg(arg!(-o --output <OUTPUT> "Path of the output PNG"))
            .arg(arg!(-w --width [WIDTH] "Canvas width in pixels (default 2048)"))
    }

    fn run(&self, args: &clap::ArgMatches) -> anyhow::Result<()> {
        let input_path = Path::new(args.value_of("input").unwrap());
        let output_path = Path::new(args.value_of("output").unwrap());

        let width = match args.value_of("width") {
            Some(value) => match value.parse::<u32>() {
                Ok(width) if width > 0 => width,
                _ => bail!("Width must be a positive number of pixels"),
            },
            None => DEFAULT_WIDTH,
        };

        execute(input_path, output_path, width)
    }
}

fn execute(input_path: &Path, output_path: &Path, width: u32) -> anyhow::Result<()> {
    let start = Instant::now();

    if !input_path.is_dir() {
        bail!("Input path is not a directory");
    }

    let now = Instant::now();
    println!("▶️  Loading rasters");
    let rasters = load_rasters(input_path)?;
    println!(
        "✔️  Loaded {} raster(s) in {}ms",
        rasters.len(),
        now.elapsed().as_millis()
    );

    let crs = rasters[0].crs();
    if rasters.iter().any(|r| r.crs() != crs) {
        bail!("Rasters below {} use mixed coordinate reference systems", input_path.display());
    }

    let extent = rasters
        .iter()
        .map(GeoTiffRaster::extent)
        .fold(None, |acc: Option<Extent>, e| match acc {
            None => Some(e),
            Some(acc) => Some(acc.union(&e)),
        })
        .unwrap();

    let window = WorldWindow::with_width(extent, width);
    let (canvas_width, canvas_height) = window.dimensions();
    println!("ℹ️  Canvas is {}x{} px covering {}", canvas_width, canvas_height, crs);

    let now = Instant::now();
    println!("▶️  Painting rasters");
    let mut canvas = new_canvas(&window);
    for raster in &rasters {
        paint_raster(&mut canvas, &window, raster)?;
    }
    println!("✔️  Painted rasters in {}ms", now.elapsed().as_millis());

    let now = Instant::now();
    println!("▶️  Drawing vector layers");
    for (name, mut features) in load_vector_dir(input_path)? {
        crs::reproject(&mut features, crs::GEOJSON_CRS, crs);
        println!("    ✔️  {} ({} feature(s))", name, features.len());
        draw_features(&mut canvas, &window, &features);
    }
    println!("✔️  Drew vector layers in {}ms", now.elapsed().as_millis());

    let now = Instant::now();
    println!("▶️  Writing output image");
    if let Err(e) = encode_png(output_path, &DynamicImage::ImageRgba8(canvas)) {
        bail!("Failed to write output image: {}", e);
    }
    println!("✔️  Wrote output image in {}ms", now.elapsed().as_millis());

    println!("\n    🎉  Finished in {}ms", start.elapsed().as_millis());

    Ok(())
}

fn load_rasters(input_path: &Path) -> anyhow::Result<Vec<GeoTiffRaster>> {
    let files = find_raster_files(input_path)?;

    if files.is_empty() {
        bail!("No .tif files found below {}", input_path.display());
    }

    let (ok_results, err_results): (Vec<_>, Vec<_>) = files
        .into_par_iter()
        .map(|entry| -> Result<GeoTiffRaster, SourceError> {
            let path = entry.path();

            GeoTiffRaster::from_file(&path).map_err(|e| SourceError::new(&path, e.to_string()))
        })
        .partition(Result::is_ok);

    if !err_results.is_empty() {
        let error_string: Vec<_> = err_results
            .into_iter()
            .map(|r| format!("\t{}", r.err().unwrap()))
            .collect();

        bail!(
            "Failed to load (multiple) raster(s):\n{}",
            error_string.join("\n")
        );
    }

    Ok(ok_results.into_iter().map(|r| r.unwrap()).collect())
}
