use std::path::Path;
use std::time::Instant;

use anyhow::bail;
use clap::{arg, App};
use image::DynamicImage;

use crate::commands::Command;
use crate::crs;
use crate::feature::load_geo_json;
use crate::raster::load_geotiff;
use crate::render::render_overlay;
use crate::utils::encode_png;

#[cfg(test)]
#[allow(unused_must_use)]
mod tests {
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;

    use crate::test::{with_input_and_output_paths, write_gray_geotiff};

    use super::execute;

    const ROADS_GEOJSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "road_type": 3 },
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[2.3001, 48.8099], [2.3003, 48.8097]]
                }
            }
        ]
    }"#;

    const EMPTY_GEOJSON: &str = r#"{ "type": "FeatureCollection", "features": [] }"#;

    fn write_vector(path: &Path, content: &str) {
        File::create(path)
            .unwrap()
            .write_all(content.as_bytes())
            .unwrap();
    }

    #[test]
    fn bails_on_missing_raster_before_writing_output() {
        with_input_and_output_paths(|input_path, output_path| {
            let vector_path = input_path.join("roads.geojson");
            write_vector(&vector_path, ROADS_GEOJSON);
            let out = output_path.join("overlay.png");

            let result = execute(&input_path.join("nope.tif"), &vector_path, &out);

            assert!(result.is_err());
            assert!(!out.exists());
        });
    }

    #[test]
    fn bails_on_missing_vector_file() {
        with_input_and_output_paths(|input_path, output_path| {
            let raster_path = input_path.join("img.tif");
            write_gray_geotiff(&raster_path, 4, 4, (2.30, 48.81), 0.0001, 4326, &[0; 16]);
            let out = output_path.join("overlay.png");

            let result = execute(&raster_path, &input_path.join("nope.geojson"), &out);

            assert!(result.is_err());
            assert!(!out.exists());
        });
    }

    #[test]
    fn writes_a_png_with_the_raster_dimensions() {
        with_input_and_output_paths(|input_path, output_path| {
            let raster_path = input_path.join("img.tif");
            let data: Vec<u16> = (0..16).collect();
            write_gray_geotiff(&raster_path, 4, 4, (2.30, 48.81), 0.0001, 4326, &data);

            let vector_path = input_path.join("roads.geojson");
            write_vector(&vector_path, ROADS_GEOJSON);

            let out = output_path.join("overlay.png");
            execute(&raster_path, &vector_path, &out).unwrap();

            let image = image::open(&out).unwrap();
            use image::GenericImageView;
            assert_eq!(image.dimensions(), (4, 4));
        });
    }

    #[test]
    fn empty_vector_layer_still_produces_an_image() {
        with_input_and_output_paths(|input_path, output_path| {
            let raster_path = input_path.join("img.tif");
            write_gray_geotiff(&raster_path, 4, 4, (2.30, 48.81), 0.0001, 4326, &[7; 16]);

            let vector_path = input_path.join("empty.geojson");
            write_vector(&vector_path, EMPTY_GEOJSON);

            let out = output_path.join("overlay.png");
            execute(&raster_path, &vector_path, &out).unwrap();

            assert!(out.is_file());
        });
    }

    #[test]
    fn vector_over_projected_raster_is_reprojected_onto_it() {
        with_input_and_output_paths(|input_path, output_path| {
            // 20x20m UTM zone 31 raster around central Paris
            let raster_path = input_path.join("utm.tif");
            write_gray_geotiff(
                &raster_path,
                20,
                20,
                (452_000.0, 5_411_010.0),
                1.0,
                32631,
                &vec![0u16; 400],
            );

            // a WGS84 line crossing that raster (lon/lat of its center)
            let vector_path = input_path.join("roads.geojson");
            let (lon_a, lat_a) = crate::crs::convert(
                crate::crs::CrsCode::Utm {
                    zone: 31,
                    north: true,
                },
                crate::crs::CrsCode::Epsg4326,
                (452_001.0, 5_411_000.0),
            );
            let (lon_b, lat_b) = crate::crs::convert(
                crate::crs::CrsCode::Utm {
                    zone: 31,
                    north: true,
                },
                crate::crs::CrsCode::Epsg4326,
                (452_019.0, 5_411_000.0),
            );
            write_vector(
                &vector_path,
                &format!(
                    r#"{{"type": "FeatureCollection", "features": [{{
                        "type": "Feature", "properties": {{}},
                        "geometry": {{ "type": "LineString",
                            "coordinates": [[{}, {}], [{}, {}]] }}
                    }}]}}"#,
                    lon_a, lat_a, lon_b, lat_b
                ),
            );

            let out = output_path.join("overlay.png");
            execute(&raster_path, &vector_path, &out).unwrap();

            let image = image::open(&out).unwrap().to_rgba8();
            let bright = image.pixels().filter(|p| p.0[0] > 127).count();
            assert!(bright >= 5);
        });
    }
}

pub struct Overlay {}

impl Command for Overlay {
    fn identifier(&self) -> &'static str {
        "overlay"
    }

    fn register(&self) -> App<'static> {
        App::new(self.identifier())
            .about("Render a GeoTIFF with a GeoJSON overlay to a PNG.")
            .arg(arg!(-r --raster <RASTER> "Path to the GeoTIFF raster"))
            .arg(arg!(-v --vector <VECTOR> "Path to the GeoJSON annotations (.geojson or .geojson.gz)"))
            .arg(arg!(-o --output <OUTPUT> "Path of the output PNG"))
    }

    fn run(&self, args: &clap::ArgMatches) -> anyhow::Result<()> {
        let raster_path = Path::new(args.value_of("raster").unwrap());
        let vector_path = Path::new(args.value_of("vector").unwrap());
        let output_path = Path::new(args.value_of("output").unwrap());

        execute(raster_path, vector_path, output_path)
    }
}

fn execute(raster_path: &Path, vector_path: &Path, output_path: &Path) -> anyhow::Result<()> {
    let start = Instant::now();

    if !raster_path.is_file() {
        bail!("Couldn't find raster {}", raster_path.display());
    }
    if !vector_path.is_file() {
        bail!("Couldn't find vector file {}", vector_path.display());
    }

    let now = Instant::now();
    println!("▶️  Loading raster");
    let raster = load_geotiff(raster_path)?;
    let (width, height) = raster.dimensions();
    println!(
        "✔️  Loaded {}x{} raster with {} band(s) in {}ms",
        width,
        height,
        raster.n_bands(),
        now.elapsed().as_millis()
    );

    let now = Instant::now();
    println!("▶️  Loading vector layer");
    let mut features = load_geo_json(vector_path)?;
    println!(
        "✔️  Loaded {} feature(s) in {}ms",
        features.len(),
        now.elapsed().as_millis()
    );

    if crs::GEOJSON_CRS != raster.crs() {
        println!(
            "ℹ️  Reprojecting features from {} to {}",
            crs::GEOJSON_CRS,
            raster.crs()
        );
        crs::reproject(&mut features, crs::GEOJSON_CRS, raster.crs());
    }

    let now = Instant::now();
    println!("▶️  Compositing");
    let image = render_overlay(&raster, &features)?;
    println!("✔️  Composited in {}ms", now.elapsed().as_millis());

    let now = Instant::now();
    println!("▶️  Writing output image");
    if let Err(e) = encode_png(output_path, &DynamicImage::ImageRgba8(image)) {
        bail!("Failed to write output image: {}", e);
    }
    println!("✔️  Wrote output image in {}ms", now.elapsed().as_millis());

    println!("\n    🎉  Finished in {}ms", start.elapsed().as_millis());

    Ok(())
}
