use std::path::Path;

use clap::{arg, App};

use crate::commands::Command;
use crate::raster::load_geotiff;


pub struct Info {}

impl Command for Info {
    fn identifier(&self) -> &'static str {
        "info"
    }

    fn register(&self) -> App<'static> {
        App::new(self.identifier())
            .about("Print metadata and band statistics of a GeoTIFF.")
            .arg(arg!(-r --raster <RASTER> "Path to the GeoTIFF raster"))
    }

    fn run(&self, args: &clap::ArgMatches) -> anyhow::Result<()> {
        let raster_path = Path::new(args.value_of("raster").unwrap());

        execute(raster_path)
    }
}

fn execute(raster_path: &Path) -> anyhow::Result<()> {
    let raster = load_geotiff(raster_path)?;

    let (width, height) = raster.dimensions();
    let extent = raster.extent();

    println!("ℹ️  {}", raster_path.display());
    println!("    Dimensions: {} x {} px", width, height);
    println!("    Bands:      {}", raster.n_bands());
    println!("    CRS:        {}", raster.crs());
    println!(
        "    Extent:     {:.6}, {:.6} → {:.6}, {:.6}",
        extent.min_x, extent.min_y, extent.max_x, extent.max_y
    );
    match raster.no_data() {
        Some(no_data) => println!("    No-data:    {}", no_data),
        None => println!("    No-data:    none"),
    }

    for band in 0..raster.n_bands() {
        match raster.band_range(band) {
            Some((min, max)) => {
                println!("    Band {}:     min {:.3}, max {:.3}", band + 1, min, max)
            }
            None => println!("    Band {}:     no valid pixels", band + 1),
        }
    }

    Ok(())
}
