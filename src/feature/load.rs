use std::collections::HashMap;
use std::convert::TryInto;
use std::fs::{read_dir, DirEntry, File};
use std::io::BufReader;
use std::path::Path;

use anyhow::bail;
use flate2::bufread::GzDecoder;
use geo::Geometry;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::utils::SourceError;

use super::{Feature, FeatureCollection, PropertyValue};

/// Recursively collect all `.geojson`/`.geojson.gz` files below `dir`.
pub fn find_vector_files(dir: &Path) -> anyhow::Result<Vec<DirEntry>> {
    let mut files = Vec::<DirEntry>::new();

    if dir.is_dir() {
        for entry in read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                files.extend(find_vector_files(&path)?);
            } else {
                let name = entry.file_name().to_str().unwrap_or("").to_lowercase();
                if name.ends_with(".geojson") || name.ends_with(".geojson.gz") {
                    files.push(entry);
                }
            }
        }
    }

    Ok(files)
}

/// Load a single GeoJSON FeatureCollection. Features without geometry are
/// skipped; a collection with zero features is valid.
pub fn load_geo_json(path: &Path) -> anyhow::Result<FeatureCollection<f64>> {
    if !path.is_file() {
        bail!("Couldn't find vector file {}", path.display());
    }

    let file = File::open(path)?;
    let buf = BufReader::new(file);

    let is_gzipped = path
        .to_str()
        .map(|s| s.to_lowercase().ends_with(".gz"))
        .unwrap_or(false);

    let gj: geojson::FeatureCollection = if is_gzipped {
        serde_json::from_reader(GzDecoder::new(buf))?
    } else {
        serde_json::from_reader(buf)?
    };

    Ok(collect_features(gj))
}

/// Load all vector layers below a directory in parallel, keyed by their
/// relative path.
pub fn load_vector_dir(input_path: &Path) -> anyhow::Result<Vec<(String, FeatureCollection<f64>)>> {
    let (ok_results, err_results): (Vec<_>, Vec<_>) = find_vector_files(input_path)?
        .into_par_iter()
        .map(
            |entry| -> Result<(String, FeatureCollection<f64>), SourceError> {
                let path_buf = entry.path();
                let path = path_buf.as_path();

                let layer_name = path_to_layer_name(path, input_path)
                    .map_err(|e| SourceError::new(path, e.to_string()))?;
                let fc =
                    load_geo_json(path).map_err(|e| SourceError::new(path, e.to_string()))?;

                Ok((layer_name, fc))
            },
        )
        .partition(Result::is_ok);

    if !err_results.is_empty() {
        let error_string: Vec<_> = err_results
            .into_iter()
            .map(|r| format!("\t{}", r.err().unwrap()))
            .collect();

        bail!(
            "Failed to load (multiple) vector layer(s):\n{}",
            error_string.join("\n")
        );
    }

    let mut layers: Vec<_> = ok_results.into_iter().map(|r| r.unwrap()).collect();
    layers.sort_by(|(a, _), (b, _)| a.cmp(b));

    Ok(layers)
}

fn path_to_layer_name(file_path: &Path, input_path: &Path) -> anyhow::Result<String> {
    let rel_path = file_path.strip_prefix(input_path)?;

    let s = match rel_path.to_str() {
        Some(val) => val,
        None => bail!("Could not generate layer name"),
    };

    let lower = s.to_lowercase();
    let name = if lower.ends_with(".geojson.gz") {
        &s[..s.len() - ".geojson.gz".len()]
    } else if lower.ends_with(".geojson") {
        &s[..s.len() - ".geojson".len()]
    } else {
        s
    };

    Ok(name.to_string())
}

fn collect_features(fc: geojson::FeatureCollection) -> FeatureCollection<f64> {
    fc.features
        .into_iter()
        .filter_map(|f| {
            let gj_geo = f.geometry?;
            let geometry: Geometry<f64> = gj_geo.try_into().ok()?;

            let properties: HashMap<_, _> = match f.properties {
                Some(map) => map
                    .into_iter()
                    .map(|(key, val)| -> (String, PropertyValue) { (key, val.into()) })
                    .collect(),
                None => HashMap::new(),
            };

            Some(Feature {
                geometry,
                properties,
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(unused_must_use)]
mod tests {
    use std::fs::{create_dir_all, File};
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;
    use geo::Geometry;

    use crate::feature::PropertyValue;
    use crate::test::with_input_and_output_paths;

    use super::*;

    const ROADS_GEOJSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "road_type": 3, "paved": 1 },
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[2.301, 48.809], [2.302, 48.808]]
                }
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": null
            }
        ]
    }"#;

    const EMPTY_GEOJSON: &str = r#"{ "type": "FeatureCollection", "features": [] }"#;

    #[test]
    fn loads_features_and_properties() {
        with_input_and_output_paths(|input_path, _| {
            let path = input_path.join("roads.geojson");
            File::create(&path)
                .unwrap()
                .write_all(ROADS_GEOJSON.as_bytes())
                .unwrap();

            let fc = load_geo_json(&path).unwrap();

            // the null-geometry feature is skipped
            assert_eq!(fc.len(), 1);
            assert!(matches!(fc[0].geometry, Geometry::LineString(_)));
            assert_eq!(
                fc[0].properties.get("road_type"),
                Some(&PropertyValue::Number(3.0))
            );
        });
    }

    #[test]
    fn loads_gzipped_geo_json() {
        with_input_and_output_paths(|input_path, _| {
            let path = input_path.join("roads.geojson.gz");
            let file = File::create(&path).unwrap();
            let mut gz = GzEncoder::new(file, Compression::default());
            gz.write_all(ROADS_GEOJSON.as_bytes()).unwrap();
            gz.finish().unwrap();

            let fc = load_geo_json(&path).unwrap();

            assert_eq!(fc.len(), 1);
        });
    }

    #[test]
    fn empty_feature_collection_is_valid() {
        with_input_and_output_paths(|input_path, _| {
            let path = input_path.join("empty.geojson");
            File::create(&path)
                .unwrap()
                .write_all(EMPTY_GEOJSON.as_bytes())
                .unwrap();

            let fc = load_geo_json(&path).unwrap();

            assert_eq!(fc.len(), 0);
        });
    }

    #[test]
    fn load_geo_json_bails_on_missing_file() {
        with_input_and_output_paths(|input_path, _| {
            assert!(load_geo_json(&input_path.join("nope.geojson")).is_err());
        });
    }

    #[test]
    fn load_geo_json_bails_on_invalid_json() {
        with_input_and_output_paths(|input_path, _| {
            let path = input_path.join("broken.geojson");
            File::create(&path)
                .unwrap()
                .write_all(b"{ not json")
                .unwrap();

            assert!(load_geo_json(&path).is_err());
        });
    }

    #[test]
    fn load_vector_dir_names_layers_by_relative_path() {
        with_input_and_output_paths(|input_path, _| {
            create_dir_all(input_path.join("geojson_roads")).unwrap();
            File::create(input_path.join("geojson_roads/img100.geojson"))
                .unwrap()
                .write_all(ROADS_GEOJSON.as_bytes())
                .unwrap();
            File::create(input_path.join("buildings.geojson"))
                .unwrap()
                .write_all(EMPTY_GEOJSON.as_bytes())
                .unwrap();

            let layers = load_vector_dir(&input_path).unwrap();

            let names: Vec<_> = layers.iter().map(|(name, _)| name.as_str()).collect();
            assert_eq!(names.len(), 2);
            assert!(names.contains(&"buildings"));
            assert!(names
                .iter()
                .any(|n| n.ends_with("img100") && n.starts_with("geojson_roads")));
        });
    }

    #[test]
    fn load_vector_dir_ignores_extension_case() {
        with_input_and_output_paths(|input_path, _| {
            File::create(input_path.join("ROADS.GEOJSON"))
                .unwrap()
                .write_all(ROADS_GEOJSON.as_bytes())
                .unwrap();

            let layers = load_vector_dir(&input_path).unwrap();

            assert_eq!(layers.len(), 1);
            assert_eq!(layers[0].0, "ROADS");
            assert_eq!(layers[0].1.len(), 1);
        });
    }

    #[test]
    fn load_vector_dir_reports_broken_files_with_their_path() {
        with_input_and_output_paths(|input_path, _| {
            File::create(input_path.join("broken.geojson"))
                .unwrap()
                .write_all(b"{ not json")
                .unwrap();

            let result = load_vector_dir(&input_path);

            assert!(result.is_err());
            assert!(result.unwrap_err().to_string().contains("broken.geojson"));
        });
    }
}
