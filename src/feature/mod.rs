mod load;

use std::collections::HashMap;

use geo::{map_coords::MapCoordsInplace, CoordNum, Geometry};

pub use load::{find_vector_files, load_geo_json, load_vector_dir};

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use geo::{Coordinate, Geometry, Point};

    use crate::feature::{Feature, FeatureCollection, PropertyValue};

    #[test]
    fn feature_collection_collects_from_iterator() {
        let features = [
            Coordinate { x: 1.0, y: 1.0 },
            Coordinate { x: 4.0, y: 4.0 },
        ]
        .iter()
        .map(|c| Feature {
            geometry: Geometry::Point(Point(*c)),
            properties: HashMap::new(),
        });

        let collection: FeatureCollection<f64> = features.collect();

        assert_eq!(2, collection.len());
    }

    #[test]
    fn map_coords_inplace_touches_every_feature() {
        let mut collection = FeatureCollection::new();
        for x in [1.0, 2.0] {
            collection.push(Feature {
                geometry: Geometry::Point(Point(Coordinate { x, y: 0.0 })),
                properties: HashMap::new(),
            });
        }

        use geo::map_coords::MapCoordsInplace;
        collection.map_coords_inplace(|&(x, y)| (x * 10.0, y + 1.0));

        for (i, expected_x) in [10.0, 20.0].iter().enumerate() {
            if let Geometry::Point(p) = &collection[i].geometry {
                assert_eq!(p.x(), *expected_x);
                assert_eq!(p.y(), 1.0);
            } else {
                panic!("geometry type changed");
            }
        }
    }

    #[test]
    fn property_value_converts_from_json() {
        assert_eq!(
            PropertyValue::from(serde_json::json!("motorway")),
            PropertyValue::String("motorway".to_string())
        );
        assert_eq!(
            PropertyValue::from(serde_json::json!(48.5)),
            PropertyValue::Number(48.5)
        );
        assert_eq!(
            PropertyValue::from(serde_json::json!(true)),
            PropertyValue::Bool(true)
        );
        assert_eq!(PropertyValue::from(serde_json::Value::Null), PropertyValue::Null);
        assert_eq!(
            PropertyValue::from(serde_json::json!([1, 2])),
            PropertyValue::Array(vec![PropertyValue::Number(1.0), PropertyValue::Number(2.0)])
        );
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    String(String),
    Number(f64),
    Array(Vec<PropertyValue>),
}

impl From<serde_json::Value> for PropertyValue {
    fn from(val: serde_json::Value) -> Self {
        match val {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(v) => Self::Bool(v),
            serde_json::Value::String(v) => Self::String(v),
            serde_json::Value::Number(v) => Self::Number(v.as_f64().unwrap_or_default()),
            serde_json::Value::Array(v) => Self::Array(v.into_iter().map(|e| e.into()).collect()),
            serde_json::Value::Object(v) => {
                Self::String(serde_json::Value::Object(v).to_string())
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Feature<T: CoordNum> {
    pub geometry: Geometry<T>,
    pub properties: HashMap<String, PropertyValue>,
}

impl<T: CoordNum> MapCoordsInplace<T> for Feature<T> {
    fn map_coords_inplace(&mut self, func: impl Fn(&(T, T)) -> (T, T) + Copy) {
        self.geometry.map_coords_inplace(func);
    }
}

#[derive(Clone, Debug)]
pub struct FeatureCollection<T: CoordNum>(pub Vec<Feature<T>>);

impl<T: CoordNum> FeatureCollection<T> {
    pub fn new() -> Self {
        FeatureCollection(Vec::<Feature<T>>::new())
    }
}

impl<T: CoordNum> std::ops::Deref for FeatureCollection<T> {
    type Target = Vec<Feature<T>>;
    fn deref(&self) -> &Vec<Feature<T>> {
        &self.0
    }
}

impl<T: CoordNum> std::ops::DerefMut for FeatureCollection<T> {
    fn deref_mut(&mut self) -> &mut Vec<Feature<T>> {
        &mut self.0
    }
}

impl<T: CoordNum> FromIterator<Feature<T>> for FeatureCollection<T> {
    fn from_iter<I: IntoIterator<Item = Feature<T>>>(iter: I) -> Self {
        let mut c = Self::new();

        for i in iter {
            c.push(i);
        }

        c
    }
}

impl<T: CoordNum> MapCoordsInplace<T> for FeatureCollection<T> {
    fn map_coords_inplace(&mut self, func: impl Fn(&(T, T)) -> (T, T) + Copy) {
        for f in self.iter_mut() {
            f.map_coords_inplace(func);
        }
    }
}
