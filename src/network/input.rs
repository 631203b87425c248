use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use serde::Deserialize;

use crate::{
    network::{Level, Limits, ModelKind, MultiLevel, Network, Point, PoweredSensor, Sensor, SingleLevel},
    types::err::{self, ErrorKind},
};

#[derive(Deserialize)]
struct SingleLevelInput {
    sensors: Vec<Sensor>,
    points: Vec<Point>,
}

#[derive(Deserialize)]
struct MultiLevelInput {
    sensors: Vec<PoweredSensor>,
    points: Vec<Point>,
    levels: Vec<Level>,
}

/// Parses a network of the given kind from JSON.
pub fn parse(json: &str, kind: ModelKind, limits: Limits) -> Result<Box<dyn Network>, ErrorKind> {
    let malformed = |e: serde_json::Error| err::InputError::Parse(e.to_string());

    match kind {
        ModelKind::Single => {
            let input: SingleLevelInput = serde_json::from_str(json).map_err(malformed)?;
            if input.sensors.is_empty() || input.points.is_empty() {
                return Err(err::InputError::Empty.into());
            }
            let network = SingleLevel::new(&input.sensors, &input.points, limits)?;
            Ok(Box::new(network))
        }

        ModelKind::Multi => {
            let input: MultiLevelInput = serde_json::from_str(json).map_err(malformed)?;
            if input.sensors.is_empty() || input.points.is_empty() {
                return Err(err::InputError::Empty.into());
            }
            let network = MultiLevel::new(input.sensors, &input.points, input.levels, limits)?;
            Ok(Box::new(network))
        }
    }
}

/// Loads a network of the given kind from the JSON file at `path`.
///
/// Files with an `xz` extension are decompressed, if the `xz` feature is enabled.
pub fn load(path: &Path, kind: ModelKind, limits: Limits) -> Result<Box<dyn Network>, ErrorKind> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(err::InputError::NoFile(path.display().to_string()).into());
        }
        Err(e) => return Err(err::InputError::Read(e.to_string()).into()),
    };

    let mut json = String::default();
    match path.extension() {
        Some(extension) if extension == "xz" => read_xz(&file, &mut json)?,
        _ => {
            BufReader::new(&file)
                .read_to_string(&mut json)
                .map_err(|e| err::InputError::Read(e.to_string()))?;
        }
    };

    parse(&json, kind, limits)
}

#[cfg(feature = "xz")]
fn read_xz(file: &File, json: &mut String) -> Result<(), ErrorKind> {
    BufReader::new(xz2::read::XzDecoder::new(file))
        .read_to_string(json)
        .map_err(|e| err::InputError::Read(e.to_string()))?;
    Ok(())
}

#[cfg(not(feature = "xz"))]
fn read_xz(_: &File, _: &mut String) -> Result<(), ErrorKind> {
    Err(err::InputError::Compressed.into())
}
