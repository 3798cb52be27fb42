//! This module describes requests for ERA5 reanalysis weather data from the Copernicus
//! Climate Data Store (CDS). Sending the request is left to a `CdsClient` supplied by
//! the caller.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const ERA5_DATASET: &str = "reanalysis-era5-single-levels";
const DEFAULT_GRID: [f64; 2] = [0.25, 0.25];

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableSet {
    /// Irradiance, temperature and wind at 10m, as needed for PV feed-in
    Pvlib,
    /// Wind at 10m and 100m, roughness, pressure and temperature, as needed for wind feed-in
    Windpowerlib,
    /// Union of the two sets above
    Feedinlib,
}

impl VariableSet {
    fn cds_variables(&self) -> &'static [&'static str] {
        match self {
            VariableSet::Pvlib => &["fdir", "ssrd", "2t", "10u", "10v"],
            VariableSet::Windpowerlib => &["100u", "100v", "10u", "10v", "2t", "fsr", "sp"],
            VariableSet::Feedinlib => &[
                "100u", "100v", "fsr", "sp", "fdir", "ssrd", "2t", "10u", "10v",
            ],
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Era5Variable {
    Set(VariableSet),
    Explicit(Vec<String>),
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Era5Position {
    Point { latitude: f64, longitude: f64 },
    /// Bounds of a box, in either order
    Area {
        latitude: [f64; 2],
        longitude: [f64; 2],
    },
}

impl Era5Position {
    /// Area as `[north, west, south, east]`.
    fn area(&self) -> [f64; 4] {
        match *self {
            Era5Position::Point {
                latitude,
                longitude,
            } => [latitude, longitude, latitude, longitude],
            Era5Position::Area {
                latitude: [lat_a, lat_b],
                longitude: [lon_a, lon_b],
            } => [
                lat_a.max(lat_b),
                lon_a.min(lon_b),
                lat_a.min(lat_b),
                lon_a.max(lon_b),
            ],
        }
    }

    fn latitudes(&self) -> Vec<f64> {
        match *self {
            Era5Position::Point { latitude, .. } => vec![latitude],
            Era5Position::Area { latitude, .. } => latitude.to_vec(),
        }
    }

    fn longitudes(&self) -> Vec<f64> {
        match *self {
            Era5Position::Point { longitude, .. } => vec![longitude],
            Era5Position::Area { longitude, .. } => longitude.to_vec(),
        }
    }
}

/// Every option of an ERA5 download, spelled out.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Era5Request {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub variable: Era5Variable,
    pub position: Era5Position,
    /// Latitude and longitude resolution in degrees
    #[serde(default = "default_grid")]
    pub grid: [f64; 2],
    pub target_file: PathBuf,
    /// Chunk sizes per dimension for whoever opens the downloaded file
    #[serde(default)]
    pub chunks: Option<BTreeMap<String, usize>>,
}

fn default_grid() -> [f64; 2] {
    DEFAULT_GRID
}

impl Era5Request {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        variable: Era5Variable,
        position: Era5Position,
        target_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            start_date,
            end_date,
            variable,
            position,
            grid: DEFAULT_GRID,
            target_file: target_file.into(),
            chunks: None,
        }
    }

    pub fn validate(&self) -> Result<(), Era5RequestError> {
        if self.end_date < self.start_date {
            return Err(Era5RequestError::EndBeforeStart {
                start_date: self.start_date,
                end_date: self.end_date,
            });
        }
        if let Some(latitude) = self
            .position
            .latitudes()
            .into_iter()
            .find(|latitude| !(-90. ..=90.).contains(latitude))
        {
            return Err(Era5RequestError::LatitudeOutOfRange(latitude));
        }
        if let Some(longitude) = self
            .position
            .longitudes()
            .into_iter()
            .find(|longitude| !(-180. ..=180.).contains(longitude))
        {
            return Err(Era5RequestError::LongitudeOutOfRange(longitude));
        }
        if self.grid.iter().any(|step| !(*step > 0.)) {
            return Err(Era5RequestError::InvalidGrid(self.grid));
        }
        if let Era5Variable::Explicit(variables) = &self.variable {
            if variables.is_empty() {
                return Err(Era5RequestError::NoVariables);
            }
        }
        Ok(())
    }

    /// Body of the CDS request for the whole date span, every hour of each day.
    pub fn to_cds_request(&self) -> Result<Value, Era5RequestError> {
        self.validate()?;

        let variables: Vec<String> = match &self.variable {
            Era5Variable::Set(set) => set
                .cds_variables()
                .iter()
                .map(|variable| variable.to_string())
                .collect(),
            Era5Variable::Explicit(variables) => variables.clone(),
        };
        let times: Vec<String> = (0..24).map(|hour| format!("{hour:02}:00")).collect();

        Ok(json!({
            "product_type": "reanalysis",
            "format": "netcdf",
            "variable": variables,
            "date": format!(
                "{}/{}",
                self.start_date.format("%Y-%m-%d"),
                self.end_date.format("%Y-%m-%d")
            ),
            "time": times,
            "area": self.position.area(),
            "grid": self.grid,
        }))
    }

    /// Render the request and hand it to the client to download into `target_file`.
    pub fn retrieve(&self, client: &dyn CdsClient) -> anyhow::Result<()> {
        let request = self.to_cds_request()?;
        info!(
            target_file = %self.target_file.display(),
            "requesting ERA5 data from {} to {}",
            self.start_date,
            self.end_date
        );
        client.retrieve(ERA5_DATASET, &request, &self.target_file)
    }
}

/// Something able to submit a CDS request and store the result.
pub trait CdsClient {
    fn retrieve(&self, dataset: &str, request: &Value, target_file: &Path) -> anyhow::Result<()>;
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum Era5RequestError {
    #[error("End date {end_date} is before start date {start_date}")]
    EndBeforeStart {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    #[error("Latitude {0} is outside -90 to 90 degrees")]
    LatitudeOutOfRange(f64),
    #[error("Longitude {0} is outside -180 to 180 degrees")]
    LongitudeOutOfRange(f64),
    #[error("Grid resolution {0:?} must be positive")]
    InvalidGrid([f64; 2]),
    #[error("No variables were requested")]
    NoVariables,
}
