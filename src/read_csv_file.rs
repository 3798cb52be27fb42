use anyhow::{anyhow, Context};
use csv::ReaderBuilder as CsvReaderBuilder;
use std::io::Read;

const COLUMN_DRIVER: &str = "x";
const COLUMN_RATIO: &str = "y";
const COLUMN_AIRMASS: &str = "airmass";
const COLUMN_TEMPERATURE: &str = "temperature"; // ambient temperature in degrees C
const COLUMN_DEMAND: &str = "demand"; // heat demand in kWh
const COLUMN_TEMP_HIGH: &str = "temp_high"; // sink temperature in degrees C
const COLUMN_TEMP_LOW: &str = "temp_low"; // source temperature in degrees C

/// Read the named columns of a headed CSV file as numbers, in the order asked for.
///
/// Columns not asked for are ignored. Surrounding whitespace in headers and values is trimmed.
pub fn read_columns<const N: usize>(
    file: impl Read,
    names: [&str; N],
) -> anyhow::Result<[Vec<f64>; N]> {
    let mut reader = CsvReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    let mut indices = [0usize; N];
    for (idx, name) in names.iter().enumerate() {
        indices[idx] = headers
            .iter()
            .position(|header| header == *name)
            .ok_or_else(|| anyhow!("column '{name}' not found in CSV headers {headers:?}"))?;
    }

    let mut columns: [Vec<f64>; N] = std::array::from_fn(|_| vec![]);
    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        // the header is line 1
        let line = row_idx + 2;
        for (column, (name, column_idx)) in columns.iter_mut().zip(names.iter().zip(indices)) {
            let field = record
                .get(column_idx)
                .ok_or_else(|| anyhow!("line {line} has no value for column '{name}'"))?;
            column.push(
                field
                    .parse()
                    .with_context(|| format!("line {line}: '{field}' in column '{name}' is not a number"))?,
            );
        }
    }

    Ok(columns)
}

/// (driver, ratio) samples for a two-segment fit.
pub fn read_samples(file: impl Read) -> anyhow::Result<(Vec<f64>, Vec<f64>)> {
    let [x, y] = read_columns(file, [COLUMN_DRIVER, COLUMN_RATIO])?;
    Ok((x, y))
}

/// Hourly airmass and temperature series to evaluate utilization factors at.
pub fn read_drivers(file: impl Read) -> anyhow::Result<(Vec<f64>, Vec<f64>)> {
    let [airmass, temperature] = read_columns(file, [COLUMN_AIRMASS, COLUMN_TEMPERATURE])?;
    Ok((airmass, temperature))
}

/// Hourly ambient temperature and heat demand.
pub fn read_heat_demand(file: impl Read) -> anyhow::Result<(Vec<f64>, Vec<f64>)> {
    let [temperature, demand] = read_columns(file, [COLUMN_TEMPERATURE, COLUMN_DEMAND])?;
    Ok((temperature, demand))
}

/// Sink and source temperatures of a heat pump or chiller.
pub fn read_cop_temperatures(file: impl Read) -> anyhow::Result<(Vec<f64>, Vec<f64>)> {
    let [temp_high, temp_low] = read_columns(file, [COLUMN_TEMP_HIGH, COLUMN_TEMP_LOW])?;
    Ok((temp_high, temp_low))
}
