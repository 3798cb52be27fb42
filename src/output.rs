use anyhow::anyhow;
use csv::WriterBuilder;
use formatx::formatx;
use std::fmt::Debug;
use std::fs::File;
use std::io;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

pub trait Output: Debug {
    fn writer_for_location_key(
        &self,
        location_key: &str,
        file_extension: &str,
    ) -> anyhow::Result<impl Write>;
    /// Whether this output can be considered a no-op and therefore that any code that only writes to the output can be skipped.
    fn is_noop(&self) -> bool {
        false
    }
}

/// Writes each location key to its own file in a directory, named by a template with
/// two placeholders: the location key and the file extension.
#[derive(Debug)]
pub struct FileOutput {
    directory_path: PathBuf,
    file_template: String,
}

impl FileOutput {
    pub fn new(directory_path: PathBuf, file_template: String) -> Self {
        Self {
            directory_path,
            file_template,
        }
    }
}

impl Output for FileOutput {
    fn writer_for_location_key(
        &self,
        location_key: &str,
        file_extension: &str,
    ) -> anyhow::Result<impl Write> {
        let file_name = formatx!(&self.file_template, location_key, file_extension)
            .map_err(|err| anyhow!("invalid output file template: {err:?}"))?;
        Ok(BufWriter::new(File::create(
            self.directory_path.join(file_name),
        )?))
    }
}

impl Output for &FileOutput {
    fn writer_for_location_key(
        &self,
        location_key: &str,
        file_extension: &str,
    ) -> anyhow::Result<impl Write> {
        <FileOutput as Output>::writer_for_location_key(self, location_key, file_extension)
    }
}

/// An output that goes to nowhere/ a "sink"/ /dev/null.
#[derive(Debug, Default)]
pub struct SinkOutput;

impl Output for SinkOutput {
    fn writer_for_location_key(
        &self,
        _location_key: &str,
        _file_extension: &str,
    ) -> anyhow::Result<impl Write> {
        Ok(io::sink())
    }

    fn is_noop(&self) -> bool {
        true
    }
}

/// Write equal-length columns to CSV under the given location key, one heading per column.
pub(crate) fn write_columns_file(
    output: &impl Output,
    location_key: &str,
    headings: &[&str],
    columns: &[&[f64]],
) -> anyhow::Result<()> {
    if output.is_noop() {
        return Ok(());
    }
    if headings.len() != columns.len() {
        anyhow::bail!(
            "{} headings were given for {} columns",
            headings.len(),
            columns.len()
        );
    }
    let rows = columns.first().map_or(0, |column| column.len());
    if columns.iter().any(|column| column.len() != rows) {
        anyhow::bail!("columns written to {location_key} differ in length");
    }

    let writer = output.writer_for_location_key(location_key, "csv")?;
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(headings)?;
    for t_idx in 0..rows {
        writer.write_record(columns.iter().map(|column| column[t_idx].to_string()))?;
    }
    writer.flush()?;

    Ok(())
}

/// Write a JSON document under the given location key.
pub(crate) fn write_json_file(
    output: &impl Output,
    location_key: &str,
    value: &impl serde::Serialize,
) -> anyhow::Result<()> {
    if output.is_noop() {
        return Ok(());
    }
    let mut writer = output.writer_for_location_key(location_key, "json")?;
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;

    Ok(())
}
