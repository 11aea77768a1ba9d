//! Writes derived tables to disk for the rendering layer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::pipeline::DerivedTables;
use filmviews_cli::{CompressionFormat, OutputFormat};

#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    pub format: OutputFormat,
    pub compression: Option<CompressionFormat>,
}

impl ExportOptions {
    /// `name.csv`, `name.json.gz`, ...
    pub fn file_name(&self, name: &str, extension: &str) -> String {
        match self.compression {
            Some(c) => format!("{}.{}.{}", name, extension, c.extension()),
            None => format!("{}.{}", name, extension),
        }
    }
}

/// Open `path`, hand the (possibly compressing) writer to `write`, then finish the
/// encoder and flush so write errors surface here instead of being lost on drop.
fn with_writer<F>(path: &Path, compression: Option<CompressionFormat>, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let file = BufWriter::new(File::create(path)?);
    match compression {
        Some(CompressionFormat::Gzip) => {
            let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            write(&mut encoder)?;
            encoder.finish()?.flush()?;
        }
        Some(CompressionFormat::Zstd) => {
            let mut encoder = zstd::Encoder::new(file, 0)?;
            write(&mut encoder)?;
            encoder.finish()?.flush()?;
        }
        None => {
            let mut writer = file;
            write(&mut writer)?;
            writer.flush()?;
        }
    }
    Ok(())
}

/// Write one frame in the configured format.
pub fn write_frame(df: &mut DataFrame, path: &Path, options: &ExportOptions) -> Result<()> {
    with_writer(path, options.compression, |writer| {
        match options.format {
            OutputFormat::Csv => {
                CsvWriter::new(writer).include_header(true).finish(df)?;
            }
            OutputFormat::Json => {
                JsonWriter::new(writer)
                    .with_json_format(JsonFormat::Json)
                    .finish(df)?;
            }
        }
        Ok(())
    })
}

/// Serialize `value` as pretty JSON. Non-finite floats become `null`.
pub fn write_json<T: Serialize>(
    value: &T,
    path: &Path,
    compression: Option<CompressionFormat>,
) -> Result<()> {
    with_writer(path, compression, |writer| {
        serde_json::to_writer_pretty(writer, value)?;
        Ok(())
    })
}

/// Write every derived table into `dir` (created if needed), plus `heatmap.json` and
/// `correlation.json` carrying the matrices with their axes. Returns the written paths.
pub fn export_tables(
    derived: &DerivedTables,
    dir: &Path,
    options: &ExportOptions,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    for (name, mut df) in derived.named_frames()? {
        let path = dir.join(options.file_name(name, options.format.extension()));
        write_frame(&mut df, &path, options)?;
        debug!(path = %path.display(), rows = df.height(), "wrote table");
        written.push(path);
    }

    let heatmap_path = dir.join(options.file_name("heatmap", "json"));
    write_json(&derived.heatmap, &heatmap_path, options.compression)?;
    written.push(heatmap_path);

    let correlation_path = dir.join(options.file_name("correlation", "json"));
    write_json(&derived.correlation, &correlation_path, options.compression)?;
    written.push(correlation_path);

    info!(
        dir = %dir.display(),
        files = written.len(),
        format = options.format.as_str(),
        "exported derived tables"
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_file_names() {
        let plain = ExportOptions::default();
        assert_eq!(plain.file_name("heatmap", "csv"), "heatmap.csv");
        let gz = ExportOptions {
            format: OutputFormat::Json,
            compression: Some(CompressionFormat::Gzip),
        };
        assert_eq!(gz.file_name("heatmap", "json"), "heatmap.json.gz");
    }

    #[test]
    fn test_write_frame_csv_and_gzip() {
        let dir = TempDir::new().unwrap();
        let mut df = df!("Category" => &["Drama", "Comedy"], "Views" => &[3_i64, 1]).unwrap();

        let csv_path = dir.path().join("t.csv");
        write_frame(&mut df, &csv_path, &ExportOptions::default()).unwrap();
        let text = std::fs::read_to_string(&csv_path).unwrap();
        assert!(text.starts_with("Category,Views"));
        assert!(text.contains("Drama,3"));

        let gz_path = dir.path().join("t.csv.gz");
        let options = ExportOptions {
            format: OutputFormat::Csv,
            compression: Some(CompressionFormat::Gzip),
        };
        write_frame(&mut df, &gz_path, &options).unwrap();
        let mut decoded = String::new();
        flate2::read::GzDecoder::new(File::open(&gz_path).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, text);
    }

    #[test]
    fn test_write_json_zstd_is_complete() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("v.json.zst");
        let rows: Vec<i64> = (0..2_000).collect();
        write_json(&rows, &path, Some(CompressionFormat::Zstd)).unwrap();

        let decoded = zstd::stream::decode_all(File::open(&path).unwrap()).unwrap();
        let value: Vec<i64> = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(value, rows);
    }

    #[test]
    fn test_write_json_nan_is_null() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("v.json");
        write_json(&vec![1.0_f64, f64::NAN], &path, None).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!([1.0, null]));
    }
}
