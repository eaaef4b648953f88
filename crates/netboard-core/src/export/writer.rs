// Export files: two workbooks (daily and hourly sums) and a raw JSON dump.
//
// Rows are appended one device at a time. The JSON array is streamed to
// disk as devices arrive; the workbooks are written when the export
// finishes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use netboard_api::TimeseriesSample;
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use serde_json::Value;
use tracing::debug;

use super::ExportWindow;
use super::aggregate::{Buckets, Granularity, aggregate};
use crate::error::CoreError;

pub const DAILY_SHEET: &str = "APs-day-to-day";
pub const HOURLY_SHEET: &str = "APs-hour-by-hour";
/// Bucket columns a sheet can hold: Excel's 16,384 minus the name column.
pub const MAX_HOURLY_COLUMNS: u16 = 16_383;

fn xlsx_error(e: XlsxError) -> CoreError {
    CoreError::Export {
        message: e.to_string(),
    }
}

/// Paths of the files one export produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFiles {
    pub json: PathBuf,
    pub daily: PathBuf,
    pub hourly: PathBuf,
}

impl ExportFiles {
    pub fn in_dir(dir: &Path, key: &str, window: &ExportWindow) -> Self {
        let tag = window.tag();
        Self {
            json: dir.join(format!("{key}-data-hourly-{tag}.json")),
            daily: dir.join(format!("energy-data-daily-{tag}.xlsx")),
            hourly: dir.join(format!("energy-data-hourly-{tag}.xlsx")),
        }
    }
}

/// One sheet with a fixed set of bucket columns.
struct SheetWriter {
    sheet: Worksheet,
    granularity: Granularity,
    columns: Vec<i64>,
    next_row: u32,
}

impl SheetWriter {
    fn new(name: &str, granularity: Granularity, window: &ExportWindow) -> Result<Self, CoreError> {
        let mut sheet = Worksheet::new();
        sheet.set_name(name).map_err(xlsx_error)?;
        let columns = granularity.buckets(window.start_ms, window.end_ms);

        sheet.write_string(0, 0, "AP").map_err(xlsx_error)?;
        for (i, bucket) in columns.iter().enumerate() {
            sheet
                .write_string(0, column(i)?, granularity.label(*bucket))
                .map_err(xlsx_error)?;
        }
        Ok(Self {
            sheet,
            granularity,
            columns,
            next_row: 1,
        })
    }

    fn append(&mut self, device: &str, samples: &[TimeseriesSample]) -> Result<(), CoreError> {
        let sums: Buckets = aggregate(samples, self.granularity);
        let row = self.next_row;
        self.sheet.write_string(row, 0, device).map_err(xlsx_error)?;
        for (i, bucket) in self.columns.iter().enumerate() {
            if let Some(sum) = sums.get(bucket) {
                self.sheet
                    .write_number(row, column(i)?, *sum)
                    .map_err(xlsx_error)?;
            }
        }
        self.next_row += 1;
        Ok(())
    }

    fn save(self, path: &Path) -> Result<(), CoreError> {
        let mut workbook = Workbook::new();
        workbook.push_worksheet(self.sheet);
        workbook.save(path).map_err(xlsx_error)
    }
}

/// Column index of the `i`-th bucket (column 0 is the device name).
fn column(i: usize) -> Result<u16, CoreError> {
    u16::try_from(i + 1).map_err(|_| CoreError::Export {
        message: format!("too many columns ({})", i + 1),
    })
}

/// Accumulates per-device rows across all three outputs.
pub struct ExportWriter {
    files: ExportFiles,
    json: BufWriter<File>,
    wrote_json_entry: bool,
    daily: SheetWriter,
    hourly: SheetWriter,
    rows: usize,
}

impl ExportWriter {
    /// Create the JSON file and prepare both sheets.
    pub fn create(files: ExportFiles, window: &ExportWindow) -> Result<Self, CoreError> {
        let file = File::create(&files.json).map_err(|e| CoreError::io(&files.json, e))?;
        let mut json = BufWriter::new(file);
        json.write_all(b"[").map_err(|e| CoreError::io(&files.json, e))?;

        Ok(Self {
            daily: SheetWriter::new(DAILY_SHEET, Granularity::Day, window)?,
            hourly: SheetWriter::new(HOURLY_SHEET, Granularity::Hour, window)?,
            files,
            json,
            wrote_json_entry: false,
            rows: 0,
        })
    }

    /// Append one device to every output.
    pub fn add_device(&mut self, device: &str, samples: &[TimeseriesSample]) -> Result<(), CoreError> {
        let path = &self.files.json;
        let raw = serde_json::to_value(samples).map_err(|e| CoreError::Export {
            message: format!("cannot serialize samples of {device}: {e}"),
        })?;
        let mut entry = serde_json::Map::new();
        entry.insert(device.to_owned(), raw);
        if self.wrote_json_entry {
            self.json.write_all(b",").map_err(|e| CoreError::io(path, e))?;
        }
        serde_json::to_writer(&mut self.json, &Value::Object(entry)).map_err(|e| {
            CoreError::Export {
                message: format!("cannot write {}: {e}", path.display()),
            }
        })?;
        self.json.flush().map_err(|e| CoreError::io(path, e))?;
        self.wrote_json_entry = true;

        self.daily.append(device, samples)?;
        self.hourly.append(device, samples)?;
        self.rows += 1;
        debug!(device, rows = self.rows, "export row written");
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Close the JSON array and save both workbooks.
    pub fn finish(mut self) -> Result<ExportFiles, CoreError> {
        let path = &self.files.json;
        self.json.write_all(b"]").map_err(|e| CoreError::io(path, e))?;
        self.json.flush().map_err(|e| CoreError::io(path, e))?;
        self.daily.save(&self.files.daily)?;
        self.hourly.save(&self.files.hourly)?;
        Ok(self.files)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_names_carry_window_tag() {
        let files = ExportFiles::in_dir(Path::new("/out"), "PoE", &ExportWindow::default());
        assert_eq!(
            files.json,
            Path::new("/out/PoE-data-hourly-20230405T140000-20230419T140000.json")
        );
        assert_eq!(
            files.daily,
            Path::new("/out/energy-data-daily-20230405T140000-20230419T140000.xlsx")
        );
        assert_eq!(
            files.hourly,
            Path::new("/out/energy-data-hourly-20230405T140000-20230419T140000.xlsx")
        );
    }

    #[test]
    fn writes_valid_json_array_and_workbooks() {
        let tmp = tempfile::tempdir().unwrap();
        let window = ExportWindow::default();
        let files = ExportFiles::in_dir(tmp.path(), "PoE", &window);
        let mut writer = ExportWriter::create(files, &window).unwrap();

        let samples = vec![TimeseriesSample {
            ts: window.start_ms,
            value: json!("4.5"),
        }];
        writer.add_device("AP1", &samples).unwrap();
        writer.add_device("AP2", &samples).unwrap();
        assert_eq!(writer.rows(), 2);
        let files = writer.finish().unwrap();

        let dumped: Value =
            serde_json::from_str(&std::fs::read_to_string(&files.json).unwrap()).unwrap();
        assert_eq!(dumped.as_array().unwrap().len(), 2);
        assert_eq!(dumped[1]["AP2"][0]["value"], "4.5");
        assert!(files.daily.exists());
        assert!(files.hourly.exists());
    }
}
