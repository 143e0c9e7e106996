//! Plot artifact paths and metadata
//!
//! Rendering is left to the caller. A plot type only decides where the
//! image goes and what is recorded next to it:
//! ```text
//! {root}/{plot_type}/{stem}.png
//! {root}/{plot_type}/metadata/{stem}.json
//! ```

use crate::error::Result;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Files written by [`PlotType::save`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlotArtifact {
    pub image_path: PathBuf,
    pub metadata_path: PathBuf,
}

/// A kind of plot with its own file naming and metadata
pub trait PlotType {
    /// Directory name under the image root, e.g. `summary_map`
    fn plot_type(&self) -> &'static str;

    /// File name without extension
    fn file_stem(&self) -> String;

    /// Metadata fields other than `plot_type` and `filepath`
    fn fields(&self) -> Map<String, Value>;

    /// Full metadata record, as written to the JSON file
    fn metadata(&self) -> Value {
        let mut metadata = Map::new();
        metadata.insert("plot_type".to_string(), json!(self.plot_type()));
        metadata.extend(self.fields());
        metadata.insert(
            "filepath".to_string(),
            json!(format!("{}.png", self.file_stem())),
        );
        Value::Object(metadata)
    }

    fn image_path(&self, root: &Path) -> PathBuf {
        root.join(self.plot_type())
            .join(format!("{}.png", self.file_stem()))
    }

    fn metadata_path(&self, root: &Path) -> PathBuf {
        root.join(self.plot_type())
            .join("metadata")
            .join(format!("{}.json", self.file_stem()))
    }

    /// Write already-rendered PNG bytes and the metadata JSON under `root`
    fn save(&self, png: &[u8], root: &Path) -> Result<PlotArtifact> {
        let artifact = PlotArtifact {
            image_path: self.image_path(root),
            metadata_path: self.metadata_path(root),
        };
        for path in [&artifact.image_path, &artifact.metadata_path] {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(&artifact.image_path, png)?;
        let file = fs::File::create(&artifact.metadata_path)?;
        serde_json::to_writer(file, &self.metadata())?;
        debug!("Saved plot {}", artifact.image_path.display());
        Ok(artifact)
    }
}

/// Map of one variable at one date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryMap {
    pub varname: String,
    pub casename: String,
    pub date: String,
    pub apply_log10: bool,
}

impl SummaryMap {
    pub fn new(
        varname: impl Into<String>,
        casename: impl Into<String>,
        date: impl Into<String>,
        apply_log10: bool,
    ) -> Self {
        Self {
            varname: varname.into(),
            casename: casename.into(),
            date: date.into(),
            apply_log10,
        }
    }
}

impl PlotType for SummaryMap {
    fn plot_type(&self) -> &'static str {
        "summary_map"
    }

    fn file_stem(&self) -> String {
        let log_str = if self.apply_log10 { ".log10" } else { "" };
        format!("{}.{}.{}{}", self.varname, self.casename, self.date, log_str)
    }

    fn fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("varname".to_string(), json!(self.varname));
        fields.insert("casename".to_string(), json!(self.casename));
        fields.insert("date".to_string(), json!(self.date));
        fields.insert("apply_log10".to_string(), json!(self.apply_log10));
        fields
    }
}

/// Line plot of one variable over a date range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeriesPlot {
    pub varname: String,
    pub casename: String,
    pub start_date: String,
    pub end_date: String,
}

impl TimeSeriesPlot {
    pub fn new(
        varname: impl Into<String>,
        casename: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            varname: varname.into(),
            casename: casename.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }
}

impl PlotType for TimeSeriesPlot {
    fn plot_type(&self) -> &'static str {
        "time_series"
    }

    fn file_stem(&self) -> String {
        format!(
            "{}.{}.{}_{}",
            self.varname, self.casename, self.start_date, self.end_date
        )
    }

    fn fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("varname".to_string(), json!(self.varname));
        fields.insert("casename".to_string(), json!(self.casename));
        fields.insert("time_period".to_string(), json!(format!("{}_{}", self.start_date, self.end_date)));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_summary_map_paths() {
        let plot = SummaryMap::new("FG_CO2", "c1", "0001-01-01", false);
        assert_eq!(plot.file_stem(), "FG_CO2.c1.0001-01-01");
        let log_plot = SummaryMap::new("FG_CO2", "c1", "0001-01-01", true);
        assert_eq!(log_plot.file_stem(), "FG_CO2.c1.0001-01-01.log10");

        let root = Path::new("images");
        assert_eq!(
            plot.image_path(root),
            PathBuf::from("images/summary_map/FG_CO2.c1.0001-01-01.png")
        );
        assert_eq!(
            plot.metadata_path(root),
            PathBuf::from("images/summary_map/metadata/FG_CO2.c1.0001-01-01.json")
        );
    }

    #[test]
    fn test_time_series_stem() {
        let plot = TimeSeriesPlot::new("POC_FLUX_100m", "c1", "0001", "0061");
        assert_eq!(plot.file_stem(), "POC_FLUX_100m.c1.0001_0061");
        assert_eq!(plot.metadata()["plot_type"], "time_series");
    }

    #[test]
    fn test_save_writes_image_and_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let plot = SummaryMap::new("PO4", "c1", "0003-02-01", true);
        let artifact = plot.save(b"\x89PNG", temp_dir.path()).unwrap();

        assert_eq!(fs::read(&artifact.image_path).unwrap(), b"\x89PNG");
        let metadata: Value =
            serde_json::from_str(&fs::read_to_string(&artifact.metadata_path).unwrap()).unwrap();
        assert_eq!(metadata["filepath"], "PO4.c1.0003-02-01.log10.png");
        assert_eq!(metadata["plot_type"], "summary_map");
        assert_eq!(metadata["apply_log10"], true);
        assert_eq!(metadata["date"], "0003-02-01");
    }
}
