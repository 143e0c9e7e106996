//! Application constants for the case tools
//!
//! Fixed tables used throughout the crate: log markers, directory names of the
//! CESM archive layout, the default stream table and job-submission defaults.

// =============================================================================
// Log files
// =============================================================================

/// Date marker in the driver log (`cesm.log.*`)
pub const CESM_DATE_MARKER: &str = "model date =";

/// Date marker in the coupler log (`cpl.log.*`)
pub const CPL_DATE_MARKER: &str = "tStamp";

/// Length of the `YYYYMMDD` token that follows a date marker
pub const LOG_DATE_TOKEN_LEN: usize = 8;

/// Subdirectory of an archive root holding logs
pub const LOGS_DIR_NAME: &str = "logs";

/// Extension of compressed (archived) logs
pub const GZIP_EXTENSION: &str = "gz";

/// Prefix of the MARBL carbonate-chemistry solver warning
pub const CO2CALC_WARNING_PREFIX: &str =
    "MARBL WARNING (marbl_co2calc_mod:drtsafe): (marbl_co2calc_mod:drtsafe) it = ";

/// Default number of solver iterations reported by `co2calc_warning_counts`
pub const DEFAULT_CO2CALC_MAX_IT: usize = 4;

// =============================================================================
// NetCDF layout
// =============================================================================

/// Subdirectory of `{root}/{comp}` holding history files
pub const HIST_DIR_NAME: &str = "hist";

/// Path from `{root}/{comp}` to the time-series tree
pub const TSERIES_DIR_PARTS: &[&str] = &["proc", "tseries"];

/// NetCDF file extension
pub const NETCDF_EXTENSION: &str = "nc";

// =============================================================================
// Dataset assembly
// =============================================================================

/// Name of the time dimension and coordinate
pub const TIME_NAME: &str = "time";

/// Variables kept alongside requested variables when assembling datasets
pub const DEFAULT_VARS_TO_KEEP: &[&str] = &["time_bound", "TAREA"];

/// Bounds variables ignored when comparing time series with history files
pub const TIME_BOUNDS_NAMES: &[&str] = &["time_bound", "time_bounds"];

/// Dataset-level encoding keys copied from the first opened file
pub const DATASET_ENCODING_KEYS: &[&str] = &["unlimited_dims"];

/// Time-variable encoding keys copied from the first opened file
pub const TIME_ENCODING_KEYS: &[&str] = &["dtype", "_FillValue", "units", "calendar"];

/// Units used when averaging decoded time bounds
pub const MIDPOINT_TIME_UNITS: &str = "days since 0001-01-01";

/// Calendar assumed when a dataset does not declare one
pub const DEFAULT_CALENDAR: &str = "noleap";

/// Default year range of `gen_dataset`
pub const DEFAULT_START_YEAR: i32 = 1;
pub const DEFAULT_END_YEAR: i32 = 61;

// =============================================================================
// Job submission
// =============================================================================

/// Default batch scheduler executable
pub const DEFAULT_SCHEDULER: &str = "sbatch";

/// Default case suffix passed to reshaping scripts
pub const DEFAULT_CASE_SUFFIX: &str = "004";

/// Reshaping scripts submitted when none are given
pub const DEFAULT_SCRIPTS: &[&str] = &[
    "pop.h_t13.sh",
    "pop.h.nday1_t13.sh",
    "cice.h_t13.sh",
    "pop.h.nyear1_t13.sh",
    "cice.h1_t13.sh",
];

// =============================================================================
// Paths
// =============================================================================

/// Application directory name under the user config dir
pub const APP_DIR_NAME: &str = "cesm-case-tools";

/// Config file name inside `APP_DIR_NAME`
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Default scratch filesystem root
pub const DEFAULT_SCRATCH_ROOT: &str = "/glade/scratch";

/// Default archive directory name under `{scratch}/{user}`
pub const DEFAULT_ARCHIVE_DIRNAME: &str = "archive";

