//! Physical constants and simulation defaults

/// Kilometres per degree of latitude
pub const KM_PER_DEGREE_LAT: f64 = 111.111;

/// Metres per second to kilometres per hour
pub const MS_TO_KMH: f64 = 3.6;

/// Sensor horizon at roughly 35,000 ft
pub const DEFAULT_COVERAGE_RADIUS_KM: f64 = 370.0;

/// Pressure level in hPa, approximately 9,000 m altitude
pub const DEFAULT_PRESSURE_LEVEL: u32 = 300;

/// Reanalysis wind data advances every 6 hours
pub const WIND_UPDATE_HOURS: u32 = 6;

/// Latitude points of the 2.5 degree reanalysis grid
pub const REANALYSIS_GRID_HEIGHT: usize = 73;

/// Longitude points of the 2.5 degree reanalysis grid
pub const REANALYSIS_GRID_WIDTH: usize = 144;
