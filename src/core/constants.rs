//! Deployment defaults and numeric limits

use std::time::Duration;

/// Signal strength expected at 1 meter from the transmitter (dBm)
pub const DEFAULT_RSSI_AT_1M: f64 = -45.0;

/// Path loss exponent for light obstacles (trees, light urban)
pub const DEFAULT_PATH_LOSS_EXPONENT: f64 = 3.0;

/// Recommended path loss exponent range (open space .. heavy indoor)
pub const PATH_LOSS_EXPONENT_RANGE: (f64, f64) = (2.0, 4.0);

/// Minimum number of distinct stations for an unambiguous 2-D fix
pub const MIN_STATIONS: usize = 3;

/// Default number of distinct station readings that completes a cycle
pub const DEFAULT_QUORUM: usize = MIN_STATIONS;

/// Inactivity after which an incomplete cycle is discarded
pub const DEFAULT_CYCLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded wait for a single transport receive
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(50);

/// Sleep between iterations of a station loop
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Transmitter beacon period
pub const DEFAULT_BEACON_INTERVAL: Duration = Duration::from_secs(2);

/// Base stagger between a relay hearing a beacon and reporting it
pub const DEFAULT_REPORT_DELAY: Duration = Duration::from_millis(500);

/// Smallest reciprocal condition number of the row-normalized linear system
/// accepted by the solver. Below this the station layout is treated as collinear.
pub const DEFAULT_MIN_GEOMETRY_CONDITIONING: f64 = 1e-3;

/// Wire protocol field delimiter
pub const FIELD_DELIMITER: char = ':';
