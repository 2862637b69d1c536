pub const PROGRAM_NAME: &str = "fleetload";
pub const PROGRAM_LOG_LEVEL: &str = "FLEETLOAD_LOG_LEVEL";

/// Flush threshold for `COPY ... FROM STDIN` payloads.
/// The server streams COPY input, so a smaller batch keeps latency low.
pub const DEFAULT_COPY_BATCH_SIZE: u64 = 10 * 1_024 * 1_024;

/// Flush threshold for `LOAD DATA LOCAL INFILE` payloads.
/// Each statement has a fixed round-trip cost, so batches are larger.
pub const DEFAULT_LOAD_DATA_BATCH_SIZE: u64 = 50 * 1_024 * 1_024;
