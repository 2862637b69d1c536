mod config;
pub mod logging;

pub use config::{
    DEFAULT_COPY_BATCH_SIZE, DEFAULT_LOAD_DATA_BATCH_SIZE, PROGRAM_LOG_LEVEL, PROGRAM_NAME,
};

pub use logging::init;
