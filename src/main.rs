//! This module defines the main functionality of Shadowboard, a tracing station for tool shadow boards.

pub mod module; // Import the module submodule that contains other modules
use crate::module::define; // Import the define module that contains constants and types
use crate::module::error::{Result, StationError};
use crate::module::util::init::resource::init; // Import the resource initialization function

// The main function of Shadowboard
pub fn main() {
    if let Err(e) = start() {
        log::error!("{}", e);
        eprintln!("{}: {}", define::system::NAME, e);
        std::process::exit(1);
    }
}

fn start() -> Result<()> {
    // Prepare the resources by initializing the property struct
    let property = init()?;

    // Initialize the logging system with the data directory and the system name
    init_log(
        property.path.dir.data.as_str(),
        define::system::NAME,
        &property.conf.system.log_level,
    )?;
    log::info!("Starting Shadowboard..."); // Log an info message

    // Run the station until the operator quits
    module::station::run(property)
}

/// This function initializes the logger system using the log4rs crate.
///
/// # Arguments
/// * `dir` - A string slice that holds the directory where the log file will be stored
/// * `name` - A string slice that holds the name of the logger and the log file
/// * `level` - Root level name such as `INFO` or `DEBUG`; unknown names fall back to `INFO`
///
/// # Log Example
/// ```
/// log::debug!("Debug Message"); // Log a debug message
/// log::info!("Info Message"); // Log an info message
/// log::warn!("Warning Message"); // Log a warning message
/// log::error!("Error Message"); // Log an error message
/// ```
fn init_log(dir: &str, name: &str, level: &str) -> Result<()> {
    use crate::module::util::path::join; // Import the join function from the path module
    use log::LevelFilter; // Import the LevelFilter enum from the log crate
    use log4rs::append::file::FileAppender; // Import the FileAppender struct from the log4rs crate
    use log4rs::config::{Appender, Config, Root}; // Import the Appender, Config, and Root structs from the log4rs crate
    use log4rs::encode::pattern::PatternEncoder; // Import the PatternEncoder struct from the log4rs crate

    let level: LevelFilter = level.parse().unwrap_or(LevelFilter::Info);

    let logfile = FileAppender::builder() // Create a new FileAppender builder
        .encoder(Box::new(PatternEncoder::new(
            // Set the encoder to a new PatternEncoder with a custom format
            "{h({d} - {l}: {m}{n})}",
        )))
        .build(join(&[
            // Build the FileAppender with the joined path of the directory, the log directory, and the name
            dir,
            define::path::LOG_DIR,
            &format!("{}.log", name),
        ]))?;

    let config = Config::builder() // Create a new Config builder
        .appender(Appender::builder().build("logfile", Box::new(logfile))) // Add an appender with the name "logfile" and the FileAppender as a boxed trait object
        .build(Root::builder().appender("logfile").build(level)) // Build the Config with a Root that uses the "logfile" appender and the configured level
        .map_err(|e| StationError::Config(format!("log config: {}", e)))?;
    log4rs::init_config(config).map_err(|e| StationError::Config(format!("logger: {}", e)))?;
    Ok(())
}
