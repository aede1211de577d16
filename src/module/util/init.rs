//! This module is responsible for preparing the resources needed by the application, such as directories, configurations, logs, etc.
//!

pub mod resource {
    use super::StationProperty;
    use crate::module::error::Result;

    /// Initialize the application resources and return a StationProperty instance containing paths and configurations.
    ///
    pub fn init() -> Result<StationProperty> {
        // Prepare the app data directory
        let paths = crate::module::util::path::dir::create_app_sub_dir()?;

        // Load the app configuration file
        let conf = crate::module::util::conf::toml::load(&paths.dir.data)?;

        Ok(StationProperty { path: paths, conf })
    }
}

/// This struct represents the properties of the app, such as paths and configurations.
///
#[derive(Debug, Clone)]
pub struct StationProperty {
    pub path: crate::module::util::path::StationPath, // The paths of the app resources
    pub conf: crate::module::util::conf::Config,      // The configurations of the app
}
