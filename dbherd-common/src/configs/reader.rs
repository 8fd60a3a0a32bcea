use super::validation::Validatable;
use crate::error::Error;
use serde::Deserialize;
use std::{fs::read_to_string, path::Path};

pub struct YamlConfig {}

impl YamlConfig {
    pub fn read(filename: impl AsRef<Path>) -> Result<String, Error> {
        let filename = filename.as_ref();
        read_to_string(filename).map_err(|e| {
            debug!("error on file opening: {}", e);
            Error::config(format!("can't open {}: {}", filename.display(), e))
        })
    }

    pub fn parse<T>(config: &str) -> Result<T, Error>
    where
        T: for<'de> Deserialize<'de> + Validatable,
    {
        serde_yaml::from_str(config).map_err(|e| {
            debug!("error on yaml parsing: {}", e);
            Error::config(format!("error on yaml parsing: {}", e))
        })
    }

    /// Reads, parses and validates a config file.
    pub fn get<T>(filename: impl AsRef<Path>) -> Result<T, Error>
    where
        T: for<'de> Deserialize<'de> + Validatable,
    {
        let file = Self::read(filename)?;
        Self::get_from_string(&file)
    }

    pub fn get_from_string<T>(config: &str) -> Result<T, Error>
    where
        T: for<'de> Deserialize<'de> + Validatable,
    {
        let config: T = Self::parse(config)?;
        config.validate().map_err(|e| {
            debug!("config is not valid: {}", e);
            Error::config(format!("config is not valid: {}", e))
        })?;
        Ok(config)
    }
}
