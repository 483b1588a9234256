use crate::{
    errors::Error,
    recompress::{Backend, Recompressor, MAX_LEVEL},
};
use serde::{
    de::{value::StrDeserializer, IntoDeserializer},
    Deserialize,
};
use std::collections::HashMap;

#[derive(Debug, PartialEq, Eq)]
pub struct Config {
    pub recompressor: Recompressor,
    /// When false, generated images are stored as the encoder wrote them.
    pub recompress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recompressor: Recompressor::default(),
            recompress: true,
        }
    }
}

impl Config {
    pub fn from_ini(ini: &str) -> Result<Self, Error> {
        let data: HashMap<String, HashMap<String, String>> =
            serde_ini::from_str(ini).map_err(|e| Error::Config(e.to_string()))?;
        let mut result = Self::default();
        for (section, pairs) in data {
            match section.as_str() {
                "recompress" => {
                    for (key, value) in pairs {
                        result.set_recompress(&key, &value)?;
                    }
                }
                _ => {
                    return Err(Error::Config(format!("unexpected section [{section}]")));
                }
            }
        }
        Ok(result)
    }

    fn set_recompress(&mut self, key: &str, value: &str) -> Result<(), Error> {
        match key {
            "backend" => {
                let value: StrDeserializer<'_, serde::de::value::Error> =
                    value.trim().into_deserializer();
                self.recompressor.backend =
                    Backend::deserialize(value).map_err(|e| Error::Config(format!("backend: {e}")))?;
            }
            "level" => {
                self.recompressor.level = value
                    .trim()
                    .parse()
                    .ok()
                    .filter(|&level| level <= MAX_LEVEL)
                    .ok_or_else(|| {
                        Error::Config(format!("level must be 0 to {MAX_LEVEL}, not {value:?}"))
                    })?;
            }
            "program" => self.recompressor.program = value.trim().to_string(),
            "args" => {
                self.recompressor.args = value.split_whitespace().map(str::to_string).collect();
            }
            "enabled" => {
                self.recompress = value.trim().parse().map_err(|_| {
                    Error::Config(format!("enabled must be true or false, not {value:?}"))
                })?;
            }
            _ => return Err(Error::Config(format!("unexpected key {key:?} in [recompress]"))),
        }
        Ok(())
    }
}
