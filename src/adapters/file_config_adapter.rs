//! Backtest settings read from INI files.

use crate::domain::error::TatraderError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    ini: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TatraderError> {
        let path = path.as_ref();
        let mut ini = Ini::new();
        ini.load(path).map_err(|reason| TatraderError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        tracing::debug!(path = %path.display(), sections = ini.sections().len(), "loaded config");
        Ok(Self { ini })
    }

    pub fn from_string(content: &str) -> Result<Self, TatraderError> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|reason| TatraderError::ConfigParse {
                file: "<inline>".into(),
                reason,
            })?;
        Ok(Self { ini })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.ini
            .get(section, key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        match self.ini.getfloat(section, key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(reason) => {
                tracing::warn!(section, key, %reason, "ignoring non-numeric config value");
                default
            }
        }
    }

    fn has_section(&self, section: &str) -> bool {
        // configparser lowercases section names on read
        let wanted = section.to_lowercase();
        self.ini.sections().iter().any(|s| *s == wanted)
    }
}
