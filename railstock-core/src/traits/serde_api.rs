use crate::imports::*;
use std::fs::File;
use std::str::FromStr;

pub trait Init {
    /// Validates configuration and sets up derived fields. Components owning
    /// other `Init` components propagate the call.
    fn init(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

impl<T: Init> Init for Vec<T> {
    fn init(&mut self) -> Result<(), Error> {
        self.iter_mut().try_for_each(|x| x.init())
    }
}

/// Text formats accepted for component configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl FromStr for ConfigFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('.').to_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(Error::SerdeError(format!(
                "unsupported config format {other:?}, expected yaml or json"
            ))),
        }
    }
}

impl ConfigFormat {
    /// Format implied by the extension of `path`
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| Error::SerdeError(format!("no file extension on {path:?}")))?
            .parse()
    }
}

/// Configuration I/O for components. Deserialized values run [Init] unless
/// `skip_init` is set.
pub trait SerdeAPI: Serialize + for<'a> Deserialize<'a> + Init {
    fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(&self)?)
    }

    fn from_yaml<S: AsRef<str>>(yaml_str: S, skip_init: bool) -> anyhow::Result<Self> {
        let mut de: Self = serde_yaml::from_str(yaml_str.as_ref())?;
        if !skip_init {
            de.init()?;
        }
        Ok(de)
    }

    fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(&self)?)
    }

    fn from_json<S: AsRef<str>>(json_str: S, skip_init: bool) -> anyhow::Result<Self> {
        let mut de: Self = serde_json::from_str(json_str.as_ref())?;
        if !skip_init {
            de.init()?;
        }
        Ok(de)
    }

    /// Writes a configuration file, picking the format from the extension
    fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let file = File::create(path).with_context(|| format!("could not create {path:?}"))?;
        match format {
            ConfigFormat::Yaml => serde_yaml::to_writer(file, self)?,
            ConfigFormat::Json => serde_json::to_writer_pretty(file, self)?,
        }
        Ok(())
    }

    /// Reads a configuration file, picking the format from the extension
    fn from_file<P: AsRef<Path>>(path: P, skip_init: bool) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let file = File::open(path).with_context(|| format!("could not open {path:?}"))?;
        let mut de: Self = match format {
            ConfigFormat::Yaml => serde_yaml::from_reader(file)?,
            ConfigFormat::Json => serde_json::from_reader(file)?,
        };
        if !skip_init {
            de.init().with_context(|| format!("invalid config in {path:?}"))?;
        }
        Ok(de)
    }
}

impl<T: SerdeAPI> SerdeAPI for Vec<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consist::locomotive::powertrain::axle::Axle;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("loco/engine.YML")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("axle.json")).unwrap(),
            ConfigFormat::Json
        );
        assert!(ConfigFormat::from_path(Path::new("axle.bin")).is_err());
        assert!(ConfigFormat::from_path(Path::new("axle")).is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let axle = Axle::default();
        for name in ["axle.yaml", "axle.json"] {
            let path = dir.path().join(name);
            axle.to_file(&path).unwrap();
            assert_eq!(Axle::from_file(&path, false).unwrap(), axle);
        }
        assert!(Axle::from_file(dir.path().join("missing.yaml"), false).is_err());
    }

    #[test]
    fn test_init_runs_on_load() {
        let mut axle = Axle::default();
        let yaml = axle.to_yaml().unwrap();
        assert!(Axle::from_yaml(&yaml, false).is_ok());
        axle.transmission_efficiency = 1.5;
        let bad = axle.to_yaml().unwrap();
        assert!(Axle::from_yaml(&bad, false).is_err());
        assert!(Axle::from_yaml(&bad, true).is_ok());
    }
}
