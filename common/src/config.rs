//! This is the `ConfigFile` struct.
//!
//! This is for finding the right default locations for the configuration file of a given tool.
//! This is a configuration file/struct neutral loading engine, storing only the base directory
//! and with `load()` read the proper file or fall back to the default values.
//!
//! This encapsulates the configuration, available with `.inner()` or `.into_inner()`.
//!

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use eyre::{eyre, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

use crate::makepath;

/// Config filename
const CONFIG: &str = "config.hcl";

/// Every configuration struct carries a version number so we can refuse older files.
///
pub trait Versioned {
    /// Version of the file format this binary understands.
    const VERSION: usize;

    /// Version found in the loaded file.
    fn version(&self) -> usize;

    /// Reject values the format allows but the tool can not work with.
    ///
    fn check(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
pub struct ConfigFile<T: Debug + DeserializeOwned + Default + Versioned> {
    /// Tag is the project name.
    tag: String,
    /// This is the base directory for all files.
    basedir: PathBuf,
    inner: T,
}

impl<T> ConfigFile<T>
where
    T: Debug + DeserializeOwned + Default + Versioned,
{
    #[tracing::instrument]
    fn new(tag: &str) -> Result<Self> {
        let basedir: PathBuf = match BaseDirs::new() {
            Some(base) => {
                #[cfg(unix)]
                let base = base.home_dir().join(".config");

                #[cfg(windows)]
                let base = base.data_local_dir().to_path_buf();

                debug!("base = {base:?}");
                makepath!(base, tag)
            }
            None => {
                #[cfg(unix)]
                let homedir = std::env::var("HOME")
                    .map_err(|_| eyre!("No HOME variable defined, can not continue"))?;

                #[cfg(windows)]
                let homedir = std::env::var("LOCALAPPDATA")
                    .map_err(|_| eyre!("No LOCALAPPDATA variable defined, can not continue"))?;

                debug!("base = {homedir}");

                #[cfg(unix)]
                let base: PathBuf = makepath!(homedir, ".config", tag);

                #[cfg(windows)]
                let base: PathBuf = makepath!(homedir, tag);

                base
            }
        };
        Ok(ConfigFile {
            tag: String::from(tag),
            basedir,
            inner: T::default(),
        })
    }

    /// Returns the path of the default config directory
    ///
    pub fn config_path(&self) -> PathBuf {
        self.basedir.clone()
    }

    /// Returns the path of the default config file
    ///
    pub fn default_file(&self) -> PathBuf {
        let cfg = self.config_path().join(CONFIG);
        debug!("default = {cfg:?}");
        cfg
    }

    /// Load the file and return a struct T in the right format.
    ///
    /// Use the following search path:
    /// - file specified on CLI, which must exist
    /// - default basedir (base on $HOME or $LOCALAPPDATA), built-in defaults if absent
    ///
    #[tracing::instrument]
    pub fn load(tag: &str, fname: Option<&Path>) -> Result<ConfigFile<T>> {
        let mut cfg = ConfigFile::<T>::new(tag)?;

        let fname = match fname {
            Some(fname) => {
                if !fname.exists() {
                    return Err(eyre!("Unknown config file {:?}", fname));
                }
                fname.to_path_buf()
            }
            None => {
                let def = cfg.default_file();
                if !def.exists() {
                    warn!("No config file in {:?}, using defaults", def);
                    return Ok(cfg);
                }
                def
            }
        };

        trace!("Loading config file {fname:?} for {}", cfg.tag);

        let data = fs::read_to_string(&fname)?;
        cfg.inner = Self::parse(&data)?;
        Ok(cfg)
    }

    /// Parse HCL text, check the version then the values.
    ///
    pub fn parse(data: &str) -> Result<T> {
        let data: T = hcl::from_str(data)?;
        debug!("struct data = {data:?}");

        if data.version() != T::VERSION {
            return Err(eyre!(
                "Bad config file version v{}, need v{}",
                data.version(),
                T::VERSION
            ));
        }
        data.check()?;
        Ok(data)
    }

    /// Return the inner configuration
    ///
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Consume the file and return the configuration
    ///
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Default, Deserialize)]
    struct Foo {
        version: usize,
        #[serde(default)]
        site: BTreeMap<String, Bar>,
    }

    #[derive(Debug, Default, Deserialize)]
    struct Bar {
        name: Option<String>,
    }

    impl Versioned for Foo {
        const VERSION: usize = 2;

        fn version(&self) -> usize {
            self.version
        }

        fn check(&self) -> Result<()> {
            if self.site.values().any(|s| s.name.as_deref() == Some("")) {
                return Err(eyre!("empty site name"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_config_parse() -> Result<()> {
        let data = r##"
version = 2
site "foo" {
  name = "bar"
}
site "baz" {}
"##;
        let cfg = ConfigFile::<Foo>::parse(data)?;
        assert_eq!(2, cfg.site.len());
        assert_eq!(Some("bar".to_string()), cfg.site["foo"].name);
        assert!(cfg.site["baz"].name.is_none());
        Ok(())
    }

    #[test]
    fn test_config_bad_version() {
        let r = ConfigFile::<Foo>::parse("version = 1");
        assert!(r.is_err());
    }

    #[test]
    fn test_config_check() {
        let data = r##"
version = 2
site "foo" {
  name = ""
}
"##;
        let r = ConfigFile::<Foo>::parse(data);
        assert!(r.is_err());
    }

    #[test]
    fn test_config_missing_file() {
        let r = ConfigFile::<Foo>::load("deplist-test", Some(Path::new("/nonexistent/foo.hcl")));
        assert!(r.is_err());
    }

    #[test]
    fn test_config_default_path() -> Result<()> {
        let cfg = ConfigFile::<Foo>::new("deplist-test")?;
        assert!(cfg.default_file().ends_with("deplist-test/config.hcl"));
        Ok(())
    }
}
