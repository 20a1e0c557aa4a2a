//! Generic parameters functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable (SUB_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot load the parameter file {0:?}: {1}")]
    FileLoadError(PathBuf, std::io::Error),

    #[error("Cannot read the parameter file {0:?}: {1}")]
    DeserialiseError(PathBuf, toml::de::Error)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
///
/// Relative paths are resolved against the `$SUB_SW_ROOT/params` directory,
/// absolute paths are used as they are.
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned
{
    let path = resolve(param_file_path)?;

    // Load the file into a string
    let params_str = read_to_string(&path)
        .map_err(|e| LoadError::FileLoadError(path.clone(), e))?;

    // Parse the string into the parameter struct
    toml::from_str(params_str.as_str())
        .map_err(|e| LoadError::DeserialiseError(path, e))
}

/// Get the full path to a parameter file.
pub fn resolve(param_file_path: &str) -> Result<PathBuf, LoadError> {
    if Path::new(param_file_path).is_absolute() {
        return Ok(PathBuf::from(param_file_path))
    }

    let mut path = crate::host::get_sub_sw_root()
        .map_err(|_| LoadError::SwRootNotSet)?;
    path.push("params");
    path.push(param_file_path);

    Ok(path)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct TestParams {
        period_s: f64,
        name: String
    }

    #[test]
    fn test_load_absolute() {
        let mut path = std::env::temp_dir();
        path.push(format!("util_params_test_{}.toml", std::process::id()));
        std::fs::write(&path, "period_s = 0.05\nname = \"nav\"\n").unwrap();

        let p: TestParams = load(path.to_str().unwrap()).unwrap();
        assert_eq!(p, TestParams { period_s: 0.05, name: "nav".into() });

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_bad_file() {
        let mut path = std::env::temp_dir();
        path.push(format!("util_params_bad_{}.toml", std::process::id()));
        std::fs::write(&path, "period_s = \"fast\"\n").unwrap();

        match load::<TestParams>(path.to_str().unwrap()) {
            Err(LoadError::DeserialiseError(p, _)) => assert_eq!(p, path),
            other => panic!("Expected a deserialise error, got {:?}", other)
        }

        std::fs::remove_file(&path).ok();
    }
}
