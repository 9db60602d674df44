pub mod verbosity;

use color_eyre::eyre::{eyre, ContextCompat, Report, Result, WrapErr};
use color_eyre::Help;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::path::Path;

/// Command arguments that are saved next to the results of a run as pretty JSON.
pub trait ArgsFile: Debug + DeserializeOwned + Serialize {
    /// Reads the arguments from a JSON file.
    fn read<P>(path: &P) -> Result<Self, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let input = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read arguments: {path:?}."))?;
        let args = serde_json::from_str(&input)
            .wrap_err_with(|| format!("Failed to deserialize arguments: {input}"))?;
        Ok(args)
    }

    /// Writes the arguments to a JSON file.
    fn write<P>(&self, path: &P) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        create_parent_dir(path)?;
        let output = serde_json::to_string_pretty(self)
            .wrap_err_with(|| format!("Failed to serialize arguments: {self:?}"))?;
        std::fs::write(path, output).wrap_err_with(|| format!("Failed to write arguments: {path:?}"))?;
        Ok(())
    }
}

/// Get delimiter based on file extension.
///
/// - `.tsv` => `\t`
/// - `.txt` => `\t`
/// - `.csv` => `,`
///
/// Note that `.txt` is assumed to be tab-delimited!
///
/// ```rust
/// use strainer::utils::get_delimiter;
///
/// assert_eq!(get_delimiter(&"filtered_SNVs.tsv")?, b'\t');
/// assert_eq!(get_delimiter(&"file.csv")?, b',');
/// assert_eq!(get_delimiter(&"scaffold_to_bin.txt")?, b'\t');
/// assert!(get_delimiter(&"file").is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn get_delimiter<P>(path: &P) -> Result<u8, Report>
where
    P: AsRef<Path> + Debug,
{
    let ext = path
        .as_ref()
        .extension()
        .wrap_err_with(|| format!("Failed to get file extension: {path:?}"))?
        .to_str()
        .wrap_err_with(|| format!("Failed to convert file extension to str: {path:?}"))?;
    match ext {
        "tsv" | "txt" => Ok(b'\t'),
        "csv" => Ok(b','),
        _ext => {
            Err(eyre!("Unknown file extension: {_ext:?}").suggestion("Options: tsv, csv, or txt"))
        }
    }
}

/// Create the parent directory of a file path, if it does not exist yet.
pub fn create_parent_dir<P>(path: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create directory: {parent:?}"))?;
        }
    }
    Ok(())
}

/// Create a directory (and its parents), if it does not exist yet.
pub fn create_dir<P>(path: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    std::fs::create_dir_all(path).wrap_err_with(|| format!("Failed to create directory: {path:?}"))
}

/// Returns the file name of a path as a [`str`].
pub fn file_name<P>(path: &P) -> Result<&str, Report>
where
    P: AsRef<Path> + Debug,
{
    path.as_ref()
        .file_name()
        .wrap_err_with(|| format!("Failed to get file name: {path:?}"))?
        .to_str()
        .wrap_err_with(|| format!("Failed to convert file name to str: {path:?}"))
}
