/* ************************************************************************ **
** This file is part of mlwf, and is licensed under EITHER the MIT license  **
** or the Apache 2.0 license, at your option.                               **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
**                                                                          **
** Be aware that not all of mlwf is provided under this permissive license, **
** and that the project as a whole is licensed under the GPL 3.0.           **
** ************************************************************************ */

#[macro_use]
extern crate log;

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// An I/O error annotated with the operation and path that produced it.
#[derive(Debug, thiserror::Error)]
#[error("{action}: '{}'", .path.display())]
pub struct Error {
    action: &'static str,
    path: PathBuf,
    #[source]
    source: io::Error,
}

impl Error {
    pub fn path(&self) -> &Path { &self.path }
}

pub type Result<T> = std::result::Result<T, Error>;

trait ResultExt<T> {
    fn with_path(self, action: &'static str, path: &Path) -> Result<T>;
}

impl<T> ResultExt<T> for io::Result<T> {
    fn with_path(self, action: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| Error { action, path: path.to_owned(), source })
    }
}

/// Wrapper around `File::open` that adds context.
pub fn open<P: AsRef<Path>>(path: P) -> Result<File>
{
    let path = path.as_ref();
    File::open(path).with_path("while opening file", path)
}

/// Wrapper around `File::open` that adds context and makes a `BufReader`.
pub fn open_text<P: AsRef<Path>>(path: P) -> Result<BufReader<File>>
{ open(path).map(BufReader::new) }

/// Wrapper around `File::create` that adds context.
pub fn create<P: AsRef<Path>>(path: P) -> Result<File>
{
    let path = path.as_ref();
    File::create(path).with_path("could not create file", path)
}

/// Wrapper around `File::create` that adds context and makes a `BufWriter`.
pub fn create_text<P: AsRef<Path>>(path: P) -> Result<BufWriter<File>>
{ create(path).map(BufWriter::new) }

/// Wrapper around `std::fs::create_dir_all` that adds context.
///
/// Succeeds without doing anything if the directory already exists.
pub fn create_dir_all<P: AsRef<Path>>(dir: P) -> Result<()>
{
    let dir = dir.as_ref();
    if dir.is_dir() {
        trace!("directory already exists: '{}'", dir.display());
        return Ok(());
    }
    fs::create_dir_all(dir).with_path("could not create directory", dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn errors_mention_the_path() {
        let tmp = tempdir::TempDir::new("mlwf-fs-util").unwrap();
        let missing = tmp.path().join("does-not-exist.json");
        let err = open(&missing).unwrap_err();
        assert_eq!(err.path(), missing.as_path());
        assert!(err.to_string().contains("does-not-exist.json"));
    }

    #[test]
    fn create_then_open() {
        let tmp = tempdir::TempDir::new("mlwf-fs-util").unwrap();
        let dir = tmp.path().join("a").join("b");
        create_dir_all(&dir).unwrap();
        create_dir_all(&dir).unwrap();

        let path = dir.join("file.txt");
        write!(create_text(&path).unwrap(), "hello").unwrap();

        let mut s = String::new();
        open_text(&path).unwrap().read_to_string(&mut s).unwrap();
        assert_eq!(s, "hello");
    }
}
