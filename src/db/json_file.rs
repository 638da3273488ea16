use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

use log::{error, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

#[derive(Debug)]
pub enum LoadError {
    Io(io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for LoadError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(fmt, "io: {e}"),
            Self::Parse(e) => write!(fmt, "parse: {e}"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Reads a store file holding a JSON array. A missing file is an empty store.
pub fn read<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, LoadError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("{path:?} doesn't exist, starting empty");
            return Ok(vec![]);
        }
        Err(e) => {
            error!("open {path:?}: {e:?}");
            return Err(LoadError::Io(e));
        }
    };

    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        error!("parse {path:?}: {e}");
        LoadError::Parse(e)
    })
}

pub fn write<T: Serialize>(path: &Path, items: &[T]) -> Result<(), io::Error> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    let mut output = BufWriter::new(file);

    let mut ser = serde_json::Serializer::with_formatter(&mut output, PrettyFormatter::with_indent(b"\t"));
    items.serialize(&mut ser)?;
    writeln!(output)?;
    output.flush()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let items: Vec<String> = read(&dir.path().join("nope.json")).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        let r = read::<String>(&path);
        assert!(matches!(r, Err(LoadError::Parse(_))));
    }

    #[test]
    fn writes_tab_indented_and_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("items.json");

        write(&path, &["a".to_string(), "b".to_string()]).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "[\n\t\"a\",\n\t\"b\"\n]\n");
        assert_eq!(read::<String>(&path).unwrap(), ["a", "b"]);
    }
}
