use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Streams the lines of a text file.
///
/// Invalid UTF-8 is reported as an `InvalidData` error on the offending line.
pub(crate) fn read_lines<P: AsRef<Path>>(filename: P) -> io::Result<impl Iterator<Item = io::Result<String>>> {
	Ok(BufReader::new(File::open(filename)?).lines())
}

/// Path of the binary cache stored next to a corpus file.
///
/// Example:
/// `data/brown.txt` → `data/brown.bin`
pub(crate) fn cache_path<P: AsRef<Path>>(source: P) -> io::Result<PathBuf> {
	let source = source.as_ref();
	if source.file_stem().is_none() {
		return Err(io::Error::new(io::ErrorKind::InvalidInput, "Corpus path has no filename"));
	}
	Ok(source.with_extension("bin"))
}

/// Name of a corpus: its file name without extension.
///
/// `"./data/brown.txt"` → `"brown"`
pub(crate) fn corpus_name<P: AsRef<Path>>(source: P) -> io::Result<String> {
	source
		.as_ref()
		.file_stem()
		.map(|stem| stem.to_string_lossy().into_owned())
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Corpus path has no filename"))
}

/// Lists the files of `dir` with the given extension.
///
/// Returns file names only (no paths), sorted. Subdirectories are ignored.
pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
			continue;
		}
		if let Some(name) = path.file_name() {
			files.push(name.to_string_lossy().into_owned());
		}
	}

	files.sort();
	Ok(files)
}

/// Writes `contents` to `path`, creating missing parent directories.
pub fn write_report<P: AsRef<Path>>(path: P, contents: &str) -> io::Result<()> {
	let path = path.as_ref();
	if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
		fs::create_dir_all(parent)?;
	}
	fs::write(path, contents)
}
