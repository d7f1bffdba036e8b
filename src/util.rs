use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Reads a text file, replacing invalid UTF-8 rather than failing on it.
/// Mirrored pages are not always cleanly encoded.
pub fn read_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    })
}

/// Replaces `dst` with a copy of the tree at `src` and returns the number of
/// files copied.
pub fn replace_tree(src: &Path, dst: &Path) -> io::Result<usize> {
    match fs::remove_dir_all(dst) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut copied = 0;
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry?;
        let relative = match entry.path().strip_prefix(src) {
            Ok(relative) => relative,
            Err(_) => continue, // every entry is beneath `src`
        };
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}
