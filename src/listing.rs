//! Directory listing for `ls`.
//!
//! The sorted entries are split in two halves that are examined on two scoped
//! threads; the halves are joined in order before the summary is built.

use crate::style::{self, BLUE, GREEN, RED};
use std::fs::{self, DirEntry, Metadata};
use std::io;
use std::path::Path;
use std::thread;

/// Rendered entries of one directory plus their counts.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Listing {
    pub lines: Vec<String>,
    pub files: usize,
    pub dirs: usize,
}

impl Listing {
    fn append(&mut self, other: Listing) {
        self.lines.extend(other.lines);
        self.files += other.files;
        self.dirs += other.dirs;
    }

    /// The full `ls` output with a header naming `title`.
    pub fn render(&self, title: &str) -> String {
        let mut out = format!("\n -- {title} --\n\n");
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&format!(
            "\n - Files: {}\n - Directories: {}\n",
            self.files, self.dirs
        ));
        out
    }
}

/// Metadata of the entry's target, or of the link itself when the target is gone.
fn entry_metadata(entry: &DirEntry) -> Option<Metadata> {
    fs::metadata(entry.path()).or_else(|_| entry.metadata()).ok()
}

fn scan_half(entries: &[DirEntry], extension: Option<&str>) -> Listing {
    let mut listing = Listing::default();
    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        if extension.is_some_and(|ext| !name.ends_with(ext)) {
            continue;
        }
        let Some(meta) = entry_metadata(entry) else {
            tracing::debug!(%name, "skipping entry without metadata");
            continue;
        };
        let date = meta
            .modified()
            .map(style::format_date)
            .unwrap_or_else(|_| " ".repeat(11));

        if meta.is_file() {
            listing.files += 1;
            listing.lines.push(format!(
                "{} File: {}{}",
                style::paint(&date, GREEN),
                style::paint(&format!("{:>9} ", style::format_size(meta.len())), RED),
                style::paint(&name, BLUE)
            ));
        } else if meta.is_dir() {
            listing.dirs += 1;
            listing.lines.push(format!(
                "{} Dir:            {}",
                style::paint(&date, GREEN),
                style::paint(&name, BLUE)
            ));
        }
    }
    listing
}

/// Scans `entries[..split]` and `entries[split..]` concurrently.
pub fn scan_partitioned(entries: &[DirEntry], split: usize, extension: Option<&str>) -> Listing {
    let (first, second) = entries.split_at(split.min(entries.len()));
    thread::scope(|scope| {
        let first = scope.spawn(|| scan_half(first, extension));
        let second = scope.spawn(|| scan_half(second, extension));

        let mut listing = first
            .join()
            .unwrap_or_else(|payload| std::panic::resume_unwind(payload));
        listing.append(
            second
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload)),
        );
        listing
    })
}

/// Lists `dir`, keeping only names that end with `extension` when given.
pub fn list_directory(dir: &Path, extension: Option<&str>) -> io::Result<Listing> {
    let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(DirEntry::file_name);
    tracing::debug!(dir = %dir.display(), entries = entries.len(), "listing directory");
    Ok(scan_partitioned(&entries, entries.len() / 2, extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;

    fn temp_dir(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "pangsh_listing_{}_{}_{}",
            tag,
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn populate(dir: &Path) {
        for name in ["a.rs", "b.txt", "c.rs", "d.md", "e.rs"] {
            let mut f = File::create(dir.join(name)).unwrap();
            f.write_all(b"hello").unwrap();
        }
        for name in ["src", "target", "docs.rs"] {
            fs::create_dir(dir.join(name)).unwrap();
        }
    }

    #[test]
    fn test_counts_are_exact_for_every_split() {
        let dir = temp_dir("split");
        populate(&dir);

        let mut entries = fs::read_dir(&dir)
            .unwrap()
            .collect::<io::Result<Vec<_>>>()
            .unwrap();
        entries.sort_by_key(DirEntry::file_name);

        let whole = scan_partitioned(&entries, 0, None);
        for split in 0..=entries.len() {
            let listing = scan_partitioned(&entries, split, None);
            assert_eq!((listing.files, listing.dirs), (5, 3), "split at {split}");
            assert_eq!(listing.lines, whole.lines, "order changed at split {split}");
        }
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_extension_filter() {
        let dir = temp_dir("ext");
        populate(&dir);

        let listing = list_directory(&dir, Some(".rs")).unwrap();
        assert_eq!((listing.files, listing.dirs), (3, 1));
        assert!(listing.lines.iter().any(|l| l.contains("docs.rs")));
        assert!(!listing.lines.iter().any(|l| l.contains("b.txt")));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_render_summary() {
        let dir = temp_dir("render");
        populate(&dir);

        let text = list_directory(&dir, None).unwrap().render("~/proj");
        assert!(text.starts_with("\n -- ~/proj --\n\n"));
        assert!(text.ends_with("\n - Files: 5\n - Directories: 3\n"));
        assert!(text.contains(" File: "));
        assert!(text.contains("5.0 b"));
        assert!(text.contains(" Dir:            "));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_empty_directory() {
        let dir = temp_dir("empty");
        let listing = list_directory(&dir, None).unwrap();
        assert_eq!(listing, Listing::default());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = temp_dir("missing").join("nope");
        assert!(list_directory(&dir, None).is_err());
    }
}
