//! Per-image `meta.ini` stores.
//!
//! The file is kept as raw lines, each with its own terminator, grouped by
//! section so that a rewrite only touches the `camera` section. Comments,
//! blank lines, key order, line endings and every other section are written
//! back exactly as read.

use super::CamRecord;
use crate::error::CamParamsError;
use crate::util;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Name of the metadata store inside every per-image directory.
pub const META_FILE_NAME: &str = "meta.ini";
pub const CAMERA_SECTION: &str = "camera";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
    name: String,
    /// The header line as read, e.g. `[camera]\n`.
    header: String,
    body: Vec<String>,
}

/// An INI document that preserves everything it does not modify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaStore {
    /// Lines before the first section header.
    preamble: Vec<String>,
    sections: Vec<Section>,
    /// Terminator used for lines this store writes itself.
    line_ending: &'static str,
}

impl Default for MetaStore {
    fn default() -> Self {
        MetaStore {
            preamble: Vec::new(),
            sections: Vec::new(),
            line_ending: "\n",
        }
    }
}

impl MetaStore {
    pub fn parse(contents: &str) -> Self {
        let mut store = MetaStore {
            line_ending: if contents.contains("\r\n") { "\r\n" } else { "\n" },
            ..MetaStore::default()
        };

        for line in contents.split_inclusive('\n') {
            if let Some(name) = section_name(line) {
                store.sections.push(Section {
                    name: name.to_string(),
                    header: line.to_string(),
                    body: Vec::new(),
                });
                continue;
            }
            match store.sections.last_mut() {
                Some(section) => section.body.push(line.to_string()),
                None => store.preamble.push(line.to_string()),
            }
        }

        store
    }

    /// Load `path`, or start an empty store if it does not exist yet.
    pub fn load(path: &Path) -> Result<Self, CamParamsError> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(MetaStore::parse(&contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(MetaStore::default()),
            Err(e) => Err(CamParamsError::io(path, e)),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), CamParamsError> {
        util::write_file_atomic(path, &self.render())
    }

    pub fn render(&self) -> String {
        self.preamble
            .iter()
            .chain(
                self.sections
                    .iter()
                    .flat_map(|s| std::iter::once(&s.header).chain(s.body.iter())),
            )
            .map(String::as_str)
            .collect()
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    /// Value of `key` in the first section called `section`.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.name == section)?
            .body
            .iter()
            .filter_map(|line| key_value(line))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// Replace the body of `section` with `entries`, or create the section.
    ///
    /// Blank lines that closed the old body are kept so the spacing before the
    /// next section does not change. Duplicate sections of the same name are
    /// dropped. A new section is placed before all existing ones. New lines
    /// use the line ending of the parsed file.
    pub fn replace_section(&mut self, section: &str, entries: &[(&str, String)]) {
        let eol = self.line_ending;
        let mut body: Vec<String> = entries
            .iter()
            .map(|(key, value)| format!("{key} = {value}{eol}"))
            .collect();

        match self.sections.iter().position(|s| s.name == section) {
            Some(pos) => {
                let old = &self.sections[pos].body;
                let trailing_blank = old.iter().rev().take_while(|l| l.trim().is_empty()).count();
                let unterminated = old.last().is_some_and(|l| !l.ends_with('\n'));
                body.extend(old[old.len() - trailing_blank..].iter().cloned());
                if unterminated && trailing_blank == 0 {
                    // keep a missing final newline missing
                    if let Some(last) = body.last_mut() {
                        last.truncate(last.len() - eol.len());
                    }
                }

                let target = &mut self.sections[pos];
                terminate(&mut target.header, eol);
                target.body = body;

                let mut idx = 0;
                self.sections.retain(|s| {
                    let keep = idx == pos || s.name != section;
                    idx += 1;
                    keep
                });
            }
            None => {
                if !self.sections.is_empty() {
                    body.push(eol.to_string());
                }
                if let Some(last) = self.preamble.last_mut() {
                    terminate(last, eol);
                }
                self.sections.insert(
                    0,
                    Section {
                        name: section.to_string(),
                        header: format!("[{section}]{eol}"),
                        body,
                    },
                );
            }
        }
    }
}

fn terminate(line: &mut String, eol: &str) {
    if !line.ends_with('\n') {
        line.push_str(eol);
    }
}

/// Entries of the `camera` section in the order they are written.
pub fn camera_entries(record: &CamRecord) -> Vec<(&'static str, String)> {
    let intrinsics = &record.intrinsics;
    vec![
        ("focal_length", util::format_value(intrinsics.focal_length)),
        ("pixel_aspect", util::format_value(intrinsics.pixel_aspect)),
        ("principal_point", util::join_values(&intrinsics.principal_point)),
        ("radial_distortion", util::join_values(&intrinsics.radial_distortion)),
        ("rotation", util::join_values(&record.rotation)),
        ("translation", util::join_values(&record.translation)),
    ]
}

/// Load the `meta.ini` of an existing per-image directory without changing it.
///
/// Returns the store path and its contents (empty if the file does not exist yet).
///
/// # Errors
///
/// * [`CamParamsError::Io`] if `view_dir` does not exist or the store cannot be read.
pub fn load_view_store(view_dir: &Path) -> Result<(PathBuf, MetaStore), CamParamsError> {
    if !view_dir.is_dir() {
        return Err(CamParamsError::io(
            view_dir,
            std::io::Error::new(ErrorKind::NotFound, "per-image directory does not exist"),
        ));
    }
    let path = view_dir.join(META_FILE_NAME);
    let store = MetaStore::load(&path)?;
    Ok((path, store))
}

/// Write `record` into the `meta.ini` of an existing per-image directory.
///
/// Returns the path of the rewritten store.
pub fn merge_camera_section(view_dir: &Path, record: &CamRecord) -> Result<PathBuf, CamParamsError> {
    let (path, mut store) = load_view_store(view_dir)?;
    store.replace_section(CAMERA_SECTION, &camera_entries(record));
    store.save(&path)?;
    Ok(path)
}

fn section_name(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .map(str::trim)
}

fn key_value(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    if trimmed.starts_with('#') || trimmed.starts_with(';') {
        return None;
    }
    let (key, value) = trimmed.split_once('=')?;
    Some((key.trim(), value.trim()))
}
