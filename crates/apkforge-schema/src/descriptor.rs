//! Build descriptor (`buildozer.spec`) model and text codec.
//!
//! The descriptor is an INI-style file of `key = value` lines. `#` and `;`
//! start comments, `[section]` headers are accepted but keys are read from
//! every section. List values are comma-separated.
//!
//! Parsing never fails because a key is missing: absent or empty required
//! keys fall back to [`BuildDescriptor::default`] and are reported in
//! [`ParsedDescriptor::defaulted`] so the verifier can warn about them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::PathBuf;
use thiserror::Error;

/// Descriptor keys.
pub mod keys {
    pub const TITLE: &str = "title";
    pub const PACKAGE_NAME: &str = "package.name";
    pub const PACKAGE_DOMAIN: &str = "package.domain";
    pub const SOURCE_MAIN: &str = "source.main";
    pub const REQUIREMENTS: &str = "requirements";
    pub const PERMISSIONS: &str = "permissions";
    pub const API: &str = "android.api";
    pub const MIN_API: &str = "android.minapi";
    pub const ARCHS: &str = "android.archs";
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("line {line}: expected `key = value`, found {content:?}")]
    MalformedLine { line: usize, content: String },

    #[error("{key} must be a positive integer, found {value:?}")]
    InvalidNumber { key: &'static str, value: String },
}

/// The four fields an operator is expected to edit by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RequiredField {
    Title,
    PackageName,
    PackageDomain,
    EntryPoint,
}

impl RequiredField {
    /// All required fields, in file order.
    pub const ALL: [Self; 4] = [
        Self::Title,
        Self::PackageName,
        Self::PackageDomain,
        Self::EntryPoint,
    ];

    /// Descriptor key backing this field.
    pub fn key(self) -> &'static str {
        match self {
            Self::Title => keys::TITLE,
            Self::PackageName => keys::PACKAGE_NAME,
            Self::PackageDomain => keys::PACKAGE_DOMAIN,
            Self::EntryPoint => keys::SOURCE_MAIN,
        }
    }
}

impl std::fmt::Display for RequiredField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Everything the packaging tool needs to know about the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDescriptor {
    pub title: String,
    pub package_name: String,
    pub package_domain: String,
    pub entry_point: PathBuf,
    pub requirements: Vec<String>,
    pub permissions: BTreeSet<String>,
    pub api_level: u32,
    pub min_api_level: u32,
    pub architectures: BTreeSet<String>,
}

impl Default for BuildDescriptor {
    fn default() -> Self {
        Self {
            title: "My Application".to_string(),
            package_name: "myapp".to_string(),
            package_domain: "org.example".to_string(),
            entry_point: PathBuf::from("main.py"),
            requirements: ["python3", "kivy", "requests"]
                .map(String::from)
                .to_vec(),
            permissions: ["INTERNET", "VIBRATE", "WAKE_LOCK", "FOREGROUND_SERVICE"]
                .map(String::from)
                .into(),
            api_level: 33,
            min_api_level: 21,
            architectures: ["arm64-v8a", "armeabi-v7a"].map(String::from).into(),
        }
    }
}

/// Result of parsing descriptor text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDescriptor {
    pub descriptor: BuildDescriptor,
    /// Required fields that were absent or empty and took their default.
    pub defaulted: Vec<RequiredField>,
}

impl BuildDescriptor {
    /// Java-style application identifier, e.g. `org.example.myapp`.
    pub fn application_id(&self) -> String {
        format!("{}.{}", self.package_domain, self.package_name)
    }

    /// Parse descriptor text, filling gaps from the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::MalformedLine`] for a non-comment line without
    /// `=` outside a list section, and [`DescriptorError::InvalidNumber`] when an API level is not a
    /// positive integer.
    pub fn parse(text: &str) -> Result<ParsedDescriptor, DescriptorError> {
        let entries = parse_entries(text)?;
        let mut descriptor = Self::default();
        let mut defaulted = Vec::new();

        let present = |key: &str| entries.get(key).filter(|v| !v.is_empty());

        for field in RequiredField::ALL {
            let Some(value) = present(field.key()) else {
                defaulted.push(field);
                continue;
            };
            match field {
                RequiredField::Title => descriptor.title.clone_from(value),
                RequiredField::PackageName => descriptor.package_name.clone_from(value),
                RequiredField::PackageDomain => descriptor.package_domain.clone_from(value),
                RequiredField::EntryPoint => descriptor.entry_point = PathBuf::from(value),
            }
        }

        if let Some(value) = present(keys::REQUIREMENTS) {
            descriptor.requirements = split_list(value).collect();
        }
        if let Some(value) = present(keys::PERMISSIONS) {
            descriptor.permissions = split_list(value).collect();
        }
        if let Some(value) = present(keys::ARCHS) {
            descriptor.architectures = split_list(value).collect();
        }
        if let Some(value) = present(keys::API) {
            descriptor.api_level = parse_level(keys::API, value)?;
        }
        if let Some(value) = present(keys::MIN_API) {
            descriptor.min_api_level = parse_level(keys::MIN_API, value)?;
        }

        Ok(ParsedDescriptor {
            descriptor,
            defaulted,
        })
    }

    /// Render as a commented descriptor file.
    pub fn render(&self) -> String {
        let mut out = String::from("[app]\n\n");
        let mut line = |comment: &str, key: &str, value: String| {
            let _ = writeln!(out, "# {comment}\n{key} = {value}\n");
        };

        line("(str) Title of your application", keys::TITLE, self.title.clone());
        line("(str) Package name", keys::PACKAGE_NAME, self.package_name.clone());
        line(
            "(str) Package domain (needed for android packaging)",
            keys::PACKAGE_DOMAIN,
            self.package_domain.clone(),
        );
        line(
            "(str) Main module of the application",
            keys::SOURCE_MAIN,
            self.entry_point.to_string_lossy().into_owned(),
        );
        line(
            "(list) Application requirements",
            keys::REQUIREMENTS,
            join_list(&self.requirements),
        );
        line(
            "(list) Android permissions",
            keys::PERMISSIONS,
            join_list(&self.permissions),
        );
        line("(int) Target Android API", keys::API, self.api_level.to_string());
        line(
            "(int) Minimum API your APK will support",
            keys::MIN_API,
            self.min_api_level.to_string(),
        );
        line(
            "(list) Architectures to build for",
            keys::ARCHS,
            join_list(&self.architectures),
        );

        out
    }
}

/// Collect `key = value` pairs; later duplicates win. Sections such as
/// `[app:source.exclude_patterns]` hold one list item per line and are not
/// settings, so their lines are skipped.
fn parse_entries(text: &str) -> Result<BTreeMap<String, String>, DescriptorError> {
    let mut entries = BTreeMap::new();
    let mut in_list_section = false;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            in_list_section = line[1..line.len() - 1].contains(':');
            continue;
        }
        if in_list_section {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| DescriptorError::MalformedLine {
                line: idx + 1,
                content: line.to_string(),
            })?;
        entries.insert(key.trim().to_string(), value.trim().to_string());
    }

    Ok(entries)
}

fn join_list<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn parse_level(key: &'static str, value: &str) -> Result<u32, DescriptorError> {
    value
        .parse::<u32>()
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| DescriptorError::InvalidNumber {
            key,
            value: value.to_string(),
        })
}
