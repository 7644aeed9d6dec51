//! Build descriptor verification.
//!
//! Nothing here blocks a build except a descriptor that cannot be parsed.
//! Missing keys, a missing file, and an unexpected entry point all become
//! warnings, and the packaging tool gets the final word.

use std::path::{Path, PathBuf};

use apkforge_schema::{BuildDescriptor, RequiredField};

use crate::config::Settings;
use crate::error::StageError;
use crate::Reporter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub descriptor: BuildDescriptor,
    pub path: PathBuf,
    /// The descriptor did not exist and a default one was written.
    pub created: bool,
    pub warnings: Vec<String>,
}

pub fn verify<R: Reporter + ?Sized>(
    project_dir: &Path,
    settings: &Settings,
    reporter: &R,
) -> Result<Verification, StageError> {
    let path = settings.descriptor_path(project_dir);
    let mut warnings = Vec::new();

    let (descriptor, created) = if path.exists() {
        let text = std::fs::read_to_string(&path)?;
        let parsed = BuildDescriptor::parse(&text)?;
        for field in &parsed.defaulted {
            warnings.push(format!(
                "{} has no {field}; using default {:?}",
                settings.descriptor_file,
                default_value(&parsed.descriptor, *field)
            ));
        }
        (parsed.descriptor, false)
    } else {
        let descriptor = BuildDescriptor::default();
        std::fs::write(&path, descriptor.render())?;
        let fields: Vec<&str> = RequiredField::ALL.iter().map(|f| f.key()).collect();
        warnings.push(format!(
            "Created {} with defaults; edit {} before releasing",
            path.display(),
            fields.join(", ")
        ));
        (descriptor, true)
    };

    let entry = &descriptor.entry_point;
    let entry_name = entry.file_name().and_then(std::ffi::OsStr::to_str).unwrap_or_default();
    if entry_name != settings.expected_main {
        warnings.push(format!(
            "source.main is {}, expected {}",
            entry.display(),
            settings.expected_main
        ));
    }
    if !project_dir.join(entry).is_file() {
        warnings.push(format!(
            "Entry point {} does not exist in {}",
            entry.display(),
            project_dir.display()
        ));
    }

    for warning in &warnings {
        tracing::warn!("{warning}");
        reporter.warning(warning);
    }

    Ok(Verification {
        descriptor,
        path,
        created,
        warnings,
    })
}

fn default_value(descriptor: &BuildDescriptor, field: RequiredField) -> String {
    match field {
        RequiredField::Title => descriptor.title.clone(),
        RequiredField::PackageName => descriptor.package_name.clone(),
        RequiredField::PackageDomain => descriptor.package_domain.clone(),
        RequiredField::EntryPoint => descriptor.entry_point.display().to_string(),
    }
}
