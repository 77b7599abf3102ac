use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::debug;
use regex::Regex;

use crate::constants::DPKG_RUNTIME_DIR;
use crate::packaging::{Bundle, PackageError, PackageResolver};
use crate::report::{CrashReport, ReportParser};

const INSTALLED: &str = "install ok installed";

/// Reads the dpkg database directly instead of running `dpkg-query`.
///
/// File ownership comes from `<runtime_dir>/info/*.list`, package metadata
/// from the stanzas of `<runtime_dir>/status`.
#[derive(Debug, Clone)]
pub struct DpkgResolver {
    runtime_dir: PathBuf,
}

impl Default for DpkgResolver {
    fn default() -> Self {
        DpkgResolver::new(DPKG_RUNTIME_DIR)
    }
}

impl DpkgResolver {
    pub fn new(runtime_dir: impl Into<PathBuf>) -> Self {
        DpkgResolver {
            runtime_dir: runtime_dir.into(),
        }
    }

    /// Native architecture of the system, the first line of `<runtime_dir>/arch`
    pub fn architecture(&self) -> Result<String, PackageError> {
        let path = self.runtime_dir.join("arch");
        let content = fs::read_to_string(&path).map_err(|source| PackageError::Io {
            path: path.clone(),
            source,
        })?;

        match content.lines().next().map(str::trim) {
            Some(arch) if !arch.is_empty() => Ok(arch.to_string()),
            _ => Err(PackageError::MissingArchitecture { path }),
        }
    }

    /// Names of the packages listing a file that matches `pattern`
    pub fn packages_owning(&self, pattern: &str) -> Result<Vec<String>, PackageError> {
        let matcher = glob_to_regex(pattern)?;
        let info = self.runtime_dir.join("info");

        let entries = fs::read_dir(&info).map_err(|source| PackageError::Io {
            path: info.clone(),
            source,
        })?;
        let mut lists: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().map_or(false, |ext| ext == "list"))
            .collect();
        lists.sort();

        let mut packages = Vec::new();
        for list in lists {
            let content = match fs::read_to_string(&list) {
                Ok(content) => content,
                Err(e) => {
                    debug!("Skipping {}: {}", list.display(), e);
                    continue;
                }
            };

            if !content.lines().any(|line| matcher.is_match(line)) {
                continue;
            }
            if let Some(name) = package_name(&list) {
                if !packages.contains(&name) {
                    packages.push(name);
                }
            }
        }

        Ok(packages)
    }

    /// Metadata of the installed package `name`, if any.
    ///
    /// A stanza without an `Architecture` field takes the native one.
    pub fn show(&self, name: &str) -> Result<Option<Bundle>, PackageError> {
        let path = self.runtime_dir.join("status");
        let file = File::open(&path).map_err(|source| PackageError::Io {
            path: path.clone(),
            source,
        })?;

        let parser = ReportParser::default();
        let mut reader = BufReader::new(file);
        while let Some(stanza) = parser.parse_next(&mut reader)? {
            if stanza.first("Package") == Some(name) && stanza.first("Status") == Some(INSTALLED) {
                let mut found = bundle(&stanza);
                if found.architecture.is_empty() {
                    found.architecture = self.architecture()?;
                }
                return Ok(Some(found));
            }
        }

        Ok(None)
    }
}

impl PackageResolver for DpkgResolver {
    fn resolve(&self, pattern: &str) -> Result<Vec<Bundle>, PackageError> {
        let mut bundles = Vec::new();
        for name in self.packages_owning(pattern)? {
            match self.show(&name) {
                Ok(Some(bundle)) => bundles.push(bundle),
                Ok(None) => debug!("Package {} is not installed", name),
                Err(e) => debug!("Failed to look up package {}: {}", name, e),
            }
        }
        Ok(bundles)
    }
}

fn bundle(stanza: &CrashReport) -> Bundle {
    let field = |name: &str| stanza.first(name).unwrap_or_default().to_string();
    Bundle {
        name: field("Package"),
        version: field("Version"),
        architecture: field("Architecture"),
    }
}

/// `info/libc6:amd64.list` -> `libc6`
fn package_name(list: &Path) -> Option<String> {
    let stem = list.file_stem()?.to_str()?;
    let name = stem.split(':').next()?;
    (!name.is_empty()).then(|| name.to_string())
}

/// Translate a shell glob into an anchored regex.
///
/// Wildcards never cross a `/`.
fn glob_to_regex(pattern: &str) -> Result<Regex, PackageError> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str("[^/]*"),
            '?' => expr.push_str("[^/]"),
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    expr.push('$');

    Regex::new(&expr).map_err(|e| PackageError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}
