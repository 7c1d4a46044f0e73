//! Root-level detection of version-pinning files and package managers.
//!
//! Detection never fails: a missing directory or an unreadable file is the
//! same as the file not being there.

use crate::io::read_optional;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

// ---------------------------------------------------------------------------
// RuntimeKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeKind {
    Node,
    Python,
    Java,
    Ruby,
    Go,
}

impl RuntimeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeKind::Node => "node",
            RuntimeKind::Python => "python",
            RuntimeKind::Java => "java",
            RuntimeKind::Ruby => "ruby",
            RuntimeKind::Go => "go",
        }
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Version files in detection order.
pub const VERSION_FILES: &[(&str, RuntimeKind)] = &[
    (".nvmrc", RuntimeKind::Node),
    (".node-version", RuntimeKind::Node),
    (".python-version", RuntimeKind::Python),
    (".java-version", RuntimeKind::Java),
    (".ruby-version", RuntimeKind::Ruby),
    (".go-version", RuntimeKind::Go),
];

// ---------------------------------------------------------------------------
// PackageManagerKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageManagerKind {
    Npm,
    Yarn,
    Pnpm,
    Pip,
    Poetry,
    Bundler,
    Go,
}

impl PackageManagerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PackageManagerKind::Npm => "npm",
            PackageManagerKind::Yarn => "yarn",
            PackageManagerKind::Pnpm => "pnpm",
            PackageManagerKind::Pip => "pip",
            PackageManagerKind::Poetry => "poetry",
            PackageManagerKind::Bundler => "bundler",
            PackageManagerKind::Go => "go",
        }
    }
}

impl fmt::Display for PackageManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Detected facts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionFile {
    #[serde(rename = "type")]
    pub kind: RuntimeKind,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManagerDescriptor {
    #[serde(rename = "type")]
    pub kind: PackageManagerKind,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lockfile: Option<String>,
}

impl PackageManagerDescriptor {
    /// Shell command that installs this project's dependencies.
    pub fn install_command(&self) -> String {
        match self.kind {
            PackageManagerKind::Npm if self.lockfile.is_some() => "npm ci".to_string(),
            PackageManagerKind::Npm => "npm install".to_string(),
            PackageManagerKind::Yarn => "yarn install --frozen-lockfile".to_string(),
            PackageManagerKind::Pnpm => "pnpm install --frozen-lockfile".to_string(),
            PackageManagerKind::Pip => format!("pip install -r {}", self.filename),
            PackageManagerKind::Poetry => "poetry install".to_string(),
            PackageManagerKind::Bundler => "bundle install".to_string(),
            PackageManagerKind::Go => "go mod download".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedEnvironment {
    pub has_mise_config: bool,
    pub version_files: Vec<VersionFile>,
    pub package_managers: Vec<PackageManagerDescriptor>,
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

pub fn detect(dir: &Path) -> DetectedEnvironment {
    let has_mise_config = dir.join(paths::MISE_CONFIG).is_file();

    let mut version_files = Vec::new();
    for (filename, kind) in VERSION_FILES {
        let path = dir.join(filename);
        if !path.is_file() {
            continue;
        }
        let Some(content) = read_optional(&path) else {
            continue;
        };
        let trimmed = content.trim();
        let version = (!trimmed.is_empty()).then(|| trimmed.to_string());
        debug!(file = %filename, kind = %kind, version = ?version, "detected version file");
        version_files.push(VersionFile {
            kind: *kind,
            filename: filename.to_string(),
            version,
        });
    }

    let package_managers = detect_package_managers(dir);
    for pm in &package_managers {
        debug!(manager = %pm.kind, manifest = %pm.filename, "detected package manager");
    }

    DetectedEnvironment {
        has_mise_config,
        version_files,
        package_managers,
    }
}

fn detect_package_managers(dir: &Path) -> Vec<PackageManagerDescriptor> {
    let exists = |name: &str| dir.join(name).is_file();
    let descriptor = |kind, filename: &str, lockfile: Option<&str>| PackageManagerDescriptor {
        kind,
        filename: filename.to_string(),
        lockfile: lockfile.map(str::to_string),
    };

    let mut found = Vec::new();

    if exists("package.json") {
        let node = [
            ("pnpm-lock.yaml", PackageManagerKind::Pnpm),
            ("yarn.lock", PackageManagerKind::Yarn),
            ("package-lock.json", PackageManagerKind::Npm),
        ]
        .into_iter()
        .find(|(lock, _)| exists(lock));
        found.push(match node {
            Some((lock, kind)) => descriptor(kind, "package.json", Some(lock)),
            None => descriptor(PackageManagerKind::Npm, "package.json", None),
        });
    }

    if exists("pyproject.toml") && exists("poetry.lock") {
        found.push(descriptor(
            PackageManagerKind::Poetry,
            "pyproject.toml",
            Some("poetry.lock"),
        ));
    } else if exists("requirements.txt") {
        found.push(descriptor(PackageManagerKind::Pip, "requirements.txt", None));
    }

    if exists("Gemfile") {
        let lock = exists("Gemfile.lock").then_some("Gemfile.lock");
        found.push(descriptor(PackageManagerKind::Bundler, "Gemfile", lock));
    }

    if exists("go.mod") {
        let lock = exists("go.sum").then_some("go.sum");
        found.push(descriptor(PackageManagerKind::Go, "go.mod", lock));
    }

    found
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
