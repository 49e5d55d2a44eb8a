//! The installed-package database (§4.8): a point-in-time snapshot of
//! what `pkg` reports as installed, indexed by package name so
//! `core::install_status` can be evaluated without shelling out per
//! port.

use std::collections::HashMap;

use crate::core::split_name_version;
use crate::tool::PackageTool;

#[derive(Debug, Default)]
pub struct PackageDb {
    /// name -> full installed `name-version` string.
    installed: HashMap<String, String>,
}

impl PackageDb {
    pub fn load(tool: &dyn PackageTool) -> std::io::Result<Self> {
        let mut installed = HashMap::new();
        for entry in tool.list_installed()? {
            let (name, _version) = split_name_version(&entry);
            installed.insert(name.to_string(), entry);
        }
        Ok(PackageDb { installed })
    }

    /// The installed `name-version` string for `name`, if any is
    /// installed — the input to `core::install_status`.
    pub fn installed_pkgname(&self, name: &str) -> Option<&str> {
        self.installed.get(name).map(String::as_str)
    }
}
