use serde::{Deserialize, Serialize};

use crate::{component::ComponentTable, Options, RecipeError, Result};

/// Components whose enabling condition holds, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveSet {
    names: Vec<String>,
}

impl ActiveSet {
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Computes the active subset of `table` under `options`.
///
/// Every dependency edge must point at a declared component; the first
/// dangling reference aborts resolution. Cycles are allowed since no build
/// order is derived here.
pub fn resolve_active(table: &ComponentTable, options: &Options) -> Result<ActiveSet> {
    for component in table.iter() {
        if let Some(missing) = component
            .dependencies
            .iter()
            .find(|dependency| !table.contains(dependency))
        {
            return Err(RecipeError::config(format!(
                "component `{}` depends on undeclared component `{missing}`",
                component.name
            )));
        }
    }

    let names = table
        .iter()
        .filter(|component| match component.option {
            None => true,
            Some(option) => options.flag(option),
        })
        .map(|component| component.name.clone())
        .collect();

    Ok(ActiveSet { names })
}

/// Export entry handed to the package manifest writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub name: String,
    pub cmake_target_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub libs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub components: Vec<ComponentInfo>,
}

impl PackageInfo {
    pub fn component(&self, name: &str) -> Option<&ComponentInfo> {
        self.components.iter().find(|c| c.name == name)
    }
}

/// A validated component table together with its active set.
#[derive(Debug)]
pub struct Resolver<'a> {
    table: &'a ComponentTable,
    active: ActiveSet,
}

impl<'a> Resolver<'a> {
    pub fn new(table: &'a ComponentTable, options: &Options) -> Result<Self> {
        let active = resolve_active(table, options)?;
        tracing::debug!(
            active = active.len(),
            declared = table.len(),
            "resolved active components"
        );
        Ok(Self { table, active })
    }

    pub fn active(&self) -> &ActiveSet {
        &self.active
    }

    /// Flattened requirement names for an active component: lowercased
    /// dependency names first, then external references, each in
    /// declaration order. Inactive dependencies contribute nothing.
    ///
    /// Returns `None` for inactive or undeclared components.
    pub fn export_requires(&self, name: &str) -> Option<Vec<String>> {
        if !self.active.contains(name) {
            return None;
        }
        let component = self.table.get(name)?;

        let mut requires = Vec::with_capacity(
            component.dependencies.len() + component.external_dependencies.len(),
        );
        for dependency in &component.dependencies {
            if self.active.contains(dependency) {
                requires.push(dependency.to_lowercase());
            } else {
                tracing::debug!(
                    component = name,
                    dependency = %dependency,
                    "dropping inactive dependency from requires"
                );
            }
        }
        requires.extend(component.external_dependencies.iter().cloned());
        Some(requires)
    }

    /// Builds export entries for every active component. CMake targets are
    /// named `<namespace>::<component>`.
    pub fn export(&self, namespace: &str) -> PackageInfo {
        let components = self
            .active
            .iter()
            .filter_map(|name| {
                let component = self.table.get(name)?;
                Some(ComponentInfo {
                    name: name.to_lowercase(),
                    cmake_target_name: format!("{namespace}::{name}"),
                    libs: component.exported_libs.clone(),
                    requires: self.export_requires(name)?,
                })
            })
            .collect();

        PackageInfo { components }
    }
}
