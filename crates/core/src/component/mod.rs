use crate::{options::Os, Environment, OptionName, RecipeError, Result};

/// A named unit of exported build artifacts, optionally gated by an option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    /// `None` means the component is always built.
    pub option: Option<OptionName>,
    /// Other components of the same declaration, in declaration order.
    pub dependencies: Vec<String>,
    /// Opaque third-party references such as `opengl::opengl`.
    pub external_dependencies: Vec<String>,
    pub exported_libs: Vec<String>,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            option: None,
            dependencies: Vec::new(),
            external_dependencies: Vec::new(),
            exported_libs: Vec::new(),
        }
    }

    pub fn gated_by(mut self, option: OptionName) -> Self {
        self.option = Some(option);
        self
    }

    pub fn depends_on(mut self, component: impl Into<String>) -> Self {
        self.dependencies.push(component.into());
        self
    }

    pub fn requires_external(mut self, reference: impl Into<String>) -> Self {
        self.external_dependencies.push(reference.into());
        self
    }

    pub fn exports(mut self, lib: impl Into<String>) -> Self {
        self.exported_libs.push(lib.into());
        self
    }
}

/// Mutable component declaration. Only [`materialize`] turns it into the
/// read-only [`ComponentTable`] the resolver consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declaration {
    components: Vec<Component>,
}

impl Declaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// The libprojectM component tree before environment facts are applied.
    pub fn projectm() -> Self {
        Self {
            components: vec![
                Component::new("playlist")
                    .gated_by(OptionName::EnablePlaylist)
                    .exports("projectM-4-playlist"),
                Component::new("projectm")
                    .depends_on("playlist")
                    .exports("projectM-4"),
                Component::new("projectm-test-ui")
                    .gated_by(OptionName::EnableSdlUi)
                    .depends_on("projectm")
                    .requires_external("sdl::sdl"),
            ],
        }
    }

    /// Adds a component. Names must be unique within a declaration.
    pub fn declare(&mut self, component: Component) -> Result<()> {
        if self.component(&component.name).is_some() {
            return Err(RecipeError::config(format!(
                "component `{}` declared twice",
                component.name
            )));
        }
        self.components.push(component);
        Ok(())
    }

    /// Appends an external reference to `component`. Appends are never
    /// deduplicated.
    pub fn register_external_dependency(
        &mut self,
        component: &str,
        reference: impl Into<String>,
    ) -> Result<()> {
        let reference = reference.into();
        let target = self
            .components
            .iter_mut()
            .find(|c| c.name == component)
            .ok_or_else(|| {
                RecipeError::config(format!(
                    "cannot add `{reference}` to undeclared component `{component}`"
                ))
            })?;

        tracing::debug!(component, reference = %reference, "registering external dependency");
        target.external_dependencies.push(reference);
        Ok(())
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Freezes the declaration as-is, without applying environment facts.
    pub fn into_table(self) -> ComponentTable {
        ComponentTable {
            components: self.components,
        }
    }
}

/// Read-only component table, fully materialized for one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentTable {
    components: Vec<Component>,
}

impl ComponentTable {
    pub fn get(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Components in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.components.iter()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Applies environment facts to a copy of `base` and freezes the result.
///
/// `base` is never touched, so calling this twice yields two identical
/// tables instead of doubling up the external references.
pub fn materialize(base: &Declaration, env: &Environment) -> Result<ComponentTable> {
    let mut declaration = base.clone();

    let gl = if env.gles { "gles::gles" } else { "opengl::opengl" };
    declaration.register_external_dependency("projectm", gl)?;

    if env.system_glm {
        declaration.register_external_dependency("projectm", "glm::glm")?;
    }

    if env.os == Os::Windows {
        declaration.register_external_dependency("projectm", "glew::glew")?;
    }

    if env.build_testing {
        declaration.register_external_dependency("projectm", "gtest::gtest")?;
    }

    if env.boost_filesystem {
        declaration.register_external_dependency("projectm", "boost::filesystem")?;
        declaration.register_external_dependency("projectm-test-ui", "boost::filesystem")?;
    }

    let table = declaration.into_table();
    tracing::debug!(components = table.len(), "component table materialized");
    Ok(table)
}
