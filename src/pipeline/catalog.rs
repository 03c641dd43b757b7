//! Profile lookup
//!
//! Reference data (materials, tools, machines, holders, workholding) lives
//! outside this crate. The pipeline reads it through `ProfileCatalog`; the
//! TOML-backed `InMemoryCatalog` exists so the CLI and tests have something
//! to point at.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::types::{HolderProfile, MachineProfile, MaterialProfile, ToolProfile, WorkholdingProfile};

/// Read-only profile lookup by id.
pub trait ProfileCatalog: Send + Sync {
    fn get_material(&self, id: &str) -> Option<&MaterialProfile>;
    fn get_tool(&self, id: &str) -> Option<&ToolProfile>;
    fn get_machine(&self, id: &str) -> Option<&MachineProfile>;
    fn get_holder(&self, id: &str) -> Option<&HolderProfile>;
    fn get_workholding(&self, id: &str) -> Option<&WorkholdingProfile>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },
}

/// On-disk shape: one array of tables per profile kind.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CatalogFile {
    materials: Vec<MaterialProfile>,
    tools: Vec<ToolProfile>,
    machines: Vec<MachineProfile>,
    holders: Vec<HolderProfile>,
    workholding: Vec<WorkholdingProfile>,
}

/// HashMap-backed catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    materials: HashMap<String, MaterialProfile>,
    tools: HashMap<String, ToolProfile>,
    machines: HashMap<String, MachineProfile>,
    holders: HashMap<String, HolderProfile>,
    workholding: HashMap<String, WorkholdingProfile>,
}

fn index<T>(
    kind: &'static str,
    items: Vec<T>,
    id: impl Fn(&T) -> &str,
) -> Result<HashMap<String, T>, CatalogError> {
    let mut map = HashMap::with_capacity(items.len());
    for item in items {
        let key = id(&item).to_string();
        if map.contains_key(&key) {
            return Err(CatalogError::DuplicateId { kind, id: key });
        }
        map.insert(key, item);
    }
    Ok(map)
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(contents)?;
        Ok(Self {
            materials: index("material", file.materials, |m| m.id.as_str())?,
            tools: index("tool", file.tools, |t| t.id.as_str())?,
            machines: index("machine", file.machines, |m| m.id.as_str())?,
            holders: index("holder", file.holders, |h| h.id.as_str())?,
            workholding: index("workholding", file.workholding, |w| w.id.as_str())?,
        })
    }

    pub fn load_from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_toml_str(&contents)?;
        info!(
            path = %path.display(),
            materials = catalog.materials.len(),
            tools = catalog.tools.len(),
            machines = catalog.machines.len(),
            "Profile catalog loaded"
        );
        Ok(catalog)
    }

    pub fn with_material(mut self, material: MaterialProfile) -> Self {
        self.materials.insert(material.id.clone(), material);
        self
    }

    pub fn with_tool(mut self, tool: ToolProfile) -> Self {
        self.tools.insert(tool.id.clone(), tool);
        self
    }

    pub fn with_machine(mut self, machine: MachineProfile) -> Self {
        self.machines.insert(machine.id.clone(), machine);
        self
    }

    pub fn with_holder(mut self, holder: HolderProfile) -> Self {
        self.holders.insert(holder.id.clone(), holder);
        self
    }

    pub fn with_workholding(mut self, workholding: WorkholdingProfile) -> Self {
        self.workholding.insert(workholding.id.clone(), workholding);
        self
    }
}

impl ProfileCatalog for InMemoryCatalog {
    fn get_material(&self, id: &str) -> Option<&MaterialProfile> {
        self.materials.get(id)
    }

    fn get_tool(&self, id: &str) -> Option<&ToolProfile> {
        self.tools.get(id)
    }

    fn get_machine(&self, id: &str) -> Option<&MachineProfile> {
        self.machines.get(id)
    }

    fn get_holder(&self, id: &str) -> Option<&HolderProfile> {
        self.holders.get(id)
    }

    fn get_workholding(&self, id: &str) -> Option<&WorkholdingProfile> {
        self.workholding.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MaterialFamily;

    const CATALOG: &str = r#"
[[materials]]
id = "6061"
name = "Aluminum 6061-T6"
family = "aluminum"
kc1_1 = 700.0
mc = 0.25
vc_range = { min = 200.0, max = 600.0 }

[[tools]]
id = "em10"
diameter_mm = 10.0
flute_count = 3
flute_length_mm = 22.0

[[machines]]
id = "vmc"
max_rpm = 12000.0
max_power_kw = 11.0

[[holders]]
id = "er32"
rigidity = 0.85
"#;

    #[test]
    fn parses_every_kind() {
        let catalog = InMemoryCatalog::from_toml_str(CATALOG).unwrap();
        let m = catalog.get_material("6061").unwrap();
        assert_eq!(m.family, MaterialFamily::Aluminum);
        assert!(m.taylor.is_none());
        assert_eq!(catalog.get_tool("em10").unwrap().flute_count, 3);
        assert_eq!(catalog.get_machine("vmc").unwrap().max_rpm, Some(12000.0));
        assert_eq!(catalog.get_holder("er32").unwrap().rigidity, Some(0.85));
        assert!(catalog.get_workholding("vise").is_none());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let doubled = format!("{CATALOG}\n[[holders]]\nid = \"er32\"\n");
        assert!(matches!(
            InMemoryCatalog::from_toml_str(&doubled),
            Err(CatalogError::DuplicateId { kind: "holder", .. })
        ));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(&path, CATALOG).unwrap();
        let catalog = InMemoryCatalog::load_from_file(&path).unwrap();
        assert!(catalog.get_tool("em10").is_some());

        let missing = InMemoryCatalog::load_from_file(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(CatalogError::Io { .. })));
    }
}
