//! Read-only profile records supplied by the reference databases
//!
//! The core never mutates these; they are looked up by id through a
//! `ProfileCatalog` and borrowed for the duration of one recommendation.

use serde::{Deserialize, Serialize};

/// Work material family. Keys the fallback coefficient tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialFamily {
    Aluminum,
    Steel,
    Stainless,
    Titanium,
    Nickel,
    CastIron,
    Copper,
}

impl MaterialFamily {
    /// Families that smear onto the cutting edge at low surface speed.
    pub fn is_bue_prone(self) -> bool {
        matches!(
            self,
            MaterialFamily::Aluminum
                | MaterialFamily::Steel
                | MaterialFamily::Stainless
                | MaterialFamily::Copper
        )
    }
}

impl std::fmt::Display for MaterialFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MaterialFamily::Aluminum => "aluminum",
            MaterialFamily::Steel => "steel",
            MaterialFamily::Stainless => "stainless",
            MaterialFamily::Titanium => "titanium",
            MaterialFamily::Nickel => "nickel",
            MaterialFamily::CastIron => "cast_iron",
            MaterialFamily::Copper => "copper",
        };
        write!(f, "{name}")
    }
}

/// Closed `[min, max]` range as supplied by a profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// Extended Taylor coefficients for `V·T^n·f^a·d^b = C`.
///
/// `V` in m/min, `f` in mm/tooth, `d` in mm, `T` in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaylorCoefficients {
    pub n: f64,
    pub c: f64,
    #[serde(default)]
    pub a: f64,
    #[serde(default)]
    pub b: f64,
}

/// Work material record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialProfile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub family: MaterialFamily,
    /// Brinell hardness
    #[serde(default)]
    pub hardness_hb: Option<f64>,
    /// Specific cutting force at h = 1 mm, b = 1 mm (N/mm²)
    #[serde(default)]
    pub kc1_1: Option<f64>,
    /// Kienzle chip-thickness exponent
    #[serde(default)]
    pub mc: Option<f64>,
    /// Recommended cutting-speed window for carbide (m/min)
    #[serde(default)]
    pub vc_range: Option<ValueRange>,
    /// Nominal cutting speed for carbide (m/min)
    #[serde(default)]
    pub vc_nominal: Option<f64>,
    /// Feed per tooth window (mm/tooth)
    #[serde(default)]
    pub fz_range: Option<ValueRange>,
    /// Maximum axial depth as a multiple of tool diameter
    #[serde(default)]
    pub max_doc_ratio: Option<f64>,
    #[serde(default)]
    pub taylor: Option<TaylorCoefficients>,
}

/// Cutting-edge substrate; scales the material's speed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolMaterial {
    Hss,
    Cobalt,
    #[default]
    Carbide,
    Ceramic,
}

impl ToolMaterial {
    /// Cutting-speed multiplier relative to the carbide window.
    pub fn speed_factor(self) -> f64 {
        match self {
            ToolMaterial::Hss => 0.35,
            ToolMaterial::Cobalt => 0.5,
            ToolMaterial::Carbide => 1.0,
            ToolMaterial::Ceramic => 2.0,
        }
    }
}

/// Single-degree-of-freedom dynamic response of the tool/holder/spindle stack.
///
/// Optional: stability lobes are only computed when this is present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicsProfile {
    pub natural_frequency_hz: f64,
    pub damping_ratio: f64,
    pub stiffness_n_per_m: f64,
}

/// Cutting tool record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolProfile {
    pub id: String,
    pub diameter_mm: f64,
    pub flute_count: u32,
    #[serde(default)]
    pub flute_length_mm: Option<f64>,
    #[serde(default)]
    pub stickout_mm: Option<f64>,
    /// Corner radius used for the finish model; sharp corners fall back to a
    /// small default edge radius.
    #[serde(default)]
    pub corner_radius_mm: Option<f64>,
    #[serde(default)]
    pub tool_material: ToolMaterial,
    #[serde(default)]
    pub max_rpm: Option<f64>,
    #[serde(default)]
    pub fz_range: Option<ValueRange>,
    #[serde(default)]
    pub max_cutting_force_n: Option<f64>,
    #[serde(default)]
    pub dynamics: Option<DynamicsProfile>,
}

/// CNC controller limits, when they are tighter than the machine's.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerProfile {
    #[serde(default)]
    pub max_feed_rate_mm_min: Option<f64>,
    #[serde(default)]
    pub max_programmable_rpm: Option<f64>,
}

/// Machine tool record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineProfile {
    pub id: String,
    #[serde(default)]
    pub min_rpm: Option<f64>,
    #[serde(default)]
    pub max_rpm: Option<f64>,
    #[serde(default)]
    pub max_power_kw: Option<f64>,
    #[serde(default)]
    pub max_torque_nm: Option<f64>,
    #[serde(default)]
    pub max_feed_rate_mm_min: Option<f64>,
    /// Dimensionless stiffness factor, 1.0 = nominal
    #[serde(default)]
    pub rigidity: Option<f64>,
    #[serde(default)]
    pub controller: Option<ControllerProfile>,
}

/// Tool holder record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolderProfile {
    pub id: String,
    #[serde(default)]
    pub max_rpm: Option<f64>,
    #[serde(default)]
    pub rigidity: Option<f64>,
    #[serde(default)]
    pub runout_um: Option<f64>,
}

/// Fixture / vise record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkholdingProfile {
    pub id: String,
    #[serde(default)]
    pub rigidity: Option<f64>,
    #[serde(default)]
    pub max_doc_mm: Option<f64>,
}

/// Toolpath strategy requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachiningMode {
    #[default]
    Roughing,
    Finishing,
    Slotting,
    Adaptive,
    Profiling,
}

impl std::fmt::Display for MachiningMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MachiningMode::Roughing => "roughing",
            MachiningMode::Finishing => "finishing",
            MachiningMode::Slotting => "slotting",
            MachiningMode::Adaptive => "adaptive",
            MachiningMode::Profiling => "profiling",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for MachiningMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "roughing" => Ok(MachiningMode::Roughing),
            "finishing" => Ok(MachiningMode::Finishing),
            "slotting" => Ok(MachiningMode::Slotting),
            "adaptive" | "hsm" => Ok(MachiningMode::Adaptive),
            "profiling" | "contour" => Ok(MachiningMode::Profiling),
            other => Err(format!("unknown machining mode: {other}")),
        }
    }
}

/// Everything the constraint engine needs for one aggregation.
///
/// Borrowed views: profiles stay owned by the catalog.
#[derive(Debug, Clone, Copy)]
pub struct ProfileSet<'a> {
    pub machine: Option<&'a MachineProfile>,
    pub tool: Option<&'a ToolProfile>,
    pub holder: Option<&'a HolderProfile>,
    pub workholding: Option<&'a WorkholdingProfile>,
    pub material: Option<&'a MaterialProfile>,
    pub mode: Option<MachiningMode>,
    pub thin_wall: bool,
}

/// A missing-data condition that was handled with a documented fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileWarning {
    /// Which collaborator was short of data (e.g. "material", "machine")
    pub source: String,
    pub message: String,
}

impl ProfileWarning {
    pub fn new(source: &str, message: impl Into<String>) -> Self {
        Self {
            source: source.to_string(),
            message: message.into(),
        }
    }
}
