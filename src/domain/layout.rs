//! 布局请求与布局分析结果

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::HydroComponentType;

/// `[x, y, z]`
pub type Coordinate3D = [f64; 3];

/// 三维矩阵：matrix[level][row][col]
pub type LayoutMatrix = Vec<Vec<Vec<HydroComponentType>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetupType {
    #[default]
    Horizontal,
    Vertical,
}

impl std::fmt::Display for SetupType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupType::Horizontal => write!(f, "horizontal"),
            SetupType::Vertical => write!(f, "vertical"),
        }
    }
}

/// 植物目录条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantInfo {
    pub id: String,
    pub name: String,
    /// 生长周期（天）
    pub growth_time: u32,
    /// 单株占地（平方米）
    pub space_required: f64,
}

/// 生成布局的请求参数（由调用方提供）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRequest {
    /// 面积（平方米）
    pub space_size: f64,
    /// 植物 id -> 数量
    #[serde(default)]
    pub selected_plants: BTreeMap<String, u32>,
    #[serde(default)]
    pub plant_data: Vec<PlantInfo>,
    #[serde(default)]
    pub setup_type: SetupType,
    /// 仅立体架使用（米）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_height: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterFlow {
    pub from: Coordinate3D,
    pub to: Coordinate3D,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NutrientDistribution {
    pub primary: Vec<Coordinate3D>,
    pub secondary: Vec<Coordinate3D>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HighLowZones {
    pub high: Vec<Coordinate3D>,
    pub low: Vec<Coordinate3D>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LightingZones {
    pub direct: Vec<Coordinate3D>,
    pub indirect: Vec<Coordinate3D>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvironmentalZones {
    pub temperature: HighLowZones,
    pub humidity: HighLowZones,
    pub lighting: LightingZones,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MonitoringDevices {
    pub cameras: Vec<Coordinate3D>,
    pub drones: Vec<Coordinate3D>,
}

/// 布局分析：经归一化后所有字段都存在
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutAnalysis {
    pub matrix: LayoutMatrix,
    pub recommendations: Vec<String>,
    pub water_flow: Vec<WaterFlow>,
    pub nutrient_distribution: NutrientDistribution,
    pub environmental_zones: EnvironmentalZones,
    pub maintenance_routes: Vec<Coordinate3D>,
    pub setup_type: SetupType,
    pub levels: u32,
    pub monitoring_devices: MonitoringDevices,
    pub selected_plants: BTreeMap<String, u32>,
    pub plant_data: Vec<PlantInfo>,
}

impl LayoutAnalysis {
    /// (层数, 首层行数, 首层首行列数)
    pub fn dimensions(&self) -> (usize, usize, usize) {
        let rows = self.matrix.first().map(|l| l.len()).unwrap_or(0);
        let cols = self
            .matrix
            .first()
            .and_then(|l| l.first())
            .map(|r| r.len())
            .unwrap_or(0);
        (self.matrix.len(), rows, cols)
    }

    /// 矩阵中某类组件的数量
    pub fn count(&self, component: HydroComponentType) -> usize {
        self.matrix
            .iter()
            .flatten()
            .flatten()
            .filter(|c| **c == component)
            .count()
    }
}
