//! 组件编码：0 为空；1..9 为基础设施（8、9 预留未定义）；>= 10 为植物（目录下标 + 10）
//!
//! 矩阵单元序列化为整数；未定义的编码一律视为 EMPTY。

use serde::{Deserialize, Serialize};

/// 植物编码相对目录下标的偏移
pub const PLANT_CODE_OFFSET: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i64", from = "i64")]
pub enum HydroComponentType {
    #[default]
    Empty,
    WaterPump,
    NutrientPump,
    SensorNode,
    VerticalSupport,
    LightPanel,
    Camera,
    Drone,
    Cucumber,
    Strawberry,
    Tomato,
    Lettuce,
    Basil,
    BellPepper,
    Spinach,
    Kale,
    Mint,
    CherryTomatoes,
    Arugula,
    HerbsMix,
}

impl HydroComponentType {
    /// 全部已定义的编码，按数值升序
    pub const ALL: [HydroComponentType; 20] = [
        HydroComponentType::Empty,
        HydroComponentType::WaterPump,
        HydroComponentType::NutrientPump,
        HydroComponentType::SensorNode,
        HydroComponentType::VerticalSupport,
        HydroComponentType::LightPanel,
        HydroComponentType::Camera,
        HydroComponentType::Drone,
        HydroComponentType::Cucumber,
        HydroComponentType::Strawberry,
        HydroComponentType::Tomato,
        HydroComponentType::Lettuce,
        HydroComponentType::Basil,
        HydroComponentType::BellPepper,
        HydroComponentType::Spinach,
        HydroComponentType::Kale,
        HydroComponentType::Mint,
        HydroComponentType::CherryTomatoes,
        HydroComponentType::Arugula,
        HydroComponentType::HerbsMix,
    ];

    pub fn code(self) -> i64 {
        match self {
            HydroComponentType::Empty => 0,
            HydroComponentType::WaterPump => 1,
            HydroComponentType::NutrientPump => 2,
            HydroComponentType::SensorNode => 3,
            HydroComponentType::VerticalSupport => 4,
            HydroComponentType::LightPanel => 5,
            HydroComponentType::Camera => 6,
            HydroComponentType::Drone => 7,
            HydroComponentType::Cucumber => 10,
            HydroComponentType::Strawberry => 11,
            HydroComponentType::Tomato => 12,
            HydroComponentType::Lettuce => 13,
            HydroComponentType::Basil => 14,
            HydroComponentType::BellPepper => 15,
            HydroComponentType::Spinach => 16,
            HydroComponentType::Kale => 17,
            HydroComponentType::Mint => 18,
            HydroComponentType::CherryTomatoes => 19,
            HydroComponentType::Arugula => 20,
            HydroComponentType::HerbsMix => 21,
        }
    }

    /// 已定义编码返回 Some，其余（含预留的 8、9）返回 None
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// JSON 单元值：必须是整数值（10 与 10.0 等价），且为已定义编码
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let n = value.as_f64()?;
        if !n.is_finite() || n.fract() != 0.0 {
            return None;
        }
        Self::from_code(n as i64)
    }

    pub fn from_catalog_index(index: usize) -> Option<Self> {
        i64::try_from(index)
            .ok()
            .and_then(|i| Self::from_code(i + PLANT_CODE_OFFSET))
    }

    pub fn name(self) -> &'static str {
        match self {
            HydroComponentType::Empty => "EMPTY",
            HydroComponentType::WaterPump => "WATER_PUMP",
            HydroComponentType::NutrientPump => "NUTRIENT_PUMP",
            HydroComponentType::SensorNode => "SENSOR_NODE",
            HydroComponentType::VerticalSupport => "VERTICAL_SUPPORT",
            HydroComponentType::LightPanel => "LIGHT_PANEL",
            HydroComponentType::Camera => "CAMERA",
            HydroComponentType::Drone => "DRONE",
            HydroComponentType::Cucumber => "CUCUMBER",
            HydroComponentType::Strawberry => "STRAWBERRY",
            HydroComponentType::Tomato => "TOMATO",
            HydroComponentType::Lettuce => "LETTUCE",
            HydroComponentType::Basil => "BASIL",
            HydroComponentType::BellPepper => "BELL_PEPPER",
            HydroComponentType::Spinach => "SPINACH",
            HydroComponentType::Kale => "KALE",
            HydroComponentType::Mint => "MINT",
            HydroComponentType::CherryTomatoes => "CHERRY_TOMATOES",
            HydroComponentType::Arugula => "ARUGULA",
            HydroComponentType::HerbsMix => "HERBS_MIX",
        }
    }

    /// 提示词中的编码图例，每行 `code: NAME`
    pub fn legend() -> String {
        Self::ALL
            .iter()
            .map(|c| format!("{}: {}", c.code(), c.name()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<HydroComponentType> for i64 {
    fn from(value: HydroComponentType) -> Self {
        value.code()
    }
}

impl From<i64> for HydroComponentType {
    fn from(code: i64) -> Self {
        Self::from_code(code).unwrap_or_default()
    }
}

impl std::fmt::Display for HydroComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
