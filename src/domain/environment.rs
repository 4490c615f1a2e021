//! 虚拟环境：布局 + 自动化任务、监测点、巡检路线、告警与作息表

use serde::{Deserialize, Serialize};

use crate::domain::{Coordinate3D, HydroComponentType, LayoutAnalysis};

/// 监测点采样间隔的上下限（秒）
pub const MIN_SAMPLING_SECS: u32 = 1;
pub const MAX_SAMPLING_SECS: u32 = 3600;
pub const DEFAULT_SAMPLING_SECS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    #[default]
    Monitoring,
    Maintenance,
    Alert,
    Control,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFrequency {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    #[default]
    OnDemand,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSchedule {
    pub frequency: TaskFrequency,
    /// "HH:MM"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<String>,
    /// 0 = 周日 .. 6 = 周六
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCondition {
    pub sensor: String,
    pub operator: ConditionOperator,
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAction {
    pub component: HydroComponentType,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationTask {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub schedule: TaskSchedule,
    #[serde(default)]
    pub conditions: Vec<TaskCondition>,
    #[serde(default)]
    pub actions: Vec<TaskAction>,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorType {
    #[serde(rename = "temperature")]
    Temperature,
    #[serde(rename = "humidity")]
    Humidity,
    #[serde(rename = "pH", alias = "ph")]
    Ph,
    #[serde(rename = "nutrient")]
    Nutrient,
    #[serde(rename = "light")]
    Light,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringPoint {
    pub position: Coordinate3D,
    #[serde(rename = "type")]
    pub sensor: SensorType,
    /// 采样间隔（秒），取值 [1, 3600]
    pub frequency: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteFrequency {
    Daily,
    #[default]
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRoute {
    pub name: String,
    pub points: Vec<Coordinate3D>,
    pub frequency: RouteFrequency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub condition: String,
    pub severity: Severity,
    pub message: String,
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightingSchedule {
    /// "HH:MM"（24 小时制）
    pub on: String,
    pub off: String,
    /// 百分比 0..=100
    pub intensity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WateringSchedule {
    /// 每天次数
    pub frequency: u32,
    /// 每次分钟数
    pub duration: u32,
    pub start_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientDose {
    pub time: String,
    pub formula: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NutrientSchedule {
    pub schedule: Vec<NutrientDose>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub lighting: LightingSchedule,
    pub watering: WateringSchedule,
    pub nutrients: NutrientSchedule,
}

impl Default for Schedule {
    /// 上游缺失作息表时的兜底值：06:00-22:00 补光 80%，每天浇水 4 次、每次 15 分钟
    fn default() -> Self {
        Self {
            lighting: LightingSchedule {
                on: "06:00".to_string(),
                off: "22:00".to_string(),
                intensity: 80.0,
            },
            watering: WateringSchedule {
                frequency: 4,
                duration: 15,
                start_time: "06:00".to_string(),
            },
            nutrients: NutrientSchedule::default(),
        }
    }
}

/// 虚拟环境
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualEnvironment {
    pub layout: LayoutAnalysis,
    pub automation_tasks: Vec<AutomationTask>,
    pub monitoring_points: Vec<MonitoringPoint>,
    pub maintenance_routes: Vec<MaintenanceRoute>,
    pub alerts: Vec<Alert>,
    pub schedule: Schedule,
}

impl VirtualEnvironment {
    pub fn task(&self, id: &str) -> Option<&AutomationTask> {
        self.automation_tasks.iter().find(|t| t.id == id)
    }
}
