//! 领域模型：组件编码、布局分析、虚拟环境与任务管理

pub mod component;
pub mod environment;
pub mod layout;
pub mod tasks;

pub use component::{HydroComponentType, PLANT_CODE_OFFSET};
pub use environment::{
    Alert, AutomationTask, ConditionOperator, LightingSchedule, MaintenanceRoute,
    MonitoringPoint, NutrientDose, NutrientSchedule, Priority, RouteFrequency, Schedule,
    SensorType, Severity, TaskAction, TaskCondition, TaskFrequency, TaskKind, TaskSchedule,
    VirtualEnvironment, WateringSchedule, DEFAULT_SAMPLING_SECS, MAX_SAMPLING_SECS,
    MIN_SAMPLING_SECS,
};
pub use layout::{
    Coordinate3D, EnvironmentalZones, HighLowZones, LayoutAnalysis, LayoutMatrix,
    LayoutRequest, LightingZones, MonitoringDevices, NutrientDistribution, PlantInfo, SetupType,
    WaterFlow,
};
pub use tasks::{new_task_id, TaskUpdate};
