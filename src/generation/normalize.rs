//! 响应校验 / 归一化：原始 JSON -> 领域对象
//!
//! 全部是纯函数且不会失败：缺失或非法的字段替换为空集合或兜底值，非法坐标与非法单元被丢弃或置为 EMPTY。
//! 对已归一化的结果再次归一化得到相同结果。

use std::collections::HashSet;

use serde_json::Value;

use crate::domain::{
    new_task_id, Alert, AutomationTask, EnvironmentalZones, HighLowZones, HydroComponentType,
    LayoutAnalysis, LayoutMatrix, LayoutRequest, LightingSchedule, LightingZones,
    MaintenanceRoute, MonitoringDevices, MonitoringPoint, NutrientDistribution, NutrientDose,
    NutrientSchedule, Schedule, SetupType, TaskAction, TaskCondition, TaskSchedule,
    VirtualEnvironment, WaterFlow, WateringSchedule, DEFAULT_SAMPLING_SECS, MAX_SAMPLING_SECS,
    MIN_SAMPLING_SECS,
};
use crate::generation::raw::{
    clock_time, component, coordinate, coordinates, enum_value, field, integer, items, lenient,
    lenient_opt, number, strings, text, RawAlert, RawEnvironment, RawLayout, RawMonitoringPoint,
    RawRoute, RawSchedule, RawTask,
};

/// 布局归一化；setupType、selectedPlants、plantData 一律取自调用方请求
pub fn normalize_layout(value: &Value, request: &LayoutRequest) -> LayoutAnalysis {
    let raw: RawLayout = lenient(value);

    let nutrient = raw.nutrient_distribution.as_ref();
    let zones = raw.environmental_zones.as_ref();
    let devices = raw.monitoring_devices.as_ref();

    LayoutAnalysis {
        matrix: normalize_matrix(raw.matrix.as_ref(), request.space_size),
        recommendations: strings(raw.recommendations.as_ref()),
        water_flow: normalize_water_flow(raw.water_flow.as_ref()),
        nutrient_distribution: NutrientDistribution {
            primary: coordinates(field(nutrient, "primary")),
            secondary: coordinates(field(nutrient, "secondary")),
        },
        environmental_zones: normalize_zones(zones),
        maintenance_routes: coordinates(raw.maintenance_routes.as_ref()),
        setup_type: request.setup_type,
        levels: normalize_levels(raw.levels.as_ref(), request.setup_type),
        monitoring_devices: MonitoringDevices {
            cameras: coordinates(field(devices, "cameras")),
            drones: coordinates(field(devices, "drones")),
        },
        selected_plants: request.selected_plants.clone(),
        plant_data: request.plant_data.clone(),
    }
}

/// 兜底矩阵的最大边长
pub const MAX_MATRIX_SIDE: usize = 100;

/// 边长为 ceil(sqrt(space_size)) 的单层空矩阵，边长限制在 [1, MAX_MATRIX_SIDE]
pub fn empty_matrix(space_size: f64) -> LayoutMatrix {
    let wanted = if space_size.is_finite() && space_size > 0.0 {
        space_size.sqrt().ceil()
    } else {
        1.0
    };
    let side = if wanted > MAX_MATRIX_SIDE as f64 {
        tracing::debug!(
            "Space size {} exceeds matrix cap, using {}x{}",
            space_size,
            MAX_MATRIX_SIDE,
            MAX_MATRIX_SIDE
        );
        MAX_MATRIX_SIDE
    } else {
        (wanted as usize).max(1)
    };
    vec![vec![vec![HydroComponentType::Empty; side]; side]]
}

/// 矩阵缺失或不是三层嵌套数组时生成空矩阵；否则丢弃非数组的层与行，逐单元映射，未定义编码置为 EMPTY
pub fn normalize_matrix(value: Option<&Value>, space_size: f64) -> LayoutMatrix {
    let mut remapped = 0usize;

    let matrix: LayoutMatrix = items(value)
        .iter()
        .filter_map(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(Value::as_array)
                .map(|cells| {
                    cells
                        .iter()
                        .map(|cell| {
                            HydroComponentType::from_json(cell).unwrap_or_else(|| {
                                remapped += 1;
                                HydroComponentType::Empty
                            })
                        })
                        .collect()
                })
                .collect::<Vec<_>>()
        })
        .filter(|level| !level.is_empty())
        .collect();

    if matrix.is_empty() {
        tracing::debug!("Matrix missing or not nested, using empty matrix");
        return empty_matrix(space_size);
    }
    if remapped > 0 {
        tracing::debug!("Remapped {} undefined matrix cells to EMPTY", remapped);
    }
    matrix
}

/// 只保留 from / to 都是合法坐标的水流边
pub fn normalize_water_flow(value: Option<&Value>) -> Vec<WaterFlow> {
    let all = items(value);
    let kept: Vec<WaterFlow> = all
        .iter()
        .filter_map(|edge| {
            let from = coordinate(edge.get("from")?)?;
            let to = coordinate(edge.get("to")?)?;
            Some(WaterFlow { from, to })
        })
        .collect();
    if kept.len() < all.len() {
        tracing::debug!("Dropped {} malformed water flow edges", all.len() - kept.len());
    }
    kept
}

fn normalize_zones(zones: Option<&Value>) -> EnvironmentalZones {
    let high_low = |key: &str| {
        let group = field(zones, key);
        HighLowZones {
            high: coordinates(field(group, "high")),
            low: coordinates(field(group, "low")),
        }
    };
    let lighting = field(zones, "lighting");

    EnvironmentalZones {
        temperature: high_low("temperature"),
        humidity: high_low("humidity"),
        lighting: LightingZones {
            direct: coordinates(field(lighting, "direct")),
            indirect: coordinates(field(lighting, "indirect")),
        },
    }
}

/// 平面架固定 1 层；立体架采用上游给出的正整数层数，缺失或非法时为 1
pub fn normalize_levels(value: Option<&Value>, setup_type: SetupType) -> u32 {
    match setup_type {
        SetupType::Horizontal => 1,
        SetupType::Vertical => number(value)
            .filter(|n| *n >= 1.0)
            .map(|n| n.round().min(u32::MAX as f64) as u32)
            .unwrap_or(1),
    }
}

/// 虚拟环境归一化；layout 一律取调用方传入的布局
pub fn normalize_environment(value: &Value, layout: &LayoutAnalysis) -> VirtualEnvironment {
    let raw: RawEnvironment = lenient(value);

    VirtualEnvironment {
        layout: layout.clone(),
        automation_tasks: normalize_tasks(raw.automation_tasks.as_ref()),
        monitoring_points: items(raw.monitoring_points.as_ref())
            .iter()
            .filter_map(normalize_monitoring_point)
            .collect(),
        maintenance_routes: items(raw.maintenance_routes.as_ref())
            .iter()
            .enumerate()
            .map(|(i, route)| normalize_route(i, route))
            .collect(),
        alerts: items(raw.alerts.as_ref())
            .iter()
            .map(normalize_alert)
            .collect(),
        schedule: normalize_schedule(raw.schedule.as_ref(), &Schedule::default()),
    }
}

/// 任务 id 缺失或重复时重新生成，保证列表内唯一
pub fn normalize_tasks(value: Option<&Value>) -> Vec<AutomationTask> {
    let mut seen: HashSet<String> = HashSet::new();

    items(value)
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let raw: RawTask = lenient(task);

            let id = match text(raw.id.as_ref()) {
                Some(id) if !seen.contains(&id) => id,
                _ => loop {
                    let id = new_task_id();
                    if !seen.contains(&id) {
                        break id;
                    }
                },
            };
            seen.insert(id.clone());

            AutomationTask {
                id,
                name: text(raw.name.as_ref()).unwrap_or_else(|| format!("Task {}", i + 1)),
                kind: enum_value(raw.kind.as_ref()).unwrap_or_default(),
                schedule: normalize_task_schedule(raw.schedule.as_ref()),
                conditions: items(raw.conditions.as_ref())
                    .iter()
                    .filter_map(normalize_condition)
                    .collect(),
                actions: items(raw.actions.as_ref())
                    .iter()
                    .filter_map(normalize_action)
                    .collect(),
                priority: enum_value(raw.priority.as_ref()).unwrap_or_default(),
            }
        })
        .collect()
}

fn normalize_task_schedule(value: Option<&Value>) -> TaskSchedule {
    let mut days: Vec<u8> = items(field(value, "daysOfWeek"))
        .iter()
        .filter_map(|d| integer(Some(d)))
        .filter(|d| (0..=6).contains(d))
        .map(|d| d as u8)
        .collect();
    days.sort_unstable();
    days.dedup();

    TaskSchedule {
        frequency: enum_value(field(value, "frequency")).unwrap_or_default(),
        time_of_day: clock_time(field(value, "timeOfDay")),
        days_of_week: (!days.is_empty()).then_some(days),
        day_of_month: integer(field(value, "dayOfMonth"))
            .filter(|d| (1..=31).contains(d))
            .map(|d| d as u8),
    }
}

/// 条件缺少传感器、运算符或阈值时整条丢弃
fn normalize_condition(value: &Value) -> Option<TaskCondition> {
    let value = Some(value);
    Some(TaskCondition {
        sensor: text(field(value, "sensor"))?,
        operator: enum_value(field(value, "operator"))?,
        value: number(field(value, "value"))?,
        unit: text(field(value, "unit")).unwrap_or_default(),
    })
}

/// 动作缺少 action 描述时丢弃；组件无法识别时为 EMPTY
fn normalize_action(value: &Value) -> Option<TaskAction> {
    let value = Some(value);
    Some(TaskAction {
        component: component(field(value, "component")),
        action: text(field(value, "action"))?,
        value: number(field(value, "value")),
        unit: text(field(value, "unit")),
    })
}

/// 位置或传感器类型非法的监测点丢弃；采样间隔默认 30 秒并夹到 [1, 3600]
fn normalize_monitoring_point(value: &Value) -> Option<MonitoringPoint> {
    let raw: RawMonitoringPoint = lenient(value);
    let position = coordinate(raw.position.as_ref()?)?;
    let sensor = enum_value(raw.sensor.as_ref())?;
    let frequency = number(raw.frequency.as_ref())
        .map(|f| f.round().clamp(MIN_SAMPLING_SECS as f64, MAX_SAMPLING_SECS as f64) as u32)
        .unwrap_or(DEFAULT_SAMPLING_SECS);

    Some(MonitoringPoint {
        position,
        sensor,
        frequency,
        last_value: number(raw.last_value.as_ref()),
    })
}

fn normalize_route(index: usize, value: &Value) -> MaintenanceRoute {
    let raw: RawRoute = lenient(value);
    MaintenanceRoute {
        name: text(raw.name.as_ref()).unwrap_or_else(|| format!("Route {}", index + 1)),
        points: coordinates(raw.points.as_ref()),
        frequency: enum_value(raw.frequency.as_ref()).unwrap_or_default(),
    }
}

fn normalize_alert(value: &Value) -> Alert {
    let raw: RawAlert = lenient(value);
    Alert {
        condition: text(raw.condition.as_ref()).unwrap_or_default(),
        severity: enum_value(raw.severity.as_ref()).unwrap_or_default(),
        message: text(raw.message.as_ref()).unwrap_or_default(),
        actions: strings(raw.actions.as_ref()),
    }
}

/// 作息表归一化；缺失或非法字段回落到 fallback 中的对应值
pub fn normalize_schedule(value: Option<&Value>, fallback: &Schedule) -> Schedule {
    let raw: RawSchedule = lenient_opt(value);
    let lighting = raw.lighting.as_ref();
    let watering = raw.watering.as_ref();

    let positive = |v: Option<&Value>, default: u32| {
        number(v)
            .filter(|n| *n > 0.0)
            .map(|n| n.round().min(u32::MAX as f64) as u32)
            .unwrap_or(default)
    };

    let nutrients = match field(raw.nutrients.as_ref(), "schedule") {
        Some(doses) if doses.is_array() => NutrientSchedule {
            schedule: items(Some(doses))
                .iter()
                .filter_map(normalize_dose)
                .collect(),
        },
        _ => fallback.nutrients.clone(),
    };

    Schedule {
        lighting: LightingSchedule {
            on: clock_time(field(lighting, "on")).unwrap_or_else(|| fallback.lighting.on.clone()),
            off: clock_time(field(lighting, "off"))
                .unwrap_or_else(|| fallback.lighting.off.clone()),
            intensity: number(field(lighting, "intensity"))
                .map(|i| i.clamp(0.0, 100.0))
                .unwrap_or(fallback.lighting.intensity),
        },
        watering: WateringSchedule {
            frequency: positive(field(watering, "frequency"), fallback.watering.frequency),
            duration: positive(field(watering, "duration"), fallback.watering.duration),
            start_time: clock_time(field(watering, "startTime"))
                .unwrap_or_else(|| fallback.watering.start_time.clone()),
        },
        nutrients,
    }
}

/// 缺少时间或剂量的投料条目丢弃
fn normalize_dose(value: &Value) -> Option<NutrientDose> {
    let value = Some(value);
    Some(NutrientDose {
        time: clock_time(field(value, "time"))?,
        formula: text(field(value, "formula")).unwrap_or_else(|| "standard".to_string()),
        amount: number(field(value, "amount")).filter(|a| *a >= 0.0)?,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::domain::{
        PlantInfo, Priority, SensorType, Severity, TaskFrequency, TaskKind,
    };
    use serde_json::json;

    fn request(space_size: f64, setup_type: SetupType) -> LayoutRequest {
        LayoutRequest {
            space_size,
            selected_plants: BTreeMap::from([("1".to_string(), 3)]),
            plant_data: vec![PlantInfo {
                id: "1".to_string(),
                name: "Lettuce".to_string(),
                growth_time: 45,
                space_required: 0.2,
            }],
            setup_type,
            max_height: None,
        }
    }

    fn renormalize_layout(layout: &LayoutAnalysis, req: &LayoutRequest) -> LayoutAnalysis {
        normalize_layout(&serde_json::to_value(layout).unwrap(), req)
    }

    #[test]
    fn test_missing_matrix_synthesized_from_space_size() {
        let layout = normalize_layout(&json!({}), &request(10.0, SetupType::Horizontal));
        assert_eq!(layout.dimensions(), (1, 4, 4));
        assert_eq!(layout.count(HydroComponentType::Empty), 16);
    }

    #[test]
    fn test_synthesized_matrix_side_is_capped() {
        for space_size in [1e40, 1e14, f64::MAX, f64::INFINITY] {
            let layout = normalize_layout(&json!({}), &request(space_size, SetupType::Horizontal));
            let (levels, rows, cols) = layout.dimensions();
            assert_eq!(levels, 1);
            assert!(rows <= MAX_MATRIX_SIDE && cols <= MAX_MATRIX_SIDE);
            assert!(rows >= 1);
        }
        assert_eq!(empty_matrix(MAX_MATRIX_SIDE.pow(2) as f64 + 1.0)[0].len(), MAX_MATRIX_SIDE);
        assert_eq!(empty_matrix(-4.0)[0].len(), 1);
        assert_eq!(empty_matrix(f64::NAN)[0].len(), 1);
    }

    #[test]
    fn test_non_nested_matrix_synthesized() {
        let req = request(4.0, SetupType::Horizontal);
        for bad in [json!("matrix"), json!([1, 2, 3]), json!([[1, 2]]), json!([])] {
            let layout = normalize_layout(&json!({ "matrix": bad }), &req);
            assert_eq!(layout.dimensions(), (1, 2, 2));
        }
    }

    #[test]
    fn test_matrix_cells_remapped() {
        let value = json!({"matrix": [[[0, 1, 8, 9], [10, 21, 22, -1], [3.0, 2.5, "5", null]]]});
        let layout = normalize_layout(&value, &request(16.0, SetupType::Horizontal));
        let codes: Vec<Vec<i64>> = layout.matrix[0]
            .iter()
            .map(|row| row.iter().map(|c| c.code()).collect())
            .collect();
        assert_eq!(
            codes,
            vec![vec![0, 1, 0, 0], vec![10, 21, 0, 0], vec![3, 0, 0, 0]]
        );
    }

    #[test]
    fn test_valid_codes_are_identity() {
        let all: Vec<i64> = HydroComponentType::ALL.iter().map(|c| c.code()).collect();
        let layout = normalize_layout(
            &json!({ "matrix": [[all.clone()]] }),
            &request(1.0, SetupType::Horizontal),
        );
        let out: Vec<i64> = layout.matrix[0][0].iter().map(|c| c.code()).collect();
        assert_eq!(out, all);
    }

    #[test]
    fn test_water_flow_keeps_only_well_formed_edges() {
        let value = json!({"waterFlow": [
            {"from": [0, 0], "to": [1, 1, 1]},
            {"from": [0, 0, 0], "to": [2, 0, 1]},
            {"from": [0, 0, 0], "to": [1, "a", 1]},
            {"from": [0, 0, 0]},
            "edge",
            {"from": [1, 1, 1], "to": [1, 2, 1, 0]}
        ]});
        let layout = normalize_layout(&value, &request(4.0, SetupType::Horizontal));
        assert_eq!(
            layout.water_flow,
            vec![WaterFlow {
                from: [0.0, 0.0, 0.0],
                to: [2.0, 0.0, 1.0]
            }]
        );
    }

    #[test]
    fn test_horizontal_levels_forced_to_one() {
        let layout = normalize_layout(&json!({"levels": 4}), &request(4.0, SetupType::Horizontal));
        assert_eq!(layout.levels, 1);
    }

    #[test]
    fn test_vertical_levels_accepted_as_given() {
        let req = request(4.0, SetupType::Vertical);
        assert_eq!(normalize_layout(&json!({"levels": 3}), &req).levels, 3);
        assert_eq!(normalize_layout(&json!({"levels": 0}), &req).levels, 1);
        assert_eq!(normalize_layout(&json!({}), &req).levels, 1);
    }

    #[test]
    fn test_caller_inputs_override_response() {
        let value = json!({
            "setupType": "vertical",
            "selectedPlants": {"99": 1},
            "plantData": []
        });
        let req = request(4.0, SetupType::Horizontal);
        let layout = normalize_layout(&value, &req);
        assert_eq!(layout.setup_type, SetupType::Horizontal);
        assert_eq!(layout.selected_plants, req.selected_plants);
        assert_eq!(layout.plant_data, req.plant_data);
    }

    #[test]
    fn test_optional_groups_default_to_empty() {
        let layout = normalize_layout(
            &json!({"environmentalZones": {"temperature": "hot"}, "monitoringDevices": null}),
            &request(4.0, SetupType::Horizontal),
        );
        assert!(layout.environmental_zones.temperature.high.is_empty());
        assert!(layout.environmental_zones.lighting.direct.is_empty());
        assert!(layout.monitoring_devices.cameras.is_empty());
        assert!(layout.recommendations.is_empty());

        let json = serde_json::to_value(&layout).unwrap();
        assert!(json["monitoringDevices"]["drones"].is_array());
        assert!(json["nutrientDistribution"]["secondary"].is_array());
    }

    #[test]
    fn test_coordinate_groups_drop_invalid_entries() {
        let value = json!({
            "nutrientDistribution": {"primary": [[0, 0, 0], [1, 1], [2, 0, 2]]},
            "maintenanceRoutes": [[0, 0, 0], "start", [1, 0, 1]],
            "monitoringDevices": {"cameras": [[0, 0, 4], [null, 0, 4]]}
        });
        let layout = normalize_layout(&value, &request(4.0, SetupType::Horizontal));
        assert_eq!(layout.nutrient_distribution.primary.len(), 2);
        assert_eq!(layout.maintenance_routes.len(), 2);
        assert_eq!(layout.monitoring_devices.cameras, vec![[0.0, 0.0, 4.0]]);
    }

    #[test]
    fn test_layout_normalization_idempotent() {
        let value = json!({
            "matrix": [[[0, 1, 42], [10, 11, 12]], [[5, 6, 7]]],
            "recommendations": ["Group similar plants", 7],
            "waterFlow": [{"from": [0, 0, 0], "to": [1, 0, 1]}, {"from": [0], "to": []}],
            "levels": 2
        });
        let req = request(4.0, SetupType::Vertical);
        let once = normalize_layout(&value, &req);
        let twice = renormalize_layout(&once, &req);
        assert_eq!(once, twice);
    }

    fn sample_layout() -> LayoutAnalysis {
        normalize_layout(&json!({}), &request(4.0, SetupType::Horizontal))
    }

    #[test]
    fn test_task_ids_synthesized_and_unique() {
        let value = json!({"automationTasks": [
            {"name": "Check pH"},
            {"id": "", "name": "Water"},
            {"id": "dup", "name": "A"},
            {"id": "dup", "name": "B"}
        ]});
        let env = normalize_environment(&value, &sample_layout());
        let ids: HashSet<&str> = env.automation_tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), 4);
        assert!(ids.iter().all(|id| !id.is_empty()));
        assert_eq!(env.automation_tasks[2].id, "dup");
        assert!(env
            .automation_tasks
            .iter()
            .all(|t| t.priority == Priority::Medium));
    }

    #[test]
    fn test_task_fields_normalized() {
        let value = json!({"automationTasks": [{
            "id": "ph-check",
            "name": "pH check",
            "type": "Monitoring",
            "schedule": {"frequency": "weekly", "timeOfDay": "7:05", "daysOfWeek": [1, 1, 9, 3], "dayOfMonth": 40},
            "conditions": [
                {"sensor": "ph", "operator": "<", "value": 5.5, "unit": "pH"},
                {"sensor": "ec", "operator": "!=", "value": 1}
            ],
            "actions": [
                {"component": 2, "action": "dose", "value": 5, "unit": "ml"},
                {"component": 99, "action": "inspect"},
                {"component": 1}
            ],
            "priority": "critical"
        }]});
        let env = normalize_environment(&value, &sample_layout());
        let task = &env.automation_tasks[0];
        assert_eq!(task.kind, TaskKind::Monitoring);
        assert_eq!(task.schedule.frequency, TaskFrequency::Weekly);
        assert_eq!(task.schedule.time_of_day.as_deref(), Some("07:05"));
        assert_eq!(task.schedule.days_of_week, Some(vec![1, 3]));
        assert_eq!(task.schedule.day_of_month, None);
        assert_eq!(task.conditions.len(), 1);
        assert_eq!(task.actions.len(), 2);
        assert_eq!(task.actions[0].component, HydroComponentType::NutrientPump);
        assert_eq!(task.actions[1].component, HydroComponentType::Empty);
        assert_eq!(task.priority, Priority::Critical);
    }

    #[test]
    fn test_monitoring_frequency_clamped() {
        let value = json!({"monitoringPoints": [
            {"position": [0, 0, 0], "type": "temperature", "frequency": 0},
            {"position": [0, 0, 1], "type": "pH", "frequency": 86400},
            {"position": [0, 0, 2], "type": "light"},
            {"position": [0, 0], "type": "humidity", "frequency": 10},
            {"position": [0, 0, 3], "type": "radiation", "frequency": 10}
        ]});
        let env = normalize_environment(&value, &sample_layout());
        let freqs: Vec<u32> = env.monitoring_points.iter().map(|p| p.frequency).collect();
        assert_eq!(freqs, vec![1, 3600, 30]);
        assert_eq!(env.monitoring_points[1].sensor, SensorType::Ph);
    }

    #[test]
    fn test_alert_severity_defaults_to_info() {
        let value = json!({"alerts": [
            {"condition": "pH < 5.5", "message": "pH low", "actions": ["dose buffer"]},
            {"severity": "critical"}
        ]});
        let env = normalize_environment(&value, &sample_layout());
        assert_eq!(env.alerts[0].severity, Severity::Info);
        assert_eq!(env.alerts[0].actions, vec!["dose buffer"]);
        assert_eq!(env.alerts[1].severity, Severity::Critical);
        assert_eq!(env.alerts[1].message, "");
    }

    #[test]
    fn test_environment_keeps_caller_layout() {
        let layout = sample_layout();
        let env = normalize_environment(&json!({"layout": {"levels": 9}}), &layout);
        assert_eq!(env.layout, layout);
        assert!(env.automation_tasks.is_empty());
        assert_eq!(env.schedule, Schedule::default());
    }

    #[test]
    fn test_environment_normalization_idempotent() {
        let value = json!({
            "automationTasks": [{"name": "Flush"}, {"id": "t2", "priority": "low"}],
            "monitoringPoints": [{"position": [1, 1, 1], "type": "nutrient", "frequency": 5000}],
            "maintenanceRoutes": [{"points": [[0, 0, 0], [1]], "frequency": "monthly"}],
            "alerts": [{"message": "check"}],
            "schedule": {"lighting": {"on": "5:00", "intensity": 140}}
        });
        let once = normalize_environment(&value, &sample_layout());
        let twice = normalize_environment(&serde_json::to_value(&once).unwrap(), &sample_layout());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_schedule_falls_back_field_by_field() {
        let current = Schedule {
            lighting: LightingSchedule {
                on: "07:00".to_string(),
                off: "19:00".to_string(),
                intensity: 60.0,
            },
            watering: WateringSchedule {
                frequency: 3,
                duration: 10,
                start_time: "08:00".to_string(),
            },
            nutrients: NutrientSchedule {
                schedule: vec![NutrientDose {
                    time: "09:00".to_string(),
                    formula: "A+B".to_string(),
                    amount: 12.0,
                }],
            },
        };
        let value = json!({
            "lighting": {"on": "05:30", "off": "late", "intensity": -5},
            "watering": {"frequency": 6, "duration": 0}
        });
        let schedule = normalize_schedule(Some(&value), &current);
        assert_eq!(schedule.lighting.on, "05:30");
        assert_eq!(schedule.lighting.off, "19:00");
        assert_eq!(schedule.lighting.intensity, 0.0);
        assert_eq!(schedule.watering.frequency, 6);
        assert_eq!(schedule.watering.duration, 10);
        assert_eq!(schedule.watering.start_time, "08:00");
        assert_eq!(schedule.nutrients, current.nutrients);
    }

    #[test]
    fn test_nutrient_doses_validated() {
        let value = json!({"nutrients": {"schedule": [
            {"time": "08:00", "formula": "Grow A", "amount": 10},
            {"time": "bad", "amount": 10},
            {"time": "20:00", "amount": -1},
            {"time": "21:00", "amount": "4"}
        ]}});
        let schedule = normalize_schedule(Some(&value), &Schedule::default());
        assert_eq!(schedule.nutrients.schedule.len(), 2);
        assert_eq!(schedule.nutrients.schedule[1].formula, "standard");
        assert_eq!(schedule.nutrients.schedule[1].amount, 4.0);
    }
}
