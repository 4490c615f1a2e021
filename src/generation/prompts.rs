//! 提示词组装：固定任务说明 + 组件编码图例 + 调用方参数
//!
//! 输出只依赖输入，同一请求得到同一提示词。

use crate::domain::{HydroComponentType, LayoutAnalysis, LayoutRequest, SetupType, VirtualEnvironment};

/// 立体架未给出高度时的默认值（米）
pub const DEFAULT_MAX_HEIGHT: f64 = 3.0;

const LAYOUT_TASK: &str = "You are a hydroponic system layout optimizer. Return a valid JSON object with a 3D matrix that represents the optimal placement of plants, components, and monitoring devices. Consider the space size, selected plants, and setup type (horizontal or vertical).";

const LAYOUT_EXAMPLE: &str = r#"{
  "matrix": [
    [
      [0, 1, 10, 0, 6],
      [2, 0, 12, 0, 0],
      [0, 11, 0, 3, 6]
    ],
    [
      [0, 5, 13, 0, 0],
      [3, 0, 14, 0, 7],
      [0, 15, 0, 5, 0]
    ]
  ],
  "recommendations": [
    "Group similar plants for efficient nutrient distribution",
    "Place cameras strategically for maximum coverage"
  ],
  "waterFlow": [
    { "from": [0, 0, 0], "to": [2, 0, 1] }
  ],
  "nutrientDistribution": {
    "primary": [[0, 0, 0], [2, 0, 2]],
    "secondary": [[1, 0, 1]]
  },
  "environmentalZones": {
    "temperature": { "high": [[0, 0, 0]], "low": [[2, 0, 2]] },
    "humidity": { "high": [[0, 0, 0]], "low": [[2, 0, 2]] },
    "lighting": { "direct": [[0, 0, 0]], "indirect": [[2, 0, 2]] }
  },
  "maintenanceRoutes": [[0, 0, 0], [1, 0, 1], [2, 0, 2]],
  "setupType": "vertical",
  "levels": 2,
  "monitoringDevices": {
    "cameras": [[0, 0, 4], [2, 0, 4]],
    "drones": [[1, 1, 1]]
  }
}"#;

const LAYOUT_GUIDELINES: &str = "Consider:
1. Group similar plants together
2. Place water pumps and nutrient pumps strategically
3. Distribute sensor nodes evenly
4. Leave appropriate spacing between plants
5. For vertical setups, use multiple levels and add vertical supports
6. Optimize light distribution, especially for vertical setups
7. Create efficient water flow and nutrient distribution paths
8. Design maintenance routes for easy access to all plants and components
9. Place cameras for optimal coverage (1 camera per square meter for small setups)
10. Use drones for larger setups to monitor hard-to-reach areas";

const ENVIRONMENT_TASK: &str = "You are a hydroponic system automation expert. Generate a complete virtual environment setup based on the provided layout. Include automation tasks, monitoring points, maintenance routes, alerts, and schedules.";

const ENVIRONMENT_STRUCTURE: &str = r#"{
  "automationTasks": [
    {
      "id": "unique_id",
      "name": "Task Name",
      "type": "monitoring|maintenance|alert|control",
      "schedule": {
        "frequency": "hourly|daily|weekly|monthly|on_demand",
        "timeOfDay": "HH:MM (optional)",
        "daysOfWeek": "[0-6] (optional)",
        "dayOfMonth": "1-31 (optional)"
      },
      "conditions": [
        { "sensor": "sensor_name", "operator": ">|<|=|>=|<=", "value": 0, "unit": "unit_string" }
      ],
      "actions": [
        { "component": "component code", "action": "action_string", "value": 0, "unit": "unit_string" }
      ],
      "priority": "low|medium|high|critical"
    }
  ],
  "monitoringPoints": [
    { "position": [0, 0, 0], "type": "temperature|humidity|pH|nutrient|light", "frequency": 30 }
  ],
  "maintenanceRoutes": [
    { "name": "route_name", "points": [[0, 0, 0]], "frequency": "daily|weekly|monthly" }
  ],
  "alerts": [
    { "condition": "condition_string", "severity": "info|warning|error|critical", "message": "alert_message", "actions": ["action1"] }
  ],
  "schedule": {
    "lighting": { "on": "HH:MM", "off": "HH:MM", "intensity": 80 },
    "watering": { "frequency": 4, "duration": 15, "startTime": "HH:MM" },
    "nutrients": { "schedule": [{ "time": "HH:MM", "formula": "formula_string", "amount": 10 }] }
  }
}"#;

const ENVIRONMENT_GUIDELINES: &str = "Consider:
1. Optimal sensor placement for complete coverage
2. Efficient maintenance routes
3. Plant-specific requirements
4. Energy efficiency
5. Early warning systems and automated responses to common issues
6. Schedule optimization for plant growth
7. Monitoring frequencies between 1 and 3600 seconds";

const SCHEDULE_TASK: &str = "Optimize the following hydroponic system schedule for maximum efficiency and plant growth. Return ONLY a JSON object with the same structure as the current schedule (\"lighting\", \"watering\", \"nutrients\").";

const SCHEDULE_GUIDELINES: &str = "Consider:
1. Plant types and their specific needs
2. Energy efficiency and peak usage hours
3. Resource optimization and water conservation
4. Growth cycles and light requirements
5. Maintenance windows
6. System stability and redundancy";

const JSON_ONLY: &str = "Return ONLY the JSON object, no additional text.";

fn legend_section() -> String {
    format!(
        "The matrix is a 3D array [level][row][column] where each number represents:\n{}",
        HydroComponentType::legend()
    )
}

/// 每种已选植物一行；目录中查不到时以 id 作为名称
fn plant_lines(request: &LayoutRequest) -> String {
    if request.selected_plants.is_empty() {
        return "- (none)".to_string();
    }
    request
        .selected_plants
        .iter()
        .map(|(id, quantity)| {
            match request.plant_data.iter().position(|p| &p.id == id) {
                Some(index) => {
                    let plant = &request.plant_data[index];
                    let mut line = format!(
                        "- {} (ID: {}): {} plants, Growth time: {} days, Space required: {}m²",
                        plant.name, id, quantity, plant.growth_time, plant.space_required
                    );
                    // 目录第 N 个植物对应矩阵编码 10 + N；超出编码表的不标注
                    if let Some(component) = HydroComponentType::from_catalog_index(index) {
                        line.push_str(&format!(", Matrix code: {}", component.code()));
                    }
                    line
                }
                None => format!("- {} (ID: {}): {} plants", id, id, quantity),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn layout_prompt(request: &LayoutRequest) -> String {
    let mut parameters = format!(
        "Space size: {}m²\nSetup type: {}",
        request.space_size, request.setup_type
    );
    if request.setup_type == SetupType::Vertical {
        let height = request.max_height.unwrap_or(DEFAULT_MAX_HEIGHT);
        parameters.push_str(&format!("\nMax height: {}m", height));
    }

    format!(
        "{LAYOUT_TASK}\n\n{}\n\nExample response format:\n{LAYOUT_EXAMPLE}\n\n{LAYOUT_GUIDELINES}\n\n{parameters}\n\nSelected plants:\n{}\n\n{JSON_ONLY}",
        legend_section(),
        plant_lines(request),
    )
}

pub fn environment_prompt(layout: &LayoutAnalysis) -> String {
    let layout_json = serde_json::to_string_pretty(layout).unwrap_or_default();
    format!(
        "{ENVIRONMENT_TASK}\n\nThe response should be a valid JSON object following this structure:\n{ENVIRONMENT_STRUCTURE}\n\nComponent codes:\n{}\n\n{ENVIRONMENT_GUIDELINES}\n\nLayout Details:\n{layout_json}\n\n{JSON_ONLY}",
        HydroComponentType::legend(),
    )
}

pub fn schedule_prompt(environment: &VirtualEnvironment) -> String {
    let schedule_json = serde_json::to_string_pretty(&environment.schedule).unwrap_or_default();
    let layout_json = serde_json::to_string_pretty(&environment.layout).unwrap_or_default();
    format!(
        "{SCHEDULE_TASK}\n\nCurrent Schedule:\n{schedule_json}\n\nComponent codes:\n{}\n\nLayout Details:\n{layout_json}\n\n{SCHEDULE_GUIDELINES}\n\n{JSON_ONLY}",
        HydroComponentType::legend(),
    )
}
