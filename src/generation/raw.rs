//! 上游 JSON 的「原始形状」：所有字段可选、不定类型
//!
//! 先把解析出的 Value 宽松地映射到 Raw* 结构（顶层不是对象时得到全 None），
//! 再由 normalize 模块逐字段转换为领域类型。这里的辅助函数只做「取值 + 判合法」，不做兜底。

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::{Coordinate3D, HydroComponentType};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawLayout {
    pub matrix: Option<Value>,
    pub recommendations: Option<Value>,
    pub water_flow: Option<Value>,
    pub nutrient_distribution: Option<Value>,
    pub environmental_zones: Option<Value>,
    pub maintenance_routes: Option<Value>,
    pub levels: Option<Value>,
    pub monitoring_devices: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawEnvironment {
    pub automation_tasks: Option<Value>,
    pub monitoring_points: Option<Value>,
    pub maintenance_routes: Option<Value>,
    pub alerts: Option<Value>,
    pub schedule: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawTask {
    pub id: Option<Value>,
    pub name: Option<Value>,
    #[serde(rename = "type")]
    pub kind: Option<Value>,
    pub schedule: Option<Value>,
    pub conditions: Option<Value>,
    pub actions: Option<Value>,
    pub priority: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawMonitoringPoint {
    pub position: Option<Value>,
    #[serde(rename = "type")]
    pub sensor: Option<Value>,
    pub frequency: Option<Value>,
    pub last_value: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawRoute {
    pub name: Option<Value>,
    pub points: Option<Value>,
    pub frequency: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawAlert {
    pub condition: Option<Value>,
    pub severity: Option<Value>,
    pub message: Option<Value>,
    pub actions: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawSchedule {
    pub lighting: Option<Value>,
    pub watering: Option<Value>,
    pub nutrients: Option<Value>,
}

/// 宽松映射：类型不符时返回 Default（全 None），永不失败
pub fn lenient<T: DeserializeOwned + Default>(value: &Value) -> T {
    T::deserialize(value).unwrap_or_default()
}

pub fn lenient_opt<T: DeserializeOwned + Default>(value: Option<&Value>) -> T {
    value.map(lenient).unwrap_or_default()
}

/// 数组元素；缺失或不是数组时为空
pub fn items(value: Option<&Value>) -> &[Value] {
    value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub fn field<'a>(value: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    value.and_then(|v| v.get(key)).filter(|v| !v.is_null())
}

/// 恰好 3 个有限数值，否则 None
pub fn coordinate(value: &Value) -> Option<Coordinate3D> {
    let parts = value.as_array()?;
    if parts.len() != 3 {
        return None;
    }
    let mut out = [0.0; 3];
    for (slot, part) in out.iter_mut().zip(parts) {
        let n = part.as_f64()?;
        if !n.is_finite() {
            return None;
        }
        *slot = n;
    }
    Some(out)
}

/// 坐标列表：非法坐标直接丢弃
pub fn coordinates(value: Option<&Value>) -> Vec<Coordinate3D> {
    let all = items(value);
    let kept: Vec<Coordinate3D> = all.iter().filter_map(coordinate).collect();
    if kept.len() < all.len() {
        tracing::debug!("Dropped {} invalid coordinates", all.len() - kept.len());
    }
    kept
}

/// 非空字符串（去首尾空白）
pub fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

pub fn strings(value: Option<&Value>) -> Vec<String> {
    items(value).iter().filter_map(|v| text(Some(v))).collect()
}

/// 有限数值；模型偶尔把数字写成字符串，一并接受
pub fn number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// 整数值（允许 3.0，拒绝 3.5）
pub fn integer(value: Option<&Value>) -> Option<i64> {
    number(value)
        .filter(|n| n.fract() == 0.0)
        .map(|n| n as i64)
}

/// 枚举字符串：先按原样匹配，再按小写匹配
pub fn enum_value<T: DeserializeOwned>(value: Option<&Value>) -> Option<T> {
    let s = value?.as_str()?.trim();
    serde_json::from_value(Value::String(s.to_string()))
        .or_else(|_| serde_json::from_value(Value::String(s.to_lowercase())))
        .ok()
}

/// "HH:MM"（24 小时制），统一输出两位小时
pub fn clock_time(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?.trim();
    chrono::NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| chrono::NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
        .map(|t| t.format("%H:%M").to_string())
}

/// 组件：数值编码或名称（如 "WATER_PUMP"）；无法识别时为 EMPTY
pub fn component(value: Option<&Value>) -> HydroComponentType {
    let Some(value) = value else {
        return HydroComponentType::Empty;
    };
    if let Some(c) = HydroComponentType::from_json(value) {
        return c;
    }
    value
        .as_str()
        .and_then(|name| {
            let name = name.trim().to_uppercase();
            HydroComponentType::ALL
                .iter()
                .copied()
                .find(|c| c.name() == name)
        })
        .unwrap_or_default()
}
