//! 自动化任务管理：新增 / 更新 / 删除，均返回新的 VirtualEnvironment，原值不变
//!
//! 任务 id 在列表内始终非空且唯一：新增时 id 为空或重复会重新生成。

use serde::{Deserialize, Serialize};

use crate::core::GenerationError;
use crate::domain::{
    AutomationTask, Priority, TaskAction, TaskCondition, TaskKind, TaskSchedule,
    VirtualEnvironment,
};

/// 生成任务 id：`task-` + 9 位随机十六进制
pub fn new_task_id() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    format!("task-{}", &raw[..9])
}

/// 任务的部分更新；None 表示保持原值，id 不可修改
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<TaskKind>,
    pub schedule: Option<TaskSchedule>,
    pub conditions: Option<Vec<TaskCondition>>,
    pub actions: Option<Vec<TaskAction>>,
    pub priority: Option<Priority>,
}

impl TaskUpdate {
    fn apply(self, task: &mut AutomationTask) {
        if let Some(name) = self.name {
            task.name = name;
        }
        if let Some(kind) = self.kind {
            task.kind = kind;
        }
        if let Some(schedule) = self.schedule {
            task.schedule = schedule;
        }
        if let Some(conditions) = self.conditions {
            task.conditions = conditions;
        }
        if let Some(actions) = self.actions {
            task.actions = actions;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
    }
}

impl VirtualEnvironment {
    pub fn add_task(&self, mut task: AutomationTask) -> VirtualEnvironment {
        if task.id.trim().is_empty() || self.task(&task.id).is_some() {
            let id = new_task_id();
            tracing::debug!("Assigning new id {} to task '{}'", id, task.name);
            task.id = id;
        }

        let mut env = self.clone();
        env.automation_tasks.push(task);
        env
    }

    pub fn update_task(
        &self,
        task_id: &str,
        update: TaskUpdate,
    ) -> Result<VirtualEnvironment, GenerationError> {
        let mut env = self.clone();
        let task = env
            .automation_tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| GenerationError::TaskNotFound(task_id.to_string()))?;
        update.apply(task);
        Ok(env)
    }

    pub fn remove_task(&self, task_id: &str) -> Result<VirtualEnvironment, GenerationError> {
        if self.task(task_id).is_none() {
            return Err(GenerationError::TaskNotFound(task_id.to_string()));
        }

        let mut env = self.clone();
        env.automation_tasks.retain(|t| t.id != task_id);
        Ok(env)
    }
}
