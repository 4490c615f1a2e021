//! 生成管线集成测试：凭证池 + Mock 客户端 + 重试编排 + 归一化

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use hydro_planner::core::{GenerationError, TransportErrorKind};
use hydro_planner::credentials::{CredentialPool, ManualClock, PoolSettings};
use hydro_planner::domain::{
    HydroComponentType, LayoutRequest, PlantInfo, Priority, SetupType, TaskUpdate,
};
use hydro_planner::llm::{MockClientFactory, MockReply, PooledClientProvider};
use hydro_planner::{GenerationService, RetryPolicy};
use tokio_util::sync::CancellationToken;

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}

fn service(list: &[&str], factory: &MockClientFactory) -> GenerationService {
    let pool = CredentialPool::new(keys(list), PoolSettings::default()).unwrap();
    let provider = PooledClientProvider::new(Arc::new(pool), Arc::new(factory.clone()));
    GenerationService::new(Arc::new(provider))
}

fn lettuce_request(setup_type: SetupType) -> LayoutRequest {
    LayoutRequest {
        space_size: 4.0,
        selected_plants: BTreeMap::from([("lettuce".to_string(), 4)]),
        plant_data: vec![PlantInfo {
            id: "lettuce".to_string(),
            name: "Lettuce".to_string(),
            growth_time: 45,
            space_required: 0.2,
        }],
        setup_type,
        max_height: None,
    }
}

#[tokio::test]
async fn test_fenced_layout_normalized() {
    let raw = "```json\n{\"recommendations\": [\"Keep pumps near the reservoir\"], \"levels\": 3, \"setupType\": \"vertical\"}\n```";
    let factory = MockClientFactory::new().with_script([MockReply::text(raw)]);
    let svc = service(&["k1"], &factory);

    let request = lettuce_request(SetupType::Horizontal);
    let layout = svc.generate_layout(&request).await.unwrap();

    assert_eq!(layout.levels, 1);
    assert!(layout.water_flow.is_empty());
    assert_eq!(layout.dimensions(), (1, 2, 2));
    assert_eq!(layout.count(HydroComponentType::Empty), 4);
    assert_eq!(layout.setup_type, SetupType::Horizontal);
    assert_eq!(layout.selected_plants, request.selected_plants);
    assert_eq!(layout.recommendations, vec!["Keep pumps near the reservoir"]);

    let prompt = &factory.prompts()[0];
    assert!(prompt.contains("Space size: 4m²"));
    assert!(prompt.contains("- Lettuce (ID: lettuce): 4 plants"));
}

#[tokio::test]
async fn test_invalid_twice_then_valid_rotates_keys() {
    let factory = MockClientFactory::new().with_script([
        MockReply::text("Sorry, I cannot help with that."),
        MockReply::text("```json\n{\"matrix\": [[[1, 2\n```"),
        MockReply::text("{\"matrix\": [[[1, 13], [0, 3]]]}"),
    ]);
    let svc = service(&["k1", "k2", "k3"], &factory);

    let layout = svc
        .generate_layout(&lettuce_request(SetupType::Horizontal))
        .await
        .unwrap();
    assert_eq!(layout.matrix[0][0][1], HydroComponentType::Lettuce);

    let builds: Vec<String> = factory
        .builds()
        .iter()
        .map(|c| c.secret().to_string())
        .collect();
    assert_eq!(builds, vec!["k1", "k2", "k3"]);
    assert_eq!(builds.iter().collect::<HashSet<_>>().len(), 3);
    // 解析失败不标记 Key 失效
    assert!(svc.credential_status().iter().all(|s| !s.failed));
}

#[tokio::test]
async fn test_always_invalid_fails_with_parse_cause() {
    let factory = MockClientFactory::new().with_fallback(MockReply::text("definitely not json"));
    let svc = service(&["k1", "k2"], &factory);

    let err = svc
        .generate_layout(&lettuce_request(SetupType::Horizontal))
        .await
        .unwrap_err();

    match &err {
        GenerationError::GenerationFailed {
            operation,
            attempts,
            ..
        } => {
            assert_eq!(*operation, "generate_layout");
            assert_eq!(*attempts, 3);
        }
        other => panic!("Expected GenerationFailed, got {other:?}"),
    }
    assert!(matches!(
        err.root_cause(),
        GenerationError::MalformedResponse { .. }
    ));
    assert_eq!(factory.builds().len(), 3);
}

#[tokio::test]
async fn test_timeout_then_success() {
    let factory =
        MockClientFactory::new().with_script([MockReply::Hang, MockReply::text("{\"levels\": 2}")]);
    let svc = service(&["k1", "k2"], &factory).with_policy(RetryPolicy {
        max_attempts: 3,
        request_timeout: Duration::from_millis(50),
    });

    let layout = svc
        .generate_layout(&lettuce_request(SetupType::Vertical))
        .await
        .unwrap();
    assert_eq!(layout.levels, 2);
    assert_eq!(factory.builds().len(), 2);
    assert!(svc.credential_status().iter().all(|s| !s.failed));
}

#[tokio::test]
async fn test_cancel_aborts_without_marking_key() {
    let factory = MockClientFactory::new().with_fallback(MockReply::Hang);
    let svc = service(&["k1"], &factory);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = svc
        .generate_layout_with_cancel(&lettuce_request(SetupType::Horizontal), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Cancelled));
    assert_eq!(factory.builds().len(), 1);
    assert!(!svc.credential_status()[0].failed);
}

#[tokio::test]
async fn test_already_cancelled_never_calls_upstream() {
    let factory = MockClientFactory::new();
    let svc = service(&["k1"], &factory);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = svc
        .generate_layout_with_cancel(&lettuce_request(SetupType::Horizontal), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Cancelled));
    assert!(factory.builds().is_empty());
}

#[tokio::test]
async fn test_rate_limited_key_marked_failed() {
    let factory = MockClientFactory::new().with_script([
        MockReply::Fail(TransportErrorKind::RateLimited, "429 quota exceeded".to_string()),
        MockReply::text("{}"),
    ]);
    let svc = service(&["k1", "k2"], &factory);

    svc.generate_layout(&lettuce_request(SetupType::Horizontal))
        .await
        .unwrap();

    let status = svc.credential_status();
    assert!(status[0].failed);
    assert!(!status[1].failed);
}

#[tokio::test]
async fn test_exhausted_credentials_surfaced() {
    let factory = MockClientFactory::new().with_script([MockReply::Fail(
        TransportErrorKind::Auth,
        "API key not valid".to_string(),
    )]);
    let svc = service(&["k1"], &factory);

    let err = svc
        .generate_layout(&lettuce_request(SetupType::Horizontal))
        .await
        .unwrap_err();
    // 唯一的 Key 失效后池已耗尽，但最初的鉴权失败原因要保留下来
    match &err {
        GenerationError::ExhaustedAfterFailure { last_failure } => assert!(matches!(
            last_failure.as_ref(),
            GenerationError::Transport {
                kind: TransportErrorKind::Auth,
                ..
            }
        )),
        other => panic!("Expected ExhaustedAfterFailure, got {other:?}"),
    }
    assert!(err.is_exhausted());
    assert!(err.to_string().contains("API key not valid"));
    assert_eq!(factory.builds().len(), 1);
}

#[tokio::test]
async fn test_pool_recovers_after_cooldown() {
    let clock = Arc::new(ManualClock::new());
    let pool = CredentialPool::with_clock(
        keys(&["k1", "k2"]),
        PoolSettings::default(),
        clock.clone(),
    )
    .unwrap();
    let factory = MockClientFactory::new().with_script([
        MockReply::Fail(TransportErrorKind::Auth, "revoked".to_string()),
        MockReply::Fail(TransportErrorKind::Auth, "revoked".to_string()),
    ]);
    let provider = PooledClientProvider::new(Arc::new(pool), Arc::new(factory.clone()));
    let svc = GenerationService::new(Arc::new(provider));
    let request = lettuce_request(SetupType::Horizontal);

    let err = svc.generate_layout(&request).await.unwrap_err();
    assert!(err.is_exhausted());
    assert!(err.to_string().contains("revoked"));

    // 冷却期内不再尝试任何 Key，也就没有可附带的失败原因
    let err = svc.generate_layout(&request).await.unwrap_err();
    assert!(matches!(err, GenerationError::ExhaustedCredentials));
    assert_eq!(factory.builds().len(), 2);

    clock.advance(Duration::from_secs(61));
    let layout = svc.generate_layout(&request).await.unwrap();
    assert_eq!(layout.levels, 1);
    assert!(svc.credential_status().iter().all(|s| !s.failed));
}

#[tokio::test]
async fn test_environment_optimize_and_task_helpers() {
    let environment_json = r#"```json
{
  "automationTasks": [
    {"name": "pH check", "type": "monitoring", "schedule": {"frequency": "daily", "timeOfDay": "08:00"},
     "conditions": [{"sensor": "pH", "operator": "<", "value": 5.5, "unit": "pH"}],
     "actions": [{"component": 2, "action": "dose_buffer", "value": 5, "unit": "ml"}]},
    {"id": "flush", "name": "Flush lines", "type": "maintenance", "schedule": {"frequency": "weekly", "daysOfWeek": [0]}, "priority": "high"}
  ],
  "monitoringPoints": [{"position": [0, 0, 0], "type": "pH", "frequency": 0}],
  "alerts": [{"condition": "pH < 5.0", "message": "pH critically low", "actions": ["notify"]}]
}
```"#;
    let schedule_json = r#"{"lighting": {"on": "05:30", "off": "21:30", "intensity": 65}, "watering": {"frequency": 6, "duration": 10, "startTime": "06:00"}}"#;

    let factory = MockClientFactory::new().with_script([
        MockReply::text("{}"),
        MockReply::text(environment_json),
        MockReply::text(schedule_json),
    ]);
    let svc = service(&["k1", "k2"], &factory);

    let layout = svc
        .generate_layout(&lettuce_request(SetupType::Horizontal))
        .await
        .unwrap();
    let env = svc.generate_virtual_environment(&layout).await.unwrap();

    assert_eq!(env.layout, layout);
    assert_eq!(env.automation_tasks.len(), 2);
    assert!(env.automation_tasks[0].id.starts_with("task-"));
    assert_eq!(env.automation_tasks[0].priority, Priority::Medium);
    assert_eq!(env.automation_tasks[1].id, "flush");
    assert_eq!(env.monitoring_points[0].frequency, 1);
    assert_eq!(env.alerts[0].severity, hydro_planner::domain::Severity::Info);

    let optimized = svc.optimize_schedule(&env).await.unwrap();
    assert_eq!(optimized.schedule.lighting.on, "05:30");
    assert_eq!(optimized.schedule.watering.frequency, 6);
    assert_eq!(optimized.automation_tasks, env.automation_tasks);
    assert!(factory.prompts()[2].contains("Current Schedule:"));

    let updated = optimized
        .update_task(
            "flush",
            TaskUpdate {
                priority: Some(Priority::Low),
                ..TaskUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(updated.task("flush").unwrap().priority, Priority::Low);
    assert_eq!(optimized.task("flush").unwrap().priority, Priority::High);

    let removed = updated.remove_task("flush").unwrap();
    assert_eq!(removed.automation_tasks.len(), 1);
    assert!(matches!(
        removed.remove_task("flush"),
        Err(GenerationError::TaskNotFound(_))
    ));

    let copy = removed.automation_tasks[0].clone();
    let added = removed.add_task(copy.clone());
    assert_eq!(added.automation_tasks.len(), 2);
    assert_ne!(added.automation_tasks[1].id, copy.id);
}
