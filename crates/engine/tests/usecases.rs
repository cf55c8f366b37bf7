mod common;

use std::time::Duration;

use engine::automation::AdHocTarget;
use engine::model::{DeviceAuthInput, DeviceStatus, ExecutionMode, SshAuthType, User};
use engine::usecase::ProbeStatus;
use engine::vault::REDACTED;

use common::{check_playbook, enroll, fixture};

#[tokio::test]
async fn redaction_round_trip_keeps_ciphertext() {
    let f = fixture();
    enroll(&f, "dev-1", "10.0.0.1").await;

    let input = |password: &str| DeviceAuthInput {
        auth_type: SshAuthType::Password,
        ssh_user: Some("pi".to_string()),
        ssh_password: Some(password.to_string()),
        ..Default::default()
    };

    f.ctx.add_or_update_device_auth("dev-1", input("s1")).await.unwrap();
    let view = f.ctx.get_device_auth("dev-1").await.unwrap();
    assert_eq!(view.ssh_password.as_deref(), Some(REDACTED));
    let sealed = f.ctx.store.auths.find_one_by_device("dev-1").await.unwrap().unwrap().ssh_password;

    tokio_test::assert_ok!(f.ctx.add_or_update_device_auth("dev-1", input(REDACTED)).await);
    let after = f.ctx.store.auths.find_one_by_device("dev-1").await.unwrap().unwrap().ssh_password;

    assert_eq!(sealed, after);
    assert_eq!(f.ctx.vault.decrypt_default(&after.unwrap()).unwrap(), "s1");
}

#[tokio::test]
async fn action_without_live_watcher_makes_no_remote_call() {
    let f = fixture();
    enroll(&f, "dev-1", "10.0.0.1").await;
    let runtime = f.connector.runtime("10.0.0.1");

    let err = f.ctx.perform_action("dev-1", "c1", "start").await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert_eq!(f.connector.connect_count(), 0);
    assert!(runtime.calls().await.is_empty());
}

#[tokio::test]
async fn unreachable_runtime_probe_fails_within_timeout() {
    let f = fixture();
    enroll(&f, "dev-1", "10.0.0.1").await;

    let started = std::time::Instant::now();
    let result = f.ctx.check_device_docker_connection("dev-1").await;
    assert_eq!(result.status, ProbeStatus::Failed);
    assert!(!result.message.unwrap_or_default().is_empty());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn hanging_runtime_probe_fails_at_the_ceiling() {
    let f = fixture();
    enroll(&f, "dev-1", "10.0.0.1").await;
    f.connector.runtime("10.0.0.1").set_delay(Some(Duration::from_secs(30))).await;

    let result = tokio::time::timeout(Duration::from_secs(5), f.ctx.check_device_docker_connection("dev-1"))
        .await
        .unwrap();
    assert_eq!(result.status, ProbeStatus::Failed);
    assert!(result.message.unwrap().contains("timed out"));
}

#[tokio::test]
async fn execution_has_no_status_until_reported() {
    let f = fixture();
    f.ctx.store.playbooks.save(check_playbook()).await.unwrap();
    let playbook = f.ctx.playbooks.find_check_playbook().await.unwrap();

    let id = f
        .ctx
        .playbooks
        .execute_playbook(&playbook, &User::new("admin"), None, vec![], ExecutionMode::Apply)
        .await
        .unwrap();

    assert!(!id.is_empty());
    assert!(f.ctx.tracker.get_status(&id).await.unwrap().is_empty());
    assert!(f.ctx.tracker.get_logs(&id).await.unwrap().is_empty());
    assert!(f.ctx.tracker.get_task(&id).await.unwrap().is_some());
}

#[tokio::test]
async fn adhoc_automation_check_never_touches_the_store() {
    let f = fixture();
    f.ctx.store.playbooks.save(check_playbook()).await.unwrap();

    let target = AdHocTarget {
        ip: "192.168.1.50".to_string(),
        auth_type: SshAuthType::Password,
        ssh_user: Some("root".to_string()),
        ssh_password: Some("toor".to_string()),
        ..Default::default()
    };
    let handle = f.ctx.check_ansible_connection(&User::new("admin"), &target).await.unwrap();

    assert_eq!(handle.task_id, "exec-0");
    assert!(f.ctx.store.devices.find_all().await.unwrap().is_empty());
    let inventories = f.runner.inventories.lock().unwrap();
    let json = inventories[0].to_json().unwrap();
    assert!(json.contains("192.168.1.50"));
    assert!(!json.contains("toor"));
}

#[tokio::test]
async fn delete_device_removes_everything_it_owns() {
    let f = fixture();
    let device = enroll(&f, "dev-1", "10.0.0.1").await;
    let runtime = f.connector.runtime("10.0.0.1");
    runtime.add_container("a", "web", "running").await;
    f.ctx.watchers.register_watcher(&device).await.unwrap();

    let watcher = f.ctx.watchers.docker_watcher("dev-1").unwrap();
    watcher.reconcile_now().await;

    f.ctx.delete_device("dev-1").await.unwrap();

    assert!(f.ctx.watchers.docker_watcher("dev-1").is_none());
    assert!(!watcher.is_live().await);
    assert!(f.ctx.store.devices.find_one_by_uuid("dev-1").await.unwrap().is_none());
    assert!(f.ctx.store.auths.find_one_by_device("dev-1").await.unwrap().is_none());
    assert!(f.ctx.store.containers.find_by_device("dev-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn reported_facts_bring_a_device_back_online() {
    let f = fixture();
    let mut device = enroll(&f, "dev-1", "10.0.0.1").await;
    device.status = DeviceStatus::Offline;
    f.ctx.store.devices.update(device).await.unwrap();

    let report: engine::usecase::FactsReport =
        serde_json::from_str(r#"{"ip": "10.0.0.7", "os_distro": "Raspbian GNU/Linux", "cpu_speed": 1.8, "mem": 4096}"#)
            .unwrap();
    let updated = f.ctx.update_device_from_facts("dev-1", report).await.unwrap();

    assert_eq!(updated.status, DeviceStatus::Online);
    assert_eq!(updated.facts.os_logo.as_deref(), Some("raspbian"));
    let overview = f.ctx.devices_overview().await.unwrap();
    assert_eq!(overview.online, 1);
    assert_eq!(overview.total_mem, Some(4.0));
}
