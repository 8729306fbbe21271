//! OS signals delivered to the test process itself.
#![cfg(unix)]

use std::time::{Duration, Instant};

use ignition::config::ConfigSource;
use ignition::events::HandlerResult;
use ignition::lifecycle::{Bootstrap, Context, LifecycleState};
use tokio::signal::unix::{signal, SignalKind};

mod common;
use common::{entries, journal};

fn config_named(name: &str) -> String {
    format!("[app]\nname = \"{name}\"\n[server]\nhost = \"127.0.0.1\"\nport = 0\n")
}

async fn kill(signal: &str) {
    let status = tokio::process::Command::new("kill")
        .args([signal, &std::process::id().to_string()])
        .status()
        .await
        .unwrap();
    assert!(status.success(), "kill {signal} failed");
}

#[tokio::test]
async fn sighup_reloads_and_sigterm_shuts_down() {
    // Keep the default dispositions from killing the test binary.
    let _terminate = signal(SignalKind::terminate()).unwrap();
    let _hangup = signal(SignalKind::hangup()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, config_named("before")).unwrap();

    let journal = journal();
    let recorded = journal.clone();
    let app = Bootstrap::from_source(&ConfigSource::new(&path))
        .unwrap()
        .on_shutdown(move |_ctx: Context| {
            recorded.lock().unwrap().push("shutdown".to_string());
            std::future::ready(HandlerResult::Ok(()))
        });

    // Written before the file watcher exists, so only SIGHUP can pick it up.
    std::fs::write(&path, config_named("after")).unwrap();

    let mut running = common::start(app).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(running.ctx.config().current().app.name, "before");

    kill("-HUP").await;
    let deadline = Instant::now() + Duration::from_secs(5);
    while running.ctx.config().current().app.name != "after" {
        assert!(Instant::now() < deadline, "SIGHUP did not reload the config");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(!running.ctx.shutdown().is_triggered());
    assert_eq!(*running.state.borrow(), LifecycleState::Running);

    kill("-TERM").await;
    common::wait_for(&mut running.state, LifecycleState::Stopped).await;
    assert!(running.ctx.shutdown().is_triggered());
    running.finish().await.unwrap();
    assert_eq!(entries(&journal), vec!["shutdown"]);
}
