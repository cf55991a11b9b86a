//! End-to-end pipeline tests: middleware chain around bus dispatch,
//! tracked submissions, retry and recovery across engine restarts.

use holo_event::ShellEvent;
use holo_middleware::testing::MockMiddleware;
use holo_middleware::MiddlewarePhase;
use holo_runtime::{
    EngineConfig, LifecycleConfig, MemoryStore, ShellEngine, Status, SubmitOptions,
    SubscribeOptions,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn theme(theme: &str) -> ShellEvent {
    ShellEvent::ThemeChanged {
        theme: theme.into(),
    }
}

/// Collects events a listener observes.
fn recording_listener(
    log: &Arc<Mutex<Vec<ShellEvent>>>,
) -> impl Fn(&ShellEvent) -> Result<(), holo_bus::ListenerError> + Send + Sync {
    let log = Arc::clone(log);
    move |ev| {
        log.lock().push(ev.clone());
        Ok(())
    }
}

#[tokio::test]
async fn dispatch_runs_before_bus_after() {
    let engine = ShellEngine::builder().build().await.unwrap();
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let before_log = Arc::clone(&order);
    engine
        .middlewares()
        .register(Arc::new(MockMiddleware::modifier(
            "stamp",
            MiddlewarePhase::Before,
            move |ctx| {
                before_log.lock().push("before");
                ctx.metadata.insert("stamped".into(), json!(true));
            },
        )));

    let after_seen: Arc<Mutex<Option<serde_json::Value>>> = Arc::new(Mutex::new(None));
    let after_sink = Arc::clone(&after_seen);
    let after_log = Arc::clone(&order);
    engine
        .middlewares()
        .register(Arc::new(MockMiddleware::modifier(
            "observe",
            MiddlewarePhase::After,
            move |ctx| {
                after_log.lock().push("after");
                *after_sink.lock() = ctx.metadata.get("stamped").cloned();
            },
        )));

    let bus_log = Arc::clone(&order);
    engine
        .bus()
        .subscribe(
            "theme:changed",
            move |_ev: &ShellEvent| {
                bus_log.lock().push("listener");
                Ok(())
            },
            SubscribeOptions::default(),
        )
        .unwrap();

    let report = engine.dispatch(theme("dark"), "settings").await.unwrap();

    assert_eq!(report.delivered, 1);
    assert!(!report.suppressed);
    assert_eq!(*order.lock(), vec!["before", "listener", "after"]);
    // Metadata flows from the before phase into the after phase.
    assert_eq!(*after_seen.lock(), Some(json!(true)));

    engine.shutdown().await;
}

#[tokio::test]
async fn before_halt_suppresses_fan_out() {
    let engine = ShellEngine::builder().build().await.unwrap();
    engine
        .middlewares()
        .register(Arc::new(MockMiddleware::halter(
            "suppressor",
            MiddlewarePhase::Before,
        )));

    let received = Arc::new(Mutex::new(Vec::new()));
    engine
        .bus()
        .subscribe(
            "theme:changed",
            recording_listener(&received),
            SubscribeOptions::default(),
        )
        .unwrap();

    let report = engine.dispatch(theme("dark"), "settings").await.unwrap();

    assert!(report.suppressed);
    assert_eq!(report.delivered, 0);
    assert!(received.lock().is_empty());

    engine.shutdown().await;
}

#[tokio::test]
async fn middleware_failure_reraised_after_error_phase() {
    let engine = ShellEngine::builder().build().await.unwrap();
    engine
        .middlewares()
        .register(Arc::new(MockMiddleware::failer(
            "guard",
            MiddlewarePhase::Before,
            "denied",
        )));
    let on_error = MockMiddleware::pass_through("on-error", MiddlewarePhase::Error);
    let error_calls = on_error.call_count.clone();
    engine.middlewares().register(Arc::new(on_error));

    let err = engine.dispatch(theme("dark"), "settings").await.unwrap_err();

    assert!(err.to_string().contains("guard"));
    assert_eq!(error_calls.load(std::sync::atomic::Ordering::SeqCst), 1);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn tracked_submission_reaches_listeners() {
    let engine = ShellEngine::builder().build().await.unwrap();
    let received = Arc::new(Mutex::new(Vec::new()));
    engine
        .bus()
        .subscribe(
            "app:opened",
            recording_listener(&received),
            SubscribeOptions::default(),
        )
        .unwrap();

    let id = engine
        .submit_tracked(
            ShellEvent::AppOpened {
                app_id: "files".into(),
            },
            SubmitOptions::default(),
        )
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    let record = engine.lifecycle().record(id).unwrap();
    assert_eq!(record.status, Status::Completed);
    assert_eq!(record.metadata["result"]["delivered"], json!(1));
    assert_eq!(
        received.lock().as_slice(),
        &[ShellEvent::AppOpened {
            app_id: "files".into()
        }]
    );

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn tracked_dependencies_dispatch_in_order() {
    let engine = ShellEngine::builder().build().await.unwrap();
    let received = Arc::new(Mutex::new(Vec::new()));
    for event in ["app:opened", "window:focus"] {
        engine
            .bus()
            .subscribe(event, recording_listener(&received), SubscribeOptions::default())
            .unwrap();
    }

    let first = engine
        .submit_tracked(
            ShellEvent::AppOpened {
                app_id: "files".into(),
            },
            SubmitOptions::default(),
        )
        .await
        .unwrap();
    engine
        .submit_tracked(
            ShellEvent::WindowFocused {
                window_id: "win-1".into(),
            },
            SubmitOptions::default().depends_on([first]),
        )
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    let names: Vec<String> = received.lock().iter().map(|e| e.name().to_string()).collect();
    assert_eq!(names, vec!["app:opened", "window:focus"]);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn tracked_failure_retries_then_emits_error_event() {
    let mut config = EngineConfig::default();
    config.lifecycle.default_max_retries = 1;
    let engine = ShellEngine::builder().with_config(config).build().await.unwrap();

    // Fail only notification dispatches; lifecycle:error must pass.
    engine
        .middlewares()
        .register(Arc::new(
            MockMiddleware::failer("notifier-down", MiddlewarePhase::Before, "renderer gone")
                .with_applies(|ctx| ctx.event == "notification:posted"),
        ));

    let id = engine
        .submit_tracked(
            ShellEvent::NotificationPosted {
                title: "Update".into(),
                body: "Ready".into(),
            },
            SubmitOptions::default(),
        )
        .await
        .unwrap();

    let error_event = engine
        .bus()
        .wait_for("lifecycle:error", Some(Duration::from_secs(10)))
        .await
        .unwrap();

    let payload = error_event.payload_json();
    assert_eq!(payload["event"], json!("notification:posted"));
    assert_eq!(payload["status"], json!("failed"));
    assert!(payload["error"].as_str().unwrap().contains("renderer gone"));

    let record = engine.lifecycle().record(id).unwrap();
    assert_eq!(record.status, Status::Failed);
    assert_eq!(record.retry_count, 2); // initial attempt + one retry

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn recovery_resumes_tracked_work_after_restart() {
    let store = MemoryStore::new();
    let config = EngineConfig {
        lifecycle: LifecycleConfig {
            default_max_retries: 10,
            ..Default::default()
        },
        ..Default::default()
    };

    // First engine: dispatch fails every time, so the record is still
    // non-terminal (retrying) when the engine goes down.
    let first = ShellEngine::builder()
        .with_config(config.clone())
        .with_store(Arc::new(store.clone()))
        .build()
        .await
        .unwrap();
    first
        .middlewares()
        .register(Arc::new(MockMiddleware::failer(
            "outage",
            MiddlewarePhase::Before,
            "subsystem offline",
        )));

    let id = first
        .submit_tracked(
            ShellEvent::AppOpened {
                app_id: "files".into(),
            },
            SubmitOptions::default(),
        )
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(first.lifecycle().status_of(id), Some(Status::Retrying));
    first.shutdown().await;

    // Second engine over the same store, outage resolved: recovery
    // demotes the record to pending and the drive loop completes it.
    let second = ShellEngine::builder()
        .with_config(config)
        .with_store(Arc::new(store.clone()))
        .build()
        .await
        .unwrap();
    let received = Arc::new(Mutex::new(Vec::new()));
    second
        .bus()
        .subscribe(
            "app:opened",
            recording_listener(&received),
            SubscribeOptions::default(),
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(second.lifecycle().status_of(id), Some(Status::Completed));
    assert_eq!(received.lock().len(), 1);

    second.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn custom_events_round_trip_through_tracking() {
    let engine = ShellEngine::builder().build().await.unwrap();
    let received = Arc::new(Mutex::new(Vec::new()));
    engine
        .bus()
        .subscribe(
            "plugin:sync",
            recording_listener(&received),
            SubscribeOptions::default(),
        )
        .unwrap();

    engine
        .submit_tracked(
            ShellEvent::custom("plugin:sync", json!({"cursor": 42})),
            SubmitOptions::default(),
        )
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    {
        let events = received.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload_json(), json!({"cursor": 42}));
    }

    engine.shutdown().await;
}
