use super::Pipeline;
use bulwark_command::{CommandStatus, IsolationLayer};
use std::io;
use std::time::Duration;
use tower::{service_fn, Layer, Service, ServiceBuilder, ServiceExt};

#[tokio::test]
async fn layer_composes_with_service_builder() {
    let p = Pipeline::new(&[]);
    let mut service = ServiceBuilder::new()
        .layer(IsolationLayer::new(p.invoker.clone(), "Geo", "Lookup"))
        .service(service_fn(|city: String| async move {
            Ok::<_, io::Error>(city.to_uppercase())
        }));

    for city in ["lisbon", "oslo"] {
        let response = service.ready().await.unwrap().call(city.to_string()).await;
        assert_eq!(response.unwrap(), city.to_uppercase());
    }
    assert_eq!(p.count("command_invoked"), 2);
}

#[tokio::test(start_paused = true)]
async fn layer_timeout_can_be_overridden_by_configuration() {
    let p = Pipeline::new(&[("command.Geo.Slow.Timeout", "20")]);
    let service = IsolationLayer::new(p.invoker.clone(), "Geo", "Slow")
        .timeout(Duration::from_secs(5))
        .layer(service_fn(|_: ()| async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, io::Error>(())
        }));

    let err = service.oneshot(()).await.unwrap_err();
    assert_eq!(err.status(), Some(CommandStatus::TimedOut));
}

#[tokio::test]
async fn tripped_breaker_rejects_requests_before_the_service_sees_them() {
    let p = Pipeline::new(&[("breaker.Geo.forceTripped", "true")]);
    let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let c = calls.clone();
    let service = IsolationLayer::new(p.invoker.clone(), "Geo", "Lookup").layer(
        service_fn(move |_: ()| {
            c.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async { Ok::<_, io::Error>(()) }
        }),
    );

    let err = service.oneshot(()).await.unwrap_err();
    assert!(err.is_rejected());
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}
