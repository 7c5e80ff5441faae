//! Probing and querying real sockets, plus full startup against mock nodes.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use node_balancer::config::{BalancerConfig, HealthCheckConfig, PolicyKind};
use node_balancer::error::ProbeError;
use node_balancer::health::NodeProbe;
use node_balancer::lifecycle::{self, Shutdown};
use node_balancer::net::{NodeClient, NodeClientError, QueryExecutor};
use node_balancer::registry::{Liveness, Protocol};
use node_balancer::{BalancerError, Executor, HealthProbe, HealthScheduler, NodeIdentity, NodeRegistry};

mod common;
use common::{local_node, start_mock_node, start_programmable_backend, SharedProbe, SwitchProbe};

fn client() -> NodeClient {
    NodeClient::new(Duration::from_millis(500))
}

/// A loopback port with nothing listening on it.
async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_http_probe_against_mock_node() {
    let addr = start_mock_node("1").await;
    let probe = NodeProbe::new(client(), "/ping");

    assert!(probe.probe(&local_node(addr.port())).await.is_ok());

    let down = closed_port().await;
    let err = probe.probe(&local_node(down)).await.unwrap_err();
    assert!(matches!(err, ProbeError::Failed(_)));
}

#[tokio::test]
async fn test_http_probe_rejects_error_status() {
    let addr = start_programmable_backend(|_| async { (503, "overloaded".to_string()) }).await;
    let probe = NodeProbe::new(client(), "/ping");

    let err = probe.probe(&local_node(addr.port())).await.unwrap_err();
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_tcp_probe_connects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            drop(socket);
        }
    });

    let probe = NodeProbe::new(client(), "/ping");
    let node = NodeIdentity::new(Protocol::Tcp, "127.0.0.1", port);
    assert!(probe.probe(&node).await.is_ok());

    let down = NodeIdentity::new(Protocol::Tcp, "127.0.0.1", closed_port().await);
    assert!(probe.probe(&down).await.is_err());
}

#[tokio::test]
async fn test_query_executor_hits_bound_node() {
    let a = start_mock_node("1").await;
    let b = start_mock_node("2").await;
    let executor = QueryExecutor::new(client());

    let out = executor.execute(&local_node(b.port()), "select 1".to_string()).await.unwrap();
    assert_eq!(out, "2");
    let out = executor.execute(&local_node(a.port()), "select 1".to_string()).await.unwrap();
    assert_eq!(out, "1");
}

#[tokio::test]
async fn test_query_executor_encodes_statement() {
    let addr = start_programmable_backend(|target| async move { (200, target) }).await;
    let executor = QueryExecutor::new(client());

    let echoed = executor
        .execute(&local_node(addr.port()), "select 1 + 1".to_string())
        .await
        .unwrap();
    assert_eq!(echoed, "/?query=select+1+%2B+1");
}

#[tokio::test]
async fn test_query_executor_surfaces_status_and_protocol() {
    let addr = start_programmable_backend(|_| async { (500, "boom".to_string()) }).await;
    let executor = QueryExecutor::new(client());

    let err = executor
        .execute(&local_node(addr.port()), "select 1".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, NodeClientError::Status(s) if s.as_u16() == 500));

    let tcp = NodeIdentity::new(Protocol::Tcp, "127.0.0.1", addr.port());
    let err = executor.execute(&tcp, "select 1".to_string()).await.unwrap_err();
    assert!(matches!(err, NodeClientError::Unsupported(Protocol::Tcp)));
}

#[tokio::test]
async fn test_slow_probe_times_out_as_unhealthy() {
    let registry = Arc::new(NodeRegistry::with_nodes([local_node(1), local_node(2)]));
    let probe = SwitchProbe::new();
    probe.set_delay(1, Duration::from_millis(500));

    let config = HealthCheckConfig {
        timeout_ms: 50,
        ..HealthCheckConfig::default()
    };
    let mut scheduler = HealthScheduler::new(registry.clone(), SharedProbe(probe.clone()), config);

    let started = std::time::Instant::now();
    let report = scheduler.run_cycle().await;

    assert!(started.elapsed() < Duration::from_millis(400), "cycle waited for the slow probe");
    assert_eq!(report.faulty, vec![local_node(1)]);
    assert_eq!(registry.get(&local_node(1)).unwrap().liveness(), Liveness::Unhealthy);
    assert_eq!(registry.get(&local_node(2)).unwrap().liveness(), Liveness::Healthy);
}

#[tokio::test]
async fn test_scheduler_run_stops_on_shutdown() {
    let registry = Arc::new(NodeRegistry::with_nodes([local_node(1)]));
    let probe = SwitchProbe::new();
    let config = HealthCheckConfig {
        interval_ms: 10,
        ..HealthCheckConfig::default()
    };
    let scheduler = HealthScheduler::new(registry.clone(), SharedProbe(probe.clone()), config);

    let shutdown = Shutdown::new();
    let task = tokio::spawn(scheduler.run(shutdown.subscribe()));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(registry.get(&local_node(1)).unwrap().is_healthy());
    assert!(registry.current_cycle() >= 2);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("scheduler did not stop")
        .unwrap();

    let cycles = registry.current_cycle();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(registry.current_cycle(), cycles);
}

fn config_for(nodes: &[SocketAddr], policy: PolicyKind) -> BalancerConfig {
    let mut config = BalancerConfig::default();
    config.balancer.endpoints = nodes.iter().map(|a| format!("http://{}", a)).collect();
    config.balancer.load_balancing_policy = policy;
    config.health_check.interval_ms = 20;
    config.health_check.timeout_ms = 200;
    config.health_check.consecutive_failure_threshold = 1;
    config
}

#[tokio::test]
async fn test_startup_end_to_end() {
    let up = start_mock_node("1").await;

    let flaky_down = Arc::new(AtomicBool::new(true));
    let flag = flaky_down.clone();
    let flaky = start_programmable_backend(move |target| {
        let down = flag.load(Ordering::SeqCst);
        async move {
            match (down, target.starts_with("/ping")) {
                (true, _) => (503, "down".to_string()),
                (false, true) => (200, "Ok.\n".to_string()),
                (false, false) => (200, "1\n".to_string()),
            }
        }
    })
    .await;

    let config = config_for(&[up, flaky], PolicyKind::RoundRobin);
    let node_client = client();
    let probe = NodeProbe::new(node_client.clone(), config.health_check.path.clone());
    let running = lifecycle::start(&config, probe, None).await.unwrap();
    let balancer = running.balancer.clone();

    // The warm-up cycle already ran; only the healthy node is selectable.
    let snapshot = balancer.registry().snapshot();
    assert_eq!(snapshot.healthy().len(), 1);
    assert_eq!(snapshot.faulty().len(), 1);

    let executor = QueryExecutor::new(node_client);
    for _ in 0..4 {
        let out = balancer.execute(&executor, "select 1".to_string()).await.unwrap();
        assert_eq!(out, "1");
    }

    flaky_down.store(false, Ordering::SeqCst);
    let mut recovered = false;
    for _ in 0..50 {
        if balancer.registry().snapshot().healthy().len() == 2 {
            recovered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(recovered, "background scheduler never restored the node");

    running.stop().await;
}

#[tokio::test]
async fn test_startup_with_no_reachable_nodes() {
    let down = closed_port().await;
    let addr: SocketAddr = format!("127.0.0.1:{}", down).parse().unwrap();
    let config = config_for(&[addr], PolicyKind::FirstAlive);

    let probe = NodeProbe::new(client(), "/ping");
    let running = lifecycle::start(&config, probe, None).await.unwrap();

    let err = running.balancer.select_and_bind().unwrap_err();
    assert!(matches!(err, BalancerError::NoHealthyNodes { known: 1 }));

    running.stop().await;
}

#[tokio::test]
async fn test_startup_without_health_checks_trusts_nodes() {
    let down = closed_port().await;
    let addr: SocketAddr = format!("127.0.0.1:{}", down).parse().unwrap();
    let mut config = config_for(&[addr], PolicyKind::FirstAlive);
    config.health_check.enabled = false;

    let checker = NodeProbe::new(client(), "/ping");
    let running = lifecycle::start(&config, checker, None).await.unwrap();
    let balancer = running.balancer.clone();

    // Nothing probes the node, so it is selectable despite being unreachable.
    let mut binding = balancer.select_and_bind().unwrap();
    assert_eq!(binding.node().port(), down);

    // A failed execution is the only thing that takes it out.
    binding.consume().unwrap();
    balancer.report_outcome(&mut binding, false).unwrap();
    assert!(matches!(
        balancer.select_and_bind(),
        Err(BalancerError::NoHealthyNodes { known: 1 })
    ));

    running.stop().await;
}
