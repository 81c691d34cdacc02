//! End-to-end tests driving the client over real HTTP.

mod helpers;

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use chrono::Duration as ChronoDuration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use helpers::TestApp;
use tandem_client::{ClientConfig, ClientView, DisplayStatus, HttpSessionApi, PollDriver};
use tandem_core::Clock;
use tandem_core::types::UserId;

struct RunningServer {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RunningServer {
    async fn start(router: Router, addr: SocketAddr) -> Self {
        let listener = TcpListener::bind(addr).await.expect("Failed to bind");
        let addr = listener.local_addr().expect("No local address");
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = stopped.await;
                })
                .await
                .expect("Server failed");
        });
        Self { addr, stop, task }
    }

    async fn shutdown(self) -> SocketAddr {
        let _ = self.stop.send(());
        self.task.await.expect("Server task panicked");
        self.addr
    }
}

async fn online_pair(app: &TestApp) -> (UserId, UserId) {
    let (x, y) = (UserId::new(), UserId::new());
    app.befriend(x, y);
    for _ in 0..2 {
        app.heartbeat(x).await;
        app.heartbeat(y).await;
    }
    (x, y)
}

fn client(app: &TestApp, addr: SocketAddr, user: UserId) -> PollDriver<HttpSessionApi> {
    let config = ClientConfig {
        base_url: format!("http://{addr}"),
        ..ClientConfig::default()
    };
    let api = HttpSessionApi::new(&config.base_url, app.token(user), Duration::from_secs(2))
        .expect("Failed to build client");
    PollDriver::new(api, user, &config, app.clock.clone())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_ended_during_outage_shows_server_minutes() {
    let app = TestApp::new();
    let (x, y) = online_pair(&app).await;
    let server = RunningServer::start(app.router.clone(), "127.0.0.1:0".parse().unwrap()).await;
    let mut driver = client(&app, server.addr, x);

    assert_eq!(driver.tick().await, Duration::from_millis(2000));
    let ClientView::Focus { session_id } = driver.reconciler().view().clone() else {
        panic!("client did not join: {:?}", driver.reconciler().view());
    };

    let addr = server.shutdown().await;
    assert_eq!(driver.tick().await, Duration::from_millis(500));
    assert_eq!(driver.failures(), 1);

    // The other participant ends the session while this client is away.
    app.clock.advance(ChronoDuration::minutes(20));
    let outcome = app.state.sessions.end(session_id, y, None, None).await.unwrap();
    assert_eq!(outcome.session.minutes, Some(20));

    let server = RunningServer::start(app.router.clone(), addr).await;
    assert_eq!(driver.tick().await, Duration::from_millis(2000));
    assert_eq!(driver.failures(), 0);

    match driver.reconciler().view() {
        ClientView::Summary(summary) => {
            assert_eq!(summary.session_id, session_id);
            assert_eq!(summary.minutes, Some(20));
        }
        other => panic!("expected summary, got {other:?}"),
    }
    let frozen = driver.reconciler().elapsed_active_seconds(app.clock.now());
    app.clock.advance(ChronoDuration::minutes(5));
    assert_eq!(
        driver.reconciler().elapsed_active_seconds(app.clock.now()),
        frozen
    );

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pause_push_reaches_other_participant() {
    let app = TestApp::new();
    let (x, y) = online_pair(&app).await;
    let server = RunningServer::start(app.router.clone(), "127.0.0.1:0".parse().unwrap()).await;

    let mut driver_x = client(&app, server.addr, x);
    let mut driver_y = client(&app, server.addr, y);
    driver_x.tick().await;
    driver_y.tick().await;

    driver_x.set_local_pause(true);
    driver_x.push_pause(true).await.unwrap();
    assert_eq!(driver_x.reconciler().display_status(), DisplayStatus::Paused);
    assert!(!driver_x.reconciler().remote_aggregate_paused());

    driver_y.tick().await;
    assert_eq!(driver_y.reconciler().display_status(), DisplayStatus::Paused);
    assert!(!driver_y.reconciler().local_pause());

    let outcome = driver_y.exit().await.unwrap().unwrap();
    assert!(!outcome.already_ended);
    assert!(driver_y.reconciler().do_not_disturb());

    driver_x.tick().await;
    assert!(matches!(driver_x.reconciler().view(), ClientView::Summary(_)));

    server.shutdown().await;
}
