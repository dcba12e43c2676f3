use std::net::TcpListener;

use wiremock::MockServer;

/// Set to a truthy value in CI so socket-bound tests fail instead of skipping.
const REQUIRE_SOCKETS_ENV: &str = "HOSTFETCH_REQUIRE_SOCKET_TESTS";

/// Starts a wiremock server, or returns `None` when this environment cannot
/// bind a localhost socket.
#[track_caller]
pub fn start_mock_server_or_skip() -> impl std::future::Future<Output = Option<MockServer>> {
    let caller = std::panic::Location::caller();
    let can_bind = TcpListener::bind("127.0.0.1:0").is_ok();
    if !can_bind {
        let required = std::env::var(REQUIRE_SOCKETS_ENV)
            .is_ok_and(|value| matches!(value.as_str(), "1" | "true" | "yes"));
        assert!(
            !required,
            "{caller}: cannot bind a localhost socket and {REQUIRE_SOCKETS_ENV} is set"
        );
        eprintln!("{caller}: cannot bind a localhost socket, skipping");
    }
    async move {
        if can_bind {
            Some(MockServer::start().await)
        } else {
            None
        }
    }
}
