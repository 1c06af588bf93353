use std::net::{TcpListener, UdpSocket};
use std::time::Duration;

use tokio::time::sleep;

// Shared helpers for the scenario tests. Proxies run forever, so each test
// reserves an ephemeral port up front, spawns `start()` on a task, and waits
// for the listener to come up before talking to it.

#[allow(dead_code)]
pub fn reserve_tcp_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().unwrap().port()
}

#[allow(dead_code)]
pub fn reserve_udp_port() -> u16 {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("bind ephemeral port");
    socket.local_addr().unwrap().port()
}

#[allow(dead_code)]
pub async fn wait_for_listen(addr: &str) {
    for _ in 0..50 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("proxy did not start listening on {addr}");
}

#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();
    netrelay::trace::set_enabled(true);
}
