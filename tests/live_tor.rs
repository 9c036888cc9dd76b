//! Tests against a real tor binary
//!
//! These need `tor` on PATH and network access.
//! Run with: `cargo test --test live_tor -- --ignored`

use torlink::config::TorlinkConfig;
use torlink::proxy::NetStack;
use torlink::tor::TorProcess;

#[tokio::test]
#[ignore = "requires tor binary and network"]
async fn test_resolution_round_trip() {
    let tor = TorProcess::start(TorlinkConfig::default()).await.unwrap();

    let address = tor.gethostbyname("torproject.org").await.unwrap();
    assert!(address.parse::<std::net::IpAddr>().is_ok());

    // Reverse lookup must succeed, the name may differ from the input
    let hostname = tor.gethostbyaddr(&address).await.unwrap();
    assert!(!hostname.is_empty());

    tor.shutdown().await;
}

#[tokio::test]
#[ignore = "requires tor binary and network"]
async fn test_new_circuit_twice() {
    let tor = TorProcess::start(TorlinkConfig::default()).await.unwrap();

    tor.new_circuit().await.unwrap();
    // Second request is normally rate limited and waits it out
    tor.new_circuit().await.unwrap();

    tor.shutdown().await;
}

#[tokio::test]
#[ignore = "requires tor binary and network"]
async fn test_connect_through_bound_stack() {
    let tor = TorProcess::start(TorlinkConfig::default()).await.unwrap();

    let mut stack = NetStack::default();
    let _binding = tor.bind(&mut stack).unwrap();
    stack.connect("check.torproject.org", 443).await.unwrap();

    tor.shutdown().await;
}
