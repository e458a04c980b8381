//! Remote call over a Unix socket, with one process playing both roles.
//!
//! Run with:
//!   cargo run --example remote-sum
//!
//! The receiver registers the real `add`; the initiator registers a placeholder
//! under the same key, and calling it runs `add` on the receiver.

use std::convert::Infallible;
use std::fs;

use untie::peer::{IngestListener, SocketTransporter};
use untie::{RegisterOptions, Untie};

async fn add(a: i64, b: i64) -> Result<i64, Infallible> {
    Ok(a + b)
}

async fn add_placeholder(_a: i64, _b: i64) -> Result<i64, Infallible> {
    // Never runs: an initiator forwards every call.
    Ok(0)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sock_dir = std::env::temp_dir().join(format!("untie-sum-{}", std::process::id()));
    fs::create_dir_all(&sock_dir)?;
    let sock_path = sock_dir.join("sum.sock");

    let receiver = Untie::receiver("example-secret")?;
    receiver.register(add, RegisterOptions::key("sum"))?;
    let listener = IngestListener::bind(&sock_path, receiver)?;
    eprintln!("Listening on {}", listener.path().display());

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(listener.serve(async {
        let _ = stop_rx.await;
    }));

    let initiator = Untie::initiator("example-secret", SocketTransporter::new(&sock_path))?;
    let sum = initiator.register(add_placeholder, RegisterOptions::key("sum"))?;

    for (a, b) in [(1, 2), (20, 22)] {
        let total = sum.call((a, b)).await?;
        eprintln!("sum({a}, {b}) = {total}");
    }

    let _ = stop_tx.send(());
    server.await??;
    let _ = fs::remove_dir_all(&sock_dir);
    Ok(())
}
