#![allow(dead_code)]

pub mod architecture;
pub mod connection;
pub mod token;

/// Let spawned tasks run until they block.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
