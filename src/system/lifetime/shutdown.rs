use std::time::Duration;

use tokio::signal;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::analytics::aggregator::CLOSE_WAIT;
use crate::consumer::ConsumerManager;

/// 关闭超时时间（秒），覆盖最终刷盘的事务超时
const SHUTDOWN_TIMEOUT_SECS: u64 = 120;

/// 等待 Ctrl+C 或 SIGTERM
pub async fn listen_for_shutdown() {
    #[cfg(unix)]
    {
        let mut term = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(term) => term,
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                wait_ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = wait_ctrl_c() => {}
            _ = term.recv() => info!("SIGTERM received"),
        }
    }

    #[cfg(not(unix))]
    wait_ctrl_c().await;
}

async fn wait_ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, flushing data..."),
        Err(e) => warn!(
            "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
            e
        ),
    }
}

/// 停止所有消费组并落盘；整体超时后强制退出
pub async fn perform_shutdown(manager: &mut ConsumerManager) {
    let result = timeout(
        Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
        manager.shutdown(CLOSE_WAIT),
    )
    .await;

    match result {
        Ok(()) => info!("All shutdown tasks completed successfully"),
        Err(_) => {
            error!(
                "Shutdown tasks timed out after {} seconds! Forcing exit.",
                SHUTDOWN_TIMEOUT_SECS
            );
            std::process::exit(1);
        }
    }
}
