//! 日志初始化

use tracing_subscriber::EnvFilter;

/// 未设置 `RUST_LOG` 时的默认过滤规则
pub const DEFAULT_FILTER: &str = "cubebot=info";

/// 安装全局 tracing 订阅者，并把 `log` 记录桥接到 tracing
///
/// `RUST_LOG` 优先；可以重复调用，只有第一次生效。返回本次调用是否完成了安装。
pub fn init_logging() -> bool {
    init_logging_with(DEFAULT_FILTER)
}

/// 使用指定的默认过滤规则初始化日志
pub fn init_logging_with(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }

    // 已经有其他 logger 时只保留 tracing 输出
    if let Err(e) = tracing_log::LogTracer::init_with_filter(log::LevelFilter::Trace) {
        tracing::debug!("log records will not be bridged: {}", e);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        // 第二次调用不会 panic，也不会再次安装
        assert!(!init_logging());
        tracing::info!(target: "cubebot_sdk", "logging initialised");
        log::info!("bridged log record");
    }
}
