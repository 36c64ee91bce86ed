//! 可观测性：tracing 日志初始化
//!
//! 默认级别 info，可用 RUST_LOG 覆盖（如 `RUST_LOG=duet=debug`）。日志写到 stderr，stdout 只留给回答。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // 重复初始化（如测试中）时忽略
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
