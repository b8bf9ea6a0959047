//! 日志初始化

use crate::config::LoggingConfig;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// 构造过滤器：`RUST_LOG` 优先，其次使用配置中的级别
pub fn env_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(level)?),
    }
}

/// 初始化全局 tracing 订阅者，重复调用时返回错误
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(&config.level)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match config.format.as_str() {
        "compact" => builder.compact().try_init(),
        _ => builder.try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))?;

    tracing::info!(
        "Logging initialised (level: {}, format: {})",
        config.level,
        config.format
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_rejected() {
        std::env::remove_var("RUST_LOG");
        assert!(env_filter("info,hospital_core=debug").is_ok());
        assert!(env_filter("hospital_core=loud").is_err());
    }
}
