//! Common test infrastructure for Redis integration tests.

use pcache_config::RedisConfig;
use pcache_repository::{CacheRepository, RedisCacheRepository};
use std::sync::Arc;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::redis::Redis;

/// Test store container wrapper.
///
/// Manages a Redis testcontainer lifecycle and provides a repository bound to it.
pub struct TestRedis {
    _container: ContainerAsync<Redis>,
    config: RedisConfig,
}

impl TestRedis {
    /// Starts a fresh Redis container and waits until it answers.
    pub async fn new() -> Self {
        let container = Redis::default()
            .start()
            .await
            .expect("Failed to start Redis container");

        let port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");

        let config = RedisConfig {
            host: "127.0.0.1".to_string(),
            port,
            connect_timeout_secs: 5,
            ..RedisConfig::default()
        };

        Self::wait_until_ready(&config, 30).await;

        Self {
            _container: container,
            config,
        }
    }

    /// Returns the configuration pointing at the container.
    pub fn config(&self) -> RedisConfig {
        self.config.clone()
    }

    /// Returns a new repository for the container.
    pub fn repository(&self) -> Arc<RedisCacheRepository> {
        Arc::new(RedisCacheRepository::new(&self.config))
    }

    async fn wait_until_ready(config: &RedisConfig, max_attempts: u32) {
        let repo = RedisCacheRepository::new(config);
        let mut attempts = 0;
        loop {
            attempts += 1;
            match repo.health_check().await {
                Ok(()) => return,
                Err(e) => {
                    if attempts >= max_attempts {
                        panic!("Redis not ready after {} attempts: {}", max_attempts, e);
                    }
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                }
            }
        }
    }
}
