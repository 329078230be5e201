//! Wires the ten crates together into one running gateway: connects the
//! stores, builds the manager stack, and exposes the single
//! `handle_payload` entry point the request path (whatever transport a
//! deployment puts in front of it) calls per request.

use std::sync::Arc;

use redis::aio::ConnectionManager;
use sqlx::postgres::PgPoolOptions;

use worldgate_cache::{Cache, RedisCacheBackend};
use worldgate_concurrency::{Lock, RedisLockBackend};
use worldgate_core::{AffinityLookup, ChangeEventSink, GatewayConfig, GatewayError};
use worldgate_dispatcher::Dispatcher;
use worldgate_durable::{DurableManager, PgDurableBackend};
use worldgate_ephemeral::{EphemeralManager, RedisEphemeralBackend};
use worldgate_security::{self as security, AuthEnvelope, BoxKeys};
use worldgate_streams::{RedisStreamBackend, StreamManager};
use worldgate_wire::{GatewayRequest, GatewayResponse};
use worldgate_worker::Worker;

/// Everything a running instance needs. `dispatch` and `worker` are both
/// cheaply cloneable `Arc`-backed handles; a deployment typically holds
/// one `Gateway` for the process lifetime and spawns `worker.run()`
/// alongside whatever serves `handle_payload`.
pub struct Gateway {
    config: Arc<GatewayConfig>,
    box_keys: BoxKeys,
    sequence_store: Arc<Cache>,
    dispatcher: Arc<Dispatcher>,
    pub worker: Arc<Worker>,
}

async fn redis_connection_manager(url: &str) -> anyhow::Result<ConnectionManager> {
    let client = redis::Client::open(url)?;
    Ok(client.get_connection_manager().await?)
}

impl Gateway {
    /// Connects to every backing store and builds the full manager stack.
    /// Fallible only at startup; `handle_payload` never needs to redo any
    /// of this work.
    pub async fn connect(config: GatewayConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let box_keys = BoxKeys::from_config(&config.sender_public_key_b64, &config.recipient_private_key_b64)
            .map_err(|e| anyhow::anyhow!("invalid gateway key configuration: {e}"))?;

        let cache_conn = redis_connection_manager(&config.cache_store_url).await?;
        let cache = Arc::new(Cache::new(
            Some(Arc::new(RedisCacheBackend::new(cache_conn))),
            config.cache_default_ttl,
            config.cache_l1_capacity,
        ));

        let stream_conn = redis_connection_manager(&config.stream_store_url).await?;
        let streams = Arc::new(StreamManager::new(
            Arc::new(RedisStreamBackend::new(stream_conn)),
            config.stream_affinity_ttl,
            config.stream_ttl,
        ));

        let ephemeral_conn = redis_connection_manager(&config.ephemeral_store_url).await?;
        let ephemeral = Arc::new(EphemeralManager::new(
            Arc::new(RedisEphemeralBackend::new(ephemeral_conn)),
            config.ephemeral_only_types.clone(),
            Some(streams.clone() as Arc<dyn AffinityLookup>),
        ));

        let pg_pool = PgPoolOptions::new().max_connections(10).connect(&config.database_url).await?;
        let durable = Arc::new(DurableManager::new(
            Arc::new(PgDurableBackend::new(pg_pool)),
            cache.clone(),
            Some(streams.clone() as Arc<dyn ChangeEventSink>),
        ));

        let dispatcher = Arc::new(Dispatcher::new(ephemeral.clone(), durable.clone(), streams.clone(), config.clone()));

        let lock_conn = redis_connection_manager(&config.ephemeral_store_url).await?;
        let lock = Arc::new(Lock::new(Arc::new(RedisLockBackend::new(lock_conn))));
        let worker = Arc::new(Worker::new(
            ephemeral,
            durable,
            lock,
            config.worker_interval,
            config.worker_batch_size,
            config.worker_lock_ttl,
        ));

        Ok(Self { config, box_keys, sequence_store: cache, dispatcher, worker })
    }

    /// Runs one request end to end: admission, validation, dispatch,
    /// wire-shape the response. Returns `GatewayError` for everything
    /// that aborts the whole batch (`AUTH_*` / `VALIDATION_*`); per-command
    /// failures are already folded into the response by the dispatcher.
    pub async fn handle_payload(&self, body: &[u8]) -> Result<GatewayResponse, GatewayError> {
        let request: GatewayRequest =
            serde_json::from_slice(body).map_err(|e| GatewayError::Malformed(e.to_string()))?;

        worldgate_core::validate::validate_world_instance_id(&request.world_instance_id)?;
        if !self.config.allowed_environments.is_empty() {
            worldgate_core::validate::validate_environment(&request.environment, &self.config.allowed_environments)?;
        }

        let envelope = AuthEnvelope {
            auth_b64: request.auth,
            encrypted_b64: request.encrypted,
            nonce_b64: request.nonce,
            world_instance_id: request.world_instance_id.clone(),
        };
        security::admit(&envelope, &self.config, &self.box_keys, self.sequence_store.as_ref())
            .await
            .map_err(|e| GatewayError::Auth(e.to_string()))?;

        let batch = worldgate_wire::to_command_batch(request.environment, request.commands, self.config.max_query_limit)?;
        let response = self.dispatcher.dispatch(batch, &request.world_instance_id).await;

        Ok(worldgate_wire::from_dispatch_response(response))
    }
}
