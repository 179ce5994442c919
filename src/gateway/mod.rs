//! Main event loop connecting the channel, the command
//! handlers, and the polling scheduler.
//!
//! Includes: index warm-up, command dispatch, and graceful shutdown.

mod scheduler;


use scheduler::Scheduler;

use crate::commands::{self, Command, CommandContext};
use crate::engine::Engine;
use anifeed_core::{
    config::SchedulerConfig,
    message::{IncomingMessage, OutgoingMessage},
    traits::Channel,
};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// The central gateway that routes commands to the engine and runs sweeps.
pub struct Gateway {
    engine: Arc<Engine>,
    channel: Arc<dyn Channel>,
    scheduler_config: SchedulerConfig,
}

impl Gateway {
    pub fn new(
        engine: Arc<Engine>,
        channel: Arc<dyn Channel>,
        scheduler_config: SchedulerConfig,
    ) -> Self {
        Self {
            engine,
            channel,
            scheduler_config,
        }
    }

    /// Run the main event loop until Ctrl-C.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        let warmed = self.engine.warm().await?;

        let mut rx = self
            .channel
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start channel {}: {e}", self.channel.name()))?;

        info!(
            "anifeed gateway running | channel: {} | subscriptions: {warmed} | scheduler: {}",
            self.channel.name(),
            if self.scheduler_config.enabled {
                "enabled"
            } else {
                "disabled"
            },
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let sched_handle = if self.scheduler_config.enabled {
            let scheduler = Scheduler::new(
                self.engine.clone(),
                self.scheduler_config.sweep_interval(),
                self.scheduler_config.max_concurrent_polls,
            );
            Some(tokio::spawn(scheduler.run(shutdown_rx)))
        } else {
            None
        };

        // Main event loop with graceful shutdown.
        loop {
            tokio::select! {
                Some(incoming) = rx.recv() => {
                    let gw = self.clone();
                    tokio::spawn(async move {
                        gw.handle_message(incoming).await;
                    });
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown(shutdown_tx, sched_handle).await;
        Ok(())
    }

    /// Parse and execute one command, then reply in the chat it came from.
    pub(crate) async fn handle_message(&self, incoming: IncomingMessage) {
        let Some(cmd) = Command::parse(&incoming.text) else {
            debug!("ignoring unknown command: {}", incoming.text);
            return;
        };

        info!(
            "command {:?} from {} in {}",
            cmd,
            incoming.sender_name.as_deref().unwrap_or(&incoming.sender_id),
            incoming.reply_target
        );

        let ctx = CommandContext {
            engine: &self.engine,
            channel_id: &incoming.reply_target,
            text: &incoming.text,
        };
        let reply = commands::handle(cmd, &ctx).await;

        if let Err(e) = self
            .channel
            .send(OutgoingMessage::reply_to(&incoming, reply.text))
            .await
        {
            error!("failed to send reply: {e}");
        }
        if let Some(first_poll) = reply.first_poll {
            let _ = first_poll.start();
        }
    }

    /// Graceful shutdown: stop intake, let the current sweep finish within the
    /// grace period, then checkpoint the store.
    async fn shutdown(
        &self,
        shutdown_tx: watch::Sender<bool>,
        sched_handle: Option<JoinHandle<()>>,
    ) {
        info!("Shutting down...");

        if let Err(e) = self.channel.stop().await {
            warn!("failed to stop channel {}: {e}", self.channel.name());
        }

        let _ = shutdown_tx.send(true);
        if let Some(mut handle) = sched_handle {
            let grace = self.scheduler_config.shutdown_grace();
            if tokio::time::timeout(grace, &mut handle).await.is_err() {
                warn!("in-flight polls did not finish within {grace:?}, aborting");
                handle.abort();
            }
        }

        self.engine.store().checkpoint_and_close().await;
        info!("Shutdown complete.");
    }
}
