use std::fmt;

use log::{debug, info};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::server::{EngineError, MvpnServer};

type Job = Box<dyn FnOnce(&mut MvpnServer) + Send>;

/// Handle to the "route processing" work queue
///
/// The engine is owned by a single task and every job runs to completion
/// (including draining table events) before the next job starts.
#[derive(Clone)]
pub struct Server {
    jobs: mpsc::UnboundedSender<Job>,
    pub(crate) default_project_manager: String,
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<Server project_manager={}>", self.default_project_manager)
    }
}

impl Server {
    /// Move the engine onto its own task
    pub fn spawn(engine: MvpnServer, default_project_manager: &str) -> (Self, JoinHandle<MvpnServer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(process(engine, rx));
        let server = Self {
            jobs: tx,
            default_project_manager: default_project_manager.to_string(),
        };
        (server, task)
    }

    /// Run `job` against the engine and wait for its result
    pub async fn call<F, R>(&self, job: F) -> Result<R, EngineError>
    where
        F: FnOnce(&mut MvpnServer) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.jobs
            .send(Box::new(move |engine: &mut MvpnServer| {
                // Caller may have gone away, nothing to report to
                tx.send(job(engine)).ok();
            }))
            .map_err(|_| EngineError::QueueStopped)?;
        rx.await.map_err(|_| EngineError::QueueStopped)
    }
}

async fn process(mut engine: MvpnServer, mut jobs: mpsc::UnboundedReceiver<Job>) -> MvpnServer {
    debug!("Route processing started");
    while let Some(job) = jobs.recv().await {
        job(&mut engine);
    }
    info!("Route processing stopped");
    engine
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::config::InstanceConfig;

    #[tokio::test]
    async fn test_jobs_run_in_order() {
        let engine = MvpnServer::new(Ipv4Addr::new(127, 0, 0, 1), Ipv4Addr::new(127, 0, 0, 1));
        let (server, task) = Server::spawn(engine, "fabric");

        let created = server
            .call(|engine| engine.create_instance(&InstanceConfig::new("red", "fabric")))
            .await
            .unwrap();
        assert!(created.is_ok());
        let size = server
            .call(|engine| engine.table_size("red"))
            .await
            .unwrap();
        assert_eq!(size, Some(0));

        drop(server);
        let engine = task.await.unwrap();
        assert!(engine.instance("red").is_some());
    }
}
