use log::{error, info};
use remo2influx::{InfluxManager, RemoManager};
use std::env;
use std::time::Duration;
use tokio::task::JoinHandle;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize logging
    let default_filter = std::env::var("R2I_LOG_LEVEL").unwrap_or("info".to_string());
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(default_filter));

    env::set_var("RUST_BACKTRACE", "1");

    let mut threads: Vec<JoinHandle<()>> = Vec::new();

    // The metering side sends its data points over this channel to the sink
    let (mut influx, tx) = match InfluxManager::new() {
        Ok(v) => v,
        Err(e) => {
            error!("Unable to set up the InfluxDB sink: {e}");
            return Err(std::io::Error::other(e.to_string()));
        }
    };

    threads.push(tokio::spawn(async move {
        influx.start_thread().await;
    }));

    let mut remo = match RemoManager::new(tx) {
        Ok(v) => v,
        Err(e) => {
            error!("Unable to set up the Nature Remo client: {e}");
            return Err(std::io::Error::other(e.to_string()));
        }
    };

    threads.push(tokio::spawn(async move {
        remo.start_thread().await;
    }));

    info!("All modules started, now waiting for a signal to exit");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received exit signal, stopping threads");
                break;
            },
            _ = tokio::time::sleep(Duration::from_secs(10)) => {
                /* If any task died on its own, stop the rest as well */
                if threads.iter().any(|task| task.is_finished()) {
                    error!("A module exited unexpectedly, shutting down");
                    break;
                }
            },
        }
    }

    for task in threads.iter_mut() {
        task.abort();
    }

    Ok(())
}
