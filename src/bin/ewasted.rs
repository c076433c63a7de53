//! ewasted - e-waste detection service daemon
//!
//! This daemon:
//! 1. Builds and validates the hazard catalog
//! 2. Loads the detection model once (degrading, not exiting, on failure)
//! 3. Serves the prediction API until Ctrl-C

use anyhow::Result;
use std::sync::{mpsc, Arc};

use ewaste_detect::api::{ApiConfig, ApiServer, AppState};
use ewaste_detect::detect::DetectorHandle;
use ewaste_detect::{HazardCatalog, ModelSettings, ServiceConfig};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServiceConfig::load()?;
    let catalog = Arc::new(HazardCatalog::builtin());
    catalog.validate()?;

    let detector = match load_detector(&config.model) {
        Ok(handle) => {
            log::info!(
                "detection model loaded from {} (backend '{}')",
                config.model.path.display(),
                handle.backend_name()
            );
            Some(Arc::new(handle))
        }
        Err(err) => {
            log::error!(
                "failed to load detection model from {}: {:#}. prediction requests will be rejected",
                config.model.path.display(),
                err
            );
            None
        }
    };

    let state = AppState::new(catalog, detector, config.model.detect_timeout);
    let api_config = ApiConfig {
        addr: config.api_addr.clone(),
    };
    let api_handle = ApiServer::new(api_config, state).spawn()?;
    log::info!("e-waste api listening on {}", api_handle.addr);

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .expect("error setting Ctrl-C handler");

    log::info!("ewasted waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping API server...");
    api_handle.stop()?;

    Ok(())
}

#[cfg(feature = "backend-tract")]
fn load_detector(model: &ModelSettings) -> Result<DetectorHandle> {
    use anyhow::anyhow;
    use ewaste_detect::TractBackend;

    if !model.path.exists() {
        return Err(anyhow!(
            "model artifact not found at {}",
            model.path.display()
        ));
    }
    let backend = TractBackend::new(&model.path, model.input_size, model.class_names.clone())?;
    DetectorHandle::spawn(Box::new(backend))
}

#[cfg(not(feature = "backend-tract"))]
fn load_detector(_model: &ModelSettings) -> Result<DetectorHandle> {
    use anyhow::anyhow;

    Err(anyhow!(
        "built without the 'backend-tract' feature; no detection backend available"
    ))
}
