use ocibridge::config::{self, Config};
use ocibridge::{OciError, Result, Session, SharedApi};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[cfg(feature = "oci")]
fn native_api() -> Result<SharedApi> {
    Ok(std::sync::Arc::new(ocibridge::core::ffi::OciLibrary))
}

#[cfg(not(feature = "oci"))]
fn native_api() -> Result<SharedApi> {
    Err(OciError::Unsupported(
        "built without native OCI support (enable the `oci` feature)".to_string(),
    ))
}

fn config_path() -> Result<PathBuf> {
    match std::env::args().nth(1) {
        Some(path) => Ok(PathBuf::from(path)),
        None => config::default_config_path()
            .ok_or_else(|| OciError::Config("no config path given and no config directory".to_string())),
    }
}

fn run() -> Result<()> {
    let path = config_path()?;
    let config: Config = config::load_config(&path)?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level()?)
        .with_writer(std::io::stderr)
        .init();
    info!("Loaded configuration from {}", path.display());

    let credentials = config.credentials()?;
    let api = native_api()?;
    let session = Session::establish(api, config.mode(), &credentials)?;
    println!(
        "Connected to {} as {}",
        String::from_utf8_lossy(credentials.connect()),
        String::from_utf8_lossy(credentials.user())
    );
    session.close();
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ocibridge: {e}");
            ExitCode::FAILURE
        }
    }
}
