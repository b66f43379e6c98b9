// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Submitting a file
//! - Taking a photo or recording a clip and submitting it

use clap::Args;
use detect_camera::app::{AnnotatedMedia, AppModel, Message, ResultView};
use detect_camera::backends::camera::{CameraBackendType, get_backend};
use detect_camera::submission::HttpTransport;
use detect_camera::{Config, storage};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Options shared by every command; they override the config file
#[derive(Args, Debug)]
pub struct GlobalOptions {
    /// Detection service base URL
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Camera backend (virtual, v4l2)
    #[arg(long, global = true)]
    pub backend: Option<CameraBackendType>,

    /// Image shown by the virtual camera
    #[arg(long, global = true)]
    pub still: Option<PathBuf>,

    /// Clip replayed by the virtual camera when recording
    #[arg(long, global = true)]
    pub clip: Option<PathBuf>,

    /// V4L2 device node, e.g. /dev/video0
    #[arg(long, global = true)]
    pub device: Option<String>,

    /// Directory for saved results (default: ~/Pictures/detect-camera)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Open the annotated result with the system viewer
    #[arg(long, global = true)]
    pub open: bool,
}

impl GlobalOptions {
    pub fn apply(self, mut config: Config) -> Config {
        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if self.still.is_some() {
            config.virtual_still = self.still;
        }
        if self.clip.is_some() {
            config.virtual_clip = self.clip;
        }
        if self.device.is_some() {
            config.v4l2_device = self.device;
        }
        if self.output.is_some() {
            config.output_dir = self.output;
        }
        config
    }
}

/// List all available cameras
pub fn list_cameras(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let backend = get_backend(config)?;
    let cameras = backend.enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras ({}):", backend.backend_type());
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);
        println!("      Path: {}", camera.path);
        if let Some(facing) = camera.facing {
            println!("      Facing: {}", facing);
        }
    }

    let formats: Vec<String> = backend
        .supported_formats()
        .iter()
        .map(|f| f.mime.clone())
        .collect();
    println!();
    if formats.is_empty() {
        println!("Recording: not supported");
    } else {
        println!("Recording formats: {}", formats.join(", "));
    }

    Ok(())
}

/// Submit a file and report the result
pub async fn detect_file(
    config: Config,
    file: PathBuf,
    open_result: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = build_app(config)?;

    app.update(Message::SelectFile(file)).await?;
    print_staged(&app);

    submit_and_report(&mut app, open_result).await
}

/// Take a photo and submit it
pub async fn take_photo(
    config: Config,
    open_result: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = build_app(config)?;

    println!("Opening camera...");
    app.update(Message::OpenCamera).await?;
    app.update(Message::CaptureStill).await?;
    print_staged(&app);

    submit_and_report(&mut app, open_result).await
}

/// Record until Ctrl+C or the recording limit, then submit
pub async fn record_video(
    config: Config,
    open_result: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let limit = config.max_recording_duration();
    let mut app = build_app(config)?;

    println!("Opening camera...");
    app.update(Message::OpenCamera).await?;
    app.update(Message::StartRecording).await?;

    if let Some(format) = app.session().recording_format() {
        println!(
            "Recording {} for up to {:.1}s. Press Ctrl+C to stop.",
            format,
            limit.as_secs_f64()
        );
    }

    // Set up Ctrl+C handler
    let (stop_tx, mut stop_rx) = tokio::sync::mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })?;

    let captured = tokio::select! {
        _ = stop_rx.recv() => None,
        artifact = app.next_capture() => artifact,
    };

    match captured {
        Some(artifact) => {
            println!("Recording limit reached.");
            app.update(Message::Captured(artifact)).await?;
        }
        None => {
            println!();
            println!("Stopping early...");
            app.update(Message::StopRecording).await?;
        }
    }
    print_staged(&app);

    submit_and_report(&mut app, open_result).await
}

fn build_app(config: Config) -> Result<AppModel, Box<dyn std::error::Error>> {
    let backend = get_backend(&config)?;
    let transport = Arc::new(HttpTransport::new()?);
    Ok(AppModel::new(config, backend, transport)?)
}

fn print_staged(app: &AppModel) {
    if let Some(artifact) = app.staging().artifact() {
        println!(
            "Staged {} ({}, {} bytes)",
            artifact.filename(),
            artifact.mime(),
            artifact.len()
        );
    }
}

async fn submit_and_report(
    app: &mut AppModel,
    open_result: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut updates = app.staging().pipeline().subscribe();
    app.update(Message::Detect).await?;
    println!("Submitting to {}", app.endpoint().base());

    loop {
        let state = updates.borrow_and_update().clone();
        if state.is_terminal() {
            break;
        }
        if let ResultView::Progress { .. } = app.view() {
            print!("\r{}", app.view());
            std::io::stdout().flush()?;
        }
        if updates.changed().await.is_err() {
            break;
        }
    }
    println!();

    match app.view() {
        ResultView::Annotated(AnnotatedMedia::Inline { mime, bytes, .. }) => {
            let dir = app
                .config()
                .output_dir
                .clone()
                .unwrap_or_else(storage::get_result_directory);
            let path = storage::save_result(&bytes, &mime, &dir).await?;
            println!("Annotated result saved to {}", path.display());
            if open_result {
                open::that(&path)?;
            }
            Ok(())
        }
        ResultView::Annotated(AnnotatedMedia::Remote { url, .. }) => {
            println!("Annotated result: {}", url);
            if open_result {
                open::that(&url)?;
            }
            Ok(())
        }
        ResultView::Message { text, .. } => Err(text.into()),
        other => Err(format!("Submission ended unexpectedly: {:?}", other).into()),
    }
}
