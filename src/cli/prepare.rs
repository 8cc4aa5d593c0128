// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::process;
use std::time::Instant;

use crate::cli::args::{PrepareArgs, ProbeArgs};
use crate::cli::logging::set_verbose;
use crate::detection::{DetectionService, HttpDetectionClient};
use crate::{RigAssembler, RigBundle, RigConfig, Result, Source, VERSION};
use crate::{error, info, section, success, verbose, warn};

/// Apply command-line overrides on top of a base configuration.
#[must_use]
pub fn config_from_args(args: &PrepareArgs, base: RigConfig) -> RigConfig {
    let mut config = base;
    if args.auto_rig {
        config = config.with_auto_rig(true);
    }
    if let Some(url) = &args.service_url {
        config = config.with_service_url(url.clone());
    }
    if let Some(size) = args.thumbnail_size {
        config = config.with_thumbnail_size(size);
    }
    config
}

/// Rig the input image and write the bundle to the output directory.
///
/// # Errors
///
/// Returns an error for an invalid configuration, an undecodable input or a
/// failed write.
pub fn prepare(args: &PrepareArgs, config: RigConfig) -> Result<RigBundle> {
    let assembler = RigAssembler::from_config(config)?;
    let bundle = assembler.rig(&Source::from(args.input.clone()))?;
    bundle.save(&args.output)?;
    Ok(bundle)
}

/// Run the `prepare` command. Exits with status 1 on error.
pub fn run_prepare(args: &PrepareArgs) {
    set_verbose(args.verbose);
    let config = config_from_args(args, RigConfig::from_env());

    section!("character-rig {VERSION}");
    verbose!("Input: {}", args.input.display());
    if config.auto_rig {
        verbose!("Service: {}", config.service_url);
    }

    let start = Instant::now();
    match prepare(args, config) {
        Ok(bundle) => {
            let (w, h) = bundle.texture.dimensions();
            if bundle.mask.foreground_count() == 0 {
                warn!("Mask has no foreground pixels");
            }
            success!(
                "{} rig {w}x{h}, {} joints -> {} ({:.1}ms)",
                bundle.path,
                bundle.skeleton.len(),
                args.output.display(),
                start.elapsed().as_secs_f64() * 1000.0
            );
        }
        Err(e) => {
            error!("Failed to prepare {}: {e}", args.input.display());
            process::exit(1);
        }
    }
}

/// Run the `probe` command. Exits with status 1 when the service does not answer.
pub fn run_probe(args: &ProbeArgs) {
    let mut config = RigConfig::from_env();
    if let Some(url) = &args.service_url {
        config = config.with_service_url(url.clone());
    }

    let client = HttpDetectionClient::from_config(&config);
    if client.is_service_available() {
        success!("Service at {} is available", client.base_url());
    } else {
        info!("Service at {} is not available", client.base_url());
        process::exit(1);
    }
}
