use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use exodus_dmd::{
    archive_path, compute_dmd, dmd_spectrum, eigenvalue_spectrum, load_archive,
    load_velocity_field, mode_real_field, one_step_error, run_pipeline, save_archive,
    write_field_csv, DmdArchive, DmdResult, FieldSource, InMemorySource, ModeInfo, NodalField,
};
use faer::Mat;

use crate::config::JobConfig;

/// Open an input file as a field source, dispatching on its extension.
pub fn open_source(path: &Path) -> Result<Box<dyn FieldSource>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "json" => {
            let src = InMemorySource::from_json_file(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Ok(Box::new(src))
        }
        "e" | "exo" | "ex2" | "nc" => open_exodus(path),
        other => bail!(
            "unsupported input extension `{other}` for {} (expected .e, .exo, .nc or .json)",
            path.display()
        ),
    }
}

#[cfg(feature = "exodus")]
fn open_exodus(path: &Path) -> Result<Box<dyn FieldSource>> {
    let file = exodus_dmd::ExodusFile::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    Ok(Box::new(file))
}

#[cfg(not(feature = "exodus"))]
fn open_exodus(path: &Path) -> Result<Box<dyn FieldSource>> {
    bail!(
        "{} is an Exodus file but this binary was built without the `exodus` feature",
        path.display()
    )
}

fn log_spectrum(spectrum: &[ModeInfo]) {
    for m in spectrum {
        tracing::info!(
            mode = m.index,
            magnitude = format_args!("{:.6}", m.magnitude),
            phase = format_args!("{:.6}", m.phase),
            stability = %m.stability,
            "eigenvalue"
        );
    }
}

/// Log the one-step reconstruction error; a failed diagnostic only warns.
fn log_reconstruction(result: &DmdResult, x: &Mat<f64>) -> Option<f64> {
    match one_step_error(result, x) {
        Ok(err) => {
            tracing::info!(relative_error = err, "one-step reconstruction");
            Some(err)
        }
        Err(e) => {
            tracing::warn!(error = %e, "one-step reconstruction error unavailable");
            None
        }
    }
}

/// Full pipeline: read, decompose, project, differentiate, persist.
///
/// The archive is only written once every array has been computed.
pub fn run(input: &Path, output: &Path, job: &JobConfig) -> Result<PathBuf> {
    let source = open_source(input)?;
    let field = load_velocity_field(source.as_ref(), &job.fields)
        .with_context(|| format!("loading velocity field from {}", input.display()))?;

    let (result, out) = run_pipeline(&field, &job.pipeline).context("running DMD pipeline")?;

    let dt = field
        .times()
        .windows(2)
        .next()
        .map_or(1.0, |w| (w[1] - w[0]).abs());
    log_spectrum(&dmd_spectrum(&result, if dt > 0.0 { dt } else { 1.0 }));
    log_reconstruction(&result, &field.to_snapshot_matrix());

    let archive = DmdArchive::from_output(&out)?;
    let path = archive_path(output, job.pipeline.rank);
    save_archive(&archive, &path).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// Write coordinates, real parts of the selected modes and the final snapshot to CSV.
pub fn export_modes(input: &Path, output: &Path, job: &JobConfig, modes: &[usize]) -> Result<()> {
    let source = open_source(input)?;
    let coords = source
        .read_coordinates()
        .with_context(|| format!("reading coordinates from {}", input.display()))?;
    let field = load_velocity_field(source.as_ref(), &job.fields)
        .with_context(|| format!("loading velocity field from {}", input.display()))?;
    if coords.len() != field.num_nodes() {
        bail!(
            "{} coordinates for {} nodes",
            coords.len(),
            field.num_nodes()
        );
    }

    let result = compute_dmd(&field.to_snapshot_matrix(), &job.pipeline.dmd_config())?;
    let num_components = field.num_components();
    let last = field.num_times() - 1;

    let mut columns = Vec::new();
    for c in 0..num_components {
        columns.push(NodalField::new(
            format!("u{c}"),
            field.component_field(last, c),
        ));
    }
    columns.push(NodalField::new("speed", field.velocity_magnitude(last)));
    for &mode in modes {
        if mode >= result.rank {
            tracing::warn!(mode, rank = result.rank, "skipping mode beyond rank");
            continue;
        }
        for c in 0..num_components {
            columns.push(NodalField::new(
                format!("mode{mode}_u{c}"),
                mode_real_field(&result, mode, c, num_components)?,
            ));
        }
    }

    write_field_csv(output, &coords, &columns)?;
    Ok(())
}

/// Print shapes and the eigenvalue spectrum stored in an archive.
pub fn inspect(path: &Path, dt: f64) -> Result<()> {
    if !(dt.is_finite() && dt > 0.0) {
        bail!("sampling interval must be positive and finite, got {dt}");
    }
    let archive = load_archive(path).with_context(|| format!("reading {}", path.display()))?;
    println!("Archive: {}", path.display());
    println!("  rank: {}", archive.rank);
    println!("  times: {:?}", archive.times.shape);
    println!(
        "  transformed_timeseries: {:?}",
        archive.transformed_timeseries.shape
    );
    println!("  time_derivatives: {:?}", archive.time_derivatives.shape);
    println!("  dmd_modes: {:?}", archive.dmd_modes.shape);
    println!("  dmd_eigs: {:?}", archive.dmd_eigs.shape);
    println!();
    println!("Eigenvalue Spectrum:");
    for m in eigenvalue_spectrum(&archive.dmd_eigs.data, dt) {
        println!(
            "  Mode {}: λ={:+.6}{:+.6}i |λ|={:.6} freq={:.6} stability={}",
            m.index, m.eigenvalue.re, m.eigenvalue.im, m.magnitude, m.frequency, m.stability
        );
    }
    Ok(())
}
