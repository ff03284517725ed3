//! Basic pipeline example: decompose a synthetic travelling wave.

use exodus_dmd::{dmd_spectrum, run_pipeline, PipelineConfig, VelocityField};

fn main() {
    // 60 snapshots of a 200-node, 2-component travelling wave
    let (num_times, num_nodes) = (60, 200);
    let dt = 0.05;
    let times: Vec<f64> = (0..num_times).map(|t| t as f64 * dt).collect();
    let mut data = Vec::with_capacity(num_times * num_nodes * 2);
    for &t in &times {
        for node in 0..num_nodes {
            let x = node as f64 / num_nodes as f64;
            data.push((6.0 * x - 4.0 * t).cos() + 0.3 * (14.0 * x - 11.0 * t).cos());
            data.push(0.5 * (6.0 * x - 4.0 * t).sin());
        }
    }
    let field = VelocityField::new(times, num_nodes, 2, data).unwrap();

    let config = PipelineConfig {
        rank: 4,
        ..Default::default()
    };
    let (result, output) = run_pipeline(&field, &config).unwrap();

    println!("DMD Decomposition");
    println!("  Rank: {}", result.rank);
    println!(
        "  Data: {} state rows x {} snapshots",
        result.data_dim.0, result.data_dim.1
    );

    println!("\nEigenvalue Spectrum:");
    for m in dmd_spectrum(&result, dt) {
        println!(
            "  Mode {}: |λ|={:.4}, freq={:.4}, stability={}",
            m.index, m.magnitude, m.frequency, m.stability
        );
    }

    println!("\nOutputs:");
    println!(
        "  transformed_timeseries: {} x {}",
        output.transformed_timeseries.len(),
        output.transformed_timeseries[0].len()
    );
    println!(
        "  time_derivatives: {} x {}",
        output.time_derivatives.len(),
        output.time_derivatives[0].len()
    );
}
