//! Protoclust: mixed-type clustering CLI using the K-Prototypes algorithm
//!
//! This is the main entrypoint that orchestrates data loading, model fitting,
//! and cluster reporting.

use anyhow::Result;
use clap::Parser;
use protoclust::{calinski_harabasz, fit_kprototypes, Args, MixedData, Mode};
use std::time::Instant;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    if args.verbose {
        println!("Protoclust - Mixed-Type Clustering with K-Prototypes");
        println!("====================================================\n");
    }

    let start_time = Instant::now();

    // Step 1: Load and encode data
    if args.verbose {
        println!("Step 1: Loading and encoding data");
        println!("  Input file: {}", args.input);
        println!(
            "  Schema: {} numeric + {} categorical columns",
            args.numeric, args.categorical
        );
    }

    let data_start = Instant::now();
    let data = protoclust::load_mixed_data(&args.input, args.numeric, args.categorical)?;
    let data_time = data_start.elapsed();

    println!("✓ Data loaded: {} records", data.len());
    if args.verbose {
        println!("  Processing time: {:.2}s", data_time.as_secs_f64());
    }

    // Step 2: Fit the requested mode(s)
    if args.compare_modes {
        run_mode_comparison(&args, &data)?;
    } else {
        let mode = args.parse_mode()?;
        run_single_mode(&args, &data, mode)?;
    }

    let total_time = start_time.elapsed();
    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", total_time.as_secs_f64());

    Ok(())
}

/// Fit one mode and print the full cluster report
fn run_single_mode(args: &Args, data: &MixedData, mode: Mode) -> Result<()> {
    if args.verbose {
        println!("\nStep 2: Fitting {} model", mode);
        println!("  Number of clusters: {}", args.clusters);
        println!("  Max iterations: {}", args.max_iters);
        println!("  Seed: {}", args.seed);
    }

    let model_start = Instant::now();
    let model = fit_kprototypes(data, args.clusters, args.max_iters, mode, args.seed)?;
    let model_time = model_start.elapsed();

    println!(
        "✓ Model fitted ({} clustering, {} iterations)",
        mode, model.iterations
    );
    if args.verbose {
        println!("  Fitting time: {:.2}s", model_time.as_secs_f64());
    }

    println!("\n=== Cluster Statistics ===");
    let cluster_sizes = model.cluster_sizes();
    for (cluster, &size) in cluster_sizes.iter().enumerate() {
        let percentage = (size as f64 / data.len() as f64) * 100.0;
        println!("Cluster {}: {} records ({:.1}%)", cluster, size, percentage);
    }

    let score = calinski_harabasz(&data.numeric, &model.labels, model.n_clusters);
    println!("\nCalinski-Harabasz score: {:.3}", score);

    if args.verbose {
        print_prototypes(data, &model);
    }

    Ok(())
}

/// Fit all three modes over the same dataset and report each, mirroring the
/// classical k-prototypes / k-means / k-modes comparison
fn run_mode_comparison(args: &Args, data: &MixedData) -> Result<()> {
    println!("\n=== Mode Comparison ===");

    for mode in [Mode::Blended, Mode::NumericOnly, Mode::CategoricalOnly] {
        let model_start = Instant::now();
        match fit_kprototypes(data, args.clusters, args.max_iters, mode, args.seed) {
            Ok(model) => {
                let score = calinski_harabasz(&data.numeric, &model.labels, model.n_clusters);
                println!(
                    "{:>13}: {} iterations, Calinski-Harabasz {:.3} ({:.2}s)",
                    mode.to_string(),
                    model.iterations,
                    score,
                    model_start.elapsed().as_secs_f64()
                );
                if args.verbose {
                    let sizes = model.cluster_sizes();
                    println!("{:>13}  cluster sizes: {:?}", "", sizes);
                }
            }
            Err(err) => {
                println!("{:>13}: failed ({})", mode.to_string(), err);
            }
        }
    }

    Ok(())
}

/// Print each cluster's prototype with categorical codes decoded
fn print_prototypes(data: &MixedData, model: &protoclust::KPrototypesModel) {
    println!("\n=== Cluster Prototypes ===");
    for cluster in 0..model.n_clusters {
        let numeric: Vec<String> = model
            .numeric_centers
            .row(cluster)
            .iter()
            .map(|value| format!("{:.3}", value))
            .collect();
        let categorical: Vec<String> = model
            .categorical_centers
            .row(cluster)
            .iter()
            .enumerate()
            .map(|(column, &code)| data.category_label(column, code))
            .collect();
        println!(
            "Cluster {}: numeric [{}], categorical [{}]",
            cluster,
            numeric.join(", "),
            categorical.join(", ")
        );
    }
}
