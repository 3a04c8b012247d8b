//! Command-line interface definitions and argument parsing

use clap::Parser;

use crate::model::Mode;

/// Mixed-type clustering CLI using the K-Prototypes algorithm
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "data.csv")]
    pub input: String,

    /// Number of clusters
    #[arg(short = 'k', long, default_value = "5")]
    pub clusters: usize,

    /// Number of leading continuous columns in the input file
    #[arg(long)]
    pub numeric: usize,

    /// Number of trailing categorical columns in the input file
    #[arg(long)]
    pub categorical: usize,

    /// Maximum recompute/reassign iterations
    #[arg(long, default_value = "10")]
    pub max_iters: usize,

    /// Weighting mode: numeric (k-means), categorical (k-modes), or blended
    /// (k-prototypes)
    #[arg(short, long, default_value = "blended")]
    pub mode: String,

    /// RNG seed for sampling the initial centers
    #[arg(long, default_value = "2020")]
    pub seed: u64,

    /// Fit all three modes over the same data and report each
    #[arg(long)]
    pub compare_modes: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Resolve the mode string, rejecting unrecognized names
    pub fn parse_mode(&self) -> crate::Result<Mode> {
        let mode = self.mode.parse::<Mode>()?;
        Ok(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode() {
        let mut args = Args {
            input: "test.csv".to_string(),
            clusters: 5,
            numeric: 3,
            categorical: 2,
            max_iters: 10,
            mode: "blended".to_string(),
            seed: 2020,
            compare_modes: false,
            verbose: false,
        };

        assert_eq!(args.parse_mode().unwrap(), Mode::Blended);

        args.mode = "kmeans".to_string();
        assert_eq!(args.parse_mode().unwrap(), Mode::NumericOnly);

        args.mode = "fuzzy".to_string();
        assert!(args.parse_mode().is_err());
    }

    #[test]
    fn test_defaults() {
        let args =
            Args::try_parse_from(["protoclust", "--numeric", "4", "--categorical", "3"]).unwrap();
        assert_eq!(args.input, "data.csv");
        assert_eq!(args.clusters, 5);
        assert_eq!(args.max_iters, 10);
        assert_eq!(args.mode, "blended");
        assert_eq!(args.seed, 2020);
        assert!(!args.compare_modes);
        assert!(!args.verbose);
    }
}
