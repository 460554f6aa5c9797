//! Benchmark a CP-factored convolution against the direct one
//!
//! Usage:
//!   cargo run --release --example benchmark_conv2d_cp -- --channels 32 --filters 64 --rank 8
//!   cargo run --example benchmark_conv2d_cp -- --layout nhwc --backend sequenced --backend reference

use anyhow::Result;
use clap::Parser;
use cpconv_core::DataLayout;
use cpconv_decomp::{CpAlsConfig, InitStrategy};
use cpconv_exec::tracing_support::{init_tracing, record_timing, TracingConfig};
use cpconv_exec::{run_benchmark, BackendKind, BenchConfig, KernelSource};
use cpconv_kernels::Padding;

#[derive(Parser, Debug)]
#[command(name = "benchmark_conv2d_cp")]
#[command(about = "Compare direct and CP-factored 2D convolution")]
struct Args {
    #[arg(long, default_value = "1")]
    batch: usize,

    /// Input channels
    #[arg(long, default_value = "4")]
    channels: usize,

    /// Output channels
    #[arg(long, default_value = "8")]
    filters: usize,

    #[arg(long, default_value = "16")]
    size: usize,

    #[arg(long, default_value = "3")]
    kernel: usize,

    #[arg(short, long, default_value = "2")]
    rank: usize,

    #[arg(long, default_value = "1")]
    stride: usize,

    /// Use VALID instead of SAME padding
    #[arg(long)]
    valid: bool,

    /// nchw or nhwc
    #[arg(long, default_value = "nchw")]
    layout: String,

    /// Backends to run (repeatable); all by default
    #[arg(long = "backend")]
    backends: Vec<BackendKind>,

    /// Generate an exactly low-rank kernel
    #[arg(long)]
    low_rank: bool,

    /// random, normal or svd
    #[arg(long, default_value = "svd")]
    init: String,

    #[arg(long, default_value = "200")]
    max_iters: usize,

    #[arg(long, default_value = "1e-10")]
    tol: f64,

    #[arg(long, default_value = "10")]
    iterations: usize,

    #[arg(long, default_value = "0")]
    seed: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(TracingConfig::default())?;

    let layout = match args.layout.to_lowercase().as_str() {
        "nchw" => DataLayout::Nchw,
        "nhwc" => DataLayout::Nhwc,
        other => anyhow::bail!("unknown layout '{}'", other),
    };
    let init = match args.init.to_lowercase().as_str() {
        "random" => InitStrategy::Random,
        "normal" => InitStrategy::RandomNormal,
        "svd" => InitStrategy::Svd,
        other => anyhow::bail!("unknown init strategy '{}'", other),
    };

    let config = BenchConfig {
        batch: args.batch,
        in_channels: args.channels,
        out_channels: args.filters,
        height: args.size,
        width: args.size,
        kernel_h: args.kernel,
        kernel_w: args.kernel,
        rank: args.rank,
        padding: if args.valid { Padding::Valid } else { Padding::Same },
        stride_h: args.stride,
        stride_w: args.stride,
        layout,
        kernel_source: if args.low_rank {
            KernelSource::LowRank
        } else {
            KernelSource::Uniform
        },
        backends: if args.backends.is_empty() {
            BackendKind::ALL.to_vec()
        } else {
            args.backends
        },
        iterations: args.iterations,
        seed: args.seed,
        cp: CpAlsConfig::default()
            .with_init(init)
            .with_max_iters(args.max_iters)
            .with_tol(args.tol)
            .with_seed(args.seed),
        ..BenchConfig::default()
    };

    println!("CP-factored Conv2D benchmark");
    println!("============================\n");

    let report = run_benchmark(&config)?;
    record_timing(&report.factorization);
    for backend in &report.backends {
        record_timing(&backend.timing);
    }

    println!("{}", report);
    if let (Some(direct), Some(seq)) = (
        report.backend(BackendKind::Reference),
        report.backend(BackendKind::SequencedCp),
    ) {
        if seq.timing.elapsed_ms > 0.0 {
            println!(
                "speedup (reference / sequenced): {:.2}x",
                direct.timing.elapsed_ms / seq.timing.elapsed_ms
            );
        }
    }

    if !report.all_match() {
        anyhow::bail!("backend outputs differ from the reference");
    }
    Ok(())
}
