//! End-to-end demo: chunk, batch, and collate an in-memory dataset.
//!
//! Run with `cargo run --example pipeline_demo`. Set `RUST_LOG=debug` to see
//! the chunker/batcher state transitions.

use seqpipe::utils::make_record;
use seqpipe::{
    padding_stats, BatchingConfig, BudgetSpec, ChunkingConfig, DataPipeline, FieldSpec,
    InMemorySource, PipelineConfig, RecordSource,
};

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let records = (0..8)
        .map(|idx| {
            let len = 5 + (idx * 7) % 23;
            make_record(
                format!("demo-{idx}"),
                idx,
                [("data", (0..len).collect::<Vec<i64>>())],
            )
        })
        .collect();
    let source = InMemorySource::new("demo", records);

    let config = PipelineConfig {
        chunking: Some(ChunkingConfig {
            size: FieldSpec::Uniform(10),
            step: Some(FieldSpec::Uniform(5)),
        }),
        batching: BatchingConfig {
            budget: Some(BudgetSpec::Uniform(32)),
            max_seqs: Some(4),
            drop_last: false,
        },
    };

    let pipeline = DataPipeline::new(
        source.records().expect("in-memory source always opens"),
        config,
    )
    .expect("demo config is valid");

    for (index, batch) in pipeline.enumerate() {
        let batch = match batch {
            Ok(batch) => batch,
            Err(err) => {
                eprintln!("pipeline failed: {err}");
                std::process::exit(1);
            }
        };
        let data = batch.tensor("data").expect("demo records carry 'data'");
        let stats = padding_stats(&batch).expect("stacked fields present");
        println!(
            "batch {index}: shape {:?}, lengths {:?}, fill {:.2}",
            data.shape(),
            batch.axis_sizes("data", 1).unwrap_or_default(),
            stats.fill_ratio,
        );
    }
}
