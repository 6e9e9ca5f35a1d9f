use seqpipe::utils::make_record;
use seqpipe::{
    ArrayData, BatchingConfig, BudgetSpec, ChunkingConfig, CollatedBatch, DataPipeline, FieldSpec,
    InMemorySource, PipelineConfig, Record, RecordSource,
};

fn records_with_lengths(lengths: &[usize]) -> Vec<Record> {
    lengths
        .iter()
        .enumerate()
        .map(|(idx, len)| {
            make_record(
                format!("seq-{idx}"),
                idx as i64,
                [("x", (0..*len as i64).collect::<Vec<i64>>())],
            )
        })
        .collect()
}

fn run_pipeline(records: Vec<Record>, config: PipelineConfig) -> Vec<CollatedBatch> {
    DataPipeline::new(records, config)
        .expect("valid config")
        .map(|batch| batch.expect("valid records"))
        .collect()
}

fn batching(budget: Option<u64>, max_seqs: Option<usize>, drop_last: bool) -> BatchingConfig {
    BatchingConfig {
        budget: budget.map(BudgetSpec::Uniform),
        max_seqs,
        drop_last,
    }
}

#[test]
fn batch_cardinality_never_exceeds_max_seqs() {
    let config = PipelineConfig {
        chunking: None,
        batching: batching(None, Some(3), false),
    };
    let batches = run_pipeline(records_with_lengths(&[2, 4, 1, 3, 5, 2, 2, 1]), config);
    assert!(!batches.is_empty());
    for batch in &batches {
        assert!(batch.cardinality("x").unwrap() <= 3);
    }
}

#[test]
fn multi_record_batches_respect_the_budget() {
    let budget = 12u64;
    let config = PipelineConfig {
        chunking: None,
        batching: batching(Some(budget), None, false),
    };
    let lengths = [2usize, 4, 1, 3, 5, 9, 2, 13, 1, 1, 6];
    let batches = run_pipeline(records_with_lengths(&lengths), config);

    let total: i64 = batches
        .iter()
        .map(|batch| batch.cardinality("x").unwrap())
        .sum();
    assert_eq!(total as usize, lengths.len());

    for batch in &batches {
        let n = batch.cardinality("x").unwrap();
        let sizes = batch.axis_sizes("x", 1).unwrap();
        let max_len = sizes.iter().copied().max().unwrap();
        if n > 1 {
            // Budget bound holds for every multi-record batch; singletons are
            // allowed to exceed it.
            assert!(
                (max_len * n) as u64 <= budget,
                "padded extent {} over budget {budget}",
                max_len * n
            );
        }
    }
}

#[test]
fn drop_last_removes_exactly_the_final_partial_batch() {
    let lengths = [1usize, 1, 1, 1, 1, 1, 1];
    let kept = run_pipeline(
        records_with_lengths(&lengths),
        PipelineConfig {
            chunking: None,
            batching: batching(None, Some(2), false),
        },
    );
    let dropped = run_pipeline(
        records_with_lengths(&lengths),
        PipelineConfig {
            chunking: None,
            batching: batching(None, Some(2), true),
        },
    );
    assert_eq!(kept.len(), 4);
    assert_eq!(dropped.len(), 3);
    assert_eq!(kept.last().unwrap().cardinality("x"), Some(1));
    assert!(dropped
        .iter()
        .all(|batch| batch.cardinality("x") == Some(2)));
}

#[test]
fn non_overlapping_chunks_reconstruct_the_source_prefix() {
    let source: Vec<i64> = (0..23).collect();
    let config = PipelineConfig {
        chunking: Some(ChunkingConfig {
            size: FieldSpec::Uniform(5),
            step: Some(FieldSpec::Uniform(5)),
        }),
        batching: batching(None, Some(1), false),
    };
    let batches = run_pipeline(
        vec![make_record("seq-0", 0, [("x", source.clone())])],
        config,
    );

    // One chunk per batch; concatenating the pre-pad data reconstructs the
    // original sequence, and no chunk oversteps the source bounds.
    let mut reconstructed = Vec::new();
    for batch in &batches {
        let tensor = batch.tensor("x").unwrap();
        let len = batch.axis_sizes("x", 1).unwrap()[0] as usize;
        assert!(len <= 5);
        match tensor.data() {
            ArrayData::I64(values) => reconstructed.extend_from_slice(&values[..len]),
            data => panic!("expected i64 storage, got {data:?}"),
        }
    }
    assert_eq!(reconstructed, source);
}

#[test]
fn chunked_pipeline_keeps_reserved_metadata_on_every_chunk() {
    let config = PipelineConfig {
        chunking: Some(ChunkingConfig::uniform(4)),
        batching: batching(None, Some(1), false),
    };
    let batches = run_pipeline(
        vec![make_record("seq-9", 9, [("x", (0..10).collect::<Vec<i64>>())])],
        config,
    );
    assert_eq!(batches.len(), 3);
    for batch in &batches {
        let idx = batch.tensor("seq_idx").unwrap();
        assert_eq!(idx.data(), &ArrayData::I64(vec![9]));
        match batch.get("seq_tag").unwrap() {
            seqpipe::CollatedValue::Raw(values) => {
                assert_eq!(values, &vec![seqpipe::Value::Str("seq-9".to_string())]);
            }
            value => panic!("expected raw passthrough, got {value:?}"),
        }
    }
}

#[test]
fn two_short_records_collate_into_one_padded_batch() {
    // Records [3, 2] under budget 10: cost 3 * 2 = 6 fits; collated shape
    // [2, 3] with sizes [3, 2].
    let config = PipelineConfig {
        chunking: None,
        batching: batching(Some(10), Some(10), false),
    };
    let batches = run_pipeline(records_with_lengths(&[3, 2]), config);
    assert_eq!(batches.len(), 1);
    let x = batches[0].tensor("x").unwrap();
    assert_eq!(x.shape(), &[2, 3]);
    assert_eq!(x.data(), &ArrayData::I64(vec![0, 1, 2, 0, 1, 0]));
    assert_eq!(batches[0].axis_sizes("x", 1).unwrap(), vec![3, 2]);
    assert_eq!(batches[0].cardinality("x"), Some(2));
}

#[test]
fn near_budget_records_split_into_singletons() {
    // Records [5, 6] under budget 10: including the second would cost
    // 6 * 2 = 12 > 10, so each record batches alone.
    let config = PipelineConfig {
        chunking: None,
        batching: batching(Some(10), None, false),
    };
    let batches = run_pipeline(records_with_lengths(&[5, 6]), config);
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].cardinality("x"), Some(1));
    assert_eq!(batches[1].cardinality("x"), Some(1));
}

#[test]
fn seven_elements_chunk_into_three_windows() {
    // range(7) with size 3, step 3 chunks into [0,1,2], [3,4,5], [6].
    let config = PipelineConfig {
        chunking: Some(ChunkingConfig::uniform(3)),
        batching: batching(None, Some(1), false),
    };
    let batches = run_pipeline(
        vec![make_record("seq-0", 0, [("x", (0..7).collect::<Vec<i64>>())])],
        config,
    );
    let chunks: Vec<Vec<i64>> = batches
        .iter()
        .map(|batch| {
            let len = batch.axis_sizes("x", 1).unwrap()[0] as usize;
            match batch.tensor("x").unwrap().data() {
                ArrayData::I64(values) => values[..len].to_vec(),
                data => panic!("expected i64 storage, got {data:?}"),
            }
        })
        .collect();
    assert_eq!(chunks, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]);
}

#[test]
fn pipeline_runs_from_a_record_source() {
    let source = InMemorySource::new("in_memory", records_with_lengths(&[3, 2, 4]));
    let config = PipelineConfig {
        chunking: None,
        batching: batching(Some(100), Some(2), false),
    };
    let pipeline = DataPipeline::new(source.records().unwrap(), config).unwrap();
    let batches: Vec<CollatedBatch> = pipeline.map(|batch| batch.unwrap()).collect();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].cardinality("x"), Some(2));
    assert_eq!(batches[1].cardinality("x"), Some(1));
}
