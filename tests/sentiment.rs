//! End-to-end tests against a small randomly initialised model on disk.

mod common;

use candle_core::{DType, Device, Tensor};
use candle_sentiment::error::PipelineError;
use candle_sentiment::models::Mode;
use candle_sentiment::sentiment::{SentimentPipelineBuilder, WhitespaceTokenizer};

const REVIEW: &str = "The movie was great. The plot was bad!\n\nThe acting was awful... good though";

#[test]
fn builds_from_directory_and_scores() -> anyhow::Result<()> {
    let dir = common::model_dir()?;
    let pipeline = SentimentPipelineBuilder::from_dir(dir.path()).cpu().build()?;

    let output = pipeline.score_document(REVIEW)?;
    assert!((-1.0..=1.0).contains(&output.score));
    assert_eq!(output.sentences.len(), 4);
    assert_eq!(output.sentences[0].text, "The movie was great.");
    for sentence in &output.sentences {
        assert!((0.0..=1.0).contains(&sentence.probability));
    }

    let mean: f32 = output.sentences.iter().map(|s| s.probability).sum::<f32>()
        / output.sentences.len() as f32;
    assert!((output.score - (2.0 * mean - 1.0)).abs() < 1e-5);
    assert_eq!(output.stats.items_processed, 4);
    Ok(())
}

#[test]
fn repeated_scoring_is_bit_identical() -> anyhow::Result<()> {
    let dir = common::model_dir()?;
    let pipeline = SentimentPipelineBuilder::from_dir(dir.path()).build()?;

    let first = pipeline.score_document(REVIEW)?;
    let second = pipeline.score_document(REVIEW)?;
    assert_eq!(first.score.to_bits(), second.score.to_bits());
    assert_eq!(first.sentences, second.sentences);
    Ok(())
}

#[test]
fn batching_does_not_change_sentence_scores() -> anyhow::Result<()> {
    let dir = common::model_dir()?;
    let batched = SentimentPipelineBuilder::from_dir(dir.path()).build()?;
    let one_by_one = batched.clone().with_batch_size(1);

    let a = batched.score_document(REVIEW)?;
    let b = one_by_one.score_document(REVIEW)?;
    for (x, y) in a.sentences.iter().zip(&b.sentences) {
        assert!(
            (x.probability - y.probability).abs() < 1e-5,
            "{}: {} vs {}",
            x.text,
            x.probability,
            y.probability
        );
    }
    assert!((a.score - b.score).abs() < 1e-5);
    Ok(())
}

#[test]
fn padding_does_not_leak_into_short_sequences() -> anyhow::Result<()> {
    let dir = common::model_dir()?;
    let pipeline = SentimentPipelineBuilder::from_dir(dir.path()).build()?;
    let model = pipeline.model();

    let short = vec![2, 3, 4, 6];
    let long = vec![2, 9, 4, 7, 11, 2, 10, 4, 8, 11];
    let alone = model.predict(&[short.clone()], Mode::Inference)?;
    let padded = model.predict(&[long, short], Mode::Inference)?;
    assert!((alone[0] - padded[1]).abs() < 1e-5);
    Ok(())
}

#[test]
fn unknown_words_fall_back_to_unk() -> anyhow::Result<()> {
    let dir = common::model_dir()?;
    let pipeline = SentimentPipelineBuilder::from_dir(dir.path()).build()?;

    let unk = pipeline.vocabulary().unk_index();
    assert_eq!(pipeline.vocabulary().index_of("zyzzyva"), unk);

    let output = pipeline.score_document("Zyzzyva quux frobnicate")?;
    assert!(output.score.is_finite());
    assert_eq!(output.sentences[0].tokens, 3);

    // Every word unknown: identical to scoring the same number of <unk> tokens.
    let direct = pipeline.model().predict(&[vec![unk; 3]], Mode::Inference)?;
    assert!((output.sentences[0].probability - direct[0]).abs() < 1e-6);
    Ok(())
}

#[test]
fn lowercasing_tokenizer_matches_vocabulary() -> anyhow::Result<()> {
    let dir = common::model_dir()?;
    let cased = SentimentPipelineBuilder::from_dir(dir.path()).build()?;
    let lowered = SentimentPipelineBuilder::from_dir(dir.path())
        .tokenizer(WhitespaceTokenizer::new().lowercase(true))
        .build()?;

    let a = lowered.score_document("THE MOVIE WAS GREAT")?;
    let b = cased.score_document("the movie was great")?;
    assert_eq!(a.score.to_bits(), b.score.to_bits());
    Ok(())
}

#[test]
fn empty_documents_are_rejected() -> anyhow::Result<()> {
    let dir = common::model_dir()?;
    let pipeline = SentimentPipelineBuilder::from_dir(dir.path()).build()?;

    let err = pipeline.score_document("   \n\n ").unwrap_err();
    assert!(matches!(err, PipelineError::EmptyDocument(_)));
    Ok(())
}

#[test]
fn custom_weight_file_name() -> anyhow::Result<()> {
    let dir = common::model_dir()?;
    std::fs::rename(
        dir.path().join("model.safetensors"),
        dir.path().join("sentiment_lstm.safetensors"),
    )?;

    let err = SentimentPipelineBuilder::from_dir(dir.path()).build().unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));

    let pipeline = SentimentPipelineBuilder::from_dir(dir.path())
        .weights_file("sentiment_lstm.safetensors")
        .build()?;
    assert!(pipeline.score_document("good movie.").is_ok());
    Ok(())
}

#[test]
fn mismatched_weights_fail_at_build_time() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut weights = common::weights()?;
    weights.insert(
        "rnn.weight_hh_l1_reverse".to_string(),
        Tensor::zeros((4 * common::HIDDEN_DIM, common::HIDDEN_DIM + 1), DType::F32, &Device::Cpu)?,
    );
    common::write_model_dir(dir.path(), &weights)?;

    let err = SentimentPipelineBuilder::from_dir(dir.path()).build().unwrap_err();
    assert!(matches!(err, PipelineError::ShapeMismatch(_)), "{err}");
    assert!(err.to_string().contains("rnn.weight_hh_l1_reverse"));
    Ok(())
}

#[test]
fn missing_layer_fails_at_build_time() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut weights = common::weights()?;
    weights.remove("rnn.bias_ih_l1");
    common::write_model_dir(dir.path(), &weights)?;

    let err = SentimentPipelineBuilder::from_dir(dir.path()).build().unwrap_err();
    assert!(matches!(err, PipelineError::ShapeMismatch(_)), "{err}");
    Ok(())
}

#[test]
fn vocabulary_size_must_match_config() -> anyhow::Result<()> {
    let dir = common::model_dir()?;
    std::fs::write(
        dir.path().join("vocab.json"),
        serde_json::to_string(&common::VOCAB[..10])?,
    )?;

    let err = SentimentPipelineBuilder::from_dir(dir.path()).build().unwrap_err();
    assert!(matches!(err, PipelineError::ShapeMismatch(_)), "{err}");
    Ok(())
}

#[test]
fn out_of_range_vocabulary_index_fails_at_build_time() -> anyhow::Result<()> {
    let dir = common::model_dir()?;
    std::fs::write(
        dir.path().join("vocab.json"),
        r#"{"<pad>": 0, "<unk>": 1, "typo": 4000000000}"#,
    )?;

    let err = SentimentPipelineBuilder::from_dir(dir.path()).build().unwrap_err();
    assert!(matches!(err, PipelineError::ShapeMismatch(_)), "{err}");
    assert!(err.to_string().contains("4000000001"));
    Ok(())
}

#[test]
fn unsupported_config_is_rejected() -> anyhow::Result<()> {
    let dir = common::model_dir()?;
    std::fs::write(
        dir.path().join("config.json"),
        r#"{"vocab_size": 12, "bidirectional": false}"#,
    )?;

    let err = SentimentPipelineBuilder::from_dir(dir.path()).build().unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)), "{err}");
    Ok(())
}
