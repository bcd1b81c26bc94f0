use docqa_core::config::{EmbeddingProvider, EmbeddingSettings};
use docqa_core::traits::Embedder;
use docqa_embed::{get_default_embedder, FakeEmbedder};

fn l2(v: &[f32]) -> f32 { v.iter().map(|x| x * x).sum::<f32>().sqrt() }

#[test]
fn fake_embedder_shapes_and_determinism() {
    let embedder = FakeEmbedder::new(384);
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 384, "embedding dim is 384");

    // Norm approximately 1.0
    let norm = l2(v1);
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    // Deterministic for same input
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn fake_embedder_blank_text_is_zero_vector() {
    let embs = FakeEmbedder::new(16).embed_batch(&["   ".to_string()]).expect("embed_batch");
    assert!(embs[0].iter().all(|x| *x == 0.0));
}

#[test]
fn fake_embedder_places_shared_words_closer() {
    let embedder = FakeEmbedder::new(384);
    let texts = vec![
        "what does the contract say about liability".to_string(),
        "The contract limits liability to direct damages.".to_string(),
        "Bananas are rich in potassium.".to_string(),
    ];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let dist = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>();
    assert!(dist(&embs[0], &embs[1]) < dist(&embs[0], &embs[2]));
}

#[test]
fn provider_setting_selects_fake_embedder() {
    let settings = EmbeddingSettings { provider: EmbeddingProvider::Fake, dimension: 64, ..EmbeddingSettings::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    assert_eq!(embedder.dim(), 64);
    let embs = embedder.embed_batch(&["rust".to_string()]).expect("embed_batch");
    assert_eq!(embs[0].len(), 64);
}

#[test]
fn fake_embedder_with_zero_dimension_yields_empty_vectors() {
    let e = FakeEmbedder::new(0);
    let out = e.embed_batch(&["some words".to_string()]).expect("embed");
    assert_eq!(out, vec![Vec::<f32>::new()]);
}
