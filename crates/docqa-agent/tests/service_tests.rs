use std::fs;
use std::sync::Arc;

use docqa_agent::{DocumentQa, IndexReport, SourceDocument};
use docqa_core::config::AgentSettings;
use docqa_core::traits::Generator;
use docqa_core::{Chunker, ChunkingConfig, Error};
use docqa_embed::FakeEmbedder;
use docqa_vector::{FlatIndex, IndexFiles};
use tempfile::TempDir;

struct Silent;

impl Generator for Silent {
    fn complete(&self, _prompt: &str) -> anyhow::Result<String> { Ok("generate".into()) }
}

fn qa(tmp: &TempDir) -> DocumentQa<Silent> {
    let chunker = Chunker::new(ChunkingConfig { target_len: 120, overlap: 20 }).expect("chunker");
    let index = FlatIndex::open(IndexFiles::in_dir(tmp.path()), Arc::new(FakeEmbedder::new(64))).expect("index");
    DocumentQa::new(chunker, Arc::new(index), Silent, AgentSettings::default())
}

fn doc(doc_id: u64, owner_id: u64, text: &str) -> SourceDocument { SourceDocument { doc_id, owner_id, text: text.to_string() } }

#[test]
fn blank_document_is_not_indexed() {
    let tmp = TempDir::new().expect("tmp");
    let qa = qa(&tmp);
    let outcome = qa.index(1, 1, " \n\t ").expect("index");
    assert!(!outcome.indexed);
    assert_eq!(outcome.chunks, 0);
    assert!(qa.index_handle().is_empty());
}

#[test]
fn index_many_skips_known_and_reports_blank() {
    let tmp = TempDir::new().expect("tmp");
    let qa = qa(&tmp);
    qa.index(1, 1, "already here").expect("index");

    let docs = [doc(1, 1, "already here"), doc(2, 1, "fresh text about pumps"), doc(3, 1, "   "), doc(2, 1, "fresh text about pumps")];
    let mut seen = Vec::new();
    let report = qa.index_many_with(&docs, |d| seen.push(d.doc_id)).expect("batch");

    assert_eq!(report, IndexReport { indexed_count: 3, failed_ids: vec![3], skipped_ids: vec![1, 2] });
    assert_eq!(seen, vec![1, 2, 3, 2]);
    assert_eq!(qa.index_handle().len(), 2, "no duplicate entries");
}

#[test]
fn search_projects_results() {
    let tmp = TempDir::new().expect("tmp");
    let qa = qa(&tmp);
    qa.index(7, 3, "solar panels charge the battery bank").expect("index");
    qa.index(8, 4, "rain barrels collect roof water").expect("index");

    let results = qa.search("battery bank", 10, Some(3)).expect("search");

    assert_eq!(results.len(), 1);
    assert_eq!((results[0].doc_id, results[0].chunk_id), (7, 0));
    assert_eq!(results[0].text, "solar panels charge the battery bank");
    assert!(qa.search("battery bank", 0, None).expect("search").is_empty());
}

#[test]
fn persistence_failure_aborts_batch() {
    let tmp = TempDir::new().expect("tmp");
    let qa = qa(&tmp);
    fs::create_dir(tmp.path().join("vectors.bin")).expect("block vector path");

    let err = qa.index_many(&[doc(1, 1, "text"), doc(2, 1, "more")]).expect_err("write fails");

    assert!(matches!(err, Error::IndexWrite { .. }));
    assert!(qa.index_handle().is_empty());
}

#[test]
fn index_survives_reopen() {
    let tmp = TempDir::new().expect("tmp");
    qa(&tmp).index(5, 1, "persisted paragraph").expect("index");

    let reopened = qa(&tmp);
    assert!(reopened.index_handle().contains_doc(5));
    let report = reopened.index_many(&[doc(5, 1, "persisted paragraph")]).expect("batch");
    assert_eq!(report.skipped_ids, vec![5]);
}
