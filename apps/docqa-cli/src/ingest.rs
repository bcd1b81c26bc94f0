use anyhow::{Context, Result};
use std::path::Path;
use walkdir::WalkDir;

use docqa_agent::SourceDocument;
use docqa_core::types::OwnerId;

/// Every `*.txt` file under `dir` whose stem is a document id, in path order.
pub fn collect_documents(dir: &Path, owner_id: OwnerId) -> Result<Vec<SourceDocument>> {
    let mut docs = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", dir.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("txt") { continue; }
        let Some(doc_id) = path.file_stem().and_then(|s| s.to_str()).and_then(|s| s.parse::<u64>().ok()) else {
            tracing::warn!(path = %path.display(), "skipping file without a numeric document id");
            continue;
        };
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        docs.push(SourceDocument { doc_id, owner_id, text });
    }
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn picks_numeric_txt_files_only() {
        let tmp = tempfile::TempDir::new().expect("tmp");
        fs::create_dir(tmp.path().join("nested")).expect("mkdir");
        fs::write(tmp.path().join("12.txt"), "twelve").expect("write");
        fs::write(tmp.path().join("nested/3.txt"), "three").expect("write");
        fs::write(tmp.path().join("notes.txt"), "no id").expect("write");
        fs::write(tmp.path().join("4.md"), "wrong extension").expect("write");

        let docs = collect_documents(tmp.path(), 9).expect("collect");

        let ids: Vec<u64> = docs.iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec![12, 3]);
        assert!(docs.iter().all(|d| d.owner_id == 9));
        assert_eq!(docs[1].text, "three");
    }
}
