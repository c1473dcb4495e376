//! Artifact catalog: dedup and merge of the two listing sources
//!
//! Both listing APIs report overlapping sets of artifacts. The catalog
//! keys every record by its repository path and folds duplicates with a
//! commutative, associative merge, so the order in which sources (or
//! pages within a source) arrive never changes the result.

use artsync_types::{ArtifactRecord, SourceApi};
use std::collections::HashMap;
use tracing::warn;

/// Deduplicated artifact set keyed by repository path.
#[derive(Debug, Default)]
pub struct ArtifactCatalog {
    records: HashMap<String, ArtifactRecord>,
}

impl ArtifactCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert a record, merging with any record already present at the
    /// same path. Records with an empty path are dropped.
    pub fn absorb(&mut self, record: ArtifactRecord) {
        if record.path.is_empty() {
            return;
        }
        let merged = match self.records.remove(&record.path) {
            Some(existing) => merge_records(existing, record),
            None => record,
        };
        self.records.insert(merged.path.clone(), merged);
    }

    pub fn absorb_all(&mut self, records: impl IntoIterator<Item = ArtifactRecord>) {
        for record in records {
            self.absorb(record);
        }
    }

    /// Consume the catalog into a path-ordered sequence.
    ///
    /// Lexicographic order gives dispatch a deterministic claim order,
    /// which keeps resume behavior and logs reproducible across runs.
    pub fn into_ordered(self) -> Vec<ArtifactRecord> {
        let mut records: Vec<ArtifactRecord> = self.records.into_values().collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        records
    }
}

/// Merge two records describing the same path.
///
/// Takes the union of non-null fields. The assets listing carries the
/// authoritative download URL, so an assets-sourced record wins field
/// preferences no matter which side of the merge it arrives on; when the
/// sources disagree on size the larger one is kept and a warning logged.
pub fn merge_records(a: ArtifactRecord, b: ArtifactRecord) -> ArtifactRecord {
    debug_assert_eq!(a.path, b.path);

    let (first, second) = if b.source == SourceApi::Assets && a.source != SourceApi::Assets {
        (b, a)
    } else {
        (a, b)
    };

    let size = match (first.size, second.size) {
        (Some(x), Some(y)) if x != y => {
            warn!(
                path = %first.path,
                "listing sources disagree on size ({} vs {}); keeping the larger",
                x,
                y
            );
            Some(x.max(y))
        }
        (x, y) => x.or(y),
    };

    ArtifactRecord {
        source: if first.source == SourceApi::Assets || second.source == SourceApi::Assets {
            SourceApi::Assets
        } else {
            SourceApi::Components
        },
        download_url: first.download_url.or(second.download_url),
        checksum: first.checksum.or(second.checksum),
        path: first.path,
        size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artsync_types::Checksum;

    fn asset(path: &str) -> ArtifactRecord {
        ArtifactRecord::new(path, SourceApi::Assets)
    }

    fn component(path: &str) -> ArtifactRecord {
        ArtifactRecord::new(path, SourceApi::Components)
    }

    #[test]
    fn merge_takes_union_of_fields() {
        let mut a = asset("a/b/c.jar");
        a.download_url = Some("http://nexus/a/b/c.jar".into());
        let mut b = component("a/b/c.jar");
        b.size = Some(100);
        b.checksum = Some(Checksum::new("sha1", "aa"));

        let merged = merge_records(a, b);
        assert_eq!(merged.download_url.as_deref(), Some("http://nexus/a/b/c.jar"));
        assert_eq!(merged.size, Some(100));
        assert_eq!(merged.checksum.as_ref().unwrap().value, "aa");
        assert_eq!(merged.source, SourceApi::Assets);
    }

    #[test]
    fn merge_prefers_assets_download_url_in_both_orders() {
        let mut a = asset("p.jar");
        a.download_url = Some("http://assets".into());
        let mut b = component("p.jar");
        b.download_url = Some("http://components".into());

        let left = merge_records(a.clone(), b.clone());
        let right = merge_records(b, a);
        assert_eq!(left.download_url.as_deref(), Some("http://assets"));
        assert_eq!(left, right);
    }

    #[test]
    fn merge_keeps_larger_size_on_disagreement() {
        let mut a = asset("p.jar");
        a.size = Some(10);
        let mut b = component("p.jar");
        b.size = Some(42);

        let left = merge_records(a.clone(), b.clone());
        let right = merge_records(b, a);
        assert_eq!(left.size, Some(42));
        assert_eq!(left, right);
    }

    #[test]
    fn absorb_deduplicates_by_path() {
        let mut catalog = ArtifactCatalog::new();
        catalog.absorb(asset("x/1.jar"));
        catalog.absorb(component("x/1.jar"));
        catalog.absorb(component("x/2.jar"));
        catalog.absorb(ArtifactRecord::new("", SourceApi::Assets));

        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn into_ordered_sorts_by_path() {
        let mut catalog = ArtifactCatalog::new();
        catalog.absorb(asset("z/last.jar"));
        catalog.absorb(asset("a/first.jar"));
        catalog.absorb(asset("m/middle.jar"));

        let ordered = catalog.into_ordered();
        let paths: Vec<_> = ordered.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["a/first.jar", "m/middle.jar", "z/last.jar"]);
    }
}
