//! Maven layout helpers: coordinate extraction and tree rendering

use artsync_types::{ArtifactRecord, Gav};
use std::collections::{BTreeMap, BTreeSet};

/// Repository bookkeeping files that do not carry coordinates of their own.
fn is_layout_helper(file_name: &str) -> bool {
    file_name.ends_with("maven-metadata.xml")
        || file_name.ends_with(".sha1")
        || file_name.ends_with(".md5")
}

/// Parse `groupId:artifactId:version` out of a repository path laid out as
/// `<group dots as dirs>/<artifact>/<version>/<file>`.
pub fn gav_from_path(path: &str) -> Option<Gav> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() < 4 {
        return None;
    }
    let file = segments[segments.len() - 1];
    if is_layout_helper(file) {
        return None;
    }

    let version = segments[segments.len() - 2];
    let artifact = segments[segments.len() - 3];
    let group = segments[..segments.len() - 3].join(".");
    if group.is_empty() || artifact.is_empty() || version.is_empty() {
        return None;
    }

    Some(Gav {
        group,
        artifact: artifact.to_string(),
        version: version.to_string(),
    })
}

/// Collect the distinct coordinates present in a catalog, sorted.
pub fn collect_gavs(records: &[ArtifactRecord]) -> BTreeSet<Gav> {
    records
        .iter()
        .filter_map(|record| gav_from_path(&record.path))
        .collect()
}

#[derive(Default)]
struct TreeNode {
    children: BTreeMap<String, TreeNode>,
}

/// Render paths as a box-drawing file tree.
pub fn render_tree<'a>(paths: impl IntoIterator<Item = &'a str>) -> String {
    let mut root = TreeNode::default();
    for path in paths {
        let mut node = &mut root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            node = node.children.entry(segment.to_string()).or_default();
        }
    }

    let mut out = String::new();
    render_level(&root, "", &mut out);
    out
}

fn render_level(node: &TreeNode, prefix: &str, out: &mut String) {
    let count = node.children.len();
    for (i, (name, child)) in node.children.iter().enumerate() {
        let last = i + 1 == count;
        out.push_str(prefix);
        out.push_str(if last { "└── " } else { "├── " });
        out.push_str(name);
        out.push('\n');

        let child_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
        render_level(child, &child_prefix, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_layout() {
        let gav = gav_from_path("com/acme/tools/app-core/2.1.0/app-core-2.1.0.jar").unwrap();
        assert_eq!(gav.group, "com.acme.tools");
        assert_eq!(gav.artifact, "app-core");
        assert_eq!(gav.version, "2.1.0");
    }

    #[test]
    fn skips_layout_helper_files() {
        assert!(gav_from_path("com/acme/app/maven-metadata.xml").is_none());
        assert!(gav_from_path("com/acme/app/1.0/app-1.0.jar.sha1").is_none());
        assert!(gav_from_path("com/acme/app/1.0/app-1.0.pom.md5").is_none());
    }

    #[test]
    fn rejects_paths_too_short_for_coordinates() {
        assert!(gav_from_path("app/1.0/app-1.0.jar").is_none());
        assert!(gav_from_path("file.jar").is_none());
    }

    #[test]
    fn collects_distinct_sorted_gavs() {
        use artsync_types::SourceApi;
        let records = vec![
            ArtifactRecord::new("com/acme/app/1.0/app-1.0.jar", SourceApi::Assets),
            ArtifactRecord::new("com/acme/app/1.0/app-1.0.pom", SourceApi::Assets),
            ArtifactRecord::new("com/acme/app/1.0/app-1.0.jar.sha1", SourceApi::Assets),
            ArtifactRecord::new("com/acme/lib/0.9/lib-0.9.jar", SourceApi::Components),
        ];
        let gavs: Vec<_> = collect_gavs(&records).into_iter().collect();
        assert_eq!(gavs.len(), 2);
        assert_eq!(gavs[0].to_string(), "com.acme:app:1.0");
        assert_eq!(gavs[1].to_string(), "com.acme:lib:0.9");
    }

    #[test]
    fn renders_nested_tree() {
        let tree = render_tree(["com/acme/a.jar", "com/acme/b.jar", "org/x.pom"]);
        let expected = "\
├── com
│   └── acme
│       ├── a.jar
│       └── b.jar
└── org
    └── x.pom
";
        assert_eq!(tree, expected);
    }
}
