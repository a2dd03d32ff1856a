//! A thin, explicitly-out-of-scope `FileCollector`: walks a directory
//! respecting `.gitignore`, concatenates file bodies under the configured
//! byte caps, and hands the core one opaque string. Not part of the core's
//! tested surface — it exists so the CLI can run an actual local review.

use std::fs;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use tracing::debug;

use quorum_core::{FileCollector, LocalFileConfig};

pub struct LocalFileCollector {
    config: LocalFileConfig,
}

impl LocalFileCollector {
    pub fn new(config: LocalFileConfig) -> Self {
        Self { config }
    }

    fn ignore_set(&self) -> GlobSet {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.config.ignore_globs {
            if let Ok(glob) = Glob::new(pattern) {
                builder.add(glob);
            }
        }
        builder.build().unwrap_or_else(|_| GlobSetBuilder::new().build().unwrap())
    }
}

impl FileCollector for LocalFileCollector {
    fn collect(&self, directory: &Path) -> anyhow::Result<String> {
        let ignore_set = self.ignore_set();
        let mut sections = Vec::new();
        let mut total_bytes = 0usize;

        let mut entries: Vec<_> = WalkBuilder::new(directory)
            .hidden(false)
            .git_ignore(true)
            .build()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .collect();
        entries.sort_by_key(|entry| entry.path().to_path_buf());

        for entry in entries {
            let path = entry.path();
            let Ok(relative) = path.strip_prefix(directory) else {
                continue;
            };
            if ignore_set.is_match(relative) {
                continue;
            }

            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if metadata.len() as usize > self.config.max_file_bytes {
                debug!(path = %relative.display(), "skipping file exceeding max_file_bytes");
                continue;
            }
            if total_bytes >= self.config.max_total_bytes {
                debug!("max_total_bytes reached; skipping remaining files");
                break;
            }

            let Ok(content) = fs::read_to_string(path) else {
                continue; // binary or non-UTF8 file
            };

            let remaining = self.config.max_total_bytes - total_bytes;
            let mut end = remaining.min(content.len());
            while end > 0 && !content.is_char_boundary(end) {
                end -= 1;
            }
            let clipped = &content[..end];
            total_bytes += clipped.len();

            sections.push(format!("### {}\n\n```\n{}\n```", relative.display(), clipped));
        }

        Ok(sections.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_files_respecting_ignore_globs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();
        fs::create_dir(dir.path().join("target")).unwrap();
        fs::write(dir.path().join("target").join("build.log"), "noise").unwrap();

        let collector = LocalFileCollector::new(LocalFileConfig::default());
        let content = collector.collect(dir.path()).unwrap();

        assert!(content.contains("main.rs"));
        assert!(content.contains("fn main()"));
        assert!(!content.contains("build.log"));
    }

    #[test]
    fn truncates_once_max_total_bytes_is_reached() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a".repeat(50)).unwrap();
        fs::write(dir.path().join("b.txt"), "b".repeat(50)).unwrap();

        let collector = LocalFileCollector::new(LocalFileConfig {
            max_file_bytes: 1024,
            max_total_bytes: 60,
            ignore_globs: Vec::new(),
        });
        let content = collector.collect(dir.path()).unwrap();
        assert!(content.len() < 200);
    }
}
