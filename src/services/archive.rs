//! 结果打包 - 业务能力层
//!
//! 把改写完成的文档打成 ZIP，条目名沿用文档名（保留目录层级）。
//! 条目时间戳固定，相同输入得到相同字节。

use base64::Engine;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::ArchiveError;
use crate::models::Document;

/// deflate 中档压缩等级
const DEFAULT_COMPRESSION_LEVEL: i64 = 6;

/// 压缩包生成器
#[derive(Debug, Clone)]
pub struct ArchiveAssembler {
    compression_level: i64,
}

impl Default for ArchiveAssembler {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl ArchiveAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 生成 ZIP 字节
    pub fn assemble(&self, documents: &[Document]) -> Result<Vec<u8>, ArchiveError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.compression_level))
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);

        let mut used = HashSet::new();
        for doc in documents {
            let name = unique_entry_name(&normalize_entry_name(&doc.name), &mut used);

            writer
                .start_file(name.clone(), options)
                .map_err(|e| ArchiveError::Entry {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            writer
                .write_all(doc.content.as_bytes())
                .map_err(|e| ArchiveError::Entry {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
        }

        let bytes = writer
            .finish()
            .map_err(|e| ArchiveError::Finish(e.to_string()))?
            .into_inner();

        debug!("压缩包生成完成: {} 个条目, {} 字节", documents.len(), bytes.len());
        Ok(bytes)
    }

    /// 生成 ZIP 并编码为 base64，便于放进事件流
    pub fn assemble_base64(&self, documents: &[Document]) -> Result<String, ArchiveError> {
        Ok(encode(&self.assemble(documents)?))
    }
}

/// 标准 base64 编码
pub fn encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// 统一分隔符并去掉开头的 `/` 和 `./`
fn normalize_entry_name(name: &str) -> String {
    let mut normalized = name.replace('\\', "/");
    loop {
        if let Some(rest) = normalized.strip_prefix("./") {
            normalized = rest.to_string();
        } else if let Some(rest) = normalized.strip_prefix('/') {
            normalized = rest.to_string();
        } else {
            break;
        }
    }
    normalized
}

/// 重名时在扩展名前追加 ` (n)`
fn unique_entry_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }

    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > name.rfind('/').map_or(0, |slash| slash + 1) => {
            (&name[..dot], &name[dot..])
        }
        _ => (name, ""),
    };

    let mut n = 2;
    loop {
        let candidate = format!("{} ({}){}", stem, n, ext);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn read_entries(bytes: &[u8]) -> Vec<(String, String)> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut content = String::new();
                file.read_to_string(&mut content).unwrap();
                (file.name().to_string(), content)
            })
            .collect()
    }

    #[test]
    fn test_round_trip_preserves_names_and_content() {
        let documents = vec![
            Document::new("intro.md", "# 引言\n\n正文"),
            Document::new("chapters/one.md", "## 第一章"),
            Document::new("chapters/deep/two.md", "emoji ✅ and tabs\t"),
        ];

        let bytes = ArchiveAssembler::new().assemble(&documents).unwrap();
        let entries = read_entries(&bytes);

        let expected: Vec<(String, String)> = documents
            .iter()
            .map(|d| (d.name.clone(), d.content.clone()))
            .collect();
        assert_eq!(entries, expected);
    }

    #[test]
    fn test_output_is_deterministic() {
        let documents = vec![Document::new("a.md", "alpha"), Document::new("b/c.md", "gamma")];
        let assembler = ArchiveAssembler::new();

        assert_eq!(
            assembler.assemble(&documents).unwrap(),
            assembler.assemble(&documents).unwrap()
        );
    }

    #[test]
    fn test_duplicate_names_are_kept() {
        let documents = vec![
            Document::new("dir/a.md", "1"),
            Document::new("dir/a.md", "2"),
            Document::new("/dir/a.md", "3"),
        ];
        let entries = read_entries(&ArchiveAssembler::new().assemble(&documents).unwrap());
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();

        assert_eq!(names, vec!["dir/a.md", "dir/a (2).md", "dir/a (3).md"]);
    }

    #[test]
    fn test_unique_name_without_extension() {
        let mut used = HashSet::new();
        assert_eq!(unique_entry_name("v1.0/README", &mut used), "v1.0/README");
        assert_eq!(unique_entry_name("v1.0/README", &mut used), "v1.0/README (2)");
    }

    #[test]
    fn test_base64_decodes_to_archive() {
        let documents = vec![Document::new("a.md", "alpha")];
        let encoded = ArchiveAssembler::new().assemble_base64(&documents).unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();

        assert_eq!(read_entries(&decoded), vec![("a.md".to_string(), "alpha".to_string())]);
    }
}
