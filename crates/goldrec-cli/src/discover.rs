//! PDF discovery under the brand/product directory convention.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Discovered PDF file with metadata derived from its path.
#[derive(Debug, Clone, Serialize)]
pub struct PdfFile {
    pub path: PathBuf,
    pub file_name: String,
    /// First directory component, trademark glyphs stripped.
    pub brand: String,
    /// Immediate parent folder of the PDF.
    pub product_folder: String,
    pub size_bytes: u64,
    pub size_mb: f64,
}

/// Discover PDFs in the input tree.
///
/// Expected layout:
///
/// ```text
/// input_dir/
/// ├── BRAND®/
/// │   └── Product Name/
/// │       ├── PRODUCT-TDS-en.pdf
/// │       └── PRODUCT-SDS-en.pdf
/// └── ...
/// ```
///
/// Hidden and temp files are skipped; oversized files are skipped with a
/// warning. Results are sorted by path so runs are deterministic.
pub fn discover_pdfs(
    input_dir: &Path,
    brand_filter: Option<&str>,
    doc_type_filter: Option<&str>,
    limit: usize,
    max_size_mb: f64,
) -> Vec<PdfFile> {
    let mut paths: Vec<PathBuf> = Vec::new();
    collect_pdfs(input_dir, &mut paths);
    paths.sort();

    let mut pdfs = Vec::new();
    for path in paths {
        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        if file_name.starts_with('.') || file_name.starts_with('~') {
            continue;
        }

        let relative = path.strip_prefix(input_dir).unwrap_or(&path);
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        let brand = parts
            .first()
            .map(|p| p.replace('®', "").trim().to_string())
            .unwrap_or_else(|| "unknown".into());
        let product_folder = if parts.len() > 2 {
            parts[1].clone()
        } else if parts.len() > 1 {
            parts[0].clone()
        } else {
            String::new()
        };

        if let Some(filter) = brand_filter {
            if !brand.to_uppercase().contains(&filter.to_uppercase()) {
                continue;
            }
        }

        // Doc-type filter is a filename heuristic: PRODUCT-TDS-en.pdf.
        if let Some(filter) = doc_type_filter {
            let fn_upper = file_name.to_uppercase();
            let marker = filter.to_uppercase();
            if !fn_upper.contains(&format!("-{marker}")) && !fn_upper.contains(&format!("_{marker}")) {
                continue;
            }
        }

        let size_bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let size_mb = size_bytes as f64 / (1024.0 * 1024.0);
        if size_mb > max_size_mb {
            warn!(file = %file_name, size_mb = format!("{size_mb:.1}"), "skipping oversized PDF");
            continue;
        }

        pdfs.push(PdfFile {
            path,
            file_name,
            brand,
            product_folder,
            size_bytes,
            size_mb: (size_mb * 100.0).round() / 100.0,
        });

        if limit > 0 && pdfs.len() >= limit {
            break;
        }
    }

    pdfs
}

fn collect_pdfs(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_pdfs(&path, out);
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        {
            out.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path, bytes: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![0u8; bytes]).unwrap();
    }

    #[test]
    fn discovers_sorted_with_brand_and_product() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("ELASTOSIL®/RT-601/rt601-tds-en.pdf"), 10);
        touch(&root.join("ELASTOSIL®/RT-601/rt601-sds-en.pdf"), 10);
        touch(&root.join("BELSIL®/DM-10/dm10-tds-en.pdf"), 10);
        touch(&root.join("BELSIL®/DM-10/notes.txt"), 10);

        let pdfs = discover_pdfs(root, None, None, 0, 20.0);
        assert_eq!(pdfs.len(), 3);
        assert_eq!(pdfs[0].brand, "BELSIL");
        assert_eq!(pdfs[0].product_folder, "DM-10");
        assert_eq!(pdfs[1].file_name, "rt601-sds-en.pdf");
        assert_eq!(pdfs[1].brand, "ELASTOSIL");
    }

    #[test]
    fn brand_filter_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("ELASTOSIL®/RT-601/a.pdf"), 10);
        touch(&root.join("BELSIL®/DM-10/b.pdf"), 10);

        let pdfs = discover_pdfs(root, Some("elastosil"), None, 0, 20.0);
        assert_eq!(pdfs.len(), 1);
        assert_eq!(pdfs[0].brand, "ELASTOSIL");
    }

    #[test]
    fn doc_type_filter_matches_filename_markers() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("ELASTOSIL/RT-601/rt601-TDS-en.pdf"), 10);
        touch(&root.join("ELASTOSIL/RT-601/rt601_SDS_en.pdf"), 10);

        let tds = discover_pdfs(root, None, Some("tds"), 0, 20.0);
        assert_eq!(tds.len(), 1);
        assert_eq!(tds[0].file_name, "rt601-TDS-en.pdf");
    }

    #[test]
    fn oversized_and_hidden_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("ELASTOSIL/RT-601/huge.pdf"), 2 * 1024 * 1024);
        touch(&root.join("ELASTOSIL/RT-601/.hidden.pdf"), 10);
        touch(&root.join("ELASTOSIL/RT-601/ok.pdf"), 10);

        let pdfs = discover_pdfs(root, None, None, 0, 1.0);
        assert_eq!(pdfs.len(), 1);
        assert_eq!(pdfs[0].file_name, "ok.pdf");
    }

    #[test]
    fn limit_caps_the_result_count() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for i in 0..5 {
            touch(&root.join(format!("BRAND/P/{i}.pdf")), 10);
        }
        let pdfs = discover_pdfs(root, None, None, 2, 20.0);
        assert_eq!(pdfs.len(), 2);
    }
}
