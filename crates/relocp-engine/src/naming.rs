//! Destination file naming: length clamping and collision disambiguation

use std::path::Path;

/// Clamp a basename to at most `max_bytes` bytes, preserving the extension.
///
/// The stem is truncated on a UTF-8 character boundary. If the extension
/// alone leaves no room for a stem, the name is truncated bytewise and the
/// extension is sacrificed.
pub fn clamp_basename(name: &str, max_bytes: usize) -> String {
    if name.len() <= max_bytes {
        return name.to_string();
    }

    let (stem, ext) = split_name(name);
    // dot + extension
    let ext_len = ext.map(|e| e.len() + 1).unwrap_or(0);

    if ext_len >= max_bytes {
        return truncate_to_boundary(name, max_bytes).to_string();
    }

    let stem_budget = max_bytes - ext_len;
    let clamped_stem = truncate_to_boundary(stem, stem_budget);
    match ext {
        Some(e) => format!("{}.{}", clamped_stem, e),
        None => clamped_stem.to_string(),
    }
}

/// Find the first free disambiguated name for `name` in `dir`.
///
/// Tries `stem-1.ext`, `stem-2.ext`, and so on. The probe is deterministic
/// so a resumed pass lands on the same name as the crashed one.
pub fn disambiguate(dir: &Path, name: &str) -> String {
    let (stem, ext) = split_name(name);
    for n in 1u32.. {
        let candidate = match ext {
            Some(e) => format!("{}-{}.{}", stem, n, e),
            None => format!("{}-{}", stem, n),
        };
        if !dir.join(&candidate).exists() {
            return candidate;
        }
    }
    unreachable!("u32 rename counter exhausted")
}

/// Split a file name into stem and extension.
///
/// A leading dot is part of the stem, matching `Path::extension` semantics.
fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

fn truncate_to_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_short_name_unchanged() {
        assert_eq!(clamp_basename("report.pdf", 255), "report.pdf");
    }

    #[test]
    fn test_clamp_preserves_extension() {
        let name = format!("{}.pdf", "a".repeat(300));
        let clamped = clamp_basename(&name, 255);
        assert_eq!(clamped.len(), 255);
        assert!(clamped.ends_with(".pdf"));
        assert!(clamped.starts_with("aaa"));
    }

    #[test]
    fn test_clamp_without_extension() {
        let name = "b".repeat(300);
        let clamped = clamp_basename(&name, 255);
        assert_eq!(clamped, "b".repeat(255));
    }

    #[test]
    fn test_clamp_respects_utf8_boundary() {
        // Each é is two bytes; a 17-byte budget cannot split one
        let name = format!("{}.txt", "é".repeat(10));
        let clamped = clamp_basename(&name, 17);
        assert!(clamped.len() <= 17);
        assert!(clamped.ends_with(".txt"));
        assert!(std::str::from_utf8(clamped.as_bytes()).is_ok());
    }

    #[test]
    fn test_clamp_huge_extension() {
        let name = format!("a.{}", "x".repeat(300));
        let clamped = clamp_basename(&name, 32);
        assert_eq!(clamped.len(), 32);
    }

    #[test]
    fn test_dotfile_has_no_extension() {
        assert_eq!(split_name(".bashrc"), (".bashrc", None));
    }

    #[test]
    fn test_disambiguate_picks_first_free() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("doc.txt"), "x").unwrap();
        assert_eq!(disambiguate(dir.path(), "doc.txt"), "doc-1.txt");

        fs::write(dir.path().join("doc-1.txt"), "x").unwrap();
        assert_eq!(disambiguate(dir.path(), "doc.txt"), "doc-2.txt");
    }

    #[test]
    fn test_disambiguate_without_extension() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("README"), "x").unwrap();
        assert_eq!(disambiguate(dir.path(), "README"), "README-1");
    }
}
