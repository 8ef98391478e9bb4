use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum number of files held in the selection at once.
pub const MAX_FILES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Doc,
    Docx,
    Text,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "doc" => Some(Self::Doc),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Doc => "application/msword",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Text => "text/plain",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Doc => "DOC",
            Self::Docx => "DOCX",
            Self::Text => "TXT",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
    pub kind: DocumentKind,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchRejection {
    #[error("Too many files: {selected} selected plus {incoming} new exceeds the limit of {MAX_FILES}.")]
    TooMany { selected: usize, incoming: usize },
    #[error("Unsupported file type: {file_name}. Allowed: PDF, DOC, DOCX, TXT.")]
    UnsupportedType { file_name: String },
}

/// Ordered set of files staged for upload. Batches are admitted
/// all-or-nothing: a single bad file rejects its whole batch and leaves the
/// selection untouched.
#[derive(Debug, Clone, Default)]
pub struct SelectedFiles {
    files: Vec<SelectedFile>,
}

impl SelectedFiles {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectedFile> {
        self.files.iter()
    }

    pub fn to_vec(&self) -> Vec<SelectedFile> {
        self.files.clone()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn add_batch(&mut self, paths: Vec<PathBuf>) -> Result<(), BatchRejection> {
        if paths.is_empty() {
            return Ok(());
        }
        if self.files.len() + paths.len() > MAX_FILES {
            return Err(BatchRejection::TooMany {
                selected: self.files.len(),
                incoming: paths.len(),
            });
        }

        let mut incoming = Vec::with_capacity(paths.len());
        for path in paths {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            let Some(kind) = DocumentKind::from_path(&path) else {
                return Err(BatchRejection::UnsupportedType { file_name: name });
            };
            incoming.push(SelectedFile { path, name, kind });
        }

        self.files.append(&mut incoming);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{BatchRejection, DocumentKind, SelectedFiles, MAX_FILES};
    use std::path::{Path, PathBuf};

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn document_kind_recognizes_accepted_extensions() {
        assert_eq!(
            DocumentKind::from_path(Path::new("report.pdf")),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("Notes.DOCX")),
            Some(DocumentKind::Docx)
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("legacy.doc")),
            Some(DocumentKind::Doc)
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("readme.txt")),
            Some(DocumentKind::Text)
        );
        assert_eq!(DocumentKind::from_path(Path::new("photo.png")), None);
        assert_eq!(DocumentKind::from_path(Path::new("no_extension")), None);
    }

    #[test]
    fn add_batch_admits_valid_files_in_order() {
        let mut selection = SelectedFiles::default();
        selection
            .add_batch(paths(&["a.pdf", "b.txt"]))
            .expect("valid batch should be admitted");

        assert_eq!(selection.len(), 2);
        let names: Vec<&str> = selection.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a.pdf", "b.txt"]);
    }

    #[test]
    fn add_batch_rejects_when_count_would_exceed_the_limit() {
        let mut selection = SelectedFiles::default();
        selection
            .add_batch(paths(&["a.pdf", "b.pdf", "c.pdf", "d.pdf"]))
            .expect("batch within limit should be admitted");

        let rejection = selection
            .add_batch(paths(&["e.pdf", "f.pdf"]))
            .expect_err("overflowing batch should be rejected");
        assert_eq!(
            rejection,
            BatchRejection::TooMany {
                selected: 4,
                incoming: 2
            }
        );
        assert_eq!(selection.len(), 4);
    }

    #[test]
    fn add_batch_rejects_the_whole_batch_on_one_bad_file() {
        let mut selection = SelectedFiles::default();
        let rejection = selection
            .add_batch(paths(&["good.pdf", "bad.png", "also_good.txt"]))
            .expect_err("batch with a disallowed type should be rejected");
        assert_eq!(
            rejection,
            BatchRejection::UnsupportedType {
                file_name: "bad.png".to_string()
            }
        );
        assert!(selection.is_empty());
    }

    #[test]
    fn add_batch_accepts_exactly_the_limit() {
        let mut selection = SelectedFiles::default();
        let batch: Vec<PathBuf> = (0..MAX_FILES).map(|i| PathBuf::from(format!("{i}.pdf"))).collect();
        selection
            .add_batch(batch)
            .expect("batch of exactly MAX_FILES should be admitted");
        assert_eq!(selection.len(), MAX_FILES);
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let mut selection = SelectedFiles::default();
        selection.add_batch(Vec::new()).expect("empty batch is fine");
        assert!(selection.is_empty());
    }
}
