use std::io::Read;
use std::path::Path;
use thiserror::Error;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum InvalidPdf {
    #[error("La carpeta no existe")]
    FolderMissing,

    #[error("El archivo no tiene extensión .pdf")]
    WrongExtension,

    #[error("El archivo no existe")]
    FileMissing,

    #[error("El archivo no es un PDF")]
    NotPdf,

    #[error("El PDF parece estar corrupto: {0}")]
    Corrupted(String),

    #[error("Error leyendo el PDF: {0}")]
    Io(#[from] std::io::Error),
}

/// Checks folder, extension, existence, signature and structure.
/// Returns the page count of a valid file.
pub fn validate_pdf(folder: &Path, filename: &str) -> Result<usize, InvalidPdf> {
    if !folder.is_dir() {
        return Err(InvalidPdf::FolderMissing);
    }
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(InvalidPdf::WrongExtension);
    }

    let path = folder.join(filename);
    if !path.is_file() {
        return Err(InvalidPdf::FileMissing);
    }

    let mut header = [0u8; 5];
    let mut file = std::fs::File::open(&path)?;
    if file.read_exact(&mut header).is_err() || header != PDF_MAGIC {
        return Err(InvalidPdf::NotPdf);
    }

    let document = lopdf::Document::load(&path).map_err(|e| InvalidPdf::Corrupted(e.to_string()))?;
    Ok(document.get_pages().len())
}

pub fn is_valid_pdf(folder: &Path, filename: &str) -> bool {
    match validate_pdf(folder, filename) {
        Ok(_) => true,
        Err(reason) => {
            tracing::debug!("📄 {} inválido en {}: {}", filename, folder.display(), reason);
            false
        }
    }
}
