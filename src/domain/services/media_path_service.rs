use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Servicio sin estado para construir nombres y rutas de archivos de medios.
///
/// El nombre almacenado es `<id>` o `<id>.<ext>`; el id nunca contiene '.',
/// así que el prefijo antes del primer punto recupera siempre el id.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaPathService;

impl MediaPathService {
    pub fn new() -> Self {
        Self
    }

    /// Genera un identificador único para un archivo nuevo
    pub fn generate_file_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Extrae la extensión reconocible del nombre original, si la hay
    pub fn extension_of(&self, original_filename: &str) -> Option<String> {
        // Solo el último componente; los navegadores a veces envían rutas completas
        let name = original_filename
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or(original_filename);

        let dot = name.rfind('.')?;
        if dot == 0 {
            // ".bashrc" y similares no tienen extensión
            return None;
        }

        let ext = &name[dot + 1..];
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }

        Some(ext.to_string())
    }

    /// Construye el nombre almacenado a partir del id y la extensión
    pub fn stored_filename(&self, file_id: &str, extension: Option<&str>) -> String {
        match extension {
            Some(ext) => format!("{}.{}", file_id, ext),
            None => file_id.to_string(),
        }
    }

    /// Recupera el id de archivo a partir del nombre almacenado
    pub fn file_id_from_stored<'a>(&self, stored_filename: &'a str) -> &'a str {
        match stored_filename.find('.') {
            Some(idx) => &stored_filename[..idx],
            None => stored_filename,
        }
    }

    /// Ruta física del archivo dentro del directorio dado
    pub fn media_file_path(&self, parent_dir: &Path, stored_filename: &str) -> PathBuf {
        parent_dir.join(stored_filename)
    }

    /// Comprueba que el nombre no escape del directorio padre
    pub fn is_safe_stored_filename(&self, stored_filename: &str) -> bool {
        !stored_filename.is_empty()
            && stored_filename != "."
            && !stored_filename.contains("..")
            && !stored_filename.contains('/')
            && !stored_filename.contains('\\')
            && !stored_filename.contains('\0')
    }
}
