use crate::common::config::ValidationConfig;
use crate::domain::services::media_path_service::MediaPathService;

/// Motivos por los que se rechaza un archivo subido
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaValidationError {
    #[error("Uploaded file has no name")]
    MissingFilename,

    #[error("File {filename} is too large: {size} bytes exceeds the limit of {max} bytes")]
    TooLarge { filename: String, size: u64, max: u64 },

    #[error("Unsupported file extension for {filename}: {extension}")]
    UnsupportedExtension { filename: String, extension: String },

    #[error("Content of {filename} does not match its extension: expected {expected}, detected {detected}")]
    ContentMismatch { filename: String, expected: String, detected: String },

    #[error("Upload context is missing {0}")]
    MissingContext(&'static str),
}

/// Colaborador que decide si un archivo puede almacenarse.
///
/// `head` contiene los primeros bytes del contenido (ventana de detección);
/// el validador no debe asumir que es el archivo completo.
pub trait MediaValidator: Send + Sync + 'static {
    fn validate(
        &self,
        head: &[u8],
        original_filename: Option<&str>,
        declared_size: u64,
    ) -> Result<(), MediaValidationError>;

    /// Límite aplicado también al tamaño real copiado, si existe
    fn max_upload_bytes(&self) -> Option<u64> {
        None
    }
}

/// Validador por defecto: nombre, tamaño, extensión permitida y firma binaria
pub struct DefaultMediaValidator {
    config: ValidationConfig,
    paths: MediaPathService,
}

impl DefaultMediaValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            paths: MediaPathService::new(),
        }
    }

    fn is_allowed(&self, extension: &str) -> bool {
        self.config
            .allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }

    fn is_unsniffable(&self, extension: &str) -> bool {
        self.config
            .unsniffable_extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    /// Comprueba que el contenido detectado es compatible con la extensión
    fn check_content(&self, head: &[u8], filename: &str, extension: &str) -> Result<(), MediaValidationError> {
        let expected = mime_guess::from_ext(extension).first_or_octet_stream();

        match infer::get(head) {
            Some(kind) => {
                let detected = kind.mime_type();
                let detected_top = detected.split('/').next().unwrap_or_default();
                if detected_top == expected.type_().as_str() {
                    Ok(())
                } else {
                    tracing::debug!(
                        filename = %filename,
                        expected = %expected,
                        detected = %detected,
                        "Magic bytes do not match declared extension"
                    );
                    Err(MediaValidationError::ContentMismatch {
                        filename: filename.to_string(),
                        expected: expected.essence_str().to_string(),
                        detected: detected.to_string(),
                    })
                }
            }
            None => {
                if expected.type_() == mime_guess::mime::TEXT || self.is_unsniffable(extension) {
                    Ok(())
                } else {
                    Err(MediaValidationError::ContentMismatch {
                        filename: filename.to_string(),
                        expected: expected.essence_str().to_string(),
                        detected: "unknown".to_string(),
                    })
                }
            }
        }
    }
}

impl Default for DefaultMediaValidator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

impl MediaValidator for DefaultMediaValidator {
    fn validate(
        &self,
        head: &[u8],
        original_filename: Option<&str>,
        declared_size: u64,
    ) -> Result<(), MediaValidationError> {
        let filename = match original_filename.map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => return Err(MediaValidationError::MissingFilename),
        };

        if declared_size > self.config.max_upload_bytes {
            return Err(MediaValidationError::TooLarge {
                filename: filename.to_string(),
                size: declared_size,
                max: self.config.max_upload_bytes,
            });
        }

        let extension = self.paths.extension_of(filename).unwrap_or_default();
        if !self.is_allowed(&extension) {
            return Err(MediaValidationError::UnsupportedExtension {
                filename: filename.to_string(),
                extension,
            });
        }

        self.check_content(head, filename, &extension)
    }

    fn max_upload_bytes(&self) -> Option<u64> {
        Some(self.config.max_upload_bytes)
    }
}
