//! Contract with the code-generation subsystem.

use std::fs;
use std::io::{Error as IoError, ErrorKind, Result as IoResult};
use std::path::{Component, Path, PathBuf};

/// Builder side of the generation subsystem.
pub trait ModuleBuilder {
    /// Persists the most recently generated module and returns its path, or
    /// `None` when nothing was generated.
    ///
    /// # Errors
    /// Returns an I/O error if the module cannot be written.
    fn save_module(&mut self) -> IoResult<Option<PathBuf>>;
}

/// Factory for fresh builder and generator pairs.
pub trait GenerationSubsystem {
    /// Builder that owns generated modules
    type Builder: ModuleBuilder;
    /// Generator handed to test bodies
    type Generator;

    /// Creates a new, empty builder and its generator.
    fn create(&self) -> (Self::Builder, Self::Generator);
}

/// Builder that keeps only the latest module in memory and writes it under
/// an output directory when saved.
#[derive(Debug, Clone)]
pub struct PersistentModuleBuilder {
    output_dir: PathBuf,
    module: Option<(String, Vec<u8>)>,
}

impl PersistentModuleBuilder {
    /// Creates an empty builder writing into `output_dir`.
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.into(),
            module: None,
        }
    }

    /// Directory modules are saved into.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Records a generated module, replacing any earlier one. `file_name`
    /// must be a bare file name; anything else fails at save time.
    pub fn define_module<T: Into<String>>(&mut self, file_name: T, bytes: Vec<u8>) {
        let file_name = file_name.into();
        if let Some((previous, _)) = &self.module {
            tracing::debug!("Replacing generated module {previous} with {file_name}");
        }
        self.module = Some((file_name, bytes));
    }

    /// Whether a module has been generated.
    pub fn has_module(&self) -> bool {
        self.module.is_some()
    }

    fn module_path(&self, file_name: &str) -> IoResult<PathBuf> {
        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.output_dir.join(name)),
            _ => Err(IoError::new(
                ErrorKind::InvalidInput,
                format!("module name {file_name:?} is not a bare file name"),
            )),
        }
    }
}

impl ModuleBuilder for PersistentModuleBuilder {
    fn save_module(&mut self) -> IoResult<Option<PathBuf>> {
        let Some((file_name, bytes)) = &self.module else {
            return Ok(None);
        };

        let path = self.module_path(file_name)?;
        fs::create_dir_all(&self.output_dir)?;
        fs::write(&path, bytes)?;
        tracing::debug!("Saved generated module to {}", path.display());
        Ok(Some(path))
    }
}
