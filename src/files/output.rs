use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

/// Prefix prepended to every output file name
pub const DEFAULT_OUTPUT_PREFIX: &str = "complementaryFitas_";

/// Where a task writes the complement of one input.
pub trait OutputTarget: Send + Sync {
    fn create(&self, input_name: &str) -> Result<Box<dyn Write + Send>>;
}

/// Writes `<prefix><input name>` files into one directory.
#[derive(Debug, Clone)]
pub struct OutputDirectory {
    directory: PathBuf,
    prefix: String,
}

impl OutputDirectory {
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
        }
    }

    pub fn output_name(&self, input_name: &str) -> String {
        format!("{}{}", self.prefix, input_name)
    }

    pub fn output_path(&self, input_name: &str) -> PathBuf {
        self.directory.join(self.output_name(input_name))
    }
}

impl OutputTarget for OutputDirectory {
    fn create(&self, input_name: &str) -> Result<Box<dyn Write + Send>> {
        // Tasks race to create the directory; create_dir_all tolerates that
        fs::create_dir_all(&self.directory)
            .with_context(|| format!("Failed to create output directory {}", self.directory.display()))?;

        let path = self.output_path(input_name);
        let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_output_naming() {
        let output = OutputDirectory::new("/out", DEFAULT_OUTPUT_PREFIX);
        assert_eq!(output.output_name("dna1.txt"), "complementaryFitas_dna1.txt");
        assert_eq!(output.output_path("dna1.txt"), PathBuf::from("/out/complementaryFitas_dna1.txt"));
    }

    #[test]
    fn test_create_makes_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = temp_dir.path().join("nested").join("out");
        let output = OutputDirectory::new(&out_dir, "c_");

        let mut sink = output.create("a.txt").unwrap();
        sink.write_all(b"TAGC\n").unwrap();
        drop(sink);

        assert_eq!(fs::read_to_string(out_dir.join("c_a.txt")).unwrap(), "TAGC\n");
    }

    #[test]
    fn test_create_fails_when_directory_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let output = OutputDirectory::new(&blocker, "c_");
        assert!(output.create("a.txt").is_err());
    }
}
