//! Utility functions for file handling and common operations

use crate::{FlankError, FlankResult};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Check if a file is gzip compressed
pub fn is_gzipped<P: AsRef<Path>>(path: P) -> FlankResult<bool> {
    let mut file = File::open(path)?;
    let mut buffer = [0; 2];

    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1f, 0x8b]),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(FlankError::Io(e)),
    }
}

/// Open a plain or gzip compressed text file for buffered reading
pub fn open_text_reader<P: AsRef<Path>>(path: P) -> FlankResult<Box<dyn BufRead>> {
    let file = File::open(&path)
        .map_err(|_| FlankError::FileNotFound(path.as_ref().to_string_lossy().to_string()))?;

    let reader: Box<dyn BufRead> = if is_gzipped(&path)? {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    Ok(reader)
}

/// Get the number of CPU cores, with a fallback default
pub fn get_num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
}

/// Validate file paths and check if they exist
pub fn validate_file_exists<P: AsRef<Path>>(path: P) -> FlankResult<()> {
    if !path.as_ref().exists() {
        return Err(FlankError::FileNotFound(
            path.as_ref().to_string_lossy().to_string(),
        ));
    }
    Ok(())
}

/// Validate that a file is readable
pub fn validate_file_readable<P: AsRef<Path>>(path: P) -> FlankResult<()> {
    validate_file_exists(&path)?;

    File::open(&path)
        .map_err(|_| FlankError::FileNotFound(path.as_ref().to_string_lossy().to_string()))?;

    Ok(())
}

/// Refuse to clobber an existing output unless `force` is set
pub fn check_output_writable<P: AsRef<Path>>(path: P, force: bool) -> FlankResult<()> {
    if path.as_ref().exists() && !force {
        return Err(FlankError::OutputExists(
            path.as_ref().to_string_lossy().to_string(),
        ));
    }
    Ok(())
}

/// Create parent directories if they don't exist
pub fn ensure_parent_dirs<P: AsRef<Path>>(path: P) -> FlankResult<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Log progress information
pub fn log_progress(current: usize, total: usize, message: &str) {
    if total > 0 {
        let percentage = (current as f64 / total as f64) * 100.0;
        log::info!("{}: {} / {} ({:.1}%)", message, current, total, percentage);
    }
}

/// Split work into contiguous, order-preserving chunks
pub fn chunk_work<T: Clone>(items: &[T], num_chunks: usize) -> Vec<Vec<T>> {
    if items.is_empty() || num_chunks == 0 {
        return vec![items.to_vec()];
    }

    let num_chunks = std::cmp::min(num_chunks, items.len());
    let chunk_size = std::cmp::max(1, items.len() / num_chunks);

    let mut chunks = Vec::new();
    let mut start = 0;

    for i in 0..num_chunks {
        let end = if i == num_chunks - 1 {
            items.len() // Last chunk gets all remaining items
        } else {
            std::cmp::min(start + chunk_size, items.len())
        };

        if start < items.len() {
            chunks.push(items[start..end].to_vec());
            start = end;
        }
    }

    chunks
}

/// Timer utility for measuring execution time
pub struct Timer {
    start: std::time::Instant,
    name: String,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::info!("Starting timer: {}", name);
        Timer {
            start: std::time::Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    pub fn log_elapsed(&self) {
        let duration = self.elapsed();
        log::info!("Timer '{}' elapsed: {:.2?}", self.name, duration);
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.log_elapsed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_is_gzipped() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "chr1\tACGT").unwrap();
        assert!(!is_gzipped(temp_file.path()).unwrap());

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(&[0x1f, 0x8b]).unwrap();
        assert!(is_gzipped(temp_file.path()).unwrap());

        let empty = NamedTempFile::new().unwrap();
        assert!(!is_gzipped(empty.path()).unwrap());
    }

    #[test]
    fn test_open_text_reader_plain_and_gzip() {
        let mut plain = NamedTempFile::new().unwrap();
        writeln!(plain, "rs1\tT\t0.9").unwrap();
        let mut line = String::new();
        open_text_reader(plain.path()).unwrap().read_line(&mut line).unwrap();
        assert_eq!(line, "rs1\tT\t0.9\n");

        let gz = NamedTempFile::new().unwrap();
        let mut encoder = GzEncoder::new(File::create(gz.path()).unwrap(), Compression::default());
        writeln!(encoder, "rs2\tC\t0.1").unwrap();
        encoder.finish().unwrap();
        let mut line = String::new();
        open_text_reader(gz.path()).unwrap().read_line(&mut line).unwrap();
        assert_eq!(line, "rs2\tC\t0.1\n");
    }

    #[test]
    fn test_open_text_reader_missing() {
        assert!(matches!(
            open_text_reader("/nonexistent/alleles.tsv"),
            Err(FlankError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_get_num_cpus() {
        assert!(get_num_cpus() >= 1);
    }

    #[test]
    fn test_validate_file_exists() {
        let temp_file = NamedTempFile::new().unwrap();
        assert!(validate_file_exists(temp_file.path()).is_ok());
        assert!(validate_file_exists("/nonexistent/file").is_err());
    }

    #[test]
    fn test_check_output_writable() {
        let temp_file = NamedTempFile::new().unwrap();
        assert!(matches!(
            check_output_writable(temp_file.path(), false),
            Err(FlankError::OutputExists(_))
        ));
        assert!(check_output_writable(temp_file.path(), true).is_ok());
        assert!(check_output_writable("/nonexistent/out.gb", false).is_ok());
    }

    #[test]
    fn test_chunk_work_preserves_order() {
        let items: Vec<i32> = (1..=10).collect();
        let chunks = chunk_work(&items, 3);

        assert_eq!(chunks.len(), 3);
        let flattened: Vec<i32> = chunks.into_iter().flatten().collect();
        assert_eq!(flattened, items);
    }

    #[test]
    fn test_chunk_work_empty() {
        let items: Vec<i32> = vec![];
        let chunks = chunk_work(&items, 3);

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_empty());
    }

    #[test]
    fn test_timer() {
        let timer = Timer::new("test");
        std::thread::sleep(std::time::Duration::from_millis(1));
        assert!(timer.elapsed().as_millis() >= 1);
    }
}
