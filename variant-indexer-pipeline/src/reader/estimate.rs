//! Record count estimation from a sample of line sizes.

use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::errors::ReaderError;

/// Default number of data lines sampled by [`estimate`].
pub const DEFAULT_ESTIMATE_LINES: usize = 200_000;

/// Estimate the number of records in a VCF file.
///
/// Samples the byte size of up to `sample_lines` data lines (lines not
/// starting with `#`, newline included) and divides the file size by their
/// median. Returns 0 when the file has no data lines. Only used for progress
/// reporting.
pub async fn estimate(path: impl AsRef<Path>, sample_lines: usize) -> Result<u64, ReaderError> {
    let path = path.as_ref();
    let file = File::open(path).await?;
    let file_size = file.metadata().await?.len();
    let mut reader = BufReader::new(file);

    let mut sizes = Vec::new();
    let mut line = String::new();
    while sizes.len() < sample_lines {
        line.clear();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            break;
        }
        if line.starts_with('#') {
            continue;
        }
        sizes.push(read as u64);
    }

    let Some(median) = median(&mut sizes) else {
        return Ok(0);
    };

    let estimated = (file_size as f64 / median) as u64;
    debug!(
        path = %path.display(),
        sampled = sizes.len(),
        median,
        estimated,
        "Estimated record count"
    );

    Ok(estimated)
}

/// Median of the sample; the mean of the two middle values for even counts.
fn median(values: &mut [u64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    values.sort_unstable();
    let mid = values.len() / 2;
    let median = if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) as f64 / 2.0
    } else {
        values[mid] as f64
    };

    (median > 0.0).then_some(median)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn vcf_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&mut [3, 1, 2]), Some(2.0));
        assert_eq!(median(&mut [4, 1, 2, 3]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }

    #[tokio::test]
    async fn test_estimate_uniform_lines() {
        // header 10 bytes + four data lines of 10 bytes
        let file = vcf_file("#CHROM\tPO\n123456789\n123456789\n123456789\n123456789\n");

        let estimated = estimate(file.path(), 100).await.unwrap();

        assert_eq!(estimated, 5);
    }

    #[tokio::test]
    async fn test_estimate_sample_smaller_than_file() {
        let file = vcf_file("12345\n12345\n1234567890123\n");

        let estimated = estimate(file.path(), 2).await.unwrap();

        // median of the first two lines is 6 bytes, file is 26 bytes
        assert_eq!(estimated, 4);
    }

    #[tokio::test]
    async fn test_estimate_no_data_lines() {
        let file = vcf_file("##fileformat=VCFv4.1\n#CHROM\tPOS\n");
        assert_eq!(estimate(file.path(), 10).await.unwrap(), 0);
    }
}
