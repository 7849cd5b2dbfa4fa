//! VCF record reader.
//!
//! Streams raw records one line at a time so memory stays bounded regardless
//! of the input size. `##` metadata lines are skipped and the first `#CHROM`
//! line becomes the header every later line is zipped against.

mod estimate;
mod record;

pub use estimate::{estimate, DEFAULT_ESTIMATE_LINES};
pub use record::{RawVariantRecord, VcfHeader, REQUIRED_COLUMNS};

use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, Stream};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, info};

use crate::errors::ReaderError;

/// Lazy reader over a VCF text stream.
pub struct VcfReader<R> {
    lines: Lines<R>,
    header: Option<Arc<VcfHeader>>,
    line_number: usize,
}

impl VcfReader<BufReader<File>> {
    /// Open a VCF file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ReaderError> {
        let path = path.as_ref();
        let file = File::open(path).await?;
        info!(path = %path.display(), "Opened VCF file");
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R> VcfReader<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            header: None,
            line_number: 0,
        }
    }

    /// Header, once the `#CHROM` line has been read.
    pub fn header(&self) -> Option<&VcfHeader> {
        self.header.as_deref()
    }

    /// Read the next data record.
    ///
    /// Returns `Ok(None)` at end of input. A data line before the header or a
    /// line whose column count differs from the header is a structural error.
    pub async fn next_record(&mut self) -> Result<Option<RawVariantRecord>, ReaderError> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_number += 1;
            let line = line.trim_end();

            if line.is_empty() || line.starts_with("##") {
                continue;
            }

            if line.starts_with("#CHROM") && self.header.is_none() {
                let header = VcfHeader::parse(line)?;
                debug!(
                    line = self.line_number,
                    samples = header.samples().len(),
                    "Parsed VCF header"
                );
                self.header = Some(Arc::new(header));
                continue;
            }

            if line.starts_with('#') {
                continue;
            }

            let Some(header) = &self.header else {
                return Err(ReaderError::HeaderNotFound {
                    line: self.line_number,
                });
            };

            let record = RawVariantRecord::parse(Arc::clone(header), line, self.line_number)?;
            return Ok(Some(record));
        }

        Ok(None)
    }

    /// Turn the reader into a lazy, finite stream of records.
    pub fn into_stream(self) -> impl Stream<Item = Result<RawVariantRecord, ReaderError>> {
        stream::try_unfold(self, |mut reader| async move {
            let next = reader.next_record().await?;
            Ok::<_, ReaderError>(next.map(|record| (record, reader)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    const VCF: &str = "##fileformat=VCFv4.1\n\
        ##INFO=<ID=DP,Number=1,Type=Integer>\n\
        #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n\
        1\t100\t.\tA\tT\t50\tPASS\tDP=10\tGT\t0/1\r\n\
        \n\
        2\t200\trs2\tAT\tA\t.\tLowQual\tDP=3\tGT\t1/1\n";

    #[tokio::test]
    async fn test_reads_records_after_header() {
        let mut reader = VcfReader::new(VCF.as_bytes());

        let first = reader.next_record().await.unwrap().unwrap();
        assert_eq!(first.chrom(), "1");
        assert_eq!(first.samples().next(), Some(("S1", "0/1")));
        assert_eq!(first.line_number(), 4);

        let second = reader.next_record().await.unwrap().unwrap();
        assert_eq!(second.id(), "rs2");
        assert_eq!(second.filter(), "LowQual");

        assert!(reader.next_record().await.unwrap().is_none());
        assert_eq!(reader.header().unwrap().samples().len(), 1);
    }

    #[tokio::test]
    async fn test_data_before_header() {
        let mut reader = VcfReader::new("##meta\n1\t100\t.\tA\tT\n".as_bytes());

        let err = reader.next_record().await.unwrap_err();

        assert!(matches!(err, ReaderError::HeaderNotFound { line: 2 }));
    }

    #[tokio::test]
    async fn test_column_count_mismatch_is_structural() {
        let vcf = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n1\t100\t.\tA\n";
        let mut reader = VcfReader::new(vcf.as_bytes());

        let err = reader.next_record().await.unwrap_err();

        assert!(matches!(err, ReaderError::ColumnCount { line: 2, .. }));
    }

    #[tokio::test]
    async fn test_crlf_and_trailing_whitespace() {
        let vcf = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\r\n\
            1\t100\t.\tA\tT\t50\tPASS\tDP=10\tGT\t0/1\t\r\n\
            1\t200\t.\tG\tC\t50\tPASS\tDP=4\tGT\t1/1 \r\n";
        let mut reader = VcfReader::new(vcf.as_bytes());

        let first = reader.next_record().await.unwrap().unwrap();
        assert_eq!(first.samples().next(), Some(("S1", "0/1")));

        let second = reader.next_record().await.unwrap().unwrap();
        assert_eq!(second.samples().next(), Some(("S1", "1/1")));

        assert!(reader.next_record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_into_stream() {
        let records: Vec<RawVariantRecord> = VcfReader::new(VCF.as_bytes())
            .into_stream()
            .try_collect()
            .await
            .unwrap();

        let positions: Vec<&str> = records.iter().map(|r| r.pos()).collect();
        assert_eq!(positions, vec!["100", "200"]);
    }
}
