//! VCF header and raw record types.

use std::sync::Arc;

use crate::errors::ReaderError;

/// Columns every VCF header must declare, in order.
pub const REQUIRED_COLUMNS: [&str; 8] = ["CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO"];

/// Parsed `#CHROM` header line.
#[derive(Debug, Clone, PartialEq)]
pub struct VcfHeader {
    columns: Vec<String>,
    format_index: Option<usize>,
}

impl VcfHeader {
    /// Parse a header line. The leading `#` is optional.
    pub fn parse(line: &str) -> Result<Self, ReaderError> {
        let columns: Vec<String> = line
            .strip_prefix('#')
            .unwrap_or(line)
            .split('\t')
            .map(str::to_string)
            .collect();

        for required in REQUIRED_COLUMNS {
            if !columns.iter().any(|c| c == required) {
                return Err(ReaderError::MissingColumn(required.to_string()));
            }
        }

        let format_index = columns.iter().position(|c| c == "FORMAT");
        Ok(Self {
            columns,
            format_index,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of a column by name.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Sample identifiers: every column after `FORMAT`.
    pub fn samples(&self) -> &[String] {
        match self.format_index {
            Some(idx) => &self.columns[idx + 1..],
            None => &[],
        }
    }
}

/// One data line zipped against the header.
#[derive(Debug, Clone)]
pub struct RawVariantRecord {
    header: Arc<VcfHeader>,
    values: Vec<String>,
    line_number: usize,
}

impl RawVariantRecord {
    /// Split a data line against the header.
    pub fn parse(header: Arc<VcfHeader>, line: &str, line_number: usize) -> Result<Self, ReaderError> {
        let values: Vec<String> = line.split('\t').map(str::to_string).collect();
        if values.len() != header.len() {
            return Err(ReaderError::ColumnCount {
                line: line_number,
                expected: header.len(),
                found: values.len(),
            });
        }

        Ok(Self {
            header,
            values,
            line_number,
        })
    }

    /// Raw value of a column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.header
            .position(column)
            .map(|idx| self.values[idx].as_str())
    }

    /// 1-based line number in the source file.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn header(&self) -> &VcfHeader {
        &self.header
    }

    pub fn chrom(&self) -> &str {
        self.get("CHROM").unwrap_or_default()
    }

    pub fn pos(&self) -> &str {
        self.get("POS").unwrap_or_default()
    }

    pub fn id(&self) -> &str {
        self.get("ID").unwrap_or(".")
    }

    pub fn ref_allele(&self) -> &str {
        self.get("REF").unwrap_or_default()
    }

    pub fn alt(&self) -> &str {
        self.get("ALT").unwrap_or_default()
    }

    pub fn qual(&self) -> &str {
        self.get("QUAL").unwrap_or(".")
    }

    pub fn filter(&self) -> &str {
        self.get("FILTER").unwrap_or(".")
    }

    pub fn info(&self) -> &str {
        self.get("INFO").unwrap_or_default()
    }

    pub fn format(&self) -> Option<&str> {
        self.get("FORMAT")
    }

    /// `(sample id, raw sample column)` pairs in header order.
    pub fn samples(&self) -> impl Iterator<Item = (&str, &str)> {
        let offset = self.header.len() - self.header.samples().len();
        self.header
            .samples()
            .iter()
            .zip(&self.values[offset..])
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2";

    #[test]
    fn test_header_samples() {
        let header = VcfHeader::parse(HEADER).unwrap();
        assert_eq!(header.columns()[0], "CHROM");
        assert_eq!(header.samples(), &["S1".to_string(), "S2".to_string()]);
    }

    #[test]
    fn test_header_without_format_has_no_samples() {
        let header = VcfHeader::parse("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO").unwrap();
        assert!(header.samples().is_empty());
    }

    #[test]
    fn test_header_missing_column() {
        let err = VcfHeader::parse("#CHROM\tPOS\tREF\tALT").unwrap_err();
        assert!(matches!(err, ReaderError::MissingColumn(ref c) if c == "ID"));
    }

    #[test]
    fn test_record_accessors() {
        let header = Arc::new(VcfHeader::parse(HEADER).unwrap());
        let line = "1\t100\trs1\tA\tT\t50.5\tPASS\tDP=10\tGT:DP\t0/1:12\t0/0:8";

        let record = RawVariantRecord::parse(header, line, 7).unwrap();

        assert_eq!(record.chrom(), "1");
        assert_eq!(record.pos(), "100");
        assert_eq!(record.id(), "rs1");
        assert_eq!(record.qual(), "50.5");
        assert_eq!(record.format(), Some("GT:DP"));
        assert_eq!(record.line_number(), 7);

        let samples: Vec<_> = record.samples().collect();
        assert_eq!(samples, vec![("S1", "0/1:12"), ("S2", "0/0:8")]);
    }

    #[test]
    fn test_record_column_mismatch() {
        let header = Arc::new(VcfHeader::parse(HEADER).unwrap());
        let err = RawVariantRecord::parse(header, "1\t100\t.\tA\tT", 3).unwrap_err();

        assert!(matches!(
            err,
            ReaderError::ColumnCount { line: 3, expected: 11, found: 5 }
        ));
    }
}
